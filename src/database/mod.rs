//! Database module
//!
//! This module provides all database functionality for reviewdesk, organized into:
//!
//! - **core**: Core database infrastructure (SQLite connection, schema and migrations)
//! - **review**: The reviews database and its entity managers
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/            # Foundation
//! │   ├── connection   # SQLite DatabaseConn wrapper
//! │   ├── rows         # row helpers shared by the managers
//! │   └── schema       # schema definitions, versioning, migrations
//! │
//! └── review/          # Reviews database
//!     ├── sessions     # one session per (asset, version)
//!     ├── cycles       # review cycles spanning versions
//!     ├── notes        # notes and their open/addressed/approved workflow
//!     ├── screenshots  # screenshot records
//!     ├── drawovers    # drawover metadata and audit trail
//!     ├── state        # session review-state transitions
//!     ├── status       # combined status queries
//!     ├── audit        # note audit log
//!     ├── cleanup      # sweeps and stats
//!     └── settings     # app settings and studio users
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use reviewdesk::database::{ReviewDatabase, UserRole};
//!
//! let db = ReviewDatabase::open_in_dir("~/.reviewdesk")?;
//! let note_id = db.add_note("abc-123", "v001", "Fix the bevel", None, "lead", UserRole::Lead);
//! let counts = db.get_note_status_counts("abc-123", "v001")?;
//! ```

pub mod core;
pub mod review;

// SQLite connection and schema management
pub use core::{DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};

// Reviews database (main entry point)
pub use review::{ensure_data_dir, ReviewDatabase, DATABASE_FILE_NAME};

// Records and managers
pub use review::{
    AssetNoteSummary, AuditLogEntry, AuditRepository, CleanupRepository, CycleRepository,
    DrawoverAction, DrawoverAuditEntry, DrawoverMetadata, DrawoverRepository, NoteRepository,
    ReviewCycle, ReviewNote, ReviewScreenshot, ReviewSession, ReviewStats, ReviewStatus,
    ScreenshotRepository, SessionRepository, SettingsRepository, StateRepository,
    StatusRepository, StudioUser,
};

// Value types
pub use review::{NoteCounts, NoteStatus, ReviewState, TransitionOutcome, UserRole};

// Defaults
pub use review::{
    DEFAULT_ACTIVITY_LIMIT, DEFAULT_ARCHIVE_AFTER_DAYS, DEFAULT_AUDIT_LIMIT,
    DEFAULT_DRAWOVER_AUDIT_LIMIT, DEFAULT_PURGE_AFTER_DAYS, DEFAULT_VARIANT_NAME,
};
