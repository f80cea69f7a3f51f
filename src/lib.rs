#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Reviewdesk - review data layer for a 3D asset pipeline
//!
//! Reviewdesk keeps the review side of an asset library: review sessions per asset
//! version, review cycles spanning versions, notes with an open -> addressed ->
//! approved workflow, screenshots, drawover annotations and an audit trail, all in
//! one SQLite file. A file-based JSON queue connects it to the modeling tool, which
//! drops screenshots for review and receives import commands.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | database, storage tree, queue, workflow lens | `rusqlite`, `config`, `serde_json` |
//! | `display` | table rendering for [`OutputFormat`] | `tabled` |
//! | `cli` | the `reviewdesk` binary | above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! reviewdesk = { version = "0.1", default-features = false }
//!
//! # Default (CLI binary)
//! reviewdesk = "0.1"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: SQLite schema, migrations and the entity managers behind
//!   the [`ReviewDatabase`] facade
//! - **[`storage`]**: the on-disk review tree (screenshots, drawover documents, manifest)
//! - **[`queue`]**: message tables, producer and the screenshot consumer
//! - **[`lens`]**: workflow rules across cycles and output helpers
//! - **[`config`]**: configuration management
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use reviewdesk::{ReviewConfig, ReviewDatabase, UserRole};
//!
//! let config = ReviewConfig::new(&None)?;
//! let db = ReviewDatabase::open_in_dir(&config.data_dir)?;
//!
//! let note_id = db
//!     .add_note("chair", "v003", "armrest too thick", None, "lead1", UserRole::Lead)
//!     .ok_or_else(|| anyhow::anyhow!("note not saved"))?;
//! db.mark_note_addressed(note_id, "artist1");
//! db.approve_note(note_id, "lead1");
//!
//! let status = db.get_review_status("chair", "v003", None)?;
//! println!("open notes: {}", status.note_counts.open);
//! ```
//!
//! ## Processing queued screenshots
//!
//! ```rust,ignore
//! use reviewdesk::queue::ScreenshotQueueHandler;
//! use reviewdesk::storage::ReviewFileStore;
//!
//! let handler = ScreenshotQueueHandler::new(
//!     &config.queue_dir,
//!     ReviewFileStore::new(&config.reviews_dir),
//!     &db,
//! );
//! let imported = handler.process_all_pending();
//! ```

pub mod config;
pub mod database;
pub mod lens;
pub mod queue;
pub mod storage;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{format_size, get_database_info, DatabaseInfo, ReviewConfig};

// =============================================================================
// Database
// =============================================================================

pub use database::{ReviewDatabase, DATABASE_FILE_NAME};

pub use database::{DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};

pub use database::{
    AssetNoteSummary, AuditLogEntry, DrawoverAction, DrawoverAuditEntry, DrawoverMetadata,
    NoteCounts, NoteStatus, ReviewCycle, ReviewNote, ReviewScreenshot, ReviewSession, ReviewState,
    ReviewStats, ReviewStatus, StudioUser, TransitionOutcome, UserRole,
};

// =============================================================================
// Storage, queue, lenses
// =============================================================================

pub use storage::{ReviewFileStore, ReviewLocation};

pub use queue::{QueueMessage, QueueProducer, QueueStatus, ScreenshotQueueHandler};

pub use lens::utils::OutputFormat;
pub use lens::workflow::ReviewWorkflowLens;
