//! Lens module
//!
//! Lenses combine database operations with workflow rules so the command line
//! (or any other front end) does not have to reimplement them.
//!
//! | Lens | Purpose |
//! |------|---------|
//! | `ReviewWorkflowLens` | review cycles: start, join, approve, finalize, cancel |
//!
//! ```rust,ignore
//! use reviewdesk::database::ReviewDatabase;
//! use reviewdesk::lens::workflow::ReviewWorkflowLens;
//!
//! let db = ReviewDatabase::open_in_memory()?;
//! let lens = ReviewWorkflowLens::new(&db);
//! lens.start_cycle("chair", "Base", "modeling", "v001", "artist1")?;
//! ```

pub mod utils;
pub mod workflow;
