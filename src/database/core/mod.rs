//! Core database infrastructure
//!
//! This module provides the foundational database components used by the review managers:
//! - `DatabaseConn`: Core SQLite connection wrapper with configuration
//! - `SchemaManager`: Schema initialization and migrations
//! - `SchemaStatus`: Schema state enumeration

mod connection;
mod rows;
mod schema;

pub use connection::DatabaseConn;
pub(crate) use rows::{optional_column, OrWarn};
pub use schema::{SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};
