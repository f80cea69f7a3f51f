//! Database schema management
//!
//! This module provides the table definitions for the reviews database and the
//! migration chain that upgrades older files in place. Every statement is
//! idempotent so `SchemaManager::initialize` is safe to call on every start.

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::connection::{column_exists, table_exists};

/// Current schema version
/// Increment this and add a migration step when changing the schema
pub const SCHEMA_VERSION: u32 = 5;

/// Version assumed for a legacy file whose `schema_version` table is empty
const LEGACY_SCHEMA_VERSION: u32 = 1;

/// Schema definitions for all tables in the reviews database
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// One-row table holding the schema version
    pub const SCHEMA_VERSION_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
    "#;

    /// One row per (asset, version) under review
    pub const REVIEW_SESSIONS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS review_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_uuid TEXT NOT NULL,
            version_label TEXT NOT NULL,
            cycle_id INTEGER,
            created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            last_activity TIMESTAMP,
            status TEXT DEFAULT 'open',
            review_state TEXT DEFAULT NULL,
            submitted_for_review_date TIMESTAMP,
            submitted_by TEXT,
            approved_date TIMESTAMP,
            finalized_date TIMESTAMP,
            finalized_by TEXT,
            UNIQUE(asset_uuid, version_label),
            FOREIGN KEY (cycle_id) REFERENCES review_cycles(id) ON DELETE SET NULL
        );
    "#;

    /// Multi-version review spans scoped to asset + variant
    pub const REVIEW_CYCLES_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS review_cycles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_id TEXT NOT NULL,
            variant_name TEXT DEFAULT 'Base',
            cycle_type TEXT NOT NULL,
            start_version TEXT NOT NULL,
            end_version TEXT,
            review_state TEXT DEFAULT 'needs_review',
            submitted_by TEXT,
            submitted_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            finalized_by TEXT,
            finalized_date TIMESTAMP,
            created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
    "#;

    pub const REVIEW_SCREENSHOTS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS review_screenshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL,
            filename TEXT NOT NULL,
            display_name TEXT,
            file_path TEXT NOT NULL,
            display_order INTEGER DEFAULT 0,
            uploaded_by TEXT,
            uploaded_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (session_id) REFERENCES review_sessions(id) ON DELETE CASCADE
        );
    "#;

    pub const REVIEW_NOTES_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS review_notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL,
            screenshot_id INTEGER,
            note TEXT NOT NULL,
            author TEXT DEFAULT '',
            author_role TEXT DEFAULT 'artist',
            created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            modified_date TIMESTAMP,
            resolved INTEGER DEFAULT 0,
            resolved_by TEXT,
            resolved_date TIMESTAMP,
            note_status TEXT DEFAULT 'open',
            addressed_by TEXT,
            addressed_date TIMESTAMP,
            approved_by TEXT,
            approved_date TIMESTAMP,
            deleted INTEGER DEFAULT 0,
            deleted_by TEXT,
            deleted_at TIMESTAMP,
            FOREIGN KEY (session_id) REFERENCES review_sessions(id) ON DELETE CASCADE,
            FOREIGN KEY (screenshot_id) REFERENCES review_screenshots(id) ON DELETE SET NULL
        );
    "#;

    pub const REVIEW_AUDIT_LOG_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS review_audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            note_id INTEGER,
            action TEXT NOT NULL,
            actor TEXT NOT NULL,
            actor_role TEXT DEFAULT '',
            timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            details TEXT,
            FOREIGN KEY (note_id) REFERENCES review_notes(id) ON DELETE CASCADE
        );
    "#;

    pub const STUDIO_USERS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS studio_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            display_name TEXT NOT NULL,
            role TEXT DEFAULT 'artist',
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            is_active INTEGER DEFAULT 1
        );
    "#;

    pub const APP_SETTINGS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT
        );
    "#;

    pub const DRAWOVER_METADATA_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS drawover_metadata (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_uuid TEXT NOT NULL,
            version_label TEXT NOT NULL,
            screenshot_id INTEGER NOT NULL,
            stroke_count INTEGER DEFAULT 0,
            authors TEXT DEFAULT '',
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            modified_at TIMESTAMP,
            file_path TEXT,
            UNIQUE(asset_uuid, version_label, screenshot_id),
            FOREIGN KEY (screenshot_id) REFERENCES review_screenshots(id) ON DELETE CASCADE
        );
    "#;

    pub const DRAWOVER_AUDIT_LOG_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS drawover_audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_uuid TEXT NOT NULL,
            version_label TEXT NOT NULL,
            screenshot_id INTEGER NOT NULL,
            stroke_id TEXT,
            action TEXT NOT NULL,
            actor TEXT NOT NULL,
            actor_role TEXT DEFAULT '',
            timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            details TEXT
        );
    "#;

    /// All tables in creation order
    pub const TABLES: &'static [(&'static str, &'static str)] = &[
        ("review_sessions", Self::REVIEW_SESSIONS_TABLE),
        ("review_cycles", Self::REVIEW_CYCLES_TABLE),
        ("review_screenshots", Self::REVIEW_SCREENSHOTS_TABLE),
        ("review_notes", Self::REVIEW_NOTES_TABLE),
        ("review_audit_log", Self::REVIEW_AUDIT_LOG_TABLE),
        ("studio_users", Self::STUDIO_USERS_TABLE),
        ("app_settings", Self::APP_SETTINGS_TABLE),
        ("drawover_metadata", Self::DRAWOVER_METADATA_TABLE),
        ("drawover_audit_log", Self::DRAWOVER_AUDIT_LOG_TABLE),
    ];

    /// Indexes, created after migrations so every referenced column exists
    pub const INDEXES: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS idx_sessions_uuid ON review_sessions(asset_uuid)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_review_state ON review_sessions(review_state)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_cycle ON review_sessions(cycle_id)",
        "CREATE INDEX IF NOT EXISTS idx_cycles_asset ON review_cycles(asset_id)",
        "CREATE INDEX IF NOT EXISTS idx_cycles_state ON review_cycles(review_state)",
        "CREATE INDEX IF NOT EXISTS idx_cycles_active ON review_cycles(asset_id, end_version)",
        "CREATE INDEX IF NOT EXISTS idx_cycles_variant ON review_cycles(asset_id, variant_name, end_version)",
        "CREATE INDEX IF NOT EXISTS idx_screenshots_session ON review_screenshots(session_id)",
        "CREATE INDEX IF NOT EXISTS idx_notes_session ON review_notes(session_id)",
        "CREATE INDEX IF NOT EXISTS idx_notes_screenshot ON review_notes(screenshot_id)",
        "CREATE INDEX IF NOT EXISTS idx_notes_deleted ON review_notes(deleted)",
        "CREATE INDEX IF NOT EXISTS idx_notes_status ON review_notes(note_status)",
        "CREATE INDEX IF NOT EXISTS idx_audit_note ON review_audit_log(note_id)",
        "CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON review_audit_log(timestamp)",
        "CREATE INDEX IF NOT EXISTS idx_drawover_uuid ON drawover_metadata(asset_uuid)",
        "CREATE INDEX IF NOT EXISTS idx_drawover_version ON drawover_metadata(asset_uuid, version_label)",
        "CREATE INDEX IF NOT EXISTS idx_drawover_audit_uuid ON drawover_audit_log(asset_uuid, version_label)",
        "CREATE INDEX IF NOT EXISTS idx_drawover_audit_timestamp ON drawover_audit_log(timestamp)",
    ];

    /// Rows every database starts with
    pub const DEFAULT_ROWS: &'static [&'static str] = &[
        "INSERT OR IGNORE INTO app_settings (key, value) VALUES ('app_mode', 'solo')",
        "INSERT OR IGNORE INTO app_settings (key, value) VALUES ('current_user', '')",
        "INSERT OR IGNORE INTO app_settings (key, value) VALUES ('show_deleted_notes', 'false')",
        "INSERT OR IGNORE INTO studio_users (username, display_name, role) VALUES ('admin', 'Administrator', 'admin')",
    ];
}

/// Schema manager for the reviews database
///
/// Handles schema initialization, version checking, and migrations.
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Initialize the database schema
    ///
    /// Creates missing tables, stamps or upgrades the schema version, then creates
    /// indexes and default rows. Safe to call on every process start.
    pub fn initialize(&self) -> Result<()> {
        let legacy_file = table_exists(self.conn, "review_sessions")?;

        self.conn
            .execute(SchemaDefinitions::SCHEMA_VERSION_TABLE, [])
            .map_err(|e| anyhow!("Failed to create schema_version table: {}", e))?;

        for (name, sql) in SchemaDefinitions::TABLES {
            self.conn
                .execute(sql, [])
                .map_err(|e| anyhow!("Failed to create {} table: {}", name, e))?;
        }

        if self.stored_version()?.is_none() {
            let version = if legacy_file {
                LEGACY_SCHEMA_VERSION
            } else {
                SCHEMA_VERSION
            };
            self.set_schema_version(version)?;
        }

        self.migrate_if_needed()?;

        for index_sql in SchemaDefinitions::INDEXES {
            self.conn
                .execute(index_sql, [])
                .map_err(|e| anyhow!("Failed to create review index: {}", e))?;
        }

        for row_sql in SchemaDefinitions::DEFAULT_ROWS {
            self.conn
                .execute(row_sql, [])
                .map_err(|e| anyhow!("Failed to insert default row: {}", e))?;
        }

        Ok(())
    }

    /// Run every migration between the stored version and `SCHEMA_VERSION`
    ///
    /// Each step commits on its own; a failing step leaves earlier steps applied.
    pub fn migrate_if_needed(&self) -> Result<()> {
        let mut version = self.get_schema_version()?;

        while version < SCHEMA_VERSION {
            match version {
                1 => self.migrate_v1_to_v2()?,
                2 => self.migrate_v2_to_v3()?,
                3 => self.migrate_v3_to_v4()?,
                4 => self.migrate_v4_to_v5()?,
                other => return Err(anyhow!("No migration path from schema version {}", other)),
            }
            version += 1;
            self.set_schema_version(version)?;
        }

        Ok(())
    }

    /// Check the current schema status
    pub fn check_status(&self) -> Result<SchemaStatus> {
        if !table_exists(self.conn, "schema_version")? {
            return Ok(SchemaStatus::NotInitialized);
        }

        let current_version = self.get_schema_version()?;

        if current_version == SCHEMA_VERSION {
            if self.verify_integrity()? {
                Ok(SchemaStatus::Current)
            } else {
                Ok(SchemaStatus::Corrupted)
            }
        } else if current_version < SCHEMA_VERSION {
            Ok(SchemaStatus::NeedsMigration {
                from: current_version,
                to: SCHEMA_VERSION,
            })
        } else {
            Ok(SchemaStatus::Incompatible {
                database_version: current_version,
                required_version: SCHEMA_VERSION,
            })
        }
    }

    /// Get the schema version, treating an empty table as a legacy v1 file
    pub fn get_schema_version(&self) -> Result<u32> {
        Ok(self.stored_version()?.unwrap_or(LEGACY_SCHEMA_VERSION))
    }

    fn stored_version(&self) -> Result<Option<u32>> {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get::<_, Option<u32>>(0)
            })
            .optional()
            .map(|v| v.flatten())
            .map_err(|e| anyhow!("Failed to read schema version: {}", e))
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute("DELETE FROM schema_version", [])
            .map_err(|e| anyhow!("Failed to clear schema version: {}", e))?;
        self.conn
            .execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![version],
            )
            .map_err(|e| anyhow!("Failed to set schema version: {}", e))?;
        Ok(())
    }

    /// Verify schema integrity by checking required tables exist
    fn verify_integrity(&self) -> Result<bool> {
        for (table, _) in SchemaDefinitions::TABLES {
            if !table_exists(self.conn, table)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn add_missing_columns(&self, table: &str, columns: &[(&str, &str)]) -> Result<()> {
        for (name, definition) in columns {
            if !column_exists(self.conn, table, name)? {
                self.conn
                    .execute(
                        &format!("ALTER TABLE {} ADD COLUMN {} {}", table, name, definition),
                        [],
                    )
                    .map_err(|e| anyhow!("Failed to add column {}.{}: {}", table, name, e))?;
            }
        }
        Ok(())
    }

    /// v1 -> v2: review workflow state columns on sessions
    fn migrate_v1_to_v2(&self) -> Result<()> {
        self.add_missing_columns(
            "review_sessions",
            &[
                ("review_state", "TEXT DEFAULT NULL"),
                ("submitted_for_review_date", "TIMESTAMP"),
                ("submitted_by", "TEXT"),
                ("approved_date", "TIMESTAMP"),
                ("finalized_date", "TIMESTAMP"),
                ("finalized_by", "TEXT"),
            ],
        )?;
        info!("reviews database migrated to v2 (review workflow states)");
        Ok(())
    }

    /// v2 -> v3: three-state note workflow, backfilled from the legacy resolved flag
    fn migrate_v2_to_v3(&self) -> Result<()> {
        self.add_missing_columns(
            "review_notes",
            &[
                ("note_status", "TEXT DEFAULT 'open'"),
                ("addressed_by", "TEXT"),
                ("addressed_date", "TIMESTAMP"),
                ("approved_by", "TEXT"),
                ("approved_date", "TIMESTAMP"),
                ("deleted", "INTEGER DEFAULT 0"),
                ("deleted_by", "TEXT"),
                ("deleted_at", "TIMESTAMP"),
            ],
        )?;

        let backfilled = self
            .conn
            .execute(
                r#"
                UPDATE review_notes
                SET note_status = 'approved',
                    approved_by = COALESCE(approved_by, resolved_by),
                    approved_date = COALESCE(approved_date, resolved_date)
                WHERE resolved = 1 AND (note_status IS NULL OR note_status = 'open')
                "#,
                [],
            )
            .map_err(|e| anyhow!("Failed to backfill note status: {}", e))?;

        info!(
            "reviews database migrated to v3 (note status), {} resolved notes marked approved",
            backfilled
        );
        Ok(())
    }

    /// v3 -> v4: review cycles, one `general` cycle per session that carries a state
    fn migrate_v3_to_v4(&self) -> Result<()> {
        self.conn
            .execute(SchemaDefinitions::REVIEW_CYCLES_TABLE, [])
            .map_err(|e| anyhow!("Failed to create review_cycles table: {}", e))?;
        self.add_missing_columns("review_sessions", &[("cycle_id", "INTEGER")])?;

        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, asset_uuid, version_label, review_state, submitted_by,
                       submitted_for_review_date, finalized_by, finalized_date
                FROM review_sessions
                WHERE review_state IS NOT NULL
                "#,
            )
            .map_err(|e| anyhow!("Failed to prepare session scan: {}", e))?;

        let sessions = stmt
            .query_map([], |row| {
                Ok(LegacySessionState {
                    id: row.get(0)?,
                    asset_uuid: row.get(1)?,
                    version_label: row.get(2)?,
                    review_state: row.get(3)?,
                    submitted_by: row.get(4)?,
                    submitted_date: row.get(5)?,
                    finalized_by: row.get(6)?,
                    finalized_date: row.get(7)?,
                })
            })
            .map_err(|e| anyhow!("Failed to scan sessions: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to scan sessions: {}", e))?;

        for session in &sessions {
            let end_version = (session.review_state == "final").then_some(&session.version_label);
            self.conn
                .execute(
                    r#"
                    INSERT INTO review_cycles
                        (asset_id, cycle_type, start_version, end_version, review_state,
                         submitted_by, submitted_date, finalized_by, finalized_date)
                    VALUES (?1, 'general', ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        session.asset_uuid,
                        session.version_label,
                        end_version,
                        session.review_state,
                        session.submitted_by,
                        session.submitted_date,
                        session.finalized_by,
                        session.finalized_date,
                    ],
                )
                .map_err(|e| anyhow!("Failed to create cycle for session {}: {}", session.id, e))?;

            let cycle_id = self.conn.last_insert_rowid();
            self.conn
                .execute(
                    "UPDATE review_sessions SET cycle_id = ?1 WHERE id = ?2",
                    params![cycle_id, session.id],
                )
                .map_err(|e| anyhow!("Failed to link session {}: {}", session.id, e))?;
        }

        info!(
            "reviews database migrated to v4 (review cycles), {} sessions converted",
            sessions.len()
        );
        Ok(())
    }

    /// v4 -> v5: variant scoping for cycles
    fn migrate_v4_to_v5(&self) -> Result<()> {
        if !column_exists(self.conn, "review_cycles", "variant_name")? {
            self.add_missing_columns("review_cycles", &[("variant_name", "TEXT DEFAULT 'Base'")])?;
            self.conn
                .execute(
                    "UPDATE review_cycles SET variant_name = 'Base' WHERE variant_name IS NULL",
                    [],
                )
                .map_err(|e| anyhow!("Failed to backfill cycle variants: {}", e))?;
        }
        info!("reviews database migrated to v5 (variant support for cycles)");
        Ok(())
    }

    /// Drop every review table and the version stamp
    pub fn reset(&self) -> Result<()> {
        for (table, _) in SchemaDefinitions::TABLES.iter().rev() {
            self.conn
                .execute(&format!("DROP TABLE IF EXISTS {}", table), [])
                .map_err(|e| anyhow!("Failed to drop {}: {}", table, e))?;
        }
        self.conn
            .execute("DROP TABLE IF EXISTS schema_version", [])
            .map_err(|e| anyhow!("Failed to drop schema_version: {}", e))?;
        Ok(())
    }
}

struct LegacySessionState {
    id: i64,
    asset_uuid: String,
    version_label: String,
    review_state: String,
    submitted_by: Option<String>,
    submitted_date: Option<String>,
    finalized_by: Option<String>,
    finalized_date: Option<String>,
}

/// Status of the database schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Database is not initialized (fresh database)
    NotInitialized,

    /// Schema is current and valid
    Current,

    /// Schema needs migration from an older version
    NeedsMigration { from: u32, to: u32 },

    /// Database is from a newer version (incompatible)
    Incompatible {
        database_version: u32,
        required_version: u32,
    },

    /// Schema is corrupted (missing tables)
    Corrupted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys=ON", []).unwrap();
        conn
    }

    /// Shape of a file written before review workflow states existed
    fn create_v1_db() -> Connection {
        let conn = create_test_db();
        conn.execute_batch(
            r#"
            CREATE TABLE review_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                asset_uuid TEXT NOT NULL,
                version_label TEXT NOT NULL,
                created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                last_activity TIMESTAMP,
                status TEXT DEFAULT 'open',
                UNIQUE(asset_uuid, version_label)
            );
            CREATE TABLE review_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                screenshot_id INTEGER,
                note TEXT NOT NULL,
                author TEXT DEFAULT '',
                author_role TEXT DEFAULT 'artist',
                created_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                modified_date TIMESTAMP,
                resolved INTEGER DEFAULT 0,
                resolved_by TEXT,
                resolved_date TIMESTAMP,
                FOREIGN KEY (session_id) REFERENCES review_sessions(id) ON DELETE CASCADE
            );
            INSERT INTO review_sessions (asset_uuid, version_label) VALUES ('asset-1', 'v001');
            INSERT INTO review_notes (session_id, note, resolved, resolved_by)
                VALUES (1, 'fixed already', 1, 'lead');
            INSERT INTO review_notes (session_id, note) VALUES (1, 'still open');
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_schema_not_initialized() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
    }

    #[test]
    fn test_schema_initialize() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();

        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
        assert_eq!(manager.get_schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();
        manager.initialize().unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
        let admins: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM studio_users WHERE username = 'admin'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(admins, 1);
    }

    #[test]
    fn test_default_settings_seeded() {
        let conn = create_test_db();
        SchemaManager::new(&conn).initialize().unwrap();

        let mode: String = conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = 'app_mode'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(mode, "solo");
    }

    #[test]
    fn test_legacy_file_is_migrated() {
        let conn = create_v1_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();

        assert_eq!(manager.get_schema_version().unwrap(), SCHEMA_VERSION);
        assert!(column_exists(&conn, "review_sessions", "review_state").unwrap());
        assert!(column_exists(&conn, "review_sessions", "cycle_id").unwrap());
        assert!(column_exists(&conn, "review_notes", "note_status").unwrap());
        assert!(column_exists(&conn, "review_cycles", "variant_name").unwrap());

        let (status, approver): (String, Option<String>) = conn
            .query_row(
                "SELECT note_status, approved_by FROM review_notes WHERE note = 'fixed already'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "approved");
        assert_eq!(approver.as_deref(), Some("lead"));

        let open: String = conn
            .query_row(
                "SELECT note_status FROM review_notes WHERE note = 'still open'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(open, "open");
    }

    #[test]
    fn test_v3_sessions_become_cycles() {
        let conn = create_v1_db();
        let manager = SchemaManager::new(&conn);
        conn.execute_batch(
            r#"
            CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
            INSERT INTO schema_version (version) VALUES (1);
            "#,
        )
        .unwrap();
        manager.migrate_v1_to_v2().unwrap();
        manager.migrate_v2_to_v3().unwrap();
        conn.execute_batch(
            r#"
            UPDATE review_sessions SET review_state = 'final', finalized_by = 'lead';
            INSERT INTO review_sessions (asset_uuid, version_label, review_state)
                VALUES ('asset-1', 'v002', 'in_progress');
            UPDATE schema_version SET version = 3;
            "#,
        )
        .unwrap();

        manager.initialize().unwrap();

        let cycles: Vec<(String, Option<String>, String)> = conn
            .prepare("SELECT start_version, end_version, cycle_type FROM review_cycles ORDER BY id")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], ("v001".to_string(), Some("v001".to_string()), "general".to_string()));
        assert_eq!(cycles[1].1, None);

        let unlinked: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM review_sessions WHERE cycle_id IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(unlinked, 0);
    }

    #[test]
    fn test_newer_database_is_incompatible() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);
        manager.initialize().unwrap();
        manager.set_schema_version(SCHEMA_VERSION + 1).unwrap();

        assert!(matches!(
            manager.check_status().unwrap(),
            SchemaStatus::Incompatible { .. }
        ));
    }

    #[test]
    fn test_schema_reset() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);

        manager.reset().unwrap();
        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
    }
}
