//! Housekeeping sweeps and database statistics

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::database::core::OrWarn;

/// Days of inactivity before a session is archived
pub const DEFAULT_ARCHIVE_AFTER_DAYS: u32 = 90;

/// Age in days before a soft-deleted note is purged
pub const DEFAULT_PURGE_AFTER_DAYS: u32 = 30;

/// Row counts across the reviews database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    pub total_sessions: i64,
    pub open_sessions: i64,
    pub archived_sessions: i64,
    pub total_cycles: i64,
    pub active_cycles: i64,
    pub total_notes: i64,
    pub deleted_notes: i64,
    pub open_notes: i64,
    pub addressed_notes: i64,
    pub approved_notes: i64,
    pub total_screenshots: i64,
    pub total_drawovers: i64,
    pub active_users: i64,
}

/// Repository for cleanup sweeps
pub struct CleanupRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CleanupRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Delete sessions with no notes, no screenshots and no review state
    pub fn cleanup_orphaned_sessions(&self) -> usize {
        self.conn
            .execute(
                r#"
                DELETE FROM review_sessions
                WHERE id NOT IN (SELECT DISTINCT session_id FROM review_notes)
                  AND id NOT IN (SELECT DISTINCT session_id FROM review_screenshots)
                  AND review_state IS NULL
                "#,
                [],
            )
            .or_warn("clean up orphaned sessions")
            .unwrap_or(0)
    }

    /// Mark open sessions idle for `days_inactive` days as archived
    pub fn archive_inactive_sessions(&self, days_inactive: u32) -> usize {
        self.conn
            .execute(
                r#"
                UPDATE review_sessions
                SET status = 'archived'
                WHERE status = 'open'
                  AND last_activity < datetime('now', ?1)
                "#,
                params![format!("-{} days", days_inactive)],
            )
            .or_warn("archive inactive sessions")
            .unwrap_or(0)
    }

    /// Delete archived sessions together with their notes and screenshots
    pub fn delete_archived_sessions(&self) -> usize {
        self.conn
            .execute("DELETE FROM review_sessions WHERE status = 'archived'", [])
            .or_warn("delete archived sessions")
            .unwrap_or(0)
    }

    /// Permanently remove notes soft-deleted more than `days_old` days ago
    pub fn purge_deleted_notes(&self, days_old: u32) -> usize {
        self.conn
            .execute(
                r#"
                DELETE FROM review_notes
                WHERE deleted = 1
                  AND deleted_at < datetime('now', ?1)
                "#,
                params![format!("-{} days", days_old)],
            )
            .or_warn("purge deleted notes")
            .unwrap_or(0)
    }

    pub fn get_stats(&self) -> Result<ReviewStats> {
        self.conn
            .query_row(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM review_sessions),
                    (SELECT COUNT(*) FROM review_sessions WHERE status = 'open'),
                    (SELECT COUNT(*) FROM review_sessions WHERE status = 'archived'),
                    (SELECT COUNT(*) FROM review_cycles),
                    (SELECT COUNT(*) FROM review_cycles WHERE end_version IS NULL),
                    (SELECT COUNT(*) FROM review_notes WHERE COALESCE(deleted, 0) = 0),
                    (SELECT COUNT(*) FROM review_notes WHERE deleted = 1),
                    (SELECT COUNT(*) FROM review_notes WHERE note_status = 'open'),
                    (SELECT COUNT(*) FROM review_notes WHERE note_status = 'addressed'),
                    (SELECT COUNT(*) FROM review_notes WHERE note_status = 'approved'),
                    (SELECT COUNT(*) FROM review_screenshots),
                    (SELECT COUNT(*) FROM drawover_metadata),
                    (SELECT COUNT(*) FROM studio_users WHERE is_active = 1)
                "#,
                [],
                |row| {
                    Ok(ReviewStats {
                        total_sessions: row.get(0)?,
                        open_sessions: row.get(1)?,
                        archived_sessions: row.get(2)?,
                        total_cycles: row.get(3)?,
                        active_cycles: row.get(4)?,
                        total_notes: row.get(5)?,
                        deleted_notes: row.get(6)?,
                        open_notes: row.get(7)?,
                        addressed_notes: row.get(8)?,
                        approved_notes: row.get(9)?,
                        total_screenshots: row.get(10)?,
                        total_drawovers: row.get(11)?,
                        active_users: row.get(12)?,
                    })
                },
            )
            .map_err(|e| anyhow!("Failed to collect review stats: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{DatabaseConn, SchemaManager};
    use crate::database::review::notes::NoteRepository;
    use crate::database::review::sessions::SessionRepository;
    use crate::database::review::types::UserRole;

    fn create_test_db() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaManager::new(&db.conn).initialize().unwrap();
        db
    }

    #[test]
    fn test_orphaned_sessions_removed() {
        let db = create_test_db();
        let sessions = SessionRepository::new(&db.conn);
        let notes = NoteRepository::new(&db.conn);
        let repo = CleanupRepository::new(&db.conn);

        sessions.get_or_create_session("asset-1", "v001").unwrap();
        notes.add_note("asset-1", "v002", "keep", None, "lead", UserRole::Lead).unwrap();
        let stateful = sessions.get_or_create_session("asset-1", "v003").unwrap();
        db.conn
            .execute(
                "UPDATE review_sessions SET review_state = 'needs_review' WHERE id = ?1",
                params![stateful],
            )
            .unwrap();

        assert_eq!(repo.cleanup_orphaned_sessions(), 1);
        assert!(sessions.get_session("asset-1", "v001").unwrap().is_none());
        assert!(sessions.get_session("asset-1", "v003").unwrap().is_some());
    }

    #[test]
    fn test_archive_and_delete() {
        let db = create_test_db();
        let sessions = SessionRepository::new(&db.conn);
        let notes = NoteRepository::new(&db.conn);
        let repo = CleanupRepository::new(&db.conn);

        notes.add_note("asset-1", "v001", "old", None, "lead", UserRole::Lead).unwrap();
        notes.add_note("asset-1", "v002", "fresh", None, "lead", UserRole::Lead).unwrap();
        db.conn
            .execute(
                "UPDATE review_sessions SET last_activity = datetime('now', '-120 days') WHERE version_label = 'v001'",
                [],
            )
            .unwrap();

        assert_eq!(repo.archive_inactive_sessions(DEFAULT_ARCHIVE_AFTER_DAYS), 1);
        assert_eq!(
            sessions.get_session("asset-1", "v001").unwrap().unwrap().status,
            "archived"
        );
        assert_eq!(repo.delete_archived_sessions(), 1);
        // notes cascade with the session
        assert_eq!(db.table_count("review_notes").unwrap(), 1);
    }

    #[test]
    fn test_purge_deleted_notes() {
        let db = create_test_db();
        let notes = NoteRepository::new(&db.conn);
        let repo = CleanupRepository::new(&db.conn);

        let old = notes.add_note("asset-1", "v001", "old", None, "lead", UserRole::Lead).unwrap();
        let recent = notes.add_note("asset-1", "v001", "recent", None, "lead", UserRole::Lead).unwrap();
        notes.soft_delete_note(old, "lead");
        notes.soft_delete_note(recent, "lead");
        db.conn
            .execute(
                "UPDATE review_notes SET deleted_at = datetime('now', '-45 days') WHERE id = ?1",
                params![old],
            )
            .unwrap();

        assert_eq!(repo.purge_deleted_notes(DEFAULT_PURGE_AFTER_DAYS), 1);
        assert!(notes.get_note_by_id(old).unwrap().is_none());
        assert!(notes.get_note_by_id(recent).unwrap().is_some());
    }

    #[test]
    fn test_stats() {
        let db = create_test_db();
        let notes = NoteRepository::new(&db.conn);
        let repo = CleanupRepository::new(&db.conn);
        let id = notes.add_note("asset-1", "v001", "a", None, "lead", UserRole::Lead).unwrap();
        notes.add_note("asset-1", "v001", "b", None, "lead", UserRole::Lead).unwrap();
        notes.approve_note(id, "lead");

        let stats = repo.get_stats().unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.open_sessions, 1);
        assert_eq!(stats.total_notes, 2);
        assert_eq!(stats.open_notes, 1);
        assert_eq!(stats.approved_notes, 1);
        // seeded admin
        assert_eq!(stats.active_users, 1);
    }
}
