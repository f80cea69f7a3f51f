//! Review sessions: one row per (asset, version) under review
//!
//! Sessions are created lazily by the first note, screenshot or state write for a
//! version and are only removed by the cleanup sweep.

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::database::core::OrWarn;

use super::types::ReviewState;

/// A review session record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSession {
    pub id: i64,
    pub asset_uuid: String,
    pub version_label: String,
    pub cycle_id: Option<i64>,
    pub created_date: Option<String>,
    pub last_activity: Option<String>,
    pub status: String,
    /// Raw stored state; see [`ReviewSession::state`]
    pub review_state: Option<String>,
    pub submitted_for_review_date: Option<String>,
    pub submitted_by: Option<String>,
    pub approved_date: Option<String>,
    pub finalized_date: Option<String>,
    pub finalized_by: Option<String>,
}

impl ReviewSession {
    pub(crate) const COLUMNS: &'static str = "s.id, s.asset_uuid, s.version_label, s.cycle_id, \
        s.created_date, s.last_activity, s.status, s.review_state, s.submitted_for_review_date, \
        s.submitted_by, s.approved_date, s.finalized_date, s.finalized_by";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ReviewSession {
            id: row.get("id")?,
            asset_uuid: row.get("asset_uuid")?,
            version_label: row.get("version_label")?,
            cycle_id: row.get("cycle_id")?,
            created_date: row.get("created_date")?,
            last_activity: row.get("last_activity")?,
            status: row
                .get::<_, Option<String>>("status")?
                .unwrap_or_else(|| "open".to_string()),
            review_state: row.get("review_state")?,
            submitted_for_review_date: row.get("submitted_for_review_date")?,
            submitted_by: row.get("submitted_by")?,
            approved_date: row.get("approved_date")?,
            finalized_date: row.get("finalized_date")?,
            finalized_by: row.get("finalized_by")?,
        })
    }

    /// Parsed review state; unknown stored values read as `None`
    pub fn state(&self) -> Option<ReviewState> {
        self.review_state.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Look up the session for (asset, version), inserting it when absent
pub(crate) fn ensure_session(
    conn: &Connection,
    asset_uuid: &str,
    version_label: &str,
) -> rusqlite::Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM review_sessions WHERE asset_uuid = ?1 AND version_label = ?2",
            params![asset_uuid, version_label],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO review_sessions (asset_uuid, version_label, last_activity) \
         VALUES (?1, ?2, CURRENT_TIMESTAMP)",
        params![asset_uuid, version_label],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up a session id without creating one
pub(crate) fn find_session_id(
    conn: &Connection,
    asset_uuid: &str,
    version_label: &str,
) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM review_sessions WHERE asset_uuid = ?1 AND version_label = ?2",
        params![asset_uuid, version_label],
        |row| row.get(0),
    )
    .optional()
}

/// Bump a session's activity timestamp
pub(crate) fn touch_session(conn: &Connection, session_id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE review_sessions SET last_activity = CURRENT_TIMESTAMP WHERE id = ?1",
        params![session_id],
    )
}

/// Repository for review session operations
pub struct SessionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SessionRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get the session id for (asset, version), creating the session if needed
    pub fn get_or_create_session(&self, asset_uuid: &str, version_label: &str) -> Option<i64> {
        ensure_session(self.conn, asset_uuid, version_label)
            .or_warn(&format!("get or create session {}:{}", asset_uuid, version_label))
    }

    /// Get the session for (asset, version)
    pub fn get_session(&self, asset_uuid: &str, version_label: &str) -> Result<Option<ReviewSession>> {
        let sql = format!(
            "SELECT {} FROM review_sessions s WHERE s.asset_uuid = ?1 AND s.version_label = ?2",
            ReviewSession::COLUMNS
        );
        self.conn
            .query_row(&sql, params![asset_uuid, version_label], ReviewSession::from_row)
            .optional()
            .map_err(|e| anyhow!("Failed to get session: {}", e))
    }

    /// Get a session by id
    pub fn get_session_by_id(&self, session_id: i64) -> Result<Option<ReviewSession>> {
        let sql = format!(
            "SELECT {} FROM review_sessions s WHERE s.id = ?1",
            ReviewSession::COLUMNS
        );
        self.conn
            .query_row(&sql, params![session_id], ReviewSession::from_row)
            .optional()
            .map_err(|e| anyhow!("Failed to get session {}: {}", session_id, e))
    }

    /// All sessions of an asset, ordered by version label
    pub fn get_sessions_for_asset(&self, asset_uuid: &str) -> Result<Vec<ReviewSession>> {
        let sql = format!(
            "SELECT {} FROM review_sessions s WHERE s.asset_uuid = ?1 ORDER BY s.version_label ASC",
            ReviewSession::COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| anyhow!("Failed to prepare session query: {}", e))?;
        let sessions = stmt
            .query_map(params![asset_uuid], ReviewSession::from_row)
            .map_err(|e| anyhow!("Failed to query sessions: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read sessions: {}", e))?;
        Ok(sessions)
    }

    /// Set the session's lifecycle status (`open`, `archived`, ...)
    pub fn update_session_status(&self, session_id: i64, status: &str, update_activity: bool) -> bool {
        let sql = if update_activity {
            "UPDATE review_sessions SET status = ?1, last_activity = CURRENT_TIMESTAMP WHERE id = ?2"
        } else {
            "UPDATE review_sessions SET status = ?1 WHERE id = ?2"
        };
        self.conn
            .execute(sql, params![status, session_id])
            .or_warn(&format!("update status of session {}", session_id))
            .is_some_and(|n| n > 0)
    }

    /// Bump the session's activity timestamp
    pub fn update_session_activity(&self, session_id: i64) -> bool {
        touch_session(self.conn, session_id)
            .or_warn(&format!("update activity of session {}", session_id))
            .is_some_and(|n| n > 0)
    }

    /// Attach the session to a review cycle
    pub fn link_to_cycle(&self, session_id: i64, cycle_id: i64) -> bool {
        self.conn
            .execute(
                "UPDATE review_sessions SET cycle_id = ?1 WHERE id = ?2",
                params![cycle_id, session_id],
            )
            .or_warn(&format!("link session {} to cycle {}", session_id, cycle_id))
            .is_some_and(|n| n > 0)
    }

    /// Detach the session from its cycle and clear its review state
    pub fn unlink_from_cycle(&self, session_id: i64) -> bool {
        self.conn
            .execute(
                "UPDATE review_sessions SET cycle_id = NULL, review_state = NULL WHERE id = ?1",
                params![session_id],
            )
            .or_warn(&format!("unlink session {} from its cycle", session_id))
            .is_some_and(|n| n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{DatabaseConn, SchemaManager};

    fn create_test_db() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaManager::new(&db.conn).initialize().unwrap();
        db
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let db = create_test_db();
        let repo = SessionRepository::new(&db.conn);

        let first = repo.get_or_create_session("asset-1", "v001").unwrap();
        let second = repo.get_or_create_session("asset-1", "v001").unwrap();
        let other = repo.get_or_create_session("asset-1", "v002").unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(db.table_count("review_sessions").unwrap(), 2);
    }

    #[test]
    fn test_get_session() {
        let db = create_test_db();
        let repo = SessionRepository::new(&db.conn);
        assert!(repo.get_session("asset-1", "v001").unwrap().is_none());

        let id = repo.get_or_create_session("asset-1", "v001").unwrap();
        let session = repo.get_session("asset-1", "v001").unwrap().unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.status, "open");
        assert_eq!(session.state(), None);
        assert!(session.last_activity.is_some());

        let by_id = repo.get_session_by_id(id).unwrap().unwrap();
        assert_eq!(by_id, session);
    }

    #[test]
    fn test_update_status_and_missing_session() {
        let db = create_test_db();
        let repo = SessionRepository::new(&db.conn);
        let id = repo.get_or_create_session("asset-1", "v001").unwrap();

        assert!(repo.update_session_status(id, "archived", false));
        assert_eq!(repo.get_session_by_id(id).unwrap().unwrap().status, "archived");
        assert!(!repo.update_session_status(9999, "archived", true));
        assert!(repo.update_session_activity(id));
    }

    #[test]
    fn test_link_to_missing_cycle_fails() {
        let db = create_test_db();
        let repo = SessionRepository::new(&db.conn);
        let id = repo.get_or_create_session("asset-1", "v001").unwrap();

        // foreign key to review_cycles is enforced
        assert!(!repo.link_to_cycle(id, 42));
    }

    #[test]
    fn test_link_and_unlink() {
        let db = create_test_db();
        let repo = SessionRepository::new(&db.conn);
        let id = repo.get_or_create_session("asset-1", "v002").unwrap();
        db.conn
            .execute(
                "INSERT INTO review_cycles (asset_id, cycle_type, start_version) VALUES ('asset-1', 'general', 'v001')",
                [],
            )
            .unwrap();
        let cycle_id = db.conn.last_insert_rowid();

        assert!(repo.link_to_cycle(id, cycle_id));
        assert_eq!(repo.get_session_by_id(id).unwrap().unwrap().cycle_id, Some(cycle_id));
        assert!(repo.unlink_from_cycle(id));
        let session = repo.get_session_by_id(id).unwrap().unwrap();
        assert_eq!(session.cycle_id, None);
        assert_eq!(session.review_state, None);
    }
}
