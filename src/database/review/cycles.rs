//! Review cycles: a run of versions reviewed for one purpose on one asset variant
//!
//! A cycle is open while `end_version` is NULL. Only one open cycle per
//! (asset, variant) is expected; the schema does not enforce it, callers check
//! with [`CycleRepository::get_active_cycle_for_variant`] before creating one.

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::database::core::OrWarn;

use super::notes::ReviewNote;
use super::sessions::ReviewSession;
use super::types::{NoteCounts, ReviewState};

/// Variant used when a cycle is not scoped to a named variant
pub const DEFAULT_VARIANT_NAME: &str = "Base";

/// A review cycle record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewCycle {
    pub id: i64,
    pub asset_id: String,
    pub variant_name: String,
    pub cycle_type: String,
    pub start_version: String,
    pub end_version: Option<String>,
    pub review_state: Option<String>,
    pub submitted_by: Option<String>,
    pub submitted_date: Option<String>,
    pub finalized_by: Option<String>,
    pub finalized_date: Option<String>,
    pub created_date: Option<String>,
}

impl ReviewCycle {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ReviewCycle {
            id: row.get("id")?,
            asset_id: row.get("asset_id")?,
            variant_name: row
                .get::<_, Option<String>>("variant_name")?
                .unwrap_or_else(|| DEFAULT_VARIANT_NAME.to_string()),
            cycle_type: row.get("cycle_type")?,
            start_version: row.get("start_version")?,
            end_version: row.get("end_version")?,
            review_state: row.get("review_state")?,
            submitted_by: row.get("submitted_by")?,
            submitted_date: row.get("submitted_date")?,
            finalized_by: row.get("finalized_by")?,
            finalized_date: row.get("finalized_date")?,
            created_date: row.get("created_date")?,
        })
    }

    /// Parsed review state; unknown stored values read as `None`
    pub fn state(&self) -> Option<ReviewState> {
        self.review_state.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn is_active(&self) -> bool {
        self.end_version.is_none()
    }
}

/// Repository for review cycle operations
pub struct CycleRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CycleRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query_cycles<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<ReviewCycle>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare cycle query: {}", e))?;
        let cycles = stmt
            .query_map(params, ReviewCycle::from_row)
            .map_err(|e| anyhow!("Failed to query cycles: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read cycles: {}", e))?;
        Ok(cycles)
    }

    /// Start a new cycle in `needs_review`
    pub fn create_cycle(
        &self,
        asset_id: &str,
        cycle_type: &str,
        start_version: &str,
        submitted_by: &str,
        variant_name: &str,
    ) -> Option<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO review_cycles
                    (asset_id, variant_name, cycle_type, start_version, review_state, submitted_by)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    asset_id,
                    variant_name,
                    cycle_type,
                    start_version,
                    ReviewState::NeedsReview,
                    submitted_by
                ],
            )
            .map(|_| self.conn.last_insert_rowid())
            .or_warn(&format!("create {} cycle for {}", cycle_type, asset_id))
    }

    /// Newest open cycle of an asset, any variant
    pub fn get_active_cycle(&self, asset_id: &str) -> Result<Option<ReviewCycle>> {
        Ok(self
            .query_cycles(
                "SELECT * FROM review_cycles WHERE asset_id = ?1 AND end_version IS NULL \
                 ORDER BY created_date DESC, id DESC LIMIT 1",
                params![asset_id],
            )?
            .into_iter()
            .next())
    }

    /// Newest open cycle of one asset variant
    pub fn get_active_cycle_for_variant(
        &self,
        asset_id: &str,
        variant_name: &str,
    ) -> Result<Option<ReviewCycle>> {
        Ok(self
            .query_cycles(
                "SELECT * FROM review_cycles \
                 WHERE asset_id = ?1 AND COALESCE(variant_name, 'Base') = ?2 AND end_version IS NULL \
                 ORDER BY created_date DESC, id DESC LIMIT 1",
                params![asset_id, variant_name],
            )?
            .into_iter()
            .next())
    }

    pub fn get_cycle(&self, cycle_id: i64) -> Result<Option<ReviewCycle>> {
        self.conn
            .query_row(
                "SELECT * FROM review_cycles WHERE id = ?1",
                params![cycle_id],
                ReviewCycle::from_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to get cycle {}: {}", cycle_id, e))
    }

    /// All cycles of an asset, newest first
    pub fn get_cycles_for_asset(&self, asset_id: &str) -> Result<Vec<ReviewCycle>> {
        self.query_cycles(
            "SELECT * FROM review_cycles WHERE asset_id = ?1 ORDER BY created_date DESC, id DESC",
            params![asset_id],
        )
    }

    pub fn set_cycle_state(&self, cycle_id: i64, state: ReviewState) -> bool {
        self.conn
            .execute(
                "UPDATE review_cycles SET review_state = ?1 WHERE id = ?2",
                params![state, cycle_id],
            )
            .or_warn(&format!("set state of cycle {}", cycle_id))
            .is_some_and(|n| n > 0)
    }

    /// Close the cycle at `end_version`, marking it final
    pub fn close_cycle(&self, cycle_id: i64, end_version: &str, finalized_by: &str) -> bool {
        self.conn
            .execute(
                r#"
                UPDATE review_cycles
                SET end_version = ?1, review_state = ?2, finalized_by = ?3,
                    finalized_date = CURRENT_TIMESTAMP
                WHERE id = ?4
                "#,
                params![end_version, ReviewState::Final, finalized_by, cycle_id],
            )
            .or_warn(&format!("close cycle {}", cycle_id))
            .is_some_and(|n| n > 0)
    }

    /// Remove a cycle; linked sessions fall back to no cycle
    pub fn delete_cycle(&self, cycle_id: i64) -> bool {
        self.conn
            .execute("DELETE FROM review_cycles WHERE id = ?1", params![cycle_id])
            .or_warn(&format!("delete cycle {}", cycle_id))
            .is_some_and(|n| n > 0)
    }

    pub fn link_session_to_cycle(&self, session_id: i64, cycle_id: i64) -> bool {
        self.conn
            .execute(
                "UPDATE review_sessions SET cycle_id = ?1 WHERE id = ?2",
                params![cycle_id, session_id],
            )
            .or_warn(&format!("link session {} to cycle {}", session_id, cycle_id))
            .is_some_and(|n| n > 0)
    }

    /// Sessions linked to a cycle, in version order
    pub fn get_cycle_sessions(&self, cycle_id: i64) -> Result<Vec<ReviewSession>> {
        let sql = format!(
            "SELECT {} FROM review_sessions s WHERE s.cycle_id = ?1 ORDER BY s.version_label ASC",
            ReviewSession::COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| anyhow!("Failed to prepare cycle session query: {}", e))?;
        let sessions = stmt
            .query_map(params![cycle_id], ReviewSession::from_row)
            .map_err(|e| anyhow!("Failed to query cycle sessions: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read cycle sessions: {}", e))?;
        Ok(sessions)
    }

    /// Notes across every version of a cycle
    ///
    /// Ordered by version, then general notes before screenshot notes, then creation.
    pub fn get_cycle_notes(&self, cycle_id: i64, include_deleted: bool) -> Result<Vec<ReviewNote>> {
        let deleted_filter = if include_deleted {
            ""
        } else {
            "AND COALESCE(n.deleted, 0) = 0"
        };
        let sql = format!(
            r#"
            SELECT n.*, s.version_label AS version_label, sc.display_name AS screenshot_name
            FROM review_notes n
            JOIN review_sessions s ON n.session_id = s.id
            LEFT JOIN review_screenshots sc ON n.screenshot_id = sc.id
            WHERE s.cycle_id = ?1 {}
            ORDER BY s.version_label ASC, n.screenshot_id ASC NULLS FIRST, n.created_date ASC, n.id ASC
            "#,
            deleted_filter
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| anyhow!("Failed to prepare cycle note query: {}", e))?;
        let notes = stmt
            .query_map(params![cycle_id], ReviewNote::from_row)
            .map_err(|e| anyhow!("Failed to query cycle notes: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read cycle notes: {}", e))?;
        Ok(notes)
    }

    /// Non-deleted note counts across a cycle
    pub fn get_cycle_note_counts(&self, cycle_id: i64) -> Result<NoteCounts> {
        let sql = format!(
            r#"
            SELECT {}
            FROM review_notes n
            JOIN review_sessions s ON n.session_id = s.id
            WHERE s.cycle_id = ?1 AND COALESCE(n.deleted, 0) = 0
            "#,
            NoteCounts::SELECT
        );
        self.conn
            .query_row(&sql, params![cycle_id], NoteCounts::from_row)
            .map_err(|e| anyhow!("Failed to count cycle notes: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{DatabaseConn, SchemaManager};
    use crate::database::review::notes::NoteRepository;
    use crate::database::review::sessions::SessionRepository;
    use crate::database::review::types::{NoteStatus, UserRole};

    fn create_test_db() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaManager::new(&db.conn).initialize().unwrap();
        db
    }

    #[test]
    fn test_create_and_close_cycle() {
        let db = create_test_db();
        let repo = CycleRepository::new(&db.conn);

        let id = repo
            .create_cycle("asset-1", "modeling", "v001", "artist", DEFAULT_VARIANT_NAME)
            .unwrap();
        let cycle = repo.get_cycle(id).unwrap().unwrap();
        assert_eq!(cycle.state(), Some(ReviewState::NeedsReview));
        assert!(cycle.is_active());
        assert_eq!(repo.get_active_cycle("asset-1").unwrap().unwrap().id, id);

        assert!(repo.close_cycle(id, "v003", "lead"));
        let closed = repo.get_cycle(id).unwrap().unwrap();
        assert_eq!(closed.end_version.as_deref(), Some("v003"));
        assert_eq!(closed.state(), Some(ReviewState::Final));
        assert!(closed.finalized_date.is_some());
        assert!(repo.get_active_cycle("asset-1").unwrap().is_none());
    }

    #[test]
    fn test_active_cycle_is_variant_scoped() {
        let db = create_test_db();
        let repo = CycleRepository::new(&db.conn);

        let base = repo
            .create_cycle("asset-1", "modeling", "v001", "artist", "Base")
            .unwrap();
        let damaged = repo
            .create_cycle("asset-1", "texturing", "v001", "artist", "Damaged")
            .unwrap();

        assert_eq!(
            repo.get_active_cycle_for_variant("asset-1", "Base").unwrap().unwrap().id,
            base
        );
        assert_eq!(
            repo.get_active_cycle_for_variant("asset-1", "Damaged").unwrap().unwrap().id,
            damaged
        );
        assert!(repo
            .get_active_cycle_for_variant("asset-1", "Clean")
            .unwrap()
            .is_none());
        assert_eq!(repo.get_cycles_for_asset("asset-1").unwrap().len(), 2);
    }

    #[test]
    fn test_cycle_note_counts() {
        let db = create_test_db();
        let cycles = CycleRepository::new(&db.conn);
        let sessions = SessionRepository::new(&db.conn);
        let notes = NoteRepository::new(&db.conn);

        let cycle_id = cycles
            .create_cycle("asset-1", "modeling", "v001", "artist", "Base")
            .unwrap();

        // v001: two open notes, v002: one addressed, v003: one approved
        for version in ["v001", "v002", "v003"] {
            let session_id = sessions.get_or_create_session("asset-1", version).unwrap();
            assert!(cycles.link_session_to_cycle(session_id, cycle_id));
        }
        notes.add_note("asset-1", "v001", "fix uvs", None, "lead", UserRole::Lead).unwrap();
        notes.add_note("asset-1", "v001", "bevel edges", None, "lead", UserRole::Lead).unwrap();
        let addressed = notes.add_note("asset-1", "v002", "scale", None, "lead", UserRole::Lead).unwrap();
        let approved = notes.add_note("asset-1", "v003", "normals", None, "lead", UserRole::Lead).unwrap();
        assert!(notes.set_note_status(addressed, NoteStatus::Addressed, "artist"));
        assert!(notes.set_note_status(approved, NoteStatus::Approved, "lead"));

        let counts = cycles.get_cycle_note_counts(cycle_id).unwrap();
        assert_eq!(
            counts,
            NoteCounts {
                open: 2,
                addressed: 1,
                approved: 1,
                total: 4
            }
        );

        let cycle_notes = cycles.get_cycle_notes(cycle_id, false).unwrap();
        assert_eq!(cycle_notes.len(), 4);
        assert_eq!(cycle_notes[0].version_label.as_deref(), Some("v001"));
        assert_eq!(cycle_notes[3].version_label.as_deref(), Some("v003"));

        let session_versions: Vec<String> = cycles
            .get_cycle_sessions(cycle_id)
            .unwrap()
            .into_iter()
            .map(|s| s.version_label)
            .collect();
        assert_eq!(session_versions, vec!["v001", "v002", "v003"]);
    }

    #[test]
    fn test_delete_cycle_unlinks_sessions() {
        let db = create_test_db();
        let cycles = CycleRepository::new(&db.conn);
        let sessions = SessionRepository::new(&db.conn);

        let cycle_id = cycles
            .create_cycle("asset-1", "modeling", "v001", "artist", "Base")
            .unwrap();
        let session_id = sessions.get_or_create_session("asset-1", "v001").unwrap();
        assert!(cycles.link_session_to_cycle(session_id, cycle_id));

        assert!(cycles.delete_cycle(cycle_id));
        assert!(!cycles.delete_cycle(cycle_id));
        assert!(cycles.get_cycle(cycle_id).unwrap().is_none());
        assert!(cycles
            .get_active_cycle_for_variant("asset-1", "Base")
            .unwrap()
            .is_none());
        let session = sessions.get_session_by_id(session_id).unwrap().unwrap();
        assert_eq!(session.cycle_id, None);
    }

    #[test]
    fn test_set_state_on_missing_cycle() {
        let db = create_test_db();
        let repo = CycleRepository::new(&db.conn);
        assert!(!repo.set_cycle_state(99, ReviewState::Approved));
    }
}
