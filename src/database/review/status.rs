//! Combined review status for badges and grid display
//!
//! Merges the session row, its cycle (or the asset's open cycle) and note counts
//! into one [`ReviewStatus`].

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::HashMap;

use super::types::NoteCounts;

/// Everything a UI needs to badge one asset version
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewStatus {
    /// Cycle state when the version belongs to a cycle, the session state otherwise
    pub review_state: Option<String>,
    pub cycle_id: Option<i64>,
    pub cycle_type: Option<String>,
    pub cycle_start: Option<String>,
    pub note_counts: NoteCounts,
    pub has_notes: bool,
    pub has_open_notes: bool,
    pub is_in_cycle: bool,
}

/// One version with its count of notes in a given status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetNoteSummary {
    pub asset_uuid: String,
    pub version_label: String,
    pub review_state: Option<String>,
    pub note_count: i64,
}

impl AssetNoteSummary {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AssetNoteSummary {
            asset_uuid: row.get("asset_uuid")?,
            version_label: row.get("version_label")?,
            review_state: row.get("review_state")?,
            note_count: row.get("note_count")?,
        })
    }
}

struct CycleInfo {
    id: i64,
    cycle_type: String,
    start_version: String,
    review_state: Option<String>,
}

impl CycleInfo {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CycleInfo {
            id: row.get("id")?,
            cycle_type: row.get("cycle_type")?,
            start_version: row.get("start_version")?,
            review_state: row.get("review_state")?,
        })
    }
}

/// Read-only status queries
pub struct StatusRepository<'a> {
    conn: &'a Connection,
}

impl<'a> StatusRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Review status of one version
    ///
    /// When the session is not linked to a cycle and `version_group_id` is given, the
    /// family's newest open cycle is used if the version is at or after its start.
    pub fn get_review_status(
        &self,
        asset_uuid: &str,
        version_label: &str,
        version_group_id: Option<&str>,
    ) -> Result<ReviewStatus> {
        let mut status = ReviewStatus::default();

        let session: Option<(i64, Option<String>, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT id, review_state, cycle_id FROM review_sessions \
                 WHERE asset_uuid = ?1 AND version_label = ?2",
                params![asset_uuid, version_label],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| anyhow!("Failed to read session status: {}", e))?;

        if let Some((_, review_state, cycle_id)) = &session {
            status.review_state = review_state.clone();
            if let Some(cycle_id) = cycle_id {
                status.cycle_id = Some(*cycle_id);
                status.is_in_cycle = true;
                if let Some(cycle) = self.cycle_info(*cycle_id)? {
                    status.cycle_type = Some(cycle.cycle_type);
                    status.cycle_start = Some(cycle.start_version);
                    status.review_state = cycle.review_state;
                }
            }
        }

        if !status.is_in_cycle {
            if let Some(group_id) = version_group_id {
                if let Some(cycle) = self.active_cycle_info(group_id)? {
                    // version labels are zero padded, so text order is version order
                    if version_label >= cycle.start_version.as_str() {
                        status.cycle_id = Some(cycle.id);
                        status.cycle_type = Some(cycle.cycle_type);
                        status.cycle_start = Some(cycle.start_version);
                        status.review_state = cycle.review_state;
                        status.is_in_cycle = true;
                    }
                }
            }
        }

        if let Some((session_id, _, _)) = session {
            let sql = format!(
                "SELECT {} FROM review_notes n WHERE n.session_id = ?1 AND COALESCE(n.deleted, 0) = 0",
                NoteCounts::SELECT
            );
            let counts = self
                .conn
                .query_row(&sql, params![session_id], NoteCounts::from_row)
                .map_err(|e| anyhow!("Failed to count notes: {}", e))?;
            status.has_notes = counts.total > 0;
            status.has_open_notes = counts.open > 0;
            status.note_counts = counts;
        }

        Ok(status)
    }

    /// Status for many versions at once, keyed `"{asset_uuid}:{version_label}"`
    pub fn get_review_status_batch(
        &self,
        asset_versions: &[(String, String)],
    ) -> Result<HashMap<String, ReviewStatus>> {
        asset_versions
            .iter()
            .map(|(asset_uuid, version_label)| {
                let status = self.get_review_status(asset_uuid, version_label, None)?;
                Ok((format!("{}:{}", asset_uuid, version_label), status))
            })
            .collect()
    }

    /// Versions with open notes, most recently active first
    pub fn get_assets_with_open_notes(&self) -> Result<Vec<AssetNoteSummary>> {
        self.versions_with_note_status("open")
    }

    /// Versions with addressed notes waiting for approval
    pub fn get_assets_awaiting_approval(&self) -> Result<Vec<AssetNoteSummary>> {
        self.versions_with_note_status("addressed")
    }

    fn versions_with_note_status(&self, note_status: &str) -> Result<Vec<AssetNoteSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT s.asset_uuid, s.version_label, s.review_state, COUNT(n.id) AS note_count
                FROM review_sessions s
                JOIN review_notes n ON n.session_id = s.id
                WHERE n.note_status = ?1 AND COALESCE(n.deleted, 0) = 0
                GROUP BY s.id
                ORDER BY s.last_activity DESC, s.id DESC
                "#,
            )
            .map_err(|e| anyhow!("Failed to prepare note summary query: {}", e))?;
        let rows = stmt
            .query_map(params![note_status], AssetNoteSummary::from_row)
            .map_err(|e| anyhow!("Failed to query {} notes: {}", note_status, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read {} notes: {}", note_status, e))?;
        Ok(rows)
    }

    fn cycle_info(&self, cycle_id: i64) -> Result<Option<CycleInfo>> {
        self.conn
            .query_row(
                "SELECT id, cycle_type, start_version, review_state FROM review_cycles WHERE id = ?1",
                params![cycle_id],
                CycleInfo::from_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to read cycle {}: {}", cycle_id, e))
    }

    fn active_cycle_info(&self, asset_id: &str) -> Result<Option<CycleInfo>> {
        self.conn
            .query_row(
                "SELECT id, cycle_type, start_version, review_state FROM review_cycles \
                 WHERE asset_id = ?1 AND end_version IS NULL \
                 ORDER BY created_date DESC, id DESC LIMIT 1",
                params![asset_id],
                CycleInfo::from_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to read active cycle of {}: {}", asset_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{DatabaseConn, SchemaManager};
    use crate::database::review::cycles::{CycleRepository, DEFAULT_VARIANT_NAME};
    use crate::database::review::notes::NoteRepository;
    use crate::database::review::sessions::SessionRepository;
    use crate::database::review::state::StateRepository;
    use crate::database::review::types::{ReviewState, UserRole};

    fn create_test_db() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaManager::new(&db.conn).initialize().unwrap();
        db
    }

    #[test]
    fn test_status_without_session() {
        let db = create_test_db();
        let status = StatusRepository::new(&db.conn)
            .get_review_status("missing", "v001", None)
            .unwrap();
        assert_eq!(status, ReviewStatus::default());
    }

    #[test]
    fn test_status_counts_and_session_state() {
        let db = create_test_db();
        let notes = NoteRepository::new(&db.conn);
        let open = notes
            .add_note("a1", "v001", "fix uv", None, "lead", UserRole::Lead)
            .unwrap();
        notes
            .add_note("a1", "v001", "bevel", None, "lead", UserRole::Lead)
            .unwrap();
        notes.mark_note_addressed(open, "artist");
        StateRepository::new(&db.conn).set_review_state("a1", "v001", ReviewState::InProgress, "artist");

        let status = StatusRepository::new(&db.conn)
            .get_review_status("a1", "v001", None)
            .unwrap();
        assert_eq!(status.review_state.as_deref(), Some("in_progress"));
        assert_eq!(status.note_counts.open, 1);
        assert_eq!(status.note_counts.addressed, 1);
        assert_eq!(status.note_counts.total, 2);
        assert!(status.has_notes);
        assert!(status.has_open_notes);
        assert!(!status.is_in_cycle);
    }

    #[test]
    fn test_cycle_state_wins() {
        let db = create_test_db();
        let cycles = CycleRepository::new(&db.conn);
        let cycle_id = cycles
            .create_cycle("family", "modeling", "v002", "lead", DEFAULT_VARIANT_NAME)
            .unwrap();
        cycles.set_cycle_state(cycle_id, ReviewState::Approved);

        let session_id = SessionRepository::new(&db.conn)
            .get_or_create_session("a1", "v002")
            .unwrap();
        StateRepository::new(&db.conn).set_review_state("a1", "v002", ReviewState::InProgress, "");
        cycles.link_session_to_cycle(session_id, cycle_id);

        let status = StatusRepository::new(&db.conn)
            .get_review_status("a1", "v002", None)
            .unwrap();
        assert_eq!(status.cycle_id, Some(cycle_id));
        assert_eq!(status.cycle_type.as_deref(), Some("modeling"));
        assert_eq!(status.review_state.as_deref(), Some("approved"));
    }

    #[test]
    fn test_active_cycle_fallback_respects_start() {
        let db = create_test_db();
        let cycle_id = CycleRepository::new(&db.conn)
            .create_cycle("family", "texturing", "v003", "lead", DEFAULT_VARIANT_NAME)
            .unwrap();
        let repo = StatusRepository::new(&db.conn);

        let before = repo.get_review_status("a1", "v002", Some("family")).unwrap();
        assert!(!before.is_in_cycle);

        let after = repo.get_review_status("a1", "v004", Some("family")).unwrap();
        assert!(after.is_in_cycle);
        assert_eq!(after.cycle_id, Some(cycle_id));
        assert_eq!(after.cycle_start.as_deref(), Some("v003"));
        assert_eq!(after.review_state.as_deref(), Some("needs_review"));
    }

    #[test]
    fn test_batch_and_summaries() {
        let db = create_test_db();
        let notes = NoteRepository::new(&db.conn);
        notes.add_note("a1", "v001", "open", None, "lead", UserRole::Lead);
        let n = notes
            .add_note("a2", "v001", "addressed", None, "lead", UserRole::Lead)
            .unwrap();
        notes.mark_note_addressed(n, "artist");

        let repo = StatusRepository::new(&db.conn);
        let batch = repo
            .get_review_status_batch(&[
                ("a1".to_string(), "v001".to_string()),
                ("a2".to_string(), "v001".to_string()),
            ])
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch["a1:v001"].has_open_notes);
        assert!(!batch["a2:v001"].has_open_notes);

        let open = repo.get_assets_with_open_notes().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].asset_uuid, "a1");
        let awaiting = repo.get_assets_awaiting_approval().unwrap();
        assert_eq!(awaiting.len(), 1);
        assert_eq!(awaiting[0].asset_uuid, "a2");
        assert_eq!(awaiting[0].note_count, 1);
    }
}
