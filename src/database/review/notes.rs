//! Review notes and their three-state workflow
//!
//! Status changes write the status and its actor/timestamp columns in a single
//! UPDATE. The legacy `resolved` flag is kept in step with `approved`.

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::database::core::{optional_column, OrWarn};

use super::sessions::{ensure_session, touch_session};
use super::types::{NoteCounts, NoteStatus, UserRole};

/// A review note record
///
/// `screenshot_name` and `version_label` are filled by queries that join them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewNote {
    pub id: i64,
    pub session_id: i64,
    pub screenshot_id: Option<i64>,
    pub note: String,
    pub author: String,
    pub author_role: UserRole,
    pub created_date: Option<String>,
    pub modified_date: Option<String>,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_date: Option<String>,
    pub note_status: NoteStatus,
    pub addressed_by: Option<String>,
    pub addressed_date: Option<String>,
    pub approved_by: Option<String>,
    pub approved_date: Option<String>,
    pub deleted: bool,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,
}

impl ReviewNote {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ReviewNote {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            screenshot_id: row.get("screenshot_id")?,
            note: row.get("note")?,
            author: row.get::<_, Option<String>>("author")?.unwrap_or_default(),
            author_role: row.get("author_role")?,
            created_date: row.get("created_date")?,
            modified_date: row.get("modified_date")?,
            resolved: row.get::<_, Option<bool>>("resolved")?.unwrap_or(false),
            resolved_by: row.get("resolved_by")?,
            resolved_date: row.get("resolved_date")?,
            note_status: row.get("note_status")?,
            addressed_by: row.get("addressed_by")?,
            addressed_date: row.get("addressed_date")?,
            approved_by: row.get("approved_by")?,
            approved_date: row.get("approved_date")?,
            deleted: row.get::<_, Option<bool>>("deleted")?.unwrap_or(false),
            deleted_by: row.get("deleted_by")?,
            deleted_at: row.get("deleted_at")?,
            screenshot_name: optional_column(row, "screenshot_name")?,
            version_label: optional_column(row, "version_label")?,
        })
    }
}

/// Repository for review note operations
pub struct NoteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> NoteRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query_notes<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<ReviewNote>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare note query: {}", e))?;
        let notes = stmt
            .query_map(params, ReviewNote::from_row)
            .map_err(|e| anyhow!("Failed to query notes: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read notes: {}", e))?;
        Ok(notes)
    }

    /// Notes of one version: general notes first, then by screenshot, then creation
    pub fn get_notes_for_version(
        &self,
        asset_uuid: &str,
        version_label: &str,
        include_deleted: bool,
    ) -> Result<Vec<ReviewNote>> {
        let deleted_filter = if include_deleted {
            ""
        } else {
            "AND COALESCE(n.deleted, 0) = 0"
        };
        let sql = format!(
            r#"
            SELECT n.*, sc.display_name AS screenshot_name
            FROM review_notes n
            JOIN review_sessions s ON n.session_id = s.id
            LEFT JOIN review_screenshots sc ON n.screenshot_id = sc.id
            WHERE s.asset_uuid = ?1 AND s.version_label = ?2 {}
            ORDER BY n.screenshot_id ASC NULLS FIRST, n.created_date ASC, n.id ASC
            "#,
            deleted_filter
        );
        self.query_notes(&sql, params![asset_uuid, version_label])
    }

    /// Notes pinned to one screenshot, oldest first
    pub fn get_notes_for_screenshot(
        &self,
        screenshot_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<ReviewNote>> {
        let deleted_filter = if include_deleted {
            ""
        } else {
            "AND COALESCE(n.deleted, 0) = 0"
        };
        let sql = format!(
            r#"
            SELECT n.*, sc.display_name AS screenshot_name
            FROM review_notes n
            LEFT JOIN review_screenshots sc ON n.screenshot_id = sc.id
            WHERE n.screenshot_id = ?1 {}
            ORDER BY n.created_date ASC, n.id ASC
            "#,
            deleted_filter
        );
        self.query_notes(&sql, params![screenshot_id])
    }

    /// Add a note, creating the version's session if needed
    pub fn add_note(
        &self,
        asset_uuid: &str,
        version_label: &str,
        text: &str,
        screenshot_id: Option<i64>,
        author: &str,
        author_role: UserRole,
    ) -> Option<i64> {
        let insert = || -> rusqlite::Result<i64> {
            let session_id = ensure_session(self.conn, asset_uuid, version_label)?;
            self.conn.execute(
                r#"
                INSERT INTO review_notes (session_id, screenshot_id, note, author, author_role)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![session_id, screenshot_id, text, author, author_role],
            )?;
            let note_id = self.conn.last_insert_rowid();
            touch_session(self.conn, session_id)?;
            Ok(note_id)
        };
        insert().or_warn(&format!("add note to {}:{}", asset_uuid, version_label))
    }

    pub fn update_note(&self, note_id: i64, text: &str) -> bool {
        self.execute_update(
            "UPDATE review_notes SET note = ?1, modified_date = CURRENT_TIMESTAMP WHERE id = ?2",
            params![text, note_id],
            "update note",
        )
    }

    /// Get a note by id, deleted or not
    pub fn get_note_by_id(&self, note_id: i64) -> Result<Option<ReviewNote>> {
        self.conn
            .query_row(
                r#"
                SELECT n.*, sc.display_name AS screenshot_name
                FROM review_notes n
                LEFT JOIN review_screenshots sc ON n.screenshot_id = sc.id
                WHERE n.id = ?1
                "#,
                params![note_id],
                ReviewNote::from_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to get note {}: {}", note_id, e))
    }

    pub fn soft_delete_note(&self, note_id: i64, deleted_by: &str) -> bool {
        self.execute_update(
            "UPDATE review_notes SET deleted = 1, deleted_by = ?1, deleted_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![deleted_by, note_id],
            "soft delete note",
        )
    }

    pub fn restore_note(&self, note_id: i64) -> bool {
        self.execute_update(
            "UPDATE review_notes SET deleted = 0, deleted_by = NULL, deleted_at = NULL WHERE id = ?1",
            params![note_id],
            "restore note",
        )
    }

    /// Alias of [`NoteRepository::soft_delete_note`]
    pub fn delete_note(&self, note_id: i64, deleted_by: &str) -> bool {
        self.soft_delete_note(note_id, deleted_by)
    }

    /// Remove the row; its audit entries go with it
    pub fn hard_delete_note(&self, note_id: i64) -> bool {
        self.execute_update(
            "DELETE FROM review_notes WHERE id = ?1",
            params![note_id],
            "hard delete note",
        )
    }

    /// Legacy resolved flag, independent of `note_status`
    pub fn set_note_resolved(&self, note_id: i64, resolved: bool, resolved_by: &str) -> bool {
        if resolved {
            self.execute_update(
                "UPDATE review_notes SET resolved = 1, resolved_by = ?1, resolved_date = CURRENT_TIMESTAMP WHERE id = ?2",
                params![resolved_by, note_id],
                "resolve note",
            )
        } else {
            self.execute_update(
                "UPDATE review_notes SET resolved = 0, resolved_by = NULL, resolved_date = NULL WHERE id = ?1",
                params![note_id],
                "unresolve note",
            )
        }
    }

    /// Set the status from any state, writing its actor/timestamp columns
    pub fn set_note_status(&self, note_id: i64, status: NoteStatus, actor: &str) -> bool {
        match status {
            NoteStatus::Addressed => self.execute_update(
                r#"
                UPDATE review_notes
                SET note_status = 'addressed', addressed_by = ?1, addressed_date = CURRENT_TIMESTAMP
                WHERE id = ?2
                "#,
                params![actor, note_id],
                "mark note addressed",
            ),
            NoteStatus::Approved => self.execute_update(
                r#"
                UPDATE review_notes
                SET note_status = 'approved', approved_by = ?1, approved_date = CURRENT_TIMESTAMP,
                    resolved = 1, resolved_by = ?1, resolved_date = CURRENT_TIMESTAMP
                WHERE id = ?2
                "#,
                params![actor, note_id],
                "approve note",
            ),
            NoteStatus::Open => self.execute_update(
                r#"
                UPDATE review_notes
                SET note_status = 'open',
                    addressed_by = NULL, addressed_date = NULL,
                    approved_by = NULL, approved_date = NULL,
                    resolved = 0, resolved_by = NULL, resolved_date = NULL
                WHERE id = ?1
                "#,
                params![note_id],
                "reopen note",
            ),
        }
    }

    pub fn mark_note_addressed(&self, note_id: i64, addressed_by: &str) -> bool {
        self.set_note_status(note_id, NoteStatus::Addressed, addressed_by)
    }

    pub fn approve_note(&self, note_id: i64, approved_by: &str) -> bool {
        self.set_note_status(note_id, NoteStatus::Approved, approved_by)
    }

    pub fn reopen_note(&self, note_id: i64, reopened_by: &str) -> bool {
        self.set_note_status(note_id, NoteStatus::Open, reopened_by)
    }

    /// Non-deleted note counts for one version
    pub fn get_note_status_counts(&self, asset_uuid: &str, version_label: &str) -> Result<NoteCounts> {
        let sql = format!(
            r#"
            SELECT {}
            FROM review_notes n
            JOIN review_sessions s ON n.session_id = s.id
            WHERE s.asset_uuid = ?1 AND s.version_label = ?2 AND COALESCE(n.deleted, 0) = 0
            "#,
            NoteCounts::SELECT
        );
        self.conn
            .query_row(&sql, params![asset_uuid, version_label], NoteCounts::from_row)
            .map_err(|e| anyhow!("Failed to count notes: {}", e))
    }

    fn execute_update<P: rusqlite::Params>(&self, sql: &str, params: P, action: &str) -> bool {
        self.conn
            .execute(sql, params)
            .or_warn(action)
            .is_some_and(|n| n > 0)
    }
}
