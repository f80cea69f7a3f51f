//! Append-only audit log of note activity

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::database::core::{optional_column, OrWarn};

/// Default page size for [`AuditRepository::get_audit_log`]
pub const DEFAULT_AUDIT_LIMIT: u32 = 100;

/// Default page size for [`AuditRepository::get_recent_activity`]
pub const DEFAULT_ACTIVITY_LIMIT: u32 = 50;

/// An audit log row
///
/// `note_text`, `asset_uuid` and `version_label` are only filled by
/// [`AuditRepository::get_recent_activity`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub note_id: Option<i64>,
    pub action: String,
    pub actor: String,
    pub actor_role: Option<String>,
    pub timestamp: Option<String>,
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,
}

impl AuditLogEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AuditLogEntry {
            id: row.get("id")?,
            note_id: row.get("note_id")?,
            action: row.get("action")?,
            actor: row.get("actor")?,
            actor_role: row.get("actor_role")?,
            timestamp: row.get("timestamp")?,
            details: row.get("details")?,
            note_text: optional_column(row, "note_text")?,
            asset_uuid: optional_column(row, "asset_uuid")?,
            version_label: optional_column(row, "version_label")?,
        })
    }
}

/// Repository for the note audit log
pub struct AuditRepository<'a> {
    conn: &'a Connection,
}

impl<'a> AuditRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Record an action (`add`, `edit`, `delete`, `status_change`, ...)
    pub fn log_action(
        &self,
        note_id: Option<i64>,
        action: &str,
        actor: &str,
        actor_role: &str,
        details: Option<&str>,
    ) -> Option<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO review_audit_log (note_id, action, actor, actor_role, details)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![note_id, action, actor, actor_role, details],
            )
            .map(|_| self.conn.last_insert_rowid())
            .or_warn(&format!("log audit action {}", action))
    }

    /// Newest entries, optionally for one note
    pub fn get_audit_log(&self, note_id: Option<i64>, limit: u32) -> Result<Vec<AuditLogEntry>> {
        self.query_entries(
            r#"
            SELECT * FROM review_audit_log
            WHERE (?1 IS NULL OR note_id = ?1)
            ORDER BY timestamp DESC, id DESC
            LIMIT ?2
            "#,
            params![note_id, limit],
        )
    }

    /// Newest entries across all notes, with note text and version context
    pub fn get_recent_activity(&self, limit: u32, actor: Option<&str>) -> Result<Vec<AuditLogEntry>> {
        self.query_entries(
            r#"
            SELECT a.*, n.note AS note_text, s.asset_uuid AS asset_uuid,
                   s.version_label AS version_label
            FROM review_audit_log a
            LEFT JOIN review_notes n ON a.note_id = n.id
            LEFT JOIN review_sessions s ON n.session_id = s.id
            WHERE (?1 IS NULL OR a.actor = ?1)
            ORDER BY a.timestamp DESC, a.id DESC
            LIMIT ?2
            "#,
            params![actor, limit],
        )
    }

    fn query_entries<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<AuditLogEntry>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare audit query: {}", e))?;
        let entries = stmt
            .query_map(params, AuditLogEntry::from_row)
            .map_err(|e| anyhow!("Failed to query audit log: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read audit log: {}", e))?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{DatabaseConn, SchemaManager};
    use crate::database::review::notes::NoteRepository;
    use crate::database::review::types::UserRole;

    fn create_test_db() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaManager::new(&db.conn).initialize().unwrap();
        db
    }

    #[test]
    fn test_log_and_filter_by_note() {
        let db = create_test_db();
        let notes = NoteRepository::new(&db.conn);
        let repo = AuditRepository::new(&db.conn);
        let note = notes.add_note("asset-1", "v001", "a", None, "lead", UserRole::Lead).unwrap();

        repo.log_action(Some(note), "add", "lead", "lead", None).unwrap();
        repo.log_action(Some(note), "status_change", "artist", "artist", Some("open -> addressed"))
            .unwrap();
        repo.log_action(None, "settings", "admin", "admin", None).unwrap();

        let for_note = repo.get_audit_log(Some(note), DEFAULT_AUDIT_LIMIT).unwrap();
        assert_eq!(for_note.len(), 2);
        assert_eq!(for_note[0].action, "status_change");
        assert_eq!(repo.get_audit_log(None, DEFAULT_AUDIT_LIMIT).unwrap().len(), 3);
        assert_eq!(repo.get_audit_log(None, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_recent_activity_joins_context() {
        let db = create_test_db();
        let notes = NoteRepository::new(&db.conn);
        let repo = AuditRepository::new(&db.conn);
        let note = notes.add_note("asset-1", "v002", "bevel", None, "lead", UserRole::Lead).unwrap();
        repo.log_action(Some(note), "add", "lead", "lead", None).unwrap();
        repo.log_action(None, "login", "artist", "artist", None).unwrap();

        let by_lead = repo.get_recent_activity(DEFAULT_ACTIVITY_LIMIT, Some("lead")).unwrap();
        assert_eq!(by_lead.len(), 1);
        assert_eq!(by_lead[0].note_text.as_deref(), Some("bevel"));
        assert_eq!(by_lead[0].asset_uuid.as_deref(), Some("asset-1"));
        assert_eq!(by_lead[0].version_label.as_deref(), Some("v002"));

        let all = repo.get_recent_activity(DEFAULT_ACTIVITY_LIMIT, None).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].note_text.is_none());
    }

    #[test]
    fn test_hard_delete_removes_entries() {
        let db = create_test_db();
        let notes = NoteRepository::new(&db.conn);
        let repo = AuditRepository::new(&db.conn);
        let note = notes.add_note("asset-1", "v001", "a", None, "lead", UserRole::Lead).unwrap();
        repo.log_action(Some(note), "add", "lead", "lead", None).unwrap();

        assert!(notes.hard_delete_note(note));
        assert!(repo.get_audit_log(Some(note), DEFAULT_AUDIT_LIMIT).unwrap().is_empty());
    }
}
