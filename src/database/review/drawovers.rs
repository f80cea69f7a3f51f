//! Drawover metadata and the drawover audit trail
//!
//! Stroke content lives in JSON files managed by
//! [`ReviewFileStore`](crate::storage::ReviewFileStore); the database keeps one
//! summary row per (asset, version, screenshot).

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::database::core::{optional_column, OrWarn};

/// Default page size for the drawover audit log
pub const DEFAULT_DRAWOVER_AUDIT_LIMIT: u32 = 50;

/// Drawover summary for one screenshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawoverMetadata {
    pub id: i64,
    pub asset_uuid: String,
    pub version_label: String,
    pub screenshot_id: i64,
    pub stroke_count: i64,
    pub authors: Vec<String>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_name: Option<String>,
}

impl DrawoverMetadata {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let authors: Option<String> = row.get("authors")?;
        Ok(DrawoverMetadata {
            id: row.get("id")?,
            asset_uuid: row.get("asset_uuid")?,
            version_label: row.get("version_label")?,
            screenshot_id: row.get("screenshot_id")?,
            stroke_count: row.get::<_, Option<i64>>("stroke_count")?.unwrap_or(0),
            authors: split_authors(authors.as_deref().unwrap_or_default()),
            created_at: row.get("created_at")?,
            modified_at: row.get("modified_at")?,
            file_path: row.get("file_path")?,
            screenshot_name: optional_column(row, "screenshot_name")?,
        })
    }
}

/// Authors are stored as one comma separated column
fn split_authors(authors: &str) -> Vec<String> {
    authors
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// One drawover edit to record in the audit trail
#[derive(Debug, Clone, Default)]
pub struct DrawoverAction<'a> {
    pub asset_uuid: &'a str,
    pub version_label: &'a str,
    pub screenshot_id: i64,
    /// e.g. `add_stroke`, `delete_stroke`, `clear`
    pub action: &'a str,
    pub actor: &'a str,
    pub actor_role: &'a str,
    pub stroke_id: Option<&'a str>,
    pub details: Option<&'a str>,
}

/// A drawover audit log row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawoverAuditEntry {
    pub id: i64,
    pub asset_uuid: String,
    pub version_label: String,
    pub screenshot_id: i64,
    pub stroke_id: Option<String>,
    pub action: String,
    pub actor: String,
    pub actor_role: Option<String>,
    pub timestamp: Option<String>,
    pub details: Option<String>,
}

impl DrawoverAuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DrawoverAuditEntry {
            id: row.get("id")?,
            asset_uuid: row.get("asset_uuid")?,
            version_label: row.get("version_label")?,
            screenshot_id: row.get("screenshot_id")?,
            stroke_id: row.get("stroke_id")?,
            action: row.get("action")?,
            actor: row.get("actor")?,
            actor_role: row.get("actor_role")?,
            timestamp: row.get("timestamp")?,
            details: row.get("details")?,
        })
    }
}

/// Repository for drawover metadata and audit operations
pub struct DrawoverRepository<'a> {
    conn: &'a Connection,
}

impl<'a> DrawoverRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or refresh the summary row for a screenshot's drawover
    pub fn update_drawover_metadata(
        &self,
        asset_uuid: &str,
        version_label: &str,
        screenshot_id: i64,
        stroke_count: i64,
        authors: &[String],
        file_path: &str,
    ) -> bool {
        self.conn
            .execute(
                r#"
                INSERT INTO drawover_metadata
                    (asset_uuid, version_label, screenshot_id, stroke_count, authors, file_path, modified_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP)
                ON CONFLICT(asset_uuid, version_label, screenshot_id) DO UPDATE SET
                    stroke_count = excluded.stroke_count,
                    authors = excluded.authors,
                    file_path = excluded.file_path,
                    modified_at = CURRENT_TIMESTAMP
                "#,
                params![
                    asset_uuid,
                    version_label,
                    screenshot_id,
                    stroke_count,
                    authors.join(","),
                    file_path
                ],
            )
            .or_warn(&format!("update drawover metadata for screenshot {}", screenshot_id))
            .is_some()
    }

    pub fn get_drawover_metadata(
        &self,
        asset_uuid: &str,
        version_label: &str,
        screenshot_id: i64,
    ) -> Result<Option<DrawoverMetadata>> {
        self.conn
            .query_row(
                r#"
                SELECT * FROM drawover_metadata
                WHERE asset_uuid = ?1 AND version_label = ?2 AND screenshot_id = ?3
                "#,
                params![asset_uuid, version_label, screenshot_id],
                DrawoverMetadata::from_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to get drawover metadata: {}", e))
    }

    /// Every drawover of a version, in screenshot display order
    pub fn get_version_drawovers(&self, asset_uuid: &str, version_label: &str) -> Result<Vec<DrawoverMetadata>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT d.*, sc.display_name AS screenshot_name
                FROM drawover_metadata d
                LEFT JOIN review_screenshots sc ON d.screenshot_id = sc.id
                WHERE d.asset_uuid = ?1 AND d.version_label = ?2
                ORDER BY sc.display_order ASC, d.id ASC
                "#,
            )
            .map_err(|e| anyhow!("Failed to prepare drawover query: {}", e))?;
        let drawovers = stmt
            .query_map(params![asset_uuid, version_label], DrawoverMetadata::from_row)
            .map_err(|e| anyhow!("Failed to query drawovers: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read drawovers: {}", e))?;
        Ok(drawovers)
    }

    pub fn delete_drawover_metadata(&self, asset_uuid: &str, version_label: &str, screenshot_id: i64) -> bool {
        self.conn
            .execute(
                r#"
                DELETE FROM drawover_metadata
                WHERE asset_uuid = ?1 AND version_label = ?2 AND screenshot_id = ?3
                "#,
                params![asset_uuid, version_label, screenshot_id],
            )
            .or_warn(&format!("delete drawover metadata for screenshot {}", screenshot_id))
            .is_some_and(|n| n > 0)
    }

    /// Append a drawover edit to the audit trail
    pub fn log_drawover_action(&self, entry: &DrawoverAction<'_>) -> Option<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO drawover_audit_log
                    (asset_uuid, version_label, screenshot_id, stroke_id, action, actor, actor_role, details)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    entry.asset_uuid,
                    entry.version_label,
                    entry.screenshot_id,
                    entry.stroke_id,
                    entry.action,
                    entry.actor,
                    entry.actor_role,
                    entry.details
                ],
            )
            .map(|_| self.conn.last_insert_rowid())
            .or_warn(&format!("log drawover action {}", entry.action))
    }

    /// Newest drawover audit entries of a version, optionally for one screenshot
    pub fn get_drawover_audit_log(
        &self,
        asset_uuid: &str,
        version_label: &str,
        screenshot_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<DrawoverAuditEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT * FROM drawover_audit_log
                WHERE asset_uuid = ?1 AND version_label = ?2
                  AND (?3 IS NULL OR screenshot_id = ?3)
                ORDER BY timestamp DESC, id DESC
                LIMIT ?4
                "#,
            )
            .map_err(|e| anyhow!("Failed to prepare drawover audit query: {}", e))?;
        let entries = stmt
            .query_map(
                params![asset_uuid, version_label, screenshot_id, limit],
                DrawoverAuditEntry::from_row,
            )
            .map_err(|e| anyhow!("Failed to query drawover audit log: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read drawover audit log: {}", e))?;
        Ok(entries)
    }
}
