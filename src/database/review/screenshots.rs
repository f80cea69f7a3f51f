//! Review screenshots attached to a session
//!
//! Display order is append-only (`max + 1`, starting at 0) unless the caller
//! reorders explicitly. Deleting a screenshot detaches its notes and drops its
//! drawover metadata through the foreign keys.

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::database::core::OrWarn;

use super::sessions::{ensure_session, find_session_id, touch_session};

/// A review screenshot record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewScreenshot {
    pub id: i64,
    pub session_id: i64,
    pub filename: String,
    pub display_name: String,
    pub file_path: String,
    pub display_order: i64,
    pub uploaded_by: Option<String>,
    pub uploaded_date: Option<String>,
}

impl ReviewScreenshot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let filename: String = row.get("filename")?;
        Ok(ReviewScreenshot {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            display_name: row
                .get::<_, Option<String>>("display_name")?
                .unwrap_or_else(|| filename.clone()),
            filename,
            file_path: row.get("file_path")?,
            display_order: row.get::<_, Option<i64>>("display_order")?.unwrap_or(0),
            uploaded_by: row.get("uploaded_by")?,
            uploaded_date: row.get("uploaded_date")?,
        })
    }
}

/// Repository for review screenshot operations
pub struct ScreenshotRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ScreenshotRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append a screenshot to the version, creating the session if needed
    ///
    /// An empty `display_name` falls back to `filename`.
    pub fn add_screenshot(
        &self,
        asset_uuid: &str,
        version_label: &str,
        filename: &str,
        file_path: &str,
        display_name: &str,
        uploaded_by: &str,
    ) -> Option<i64> {
        let insert = || -> rusqlite::Result<i64> {
            let session_id = ensure_session(self.conn, asset_uuid, version_label)?;
            let display_order = next_order(self.conn, session_id)?;
            let display_name = if display_name.is_empty() {
                filename
            } else {
                display_name
            };
            self.conn.execute(
                r#"
                INSERT INTO review_screenshots
                    (session_id, filename, file_path, display_name, display_order, uploaded_by)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    session_id,
                    filename,
                    file_path,
                    display_name,
                    display_order,
                    uploaded_by
                ],
            )?;
            let screenshot_id = self.conn.last_insert_rowid();
            touch_session(self.conn, session_id)?;
            Ok(screenshot_id)
        };
        insert().or_warn(&format!(
            "add screenshot {} to {}:{}",
            filename, asset_uuid, version_label
        ))
    }

    /// Order the next screenshot of this version would get
    pub fn next_display_order(&self, asset_uuid: &str, version_label: &str) -> Result<i64> {
        match find_session_id(self.conn, asset_uuid, version_label)
            .map_err(|e| anyhow!("Failed to look up session: {}", e))?
        {
            Some(session_id) => next_order(self.conn, session_id)
                .map_err(|e| anyhow!("Failed to compute display order: {}", e)),
            None => Ok(0),
        }
    }

    /// Screenshots of one version in display order
    pub fn get_screenshots(&self, asset_uuid: &str, version_label: &str) -> Result<Vec<ReviewScreenshot>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT sc.*
                FROM review_screenshots sc
                JOIN review_sessions s ON sc.session_id = s.id
                WHERE s.asset_uuid = ?1 AND s.version_label = ?2
                ORDER BY sc.display_order ASC, sc.id ASC
                "#,
            )
            .map_err(|e| anyhow!("Failed to prepare screenshot query: {}", e))?;
        let screenshots = stmt
            .query_map(params![asset_uuid, version_label], ReviewScreenshot::from_row)
            .map_err(|e| anyhow!("Failed to query screenshots: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read screenshots: {}", e))?;
        Ok(screenshots)
    }

    pub fn get_screenshot_by_id(&self, screenshot_id: i64) -> Result<Option<ReviewScreenshot>> {
        self.conn
            .query_row(
                "SELECT * FROM review_screenshots WHERE id = ?1",
                params![screenshot_id],
                ReviewScreenshot::from_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to get screenshot {}: {}", screenshot_id, e))
    }

    /// Update the display name and/or order; with nothing to change it is a no-op success
    pub fn update_screenshot(
        &self,
        screenshot_id: i64,
        display_name: Option<&str>,
        display_order: Option<i64>,
    ) -> bool {
        if display_name.is_none() && display_order.is_none() {
            return true;
        }
        self.conn
            .execute(
                r#"
                UPDATE review_screenshots
                SET display_name = COALESCE(?1, display_name),
                    display_order = COALESCE(?2, display_order)
                WHERE id = ?3
                "#,
                params![display_name, display_order, screenshot_id],
            )
            .or_warn(&format!("update screenshot {}", screenshot_id))
            .is_some_and(|n| n > 0)
    }

    pub fn delete_screenshot(&self, screenshot_id: i64) -> bool {
        self.conn
            .execute(
                "DELETE FROM review_screenshots WHERE id = ?1",
                params![screenshot_id],
            )
            .or_warn(&format!("delete screenshot {}", screenshot_id))
            .is_some_and(|n| n > 0)
    }

    /// Renumber the version's screenshots 0..n in the given order
    ///
    /// Ids that do not belong to this version are ignored.
    pub fn reorder_screenshots(&self, asset_uuid: &str, version_label: &str, screenshot_ids: &[i64]) -> bool {
        let reorder = || -> rusqlite::Result<()> {
            let tx = self.conn.unchecked_transaction()?;
            for (order, screenshot_id) in screenshot_ids.iter().enumerate() {
                tx.execute(
                    r#"
                    UPDATE review_screenshots SET display_order = ?1
                    WHERE id = ?2 AND session_id = (
                        SELECT id FROM review_sessions WHERE asset_uuid = ?3 AND version_label = ?4
                    )
                    "#,
                    params![order as i64, screenshot_id, asset_uuid, version_label],
                )?;
            }
            tx.commit()
        };
        reorder()
            .or_warn(&format!("reorder screenshots of {}:{}", asset_uuid, version_label))
            .is_some()
    }
}

fn next_order(conn: &Connection, session_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(display_order), -1) + 1 FROM review_screenshots WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )
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
    fn test_display_order_appends_from_zero() {
        let db = create_test_db();
        let repo = ScreenshotRepository::new(&db.conn);
        assert_eq!(repo.next_display_order("asset-1", "v001").unwrap(), 0);

        repo.add_screenshot("asset-1", "v001", "000_front.png", "/r/000_front.png", "Front", "blender")
            .unwrap();
        repo.add_screenshot("asset-1", "v001", "001_side.png", "/r/001_side.png", "", "blender")
            .unwrap();

        let shots = repo.get_screenshots("asset-1", "v001").unwrap();
        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].display_order, 0);
        assert_eq!(shots[1].display_order, 1);
        assert_eq!(shots[1].display_name, "001_side.png");
        assert_eq!(repo.next_display_order("asset-1", "v001").unwrap(), 2);
    }

    #[test]
    fn test_update_and_reorder() {
        let db = create_test_db();
        let repo = ScreenshotRepository::new(&db.conn);
        let a = repo.add_screenshot("asset-1", "v001", "a.png", "/r/a.png", "A", "").unwrap();
        let b = repo.add_screenshot("asset-1", "v001", "b.png", "/r/b.png", "B", "").unwrap();
        let other = repo.add_screenshot("asset-2", "v001", "c.png", "/r/c.png", "C", "").unwrap();

        assert!(repo.update_screenshot(a, Some("Alpha"), None));
        assert!(repo.update_screenshot(a, None, None));
        assert_eq!(repo.get_screenshot_by_id(a).unwrap().unwrap().display_name, "Alpha");

        assert!(repo.reorder_screenshots("asset-1", "v001", &[b, a, other]));
        let ids: Vec<i64> = repo
            .get_screenshots("asset-1", "v001")
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![b, a]);
        // other version untouched
        assert_eq!(repo.get_screenshot_by_id(other).unwrap().unwrap().display_order, 0);
    }

    #[test]
    fn test_delete_detaches_notes() {
        let db = create_test_db();
        let repo = ScreenshotRepository::new(&db.conn);
        let notes = NoteRepository::new(&db.conn);
        let shot = repo.add_screenshot("asset-1", "v001", "a.png", "/r/a.png", "A", "").unwrap();
        let note = notes
            .add_note("asset-1", "v001", "on shot", Some(shot), "lead", UserRole::Lead)
            .unwrap();

        assert!(repo.delete_screenshot(shot));
        assert!(!repo.delete_screenshot(shot));

        let note = notes.get_note_by_id(note).unwrap().unwrap();
        assert_eq!(note.screenshot_id, None);
        assert!(repo.get_screenshots("asset-1", "v001").unwrap().is_empty());
    }
}
