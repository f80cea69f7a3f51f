//! Consumer for `review_screenshot` messages
//!
//! Each pending file is validated, its image copied into the review storage tree,
//! and a screenshot row registered for the version. A handled file and its temp image
//! are removed; a file that fails is rewritten as `failed` and left for an operator.

use anyhow::{anyhow, Result};
use chrono::Local;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::message::{get_field_str, validate_message, QueueMessage};
use super::schema::message_def;
use super::{QueueStatus, DEFAULT_VARIANT_NAME, DEFAULT_VERSION_LABEL, MSG_REVIEW_SCREENSHOT};
use crate::database::ReviewDatabase;
use crate::storage::{ReviewFileStore, ReviewLocation};

/// A queue file waiting to be handled
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub path: PathBuf,
    pub message: QueueMessage,
}

pub struct ScreenshotQueueHandler<'a> {
    queue_dir: PathBuf,
    store: ReviewFileStore,
    db: &'a ReviewDatabase,
}

impl<'a> ScreenshotQueueHandler<'a> {
    pub fn new(queue_dir: impl Into<PathBuf>, store: ReviewFileStore, db: &'a ReviewDatabase) -> Self {
        ScreenshotQueueHandler {
            queue_dir: queue_dir.into(),
            store,
            db,
        }
    }

    pub fn queue_dir(&self) -> &Path {
        &self.queue_dir
    }

    /// Screenshot files not yet claimed, oldest first
    ///
    /// A file without a `status` is treated as pending.
    pub fn pending_requests(&self) -> Vec<PendingRequest> {
        let Some(def) = message_def(MSG_REVIEW_SCREENSHOT) else {
            return vec![];
        };
        let entries = match fs::read_dir(&self.queue_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("queue directory {:?} not readable: {}", self.queue_dir, e);
                return vec![];
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|n| def.matches_file(&n.to_string_lossy()))
            })
            .collect();
        paths.sort();

        paths
            .into_iter()
            .filter_map(|path| match QueueMessage::read_from(&path) {
                Ok(message) => Some(PendingRequest { path, message }),
                Err(e) => {
                    warn!("skipping unreadable queue file: {}", e);
                    None
                }
            })
            .filter(|request| {
                request.message.status() == Some(QueueStatus::Pending)
                    && request.message.message_type() == Some(MSG_REVIEW_SCREENSHOT)
            })
            .collect()
    }

    /// Handle every pending request, returning how many succeeded
    pub fn process_all_pending(&self) -> usize {
        let processed = self
            .pending_requests()
            .iter()
            .filter(|request| self.process_request(request))
            .count();
        if processed > 0 {
            info!("processed {} review screenshots", processed);
        }
        processed
    }

    /// Handle one request; on failure the queue file is marked `failed`
    pub fn process_request(&self, request: &PendingRequest) -> bool {
        match self.import_screenshot(request) {
            Ok(screenshot_id) => {
                info!(
                    "imported review screenshot {} from {:?}",
                    screenshot_id, request.path
                );
                true
            }
            Err(e) => {
                warn!("failed to process {:?}: {}", request.path, e);
                self.mark_failed(request, &e.to_string());
                false
            }
        }
    }

    fn import_screenshot(&self, request: &PendingRequest) -> Result<i64> {
        let message = &request.message;
        validate_message(message, Some(MSG_REVIEW_SCREENSHOT))?;

        let session_key = get_field_str(message, "session_identifier")
            .ok_or_else(|| anyhow!("Failed to resolve asset identifier"))?;
        let storage_key = get_field_str(message, "storage_identifier").unwrap_or(session_key);
        let version_label = message
            .get_str("version_label")
            .unwrap_or(DEFAULT_VERSION_LABEL);
        let source_path = message
            .get_str("screenshot_path")
            .ok_or_else(|| anyhow!("Failed to resolve screenshot path"))?;
        let display_name = message.get_str("display_name").unwrap_or("Screenshot");
        let asset_name = message.get_str("asset_name").unwrap_or("Asset");
        let variant_name = message
            .get_str("variant_name")
            .unwrap_or(DEFAULT_VARIANT_NAME);
        let uploaded_by = message.get_str("source").unwrap_or("blender");

        let source = Path::new(source_path);
        if !source.is_file() {
            return Err(anyhow!("Screenshot file not found: {}", source_path));
        }

        let order = self.db.next_display_order(session_key, version_label)?;
        let location = ReviewLocation::new(storage_key, asset_name, variant_name, version_label);
        let saved = self.store.save_screenshot(
            &location,
            source,
            display_name,
            u32::try_from(order).unwrap_or(0),
        )?;

        let Some(screenshot_id) = self.db.add_screenshot(
            session_key,
            version_label,
            &saved.filename,
            &saved.file_path,
            &saved.display_name,
            uploaded_by,
        ) else {
            let _ = fs::remove_file(&saved.file_path);
            return Err(anyhow!(
                "Failed to register screenshot {} in the database",
                saved.filename
            ));
        };

        if let Err(e) = fs::remove_file(&request.path) {
            warn!("failed to remove queue file {:?}: {}", request.path, e);
        }
        if let Err(e) = fs::remove_file(source) {
            debug!("temp screenshot {:?} not removed: {}", source, e);
        }
        Ok(screenshot_id)
    }

    fn mark_failed(&self, request: &PendingRequest, error: &str) {
        let mut message = request.message.clone();
        message.set_status(QueueStatus::Failed);
        message.insert("error", Value::String(error.to_string()));
        message.insert(
            "failed_at",
            Value::String(Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
        );
        if let Err(e) = message.write_to(&request.path) {
            warn!("failed to mark {:?} as failed: {}", request.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixture {
        _dir: tempfile::TempDir,
        queue_dir: PathBuf,
        reviews_dir: PathBuf,
        temp_image: PathBuf,
        db: ReviewDatabase,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let queue_dir = dir.path().join("queue");
        let reviews_dir = dir.path().join("reviews");
        fs::create_dir_all(&queue_dir).unwrap();
        let temp_image = dir.path().join("capture.png");
        fs::write(&temp_image, b"png-bytes").unwrap();
        Fixture {
            queue_dir,
            reviews_dir,
            temp_image,
            db: ReviewDatabase::open_in_memory().unwrap(),
            _dir: dir,
        }
    }

    fn write_request(fx: &Fixture, screenshot_path: &Path) -> PathBuf {
        let path = fx.queue_dir.join("screenshot_20240101_120000_000001.json");
        let message = json!({
            "type": "review_screenshot",
            "asset_uuid": "abc-123",
            "version_label": "v001",
            "display_name": "Face",
            "screenshot_path": screenshot_path.to_string_lossy(),
        });
        fs::write(&path, serde_json::to_string_pretty(&message).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_process_screenshot_end_to_end() {
        let fx = fixture();
        let queue_file = write_request(&fx, &fx.temp_image);
        let handler =
            ScreenshotQueueHandler::new(&fx.queue_dir, ReviewFileStore::new(&fx.reviews_dir), &fx.db);

        assert_eq!(handler.pending_requests().len(), 1);
        assert_eq!(handler.process_all_pending(), 1);

        let shots = fx.db.get_screenshots("abc-123", "v001").unwrap();
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].filename, "000_Face.png");
        assert_eq!(shots[0].display_name, "Face");
        assert!(Path::new(&shots[0].file_path).is_file());

        assert!(!queue_file.exists());
        assert!(!fx.temp_image.exists());
        assert!(handler.pending_requests().is_empty());
    }

    #[test]
    fn test_missing_image_marks_failed() {
        let fx = fixture();
        let missing = fx.queue_dir.join("gone.png");
        let queue_file = write_request(&fx, &missing);
        let handler =
            ScreenshotQueueHandler::new(&fx.queue_dir, ReviewFileStore::new(&fx.reviews_dir), &fx.db);

        assert_eq!(handler.process_all_pending(), 0);

        let message = QueueMessage::read_from(&queue_file).unwrap();
        assert_eq!(message.status(), Some(QueueStatus::Failed));
        assert!(message.get_str("error").is_some());
        assert!(message.get_str("failed_at").is_some());
        assert!(fx.db.get_screenshots("abc-123", "v001").unwrap().is_empty());

        // failed files are not retried
        assert!(handler.pending_requests().is_empty());
    }

    #[test]
    fn test_invalid_message_marks_failed() {
        let fx = fixture();
        let path = fx.queue_dir.join("screenshot_20240101_120000_000002.json");
        fs::write(&path, r#"{"type": "review_screenshot", "status": "pending"}"#).unwrap();
        let handler =
            ScreenshotQueueHandler::new(&fx.queue_dir, ReviewFileStore::new(&fx.reviews_dir), &fx.db);

        assert_eq!(handler.process_all_pending(), 0);
        let message = QueueMessage::read_from(&path).unwrap();
        assert_eq!(message.status(), Some(QueueStatus::Failed));
        assert!(message.get_str("error").unwrap().contains("asset_uuid"));
    }

    #[test]
    fn test_skips_other_statuses_and_types() {
        let fx = fixture();
        fs::write(
            fx.queue_dir.join("screenshot_1.json"),
            r#"{"type": "review_screenshot", "status": "processing"}"#,
        )
        .unwrap();
        fs::write(
            fx.queue_dir.join("import_1.json"),
            r#"{"type": "import_asset"}"#,
        )
        .unwrap();
        let handler =
            ScreenshotQueueHandler::new(&fx.queue_dir, ReviewFileStore::new(&fx.reviews_dir), &fx.db);
        assert!(handler.pending_requests().is_empty());
    }
}
