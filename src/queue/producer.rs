//! Desktop side of the queue: write command files for the modeling tool

use anyhow::{anyhow, Result};
use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::message::{build_message, QueueMessage};
use super::schema::message_def;
use super::{QueueStatus, MSG_IMPORT_ASSET, MSG_REGENERATE_THUMBNAIL, MSG_REVIEW_SCREENSHOT};

/// Asset version to import into the modeling scene
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub uuid: String,
    pub version_group_id: Option<String>,
    pub asset_id: Option<String>,
    pub name: String,
    pub asset_type: String,
    pub version: i64,
    pub version_label: Option<String>,
    pub variant_name: Option<String>,
    pub usd_file_path: Option<String>,
    pub blend_file_path: Option<String>,
    pub import_method: Option<String>,
    pub link_mode: Option<String>,
    pub keep_location: Option<bool>,
    pub representation_type: Option<String>,
}

impl ImportRequest {
    pub fn new(uuid: &str, name: &str, asset_type: &str, version: i64) -> Self {
        ImportRequest {
            uuid: uuid.to_string(),
            name: name.to_string(),
            asset_type: asset_type.to_string(),
            version,
            ..Default::default()
        }
    }

    fn to_metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("uuid".into(), self.uuid.clone().into());
        meta.insert("name".into(), self.name.clone().into());
        meta.insert("asset_type".into(), self.asset_type.clone().into());
        meta.insert("version".into(), self.version.into());
        let optional = [
            ("version_group_id", &self.version_group_id),
            ("asset_id", &self.asset_id),
            ("version_label", &self.version_label),
            ("variant_name", &self.variant_name),
            ("usd_file_path", &self.usd_file_path),
            ("blend_file_path", &self.blend_file_path),
            ("import_method", &self.import_method),
            ("link_mode", &self.link_mode),
            ("representation_type", &self.representation_type),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                meta.insert(key.into(), v.clone().into());
            }
        }
        if let Some(keep) = self.keep_location {
            meta.insert("keep_location".into(), keep.into());
        }
        meta
    }
}

/// Screenshot handed to the review queue
///
/// Normally written by the modeling tool; the desktop side uses it for
/// re-sending and for the command line.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotRequest {
    pub version_group_id: String,
    pub asset_id: Option<String>,
    pub asset_name: Option<String>,
    pub variant_name: Option<String>,
    pub version_label: Option<String>,
    pub screenshot_path: String,
    pub display_name: Option<String>,
    pub blender_version: Option<String>,
}

impl ScreenshotRequest {
    fn to_metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert(
            "version_group_id".into(),
            self.version_group_id.clone().into(),
        );
        meta.insert("screenshot_path".into(), self.screenshot_path.clone().into());
        let optional = [
            ("asset_id", &self.asset_id),
            ("asset_name", &self.asset_name),
            ("variant_name", &self.variant_name),
            ("version_label", &self.version_label),
            ("display_name", &self.display_name),
            ("blender_version", &self.blender_version),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                meta.insert(key.into(), v.clone().into());
            }
        }
        meta
    }
}

/// One file in the queue directory
#[derive(Debug, Clone, Serialize)]
pub struct QueueFileInfo {
    pub file_name: String,
    pub message_type: Option<String>,
    pub status: Option<QueueStatus>,
    pub error: Option<String>,
}

/// Snapshot of the queue directory
#[derive(Debug, Clone, Serialize)]
pub struct QueueReport {
    pub queue_dir: PathBuf,
    pub pending_count: usize,
    pub failed_count: usize,
    pub files: Vec<QueueFileInfo>,
}

/// Writes queue files
pub struct QueueProducer {
    queue_dir: PathBuf,
}

impl QueueProducer {
    pub fn new(queue_dir: impl Into<PathBuf>) -> Self {
        QueueProducer {
            queue_dir: queue_dir.into(),
        }
    }

    pub fn queue_dir(&self) -> &Path {
        &self.queue_dir
    }

    /// Write a message as `{prefix}_{timestamp}.json`
    pub fn enqueue(&self, message: &QueueMessage) -> Result<PathBuf> {
        let message_type = message
            .message_type()
            .ok_or_else(|| anyhow!("Failed to queue message: missing 'type' field"))?;
        let def = message_def(message_type)
            .ok_or_else(|| anyhow!("Failed to queue message: unknown type {}", message_type))?;

        fs::create_dir_all(&self.queue_dir).map_err(|e| {
            anyhow!(
                "Failed to create queue directory {:?}: {}",
                self.queue_dir,
                e
            )
        })?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f").to_string();
        let mut path = self
            .queue_dir
            .join(format!("{}_{}.json", def.file_prefix, stamp));
        let mut counter = 1;
        while path.exists() {
            path = self
                .queue_dir
                .join(format!("{}_{}_{}.json", def.file_prefix, stamp, counter));
            counter += 1;
        }

        message.write_to(&path)?;
        info!("queued {} message at {:?}", message_type, path);
        Ok(path)
    }

    pub fn queue_import_asset(&self, request: &ImportRequest) -> Result<PathBuf> {
        let message = build_message(MSG_IMPORT_ASSET, &request.to_metadata(), None)?;
        self.enqueue(&message)
    }

    /// Import that replaces whatever is selected in the scene
    pub fn queue_replace_asset(&self, request: &ImportRequest) -> Result<PathBuf> {
        let mut message = build_message(MSG_IMPORT_ASSET, &request.to_metadata(), None)?;
        message.insert("command", Value::String("replace_any".to_string()));
        self.enqueue(&message)
    }

    pub fn queue_regenerate_thumbnail(
        &self,
        uuid: &str,
        name: &str,
        usd_file_path: &str,
        thumbnail_path: &str,
    ) -> Result<PathBuf> {
        let mut meta = Map::new();
        meta.insert("uuid".into(), uuid.into());
        meta.insert("name".into(), name.into());
        meta.insert("usd_file_path".into(), usd_file_path.into());
        let mut extra = Map::new();
        extra.insert("thumbnail_path".into(), thumbnail_path.into());

        let message = build_message(MSG_REGENERATE_THUMBNAIL, &meta, Some(&extra))?;
        self.enqueue(&message)
    }

    pub fn queue_screenshot(&self, request: &ScreenshotRequest) -> Result<PathBuf> {
        let message = build_message(MSG_REVIEW_SCREENSHOT, &request.to_metadata(), None)?;
        self.enqueue(&message)
    }

    /// Counts and per-file status of everything in the queue directory
    pub fn queue_status(&self) -> Result<QueueReport> {
        let mut files = Vec::new();
        for path in self.queue_files()? {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let info = match QueueMessage::read_from(&path) {
                Ok(message) => QueueFileInfo {
                    file_name,
                    message_type: message.message_type().map(str::to_string),
                    status: message.status(),
                    error: message.get_str("error").map(str::to_string),
                },
                Err(e) => QueueFileInfo {
                    file_name,
                    message_type: None,
                    status: None,
                    error: Some(e.to_string()),
                },
            };
            files.push(info);
        }

        let count = |status: QueueStatus| files.iter().filter(|f| f.status == Some(status)).count();
        Ok(QueueReport {
            queue_dir: self.queue_dir.clone(),
            pending_count: count(QueueStatus::Pending),
            failed_count: count(QueueStatus::Failed),
            files,
        })
    }

    /// Remove queue files, all of them or only those of one message type
    pub fn clear_queue(&self, message_type: Option<&str>) -> Result<usize> {
        let def = match message_type {
            Some(t) => Some(
                message_def(t)
                    .ok_or_else(|| anyhow!("Failed to clear queue: unknown message type {}", t))?,
            ),
            None => None,
        };

        let mut removed = 0;
        for path in self.queue_files()? {
            let matches = match def {
                Some(def) => path
                    .file_name()
                    .is_some_and(|n| def.matches_file(&n.to_string_lossy())),
                None => true,
            };
            if matches {
                fs::remove_file(&path)
                    .map_err(|e| anyhow!("Failed to remove queue file {:?}: {}", path, e))?;
                removed += 1;
            }
        }
        debug!("removed {} queue files", removed);
        Ok(removed)
    }

    /// Visible `.json` files, sorted by name
    fn queue_files(&self) -> Result<Vec<PathBuf>> {
        if !self.queue_dir.exists() {
            return Ok(vec![]);
        }
        let entries = fs::read_dir(&self.queue_dir)
            .map_err(|e| anyhow!("Failed to read queue directory {:?}: {}", self.queue_dir, e))?;
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().is_some_and(|ext| ext == "json")
                    && !path
                        .file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::validate_message;

    fn chair() -> ImportRequest {
        ImportRequest {
            usd_file_path: Some("/lib/chair/v003/chair.usd".to_string()),
            version_label: Some("v003".to_string()),
            ..ImportRequest::new("u-3", "Chair", "model", 3)
        }
    }

    #[test]
    fn test_queue_import_writes_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let producer = QueueProducer::new(dir.path().join("queue"));

        let path = producer.queue_import_asset(&chair()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("import_"));
        assert!(name.ends_with(".json"));

        let message = QueueMessage::read_from(&path).unwrap();
        assert!(validate_message(&message, Some("import_asset")).is_ok());
        assert_eq!(message.get_str("asset_uuid"), Some("u-3"));
        assert_eq!(message.get_str("version_group_id"), Some("u-3"));
        assert_eq!(message.get_str("link_mode"), Some("APPEND"));
        assert!(message.get("command").is_none());
    }

    #[test]
    fn test_replace_adds_command_and_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let producer = QueueProducer::new(dir.path());

        let first = producer.queue_replace_asset(&chair()).unwrap();
        let second = producer.queue_replace_asset(&chair()).unwrap();
        assert_ne!(first, second);

        let message = QueueMessage::read_from(&first).unwrap();
        assert_eq!(message.get_str("command"), Some("replace_any"));
    }

    #[test]
    fn test_invalid_request_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let producer = QueueProducer::new(dir.path());

        let err = producer
            .queue_import_asset(&ImportRequest::new("u-1", "", "model", 1))
            .unwrap_err();
        assert!(err.to_string().contains("asset_name"));
        assert_eq!(producer.queue_status().unwrap().files.len(), 0);
    }

    #[test]
    fn test_status_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let producer = QueueProducer::new(dir.path());

        producer
            .queue_regenerate_thumbnail("u-1", "Chair", "/a.usd", "/t.png")
            .unwrap();
        let shot = producer
            .queue_screenshot(&ScreenshotRequest {
                version_group_id: "g-1".to_string(),
                screenshot_path: "/tmp/a.png".to_string(),
                ..Default::default()
            })
            .unwrap();
        let mut failed = QueueMessage::read_from(&shot).unwrap();
        failed.set_status(QueueStatus::Failed);
        failed.insert("error", Value::String("boom".to_string()));
        failed.write_to(&shot).unwrap();
        fs::write(dir.path().join("broken_1.json"), "{not json").unwrap();

        let report = producer.queue_status().unwrap();
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.pending_count, 1);
        assert_eq!(report.failed_count, 1);
        assert!(report.files[0].error.is_some());
        assert_eq!(report.files[0].file_name, "broken_1.json");

        assert_eq!(producer.clear_queue(Some("review_screenshot")).unwrap(), 1);
        assert!(producer.clear_queue(Some("nope")).is_err());
        assert_eq!(producer.clear_queue(None).unwrap(), 2);
        assert_eq!(producer.queue_status().unwrap().files.len(), 0);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let producer = QueueProducer::new(dir.path().join("absent"));
        let report = producer.queue_status().unwrap();
        assert_eq!(report.pending_count, 0);
        assert_eq!(producer.clear_queue(None).unwrap(), 0);
    }
}
