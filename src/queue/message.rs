//! Queue messages: build from metadata, validate on receipt, look up by role

use anyhow::{anyhow, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;

use super::schema::{identifier_def, message_def, MessageDef};
use super::QueueStatus;

/// A queue message: a flat JSON object with a `type` discriminator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueMessage(Map<String, Value>);

impl QueueMessage {
    pub fn from_map(map: Map<String, Value>) -> Self {
        QueueMessage(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn message_type(&self) -> Option<&str> {
        self.get_str("type")
    }

    /// Stored status; a missing status reads as pending, an unknown one as `None`
    pub fn status(&self) -> Option<QueueStatus> {
        match self.0.get("status") {
            None | Some(Value::Null) => Some(QueueStatus::Pending),
            Some(Value::String(s)) => QueueStatus::parse(s),
            Some(_) => None,
        }
    }

    pub fn set_status(&mut self, status: QueueStatus) {
        self.insert("status", Value::String(status.as_str().to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !is_empty(v))
    }

    /// Non-empty string value of a key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Read a queue file
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read queue file {:?}: {}", path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse queue file {:?}: {}", path, e))
    }

    /// Write the message as pretty JSON, via a hidden temp file renamed into place
    ///
    /// Readers polling the directory never see a half-written file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("Failed to write queue file: {:?} has no file name", path))?;
        let temp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

        let content = serde_json::to_string_pretty(&self.0)
            .map_err(|e| anyhow!("Failed to serialize queue message: {}", e))?;
        fs::write(&temp, content)
            .map_err(|e| anyhow!("Failed to write queue file {:?}: {}", temp, e))?;
        fs::rename(&temp, path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            anyhow!("Failed to move queue file into place {:?}: {}", path, e)
        })
    }
}

/// Why a message could not be built or accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingType,
    UnknownType(String),
    /// Required fields with no value in the metadata (building)
    IncompleteMetadata {
        message_type: String,
        fields: Vec<String>,
    },
    /// Required fields absent from a received message (validation)
    IncompleteMessage {
        message_type: String,
        fields: Vec<String>,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingType => write!(f, "Message missing 'type' field"),
            ValidationError::UnknownType(t) => write!(f, "Unknown message type: {}", t),
            ValidationError::IncompleteMetadata {
                message_type,
                fields,
            } => write!(
                f,
                "Missing required fields for {}: {}",
                message_type,
                fields.join(", ")
            ),
            ValidationError::IncompleteMessage {
                message_type,
                fields,
            } => write!(
                f,
                "Message {} missing required fields: {}",
                message_type,
                fields.join(", ")
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn first_present<'m>(
    metadata: &'m Map<String, Value>,
    source: &str,
    fallbacks: &[&str],
) -> Option<&'m Value> {
    std::iter::once(source)
        .chain(fallbacks.iter().copied())
        .find_map(|key| metadata.get(key).filter(|v| !is_empty(v)))
}

/// Build a message of `message_type` from a metadata mapping
///
/// Each declared field reads its source key, then its fallbacks. A value in
/// `extra` under the field's own name wins over both. Empty fields take their
/// default; required fields still empty are reported together.
pub fn build_message(
    message_type: &str,
    metadata: &Map<String, Value>,
    extra: Option<&Map<String, Value>>,
) -> Result<QueueMessage, ValidationError> {
    let def = message_def(message_type)
        .ok_or_else(|| ValidationError::UnknownType(message_type.to_string()))?;

    let mut message = QueueMessage::default();
    message.insert("type", Value::String(message_type.to_string()));
    message.set_status(QueueStatus::Pending);
    message.insert(
        "timestamp",
        Value::String(Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
    );

    let mut missing = Vec::new();
    for field in def.fields {
        let mut value = first_present(metadata, field.source, field.fallbacks).cloned();
        if let Some(v) = extra.and_then(|e| e.get(field.name)) {
            value = Some(v.clone());
        }

        match value.filter(|v| !is_empty(v)) {
            Some(v) => message.insert(field.name, v),
            None => match field.default {
                Some(default) => message.insert(field.name, default.to_value()),
                None if field.required => missing.push(field.name.to_string()),
                None => {}
            },
        }
    }

    if !missing.is_empty() {
        return Err(ValidationError::IncompleteMetadata {
            message_type: message_type.to_string(),
            fields: missing,
        });
    }

    Ok(message)
}

/// Check a received message against its type's required fields
///
/// `expected` overrides the message's own `type`. Required fields with a default
/// are not reported.
pub fn validate_message(
    message: &QueueMessage,
    expected: Option<&str>,
) -> Result<&'static MessageDef, ValidationError> {
    let message_type = expected
        .or_else(|| message.message_type())
        .ok_or(ValidationError::MissingType)?;
    let def = message_def(message_type)
        .ok_or_else(|| ValidationError::UnknownType(message_type.to_string()))?;

    let missing: Vec<String> = def
        .fields
        .iter()
        .filter(|f| f.required && f.default.is_none() && message.get(f.name).is_none())
        .map(|f| f.name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(def)
    } else {
        Err(ValidationError::IncompleteMessage {
            message_type: message_type.to_string(),
            fields: missing,
        })
    }
}

/// Value of an identifier role (e.g. `session_identifier`) or of a plain key
pub fn get_field<'m>(message: &'m QueueMessage, role_or_key: &str) -> Option<&'m Value> {
    match identifier_def(role_or_key) {
        Some(identifier) => std::iter::once(identifier.name)
            .chain(identifier.fallbacks.iter().copied())
            .find_map(|key| message.get(key)),
        None => message.get(role_or_key),
    }
}

/// String form of [`get_field`]
pub fn get_field_str<'m>(message: &'m QueueMessage, role_or_key: &str) -> Option<&'m str> {
    get_field(message, role_or_key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_build_reads_sources_and_defaults() {
        let metadata = map(json!({
            "version_group_id": "group-1",
            "version_label": "v003",
            "name": "Chair",
            "screenshot_path": "/tmp/shot.png",
        }));
        let message = build_message("review_screenshot", &metadata, None).unwrap();

        assert_eq!(message.message_type(), Some("review_screenshot"));
        assert_eq!(message.status(), Some(QueueStatus::Pending));
        assert!(message.get_str("timestamp").is_some());
        assert_eq!(message.get_str("asset_uuid"), Some("group-1"));
        assert_eq!(message.get_str("asset_id"), Some("group-1"));
        assert_eq!(message.get_str("asset_name"), Some("Chair"));
        assert_eq!(message.get_str("variant_name"), Some("Base"));
        assert_eq!(message.get_str("display_name"), Some("Screenshot"));
        assert!(message.get("blender_version").is_none());
    }

    #[test]
    fn test_build_extra_overrides() {
        let metadata = map(json!({"uuid": "u1", "name": "Lamp", "usd_file_path": "/a.usd"}));
        let extra = map(json!({"thumbnail_path": "/t.png", "asset_name": "Desk Lamp"}));
        let message = build_message("regenerate_thumbnail", &metadata, Some(&extra)).unwrap();
        assert_eq!(message.get_str("asset_name"), Some("Desk Lamp"));
        assert_eq!(message.get_str("thumbnail_path"), Some("/t.png"));
        assert_eq!(message.get_str("version_group_id"), Some("u1"));
    }

    #[test]
    fn test_build_reports_all_missing_fields() {
        let err = build_message("import_asset", &map(json!({"uuid": "u1"})), None).unwrap_err();
        match &err {
            ValidationError::IncompleteMetadata { fields, .. } => {
                assert_eq!(fields, &vec!["version", "asset_name", "asset_type"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "Missing required fields for import_asset: version, asset_name, asset_type"
        );

        assert_eq!(
            build_message("bogus", &Map::new(), None).unwrap_err(),
            ValidationError::UnknownType("bogus".to_string())
        );
    }

    #[test]
    fn test_built_messages_validate_and_keep_values() {
        let metadata = map(json!({
            "uuid": "u1",
            "name": "Chair",
            "asset_type": "model",
            "version": 3,
            "version_label": "v003",
            "keep_location": false,
        }));
        let message = build_message("import_asset", &metadata, None).unwrap();
        let def = validate_message(&message, None).unwrap();
        assert_eq!(def.message_type, "import_asset");
        assert_eq!(message.get("version"), Some(&json!(3)));
        assert_eq!(message.get("keep_location"), Some(&json!(false)));
        assert_eq!(message.get_str("version_label"), Some("v003"));
    }

    #[test]
    fn test_validate_errors() {
        let empty = QueueMessage::default();
        assert_eq!(validate_message(&empty, None).unwrap_err(), ValidationError::MissingType);

        let message = QueueMessage::from_map(map(json!({"type": "review_screenshot", "asset_uuid": ""})));
        let err = validate_message(&message, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Message review_screenshot missing required fields: asset_uuid, screenshot_path"
        );
    }

    #[test]
    fn test_get_field_roles() {
        let message = QueueMessage::from_map(map(json!({
            "asset_uuid": "",
            "version_group_id": "group-1",
            "uuid": "u9",
        })));
        assert_eq!(get_field_str(&message, "session_identifier"), Some("group-1"));
        assert_eq!(get_field_str(&message, "storage_identifier"), Some("group-1"));
        assert_eq!(get_field_str(&message, "version_identifier"), Some("u9"));
        assert_eq!(get_field_str(&message, "uuid"), Some("u9"));
        assert!(get_field(&message, "missing").is_none());
    }

    #[test]
    fn test_status_parsing() {
        let mut message = QueueMessage::from_map(map(json!({"type": "review_screenshot"})));
        assert_eq!(message.status(), Some(QueueStatus::Pending));
        message.set_status(QueueStatus::Failed);
        assert_eq!(message.status(), Some(QueueStatus::Failed));
        message.insert("status", json!("weird"));
        assert_eq!(message.status(), None);
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenshot_1.json");
        let message = QueueMessage::from_map(map(json!({"type": "review_screenshot", "x": 1})));
        message.write_to(&path).unwrap();

        assert_eq!(QueueMessage::read_from(&path).unwrap(), message);
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert_eq!(leftovers.len(), 1);
    }
}
