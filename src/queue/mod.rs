//! File-based message queue shared with the modeling tool
//!
//! Messages are JSON files dropped into one directory under the system temp folder,
//! named `{prefix}_{YYYYMMDD_HHMMSS_micros}.json`. A file's `status` field is the only
//! claim marker: `pending` (or absent) means nobody has handled it yet. There is no
//! lease, so two consumers polling the same directory could both pick up a file.

mod message;
mod producer;
mod schema;
mod screenshot_handler;

pub use message::{build_message, get_field, get_field_str, validate_message, QueueMessage, ValidationError};
pub use producer::{ImportRequest, QueueFileInfo, QueueProducer, QueueReport, ScreenshotRequest};
pub use schema::{
    identifier_def, message_def, FieldDef, FieldDefault, IdentifierDef, MessageDef,
    IDENTIFIER_FIELDS, MESSAGE_TYPES,
};
pub use screenshot_handler::{PendingRequest, ScreenshotQueueHandler};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Queue directory name inside the system temp folder
pub const QUEUE_DIR_NAME: &str = "usd_library_queue";

pub const DEFAULT_VARIANT_NAME: &str = "Base";
pub const DEFAULT_VERSION_LABEL: &str = "v001";

pub const MSG_IMPORT_ASSET: &str = "import_asset";
pub const MSG_REVIEW_SCREENSHOT: &str = "review_screenshot";
pub const MSG_REGENERATE_THUMBNAIL: &str = "regenerate_thumbnail";

/// `{system_temp}/usd_library_queue`
pub fn default_queue_dir() -> PathBuf {
    std::env::temp_dir().join(QUEUE_DIR_NAME)
}

/// Processing status stored in every queue file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueStatus::Pending),
            "processing" => Some(QueueStatus::Processing),
            "completed" => Some(QueueStatus::Completed),
            "failed" => Some(QueueStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which side writes a message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    DesktopToBlender,
    BlenderToDesktop,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::DesktopToBlender => "desktop_to_blender",
            Direction::BlenderToDesktop => "blender_to_desktop",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
