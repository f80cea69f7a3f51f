use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::database::{DATABASE_FILE_NAME, DEFAULT_ARCHIVE_AFTER_DAYS, DEFAULT_PURGE_AFTER_DAYS};
use crate::queue::default_queue_dir;

/// Default queue polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

pub struct ReviewConfig {
    /// Directory holding the reviews database
    pub data_dir: String,

    /// Root of the review storage tree (screenshots, drawovers)
    pub reviews_dir: String,

    /// Queue directory shared with the modeling tool
    pub queue_dir: String,

    /// Interval between queue scans in `queue watch`
    pub poll_interval_ms: u64,

    /// Days of inactivity before an open session is archived
    pub archive_after_days: u32,

    /// Days before soft-deleted notes are purged
    pub purge_deleted_after_days: u32,
}

const EMPTY_CONFIG: &str = r#"### reviewdesk configuration file

### directory holding reviews.db
# data_dir = "~/.reviewdesk"

### root of the review storage tree, defaults to {data_dir}/reviews
# reviews_dir = "~/.reviewdesk/reviews"

### queue directory shared with the modeling tool, defaults to {system_temp}/usd_library_queue
# queue_dir = "/tmp/usd_library_queue"

### queue watch interval
# poll_interval_ms = 2000

### housekeeping (in days)
# archive_after_days = 90
# purge_deleted_after_days = 30
"#;

fn home_dir_string() -> String {
    dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

impl Default for ReviewConfig {
    fn default() -> Self {
        let data_dir = format!("{}/.reviewdesk", home_dir_string());
        Self {
            reviews_dir: format!("{}/reviews", data_dir),
            data_dir,
            queue_dir: default_queue_dir().to_string_lossy().to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            archive_after_days: DEFAULT_ARCHIVE_AFTER_DAYS,
            purge_deleted_after_days: DEFAULT_PURGE_AFTER_DAYS,
        }
    }
}

impl ReviewConfig {
    /// Load the configuration: TOML file first, then `REVIEWDESK_*` environment variables
    ///
    /// Without `path`, `$HOME/.reviewdesk/reviewdesk.toml` is used. A missing file is
    /// created from a commented template.
    pub fn new(path: &Option<String>) -> Result<ReviewConfig> {
        let mut builder = Config::builder();

        match path {
            Some(p) => {
                if Path::new(p).exists() {
                    builder = builder.add_source(config::File::new(p, config::FileFormat::Toml));
                } else {
                    std::fs::write(p, EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file {}: {}", p, e))?;
                }
            }
            None => {
                let home =
                    dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
                let config_dir = home.join(".reviewdesk");
                std::fs::create_dir_all(&config_dir)
                    .map_err(|e| anyhow!("Unable to create reviewdesk directory: {}", e))?;
                let p = Self::config_file_path();
                if Path::new(&p).exists() {
                    builder = builder.add_source(config::File::new(&p, config::FileFormat::Toml));
                } else {
                    std::fs::write(&p, EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file {}: {}", p, e))?;
                }
            }
        }

        // e.g. `REVIEWDESK_DATA_DIR=/srv/reviews reviewdesk status`
        builder = builder.add_source(config::Environment::with_prefix("REVIEWDESK"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;
        let values = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Ok(Self::from_values(&values))
    }

    /// Apply loaded key/value pairs over the defaults; unparsable numbers keep the default
    fn from_values(values: &HashMap<String, String>) -> ReviewConfig {
        let defaults = ReviewConfig::default();
        let expand = |p: &str| match p.strip_prefix("~/") {
            Some(rest) => format!("{}/{}", home_dir_string(), rest),
            None => p.to_string(),
        };

        let data_dir = values
            .get("data_dir")
            .map(|p| expand(p).trim_end_matches('/').to_string())
            .unwrap_or(defaults.data_dir);
        let reviews_dir = values
            .get("reviews_dir")
            .map(|p| expand(p))
            .unwrap_or_else(|| format!("{}/reviews", data_dir));
        let queue_dir = values
            .get("queue_dir")
            .map(|p| expand(p))
            .unwrap_or(defaults.queue_dir);

        ReviewConfig {
            data_dir,
            reviews_dir,
            queue_dir,
            poll_interval_ms: values
                .get("poll_interval_ms")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
            archive_after_days: values
                .get("archive_after_days")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.archive_after_days),
            purge_deleted_after_days: values
                .get("purge_deleted_after_days")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.purge_deleted_after_days),
        }
    }

    /// Path of the reviews database file
    pub fn database_path(&self) -> String {
        format!(
            "{}/{}",
            self.data_dir.trim_end_matches('/'),
            DATABASE_FILE_NAME
        )
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    pub fn summary(&self) -> String {
        [
            format!("Data Directory:     {}", self.data_dir),
            format!("Database Path:      {}", self.database_path()),
            format!("Reviews Directory:  {}", self.reviews_dir),
            format!("Queue Directory:    {}", self.queue_dir),
            format!("Poll Interval:      {} ms", self.poll_interval_ms),
            format!("Archive After:      {} days", self.archive_after_days),
            format!("Purge Deleted After: {} days", self.purge_deleted_after_days),
        ]
        .join("\n")
    }

    pub fn config_file_path() -> String {
        format!("{}/.reviewdesk/reviewdesk.toml", home_dir_string())
    }
}

/// State of the reviews database file
#[derive(Debug, Serialize, Clone)]
pub struct DatabaseInfo {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub schema_initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    pub needs_migration: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<crate::database::ReviewStats>,
}

/// Inspect the reviews database without creating or migrating it
pub fn get_database_info(config: &ReviewConfig) -> DatabaseInfo {
    use crate::database::{CleanupRepository, DatabaseConn, SchemaManager, SchemaStatus, SCHEMA_VERSION};

    let path = config.database_path();
    let exists = Path::new(&path).exists();
    let mut info = DatabaseInfo {
        size_bytes: if exists {
            std::fs::metadata(&path).ok().map(|m| m.len())
        } else {
            None
        },
        path,
        exists,
        schema_initialized: false,
        schema_version: None,
        needs_migration: false,
        stats: None,
    };
    if !exists {
        return info;
    }

    let Ok(db) = DatabaseConn::open(Some(info.path.as_str())) else {
        return info;
    };
    match SchemaManager::new(&db.conn).check_status() {
        Ok(SchemaStatus::Current) => {
            info.schema_initialized = true;
            info.schema_version = Some(SCHEMA_VERSION);
            info.stats = CleanupRepository::new(&db.conn).get_stats().ok();
        }
        Ok(SchemaStatus::NeedsMigration { from, .. }) => {
            info.schema_initialized = true;
            info.schema_version = Some(from);
            info.needs_migration = true;
        }
        Ok(SchemaStatus::Incompatible {
            database_version, ..
        }) => {
            info.schema_initialized = true;
            info.schema_version = Some(database_version);
        }
        Ok(SchemaStatus::NotInitialized) | Ok(SchemaStatus::Corrupted) | Err(_) => {}
    }
    info
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
