use reviewdesk::lens::utils::OutputFormat;
use reviewdesk::{format_size, get_database_info, DatabaseInfo, ReviewConfig};
use serde::Serialize;

use super::print_json;

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    reviews_dir: String,
    queue_dir: String,
    poll_interval_ms: u64,
    archive_after_days: u32,
    purge_deleted_after_days: u32,
    database: DatabaseInfo,
}

pub fn run(config: &ReviewConfig, config_path: &Option<String>, output_format: OutputFormat) {
    let info = ConfigInfo {
        config_file: config_path
            .clone()
            .unwrap_or_else(ReviewConfig::config_file_path),
        data_dir: config.data_dir.clone(),
        reviews_dir: config.reviews_dir.clone(),
        queue_dir: config.queue_dir.clone(),
        poll_interval_ms: config.poll_interval_ms,
        archive_after_days: config.archive_after_days,
        purge_deleted_after_days: config.purge_deleted_after_days,
        database: get_database_info(config),
    };

    if output_format.is_json() {
        print_json(&info, output_format);
        return;
    }

    println!("Reviewdesk Configuration");
    println!("========================\n");
    println!("Config file:        {}", info.config_file);
    println!("{}", config.summary());
    println!();

    println!("Reviews Database:");
    println!(
        "  Status:         {}",
        if info.database.exists {
            "exists"
        } else {
            "not created"
        }
    );
    if let Some(size) = info.database.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    println!(
        "  Schema:         {}",
        match (info.database.schema_initialized, info.database.schema_version) {
            (true, Some(v)) if info.database.needs_migration => format!("v{} (migration pending)", v),
            (true, Some(v)) => format!("initialized (v{})", v),
            _ => "not initialized".to_string(),
        }
    );

    eprintln!();
    eprintln!("Tips:");
    eprintln!("  Use --format json for machine-readable output");
    eprintln!("  Edit {} to customize settings", info.config_file);
}
