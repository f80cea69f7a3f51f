use reviewdesk::lens::utils::OutputFormat;
use reviewdesk::queue::{QueueProducer, QueueReport};
use reviewdesk::{format_size, get_database_info, DatabaseInfo, ReviewConfig};
use serde::Serialize;

use super::print_json;

#[derive(Debug, Serialize)]
struct StatusInfo {
    database: DatabaseInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    queue: Option<QueueReport>,
}

pub fn run(config: &ReviewConfig, output_format: OutputFormat) {
    let info = StatusInfo {
        database: get_database_info(config),
        queue: QueueProducer::new(&config.queue_dir).queue_status().ok(),
    };

    if output_format.is_json() {
        print_json(&info, output_format);
        return;
    }

    let db = &info.database;
    println!("Database:  {}", db.path);
    if !db.exists {
        println!("  not created yet; it is created on first use");
    } else {
        if let Some(size) = db.size_bytes {
            println!("  size:    {}", format_size(size));
        }
        if let Some(version) = db.schema_version {
            println!(
                "  schema:  v{}{}",
                version,
                if db.needs_migration {
                    " (migration pending)"
                } else {
                    ""
                }
            );
        }
        if let Some(stats) = &db.stats {
            println!(
                "  sessions: {} ({} open, {} archived)",
                stats.total_sessions, stats.open_sessions, stats.archived_sessions
            );
            println!(
                "  cycles:   {} ({} active)",
                stats.total_cycles, stats.active_cycles
            );
            println!(
                "  notes:    {} ({} open, {} addressed, {} approved, {} deleted)",
                stats.total_notes,
                stats.open_notes,
                stats.addressed_notes,
                stats.approved_notes,
                stats.deleted_notes
            );
            println!(
                "  screenshots: {}, drawovers: {}, active users: {}",
                stats.total_screenshots, stats.total_drawovers, stats.active_users
            );
        }
    }

    match &info.queue {
        Some(queue) => println!(
            "Queue:     {} ({} files, {} pending, {} failed)",
            queue.queue_dir.display(),
            queue.files.len(),
            queue.pending_count,
            queue.failed_count
        ),
        None => println!("Queue:     {} (unreadable)", config.queue_dir),
    }
}
