use clap::Args;
use reviewdesk::lens::utils::OutputFormat;
use reviewdesk::ReviewConfig;
use serde::Serialize;

use super::{open_database, print_json};

/// Arguments for the Cleanup command
#[derive(Args)]
pub struct CleanupArgs {
    /// Also delete archived sessions and purge old soft-deleted notes
    #[clap(long)]
    pub purge: bool,

    /// Override the configured inactivity window before archiving (days)
    #[clap(long)]
    pub archive_after: Option<u32>,
}

#[derive(Debug, Default, Serialize)]
struct CleanupSummary {
    orphaned_sessions: usize,
    archived_sessions: usize,
    deleted_sessions: usize,
    purged_notes: usize,
}

pub fn run(config: &ReviewConfig, args: CleanupArgs, output_format: OutputFormat) {
    let CleanupArgs {
        purge,
        archive_after,
    } = args;
    let db = open_database(config);

    let mut summary = CleanupSummary {
        orphaned_sessions: db.cleanup_orphaned_sessions(),
        archived_sessions: db
            .archive_inactive_sessions(archive_after.unwrap_or(config.archive_after_days)),
        ..Default::default()
    };
    if purge {
        summary.deleted_sessions = db.delete_archived_sessions();
        summary.purged_notes = db.purge_deleted_notes(config.purge_deleted_after_days);
    }

    if output_format.is_json() {
        print_json(&summary, output_format);
        return;
    }
    println!("Removed {} orphaned sessions", summary.orphaned_sessions);
    println!("Archived {} inactive sessions", summary.archived_sessions);
    if purge {
        println!("Deleted {} archived sessions", summary.deleted_sessions);
        println!(
            "Purged {} notes deleted more than {} days ago",
            summary.purged_notes, config.purge_deleted_after_days
        );
    }
}
