use clap::Subcommand;
use reviewdesk::database::ReviewState;
use reviewdesk::lens::utils::OutputFormat;
use reviewdesk::ReviewConfig;

use super::{acting_user, open_database, print_json, report};

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// show the review state and note counts of a version
    State {
        /// asset id (version group id)
        asset: String,

        /// version label, e.g. v003
        version: String,
    },

    /// submit a version for review
    Submit {
        asset: String,

        version: String,

        #[clap(long)]
        by: Option<String>,
    },

    /// finalize an approved version
    Finalize {
        asset: String,

        version: String,

        #[clap(long)]
        by: Option<String>,
    },

    /// reopen a version for more work
    Reopen {
        asset: String,

        version: String,

        /// state to reopen to: needs_review or in_progress
        #[clap(long, default_value = "needs_review")]
        to: ReviewState,
    },
}

pub fn run(config: &ReviewConfig, commands: ReviewCommands, output_format: OutputFormat) {
    let db = open_database(config);

    match commands {
        ReviewCommands::State { asset, version } => {
            let status = match db.get_review_status(&asset, &version, Some(&asset)) {
                Ok(status) => status,
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            };
            if output_format.is_json() {
                print_json(&status, output_format);
                return;
            }

            let state = status
                .review_state
                .as_deref()
                .and_then(|s| s.parse::<ReviewState>().ok())
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| "Not in review".to_string());
            println!("{} {}: {}", asset, version, state);
            if let (Some(cycle_id), Some(cycle_type)) = (status.cycle_id, &status.cycle_type) {
                println!(
                    "Cycle:  #{} {} (since {})",
                    cycle_id,
                    cycle_type,
                    status.cycle_start.as_deref().unwrap_or("-")
                );
            }
            let counts = status.note_counts;
            println!(
                "Notes:  {} open, {} addressed, {} approved ({} total)",
                counts.open, counts.addressed, counts.approved, counts.total
            );
        }
        ReviewCommands::Submit { asset, version, by } => {
            let user = acting_user(&db, by);
            report(db.submit_for_review(&asset, &version, &user), output_format);
        }
        ReviewCommands::Finalize { asset, version, by } => {
            let user = acting_user(&db, by);
            report(db.finalize_review(&asset, &version, &user), output_format);
        }
        ReviewCommands::Reopen { asset, version, to } => {
            report(db.reopen_review(&asset, &version, to), output_format);
        }
    }
}
