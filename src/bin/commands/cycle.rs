use clap::Subcommand;
use reviewdesk::database::{ReviewCycle, DEFAULT_VARIANT_NAME};
use reviewdesk::lens::utils::{short_timestamp, OutputFormat};
use reviewdesk::lens::workflow::{ReviewWorkflowLens, REVIEW_CYCLE_TYPES};
use reviewdesk::ReviewConfig;
use serde::Serialize;
use tabled::Tabled;

use super::{acting_user, open_database, print_json, print_rows, report};

#[derive(Subcommand)]
pub enum CycleCommands {
    /// open a review cycle starting at a version
    Start {
        /// asset id (version group id)
        asset: String,

        /// version label the cycle starts at
        version: String,

        /// cycle type: modeling, texturing, rigging, lighting, animation, fx, lookdev, general
        #[clap(short = 't', long = "type", default_value = "general")]
        cycle_type: String,

        #[clap(long, default_value = DEFAULT_VARIANT_NAME)]
        variant: String,

        #[clap(long)]
        by: Option<String>,
    },

    /// list the review cycles of an asset, newest first
    List {
        asset: String,
    },

    /// close the cycle covering a version as final
    Final {
        asset: String,

        version: String,

        #[clap(long, default_value = DEFAULT_VARIANT_NAME)]
        variant: String,

        #[clap(long)]
        by: Option<String>,
    },

    /// list the available cycle types
    Types,
}

#[derive(Serialize, Tabled)]
struct CycleRow {
    id: i64,
    #[tabled(rename = "type")]
    cycle_type: String,
    variant: String,
    versions: String,
    state: String,
    notes: String,
    created: String,
}

#[derive(Serialize, Tabled)]
struct CycleTypeRow {
    name: &'static str,
    label: &'static str,
    description: &'static str,
}

impl CycleRow {
    fn from_cycle(cycle: &ReviewCycle, notes: String) -> Self {
        CycleRow {
            id: cycle.id,
            cycle_type: cycle.cycle_type.clone(),
            variant: cycle.variant_name.clone(),
            versions: format!(
                "{} - {}",
                cycle.start_version,
                cycle.end_version.as_deref().unwrap_or("open")
            ),
            state: cycle
                .state()
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| "-".to_string()),
            notes,
            created: short_timestamp(cycle.created_date.as_deref()),
        }
    }
}

pub fn run(config: &ReviewConfig, commands: CycleCommands, output_format: OutputFormat) {
    let db = open_database(config);
    let lens = ReviewWorkflowLens::new(&db);

    match commands {
        CycleCommands::Start {
            asset,
            version,
            cycle_type,
            variant,
            by,
        } => {
            let user = acting_user(&db, by);
            match lens.start_cycle(&asset, &variant, &cycle_type, &version, &user) {
                Ok(cycle) if output_format.is_json() => print_json(&cycle, output_format),
                Ok(cycle) => println!(
                    "Started {} cycle #{} for {} ({}) at {}",
                    cycle.cycle_type, cycle.id, asset, variant, version
                ),
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            }
        }
        CycleCommands::List { asset } => {
            let cycles = match db.get_cycles_for_asset(&asset) {
                Ok(cycles) => cycles,
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            };
            if output_format.is_json() {
                print_json(&cycles, output_format);
                return;
            }
            let rows: Vec<CycleRow> = cycles
                .iter()
                .map(|c| {
                    let notes = db
                        .get_cycle_note_counts(c.id)
                        .map(|n| format!("{}/{}", n.pending(), n.total))
                        .unwrap_or_else(|_| "-".to_string());
                    CycleRow::from_cycle(c, notes)
                })
                .collect();
            print_rows(&rows, output_format, "No review cycles found");
        }
        CycleCommands::Final {
            asset,
            version,
            variant,
            by,
        } => {
            let user = acting_user(&db, by);
            match lens.mark_as_final(&asset, &variant, &version, &user) {
                Ok(outcome) => report(outcome, output_format),
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            }
        }
        CycleCommands::Types => {
            let rows: Vec<CycleTypeRow> = REVIEW_CYCLE_TYPES
                .iter()
                .map(|p| CycleTypeRow {
                    name: p.name,
                    label: p.label,
                    description: p.description,
                })
                .collect();
            print_rows(&rows, output_format, "");
        }
    }
}
