use clap::Subcommand;
use reviewdesk::lens::utils::{short_timestamp, OutputFormat};
use reviewdesk::ReviewConfig;
use serde::Serialize;
use tabled::Tabled;

use super::{open_database, print_json, print_rows};

#[derive(Subcommand)]
pub enum ScreenshotsCommands {
    /// list screenshots of an asset version in display order
    List {
        /// asset id (version group id)
        asset: String,

        /// version label, e.g. v003
        version: String,
    },
}

#[derive(Serialize, Tabled)]
struct ScreenshotRow {
    id: i64,
    order: i64,
    name: String,
    filename: String,
    uploaded_by: String,
    uploaded: String,
    notes: usize,
}

pub fn run(config: &ReviewConfig, commands: ScreenshotsCommands, output_format: OutputFormat) {
    let db = open_database(config);

    match commands {
        ScreenshotsCommands::List { asset, version } => {
            let screenshots = match db.get_screenshots(&asset, &version) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            };
            if output_format.is_json() {
                print_json(&screenshots, output_format);
                return;
            }
            let rows: Vec<ScreenshotRow> = screenshots
                .into_iter()
                .map(|s| ScreenshotRow {
                    notes: db
                        .get_notes_for_screenshot(s.id, false)
                        .map(|n| n.len())
                        .unwrap_or(0),
                    id: s.id,
                    order: s.display_order,
                    name: s.display_name,
                    filename: s.filename,
                    uploaded_by: s.uploaded_by.unwrap_or_default(),
                    uploaded: short_timestamp(s.uploaded_date.as_deref()),
                })
                .collect();
            print_rows(&rows, output_format, "No screenshots found");
        }
    }
}
