use clap::Subcommand;
use reviewdesk::database::DEFAULT_VARIANT_NAME;
use reviewdesk::lens::utils::OutputFormat;
use reviewdesk::queue::{QueueProducer, ScreenshotQueueHandler, ScreenshotRequest};
use reviewdesk::storage::ReviewFileStore;
use reviewdesk::ReviewConfig;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;
use tracing::info;

use super::{open_database, print_json, print_rows};

#[derive(Subcommand)]
pub enum QueueCommands {
    /// list queue files and their status
    List,

    /// import all pending review screenshots once
    Process,

    /// keep importing review screenshots until interrupted
    Watch,

    /// queue a screenshot for review, as the modeling tool would
    SendScreenshot {
        /// asset id (version group id)
        asset: String,

        /// image file
        image: PathBuf,

        #[clap(long, default_value = "v001")]
        version: String,

        /// display name of the screenshot
        #[clap(short, long)]
        name: Option<String>,

        /// asset name, used for the storage folder
        #[clap(long)]
        asset_name: Option<String>,

        #[clap(long, default_value = DEFAULT_VARIANT_NAME)]
        variant: String,
    },

    /// remove queue files
    Clear {
        /// only files of this message type
        #[clap(short = 't', long = "type")]
        message_type: Option<String>,
    },
}

#[derive(Serialize, Tabled)]
struct QueueRow {
    file: String,
    #[tabled(rename = "type")]
    message_type: String,
    status: String,
    error: String,
}

pub fn run(config: &ReviewConfig, commands: QueueCommands, output_format: OutputFormat) {
    let producer = QueueProducer::new(&config.queue_dir);

    match commands {
        QueueCommands::List => {
            let report = match producer.queue_status() {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            };
            if output_format.is_json() {
                print_json(&report, output_format);
                return;
            }
            println!(
                "{}: {} pending, {} failed",
                report.queue_dir.display(),
                report.pending_count,
                report.failed_count
            );
            let rows: Vec<QueueRow> = report
                .files
                .into_iter()
                .map(|f| QueueRow {
                    file: f.file_name,
                    message_type: f.message_type.unwrap_or_else(|| "-".to_string()),
                    status: f
                        .status
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    error: f.error.unwrap_or_default(),
                })
                .collect();
            print_rows(&rows, output_format, "Queue is empty");
        }
        QueueCommands::Process => {
            let db = open_database(config);
            let handler = ScreenshotQueueHandler::new(
                &config.queue_dir,
                ReviewFileStore::new(&config.reviews_dir),
                &db,
            );
            let processed = handler.process_all_pending();
            println!("Imported {} screenshots", processed);
        }
        QueueCommands::Watch => {
            let db = open_database(config);
            let handler = ScreenshotQueueHandler::new(
                &config.queue_dir,
                ReviewFileStore::new(&config.reviews_dir),
                &db,
            );
            println!(
                "Watching {} every {} ms, press Ctrl-C to stop",
                config.queue_dir, config.poll_interval_ms
            );
            loop {
                let processed = handler.process_all_pending();
                if processed > 0 {
                    println!("Imported {} screenshots", processed);
                }
                info!("queue scan done, sleeping {} ms", config.poll_interval_ms);
                std::thread::sleep(config.poll_interval());
            }
        }
        QueueCommands::SendScreenshot {
            asset,
            image,
            version,
            name,
            asset_name,
            variant,
        } => {
            let request = ScreenshotRequest {
                version_group_id: asset,
                asset_name,
                variant_name: Some(variant),
                version_label: Some(version),
                screenshot_path: image.to_string_lossy().to_string(),
                display_name: name,
                ..Default::default()
            };
            match producer.queue_screenshot(&request) {
                Ok(path) => println!("Queued {}", path.display()),
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            }
        }
        QueueCommands::Clear { message_type } => {
            match producer.clear_queue(message_type.as_deref()) {
                Ok(n) => println!("Removed {} queue files", n),
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
