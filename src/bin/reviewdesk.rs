use clap::{Parser, Subcommand};
use reviewdesk::lens::utils::OutputFormat;
use reviewdesk::ReviewConfig;
use tracing::Level;

mod commands;

use commands::cleanup::CleanupArgs;
use commands::cycle::CycleCommands;
use commands::notes::NotesCommands;
use commands::queue::QueueCommands;
use commands::review::ReviewCommands;
use commands::screenshots::ScreenshotsCommands;
use commands::users::UsersCommands;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.reviewdesk/reviewdesk.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show database and queue status
    Status,

    /// Review notes
    #[clap(subcommand)]
    Notes(NotesCommands),

    /// Review screenshots
    #[clap(subcommand)]
    Screenshots(ScreenshotsCommands),

    /// Review state of a version
    #[clap(subcommand)]
    Review(ReviewCommands),

    /// Review cycles spanning versions
    #[clap(subcommand)]
    Cycle(CycleCommands),

    /// Studio users
    #[clap(subcommand)]
    Users(UsersCommands),

    /// Message queue shared with the modeling tool
    #[clap(subcommand)]
    Queue(QueueCommands),

    /// Archive inactive sessions and remove orphans
    Cleanup(CleanupArgs),

    /// Show configuration and database information
    Config,
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    }

    let config = match ReviewConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let format = cli.format;
    match cli.command {
        Commands::Status => commands::status::run(&config, format),
        Commands::Notes(cmd) => commands::notes::run(&config, cmd, format),
        Commands::Screenshots(cmd) => commands::screenshots::run(&config, cmd, format),
        Commands::Review(cmd) => commands::review::run(&config, cmd, format),
        Commands::Cycle(cmd) => commands::cycle::run(&config, cmd, format),
        Commands::Users(cmd) => commands::users::run(&config, cmd, format),
        Commands::Queue(cmd) => commands::queue::run(&config, cmd, format),
        Commands::Cleanup(args) => commands::cleanup::run(&config, args, format),
        Commands::Config => commands::config::run(&config, &cli.config, format),
    }
}
