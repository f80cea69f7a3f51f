pub mod cleanup;
pub mod config;
pub mod cycle;
pub mod notes;
pub mod queue;
pub mod review;
pub mod screenshots;
pub mod status;
pub mod users;

use reviewdesk::database::{ReviewDatabase, TransitionOutcome, UserRole};
use reviewdesk::lens::utils::OutputFormat;
use reviewdesk::ReviewConfig;
use serde::Serialize;
use tabled::Tabled;

/// Open the reviews database from the configured data directory, exiting on failure
pub(crate) fn open_database(config: &ReviewConfig) -> ReviewDatabase {
    match ReviewDatabase::open_in_dir(&config.data_dir) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print rows in the chosen format
pub(crate) fn print_rows<T: Serialize + Tabled>(rows: &[T], format: OutputFormat, empty: &str) {
    if rows.is_empty() && !format.is_json() {
        println!("{}", empty);
        return;
    }
    match format.render(rows) {
        Ok(out) => println!("{}", out),
        Err(e) => eprintln!("ERROR: Failed to render output: {}", e),
    }
}

/// Print a single serializable value, as JSON when a JSON format is chosen
pub(crate) fn print_json<T: Serialize>(value: &T, format: OutputFormat) {
    let out = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value),
        _ => serde_json::to_string(value),
    };
    match out {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("ERROR: Failed to serialize to JSON: {}", e),
    }
}

/// Acting user: explicit `--by`, else the selected studio user, else `$USER`
pub(crate) fn acting_user(db: &ReviewDatabase, explicit: Option<String>) -> String {
    if let Some(user) = explicit.filter(|u| !u.is_empty()) {
        return user;
    }
    let current = db.get_current_user();
    if !current.is_empty() {
        return current;
    }
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

/// Role of a user; unknown users count as artists
pub(crate) fn role_of(db: &ReviewDatabase, username: &str) -> UserRole {
    db.get_user(username)
        .ok()
        .flatten()
        .map(|u| u.role)
        .unwrap_or_default()
}

/// Print a transition result and exit non-zero when it failed
pub(crate) fn report(outcome: TransitionOutcome, format: OutputFormat) {
    if format.is_json() {
        print_json(&outcome, format);
    } else if outcome.success {
        println!("{}", outcome.message);
    } else {
        eprintln!("ERROR: {}", outcome.message);
    }
    if !outcome.success {
        std::process::exit(1);
    }
}

/// Exit with an error message when a write reported failure
pub(crate) fn check(ok: bool, what: &str) {
    if !ok {
        eprintln!("ERROR: Failed to {}", what);
        std::process::exit(1);
    }
}
