use clap::Subcommand;
use reviewdesk::database::UserRole;
use reviewdesk::lens::utils::{short_timestamp, OutputFormat};
use reviewdesk::ReviewConfig;
use serde::Serialize;
use tabled::Tabled;

use super::{check, open_database, print_rows};

#[derive(Subcommand)]
pub enum UsersCommands {
    /// list studio users
    List {
        /// include deactivated users
        #[clap(short, long)]
        all: bool,
    },

    /// add a studio user
    Add {
        username: String,

        display_name: String,

        /// artist, lead, supervisor, admin or director
        #[clap(short, long, default_value = "artist")]
        role: UserRole,
    },

    /// deactivate a studio user
    Deactivate { username: String },

    /// select the current user and switch to studio mode
    Select { username: String },
}

#[derive(Serialize, Tabled)]
struct UserRow {
    username: String,
    name: String,
    role: String,
    active: bool,
    created: String,
}

pub fn run(config: &ReviewConfig, commands: UsersCommands, output_format: OutputFormat) {
    let db = open_database(config);

    match commands {
        UsersCommands::List { all } => {
            let users = match db.get_all_users(all) {
                Ok(users) => users,
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            };
            let current = db.get_current_user();
            let rows: Vec<UserRow> = users
                .into_iter()
                .map(|u| UserRow {
                    name: if u.username == current {
                        format!("{} *", u.display_name)
                    } else {
                        u.display_name
                    },
                    username: u.username,
                    role: u.role.to_string(),
                    active: u.is_active,
                    created: short_timestamp(u.created_at.as_deref()),
                })
                .collect();
            print_rows(&rows, output_format, "No users found");
        }
        UsersCommands::Add {
            username,
            display_name,
            role,
        } => {
            if db.add_user(&username, &display_name, role).is_none() {
                eprintln!("ERROR: Failed to add user {} (already exists?)", username);
                std::process::exit(1);
            }
            println!("Added {} ({})", username, role);
        }
        UsersCommands::Deactivate { username } => {
            check(db.deactivate_user(&username), &format!("deactivate {}", username));
            if db.get_current_user() == username {
                db.set_current_user("");
            }
            println!("Deactivated {}", username);
        }
        UsersCommands::Select { username } => {
            match db.get_user(&username) {
                Ok(Some(user)) if user.is_active => {}
                Ok(_) => {
                    eprintln!("ERROR: No active user named {}", username);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            }
            check(db.set_current_user(&username), "select user");
            check(db.set_studio_mode(true), "enable studio mode");
            println!("Current user: {}", username);
        }
    }
}
