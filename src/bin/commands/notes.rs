use clap::Subcommand;
use reviewdesk::database::{NoteStatus, ReviewNote, ReviewState, UserRole, DEFAULT_AUDIT_LIMIT};
use reviewdesk::lens::utils::{short_timestamp, truncate_text, OutputFormat, DEFAULT_NOTE_PREVIEW_LEN};
use reviewdesk::lens::workflow::ReviewWorkflowLens;
use reviewdesk::ReviewConfig;
use serde::Serialize;
use tabled::Tabled;

use super::{acting_user, check, open_database, print_rows, role_of};

#[derive(Subcommand)]
pub enum NotesCommands {
    /// list notes of an asset version
    List {
        /// asset id (version group id)
        asset: String,

        /// version label, e.g. v003
        version: String,

        /// include soft-deleted notes
        #[clap(long)]
        deleted: bool,
    },

    /// add a note to an asset version
    Add {
        asset: String,

        version: String,

        /// note text
        text: String,

        /// attach the note to a screenshot id
        #[clap(short, long)]
        screenshot: Option<i64>,

        /// author, defaults to the current studio user
        #[clap(long)]
        by: Option<String>,

        /// author role, defaults to the author's studio role
        #[clap(long)]
        role: Option<UserRole>,
    },

    /// move a note to open, addressed or approved
    Status {
        note_id: i64,

        /// open, addressed or approved
        status: NoteStatus,

        #[clap(long)]
        by: Option<String>,
    },

    /// soft-delete a note
    Delete {
        note_id: i64,

        #[clap(long)]
        by: Option<String>,
    },

    /// restore a soft-deleted note
    Restore {
        note_id: i64,

        #[clap(long)]
        by: Option<String>,
    },

    /// show the audit trail of a note
    History { note_id: i64 },
}

#[derive(Serialize, Tabled)]
struct NoteRow {
    id: i64,
    status: String,
    author: String,
    role: String,
    screenshot: String,
    created: String,
    note: String,
}

impl NoteRow {
    fn from_note(note: &ReviewNote) -> Self {
        let status = if note.deleted {
            format!("{} (deleted)", note.note_status)
        } else {
            note.note_status.to_string()
        };
        NoteRow {
            id: note.id,
            status,
            author: note.author.clone(),
            role: note.author_role.to_string(),
            screenshot: note
                .screenshot_name
                .clone()
                .or_else(|| note.screenshot_id.map(|id| id.to_string()))
                .unwrap_or_else(|| "-".to_string()),
            created: short_timestamp(note.created_date.as_deref()),
            note: truncate_text(&note.note, DEFAULT_NOTE_PREVIEW_LEN),
        }
    }
}

#[derive(Serialize, Tabled)]
struct HistoryRow {
    timestamp: String,
    action: String,
    actor: String,
    role: String,
    details: String,
}

pub fn run(config: &ReviewConfig, commands: NotesCommands, output_format: OutputFormat) {
    let db = open_database(config);

    match commands {
        NotesCommands::List {
            asset,
            version,
            deleted,
        } => {
            let include_deleted = deleted || db.get_show_deleted();
            let notes = match db.get_notes_for_version(&asset, &version, include_deleted) {
                Ok(notes) => notes,
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            };
            if output_format.is_json() {
                super::print_json(&notes, output_format);
            } else {
                let rows: Vec<NoteRow> = notes.iter().map(NoteRow::from_note).collect();
                print_rows(&rows, output_format, "No notes found");
            }
        }
        NotesCommands::Add {
            asset,
            version,
            text,
            screenshot,
            by,
            role,
        } => {
            let author = acting_user(&db, by);
            let role = role.unwrap_or_else(|| role_of(&db, &author));
            let Some(note_id) = db.add_note(&asset, &version, &text, screenshot, &author, role) else {
                eprintln!("ERROR: Failed to add note");
                std::process::exit(1);
            };
            db.log_action(Some(note_id), "created", &author, role.as_str(), Some(&text));
            println!("Added note {}", note_id);

            let lens = ReviewWorkflowLens::new(&db);
            report_state(&asset, &version, lens.on_comment_added(&asset, &version, role, &author));
        }
        NotesCommands::Status {
            note_id,
            status,
            by,
        } => {
            let actor = acting_user(&db, by);
            let Some(note) = load_note(&db, note_id) else {
                return;
            };
            check(
                db.set_note_status(note_id, status, &actor),
                &format!("set note {} to {}", note_id, status),
            );
            let role = role_of(&db, &actor);
            db.log_action(
                Some(note_id),
                status.as_str(),
                &actor,
                role.as_str(),
                Some(&format!("{} -> {}", note.note_status, status)),
            );
            println!("Note {} is now {}", note_id, status);

            if let Some((asset, version)) = note_version(&db, note.session_id) {
                let lens = ReviewWorkflowLens::new(&db);
                let changed = match status {
                    NoteStatus::Approved => lens.on_note_approved(&asset, &version, &actor),
                    NoteStatus::Addressed => lens.on_note_addressed(&asset, &version, &actor),
                    NoteStatus::Open => lens.on_note_reopened(&asset, &version, role, &actor),
                };
                report_state(&asset, &version, changed);
            }
        }
        NotesCommands::Delete { note_id, by } => {
            let actor = acting_user(&db, by);
            check(db.soft_delete_note(note_id, &actor), &format!("delete note {}", note_id));
            db.log_action(Some(note_id), "deleted", &actor, role_of(&db, &actor).as_str(), None);
            println!("Deleted note {}", note_id);
        }
        NotesCommands::Restore { note_id, by } => {
            let actor = acting_user(&db, by);
            check(db.restore_note(note_id), &format!("restore note {}", note_id));
            db.log_action(Some(note_id), "restored", &actor, role_of(&db, &actor).as_str(), None);
            println!("Restored note {}", note_id);
        }
        NotesCommands::History { note_id } => {
            let entries = match db.get_audit_log(Some(note_id), DEFAULT_AUDIT_LIMIT) {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    std::process::exit(1);
                }
            };
            let rows: Vec<HistoryRow> = entries
                .into_iter()
                .map(|e| HistoryRow {
                    timestamp: short_timestamp(e.timestamp.as_deref()),
                    action: e.action,
                    actor: e.actor,
                    role: e.actor_role.unwrap_or_default(),
                    details: truncate_text(&e.details.unwrap_or_default(), DEFAULT_NOTE_PREVIEW_LEN),
                })
                .collect();
            print_rows(&rows, output_format, "No history for this note");
        }
    }
}

fn load_note(db: &reviewdesk::ReviewDatabase, note_id: i64) -> Option<ReviewNote> {
    match db.get_note_by_id(note_id) {
        Ok(Some(note)) => Some(note),
        Ok(None) => {
            eprintln!("ERROR: Note {} not found", note_id);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a review state change caused by a note action
fn report_state(asset: &str, version: &str, changed: anyhow::Result<Option<ReviewState>>) {
    match changed {
        Ok(Some(state)) => println!("{} {} is now {}", asset, version, state),
        Ok(None) => {}
        Err(e) => eprintln!("WARNING: {}", e),
    }
}

/// (asset, version) of the session a note belongs to
fn note_version(db: &reviewdesk::ReviewDatabase, session_id: i64) -> Option<(String, String)> {
    db.get_session_by_id(session_id)
        .ok()
        .flatten()
        .map(|s| (s.asset_uuid, s.version_label))
}
