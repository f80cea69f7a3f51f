//! Shared value types for the review managers
//!
//! Review states, note statuses and user roles are stored as lowercase text; the
//! enums here convert to and from that text at the SQLite boundary.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow state shared by review sessions and review cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    NeedsReview,
    InProgress,
    Approved,
    Final,
}

impl ReviewState {
    pub const ALL: [ReviewState; 4] = [
        ReviewState::NeedsReview,
        ReviewState::InProgress,
        ReviewState::Approved,
        ReviewState::Final,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::NeedsReview => "needs_review",
            ReviewState::InProgress => "in_progress",
            ReviewState::Approved => "approved",
            ReviewState::Final => "final",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            ReviewState::NeedsReview => "Needs Review",
            ReviewState::InProgress => "In Progress",
            ReviewState::Approved => "Approved",
            ReviewState::Final => "Final",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReviewState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "needs_review" => Ok(ReviewState::NeedsReview),
            "in_progress" => Ok(ReviewState::InProgress),
            "approved" => Ok(ReviewState::Approved),
            "final" => Ok(ReviewState::Final),
            _ => Err(format!(
                "Invalid review state '{}'. Valid states: needs_review, in_progress, approved, final",
                s
            )),
        }
    }
}

impl ToSql for ReviewState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ReviewState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// Three-state note workflow: open -> addressed -> approved, reversible to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    #[default]
    Open,
    Addressed,
    Approved,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Open => "open",
            NoteStatus::Addressed => "addressed",
            NoteStatus::Approved => "approved",
        }
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(NoteStatus::Open),
            "addressed" => Ok(NoteStatus::Addressed),
            "approved" => Ok(NoteStatus::Approved),
            _ => Err(format!(
                "Invalid note status '{}'. Valid statuses: open, addressed, approved",
                s
            )),
        }
    }
}

impl ToSql for NoteStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NoteStatus {
    // rows written before the v3 migration may carry NULL
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(NoteStatus::Open),
            _ => value
                .as_str()?
                .parse()
                .map_err(|e: String| FromSqlError::Other(e.into())),
        }
    }
}

/// Studio user role, ordered by permission level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Artist,
    Lead,
    Supervisor,
    Admin,
    Director,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Artist => "artist",
            UserRole::Lead => "lead",
            UserRole::Supervisor => "supervisor",
            UserRole::Admin => "admin",
            UserRole::Director => "director",
        }
    }

    /// Permission level; admin and director share the top level
    pub fn level(&self) -> u8 {
        match self {
            UserRole::Artist => 1,
            UserRole::Lead => 2,
            UserRole::Supervisor => 3,
            UserRole::Admin | UserRole::Director => 4,
        }
    }

    /// Elevated roles may approve notes and move review states
    pub fn is_elevated(&self) -> bool {
        self.level() >= UserRole::Lead.level()
    }

    /// Whether this role may perform an action gated on `required`
    pub fn has_permission(&self, required: UserRole) -> bool {
        self.level() >= required.level()
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "artist" => Ok(UserRole::Artist),
            "lead" => Ok(UserRole::Lead),
            "supervisor" => Ok(UserRole::Supervisor),
            "admin" => Ok(UserRole::Admin),
            "director" => Ok(UserRole::Director),
            _ => Err(format!(
                "Invalid role '{}'. Valid roles: artist, lead, supervisor, admin, director",
                s
            )),
        }
    }
}

impl ToSql for UserRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for UserRole {
    // unknown or missing roles fall back to the lowest level
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(UserRole::Artist),
            _ => Ok(value.as_str()?.parse().unwrap_or_default()),
        }
    }
}

/// Note counts by status, computed with conditional aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCounts {
    pub open: i64,
    pub addressed: i64,
    pub approved: i64,
    pub total: i64,
}

impl NoteCounts {
    /// Shared select list; expects the notes table aliased as `n`
    pub(crate) const SELECT: &'static str = r#"
        COALESCE(SUM(CASE WHEN n.note_status = 'open' OR n.note_status IS NULL THEN 1 ELSE 0 END), 0),
        COALESCE(SUM(CASE WHEN n.note_status = 'addressed' THEN 1 ELSE 0 END), 0),
        COALESCE(SUM(CASE WHEN n.note_status = 'approved' THEN 1 ELSE 0 END), 0),
        COUNT(n.id)
    "#;

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(NoteCounts {
            open: row.get(0)?,
            addressed: row.get(1)?,
            approved: row.get(2)?,
            total: row.get(3)?,
        })
    }

    /// Notes still waiting on someone (open or addressed)
    pub fn pending(&self) -> i64 {
        self.open + self.addressed
    }
}

/// Result of a review state transition: success flag plus a message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub success: bool,
    pub message: String,
}

impl TransitionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        TransitionOutcome {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        TransitionOutcome {
            success: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransitionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_state_round_trip_text() {
        for state in ReviewState::ALL {
            assert_eq!(state.as_str().parse::<ReviewState>().unwrap(), state);
        }
        assert!("in_review".parse::<ReviewState>().is_err());
        assert!("".parse::<ReviewState>().is_err());
    }

    #[test]
    fn test_note_status_parse() {
        assert_eq!("Addressed".parse::<NoteStatus>().unwrap(), NoteStatus::Addressed);
        assert!("resolved".parse::<NoteStatus>().is_err());
    }

    #[test]
    fn test_role_permissions() {
        assert!(UserRole::Director.has_permission(UserRole::Admin));
        assert!(UserRole::Lead.is_elevated());
        assert!(!UserRole::Artist.is_elevated());
        assert!(!UserRole::Lead.has_permission(UserRole::Supervisor));
    }

    #[test]
    fn test_note_status_null_reads_open() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let status: NoteStatus = conn.query_row("SELECT NULL", [], |row| row.get(0)).unwrap();
        assert_eq!(status, NoteStatus::Open);
    }
}
