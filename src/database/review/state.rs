//! Review state transitions on sessions
//!
//! States flow `needs_review -> in_progress -> approved -> final`. Every transition
//! reports a [`TransitionOutcome`] instead of an error so callers can show the message.

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

use crate::database::core::OrWarn;

use super::sessions::{ensure_session, ReviewSession};
use super::types::{ReviewState, TransitionOutcome};

/// Repository for session review-state transitions
pub struct StateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> StateRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Set the review state directly, stamping the dates that belong to it
    pub fn set_review_state(
        &self,
        asset_uuid: &str,
        version_label: &str,
        state: ReviewState,
        user: &str,
    ) -> TransitionOutcome {
        let session_id = match ensure_session(self.conn, asset_uuid, version_label) {
            Ok(id) => id,
            Err(e) => return TransitionOutcome::fail(format!("Failed to set state: {}", e)),
        };

        let result = match state {
            ReviewState::InProgress => self.conn.execute(
                "UPDATE review_sessions SET review_state = ?1, \
                 submitted_for_review_date = CURRENT_TIMESTAMP, submitted_by = ?2 WHERE id = ?3",
                params![state, user, session_id],
            ),
            ReviewState::Approved => self.conn.execute(
                "UPDATE review_sessions SET review_state = ?1, \
                 approved_date = CURRENT_TIMESTAMP WHERE id = ?2",
                params![state, session_id],
            ),
            ReviewState::Final => self.conn.execute(
                "UPDATE review_sessions SET review_state = ?1, \
                 finalized_date = CURRENT_TIMESTAMP, finalized_by = ?2 WHERE id = ?3",
                params![state, user, session_id],
            ),
            ReviewState::NeedsReview => self.conn.execute(
                "UPDATE review_sessions SET review_state = ?1 WHERE id = ?2",
                params![state, session_id],
            ),
        };

        match result {
            Ok(_) => TransitionOutcome::ok(format!("State changed to {}", state)),
            Err(e) => TransitionOutcome::fail(format!("Failed to set state: {}", e)),
        }
    }

    /// Drop the review state of a version, leaving the session in place
    pub fn clear_review_state(&self, asset_uuid: &str, version_label: &str) -> bool {
        self.conn
            .execute(
                "UPDATE review_sessions SET review_state = NULL \
                 WHERE asset_uuid = ?1 AND version_label = ?2",
                params![asset_uuid, version_label],
            )
            .or_warn(&format!("clear review state of {}:{}", asset_uuid, version_label))
            .is_some_and(|n| n > 0)
    }

    /// Current state of a version; `None` when there is no session or no state
    pub fn get_review_state(&self, asset_uuid: &str, version_label: &str) -> Result<Option<ReviewState>> {
        Ok(self
            .current(asset_uuid, version_label)?
            .and_then(|(_, state)| state))
    }

    /// Move to `in_progress`; finalized versions cannot be resubmitted
    pub fn submit_for_review(&self, asset_uuid: &str, version_label: &str, user: &str) -> TransitionOutcome {
        match self.current(asset_uuid, version_label) {
            Ok(Some((_, Some(ReviewState::Final)))) => {
                return TransitionOutcome::fail("Cannot submit - already finalized")
            }
            Ok(_) => {}
            Err(e) => return TransitionOutcome::fail(format!("Failed to submit: {}", e)),
        }

        let outcome = self.set_review_state(asset_uuid, version_label, ReviewState::InProgress, user);
        if outcome.success {
            TransitionOutcome::ok("Submitted for review")
        } else {
            outcome
        }
    }

    /// Move `approved` to `final`; already-final versions succeed unchanged
    pub fn finalize_review(&self, asset_uuid: &str, version_label: &str, user: &str) -> TransitionOutcome {
        let (session_id, state) = match self.current(asset_uuid, version_label) {
            Ok(Some(found)) => found,
            Ok(None) => return TransitionOutcome::fail("No review session found"),
            Err(e) => return TransitionOutcome::fail(format!("Failed to finalize: {}", e)),
        };

        match state {
            Some(ReviewState::Final) => return TransitionOutcome::ok("Already finalized"),
            Some(ReviewState::Approved) => {}
            other => {
                return TransitionOutcome::fail(format!(
                    "Cannot finalize from '{}' state - must be approved first",
                    other.map(|s| s.as_str()).unwrap_or("none")
                ))
            }
        }

        match self.conn.execute(
            "UPDATE review_sessions SET review_state = ?1, \
             finalized_date = CURRENT_TIMESTAMP, finalized_by = ?2 WHERE id = ?3",
            params![ReviewState::Final, user, session_id],
        ) {
            Ok(_) => TransitionOutcome::ok("Review finalized"),
            Err(e) => TransitionOutcome::fail(format!("Failed to finalize: {}", e)),
        }
    }

    /// Send an approved or final version back to `needs_review` or `in_progress`
    pub fn reopen_review(&self, asset_uuid: &str, version_label: &str, target: ReviewState) -> TransitionOutcome {
        if !matches!(target, ReviewState::NeedsReview | ReviewState::InProgress) {
            return TransitionOutcome::fail("Can only reopen to 'needs_review' or 'in_progress'");
        }

        let session_id = match self.current(asset_uuid, version_label) {
            Ok(Some((id, _))) => id,
            Ok(None) => return TransitionOutcome::fail("No review session found"),
            Err(e) => return TransitionOutcome::fail(format!("Failed to reopen: {}", e)),
        };

        match self.conn.execute(
            "UPDATE review_sessions SET review_state = ?1, approved_date = NULL, \
             finalized_date = NULL, finalized_by = NULL WHERE id = ?2",
            params![target, session_id],
        ) {
            Ok(_) => TransitionOutcome::ok(format!("Review reopened to '{}'", target)),
            Err(e) => TransitionOutcome::fail(format!("Failed to reopen: {}", e)),
        }
    }

    /// Sessions in the given state, most recently active first
    pub fn get_assets_by_review_state(&self, state: ReviewState) -> Result<Vec<ReviewSession>> {
        let sql = format!(
            "SELECT {} FROM review_sessions s WHERE s.review_state = ?1 \
             ORDER BY s.last_activity DESC, s.id DESC",
            ReviewSession::COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| anyhow!("Failed to prepare state query: {}", e))?;
        let sessions = stmt
            .query_map(params![state], ReviewSession::from_row)
            .map_err(|e| anyhow!("Failed to query sessions by state: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read sessions by state: {}", e))?;
        Ok(sessions)
    }

    /// Every session with a state, grouped by state; all four states are present as keys
    pub fn get_all_review_states(&self) -> Result<BTreeMap<ReviewState, Vec<ReviewSession>>> {
        let mut grouped: BTreeMap<ReviewState, Vec<ReviewSession>> =
            ReviewState::ALL.iter().map(|s| (*s, Vec::new())).collect();

        let sql = format!(
            "SELECT {} FROM review_sessions s WHERE s.review_state IS NOT NULL \
             ORDER BY s.last_activity DESC, s.id DESC",
            ReviewSession::COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| anyhow!("Failed to prepare state query: {}", e))?;
        let sessions = stmt
            .query_map([], ReviewSession::from_row)
            .map_err(|e| anyhow!("Failed to query review states: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read review states: {}", e))?;

        for session in sessions {
            // unknown stored states are skipped
            if let Some(state) = session.state() {
                grouped.entry(state).or_default().push(session);
            }
        }
        Ok(grouped)
    }

    fn current(&self, asset_uuid: &str, version_label: &str) -> Result<Option<(i64, Option<ReviewState>)>> {
        let row: Option<(i64, Option<String>)> = self
            .conn
            .query_row(
                "SELECT id, review_state FROM review_sessions WHERE asset_uuid = ?1 AND version_label = ?2",
                params![asset_uuid, version_label],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| anyhow!("Failed to read review state: {}", e))?;

        Ok(row.map(|(id, state)| (id, state.and_then(|s| s.parse().ok()))))
    }
}
