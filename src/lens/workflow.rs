//! Review workflow lens
//!
//! Cycle-aware rules on top of the review database: a cycle is opened on one
//! version, later versions of the same asset and variant join it, and approving the
//! last pending note moves the cycle to `approved`, from where it can be closed as
//! final at a specific version. Notes from leads send an open review back to
//! `in_progress`; a closed cycle never changes state again.

use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::database::{ReviewCycle, ReviewDatabase, ReviewState, TransitionOutcome, UserRole};

/// A cycle type offered when opening a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleTypePreset {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const REVIEW_CYCLE_TYPES: &[CycleTypePreset] = &[
    CycleTypePreset {
        name: "modeling",
        label: "Modeling",
        description: "geometry, topology and proportions",
    },
    CycleTypePreset {
        name: "texturing",
        label: "Texturing",
        description: "textures and UV layout",
    },
    CycleTypePreset {
        name: "rigging",
        label: "Rigging",
        description: "skeleton, controls and deformation",
    },
    CycleTypePreset {
        name: "lighting",
        label: "Lighting",
        description: "light setup and render look",
    },
    CycleTypePreset {
        name: "animation",
        label: "Animation",
        description: "motion and timing",
    },
    CycleTypePreset {
        name: "fx",
        label: "FX",
        description: "simulation and effects",
    },
    CycleTypePreset {
        name: "lookdev",
        label: "Look Dev",
        description: "shading and materials",
    },
    CycleTypePreset {
        name: "general",
        label: "General",
        description: "anything else",
    },
];

/// Preset for a cycle type name
pub fn cycle_type_preset(name: &str) -> Option<&'static CycleTypePreset> {
    REVIEW_CYCLE_TYPES.iter().find(|p| p.name == name)
}

/// Where a version stands in the workflow
struct Position {
    /// Effective state: the cycle's when the version belongs to one
    state: Option<ReviewState>,
    cycle: Option<ReviewCycle>,
    /// Whether the version's session is linked to `cycle`
    linked: bool,
    session_state: Option<ReviewState>,
}

impl Position {
    fn is_closed(&self) -> bool {
        self.cycle.as_ref().is_some_and(|c| !c.is_active())
    }
}

/// Workflow lens over a [`ReviewDatabase`]
pub struct ReviewWorkflowLens<'a> {
    db: &'a ReviewDatabase,
}

impl<'a> ReviewWorkflowLens<'a> {
    pub fn new(db: &'a ReviewDatabase) -> Self {
        Self { db }
    }

    pub fn cycle_types(&self) -> &'static [CycleTypePreset] {
        REVIEW_CYCLE_TYPES
    }

    /// Open a cycle at `version_label` and link that version's session to it
    ///
    /// Fails for an unknown cycle type or when the asset variant already has an
    /// open cycle. If the version cannot be linked the new cycle is removed again.
    pub fn start_cycle(
        &self,
        asset_id: &str,
        variant_name: &str,
        cycle_type: &str,
        version_label: &str,
        submitted_by: &str,
    ) -> Result<ReviewCycle> {
        if cycle_type_preset(cycle_type).is_none() {
            return Err(anyhow!(
                "Unknown cycle type '{}'. Valid types: {}",
                cycle_type,
                REVIEW_CYCLE_TYPES
                    .iter()
                    .map(|p| p.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        if let Some(open) = self.db.get_active_cycle_for_variant(asset_id, variant_name)? {
            return Err(anyhow!(
                "A {} cycle is already open for {} ({}) since {}",
                open.cycle_type,
                asset_id,
                variant_name,
                open.start_version
            ));
        }

        let cycle_id = self
            .db
            .create_cycle(asset_id, cycle_type, version_label, submitted_by, variant_name)
            .ok_or_else(|| anyhow!("Failed to create review cycle for {}", asset_id))?;
        if let Err(e) = self.attach_start_version(asset_id, version_label, cycle_id, submitted_by) {
            if !self.db.delete_cycle(cycle_id) {
                warn!("cycle {} left behind after failed start", cycle_id);
            }
            return Err(e);
        }

        info!(
            "started {} cycle {} for {} at {}",
            cycle_type, cycle_id, asset_id, version_label
        );
        self.db
            .get_cycle(cycle_id)?
            .ok_or_else(|| anyhow!("Failed to read back cycle {}", cycle_id))
    }

    fn attach_start_version(
        &self,
        asset_id: &str,
        version_label: &str,
        cycle_id: i64,
        submitted_by: &str,
    ) -> Result<()> {
        let session_id = self
            .db
            .get_or_create_session(asset_id, version_label)
            .ok_or_else(|| anyhow!("Failed to create review session for {}", asset_id))?;
        if !self.db.link_to_cycle(session_id, cycle_id) {
            return Err(anyhow!("Failed to link {} to cycle {}", version_label, cycle_id));
        }
        let outcome = self.db.set_review_state(
            asset_id,
            version_label,
            ReviewState::NeedsReview,
            submitted_by,
        );
        if !outcome.success {
            return Err(anyhow!("Failed to submit {}: {}", version_label, outcome.message));
        }
        Ok(())
    }

    /// Effective review state of a version; the cycle's state wins over the session's
    pub fn current_state(&self, asset_id: &str, version_label: &str) -> Result<Option<ReviewState>> {
        Ok(self.position(asset_id, version_label)?.state)
    }

    /// Whether the version belongs to a cycle or carries a review state of its own
    pub fn is_in_review_workflow(&self, asset_id: &str, version_label: &str) -> Result<bool> {
        let pos = self.position(asset_id, version_label)?;
        Ok(pos.cycle.is_some() || pos.state.is_some())
    }

    /// Notes may be added while the review is open; final or closed reviews are read-only
    pub fn can_add_comments(&self, asset_id: &str, version_label: &str) -> Result<bool> {
        let pos = self.position(asset_id, version_label)?;
        Ok(!pos.is_closed()
            && matches!(
                pos.state,
                Some(ReviewState::NeedsReview | ReviewState::InProgress | ReviewState::Approved)
            ))
    }

    /// The cycle a version belongs to: its linked cycle, else the newest cycle of the
    /// variant whose version range covers it
    pub fn cycle_for_version(
        &self,
        asset_id: &str,
        variant_name: &str,
        version_label: &str,
    ) -> Result<Option<ReviewCycle>> {
        if let Some(cycle_id) = self
            .db
            .get_session(asset_id, version_label)?
            .and_then(|s| s.cycle_id)
        {
            return self.db.get_cycle(cycle_id);
        }

        Ok(self
            .db
            .get_cycles_for_asset(asset_id)?
            .into_iter()
            .filter(|c| c.variant_name == variant_name)
            .find(|c| covers(c, version_label)))
    }

    /// Join a new version to the variant's open cycle, if it started at or before it
    ///
    /// Returns the cycle id the version is now linked to.
    pub fn link_version_to_active_cycle(
        &self,
        asset_id: &str,
        variant_name: &str,
        version_label: &str,
    ) -> Result<Option<i64>> {
        let Some(cycle) = self.db.get_active_cycle_for_variant(asset_id, variant_name)? else {
            return Ok(None);
        };
        if version_label < cycle.start_version.as_str() {
            return Ok(None);
        }

        let session_id = self
            .db
            .get_or_create_session(asset_id, version_label)
            .ok_or_else(|| anyhow!("Failed to create review session for {}", asset_id))?;
        if !self.db.link_to_cycle(session_id, cycle.id) {
            return Err(anyhow!("Failed to link {} to cycle {}", version_label, cycle.id));
        }
        Ok(Some(cycle.id))
    }

    /// Re-evaluate state after a note was added
    ///
    /// A note from a lead or above sends a `needs_review` or `approved` review to
    /// `in_progress`. Notes from artists never change the state.
    pub fn on_comment_added(
        &self,
        asset_id: &str,
        version_label: &str,
        author_role: UserRole,
        author: &str,
    ) -> Result<Option<ReviewState>> {
        if !author_role.is_elevated() {
            return Ok(None);
        }
        let pos = self.position(asset_id, version_label)?;
        if pos.is_closed() {
            return Ok(None);
        }
        match pos.state {
            Some(ReviewState::NeedsReview | ReviewState::Approved) => {
                self.transition(asset_id, version_label, &pos, ReviewState::InProgress, author)?;
                Ok(Some(ReviewState::InProgress))
            }
            _ => Ok(None),
        }
    }

    /// Re-evaluate state after the artist marked a note addressed
    ///
    /// A review still waiting in `needs_review` moves to `in_progress`.
    pub fn on_note_addressed(
        &self,
        asset_id: &str,
        version_label: &str,
        addressed_by: &str,
    ) -> Result<Option<ReviewState>> {
        let pos = self.position(asset_id, version_label)?;
        if pos.is_closed() || pos.state != Some(ReviewState::NeedsReview) {
            return Ok(None);
        }
        self.transition(
            asset_id,
            version_label,
            &pos,
            ReviewState::InProgress,
            addressed_by,
        )?;
        Ok(Some(ReviewState::InProgress))
    }

    /// Re-evaluate state after a note approval
    ///
    /// Only a review in `needs_review` or `in_progress` moves. Once the cycle (or,
    /// outside a cycle, the version) has notes and none of them are open or
    /// addressed, it becomes `approved`. Returns the new state when it changed.
    pub fn on_note_approved(
        &self,
        asset_id: &str,
        version_label: &str,
        approved_by: &str,
    ) -> Result<Option<ReviewState>> {
        let pos = self.position(asset_id, version_label)?;
        if pos.is_closed()
            || !matches!(
                pos.state,
                Some(ReviewState::NeedsReview | ReviewState::InProgress)
            )
        {
            return Ok(None);
        }

        let counts = match &pos.cycle {
            Some(cycle) => self.db.get_cycle_note_counts(cycle.id)?,
            None => self.db.get_note_status_counts(asset_id, version_label)?,
        };
        if counts.total == 0 || counts.pending() > 0 {
            return Ok(None);
        }

        self.transition(asset_id, version_label, &pos, ReviewState::Approved, approved_by)?;
        info!("{} {} approved, no pending notes left", asset_id, version_label);
        Ok(Some(ReviewState::Approved))
    }

    /// Re-evaluate state after a note went back to `open`
    ///
    /// A lead or above reopening a note on an approved review sends it back to
    /// `in_progress`.
    pub fn on_note_reopened(
        &self,
        asset_id: &str,
        version_label: &str,
        actor_role: UserRole,
        actor: &str,
    ) -> Result<Option<ReviewState>> {
        if !actor_role.is_elevated() {
            return Ok(None);
        }
        let pos = self.position(asset_id, version_label)?;
        if pos.is_closed() || pos.state != Some(ReviewState::Approved) {
            return Ok(None);
        }
        self.transition(asset_id, version_label, &pos, ReviewState::InProgress, actor)?;
        Ok(Some(ReviewState::InProgress))
    }

    /// Close the version's cycle as final at `version_label`
    ///
    /// Outside a cycle this is a plain session finalize.
    pub fn mark_as_final(
        &self,
        asset_id: &str,
        variant_name: &str,
        version_label: &str,
        user: &str,
    ) -> Result<TransitionOutcome> {
        let Some(cycle) = self.cycle_for_version(asset_id, variant_name, version_label)? else {
            return Ok(self.db.finalize_review(asset_id, version_label, user));
        };

        match cycle.state() {
            Some(ReviewState::Final) => return Ok(TransitionOutcome::ok("Already finalized")),
            Some(ReviewState::Approved) => {}
            other => {
                return Ok(TransitionOutcome::fail(format!(
                    "Cannot finalize from '{}' state - must be approved first",
                    other.map(|s| s.as_str()).unwrap_or("none")
                )))
            }
        }

        let previous = self.db.get_review_state(asset_id, version_label)?;
        let outcome = self
            .db
            .set_review_state(asset_id, version_label, ReviewState::Final, user);
        if !outcome.success {
            return Ok(outcome);
        }
        if !self.db.close_cycle(cycle.id, version_label, user) {
            // put the session back where it was
            let restored = match previous {
                Some(state) => self
                    .db
                    .set_review_state(asset_id, version_label, state, user)
                    .success,
                None => self.db.clear_review_state(asset_id, version_label),
            };
            if !restored {
                warn!("{} {} left final on an open cycle", asset_id, version_label);
            }
            return Ok(TransitionOutcome::fail("Failed to close review cycle"));
        }
        info!("cycle {} finalized at {}", cycle.id, version_label);
        Ok(TransitionOutcome::ok(format!(
            "Cycle finalized at {}",
            version_label
        )))
    }

    /// Take a version out of its cycle; the version that opened the cycle stays
    pub fn cancel_review(&self, asset_id: &str, version_label: &str) -> Result<TransitionOutcome> {
        let Some(session) = self.db.get_session(asset_id, version_label)? else {
            return Ok(TransitionOutcome::fail("No review session found"));
        };
        let Some(cycle_id) = session.cycle_id else {
            return Ok(if self.db.clear_review_state(asset_id, version_label) {
                TransitionOutcome::ok("Review cancelled")
            } else {
                TransitionOutcome::fail("Failed to cancel review")
            });
        };

        if let Some(cycle) = self.db.get_cycle(cycle_id)? {
            if cycle.start_version == version_label {
                return Ok(TransitionOutcome::fail(
                    "Cannot cancel the version that started the review cycle",
                ));
            }
        }

        Ok(if self.db.unlink_from_cycle(session.id) {
            TransitionOutcome::ok("Review cancelled")
        } else {
            TransitionOutcome::fail("Failed to cancel review")
        })
    }

    fn position(&self, asset_id: &str, version_label: &str) -> Result<Position> {
        let session = self.db.get_session(asset_id, version_label)?;
        let status = self
            .db
            .get_review_status(asset_id, version_label, Some(asset_id))?;
        let cycle = match status.cycle_id {
            Some(cycle_id) => self.db.get_cycle(cycle_id)?,
            None => None,
        };
        let linked = match (&session, &cycle) {
            (Some(s), Some(c)) => s.cycle_id == Some(c.id),
            _ => false,
        };
        Ok(Position {
            state: status.review_state.and_then(|s| s.parse().ok()),
            cycle,
            linked,
            session_state: session.and_then(|s| s.state()),
        })
    }

    /// Move the version's cycle, and its session when it carries the state, to `target`
    fn transition(
        &self,
        asset_id: &str,
        version_label: &str,
        pos: &Position,
        target: ReviewState,
        user: &str,
    ) -> Result<()> {
        if let Some(cycle) = &pos.cycle {
            if !cycle.is_active() {
                return Err(anyhow!("Review cycle {} is closed", cycle.id));
            }
            if !self.db.set_cycle_state(cycle.id, target) {
                return Err(anyhow!("Failed to set cycle {} to {}", cycle.id, target));
            }
            if !pos.linked {
                return Ok(());
            }
        }

        let reopening = matches!(
            pos.session_state,
            Some(ReviewState::Approved | ReviewState::Final)
        ) && matches!(target, ReviewState::NeedsReview | ReviewState::InProgress);
        let outcome = if reopening {
            self.db.reopen_review(asset_id, version_label, target)
        } else {
            self.db.set_review_state(asset_id, version_label, target, user)
        };
        if !outcome.success {
            return Err(anyhow!(
                "Failed to move {} {} to {}: {}",
                asset_id,
                version_label,
                target,
                outcome.message
            ));
        }
        Ok(())
    }
}

/// Whether a version falls inside the cycle's range; open cycles have no upper bound
fn covers(cycle: &ReviewCycle, version_label: &str) -> bool {
    version_label >= cycle.start_version.as_str()
        && cycle
            .end_version
            .as_deref()
            .map_or(true, |end| version_label <= end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NoteStatus;

    fn add_note(db: &ReviewDatabase, version: &str) -> i64 {
        db.add_note("chair", version, "fix the legs", None, "lead1", UserRole::Lead)
            .unwrap()
    }

    #[test]
    fn test_start_cycle_rules() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);

        assert!(lens
            .start_cycle("chair", "Base", "sculpting", "v001", "artist1")
            .is_err());

        let cycle = lens
            .start_cycle("chair", "Base", "modeling", "v001", "artist1")
            .unwrap();
        assert_eq!(cycle.state(), Some(ReviewState::NeedsReview));
        assert!(cycle.is_active());

        let err = lens
            .start_cycle("chair", "Base", "texturing", "v002", "artist1")
            .unwrap_err();
        assert!(err.to_string().contains("already open"));

        // other variants get their own cycle
        assert!(lens
            .start_cycle("chair", "Damaged", "texturing", "v002", "artist1")
            .is_ok());
        assert_eq!(
            lens.current_state("chair", "v001").unwrap(),
            Some(ReviewState::NeedsReview)
        );
    }

    #[test]
    fn test_link_version_and_lookup() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);
        let cycle = lens
            .start_cycle("chair", "Base", "modeling", "v002", "artist1")
            .unwrap();

        assert_eq!(
            lens.link_version_to_active_cycle("chair", "Base", "v001").unwrap(),
            None
        );
        assert_eq!(
            lens.link_version_to_active_cycle("chair", "Base", "v003").unwrap(),
            Some(cycle.id)
        );
        assert_eq!(
            lens.cycle_for_version("chair", "Base", "v003").unwrap().map(|c| c.id),
            Some(cycle.id)
        );
        // unlinked but covered by the open cycle's range
        assert_eq!(
            lens.cycle_for_version("chair", "Base", "v004").unwrap().map(|c| c.id),
            Some(cycle.id)
        );
        assert!(lens.cycle_for_version("chair", "Base", "v001").unwrap().is_none());
        assert_eq!(db.get_cycle_sessions(cycle.id).unwrap().len(), 2);
    }

    #[test]
    fn test_approval_then_final() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);
        let cycle = lens
            .start_cycle("chair", "Base", "modeling", "v001", "artist1")
            .unwrap();
        lens.link_version_to_active_cycle("chair", "Base", "v002")
            .unwrap();

        let first = add_note(&db, "v001");
        let second = add_note(&db, "v002");

        let outcome = lens.mark_as_final("chair", "Base", "v002", "lead1").unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("must be approved first"));

        assert!(db.approve_note(first, "lead1"));
        assert_eq!(lens.on_note_approved("chair", "v001", "lead1").unwrap(), None);

        assert!(db.set_note_status(second, NoteStatus::Addressed, "artist1"));
        assert!(db.approve_note(second, "lead1"));
        assert_eq!(
            lens.on_note_approved("chair", "v002", "lead1").unwrap(),
            Some(ReviewState::Approved)
        );
        assert_eq!(
            lens.current_state("chair", "v001").unwrap(),
            Some(ReviewState::Approved)
        );

        let outcome = lens.mark_as_final("chair", "Base", "v002", "lead1").unwrap();
        assert!(outcome.success, "{}", outcome);
        let closed = db.get_cycle(cycle.id).unwrap().unwrap();
        assert_eq!(closed.end_version.as_deref(), Some("v002"));
        assert_eq!(closed.state(), Some(ReviewState::Final));
        assert!(db.get_active_cycle_for_variant("chair", "Base").unwrap().is_none());

        // a closed cycle frees the variant for the next one
        assert!(lens
            .start_cycle("chair", "Base", "texturing", "v003", "artist1")
            .is_ok());
    }

    #[test]
    fn test_approval_outside_cycle() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);
        let note = add_note(&db, "v001");
        assert!(db.approve_note(note, "lead1"));

        // not submitted yet, nothing to approve
        assert_eq!(lens.on_note_approved("chair", "v001", "lead1").unwrap(), None);

        assert!(db.submit_for_review("chair", "v001", "artist1").success);
        assert_eq!(
            lens.on_note_approved("chair", "v001", "lead1").unwrap(),
            Some(ReviewState::Approved)
        );
        assert_eq!(lens.on_note_approved("chair", "v001", "lead1").unwrap(), None);
        assert!(lens.mark_as_final("chair", "Base", "v001", "lead1").unwrap().success);
        assert_eq!(
            db.get_review_state("chair", "v001").unwrap(),
            Some(ReviewState::Final)
        );
    }

    #[test]
    fn test_cancel_review() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);
        lens.start_cycle("chair", "Base", "modeling", "v001", "artist1")
            .unwrap();
        lens.link_version_to_active_cycle("chair", "Base", "v002")
            .unwrap();

        assert!(!lens.cancel_review("chair", "v001").unwrap().success);
        assert!(lens.cancel_review("chair", "v002").unwrap().success);
        assert_eq!(db.get_session("chair", "v002").unwrap().unwrap().cycle_id, None);
        assert!(!lens.cancel_review("chair", "v009").unwrap().success);
    }
    #[test]
    fn test_closed_cycle_stays_final() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);
        let cycle = lens
            .start_cycle("chair", "Base", "modeling", "v001", "artist1")
            .unwrap();
        let note = add_note(&db, "v001");
        assert!(db.approve_note(note, "lead1"));
        assert_eq!(
            lens.on_note_approved("chair", "v001", "lead1").unwrap(),
            Some(ReviewState::Approved)
        );
        assert!(lens.mark_as_final("chair", "Base", "v001", "lead1").unwrap().success);

        assert_eq!(lens.on_note_approved("chair", "v001", "lead1").unwrap(), None);
        assert_eq!(
            lens.on_comment_added("chair", "v001", UserRole::Supervisor, "sup1")
                .unwrap(),
            None
        );
        assert_eq!(
            lens.on_note_reopened("chair", "v001", UserRole::Lead, "lead1")
                .unwrap(),
            None
        );
        assert!(!lens.can_add_comments("chair", "v001").unwrap());

        let closed = db.get_cycle(cycle.id).unwrap().unwrap();
        assert_eq!(closed.state(), Some(ReviewState::Final));
        assert_eq!(closed.end_version.as_deref(), Some("v001"));
        assert_eq!(
            db.get_review_state("chair", "v001").unwrap(),
            Some(ReviewState::Final)
        );
    }

    #[test]
    fn test_comment_added_by_role() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);
        let cycle = lens
            .start_cycle("chair", "Base", "modeling", "v001", "artist1")
            .unwrap();

        assert_eq!(
            lens.on_comment_added("chair", "v001", UserRole::Artist, "artist1")
                .unwrap(),
            None
        );
        assert_eq!(
            lens.current_state("chair", "v001").unwrap(),
            Some(ReviewState::NeedsReview)
        );

        assert_eq!(
            lens.on_comment_added("chair", "v001", UserRole::Lead, "lead1")
                .unwrap(),
            Some(ReviewState::InProgress)
        );
        assert_eq!(
            db.get_cycle(cycle.id).unwrap().unwrap().state(),
            Some(ReviewState::InProgress)
        );
        // already in progress
        assert_eq!(
            lens.on_comment_added("chair", "v001", UserRole::Lead, "lead1")
                .unwrap(),
            None
        );

        // pushback on an approved review
        assert!(db.set_cycle_state(cycle.id, ReviewState::Approved));
        assert_eq!(
            lens.on_comment_added("chair", "v001", UserRole::Director, "dir1")
                .unwrap(),
            Some(ReviewState::InProgress)
        );
        assert_eq!(
            lens.current_state("chair", "v001").unwrap(),
            Some(ReviewState::InProgress)
        );
    }

    #[test]
    fn test_note_addressed_starts_work() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);
        lens.start_cycle("chair", "Base", "modeling", "v001", "artist1")
            .unwrap();
        let note = add_note(&db, "v001");
        assert!(db.mark_note_addressed(note, "artist1"));

        assert_eq!(
            lens.on_note_addressed("chair", "v001", "artist1").unwrap(),
            Some(ReviewState::InProgress)
        );
        assert_eq!(lens.on_note_addressed("chair", "v001", "artist1").unwrap(), None);
        assert_eq!(
            db.get_review_state("chair", "v001").unwrap(),
            Some(ReviewState::InProgress)
        );

        // outside any workflow nothing moves
        assert_eq!(lens.on_note_addressed("table", "v001", "artist1").unwrap(), None);
    }

    #[test]
    fn test_note_reopened_on_approved_review() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);
        lens.start_cycle("chair", "Base", "modeling", "v001", "artist1")
            .unwrap();
        let note = add_note(&db, "v001");
        assert!(db.approve_note(note, "lead1"));
        lens.on_note_approved("chair", "v001", "lead1").unwrap();
        assert!(db.reopen_note(note, "lead1"));

        assert_eq!(
            lens.on_note_reopened("chair", "v001", UserRole::Artist, "artist1")
                .unwrap(),
            None
        );
        assert_eq!(
            lens.on_note_reopened("chair", "v001", UserRole::Lead, "lead1")
                .unwrap(),
            Some(ReviewState::InProgress)
        );
        let session = db.get_session("chair", "v001").unwrap().unwrap();
        assert_eq!(session.state(), Some(ReviewState::InProgress));
        assert!(session.approved_date.is_none());
    }

    #[test]
    fn test_workflow_membership() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);

        assert!(!lens.is_in_review_workflow("chair", "v001").unwrap());
        assert!(!lens.can_add_comments("chair", "v001").unwrap());

        lens.start_cycle("chair", "Base", "modeling", "v002", "artist1")
            .unwrap();
        assert!(lens.is_in_review_workflow("chair", "v002").unwrap());
        assert!(lens.can_add_comments("chair", "v002").unwrap());
        // later versions fall inside the open cycle
        assert!(lens.is_in_review_workflow("chair", "v003").unwrap());
        assert!(!lens.is_in_review_workflow("chair", "v001").unwrap());

        assert!(db.submit_for_review("table", "v001", "artist1").success);
        assert!(lens.is_in_review_workflow("table", "v001").unwrap());
        assert!(lens.can_add_comments("table", "v001").unwrap());
    }

    #[test]
    fn test_failed_start_leaves_no_cycle() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let lens = ReviewWorkflowLens::new(&db);
        db.connection()
            .execute_batch(
                "CREATE TRIGGER block_link BEFORE UPDATE OF cycle_id ON review_sessions \
                 WHEN NEW.cycle_id IS NOT NULL BEGIN SELECT RAISE(ABORT, 'blocked'); END;",
            )
            .unwrap();

        assert!(lens
            .start_cycle("chair", "Base", "modeling", "v001", "artist1")
            .is_err());
        assert!(db.get_cycles_for_asset("chair").unwrap().is_empty());

        db.connection()
            .execute_batch("DROP TRIGGER block_link;")
            .unwrap();
        assert!(lens
            .start_cycle("chair", "Base", "modeling", "v001", "artist1")
            .is_ok());
    }
}
