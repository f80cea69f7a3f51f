//! Reviews database
//!
//! `ReviewDatabase` owns the connection to `reviews.db` and hands out the entity
//! managers. Every manager operation is also available as a flat method so callers
//! holding one `&ReviewDatabase` never need to know which manager answers.

mod audit;
mod cleanup;
mod cycles;
mod drawovers;
mod notes;
mod screenshots;
mod sessions;
mod settings;
mod state;
mod status;
mod types;

pub use audit::{AuditLogEntry, AuditRepository, DEFAULT_ACTIVITY_LIMIT, DEFAULT_AUDIT_LIMIT};
pub use cleanup::{
    CleanupRepository, ReviewStats, DEFAULT_ARCHIVE_AFTER_DAYS, DEFAULT_PURGE_AFTER_DAYS,
};
pub use cycles::{CycleRepository, ReviewCycle, DEFAULT_VARIANT_NAME};
pub use drawovers::{
    DrawoverAction, DrawoverAuditEntry, DrawoverMetadata, DrawoverRepository,
    DEFAULT_DRAWOVER_AUDIT_LIMIT,
};
pub use notes::{NoteRepository, ReviewNote};
pub use screenshots::{ReviewScreenshot, ScreenshotRepository};
pub use sessions::{ReviewSession, SessionRepository};
pub use settings::{
    SettingsRepository, StudioUser, SETTING_APP_MODE, SETTING_CURRENT_USER, SETTING_SHOW_DELETED,
};
pub use state::StateRepository;
pub use status::{AssetNoteSummary, ReviewStatus, StatusRepository};
pub use types::{NoteCounts, NoteStatus, ReviewState, TransitionOutcome, UserRole};

use crate::database::core::{DatabaseConn, SchemaManager, SchemaStatus};
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

/// File name of the reviews database inside the data directory
pub const DATABASE_FILE_NAME: &str = "reviews.db";

/// Main reviews database
///
/// `ReviewDatabase` provides a unified interface to every review table.
/// It handles:
/// - Schema initialization and migrations
/// - Access to the entity managers
///
/// One instance is created at startup and passed by reference to whatever needs it.
pub struct ReviewDatabase {
    db: DatabaseConn,
}

impl ReviewDatabase {
    /// Open the reviews database at the specified path
    ///
    /// Missing files are created; older schemas are migrated in place. A file written
    /// by a newer schema version is refused rather than modified.
    pub fn open(path: &str) -> Result<Self> {
        let db = DatabaseConn::open(Some(path))?;
        let schema = SchemaManager::new(&db.conn);

        match schema.check_status()? {
            SchemaStatus::Current => {
                info!("reviews database schema is current");
            }
            SchemaStatus::NotInitialized => {
                info!("initializing reviews database schema at {}", path);
            }
            SchemaStatus::NeedsMigration { from, to } => {
                info!("reviews database needs migration from v{} to v{}", from, to);
            }
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => {
                return Err(anyhow!(
                    "Failed to open reviews database: schema v{} is newer than supported v{}",
                    database_version,
                    required_version
                ));
            }
            SchemaStatus::Corrupted => {
                info!("reviews database is missing tables, recreating them");
            }
        }

        schema.initialize()?;
        Ok(Self { db })
    }

    /// Open the reviews database from a data directory
    ///
    /// Creates the directory when needed and uses `{data_dir}/reviews.db`.
    pub fn open_in_dir(data_dir: &str) -> Result<Self> {
        ensure_data_dir(data_dir)?;
        let path = Path::new(data_dir).join(DATABASE_FILE_NAME);
        Self::open(&path.to_string_lossy())
    }

    /// Create an in-memory reviews database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let db = DatabaseConn::open_in_memory()?;
        SchemaManager::new(&db.conn).initialize()?;
        Ok(Self { db })
    }

    /// Close the connection
    pub fn close(self) -> Result<()> {
        self.db.close()
    }

    /// Get the underlying database connection (for advanced queries)
    pub fn connection(&self) -> &rusqlite::Connection {
        &self.db.conn
    }

    /// Stored schema version
    pub fn schema_version(&self) -> Result<u32> {
        SchemaManager::new(&self.db.conn).get_schema_version()
    }

    pub fn sessions(&self) -> SessionRepository<'_> {
        SessionRepository::new(&self.db.conn)
    }

    pub fn cycles(&self) -> CycleRepository<'_> {
        CycleRepository::new(&self.db.conn)
    }

    pub fn notes(&self) -> NoteRepository<'_> {
        NoteRepository::new(&self.db.conn)
    }

    pub fn screenshots(&self) -> ScreenshotRepository<'_> {
        ScreenshotRepository::new(&self.db.conn)
    }

    pub fn drawovers(&self) -> DrawoverRepository<'_> {
        DrawoverRepository::new(&self.db.conn)
    }

    pub fn state(&self) -> StateRepository<'_> {
        StateRepository::new(&self.db.conn)
    }

    pub fn status(&self) -> StatusRepository<'_> {
        StatusRepository::new(&self.db.conn)
    }

    pub fn audit(&self) -> AuditRepository<'_> {
        AuditRepository::new(&self.db.conn)
    }

    pub fn cleanup(&self) -> CleanupRepository<'_> {
        CleanupRepository::new(&self.db.conn)
    }

    pub fn settings(&self) -> SettingsRepository<'_> {
        SettingsRepository::new(&self.db.conn)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub fn get_or_create_session(&self, asset_uuid: &str, version_label: &str) -> Option<i64> {
        self.sessions().get_or_create_session(asset_uuid, version_label)
    }

    pub fn get_session(&self, asset_uuid: &str, version_label: &str) -> Result<Option<ReviewSession>> {
        self.sessions().get_session(asset_uuid, version_label)
    }

    pub fn get_session_by_id(&self, session_id: i64) -> Result<Option<ReviewSession>> {
        self.sessions().get_session_by_id(session_id)
    }

    pub fn get_sessions_for_asset(&self, asset_uuid: &str) -> Result<Vec<ReviewSession>> {
        self.sessions().get_sessions_for_asset(asset_uuid)
    }

    pub fn update_session_status(&self, session_id: i64, status: &str, update_activity: bool) -> bool {
        self.sessions()
            .update_session_status(session_id, status, update_activity)
    }

    pub fn update_session_activity(&self, session_id: i64) -> bool {
        self.sessions().update_session_activity(session_id)
    }

    pub fn link_to_cycle(&self, session_id: i64, cycle_id: i64) -> bool {
        self.sessions().link_to_cycle(session_id, cycle_id)
    }

    pub fn unlink_from_cycle(&self, session_id: i64) -> bool {
        self.sessions().unlink_from_cycle(session_id)
    }

    // =========================================================================
    // Cycles
    // =========================================================================

    pub fn create_cycle(
        &self,
        asset_id: &str,
        cycle_type: &str,
        start_version: &str,
        submitted_by: &str,
        variant_name: &str,
    ) -> Option<i64> {
        self.cycles()
            .create_cycle(asset_id, cycle_type, start_version, submitted_by, variant_name)
    }

    pub fn get_active_cycle(&self, asset_id: &str) -> Result<Option<ReviewCycle>> {
        self.cycles().get_active_cycle(asset_id)
    }

    pub fn get_active_cycle_for_variant(&self, asset_id: &str, variant_name: &str) -> Result<Option<ReviewCycle>> {
        self.cycles().get_active_cycle_for_variant(asset_id, variant_name)
    }

    pub fn get_cycle(&self, cycle_id: i64) -> Result<Option<ReviewCycle>> {
        self.cycles().get_cycle(cycle_id)
    }

    pub fn get_cycles_for_asset(&self, asset_id: &str) -> Result<Vec<ReviewCycle>> {
        self.cycles().get_cycles_for_asset(asset_id)
    }

    pub fn set_cycle_state(&self, cycle_id: i64, state: ReviewState) -> bool {
        self.cycles().set_cycle_state(cycle_id, state)
    }

    pub fn close_cycle(&self, cycle_id: i64, end_version: &str, finalized_by: &str) -> bool {
        self.cycles().close_cycle(cycle_id, end_version, finalized_by)
    }

    pub fn delete_cycle(&self, cycle_id: i64) -> bool {
        self.cycles().delete_cycle(cycle_id)
    }

    pub fn link_session_to_cycle(&self, session_id: i64, cycle_id: i64) -> bool {
        self.cycles().link_session_to_cycle(session_id, cycle_id)
    }

    pub fn get_cycle_sessions(&self, cycle_id: i64) -> Result<Vec<ReviewSession>> {
        self.cycles().get_cycle_sessions(cycle_id)
    }

    pub fn get_cycle_notes(&self, cycle_id: i64, include_deleted: bool) -> Result<Vec<ReviewNote>> {
        self.cycles().get_cycle_notes(cycle_id, include_deleted)
    }

    pub fn get_cycle_note_counts(&self, cycle_id: i64) -> Result<NoteCounts> {
        self.cycles().get_cycle_note_counts(cycle_id)
    }

    // =========================================================================
    // Notes
    // =========================================================================

    pub fn get_notes_for_version(
        &self,
        asset_uuid: &str,
        version_label: &str,
        include_deleted: bool,
    ) -> Result<Vec<ReviewNote>> {
        self.notes()
            .get_notes_for_version(asset_uuid, version_label, include_deleted)
    }

    pub fn get_notes_for_screenshot(&self, screenshot_id: i64, include_deleted: bool) -> Result<Vec<ReviewNote>> {
        self.notes().get_notes_for_screenshot(screenshot_id, include_deleted)
    }

    pub fn add_note(
        &self,
        asset_uuid: &str,
        version_label: &str,
        text: &str,
        screenshot_id: Option<i64>,
        author: &str,
        author_role: UserRole,
    ) -> Option<i64> {
        self.notes()
            .add_note(asset_uuid, version_label, text, screenshot_id, author, author_role)
    }

    pub fn update_note(&self, note_id: i64, text: &str) -> bool {
        self.notes().update_note(note_id, text)
    }

    pub fn get_note_by_id(&self, note_id: i64) -> Result<Option<ReviewNote>> {
        self.notes().get_note_by_id(note_id)
    }

    pub fn soft_delete_note(&self, note_id: i64, deleted_by: &str) -> bool {
        self.notes().soft_delete_note(note_id, deleted_by)
    }

    pub fn delete_note(&self, note_id: i64, deleted_by: &str) -> bool {
        self.notes().delete_note(note_id, deleted_by)
    }

    pub fn restore_note(&self, note_id: i64) -> bool {
        self.notes().restore_note(note_id)
    }

    pub fn hard_delete_note(&self, note_id: i64) -> bool {
        self.notes().hard_delete_note(note_id)
    }

    pub fn set_note_resolved(&self, note_id: i64, resolved: bool, resolved_by: &str) -> bool {
        self.notes().set_note_resolved(note_id, resolved, resolved_by)
    }

    pub fn set_note_status(&self, note_id: i64, status: NoteStatus, actor: &str) -> bool {
        self.notes().set_note_status(note_id, status, actor)
    }

    pub fn mark_note_addressed(&self, note_id: i64, addressed_by: &str) -> bool {
        self.notes().mark_note_addressed(note_id, addressed_by)
    }

    pub fn approve_note(&self, note_id: i64, approved_by: &str) -> bool {
        self.notes().approve_note(note_id, approved_by)
    }

    pub fn reopen_note(&self, note_id: i64, reopened_by: &str) -> bool {
        self.notes().reopen_note(note_id, reopened_by)
    }

    pub fn get_note_status_counts(&self, asset_uuid: &str, version_label: &str) -> Result<NoteCounts> {
        self.notes().get_note_status_counts(asset_uuid, version_label)
    }

    // =========================================================================
    // Screenshots
    // =========================================================================

    pub fn add_screenshot(
        &self,
        asset_uuid: &str,
        version_label: &str,
        filename: &str,
        file_path: &str,
        display_name: &str,
        uploaded_by: &str,
    ) -> Option<i64> {
        self.screenshots().add_screenshot(
            asset_uuid,
            version_label,
            filename,
            file_path,
            display_name,
            uploaded_by,
        )
    }

    pub fn next_display_order(&self, asset_uuid: &str, version_label: &str) -> Result<i64> {
        self.screenshots().next_display_order(asset_uuid, version_label)
    }

    pub fn get_screenshots(&self, asset_uuid: &str, version_label: &str) -> Result<Vec<ReviewScreenshot>> {
        self.screenshots().get_screenshots(asset_uuid, version_label)
    }

    pub fn get_screenshot_by_id(&self, screenshot_id: i64) -> Result<Option<ReviewScreenshot>> {
        self.screenshots().get_screenshot_by_id(screenshot_id)
    }

    pub fn update_screenshot(
        &self,
        screenshot_id: i64,
        display_name: Option<&str>,
        display_order: Option<i64>,
    ) -> bool {
        self.screenshots()
            .update_screenshot(screenshot_id, display_name, display_order)
    }

    pub fn delete_screenshot(&self, screenshot_id: i64) -> bool {
        self.screenshots().delete_screenshot(screenshot_id)
    }

    pub fn reorder_screenshots(&self, asset_uuid: &str, version_label: &str, screenshot_ids: &[i64]) -> bool {
        self.screenshots()
            .reorder_screenshots(asset_uuid, version_label, screenshot_ids)
    }

    // =========================================================================
    // Drawovers
    // =========================================================================

    pub fn update_drawover_metadata(
        &self,
        asset_uuid: &str,
        version_label: &str,
        screenshot_id: i64,
        stroke_count: i64,
        authors: &[String],
        file_path: &str,
    ) -> bool {
        self.drawovers().update_drawover_metadata(
            asset_uuid,
            version_label,
            screenshot_id,
            stroke_count,
            authors,
            file_path,
        )
    }

    pub fn get_drawover_metadata(
        &self,
        asset_uuid: &str,
        version_label: &str,
        screenshot_id: i64,
    ) -> Result<Option<DrawoverMetadata>> {
        self.drawovers()
            .get_drawover_metadata(asset_uuid, version_label, screenshot_id)
    }

    pub fn get_version_drawovers(&self, asset_uuid: &str, version_label: &str) -> Result<Vec<DrawoverMetadata>> {
        self.drawovers().get_version_drawovers(asset_uuid, version_label)
    }

    pub fn delete_drawover_metadata(&self, asset_uuid: &str, version_label: &str, screenshot_id: i64) -> bool {
        self.drawovers()
            .delete_drawover_metadata(asset_uuid, version_label, screenshot_id)
    }

    pub fn log_drawover_action(&self, entry: &DrawoverAction<'_>) -> Option<i64> {
        self.drawovers().log_drawover_action(entry)
    }

    pub fn get_drawover_audit_log(
        &self,
        asset_uuid: &str,
        version_label: &str,
        screenshot_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<DrawoverAuditEntry>> {
        self.drawovers()
            .get_drawover_audit_log(asset_uuid, version_label, screenshot_id, limit)
    }

    // =========================================================================
    // Review state
    // =========================================================================

    pub fn set_review_state(
        &self,
        asset_uuid: &str,
        version_label: &str,
        state: ReviewState,
        user: &str,
    ) -> TransitionOutcome {
        self.state()
            .set_review_state(asset_uuid, version_label, state, user)
    }

    pub fn clear_review_state(&self, asset_uuid: &str, version_label: &str) -> bool {
        self.state().clear_review_state(asset_uuid, version_label)
    }

    pub fn get_review_state(&self, asset_uuid: &str, version_label: &str) -> Result<Option<ReviewState>> {
        self.state().get_review_state(asset_uuid, version_label)
    }

    pub fn submit_for_review(&self, asset_uuid: &str, version_label: &str, user: &str) -> TransitionOutcome {
        self.state().submit_for_review(asset_uuid, version_label, user)
    }

    pub fn finalize_review(&self, asset_uuid: &str, version_label: &str, user: &str) -> TransitionOutcome {
        self.state().finalize_review(asset_uuid, version_label, user)
    }

    pub fn reopen_review(&self, asset_uuid: &str, version_label: &str, target: ReviewState) -> TransitionOutcome {
        self.state().reopen_review(asset_uuid, version_label, target)
    }

    pub fn get_assets_by_review_state(&self, state: ReviewState) -> Result<Vec<ReviewSession>> {
        self.state().get_assets_by_review_state(state)
    }

    pub fn get_all_review_states(&self) -> Result<BTreeMap<ReviewState, Vec<ReviewSession>>> {
        self.state().get_all_review_states()
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub fn get_review_status(
        &self,
        asset_uuid: &str,
        version_label: &str,
        version_group_id: Option<&str>,
    ) -> Result<ReviewStatus> {
        self.status()
            .get_review_status(asset_uuid, version_label, version_group_id)
    }

    pub fn get_review_status_batch(&self, asset_versions: &[(String, String)]) -> Result<HashMap<String, ReviewStatus>> {
        self.status().get_review_status_batch(asset_versions)
    }

    pub fn get_assets_with_open_notes(&self) -> Result<Vec<AssetNoteSummary>> {
        self.status().get_assets_with_open_notes()
    }

    pub fn get_assets_awaiting_approval(&self) -> Result<Vec<AssetNoteSummary>> {
        self.status().get_assets_awaiting_approval()
    }

    // =========================================================================
    // Audit
    // =========================================================================

    pub fn log_action(
        &self,
        note_id: Option<i64>,
        action: &str,
        actor: &str,
        actor_role: &str,
        details: Option<&str>,
    ) -> Option<i64> {
        self.audit()
            .log_action(note_id, action, actor, actor_role, details)
    }

    pub fn get_audit_log(&self, note_id: Option<i64>, limit: u32) -> Result<Vec<AuditLogEntry>> {
        self.audit().get_audit_log(note_id, limit)
    }

    pub fn get_recent_activity(&self, limit: u32, actor: Option<&str>) -> Result<Vec<AuditLogEntry>> {
        self.audit().get_recent_activity(limit, actor)
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    pub fn cleanup_orphaned_sessions(&self) -> usize {
        self.cleanup().cleanup_orphaned_sessions()
    }

    pub fn archive_inactive_sessions(&self, days_inactive: u32) -> usize {
        self.cleanup().archive_inactive_sessions(days_inactive)
    }

    pub fn delete_archived_sessions(&self) -> usize {
        self.cleanup().delete_archived_sessions()
    }

    pub fn purge_deleted_notes(&self, days_old: u32) -> usize {
        self.cleanup().purge_deleted_notes(days_old)
    }

    pub fn get_stats(&self) -> Result<ReviewStats> {
        self.cleanup().get_stats()
    }

    // =========================================================================
    // Settings and users
    // =========================================================================

    pub fn get_setting(&self, key: &str, default: &str) -> String {
        self.settings().get_setting(key, default)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> bool {
        self.settings().set_setting(key, value)
    }

    pub fn is_studio_mode(&self) -> bool {
        self.settings().is_studio_mode()
    }

    pub fn set_studio_mode(&self, enabled: bool) -> bool {
        self.settings().set_studio_mode(enabled)
    }

    pub fn get_current_user(&self) -> String {
        self.settings().get_current_user()
    }

    pub fn set_current_user(&self, username: &str) -> bool {
        self.settings().set_current_user(username)
    }

    pub fn get_show_deleted(&self) -> bool {
        self.settings().get_show_deleted()
    }

    pub fn set_show_deleted(&self, show: bool) -> bool {
        self.settings().set_show_deleted(show)
    }

    pub fn get_all_users(&self, include_inactive: bool) -> Result<Vec<StudioUser>> {
        self.settings().get_all_users(include_inactive)
    }

    pub fn get_user(&self, username: &str) -> Result<Option<StudioUser>> {
        self.settings().get_user(username)
    }

    pub fn get_user_by_id(&self, user_id: i64) -> Result<Option<StudioUser>> {
        self.settings().get_user_by_id(user_id)
    }

    pub fn add_user(&self, username: &str, display_name: &str, role: UserRole) -> Option<i64> {
        self.settings().add_user(username, display_name, role)
    }

    pub fn update_user(&self, username: &str, display_name: Option<&str>, role: Option<UserRole>) -> bool {
        self.settings().update_user(username, display_name, role)
    }

    pub fn deactivate_user(&self, username: &str) -> bool {
        self.settings().deactivate_user(username)
    }

    pub fn reactivate_user(&self, username: &str) -> bool {
        self.settings().reactivate_user(username)
    }

    pub fn delete_user(&self, username: &str) -> bool {
        self.settings().delete_user(username)
    }
}

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), crate::database::SCHEMA_VERSION);
    }

    #[test]
    fn test_open_in_dir_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested");
        let db = ReviewDatabase::open_in_dir(data_dir.to_str().unwrap()).unwrap();
        assert!(db.add_note("a1", "v001", "first", None, "jdoe", UserRole::Artist).is_some());
        db.close().unwrap();

        assert!(data_dir.join(DATABASE_FILE_NAME).exists());

        let reopened = ReviewDatabase::open_in_dir(data_dir.to_str().unwrap()).unwrap();
        assert_eq!(reopened.get_notes_for_version("a1", "v001", false).unwrap().len(), 1);
    }

    #[test]
    fn test_open_refuses_newer_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DATABASE_FILE_NAME);
        let path = path.to_str().unwrap();
        {
            let db = ReviewDatabase::open(path).unwrap();
            db.connection()
                .execute("INSERT INTO schema_version (version) VALUES (99)", [])
                .unwrap();
        }
        assert!(ReviewDatabase::open(path).is_err());
    }

    #[test]
    fn test_note_flow_through_facade() {
        let db = ReviewDatabase::open_in_memory().unwrap();
        let note_id = db
            .add_note("a1", "v001", "fix normals", None, "lead", UserRole::Lead)
            .unwrap();
        assert!(db.mark_note_addressed(note_id, "artist"));
        assert!(db.approve_note(note_id, "lead"));

        let counts = db.get_note_status_counts("a1", "v001").unwrap();
        assert_eq!(counts.approved, 1);
        assert_eq!(counts.pending(), 0);

        let note = db.get_note_by_id(note_id).unwrap().unwrap();
        assert!(note.resolved);
    }
}
