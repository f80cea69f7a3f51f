//! App settings (key/value) and studio users

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::database::core::OrWarn;

use super::types::UserRole;

/// `solo` or `studio`
pub const SETTING_APP_MODE: &str = "app_mode";
pub const SETTING_CURRENT_USER: &str = "current_user";
pub const SETTING_SHOW_DELETED: &str = "show_deleted_notes";

/// A studio user record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudioUser {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
    pub created_at: Option<String>,
    pub is_active: bool,
}

impl StudioUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StudioUser {
            id: row.get("id")?,
            username: row.get("username")?,
            display_name: row.get("display_name")?,
            role: row.get("role")?,
            created_at: row.get("created_at")?,
            is_active: row.get::<_, Option<bool>>("is_active")?.unwrap_or(true),
        })
    }
}

/// Repository for app settings and studio users
pub struct SettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SettingsRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Read a setting, falling back to `default` when unset or unreadable
    pub fn get_setting(&self, key: &str, default: &str) -> String {
        self.conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .or_warn(&format!("read setting {}", key))
            .flatten()
            .flatten()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn set_setting(&self, key: &str, value: &str) -> bool {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO app_settings (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .or_warn(&format!("write setting {}", key))
            .is_some()
    }

    pub fn is_studio_mode(&self) -> bool {
        self.get_setting(SETTING_APP_MODE, "solo") == "studio"
    }

    pub fn set_studio_mode(&self, enabled: bool) -> bool {
        self.set_setting(SETTING_APP_MODE, if enabled { "studio" } else { "solo" })
    }

    pub fn get_current_user(&self) -> String {
        self.get_setting(SETTING_CURRENT_USER, "")
    }

    pub fn set_current_user(&self, username: &str) -> bool {
        self.set_setting(SETTING_CURRENT_USER, username)
    }

    pub fn get_show_deleted(&self) -> bool {
        self.get_setting(SETTING_SHOW_DELETED, "false") == "true"
    }

    pub fn set_show_deleted(&self, show: bool) -> bool {
        self.set_setting(SETTING_SHOW_DELETED, if show { "true" } else { "false" })
    }

    // =========================================================================
    // Studio users
    // =========================================================================

    /// Users ordered by display name; inactive users only when asked for
    pub fn get_all_users(&self, include_inactive: bool) -> Result<Vec<StudioUser>> {
        let sql = if include_inactive {
            "SELECT * FROM studio_users ORDER BY display_name ASC"
        } else {
            "SELECT * FROM studio_users WHERE is_active = 1 ORDER BY display_name ASC"
        };
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare user query: {}", e))?;
        let users = stmt
            .query_map([], StudioUser::from_row)
            .map_err(|e| anyhow!("Failed to query users: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read users: {}", e))?;
        Ok(users)
    }

    pub fn get_user(&self, username: &str) -> Result<Option<StudioUser>> {
        self.conn
            .query_row(
                "SELECT * FROM studio_users WHERE username = ?1",
                params![username],
                StudioUser::from_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to get user {}: {}", username, e))
    }

    pub fn get_user_by_id(&self, user_id: i64) -> Result<Option<StudioUser>> {
        self.conn
            .query_row(
                "SELECT * FROM studio_users WHERE id = ?1",
                params![user_id],
                StudioUser::from_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to get user {}: {}", user_id, e))
    }

    /// Create a user; fails (returns `None`) when the username is taken
    pub fn add_user(&self, username: &str, display_name: &str, role: UserRole) -> Option<i64> {
        self.conn
            .execute(
                "INSERT INTO studio_users (username, display_name, role) VALUES (?1, ?2, ?3)",
                params![username, display_name, role],
            )
            .map(|_| self.conn.last_insert_rowid())
            .or_warn(&format!("add user {}", username))
    }

    /// Change display name and/or role; with nothing to change it is a no-op success
    pub fn update_user(&self, username: &str, display_name: Option<&str>, role: Option<UserRole>) -> bool {
        if display_name.is_none() && role.is_none() {
            return true;
        }
        self.conn
            .execute(
                r#"
                UPDATE studio_users
                SET display_name = COALESCE(?1, display_name),
                    role = COALESCE(?2, role)
                WHERE username = ?3
                "#,
                params![display_name, role, username],
            )
            .or_warn(&format!("update user {}", username))
            .is_some_and(|n| n > 0)
    }

    pub fn deactivate_user(&self, username: &str) -> bool {
        self.set_user_active(username, false)
    }

    pub fn reactivate_user(&self, username: &str) -> bool {
        self.set_user_active(username, true)
    }

    pub fn delete_user(&self, username: &str) -> bool {
        self.conn
            .execute(
                "DELETE FROM studio_users WHERE username = ?1",
                params![username],
            )
            .or_warn(&format!("delete user {}", username))
            .is_some_and(|n| n > 0)
    }

    fn set_user_active(&self, username: &str, active: bool) -> bool {
        self.conn
            .execute(
                "UPDATE studio_users SET is_active = ?1 WHERE username = ?2",
                params![active, username],
            )
            .or_warn(&format!("change active flag of user {}", username))
            .is_some_and(|n| n > 0)
    }
}
