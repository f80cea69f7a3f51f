//! Row helpers shared by the entity managers

use rusqlite::types::FromSql;
use rusqlite::Row;
use std::fmt::Display;
use tracing::warn;

/// Read a column that only some queries select (joined names, counts)
///
/// Missing columns and NULL both read as `None`.
pub(crate) fn optional_column<T: FromSql>(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<T>> {
    match row.get::<_, Option<T>>(name) {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::InvalidColumnName(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Convert a failed write into `None`, logging the cause
///
/// Entity-manager writes never hand errors to their callers; the warning is the
/// only place the underlying cause is kept.
pub(crate) trait OrWarn<T> {
    fn or_warn(self, action: &str) -> Option<T>;
}

impl<T, E: Display> OrWarn<T> for Result<T, E> {
    fn or_warn(self, action: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to {}: {}", action, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_optional_column() {
        let conn = Connection::open_in_memory().unwrap();
        let (present, missing, null): (Option<String>, Option<String>, Option<String>) = conn
            .query_row("SELECT 'x' AS present, NULL AS blank", [], |row| {
                Ok((
                    optional_column(row, "present")?,
                    optional_column(row, "absent")?,
                    optional_column(row, "blank")?,
                ))
            })
            .unwrap();
        assert_eq!(present.as_deref(), Some("x"));
        assert_eq!(missing, None);
        assert_eq!(null, None);
    }

    #[test]
    fn test_or_warn() {
        let ok: Result<i64, String> = Ok(3);
        let err: Result<i64, String> = Err("disk full".to_string());
        assert_eq!(ok.or_warn("write"), Some(3));
        assert_eq!(err.or_warn("write"), None);
    }
}
