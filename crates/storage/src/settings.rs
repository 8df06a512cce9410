//! Client settings persisted across runs.
//!
//! The whole object is read with [`Settings::load`] and written back with
//! [`Settings::save`]; callers hold it by value and pass it around
//! explicitly.

use crate::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const ARCHIVED_SESSIONS: &str = "archived_sessions";
const PREFERENCES: &str = "preferences";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub archived_sessions: BTreeSet<String>,
    pub preferences: BTreeMap<String, bool>,
}

impl Settings {
    pub async fn load(pool: &SqlitePool) -> Result<Self, StorageError> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(pool)
            .await?;
        let mut settings = Settings::default();
        for row in rows {
            let key: String = row.try_get("key")?;
            let value: String = row.try_get("value")?;
            match key.as_str() {
                ARCHIVED_SESSIONS => settings.archived_sessions = decode(&key, &value)?,
                PREFERENCES => settings.preferences = decode(&key, &value)?,
                other => debug!(key = other, "ignoring unknown setting"),
            }
        }
        Ok(settings)
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), StorageError> {
        let mut tx = pool.begin().await?;
        for (key, value) in [
            (ARCHIVED_SESSIONS, encode(ARCHIVED_SESSIONS, &self.archived_sessions)?),
            (PREFERENCES, encode(PREFERENCES, &self.preferences)?),
        ] {
            sqlx::query(
                "INSERT OR REPLACE INTO settings(key, value, updated_at) VALUES (?1, ?2, strftime('%s','now'))",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(
            archived = self.archived_sessions.len(),
            preferences = self.preferences.len(),
            "settings saved"
        );
        Ok(())
    }

    /// Returns false when the session was already archived.
    pub fn archive_session(&mut self, id: &str) -> bool {
        self.archived_sessions.insert(id.to_string())
    }

    pub fn unarchive_session(&mut self, id: &str) -> bool {
        self.archived_sessions.remove(id)
    }

    pub fn is_archived(&self, id: &str) -> bool {
        self.archived_sessions.contains(id)
    }

    pub fn preference(&self, key: &str) -> Option<bool> {
        self.preferences.get(key).copied()
    }

    pub fn set_preference(&mut self, key: &str, value: bool) {
        self.preferences.insert(key.to_string(), value);
    }

    /// Splits `sessions` into (active, archived), keeping their order.
    pub fn partition_sessions<T, F>(&self, sessions: Vec<T>, id: F) -> (Vec<T>, Vec<T>)
    where
        F: Fn(&T) -> &str,
    {
        sessions.into_iter().partition(|s| !self.is_archived(id(s)))
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: &str) -> Result<T, StorageError> {
    serde_json::from_str(value).map_err(|source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    })
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_keeps_order() {
        let mut settings = Settings::default();
        settings.archive_session("b");
        let (active, archived) =
            settings.partition_sessions(vec!["a", "b", "c"], |s| *s);
        assert_eq!(active, vec!["a", "c"]);
        assert_eq!(archived, vec!["b"]);
    }

    #[test]
    fn archive_is_idempotent() {
        let mut settings = Settings::default();
        assert!(settings.archive_session("s1"));
        assert!(!settings.archive_session("s1"));
        assert!(settings.unarchive_session("s1"));
        assert!(!settings.is_archived("s1"));
    }
}
