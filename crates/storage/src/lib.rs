//! Storage layer: local SQLite database for client-side settings.
//!
//! Holds DB pool setup, the migration runner and the settings store.

pub mod settings;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use thiserror::Error;

pub use settings::Settings;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("corrupt setting {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Turns a bare file path into a `sqlite://` URL; URLs pass through unchanged.
pub fn database_url(database: &str) -> String {
    if database.starts_with("sqlite:") {
        return database.to_string();
    }
    let path = std::path::PathBuf::from(database);
    let norm = path.to_string_lossy().replace('\\', "/");
    if path.is_absolute() {
        format!("sqlite:///{}", norm.trim_start_matches('/'))
    } else {
        format!("sqlite://{}", norm)
    }
}

pub async fn connect(database: &str) -> Result<SqlitePool, StorageError> {
    if !database.starts_with("sqlite:") {
        if let Some(parent) = std::path::Path::new(database).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    let url = database_url(database);
    let opts = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let max = if url.contains("memory") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max)
        .connect_with(opts)
        .await?;
    tracing::debug!(%url, "database connected");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), StorageError> {
    // Applies SQLx migrations located in crates/storage/migrations.
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Connects and migrates in one step.
pub async fn open(database: &str) -> Result<SqlitePool, StorageError> {
    let pool = connect(database).await?;
    migrate(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_paths_become_urls() {
        assert_eq!(database_url("data/lexdocs.db"), "sqlite://data/lexdocs.db");
        assert_eq!(database_url("/var/lib/lexdocs.db"), "sqlite:///var/lib/lexdocs.db");
        assert_eq!(database_url("sqlite::memory:"), "sqlite::memory:");
    }
}
