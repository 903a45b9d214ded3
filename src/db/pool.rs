//! Database connection pool
//!
//! Builds the SQLite pool from configuration. Foreign keys are switched on for
//! every connection so cascades and join-row integrity hold.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::DatabaseConfig;

/// Shared connection pool handed to every repository
pub type DbPool = SqlitePool;

/// Normalize a configured location into an sqlx connection URL.
///
/// Accepts `:memory:`, `sqlite:` URLs and bare file paths.
fn connection_url(url: &str) -> String {
    if url == ":memory:" || url == "sqlite::memory:" {
        "sqlite::memory:".to_string()
    } else if url.starts_with("sqlite:") {
        url.to_string()
    } else {
        format!("sqlite:{}", url)
    }
}

/// Create parent directories for file-based databases
fn ensure_parent_dir(url: &str) -> Result<()> {
    if url.contains(":memory:") {
        return Ok(());
    }

    let path = url.trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
    }
    Ok(())
}

/// Create a database connection pool based on configuration.
///
/// # Errors
///
/// Returns an error if the URL is malformed or the connection cannot be
/// established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    ensure_parent_dir(&config.url)?;

    let options = SqliteConnectOptions::from_str(&connection_url(&config.url))
        .with_context(|| format!("Invalid SQLite URL: {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to SQLite database: {}", config.url))?;

    Ok(pool)
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<DbPool> {
    let config = DatabaseConfig {
        url: ":memory:".to_string(),
        max_connections: 1,
    };
    create_pool(&config).await
}

/// Check that the database answers queries
pub async fn ping(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Database ping failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[test]
    fn test_connection_url_variants() {
        assert_eq!(connection_url(":memory:"), "sqlite::memory:");
        assert_eq!(connection_url("sqlite:data/x.db"), "sqlite:data/x.db");
        assert_eq!(connection_url("data/x.db"), "sqlite:data/x.db");
    }

    #[tokio::test]
    async fn test_create_test_pool() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        ping(&pool).await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let row = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("Failed to read pragma");
        let enabled: i64 = row.get(0);
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_sqlite_nested_directory_creation() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("test.db");

        let config = DatabaseConfig {
            url: db_path.to_string_lossy().to_string(),
            max_connections: 2,
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        ping(&pool).await.expect("Ping should succeed");

        assert!(db_path.exists());
    }
}
