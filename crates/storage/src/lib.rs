//! Storage layer: SQLite schemas and helpers.
//!
//! Holds DB pool setup, the migration runner and the row models shared by the
//! catalog and settings stores.

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub mod models;

/// Normalizes a plain filesystem path into a `sqlite:` URL, creating the
/// parent directory. URLs pass through.
pub fn database_url(database_path: &str) -> anyhow::Result<String> {
    if database_path.starts_with("sqlite:") {
        return Ok(database_path.to_string());
    }
    let path = std::path::PathBuf::from(database_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
    }
    let norm = path.to_string_lossy().replace('\\', "/");
    if path.is_absolute() {
        Ok(format!("sqlite:///{}", norm.trim_start_matches('/')))
    } else {
        Ok(format!("sqlite://{}", norm))
    }
}

pub async fn connect(database_path: &str) -> anyhow::Result<SqlitePool> {
    let url = database_url(database_path)?;
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let mut opts = SqlitePoolOptions::new();
    if url.contains("memory") {
        opts = opts.max_connections(1);
    } else {
        opts = opts.max_connections(5);
    }
    let pool = opts.connect_with(options).await?;
    tracing::debug!(url = %url, "connected to catalog database");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // Applies SQLx migrations located in crates/storage/migrations.
    // Safe to run multiple times (idempotent).
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
