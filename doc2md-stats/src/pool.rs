use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::StatsDbConfig;
use crate::error::StatsError;
use crate::utils::sanitize_database_url;

pub type DbPool = SqlitePool;

/// SQLite in-memory DSN markers.
pub const SQLITE_MEMORY_PATTERNS: &[&[u8]] = &[b":memory:", b"mode=memory"];

/// Creates the analytics connection pool, creating the database file if needed.
pub async fn create_pool(config: &StatsDbConfig) -> Result<DbPool, StatsError> {
    let url = config.url.trim();
    if url.is_empty() {
        return Err(StatsError::EmptyDatabaseUrl);
    }

    let mut opts = SqlitePoolOptions::new().acquire_timeout(config.connect_timeout());

    if is_memory_url(url) {
        // Every connection to `:memory:` opens its own database; pin the pool to
        // a single connection that is never recycled.
        opts = opts
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        ensure_sqlite_db_file_exists(url)?;
        opts = opts
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(config.idle_timeout());
    }

    let pool = opts.connect(url).await?;
    tracing::debug!(url = %sanitize_database_url(url), "analytics database pool created");
    Ok(pool)
}

fn is_memory_url(url: &str) -> bool {
    let url_bytes = url.as_bytes();
    SQLITE_MEMORY_PATTERNS.iter().any(|&pattern| {
        url_bytes
            .windows(pattern.len())
            .any(|w| w.eq_ignore_ascii_case(pattern))
    })
}

/// Extract the file path from a SQLite connection URL.
fn sqlite_file_path(url: &str) -> Option<&str> {
    let mut path = url;
    path = path
        .strip_prefix("sqlite://")
        .or_else(|| path.strip_prefix("sqlite:"))
        .unwrap_or(path);
    path = path.strip_prefix("file:").unwrap_or(path);

    if let Some(idx) = path.find('?') {
        path = &path[..idx];
    }

    let path = path.trim();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

fn ensure_sqlite_db_file_exists(database_url: &str) -> Result<(), StatsError> {
    use std::fs::{create_dir_all, File};
    use std::io;
    use std::path::Path;

    let Some(clean_path) = sqlite_file_path(database_url) else {
        return Ok(());
    };

    let db_path = Path::new(clean_path);
    if let Some(parent) = db_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty() && !p.exists())
    {
        create_dir_all(parent).map_err(|e| {
            StatsError::FileCreation(format!(
                "failed to create parent directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    if !db_path.exists() {
        File::create(db_path).map_err(|e| {
            let msg = if e.kind() == io::ErrorKind::PermissionDenied {
                format!("permission denied creating '{}': {e}", db_path.display())
            } else {
                format!("failed to create DB file '{}': {e}", db_path.display())
            };
            StatsError::FileCreation(msg)
        })?;
    }

    Ok(())
}
