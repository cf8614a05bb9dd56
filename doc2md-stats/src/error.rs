use thiserror::Error;

/// Errors raised by the analytics log.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("database url cannot be empty")]
    EmptyDatabaseUrl,
    #[error("file/directory creation error: {0}")]
    FileCreation(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
