use chrono::Utc;
use serde::Serialize;
use sqlx::Row;

use crate::error::StatsError;
use crate::pool::DbPool;
use crate::utils::file_extension;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS conversion_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    file_extension TEXT,
    file_size_bytes INTEGER,
    client_ip TEXT,
    user_agent TEXT,
    accept_language TEXT,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
)"#;

/// Columns added after the first schema revision, backfilled on older databases.
const LATE_COLUMNS: &[&str] = &["client_ip", "user_agent", "accept_language"];

/// One upload as recorded for analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionEvent {
    pub filename: String,
    pub file_size_bytes: u64,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
}

/// Aggregate usage figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_conversions: i64,
    pub total_size_bytes: i64,
    pub total_size_mb: f64,
}

impl StatsSummary {
    fn from_totals(count: i64, total_bytes: i64) -> Self {
        let mb = total_bytes as f64 / (1024.0 * 1024.0);
        Self {
            total_conversions: count,
            total_size_bytes: total_bytes,
            total_size_mb: (mb * 100.0).round() / 100.0,
        }
    }
}

/// Relational log of conversion events.
#[derive(Debug, Clone)]
pub struct StatsLogger {
    pool: DbPool,
}

impl StatsLogger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create the table if needed and add any columns missing from older databases.
    pub async fn init_schema(&self) -> Result<(), StatsError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;

        let columns: Vec<String> = sqlx::query("PRAGMA table_info(conversion_logs)")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.get::<String, _>("name"))
            .collect();

        for column in LATE_COLUMNS {
            if !columns.iter().any(|c| c == column) {
                tracing::info!(column, "adding missing conversion_logs column");
                sqlx::query(&format!(
                    "ALTER TABLE conversion_logs ADD COLUMN {column} TEXT"
                ))
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn log_conversion(&self, event: &ConversionEvent) -> Result<(), StatsError> {
        let size = i64::try_from(event.file_size_bytes).unwrap_or(i64::MAX);
        sqlx::query(
            "INSERT INTO conversion_logs \
             (filename, file_extension, file_size_bytes, client_ip, user_agent, accept_language, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.filename)
        .bind(file_extension(&event.filename))
        .bind(size)
        .bind(&event.client_ip)
        .bind(&event.user_agent)
        .bind(&event.accept_language)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            filename = %event.filename,
            size_bytes = event.file_size_bytes,
            client_ip = event.client_ip.as_deref().unwrap_or("-"),
            "logged conversion"
        );
        Ok(())
    }

    pub async fn summary(&self) -> Result<StatsSummary, StatsError> {
        let (count, total): (i64, Option<i64>) =
            sqlx::query_as("SELECT COUNT(*), SUM(file_size_bytes) FROM conversion_logs")
                .fetch_one(&self.pool)
                .await?;
        Ok(StatsSummary::from_totals(count, total.unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, StatsDbConfig};

    async fn logger() -> StatsLogger {
        let pool = create_pool(&StatsDbConfig::new("sqlite::memory:"))
            .await
            .expect("pool");
        let logger = StatsLogger::new(pool);
        logger.init_schema().await.expect("schema");
        logger
    }

    fn event(name: &str, size: u64) -> ConversionEvent {
        ConversionEvent {
            filename: name.to_string(),
            file_size_bytes: size,
            client_ip: Some("203.0.113.7".to_string()),
            user_agent: Some("curl/8.0".to_string()),
            accept_language: None,
        }
    }

    #[tokio::test]
    async fn empty_log_reports_zeroes() {
        let summary = logger().await.summary().await.unwrap();
        assert_eq!(summary, StatsSummary::from_totals(0, 0));
        assert_eq!(summary.total_size_mb, 0.0);
    }

    #[tokio::test]
    async fn summary_aggregates_events() {
        let logger = logger().await;
        logger.log_conversion(&event("a.pdf", 1024 * 1024)).await.unwrap();
        logger
            .log_conversion(&event("b.docx", 512 * 1024))
            .await
            .unwrap();

        let summary = logger.summary().await.unwrap();
        assert_eq!(summary.total_conversions, 2);
        assert_eq!(summary.total_size_bytes, 1024 * 1024 + 512 * 1024);
        assert_eq!(summary.total_size_mb, 1.5);
    }

    #[tokio::test]
    async fn extension_is_stored_lowercase() {
        let logger = logger().await;
        logger.log_conversion(&event("Deck.PPTX", 10)).await.unwrap();
        let ext: String = sqlx::query_scalar("SELECT file_extension FROM conversion_logs")
            .fetch_one(logger.pool())
            .await
            .unwrap();
        assert_eq!(ext, "pptx");
    }

    #[tokio::test]
    async fn init_schema_backfills_old_tables() {
        let pool = create_pool(&StatsDbConfig::new("sqlite::memory:"))
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE conversion_logs (\
             id INTEGER PRIMARY KEY AUTOINCREMENT, filename TEXT NOT NULL, \
             file_extension TEXT, file_size_bytes INTEGER, \
             timestamp DATETIME DEFAULT CURRENT_TIMESTAMP)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let logger = StatsLogger::new(pool);
        logger.init_schema().await.expect("migrate");
        // running twice is a no-op
        logger.init_schema().await.expect("idempotent");
        logger.log_conversion(&event("x.html", 5)).await.unwrap();
        assert_eq!(logger.summary().await.unwrap().total_conversions, 1);
    }

    #[test]
    fn megabytes_round_to_two_places() {
        let summary = StatsSummary::from_totals(1, 1_234_567);
        assert_eq!(summary.total_size_mb, 1.18);
    }
}
