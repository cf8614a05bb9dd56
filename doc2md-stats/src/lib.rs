//! Conversion analytics for doc2md.
//!
//! Every accepted upload is recorded as one row in a SQLite table. Writes go
//! through [`StatsRecorder`] so the request path never waits on the database;
//! [`StatsLogger::summary`] answers the aggregate stats query.

pub mod config;
pub mod error;
pub mod logger;
pub mod pool;
pub mod recorder;
pub mod utils;

pub use config::StatsDbConfig;
pub use error::StatsError;
pub use logger::{ConversionEvent, StatsLogger, StatsSummary};
pub use pool::{create_pool, DbPool};
pub use recorder::{StatsRecorder, DEFAULT_CAPACITY};
pub use utils::sanitize_database_url;

/// Open the analytics database and make sure its schema is current.
pub async fn open(config: &StatsDbConfig) -> Result<StatsLogger, StatsError> {
    let pool = create_pool(config).await?;
    let logger = StatsLogger::new(pool);
    logger.init_schema().await?;
    Ok(logger)
}
