use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use doc2md_config::{Config, ConverterConfig, StoreBackend, StoreConfig};
use doc2md_converter::{CommandConverter, Converter, ExtensionRouter, HtmlConverter};
use doc2md_job_queue::JobQueueClient;
use doc2md_stats::StatsDbConfig;
use doc2md_store::{KvStore, MemoryStore, RedisStore, StoreError, DEFAULT_PURGE_INTERVAL};
use doc2md_tasks::TaskStore;

/// Connect to the configured key-value store.
pub async fn store_from_config(cfg: &StoreConfig) -> Result<Arc<dyn KvStore>, StoreError> {
    match cfg.backend {
        StoreBackend::Redis => {
            let store = RedisStore::connect(&cfg.redis_url()).await?;
            tracing::info!(host = %cfg.host, port = cfg.port, db = cfg.db, "connected to redis");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::info!("using in-process memory store");
            let store = MemoryStore::new();
            // detached: the sweep ends once the last store handle is dropped
            store.spawn_reaper(DEFAULT_PURGE_INTERVAL);
            Ok(Arc::new(store))
        }
    }
}

pub fn task_store_from_config(store: Arc<dyn KvStore>, cfg: &Config) -> TaskStore {
    TaskStore::new(store, Duration::from_secs(cfg.tasks.ttl_secs))
}

pub fn job_queue_from_config(store: Arc<dyn KvStore>, cfg: &Config) -> JobQueueClient {
    JobQueueClient::new(store, &cfg.worker.queue_name)
        .with_default_timeout(Duration::from_secs(cfg.tasks.job_timeout_secs))
}

pub fn stats_db_config_from_config(cfg: &Config) -> StatsDbConfig {
    StatsDbConfig::new(cfg.stats.database_url.clone())
}

/// External converter program, with in-process HTML conversion when enabled.
pub fn converter_from_config(cfg: &ConverterConfig) -> Arc<dyn Converter> {
    let command: Arc<dyn Converter> =
        Arc::new(CommandConverter::new(cfg.program.clone()).with_args(cfg.args.iter().cloned()));
    if cfg.builtin_html {
        Arc::new(ExtensionRouter::new(command).route("html", Arc::new(HtmlConverter)))
    } else {
        command
    }
}

/// Parse host:port into a SocketAddr, with fallback to 0.0.0.0.
pub fn parse_bind_address(host: &str, port: u16) -> SocketAddr {
    host.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, port))
        .or_else(|_| host.parse::<SocketAddr>())
        .or_else(|_| {
            host.trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<Ipv6Addr>()
                .map(|ip| SocketAddr::new(IpAddr::V6(ip), port))
        })
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)))
}
