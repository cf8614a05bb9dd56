//! doc2md API server
//!
//! Entry point for the doc2md-backend server: configuration loading, store and
//! analytics setup, optional embedded workers and HTTP server startup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use doc2md_stats::{StatsRecorder, DEFAULT_CAPACITY};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use doc2md_backend::cli::CliArgs;
use doc2md_backend::config_helpers::{
    converter_from_config, job_queue_from_config, parse_bind_address, stats_db_config_from_config,
    store_from_config, task_store_from_config,
};
use doc2md_backend::state::AppState;
use doc2md_backend::tracing_setup::install_tracing_from_config;
use doc2md_backend::worker::{join_workers, shutdown_on_ctrl_c, spawn_workers};
use doc2md_backend::{build_router, RouterOptions};

/// How long buffered analytics events may take to flush on shutdown.
const STATS_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eprintln!("[STARTUP] doc2md backend starting...");
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("[STARTUP] ignoring unreadable .env file: {e}");
        }
    }
    let args = CliArgs::parse();

    eprintln!("[STARTUP] Loading config from: {:?}", args.config_path);
    let config = args.load_config()?;
    eprintln!("[STARTUP] Config loaded successfully");

    let _reload_handle = install_tracing_from_config(&config.logging);

    eprintln!("[STARTUP] Connecting to store...");
    let store = store_from_config(&config.store).await?;
    let tasks = task_store_from_config(store.clone(), &config);
    let job_queue = job_queue_from_config(store, &config);

    eprintln!("[STARTUP] Opening analytics database...");
    let stats_cfg = stats_db_config_from_config(&config);
    let stats = doc2md_stats::open(&stats_cfg).await?;
    let (recorder, recorder_task) = StatsRecorder::spawn(stats.clone(), DEFAULT_CAPACITY);
    tracing::info!(
        stats_db = %doc2md_stats::sanitize_database_url(&stats_cfg.url),
        queue = %job_queue.queue_name(),
        task_ttl_secs = config.tasks.ttl_secs,
        "services configured"
    );

    let shutdown = CancellationToken::new();
    let workers = if config.worker.embedded {
        doc2md_tasks::register_all_executors(
            &job_queue,
            tasks.clone(),
            converter_from_config(&config.converter),
        )
        .await;
        tracing::info!(concurrency = config.worker.concurrency, "starting embedded workers");
        spawn_workers(
            &job_queue,
            config.worker.concurrency,
            Duration::from_secs(config.worker.poll_timeout_secs),
            &shutdown,
        )
    } else {
        Vec::new()
    };

    let state = AppState::new(
        tasks,
        job_queue,
        stats,
        recorder,
        config.security.clone(),
    );
    let app = build_router(Arc::new(state), &RouterOptions::from_config(&config));

    let addr = parse_bind_address(&config.server.host, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    eprintln!("[STARTUP] ✓ Server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_on_ctrl_c(shutdown.clone()))
    .await?;

    shutdown.cancel();
    join_workers(workers).await;
    if tokio::time::timeout(STATS_FLUSH_TIMEOUT, recorder_task)
        .await
        .is_err()
    {
        tracing::warn!("analytics writer did not finish before shutdown");
    }
    tracing::info!("server stopped");
    Ok(())
}
