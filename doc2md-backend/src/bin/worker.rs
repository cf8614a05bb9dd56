//! doc2md conversion worker
//!
//! Runs `worker.concurrency` competing loops against the shared queue until
//! Ctrl-C. Requires the redis store backend; the memory backend only works
//! with embedded workers inside the API process.

use std::time::Duration;

use clap::Parser;
use doc2md_config::StoreBackend;
use doc2md_converter::Converter;
use tokio_util::sync::CancellationToken;

use doc2md_backend::cli::CliArgs;
use doc2md_backend::config_helpers::{
    converter_from_config, job_queue_from_config, store_from_config, task_store_from_config,
};
use doc2md_backend::tracing_setup::install_tracing_from_config;
use doc2md_backend::worker::{join_workers, shutdown_on_ctrl_c, spawn_workers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("ignoring unreadable .env file: {e}");
        }
    }
    let args = CliArgs::parse();
    let config = args.load_config()?;
    let _reload_handle = install_tracing_from_config(&config.logging);

    if config.store.backend == StoreBackend::Memory {
        anyhow::bail!("the memory store cannot be shared with a separate worker process; use store.backend = \"redis\"");
    }

    let store = store_from_config(&config.store).await?;
    let tasks = task_store_from_config(store.clone(), &config);
    let queue = job_queue_from_config(store, &config);
    let converter = converter_from_config(&config.converter);
    tracing::info!(
        converter = converter.name(),
        queue = %queue.queue_name(),
        concurrency = config.worker.concurrency,
        "worker starting"
    );
    doc2md_tasks::register_all_executors(&queue, tasks, converter).await;

    let shutdown = CancellationToken::new();
    let workers = spawn_workers(
        &queue,
        config.worker.concurrency,
        Duration::from_secs(config.worker.poll_timeout_secs),
        &shutdown,
    );

    shutdown_on_ctrl_c(shutdown.clone()).await;
    join_workers(workers).await;
    tracing::info!("worker stopped");
    Ok(())
}
