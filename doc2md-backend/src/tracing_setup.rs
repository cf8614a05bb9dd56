use std::sync::Arc;
use tracing_subscriber::prelude::*;

/// Type alias for the reload handle returned by tracing initialization.
pub type ReloadHandle =
    Arc<dyn Fn(tracing_subscriber::EnvFilter) -> Result<(), String> + Send + Sync>;

/// Initialize tracing from configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Returns a handle
/// that swaps the filter at runtime, or `None` if a global subscriber was
/// already installed.
pub fn install_tracing_from_config(cfg: &doc2md_config::LoggingConfig) -> Option<ReloadHandle> {
    use tracing_subscriber::fmt::time::ChronoUtc;

    let env_filter_str = std::env::var("RUST_LOG").unwrap_or_else(|_| cfg.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::new(&env_filter_str);
    let (filter_layer, reload_handle) = tracing_subscriber::reload::Layer::new(env_filter);

    let installed = if cfg.json {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(tracing_subscriber::fmt::layer().with_timer(ChronoUtc::rfc_3339()))
            .try_init()
    };

    if let Err(e) = installed {
        eprintln!("tracing already initialised: {e}");
        return None;
    }

    Some(Arc::new(move |filter| {
        reload_handle
            .reload(filter)
            .map_err(|e| format!("reload failed: {e}"))
    }))
}
