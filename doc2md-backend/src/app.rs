use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Upload size limit matching the frontend's own check.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// HTTP-level settings applied when building the router.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl RouterOptions {
    pub fn from_config(cfg: &doc2md_config::Config) -> Self {
        Self {
            allowed_origins: cfg.cors.allowed_origins.clone(),
            max_upload_bytes: cfg.tasks.max_upload_bytes,
        }
    }
}

/// Build the primary axum router with the provided shared application state.
pub fn build_router(state: Arc<AppState>, options: &RouterOptions) -> Router {
    let body_limit = options.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/convert", post(handlers::convert::convert))
        .route("/task/{task_id}", get(handlers::task::get))
        .route("/stats", get(handlers::stats::get))
        .route("/health", get(handlers::health::health))
        .route("/deploy", post(handlers::deploy::trigger))
        .route("/jobs/failed", get(handlers::jobs::list_failed))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&options.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

/// Browser access for the configured origins. `*` opens the API to any origin,
/// in which case credentials are not allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o.trim() == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
