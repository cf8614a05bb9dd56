use std::sync::Arc;

use axum::extract::{Extension, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// Liveness plus store connectivity. Always 200.
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    let store = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "store ping failed");
            "disconnected"
        }
    };
    Json(HealthResponse { status: "ok", store })
}
