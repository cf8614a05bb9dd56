use std::process::Stdio;
use std::sync::Arc;

use axum::extract::{Extension, Json};
use axum::http::HeaderMap;
use serde_json::{json, Value};
use tokio::process::Command;

use super::token;
use crate::{error::ApiError, state::AppState};

/// Start the deployment script in the background.
pub async fn trigger(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    token::check_required(&headers, state.deploy_token())?;

    let script = state.security.deploy_script.clone();
    let mut child = Command::new("bash")
        .arg(&script)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| ApiError::Deploy(e.to_string()))?;

    tracing::info!(script = %script, pid = child.id(), "deployment triggered");
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if status.success() => tracing::info!(script = %script, "deployment finished"),
            Ok(status) => tracing::warn!(script = %script, %status, "deployment script failed"),
            Err(e) => tracing::error!(script = %script, error = %e, "could not wait for deployment script"),
        }
    });

    Ok(Json(json!({ "status": "deployment triggered" })))
}
