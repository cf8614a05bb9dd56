use std::sync::Arc;

use axum::extract::{Extension, Json};
use axum::http::HeaderMap;
use doc2md_stats::StatsSummary;

use super::token;
use crate::{error::ApiError, state::AppState};

pub async fn get(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsSummary>, ApiError> {
    token::check_if_configured(&headers, state.deploy_token())?;
    Ok(Json(state.stats.summary().await?))
}
