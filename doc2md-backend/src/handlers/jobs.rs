use std::sync::Arc;

use axum::extract::{Extension, Json, Query};
use axum::http::HeaderMap;
use doc2md_job_queue::JobRun;
use serde::{Deserialize, Serialize};

use super::token;
use crate::{error::ApiError, state::AppState};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct FailedJobsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FailedJobsResponse {
    pub jobs: Vec<JobRun>,
    pub total: usize,
}

/// Most recent failed conversions, newest first.
pub async fn list_failed(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<FailedJobsQuery>,
) -> Result<Json<FailedJobsResponse>, ApiError> {
    token::check_if_configured(&headers, state.deploy_token())?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let jobs = state.job_queue.list_failed(limit).await?;
    let total = state.job_queue.count_failed().await?;
    Ok(Json(FailedJobsResponse { jobs, total }))
}
