use std::sync::Arc;

use axum::extract::{Extension, Json, Path};
use doc2md_tasks::TaskResponse;

use crate::{error::ApiError, state::AppState};

pub const TASK_NOT_FOUND: &str = "Task not found or expired";

/// Report a task's status, with its markdown or error once finished.
pub async fn get(
    Extension(state): Extension<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    state
        .tasks
        .response(&task_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(TASK_NOT_FOUND))
}
