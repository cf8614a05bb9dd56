use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::{Extension, Json, Multipart};
use axum::http::{Extensions, HeaderMap};
use doc2md_stats::ConversionEvent;
use doc2md_tasks::{allowed_extension, new_task_id, ConvertPayload, TaskResponse, UNSUPPORTED_TYPE_MESSAGE};

use super::client_info::ClientInfo;
use crate::{error::ApiError, state::AppState};

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

/// Accept an upload, store it and queue its conversion.
pub async fn convert(
    Extension(state): Extension<Arc<AppState>>,
    extensions: Extensions,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<TaskResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if allowed_extension(&filename).is_none() {
            return Err(ApiError::bad_request(UNSUPPORTED_TYPE_MESSAGE));
        }
        let bytes = field.bytes().await?;
        upload = Some((filename, bytes));
        break;
    }
    let Some((filename, bytes)) = upload else {
        return Err(ApiError::bad_request(UNSUPPORTED_TYPE_MESSAGE));
    };

    let task_id = new_task_id();
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = ClientInfo::from_parts(&headers, peer);

    state.tasks.create(&task_id, &filename, &bytes).await?;
    let job = ConvertPayload::new(task_id.clone(), filename.clone()).into_request()?;
    state.job_queue.enqueue(job).await?;

    state.recorder.record(ConversionEvent {
        filename: filename.clone(),
        file_size_bytes: bytes.len() as u64,
        client_ip: client.ip,
        user_agent: client.user_agent,
        accept_language: client.accept_language,
    });

    tracing::info!(task_id = %task_id, filename = %filename, size = bytes.len(), "upload queued");
    Ok(Json(TaskResponse::queued(task_id)))
}
