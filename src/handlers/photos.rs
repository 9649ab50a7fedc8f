// src/handlers/photos.rs

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    flow::photos::{CandidatePhoto, PreviewRegistry},
    handlers::assessment::load_flow,
    models::assessment::AssessmentView,
    state::FlowSessions,
};

/// Adds a batch of photos from a multipart form.
///
/// Every file part is a candidate. The batch is accepted all-or-nothing: one
/// non-image or oversized file rejects the whole request.
pub async fn upload_photos(
    State(sessions): State<FlowSessions>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let shared = load_flow(&sessions, id).await?;

    let mut candidates = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Malformed photo upload: {}", e);
        AppError::BadRequest(format!("Invalid multipart body: {}", e))
    })? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read photo '{}': {}", file_name, e);
            AppError::BadRequest(format!("Failed to read '{}': {}", file_name, e))
        })?;

        candidates.push(CandidatePhoto {
            file_name,
            content_type,
            bytes,
        });
    }

    if candidates.is_empty() {
        return Err(AppError::BadRequest("No files were uploaded".to_string()));
    }

    let mut flow = shared.lock().await;
    let added = flow.accept_photos(candidates).map_err(|e| {
        tracing::warn!("Rejected photo batch for assessment {}: {}", id, e);
        AppError::from(e)
    })?;
    tracing::info!("Assessment {} accepted {} photos", id, added);

    Ok(Json(AssessmentView::new(id, &flow)))
}

pub async fn remove_photo(
    State(sessions): State<FlowSessions>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let shared = load_flow(&sessions, id).await?;
    let mut flow = shared.lock().await;
    flow.remove_photo(index)?;

    Ok(Json(AssessmentView::new(id, &flow)))
}

/// Serves the bytes of a live preview.
pub async fn get_preview(
    State(previews): State<PreviewRegistry>,
    Path(preview_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let preview = previews
        .get(preview_id)
        .ok_or_else(|| AppError::NotFound("Preview not found".to_string()))?;

    Ok(([(header::CONTENT_TYPE, preview.content_type)], preview.bytes))
}
