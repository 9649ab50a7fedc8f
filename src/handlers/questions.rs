// src/handlers/questions.rs

use axum::{Json, extract::State, response::IntoResponse};

use crate::{error::AppError, store::Backend};

/// Lists every question in the catalog, ordered by id.
pub async fn list_questions(State(backend): State<Backend>) -> Result<impl IntoResponse, AppError> {
    let questions = backend.questions.list_questions().await.map_err(|e| {
        tracing::error!("Failed to fetch questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(questions))
}
