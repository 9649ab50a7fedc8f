// src/handlers/assessment.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    flow::{AssessmentFlow, photos::PreviewRegistry},
    models::{
        answer::RecordAnswerRequest,
        assessment::AssessmentView,
        submission::SubmissionReceipt,
        user::UpdateDetailsRequest,
    },
    state::{FlowSessions, SharedFlow},
    store::Backend,
};

/// Looks up a live session or answers 404.
pub(crate) async fn load_flow(sessions: &FlowSessions, id: Uuid) -> Result<SharedFlow, AppError> {
    sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))
}

/// Starts a new assessment over the current question catalog.
///
/// * Loads every question once; the flow keeps this snapshot.
/// * Answers 503 when the catalog is empty (seed it first).
pub async fn start_assessment(
    State(backend): State<Backend>,
    State(sessions): State<FlowSessions>,
    State(previews): State<PreviewRegistry>,
) -> Result<impl IntoResponse, AppError> {
    let questions = backend.questions.list_questions().await.map_err(|e| {
        tracing::error!("Failed to load questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let flow = AssessmentFlow::new(questions, previews).map_err(|e| {
        tracing::warn!("Cannot start assessment: {}", e);
        AppError::from(e)
    })?;

    let (id, shared) = sessions.create(flow).await;
    let flow = shared.lock().await;
    tracing::info!("Started assessment {} with {} questions", id, flow.questions().len());

    Ok((StatusCode::CREATED, Json(AssessmentView::new(id, &flow))))
}

pub async fn get_assessment(
    State(sessions): State<FlowSessions>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let shared = load_flow(&sessions, id).await?;
    let flow = shared.lock().await;
    Ok(Json(AssessmentView::new(id, &flow)))
}

/// Abandons an assessment. Its previews are released with it.
pub async fn abandon_assessment(
    State(sessions): State<FlowSessions>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let shared = sessions
        .remove(id)
        .await
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    // Wait for an in-flight request on this flow before reporting success.
    drop(shared.lock().await);
    tracing::info!("Abandoned assessment {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// Records (or replaces) the answer to one question.
///
/// A multiple-choice answer to the current question moves the flow forward.
pub async fn record_answer(
    State(sessions): State<FlowSessions>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let shared = load_flow(&sessions, id).await?;
    let mut flow = shared.lock().await;
    flow.record_answer(payload.question_id, &payload.answer)?;

    Ok(Json(AssessmentView::new(id, &flow)))
}

pub async fn next_step(
    State(sessions): State<FlowSessions>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let shared = load_flow(&sessions, id).await?;
    let mut flow = shared.lock().await;
    flow.advance()?;

    Ok(Json(AssessmentView::new(id, &flow)))
}

pub async fn previous_step(
    State(sessions): State<FlowSessions>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let shared = load_flow(&sessions, id).await?;
    let mut flow = shared.lock().await;
    flow.retreat()?;

    Ok(Json(AssessmentView::new(id, &flow)))
}

/// Updates any subset of the details fields. Validation runs on submit.
pub async fn update_details(
    State(sessions): State<FlowSessions>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDetailsRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let shared = load_flow(&sessions, id).await?;
    let mut flow = shared.lock().await;
    flow.update_details(payload)?;

    Ok(Json(AssessmentView::new(id, &flow)))
}

/// Submits a finished assessment.
///
/// * Checks the guards and locks navigation.
/// * The remote writes run on their own task and finish even if the client
///   disconnects; the flow lock is released meanwhile, so a concurrent request
///   sees the submitting state instead of blocking.
/// * On success the session ends; on failure the flow stays on the details
///   step with the generic error and can be submitted again.
pub async fn submit_assessment(
    State(backend): State<Backend>,
    State(sessions): State<FlowSessions>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let shared = load_flow(&sessions, id).await?;
    let report = sessions.submit(id, shared, backend).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionReceipt {
            user_id: report.user_id,
            photos_stored: report.photo_paths.len(),
            responses_stored: report.responses_stored,
            message: "Thank you for completing the assessment. Your responses have been recorded."
                .to_string(),
        }),
    ))
}
