// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{delete, get, patch, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::PHOTO_UPLOAD_BODY_LIMIT,
    handlers::{assessment, photos, questions, seed},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (questions, assessments, previews, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (backend clients, sessions, previews).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    let question_routes = Router::new().route("/", get(questions::list_questions));

    let assessment_routes = Router::new()
        .route("/", post(assessment::start_assessment))
        .route(
            "/{id}",
            get(assessment::get_assessment).delete(assessment::abandon_assessment),
        )
        .route("/{id}/answers", put(assessment::record_answer))
        .route("/{id}/next", post(assessment::next_step))
        .route("/{id}/previous", post(assessment::previous_step))
        .route(
            "/{id}/photos",
            post(photos::upload_photos).layer(DefaultBodyLimit::max(PHOTO_UPLOAD_BODY_LIMIT)),
        )
        .route("/{id}/photos/{index}", delete(photos::remove_photo))
        .route("/{id}/details", patch(assessment::update_details))
        .route("/{id}/submit", post(assessment::submit_assessment));

    let preview_routes = Router::new().route("/{id}", get(photos::get_preview));

    // Setup routes, unauthenticated like the rest of the service
    let admin_routes = Router::new()
        .route("/storage/bucket", post(seed::create_bucket))
        .route("/seed/questions", post(seed::seed_questions));

    Router::new()
        .nest("/api/questions", question_routes)
        .nest("/api/assessments", assessment_routes)
        .nest("/api/previews", preview_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc};

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::Config,
        store::{Backend, memory::MemoryStore},
    };

    fn app() -> Router {
        let store = MemoryStore::new();
        let backend = Backend::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
        );
        let config = Config {
            database_url: "postgres://unused".to_string(),
            storage_root: PathBuf::from("unused"),
            photo_bucket: "user-photos".to_string(),
            port: 0,
            cors_origins: vec!["http://localhost:3000".to_string()],
            session_ttl: std::time::Duration::from_secs(1800),
            rust_log: "error".to_string(),
        };
        create_router(AppState::new(backend, config))
    }

    #[tokio::test]
    async fn preflight_allows_configured_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/assessments")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/assessments/00000000-0000-0000-0000-000000000000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
