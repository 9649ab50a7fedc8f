// src/handlers/seed.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    catalog::personality_questions,
    config::Config,
    models::assessment::SeedResponse,
    store::{Backend, BucketPolicy, BucketStatus},
};

fn reply(status: StatusCode, success: bool, message: impl Into<String>) -> (StatusCode, Json<SeedResponse>) {
    (
        status,
        Json(SeedResponse {
            success,
            message: message.into(),
        }),
    )
}

/// Creates the private photo bucket unless it already exists.
pub async fn create_bucket(State(backend): State<Backend>, State(config): State<Config>) -> impl IntoResponse {
    let bucket = &config.photo_bucket;
    match backend.blobs.ensure_bucket(&BucketPolicy::photos(bucket.clone())).await {
        Ok(BucketStatus::Created) => {
            tracing::info!("Created bucket {}", bucket);
            reply(StatusCode::OK, true, format!("Successfully created {} bucket", bucket))
        }
        Ok(BucketStatus::AlreadyExists) => {
            reply(StatusCode::OK, true, format!("{} bucket already exists", bucket))
        }
        Err(e) => {
            tracing::error!("Error creating bucket {}: {:?}", bucket, e);
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                "An unexpected error occurred while creating the bucket.",
            )
        }
    }
}

/// Inserts the question catalog into an empty database.
///
/// Does nothing (and says so) once any question exists.
pub async fn seed_questions(State(backend): State<Backend>) -> impl IntoResponse {
    let existing = match backend.questions.count_questions().await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Error checking existing questions: {:?}", e);
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                "An unexpected error occurred while seeding the database.",
            );
        }
    };

    if existing > 0 {
        return reply(StatusCode::OK, false, "Database already contains questions.");
    }

    match backend.questions.insert_questions(&personality_questions()).await {
        Ok(count) => {
            tracing::info!("Seeded {} questions", count);
            reply(
                StatusCode::OK,
                true,
                format!("Successfully seeded {} questions to the database.", count),
            )
        }
        Err(e) => {
            tracing::error!("Error seeding database: {:?}", e);
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                "An unexpected error occurred while seeding the database.",
            )
        }
    }
}
