// src/flow/submission.rs

//! The remote write sequence of a finished assessment, run as a saga.
//!
//! Steps: create user, upload photos (fan-out, joined), insert photo rows,
//! insert response rows. When a step fails, the completed steps are undone in
//! reverse: uploaded objects are removed and the user row is deleted, which
//! cascades to any photo and response rows already written.

use std::fmt;

use axum::body::Bytes;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::{
    models::{
        answer::Answer,
        submission::{PhotoRef, ResponseRow},
        user::UserDetails,
    },
    store::{Backend, StoreError},
    utils::storage::photo_object_path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    CreateUser,
    UploadPhotos,
    InsertPhotoRefs,
    InsertResponses,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionStage::CreateUser => "create user",
            SubmissionStage::UploadPhotos => "upload photos",
            SubmissionStage::InsertPhotoRefs => "insert photo references",
            SubmissionStage::InsertResponses => "insert responses",
        };
        f.write_str(name)
    }
}

/// Why a submission attempt failed. The message is for logs, not for users.
#[derive(Debug, Error)]
#[error("submission failed at '{stage}': {message}")]
pub struct SubmissionError {
    pub stage: SubmissionStage,
    pub message: String,
    /// Set when at least one compensating action failed too.
    pub compensation_failed: bool,
}

/// Outcome of one attempt: the new user's id or the failure.
pub type SubmissionResult = Result<SubmissionReport, SubmissionError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub user_id: i64,
    pub photo_paths: Vec<String>,
    pub responses_stored: usize,
}

/// A photo as it leaves the flow for upload.
#[derive(Debug, Clone)]
pub struct OutgoingPhoto {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Snapshot of everything a submission writes, detached from the flow so the
/// flow can be unlocked while the remote calls run.
#[derive(Debug, Clone)]
pub struct Submission {
    pub details: UserDetails,
    pub photos: Vec<OutgoingPhoto>,
    pub answers: Vec<Answer>,
}

/// Completed steps that must be undone on a later failure.
#[derive(Debug, Default)]
struct Compensations {
    user_id: Option<i64>,
    uploaded: Vec<String>,
}

impl Compensations {
    /// Runs the undo actions in reverse order. Returns false if any failed.
    async fn run(self, backend: &Backend) -> bool {
        let mut clean = true;

        if !self.uploaded.is_empty() {
            if let Err(e) = backend.blobs.remove(&self.uploaded).await {
                tracing::error!(
                    "Compensation failed: could not remove {} uploaded photos: {:?}",
                    self.uploaded.len(),
                    e
                );
                clean = false;
            }
        }

        if let Some(user_id) = self.user_id {
            if let Err(e) = backend.records.delete_user(user_id).await {
                tracing::error!("Compensation failed: could not delete user {}: {:?}", user_id, e);
                clean = false;
            }
        }

        clean
    }
}

impl Submission {
    pub async fn execute(self, backend: &Backend) -> SubmissionResult {
        let mut undo = Compensations::default();

        match self.run_steps(backend, &mut undo).await {
            Ok(report) => Ok(report),
            Err((stage, err)) => {
                tracing::error!("Submission failed at '{}': {:?}", stage, err);
                let clean = undo.run(backend).await;
                Err(SubmissionError {
                    stage,
                    message: err.to_string(),
                    compensation_failed: !clean,
                })
            }
        }
    }

    async fn run_steps(
        self,
        backend: &Backend,
        undo: &mut Compensations,
    ) -> Result<SubmissionReport, (SubmissionStage, StoreError)> {
        // 1. User row
        let user_id = backend
            .records
            .create_user(&self.details)
            .await
            .map_err(|e| (SubmissionStage::CreateUser, e))?;
        undo.user_id = Some(user_id);
        tracing::info!("Created user {}", user_id);

        // 2. Photos, uploaded concurrently and joined before continuing
        let photo_paths = upload_all(backend, user_id, self.photos, undo)
            .await
            .map_err(|e| (SubmissionStage::UploadPhotos, e))?;

        // 3. Photo references
        let photo_rows: Vec<PhotoRef> = photo_paths
            .iter()
            .enumerate()
            .map(|(i, path)| PhotoRef {
                user_id,
                storage_path: path.clone(),
                display_order: i as i32 + 1,
            })
            .collect();
        backend
            .records
            .insert_photo_refs(&photo_rows)
            .await
            .map_err(|e| (SubmissionStage::InsertPhotoRefs, e))?;

        // 4. Responses
        let response_rows: Vec<ResponseRow> = self
            .answers
            .into_iter()
            .map(|a| ResponseRow {
                user_id,
                question_id: a.question_id,
                question_text: a.question_text,
                answer: a.answer,
                category: a.category,
            })
            .collect();
        backend
            .records
            .insert_responses(&response_rows)
            .await
            .map_err(|e| (SubmissionStage::InsertResponses, e))?;

        tracing::info!(
            "Stored assessment for user {}: {} photos, {} responses",
            user_id,
            photo_paths.len(),
            response_rows.len()
        );

        Ok(SubmissionReport {
            user_id,
            photo_paths,
            responses_stored: response_rows.len(),
        })
    }
}

/// Uploads every photo in parallel and waits for all of them.
///
/// Returns the stored paths in display order. Any failed upload fails the
/// whole step; the paths that did succeed are registered for removal.
async fn upload_all(
    backend: &Backend,
    user_id: i64,
    photos: Vec<OutgoingPhoto>,
    undo: &mut Compensations,
) -> Result<Vec<String>, StoreError> {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let mut tasks = JoinSet::new();

    for (index, photo) in photos.into_iter().enumerate() {
        let blobs = backend.blobs.clone();
        let path = photo_object_path(user_id, timestamp, index as i32 + 1, &photo.file_name);
        tasks.spawn(async move {
            let result = blobs.upload(&path, &photo.content_type, photo.bytes).await;
            (index, path, result)
        });
    }

    let mut stored: Vec<Option<String>> = vec![None; tasks.len()];
    let mut first_error: Option<StoreError> = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, path, Ok(()))) => {
                undo.uploaded.push(path.clone());
                stored[index] = Some(path);
            }
            Ok((index, path, Err(e))) => {
                tracing::warn!("Upload of photo {} to {} failed: {:?}", index + 1, path, e);
                first_error.get_or_insert(e);
            }
            Err(join_err) => {
                tracing::error!("Upload task aborted: {:?}", join_err);
                first_error.get_or_insert(StoreError::Unavailable(join_err.to_string()));
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    Ok(stored.into_iter().flatten().collect())
}
