// src/store/mod.rs

//! Contracts for the remote collaborators the assessment flow writes to.
//!
//! The flow never talks to a concrete database or object store. It receives a
//! [`Backend`] built once at startup, so tests and local runs can swap in
//! [`memory::MemoryStore`] without touching the flow.

pub mod local;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{ALLOWED_PHOTO_TYPES, MAX_PHOTO_BYTES},
    models::{
        question::{NewQuestion, Question},
        submission::{PhotoRef, ResponseRow},
        user::UserDetails,
    },
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bucket '{0}' does not exist")]
    BucketMissing(String),

    /// The store refused the write because of its own policy.
    #[error("rejected by store policy: {0}")]
    Rejected(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Read side of the question catalog plus the seeding hooks.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// All questions ordered by id.
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError>;

    async fn count_questions(&self) -> Result<i64, StoreError>;

    /// Inserts the given questions in order, returning how many were written.
    async fn insert_questions(&self, questions: &[NewQuestion]) -> Result<usize, StoreError>;
}

/// Relational writes performed by a submission.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Creates the 'users' row and returns its generated id.
    async fn create_user(&self, details: &UserDetails) -> Result<i64, StoreError>;

    async fn insert_photo_refs(&self, rows: &[PhotoRef]) -> Result<(), StoreError>;

    async fn insert_responses(&self, rows: &[ResponseRow]) -> Result<(), StoreError>;

    /// Compensation for `create_user`. Child photo and response rows go with it.
    async fn delete_user(&self, user_id: i64) -> Result<(), StoreError>;
}

/// Object storage holding the uploaded photos.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Creates the bucket unless it exists already.
    async fn ensure_bucket(&self, policy: &BucketPolicy) -> Result<BucketStatus, StoreError>;

    /// Stores `bytes` at `path` inside the configured bucket. Never overwrites.
    async fn upload(&self, path: &str, content_type: &str, bytes: Bytes) -> Result<(), StoreError>;

    /// Deletes objects; paths that do not exist are ignored.
    async fn remove(&self, paths: &[String]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Created,
    AlreadyExists,
}

/// Access policy stored alongside a bucket and enforced on every upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPolicy {
    pub name: String,
    pub public: bool,
    pub file_size_limit: usize,
    pub allowed_mime_types: Vec<String>,
}

impl BucketPolicy {
    /// The private photo bucket: 5 MiB per object, JPEG/PNG/GIF only.
    pub fn photos(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: false,
            file_size_limit: MAX_PHOTO_BYTES,
            allowed_mime_types: ALLOWED_PHOTO_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn check(&self, content_type: &str, size: usize) -> Result<(), StoreError> {
        if !self.allowed_mime_types.iter().any(|t| t == content_type) {
            return Err(StoreError::Rejected(format!(
                "mime type {} is not supported",
                content_type
            )));
        }
        if size > self.file_size_limit {
            return Err(StoreError::Rejected(format!(
                "object of {} bytes exceeds the {} byte limit",
                size, self.file_size_limit
            )));
        }
        Ok(())
    }
}

/// The injected set of backend clients, resolved once at startup.
#[derive(Clone)]
pub struct Backend {
    pub questions: Arc<dyn QuestionSource>,
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Backend {
    pub fn new(
        questions: Arc<dyn QuestionSource>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            questions,
            records,
            blobs,
        }
    }
}
