// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'user_photos' table: one stored photo of a user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PhotoRef {
    pub user_id: i64,
    /// Object path inside the photo bucket.
    pub storage_path: String,
    /// 1-based position in upload order.
    pub display_order: i32,
}

/// Represents the 'assessment_responses' table: one answer of a user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ResponseRow {
    pub user_id: i64,
    pub question_id: i64,
    pub question_text: String,
    pub answer: String,
    pub category: String,
}

/// Body returned after a successful submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub user_id: i64,
    pub photos_stored: usize,
    pub responses_stored: usize,
    pub message: String,
}
