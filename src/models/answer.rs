// src/models/answer.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A user's latest answer to one question.
///
/// Carries snapshots of the question text and category so stored responses
/// stay readable if the catalog changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    pub question_text: String,
    pub answer: String,
    pub category: String,
}

/// DTO for recording an answer.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordAnswerRequest {
    pub question_id: i64,
    #[validate(length(min = 1, max = 2000))]
    pub answer: String,
}
