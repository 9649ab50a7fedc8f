// src/models/question.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Text,
    Scale,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Text => "text",
            QuestionType::Scale => "scale",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for QuestionType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "text" => Ok(QuestionType::Text),
            "scale" => Ok(QuestionType::Scale),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub question_text: String,

    /// Section the question belongs to (e.g. "Values and Beliefs").
    pub category: String,

    /// Choices for `multiple_choice` questions, stored as a JSON array.
    /// Absent for `text` and `scale` questions.
    pub options: Option<Json<Vec<String>>>,

    #[sqlx(try_from = "String")]
    pub question_type: QuestionType,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    /// The option list, empty when the question carries none.
    pub fn options(&self) -> &[String] {
        self.options.as_ref().map(|o| o.0.as_slice()).unwrap_or(&[])
    }
}

/// A catalog entry waiting to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub question_text: String,
    pub category: String,
    pub options: Option<Vec<String>>,
    pub question_type: QuestionType,
}
