// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    flow::{AssessmentFlow, Phase, Step},
    models::{question::Question, user::DetailsFields},
};

/// The step the cursor points at, as rendered to a client.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepView {
    Question {
        index: usize,
        question: Question,
        /// Previously recorded answer, if any.
        selected: Option<String>,
    },
    PhotoUpload,
    UserDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoView {
    pub index: usize,
    pub preview_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailsView {
    #[serde(flatten)]
    pub fields: DetailsFields,
    pub valid: bool,
}

/// Snapshot of a flow returned by every assessment endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssessmentView {
    pub session_id: Uuid,
    pub step: StepView,
    pub current_step: usize,
    pub total_steps: usize,
    pub progress: u8,
    pub label: String,
    pub answered: usize,
    pub photos: Vec<PhotoView>,
    pub details: DetailsView,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub can_submit: bool,
    pub submitting: bool,
    pub submitted_user_id: Option<i64>,
    pub error: Option<String>,
}

impl AssessmentView {
    pub fn new(session_id: Uuid, flow: &AssessmentFlow) -> Self {
        let step = match flow.step() {
            Step::Question(index) => {
                let question = flow.questions()[index].clone();
                let selected = flow.answers().get(question.id).map(|a| a.answer.clone());
                StepView::Question {
                    index,
                    question,
                    selected,
                }
            }
            Step::PhotoUpload => StepView::PhotoUpload,
            Step::UserDetails => StepView::UserDetails,
        };

        let photos = flow
            .photos()
            .assets()
            .iter()
            .enumerate()
            .map(|(index, p)| PhotoView {
                index,
                preview_id: p.preview_id(),
                file_name: p.file_name.clone(),
                content_type: p.content_type.clone(),
                size: p.size(),
            })
            .collect();

        let submitted_user_id = match flow.phase() {
            Phase::Submitted { user_id } => Some(user_id),
            _ => None,
        };

        Self {
            session_id,
            step,
            current_step: flow.cursor(),
            total_steps: flow.total_steps(),
            progress: flow.progress(),
            label: flow.label(),
            answered: flow.answers().len(),
            photos,
            details: DetailsView {
                fields: flow.details().clone(),
                valid: flow.details_valid(),
            },
            can_advance: flow.can_advance(),
            can_retreat: flow.can_retreat(),
            can_submit: flow.can_submit(),
            submitting: flow.is_submitting(),
            submitted_user_id,
            error: flow.last_error().map(str::to_string),
        }
    }
}

/// Body of the seeding endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct SeedResponse {
    pub success: bool,
    pub message: String,
}
