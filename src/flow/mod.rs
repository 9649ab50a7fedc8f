// src/flow/mod.rs

//! The assessment flow: a step cursor over the questions followed by a photo
//! step and a details step, with submission on the last step.

pub mod answers;
pub mod details;
pub mod photos;
pub mod submission;

use thiserror::Error;

use crate::{
    config::{MAX_TEXT_ANSWER_LEN, MIN_PHOTOS, SCALE_MAX, SCALE_MIN},
    models::{
        answer::Answer,
        question::{Question, QuestionType},
        user::{DetailsFields, UpdateDetailsRequest},
    },
    utils::html::clean_text,
};

use self::{
    answers::AnswerStore,
    details::DetailsForm,
    photos::{CandidatePhoto, PhotoCollector, PreviewRegistry},
    submission::{OutgoingPhoto, Submission, SubmissionReport, SubmissionResult},
};

/// The only message a user sees when a submission fails.
pub const SUBMISSION_FAILED_MESSAGE: &str =
    "An error occurred while submitting your assessment. Please try again.";

#[derive(Debug, Error)]
pub enum FlowError {
    /// Local input problem; blocks the transition and never reaches a backend.
    #[error("{0}")]
    Validation(String),

    /// A photo batch was rejected.
    #[error("{0}")]
    Resource(String),

    /// A remote write failed during submission.
    #[error("An error occurred while submitting your assessment. Please try again.")]
    RemoteWrite,

    #[error("No questions found. Please seed the database first.")]
    NoQuestions,

    #[error("Question {0} is not part of this assessment")]
    UnknownQuestion(i64),

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("This assessment has already been submitted")]
    AlreadySubmitted,
}

/// Where the cursor points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Question(usize),
    PhotoUpload,
    UserDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Editing,
    Submitting,
    Submitted { user_id: i64 },
}

/// Result of recording an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// True when a multiple-choice answer moved the cursor forward.
    pub advanced: bool,
    pub step: Step,
}

/// Checks a raw answer against the rules of its question type and returns
/// the value to store.
pub fn normalize_answer(question: &Question, raw: &str) -> Result<String, FlowError> {
    match question.question_type {
        QuestionType::MultipleChoice => {
            let options = question.options();
            if options.is_empty() {
                return Err(FlowError::Validation(
                    "This question type is not supported.".to_string(),
                ));
            }
            options
                .iter()
                .find(|o| o.as_str() == raw)
                .cloned()
                .ok_or_else(|| {
                    FlowError::Validation(format!("'{}' is not one of the available options", raw))
                })
        }
        QuestionType::Text => {
            let cleaned = clean_text(raw);
            if cleaned.is_empty() {
                return Err(FlowError::Validation("Please type an answer".to_string()));
            }
            if cleaned.chars().count() > MAX_TEXT_ANSWER_LEN {
                return Err(FlowError::Validation(format!(
                    "Answers must be at most {} characters",
                    MAX_TEXT_ANSWER_LEN
                )));
            }
            Ok(cleaned)
        }
        QuestionType::Scale => match raw.trim().parse::<i32>() {
            Ok(v) if (SCALE_MIN..=SCALE_MAX).contains(&v) => Ok(v.to_string()),
            _ => Err(FlowError::Validation(format!(
                "Ratings must be a whole number from {} to {}",
                SCALE_MIN, SCALE_MAX
            ))),
        },
    }
}

/// One user's pass through the assessment.
///
/// Owns its answers, photos and form; dropping the flow releases every photo
/// preview it still holds.
#[derive(Debug)]
pub struct AssessmentFlow {
    questions: Vec<Question>,
    cursor: usize,
    answers: AnswerStore,
    photos: PhotoCollector,
    details: DetailsForm,
    phase: Phase,
    last_error: Option<String>,
}

impl AssessmentFlow {
    pub fn new(questions: Vec<Question>, previews: PreviewRegistry) -> Result<Self, FlowError> {
        if questions.is_empty() {
            return Err(FlowError::NoQuestions);
        }
        Ok(Self {
            questions,
            cursor: 0,
            answers: AnswerStore::new(),
            photos: PhotoCollector::new(previews),
            details: DetailsForm::new(),
            phase: Phase::Editing,
            last_error: None,
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Questions plus the photo and details steps.
    pub fn total_steps(&self) -> usize {
        self.questions.len() + 2
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn step(&self) -> Step {
        let n = self.questions.len();
        if self.cursor < n {
            Step::Question(self.cursor)
        } else if self.cursor == n {
            Step::PhotoUpload
        } else {
            Step::UserDetails
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.step() {
            Step::Question(i) => self.questions.get(i),
            _ => None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    /// Answers in question order, for display.
    pub fn answers_in_question_order(&self) -> Vec<&Answer> {
        self.questions
            .iter()
            .filter_map(|q| self.answers.get(q.id))
            .collect()
    }

    pub fn photos(&self) -> &PhotoCollector {
        &self.photos
    }

    pub fn details(&self) -> &DetailsFields {
        self.details.fields()
    }

    pub fn details_valid(&self) -> bool {
        self.details.is_valid()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whole-number percentage of steps already passed.
    pub fn progress(&self) -> u8 {
        ((self.cursor as f64 / self.total_steps() as f64) * 100.0).round() as u8
    }

    pub fn label(&self) -> String {
        match self.step() {
            Step::Question(i) => format!("Question {} of {}", i + 1, self.questions.len()),
            Step::PhotoUpload => "Photo Upload".to_string(),
            Step::UserDetails => "User Details".to_string(),
        }
    }

    pub fn can_advance(&self) -> bool {
        if self.phase != Phase::Editing {
            return false;
        }
        match self.step() {
            Step::Question(i) => self.answers.contains(self.questions[i].id),
            Step::PhotoUpload => self.photos.len() >= MIN_PHOTOS,
            Step::UserDetails => false,
        }
    }

    pub fn can_retreat(&self) -> bool {
        self.phase == Phase::Editing && self.cursor > 0
    }

    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Editing
            && self.step() == Step::UserDetails
            && self.photos.len() >= MIN_PHOTOS
            && self.details.is_valid()
    }

    fn ensure_editable(&self) -> Result<(), FlowError> {
        match self.phase {
            Phase::Editing => Ok(()),
            Phase::Submitting => Err(FlowError::SubmissionInProgress),
            Phase::Submitted { .. } => Err(FlowError::AlreadySubmitted),
        }
    }

    pub fn advance(&mut self) -> Result<Step, FlowError> {
        self.ensure_editable()?;
        if !self.can_advance() {
            let reason = match self.step() {
                Step::Question(_) => "Please answer this question before continuing".to_string(),
                Step::PhotoUpload => format!("Please upload at least {} photos", MIN_PHOTOS),
                Step::UserDetails => "Submit the form to finish the assessment".to_string(),
            };
            return Err(FlowError::Validation(reason));
        }
        self.cursor += 1;
        Ok(self.step())
    }

    pub fn retreat(&mut self) -> Result<Step, FlowError> {
        self.ensure_editable()?;
        if self.cursor == 0 {
            return Err(FlowError::Validation(
                "Already at the first question".to_string(),
            ));
        }
        self.cursor -= 1;
        Ok(self.step())
    }

    /// Upserts the answer for `question_id`.
    ///
    /// A multiple-choice answer to the current question moves the cursor on;
    /// text and scale answers wait for an explicit `advance`.
    pub fn record_answer(&mut self, question_id: i64, raw: &str) -> Result<RecordOutcome, FlowError> {
        self.ensure_editable()?;
        let index = self
            .questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or(FlowError::UnknownQuestion(question_id))?;
        let question = &self.questions[index];
        let value = normalize_answer(question, raw)?;

        self.answers.record(Answer {
            question_id,
            question_text: question.question_text.clone(),
            answer: value,
            category: question.category.clone(),
        });

        let auto_advance = question.question_type == QuestionType::MultipleChoice
            && self.step() == Step::Question(index);
        if auto_advance {
            self.cursor += 1;
        }

        Ok(RecordOutcome {
            advanced: auto_advance,
            step: self.step(),
        })
    }

    pub fn accept_photos(&mut self, candidates: Vec<CandidatePhoto>) -> Result<usize, FlowError> {
        self.ensure_editable()?;
        self.photos.accept(candidates)
    }

    pub fn remove_photo(&mut self, index: usize) -> Result<(), FlowError> {
        self.ensure_editable()?;
        self.photos.remove(index)
    }

    pub fn update_details(&mut self, update: UpdateDetailsRequest) -> Result<(), FlowError> {
        self.ensure_editable()?;
        self.details.apply(update);
        Ok(())
    }

    /// Checks the guards and enters the submitting state, returning the
    /// snapshot to write. Navigation stays locked until
    /// [`finish_submission`](Self::finish_submission).
    pub fn begin_submission(&mut self) -> Result<Submission, FlowError> {
        self.ensure_editable()?;
        if self.step() != Step::UserDetails {
            return Err(FlowError::Validation(
                "Finish the previous steps before submitting".to_string(),
            ));
        }
        if self.photos.len() < MIN_PHOTOS {
            self.last_error = Some(format!("Please upload at least {} photos", MIN_PHOTOS));
            return Err(FlowError::Validation(format!(
                "Please upload at least {} photos",
                MIN_PHOTOS
            )));
        }
        let details = match self.details.parse() {
            Ok(details) => details,
            Err(e) => {
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let submission = Submission {
            details,
            photos: self
                .photos
                .assets()
                .iter()
                .map(|p| OutgoingPhoto {
                    file_name: p.file_name.clone(),
                    content_type: p.content_type.clone(),
                    bytes: p.bytes.clone(),
                })
                .collect(),
            answers: self.answers_in_question_order().into_iter().cloned().collect(),
        };

        self.phase = Phase::Submitting;
        self.last_error = None;
        Ok(submission)
    }

    /// Applies the outcome of a submission attempt.
    ///
    /// Success is terminal. Failure returns the flow to the details step with
    /// the form re-enabled and the generic message recorded.
    pub fn finish_submission(&mut self, result: SubmissionResult) -> Result<SubmissionReport, FlowError> {
        if self.phase != Phase::Submitting {
            return Err(FlowError::Validation("No submission is in progress".to_string()));
        }
        match result {
            Ok(report) => {
                self.phase = Phase::Submitted {
                    user_id: report.user_id,
                };
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Error submitting assessment: {}", e);
                self.phase = Phase::Editing;
                self.last_error = Some(SUBMISSION_FAILED_MESSAGE.to_string());
                Err(FlowError::RemoteWrite)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Bytes;
    use sqlx::types::Json;

    use super::*;
    use crate::store::{
        Backend,
        memory::{FailPoint, MemoryStore},
    };

    fn mc(id: i64, options: &[&str]) -> Question {
        Question {
            id,
            question_text: format!("Multiple choice {}", id),
            category: "Values and Beliefs".to_string(),
            options: Some(Json(options.iter().map(|o| o.to_string()).collect())),
            question_type: QuestionType::MultipleChoice,
            created_at: None,
        }
    }

    fn text(id: i64) -> Question {
        Question {
            id,
            question_text: format!("Text {}", id),
            category: "Relationship Goals".to_string(),
            options: None,
            question_type: QuestionType::Text,
            created_at: None,
        }
    }

    fn scale(id: i64) -> Question {
        Question {
            id,
            question_text: format!("Scale {}", id),
            category: "Communication Style".to_string(),
            options: None,
            question_type: QuestionType::Scale,
            created_at: None,
        }
    }

    fn flow() -> AssessmentFlow {
        AssessmentFlow::new(
            vec![mc(10, &["Trust", "Passion"]), text(20), scale(30)],
            PreviewRegistry::new(),
        )
        .unwrap()
    }

    fn jpeg(name: &str) -> CandidatePhoto {
        CandidatePhoto {
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: Bytes::from_static(b"jpeg"),
        }
    }

    fn fill_details(flow: &mut AssessmentFlow, age: &str) {
        flow.update_details(UpdateDetailsRequest {
            full_name: Some("Jo".to_string()),
            email: Some("a@b.com".to_string()),
            gender: Some("male".to_string()),
            age: Some(age.to_string()),
        })
        .unwrap();
    }

    /// Walks to the details step with three photos and valid details.
    fn ready_flow() -> AssessmentFlow {
        let mut f = flow();
        f.record_answer(10, "Trust").unwrap();
        f.record_answer(20, "Being honest").unwrap();
        f.advance().unwrap();
        f.record_answer(30, "8").unwrap();
        f.advance().unwrap();
        f.accept_photos(vec![jpeg("a.jpg"), jpeg("b.jpg"), jpeg("c.jpg")])
            .unwrap();
        f.advance().unwrap();
        fill_details(&mut f, "25");
        f
    }

    #[test]
    fn empty_question_list_cannot_start() {
        let err = AssessmentFlow::new(vec![], PreviewRegistry::new()).unwrap_err();
        assert!(matches!(err, FlowError::NoQuestions));
    }

    #[test]
    fn steps_cover_questions_then_photos_then_details() {
        let f = flow();
        assert_eq!(f.total_steps(), 5);
        assert_eq!(f.step(), Step::Question(0));
        assert_eq!(f.label(), "Question 1 of 3");
        assert_eq!(f.progress(), 0);
        assert!(!f.can_retreat());
    }

    #[test]
    fn question_step_advances_only_when_answered() {
        let mut f = flow();
        assert!(!f.can_advance());
        assert!(matches!(f.advance(), Err(FlowError::Validation(_))));

        // Multiple choice moves on by itself.
        let outcome = f.record_answer(10, "Passion").unwrap();
        assert!(outcome.advanced);
        assert_eq!(outcome.step, Step::Question(1));

        // Text waits for an explicit advance.
        assert!(!f.can_advance());
        let outcome = f.record_answer(20, "Someone kind").unwrap();
        assert!(!outcome.advanced);
        assert!(f.can_advance());
        assert_eq!(f.advance().unwrap(), Step::Question(2));
    }

    #[test]
    fn re_answering_a_previous_choice_does_not_move_the_cursor() {
        let mut f = flow();
        f.record_answer(10, "Trust").unwrap();
        f.record_answer(20, "Honesty").unwrap();
        f.advance().unwrap();
        assert_eq!(f.step(), Step::Question(2));

        let outcome = f.record_answer(10, "Passion").unwrap();
        assert!(!outcome.advanced);
        assert_eq!(f.step(), Step::Question(2));
        assert_eq!(f.answers().get(10).unwrap().answer, "Passion");
        assert_eq!(f.answers().len(), 2);
    }

    #[test]
    fn retreat_walks_back_and_stops_at_first_step() {
        let mut f = flow();
        f.record_answer(10, "Trust").unwrap();
        assert_eq!(f.retreat().unwrap(), Step::Question(0));
        assert!(f.retreat().is_err());
        // The answer survives navigation.
        assert!(f.can_advance());
    }

    #[test]
    fn photo_step_needs_three_photos() {
        let mut f = flow();
        f.record_answer(10, "Trust").unwrap();
        f.record_answer(20, "Honesty").unwrap();
        f.advance().unwrap();
        f.record_answer(30, "5").unwrap();
        f.advance().unwrap();
        assert_eq!(f.step(), Step::PhotoUpload);
        assert_eq!(f.label(), "Photo Upload");

        f.accept_photos(vec![jpeg("a.jpg"), jpeg("b.jpg")]).unwrap();
        assert!(!f.can_advance());
        assert!(f.advance().is_err());

        f.accept_photos(vec![jpeg("c.jpg")]).unwrap();
        assert!(f.can_advance());
        assert_eq!(f.advance().unwrap(), Step::UserDetails);
        assert_eq!(f.progress(), 80);

        // No forward move out of the details step.
        assert!(!f.can_advance());
        assert!(f.advance().is_err());
    }

    #[test]
    fn rejected_photo_batch_leaves_flow_unchanged() {
        let mut f = flow();
        let err = f
            .accept_photos(vec![
                jpeg("a.jpg"),
                CandidatePhoto {
                    file_name: "cv.pdf".to_string(),
                    content_type: "application/pdf".to_string(),
                    bytes: Bytes::from_static(b"%PDF"),
                },
            ])
            .unwrap_err();
        assert!(matches!(err, FlowError::Resource(_)));
        assert!(f.photos().is_empty());
    }

    #[test]
    fn text_question_takes_free_text_only() {
        let q = text(1);
        assert_eq!(normalize_answer(&q, "Anything at all").unwrap(), "Anything at all");
        assert_eq!(normalize_answer(&q, "  <b>Loyalty</b> ").unwrap(), "Loyalty");
        assert_eq!(normalize_answer(&q, "R&B and jazz").unwrap(), "R&B and jazz");
        assert_eq!(normalize_answer(&q, "I <3 hiking").unwrap(), "I <3 hiking");
        assert!(normalize_answer(&q, "   ").is_err());
        assert!(normalize_answer(&q, &"a".repeat(MAX_TEXT_ANSWER_LEN + 1)).is_err());
    }

    #[test]
    fn choice_must_match_an_option() {
        let q = mc(1, &["Trust", "Passion"]);
        assert_eq!(normalize_answer(&q, "Trust").unwrap(), "Trust");
        assert!(normalize_answer(&q, "Money").is_err());

        let broken = Question {
            options: None,
            ..mc(2, &[])
        };
        assert!(normalize_answer(&broken, "Trust").is_err());
    }

    #[test]
    fn scale_accepts_one_to_ten() {
        let q = scale(1);
        assert_eq!(normalize_answer(&q, " 10 ").unwrap(), "10");
        assert_eq!(normalize_answer(&q, "1").unwrap(), "1");
        assert!(normalize_answer(&q, "0").is_err());
        assert!(normalize_answer(&q, "11").is_err());
        assert!(normalize_answer(&q, "7.5").is_err());
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut f = flow();
        assert!(matches!(
            f.record_answer(999, "Trust"),
            Err(FlowError::UnknownQuestion(999))
        ));
        assert!(f.answers().is_empty());
    }

    #[test]
    fn submission_requires_valid_details() {
        let mut f = ready_flow();
        fill_details(&mut f, "17");
        assert!(!f.can_submit());
        assert!(matches!(f.begin_submission(), Err(FlowError::Validation(_))));
        assert_eq!(f.phase(), Phase::Editing);
        assert!(f.last_error().unwrap().contains("18"));
    }

    #[test]
    fn submitting_locks_navigation() {
        let mut f = ready_flow();
        let submission = f.begin_submission().unwrap();
        assert_eq!(submission.photos.len(), 3);
        assert_eq!(submission.answers.len(), 3);
        assert_eq!(submission.answers[0].question_id, 10);

        assert!(f.is_submitting());
        assert!(!f.can_retreat());
        assert!(matches!(f.retreat(), Err(FlowError::SubmissionInProgress)));
        assert!(matches!(f.remove_photo(0), Err(FlowError::SubmissionInProgress)));
        assert!(matches!(f.begin_submission(), Err(FlowError::SubmissionInProgress)));
    }

    #[tokio::test]
    async fn failed_upload_returns_to_details_for_retry() {
        let store = MemoryStore::with_bucket("user-photos");
        let backend = Backend::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        );
        store.fail_on(FailPoint::Upload);

        let mut f = ready_flow();
        let result = f.begin_submission().unwrap().execute(&backend).await;
        let err = f.finish_submission(result).unwrap_err();

        assert!(matches!(err, FlowError::RemoteWrite));
        assert_eq!(err.to_string(), SUBMISSION_FAILED_MESSAGE);
        assert!(store.responses().is_empty());
        assert_eq!(f.step(), Step::UserDetails);
        assert_eq!(f.phase(), Phase::Editing);
        assert!(f.can_submit());
        assert_eq!(f.last_error(), Some(SUBMISSION_FAILED_MESSAGE));

        // A manual retry goes through once the store recovers.
        store.clear_failures();
        let result = f.begin_submission().unwrap().execute(&backend).await;
        let report = f.finish_submission(result).unwrap();
        assert_eq!(f.phase(), Phase::Submitted { user_id: report.user_id });
        assert_eq!(store.responses().len(), 3);
        assert!(matches!(f.retreat(), Err(FlowError::AlreadySubmitted)));
    }
}
