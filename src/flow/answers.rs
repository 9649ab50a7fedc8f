// src/flow/answers.rs

use crate::models::answer::Answer;

/// Latest answer per question id.
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    answers: Vec<Answer>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the existing answer for the same question, else appends.
    pub fn record(&mut self, answer: Answer) {
        match self
            .answers
            .iter_mut()
            .find(|a| a.question_id == answer.question_id)
        {
            Some(existing) => *existing = answer,
            None => self.answers.push(answer),
        }
    }

    pub fn get(&self, question_id: i64) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    pub fn contains(&self, question_id: i64) -> bool {
        self.get(question_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter()
    }
}
