//! Content providers that supply categories and questions.

pub mod bank;
pub mod trivia_api;

use serde::Deserialize;
use thiserror::Error;

use crate::question::{Difficulty, Question};

pub use bank::BankSource;
pub use trivia_api::TriviaApiSource;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("question source unavailable: {0}")]
    Unavailable(String),
    #[error("no {difficulty} question available for {category}")]
    NoQuestionAvailable {
        category: String,
        difficulty: Difficulty,
    },
    #[error("malformed question: {0}")]
    Malformed(String),
}

/// Supplies the category list and questions for a session.
pub trait QuestionSource {
    fn list_categories(&mut self) -> Result<Vec<String>, SourceError>;

    fn next_question(
        &mut self,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<Question, SourceError>;
}

impl<S: QuestionSource + ?Sized> QuestionSource for Box<S> {
    fn list_categories(&mut self) -> Result<Vec<String>, SourceError> {
        (**self).list_categories()
    }

    fn next_question(
        &mut self,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<Question, SourceError> {
        (**self).next_question(category, difficulty)
    }
}

/// Wire shape shared by the trivia API and the bundled bank files.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawQuestion {
    pub question: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
    pub difficulty: Difficulty,
}

impl RawQuestion {
    pub(crate) fn into_question(self) -> Result<Question, SourceError> {
        Question::new(
            self.question,
            self.correct_answer,
            self.incorrect_answers,
            self.difficulty,
        )
    }
}
