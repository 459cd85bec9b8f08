use clap::ValueEnum;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::source::SourceError;

/// How hard a question is; also selects the scoring base.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Hard,
            Difficulty::Medium => Difficulty::Easy,
            Difficulty::Hard => Difficulty::Medium,
        }
    }
}

/// A question as supplied by a content source. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    correct_answer: String,
    distractors: Vec<String>,
    difficulty: Difficulty,
}

impl Question {
    /// Builds a question, dropping duplicate distractors and any distractor
    /// equal to the correct answer. At least one distractor must remain.
    pub fn new(
        text: impl Into<String>,
        correct_answer: impl Into<String>,
        distractors: impl IntoIterator<Item = String>,
        difficulty: Difficulty,
    ) -> Result<Self, SourceError> {
        let text = text.into();
        let correct_answer = correct_answer.into();

        if text.trim().is_empty() {
            return Err(SourceError::Malformed("question text is empty".into()));
        }
        if correct_answer.trim().is_empty() {
            return Err(SourceError::Malformed(format!(
                "question {text:?} has no correct answer"
            )));
        }

        let distractors: Vec<String> = distractors
            .into_iter()
            .filter(|d| *d != correct_answer)
            .unique()
            .collect();

        if distractors.is_empty() {
            return Err(SourceError::Malformed(format!(
                "question {text:?} has no distractors"
            )));
        }

        Ok(Self {
            text,
            correct_answer,
            distractors,
            difficulty,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn distractors(&self) -> &[String] {
        &self.distractors
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn is_correct(&self, option: &str) -> bool {
        option == self.correct_answer
    }
}

/// A question together with the order its options are shown in.
///
/// The order is drawn once, when the question is loaded, and never changes
/// for the lifetime of the question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedQuestion {
    question: Question,
    options: Vec<String>,
}

impl PresentedQuestion {
    pub fn new<R: Rng + ?Sized>(question: Question, rng: &mut R) -> Self {
        let mut options = Vec::with_capacity(question.distractors.len() + 1);
        options.push(question.correct_answer.clone());
        options.extend(question.distractors.iter().cloned());
        options.shuffle(rng);

        Self { question, options }
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn option(&self, idx: usize) -> Option<&str> {
        self.options.get(idx).map(String::as_str)
    }
}
