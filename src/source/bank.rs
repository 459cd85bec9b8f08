use std::collections::{HashMap, HashSet};

use include_dir::{include_dir, Dir};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::debug;

use super::{QuestionSource, RawQuestion, SourceError};
use crate::question::{Difficulty, Question};

static BANK_DIR: Dir = include_dir!("src/bank");

#[derive(Deserialize, Clone, Debug)]
struct BankFile {
    name: String,
    questions: Vec<RawQuestion>,
}

/// Offline question bank compiled into the binary.
///
/// Questions are drawn at random per category and difficulty. A question is
/// not repeated until every question for that pair has been served.
pub struct BankSource {
    categories: Vec<(String, Vec<Question>)>,
    served: HashMap<(String, Difficulty), HashSet<usize>>,
    rng: StdRng,
}

impl BankSource {
    pub fn bundled() -> Result<Self, SourceError> {
        let mut files = Vec::new();
        for file in BANK_DIR.files() {
            let is_json = file
                .path()
                .extension()
                .is_some_and(|ext| ext == "json");
            if !is_json {
                continue;
            }
            let contents = file.contents_utf8().ok_or_else(|| {
                SourceError::Malformed(format!("{} is not valid UTF-8", file.path().display()))
            })?;
            files.push(contents);
        }
        Self::from_json(files)
    }

    /// Builds a bank from JSON documents shaped like the bundled files.
    pub fn from_json<'a>(docs: impl IntoIterator<Item = &'a str>) -> Result<Self, SourceError> {
        let mut categories = Vec::new();
        for doc in docs {
            let bank: BankFile = serde_json::from_str(doc)
                .map_err(|e| SourceError::Malformed(format!("question bank: {e}")))?;
            let questions = bank
                .questions
                .into_iter()
                .map(RawQuestion::into_question)
                .collect::<Result<Vec<_>, _>>()?;
            categories.push((bank.name, questions));
        }
        categories.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Self {
            categories,
            served: HashMap::new(),
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn questions_for(&self, category: &str) -> Option<&[Question]> {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, questions)| questions.as_slice())
    }
}

impl QuestionSource for BankSource {
    fn list_categories(&mut self) -> Result<Vec<String>, SourceError> {
        Ok(self.categories.iter().map(|(name, _)| name.clone()).collect())
    }

    fn next_question(
        &mut self,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<Question, SourceError> {
        let no_question = || SourceError::NoQuestionAvailable {
            category: category.to_string(),
            difficulty,
        };

        let candidates: Vec<usize> = self
            .questions_for(category)
            .ok_or_else(no_question)?
            .iter()
            .enumerate()
            .filter(|(_, q)| q.difficulty() == difficulty)
            .map(|(idx, _)| idx)
            .collect();
        if candidates.is_empty() {
            return Err(no_question());
        }

        let served = self
            .served
            .entry((category.to_string(), difficulty))
            .or_default();
        if candidates.iter().all(|idx| served.contains(idx)) {
            debug!(category, %difficulty, "question bank exhausted, starting over");
            served.clear();
        }
        let fresh: Vec<usize> = candidates
            .into_iter()
            .filter(|idx| !served.contains(idx))
            .collect();
        let idx = *fresh.choose(&mut self.rng).ok_or_else(no_question)?;
        served.insert(idx);

        self.questions_for(category)
            .and_then(|questions| questions.get(idx))
            .cloned()
            .ok_or_else(no_question)
    }
}
