use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::question::Difficulty;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("base points must increase with difficulty (easy {easy} < medium {medium} < hard {hard})")]
    BasesNotIncreasing { easy: u32, medium: u32, hard: u32 },
}

/// Points table for correct answers.
///
/// A correct answer earns the base for its difficulty plus
/// `bonus_per_second` for every second still left on the clock. Wrong and
/// unanswered questions earn nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub base_easy: u32,
    pub base_medium: u32,
    pub base_hard: u32,
    pub bonus_per_second: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_easy: 100,
            base_medium: 200,
            base_hard: 300,
            bonus_per_second: 10,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.base_easy < self.base_medium && self.base_medium < self.base_hard {
            Ok(())
        } else {
            Err(ScoringError::BasesNotIncreasing {
                easy: self.base_easy,
                medium: self.base_medium,
                hard: self.base_hard,
            })
        }
    }

    pub fn base(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.base_easy,
            Difficulty::Medium => self.base_medium,
            Difficulty::Hard => self.base_hard,
        }
    }

    pub fn score(
        &self,
        is_correct: bool,
        remaining_secs: u32,
        total_secs: u32,
        difficulty: Difficulty,
    ) -> u32 {
        if !is_correct {
            return 0;
        }
        let bonus = self
            .bonus_per_second
            .saturating_mul(remaining_secs.min(total_secs));
        self.base(difficulty).saturating_add(bonus)
    }

    /// Best score a single question can yield: correct with no time elapsed.
    pub fn max_points(&self, total_secs: u32, difficulty: Difficulty) -> u32 {
        self.score(true, total_secs, total_secs, difficulty)
    }
}
