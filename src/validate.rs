use thiserror::Error;

use crate::question::Difficulty;

pub const MIN_QUESTIONS: u32 = 1;
pub const MAX_QUESTIONS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter your name")]
    EmptyName,
    #[error("please choose a category")]
    NoCategorySelected,
    #[error("number of questions must be a whole number from {MIN_QUESTIONS} to {MAX_QUESTIONS}")]
    InvalidQuestionCount,
}

/// Setup values as entered by the player, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfig {
    pub player_name: String,
    pub category: String,
    pub difficulty: Difficulty,
    /// Kept as text since it usually comes straight from an input field.
    pub question_count: String,
}

impl RawConfig {
    pub fn new(
        player_name: impl Into<String>,
        category: impl Into<String>,
        difficulty: Difficulty,
        question_count: impl ToString,
    ) -> Self {
        Self {
            player_name: player_name.into(),
            category: category.into(),
            difficulty,
            question_count: question_count.to_string(),
        }
    }
}

/// Validated configuration for one session. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    player_name: String,
    category: String,
    difficulty: Difficulty,
    question_count: u32,
}

impl SessionConfig {
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }
}

/// Checks name, then category, then question count; the first failure wins.
pub fn validate(raw: &RawConfig, categories: &[String]) -> Result<SessionConfig, ValidationError> {
    let player_name = raw.player_name.trim();
    if player_name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let category = raw.category.as_str();
    if category.is_empty() || !categories.iter().any(|c| c == category) {
        return Err(ValidationError::NoCategorySelected);
    }

    let question_count = raw
        .question_count
        .trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidQuestionCount)?;
    if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&question_count) {
        return Err(ValidationError::InvalidQuestionCount);
    }

    Ok(SessionConfig {
        player_name: player_name.to_string(),
        category: category.to_string(),
        difficulty: raw.difficulty,
        question_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<String> {
        vec!["Science".to_string(), "History".to_string()]
    }

    #[test]
    fn test_valid_config() {
        let raw = RawConfig::new("  Ann ", "Science", Difficulty::Hard, 5);
        let cfg = validate(&raw, &categories()).unwrap();
        assert_eq!(cfg.player_name(), "Ann");
        assert_eq!(cfg.category(), "Science");
        assert_eq!(cfg.difficulty(), Difficulty::Hard);
        assert_eq!(cfg.question_count(), 5);
    }

    #[test]
    fn test_empty_name() {
        let raw = RawConfig::new("   ", "Science", Difficulty::Easy, 5);
        assert_eq!(validate(&raw, &categories()), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_missing_or_unknown_category() {
        let raw = RawConfig::new("Ann", "", Difficulty::Easy, 5);
        assert_eq!(
            validate(&raw, &categories()),
            Err(ValidationError::NoCategorySelected)
        );

        let raw = RawConfig::new("Ann", "Cooking", Difficulty::Easy, 5);
        assert_eq!(
            validate(&raw, &categories()),
            Err(ValidationError::NoCategorySelected)
        );

        // nothing loaded yet
        let raw = RawConfig::new("Ann", "Science", Difficulty::Easy, 5);
        assert_eq!(validate(&raw, &[]), Err(ValidationError::NoCategorySelected));
    }

    #[test]
    fn test_question_count_bounds() {
        for bad in ["0", "51", "-3", "abc", "", "2.5"] {
            let raw = RawConfig::new("Ann", "Science", Difficulty::Easy, bad);
            assert_eq!(
                validate(&raw, &categories()),
                Err(ValidationError::InvalidQuestionCount),
                "count {bad:?} should be rejected"
            );
        }
        for good in ["1", "50", " 12 "] {
            let raw = RawConfig::new("Ann", "Science", Difficulty::Easy, good);
            assert!(validate(&raw, &categories()).is_ok());
        }
    }

    #[test]
    fn test_first_failure_wins() {
        let raw = RawConfig::new("", "", Difficulty::Easy, "0");
        assert_eq!(validate(&raw, &categories()), Err(ValidationError::EmptyName));

        let raw = RawConfig::new("Ann", "", Difficulty::Easy, "0");
        assert_eq!(
            validate(&raw, &categories()),
            Err(ValidationError::NoCategorySelected)
        );
    }
}
