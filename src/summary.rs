use std::fmt;

use chrono::{DateTime, Local};

use crate::answer_log::AnswerRecord;
use crate::question::Difficulty;
use crate::session::{EndReason, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remark {
    Perfect,
    Good,
    Encouragement,
}

impl Remark {
    /// Perfect on a full score, Good from half the maximum (inclusive).
    pub fn classify(total_score: u64, max_possible_score: u64) -> Self {
        if total_score == max_possible_score {
            Remark::Perfect
        } else if total_score.saturating_mul(2) >= max_possible_score {
            Remark::Good
        } else {
            Remark::Encouragement
        }
    }
}

impl fmt::Display for Remark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Remark::Perfect => "Perfect score!",
            Remark::Good => "Good job!",
            Remark::Encouragement => "Better luck next time!",
        })
    }
}

/// Read-only results of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub player_name: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub total_score: u64,
    pub max_possible_score: u64,
    /// Configured length of the session, even when it was stopped early.
    pub question_count: u32,
    pub questions_played: u32,
    pub correct_count: usize,
    pub ended_early: bool,
    pub finished_at: Option<DateTime<Local>>,
    pub log: Vec<AnswerRecord>,
    pub remark: Remark,
}

impl ResultSummary {
    pub fn summarize(state: &SessionState) -> Self {
        let config = state.config();
        let settings = state.settings();
        let per_question = settings
            .scoring
            .max_points(settings.seconds_per_question, config.difficulty());
        let max_possible_score = u64::from(config.question_count()) * u64::from(per_question);
        let total_score = state.total_score();

        Self {
            player_name: config.player_name().to_string(),
            category: config.category().to_string(),
            difficulty: config.difficulty(),
            total_score,
            max_possible_score,
            question_count: config.question_count(),
            questions_played: state.questions_answered(),
            correct_count: state.log().correct_count(),
            ended_early: matches!(state.end_reason(), Some(EndReason::Stopped))
                && state.questions_answered() < config.question_count(),
            finished_at: state.ended_at(),
            log: state.log().as_slice().to_vec(),
            remark: Remark::classify(total_score, max_possible_score),
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.max_possible_score == 0 {
            return 0.0;
        }
        (self.total_score as f64 / self.max_possible_score as f64 * 100.0).round()
    }
}
