//! Error types surfaced by the session engine.

use thiserror::Error;

use crate::source::SourceError;
use crate::validate::ValidationError;

/// A call the engine cannot honour in its current state. These point at a
/// bug in the caller, never at a runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ContractViolation {
    #[error("a session can only be submitted while configuring")]
    NotConfiguring,
    #[error("no session is in progress")]
    NotInProgress,
    #[error("there is no live question to answer")]
    NoLiveQuestion,
    #[error("the current question has not been resolved yet")]
    QuestionPending,
    #[error("a question is already being fetched")]
    FetchOutstanding,
    #[error("nothing to retry: the last fetch did not fail")]
    NothingToRetry,
    #[error("a clock is already running for the current question")]
    ClockAlreadyRunning,
    #[error("the session has not ended")]
    NotEnded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),
}

impl QuizError {
    /// Whether the player can simply try again (fetch failures).
    pub fn is_retryable(&self) -> bool {
        matches!(self, QuizError::Source(_))
    }
}
