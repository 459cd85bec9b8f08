//! The quiz session state machine.
//!
//! A [`QuizMachine`] moves through `Configuring -> InProgress -> Ended`.
//! Every transition is a plain method call; the caller feeds it ticks, user
//! intents and question deliveries one at a time. Question fetches are
//! handed out as [`FetchRequest`]s and answered through [`QuizMachine::deliver`],
//! so the machine never blocks on a content source.

use std::time::Duration;

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::answer_log::{Answer, AnswerLog, AnswerRecord};
use crate::clock::{Clock, ClockHandle};
use crate::error::{ContractViolation, QuizError};
use crate::question::{Difficulty, PresentedQuestion, Question};
use crate::scoring::ScoringPolicy;
use crate::source::{QuestionSource, SourceError};
use crate::summary::ResultSummary;
use crate::validate::{validate, RawConfig, SessionConfig, ValidationError};

pub const DEFAULT_SECONDS_PER_QUESTION: u32 = 10;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Settings shared by every session a machine runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub seconds_per_question: u32,
    pub tick_interval: Duration,
    pub scoring: ScoringPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seconds_per_question: DEFAULT_SECONDS_PER_QUESTION,
            tick_interval: TICK_INTERVAL,
            scoring: ScoringPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Configuring,
    InProgress,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Completed,
    Stopped,
}

/// Identifies one question fetch. Ids are never reused by a machine, even
/// across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A question the driver must fetch and hand back via `deliver`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: RequestId,
    pub category: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Pending,
    Resolved,
}

/// The question currently on screen and its countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveQuestion {
    presented: PresentedQuestion,
    remaining_secs: u32,
    resolution: Resolution,
}

impl LiveQuestion {
    pub fn presented(&self) -> &PresentedQuestion {
        &self.presented
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_pending(&self) -> bool {
        self.resolution == Resolution::Pending
    }
}

/// Snapshot of one session, readable by the presentation layer.
#[derive(Debug, Clone)]
pub struct SessionState {
    config: SessionConfig,
    settings: EngineSettings,
    current: Option<LiveQuestion>,
    questions_answered: u32,
    total_score: u64,
    log: AnswerLog,
    fetch_error: Option<SourceError>,
    started_at: DateTime<Local>,
    ended: Option<(EndReason, DateTime<Local>)>,
}

impl SessionState {
    fn new(config: SessionConfig, settings: EngineSettings) -> Self {
        Self {
            config,
            settings,
            current: None,
            questions_answered: 0,
            total_score: 0,
            log: AnswerLog::new(),
            fetch_error: None,
            started_at: Local::now(),
            ended: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn current(&self) -> Option<&LiveQuestion> {
        self.current.as_ref()
    }

    /// Seconds left on the live question, if there is one.
    pub fn remaining_secs(&self) -> Option<u32> {
        self.current.as_ref().map(|q| q.remaining_secs)
    }

    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    pub fn questions_remaining(&self) -> u32 {
        self.config
            .question_count()
            .saturating_sub(self.questions_answered)
    }

    pub fn total_score(&self) -> u64 {
        self.total_score
    }

    pub fn log(&self) -> &AnswerLog {
        &self.log
    }

    /// The last fetch failure, cleared once a question arrives or a retry
    /// is issued.
    pub fn fetch_error(&self) -> Option<&SourceError> {
        self.fetch_error.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.ended.map(|(reason, _)| reason)
    }

    pub fn ended_at(&self) -> Option<DateTime<Local>> {
        self.ended.map(|(_, at)| at)
    }

    /// Resolves the live question with `answer` and records it.
    fn resolve(&mut self, answer: Answer) -> Option<AnswerRecord> {
        let live = self.current.as_mut().filter(|q| q.is_pending())?;
        let question = live.presented.question();

        let is_correct = answer
            .as_option()
            .is_some_and(|option| question.is_correct(option));
        let total = self.settings.seconds_per_question;
        let points = self.settings.scoring.score(
            is_correct,
            live.remaining_secs,
            total,
            question.difficulty(),
        );

        let record = AnswerRecord {
            question_text: question.text().to_string(),
            selected: answer,
            is_correct,
            correct_answer: question.correct_answer().to_string(),
            points_awarded: points,
            seconds_taken: total.saturating_sub(live.remaining_secs),
        };
        live.resolution = Resolution::Resolved;

        self.log.append(record.clone());
        self.questions_answered += 1;
        self.total_score += u64::from(points);
        Some(record)
    }
}

#[derive(Debug, Clone)]
enum Phase {
    Configuring {
        last_error: Option<ValidationError>,
    },
    InProgress(SessionState),
    Ended(SessionState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No pending question to count down (or a tick from a stale clock).
    Ignored,
    Counted { remaining_secs: u32 },
    /// Time ran out; the question was recorded as unanswered.
    Expired(AnswerRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Recorded(AnswerRecord),
    /// The question had already been answered or timed out.
    AlreadyResolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next(FetchRequest),
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Presented,
    /// The response belonged to an abandoned request and was dropped.
    Discarded,
}

/// Drives one quiz session at a time.
pub struct QuizMachine<C: Clock> {
    phase: Phase,
    categories: Vec<String>,
    settings: EngineSettings,
    clock: C,
    running_clock: Option<ClockHandle>,
    outstanding: Option<FetchRequest>,
    next_request: u64,
    rng: StdRng,
}

impl<C: Clock> QuizMachine<C> {
    pub fn new(clock: C, settings: EngineSettings) -> Self {
        Self {
            phase: Phase::Configuring { last_error: None },
            categories: Vec::new(),
            settings,
            clock,
            running_clock: None,
            outstanding: None,
            next_request: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixes the option shuffle, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn status(&self) -> Status {
        match self.phase {
            Phase::Configuring { .. } => Status::Configuring,
            Phase::InProgress(_) => Status::InProgress,
            Phase::Ended(_) => Status::Ended,
        }
    }

    /// The running or finished session; `None` while configuring.
    pub fn state(&self) -> Option<&SessionState> {
        match &self.phase {
            Phase::Configuring { .. } => None,
            Phase::InProgress(state) | Phase::Ended(state) => Some(state),
        }
    }

    pub fn last_validation_error(&self) -> Option<&ValidationError> {
        match &self.phase {
            Phase::Configuring { last_error } => last_error.as_ref(),
            _ => None,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn set_categories(&mut self, categories: Vec<String>) {
        debug!(count = categories.len(), "categories loaded");
        self.categories = categories;
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn running_clock(&self) -> Option<ClockHandle> {
        self.running_clock
    }

    pub fn outstanding(&self) -> Option<&FetchRequest> {
        self.outstanding.as_ref()
    }

    /// Validates the setup and starts a session, returning the fetch for
    /// question 1. On a validation error the machine stays in Configuring.
    pub fn submit(&mut self, raw: &RawConfig) -> Result<FetchRequest, QuizError> {
        let Phase::Configuring { last_error } = &mut self.phase else {
            return Err(ContractViolation::NotConfiguring.into());
        };

        let config = match validate(raw, &self.categories) {
            Ok(config) => config,
            Err(e) => {
                debug!(error = %e, "session setup rejected");
                *last_error = Some(e.clone());
                return Err(e.into());
            }
        };

        info!(
            player = config.player_name(),
            category = config.category(),
            difficulty = %config.difficulty(),
            questions = config.question_count(),
            "session started"
        );
        self.phase = Phase::InProgress(SessionState::new(config, self.settings));
        self.issue_request()
    }

    /// Hands back the result of a fetch. Responses to anything but the
    /// outstanding request are discarded.
    pub fn deliver(
        &mut self,
        id: RequestId,
        result: Result<Question, SourceError>,
    ) -> Result<Delivery, QuizError> {
        if self.outstanding.as_ref().map(|r| r.id) != Some(id) {
            warn!(request = id.value(), "discarding response for abandoned request");
            return Ok(Delivery::Discarded);
        }
        self.outstanding = None;

        let Phase::InProgress(state) = &mut self.phase else {
            return Ok(Delivery::Discarded);
        };

        match result {
            Ok(question) => {
                if self.running_clock.is_some() {
                    return Err(ContractViolation::ClockAlreadyRunning.into());
                }
                debug!(request = id.value(), question = question.text(), "question delivered");
                state.current = Some(LiveQuestion {
                    presented: PresentedQuestion::new(question, &mut self.rng),
                    remaining_secs: self.settings.seconds_per_question,
                    resolution: Resolution::Pending,
                });
                state.fetch_error = None;
                self.running_clock = Some(self.clock.start(self.settings.tick_interval));
                Ok(Delivery::Presented)
            }
            Err(e) => {
                warn!(request = id.value(), error = %e, "question fetch failed");
                state.fetch_error = Some(e.clone());
                Err(e.into())
            }
        }
    }

    /// Fetches the outstanding question from `source` synchronously.
    pub fn fetch_with<S: QuestionSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Delivery, QuizError> {
        let Some(request) = self.outstanding.clone() else {
            return Err(ContractViolation::NoLiveQuestion.into());
        };
        let result = source.next_question(&request.category, request.difficulty);
        self.deliver(request.id, result)
    }

    /// Re-issues the fetch for the current slot after a failure.
    pub fn retry(&mut self) -> Result<FetchRequest, QuizError> {
        let Phase::InProgress(state) = &mut self.phase else {
            return Err(ContractViolation::NotInProgress.into());
        };
        if self.outstanding.is_some() {
            return Err(ContractViolation::FetchOutstanding.into());
        }
        if state.current.is_some() || state.fetch_error.is_none() {
            return Err(ContractViolation::NothingToRetry.into());
        }
        state.fetch_error = None;
        self.issue_request()
    }

    /// A tick from the clock identified by `handle`. Ticks from any clock
    /// other than the running one are ignored.
    pub fn clock_tick(&mut self, handle: ClockHandle) -> TickOutcome {
        if self.running_clock != Some(handle) {
            return TickOutcome::Ignored;
        }
        self.tick()
    }

    /// Counts the live question down by one second, resolving it as
    /// unanswered when time runs out.
    pub fn tick(&mut self) -> TickOutcome {
        let Phase::InProgress(state) = &mut self.phase else {
            return TickOutcome::Ignored;
        };
        let Some(live) = state.current.as_mut().filter(|q| q.is_pending()) else {
            return TickOutcome::Ignored;
        };

        live.remaining_secs = live.remaining_secs.saturating_sub(1);
        let remaining_secs = live.remaining_secs;
        if remaining_secs > 0 {
            return TickOutcome::Counted { remaining_secs };
        }

        match state.resolve(Answer::NoAnswer) {
            Some(record) => {
                debug!(question = %record.question_text, "time is up");
                self.stop_clock();
                TickOutcome::Expired(record)
            }
            None => TickOutcome::Ignored,
        }
    }

    /// Submits an answer for the live question. Only the first submission
    /// per question counts.
    pub fn answer(&mut self, option: &str) -> Result<AnswerOutcome, QuizError> {
        let Phase::InProgress(state) = &mut self.phase else {
            return Err(ContractViolation::NotInProgress.into());
        };
        let Some(live) = state.current.as_ref() else {
            return Err(ContractViolation::NoLiveQuestion.into());
        };
        if !live.is_pending() {
            return Ok(AnswerOutcome::AlreadyResolved);
        }

        let record = state
            .resolve(Answer::Chosen(option.to_string()))
            .ok_or(ContractViolation::NoLiveQuestion)?;
        debug!(
            correct = record.is_correct,
            points = record.points_awarded,
            "answer recorded"
        );
        self.stop_clock();
        Ok(AnswerOutcome::Recorded(record))
    }

    /// Moves past a resolved question: to the next fetch, or to Ended once
    /// every configured question has been answered.
    pub fn advance(&mut self) -> Result<Advance, QuizError> {
        let Phase::InProgress(state) = &mut self.phase else {
            return Err(ContractViolation::NotInProgress.into());
        };
        match state.current.as_ref() {
            None if self.outstanding.is_some() => {
                return Err(ContractViolation::FetchOutstanding.into())
            }
            None => return Err(ContractViolation::NoLiveQuestion.into()),
            Some(live) if live.is_pending() => {
                return Err(ContractViolation::QuestionPending.into())
            }
            Some(_) => {}
        }

        if state.questions_answered >= state.config.question_count() {
            self.finish(EndReason::Completed);
            return Ok(Advance::Ended);
        }

        state.current = None;
        self.issue_request().map(Advance::Next)
    }

    /// Ends the session early, keeping everything answered so far.
    pub fn stop(&mut self) -> Result<(), QuizError> {
        if !matches!(self.phase, Phase::InProgress(_)) {
            return Err(ContractViolation::NotInProgress.into());
        }
        self.finish(EndReason::Stopped);
        Ok(())
    }

    /// Throws the current session away and returns to Configuring.
    pub fn restart(&mut self) {
        self.stop_clock();
        if let Some(request) = self.outstanding.take() {
            debug!(request = request.id.value(), "abandoning outstanding fetch");
        }
        self.phase = Phase::Configuring { last_error: None };
    }

    pub fn summary(&self) -> Result<ResultSummary, QuizError> {
        match &self.phase {
            Phase::Ended(state) => Ok(ResultSummary::summarize(state)),
            _ => Err(ContractViolation::NotEnded.into()),
        }
    }

    fn finish(&mut self, reason: EndReason) {
        self.stop_clock();
        self.outstanding = None;

        let phase = std::mem::replace(&mut self.phase, Phase::Configuring { last_error: None });
        self.phase = match phase {
            Phase::InProgress(mut state) => {
                state.current = None;
                state.ended = Some((reason, Local::now()));
                info!(
                    ?reason,
                    answered = state.questions_answered,
                    score = state.total_score,
                    "session ended"
                );
                Phase::Ended(state)
            }
            other => other,
        };
    }

    fn issue_request(&mut self) -> Result<FetchRequest, QuizError> {
        let Phase::InProgress(state) = &self.phase else {
            return Err(ContractViolation::NotInProgress.into());
        };
        if self.outstanding.is_some() {
            return Err(ContractViolation::FetchOutstanding.into());
        }

        self.next_request += 1;
        let request = FetchRequest {
            id: RequestId(self.next_request),
            category: state.config.category().to_string(),
            difficulty: state.config.difficulty(),
        };
        debug!(request = request.id.value(), "requesting question");
        self.outstanding = Some(request.clone());
        Ok(request)
    }

    fn stop_clock(&mut self) {
        if let Some(handle) = self.running_clock.take() {
            self.clock.cancel(handle);
        }
    }
}
