//! Answer collection
//!
//! Participant answers pass through [`submit`], which only accepts an
//! answer for the question that is active right now, exactly once per
//! participant. Transient storage failures are retried with exponential
//! backoff; how to wait is injected as a closure so the environment
//! decides (sleep a thread, schedule a timer, skip entirely in tests).
//!
//! A [`Tally`] counts who has answered the active question so the
//! organizer can see answer progress; it says nothing about who answered
//! what.

use std::{collections::HashSet, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use thiserror::Error;
use web_time::SystemTime;

use crate::{
    constants,
    gateway::{self, Gateway, Order, Selector},
    model::{AnswerRow, NewAnswer, ParticipantId, QuestionId, QuizId, QuizRow, Status},
};

/// Errors that can occur when submitting an answer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The quiz is not accepting answers in its current state
    #[error("quiz is {0:?}, not accepting answers")]
    NotAccepting(Status),
    /// The answer targets a question that is no longer active
    #[error("question is no longer active")]
    StaleQuestion,
    /// The participant already answered the active question
    #[error("already answered this question")]
    DuplicateAnswer,
    /// No quiz exists with the given identifier
    #[error("quiz not found")]
    QuizNotFound,
    /// The gateway failed and retries were exhausted
    #[error("storage error: {0}")]
    Gateway(#[from] gateway::Error),
}

/// Retry behavior for transient storage failures
///
/// The delay before attempt `n + 1` is `base_delay << n`.
#[serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub attempts: u32,
    /// Delay before the first retry
    #[serde_as(as = "serde_with::DurationMilliSeconds")]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: constants::retry::SUBMIT_ATTEMPTS,
            base_delay: Duration::from_millis(constants::retry::BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Returns the delay before the retry following attempt `attempt`.
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2_u32.saturating_pow(attempt)
    }
}

/// Submits a participant's answer to the active question
///
/// The answer is validated against the quiz's stored state: the quiz
/// must be in progress and `question` must be its active question, and
/// the participant must not have answered it already. A transient
/// storage failure anywhere on the path, reads included, is retried
/// per `policy`, waiting via `delay` between attempts; validation
/// failures are never retried.
pub fn submit<G, D>(
    gateway: &G,
    quiz: QuizId,
    participant: ParticipantId,
    question: QuestionId,
    selected_option: usize,
    policy: RetryPolicy,
    mut delay: D,
) -> Result<AnswerRow, Error>
where
    G: Gateway,
    D: FnMut(Duration),
{
    let mut attempt = 0;
    loop {
        match try_submit(gateway, quiz, participant, question, selected_option) {
            Ok(answer) => return Ok(answer),
            Err(Error::Gateway(error))
                if error.is_transient() && attempt + 1 < policy.attempts =>
            {
                delay(policy.delay_after(attempt));
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// One validate-then-insert attempt against the gateway.
fn try_submit<G: Gateway>(
    gateway: &G,
    quiz: QuizId,
    participant: ParticipantId,
    question: QuestionId,
    selected_option: usize,
) -> Result<AnswerRow, Error> {
    let quiz: QuizRow = gateway.fetch(quiz).map_err(|error| match error {
        gateway::Error::NotFound => Error::QuizNotFound,
        other => Error::Gateway(other),
    })?;
    if quiz.status != Status::InProgress {
        return Err(Error::NotAccepting(quiz.status));
    }
    if quiz.current_question != Some(question) {
        return Err(Error::StaleQuestion);
    }

    let existing: Option<AnswerRow> = gateway.query_one(
        &Selector::of_question(question).and_participant(participant),
        Order::IdAscending,
    )?;
    if existing.is_some() {
        return Err(Error::DuplicateAnswer);
    }

    Ok(gateway.insert(NewAnswer {
        participant_id: participant,
        question_id: question,
        selected_option,
    })?)
}

/// How far along the active question's answer collection is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Distinct participants who answered the active question
    pub answered: usize,
    /// Participants who joined the quiz
    pub total: usize,
}

impl Progress {
    /// Whether every joined participant has answered
    ///
    /// An empty roster is never complete; the condition is meant to
    /// drive an "everyone answered" affordance, which makes no sense
    /// before anyone joined.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.answered >= self.total
    }
}

/// A count of who answered the active question
///
/// The window resets every time the active question changes; answers to
/// other questions never count. Counting a participant twice has no
/// effect, so replayed notifications are harmless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tally {
    /// The question answers are currently counted for
    question: Option<QuestionId>,
    /// Participants who answered it
    answered: HashSet<ParticipantId>,
    /// When the active question's window opened
    opened: Option<SystemTime>,
}

impl Tally {
    /// Starts counting answers for a new active question.
    pub fn begin(&mut self, question: QuestionId) {
        self.question = Some(question);
        self.answered.clear();
        self.opened = Some(SystemTime::now());
    }

    /// Returns how long the active question has been open, if one is.
    pub fn elapsed(&self) -> Option<Duration> {
        self.opened.and_then(|opened| opened.elapsed().ok())
    }

    /// Counts a stored answer if it targets the active question
    ///
    /// Returns whether the count changed.
    pub fn record(&mut self, answer: &AnswerRow) -> bool {
        if self.question != Some(answer.question_id) {
            return false;
        }
        self.answered.insert(answer.participant_id)
    }

    /// Rebuilds the count from the stored answers to the active question
    ///
    /// Used instead of trusting individual notifications, which may be
    /// duplicated or lost.
    pub fn recount<G: Gateway>(&mut self, gateway: &G) -> Result<(), gateway::Error> {
        self.answered.clear();
        let Some(question) = self.question else {
            return Ok(());
        };
        let answers: Vec<AnswerRow> =
            gateway.query(&Selector::of_question(question), Order::IdAscending, None)?;
        self.answered
            .extend(answers.iter().map(|answer| answer.participant_id));
        Ok(())
    }

    /// Returns the progress of the active question against a roster size.
    pub fn progress(&self, total: usize) -> Progress {
        Progress {
            answered: self.answered.len(),
            total,
        }
    }
}
