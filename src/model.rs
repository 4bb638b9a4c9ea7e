//! Typed rows for the quiz tables
//!
//! This module defines the record types stored behind the persistence
//! gateway: quizzes, questions, options, participants, and answers.
//! Identifiers are assigned by the gateway in strictly increasing order,
//! so "creation order" and "ascending identifier" are the same ordering.
//! Question presentation order relies on this.

use std::{fmt::Display, marker::PhantomData, num::ParseIntError, str::FromStr};

use derive_where::derive_where;
use serde::{Deserialize, Deserializer, Serialize};

use crate::gateway::{Immutable, Record, RowData, Selector, Table};

/// Minimum value for generated join codes (in octal: 10000)
const JOIN_CODE_MIN: u16 = 0o10_000;
/// Maximum value for generated join codes (in octal: 100000)
const JOIN_CODE_MAX: u16 = 0o100_000;

/// A typed identifier for a stored record
///
/// The type parameter ties an identifier to the row type it references,
/// so a question id cannot be passed where a participant id is expected.
/// Identifiers are assigned by the gateway at insertion time and are
/// strictly increasing, which makes them double as creation order.
#[derive_where(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id<R> {
    raw: u64,
    marker: PhantomData<fn() -> R>,
}

/// Identifier of a [`QuizRow`]
pub type QuizId = Id<QuizRow>;
/// Identifier of a [`QuestionRow`]
pub type QuestionId = Id<QuestionRow>;
/// Identifier of an [`OptionRow`]
pub type OptionId = Id<OptionRow>;
/// Identifier of a [`ParticipantRow`]
pub type ParticipantId = Id<ParticipantRow>;
/// Identifier of an [`AnswerRow`]
pub type AnswerId = Id<AnswerRow>;

impl<R> Id<R> {
    /// Wraps a gateway-assigned raw identifier.
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self {
            raw,
            marker: PhantomData,
        }
    }

    /// Returns the raw identifier value.
    pub(crate) fn raw(self) -> u64 {
        self.raw
    }
}

impl<R> Display for Id<R> {
    /// Formats the identifier as a decimal string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.raw.fmt(f)
    }
}

impl<R> FromStr for Id<R> {
    type Err = ParseIntError;

    /// Parses an identifier from its decimal string form
    ///
    /// # Errors
    ///
    /// Returns a `ParseIntError` if the string is not a decimal integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_raw(s.parse()?))
    }
}

impl<R> Serialize for Id<R> {
    /// Serializes the identifier as a decimal string
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, R> Deserialize<'de> for Id<R> {
    /// Deserializes an identifier from a decimal string
    fn deserialize<D>(deserializer: D) -> Result<Id<R>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Id::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

/// A human-friendly code for joining a quiz
///
/// Join codes are generated randomly within a range that always displays
/// as a 5-digit octal number, which keeps them short and unambiguous when
/// read out loud or typed from a projected screen next to the QR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JoinCode(u16);

impl JoinCode {
    /// Creates a new random join code.
    pub fn new() -> Self {
        Self(fastrand::u16(JOIN_CODE_MIN..JOIN_CODE_MAX))
    }
}

impl Default for JoinCode {
    /// Creates a new random join code (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for JoinCode {
    /// Formats the join code as a 5-digit octal number
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:05o}", self.0)
    }
}

impl FromStr for JoinCode {
    type Err = ParseIntError;

    /// Parses a join code from its octal string form
    ///
    /// # Errors
    ///
    /// Returns a `ParseIntError` if the string is not a valid octal number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(u16::from_str_radix(s, 8)?))
    }
}

impl Serialize for JoinCode {
    /// Serializes the join code as an octal string
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for JoinCode {
    /// Deserializes a join code from an octal string
    fn deserialize<D>(deserializer: D) -> Result<JoinCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        JoinCode::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

/// Lifecycle state of a quiz
///
/// A quiz only ever moves forward through these states, never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Created, accepting participants, not yet started
    Waiting,
    /// Running; `current_question` names the active question
    InProgress,
    /// Terminal; the scoreboard is final
    Finished,
}

/// A stored quiz
///
/// Mutated only by organizer actions (start, advance, finish); all other
/// tables are immutable after creation. `current_question` is set while
/// the quiz is in progress and always references one of its own questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRow {
    /// Unique identifier of the quiz
    pub id: QuizId,
    /// Display name of the quiz
    pub name: String,
    /// Short code participants use to join
    pub join_code: JoinCode,
    /// Current lifecycle state
    pub status: Status,
    /// The active question while the quiz is in progress
    pub current_question: Option<QuestionId>,
}

/// Insert payload for a quiz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuiz {
    /// Display name of the quiz
    pub name: String,
    /// Short code participants use to join
    pub join_code: JoinCode,
    /// Initial lifecycle state
    pub status: Status,
}

/// Update payload for a quiz
///
/// `None` fields are left unchanged. `current_question` is never cleared
/// once set; finishing a quiz leaves the last question pointer in place.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QuizPatch {
    /// New lifecycle state, if changing
    pub status: Option<Status>,
    /// New active question, if changing
    pub current_question: Option<QuestionId>,
}

/// A stored question, immutable after creation
///
/// Presentation order among a quiz's questions is ascending identifier,
/// i.e. the order the organizer created them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRow {
    /// Unique identifier of the question
    pub id: QuestionId,
    /// The quiz this question belongs to
    pub quiz_id: QuizId,
    /// The question text shown to participants
    pub question_text: String,
    /// Index of the correct option in presentation order
    pub correct_answer: usize,
}

/// Insert payload for a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    /// The quiz this question belongs to
    pub quiz_id: QuizId,
    /// The question text shown to participants
    pub question_text: String,
    /// Index of the correct option in presentation order
    pub correct_answer: usize,
}

/// A stored answer option, immutable after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRow {
    /// Unique identifier of the option
    pub id: OptionId,
    /// The question this option belongs to
    pub question_id: QuestionId,
    /// The option text shown to participants
    pub option_text: String,
}

/// Insert payload for an answer option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOption {
    /// The question this option belongs to
    pub question_id: QuestionId,
    /// The option text shown to participants
    pub option_text: String,
}

/// A stored participant, immutable after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRow {
    /// Unique identifier of the participant
    pub id: ParticipantId,
    /// The quiz the participant joined
    pub quiz_id: QuizId,
    /// The participant's chosen name, unique within the quiz
    pub name: String,
}

/// Insert payload for a participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParticipant {
    /// The quiz the participant is joining
    pub quiz_id: QuizId,
    /// The participant's chosen name
    pub name: String,
}

/// A stored answer, immutable after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRow {
    /// Unique identifier of the answer
    pub id: AnswerId,
    /// The participant who submitted the answer
    pub participant_id: ParticipantId,
    /// The question the answer is for
    pub question_id: QuestionId,
    /// Index of the selected option in presentation order
    pub selected_option: usize,
}

/// Insert payload for an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnswer {
    /// The participant submitting the answer
    pub participant_id: ParticipantId,
    /// The question the answer is for
    pub question_id: QuestionId,
    /// Index of the selected option in presentation order
    pub selected_option: usize,
}

impl Record for QuizRow {
    const TABLE: Table = Table::Quizzes;
    type Draft = NewQuiz;
    type Patch = QuizPatch;

    fn assemble(raw_id: u64, draft: NewQuiz) -> Self {
        Self {
            id: Id::from_raw(raw_id),
            name: draft.name,
            join_code: draft.join_code,
            status: draft.status,
            current_question: None,
        }
    }

    fn raw_id(&self) -> u64 {
        self.id.raw()
    }

    fn matches(&self, selector: &Selector) -> bool {
        selector.admits_id(self.id.raw())
            && selector.quiz.is_none_or(|quiz| quiz == self.id)
            && selector.join_code.is_none_or(|code| code == self.join_code)
            && selector.question.is_none()
            && selector.participant.is_none()
    }

    fn apply(&mut self, patch: QuizPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(question) = patch.current_question {
            self.current_question = Some(question);
        }
    }

    fn from_row(row: &RowData) -> Option<Self> {
        match row {
            RowData::Quiz(quiz) => Some(quiz.clone()),
            _ => None,
        }
    }
}

impl Record for QuestionRow {
    const TABLE: Table = Table::Questions;
    type Draft = NewQuestion;
    type Patch = Immutable;

    fn assemble(raw_id: u64, draft: NewQuestion) -> Self {
        Self {
            id: Id::from_raw(raw_id),
            quiz_id: draft.quiz_id,
            question_text: draft.question_text,
            correct_answer: draft.correct_answer,
        }
    }

    fn raw_id(&self) -> u64 {
        self.id.raw()
    }

    fn matches(&self, selector: &Selector) -> bool {
        selector.admits_id(self.id.raw())
            && selector.quiz.is_none_or(|quiz| quiz == self.quiz_id)
            && selector.question.is_none_or(|question| question == self.id)
            && selector.participant.is_none()
            && selector.join_code.is_none()
    }

    fn apply(&mut self, patch: Immutable) {
        match patch {}
    }

    fn from_row(row: &RowData) -> Option<Self> {
        match row {
            RowData::Question(question) => Some(question.clone()),
            _ => None,
        }
    }
}

impl Record for OptionRow {
    const TABLE: Table = Table::Options;
    type Draft = NewOption;
    type Patch = Immutable;

    fn assemble(raw_id: u64, draft: NewOption) -> Self {
        Self {
            id: Id::from_raw(raw_id),
            question_id: draft.question_id,
            option_text: draft.option_text,
        }
    }

    fn raw_id(&self) -> u64 {
        self.id.raw()
    }

    fn matches(&self, selector: &Selector) -> bool {
        selector.admits_id(self.id.raw())
            && selector.question.is_none_or(|question| question == self.question_id)
            && selector.quiz.is_none()
            && selector.participant.is_none()
            && selector.join_code.is_none()
    }

    fn apply(&mut self, patch: Immutable) {
        match patch {}
    }

    fn from_row(row: &RowData) -> Option<Self> {
        match row {
            RowData::Option(option) => Some(option.clone()),
            _ => None,
        }
    }
}

impl Record for ParticipantRow {
    const TABLE: Table = Table::Participants;
    type Draft = NewParticipant;
    type Patch = Immutable;

    fn assemble(raw_id: u64, draft: NewParticipant) -> Self {
        Self {
            id: Id::from_raw(raw_id),
            quiz_id: draft.quiz_id,
            name: draft.name,
        }
    }

    fn raw_id(&self) -> u64 {
        self.id.raw()
    }

    fn matches(&self, selector: &Selector) -> bool {
        selector.admits_id(self.id.raw())
            && selector.quiz.is_none_or(|quiz| quiz == self.quiz_id)
            && selector.participant.is_none_or(|participant| participant == self.id)
            && selector.question.is_none()
            && selector.join_code.is_none()
    }

    fn apply(&mut self, patch: Immutable) {
        match patch {}
    }

    fn from_row(row: &RowData) -> Option<Self> {
        match row {
            RowData::Participant(participant) => Some(participant.clone()),
            _ => None,
        }
    }
}

impl Record for AnswerRow {
    const TABLE: Table = Table::Answers;
    type Draft = NewAnswer;
    type Patch = Immutable;

    fn assemble(raw_id: u64, draft: NewAnswer) -> Self {
        Self {
            id: Id::from_raw(raw_id),
            participant_id: draft.participant_id,
            question_id: draft.question_id,
            selected_option: draft.selected_option,
        }
    }

    fn raw_id(&self) -> u64 {
        self.id.raw()
    }

    fn matches(&self, selector: &Selector) -> bool {
        selector.admits_id(self.id.raw())
            && selector.question.is_none_or(|question| question == self.question_id)
            && selector
                .participant
                .is_none_or(|participant| participant == self.participant_id)
            && selector.quiz.is_none()
            && selector.join_code.is_none()
    }

    fn apply(&mut self, patch: Immutable) {
        match patch {}
    }

    fn from_row(row: &RowData) -> Option<Self> {
        match row {
            RowData::Answer(answer) => Some(answer.clone()),
            _ => None,
        }
    }
}
