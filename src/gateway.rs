//! Persistence gateway contract
//!
//! This module defines the abstract storage-and-notification interface
//! the rest of the library is written against: filtered reads and
//! writes over five tables plus a row-change notification feed. The
//! concrete backend is out of scope; [`memory::MemoryGateway`] provides
//! an in-memory reference implementation used by tests and local runs.
//!
//! Notifications are delivery hints, not a source of truth. Consumers
//! must tolerate duplicated and reordered events by re-fetching the
//! affected rows, the way [`crate::replica::Replica`] does.

use std::sync::mpsc;

use enum_map::Enum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    AnswerRow, Id, JoinCode, OptionRow, ParticipantId, ParticipantRow, QuestionId, QuestionRow,
    QuizId, QuizRow,
};

pub mod memory;

/// The tables held by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Quiz lifecycle rows
    Quizzes,
    /// Question rows, immutable after creation
    Questions,
    /// Answer option rows, immutable after creation
    Options,
    /// Participant rows, immutable after creation
    Participants,
    /// Answer rows, immutable after creation
    Answers,
}

/// The kind of row change a subscription reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A row was inserted
    Insert,
    /// A row was updated
    Update,
}

/// Ordering of query results by identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Ascending identifier, i.e. creation order
    #[default]
    IdAscending,
    /// Descending identifier
    IdDescending,
}

/// A conjunctive row filter
///
/// Every set clause must hold for a row to match. Clauses that have no
/// corresponding column on a table (e.g. `quiz` on the answers table)
/// match nothing there; each [`Record`] implementation documents which
/// clauses it understands through its `matches` method.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Selector {
    /// Exact identifier to match
    pub id_eq: Option<u64>,
    /// Lower identifier bound (exclusive), used to walk creation order
    pub id_gt: Option<u64>,
    /// Owning quiz (for quizzes, the quiz itself)
    pub quiz: Option<QuizId>,
    /// Owning question (for questions, the question itself)
    pub question: Option<QuestionId>,
    /// Submitting participant (for participants, the participant itself)
    pub participant: Option<ParticipantId>,
    /// Join code of a quiz
    pub join_code: Option<JoinCode>,
}

impl Selector {
    /// Matches every row of a table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches the single row with the given identifier.
    pub fn by_id<R>(id: Id<R>) -> Self {
        Self {
            id_eq: Some(id.raw()),
            ..Self::default()
        }
    }

    /// Matches rows belonging to the given quiz.
    pub fn of_quiz(quiz: QuizId) -> Self {
        Self {
            quiz: Some(quiz),
            ..Self::default()
        }
    }

    /// Matches rows belonging to the given question.
    pub fn of_question(question: QuestionId) -> Self {
        Self {
            question: Some(question),
            ..Self::default()
        }
    }

    /// Matches the quiz with the given join code.
    pub fn with_join_code(code: JoinCode) -> Self {
        Self {
            join_code: Some(code),
            ..Self::default()
        }
    }

    /// Restricts matches to rows submitted by the given participant.
    pub fn and_participant(mut self, participant: ParticipantId) -> Self {
        self.participant = Some(participant);
        self
    }

    /// Restricts matches to rows created strictly after the given one.
    pub fn above<R>(mut self, id: Id<R>) -> Self {
        self.id_gt = Some(id.raw());
        self
    }

    /// Checks the identifier clauses against a raw identifier.
    pub(crate) fn admits_id(&self, raw: u64) -> bool {
        self.id_eq.is_none_or(|eq| eq == raw) && self.id_gt.is_none_or(|gt| raw > gt)
    }
}

/// A stored row of any table
///
/// Used where rows of different tables travel through one channel, such
/// as change notifications and the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize, derive_more::From)]
pub enum RowData {
    /// A quiz row
    Quiz(QuizRow),
    /// A question row
    Question(QuestionRow),
    /// An answer option row
    Option(OptionRow),
    /// A participant row
    Participant(ParticipantRow),
    /// An answer row
    Answer(AnswerRow),
}

impl RowData {
    /// Returns the table this row belongs to.
    pub fn table(&self) -> Table {
        match self {
            Self::Quiz(_) => Table::Quizzes,
            Self::Question(_) => Table::Questions,
            Self::Option(_) => Table::Options,
            Self::Participant(_) => Table::Participants,
            Self::Answer(_) => Table::Answers,
        }
    }

    /// Returns the raw identifier of the row.
    pub fn raw_id(&self) -> u64 {
        match self {
            Self::Quiz(row) => row.raw_id(),
            Self::Question(row) => row.raw_id(),
            Self::Option(row) => row.raw_id(),
            Self::Participant(row) => row.raw_id(),
            Self::Answer(row) => row.raw_id(),
        }
    }

    /// Checks the row against a selector.
    pub fn matches(&self, selector: &Selector) -> bool {
        match self {
            Self::Quiz(row) => row.matches(selector),
            Self::Question(row) => row.matches(selector),
            Self::Option(row) => row.matches(selector),
            Self::Participant(row) => row.matches(selector),
            Self::Answer(row) => row.matches(selector),
        }
    }
}

/// A row-change notification delivered to a subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The table the change happened on
    pub table: Table,
    /// Whether the row was inserted or updated
    pub kind: ChangeKind,
    /// The row after the change
    pub row: RowData,
}

impl ChangeEvent {
    /// Converts the event to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Patch type for tables that are immutable after creation
///
/// Uninhabited, so calling [`Gateway::update`] for such a table cannot
/// be expressed at all.
#[derive(Debug, Clone, Copy)]
pub enum Immutable {}

/// A typed row of a gateway table
///
/// Ties a row type to its table, its insert draft, and its update patch,
/// and describes how the row responds to selectors. Identifier assignment
/// belongs to the gateway: `assemble` is only called with a fresh,
/// strictly increasing identifier.
pub trait Record: Clone + std::fmt::Debug + Into<RowData> + Sized {
    /// The table this record type is stored in
    const TABLE: Table;
    /// Insert payload, everything but the identifier
    type Draft: Clone + std::fmt::Debug;
    /// Update payload; [`Immutable`] for tables that are never updated
    type Patch: Clone + std::fmt::Debug;

    /// Builds a full record from a gateway-assigned identifier and a draft.
    fn assemble(raw_id: u64, draft: Self::Draft) -> Self;

    /// Returns the raw identifier of this record.
    fn raw_id(&self) -> u64;

    /// Checks this record against a selector.
    fn matches(&self, selector: &Selector) -> bool;

    /// Applies an update payload in place.
    fn apply(&mut self, patch: Self::Patch);

    /// Extracts a record of this type from untyped row data.
    fn from_row(row: &RowData) -> Option<Self>;
}

/// Errors reported by a gateway
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    /// No row matched where exactly one was required
    #[error("record not found")]
    NotFound,
    /// The backing storage or notification feed failed, opaque cause
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A cancelable handle on a change-notification feed
///
/// Events accumulate until polled. Dropping the subscription stops
/// delivery; [`Gateway::unsubscribe`] removes it from the registry
/// eagerly.
#[derive(Debug)]
pub struct Subscription {
    token: Uuid,
    receiver: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Pairs a fresh token with the receiving end of an event channel.
    pub(crate) fn new(token: Uuid, receiver: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { token, receiver }
    }

    /// Returns the token identifying this subscription to the gateway.
    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Takes the next pending event, if any.
    pub fn poll(&self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// Takes all pending events.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        std::iter::from_fn(|| self.poll()).collect()
    }
}

/// The persistence gateway the quiz core is written against
///
/// Implementations must serialize concurrent writes: every insert is
/// durably stored exactly once and eventually notified, but no ordering
/// is guaranteed between concurrent submissions from different clients.
pub trait Gateway {
    /// Inserts a record, assigning it the next identifier.
    fn insert<R: Record>(&self, draft: R::Draft) -> Result<R, Error>;

    /// Updates every record matching the selector and returns the first.
    ///
    /// Fails with [`Error::NotFound`] if nothing matched.
    fn update<R: Record>(&self, selector: &Selector, patch: R::Patch) -> Result<R, Error>;

    /// Returns records matching the selector, ordered by identifier.
    fn query<R: Record>(
        &self,
        selector: &Selector,
        order: Order,
        limit: Option<usize>,
    ) -> Result<Vec<R>, Error>;

    /// Subscribes to changes of the given kind on a table, filtered by a
    /// selector evaluated against the changed row.
    fn subscribe(
        &self,
        table: Table,
        kind: ChangeKind,
        selector: Selector,
    ) -> Result<Subscription, Error>;

    /// Removes a subscription from the registry.
    fn unsubscribe(&self, token: Uuid);

    /// Returns the single first record matching the selector, if any.
    fn query_one<R: Record>(&self, selector: &Selector, order: Order) -> Result<Option<R>, Error> {
        Ok(self.query(selector, order, Some(1))?.into_iter().next())
    }

    /// Fetches a record by identifier.
    ///
    /// Fails with [`Error::NotFound`] if the record does not exist.
    fn fetch<R: Record>(&self, id: Id<R>) -> Result<R, Error> {
        self.query_one(&Selector::by_id(id), Order::IdAscending)?
            .ok_or(Error::NotFound)
    }
}
