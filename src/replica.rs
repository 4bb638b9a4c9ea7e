//! Client-side quiz view
//!
//! A [`Replica`] is what a connected screen (organizer dashboard or
//! participant device) keeps of one quiz: the quiz row, its questions
//! and options, the roster, the answer tally for the active question,
//! and the scoreboard once the quiz finishes.
//!
//! Change notifications only say that something changed; the replica
//! re-fetches the affected rows from the gateway on every event. That
//! makes duplicated or reordered notifications harmless and a missed
//! one recoverable by a full reload.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    TruncatedVec,
    collector::{Progress, Tally},
    gateway::{ChangeEvent, ChangeKind, Error, Gateway, Order, Selector, Subscription, Table},
    model::{OptionRow, ParticipantRow, QuestionId, QuestionRow, QuizId, QuizRow, Status},
    scoring::Scoreboard,
};

/// A locally held copy of one quiz's visible state
#[derive(Debug, Clone, Serialize)]
pub struct Replica {
    /// The quiz row as last fetched
    quiz: QuizRow,
    /// The quiz's questions in presentation order
    questions: Vec<QuestionRow>,
    /// Options of each question in presentation order
    options: HashMap<QuestionId, Vec<OptionRow>>,
    /// The roster in join order
    participants: Vec<ParticipantRow>,
    /// Answer count for the active question
    tally: Tally,
    /// The final scoreboard, present once the quiz finished
    scoreboard: Option<Scoreboard>,
}

impl Replica {
    /// Loads the full state of a quiz from the gateway.
    pub fn load<G: Gateway>(gateway: &G, quiz: QuizId) -> Result<Self, Error> {
        let quiz: QuizRow = gateway.fetch(quiz)?;

        let questions: Vec<QuestionRow> =
            gateway.query(&Selector::of_quiz(quiz.id), Order::IdAscending, None)?;
        let mut options = HashMap::new();
        for question in &questions {
            let of_question: Vec<OptionRow> =
                gateway.query(&Selector::of_question(question.id), Order::IdAscending, None)?;
            options.insert(question.id, of_question);
        }
        let participants: Vec<ParticipantRow> =
            gateway.query(&Selector::of_quiz(quiz.id), Order::IdAscending, None)?;

        let mut tally = Tally::default();
        if let Some(current) = quiz.current_question {
            tally.begin(current);
            tally.recount(gateway)?;
        }

        let scoreboard = if quiz.status == Status::Finished {
            Some(Scoreboard::collect(gateway, quiz.id)?)
        } else {
            None
        };

        Ok(Self {
            quiz,
            questions,
            options,
            participants,
            tally,
            scoreboard,
        })
    }

    /// Subscribes to the change feeds this replica needs
    ///
    /// Quiz updates and roster inserts are filtered to this quiz; answer
    /// inserts cannot be (answers carry no quiz column), so the replica
    /// receives them all and the recount keeps the tally correct anyway.
    pub fn watch<G: Gateway>(&self, gateway: &G) -> Result<Vec<Subscription>, Error> {
        Ok(vec![
            gateway.subscribe(Table::Quizzes, ChangeKind::Update, Selector::by_id(self.quiz.id))?,
            gateway.subscribe(
                Table::Participants,
                ChangeKind::Insert,
                Selector::of_quiz(self.quiz.id),
            )?,
            gateway.subscribe(Table::Answers, ChangeKind::Insert, Selector::all())?,
        ])
    }

    /// Reconciles the replica with one change notification
    ///
    /// The event payload is only a trigger; the affected rows are
    /// re-fetched from the gateway.
    pub fn apply<G: Gateway>(&mut self, gateway: &G, event: &ChangeEvent) -> Result<(), Error> {
        match event.table {
            Table::Quizzes => {
                let fresh: QuizRow = gateway.fetch(self.quiz.id)?;
                if fresh.current_question != self.quiz.current_question {
                    if let Some(current) = fresh.current_question {
                        self.tally.begin(current);
                        self.tally.recount(gateway)?;
                    }
                }
                if fresh.status == Status::Finished && self.scoreboard.is_none() {
                    self.scoreboard = Some(Scoreboard::collect(gateway, self.quiz.id)?);
                }
                self.quiz = fresh;
            }
            Table::Participants => {
                self.participants =
                    gateway.query(&Selector::of_quiz(self.quiz.id), Order::IdAscending, None)?;
            }
            Table::Answers => {
                self.tally.recount(gateway)?;
            }
            Table::Questions | Table::Options => {
                self.questions =
                    gateway.query(&Selector::of_quiz(self.quiz.id), Order::IdAscending, None)?;
                self.options.clear();
                for question in &self.questions {
                    let of_question: Vec<OptionRow> = gateway.query(
                        &Selector::of_question(question.id),
                        Order::IdAscending,
                        None,
                    )?;
                    self.options.insert(question.id, of_question);
                }
            }
        }
        Ok(())
    }

    /// Drains pending events from subscriptions and reconciles each.
    pub fn sync<G: Gateway>(
        &mut self,
        gateway: &G,
        subscriptions: &[Subscription],
    ) -> Result<(), Error> {
        for subscription in subscriptions {
            for event in subscription.drain() {
                self.apply(gateway, &event)?;
            }
        }
        Ok(())
    }

    /// Returns the quiz row as last fetched.
    pub fn quiz(&self) -> &QuizRow {
        &self.quiz
    }

    /// Returns the active question and its options, if one is active.
    pub fn active_question(&self) -> Option<(&QuestionRow, &[OptionRow])> {
        if self.quiz.status != Status::InProgress {
            return None;
        }
        let current = self.quiz.current_question?;
        let question = self
            .questions
            .iter()
            .find(|question| question.id == current)?;
        let options = self
            .options
            .get(&current)
            .map_or(&[] as &[OptionRow], Vec::as_slice);
        Some((question, options))
    }

    /// Returns the answer progress of the active question.
    pub fn progress(&self) -> Progress {
        self.tally.progress(self.participants.len())
    }

    /// Returns up to `limit` roster names in join order, with the real count.
    pub fn waiting_names(&self, limit: usize) -> TruncatedVec<String> {
        TruncatedVec::new(
            self.participants
                .iter()
                .map(|participant| participant.name.clone()),
            limit,
            self.participants.len(),
        )
    }

    /// Returns the final scoreboard once the quiz finished.
    pub fn scoreboard(&self) -> Option<&Scoreboard> {
        self.scoreboard.as_ref()
    }
}
