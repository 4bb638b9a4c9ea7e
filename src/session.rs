//! Organizer-side quiz lifecycle
//!
//! A [`Session`] drives one quiz forward through its states: start the
//! first question, advance through the remaining ones in creation
//! order, and finish. Every transition is validated against the stored
//! state before it is applied, so a stale button press (a double-tapped
//! "next", a start on an already running quiz) is rejected instead of
//! repeated.

use thiserror::Error;

use crate::{
    gateway::{self, Gateway, Order, Selector},
    model::{QuestionRow, QuizId, QuizPatch, QuizRow, Status},
    scoring::Scoreboard,
};

/// Errors that can occur when driving a quiz's lifecycle
#[derive(Error, Debug)]
pub enum Error {
    /// The quiz is not in the state the transition requires
    #[error("quiz is {found:?}, expected {expected:?}")]
    InvalidState {
        /// The state the transition requires
        expected: Status,
        /// The state the quiz is actually in
        found: Status,
    },
    /// The quiz has no questions, so it cannot start
    #[error("quiz has no questions")]
    NoQuestions,
    /// No quiz exists with the given identifier
    #[error("quiz not found")]
    NotFound,
    /// The gateway failed
    #[error("storage error: {0}")]
    Gateway(#[from] gateway::Error),
}

/// What an advance transition led to
#[derive(Debug)]
pub enum Advanced {
    /// The quiz moved on to this question
    Question(QuestionRow),
    /// There was no next question; the quiz finished with this scoreboard
    Finished(Scoreboard),
}

/// An organizer's handle on one quiz
///
/// Holds no quiz state itself; every transition reads the stored row,
/// checks it, and writes through the gateway. Two sessions on the same
/// quiz therefore cannot both succeed in applying the same transition.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    quiz: QuizId,
}

impl Session {
    /// Creates a handle on the given quiz.
    pub fn new(quiz: QuizId) -> Self {
        Self { quiz }
    }

    /// Returns the quiz this session drives.
    pub fn quiz(&self) -> QuizId {
        self.quiz
    }

    /// Fetches the current quiz row.
    pub fn fetch<G: Gateway>(&self, gateway: &G) -> Result<QuizRow, Error> {
        gateway.fetch(self.quiz).map_err(|error| match error {
            gateway::Error::NotFound => Error::NotFound,
            other => Error::Gateway(other),
        })
    }

    /// Checks that the quiz is in the given state and returns its row.
    fn expect_status<G: Gateway>(&self, gateway: &G, expected: Status) -> Result<QuizRow, Error> {
        let quiz = self.fetch(gateway)?;
        if quiz.status != expected {
            return Err(Error::InvalidState {
                expected,
                found: quiz.status,
            });
        }
        Ok(quiz)
    }

    /// Starts the quiz on its first question
    ///
    /// The first question is the earliest-created one. Fails if the quiz
    /// is not waiting or has no questions; a quiz with no questions stays
    /// in the waiting state.
    pub fn start<G: Gateway>(&self, gateway: &G) -> Result<QuestionRow, Error> {
        self.expect_status(gateway, Status::Waiting)?;

        let first: QuestionRow = gateway
            .query_one(&Selector::of_quiz(self.quiz), Order::IdAscending)?
            .ok_or(Error::NoQuestions)?;

        let _: QuizRow = gateway.update(
            &Selector::by_id(self.quiz),
            QuizPatch {
                status: Some(Status::InProgress),
                current_question: Some(first.id),
            },
        )?;

        Ok(first)
    }

    /// Moves the quiz to the question after the active one
    ///
    /// If no later question exists, the quiz finishes instead and the
    /// final scoreboard is returned. Advancing never waits on answers;
    /// the organizer decides when to move on.
    pub fn advance<G: Gateway>(&self, gateway: &G) -> Result<Advanced, Error> {
        let quiz = self.expect_status(gateway, Status::InProgress)?;

        let next: Option<QuestionRow> = match quiz.current_question {
            Some(current) => gateway.query_one(
                &Selector::of_quiz(self.quiz).above(current),
                Order::IdAscending,
            )?,
            None => None,
        };

        match next {
            Some(question) => {
                let _: QuizRow = gateway.update(
                    &Selector::by_id(self.quiz),
                    QuizPatch {
                        status: None,
                        current_question: Some(question.id),
                    },
                )?;
                Ok(Advanced::Question(question))
            }
            None => Ok(Advanced::Finished(self.close(gateway)?)),
        }
    }

    /// Finishes the quiz from wherever it currently is
    ///
    /// Skips any remaining questions. Fails unless the quiz is in
    /// progress; finishing twice is rejected as an invalid state.
    pub fn finish<G: Gateway>(&self, gateway: &G) -> Result<Scoreboard, Error> {
        self.expect_status(gateway, Status::InProgress)?;
        self.close(gateway)
    }

    /// Marks the quiz finished and computes the scoreboard
    ///
    /// The last active question pointer is left in place.
    fn close<G: Gateway>(&self, gateway: &G) -> Result<Scoreboard, Error> {
        let _: QuizRow = gateway.update(
            &Selector::by_id(self.quiz),
            QuizPatch {
                status: Some(Status::Finished),
                current_question: None,
            },
        )?;
        Ok(Scoreboard::collect(gateway, self.quiz)?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use crate::model::{JoinCode, NewQuestion, NewQuiz};

    fn quiz_with_questions(gateway: &MemoryGateway, count: usize) -> (QuizRow, Vec<QuestionRow>) {
        let quiz: QuizRow = gateway
            .insert(NewQuiz {
                name: "Geo".to_owned(),
                join_code: JoinCode::new(),
                status: Status::Waiting,
            })
            .unwrap();
        let questions = (0..count)
            .map(|index| {
                gateway
                    .insert(NewQuestion {
                        quiz_id: quiz.id,
                        question_text: format!("Q{index}"),
                        correct_answer: 0,
                    })
                    .unwrap()
            })
            .collect();
        (quiz, questions)
    }

    #[test]
    fn start_activates_first_question() {
        let gateway = MemoryGateway::new();
        let (quiz, questions) = quiz_with_questions(&gateway, 2);
        let session = Session::new(quiz.id);

        let first = session.start(&gateway).unwrap();
        assert_eq!(first.id, questions[0].id);

        let stored = session.fetch(&gateway).unwrap();
        assert_eq!(stored.status, Status::InProgress);
        assert_eq!(stored.current_question, Some(questions[0].id));
    }

    #[test]
    fn start_without_questions_fails_and_stays_waiting() {
        let gateway = MemoryGateway::new();
        let (quiz, _) = quiz_with_questions(&gateway, 0);
        let session = Session::new(quiz.id);

        assert!(matches!(session.start(&gateway), Err(Error::NoQuestions)));
        assert_eq!(session.fetch(&gateway).unwrap().status, Status::Waiting);
    }

    #[test]
    fn start_twice_fails() {
        let gateway = MemoryGateway::new();
        let (quiz, _) = quiz_with_questions(&gateway, 1);
        let session = Session::new(quiz.id);

        session.start(&gateway).unwrap();
        assert!(matches!(
            session.start(&gateway),
            Err(Error::InvalidState {
                expected: Status::Waiting,
                found: Status::InProgress,
            })
        ));
    }

    #[test]
    fn advance_walks_questions_in_creation_order() {
        let gateway = MemoryGateway::new();
        let (quiz, questions) = quiz_with_questions(&gateway, 3);
        let session = Session::new(quiz.id);

        session.start(&gateway).unwrap();
        for expected in &questions[1..] {
            match session.advance(&gateway).unwrap() {
                Advanced::Question(question) => assert_eq!(question.id, expected.id),
                Advanced::Finished(_) => panic!("finished too early"),
            }
        }
    }

    #[test]
    fn advance_past_last_question_finishes() {
        let gateway = MemoryGateway::new();
        let (quiz, questions) = quiz_with_questions(&gateway, 1);
        let session = Session::new(quiz.id);

        session.start(&gateway).unwrap();
        match session.advance(&gateway).unwrap() {
            Advanced::Finished(scoreboard) => assert_eq!(scoreboard.question_count(), 1),
            Advanced::Question(_) => panic!("expected the quiz to finish"),
        }

        let stored = session.fetch(&gateway).unwrap();
        assert_eq!(stored.status, Status::Finished);
        // The last question pointer stays for the record.
        assert_eq!(stored.current_question, Some(questions[0].id));
    }

    #[test]
    fn advance_requires_in_progress() {
        let gateway = MemoryGateway::new();
        let (quiz, _) = quiz_with_questions(&gateway, 2);
        let session = Session::new(quiz.id);

        assert!(matches!(
            session.advance(&gateway),
            Err(Error::InvalidState {
                expected: Status::InProgress,
                found: Status::Waiting,
            })
        ));
    }

    #[test]
    fn finish_skips_remaining_questions() {
        let gateway = MemoryGateway::new();
        let (quiz, questions) = quiz_with_questions(&gateway, 3);
        let session = Session::new(quiz.id);

        session.start(&gateway).unwrap();
        let scoreboard = session.finish(&gateway).unwrap();
        assert_eq!(scoreboard.question_count(), 3);

        let stored = session.fetch(&gateway).unwrap();
        assert_eq!(stored.status, Status::Finished);
        assert_eq!(stored.current_question, Some(questions[0].id));
    }

    #[test]
    fn finish_twice_fails() {
        let gateway = MemoryGateway::new();
        let (quiz, _) = quiz_with_questions(&gateway, 1);
        let session = Session::new(quiz.id);

        session.start(&gateway).unwrap();
        session.finish(&gateway).unwrap();
        assert!(matches!(
            session.finish(&gateway),
            Err(Error::InvalidState {
                expected: Status::InProgress,
                found: Status::Finished,
            })
        ));
    }

    #[test]
    fn finish_from_waiting_fails() {
        let gateway = MemoryGateway::new();
        let (quiz, _) = quiz_with_questions(&gateway, 1);
        let session = Session::new(quiz.id);

        assert!(matches!(
            session.finish(&gateway),
            Err(Error::InvalidState {
                expected: Status::InProgress,
                found: Status::Waiting,
            })
        ));
    }

    #[test]
    fn missing_quiz_is_not_found() {
        let gateway = MemoryGateway::new();
        let session = Session::new(crate::model::Id::from_raw(1_000));

        assert!(matches!(session.fetch(&gateway), Err(Error::NotFound)));
        assert!(matches!(session.start(&gateway), Err(Error::NotFound)));
    }
}
