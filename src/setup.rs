//! Quiz authoring
//!
//! An organizer describes a quiz as a [`QuizDefinition`] and creation
//! persists it through the gateway: one quiz row in the waiting state,
//! then its questions and their options in definition order. Insertion
//! order matters; question identifiers double as presentation order.

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants,
    gateway::Gateway,
    model::{JoinCode, NewOption, NewQuestion, NewQuiz, OptionRow, QuestionRow, QuizRow, Status},
};

/// A quiz as described by its organizer, before it is stored
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuizDefinition {
    /// Display name of the quiz
    #[garde(length(min = 1, max = constants::quiz::MAX_NAME_LENGTH))]
    pub name: String,
    /// Questions in presentation order
    #[garde(length(min = 1, max = constants::quiz::MAX_QUESTION_COUNT), dive)]
    pub questions: Vec<QuestionDefinition>,
}

/// A single question within a [`QuizDefinition`]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionDefinition {
    /// The question text shown to participants
    #[garde(length(min = 1, max = constants::question::MAX_TEXT_LENGTH))]
    pub text: String,
    /// Answer options in presentation order
    #[garde(
        length(
            min = constants::question::MIN_OPTION_COUNT,
            max = constants::question::MAX_OPTION_COUNT
        ),
        inner(length(min = 1, max = constants::question::MAX_OPTION_LENGTH))
    )]
    pub options: Vec<String>,
    /// Index of the correct option
    #[garde(skip)]
    pub correct: usize,
}

/// Errors that can occur when creating a quiz
#[derive(Error, Debug)]
pub enum Error {
    /// The definition failed validation
    #[error("invalid quiz definition: {0}")]
    Invalid(#[from] garde::Report),
    /// A question's correct index does not name one of its options
    #[error("question {question} marks a nonexistent option as correct")]
    CorrectAnswerOutOfRange {
        /// Zero-based index of the offending question in the definition
        question: usize,
    },
    /// The gateway failed
    #[error("storage error: {0}")]
    Gateway(#[from] crate::gateway::Error),
}

/// Persists a quiz definition and returns the stored quiz
///
/// The quiz starts in the waiting state with a freshly generated join
/// code and no active question. Questions and options are inserted in
/// definition order, so their identifiers reflect it.
pub fn create<G: Gateway>(gateway: &G, definition: &QuizDefinition) -> Result<QuizRow, Error> {
    definition.validate()?;
    for (index, question) in definition.questions.iter().enumerate() {
        if question.correct >= question.options.len() {
            return Err(Error::CorrectAnswerOutOfRange { question: index });
        }
    }

    let quiz: QuizRow = gateway.insert(NewQuiz {
        name: definition.name.clone(),
        join_code: JoinCode::new(),
        status: Status::Waiting,
    })?;

    for question in &definition.questions {
        let stored: QuestionRow = gateway.insert(NewQuestion {
            quiz_id: quiz.id,
            question_text: question.text.clone(),
            correct_answer: question.correct,
        })?;
        for option in &question.options {
            let _: OptionRow = gateway.insert(NewOption {
                question_id: stored.id,
                option_text: option.clone(),
            })?;
        }
    }

    Ok(quiz)
}
