//! Participant joining
//!
//! Participants join a quiz under a self-chosen name. Names are trimmed,
//! length-capped, content-filtered, and unique within a quiz. Joining is
//! allowed in any quiz state; late joiners simply miss earlier questions
//! and the scoreboard ranks them by whatever they did answer.

use rustrict::CensorStr;
use thiserror::Error;

use crate::{
    constants,
    gateway::{Gateway, Order, Selector},
    model::{JoinCode, NewParticipant, ParticipantRow, QuizId, QuizRow},
};

/// Errors that can occur when joining a quiz
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    EmptyName,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    NameTooLong,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    InappropriateName,
    /// The name is already in use by another participant of this quiz
    #[error("name already in-use")]
    NameTaken,
    /// No quiz exists with the given identifier or join code
    #[error("quiz not found")]
    QuizNotFound,
    /// The quiz has reached the participant limit
    #[error("quiz is full")]
    Full,
    /// The gateway failed
    #[error("storage error: {0}")]
    Gateway(#[from] crate::gateway::Error),
}

/// Validates a requested name and returns its cleaned form.
fn clean_name(name: &str) -> Result<&str, Error> {
    if name.len() > constants::participant::MAX_NAME_LENGTH {
        return Err(Error::NameTooLong);
    }
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::EmptyName);
    }
    if name.is_inappropriate() {
        return Err(Error::InappropriateName);
    }
    Ok(name)
}

/// Joins a quiz under the given name
///
/// The name is trimmed of surrounding whitespace before storage. Fails
/// if the name is invalid, already taken within this quiz, or the quiz
/// is at capacity.
pub fn join<G: Gateway>(gateway: &G, quiz: QuizId, name: &str) -> Result<ParticipantRow, Error> {
    let name = clean_name(name)?;

    let _: QuizRow = gateway.fetch(quiz).map_err(|error| match error {
        crate::gateway::Error::NotFound => Error::QuizNotFound,
        other => Error::Gateway(other),
    })?;

    let roster: Vec<ParticipantRow> =
        gateway.query(&Selector::of_quiz(quiz), Order::IdAscending, None)?;
    if roster.len() >= constants::quiz::MAX_PARTICIPANT_COUNT {
        return Err(Error::Full);
    }
    if roster.iter().any(|participant| participant.name == name) {
        return Err(Error::NameTaken);
    }

    Ok(gateway.insert(NewParticipant {
        quiz_id: quiz,
        name: name.to_owned(),
    })?)
}

/// Joins a quiz identified by its join code
///
/// Resolves the code to a quiz and delegates to [`join`].
pub fn join_by_code<G: Gateway>(
    gateway: &G,
    code: JoinCode,
    name: &str,
) -> Result<ParticipantRow, Error> {
    let quiz: QuizRow = gateway
        .query_one(&Selector::with_join_code(code), Order::IdAscending)?
        .ok_or(Error::QuizNotFound)?;
    join(gateway, quiz.id, name)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use crate::model::{NewQuiz, Status};

    fn quiz_on(gateway: &MemoryGateway) -> QuizRow {
        gateway
            .insert(NewQuiz {
                name: "Geo".to_owned(),
                join_code: JoinCode::new(),
                status: Status::Waiting,
            })
            .unwrap()
    }

    #[test]
    fn join_stores_trimmed_name() {
        let gateway = MemoryGateway::new();
        let quiz = quiz_on(&gateway);

        let participant = join(&gateway, quiz.id, "  Ada  ").unwrap();

        assert_eq!(participant.name, "Ada");
        assert_eq!(participant.quiz_id, quiz.id);
    }

    #[test]
    fn join_rejects_empty_and_whitespace_names() {
        let gateway = MemoryGateway::new();
        let quiz = quiz_on(&gateway);

        assert_eq!(join(&gateway, quiz.id, ""), Err(Error::EmptyName));
        assert_eq!(join(&gateway, quiz.id, "   "), Err(Error::EmptyName));
        assert_eq!(join(&gateway, quiz.id, "\t\n"), Err(Error::EmptyName));
    }

    #[test]
    fn join_rejects_too_long_name() {
        let gateway = MemoryGateway::new();
        let quiz = quiz_on(&gateway);

        let long = "a".repeat(constants::participant::MAX_NAME_LENGTH + 1);
        assert_eq!(join(&gateway, quiz.id, &long), Err(Error::NameTooLong));

        let max = "a".repeat(constants::participant::MAX_NAME_LENGTH);
        assert!(join(&gateway, quiz.id, &max).is_ok());
    }

    #[test]
    fn join_rejects_inappropriate_name() {
        let gateway = MemoryGateway::new();
        let quiz = quiz_on(&gateway);

        assert_eq!(
            join(&gateway, quiz.id, "fuck"),
            Err(Error::InappropriateName)
        );
    }

    #[test]
    fn join_rejects_duplicate_name_within_quiz() {
        let gateway = MemoryGateway::new();
        let quiz = quiz_on(&gateway);

        join(&gateway, quiz.id, "Ada").unwrap();
        assert_eq!(join(&gateway, quiz.id, "Ada"), Err(Error::NameTaken));
        assert_eq!(join(&gateway, quiz.id, "  Ada  "), Err(Error::NameTaken));
    }

    #[test]
    fn same_name_allowed_across_quizzes() {
        let gateway = MemoryGateway::new();
        let first = quiz_on(&gateway);
        let second = quiz_on(&gateway);

        join(&gateway, first.id, "Ada").unwrap();
        assert!(join(&gateway, second.id, "Ada").is_ok());
    }

    #[test]
    fn join_missing_quiz_fails() {
        let gateway = MemoryGateway::new();
        let _ = quiz_on(&gateway);
        // An identifier no row was assigned.
        let missing = crate::model::Id::from_raw(1_000);

        assert_eq!(join(&gateway, missing, "Ada"), Err(Error::QuizNotFound));
    }

    #[test]
    fn join_by_code_resolves_quiz() {
        let gateway = MemoryGateway::new();
        let quiz = quiz_on(&gateway);

        let participant = join_by_code(&gateway, quiz.join_code, "Ada").unwrap();
        assert_eq!(participant.quiz_id, quiz.id);
    }

    #[test]
    fn join_by_unknown_code_fails() {
        let gateway = MemoryGateway::new();
        let quiz = quiz_on(&gateway);

        let unknown = "77777".parse::<JoinCode>().unwrap();
        let result = if unknown == quiz.join_code {
            join_by_code(&gateway, "10000".parse().unwrap(), "Ada")
        } else {
            join_by_code(&gateway, unknown, "Ada")
        };
        assert_eq!(result, Err(Error::QuizNotFound));
    }

    #[test]
    fn join_allowed_while_in_progress() {
        let gateway = MemoryGateway::new();
        let quiz = gateway
            .insert::<QuizRow>(NewQuiz {
                name: "Geo".to_owned(),
                join_code: JoinCode::new(),
                status: Status::InProgress,
            })
            .unwrap();

        assert!(join(&gateway, quiz.id, "Latecomer").is_ok());
    }
}
