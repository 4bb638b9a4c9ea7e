//! Final scoreboard computation
//!
//! When a quiz finishes, the raw rows are gathered into a [`Scoreboard`]
//! and ranked: one point per correctly answered question, ties broken by
//! join order. Scoring is a pure function of the stored rows, so
//! recomputing it for the same finished quiz always yields the same
//! ranking no matter who asks or when.

use std::cmp::Reverse;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    TruncatedVec,
    gateway::{Error, Gateway, Order, Selector},
    model::{AnswerRow, ParticipantId, ParticipantRow, QuestionRow, QuizId},
};

/// One participant's final ranking entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// The participant being ranked
    pub participant: ParticipantId,
    /// The participant's display name
    pub name: String,
    /// Number of correctly answered questions
    pub correct: usize,
    /// Number of answers the participant submitted
    pub total: usize,
}

/// A participant's own view of the final result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Number of correctly answered questions
    pub correct: usize,
    /// Number of answers submitted
    pub total: usize,
    /// Position on the scoreboard, starting at 1
    pub rank: usize,
}

/// The final scoreboard of a finished quiz
///
/// Holds the raw rows the ranking derives from; the ranking itself is
/// computed once on first access and cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scoreboard {
    /// The quiz's questions
    questions: Vec<QuestionRow>,
    /// Every participant who joined, answers or not
    participants: Vec<ParticipantRow>,
    /// Every stored answer to the quiz's questions
    answers: Vec<AnswerRow>,

    /// Cached ranking (not serialized)
    #[serde(skip)]
    standings: once_cell_serde::sync::OnceCell<Vec<Standing>>,
}

impl Scoreboard {
    /// Builds a scoreboard from already-loaded rows.
    pub fn from_rows(
        questions: Vec<QuestionRow>,
        participants: Vec<ParticipantRow>,
        answers: Vec<AnswerRow>,
    ) -> Self {
        Self {
            questions,
            participants,
            answers,
            standings: once_cell_serde::sync::OnceCell::new(),
        }
    }

    /// Gathers the rows of a quiz from the gateway and builds its scoreboard.
    pub fn collect<G: Gateway>(gateway: &G, quiz: QuizId) -> Result<Self, Error> {
        let questions: Vec<QuestionRow> =
            gateway.query(&Selector::of_quiz(quiz), Order::IdAscending, None)?;
        let participants: Vec<ParticipantRow> =
            gateway.query(&Selector::of_quiz(quiz), Order::IdAscending, None)?;

        let mut answers = Vec::new();
        for question in &questions {
            let mut of_question: Vec<AnswerRow> =
                gateway.query(&Selector::of_question(question.id), Order::IdAscending, None)?;
            answers.append(&mut of_question);
        }

        Ok(Self::from_rows(questions, participants, answers))
    }

    /// Counts correct and total answers per participant and sorts.
    fn compute_standings(&self) -> Vec<Standing> {
        // Earliest stored answer wins when a participant somehow has
        // several answers to one question.
        let counted: Vec<(ParticipantId, bool)> = self
            .answers
            .iter()
            .sorted_by_key(|answer| answer.id)
            .unique_by(|answer| (answer.participant_id, answer.question_id))
            .filter_map(|answer| {
                let question = self
                    .questions
                    .iter()
                    .find(|question| question.id == answer.question_id)?;
                Some((
                    answer.participant_id,
                    question.correct_answer == answer.selected_option,
                ))
            })
            .collect();

        self.participants
            .iter()
            .map(|participant| {
                let mine = counted.iter().filter(|(who, _)| *who == participant.id);
                let total = mine.clone().count();
                let correct = mine.filter(|(_, correct)| *correct).count();
                Standing {
                    participant: participant.id,
                    name: participant.name.clone(),
                    correct,
                    total,
                }
            })
            .sorted_by_key(|standing| (Reverse(standing.correct), standing.participant))
            .collect_vec()
    }

    /// Returns the ranking, best first
    ///
    /// Ties on correct answers are broken by join order, earliest first.
    /// Participants who never answered appear at the bottom with zero.
    pub fn standings(&self) -> &[Standing] {
        self.standings.get_or_init(|| self.compute_standings())
    }

    /// Returns one participant's result and rank, if they joined the quiz.
    pub fn report(&self, participant: ParticipantId) -> Option<ScoreReport> {
        self.standings()
            .iter()
            .position(|standing| standing.participant == participant)
            .map(|index| {
                let standing = &self.standings()[index];
                ScoreReport {
                    correct: standing.correct,
                    total: standing.total,
                    rank: index + 1,
                }
            })
    }

    /// Returns the top of the scoreboard as names and correct counts.
    pub fn podium(&self, limit: usize) -> TruncatedVec<(String, usize)> {
        let standings = self.standings();
        TruncatedVec::new(
            standings
                .iter()
                .map(|standing| (standing.name.clone(), standing.correct)),
            limit,
            standings.len(),
        )
    }

    /// Returns the number of questions the quiz had.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::Id;

    fn question(id: u64, correct: usize) -> QuestionRow {
        QuestionRow {
            id: Id::from_raw(id),
            quiz_id: Id::from_raw(1),
            question_text: format!("Question {id}"),
            correct_answer: correct,
        }
    }

    fn participant(id: u64, name: &str) -> ParticipantRow {
        ParticipantRow {
            id: Id::from_raw(id),
            quiz_id: Id::from_raw(1),
            name: name.to_owned(),
        }
    }

    fn answer(id: u64, participant: u64, question: u64, selected: usize) -> AnswerRow {
        AnswerRow {
            id: Id::from_raw(id),
            participant_id: Id::from_raw(participant),
            question_id: Id::from_raw(question),
            selected_option: selected,
        }
    }

    /// Two questions, Alice gets both right, Bob gets one.
    fn geography_board() -> Scoreboard {
        Scoreboard::from_rows(
            vec![question(2, 0), question(3, 1)],
            vec![participant(10, "Alice"), participant(11, "Bob")],
            vec![
                answer(20, 10, 2, 0),
                answer(21, 11, 2, 1),
                answer(22, 10, 3, 1),
                answer(23, 11, 3, 1),
            ],
        )
    }

    #[test]
    fn standings_count_correct_answers() {
        let board = geography_board();
        let standings = board.standings();

        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].name, "Alice");
        assert_eq!(standings[0].correct, 2);
        assert_eq!(standings[0].total, 2);
        assert_eq!(standings[1].name, "Bob");
        assert_eq!(standings[1].correct, 1);
        assert_eq!(standings[1].total, 2);
    }

    #[test]
    fn silent_participant_ranks_last_with_zero() {
        let board = Scoreboard::from_rows(
            vec![question(2, 0)],
            vec![participant(10, "Alice"), participant(11, "Mute")],
            vec![answer(20, 10, 2, 0)],
        );

        let standings = board.standings();
        assert_eq!(standings[1].name, "Mute");
        assert_eq!(standings[1].correct, 0);
        assert_eq!(standings[1].total, 0);
    }

    #[test]
    fn ties_break_by_join_order() {
        let board = Scoreboard::from_rows(
            vec![question(2, 0)],
            vec![participant(11, "Second"), participant(10, "First")],
            vec![answer(20, 10, 2, 0), answer(21, 11, 2, 0)],
        );

        let standings = board.standings();
        assert_eq!(standings[0].name, "First");
        assert_eq!(standings[1].name, "Second");
    }

    #[test]
    fn earliest_answer_wins_on_duplicates() {
        let board = Scoreboard::from_rows(
            vec![question(2, 0)],
            vec![participant(10, "Alice")],
            // A wrong answer stored first, then a correct one.
            vec![answer(20, 10, 2, 1), answer(21, 10, 2, 0)],
        );

        let standings = board.standings();
        assert_eq!(standings[0].correct, 0);
        assert_eq!(standings[0].total, 1);
    }

    #[test]
    fn answers_to_unknown_questions_are_ignored() {
        let board = Scoreboard::from_rows(
            vec![question(2, 0)],
            vec![participant(10, "Alice")],
            vec![answer(20, 10, 99, 0)],
        );

        let standings = board.standings();
        assert_eq!(standings[0].correct, 0);
        assert_eq!(standings[0].total, 0);
    }

    #[test]
    fn report_ranks_from_one() {
        let board = geography_board();

        assert_eq!(
            board.report(Id::from_raw(10)),
            Some(ScoreReport {
                correct: 2,
                total: 2,
                rank: 1
            })
        );
        assert_eq!(
            board.report(Id::from_raw(11)),
            Some(ScoreReport {
                correct: 1,
                total: 2,
                rank: 2
            })
        );
        assert_eq!(board.report(Id::from_raw(99)), None);
    }

    #[test]
    fn podium_truncates_but_keeps_count() {
        let board = Scoreboard::from_rows(
            vec![question(2, 0)],
            vec![
                participant(10, "A"),
                participant(11, "B"),
                participant(12, "C"),
            ],
            vec![answer(20, 10, 2, 0)],
        );

        let podium = board.podium(2);
        assert_eq!(podium.exact_count(), 3);
        assert_eq!(podium.items().len(), 2);
        assert_eq!(podium.items()[0], ("A".to_owned(), 1));
    }

    #[test]
    fn standings_are_deterministic() {
        let first = geography_board();
        let second = geography_board();

        assert_eq!(first.standings(), second.standings());
    }
}
