//! Configuration constants for the quiz session system
//!
//! This module contains the limits and defaults used throughout the
//! library to bound user-provided content and to shape the retry
//! behavior of answer submission.

/// Quiz-level configuration constants
pub mod quiz {
    /// Maximum length of a quiz name in characters
    pub const MAX_NAME_LENGTH: usize = 200;
    /// Maximum number of questions allowed in a single quiz
    pub const MAX_QUESTION_COUNT: usize = 100;
    /// Maximum number of participants allowed in a single quiz
    pub const MAX_PARTICIPANT_COUNT: usize = 1000;
}

/// Question configuration constants
pub mod question {
    /// Maximum length of a question text in characters
    pub const MAX_TEXT_LENGTH: usize = 200;
    /// Minimum number of answer options for a question
    pub const MIN_OPTION_COUNT: usize = 2;
    /// Maximum number of answer options for a question
    pub const MAX_OPTION_COUNT: usize = 8;
    /// Maximum length of an answer option in characters
    pub const MAX_OPTION_LENGTH: usize = 200;
}

/// Participant configuration constants
pub mod participant {
    /// Maximum length of a participant name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
}

/// Answer submission retry configuration constants
pub mod retry {
    /// Number of insert attempts before a transient failure is surfaced
    pub const SUBMIT_ATTEMPTS: u32 = 3;
    /// Base delay in milliseconds between attempts (doubles per attempt)
    pub const BASE_DELAY_MS: u64 = 250;
}
