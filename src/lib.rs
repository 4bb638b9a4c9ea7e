//! # Quizline Session Library
//!
//! This library provides the synchronization and scoring core for a
//! multiplayer quiz: an organizer creates a quiz with multiple-choice
//! questions, participants join through a shared code, the organizer
//! advances questions in lock-step, and a ranking is computed when the
//! quiz finishes. All shared state lives behind the [`gateway::Gateway`]
//! abstraction over relational storage with row-change notifications.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
use derive_where::derive_where;
use itertools::Itertools;

pub mod constants;

pub mod collector;
pub mod gateway;
pub mod model;
pub mod replica;
pub mod roster;
pub mod scoring;
pub mod session;
pub mod setup;

/// A truncated list that remembers the exact count of the full list
///
/// Used where a capped number of entries is displayed alongside the real
/// total, such as the waiting-room name list ("312 joined") or the top of
/// the final scoreboard.
#[derive(Debug, Clone, serde::Serialize)]
#[derive_where(Default)]
pub struct TruncatedVec<T> {
    /// The exact total count of entries before truncation
    exact_count: usize,
    /// The retained entries (up to the limit)
    items: Vec<T>,
}

impl<T: Clone> TruncatedVec<T> {
    /// Retains up to `limit` entries from `list` while recording `exact_count`.
    pub fn new<I: Iterator<Item = T>>(list: I, limit: usize, exact_count: usize) -> Self {
        let items = list.take(limit).collect_vec();
        Self { exact_count, items }
    }

    /// Maps a function over the retained entries, preserving the exact count.
    pub fn map<F, U>(self, f: F) -> TruncatedVec<U>
    where
        F: Fn(T) -> U,
    {
        TruncatedVec {
            exact_count: self.exact_count,
            items: self.items.into_iter().map(f).collect_vec(),
        }
    }

    /// Returns the exact count of the untruncated list.
    pub fn exact_count(&self) -> usize {
        self.exact_count
    }

    /// Returns the retained entries.
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn truncated_vec_caps_items_but_keeps_count() {
        let names = vec!["Ada", "Grace", "Edsger", "Barbara", "Tony"];
        let truncated = TruncatedVec::new(names.into_iter(), 3, 5);

        assert_eq!(truncated.exact_count(), 5);
        assert_eq!(truncated.items(), &["Ada", "Grace", "Edsger"]);
    }

    #[test]
    fn truncated_vec_limit_larger_than_items() {
        let truncated = TruncatedVec::new(vec![1, 2].into_iter(), 10, 2);

        assert_eq!(truncated.exact_count(), 2);
        assert_eq!(truncated.items(), &[1, 2]);
    }

    #[test]
    fn truncated_vec_map_preserves_count() {
        let truncated = TruncatedVec::new(vec![1, 2, 3].into_iter(), 2, 3);
        let mapped = truncated.map(|score| format!("{score} pts"));

        assert_eq!(mapped.exact_count(), 3);
        assert_eq!(mapped.items(), &["1 pts", "2 pts"]);
    }
}
