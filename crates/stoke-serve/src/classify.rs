//! Per-cycle result classification.

use crate::stats::{BuildFailure, BuildStats};

/// Outcome of one build cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(BuildFailure),
}

/// Classification of one completion notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    /// True for the first notification this classifier ever sees
    pub is_first_build: bool,
}

/// Stateful classifier owned by one orchestrator.
///
/// The first-build flag is governed by notification count only: the first
/// cycle is "first" whether it failed or succeeded.
#[derive(Debug)]
pub struct Classifier {
    first_build: bool,
}

impl Classifier {
    pub fn new() -> Self {
        Self { first_build: true }
    }

    pub fn classify(&mut self, stats: &BuildStats) -> Classification {
        let outcome = match BuildFailure::from_stats(stats) {
            Some(failure) => Outcome::Failure(failure),
            None => Outcome::Success,
        };
        let is_first_build = std::mem::replace(&mut self.first_build, false);

        Classification {
            outcome,
            is_first_build,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
