// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tallies for simulated submission runs.

use std::collections::HashMap;
use storefront_guard::SubmissionOutcome;

/// Outcome class of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Accepted,
    Discarded,
    Rejected,
    Invalid,
    RateLimited,
}

impl From<&SubmissionOutcome> for Outcome {
    fn from(outcome: &SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::Accepted { .. } => Outcome::Accepted,
            SubmissionOutcome::Discarded => Outcome::Discarded,
            SubmissionOutcome::Rejected { .. } => Outcome::Rejected,
            SubmissionOutcome::Invalid { .. } => Outcome::Invalid,
            SubmissionOutcome::RateLimited { .. } => Outcome::RateLimited,
        }
    }
}

/// Counts submissions by outcome.
#[derive(Debug, Default)]
pub struct SubmissionMetrics {
    outcomes: HashMap<Outcome, usize>,
    total: usize,
}

impl SubmissionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &SubmissionOutcome) {
        *self.outcomes.entry(outcome.into()).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Fraction of submissions that were not accepted.
    pub fn block_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            1.0 - self.count(Outcome::Accepted) as f64 / self.total as f64
        }
    }

    pub fn report(&self) -> String {
        let mut lines = vec![format!("Total submissions: {}", self.total)];
        for outcome in [
            Outcome::Accepted,
            Outcome::Discarded,
            Outcome::Rejected,
            Outcome::Invalid,
            Outcome::RateLimited,
        ] {
            lines.push(format!("  {:?}: {}", outcome, self.count(outcome)));
        }
        lines.push(format!("  Block rate: {:.1}%", self.block_rate() * 100.0));
        lines.join("\n")
    }
}
