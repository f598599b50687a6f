//! Per-destination delivery bookkeeping for audit output.

use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Attempted vs. succeeded files for one destination, in call order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationOutcome {
    pub label: String,
    pub attempted: Vec<PathBuf>,
    pub succeeded: Vec<PathBuf>,
}

impl DestinationOutcome {
    /// Files present in exactly one of the two sequences, attempted first
    pub fn shortfall(&self) -> Vec<PathBuf> {
        diff_of_lists(&self.attempted, &self.succeeded)
    }
}

/// Tracks transfer attempts per destination during one directory run
#[derive(Debug, Clone, Default)]
pub struct OutcomeReconciler {
    outcomes: Vec<DestinationOutcome>,
}

impl OutcomeReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, label: &str) -> &mut DestinationOutcome {
        let idx = match self.outcomes.iter().position(|o| o.label == label) {
            Some(idx) => idx,
            None => {
                self.outcomes.push(DestinationOutcome {
                    label: label.to_string(),
                    ..DestinationOutcome::default()
                });
                self.outcomes.len() - 1
            }
        };
        &mut self.outcomes[idx]
    }

    /// Registers a destination so it shows up even with no attempts
    pub fn track(&mut self, label: &str) {
        self.entry(label);
    }

    pub fn record_attempt(&mut self, label: &str, file: &Path) {
        self.entry(label).attempted.push(file.to_path_buf());
    }

    pub fn record_success(&mut self, label: &str, file: &Path) {
        self.entry(label).succeeded.push(file.to_path_buf());
    }

    pub fn outcome(&self, label: &str) -> Option<&DestinationOutcome> {
        self.outcomes.iter().find(|o| o.label == label)
    }

    pub fn outcomes(&self) -> &[DestinationOutcome] {
        &self.outcomes
    }

    /// Missing files for `label`; empty for an unknown destination
    pub fn shortfall(&self, label: &str) -> Vec<PathBuf> {
        self.outcome(label)
            .map(DestinationOutcome::shortfall)
            .unwrap_or_default()
    }

    pub fn succeeded_total(&self) -> usize {
        self.outcomes.iter().map(|o| o.succeeded.len()).sum()
    }

    /// Logs the forwarded count and, on shortfall, the missing files per destination
    pub fn log_summary(&self, candidates: usize, destinations: usize) {
        let expected = candidates * destinations;
        let forwarded = self.succeeded_total();
        info!(
            "{} out of {} (number of files: {}) forwarded to {} host(s)",
            forwarded, expected, candidates, destinations
        );
        if forwarded != expected {
            error!("Missing files in transmission");
            for outcome in &self.outcomes {
                let missing = outcome.shortfall();
                let missing: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
                error!(destination = %outcome.label, missing = ?missing, "Missing files for destination");
            }
        }
    }
}

/// Order-preserving symmetric difference, duplicates kept
///
/// Every element of `a` followed by `b` that is absent from the other list.
pub fn diff_of_lists<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter()
        .filter(|x| !b.contains(x))
        .chain(b.iter().filter(|x| !a.contains(x)))
        .cloned()
        .collect()
}
