//! State node coverage.
//!
//! Every time a node's assertion runs its counter goes up by one. Counters
//! are never reset; build a fresh model to start over.

use crate::config::CoverageOptions;
use crate::machine::StateNode;
use crate::result::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Accumulated assertion counts per state node id.
#[derive(Debug, Default)]
pub struct CoverageTracker {
    counts: Mutex<BTreeMap<String, usize>>,
}

impl CoverageTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one assertion run for `id`.
    pub fn record(&self, id: &str) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        *counts.entry(id.to_string()).or_insert(0) += 1;
    }

    /// Current count for `id`.
    #[must_use]
    pub fn count(&self, id: &str) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Copy of every recorded counter.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, usize> {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Zero-initialize the declared (optionally filtered) nodes, then overlay
    /// every recorded counter.
    #[must_use]
    pub fn report(&self, nodes: &[StateNode], options: &CoverageOptions) -> Coverage {
        let mut state_nodes: BTreeMap<String, usize> = nodes
            .iter()
            .filter(|node| options.filter.as_ref().map_or(true, |filter| filter(node)))
            .map(|node| (node.id.clone(), 0))
            .collect();
        state_nodes.extend(self.snapshot());
        Coverage { state_nodes }
    }

    /// Fail when any reported node has never been asserted.
    ///
    /// # Errors
    /// Returns [`ModelError::CoverageIncomplete`] listing every uncovered id.
    pub fn check(&self, nodes: &[StateNode], options: &CoverageOptions) -> ModelResult<()> {
        let missing = self.report(nodes, options).missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ModelError::CoverageIncomplete { missing })
        }
    }
}

/// Coverage report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    /// Node id -> number of assertion runs
    pub state_nodes: BTreeMap<String, usize>,
}

impl Coverage {
    /// Ids with a zero count.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        self.state_nodes
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Whether every reported node was asserted at least once.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state_nodes.values().all(|count| *count > 0)
    }

    /// Fraction of reported nodes asserted at least once (1.0 when empty).
    #[must_use]
    pub fn covered_fraction(&self) -> f64 {
        if self.state_nodes.is_empty() {
            return 1.0;
        }
        let covered = self.state_nodes.values().filter(|count| **count > 0).count();
        covered as f64 / self.state_nodes.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::NodeKind;

    fn nodes() -> Vec<StateNode> {
        vec![
            StateNode::new("light.green", NodeKind::Atomic),
            StateNode::new("light.yellow", NodeKind::Atomic),
            StateNode::new("light.red", NodeKind::Final),
        ]
    }

    #[test]
    fn test_report_zero_initializes() {
        let tracker = CoverageTracker::new();
        let coverage = tracker.report(&nodes(), &CoverageOptions::default());
        assert_eq!(coverage.state_nodes.len(), 3);
        assert!(coverage.state_nodes.values().all(|c| *c == 0));
        assert_eq!(coverage.covered_fraction(), 0.0);
    }

    #[test]
    fn test_record_is_monotonic() {
        let tracker = CoverageTracker::new();
        tracker.record("light.green");
        tracker.record("light.green");
        assert_eq!(tracker.count("light.green"), 2);
        assert_eq!(tracker.count("light.red"), 0);
    }

    #[test]
    fn test_filter_limits_report() {
        let tracker = CoverageTracker::new();
        let options = CoverageOptions::with_filter(|node| node.kind == NodeKind::Final);
        let coverage = tracker.report(&nodes(), &options);
        assert_eq!(coverage.missing(), vec!["light.red".to_string()]);
    }

    #[test]
    fn test_recorded_counts_overlay_filtered_report() {
        let tracker = CoverageTracker::new();
        tracker.record("light.green");
        let options = CoverageOptions::with_filter(|node| node.kind == NodeKind::Final);
        let coverage = tracker.report(&nodes(), &options);
        assert_eq!(coverage.state_nodes.get("light.green"), Some(&1));
        assert_eq!(coverage.state_nodes.get("light.red"), Some(&0));
    }

    #[test]
    fn test_check_lists_every_missing_node() {
        let tracker = CoverageTracker::new();
        tracker.record("light.yellow");
        let err = tracker
            .check(&nodes(), &CoverageOptions::default())
            .expect_err("incomplete");
        match err {
            ModelError::CoverageIncomplete { missing } => {
                assert_eq!(missing, vec!["light.green", "light.red"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_passes_when_complete() {
        let tracker = CoverageTracker::new();
        for node in nodes() {
            tracker.record(&node.id);
        }
        assert!(tracker.check(&nodes(), &CoverageOptions::default()).is_ok());
        let coverage = tracker.report(&nodes(), &CoverageOptions::default());
        assert!(coverage.is_complete());
        assert_eq!(coverage.covered_fraction(), 1.0);
    }
}
