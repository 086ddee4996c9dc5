// src/aggregation.rs
//
// Majority vote over the labels of one video's valid frames.
//
// Ties go to the label that appeared first in the video. Counts are kept
// in first-appearance order, so the outcome never depends on hash order.

use crate::result::{round_score, AnalysisFailure};
use std::collections::HashMap;

/// Winning label of a vote
#[derive(Debug, Clone, PartialEq)]
pub struct VoteSummary {
    pub label: String,
    pub count: usize,
    pub total: usize,
    /// Percentage of valid frames agreeing with `label`, two decimals
    pub score: f64,
}

/// Running label counts for one video
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    /// (label, count) in order of first appearance
    counts: Vec<(String, usize)>,
    index: HashMap<String, usize>,
    total: usize,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: &str) {
        self.total += 1;
        match self.index.get(label) {
            Some(&slot) => self.counts[slot].1 += 1,
            None => {
                self.index.insert(label.to_string(), self.counts.len());
                self.counts.push((label.to_string(), 1));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn distinct_labels(&self) -> usize {
        self.counts.len()
    }

    pub fn summarize(&self) -> Option<VoteSummary> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.counts {
            match best {
                // strictly greater keeps the earliest label on ties
                Some((_, best_count)) if entry.1 <= *best_count => {}
                _ => best = Some(entry),
            }
        }

        best.map(|(label, count)| VoteSummary {
            label: label.clone(),
            count: *count,
            total: self.total,
            score: round_score(*count as f64 / self.total as f64 * 100.0),
        })
    }

    /// Summary, or the empty-video failure when no frame was valid
    pub fn decide(&self, frames_scanned: u64) -> Result<VoteSummary, AnalysisFailure> {
        self.summarize()
            .ok_or(AnalysisFailure::NoValidFramesInVideo { frames_scanned })
    }
}

/// Majority vote over an ordered label sequence
pub fn majority_vote<I, S>(labels: I) -> Option<VoteSummary>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tally = VoteTally::new();
    for label in labels {
        tally.push(label.as_ref());
    }
    tally.summarize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::passes;

    #[test]
    fn test_tie_goes_to_first_appearance() {
        let summary = majority_vote(["A", "B", "A", "B", "C"]).unwrap();
        assert_eq!(summary.label, "A");
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.score, 40.0);
        assert!(!passes(summary.score));
    }

    #[test]
    fn test_tie_order_follows_sequence_not_name() {
        let summary = majority_vote(["Z", "A", "A", "Z"]).unwrap();
        assert_eq!(summary.label, "Z");
    }

    #[test]
    fn test_three_of_five_passes() {
        let summary = majority_vote(["A", "B", "A", "C", "A"]).unwrap();
        assert_eq!(summary.label, "A");
        assert_eq!(summary.score, 60.0);
        assert!(passes(summary.score));
    }

    #[test]
    fn test_later_label_can_overtake() {
        let summary = majority_vote(["A", "B", "B", "C", "B"]).unwrap();
        assert_eq!(summary.label, "B");
        assert_eq!(summary.score, 60.0);
    }

    #[test]
    fn test_score_rounded_to_two_decimals() {
        let summary = majority_vote(["A", "A", "B"]).unwrap();
        assert_eq!(summary.score, 66.67);
    }

    #[test]
    fn test_empty_sequence_is_no_valid_frames() {
        assert!(majority_vote(Vec::<String>::new()).is_none());
        let tally = VoteTally::new();
        assert_eq!(
            tally.decide(42),
            Err(AnalysisFailure::NoValidFramesInVideo { frames_scanned: 42 })
        );
    }

    #[test]
    fn test_incremental_tally_matches_batch_vote() {
        let labels = ["Tadasana", "Vrikshasana", "Vrikshasana", "Tadasana", "Tadasana"];
        let mut tally = VoteTally::new();
        for l in labels {
            tally.push(l);
        }
        assert_eq!(tally.total(), 5);
        assert_eq!(tally.distinct_labels(), 2);
        assert_eq!(tally.summarize(), majority_vote(labels));
    }

    #[test]
    fn test_vote_is_reproducible() {
        let labels: Vec<String> = (0..200)
            .map(|i| format!("pose{}", i % 7))
            .collect();
        let first = majority_vote(&labels).unwrap();
        for _ in 0..10 {
            assert_eq!(majority_vote(&labels).unwrap(), first);
        }
        assert_eq!(first.label, "pose0");
    }
}
