//! Temporal stability filtering
//!
//! Majority vote over the last three detection results, so a single noisy
//! frame neither shows nor hides the card outline.

use super::DetectionSample;
use crate::types::Boundary;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const HISTORY_CAPACITY: usize = 3;

/// Positive samples needed within the window, counting the current one.
const REQUIRED_POSITIVES: usize = 2;

/// Externally visible detection state, recomputed every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableDetectionState {
    pub is_stable: bool,
    /// Only set while stable
    pub boundary: Option<Boundary>,
    pub focus_quality: u8,
    /// Consecutive stable frames; 0 as soon as stability is lost
    pub stable_streak: u32,
}

/// Fixed-capacity queue of recent `found` flags, oldest evicted first.
#[derive(Debug, Clone, Default)]
pub struct DetectionHistory {
    samples: VecDeque<bool>,
}

impl DetectionHistory {
    pub fn push(&mut self, found: bool) {
        if self.samples.len() == HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(found);
    }

    pub fn positives(&self) -> usize {
        self.samples.iter().filter(|found| **found).count()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &bool> {
        self.samples.iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StabilityFilter {
    history: DetectionHistory,
    state: StableDetectionState,
}

impl StabilityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, sample: &DetectionSample) -> StableDetectionState {
        self.history.push(sample.found);

        let is_stable = sample.found && self.history.positives() >= REQUIRED_POSITIVES;
        self.state = if is_stable {
            StableDetectionState {
                is_stable: true,
                boundary: sample.boundary,
                focus_quality: sample.quality,
                stable_streak: self.state.stable_streak.saturating_add(1),
            }
        } else {
            StableDetectionState {
                is_stable: false,
                boundary: None,
                focus_quality: if sample.found { sample.quality } else { 0 },
                stable_streak: 0,
            }
        };

        self.state
    }

    pub fn state(&self) -> StableDetectionState {
        self.state
    }

    pub fn history(&self) -> &DetectionHistory {
        &self.history
    }

    /// Clear history, streak, boundary and focus score.
    pub fn reset(&mut self) {
        self.history.clear();
        self.state = StableDetectionState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(found: bool) -> DetectionSample {
        if found {
            DetectionSample::found(Boundary::new(10, 10, 160, 100), 72)
        } else {
            DetectionSample::not_found()
        }
    }

    fn run(sequence: &[bool]) -> StableDetectionState {
        let mut filter = StabilityFilter::new();
        let mut state = StableDetectionState::default();
        for found in sequence {
            state = filter.update(&sample(*found));
        }
        state
    }

    #[test]
    fn test_majority_sequences_are_stable() {
        assert!(run(&[true, true, true]).is_stable);
        assert!(run(&[false, true, true]).is_stable);
        assert!(run(&[true, false, true]).is_stable);
    }

    #[test]
    fn test_single_hit_is_not_stable() {
        let state = run(&[false, false, true]);
        assert!(!state.is_stable);
        assert_eq!(state.boundary, None);
        assert_eq!(state.stable_streak, 0);
    }

    #[test]
    fn test_current_miss_is_never_stable() {
        let state = run(&[true, true, false]);
        assert!(!state.is_stable);
        assert_eq!(state.boundary, None);
        assert_eq!(state.focus_quality, 0);
    }

    #[test]
    fn test_streak_counts_and_resets() {
        let mut filter = StabilityFilter::new();
        filter.update(&sample(true));
        assert_eq!(filter.update(&sample(true)).stable_streak, 1);
        assert_eq!(filter.update(&sample(true)).stable_streak, 2);
        assert_eq!(filter.update(&sample(true)).stable_streak, 3);
        assert_eq!(filter.update(&sample(false)).stable_streak, 0);
        assert_eq!(filter.update(&sample(true)).stable_streak, 1);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = DetectionHistory::default();
        for found in [true, true, false, false] {
            history.push(found);
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.positives(), 1);
        assert_eq!(
            history.iter().copied().collect::<Vec<_>>(),
            vec![true, false, false]
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut filter = StabilityFilter::new();
        filter.update(&sample(true));
        filter.update(&sample(true));
        assert!(filter.state().is_stable);

        filter.reset();
        assert_eq!(filter.state(), StableDetectionState::default());
        assert!(filter.history().is_empty());

        // A lone hit after reset is not enough
        assert!(!filter.update(&sample(true)).is_stable);
    }

    #[test]
    fn test_unstable_hit_keeps_focus_but_hides_boundary() {
        let state = run(&[false, false, true]);
        assert_eq!(state.focus_quality, 72);
        assert_eq!(state.boundary, None);
    }
}
