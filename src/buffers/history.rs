//! Rollout aggregation: many finished segments become one flat,
//! shuffleable training set.
//!
//! Key characteristics:
//! - Segment order is preserved in the concatenation; segment boundaries
//!   are discarded.
//! - Advantages are normalized once, globally, over the whole rollout,
//!   never per segment.
//! - Finalizing drains the history, so no data can leak into the next
//!   rollout phase.

use rand::seq::SliceRandom;

use crate::algorithms::gae::normalize_advantages;
use crate::env::{ActionId, ACTION_SPACE, OBS_LEN};

use super::episode::CompletedSegment;

/// Collects finished segments for one rollout phase.
#[derive(Debug, Clone, Default)]
pub struct RolloutHistory {
    segments: Vec<CompletedSegment>,
}

impl RolloutHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one finished segment.
    pub fn add_segment(&mut self, segment: CompletedSegment) {
        self.segments.push(segment);
    }

    /// Number of segments collected so far.
    pub fn n_segments(&self) -> usize {
        self.segments.len()
    }

    /// Total number of steps across all collected segments.
    pub fn n_steps(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    /// Drop all collected segments.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Concatenate all segments into a flat dataset, normalize the
    /// advantages globally, and drain the history.
    pub fn finalize(&mut self) -> RolloutDataset {
        let segments = std::mem::take(&mut self.segments);
        let total: usize = segments.iter().map(|s| s.len()).sum();

        let mut observations = Vec::with_capacity(total * OBS_LEN);
        let mut actions = Vec::with_capacity(total);
        let mut advantages = Vec::with_capacity(total);
        let mut log_probs = Vec::with_capacity(total);
        let mut rewards_to_go = Vec::with_capacity(total);
        let mut legal = Vec::with_capacity(total * ACTION_SPACE);

        for segment in segments {
            for obs in segment.observations {
                observations.extend_from_slice(obs.as_slice());
            }
            actions.extend_from_slice(&segment.actions);
            advantages.extend_from_slice(&segment.advantages);
            log_probs.extend_from_slice(&segment.log_probs);
            rewards_to_go.extend_from_slice(&segment.rewards_to_go);
            for mask in segment.masks {
                legal.extend_from_slice(mask.as_slice());
            }
        }

        normalize_advantages(&mut advantages);

        RolloutDataset {
            observations,
            actions,
            advantages,
            log_probs,
            rewards_to_go,
            legal,
            len: total,
        }
    }
}

/// Flat aggregated training set for one rollout phase.
///
/// Element `i` is the tuple (observation, action, advantage, old
/// log-probability, reward-to-go, mask) at flat index `i`.
#[derive(Debug, Clone)]
pub struct RolloutDataset {
    observations: Vec<f32>,
    actions: Vec<ActionId>,
    advantages: Vec<f32>,
    log_probs: Vec<f32>,
    rewards_to_go: Vec<f32>,
    legal: Vec<bool>,
    len: usize,
}

impl RolloutDataset {
    /// Number of steps in the dataset.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the dataset holds no steps.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Globally normalized advantages.
    pub fn advantages(&self) -> &[f32] {
        &self.advantages
    }

    /// Reward-to-go targets.
    pub fn rewards_to_go(&self) -> &[f32] {
        &self.rewards_to_go
    }

    /// Number of full minibatches per epoch; a partial final batch is
    /// dropped.
    pub fn n_batches(&self, batch_size: usize) -> usize {
        self.len / batch_size
    }

    /// A fresh random permutation of the flat indices.
    pub fn shuffled_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.len).collect();
        indices.shuffle(&mut rand::thread_rng());
        indices
    }

    /// Gather the rows at `indices` into tensor-ready flat buffers.
    ///
    /// Legality is inverted into illegal flags so the training path can
    /// mask logits directly.
    pub fn gather(&self, indices: &[usize]) -> Minibatch {
        let len = indices.len();

        let mut observations = Vec::with_capacity(len * OBS_LEN);
        let mut actions = Vec::with_capacity(len);
        let mut advantages = Vec::with_capacity(len);
        let mut old_log_probs = Vec::with_capacity(len);
        let mut rewards_to_go = Vec::with_capacity(len);
        let mut illegal = Vec::with_capacity(len * ACTION_SPACE);

        for &i in indices {
            observations.extend_from_slice(&self.observations[i * OBS_LEN..(i + 1) * OBS_LEN]);
            actions.push(self.actions[i]);
            advantages.push(self.advantages[i]);
            old_log_probs.push(self.log_probs[i]);
            rewards_to_go.push(self.rewards_to_go[i]);
            illegal.extend(
                self.legal[i * ACTION_SPACE..(i + 1) * ACTION_SPACE]
                    .iter()
                    .map(|&l| !l),
            );
        }

        Minibatch {
            observations,
            actions,
            advantages,
            old_log_probs,
            rewards_to_go,
            illegal,
            len,
        }
    }
}

/// One gathered minibatch, flat buffers ready for tensor construction.
#[derive(Debug, Clone)]
pub struct Minibatch {
    /// Flat observations: `len * OBS_LEN`.
    pub observations: Vec<f32>,
    /// Action ids taken at collection time.
    pub actions: Vec<ActionId>,
    /// Globally normalized advantages.
    pub advantages: Vec<f32>,
    /// Log probabilities stored at collection time.
    pub old_log_probs: Vec<f32>,
    /// Discounted reward-to-go targets.
    pub rewards_to_go: Vec<f32>,
    /// Flat illegal-action flags: `len * ACTION_SPACE`, true = illegal.
    pub illegal: Vec<bool>,
    /// Number of rows.
    pub len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::masking::ActionMask;
    use crate::buffers::episode::EpisodeBuffer;
    use crate::env::Observation;

    fn segment_with_rewards(rewards: &[f32]) -> CompletedSegment {
        let mut buffer = EpisodeBuffer::new();
        for (i, &r) in rewards.iter().enumerate() {
            buffer.push(
                Observation::zeros(),
                i as u32,
                r,
                0.0,
                -0.7,
                ActionMask::from_legal(&[i as u32]),
            );
        }
        buffer.finish(0.0, 0.99, 0.95)
    }

    #[test]
    fn test_finalize_concatenates_in_order() {
        let mut history = RolloutHistory::new();
        history.add_segment(segment_with_rewards(&[1.0, 1.0]));
        history.add_segment(segment_with_rewards(&[5.0]));
        assert_eq!(history.n_segments(), 2);
        assert_eq!(history.n_steps(), 3);

        let dataset = history.finalize();
        assert_eq!(dataset.len(), 3);

        // Per-segment action sequences survive in order.
        let batch = dataset.gather(&[0, 1, 2]);
        assert_eq!(batch.actions, vec![0, 1, 0]);
    }

    #[test]
    fn test_finalize_drains_history() {
        let mut history = RolloutHistory::new();
        history.add_segment(segment_with_rewards(&[1.0]));
        let first = history.finalize();
        assert_eq!(first.len(), 1);

        // Nothing left over for the next phase.
        assert_eq!(history.n_segments(), 0);
        let second = history.finalize();
        assert!(second.is_empty());
    }

    #[test]
    fn test_normalization_is_global_not_per_segment() {
        // Two segments with very different reward scales; per-segment
        // normalization would zero each one's mean separately.
        let mut history = RolloutHistory::new();
        history.add_segment(segment_with_rewards(&[10.0, 10.0]));
        history.add_segment(segment_with_rewards(&[-10.0, -10.0]));

        let dataset = history.finalize();
        let advantages = dataset.advantages();

        let mean: f32 = advantages.iter().sum::<f32>() / advantages.len() as f32;
        assert!(mean.abs() < 1e-4);

        let variance: f32 =
            advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / advantages.len() as f32;
        assert!((variance.sqrt() - 1.0).abs() < 1e-2);

        // The first segment's entries stay above the mean, the second's
        // below: global statistics, segment structure intact.
        assert!(advantages[0] > 0.0 && advantages[1] > 0.0);
        assert!(advantages[2] < 0.0 && advantages[3] < 0.0);
    }

    #[test]
    fn test_n_batches_drops_remainder() {
        let mut history = RolloutHistory::new();
        history.add_segment(segment_with_rewards(&[1.0; 10]));
        let dataset = history.finalize();

        assert_eq!(dataset.n_batches(4), 2);
        assert_eq!(dataset.n_batches(5), 2);
        assert_eq!(dataset.n_batches(16), 0);
    }

    #[test]
    fn test_shuffled_indices_is_permutation() {
        let mut history = RolloutHistory::new();
        history.add_segment(segment_with_rewards(&[1.0; 8]));
        let dataset = history.finalize();

        let mut indices = dataset.shuffled_indices();
        indices.sort_unstable();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_gather_inverts_mask() {
        let mut history = RolloutHistory::new();
        history.add_segment(segment_with_rewards(&[1.0]));
        let dataset = history.finalize();

        let batch = dataset.gather(&[0]);
        assert_eq!(batch.len, 1);
        assert_eq!(batch.illegal.len(), ACTION_SPACE);
        // Action 0 was the only legal one in this segment.
        assert!(!batch.illegal[0]);
        assert!(batch.illegal[1]);
    }
}
