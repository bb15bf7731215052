//! Per-episode trajectory buffering.
//!
//! An [`EpisodeBuffer`] accumulates one rollout segment step by step.
//! When the segment ends (terminal state or step cap) it is finished
//! exactly once with a bootstrap value, which attaches the reward-to-go
//! and advantage sequences and freezes the segment.

use crate::algorithms::gae::{gae_advantages, rewards_to_go};
use crate::algorithms::masking::ActionMask;
use crate::env::{ActionId, Observation};

/// Accumulates the per-step records of one trajectory segment.
#[derive(Debug, Clone, Default)]
pub struct EpisodeBuffer {
    observations: Vec<Observation>,
    actions: Vec<ActionId>,
    rewards: Vec<f32>,
    values: Vec<f32>,
    log_probs: Vec<f32>,
    masks: Vec<ActionMask>,
}

impl EpisodeBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` steps.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            log_probs: Vec::with_capacity(capacity),
            masks: Vec::with_capacity(capacity),
        }
    }

    /// Append one step.
    pub fn push(
        &mut self,
        observation: Observation,
        action: ActionId,
        reward: f32,
        value: f32,
        log_prob: f32,
        mask: ActionMask,
    ) {
        self.observations.push(observation);
        self.actions.push(action);
        self.rewards.push(reward);
        self.values.push(value);
        self.log_probs.push(log_prob);
        self.masks.push(mask);
    }

    /// Number of steps recorded so far.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Whether no steps were recorded yet.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Undiscounted sum of rewards in the segment.
    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }

    /// Finish the segment: compute reward-to-go and GAE advantages and
    /// freeze it.
    ///
    /// `bootstrap` is 0 for a genuine terminal state, or the critic's
    /// estimate of the next state when the segment was truncated by the
    /// step cap.
    ///
    /// # Panics
    /// Panics on an empty segment; that is a caller bug, not a
    /// recoverable condition.
    pub fn finish(self, bootstrap: f32, gamma: f32, gae_lambda: f32) -> CompletedSegment {
        assert!(!self.is_empty(), "cannot finish an empty trajectory segment");

        let rewards_to_go = rewards_to_go(&self.rewards, bootstrap, gamma);
        let advantages = gae_advantages(&self.rewards, &self.values, bootstrap, gamma, gae_lambda);

        CompletedSegment {
            observations: self.observations,
            actions: self.actions,
            log_probs: self.log_probs,
            masks: self.masks,
            rewards_to_go,
            advantages,
        }
    }
}

/// An immutable finished segment, ready for aggregation.
///
/// All sequences have identical length.
#[derive(Debug, Clone)]
pub struct CompletedSegment {
    pub observations: Vec<Observation>,
    pub actions: Vec<ActionId>,
    pub log_probs: Vec<f32>,
    pub masks: Vec<ActionMask>,
    pub rewards_to_go: Vec<f32>,
    pub advantages: Vec<f32>,
}

impl CompletedSegment {
    /// Number of steps in the segment.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the segment holds no steps (never true for segments
    /// produced by [`EpisodeBuffer::finish`]).
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
