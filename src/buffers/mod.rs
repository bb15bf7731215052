//! Trajectory buffering and rollout aggregation.

pub mod episode;
pub mod history;

pub use episode::{CompletedSegment, EpisodeBuffer};
pub use history::{Minibatch, RolloutDataset, RolloutHistory};
