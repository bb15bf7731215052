//! Algorithmic building blocks: advantage estimation, legal-action
//! masking, and the clipped PPO losses.

pub mod gae;
pub mod masking;
pub mod ppo_loss;

pub use gae::{discounted_cumsum, gae_advantages, normalize_advantages, rewards_to_go};
pub use masking::{ActionMask, MaskError, MaskedCategorical};
pub use ppo_loss::{clipped_surrogate_loss, value_mse_loss};
