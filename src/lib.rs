//! # chess_ppo: PPO self-play trainer for a chess agent
//!
//! Proximal Policy Optimization over a masked 4272-action space, with
//! convolutional-residual actor and critic networks reading 21x8x8 board
//! planes.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Training iteration                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  rollout phase                                               │
//! │  ┌───────────────┐   legal_actions    ┌──────────────────┐   │
//! │  │ select_action │◄──────────────────►│   Environment    │   │
//! │  │ (masked       │      step          │   (external)     │   │
//! │  │  categorical) │───────────────────►└──────────────────┘   │
//! │  └──────┬────────┘                                           │
//! │         ▼                                                    │
//! │  EpisodeBuffer ──finish(bootstrap)──► rewards-to-go + GAE    │
//! │         ▼                                                    │
//! │  RolloutHistory ──finalize──► flat dataset, advantages       │
//! │                               normalized globally            │
//! │  training phase                                              │
//! │  shuffled minibatches ──► clipped surrogate + entropy bonus  │
//! │                           value MSE, two independent Adams   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rollout collection and training alternate strictly on one thread;
//! inference runs on the non-autodiff backend via
//! `AutodiffModule::valid()`. The chess engine itself is a collaborator
//! behind [`env::Environment`]; checkpoints and metrics go through
//! [`checkpoint::Checkpointer`] and [`metrics::MetricsSink`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use chess_ppo::{
//!     Checkpointer, CheckpointerConfig, ConsoleSink, PolicyNetConfig, Trainer,
//!     TrainerConfig, ValueNetConfig,
//! };
//!
//! type B = Autodiff<NdArray<f32>>;
//!
//! let device = Default::default();
//! let config = TrainerConfig::new().with_target_reward(20.0);
//! let trainer = Trainer::new(config);
//!
//! let policy = PolicyNetConfig::new().init::<B>(&device);
//! let value = ValueNetConfig::new().init::<B>(&device);
//! let policy_optim = trainer.create_optimizer();
//! let value_optim = trainer.create_optimizer();
//!
//! let mut checkpointer = Checkpointer::new(CheckpointerConfig::new("./checkpoints"))?;
//! let mut sink = ConsoleSink::with_tags(&["running_reward", "policy_loss", "value_loss"]);
//!
//! let outcome = trainer.run(
//!     policy,
//!     value,
//!     policy_optim,
//!     value_optim,
//!     &mut my_chess_env,
//!     Some(&mut checkpointer),
//!     &mut sink,
//! )?;
//! ```

pub mod algorithms;
pub mod buffers;
pub mod checkpoint;
pub mod env;
pub mod metrics;
pub mod model;
pub mod nn;
pub mod trainer;

#[cfg(test)]
pub(crate) mod test_support;

pub use algorithms::gae::{
    discounted_cumsum, gae_advantages, normalize_advantages, rewards_to_go,
};
pub use algorithms::masking::{ActionMask, MaskError, MaskedCategorical};
pub use buffers::{CompletedSegment, EpisodeBuffer, Minibatch, RolloutDataset, RolloutHistory};
pub use checkpoint::{CheckpointError, CheckpointInfo, Checkpointer, CheckpointerConfig};
pub use env::{
    ActionId, EnvStep, Environment, Observation, ACTION_SPACE, BOARD_PLANES, BOARD_SIZE, OBS_LEN,
};
pub use metrics::{ConsoleSink, CsvSink, MetricsSink, MultiSink, NullSink};
pub use model::{observations_to_tensor, PolicyNetwork, ValueNetwork};
pub use nn::{PolicyNet, PolicyNetConfig, ResBlock, ResBlockConfig, ValueNet, ValueNetConfig};
pub use trainer::{
    select_action, ConfigError, Decision, TrainError, Trainer, TrainerConfig, TrainingOutcome,
    TrainingReport, TrainingSession, UpdateReport,
};
