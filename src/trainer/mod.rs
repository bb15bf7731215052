//! The outer training loop: alternating rollout and update phases.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  per iteration                                             │
//! │                                                            │
//! │  checkpoint?  ──►  rollout phase              train phase  │
//! │                    select_action ─► env       shuffled     │
//! │                    segment buffer             minibatches  │
//! │                    finish (GAE)               clip update  │
//! │                    aggregate + normalize ───► two Adams    │
//! │                                                            │
//! │  stop: running reward > target, or iteration budget spent  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Trainer`] holds only configuration; networks, optimizers, the
//! environment, the checkpointer and the metrics sink are passed into
//! [`Trainer::run`]. All mutable loop state lives in an explicit
//! [`TrainingSession`] value.

pub mod config;
pub mod rollout;
pub mod update;

pub use config::{ConfigError, TrainerConfig};
pub use rollout::{select_action, Decision};
pub use update::UpdateReport;

use std::fmt;

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};

use crate::algorithms::masking::MaskError;
use crate::buffers::RolloutHistory;
use crate::checkpoint::{CheckpointError, Checkpointer};
use crate::env::Environment;
use crate::metrics::MetricsSink;
use crate::model::{PolicyNetwork, ValueNetwork};

/// Fatal training error.
#[derive(Debug)]
pub enum TrainError {
    /// The configuration failed validation.
    Config(ConfigError),
    /// Action selection hit an empty legal set; the environment broke
    /// its contract.
    Selection(MaskError),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::Config(e) => write!(f, "invalid configuration: {}", e),
            TrainError::Selection(e) => write!(f, "action selection failed: {}", e),
        }
    }
}

impl std::error::Error for TrainError {}

impl From<ConfigError> for TrainError {
    fn from(e: ConfigError) -> Self {
        TrainError::Config(e)
    }
}

impl From<MaskError> for TrainError {
    fn from(e: MaskError) -> Self {
        TrainError::Selection(e)
    }
}

/// Mutable state of one training run, threaded through the phases.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    /// Current outer iteration.
    pub iteration: usize,
    /// Environment steps taken, across all iterations.
    pub env_steps: usize,
    /// Episodes completed (terminations, not truncations).
    pub episodes: usize,
    /// Training epochs finished, across all iterations.
    pub train_epochs: usize,
    /// Exponentially smoothed episode reward.
    pub running_reward: f32,
}

impl TrainingSession {
    /// Start a fresh session.
    pub fn new(initial_running_reward: f32) -> Self {
        Self {
            iteration: 0,
            env_steps: 0,
            episodes: 0,
            train_epochs: 0,
            running_reward: initial_running_reward,
        }
    }

    /// Fold one finished episode's reward into the running average.
    pub(crate) fn record_episode(&mut self, episode_reward: f32, smoothing: f32) {
        self.running_reward =
            smoothing * episode_reward + (1.0 - smoothing) * self.running_reward;
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Iterations executed.
    pub iterations: usize,
    /// Total environment steps.
    pub env_steps: usize,
    /// Total completed episodes.
    pub episodes: usize,
    /// Final running episode reward.
    pub running_reward: f32,
    /// Whether the target reward was reached before the budget ran out.
    pub solved: bool,
}

/// Trained networks plus the run summary.
#[derive(Debug)]
pub struct TrainingOutcome<P, V> {
    /// Trained policy network.
    pub policy: P,
    /// Trained value network.
    pub value: V,
    /// Run summary.
    pub report: TrainingReport,
}

/// Drives alternating rollout and training phases until the running
/// reward clears the target or the iteration budget is spent.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// Create a trainer from a configuration; validation happens at the
    /// start of [`Trainer::run`].
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Create an Adam optimizer matching the configuration, with
    /// gradient clipping when `max_grad_norm` is set.
    pub fn create_optimizer<B, M>(&self) -> impl Optimizer<M, B>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        let mut adam = AdamConfig::new();
        if let Some(max_norm) = self.config.max_grad_norm {
            adam = adam.with_grad_clipping(Some(GradientClippingConfig::Norm(max_norm)));
        }
        adam.init()
    }

    /// Run the training loop.
    ///
    /// When a checkpointer is supplied, the latest saved pair is loaded
    /// once at startup (a missing or unreadable checkpoint logs and
    /// falls back to the given weights), and the pair is saved on the
    /// checkpointer's interval; a failed save is logged and retried at
    /// the next interval.
    #[allow(clippy::too_many_arguments)]
    pub fn run<B, P, V, OP, OV, E>(
        &self,
        mut policy: P,
        mut value: V,
        mut policy_optim: OP,
        mut value_optim: OV,
        env: &mut E,
        mut checkpointer: Option<&mut Checkpointer>,
        sink: &mut dyn MetricsSink,
    ) -> Result<TrainingOutcome<P, V>, TrainError>
    where
        B: AutodiffBackend,
        P: PolicyNetwork<B> + AutodiffModule<B>,
        P::InnerModule: PolicyNetwork<B::InnerBackend>,
        V: ValueNetwork<B> + AutodiffModule<B>,
        V::InnerModule: ValueNetwork<B::InnerBackend>,
        OP: Optimizer<P, B>,
        OV: Optimizer<V, B>,
        E: Environment,
    {
        self.config.validate()?;

        let device = B::Device::default();
        let inner_device = <B::InnerBackend as Backend>::Device::default();

        if let Some(cp) = checkpointer.as_deref_mut() {
            match cp.load_latest::<B, P, V>(policy.clone(), value.clone(), &device) {
                Ok((p, v, step)) => {
                    policy = p;
                    value = v;
                    log::info!("restored checkpoint pair from iteration {}", step);
                }
                Err(CheckpointError::NoCheckpoints) => {
                    log::info!("no checkpoint found; starting from fresh weights");
                }
                Err(e) => {
                    log::warn!("checkpoint load failed ({}); starting from fresh weights", e);
                }
            }
        }

        let mut session = TrainingSession::new(self.config.initial_running_reward);
        let mut history = RolloutHistory::new();
        let mut solved = false;
        let mut iterations = 0;

        for iteration in 0..self.config.max_iterations {
            session.iteration = iteration;
            iterations = iteration + 1;

            if let Some(cp) = checkpointer.as_deref_mut() {
                if cp.should_save(iteration) {
                    if let Err(e) =
                        cp.save::<B, P, V>(&policy, &value, iteration, Some(session.running_reward))
                    {
                        log::warn!("checkpoint save failed at iteration {}: {}", iteration, e);
                    }
                }
            }

            {
                let policy_inf = policy.valid();
                let value_inf = value.valid();
                rollout::rollout_phase::<B::InnerBackend, _, _, _>(
                    &self.config,
                    &policy_inf,
                    &value_inf,
                    env,
                    &mut history,
                    &mut session,
                    sink,
                    &inner_device,
                )?;
            }

            let dataset = history.finalize();
            let (p, v, report) = update::run_update_epochs(
                policy,
                value,
                &mut policy_optim,
                &mut value_optim,
                &dataset,
                &self.config,
                &device,
            );
            policy = p;
            value = v;

            for (policy_loss, value_loss) in
                report.policy_losses.iter().zip(report.value_losses.iter())
            {
                session.train_epochs += 1;
                sink.scalar("policy_loss", session.train_epochs, *policy_loss);
                sink.scalar("value_loss", session.train_epochs, *value_loss);
            }
            sink.scalar("running_reward", session.train_epochs, session.running_reward);

            if session.running_reward > self.config.target_reward {
                log::info!(
                    "target reward reached at iteration {}: {:.2} > {:.2}",
                    iteration,
                    session.running_reward,
                    self.config.target_reward
                );
                solved = true;
                break;
            }
        }

        sink.flush();

        Ok(TrainingOutcome {
            policy,
            value,
            report: TrainingReport {
                iterations,
                env_steps: session.env_steps,
                episodes: session.episodes,
                running_reward: session.running_reward,
                solved,
            },
        })
    }
}
