//! Training configuration.

use std::fmt;

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter must be positive.
    InvalidCount { field: &'static str, value: usize },
    /// A parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// The batch size exceeds the steps one rollout phase can produce.
    InvalidBatch { steps: usize, batch_size: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            ConfigError::OutOfRange {
                field,
                value,
                min,
                max,
            } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            ConfigError::InvalidBatch { steps, batch_size } => {
                write!(
                    f,
                    "steps_per_rollout ({}) must be >= batch_size ({})",
                    steps, batch_size
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for PPO training.
///
/// Defaults match the chess setup: short 60-ply segments, eight segments
/// per rollout phase, eight update epochs over 16-sample minibatches.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    // Outer loop
    /// Maximum rollout/training iterations.
    pub max_iterations: usize,
    /// Trajectory segments collected per rollout phase.
    pub max_episodes: usize,
    /// Step cap per segment; hitting it truncates the segment.
    pub max_timesteps: usize,
    /// Stop once the running episode reward exceeds this threshold.
    pub target_reward: f32,

    // PPO settings
    /// Discount factor.
    pub gamma: f32,
    /// GAE lambda parameter.
    pub gae_lambda: f32,
    /// PPO clipping fraction.
    pub clip_ratio: f32,
    /// Entropy bonus coefficient.
    pub entropy_coef: f32,
    /// Update epochs per training phase.
    pub n_epochs: usize,
    /// Minibatch size; a partial final batch is dropped.
    pub batch_size: usize,

    // Optimization
    /// Adam learning rate, shared by both networks.
    pub learning_rate: f64,
    /// Maximum gradient norm (None = no clipping).
    pub max_grad_norm: Option<f32>,

    // Reward tracking / resets
    /// EMA coefficient for the running episode reward.
    pub reward_smoothing: f32,
    /// Initial value of the running episode reward.
    pub initial_running_reward: f32,
    /// Probability of requesting a randomized opening on episode reset.
    pub reset_randomize_prob: f32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_episodes: 8,
            max_timesteps: 60,
            target_reward: 20.0,

            gamma: 0.99,
            gae_lambda: 0.95,
            clip_ratio: 0.2,
            entropy_coef: 0.01,
            n_epochs: 8,
            batch_size: 16,

            learning_rate: 5e-4,
            max_grad_norm: None,

            reward_smoothing: 0.05,
            initial_running_reward: -1000.0,
            reset_randomize_prob: 0.1,
        }
    }
}

impl TrainerConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on steps collected in one rollout phase.
    pub fn steps_per_rollout(&self) -> usize {
        self.max_episodes * self.max_timesteps
    }

    /// Validate all configuration parameters.
    ///
    /// # Validation Rules
    /// - Count parameters must be > 0
    /// - gamma and gae_lambda must be in [0.0, 1.0]
    /// - clip_ratio must be in (0.0, 1.0]
    /// - reward_smoothing must be in (0.0, 1.0]
    /// - reset_randomize_prob must be in [0.0, 1.0]
    /// - batch_size must not exceed steps_per_rollout
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidCount {
                field: "max_iterations",
                value: 0,
            });
        }
        if self.max_episodes == 0 {
            return Err(ConfigError::InvalidCount {
                field: "max_episodes",
                value: 0,
            });
        }
        if self.max_timesteps == 0 {
            return Err(ConfigError::InvalidCount {
                field: "max_timesteps",
                value: 0,
            });
        }
        if self.n_epochs == 0 {
            return Err(ConfigError::InvalidCount {
                field: "n_epochs",
                value: 0,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidCount {
                field: "batch_size",
                value: 0,
            });
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::OutOfRange {
                field: "gamma",
                value: self.gamma,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return Err(ConfigError::OutOfRange {
                field: "gae_lambda",
                value: self.gae_lambda,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.clip_ratio <= 0.0 || self.clip_ratio > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "clip_ratio",
                value: self.clip_ratio,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.reward_smoothing <= 0.0 || self.reward_smoothing > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "reward_smoothing",
                value: self.reward_smoothing,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&self.reset_randomize_prob) {
            return Err(ConfigError::OutOfRange {
                field: "reset_randomize_prob",
                value: self.reset_randomize_prob,
                min: 0.0,
                max: 1.0,
            });
        }

        let steps = self.steps_per_rollout();
        if steps < self.batch_size {
            return Err(ConfigError::InvalidBatch {
                steps,
                batch_size: self.batch_size,
            });
        }

        Ok(())
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    // Builder methods

    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Set segments per rollout phase.
    pub fn with_max_episodes(mut self, n: usize) -> Self {
        self.max_episodes = n;
        self
    }

    /// Set the per-segment step cap.
    pub fn with_max_timesteps(mut self, n: usize) -> Self {
        self.max_timesteps = n;
        self
    }

    /// Set the early-stop reward threshold.
    pub fn with_target_reward(mut self, reward: f32) -> Self {
        self.target_reward = reward;
        self
    }

    /// Set the discount factor.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set GAE lambda.
    pub fn with_gae_lambda(mut self, lambda: f32) -> Self {
        self.gae_lambda = lambda;
        self
    }

    /// Set the PPO clipping fraction.
    pub fn with_clip_ratio(mut self, ratio: f32) -> Self {
        self.clip_ratio = ratio;
        self
    }

    /// Set the entropy bonus coefficient.
    pub fn with_entropy_coef(mut self, coef: f32) -> Self {
        self.entropy_coef = coef;
        self
    }

    /// Set update epochs per training phase.
    pub fn with_n_epochs(mut self, epochs: usize) -> Self {
        self.n_epochs = epochs;
        self
    }

    /// Set the minibatch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set the maximum gradient norm (None = no clipping).
    pub fn with_max_grad_norm(mut self, norm: Option<f32>) -> Self {
        self.max_grad_norm = norm;
        self
    }

    /// Set the running-reward EMA coefficient.
    pub fn with_reward_smoothing(mut self, smoothing: f32) -> Self {
        self.reward_smoothing = smoothing;
        self
    }

    /// Set the initial running reward.
    pub fn with_initial_running_reward(mut self, reward: f32) -> Self {
        self.initial_running_reward = reward;
        self
    }

    /// Set the randomized-reset probability.
    pub fn with_reset_randomize_prob(mut self, prob: f32) -> Self {
        self.reset_randomize_prob = prob;
        self
    }
}
