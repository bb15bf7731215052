//! Checkpointing of the policy/value network pair.
//!
//! Each save writes a complete standalone `policy_{step}.bin` /
//! `value_{step}.bin` pair; older pairs are never touched, so an
//! interrupted save can only affect the newest pair. Loading only
//! considers steps for which both files exist, which skips the remains of
//! an interrupted save.

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Configuration for the checkpointer.
#[derive(Debug, Clone)]
pub struct CheckpointerConfig {
    /// Directory to store checkpoints.
    pub checkpoint_dir: PathBuf,
    /// Iterations between checkpoint saves.
    pub save_interval: usize,
    /// Number of recent checkpoint pairs to keep (0 = keep all).
    pub keep_last_n: usize,
    /// Whether to track and save the best pair by metric.
    pub save_best: bool,
}

impl Default for CheckpointerConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./checkpoints"),
            save_interval: 5,
            keep_last_n: 5,
            save_best: true,
        }
    }
}

impl CheckpointerConfig {
    /// Create a new config with the given checkpoint directory.
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            ..Default::default()
        }
    }

    /// Set the save interval.
    pub fn with_save_interval(mut self, interval: usize) -> Self {
        self.save_interval = interval;
        self
    }

    /// Set the number of checkpoint pairs to keep.
    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }

    /// Enable or disable best-pair tracking.
    pub fn with_save_best(mut self, save_best: bool) -> Self {
        self.save_best = save_best;
        self
    }
}

/// Error type for checkpointing operations.
#[derive(Debug)]
pub enum CheckpointError {
    /// IO error during save/load.
    Io(io::Error),
    /// Burn recorder error.
    Recorder(String),
    /// No complete checkpoint pair found.
    NoCheckpoints,
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "IO error: {}", e),
            CheckpointError::Recorder(e) => write!(f, "Recorder error: {}", e),
            CheckpointError::NoCheckpoints => write!(f, "No checkpoints found"),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// Checkpoint metadata.
#[derive(Debug, Clone)]
pub struct CheckpointInfo {
    /// Path to the policy file of the pair.
    pub policy_path: PathBuf,
    /// Path to the value file of the pair.
    pub value_path: PathBuf,
    /// Iteration at which the pair was saved.
    pub step: usize,
    /// Optional metric value (running reward at save time).
    pub metric: Option<f32>,
}

/// Saves and restores policy/value network pairs.
pub struct Checkpointer {
    config: CheckpointerConfig,
    best_metric: f32,
    checkpoint_history: Vec<CheckpointInfo>,
}

impl Checkpointer {
    /// Create a new checkpointer, creating the directory if needed.
    pub fn new(config: CheckpointerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;

        Ok(Self {
            config,
            best_metric: f32::NEG_INFINITY,
            checkpoint_history: Vec::new(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    /// Whether a checkpoint is due at this iteration.
    ///
    /// Iteration 0 counts: the initial weights are persisted before the
    /// first update.
    pub fn should_save(&self, iteration: usize) -> bool {
        iteration % self.config.save_interval == 0
    }

    /// Save a policy/value pair.
    ///
    /// Returns the paths of the written pair.
    pub fn save<B, P, V>(
        &mut self,
        policy: &P,
        value: &V,
        step: usize,
        metric: Option<f32>,
    ) -> Result<(PathBuf, PathBuf), CheckpointError>
    where
        B: Backend,
        P: Module<B>,
        V: Module<B>,
    {
        let policy_path = self.config.checkpoint_dir.join(policy_file_name(step));
        let value_path = self.config.checkpoint_dir.join(value_file_name(step));

        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        policy
            .clone()
            .save_file(&policy_path, &recorder)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))?;
        value
            .clone()
            .save_file(&value_path, &recorder)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))?;

        let info = CheckpointInfo {
            policy_path: policy_path.clone(),
            value_path: value_path.clone(),
            step,
            metric,
        };
        self.checkpoint_history.push(info);

        if self.config.save_best {
            if let Some(m) = metric {
                if m > self.best_metric {
                    self.best_metric = m;
                    let best_policy = self.config.checkpoint_dir.join("policy_best.bin");
                    let best_value = self.config.checkpoint_dir.join("value_best.bin");
                    policy
                        .clone()
                        .save_file(&best_policy, &recorder)
                        .map_err(|e| CheckpointError::Recorder(e.to_string()))?;
                    value
                        .clone()
                        .save_file(&best_value, &recorder)
                        .map_err(|e| CheckpointError::Recorder(e.to_string()))?;
                }
            }
        }

        self.cleanup_old_checkpoints();

        Ok((policy_path, value_path))
    }

    /// Load a pair from explicit paths into the given model templates.
    pub fn load<B, P, V>(
        &self,
        policy_template: P,
        value_template: V,
        info: &CheckpointInfo,
        device: &B::Device,
    ) -> Result<(P, V), CheckpointError>
    where
        B: Backend,
        P: Module<B>,
        V: Module<B>,
    {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let policy = policy_template
            .load_file(&info.policy_path, &recorder, device)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))?;
        let value = value_template
            .load_file(&info.value_path, &recorder, device)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))?;
        Ok((policy, value))
    }

    /// Load the newest complete pair, returning it with its step.
    pub fn load_latest<B, P, V>(
        &self,
        policy_template: P,
        value_template: V,
        device: &B::Device,
    ) -> Result<(P, V, usize), CheckpointError>
    where
        B: Backend,
        P: Module<B>,
        V: Module<B>,
    {
        let latest = self
            .list_checkpoints()?
            .pop()
            .ok_or(CheckpointError::NoCheckpoints)?;
        let (policy, value) = self.load(policy_template, value_template, &latest, device)?;
        Ok((policy, value, latest.step))
    }

    /// Load the best pair saved so far.
    pub fn load_best<B, P, V>(
        &self,
        policy_template: P,
        value_template: V,
        device: &B::Device,
    ) -> Result<(P, V), CheckpointError>
    where
        B: Backend,
        P: Module<B>,
        V: Module<B>,
    {
        let policy_path = self.config.checkpoint_dir.join("policy_best.bin");
        let value_path = self.config.checkpoint_dir.join("value_best.bin");
        if !policy_path.exists() || !value_path.exists() {
            return Err(CheckpointError::NoCheckpoints);
        }
        let info = CheckpointInfo {
            policy_path,
            value_path,
            step: 0,
            metric: None,
        };
        self.load(policy_template, value_template, &info, device)
    }

    /// List all complete checkpoint pairs in the directory, oldest first.
    ///
    /// Steps with only one of the two files (an interrupted save) are
    /// skipped.
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let mut checkpoints: Vec<CheckpointInfo> = fs::read_dir(&self.config.checkpoint_dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                let step = parse_step(&path, "policy_")?;
                let value_path = self.config.checkpoint_dir.join(value_file_name(step));
                if value_path.exists() {
                    Some(CheckpointInfo {
                        policy_path: path,
                        value_path,
                        step,
                        metric: None,
                    })
                } else {
                    None
                }
            })
            .collect();

        checkpoints.sort_by_key(|c| c.step);
        Ok(checkpoints)
    }

    /// Get the current best metric value.
    pub fn best_metric(&self) -> f32 {
        self.best_metric
    }

    /// Remove old pairs, keeping only the last N.
    fn cleanup_old_checkpoints(&mut self) {
        if self.config.keep_last_n == 0 {
            return;
        }

        while self.checkpoint_history.len() > self.config.keep_last_n {
            let old = self.checkpoint_history.remove(0);
            let _ = fs::remove_file(&old.policy_path);
            let _ = fs::remove_file(&old.value_path);
        }
    }
}

fn policy_file_name(step: usize) -> String {
    format!("policy_{:08}.bin", step)
}

fn value_file_name(step: usize) -> String {
    format!("value_{:08}.bin", step)
}

/// Extract the step from a `{prefix}{step}.bin` file name.
fn parse_step(path: &Path, prefix: &str) -> Option<usize> {
    path.file_name()?
        .to_str()?
        .strip_prefix(prefix)?
        .strip_suffix(".bin")?
        .parse()
        .ok()
}
