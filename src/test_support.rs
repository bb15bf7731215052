//! Shared fixtures for trainer tests: a scripted environment and small
//! linear stand-ins for the residual networks.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::env::{ActionId, EnvStep, Environment, Observation, ACTION_SPACE, OBS_LEN};
use crate::model::{PolicyNetwork, ValueNetwork};

/// Deterministic environment: fixed legal set, fixed per-step reward,
/// optional fixed episode length.
pub struct ScriptedEnv {
    reward: f32,
    episode_len: Option<usize>,
    t: usize,
}

impl ScriptedEnv {
    /// An environment that never terminates on its own.
    pub fn endless(reward: f32) -> Self {
        Self {
            reward,
            episode_len: None,
            t: 0,
        }
    }

    /// An environment that terminates after `episode_len` steps.
    pub fn with_episode_len(reward: f32, episode_len: usize) -> Self {
        Self {
            reward,
            episode_len: Some(episode_len),
            t: 0,
        }
    }
}

impl Environment for ScriptedEnv {
    fn reset(&mut self, _randomize: bool) -> Observation {
        self.t = 0;
        Observation::zeros()
    }

    fn step(&mut self, _action: ActionId) -> EnvStep {
        self.t += 1;
        let done = self.episode_len.map_or(false, |n| self.t >= n);
        EnvStep::new(Observation::zeros(), self.reward, done)
    }

    fn legal_actions(&self) -> Vec<ActionId> {
        vec![0, 1, 2]
    }
}

/// Small two-layer policy head over flattened observations.
#[derive(Module, Debug)]
pub struct TinyPolicy<B: Backend> {
    hidden: Linear<B>,
    head: Linear<B>,
}

impl<B: Backend> TinyPolicy<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            hidden: LinearConfig::new(OBS_LEN, 8).init(device),
            head: LinearConfig::new(8, ACTION_SPACE).init(device),
        }
    }
}

impl<B: Backend> PolicyNetwork<B> for TinyPolicy<B> {
    fn forward(&self, observations: Tensor<B, 4>) -> Tensor<B, 2> {
        let x: Tensor<B, 2> = observations.flatten(1, 3);
        self.head.forward(self.hidden.forward(x))
    }
}

/// Small two-layer value head over flattened observations.
#[derive(Module, Debug)]
pub struct TinyValue<B: Backend> {
    hidden: Linear<B>,
    head: Linear<B>,
}

impl<B: Backend> TinyValue<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            hidden: LinearConfig::new(OBS_LEN, 8).init(device),
            head: LinearConfig::new(8, 1).init(device),
        }
    }
}

impl<B: Backend> ValueNetwork<B> for TinyValue<B> {
    fn forward(&self, observations: Tensor<B, 4>) -> Tensor<B, 1> {
        let x: Tensor<B, 2> = observations.flatten(1, 3);
        self.head.forward(self.hidden.forward(x)).flatten(0, 1)
    }
}
