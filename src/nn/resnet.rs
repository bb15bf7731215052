//! Convolutional-residual actor and critic networks.
//!
//! Both networks share the same topology (not weights): a 3x3 convolution
//! into a stack of residual blocks, followed by a network-specific head.
//! The residual stack is an explicit ordered `Vec` of identical blocks
//! applied in series.
//!
//! Defaults match the chess setup: 21 input planes, 256 channels,
//! 21 residual blocks, a 128-channel policy head over 4272 actions and a
//! tanh-bounded scalar value head.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::env::{ACTION_SPACE, BOARD_PLANES, BOARD_SIZE};
use crate::model::{PolicyNetwork, ValueNetwork};

/// Board squares seen by the heads after the tower (8 * 8).
const BOARD_AREA: usize = BOARD_SIZE * BOARD_SIZE;

// ============================================================================
// Residual block
// ============================================================================

/// Configuration for one residual block.
#[derive(Debug, Clone)]
pub struct ResBlockConfig {
    /// Channel count, preserved through the block.
    pub channels: usize,
}

impl ResBlockConfig {
    /// Create a new configuration.
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }

    /// Initialize the block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResBlock<B> {
        let conv = || {
            Conv2dConfig::new([self.channels, self.channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_bias(false)
                .init(device)
        };
        ResBlock {
            conv1: conv(),
            bn1: BatchNormConfig::new(self.channels).init(device),
            conv2: conv(),
            bn2: BatchNormConfig::new(self.channels).init(device),
        }
    }
}

/// Two 3x3 conv + batch-norm layers with an identity skip connection.
#[derive(Module, Debug)]
pub struct ResBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
}

impl<B: Backend> ResBlock<B> {
    /// Forward pass, spatial shape preserved.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let residual = x.clone();
        let out = self.conv1.forward(x);
        let out = relu(self.bn1.forward(out));
        let out = self.conv2.forward(out);
        let out = self.bn2.forward(out);
        relu(out + residual)
    }
}

// ============================================================================
// Shared tower
// ============================================================================

/// Input convolution plus the residual stack, shared topology of both
/// networks.
#[derive(Module, Debug)]
pub struct ResTower<B: Backend> {
    conv_in: Conv2d<B>,
    bn_in: BatchNorm<B, 2>,
    blocks: Vec<ResBlock<B>>,
}

impl<B: Backend> ResTower<B> {
    fn new(planes: usize, channels: usize, n_blocks: usize, device: &B::Device) -> Self {
        Self {
            conv_in: Conv2dConfig::new([planes, channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            bn_in: BatchNormConfig::new(channels).init(device),
            blocks: (0..n_blocks)
                .map(|_| ResBlockConfig::new(channels).init(device))
                .collect(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut out = relu(self.bn_in.forward(self.conv_in.forward(x)));
        for block in &self.blocks {
            out = block.forward(out);
        }
        out
    }
}

// ============================================================================
// Policy network
// ============================================================================

/// Configuration for [`PolicyNet`].
#[derive(Debug, Clone)]
pub struct PolicyNetConfig {
    /// Input feature planes.
    pub planes: usize,
    /// Tower channel count.
    pub channels: usize,
    /// Number of residual blocks.
    pub n_blocks: usize,
    /// Channels of the 1x1 policy-head convolution.
    pub head_channels: usize,
    /// Size of the action space.
    pub n_actions: usize,
}

impl Default for PolicyNetConfig {
    fn default() -> Self {
        Self {
            planes: BOARD_PLANES,
            channels: 256,
            n_blocks: 21,
            head_channels: 128,
            n_actions: ACTION_SPACE,
        }
    }
}

impl PolicyNetConfig {
    /// Create a configuration with the chess defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tower channel count.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Set the number of residual blocks.
    pub fn with_blocks(mut self, n_blocks: usize) -> Self {
        self.n_blocks = n_blocks;
        self
    }

    /// Set the policy-head channel count.
    pub fn with_head_channels(mut self, head_channels: usize) -> Self {
        self.head_channels = head_channels;
        self
    }

    /// Initialize the network.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyNet<B> {
        PolicyNet {
            tower: ResTower::new(self.planes, self.channels, self.n_blocks, device),
            head_conv: Conv2dConfig::new([self.channels, self.head_channels], [1, 1]).init(device),
            head_bn: BatchNormConfig::new(self.head_channels).init(device),
            head_fc: LinearConfig::new(self.head_channels * BOARD_AREA, self.n_actions)
                .init(device),
        }
    }
}

/// Actor: residual tower into a 1x1-conv policy head producing raw
/// logits over the action space.
#[derive(Module, Debug)]
pub struct PolicyNet<B: Backend> {
    tower: ResTower<B>,
    head_conv: Conv2d<B>,
    head_bn: BatchNorm<B, 2>,
    head_fc: Linear<B>,
}

impl<B: Backend> PolicyNetwork<B> for PolicyNet<B> {
    fn forward(&self, observations: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.tower.forward(observations);
        let p = relu(self.head_bn.forward(self.head_conv.forward(features)));
        let p: Tensor<B, 2> = p.flatten(1, 3);
        self.head_fc.forward(p)
    }
}

// ============================================================================
// Value network
// ============================================================================

/// Configuration for [`ValueNet`].
#[derive(Debug, Clone)]
pub struct ValueNetConfig {
    /// Input feature planes.
    pub planes: usize,
    /// Tower channel count.
    pub channels: usize,
    /// Number of residual blocks.
    pub n_blocks: usize,
    /// Width of the hidden layer in the value head.
    pub hidden: usize,
}

impl Default for ValueNetConfig {
    fn default() -> Self {
        Self {
            planes: BOARD_PLANES,
            channels: 256,
            n_blocks: 21,
            hidden: 64,
        }
    }
}

impl ValueNetConfig {
    /// Create a configuration with the chess defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tower channel count.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Set the number of residual blocks.
    pub fn with_blocks(mut self, n_blocks: usize) -> Self {
        self.n_blocks = n_blocks;
        self
    }

    /// Set the value-head hidden width.
    pub fn with_hidden(mut self, hidden: usize) -> Self {
        self.hidden = hidden;
        self
    }

    /// Initialize the network.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ValueNet<B> {
        ValueNet {
            tower: ResTower::new(self.planes, self.channels, self.n_blocks, device),
            head_conv: Conv2dConfig::new([self.channels, 1], [1, 1]).init(device),
            head_bn: BatchNormConfig::new(1).init(device),
            fc1: LinearConfig::new(BOARD_AREA, self.hidden).init(device),
            fc2: LinearConfig::new(self.hidden, 1).init(device),
        }
    }
}

/// Critic: residual tower into a single-channel head producing a
/// tanh-bounded scalar value per sample.
#[derive(Module, Debug)]
pub struct ValueNet<B: Backend> {
    tower: ResTower<B>,
    head_conv: Conv2d<B>,
    head_bn: BatchNorm<B, 2>,
    fc1: Linear<B>,
    fc2: Linear<B>,
}

impl<B: Backend> ValueNetwork<B> for ValueNet<B> {
    fn forward(&self, observations: Tensor<B, 4>) -> Tensor<B, 1> {
        let features = self.tower.forward(observations);
        let v = relu(self.head_bn.forward(self.head_conv.forward(features)));
        let v: Tensor<B, 2> = v.flatten(1, 3);
        let v = relu(self.fc1.forward(v));
        let v = self.fc2.forward(v).tanh();
        v.flatten(0, 1)
    }
}
