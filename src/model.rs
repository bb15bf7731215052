//! Actor/critic network traits.
//!
//! The trainer is generic over these traits, implemented for *any*
//! backend so that the same model type works in both modes:
//!
//! - training: an autodiff backend, gradients flow through `forward`
//! - rollout collection: the inner backend obtained via
//!   `AutodiffModule::valid()`, no computation graph is built
//!
//! Concrete residual-tower implementations live in [`crate::nn`].

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::env::{BOARD_PLANES, BOARD_SIZE, OBS_LEN};

/// Policy (actor) network: board planes in, action logits out.
pub trait PolicyNetwork<B: Backend>: Module<B> {
    /// Forward pass: `[batch, 21, 8, 8]` observations to
    /// `[batch, ACTION_SPACE]` raw logits. Masking happens downstream.
    fn forward(&self, observations: Tensor<B, 4>) -> Tensor<B, 2>;
}

/// Value (critic) network: board planes in, scalar state value out.
///
/// The trainer does not constrain the output range; the bundled
/// implementation bounds it to (-1, 1) with tanh.
pub trait ValueNetwork<B: Backend>: Module<B> {
    /// Forward pass: `[batch, 21, 8, 8]` observations to `[batch]`
    /// value estimates.
    fn forward(&self, observations: Tensor<B, 4>) -> Tensor<B, 1>;
}

/// Reshape flat observation data into a `[batch, planes, 8, 8]` tensor.
///
/// # Panics
/// Panics (debug) if `flat` is not a whole number of observations.
pub fn observations_to_tensor<B: Backend>(flat: &[f32], device: &B::Device) -> Tensor<B, 4> {
    debug_assert_eq!(flat.len() % OBS_LEN, 0, "ragged observation buffer");
    let batch_size = flat.len() / OBS_LEN;
    Tensor::<B, 1>::from_floats(flat, device).reshape([
        batch_size,
        BOARD_PLANES,
        BOARD_SIZE,
        BOARD_SIZE,
    ])
}
