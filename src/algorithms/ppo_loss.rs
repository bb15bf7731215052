//! Loss functions for the clipped PPO update.
//!
//! # Numerical Stability
//!
//! The importance ratio is exp(log_ratio); the log ratio is clamped to
//! [-20, 20] before exponentiation. exp(20) is already ~485 million, far
//! beyond any meaningful ratio, so the clamp only guards against
//! overflow.

use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;

/// Maximum log ratio before exp() to prevent overflow.
const MAX_LOG_RATIO: f32 = 20.0;

/// PPO clipped surrogate loss.
///
/// L^CLIP(θ) = E[min(r_t(θ) * A_t, clip(r_t(θ), 1-ε, 1+ε) * A_t)]
///
/// where r_t(θ) = π_θ(a_t|s_t) / π_θ_old(a_t|s_t).
///
/// # Arguments
///
/// * `log_probs` - current policy log probs: [batch]
/// * `old_log_probs` - log probs stored at collection time: [batch]
/// * `advantages` - normalized GAE advantages: [batch]
/// * `clip_ratio` - clipping fraction ε (typically 0.2)
///
/// # Returns
///
/// Negated mean of the clipped surrogate (for minimization), as a
/// single-element tensor.
pub fn clipped_surrogate_loss<B: AutodiffBackend>(
    log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    clip_ratio: f32,
) -> Tensor<B, 1> {
    let log_ratio = (log_probs - old_log_probs).clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO);
    let ratio = log_ratio.exp();

    let clipped_ratio = ratio.clone().clamp(1.0 - clip_ratio, 1.0 + clip_ratio);

    let surr1 = ratio * advantages.clone();
    let surr2 = clipped_ratio * advantages;

    // Pessimistic bound: the objective saturates once the ratio leaves
    // the clip band in the favorable direction.
    -surr1.min_pair(surr2).mean()
}

/// Value-function regression loss: mean squared error against the
/// discounted reward-to-go targets.
pub fn value_mse_loss<B: AutodiffBackend>(
    values: Tensor<B, 1>,
    returns: Tensor<B, 1>,
) -> Tensor<B, 1> {
    (values - returns).powf_scalar(2.0).mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray<f32>>;

    fn scalar(t: Tensor<B, 1>) -> f32 {
        t.into_data().as_slice::<f32>().unwrap()[0]
    }

    #[test]
    fn test_unchanged_policy_has_unclipped_loss() {
        let device = Default::default();
        // Identical log probs: ratio 1, inside the band, so clipping is
        // inert and the loss is -mean(advantages).
        let log_probs = Tensor::<B, 1>::from_floats([-1.0, -1.0], &device);
        let old_log_probs = Tensor::<B, 1>::from_floats([-1.0, -1.0], &device);
        let advantages = Tensor::<B, 1>::from_floats([1.0, 3.0], &device);

        let loss = scalar(clipped_surrogate_loss(
            log_probs,
            old_log_probs,
            advantages,
            0.2,
        ));
        assert!((loss - (-2.0)).abs() < 1e-5, "got {}", loss);
    }

    #[test]
    fn test_ratio_within_band_matches_wider_clip() {
        let device = Default::default();
        // ratio = exp(0.1) ~ 1.105, inside [0.8, 1.2]: the clip setting
        // must not change the loss.
        let log_probs = Tensor::<B, 1>::from_floats([-0.9], &device);
        let old_log_probs = Tensor::<B, 1>::from_floats([-1.0], &device);
        let advantages = Tensor::<B, 1>::from_floats([2.0], &device);

        let tight = scalar(clipped_surrogate_loss(
            log_probs.clone(),
            old_log_probs.clone(),
            advantages.clone(),
            0.2,
        ));
        let loose = scalar(clipped_surrogate_loss(
            log_probs,
            old_log_probs,
            advantages,
            0.9,
        ));
        assert!((tight - loose).abs() < 1e-6);
    }

    #[test]
    fn test_positive_advantage_saturates_above_band() {
        let device = Default::default();
        // ratio = e ~ 2.718 > 1.2 with positive advantage: the clipped
        // term wins and the objective stops growing at (1+eps)*A.
        let log_probs = Tensor::<B, 1>::from_floats([0.0], &device);
        let old_log_probs = Tensor::<B, 1>::from_floats([-1.0], &device);
        let advantages = Tensor::<B, 1>::from_floats([1.0], &device);

        let loss = scalar(clipped_surrogate_loss(
            log_probs,
            old_log_probs,
            advantages,
            0.2,
        ));
        assert!((loss - (-1.2)).abs() < 1e-2, "got {}", loss);
    }

    #[test]
    fn test_value_mse_perfect_prediction() {
        let device = Default::default();
        let values = Tensor::<B, 1>::from_floats([1.0, 2.0, 3.0], &device);
        let returns = Tensor::<B, 1>::from_floats([1.0, 2.0, 3.0], &device);

        let loss = scalar(value_mse_loss(values, returns));
        assert!(loss.abs() < 1e-6);
    }

    #[test]
    fn test_value_mse_known_error() {
        let device = Default::default();
        let values = Tensor::<B, 1>::from_floats([1.0, 2.0], &device);
        let returns = Tensor::<B, 1>::from_floats([2.0, 4.0], &device);

        // ((1-2)^2 + (2-4)^2) / 2 = 2.5
        let loss = scalar(value_mse_loss(values, returns));
        assert!((loss - 2.5).abs() < 1e-5);
    }
}
