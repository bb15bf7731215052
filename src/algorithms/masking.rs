//! Legal-action masking and the categorical distribution restricted to a
//! legal subset.
//!
//! Sampling during rollouts works on raw logit slices
//! ([`MaskedCategorical`]); the training path re-applies masks on tensors
//! with gradient flow ([`mask_logits`] and friends). Both force the
//! probability of illegal actions to exactly zero.
//!
//! A distribution over an empty legal set is rejected with
//! [`MaskError::EmptySupport`] instead of silently producing NaNs.

use std::fmt;

use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Int, Tensor, TensorData};

use crate::env::{ActionId, ACTION_SPACE};

/// Error from constructing a masked distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    /// The mask allows no action at all. The environment contract
    /// guarantees at least one legal action in any non-terminal state, so
    /// hitting this means the contract was broken upstream.
    EmptySupport,
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskError::EmptySupport => write!(f, "action mask has no legal actions"),
        }
    }
}

impl std::error::Error for MaskError {}

/// Boolean legality vector over the full action space.
///
/// Invariant: `mask.is_legal(a)` holds exactly for the ids the
/// environment reported legal at the step the mask was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMask {
    legal: Vec<bool>,
}

impl ActionMask {
    /// A mask with no legal actions.
    pub fn empty() -> Self {
        Self {
            legal: vec![false; ACTION_SPACE],
        }
    }

    /// Build a mask from the environment's legal-action ids.
    ///
    /// # Panics
    /// Panics if an id is outside the action space.
    pub fn from_legal(actions: &[ActionId]) -> Self {
        let mut mask = Self::empty();
        for &a in actions {
            mask.allow(a);
        }
        mask
    }

    /// Mark one action as legal.
    pub fn allow(&mut self, action: ActionId) {
        assert!(
            (action as usize) < ACTION_SPACE,
            "action id {} outside action space {}",
            action,
            ACTION_SPACE
        );
        self.legal[action as usize] = true;
    }

    /// Whether the given action is legal.
    pub fn is_legal(&self, action: ActionId) -> bool {
        self.legal
            .get(action as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Number of legal actions.
    pub fn n_legal(&self) -> usize {
        self.legal.iter().filter(|&&l| l).count()
    }

    /// Length of the mask (the full action-space size).
    pub fn len(&self) -> usize {
        self.legal.len()
    }

    /// Always false: masks span the whole action space.
    pub fn is_empty(&self) -> bool {
        self.legal.is_empty()
    }

    /// Per-action legality flags.
    pub fn as_slice(&self) -> &[bool] {
        &self.legal
    }
}

/// Categorical distribution over the legal subset of the action space.
///
/// Built from raw policy logits; illegal entries carry log-probability
/// -inf and probability exactly zero. Log-sum-exp over the legal support
/// is max-subtracted for numerical stability.
#[derive(Debug, Clone)]
pub struct MaskedCategorical {
    log_probs: Vec<f32>,
}

impl MaskedCategorical {
    /// Restrict `logits` to the support described by `mask`.
    ///
    /// # Panics
    /// Panics if `logits` and `mask` differ in length.
    pub fn from_logits(logits: &[f32], mask: &ActionMask) -> Result<Self, MaskError> {
        assert_eq!(
            logits.len(),
            mask.len(),
            "logits/mask length mismatch: {} vs {}",
            logits.len(),
            mask.len()
        );

        if mask.n_legal() == 0 {
            return Err(MaskError::EmptySupport);
        }

        let mut max = f32::NEG_INFINITY;
        for (&l, &legal) in logits.iter().zip(mask.as_slice()) {
            if legal && l > max {
                max = l;
            }
        }

        let mut sum = 0.0f32;
        for (&l, &legal) in logits.iter().zip(mask.as_slice()) {
            if legal {
                sum += (l - max).exp();
            }
        }
        let log_sum_exp = max + sum.ln();

        let log_probs = logits
            .iter()
            .zip(mask.as_slice())
            .map(|(&l, &legal)| if legal { l - log_sum_exp } else { f32::NEG_INFINITY })
            .collect();

        Ok(Self { log_probs })
    }

    /// Sample one action id via inverse-CDF over the legal support.
    ///
    /// Falls back to the last legal action if floating-point rounding
    /// leaves the cumulative sum short of 1.
    pub fn sample(&self) -> ActionId {
        let r = fastrand::f32();
        let mut cumsum = 0.0f32;
        let mut last_legal = 0u32;

        for (a, &lp) in self.log_probs.iter().enumerate() {
            if lp == f32::NEG_INFINITY {
                continue;
            }
            last_legal = a as u32;
            cumsum += lp.exp();
            if r < cumsum {
                return a as u32;
            }
        }

        last_legal
    }

    /// Log-probability of an action (-inf for illegal ones).
    pub fn log_prob(&self, action: ActionId) -> f32 {
        self.log_probs[action as usize]
    }

    /// Probability of an action (exactly 0 for illegal ones).
    pub fn prob(&self, action: ActionId) -> f32 {
        let lp = self.log_probs[action as usize];
        if lp == f32::NEG_INFINITY {
            0.0
        } else {
            lp.exp()
        }
    }

    /// Shannon entropy over the legal support.
    pub fn entropy(&self) -> f32 {
        self.log_probs
            .iter()
            .filter(|lp| lp.is_finite())
            .map(|&lp| -lp.exp() * lp)
            .sum()
    }
}

// ============================================================================
// Tensor path (training, with gradient flow)
// ============================================================================

/// Build a `[batch, ACTION_SPACE]` boolean tensor that is true at
/// *illegal* positions, from flat illegal flags.
pub fn illegal_mask_tensor<B: Backend>(
    illegal: &[bool],
    batch_size: usize,
    device: &B::Device,
) -> Tensor<B, 2, Bool> {
    debug_assert_eq!(illegal.len(), batch_size * ACTION_SPACE);
    Tensor::from_data(
        TensorData::new(illegal.to_vec(), [batch_size, ACTION_SPACE]),
        device,
    )
}

/// Force illegal logits to -inf so softmax assigns them probability zero.
pub fn mask_logits<B: Backend>(
    logits: Tensor<B, 2>,
    illegal: Tensor<B, 2, Bool>,
) -> Tensor<B, 2> {
    logits.mask_fill(illegal, f32::NEG_INFINITY)
}

/// Log-probabilities of the chosen actions under `probs`.
///
/// Gathers the per-sample probability and takes `ln(p + 1e-8)`; the floor
/// keeps the log finite for (masked) zero entries.
pub fn log_probs_for_actions<B: Backend>(
    probs: Tensor<B, 2>,
    actions: &[ActionId],
    device: &B::Device,
) -> Tensor<B, 1> {
    let batch_size = actions.len();
    let indices: Vec<i32> = actions.iter().map(|&a| a as i32).collect();
    let indices: Tensor<B, 2, Int> =
        Tensor::<B, 1, Int>::from_ints(indices.as_slice(), device).reshape([batch_size, 1]);

    let selected: Tensor<B, 1> = probs.gather(1, indices).flatten(0, 1);
    (selected + 1e-8).log()
}

/// Per-sample entropy of categorical distributions given as probabilities.
///
/// H = -Σ p ln(p + 1e-8); masked-out entries contribute nothing.
pub fn categorical_entropy<B: Backend>(probs: Tensor<B, 2>) -> Tensor<B, 1> {
    let log_probs = (probs.clone() + 1e-8).log();
    let neg_entropy: Tensor<B, 2> = (probs * log_probs).sum_dim(1);
    -neg_entropy.flatten(0, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::activation::softmax;

    type B = NdArray<f32>;

    fn uniform_logits() -> Vec<f32> {
        vec![0.0; ACTION_SPACE]
    }

    #[test]
    fn test_mask_from_legal() {
        let mask = ActionMask::from_legal(&[0, 7, 4271]);
        assert_eq!(mask.n_legal(), 3);
        assert!(mask.is_legal(0));
        assert!(mask.is_legal(7));
        assert!(mask.is_legal(4271));
        assert!(!mask.is_legal(1));
        assert_eq!(mask.len(), ACTION_SPACE);
    }

    #[test]
    fn test_empty_support_rejected() {
        let result = MaskedCategorical::from_logits(&uniform_logits(), &ActionMask::empty());
        assert_eq!(result.unwrap_err(), MaskError::EmptySupport);
    }

    #[test]
    fn test_single_legal_action_is_forced() {
        // Strong logits elsewhere must not matter.
        let mut logits = uniform_logits();
        logits[100] = 50.0;
        logits[200] = 50.0;

        let mask = ActionMask::from_legal(&[42]);
        let dist = MaskedCategorical::from_logits(&logits, &mask).unwrap();

        for _ in 0..20 {
            assert_eq!(dist.sample(), 42);
        }
        assert!(dist.log_prob(42).abs() < 1e-6);
        assert!((dist.prob(42) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_illegal_actions_never_sampled() {
        let mask = ActionMask::from_legal(&[3, 9, 17]);
        let dist = MaskedCategorical::from_logits(&uniform_logits(), &mask).unwrap();

        for _ in 0..200 {
            let a = dist.sample();
            assert!(mask.is_legal(a), "sampled illegal action {}", a);
        }
        assert_eq!(dist.prob(4), 0.0);
        assert_eq!(dist.log_prob(4), f32::NEG_INFINITY);
    }

    #[test]
    fn test_uniform_entropy() {
        let mask = ActionMask::from_legal(&[0, 1, 2, 3]);
        let dist = MaskedCategorical::from_logits(&uniform_logits(), &mask).unwrap();
        assert!((dist.entropy() - 4.0f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let mut logits = uniform_logits();
        logits[1] = 2.0;
        logits[5] = -1.0;
        let mask = ActionMask::from_legal(&[1, 2, 5]);
        let dist = MaskedCategorical::from_logits(&logits, &mask).unwrap();

        let total: f32 = (0..ACTION_SPACE as u32).map(|a| dist.prob(a)).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_tensor_masking_zeroes_illegal_probs() {
        let device = Default::default();
        let mask = ActionMask::from_legal(&[0, 2]);
        let illegal: Vec<bool> = mask.as_slice().iter().map(|&l| !l).collect();

        let logits = Tensor::<B, 2>::zeros([1, ACTION_SPACE], &device);
        let masked = mask_logits(logits, illegal_mask_tensor::<B>(&illegal, 1, &device));
        let probs = softmax(masked, 1);

        let data = probs.into_data();
        let row = data.as_slice::<f32>().unwrap();
        assert!((row[0] - 0.5).abs() < 1e-5);
        assert!(row[1].abs() < 1e-6);
        assert!((row[2] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_log_probs_for_actions_gathers_rows() {
        let device = Default::default();
        // Two samples over a tiny artificial "probability" table; the
        // helper only gathers and logs, so any positive values work.
        let probs = Tensor::<B, 2>::from_floats([[0.25, 0.75], [0.5, 0.5]], &device);
        let out = log_probs_for_actions(probs, &[1, 0], &device);

        let data = out.into_data();
        let out = data.as_slice::<f32>().unwrap();
        assert!((out[0] - 0.75f32.ln()).abs() < 1e-4);
        assert!((out[1] - 0.5f32.ln()).abs() < 1e-4);
    }

    #[test]
    fn test_categorical_entropy_uniform_vs_peaked() {
        let device = Default::default();
        let uniform = Tensor::<B, 2>::from_floats([[0.5, 0.5]], &device);
        let peaked = Tensor::<B, 2>::from_floats([[0.99, 0.01]], &device);

        let h_uniform = categorical_entropy(uniform).into_data().as_slice::<f32>().unwrap()[0];
        let h_peaked = categorical_entropy(peaked).into_data().as_slice::<f32>().unwrap()[0];

        assert!(h_uniform > h_peaked);
        assert!((h_uniform - 2.0f32.ln()).abs() < 1e-3);
    }
}
