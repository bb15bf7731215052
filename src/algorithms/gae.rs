//! Reward-to-go and Generalized Advantage Estimation for finished
//! trajectory segments.
//!
//! Both quantities are backward discounted sums over one segment:
//!
//! R_t = r_t + γ R_{t+1},           with R_n = bootstrap
//! A_t^GAE(γ,λ) = Σ_{l} (γλ)^l δ_{t+l},  δ_t = r_t + γ V_{t+1} - V_t
//!
//! The bootstrap value closes the recursion at the segment boundary:
//! 0 when the episode truly terminated, the critic's estimate of the
//! next state when the segment was truncated by the step cap.
//!
//! ## References
//!
//! - Schulman et al., "High-Dimensional Continuous Control Using
//!   Generalized Advantage Estimation" (2016)

/// Backward discounted cumulative sum.
///
/// `out[i] = xs[i] + discount * out[i+1]`, with `out[n] = 0`. O(n).
pub fn discounted_cumsum(xs: &[f32], discount: f32) -> Vec<f32> {
    let mut out = vec![0.0f32; xs.len()];
    let mut acc = 0.0f32;
    for i in (0..xs.len()).rev() {
        acc = xs[i] + discount * acc;
        out[i] = acc;
    }
    out
}

/// Discounted reward-to-go for one segment.
///
/// Equivalent to appending `bootstrap` to the reward sequence, running the
/// γ recursion, and dropping the appended tail. Length-preserving.
pub fn rewards_to_go(rewards: &[f32], bootstrap: f32, gamma: f32) -> Vec<f32> {
    let mut out = vec![0.0f32; rewards.len()];
    let mut acc = bootstrap;
    for i in (0..rewards.len()).rev() {
        acc = rewards[i] + gamma * acc;
        out[i] = acc;
    }
    out
}

/// GAE advantages for one segment.
///
/// TD residuals are formed against the recorded value estimates with
/// `bootstrap` standing in for V(s_n), then summed backward with decay
/// γλ. No clipping or normalization happens here; the aggregator
/// normalizes once over the whole rollout.
///
/// # Panics
/// Panics if `rewards` and `values` differ in length.
pub fn gae_advantages(
    rewards: &[f32],
    values: &[f32],
    bootstrap: f32,
    gamma: f32,
    gae_lambda: f32,
) -> Vec<f32> {
    let n = rewards.len();
    assert_eq!(values.len(), n, "rewards/values length mismatch");

    let mut deltas = vec![0.0f32; n];
    for i in 0..n {
        let next_value = if i + 1 < n { values[i + 1] } else { bootstrap };
        deltas[i] = rewards[i] + gamma * next_value - values[i];
    }

    discounted_cumsum(&deltas, gamma * gae_lambda)
}

/// Normalize advantages in place over the whole aggregated set: subtract
/// the mean, divide by population std + 1e-5.
///
/// Empty input is a no-op. A constant input collapses to all zeros (the
/// epsilon keeps the division finite).
pub fn normalize_advantages(advantages: &mut [f32]) {
    if advantages.is_empty() {
        return;
    }

    let n = advantages.len() as f32;
    let mean = advantages.iter().sum::<f32>() / n;
    let variance = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n;
    let std = variance.sqrt();

    for a in advantages.iter_mut() {
        *a = (*a - mean) / (std + 1e-5);
    }
}
