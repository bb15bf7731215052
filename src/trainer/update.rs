//! Training phase: clipped-surrogate policy updates and value
//! regression over the aggregated rollout dataset.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::activation::softmax;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;

use crate::algorithms::masking::{
    categorical_entropy, illegal_mask_tensor, log_probs_for_actions, mask_logits,
};
use crate::algorithms::ppo_loss::{clipped_surrogate_loss, value_mse_loss};
use crate::buffers::RolloutDataset;
use crate::model::{observations_to_tensor, PolicyNetwork, ValueNetwork};

use super::config::TrainerConfig;

/// Per-epoch mean losses of one training phase, for diagnostics.
///
/// NaN or infinite losses are reported as-is; numerical blow-ups are
/// surfaced, not masked.
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// Mean policy loss per epoch.
    pub policy_losses: Vec<f32>,
    /// Mean value loss per epoch.
    pub value_losses: Vec<f32>,
}

/// Run `n_epochs` of minibatch updates over the dataset.
///
/// Every epoch re-shuffles the flat indices and walks fixed-size
/// minibatches (a partial final batch is dropped). The stored legality
/// masks are reapplied to the freshly computed logits each time: the
/// network output changes between epochs, the legality does not.
///
/// The policy loss backpropagates through the policy network only, the
/// value loss through the value network only; each steps its own
/// optimizer.
pub(crate) fn run_update_epochs<B, P, V, OP, OV>(
    mut policy: P,
    mut value: V,
    policy_optim: &mut OP,
    value_optim: &mut OV,
    dataset: &RolloutDataset,
    config: &TrainerConfig,
    device: &B::Device,
) -> (P, V, UpdateReport)
where
    B: AutodiffBackend,
    P: PolicyNetwork<B> + AutodiffModule<B>,
    V: ValueNetwork<B> + AutodiffModule<B>,
    OP: Optimizer<P, B>,
    OV: Optimizer<V, B>,
{
    let mut report = UpdateReport::default();

    if dataset.n_batches(config.batch_size) == 0 {
        return (policy, value, report);
    }

    for _epoch in 0..config.n_epochs {
        let indices = dataset.shuffled_indices();
        let mut policy_losses = Vec::new();
        let mut value_losses = Vec::new();

        for chunk in indices.chunks_exact(config.batch_size) {
            let batch = dataset.gather(chunk);

            let obs = observations_to_tensor::<B>(&batch.observations, device);
            let illegal = illegal_mask_tensor::<B>(&batch.illegal, batch.len, device);

            // Policy pass: mask, distribution, new log probs, entropy.
            let logits = policy.forward(obs.clone());
            let probs = softmax(mask_logits(logits, illegal), 1);
            let entropy = categorical_entropy(probs.clone());
            let new_log_probs = log_probs_for_actions(probs, &batch.actions, device);

            let old_log_probs =
                Tensor::<B, 1>::from_floats(batch.old_log_probs.as_slice(), device);
            let advantages = Tensor::<B, 1>::from_floats(batch.advantages.as_slice(), device);
            let returns = Tensor::<B, 1>::from_floats(batch.rewards_to_go.as_slice(), device);

            let policy_loss = clipped_surrogate_loss(
                new_log_probs,
                old_log_probs,
                advantages,
                config.clip_ratio,
            ) - entropy.mean().mul_scalar(config.entropy_coef);

            // Value pass: regression against reward-to-go targets.
            let values = value.forward(obs);
            let value_loss = value_mse_loss(values, returns);

            policy_losses.push(loss_scalar(&policy_loss));
            value_losses.push(loss_scalar(&value_loss));

            let grads = policy_loss.backward();
            let grads = GradientsParams::from_grads(grads, &policy);
            policy = policy_optim.step(config.learning_rate, policy, grads);

            let grads = value_loss.backward();
            let grads = GradientsParams::from_grads(grads, &value);
            value = value_optim.step(config.learning_rate, value, grads);
        }

        report.policy_losses.push(mean(&policy_losses));
        report.value_losses.push(mean(&value_losses));
    }

    (policy, value, report)
}

fn loss_scalar<B: AutodiffBackend>(loss: &Tensor<B, 1>) -> f32 {
    loss.clone().into_data().as_slice::<f32>().unwrap()[0]
}

fn mean(xs: &[f32]) -> f32 {
    xs.iter().sum::<f32>() / xs.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::masking::ActionMask;
    use crate::buffers::{EpisodeBuffer, RolloutHistory};
    use crate::env::Observation;
    use crate::test_support::{TinyPolicy, TinyValue};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;

    type B = Autodiff<NdArray<f32>>;

    fn dataset_of(steps: usize) -> RolloutDataset {
        let mut buffer = EpisodeBuffer::new();
        for i in 0..steps {
            buffer.push(
                Observation::zeros(),
                (i % 3) as u32,
                1.0,
                0.1,
                -1.1,
                ActionMask::from_legal(&[0, 1, 2]),
            );
        }
        let mut history = RolloutHistory::new();
        history.add_segment(buffer.finish(0.0, 0.99, 0.95));
        history.finalize()
    }

    #[test]
    fn test_update_reports_per_epoch_losses() {
        let device = Default::default();
        let config = TrainerConfig::new()
            .with_n_epochs(2)
            .with_batch_size(2)
            .with_max_episodes(1)
            .with_max_timesteps(6);

        let policy = TinyPolicy::<B>::new(&device);
        let value = TinyValue::<B>::new(&device);
        let mut policy_optim = AdamConfig::new().init();
        let mut value_optim = AdamConfig::new().init();

        let dataset = dataset_of(6);
        let (_, _, report) = run_update_epochs(
            policy,
            value,
            &mut policy_optim,
            &mut value_optim,
            &dataset,
            &config,
            &device,
        );

        assert_eq!(report.policy_losses.len(), 2);
        assert_eq!(report.value_losses.len(), 2);
        for loss in report.policy_losses.iter().chain(report.value_losses.iter()) {
            assert!(loss.is_finite(), "loss should be finite, got {}", loss);
        }
    }

    #[test]
    fn test_update_changes_parameters() {
        let device = Default::default();
        let config = TrainerConfig::new()
            .with_n_epochs(1)
            .with_batch_size(4)
            .with_max_episodes(1)
            .with_max_timesteps(4)
            .with_learning_rate(1e-2);

        let policy = TinyPolicy::<B>::new(&device);
        let value = TinyValue::<B>::new(&device);
        let before = value
            .forward(observations_to_tensor::<B>(
                Observation::zeros().as_slice(),
                &device,
            ))
            .into_data()
            .as_slice::<f32>()
            .unwrap()[0];

        let mut policy_optim = AdamConfig::new().init();
        let mut value_optim = AdamConfig::new().init();

        let dataset = dataset_of(4);
        let (_, value, _) = run_update_epochs(
            policy,
            value,
            &mut policy_optim,
            &mut value_optim,
            &dataset,
            &config,
            &device,
        );

        // Targets are ~3.9 discounted reward units above the critic's
        // near-zero prediction, so one step must move it.
        let after = value
            .forward(observations_to_tensor::<B>(
                Observation::zeros().as_slice(),
                &device,
            ))
            .into_data()
            .as_slice::<f32>()
            .unwrap()[0];
        assert!((after - before).abs() > 1e-6);
    }

    #[test]
    fn test_update_skips_when_batch_cannot_fill() {
        let device = Default::default();
        let config = TrainerConfig::new()
            .with_n_epochs(3)
            .with_batch_size(16)
            .with_max_episodes(8)
            .with_max_timesteps(60);

        let policy = TinyPolicy::<B>::new(&device);
        let value = TinyValue::<B>::new(&device);
        let mut policy_optim = AdamConfig::new().init();
        let mut value_optim = AdamConfig::new().init();

        // Only 4 steps collected, batch size 16: no full batch exists.
        let dataset = dataset_of(4);
        let (_, _, report) = run_update_epochs(
            policy,
            value,
            &mut policy_optim,
            &mut value_optim,
            &dataset,
            &config,
            &device,
        );

        assert!(report.policy_losses.is_empty());
        assert!(report.value_losses.is_empty());
    }
}
