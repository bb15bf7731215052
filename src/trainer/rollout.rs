//! Rollout collection: masked action selection and the per-iteration
//! simulation phase.

use burn::tensor::backend::Backend;

use crate::algorithms::masking::{ActionMask, MaskError, MaskedCategorical};
use crate::buffers::{EpisodeBuffer, RolloutHistory};
use crate::env::{ActionId, Environment, Observation};
use crate::metrics::MetricsSink;
use crate::model::{observations_to_tensor, PolicyNetwork, ValueNetwork};

use super::config::TrainerConfig;
use super::TrainingSession;

/// Outcome of one action-selection query.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Sampled action id.
    pub action: ActionId,
    /// Log-probability of the sampled action under the masked policy.
    pub log_prob: f32,
    /// Critic's value estimate for the observation.
    pub value: f32,
    /// Legality mask the distribution was restricted to.
    pub mask: ActionMask,
}

/// Query the policy for one masked, stochastic action.
///
/// Builds the legality mask, evaluates the policy on the batch-of-one
/// observation, restricts the resulting categorical distribution to the
/// legal support, samples, and reads the critic's value estimate for the
/// same observation. Intended to run on inference model views; no
/// gradient state is kept.
///
/// An empty `legal_actions` slice violates the environment contract and
/// surfaces as [`MaskError::EmptySupport`].
pub fn select_action<B, P, V>(
    policy: &P,
    value: &V,
    observation: &Observation,
    legal_actions: &[ActionId],
    device: &B::Device,
) -> Result<Decision, MaskError>
where
    B: Backend,
    P: PolicyNetwork<B>,
    V: ValueNetwork<B>,
{
    let mask = ActionMask::from_legal(legal_actions);
    let obs = observations_to_tensor::<B>(observation.as_slice(), device);

    let logits_data = policy.forward(obs.clone()).into_data();
    let logits = logits_data
        .as_slice::<f32>()
        .expect("policy logits should be f32");

    let dist = MaskedCategorical::from_logits(logits, &mask)?;
    let action = dist.sample();
    let log_prob = dist.log_prob(action);

    let value_est = value.forward(obs).into_data().as_slice::<f32>().expect(
        "value estimate should be f32",
    )[0];

    Ok(Decision {
        action,
        log_prob,
        value: value_est,
        mask,
    })
}

/// One rollout phase: collect `max_episodes` trajectory segments under
/// the current policy.
///
/// Each segment ends either on an environment `done` signal (bootstrap
/// 0, episode reward recorded, environment reset) or by hitting the step
/// cap. On truncation one extra [`select_action`] call supplies the
/// bootstrap value; its sampled action and log-probability are discarded,
/// and the running game continues into the next segment.
pub(crate) fn rollout_phase<B, P, V, E>(
    config: &TrainerConfig,
    policy: &P,
    value: &V,
    env: &mut E,
    history: &mut RolloutHistory,
    session: &mut TrainingSession,
    sink: &mut dyn MetricsSink,
    device: &B::Device,
) -> Result<(), MaskError>
where
    B: Backend,
    P: PolicyNetwork<B>,
    V: ValueNetwork<B>,
    E: Environment,
{
    let mut observation = env.reset(false);
    let mut episode_reward = 0.0f32;

    for _ in 0..config.max_episodes {
        let mut segment = EpisodeBuffer::with_capacity(config.max_timesteps);

        for timestep in 0..config.max_timesteps {
            let decision =
                select_action(policy, value, &observation, &env.legal_actions(), device)?;
            let step = env.step(decision.action);
            episode_reward += step.reward;

            sink.scalar("action_probability", session.env_steps, decision.log_prob.exp());
            session.env_steps += 1;

            segment.push(
                observation,
                decision.action,
                step.reward,
                decision.value,
                decision.log_prob,
                decision.mask,
            );
            observation = step.observation;

            if step.done {
                history.add_segment(segment.finish(0.0, config.gamma, config.gae_lambda));

                session.episodes += 1;
                sink.scalar("episode_reward", session.episodes, episode_reward);
                session.record_episode(episode_reward, config.reward_smoothing);
                episode_reward = 0.0;

                observation = env.reset(fastrand::f32() < config.reset_randomize_prob);
                break;
            }

            if timestep == config.max_timesteps - 1 {
                // Truncated mid-game: one extra query for the bootstrap
                // value; the sampled action is discarded.
                let bootstrap =
                    select_action(policy, value, &observation, &env.legal_actions(), device)?;
                history.add_segment(segment.finish(
                    bootstrap.value,
                    config.gamma,
                    config.gae_lambda,
                ));
                break;
            }
        }
    }

    Ok(())
}
