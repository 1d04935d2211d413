//! # Agents
//!
//! An [`Agent`] stores experience, selects noisy actions and periodically
//! learns from a sampled batch. What "learning" means is delegated to a
//! [`LearningStrategy`], of which there are three:
//!
//! - [`DeterministicActorCritic`]: deterministic policy gradient (DDPG).
//! - [`StochasticActorCritic`]: REINFORCE with the critic as return estimate.
//! - [`MultiAgentDeterministicActorCritic`]: one actor and one centralised
//!   critic per agent, the critics conditioned on all states and actions.
//!
//! All three share the critic update
//!
//! $$ y = 100 r + \gamma Q_{target}(s', \mu_{target}(s')) (1 - d) $$
//!
//! with the loss $\frac{1}{2} \mathbb{E}[(y - Q(s, a))^2]$, a gradient norm
//! clipped to 1.0, and soft target updates after every learning step.

mod base;
mod deterministic;
mod multi_agent;
mod stochastic;

pub use base::Agent;
pub use deterministic::DeterministicActorCritic;
pub use multi_agent::MultiAgentDeterministicActorCritic;
pub use stochastic::StochasticActorCritic;

use {
    crate::{
        components::Batch,
        networks::Network,
    },
    candle_core::{
        Result,
        Tensor,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    strum::Display,
};

/// Raw rewards are multiplied by this constant before bootstrapping.
pub const REWARD_SCALE: f64 = 100.0;

/// Maximum global gradient norm of a critic update.
pub const CRITIC_MAX_GRAD_NORM: f64 = 1.0;


/// The execution mode of an agent is either training or testing.
///
/// In test mode no exploration noise is added and no learning happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum RunMode {
    Train,
    Test,
}

/// Discount and soft update rate handed to a strategy for one update.
#[derive(Clone, Copy, Debug)]
pub struct LearnParams {
    pub gamma: f64,
    pub tau: f64,
}

/// The optimisation step of an actor-critic variant.
pub trait LearningStrategy {
    /// Actions of the local actor(s) for `states` of shape
    /// `(n_agents, size_state)`, evaluated in inference mode.
    fn policy_actions(
        &mut self,
        states: &Tensor,
    ) -> Result<Tensor>;

    /// Update the local networks from one batch and soft-update the targets.
    fn learn(
        &mut self,
        batch: &Batch,
        params: &LearnParams,
    ) -> Result<()>;
}

/// What the training loop needs from an agent.
pub trait OffPolicyAgent {
    /// Select actions for `state`, clamped to [-1, 1].
    fn act(
        &mut self,
        state: &Tensor,
    ) -> Result<Tensor>;

    /// Record one transition and learn when it is time to.
    fn step(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        done: &Tensor,
    ) -> Result<()>;

    /// Prepare for a new episode.
    fn reset(&mut self) -> Result<()>;
}

/// Concatenate states and actions along the feature axis.
pub(crate) fn states_actions(
    states: &Tensor,
    actions: &Tensor,
) -> Result<Tensor> {
    Tensor::cat(&[states, actions], 1)
}

/// One clipped gradient step of `critic_local` toward the bootstrapped target.
///
/// Returns the critic loss.
pub(crate) fn critic_step(
    critic_local: &mut Network,
    critic_target: &Network,
    states_actions: &Tensor,
    next_states_actions: &Tensor,
    rewards: &Tensor,
    dones: &Tensor,
    gamma: f64,
) -> Result<f64> {
    let q_next = critic_target.forward(next_states_actions)?;
    let not_done = dones.affine(-1.0, 1.0)?;
    let y_target = ((rewards * REWARD_SCALE)? + ((q_next * gamma)? * not_done)?)?.detach();

    let q = critic_local.forward(states_actions)?;
    let critic_loss = ((y_target - q)?.sqr()?.mean_all()? * 0.5)?;
    critic_local.clipped_backward_step(&critic_loss, CRITIC_MAX_GRAD_NORM)?;

    critic_loss.to_scalar::<f64>()
}
