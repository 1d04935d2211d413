//! # Components
//!
//! This module contains the collaborators an agent is built from.
//!
//! ## Noise
//!
//! The [`Noise`] trait describes a stateful process that perturbs the actions
//! of an agent during training. The [`OuNoise`] struct implements the
//! Ornstein-Uhlenbeck process, which is typically used with deterministic
//! policies such as [`crate::agents::DeterministicActorCritic`].
//!
//! ## Memory
//!
//! The [`Memory`] trait describes a store of transitions that can be sampled
//! in random batches. The [`ReplayBuffer`] struct implements it as a bounded
//! ring buffer.
//!
//! Transitions carry an explicit leading agent axis, so a single-agent
//! transition has shape `(1, dim)` and a sampled [`Batch`] has shape
//! `(n_agents, batch_size, dim)`.

mod ou_noise;
mod replay_buffer;

pub use ou_noise::OuNoise;
pub use replay_buffer::{
    flatten_agents,
    Batch,
    Experiences,
    ReplayBuffer,
    Transition,
};

use candle_core::{
    Result,
    Tensor,
};

/// A stateful stochastic process producing exploration noise.
pub trait Noise {
    /// Advance the process one step and return the new perturbation.
    fn sample(&mut self) -> Result<Tensor>;

    /// Restart the process, typically at the start of an episode.
    fn reset(&mut self) -> Result<()>;
}

/// A bounded store of transitions supporting random-batch sampling.
pub trait Memory {
    fn add(&mut self, transition: Transition);

    /// Sample one batch of transitions.
    fn sample(&mut self) -> Result<Batch>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
