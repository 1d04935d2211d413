mod point_reach;

use {
    anyhow::Result,
    candle_core::Tensor,
};

pub use crate::envs::point_reach::{
    PointReach,
    PointReachConfig,
};

/// The outcome of stepping all agents once.
///
/// # Fields
///
/// * `observations` - The next observations, `(n_agents, observation_size)`.
/// * `rewards` - One reward per agent.
/// * `dones` - One done flag per agent.
#[derive(Debug)]
pub struct Step {
    pub observations: Tensor,
    pub rewards: Vec<f64>,
    pub dones: Vec<bool>,
}

/// An episodic environment driving one or more agents in lockstep.
pub trait Environment {
    type Config;

    fn config(&self) -> &Self::Config;
    fn new(config: Self::Config) -> Result<Box<Self>>;

    /// Start a new episode and return the first observations,
    /// `(n_agents, observation_size)`.
    fn reset(
        &mut self,
        train_mode: bool,
    ) -> Result<Tensor>;

    /// Apply one action row per agent, `(n_agents, action_size)`.
    fn step(
        &mut self,
        actions: &Tensor,
    ) -> Result<Step>;

    fn num_agents(&self) -> usize;
    fn observation_size(&self) -> usize;
    fn action_size(&self) -> usize;
}
