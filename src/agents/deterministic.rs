use {
    super::{
        critic_step,
        states_actions,
        LearnParams,
        LearningStrategy,
    },
    crate::{
        components::Batch,
        configs::AgentConfig,
        networks::{
            soft_update,
            Architecture,
            Network,
        },
    },
    candle_core::{
        Device,
        Result,
        Tensor,
    },
    tracing::debug,
};

/// Deterministic policy gradient (DDPG-style) learning.
///
/// Only the first agent slice of a batch is used.
pub struct DeterministicActorCritic {
    actor_local: Network,
    actor_target: Network,
    critic_local: Network,
    critic_target: Network,
}

impl DeterministicActorCritic {
    /// The target networks start as copies of the given local networks.
    pub fn new(
        actor: Network,
        critic: Network,
    ) -> Result<Self> {
        Ok(Self {
            actor_target: actor.try_clone()?,
            actor_local: actor,
            critic_target: critic.try_clone()?,
            critic_local: critic,
        })
    }

    pub fn from_config(
        device: &Device,
        config: &AgentConfig,
        size_state: usize,
        size_action: usize,
    ) -> Result<Self> {
        let actor = Network::new(
            Architecture::actor(size_state, size_action, &config.actor),
            &config.actor,
            device,
        )?;
        let critic = Network::new(
            Architecture::critic(size_state + size_action, &config.critic),
            &config.critic,
            device,
        )?;
        Self::new(actor, critic)
    }

    pub fn actor_local(&self) -> &Network {
        &self.actor_local
    }

    pub fn actor_target(&self) -> &Network {
        &self.actor_target
    }

    pub fn critic_local(&self) -> &Network {
        &self.critic_local
    }

    pub fn critic_target(&self) -> &Network {
        &self.critic_target
    }
}

impl LearningStrategy for DeterministicActorCritic {
    fn policy_actions(
        &mut self,
        states: &Tensor,
    ) -> Result<Tensor> {
        self.actor_local.eval();
        let actions = self.actor_local.forward(states);
        self.actor_local.train();
        actions
    }

    fn learn(
        &mut self,
        batch: &Batch,
        params: &LearnParams,
    ) -> Result<()> {
        let experiences = batch.agent(0)?;

        let next_actions = self.actor_target.forward(&experiences.next_states)?;
        let critic_loss = critic_step(
            &mut self.critic_local,
            &self.critic_target,
            &states_actions(&experiences.states, &experiences.actions)?,
            &states_actions(&experiences.next_states, &next_actions)?,
            &experiences.rewards,
            &experiences.dones,
            params.gamma,
        )?;

        let actions = self.actor_local.forward(&experiences.states)?;
        let actor_loss = self
            .critic_local
            .forward(&states_actions(&experiences.states, &actions)?)?
            .mean_all()?
            .neg()?;
        self.actor_local.backward_step(&actor_loss)?;

        soft_update(&self.critic_local, &self.critic_target, params.tau)?;
        soft_update(&self.actor_local, &self.actor_target, params.tau)?;

        let actor_loss = actor_loss.to_scalar::<f64>()?;
        debug!(critic_loss, actor_loss, "deterministic actor-critic update");
        Ok(())
    }
}
