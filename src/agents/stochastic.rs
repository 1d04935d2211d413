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
            GaussianActor,
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

/// Policy-gradient learning with the critic as a return estimate.
///
/// The critic is trained exactly like in [`super::DeterministicActorCritic`],
/// with the target actor's mean action as next action. The actor minimises
/// `mean(-log_prob * Q(s, a))` with `Q` treated as a constant.
pub struct StochasticActorCritic {
    actor_local: GaussianActor,
    actor_target: GaussianActor,
    critic_local: Network,
    critic_target: Network,
}

impl StochasticActorCritic {
    pub fn new(
        actor: GaussianActor,
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
        let actor = GaussianActor::new(
            size_state,
            size_action,
            config.log_std_init,
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

    pub fn actor_local(&self) -> &GaussianActor {
        &self.actor_local
    }

    pub fn actor_target(&self) -> &GaussianActor {
        &self.actor_target
    }

    pub fn critic_local(&self) -> &Network {
        &self.critic_local
    }

    pub fn critic_target(&self) -> &Network {
        &self.critic_target
    }
}

impl LearningStrategy for StochasticActorCritic {
    fn policy_actions(
        &mut self,
        states: &Tensor,
    ) -> Result<Tensor> {
        let network = self.actor_local.network_mut();
        network.eval();
        let actions = network.forward(states);
        network.train();
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

        let (actions, log_probs) = self.actor_local.act(&experiences.states)?;
        let q = self
            .critic_local
            .forward(&states_actions(&experiences.states, &actions)?)?
            .detach();
        let actor_loss = (log_probs.neg()? * q)?.mean_all()?;
        self.actor_local.network_mut().backward_step(&actor_loss)?;

        soft_update(&self.critic_local, &self.critic_target, params.tau)?;
        soft_update(
            self.actor_local.network(),
            self.actor_target.network(),
            params.tau,
        )?;

        let actor_loss = actor_loss.to_scalar::<f64>()?;
        debug!(critic_loss, actor_loss, "stochastic actor-critic update");
        Ok(())
    }
}
