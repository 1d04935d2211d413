use {
    super::{
        critic_step,
        states_actions,
        LearnParams,
        LearningStrategy,
    },
    crate::{
        components::{
            flatten_agents,
            Batch,
        },
        configs::AgentConfig,
        networks::{
            soft_update,
            Architecture,
            Network,
        },
    },
    candle_core::{
        bail,
        Device,
        Result,
        Tensor,
    },
    tracing::debug,
};

/// Multi-agent deterministic actor-critic with centralised critics.
///
/// Every agent has its own actor and critic. Each critic sees the joint
/// state-action vector of all agents, built with [`flatten_agents`] so that
/// agent `i`'s features always occupy the `i`-th block.
pub struct MultiAgentDeterministicActorCritic {
    actors_local: Vec<Network>,
    actors_target: Vec<Network>,
    critics_local: Vec<Network>,
    critics_target: Vec<Network>,
}

impl MultiAgentDeterministicActorCritic {
    pub fn new(
        actors: Vec<Network>,
        critics: Vec<Network>,
    ) -> Result<Self> {
        if actors.is_empty() || actors.len() != critics.len() {
            bail!(
                "need one critic per actor, got {} actors and {} critics",
                actors.len(),
                critics.len(),
            )
        }
        Ok(Self {
            actors_target: actors
                .iter()
                .map(Network::try_clone)
                .collect::<Result<_>>()?,
            actors_local: actors,
            critics_target: critics
                .iter()
                .map(Network::try_clone)
                .collect::<Result<_>>()?,
            critics_local: critics,
        })
    }

    pub fn from_config(
        device: &Device,
        config: &AgentConfig,
        n_agents: usize,
        size_state: usize,
        size_action: usize,
    ) -> Result<Self> {
        let joint_size = n_agents * (size_state + size_action);
        let actors = (0..n_agents)
            .map(|_| {
                Network::new(
                    Architecture::actor(size_state, size_action, &config.actor),
                    &config.actor,
                    device,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let critics = (0..n_agents)
            .map(|_| {
                Network::new(
                    Architecture::critic(joint_size, &config.critic),
                    &config.critic,
                    device,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(actors, critics)
    }

    pub fn n_agents(&self) -> usize {
        self.actors_local.len()
    }

    pub fn actors_local(&self) -> &[Network] {
        &self.actors_local
    }

    pub fn actors_target(&self) -> &[Network] {
        &self.actors_target
    }

    pub fn critics_local(&self) -> &[Network] {
        &self.critics_local
    }

    pub fn critics_target(&self) -> &[Network] {
        &self.critics_target
    }

    /// Train critic `i` on agent `i`'s rewards and done flags and soft-update
    /// its target. Returns one critic loss per agent.
    fn update_critics(
        &mut self,
        batch: &Batch,
        params: &LearnParams,
    ) -> Result<Vec<f64>> {
        let next_actions = stacked_actions(&self.actors_target, &batch.next_states)?;
        let next_joint = joint_states_actions(&batch.next_states, &next_actions)?;
        let joint = joint_states_actions(&batch.states, &batch.actions)?;

        let mut losses = Vec::with_capacity(self.n_agents());
        for i in 0..self.n_agents() {
            losses.push(critic_step(
                &mut self.critics_local[i],
                &self.critics_target[i],
                &joint,
                &next_joint,
                &batch.rewards.get(i)?,
                &batch.dones.get(i)?,
                params.gamma,
            )?);
            soft_update(&self.critics_local[i], &self.critics_target[i], params.tau)?;
        }
        Ok(losses)
    }

    fn check_agents(
        &self,
        n_agents: usize,
    ) -> Result<()> {
        if n_agents != self.n_agents() {
            bail!(
                "expected {} agents along the leading axis, got {n_agents}",
                self.n_agents(),
            )
        }
        Ok(())
    }
}

/// Evaluate actor `i` on agent `i`'s slice of `states` and stack the results
/// along a new leading agent axis.
fn stacked_actions(
    actors: &[Network],
    states: &Tensor,
) -> Result<Tensor> {
    let actions = actors
        .iter()
        .enumerate()
        .map(|(i, actor)| actor.forward(&states.get(i)?))
        .collect::<Result<Vec<_>>>()?;
    Tensor::stack(&actions, 0)
}

/// The joint `(batch, n_agents * (size_state + size_action))` critic input.
fn joint_states_actions(
    states: &Tensor,
    actions: &Tensor,
) -> Result<Tensor> {
    states_actions(&flatten_agents(states)?, &flatten_agents(actions)?)
}

impl LearningStrategy for MultiAgentDeterministicActorCritic {
    fn policy_actions(
        &mut self,
        states: &Tensor,
    ) -> Result<Tensor> {
        self.check_agents(states.dim(0)?)?;

        // one row per agent, seen by the actors as a batch of one
        let states = states.unsqueeze(1)?;
        self.actors_local.iter_mut().for_each(Network::eval);
        let actions = stacked_actions(&self.actors_local, &states);
        self.actors_local.iter_mut().for_each(Network::train);
        actions?.squeeze(1)
    }

    fn learn(
        &mut self,
        batch: &Batch,
        params: &LearnParams,
    ) -> Result<()> {
        self.check_agents(batch.num_agents()?)?;

        let critic_losses = self.update_critics(batch, params)?;
        for (i, critic_loss) in critic_losses.into_iter().enumerate() {
            debug!(agent = i, critic_loss, "centralised critic update");
        }

        let flat_states = flatten_agents(&batch.states)?;
        for i in 0..self.n_agents() {
            let actions = stacked_actions(&self.actors_local, &batch.states)?;
            let joint = states_actions(&flat_states, &flatten_agents(&actions)?)?;
            let actor_loss = self.critics_local[i]
                .forward(&joint)?
                .mean_all()?
                .neg()?;
            self.actors_local[i].backward_step(&actor_loss)?;
            soft_update(&self.actors_local[i], &self.actors_target[i], params.tau)?;

            let actor_loss = actor_loss.to_scalar::<f64>()?;
            debug!(agent = i, actor_loss, "actor update");
        }
        Ok(())
    }
}
