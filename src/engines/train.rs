use {
    crate::{
        agents::OffPolicyAgent,
        configs::TrainConfig,
        envs::Environment,
        util::rolling_mean,
    },
    anyhow::{
        ensure,
        Result,
    },
    candle_core::{
        Device,
        Tensor,
    },
    tracing::{
        debug,
        warn,
    },
};


/// Runs episodes of an environment with an off-policy agent.
///
/// Every step is fed back to the agent, which decides by itself when to
/// learn. Observations are moved to `device` before the agent sees them.
pub struct Trainer<Env, Agt> {
    env: Env,
    agent: Agt,
    config: TrainConfig,
    device: Device,
}

impl<Env, Agt> Trainer<Env, Agt>
where
    Env: Environment,
    Agt: OffPolicyAgent,
{
    pub fn new(
        env: Env,
        agent: Agt,
        config: TrainConfig,
        device: &Device,
    ) -> Self {
        Self {
            env,
            agent,
            config,
            device: device.clone(),
        }
    }

    /// Train until the problem is solved or `max_episodes` have been played.
    ///
    /// The score of an episode is the highest per-agent return. Training is
    /// considered solved as soon as the mean score over the last
    /// `solve_window` episodes exceeds `solved_threshold`.
    pub fn train(&mut self) -> Result<Vec<f64>> {
        let mut scores = Vec::new();

        for episode in 0..self.config.max_episodes() {
            let score = self.run_episode()?;
            scores.push(score);

            let solve_average = rolling_mean(&scores, self.config.solve_window());
            if solve_average > self.config.solved_threshold() {
                warn!("Problem solved after {episode} episodes, average score {solve_average:.2}");
                return Ok(scores);
            }

            let average = rolling_mean(&scores, self.config.report_window());
            debug!(episode, score, average, "episode finished");
            if episode % self.config.report_every().max(1) == 0 {
                warn!("Episode {episode}\tAverage Score: {average:.2}");
            }
        }
        Ok(scores)
    }

    /// Play one episode and return the highest per-agent return.
    fn run_episode(&mut self) -> Result<f64> {
        let n_agents = self.env.num_agents();
        let mut returns = vec![0.0; n_agents];

        let mut state = self
            .env
            .reset(self.config.train_mode())?
            .to_device(&self.device)?;
        self.agent.reset()?;

        loop {
            let action = self.agent.act(&state)?;
            let step = self.env.step(&action)?;
            ensure!(
                step.rewards.len() == n_agents && step.dones.len() == n_agents,
                "expected {n_agents} rewards and done flags, got {} and {}",
                step.rewards.len(),
                step.dones.len(),
            );

            let next_state = step.observations.to_device(&self.device)?;
            let reward = Tensor::from_vec(step.rewards.clone(), (n_agents, 1), &self.device)?;
            let done = Tensor::from_vec(
                step.dones
                    .iter()
                    .map(|&d| if d { 1.0 } else { 0.0 })
                    .collect::<Vec<f64>>(),
                (n_agents, 1),
                &self.device,
            )?;

            self.agent.step(&state, &action, &reward, &next_state, &done)?;
            state = next_state;

            returns
                .iter_mut()
                .zip(&step.rewards)
                .for_each(|(total, reward)| *total += reward);

            if step.dones.iter().any(|&d| d) {
                break;
            }
        }

        Ok(returns.into_iter().fold(f64::NEG_INFINITY, f64::max))
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn agent(&self) -> &Agt {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut Agt {
        &mut self.agent
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn into_parts(self) -> (Env, Agt) {
        (self.env, self.agent)
    }
}
