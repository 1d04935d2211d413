use {
    super::{
        LearnParams,
        LearningStrategy,
        OffPolicyAgent,
        RunMode,
    },
    crate::{
        components::{
            Batch,
            Memory,
            Noise,
            OuNoise,
            ReplayBuffer,
            Transition,
        },
        configs::AgentConfig,
    },
    candle_core::{
        Device,
        Result,
        Tensor,
    },
    tracing::{
        debug,
        info,
    },
};

/// Interacts with and learns from the environment.
///
/// The agent owns the replay memory and the noise process and drives the
/// learning cadence; the network updates are done by the strategy `S`.
pub struct Agent<S, M = ReplayBuffer, N = OuNoise> {
    strategy: S,
    memory: M,
    noise: N,

    gamma: f64,
    tau: f64,
    batch_size: usize,
    update_every: usize,
    t_step: usize,
    n_updates: usize,
    run_mode: RunMode,
}

impl<S, M, N> Agent<S, M, N>
where
    S: LearningStrategy,
    M: Memory,
    N: Noise,
{
    pub fn new(
        config: &AgentConfig,
        strategy: S,
        memory: M,
        noise: N,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            strategy,
            memory,
            noise,
            gamma: config.gamma,
            tau: config.tau,
            batch_size: config.batch_size,
            update_every: config.update_every,
            t_step: 0,
            n_updates: 0,
            run_mode: RunMode::Train,
        })
    }

    /// Run one learning update on `batch`.
    pub fn learn(
        &mut self,
        batch: &Batch,
    ) -> Result<()> {
        let params = LearnParams {
            gamma: self.gamma,
            tau: self.tau,
        };
        self.strategy.learn(batch, &params)?;
        self.n_updates += 1;
        info!("Learning update {} done", self.n_updates);
        Ok(())
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn t_step(&self) -> usize {
        self.t_step
    }

    /// The number of learning updates performed so far.
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn set_run_mode(&mut self, mode: RunMode) {
        self.run_mode = mode;
    }
}

impl<S: LearningStrategy> Agent<S, ReplayBuffer, OuNoise> {
    /// Create an agent with a [`ReplayBuffer`] and an [`OuNoise`] process
    /// covering `n_agents * size_action` action components.
    pub fn from_config(
        device: &Device,
        config: &AgentConfig,
        strategy: S,
        n_agents: usize,
        size_action: usize,
    ) -> anyhow::Result<Self> {
        let memory = ReplayBuffer::new(config.replay_buffer_capacity, config.batch_size);
        let noise = OuNoise::new(
            config.ou_mu,
            config.ou_theta,
            config.ou_sigma,
            n_agents * size_action,
            device,
        )?;
        Self::new(config, strategy, memory, noise)
    }
}

impl<S, M, N> OffPolicyAgent for Agent<S, M, N>
where
    S: LearningStrategy,
    M: Memory,
    N: Noise,
{
    fn act(
        &mut self,
        state: &Tensor,
    ) -> Result<Tensor> {
        let actions = self.strategy.policy_actions(state)?;
        let actions = match self.run_mode {
            RunMode::Train => {
                let noise = self.noise.sample()?.reshape(actions.dims())?;
                (actions + noise)?
            }
            RunMode::Test => actions,
        };
        actions.clamp(-1.0, 1.0)
    }

    fn step(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        done: &Tensor,
    ) -> Result<()> {
        self.memory
            .add(Transition::new(state, action, reward, next_state, done));

        self.t_step = (self.t_step + 1) % self.update_every;
        if self.t_step == 0
            && self.run_mode == RunMode::Train
            && self.memory.len() > self.batch_size
        {
            debug!("Sampling a batch from {} transitions", self.memory.len());
            let batch = self.memory.sample()?;
            self.learn(&batch)?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.noise.reset()
    }
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        candle_core::DType,
        std::{
            cell::Cell,
            rc::Rc,
        },
    };

    /// Counts learning updates and returns actions far outside [-1, 1].
    struct CountingStrategy {
        learns: Rc<Cell<usize>>,
        size_action: usize,
    }
    impl LearningStrategy for CountingStrategy {
        fn policy_actions(&mut self, states: &Tensor) -> Result<Tensor> {
            let n_agents = states.dim(0)?;
            Tensor::full(5.0f64, (n_agents, self.size_action), states.device())
        }

        fn learn(&mut self, _batch: &Batch, _params: &LearnParams) -> Result<()> {
            self.learns.set(self.learns.get() + 1);
            Ok(())
        }
    }

    /// Only counts; sampling hands back an empty placeholder batch.
    struct CountingMemory {
        len: usize,
        samples: Rc<Cell<usize>>,
    }
    impl Memory for CountingMemory {
        fn add(&mut self, _transition: Transition) {
            self.len += 1;
        }

        fn sample(&mut self) -> Result<Batch> {
            self.samples.set(self.samples.get() + 1);
            let empty = Tensor::zeros((1, 0, 1), DType::F64, &Device::Cpu)?;
            Ok(Batch {
                states: empty.clone(),
                actions: empty.clone(),
                rewards: empty.clone(),
                next_states: empty.clone(),
                dones: empty,
            })
        }

        fn len(&self) -> usize {
            self.len
        }
    }

    struct ConstantNoise {
        value: f64,
        size: usize,
        resets: usize,
    }
    impl Noise for ConstantNoise {
        fn sample(&mut self) -> Result<Tensor> {
            Tensor::full(self.value, self.size, &Device::Cpu)
        }

        fn reset(&mut self) -> Result<()> {
            self.resets += 1;
            Ok(())
        }
    }

    type TestAgent = Agent<CountingStrategy, CountingMemory, ConstantNoise>;

    fn agent(
        batch_size: usize,
        update_every: usize,
        noise: f64,
    ) -> anyhow::Result<(TestAgent, Rc<Cell<usize>>, Rc<Cell<usize>>)> {
        let learns = Rc::new(Cell::new(0));
        let samples = Rc::new(Cell::new(0));
        let config = AgentConfig {
            batch_size,
            update_every,
            replay_buffer_capacity: 1_000,
            ..Default::default()
        };
        let agent = Agent::new(
            &config,
            CountingStrategy { learns: learns.clone(), size_action: 2 },
            CountingMemory { len: 0, samples: samples.clone() },
            ConstantNoise { value: noise, size: 4, resets: 0 },
        )?;
        Ok((agent, learns, samples))
    }

    fn step_once(agent: &mut TestAgent) -> Result<()> {
        let device = Device::Cpu;
        let s = Tensor::zeros((2, 3), DType::F64, &device)?;
        let a = Tensor::zeros((2, 2), DType::F64, &device)?;
        let r = Tensor::zeros((2, 1), DType::F64, &device)?;
        agent.step(&s, &a, &r, &s, &r)
    }

    #[test]
    fn learns_once_every_update_every_steps() -> anyhow::Result<()> {
        let (mut agent, learns, samples) = agent(4, 3, 0.0)?;
        let mut expected = 0;
        for i in 1..=30 {
            step_once(&mut agent)?;
            if i % 3 == 0 && i > 4 {
                expected += 1;
            }
            assert_eq!(learns.get(), expected, "after step {i}");
            assert_eq!(agent.t_step(), i % 3);
        }
        assert_eq!(samples.get(), expected);
        assert_eq!(agent.n_updates(), expected);
        Ok(())
    }

    #[test]
    fn never_learns_without_enough_transitions() -> anyhow::Result<()> {
        let (mut agent, learns, _) = agent(100, 1, 0.0)?;
        for _ in 0..100 {
            step_once(&mut agent)?;
        }
        assert_eq!(learns.get(), 0);

        // the memory now holds exactly batch_size, one more tips it over
        step_once(&mut agent)?;
        assert_eq!(learns.get(), 1);
        Ok(())
    }

    #[test]
    fn test_mode_does_not_learn() -> anyhow::Result<()> {
        let (mut agent, learns, _) = agent(1, 1, 0.0)?;
        agent.set_run_mode(RunMode::Test);
        for _ in 0..10 {
            step_once(&mut agent)?;
        }
        assert_eq!(learns.get(), 0);
        assert_eq!(agent.memory().len(), 10);
        Ok(())
    }

    #[test]
    fn actions_are_clamped_whatever_the_noise() -> anyhow::Result<()> {
        let state = Tensor::zeros((2, 3), DType::F64, &Device::Cpu)?;
        for noise in [-1e6, -3.0, 0.0, 0.5, 1e6] {
            let (mut agent, _, _) = agent(4, 1, noise)?;
            let actions = agent.act(&state)?;
            assert_eq!(actions.dims(), &[2, 2]);
            for a in actions.flatten_all()?.to_vec1::<f64>()? {
                assert!((-1.0..=1.0).contains(&a), "{a} out of range");
            }
        }
        Ok(())
    }

    #[test]
    fn mismatched_noise_size_is_an_error() -> anyhow::Result<()> {
        let (mut agent, _, _) = agent(4, 1, 0.0)?;
        let state = Tensor::zeros((3, 3), DType::F64, &Device::Cpu)?;
        assert!(agent.act(&state).is_err());
        Ok(())
    }

    #[test]
    fn reset_resets_the_noise() -> anyhow::Result<()> {
        let (mut agent, _, _) = agent(4, 1, 0.0)?;
        agent.reset()?;
        agent.reset()?;
        assert_eq!(agent.noise.resets, 2);
        Ok(())
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AgentConfig { tau: 0.0, ..Default::default() };
        let result = Agent::new(
            &config,
            CountingStrategy { learns: Default::default(), size_action: 2 },
            CountingMemory { len: 0, samples: Default::default() },
            ConstantNoise { value: 0.0, size: 4, resets: 0 },
        );
        assert!(result.is_err());
    }
}
