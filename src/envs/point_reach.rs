use {
    super::{
        Environment,
        Step,
    },
    anyhow::{
        ensure,
        Result,
    },
    candle_core::{
        DType,
        Device,
        Tensor,
    },
    rand::{
        distributions::Uniform,
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
};

const SIZE_OBSERVATION: usize = 4;
const SIZE_ACTION: usize = 2;


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointReachConfig {
    // The number of points moving in the plane.
    pub num_agents: usize,
    // The number of steps after which every agent is done.
    pub timelimit: usize,
    // The distance covered by a full action in one step.
    pub step_size: f64,
    // An agent inside this radius around its goal collects the reward.
    pub goal_radius: f64,
    // The reward per step spent inside the goal radius.
    pub goal_reward: f64,
    pub seed: u64,
}
impl Default for PointReachConfig {
    fn default() -> Self {
        Self {
            num_agents: 2,
            timelimit: 50,
            step_size: 0.1,
            goal_radius: 0.2,
            goal_reward: 0.1,
            seed: 42,
        }
    }
}
impl PointReachConfig {
    pub fn single_agent() -> Self {
        Self {
            num_agents: 1,
            ..Default::default()
        }
    }
}

/// Points in the square [-1, 1]² that have to reach their own goal.
///
/// The observation of an agent is its position followed by the offset to its
/// goal. Actions are clamped to [-1, 1] and scaled by `step_size`; positions
/// are clamped to the square.
pub struct PointReach {
    config: PointReachConfig,
    rng: StdRng,
    positions: Vec<(f64, f64)>,
    goals: Vec<(f64, f64)>,
    steps: usize,
}

impl PointReach {
    fn observations(&self) -> Result<Tensor> {
        let data: Vec<f64> = self
            .positions
            .iter()
            .zip(&self.goals)
            .flat_map(|(&(x, y), &(gx, gy))| [x, y, gx - x, gy - y])
            .collect();
        Ok(Tensor::from_vec(
            data,
            (self.config.num_agents, SIZE_OBSERVATION),
            &Device::Cpu,
        )?)
    }

    fn random_point(&mut self) -> (f64, f64) {
        let domain = Uniform::new_inclusive(-1.0, 1.0);
        (self.rng.sample(domain), self.rng.sample(domain))
    }

    pub fn positions(&self) -> &[(f64, f64)] {
        &self.positions
    }

    pub fn goals(&self) -> &[(f64, f64)] {
        &self.goals
    }
}

impl Environment for PointReach {
    type Config = PointReachConfig;

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn new(config: Self::Config) -> Result<Box<Self>> {
        ensure!(config.num_agents > 0, "need at least one agent");
        ensure!(config.timelimit > 0, "the timelimit must be positive");
        Ok(Box::new(Self {
            rng: StdRng::seed_from_u64(config.seed),
            positions: vec![(0.0, 0.0); config.num_agents],
            goals: vec![(0.0, 0.0); config.num_agents],
            steps: 0,
            config,
        }))
    }

    /// Outside of train mode every agent starts at the origin.
    fn reset(
        &mut self,
        train_mode: bool,
    ) -> Result<Tensor> {
        self.steps = 0;
        for i in 0..self.config.num_agents {
            let goal = self.random_point();
            let start = if train_mode {
                self.random_point()
            } else {
                (0.0, 0.0)
            };
            self.goals[i] = goal;
            self.positions[i] = start;
        }
        self.observations()
    }

    fn step(
        &mut self,
        actions: &Tensor,
    ) -> Result<Step> {
        let actions = actions
            .to_device(&Device::Cpu)?
            .to_dtype(DType::F64)?
            .reshape((self.config.num_agents, SIZE_ACTION))?
            .to_vec2::<f64>()?;

        self.steps += 1;
        let done = self.steps >= self.config.timelimit;

        let mut rewards = Vec::with_capacity(self.config.num_agents);
        for (i, action) in actions.iter().enumerate() {
            let (x, y) = self.positions[i];
            let dx = action[0].clamp(-1.0, 1.0) * self.config.step_size;
            let dy = action[1].clamp(-1.0, 1.0) * self.config.step_size;
            let (x, y) = ((x + dx).clamp(-1.0, 1.0), (y + dy).clamp(-1.0, 1.0));
            self.positions[i] = (x, y);

            let (gx, gy) = self.goals[i];
            let distance = ((gx - x).powi(2) + (gy - y).powi(2)).sqrt();
            rewards.push(if distance < self.config.goal_radius {
                self.config.goal_reward
            } else {
                0.0
            });
        }

        Ok(Step {
            observations: self.observations()?,
            rewards,
            dones: vec![done; self.config.num_agents],
        })
    }

    fn num_agents(&self) -> usize {
        self.config.num_agents
    }

    fn observation_size(&self) -> usize {
        SIZE_OBSERVATION
    }

    fn action_size(&self) -> usize {
        SIZE_ACTION
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episodes_end_at_the_timelimit() -> Result<()> {
        let config = PointReachConfig { timelimit: 3, ..Default::default() };
        let mut env = *PointReach::new(config)?;
        let obs = env.reset(true)?;
        assert_eq!(obs.dims(), &[2, SIZE_OBSERVATION]);

        let actions = Tensor::zeros((2, SIZE_ACTION), DType::F64, &Device::Cpu)?;
        assert_eq!(env.step(&actions)?.dones, vec![false, false]);
        assert_eq!(env.step(&actions)?.dones, vec![false, false]);
        assert_eq!(env.step(&actions)?.dones, vec![true, true]);

        env.reset(true)?;
        assert_eq!(env.step(&actions)?.dones, vec![false, false]);
        Ok(())
    }

    #[test]
    fn reaching_the_goal_is_rewarded() -> Result<()> {
        let mut env = *PointReach::new(PointReachConfig::single_agent())?;
        env.reset(false)?;
        env.goals[0] = (0.05, 0.0);

        let actions = Tensor::new(&[[0.5f64, 0.0]], &Device::Cpu)?;
        let step = env.step(&actions)?;
        assert_eq!(step.rewards, vec![0.1]);
        assert_eq!(env.positions()[0], (0.05, 0.0));

        let observation = step.observations.to_vec2::<f64>()?;
        assert_eq!(observation[0], vec![0.05, 0.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn positions_stay_in_the_square() -> Result<()> {
        let mut env = *PointReach::new(PointReachConfig::default())?;
        env.reset(true)?;
        let actions = Tensor::full(10.0f64, (2, SIZE_ACTION), &Device::Cpu)?;
        for _ in 0..40 {
            env.step(&actions)?;
        }
        assert!(env.positions().iter().all(|&(x, y)| x == 1.0 && y == 1.0));
        Ok(())
    }

    #[test]
    fn same_seed_same_goals() -> Result<()> {
        let mut a = *PointReach::new(PointReachConfig::default())?;
        let mut b = *PointReach::new(PointReachConfig::default())?;
        a.reset(true)?;
        b.reset(true)?;
        assert_eq!(a.goals(), b.goals());
        Ok(())
    }
}
