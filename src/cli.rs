use {
    crate::{
        agents::{
            Agent,
            DeterministicActorCritic,
            LearningStrategy,
            MultiAgentDeterministicActorCritic,
            StochasticActorCritic,
        },
        configs::{
            AgentConfig,
            TrainConfig,
        },
        engines::{
            run_experiment,
            Trainer,
        },
        envs::{
            Environment,
            PointReach,
            PointReachConfig,
        },
        logging::setup_logging,
        util::{
            read_config,
            rolling_mean,
        },
    },
    anyhow::Result,
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    std::path::{
        Path,
        PathBuf,
    },
    strum::Display,
    tracing::{
        warn,
        Level,
    },
};


#[derive(ValueEnum, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum AgentKind {
    Deterministic,
    Stochastic,
    Multi,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // learning updates
    Debug, // every episode and every update
    None,  // don't log anything
}
impl Loglevel {
    pub fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::Debug => Some(Level::DEBUG),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run on CPU rather than on GPU.
    #[arg(long)]
    pub cpu: bool,

    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::Warn)]
    pub log: Loglevel,

    /// The learning strategy of the agent.
    #[arg(long, value_enum, default_value_t=AgentKind::Multi)]
    pub agent: AgentKind,

    /// Override the maximum number of training episodes.
    #[arg(long)]
    pub episodes: Option<usize>,

    /// Read the agent config from this RON file instead of using the preset.
    #[arg(long)]
    pub agent_config: Option<PathBuf>,

    /// Read the training config from this RON file instead of the defaults.
    #[arg(long)]
    pub train_config: Option<PathBuf>,

    /// Directory to write the configs and scores to, `data/<agent>` by default.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Set up logging and the device, build the environment and the requested
/// agent, and run one experiment.
pub fn run(args: Args) -> Result<()> {
    if let Some(level) = args.log.level() {
        setup_logging(Some(Path::new("debug.log")), level, level)?;
    }

    let device = if args.cpu {
        Device::Cpu
    } else {
        Device::cuda_if_available(0)?
    };

    let agent_config = match &args.agent_config {
        Some(path) => read_config(path)?,
        None => AgentConfig::point_reach(),
    };
    let mut train_config: TrainConfig = match &args.train_config {
        Some(path) => read_config(path)?,
        None => TrainConfig::default(),
    };
    if let Some(episodes) = args.episodes {
        train_config.set_max_episodes(episodes);
    }
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| Path::new("data").join(args.agent.to_string()));

    let env_config = match args.agent {
        AgentKind::Multi => PointReachConfig::default(),
        AgentKind::Deterministic | AgentKind::Stochastic => PointReachConfig::single_agent(),
    };
    let env = *PointReach::new(env_config)?;
    let (size_state, size_action) = (env.observation_size(), env.action_size());

    match args.agent {
        AgentKind::Deterministic => {
            let strategy =
                DeterministicActorCritic::from_config(&device, &agent_config, size_state, size_action)?;
            train(&output, env, strategy, agent_config, train_config, &device)
        }
        AgentKind::Stochastic => {
            let strategy =
                StochasticActorCritic::from_config(&device, &agent_config, size_state, size_action)?;
            train(&output, env, strategy, agent_config, train_config, &device)
        }
        AgentKind::Multi => {
            let strategy = MultiAgentDeterministicActorCritic::from_config(
                &device,
                &agent_config,
                env.num_agents(),
                size_state,
                size_action,
            )?;
            train(&output, env, strategy, agent_config, train_config, &device)
        }
    }
}

fn train<S: LearningStrategy>(
    output: &Path,
    env: PointReach,
    strategy: S,
    agent_config: AgentConfig,
    train_config: TrainConfig,
    device: &Device,
) -> Result<()> {
    let agent = Agent::from_config(
        device,
        &agent_config,
        strategy,
        env.num_agents(),
        env.action_size(),
    )?;
    let mut trainer = Trainer::new(env, agent, train_config, device);
    let scores = run_experiment(&output, &mut trainer, &agent_config)?;

    warn!(
        "Finished after {} episodes and {} updates, last average score {:.3}",
        scores.len(),
        trainer.agent().n_updates(),
        rolling_mean(&scores, trainer.config().solve_window()),
    );
    Ok(())
}
