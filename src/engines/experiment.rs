use {
    super::Trainer,
    crate::{
        agents::OffPolicyAgent,
        configs::AgentConfig,
        envs::Environment,
        util::{
            write_config,
            write_scores,
        },
    },
    anyhow::{
        anyhow,
        Result,
    },
    serde::Serialize,
    std::{
        fs::create_dir_all,
        path::Path,
    },
    tracing::warn,
};

/// Run a training experiment and persist it.
///
/// The agent, training and environment configs are written as RON files into
/// `path` before training starts, the score history as `scores.parquet`
/// once it is done.
///
/// # Arguments
///
/// * `path` - The directory where the collected data will be stored.
/// * `trainer` - The environment and agent to train, with their training config.
/// * `agent_config` - The configuration the agent was built from.
pub fn run_experiment<Env, Agt>(
    path: &dyn AsRef<Path>,
    trainer: &mut Trainer<Env, Agt>,
    agent_config: &AgentConfig,
) -> Result<Vec<f64>>
where
    Env: Environment,
    Env::Config: Serialize,
    Agt: OffPolicyAgent,
{
    let path = path.as_ref();

    let agent_config_exists = path.join("config_agent.ron").try_exists()?;
    let env_config_exists = path.join("config_environment.ron").try_exists()?;
    let scores_exist = path.join("scores.parquet").try_exists()?;
    if agent_config_exists || env_config_exists || scores_exist {
        Err(anyhow!(concat!(
            "Run data already exists in this directory!\n",
            "I am assuming I would be overwriting existing data!",
        )))?
    }

    create_dir_all(path)?;
    write_config(agent_config, path.join("config_agent.ron"))?;
    write_config(trainer.config(), path.join("config_training.ron"))?;
    write_config(trainer.env().config(), path.join("config_environment.ron"))?;

    warn!("Collecting data into {}", path.display());
    let scores = trainer.train()?;

    write_scores(&scores, path.join("scores.parquet"))?;
    Ok(scores)
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            agents::{
                Agent,
                DeterministicActorCritic,
            },
            configs::TrainConfig,
            envs::{
                PointReach,
                PointReachConfig,
            },
            util::read_config,
        },
        candle_core::Device,
        std::{
            env::temp_dir,
            fs::remove_dir_all,
        },
    };

    #[test]
    fn writes_configs_and_scores_and_refuses_to_overwrite() -> Result<()> {
        let path = temp_dir().join("collab_rl_experiment_run");
        if path.try_exists()? {
            remove_dir_all(&path)?;
        }

        let device = Device::Cpu;
        let env_config = PointReachConfig {
            timelimit: 5,
            ..PointReachConfig::single_agent()
        };
        let env = *PointReach::new(env_config.clone())?;
        let agent_config = AgentConfig::point_reach();
        let strategy = DeterministicActorCritic::from_config(
            &device,
            &agent_config,
            env.observation_size(),
            env.action_size(),
        )?;
        let agent = Agent::from_config(&device, &agent_config, strategy, 1, env.action_size())?;
        let mut trainer = Trainer::new(env, agent, TrainConfig::new(3), &device);

        let scores = run_experiment(&path, &mut trainer, &agent_config)?;
        assert_eq!(scores.len(), 3);

        let written: PointReachConfig = read_config(path.join("config_environment.ron"))?;
        assert_eq!(written, env_config);
        let written: AgentConfig = read_config(path.join("config_agent.ron"))?;
        assert_eq!(written, agent_config);
        let written: TrainConfig = read_config(path.join("config_training.ron"))?;
        assert_eq!(&written, trainer.config());
        assert!(path.join("scores.parquet").try_exists()?);

        assert!(run_experiment(&path, &mut trainer, &agent_config).is_err());
        Ok(())
    }
}
