use {
    anyhow::{
        ensure,
        Result,
    },
    serde::{
        Deserialize,
        Serialize,
    },
};


/// Hyperparameters of a single function approximator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    // The number of neurons in the two hidden layers.
    pub hidden_1_size: usize,
    pub hidden_2_size: usize,
    // The learning rate of the attached optimizer.
    pub learning_rate: f64,
    // Decoupled weight decay of the optimizer, zero gives plain Adam.
    pub weight_decay: f64,
}
impl NetworkConfig {
    pub fn new(
        hidden_1_size: usize,
        hidden_2_size: usize,
        learning_rate: f64,
    ) -> Self {
        Self {
            hidden_1_size,
            hidden_2_size,
            learning_rate,
            weight_decay: 0.0,
        }
    }
}


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    // The impact of the q value of the next state on the current state's q value.
    pub gamma: f64,
    // The weight for updating the target networks.
    pub tau: f64,
    // The training batch size for each learning update.
    pub batch_size: usize,
    // The number of environment steps between two learning updates.
    pub update_every: usize,
    // The capacity of the replay buffer used for sampling training data.
    pub replay_buffer_capacity: usize,
    // The Actor and Critic networks.
    pub actor: NetworkConfig,
    pub critic: NetworkConfig,
    // Initial log standard deviation of the stochastic actor.
    pub log_std_init: f64,
    // Ornstein-Uhlenbeck process parameters.
    pub ou_mu: f64,
    pub ou_theta: f64,
    pub ou_sigma: f64,
}
impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            tau: 1e-3,
            batch_size: 128,
            update_every: 1,
            replay_buffer_capacity: 100_000,
            actor: NetworkConfig::new(256, 128, 1e-4),
            critic: NetworkConfig::new(256, 128, 1e-3),
            log_std_init: -0.5,
            ou_mu: 0.0,
            ou_theta: 0.15,
            ou_sigma: 0.2,
        }
    }
}
impl AgentConfig {
    /// Two cooperating/competing agents, as in the tennis task.
    pub fn tennis() -> Self {
        Self {
            gamma: 0.99,
            tau: 2e-3,
            batch_size: 256,
            update_every: 2,
            replay_buffer_capacity: 100_000,
            actor: NetworkConfig::new(256, 128, 1e-4),
            critic: NetworkConfig::new(256, 128, 3e-4),
            log_std_init: -0.5,
            ou_mu: 0.0,
            ou_theta: 0.15,
            ou_sigma: 0.1,
        }
    }

    pub fn point_reach() -> Self {
        Self {
            gamma: 0.95,
            tau: 5e-3,
            batch_size: 64,
            update_every: 4,
            replay_buffer_capacity: 20_000,
            actor: NetworkConfig::new(64, 64, 1e-3),
            critic: NetworkConfig::new(64, 64, 1e-3),
            log_std_init: -0.5,
            ou_mu: 0.0,
            ou_theta: 0.15,
            ou_sigma: 0.2,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.gamma),
            "gamma must lie in [0, 1], got {}",
            self.gamma,
        );
        ensure!(
            self.tau > 0.0 && self.tau <= 1.0,
            "tau must lie in (0, 1], got {}",
            self.tau,
        );
        ensure!(self.batch_size > 0, "batch size must be positive");
        ensure!(self.update_every > 0, "update_every must be positive");
        ensure!(
            self.replay_buffer_capacity > self.batch_size,
            "replay buffer capacity ({}) must exceed the batch size ({}), otherwise learning never starts",
            self.replay_buffer_capacity,
            self.batch_size,
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert!(AgentConfig::default().validate().is_ok());
        assert!(AgentConfig::tennis().validate().is_ok());
        assert!(AgentConfig::point_reach().validate().is_ok());
    }

    #[test]
    fn tau_outside_unit_interval_is_rejected() {
        for tau in [0.0, -0.1, 1.5] {
            let config = AgentConfig { tau, ..Default::default() };
            assert!(config.validate().is_err());
        }
        let config = AgentConfig { tau: 1.0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn capacity_must_hold_a_batch() {
        let config = AgentConfig {
            batch_size: 64,
            replay_buffer_capacity: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // learning needs strictly more stored transitions than a batch
        let config = AgentConfig {
            batch_size: 64,
            replay_buffer_capacity: 64,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AgentConfig {
            batch_size: 64,
            replay_buffer_capacity: 65,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ron_round_trip_keeps_values() -> Result<()> {
        let config = AgentConfig::tennis();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default())?;
        let parsed: AgentConfig = ron::from_str(&text)?;
        assert_eq!(parsed, config);
        Ok(())
    }
}
