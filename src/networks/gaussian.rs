use {
    super::{
        Architecture,
        Network,
    },
    crate::configs::NetworkConfig,
    candle_core::{
        bail,
        Device,
        Result,
        Tensor,
        D,
    },
};

const LOG_STD_MIN: f64 = -20.0;
const LOG_STD_MAX: f64 = 2.0;

/// Stochastic policy with a diagonal Gaussian over actions.
///
/// The mean is produced by a tanh-squashed MLP, the log standard deviation is
/// a state-independent learned parameter stored alongside the MLP weights, so
/// that cloning and soft updates cover it as well.
pub struct GaussianActor {
    network: Network,
}

impl GaussianActor {
    pub fn new(
        size_state: usize,
        size_action: usize,
        log_std_init: f64,
        config: &NetworkConfig,
        device: &Device,
    ) -> Result<Self> {
        let mut architecture = Architecture::actor(size_state, size_action, config);
        architecture.log_std_init = Some(log_std_init);
        Self::from_network(Network::new(architecture, config, device)?)
    }

    pub fn from_network(network: Network) -> Result<Self> {
        if network.log_std().is_none() {
            bail!("a Gaussian actor needs a network with a log_std parameter")
        }
        Ok(Self { network })
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            network: self.network.try_clone()?,
        })
    }

    /// The mean action for the given states.
    pub fn forward(
        &self,
        states: &Tensor,
    ) -> Result<Tensor> {
        self.network.forward(states)
    }

    /// Sample actions and return them with their log-probabilities.
    ///
    /// The sampled actions are detached; the log-probabilities (shape
    /// `(batch, 1)`) carry gradients into the mean and log-std parameters.
    pub fn act(
        &self,
        states: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        let mean = self.network.forward(states)?;
        let log_std = self.log_std()?.clamp(LOG_STD_MIN, LOG_STD_MAX)?;
        let std = log_std.exp()?;

        let noise = mean.randn_like(0.0, 1.0)?;
        let actions = (mean.detach() + noise.broadcast_mul(&std.detach())?)?.detach();

        let log_probs = log_prob(&actions, &mean, &log_std)?;
        Ok((actions, log_probs))
    }

    fn log_std(&self) -> Result<&Tensor> {
        match self.network.log_std() {
            Some(log_std) => Ok(log_std),
            None => bail!("missing log_std parameter"),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }
}

/// Log-density of `actions` under a diagonal Gaussian, summed over the action
/// dimension and kept as a `(batch, 1)` column.
fn log_prob(
    actions: &Tensor,
    mean: &Tensor,
    log_std: &Tensor,
) -> Result<Tensor> {
    let z = (actions - mean)?.broadcast_div(&log_std.exp()?)?;
    let per_dim = ((z.sqr()? * -0.5)?
        .broadcast_sub(log_std)?
        - 0.5 * (2.0 * std::f64::consts::PI).ln())?;
    per_dim.sum_keepdim(D::Minus1)
}
