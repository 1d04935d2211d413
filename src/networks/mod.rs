//! # Networks
//!
//! Function approximators used by the agents. A [`Network`] is a small
//! two-hidden-layer MLP that owns its parameters (in a [`VarMap`]) and the
//! optimizer that trains them, so that a local network and its target copy
//! can be updated independently.
//!
//! Target networks are synchronised with [`soft_update`]:
//!
//! $$ \theta_{target} \leftarrow \tau \theta_{local} + (1 - \tau) \theta_{target} $$
//!
//! The [`GaussianActor`] wraps a [`Network`] with a learned log standard
//! deviation and is used by the stochastic actor-critic agent.

mod gaussian;

pub use gaussian::GaussianActor;

use {
    crate::configs::NetworkConfig,
    candle_core::{
        backprop::GradStore,
        bail,
        DType,
        Device,
        Error,
        Module,
        Result,
        Tensor,
        Var,
    },
    candle_nn::{
        func,
        init::Init,
        linear,
        sequential::seq,
        Activation,
        AdamW,
        Optimizer,
        ParamsAdamW,
        Sequential,
        VarBuilder,
        VarMap,
    },
};

/// Name of the extra parameter holding the log standard deviation of a
/// Gaussian policy head.
pub const LOG_STD: &str = "log_std";

/// The activation applied to the output layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputActivation {
    /// Squash into [-1, 1], used by actors.
    Tanh,
    /// No activation, used by critics.
    Identity,
}

/// The shape of a network.
///
/// Two networks with the same architecture have the same parameter names and
/// shapes, which is what allows one to track the other.
#[derive(Debug, Clone, PartialEq)]
pub struct Architecture {
    pub dims: Vec<(usize, usize)>,
    pub output: OutputActivation,
    /// When set, an additional `log_std` parameter of size `output_size` is
    /// created with this initial value.
    pub log_std_init: Option<f64>,
}

impl Architecture {
    /// Actor mapping a state to an action in [-1, 1].
    pub fn actor(
        size_state: usize,
        size_action: usize,
        config: &NetworkConfig,
    ) -> Self {
        Self {
            dims: vec![
                (size_state, config.hidden_1_size),
                (config.hidden_1_size, config.hidden_2_size),
                (config.hidden_2_size, size_action),
            ],
            output: OutputActivation::Tanh,
            log_std_init: None,
        }
    }

    /// Critic mapping a concatenated state-action vector to a scalar value.
    pub fn critic(
        size_input: usize,
        config: &NetworkConfig,
    ) -> Self {
        Self {
            dims: vec![
                (size_input, config.hidden_1_size),
                (config.hidden_1_size, config.hidden_2_size),
                (config.hidden_2_size, 1),
            ],
            output: OutputActivation::Identity,
            log_std_init: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.dims.first().map(|&(i, _)| i).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.dims.last().map(|&(_, o)| o).unwrap_or(0)
    }
}

/// A differentiable function approximator with an attached optimizer.
pub struct Network {
    varmap: VarMap,
    layers: Sequential,
    log_std: Option<Tensor>,
    architecture: Architecture,
    optim: AdamW,
    params: ParamsAdamW,
    device: Device,
    training: bool,
}

impl Network {
    pub fn new(
        architecture: Architecture,
        config: &NetworkConfig,
        device: &Device,
    ) -> Result<Self> {
        let params = ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: config.weight_decay,
            ..Default::default()
        };
        Self::build(architecture, params, device)
    }

    fn build(
        architecture: Architecture,
        params: ParamsAdamW,
        device: &Device,
    ) -> Result<Self> {
        if architecture.dims.is_empty() {
            bail!("a network needs at least one layer")
        }
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F64, device);

        let n_layers = architecture.dims.len();
        let mut layers = seq();
        for (i, &(in_dim, out_dim)) in architecture.dims.iter().enumerate() {
            layers = layers.add(linear(in_dim, out_dim, vb.pp(format!("fc{i}")))?);
            if i + 1 < n_layers {
                layers = layers.add(Activation::Relu);
            }
        }
        if let OutputActivation::Tanh = architecture.output {
            layers = layers.add(func(|xs| xs.tanh()));
        }

        let log_std = match architecture.log_std_init {
            Some(init) => Some(vb.get_with_hints(
                architecture.output_size(),
                LOG_STD,
                Init::Const(init),
            )?),
            None => None,
        };

        let optim = AdamW::new(varmap.all_vars(), params.clone())?;

        Ok(Self {
            varmap,
            layers,
            log_std,
            architecture,
            optim,
            params,
            device: device.clone(),
            training: true,
        })
    }

    /// Create an independently trainable copy with identical parameter values.
    ///
    /// The copy gets a fresh optimizer with the same hyperparameters.
    pub fn try_clone(&self) -> Result<Self> {
        let copy = Self::build(
            self.architecture.clone(),
            self.params.clone(),
            &self.device,
        )?;
        hard_update(self, &copy)?;
        Ok(copy)
    }

    /// Evaluate the network.
    ///
    /// In evaluation mode the output is detached from the computation graph.
    pub fn forward(
        &self,
        xs: &Tensor,
    ) -> Result<Tensor> {
        let ys = self.layers.forward(xs)?;
        Ok(if self.training { ys } else { ys.detach() })
    }

    /// Switch to evaluation (inference) mode.
    pub fn eval(&mut self) {
        self.training = false;
    }

    /// Switch back to training mode.
    pub fn train(&mut self) {
        self.training = true;
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn log_std(&self) -> Option<&Tensor> {
        self.log_std.as_ref()
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn learning_rate(&self) -> f64 {
        self.params.lr
    }

    /// All trainable parameters, sorted by name.
    pub fn vars(&self) -> Result<Vec<Var>> {
        Ok(self
            .named_vars()?
            .into_iter()
            .map(|(_, var)| var)
            .collect())
    }

    /// All trainable parameters with their names, sorted by name.
    pub fn named_vars(&self) -> Result<Vec<(String, Var)>> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| Error::Msg("parameter map lock poisoned".to_owned()))?;
        let mut vars: Vec<(String, Var)> = data
            .iter()
            .map(|(name, var)| (name.clone(), var.clone()))
            .collect();
        vars.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(vars)
    }

    /// Backpropagate `loss` and take one optimizer step.
    pub fn backward_step(
        &mut self,
        loss: &Tensor,
    ) -> Result<()> {
        self.optim.backward_step(loss)
    }

    /// Backpropagate `loss`, rescale the gradients of this network's
    /// parameters so their global norm is at most `max_norm`, and take one
    /// optimizer step.
    ///
    /// Returns the gradient norm before clipping.
    pub fn clipped_backward_step(
        &mut self,
        loss: &Tensor,
        max_norm: f64,
    ) -> Result<f64> {
        let mut grads = loss.backward()?;
        let norm = clip_grad_norm(&mut grads, &self.vars()?, max_norm)?;
        self.optim.step(&grads)?;
        Ok(norm)
    }
}

/// Rescale the gradients of `vars` in place so their global L2 norm does not
/// exceed `max_norm`. Returns the norm before clipping.
pub fn clip_grad_norm(
    grads: &mut GradStore,
    vars: &[Var],
    max_norm: f64,
) -> Result<f64> {
    let mut total = 0.0;
    for var in vars {
        if let Some(grad) = grads.get(var) {
            total += grad
                .sqr()?
                .sum_all()?
                .to_dtype(DType::F64)?
                .to_scalar::<f64>()?;
        }
    }
    let norm = total.sqrt();

    let coef = max_norm / (norm + 1e-6);
    if coef < 1.0 {
        for var in vars {
            if let Some(grad) = grads.remove(var) {
                grads.insert(var, (grad * coef)?);
            }
        }
    }
    Ok(norm)
}

/// Blend the parameters of `target` toward those of `local`.
///
/// For every parameter: `target = tau * local + (1 - tau) * target`.
/// Parameters are matched by name; both networks must share an architecture.
pub fn soft_update(
    local: &Network,
    target: &Network,
    tau: f64,
) -> Result<()> {
    if local.architecture != target.architecture {
        bail!(
            "cannot track a network with a different architecture: {:?} vs {:?}",
            local.architecture,
            target.architecture,
        )
    }

    let local_vars = local.named_vars()?;
    let target_vars = target.named_vars()?;

    for ((local_name, local_var), (target_name, target_var)) in
        local_vars.iter().zip(target_vars.iter())
    {
        if local_name != target_name {
            bail!("parameter mismatch: {local_name} vs {target_name}")
        }
        let blended = ((tau * local_var.as_tensor())?
            + ((1.0 - tau) * target_var.as_tensor())?)?;
        target_var.set(&blended.detach())?;
    }
    Ok(())
}

/// Copy the parameters of `local` into `target`.
pub fn hard_update(
    local: &Network,
    target: &Network,
) -> Result<()> {
    soft_update(local, target, 1.0)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NetworkConfig {
        NetworkConfig {
            hidden_1_size: 8,
            hidden_2_size: 6,
            learning_rate: 1e-3,
            weight_decay: 0.0,
        }
    }

    fn values(network: &Network) -> Result<Vec<Vec<f64>>> {
        network
            .vars()?
            .iter()
            .map(|v| v.as_tensor().flatten_all()?.to_vec1::<f64>())
            .collect()
    }

    #[test]
    fn clone_has_identical_parameters_and_is_independent() -> Result<()> {
        let device = Device::Cpu;
        let mut local = Network::new(Architecture::actor(3, 2, &config()), &config(), &device)?;
        let target = local.try_clone()?;
        assert_eq!(values(&local)?, values(&target)?);

        let xs = Tensor::ones((4, 3), DType::F64, &device)?;
        let loss = local.forward(&xs)?.sum_all()?;
        local.backward_step(&loss)?;

        assert_ne!(values(&local)?, values(&target)?);
        Ok(())
    }

    #[test]
    fn soft_update_blends_parameters() -> Result<()> {
        let device = Device::Cpu;
        let arch = Architecture::critic(5, &config());
        for tau in [0.001, 0.3, 0.5, 1.0] {
            let local = Network::new(arch.clone(), &config(), &device)?;
            let target = Network::new(arch.clone(), &config(), &device)?;
            let before_local = values(&local)?;
            let before_target = values(&target)?;

            soft_update(&local, &target, tau)?;

            let after_target = values(&target)?;
            for ((l, t0), t1) in before_local.iter().zip(&before_target).zip(&after_target) {
                for ((l, t0), t1) in l.iter().zip(t0).zip(t1) {
                    let expected = tau * l + (1.0 - tau) * t0;
                    assert!((expected - t1).abs() < 1e-12);
                }
            }
            assert_eq!(values(&local)?, before_local);
        }
        Ok(())
    }

    #[test]
    fn soft_update_rejects_different_architectures() -> Result<()> {
        let device = Device::Cpu;
        let local = Network::new(Architecture::critic(5, &config()), &config(), &device)?;
        let target = Network::new(Architecture::critic(4, &config()), &config(), &device)?;
        assert!(soft_update(&local, &target, 0.5).is_err());
        Ok(())
    }

    #[test]
    fn eval_mode_detaches_output() -> Result<()> {
        let device = Device::Cpu;
        let mut network = Network::new(Architecture::actor(3, 2, &config()), &config(), &device)?;
        let xs = Tensor::ones((1, 3), DType::F64, &device)?;

        network.eval();
        assert!(!network.is_training());
        let grads = network.forward(&xs)?.sum_all()?.backward()?;
        for var in network.vars()? {
            assert!(grads.get(&var).is_none());
        }

        network.train();
        let grads = network.forward(&xs)?.sum_all()?.backward()?;
        assert!(network.vars()?.iter().any(|var| grads.get(var).is_some()));
        Ok(())
    }

    #[test]
    fn actor_output_is_squashed() -> Result<()> {
        let device = Device::Cpu;
        let network = Network::new(Architecture::actor(3, 2, &config()), &config(), &device)?;
        let xs = (Tensor::ones((2, 3), DType::F64, &device)? * 1e3)?;
        let ys = network.forward(&xs)?.flatten_all()?.to_vec1::<f64>()?;
        assert!(ys.iter().all(|y| (-1.0..=1.0).contains(y)));
        Ok(())
    }

    #[test]
    fn clip_grad_norm_bounds_the_norm() -> Result<()> {
        let device = Device::Cpu;
        let network = Network::new(Architecture::critic(3, &config()), &config(), &device)?;
        let xs = (Tensor::ones((4, 3), DType::F64, &device)? * 100.0)?;
        let loss = network.forward(&xs)?.sqr()?.sum_all()?;
        let mut grads = loss.backward()?;
        let vars = network.vars()?;

        let before = clip_grad_norm(&mut grads, &vars, 1.0)?;
        let after = clip_grad_norm(&mut grads, &vars, f64::INFINITY)?;

        assert!(before > 1.0);
        assert!(after <= 1.0 + 1e-6);
        Ok(())
    }
}
