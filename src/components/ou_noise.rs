use {
    super::Noise,
    candle_core::{
        DType,
        Device,
        Result,
        Tensor,
    },
};

/// Ornstein-Uhlenbeck process.
///
/// `dx = theta * (mu - x) + sigma * N(0, 1)`
pub struct OuNoise {
    mu: f64,
    theta: f64,
    sigma: f64,
    state: Tensor,
}
impl OuNoise {
    pub fn new(
        mu: f64,
        theta: f64,
        sigma: f64,
        size: usize,
        device: &Device,
    ) -> Result<Self> {
        Ok(Self {
            mu,
            theta,
            sigma,
            state: (Tensor::ones(size, DType::F64, device)? * mu)?,
        })
    }

    pub fn size(&self) -> usize {
        self.state.elem_count()
    }
}

impl Noise for OuNoise {
    fn sample(&mut self) -> Result<Tensor> {
        let rand = Tensor::randn_like(&self.state, 0.0, 1.0)?;
        let dx = ((self.theta * (self.mu - &self.state)?)? + (self.sigma * rand)?)?;
        self.state = (&self.state + dx)?;
        Ok(self.state.clone())
    }

    fn reset(&mut self) -> Result<()> {
        self.state = (self.state.ones_like()? * self.mu)?;
        Ok(())
    }
}
