//! # Parameter Re-initialization
//!
//! Resets the learnable parameters of a module tree from fixed-variance
//! normal distributions. Each supported layer kind implements
//! [`Reinitialize`] explicitly; composite modules implement it by delegating
//! to their children, so there is no name-based dispatch.
//!
//! | layer kind | weight | bias |
//! |---|---|---|
//! | `Conv2d`, `ConvTranspose2d`, `Linear` | `N(mean, std)` | unchanged |
//! | `BatchNorm` | `N(norm_mean, std)` | `0` |
//!
//! Layers without an implementation (layer norms, activations, pooling)
//! keep their construction-time values.

use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, ConvTranspose2d},
        BatchNorm, Linear,
    },
    prelude::*,
    tensor::Distribution,
};

/// Distribution parameters used by [`Reinitialize`].
#[derive(Config, Debug)]
pub struct WeightInitConfig {
    /// Mean of the convolution and linear weight distribution.
    #[config(default = "0.0")]
    pub mean: f64,
    /// Standard deviation shared by every sampled parameter.
    #[config(default = "0.02")]
    pub std: f64,
    /// Mean of the normalization scale distribution.
    #[config(default = "1.0")]
    pub norm_mean: f64,
}

impl WeightInitConfig {
    /// Re-samples `param` in place, keeping its `ParamId`.
    fn sample<B: Backend, const D: usize>(
        &self,
        param: Param<Tensor<B, D>>,
        mean: f64,
    ) -> Param<Tensor<B, D>> {
        param.map(|tensor| tensor.random_like(Distribution::Normal(mean, self.std)))
    }
}

/// A module whose parameters can be re-sampled by a [`WeightInitConfig`].
///
/// Modules are consumed and returned, matching Burn's value semantics for
/// module updates.
pub trait Reinitialize<B: Backend>: Sized {
    /// Returns the module with its parameters re-sampled.
    fn reinitialize(self, init: &WeightInitConfig) -> Self;
}

impl<B: Backend> Reinitialize<B> for Conv2d<B> {
    fn reinitialize(mut self, init: &WeightInitConfig) -> Self {
        self.weight = init.sample(self.weight, init.mean);
        self
    }
}

impl<B: Backend> Reinitialize<B> for ConvTranspose2d<B> {
    fn reinitialize(mut self, init: &WeightInitConfig) -> Self {
        self.weight = init.sample(self.weight, init.mean);
        self
    }
}

impl<B: Backend> Reinitialize<B> for Linear<B> {
    fn reinitialize(mut self, init: &WeightInitConfig) -> Self {
        self.weight = init.sample(self.weight, init.mean);
        self
    }
}

impl<B: Backend> Reinitialize<B> for BatchNorm<B, 2> {
    fn reinitialize(mut self, init: &WeightInitConfig) -> Self {
        self.gamma = init.sample(self.gamma, init.norm_mean);
        self.beta = self.beta.map(|beta| beta.zeros_like());
        self
    }
}

impl<B: Backend, M: Reinitialize<B>> Reinitialize<B> for Option<M> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        self.map(|module| module.reinitialize(init))
    }
}

impl<B: Backend, M: Reinitialize<B>> Reinitialize<B> for Vec<M> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        self.into_iter()
            .map(|module| module.reinitialize(init))
            .collect()
    }
}
