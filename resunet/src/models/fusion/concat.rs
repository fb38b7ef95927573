//! # Concatenation Fusion
//!
//! Stacks audio and context along channels and mixes them with a 1x1
//! convolution back to the audio width.

use burn::prelude::*;
use burn_extra_ops::{Reinitialize, WeightInitConfig};

use crate::models::modules::{ConvBnRelu, ConvBnReluConfig};

/// Configuration for the `ConcatFusion` module.
#[derive(Config, Debug)]
pub struct ConcatFusionConfig {
    /// Channels of the audio map and of the output.
    dim: usize,
    /// Channels of the context map.
    context_dim: usize,
}

impl ConcatFusionConfig {
    /// Initializes a new `ConcatFusion` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ConcatFusion<B> {
        ConcatFusion {
            mix: ConvBnReluConfig::new(self.dim + self.context_dim, self.dim).init(device),
        }
    }
}

/// `[audio, context]` -> conv1x1 -> BN -> ReLU.
#[derive(Module, Debug)]
pub struct ConcatFusion<B: Backend> {
    mix: ConvBnRelu<B>,
}

impl<B: Backend> ConcatFusion<B> {
    /// Context and audio must share the same spatial size.
    pub fn forward(&self, context: Tensor<B, 4>, audio: Tensor<B, 4>) -> Tensor<B, 4> {
        self.mix.forward(Tensor::cat(vec![audio, context], 1))
    }
}

impl<B: Backend> Reinitialize<B> for ConcatFusion<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            mix: self.mix.reinitialize(init),
        }
    }
}
