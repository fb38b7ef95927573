//! # Resunet Encoder
//!
//! A full-resolution double-convolution stem followed by four residual
//! stages. The encoder keeps every intermediate map for the decoder's skip
//! connections.

use burn::prelude::*;
use burn_extra_ops::{Reinitialize, WeightInitConfig};
use resnet::ResNetStages;

use super::modules::{DoubleConv, DoubleConvConfig};
use crate::config::EncoderConfig;

impl EncoderConfig {
    /// Initializes an `Encoder` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Encoder<B> {
        let stem = DoubleConvConfig::new(self.in_channels, self.base_channels).init(device);
        let stages = ResNetStages::new(
            self.num_blocks,
            self.base_channels,
            self.stage_channels,
            self.block.is_bottleneck(),
            device,
        );

        Encoder {
            in_channels: self.in_channels,
            stem,
            stages,
        }
    }
}

/// ResNet-style encoder producing a five-level feature pyramid.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    /// Channels expected on the input signal.
    in_channels: usize,
    stem: DoubleConv<B>,
    stages: ResNetStages<B>,
}

impl<B: Backend> Encoder<B> {
    /// Channels expected on the input signal.
    pub const fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Returns `[x1, x2, x3, x4, x5]`, finest first. `x1` has the input's
    /// resolution and every following map halves it.
    pub fn forward(&self, x: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        let x1 = self.stem.forward(x);
        let [x2, x3, x4, x5] = self.stages.forward(x1.clone());

        [x1, x2, x3, x4, x5]
    }
}

impl<B: Backend> Reinitialize<B> for Encoder<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            in_channels: self.in_channels,
            stem: self.stem.reinitialize(init),
            stages: self.stages.reinitialize(init),
        }
    }
}
