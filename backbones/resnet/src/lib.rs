//! ResNet residual stages for the Resunet encoder.
//!
//! This crate provides the residual half of the Resunet encoder: four stages
//! of residual blocks, each halving the spatial resolution and changing the
//! channel depth. The full-resolution stem lives with the rest of the model
//! because it shares its double-convolution block with the decoder.

use burn::prelude::*;
use burn_extra_ops::{Reinitialize, WeightInitConfig};

mod blocks;
pub use blocks::*;

/// Default number of residual blocks per stage ("resunet middle").
pub const RESUNET_MIDDLE_BLOCKS: [usize; 4] = [2, 2, 2, 2];

/// Default output channels of the four stages.
pub const RESUNET_STAGE_CHANNELS: [usize; 4] = [128, 256, 512, 512];

/// Four residual stages of a ResNet encoder.
///
/// Each stage downsamples by 2 in its first block. Given an input of
/// `[B, C, H, W]` the stages return maps at `1/2`, `1/4`, `1/8` and `1/16`
/// of the input resolution.
#[derive(Module, Debug)]
pub struct ResNetStages<B: Backend> {
    pub layer1: LayerBlock<B>,
    pub layer2: LayerBlock<B>,
    pub layer3: LayerBlock<B>,
    pub layer4: LayerBlock<B>,
}

impl<B: Backend> ResNetStages<B> {
    /// Forward pass that returns the output of every stage, finest first.
    pub fn forward(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 4] {
        let x1 = self.layer1.forward(input);
        let x2 = self.layer2.forward(x1.clone());
        let x3 = self.layer3.forward(x2.clone());
        let x4 = self.layer4.forward(x3.clone());

        [x1, x2, x3, x4]
    }

    /// Create the four stages.
    ///
    /// * `blocks` - number of residual blocks per stage.
    /// * `in_channels` - channel count of the stem output fed to the first stage.
    /// * `channels` - output channel count of each stage.
    /// * `bottleneck` - use bottleneck blocks instead of basic blocks.
    pub fn new(
        blocks: [usize; 4],
        in_channels: usize,
        channels: [usize; 4],
        bottleneck: bool,
        device: &Device<B>,
    ) -> Self {
        let layer1 = LayerBlock::new(blocks[0], in_channels, channels[0], 2, bottleneck, device);
        let layer2 = LayerBlock::new(blocks[1], channels[0], channels[1], 2, bottleneck, device);
        let layer3 = LayerBlock::new(blocks[2], channels[1], channels[2], 2, bottleneck, device);
        let layer4 = LayerBlock::new(blocks[3], channels[2], channels[3], 2, bottleneck, device);

        Self {
            layer1,
            layer2,
            layer3,
            layer4,
        }
    }

    /// Stages with the default "resunet middle" layout fed by a 64-channel stem.
    pub fn resunet_middle(device: &Device<B>) -> Self {
        Self::new(
            RESUNET_MIDDLE_BLOCKS,
            64,
            RESUNET_STAGE_CHANNELS,
            false,
            device,
        )
    }
}

impl<B: Backend> Reinitialize<B> for ResNetStages<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            layer1: self.layer1.reinitialize(init),
            layer2: self.layer2.reinitialize(init),
            layer3: self.layer3.reinitialize(init),
            layer4: self.layer4.reinitialize(init),
        }
    }
}
