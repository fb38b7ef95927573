//! # Resunet Model Implementation
//!
//! This module defines the main `Resunet` model: a ResNet encoder, a
//! cross-modal fusion adapter on the deepest encoder map, and a U-Net
//! decoder that reconstructs a full-resolution prediction through skip
//! connections.
//!
//! ## Data flow
//!
//! ```text
//! input -> stem -> x1 -> stage1 -> x2 -> stage2 -> x3 -> stage3 -> x4 -> stage4 -> x5
//! (visual, aux, x5) -> fusion adapter -> fused
//! up1(x5, fused) -> up2(., x4) -> up3(., x3) -> up4(., x2) -> up5(., x1) -> outc
//! ```

use burn::prelude::*;
use burn_extra_ops::{Reinitialize, WeightInitConfig};

use super::{Decoder, Encoder, FusionAdapter};
use crate::{
    config::ResunetConfig,
    error::{ResunetError, ResunetResult},
};

impl ResunetConfig {
    /// Initializes a `Resunet` model with the given configuration.
    ///
    /// Parameters get Burn's default initialization; call
    /// [`Resunet::reinitialize`] to apply a fixed-variance scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ResunetResult<Resunet<B>> {
        self.validate()?;

        let channels = self.encoder.channels();
        tracing::debug!(
            encoder = ?channels,
            blocks = ?self.encoder.num_blocks,
            block = ?self.encoder.block,
            fusion = ?self.fusion.kind,
            bilinear = self.decoder.bilinear,
            "building Resunet"
        );

        Ok(Resunet {
            encoder: self.encoder.init(device),
            fusion: self.fusion.init(channels[4], device),
            decoder: self.decoder.init(channels, device),
        })
    }
}

/// The main Resunet model.
#[derive(Module, Debug)]
pub struct Resunet<B: Backend> {
    /// The ResNet encoder.
    encoder: Encoder<B>,
    /// The cross-modal fusion adapter.
    fusion: FusionAdapter<B>,
    /// The U-Net decoder.
    decoder: Decoder<B>,
}

impl<B: Backend> Resunet<B> {
    /// The "resunet middle" network: basic blocks, two per stage, one input
    /// and one output channel, bilinear upsampling.
    pub fn resunet_middle(device: &Device<B>) -> ResunetResult<Self> {
        ResunetConfig::resunet_middle().init(device)
    }

    /// Performs the forward pass through the encoder part of the network.
    ///
    /// # Returns
    ///
    /// The five encoder feature maps `[x1, x2, x3, x4, x5]`, finest first.
    pub fn forward_enc(&self, x: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        let features = self.encoder.forward(x);
        for (level, feature) in features.iter().enumerate() {
            tracing::trace!(level = level + 1, shape = ?feature.dims(), "encoder feature");
        }
        features
    }

    /// The main forward pass for the `Resunet` model.
    ///
    /// # Arguments
    ///
    /// * `x` - The input signal of shape `[B, in_channels, H, W]`.
    /// * `visual` - The visual feature map `[B, visual_channels, h1, w1]`.
    /// * `aux` - The auxiliary feature map `[B, aux_channels, h2, w2]`.
    ///
    /// `h1`, `h2` must divide `H / 16` and `w1`, `w2` must divide `W / 16`.
    ///
    /// # Returns
    ///
    /// A result containing the prediction `[B, n_classes, H, W]`.
    ///
    /// # Errors
    ///
    /// Returns `ResunetError::InvalidTensorShape` if the input channels, the
    /// modality channels or batch sizes do not match the configuration, or if
    /// a modality cannot be tiled onto the deepest encoder map.
    pub fn forward(
        &self,
        x: Tensor<B, 4>,
        visual: Tensor<B, 4>,
        aux: Tensor<B, 4>,
    ) -> ResunetResult<Tensor<B, 4>> {
        let dims = x.dims();
        if dims[1] != self.encoder.in_channels() {
            return Err(ResunetError::InvalidTensorShape {
                expected: format!("[B, {}, H, W]", self.encoder.in_channels()),
                actual: format!("{dims:?}"),
            });
        }

        // ########## Encoder ##########
        let [x1, x2, x3, x4, x5] = self.forward_enc(x);

        // ########## Fusion ##########
        let fused = self.fusion.forward(visual, aux, x5.clone())?;

        // ########## Decoder ##########
        Ok(self.decoder.forward([x1, x2, x3, x4, x5], fused))
    }

    /// Per-position Pearson correlation between two feature maps along the
    /// channel axis, for feature-similarity diagnostics.
    pub fn pearson_correlation(&self, x: Tensor<B, 4>, y: Tensor<B, 4>) -> Tensor<B, 4> {
        self.fusion.pearson_correlation(x, y)
    }

    /// Re-samples every convolution, linear and batch-norm parameter.
    ///
    /// Convolution and linear weights are drawn from `N(mean, std)`, batch
    /// norm scales from `N(norm_mean, std)` and batch norm shifts are zeroed.
    /// Biases and layer norms keep their values.
    pub fn reinitialize(self, init: &WeightInitConfig) -> Self {
        tracing::debug!(mean = init.mean, std = init.std, "reinitializing parameters");
        Reinitialize::reinitialize(self, init)
    }
}

impl<B: Backend> Reinitialize<B> for Resunet<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            encoder: self.encoder.reinitialize(init),
            fusion: self.fusion.reinitialize(init),
            decoder: self.decoder.reinitialize(init),
        }
    }
}
