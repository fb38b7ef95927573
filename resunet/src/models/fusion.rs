//! # Cross-Modal Fusion Adapter
//!
//! Aligns the external visual and auxiliary ("sign") feature maps with the
//! deepest encoder map and hands them to a fusion module:
//!
//! 1. reduce the visual channels with a 1x1 conv + BN + ReLU,
//! 2. tile the reduced visual map and the auxiliary map to the encoder map's
//!    spatial size,
//! 3. concatenate them along channels,
//! 4. fuse the concatenation with the encoder map.
//!
//! The adapter also exposes a per-position Pearson correlation between two
//! feature maps for similarity diagnostics; it is not part of the forward
//! pass.

mod attention;
mod concat;

pub use attention::{CrossAttentionFusion, CrossAttentionFusionConfig};
pub use concat::{ConcatFusion, ConcatFusionConfig};

use burn::prelude::*;
use burn_extra_ops::{tile_factors, Reinitialize, TensorExtraOps, WeightInitConfig};

use super::modules::{ConvBnRelu, ConvBnReluConfig};
use crate::{
    config::{FusionConfig, FusionKind},
    error::{ResunetError, ResunetResult},
};

/// An enum to wrap the supported fusion modules.
///
/// Every variant maps `(context [B, C_ctx, h, w], audio [B, C, h, w])` to
/// `[B, C, h, w]`.
#[derive(Module, Debug)]
pub enum FusionModule<B: Backend> {
    CrossAttention(CrossAttentionFusion<B>),
    Concat(ConcatFusion<B>),
}

impl<B: Backend> FusionModule<B> {
    pub fn forward(&self, context: Tensor<B, 4>, audio: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::CrossAttention(fusion) => fusion.forward(context, audio),
            Self::Concat(fusion) => fusion.forward(context, audio),
        }
    }
}

impl<B: Backend> Reinitialize<B> for FusionModule<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        match self {
            Self::CrossAttention(fusion) => Self::CrossAttention(fusion.reinitialize(init)),
            Self::Concat(fusion) => Self::Concat(fusion.reinitialize(init)),
        }
    }
}

impl FusionConfig {
    /// Initializes a `FusionAdapter` for an encoder whose deepest map has
    /// `audio_channels` channels.
    pub fn init<B: Backend>(&self, audio_channels: usize, device: &Device<B>) -> FusionAdapter<B> {
        let visual_reduce =
            ConvBnReluConfig::new(self.visual_channels, self.reduced_visual_channels).init(device);

        let fusion = match self.kind {
            FusionKind::CrossAttention => FusionModule::CrossAttention(
                CrossAttentionFusionConfig::new(audio_channels, self.context_channels())
                    .with_num_heads(self.num_heads)
                    .with_mlp_ratio(self.mlp_ratio)
                    .with_dropout(self.dropout)
                    .with_epsilon(self.layer_norm_eps)
                    .init(device),
            ),
            FusionKind::Concat => FusionModule::Concat(
                ConcatFusionConfig::new(audio_channels, self.context_channels()).init(device),
            ),
        };

        FusionAdapter {
            visual_channels: self.visual_channels,
            aux_channels: self.aux_channels,
            correlation_eps: self.correlation_eps,
            visual_reduce,
            fusion,
        }
    }
}

/// Aligns and fuses the external modalities with the deepest encoder map.
#[derive(Module, Debug)]
pub struct FusionAdapter<B: Backend> {
    visual_channels: usize,
    aux_channels: usize,
    correlation_eps: f64,
    visual_reduce: ConvBnRelu<B>,
    fusion: FusionModule<B>,
}

impl<B: Backend> FusionAdapter<B> {
    /// Fuses `visual` and `aux` into `audio`.
    ///
    /// # Shapes
    /// - visual: `[B, visual_channels, h1, w1]`
    /// - aux: `[B, aux_channels, h2, w2]`
    /// - audio: `[B, C, H, W]`, with `h1`, `h2` dividing `H` and `w1`, `w2` dividing `W`
    /// - output: `[B, C, H, W]`
    ///
    /// # Errors
    ///
    /// Returns `ResunetError::InvalidTensorShape` if a channel or batch size
    /// does not match, or if a modality cannot be tiled onto the audio grid.
    pub fn forward(
        &self,
        visual: Tensor<B, 4>,
        aux: Tensor<B, 4>,
        audio: Tensor<B, 4>,
    ) -> ResunetResult<Tensor<B, 4>> {
        let [batch, _, h, w] = audio.dims();
        check_feature("visual", visual.dims(), batch, self.visual_channels)?;
        check_feature("auxiliary", aux.dims(), batch, self.aux_channels)?;

        let visual = self.visual_reduce.forward(visual);
        let visual = tile_to("visual", visual, [h, w])?;
        let aux = tile_to("auxiliary", aux, [h, w])?;

        let context = Tensor::cat(vec![visual, aux], 1);
        tracing::trace!(context = ?context.dims(), audio = ?audio.dims(), "fusing modalities");

        Ok(self.fusion.forward(context, audio))
    }

    /// Pearson correlation of `x` and `y` along the channel axis, one score
    /// per spatial position.
    ///
    /// # Shapes
    /// - x, y: `[B, C, H, W]`
    /// - output: `[B, 1, H, W]`
    pub fn pearson_correlation(&self, x: Tensor<B, 4>, y: Tensor<B, 4>) -> Tensor<B, 4> {
        x.channel_correlation(y, self.correlation_eps)
    }
}

impl<B: Backend> Reinitialize<B> for FusionAdapter<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            visual_reduce: self.visual_reduce.reinitialize(init),
            fusion: self.fusion.reinitialize(init),
            ..self
        }
    }
}

fn check_feature(
    name: &str,
    dims: [usize; 4],
    batch: usize,
    channels: usize,
) -> ResunetResult<()> {
    if dims[0] != batch || dims[1] != channels {
        return Err(ResunetError::InvalidTensorShape {
            expected: format!("{name} feature [{batch}, {channels}, h, w]"),
            actual: format!("{dims:?}"),
        });
    }
    Ok(())
}

fn tile_to<B: Backend>(
    name: &str,
    x: Tensor<B, 4>,
    target: [usize; 2],
) -> ResunetResult<Tensor<B, 4>> {
    let [_, _, h, w] = x.dims();
    let factors = tile_factors([h, w], target).ok_or_else(|| ResunetError::InvalidTensorShape {
        expected: format!(
            "{name} feature with spatial size dividing {}x{}",
            target[0], target[1]
        ),
        actual: format!("{h}x{w}"),
    })?;

    Ok(x.tile(factors))
}
