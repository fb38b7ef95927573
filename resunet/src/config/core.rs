//! Core configuration structures for Resunet.
//!
//! This module contains the configuration structures that define the Resunet
//! architecture: the encoder layout, the cross-modal fusion adapter and the
//! decoder head. Channel widths of every stage are derived from these values,
//! so `validate` checks the whole shape contract before any module is built.

use burn::prelude::*;

use super::enums::*;
use crate::error::{ResunetError, ResunetResult};

/// Main configuration for the Resunet model.
#[derive(Config, Debug)]
pub struct ResunetConfig {
    /// Encoder configuration (stem and residual stages).
    #[config(default = "EncoderConfig::new()")]
    pub encoder: EncoderConfig,
    /// Cross-modal fusion adapter configuration.
    #[config(default = "FusionConfig::new()")]
    pub fusion: FusionConfig,
    /// Decoder configuration.
    #[config(default = "DecoderConfig::new()")]
    pub decoder: DecoderConfig,
}

/// Encoder configuration.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Channels of the input signal (1 for a spectrogram).
    #[config(default = "1")]
    pub in_channels: usize,
    /// Output channels of the full-resolution stem.
    #[config(default = "64")]
    pub base_channels: usize,
    /// Output channels of the four residual stages.
    #[config(default = "[128, 256, 512, 512]")]
    pub stage_channels: [usize; 4],
    /// Number of residual blocks in each stage.
    #[config(default = "[2, 2, 2, 2]")]
    pub num_blocks: [usize; 4],
    /// The residual block type.
    #[config(default = "BlockKind::Basic")]
    pub block: BlockKind,
}

/// Cross-modal fusion adapter configuration.
#[derive(Config, Debug)]
pub struct FusionConfig {
    /// The fusion module applied to the aligned modalities.
    #[config(default = "FusionKind::CrossAttention")]
    pub kind: FusionKind,
    /// Channels of the external visual feature map.
    #[config(default = "512")]
    pub visual_channels: usize,
    /// Channels of the visual feature map after the 1x1 reduction.
    #[config(default = "256")]
    pub reduced_visual_channels: usize,
    /// Channels of the external auxiliary ("sign") feature map.
    #[config(default = "256")]
    pub aux_channels: usize,
    /// Attention heads of the cross-attention fusion.
    #[config(default = "8")]
    pub num_heads: usize,
    /// Hidden width of the fusion MLP relative to the audio width.
    #[config(default = "2")]
    pub mlp_ratio: usize,
    /// Dropout applied to attention weights and residual branches.
    #[config(default = "0.0")]
    pub dropout: f64,
    /// Epsilon of the fusion layer norms.
    #[config(default = "1e-5")]
    pub layer_norm_eps: f64,
    /// Value substituted for a zero denominator in the correlation score.
    #[config(default = "1e-8")]
    pub correlation_eps: f64,
}

impl FusionConfig {
    /// Channels of the concatenated visual/auxiliary context.
    pub const fn context_channels(&self) -> usize {
        self.reduced_visual_channels + self.aux_channels
    }
}

/// Decoder configuration.
#[derive(Config, Debug)]
pub struct DecoderConfig {
    /// Channels of the output projection.
    #[config(default = "1")]
    pub n_classes: usize,
    /// Upsample with bilinear interpolation; otherwise a learned transposed convolution.
    #[config(default = "true")]
    pub bilinear: bool,
}

impl DecoderConfig {
    /// `(in_channels, out_channels)` of the five upsampling stages, coarsest
    /// first, for encoder widths `[x1, x2, x3, x4, x5]`.
    ///
    /// Stage 1 concatenates the upsampled `x5` with the fusion output, which
    /// has the width of `x5`. Every later stage concatenates the previous
    /// stage output with an encoder skip of the same width.
    pub const fn stage_channels(encoder: [usize; 5]) -> [(usize, usize); 5] {
        let [e0, e1, e2, e3, e4] = encoder;
        [
            (e4 + e4, e3),
            (e3 + e3, e2),
            (e2 + e2, e1),
            (e1 + e1, e0),
            (e0 + e0, e0),
        ]
    }
}

impl EncoderConfig {
    /// Channel widths of the five encoder feature maps, finest first.
    pub const fn channels(&self) -> [usize; 5] {
        let [s0, s1, s2, s3] = self.stage_channels;
        [self.base_channels, s0, s1, s2, s3]
    }
}

impl ResunetConfig {
    /// Builds a configuration from the classic constructor arguments
    /// `(block, num_blocks, n_channels, n_classes, bilinear)`.
    pub fn from_layout(
        block: BlockKind,
        num_blocks: [usize; 4],
        n_channels: usize,
        n_classes: usize,
        bilinear: bool,
    ) -> Self {
        Self::new()
            .with_encoder(
                EncoderConfig::new()
                    .with_block(block)
                    .with_num_blocks(num_blocks)
                    .with_in_channels(n_channels),
            )
            .with_decoder(
                DecoderConfig::new()
                    .with_n_classes(n_classes)
                    .with_bilinear(bilinear),
            )
    }

    /// The "resunet middle" layout: basic blocks, two per stage, one input
    /// channel, one output channel, bilinear upsampling.
    pub fn resunet_middle() -> Self {
        Self::from_layout(BlockKind::Basic, [2, 2, 2, 2], 1, 1, true)
    }

    /// Validate the configuration and return appropriate errors for invalid settings.
    ///
    /// # Errors
    ///
    /// Returns `Err(ResunetError::InvalidConfiguration)` if any channel or
    /// block count is zero, if the attention heads do not divide the width
    /// of the deepest encoder map, or if a numeric parameter is out of range.
    pub fn validate(&self) -> ResunetResult<()> {
        let invalid = |reason: String| Err(ResunetError::InvalidConfiguration { reason });

        // 1. Encoder widths and depths
        if self.encoder.in_channels == 0 {
            return invalid("in_channels must be > 0".to_string());
        }
        if let Some(i) = self.encoder.channels().iter().position(|&c| c == 0) {
            return invalid(format!("Encoder channels must be > 0, level {i} has 0"));
        }
        if let Some(i) = self.encoder.num_blocks.iter().position(|&n| n == 0) {
            return invalid(format!("Each stage needs at least one block, stage {i} has 0"));
        }
        if self.encoder.block.is_bottleneck() {
            if let Some(&c) = self.encoder.stage_channels.iter().find(|&&c| c < 4) {
                return invalid(format!(
                    "Bottleneck blocks need at least 4 output channels, got {c}"
                ));
            }
        }

        // 2. Fusion adapter
        let fusion = &self.fusion;
        if fusion.visual_channels == 0 || fusion.reduced_visual_channels == 0 {
            return invalid("Visual channels must be > 0".to_string());
        }
        if fusion.aux_channels == 0 {
            return invalid("aux_channels must be > 0".to_string());
        }
        let audio_channels = self.encoder.stage_channels[3];
        if fusion.kind == FusionKind::CrossAttention {
            if fusion.num_heads == 0 || audio_channels % fusion.num_heads != 0 {
                return invalid(format!(
                    "num_heads ({}) must divide the deepest encoder width ({audio_channels})",
                    fusion.num_heads
                ));
            }
            if fusion.mlp_ratio == 0 {
                return invalid("mlp_ratio must be > 0".to_string());
            }
        }
        if !(0.0..1.0).contains(&fusion.dropout) {
            return invalid(format!("dropout must be in [0, 1), got {}", fusion.dropout));
        }
        if fusion.layer_norm_eps <= 0.0 || fusion.correlation_eps <= 0.0 {
            return invalid("Epsilon values must be > 0".to_string());
        }

        // 3. Decoder
        if self.decoder.n_classes == 0 {
            return invalid("n_classes must be > 0".to_string());
        }

        Ok(())
    }
}
