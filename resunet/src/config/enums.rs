//! Enumeration types for Resunet configuration.

use burn::prelude::*;

/// Residual block used by the encoder stages.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// Two 3x3 convolutions.
    Basic,
    /// 1x1 reduce, 3x3, 1x1 expand (inner width `out / 4`).
    Bottleneck,
}

impl BlockKind {
    /// Whether this kind builds bottleneck blocks.
    pub const fn is_bottleneck(&self) -> bool {
        matches!(self, Self::Bottleneck)
    }
}

/// Module that fuses the tiled visual/auxiliary context with the deepest
/// audio feature map.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum FusionKind {
    /// Multi-head cross-attention: audio tokens attend to context tokens.
    CrossAttention,
    /// Channel concatenation followed by a 1x1 conv + BN + ReLU.
    Concat,
}
