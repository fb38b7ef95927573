//! Additional operations for the Burn deep learning framework
//!
//! This crate provides feature-map operations used by the Resunet network that
//! are not available in the core Burn framework: spatial tiling, symmetric
//! pad/crop to a reference size, a per-position Pearson correlation, and
//! typed parameter re-initialization.

use burn::prelude::*;

mod init;
mod pad;
mod pearson;
mod tile;

// Convenient re-exports
pub use init::{Reinitialize, WeightInitConfig};
pub use pad::{pad_or_crop, symmetric_split};
pub use pearson::{pearson_correlation, PEARSON_EPS};
pub use tile::{tile, tile_factors};

/// Additional operations for 4D feature maps (`[batch, channels, height, width]`).
pub trait TensorExtraOps<B: Backend> {
    /// Tile the spatial axes by the given repeat factors.
    fn tile(self, factors: [usize; 2]) -> Self;

    /// Pad with zeros or crop symmetrically to the given spatial size.
    fn pad_or_crop(self, target: [usize; 2]) -> Self;

    /// Pearson correlation with `other` along the channel axis.
    fn channel_correlation(self, other: Self, eps: f64) -> Self;
}

impl<B: Backend> TensorExtraOps<B> for Tensor<B, 4> {
    fn tile(self, factors: [usize; 2]) -> Self {
        tile(self, factors)
    }

    fn pad_or_crop(self, target: [usize; 2]) -> Self {
        pad_or_crop(self, target)
    }

    fn channel_correlation(self, other: Self, eps: f64) -> Self {
        pearson_correlation(self, other, 1, eps)
    }
}
