//! # Upsampling Stage
//!
//! One decoder stage: upsample a coarse map by 2, match it to the skip map's
//! spatial size, concatenate `[skip, upsampled]` and run a double convolution.

use burn::{
    nn::conv::{ConvTranspose2d, ConvTranspose2dConfig},
    prelude::*,
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};
use burn_extra_ops::{Reinitialize, TensorExtraOps, WeightInitConfig};

use super::{DoubleConv, DoubleConvConfig};

/// Configuration for the `Up` module.
#[derive(Config, Debug)]
pub struct UpConfig {
    /// Channels after concatenation (skip + upsampled).
    in_channels: usize,
    /// Output channels of the stage.
    out_channels: usize,
    /// Bilinear interpolation instead of a transposed convolution.
    #[config(default = "true")]
    bilinear: bool,
}

impl UpConfig {
    /// Initializes a new `Up` module.
    ///
    /// The transposed convolution maps `in_channels / 2` to `in_channels / 2`
    /// channels, so the coarse input must carry half of the concatenated width.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Up<B> {
        let up = (!self.bilinear).then(|| {
            let half = self.in_channels / 2;
            ConvTranspose2dConfig::new([half, half], [2, 2])
                .with_stride([2, 2])
                .init(device)
        });
        let conv = DoubleConvConfig::new(self.in_channels, self.out_channels).init(device);

        Up { up, conv }
    }
}

/// Upscaling then double conv.
#[derive(Module, Debug)]
pub struct Up<B: Backend> {
    /// Learned upsampling; `None` means bilinear interpolation.
    up: Option<ConvTranspose2d<B>>,
    conv: DoubleConv<B>,
}

impl<B: Backend> Up<B> {
    /// # Shapes
    /// - coarse: `[B, C_c, h, w]`
    /// - skip: `[B, C_s, H, W]`
    /// - output: `[B, out_channels, H, W]`
    pub fn forward(&self, coarse: Tensor<B, 4>, skip: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.upsample(coarse);
        let [_, _, h, w] = skip.dims();
        let x = x.pad_or_crop([h, w]);

        let x = Tensor::cat(vec![skip, x], 1);
        self.conv.forward(x)
    }

    fn upsample(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match &self.up {
            Some(up) => up.forward(x),
            None => {
                let [_, _, h, w] = x.dims();
                interpolate(
                    x,
                    [h * 2, w * 2],
                    InterpolateOptions::new(InterpolateMode::Bilinear),
                )
            }
        }
    }
}

impl<B: Backend> Reinitialize<B> for Up<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            up: self.up.reinitialize(init),
            conv: self.conv.reinitialize(init),
        }
    }
}
