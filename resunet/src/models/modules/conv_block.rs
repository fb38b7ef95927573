//! # Convolution Blocks
//!
//! Small convolutional building blocks shared by the encoder stem, the fusion
//! adapter and the decoder.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};
use burn_extra_ops::{Reinitialize, WeightInitConfig};

/// Configuration for the `ConvBnRelu` module.
#[derive(Config, Debug)]
pub struct ConvBnReluConfig {
    /// Number of input channels.
    in_channels: usize,
    /// Number of output channels.
    out_channels: usize,
    /// Square kernel size.
    #[config(default = "1")]
    kernel_size: usize,
    /// Zero padding on every side.
    #[config(default = "0")]
    padding: usize,
    /// Convolution stride.
    #[config(default = "1")]
    stride: usize,
    /// Follow the convolution with batch normalization.
    #[config(default = "true")]
    batch_norm: bool,
    /// Finish with a ReLU.
    #[config(default = "true")]
    relu: bool,
}

impl ConvBnReluConfig {
    /// Initializes a new `ConvBnRelu` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ConvBnRelu<B> {
        let conv = Conv2dConfig::new(
            [self.in_channels, self.out_channels],
            [self.kernel_size, self.kernel_size],
        )
        .with_stride([self.stride, self.stride])
        .with_padding(PaddingConfig2d::Explicit(self.padding, self.padding))
        .init(device);
        let bn = self
            .batch_norm
            .then(|| BatchNormConfig::new(self.out_channels).init(device));
        let relu = self.relu.then(Relu::new);

        ConvBnRelu { conv, bn, relu }
    }
}

/// Convolution, optionally followed by batch normalization and ReLU.
#[derive(Module, Debug)]
pub struct ConvBnRelu<B: Backend> {
    conv: Conv2d<B>,
    bn: Option<BatchNorm<B, 2>>,
    relu: Option<Relu>,
}

impl<B: Backend> ConvBnRelu<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = match &self.bn {
            Some(bn) => bn.forward(x),
            None => x,
        };
        match &self.relu {
            Some(relu) => relu.forward(x),
            None => x,
        }
    }
}

impl<B: Backend> Reinitialize<B> for ConvBnRelu<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            conv: self.conv.reinitialize(init),
            bn: self.bn.reinitialize(init),
            relu: self.relu,
        }
    }
}

/// Configuration for the `DoubleConv` module.
#[derive(Config, Debug)]
pub struct DoubleConvConfig {
    /// Number of input channels.
    in_channels: usize,
    /// Number of output channels.
    out_channels: usize,
}

impl DoubleConvConfig {
    /// Initializes a new `DoubleConv` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> DoubleConv<B> {
        let first = ConvBnReluConfig::new(self.in_channels, self.out_channels)
            .with_kernel_size(3)
            .with_padding(1)
            .init(device);
        let second = ConvBnReluConfig::new(self.out_channels, self.out_channels)
            .with_kernel_size(3)
            .with_padding(1)
            .init(device);

        DoubleConv { first, second }
    }
}

/// (3x3 conv => BN => ReLU) * 2
#[derive(Module, Debug)]
pub struct DoubleConv<B: Backend> {
    first: ConvBnRelu<B>,
    second: ConvBnRelu<B>,
}

impl<B: Backend> DoubleConv<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.second.forward(self.first.forward(x))
    }
}

impl<B: Backend> Reinitialize<B> for DoubleConv<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            first: self.first.reinitialize(init),
            second: self.second.reinitialize(init),
        }
    }
}

/// Configuration for the `OutConv` module.
#[derive(Config, Debug)]
pub struct OutConvConfig {
    /// Number of input channels.
    in_channels: usize,
    /// Number of output channels (classes).
    out_channels: usize,
}

impl OutConvConfig {
    /// Initializes a new `OutConv` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> OutConv<B> {
        let conv = Conv2dConfig::new([self.in_channels, self.out_channels], [1, 1])
            .with_padding(PaddingConfig2d::Valid)
            .init(device);

        OutConv { conv }
    }
}

/// Linear 1x1 readout, no normalization or activation.
#[derive(Module, Debug)]
pub struct OutConv<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> OutConv<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(x)
    }
}

impl<B: Backend> Reinitialize<B> for OutConv<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            conv: self.conv.reinitialize(init),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_double_conv_keeps_resolution() {
        let device = Default::default();
        let block = DoubleConvConfig::new(3, 16).init::<TestBackend>(&device);

        let x = Tensor::random([2, 3, 9, 7], Distribution::Normal(0.0, 1.0), &device);
        let y = block.forward(x);

        assert_eq!(y.dims(), [2, 16, 9, 7]);
        assert!(y.min().into_scalar() >= 0.0);
    }

    #[test]
    fn test_conv_without_norm_or_activation_is_affine() {
        let device = Default::default();
        let block = ConvBnReluConfig::new(4, 8)
            .with_relu(false)
            .with_batch_norm(false)
            .init::<TestBackend>(&device);

        let x = Tensor::random([1, 4, 6, 6], Distribution::Normal(0.0, 1.0), &device);
        let y = block.forward(x.clone());
        assert_eq!(y.dims(), [1, 8, 6, 6]);

        let z = block.forward(x.neg());
        // Without BN and ReLU the block is affine, so y + z is the bias doubled
        // at every position
        let sum = y + z;
        let centered = sum.clone() - sum.mean_dim(3).mean_dim(2);
        assert!(centered.abs().max().into_scalar() < 1e-4);
    }

    #[test]
    fn test_double_conv_reinitialize() {
        let device = Default::default();
        let block = DoubleConvConfig::new(64, 64)
            .init::<TestBackend>(&device)
            .reinitialize(&WeightInitConfig::new());

        let weight = block.first.conv.weight.val().flatten::<1>(0, 3);
        let mean = weight.clone().mean().into_scalar();
        let std = weight.var(0).sqrt().into_scalar();
        assert!(mean.abs() < 1e-3, "mean {mean}");
        assert!((std - 0.02).abs() < 1e-3, "std {std}");

        for bn in [&block.first.bn, &block.second.bn] {
            let bn = bn.as_ref().unwrap();
            assert_eq!(bn.beta.val().abs().sum().into_scalar(), 0.0);
        }
    }

    #[test]
    fn test_out_conv_is_linear_readout() {
        let device = Default::default();
        let out = OutConvConfig::new(8, 3).init::<TestBackend>(&device);

        let x = Tensor::random([1, 8, 5, 4], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(out.forward(x).dims(), [1, 3, 5, 4]);
    }
}
