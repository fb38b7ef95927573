//! ResNet block implementations.
//!
//! This module contains the building blocks of the Resunet encoder: BasicBlock,
//! Bottleneck, the projection shortcut and LayerBlock (one encoder stage).

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};
use burn_extra_ops::{Reinitialize, WeightInitConfig};

#[derive(Module, Debug)]
pub enum ResidualBlock<B: Backend> {
    /// A bottleneck residual block.
    Bottleneck(Bottleneck<B>),
    /// A basic residual block.
    Basic(BasicBlock<B>),
}

impl<B: Backend> ResidualBlock<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::Basic(block) => block.forward(input),
            Self::Bottleneck(block) => block.forward(input),
        }
    }
}

impl<B: Backend> Reinitialize<B> for ResidualBlock<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        match self {
            Self::Basic(block) => Self::Basic(block.reinitialize(init)),
            Self::Bottleneck(block) => Self::Bottleneck(block.reinitialize(init)),
        }
    }
}

/// Basic residual block: two 3x3 convolutions and a shortcut.
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    relu: Relu,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> BasicBlock<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = input.clone();

        // Conv block
        let out = self.conv1.forward(input);
        let out = self.bn1.forward(out);
        let out = self.relu.forward(out);
        let out = self.conv2.forward(out);
        let out = self.bn2.forward(out);

        // Skip connection
        let out = match &self.downsample {
            Some(downsample) => out + downsample.forward(identity),
            None => out + identity,
        };

        // Activation
        self.relu.forward(out)
    }

    /// Create a new BasicBlock.
    pub fn new(in_channels: usize, out_channels: usize, stride: usize, device: &Device<B>) -> Self {
        // conv3x3
        let conv1 = conv3x3(in_channels, out_channels, stride, device);
        let bn1 = BatchNormConfig::new(out_channels).init(device);

        // conv3x3
        let conv2 = conv3x3(out_channels, out_channels, 1, device);
        let bn2 = BatchNormConfig::new(out_channels).init(device);

        let downsample = (stride != 1 || in_channels != out_channels)
            .then(|| Downsample::new(in_channels, out_channels, stride, device));

        Self {
            conv1,
            bn1,
            relu: Relu::new(),
            conv2,
            bn2,
            downsample,
        }
    }
}

impl<B: Backend> Reinitialize<B> for BasicBlock<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            conv1: self.conv1.reinitialize(init),
            bn1: self.bn1.reinitialize(init),
            relu: self.relu,
            conv2: self.conv2.reinitialize(init),
            bn2: self.bn2.reinitialize(init),
            downsample: self.downsample.reinitialize(init),
        }
    }
}

/// Bottleneck residual block: 1x1 reduce, 3x3, 1x1 expand, and a shortcut.
///
/// **NOTE:** the stride sits on the 3x3 convolution (ResNet V1.5). The inner
/// width is a quarter of `out_channels`, so the block maps `in_channels` to
/// `out_channels` exactly like [`BasicBlock`] and the two are interchangeable
/// inside a stage.
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    relu: Relu,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    conv3: Conv2d<B>,
    bn3: BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> Bottleneck<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = input.clone();

        // Conv block
        let out = self.conv1.forward(input);
        let out = self.bn1.forward(out);
        let out = self.relu.forward(out);
        let out = self.conv2.forward(out);
        let out = self.bn2.forward(out);
        let out = self.relu.forward(out);
        let out = self.conv3.forward(out);
        let out = self.bn3.forward(out);

        // Skip connection
        let out = match &self.downsample {
            Some(downsample) => out + downsample.forward(identity),
            None => out + identity,
        };

        // Activation
        self.relu.forward(out)
    }

    /// Create a new Bottleneck.
    pub fn new(in_channels: usize, out_channels: usize, stride: usize, device: &Device<B>) -> Self {
        // Intermediate output channels w/ expansion = 4
        let int_out_channels = (out_channels / 4).max(1);

        // conv1x1
        let conv1 = conv1x1(in_channels, int_out_channels, 1, device);
        let bn1 = BatchNormConfig::new(int_out_channels).init(device);

        // conv3x3
        let conv2 = conv3x3(int_out_channels, int_out_channels, stride, device);
        let bn2 = BatchNormConfig::new(int_out_channels).init(device);

        // conv1x1
        let conv3 = conv1x1(int_out_channels, out_channels, 1, device);
        let bn3 = BatchNormConfig::new(out_channels).init(device);

        let downsample = (stride != 1 || in_channels != out_channels)
            .then(|| Downsample::new(in_channels, out_channels, stride, device));

        Self {
            conv1,
            bn1,
            relu: Relu::new(),
            conv2,
            bn2,
            conv3,
            bn3,
            downsample,
        }
    }
}

impl<B: Backend> Reinitialize<B> for Bottleneck<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            conv1: self.conv1.reinitialize(init),
            bn1: self.bn1.reinitialize(init),
            relu: self.relu,
            conv2: self.conv2.reinitialize(init),
            bn2: self.bn2.reinitialize(init),
            conv3: self.conv3.reinitialize(init),
            bn3: self.bn3.reinitialize(init),
            downsample: self.downsample.reinitialize(init),
        }
    }
}

/// Projection shortcut: a strided 1x1 conv + BN that matches the main path's
/// resolution and channel count.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = self.conv.forward(input);
        self.bn.forward(out)
    }

    /// Create a new Downsample.
    pub fn new(in_channels: usize, out_channels: usize, stride: usize, device: &Device<B>) -> Self {
        let conv = conv1x1(in_channels, out_channels, stride, device);
        let bn = BatchNormConfig::new(out_channels).init(device);

        Self { conv, bn }
    }
}

impl<B: Backend> Reinitialize<B> for Downsample<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            conv: self.conv.reinitialize(init),
            bn: self.bn.reinitialize(init),
        }
    }
}

/// Collection of sequential residual blocks.
#[derive(Module, Debug)]
pub struct LayerBlock<B: Backend> {
    blocks: Vec<ResidualBlock<B>>,
}

impl<B: Backend> LayerBlock<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut out = input;
        for block in &self.blocks {
            out = block.forward(out);
        }
        out
    }

    /// Number of residual blocks in this stage.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the stage holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Create a new LayerBlock.
    pub fn new(
        num_blocks: usize,
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        bottleneck: bool,
        device: &Device<B>,
    ) -> Self {
        let blocks = (0..num_blocks)
            .map(|b| {
                // First block uses the specified stride, the others keep the shape
                let (in_channels, stride) = if b == 0 {
                    (in_channels, stride)
                } else {
                    (out_channels, 1)
                };

                if bottleneck {
                    ResidualBlock::Bottleneck(Bottleneck::new(
                        in_channels,
                        out_channels,
                        stride,
                        device,
                    ))
                } else {
                    ResidualBlock::Basic(BasicBlock::new(in_channels, out_channels, stride, device))
                }
            })
            .collect();

        Self { blocks }
    }
}

impl<B: Backend> Reinitialize<B> for LayerBlock<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            blocks: self.blocks.reinitialize(init),
        }
    }
}

fn conv3x3<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    stride: usize,
    device: &Device<B>,
) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device)
}

fn conv1x1<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    stride: usize,
    device: &Device<B>,
) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [1, 1])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(0, 0))
        .with_bias(false)
        .init(device)
}
