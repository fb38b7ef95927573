//! # Decoder for Resunet
//!
//! Five upsampling stages followed by a 1x1 readout. The first stage
//! upsamples the deepest encoder map and matches it against the fused
//! cross-modal map; the remaining stages walk back up the encoder pyramid
//! through its skip connections.

use burn::prelude::*;
use burn_extra_ops::{Reinitialize, WeightInitConfig};

use super::modules::{OutConv, OutConvConfig, Up, UpConfig};
use crate::config::DecoderConfig;

impl DecoderConfig {
    /// Initializes a `Decoder` module for encoder widths `[x1, x2, x3, x4, x5]`.
    pub fn init<B: Backend>(&self, encoder_channels: [usize; 5], device: &Device<B>) -> Decoder<B> {
        let [up1, up2, up3, up4, up5] = Self::stage_channels(encoder_channels)
            .map(|(in_channels, out_channels)| {
                UpConfig::new(in_channels, out_channels)
                    .with_bilinear(self.bilinear)
                    .init(device)
            });
        let outc = OutConvConfig::new(encoder_channels[0], self.n_classes).init(device);

        Decoder {
            up1,
            up2,
            up3,
            up4,
            up5,
            outc,
        }
    }
}

/// U-Net style decoder.
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    up1: Up<B>,
    up2: Up<B>,
    up3: Up<B>,
    up4: Up<B>,
    up5: Up<B>,
    outc: OutConv<B>,
}

impl<B: Backend> Decoder<B> {
    /// Decodes the encoder pyramid and the fused map into the output map.
    ///
    /// # Arguments
    ///
    /// * `features` - `[x1, x2, x3, x4, x5]` from the encoder, finest first.
    /// * `fused` - output of the fusion adapter, same shape as `x5`.
    pub fn forward(&self, features: [Tensor<B, 4>; 5], fused: Tensor<B, 4>) -> Tensor<B, 4> {
        let [x1, x2, x3, x4, x5] = features;

        let x = self.up1.forward(x5, fused);
        tracing::trace!(shape = ?x.dims(), "decoder stage 1");
        let x = self.up2.forward(x, x4);
        tracing::trace!(shape = ?x.dims(), "decoder stage 2");
        let x = self.up3.forward(x, x3);
        tracing::trace!(shape = ?x.dims(), "decoder stage 3");
        let x = self.up4.forward(x, x2);
        tracing::trace!(shape = ?x.dims(), "decoder stage 4");
        let x = self.up5.forward(x, x1);
        tracing::trace!(shape = ?x.dims(), "decoder stage 5");

        self.outc.forward(x)
    }
}

impl<B: Backend> Reinitialize<B> for Decoder<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            up1: self.up1.reinitialize(init),
            up2: self.up2.reinitialize(init),
            up3: self.up3.reinitialize(init),
            up4: self.up4.reinitialize(init),
            up5: self.up5.reinitialize(init),
            outc: self.outc.reinitialize(init),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn pyramid(batch: usize, channels: [usize; 5], size: [usize; 2]) -> [Tensor<TestBackend, 4>; 5] {
        let device = Default::default();
        let [h, w] = size;
        core::array::from_fn(|i| {
            let scale = 1 << i;
            Tensor::random(
                [batch, channels[i], h / scale, w / scale],
                Distribution::Normal(0.0, 1.0),
                &device,
            )
        })
    }

    #[test]
    fn test_default_stage_channels() {
        let table = DecoderConfig::stage_channels([64, 128, 256, 512, 512]);
        assert_eq!(
            table,
            [(1024, 512), (1024, 256), (512, 128), (256, 64), (128, 64)]
        );
    }

    #[test]
    fn test_decoder_restores_resolution() {
        let device = Default::default();
        let channels = [4, 8, 16, 32, 32];
        let decoder = DecoderConfig::new()
            .with_n_classes(3)
            .init::<TestBackend>(channels, &device);

        let features = pyramid(2, channels, [32, 48]);
        let fused = Tensor::random([2, 32, 2, 3], Distribution::Normal(0.0, 1.0), &device);

        assert_eq!(decoder.forward(features, fused).dims(), [2, 3, 32, 48]);
    }

    #[test]
    fn test_decoder_transposed_conv() {
        let device = Default::default();
        let channels = [4, 8, 16, 32, 32];
        let decoder = DecoderConfig::new()
            .with_bilinear(false)
            .init::<TestBackend>(channels, &device);

        let features = pyramid(1, channels, [16, 16]);
        let fused = Tensor::random([1, 32, 1, 1], Distribution::Normal(0.0, 1.0), &device);

        assert_eq!(decoder.forward(features, fused).dims(), [1, 1, 16, 16]);
    }
}
