//! # Cross-Attention Fusion
//!
//! Audio tokens (the deepest encoder map, one token per spatial position)
//! attend to context tokens built from the tiled visual and auxiliary maps.
//! The block is pre-norm: cross-attention with a residual connection, then a
//! GELU MLP with a residual connection.

use burn::{
    nn::{Dropout, DropoutConfig, Gelu, LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};
use burn_extra_ops::{Reinitialize, WeightInitConfig};

/// Configuration for the `CrossAttentionFusion` module.
#[derive(Config, Debug)]
pub struct CrossAttentionFusionConfig {
    /// Channels of the audio map (query side and output).
    dim: usize,
    /// Channels of the context map (key/value side).
    context_dim: usize,
    /// Number of attention heads.
    #[config(default = "8")]
    num_heads: usize,
    /// Hidden width of the MLP relative to `dim`.
    #[config(default = "2")]
    mlp_ratio: usize,
    /// Dropout on attention weights and residual branches.
    #[config(default = "0.0")]
    dropout: f64,
    /// Layer norm epsilon.
    #[config(default = "1e-5")]
    epsilon: f64,
}

impl CrossAttentionFusionConfig {
    /// Initializes a new `CrossAttentionFusion` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> CrossAttentionFusion<B> {
        let head_dim = self.dim / self.num_heads;
        let hidden = self.dim * self.mlp_ratio;
        let norm = || {
            LayerNormConfig::new(self.dim)
                .with_epsilon(self.epsilon)
                .init(device)
        };

        CrossAttentionFusion {
            num_heads: self.num_heads,
            scale: (head_dim as f64).powf(-0.5),
            context_proj: LinearConfig::new(self.context_dim, self.dim).init(device),
            norm_q: norm(),
            norm_kv: norm(),
            q: LinearConfig::new(self.dim, self.dim).init(device),
            kv: LinearConfig::new(self.dim, self.dim * 2).init(device),
            proj: LinearConfig::new(self.dim, self.dim).init(device),
            norm_mlp: norm(),
            fc1: LinearConfig::new(self.dim, hidden).init(device),
            act: Gelu::new(),
            fc2: LinearConfig::new(hidden, self.dim).init(device),
            drop: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Multi-head cross-attention between audio and visual/auxiliary context.
#[derive(Module, Debug)]
pub struct CrossAttentionFusion<B: Backend> {
    num_heads: usize,
    scale: f64,
    context_proj: Linear<B>,
    norm_q: LayerNorm<B>,
    norm_kv: LayerNorm<B>,
    q: Linear<B>,
    kv: Linear<B>,
    proj: Linear<B>,
    norm_mlp: LayerNorm<B>,
    fc1: Linear<B>,
    act: Gelu,
    fc2: Linear<B>,
    drop: Dropout,
}

impl<B: Backend> CrossAttentionFusion<B> {
    /// # Shapes
    /// - context: `[B, context_dim, h_c, w_c]`
    /// - audio: `[B, dim, h, w]`
    /// - output: `[B, dim, h, w]`
    pub fn forward(&self, context: Tensor<B, 4>, audio: Tensor<B, 4>) -> Tensor<B, 4> {
        let [b, c, h, w] = audio.dims();

        let x = to_tokens(audio);
        let context = self.context_proj.forward(to_tokens(context));

        let x = x.clone() + self.drop.forward(self.attention(x, context));
        let x = x.clone()
            + self.drop.forward(
                self.fc2
                    .forward(self.act.forward(self.fc1.forward(self.norm_mlp.forward(x)))),
            );

        x.swap_dims(1, 2).reshape([b, c, h, w])
    }

    fn attention(&self, x: Tensor<B, 3>, context: Tensor<B, 3>) -> Tensor<B, 3> {
        let [b, n, c] = x.dims();
        let [_, m, _] = context.dims();
        let head_dim = c / self.num_heads;

        let q = self
            .q
            .forward(self.norm_q.forward(x))
            .reshape([b, n, self.num_heads, head_dim])
            .permute([0, 2, 1, 3]);

        let kv = self
            .kv
            .forward(self.norm_kv.forward(context))
            .reshape([b, m, 2, self.num_heads, head_dim])
            .permute([2, 0, 3, 1, 4]);
        let k = kv.clone().slice([0..1]).squeeze::<4>(0);
        let v = kv.slice([1..2]).squeeze::<4>(0);

        let attn = q.matmul(k.transpose()) * self.scale;
        let attn = softmax(attn, 3);
        let attn = self.drop.forward(attn);

        let x = attn.matmul(v).permute([0, 2, 1, 3]).reshape([b, n, c]);
        self.proj.forward(x)
    }
}

impl<B: Backend> Reinitialize<B> for CrossAttentionFusion<B> {
    fn reinitialize(self, init: &WeightInitConfig) -> Self {
        Self {
            context_proj: self.context_proj.reinitialize(init),
            q: self.q.reinitialize(init),
            kv: self.kv.reinitialize(init),
            proj: self.proj.reinitialize(init),
            fc1: self.fc1.reinitialize(init),
            fc2: self.fc2.reinitialize(init),
            ..self
        }
    }
}

/// `[B, C, H, W]` -> `[B, H * W, C]`
fn to_tokens<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 3> {
    x.flatten::<3>(2, 3).swap_dims(1, 2)
}
