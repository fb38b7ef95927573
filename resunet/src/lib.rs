mod config;
mod error;
mod models;

#[cfg(test)]
mod tests;

pub use burn_extra_ops::{Reinitialize, WeightInitConfig};
pub use config::{
    BlockKind, DecoderConfig, EncoderConfig, FusionConfig, FusionKind, ResunetConfig,
};
pub use error::{ResunetError, ResunetResult};
pub use models::{
    CrossAttentionFusion, Decoder, Encoder, FusionAdapter, FusionModule, Resunet, ResunetRecord,
};
