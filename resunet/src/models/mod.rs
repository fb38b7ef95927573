//! # Model Architectures
//!
//! This module aggregates the components of the Resunet architecture:
//!
//! - `encoder`: stem + residual stages producing the feature pyramid.
//! - `fusion`: the cross-modal fusion adapter and its fusion modules.
//! - `decoder`: upsampling stages and the output projection.
//! - `modules`: shared convolution blocks and the upsampling stage.
//! - `resunet`: the `Resunet` model wiring everything together.

mod decoder;
mod encoder;
mod fusion;
mod modules;
mod resunet;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use fusion::{CrossAttentionFusion, FusionAdapter, FusionModule};
pub use resunet::{Resunet, ResunetRecord};
