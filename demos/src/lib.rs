//! Resunet Demos
//!
//! Demo applications for the Resunet model.
//!
//! ## Available Demos
//!
//! - `resunet-demo`: Build a model (default layout or a JSON config), run a
//!   forward pass on random audio/visual/auxiliary inputs and optionally
//!   save the config and the weights.
//!
//! ## Usage
//!
//! ```bash
//! # Default "resunet middle" network on a 256x320 spectrogram
//! cargo run --release --bin resunet-demo
//!
//! # Custom configuration, re-initialized weights, saved record
//! cargo run --release --bin resunet-demo -- --config resunet.json --init-std 0.02 --save-model model
//! ```

pub mod backend;

pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
