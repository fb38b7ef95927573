//! Configuration module for Resunet.
//!
//! This module provides configuration structures and enums for the Resunet model.
//! It is organized into two main submodules:
//! - `core`: Contains the main configuration structures
//! - `enums`: Contains all enumeration types used in configurations

pub mod core;
pub mod enums;

// Re-export all configuration structures from core
pub use self::core::{DecoderConfig, EncoderConfig, FusionConfig, ResunetConfig};

// Re-export all enums from enums
pub use self::enums::{BlockKind, FusionKind};
