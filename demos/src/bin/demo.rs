//! Resunet Forward-Pass Demo
//!
//! Builds a Resunet model and runs one forward pass on random inputs: a
//! spectrogram-like signal, a visual feature map and an auxiliary ("sign")
//! feature map. Reports the encoder pyramid, the output shape and the mean
//! channel self-correlation of the finest encoder map.
//!
//! ## Usage
//!
//! ```bash
//! # Default network and input sizes
//! cargo run --release --bin resunet-demo
//!
//! # Write the default config, edit it, then run with it
//! cargo run --release --bin resunet-demo -- --save-config resunet.json
//! cargo run --release --bin resunet-demo -- --config resunet.json --height 128 --width 160
//!
//! # More logging
//! RUST_LOG=resunet_burn=trace cargo run --release --bin resunet-demo
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::Distribution,
};
use clap::Parser;
use resunet_burn::{ResunetConfig, WeightInitConfig};
use resunet_demos::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON model configuration (defaults to the "resunet middle" layout)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this path
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Re-sample weights from N(0, std) before running
    #[arg(long)]
    init_std: Option<f64>,

    /// Save the model record (named MessagePack) to this path
    #[arg(long)]
    save_model: Option<PathBuf>,

    /// Batch size
    #[arg(short, long, default_value = "1")]
    batch: usize,

    /// Input height (frequency bins)
    #[arg(long, default_value = "256")]
    height: usize,

    /// Input width (time frames)
    #[arg(long, default_value = "320")]
    width: usize,

    /// Spatial size of the visual feature map, `HxW`
    #[arg(long, default_value = "4x4", value_parser = parse_size)]
    visual_size: [usize; 2],

    /// Spatial size of the auxiliary feature map, `HxW`
    #[arg(long, default_value = "1x1", value_parser = parse_size)]
    aux_size: [usize; 2],
}

fn parse_size(value: &str) -> Result<[usize; 2], String> {
    let (h, w) = value
        .split_once('x')
        .ok_or_else(|| format!("expected HxW, got {value:?}"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid size {s:?}: {e}"))
    };
    Ok([parse(h)?, parse(w)?])
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resunet_demo=info,resunet_burn=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let device = create_device();
    tracing::info!(backend = get_backend_name(), "starting Resunet demo");

    let config = match &args.config {
        Some(path) => ResunetConfig::load(path)
            .map_err(|e| anyhow::anyhow!("failed to load config {}: {e:?}", path.display()))?,
        None => ResunetConfig::resunet_middle(),
    };

    if let Some(path) = &args.save_config {
        config
            .save(path)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved config");
    }

    run(&args, &config, &device)
}

fn run(args: &Args, config: &ResunetConfig, device: &SelectedDevice) -> Result<()> {
    let mut model = config.init::<SelectedBackend>(device)?;
    if let Some(std) = args.init_std {
        model = model.reinitialize(&WeightInitConfig::new().with_std(std));
    }
    tracing::info!(params = model.num_params(), "model ready");

    let normal = Distribution::Normal(0.0, 1.0);
    let x = Tensor::<SelectedBackend, 4>::random(
        [args.batch, config.encoder.in_channels, args.height, args.width],
        normal,
        device,
    );
    let [vh, vw] = args.visual_size;
    let visual = Tensor::random(
        [args.batch, config.fusion.visual_channels, vh, vw],
        normal,
        device,
    );
    let [ah, aw] = args.aux_size;
    let aux = Tensor::random([args.batch, config.fusion.aux_channels, ah, aw], normal, device);

    let features = model.forward_enc(x.clone());
    for (level, feature) in features.iter().enumerate() {
        println!("x{}: {:?}", level + 1, feature.dims());
    }

    let output = model.forward(x, visual, aux)?;
    println!("output: {:?}", output.dims());

    let [x1, ..] = features;
    let r = model.pearson_correlation(x1.clone(), x1);
    println!(
        "self-correlation of x1 (expected ~1 where x1 varies): mean {:.4}",
        r.mean().into_scalar().elem::<f32>()
    );

    if let Some(path) = &args.save_model {
        model
            .save_file(path.clone(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new())
            .map_err(|e| anyhow::anyhow!("failed to save model {}: {e:?}", path.display()))?;
        tracing::info!(path = %path.display(), "saved model record");
    }

    Ok(())
}
