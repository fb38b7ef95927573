use burn::{
    backend::NdArray,
    module::{ModuleVisitor, ParamId},
    prelude::*,
    tensor::Distribution,
};

use crate::{
    config::{BlockKind, DecoderConfig, EncoderConfig, FusionConfig, FusionKind, ResunetConfig},
    error::ResunetError,
    WeightInitConfig,
};

type TestBackend = NdArray<f32>;

/// A narrow network that keeps the end-to-end tests fast.
fn small_config() -> ResunetConfig {
    ResunetConfig::new()
        .with_encoder(
            EncoderConfig::new()
                .with_base_channels(8)
                .with_stage_channels([16, 32, 64, 64])
                .with_num_blocks([1, 1, 1, 1]),
        )
        .with_fusion(
            FusionConfig::new()
                .with_visual_channels(16)
                .with_reduced_visual_channels(8)
                .with_aux_channels(8)
                .with_num_heads(4),
        )
}

fn random<const D: usize>(
    shape: [usize; D],
    device: &<TestBackend as Backend>::Device,
) -> Tensor<TestBackend, D> {
    Tensor::random(shape, Distribution::Normal(0.0, 1.0), device)
}

fn expect_invalid_configuration(config: &ResunetConfig, needle: &str) {
    match config.validate() {
        Err(ResunetError::InvalidConfiguration { reason }) => {
            assert!(reason.contains(needle), "unexpected reason: {reason}");
        }
        other => panic!("Expected InvalidConfiguration error, got {other:?}"),
    }
}

#[test]
fn test_valid_configuration() {
    assert!(ResunetConfig::new().validate().is_ok());
    assert!(ResunetConfig::resunet_middle().validate().is_ok());
    assert!(small_config().validate().is_ok());
}

#[test]
fn test_resunet_middle_layout() {
    let config = ResunetConfig::resunet_middle();

    assert_eq!(config.encoder.block, BlockKind::Basic);
    assert_eq!(config.encoder.num_blocks, [2, 2, 2, 2]);
    assert_eq!(config.encoder.in_channels, 1);
    assert_eq!(config.encoder.channels(), [64, 128, 256, 512, 512]);
    assert_eq!(config.fusion.context_channels(), 512);
    assert_eq!(config.decoder.n_classes, 1);
    assert!(config.decoder.bilinear);
}

#[test]
fn test_from_layout() {
    let config = ResunetConfig::from_layout(BlockKind::Bottleneck, [3, 4, 6, 3], 2, 4, false);

    assert_eq!(config.encoder.block, BlockKind::Bottleneck);
    assert_eq!(config.encoder.num_blocks, [3, 4, 6, 3]);
    assert_eq!(config.encoder.in_channels, 2);
    assert_eq!(config.decoder.n_classes, 4);
    assert!(!config.decoder.bilinear);
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_input_channels() {
    let config = ResunetConfig::new().with_encoder(EncoderConfig::new().with_in_channels(0));
    expect_invalid_configuration(&config, "in_channels must be > 0");
}

#[test]
fn test_zero_stage_width() {
    let config = ResunetConfig::new()
        .with_encoder(EncoderConfig::new().with_stage_channels([128, 0, 512, 512]));
    expect_invalid_configuration(&config, "level 2 has 0");
}

#[test]
fn test_empty_stage() {
    let config =
        ResunetConfig::new().with_encoder(EncoderConfig::new().with_num_blocks([2, 2, 0, 2]));
    expect_invalid_configuration(&config, "stage 2 has 0");
}

#[test]
fn test_heads_must_divide_audio_width() {
    let config = ResunetConfig::new().with_fusion(FusionConfig::new().with_num_heads(7));
    expect_invalid_configuration(&config, "num_heads (7)");

    // The concat fusion has no heads to check
    let config = ResunetConfig::new().with_fusion(
        FusionConfig::new()
            .with_kind(FusionKind::Concat)
            .with_num_heads(7),
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_dropout_range() {
    let config = ResunetConfig::new().with_fusion(FusionConfig::new().with_dropout(1.0));
    expect_invalid_configuration(&config, "dropout must be in [0, 1)");
}

#[test]
fn test_zero_epsilon() {
    let config = ResunetConfig::new().with_fusion(FusionConfig::new().with_correlation_eps(0.0));
    expect_invalid_configuration(&config, "Epsilon values must be > 0");
}

#[test]
fn test_init_rejects_invalid_configuration() {
    let device = Default::default();
    let config = small_config().with_fusion(FusionConfig::new().with_aux_channels(0));

    let result = config.init::<TestBackend>(&device);
    assert!(matches!(
        result,
        Err(ResunetError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_config_json_roundtrip() {
    let config = ResunetConfig::from_layout(BlockKind::Bottleneck, [1, 2, 3, 4], 3, 2, false)
        .with_fusion(FusionConfig::new().with_kind(FusionKind::Concat));

    let json = config.to_string();
    let loaded = ResunetConfig::load_binary(json.as_bytes()).unwrap();

    assert_eq!(loaded.encoder.block, BlockKind::Bottleneck);
    assert_eq!(loaded.encoder.num_blocks, [1, 2, 3, 4]);
    assert_eq!(loaded.encoder.in_channels, 3);
    assert_eq!(loaded.fusion.kind, FusionKind::Concat);
    assert_eq!(loaded.decoder.n_classes, 2);
    assert!(!loaded.decoder.bilinear);
}

#[test]
fn test_forward_restores_resolution() {
    let device = Default::default();
    let model = small_config().init::<TestBackend>(&device).unwrap();

    let x = random([2, 1, 32, 48], &device);
    let visual = random([2, 16, 1, 3], &device);
    let aux = random([2, 8, 2, 1], &device);

    let output = model.forward(x, visual, aux).unwrap();
    assert_eq!(output.dims(), [2, 1, 32, 48]);
}

#[test]
fn test_forward_odd_resolution() {
    let device = Default::default();
    let model = small_config().init::<TestBackend>(&device).unwrap();

    // 36x40 gives a 3x3 deepest map, so the coarse stages crop their upsampled input
    let x = random([1, 1, 36, 40], &device);
    let features = model.forward_enc(x.clone());
    assert_eq!(features[4].dims(), [1, 64, 3, 3]);

    let visual = random([1, 16, 1, 1], &device);
    let aux = random([1, 8, 3, 1], &device);

    let output = model.forward(x, visual, aux).unwrap();
    assert_eq!(output.dims(), [1, 1, 36, 40]);
}

#[test]
fn test_forward_variants() {
    let device = Default::default();
    let config = small_config()
        .with_encoder(
            EncoderConfig::new()
                .with_in_channels(2)
                .with_base_channels(8)
                .with_stage_channels([16, 32, 64, 64])
                .with_num_blocks([1, 1, 1, 1])
                .with_block(BlockKind::Bottleneck),
        )
        .with_fusion(
            FusionConfig::new()
                .with_kind(FusionKind::Concat)
                .with_visual_channels(16)
                .with_reduced_visual_channels(8)
                .with_aux_channels(8),
        );
    let config = config.with_decoder(DecoderConfig::new().with_n_classes(3).with_bilinear(false));
    let model = config.init::<TestBackend>(&device).unwrap();

    let x = random([1, 2, 32, 32], &device);
    let visual = random([1, 16, 2, 2], &device);
    let aux = random([1, 8, 1, 1], &device);

    let output = model.forward(x, visual, aux).unwrap();
    assert_eq!(output.dims(), [1, 3, 32, 32]);
}

#[test]
fn test_forward_is_batch_independent() {
    let device = Default::default();
    let model = small_config().init::<TestBackend>(&device).unwrap();

    let x = random([2, 1, 32, 32], &device);
    let visual = random([2, 16, 1, 1], &device);
    let aux = random([2, 8, 2, 2], &device);

    let batched = model
        .forward(x.clone(), visual.clone(), aux.clone())
        .unwrap();

    for i in 0..2 {
        let single = model
            .forward(
                x.clone().slice([i..i + 1]),
                visual.clone().slice([i..i + 1]),
                aux.clone().slice([i..i + 1]),
            )
            .unwrap();
        let expected = batched.clone().slice([i..i + 1]);

        let diff = (single - expected).abs().max().into_scalar();
        assert!(diff < 1e-4, "sample {i} differs by {diff}");
    }
}

#[test]
fn test_forward_rejects_wrong_input_channels() {
    let device = Default::default();
    let model = small_config().init::<TestBackend>(&device).unwrap();

    let x = random([1, 3, 32, 32], &device);
    let visual = random([1, 16, 1, 1], &device);
    let aux = random([1, 8, 1, 1], &device);

    match model.forward(x, visual, aux) {
        Err(ResunetError::InvalidTensorShape { expected, actual }) => {
            assert_eq!(expected, "[B, 1, H, W]");
            assert_eq!(actual, "[1, 3, 32, 32]");
        }
        other => panic!("Expected InvalidTensorShape error, got {other:?}"),
    }
}

#[test]
fn test_forward_rejects_untileable_modality() {
    let device = Default::default();
    let model = small_config().init::<TestBackend>(&device).unwrap();

    // Deepest map is 2x2, a 3x3 visual map cannot be tiled onto it
    let x = random([1, 1, 32, 32], &device);
    let visual = random([1, 16, 3, 3], &device);
    let aux = random([1, 8, 1, 1], &device);

    let result = model.forward(x, visual, aux);
    assert!(matches!(
        result,
        Err(ResunetError::InvalidTensorShape { .. })
    ));
}

#[test]
fn test_reinitialize_with_zero_std() {
    let device = Default::default();
    let model = small_config()
        .init::<TestBackend>(&device)
        .unwrap()
        .reinitialize(&WeightInitConfig::new().with_std(0.0));

    // Every weight is zero, so the readout reduces to its bias
    let x = random([1, 1, 32, 32], &device);
    let visual = random([1, 16, 1, 1], &device);
    let aux = random([1, 8, 2, 2], &device);

    let output = model.forward(x, visual, aux).unwrap();
    let min = output.clone().min().into_scalar();
    let max = output.max().into_scalar();
    assert!((max - min).abs() < 1e-6, "output spans [{min}, {max}]");
}

#[test]
fn test_pearson_correlation_of_encoder_features() {
    let device = Default::default();
    let model = small_config().init::<TestBackend>(&device).unwrap();

    let features = model.forward_enc(random([1, 1, 32, 32], &device));
    let x5 = features[4].clone();

    let r = model.pearson_correlation(x5.clone(), x5.clone().neg());
    assert_eq!(r.dims(), [1, 1, 2, 2]);

    for value in r.into_data().to_vec::<f32>().unwrap() {
        // ReLU outputs may be constant along channels, which yields 0
        assert!(value.abs() < 1e-6 || (value + 1.0).abs() < 1e-4, "got {value}");
    }
}

#[test]
fn test_resunet_middle_forward() {
    let device = Default::default();
    let model = crate::Resunet::<TestBackend>::resunet_middle(&device).unwrap();

    let x = random([1, 1, 256, 320], &device);
    let visual = random([1, 512, 4, 4], &device);
    let aux = random([1, 256, 1, 1], &device);

    let output = model.forward(x, visual, aux).unwrap();
    assert_eq!(output.dims(), [1, 1, 256, 320]);
}

#[test]
fn test_default_modalities_on_narrow_encoder() {
    let device = Default::default();
    let config = ResunetConfig::resunet_middle().with_encoder(
        EncoderConfig::new()
            .with_base_channels(8)
            .with_stage_channels([16, 32, 64, 64])
            .with_num_blocks([1, 1, 1, 1]),
    );
    let model = config.init::<TestBackend>(&device).unwrap();

    let x = random([1, 1, 256, 320], &device);
    let visual = random([1, 512, 4, 4], &device);
    let aux = random([1, 256, 1, 1], &device);

    let output = model.forward(x, visual, aux).unwrap();
    assert_eq!(output.dims(), [1, 1, 256, 320]);
}

/// Pools the statistics of every conv/linear weight (rank 2 and rank 4).
#[derive(Default)]
struct WeightStats {
    tensors: usize,
    count: usize,
    sum: f64,
    sum_sq: f64,
    outliers: Vec<(usize, f64)>,
}

impl ModuleVisitor<TestBackend> for WeightStats {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<TestBackend, D>) {
        if D != 2 && D != 4 {
            return;
        }
        let values = tensor.to_data().to_vec::<f32>().unwrap();
        let n = values.len();
        let sum: f64 = values.iter().map(|&v| v as f64).sum();
        let sum_sq: f64 = values.iter().map(|&v| (v as f64).powi(2)).sum();

        self.tensors += 1;
        self.count += n;
        self.sum += sum;
        self.sum_sq += sum_sq;

        // Large enough for a stable estimate of the spread
        if n >= 64 {
            let mean = sum / n as f64;
            let std = (sum_sq / n as f64 - mean * mean).sqrt();
            if (std - 0.02).abs() > 0.008 {
                self.outliers.push((n, std));
            }
        }
    }
}

#[test]
fn test_reinitialize_reaches_every_weight() {
    let device = Default::default();
    for kind in [FusionKind::CrossAttention, FusionKind::Concat] {
        let config = small_config()
            .with_fusion(small_config().fusion.with_kind(kind))
            .with_decoder(DecoderConfig::new().with_bilinear(false));
        let model = config
            .init::<TestBackend>(&device)
            .unwrap()
            .reinitialize(&WeightInitConfig::new());

        let mut stats = WeightStats::default();
        model.visit(&mut stats);

        assert!(stats.tensors > 0);
        assert!(stats.outliers.is_empty(), "weights off N(0, 0.02): {:?}", stats.outliers);

        let n = stats.count as f64;
        let mean = stats.sum / n;
        let std = (stats.sum_sq / n - mean * mean).sqrt();
        assert!(mean.abs() < 1e-3, "mean {mean}");
        assert!((std - 0.02).abs() < 1e-3, "std {std}");
    }
}
