//! Feature Transform Tests
//!
//! Behavior of the log-mel transforms through the `Transform` interface.

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array3, Axis};
use webfeat::features::{linear_to_mel_weight_matrix, spec2logmel};
use webfeat::transform::{Transform, TransformRegistry};

/// Helper to create a batch of sine waves
fn sine_batch(frequencies: &[f32], sample_rate: u32, duration_secs: f32) -> Array2<f32> {
    let n = (sample_rate as f32 * duration_secs) as usize;
    Array2::from_shape_fn((frequencies.len(), n), |(b, i)| {
        let t = i as f32 / sample_rate as f32;
        let chirp = 1.0 + 0.5 * (2.0 * std::f32::consts::PI * 3.0 * t).sin();
        (2.0 * std::f32::consts::PI * frequencies[b] * t).sin() * chirp
    })
}

#[test]
fn test_transforms_are_pure() {
    let registry = TransformRegistry::with_defaults();

    let signals = sine_batch(&[300.0, 700.0], 16000, 0.5);
    let t = registry.get("signals2logmel").unwrap();
    let a = t.apply(signals.view().into_dyn(), 16000, 40).unwrap();
    let b = t.apply(signals.view().into_dyn(), 16000, 40).unwrap();
    assert_eq!(a, b);

    let spec = Array3::<f32>::from_shape_fn((1, 30, 257), |(_, t, f)| {
        -90.0 + ((t * 31 + f * 7) % 50) as f32
    });
    let t = registry.get("spec2logmel").unwrap();
    let a = t.apply(spec.view().into_dyn(), 16000, 40).unwrap();
    let b = t.apply(spec.view().into_dyn(), 16000, 40).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_signal_shorter_than_one_step() {
    let registry = TransformRegistry::with_defaults();
    let t = registry.get("signals2logmel").unwrap();

    // 100 samples at 16 kHz is 34 samples after decimation, under one 53-sample step
    let signals = Array2::<f32>::ones((2, 100));
    let out = t.apply(signals.view().into_dyn(), 16000, 40).unwrap();
    assert_eq!(out.dim(), (2, 0, 40));

    let empty = Array2::<f32>::zeros((1, 0));
    let out = t.apply(empty.view().into_dyn(), 16000, 40).unwrap();
    assert_eq!(out.dim(), (1, 0, 40));
}

#[test]
fn test_features_are_normalized_over_time() {
    let registry = TransformRegistry::with_defaults();
    let signals = sine_batch(&[440.0], 16000, 1.0);
    let out = registry
        .get("signals2logmel")
        .unwrap()
        .apply(signals.view().into_dyn(), 16000, 40)
        .unwrap();

    let means = out.mean_axis(Axis(1)).unwrap();
    for &m in means.iter() {
        assert_abs_diff_eq!(m, 0.0, epsilon = 1e-4);
    }
}

#[test]
fn test_steady_spectrogram_normalizes_to_zero() {
    // Every frame identical: CMVN leaves nothing
    let spec = Array3::<f32>::from_shape_fn((1, 12, 129), |(_, _, f)| -40.0 - f as f32 * 0.1);
    let out = spec2logmel(spec.view(), 8000, 20).unwrap();
    assert_eq!(out.dim(), (1, 12, 20));
    assert!(out.iter().all(|&v| v == 0.0));
}

#[test]
fn test_louder_band_stands_out() {
    // Energy alternates in time inside one band, the rest is steady
    let sample_rate = 16000;
    let hot_bin = 64; // 2 kHz with 257 bins over 8 kHz
    let spec = Array3::<f32>::from_shape_fn((1, 40, 257), |(_, t, f)| {
        if f == hot_bin && t % 2 == 0 {
            0.0
        } else {
            -60.0
        }
    });
    let out = spec2logmel(spec.view(), sample_rate, 40).unwrap();

    let weights = linear_to_mel_weight_matrix(40, 257, sample_rate, 0.0, 8000.0).unwrap();
    let row = weights.row(hot_bin);
    let band = (0..40)
        .max_by(|&a, &b| row[a].total_cmp(&row[b]))
        .unwrap();
    assert!(row[0] == 0.0 && row[39] == 0.0);

    let frame0 = out.index_axis(Axis(0), 0).index_axis(Axis(0), 0).to_owned();
    assert!(frame0[band] > 0.5, "band {band} should be above its mean");

    assert_abs_diff_eq!(frame0[0], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(frame0[39], 0.0, epsilon = 1e-6);
}

#[test]
fn test_wrong_rank_is_rejected() {
    let registry = TransformRegistry::with_defaults();
    let spectrogram_like = Array3::<f32>::zeros((1, 10, 257));

    let err = registry
        .get("signals2logmel")
        .unwrap()
        .apply(spectrogram_like.view().into_dyn(), 16000, 40)
        .unwrap_err();
    assert_eq!(err.error_code(), "SHAPE_MISMATCH");
}

#[test]
fn test_unknown_transform_name() {
    let registry = TransformRegistry::with_defaults();
    let err = registry.get("mfcc").err().unwrap();
    assert_eq!(err.error_code(), "UNKNOWN_TRANSFORM");
}
