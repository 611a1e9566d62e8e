//! Mel filterbank
//!
//! HTK-style mel scale with natural-log formula `1127 * ln(1 + f / 700)`.
//! The DC bin always gets zero weight.

use ndarray::{Array2, Array3, ArrayView3, Axis};

use crate::error::{Result, WebfeatError};

const MEL_BREAK_FREQUENCY_HERTZ: f64 = 700.0;
const MEL_HIGH_FREQUENCY_Q: f64 = 1127.0;

/// Convert frequency in Hz to mel
pub fn hertz_to_mel(frequency: f64) -> f64 {
    MEL_HIGH_FREQUENCY_Q * (1.0 + frequency / MEL_BREAK_FREQUENCY_HERTZ).ln()
}

/// Convert mel to frequency in Hz
pub fn mel_to_hertz(mel: f64) -> f64 {
    MEL_BREAK_FREQUENCY_HERTZ * ((mel / MEL_HIGH_FREQUENCY_Q).exp() - 1.0)
}

/// Build a `[num_spectrogram_bins, num_mel_bins]` weight matrix
///
/// Spectrogram bins are spaced linearly from 0 Hz to `sample_rate / 2`.
/// Mel band edges are `num_mel_bins + 2` points spaced evenly on the mel
/// scale between `lower_edge_hertz` and `upper_edge_hertz`. Bands reaching
/// past Nyquist only collect the bins that exist.
///
/// # Errors
/// * `InvalidParameter` - zero bins, or `lower_edge_hertz >= upper_edge_hertz`
pub fn linear_to_mel_weight_matrix(
    num_mel_bins: usize,
    num_spectrogram_bins: usize,
    sample_rate: u32,
    lower_edge_hertz: f64,
    upper_edge_hertz: f64,
) -> Result<Array2<f32>> {
    if num_mel_bins == 0 {
        return Err(invalid("num_mel_bins", "must be positive"));
    }
    if num_spectrogram_bins == 0 {
        return Err(invalid("num_spectrogram_bins", "must be positive"));
    }
    if lower_edge_hertz < 0.0 || lower_edge_hertz >= upper_edge_hertz {
        return Err(invalid(
            "upper_edge_hertz",
            &format!(
                "band [{lower_edge_hertz}, {upper_edge_hertz}] Hz must be non-empty and non-negative"
            ),
        ));
    }

    let nyquist_hertz = sample_rate as f64 / 2.0;
    let bin_hertz = |bin: usize| {
        if num_spectrogram_bins == 1 {
            0.0
        } else {
            nyquist_hertz * bin as f64 / (num_spectrogram_bins - 1) as f64
        }
    };

    let lower_mel = hertz_to_mel(lower_edge_hertz);
    let upper_mel = hertz_to_mel(upper_edge_hertz);
    let edge_mel = |i: usize| lower_mel + (upper_mel - lower_mel) * i as f64 / (num_mel_bins + 1) as f64;

    let mut weights = Array2::<f32>::zeros((num_spectrogram_bins, num_mel_bins));
    for bin in 1..num_spectrogram_bins {
        let mel = hertz_to_mel(bin_hertz(bin));
        for band in 0..num_mel_bins {
            let (left, center, right) = (edge_mel(band), edge_mel(band + 1), edge_mel(band + 2));
            let lower_slope = (mel - left) / (center - left);
            let upper_slope = (right - mel) / (right - center);
            weights[[bin, band]] = lower_slope.min(upper_slope).max(0.0) as f32;
        }
    }

    Ok(weights)
}

/// Project `[batch, time, bins]` onto mel bands, giving `[batch, time, mels]`
///
/// # Errors
/// * `ShapeMismatch` - the bin axis does not match the weight matrix rows
pub fn linear_to_mel(spectrogram: ArrayView3<f32>, weights: &Array2<f32>) -> Result<Array3<f32>> {
    let (batch, time, bins) = spectrogram.dim();
    let (weight_bins, mels) = weights.dim();
    if bins != weight_bins {
        return Err(WebfeatError::ShapeMismatch {
            transform: "linear_to_mel".to_string(),
            expected: format!("{weight_bins} spectrogram bins"),
            actual: format!("{bins} spectrogram bins"),
        });
    }

    let mut output = Array3::<f32>::zeros((batch, time, mels));
    for (b, frames) in spectrogram.axis_iter(Axis(0)).enumerate() {
        output.index_axis_mut(Axis(0), b).assign(&frames.dot(weights));
    }
    Ok(output)
}

fn invalid(name: &str, reason: &str) -> WebfeatError {
    WebfeatError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mel_scale_roundtrip() {
        for freq in [100.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0] {
            let back = mel_to_hertz(hertz_to_mel(freq));
            assert_abs_diff_eq!(freq, back, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_mel_scale_known_values() {
        // 1127 * ln(1 + 1000/700) is close to 1000 mel
        assert_abs_diff_eq!(hertz_to_mel(1000.0), 1000.0, epsilon = 1.0);
        assert_eq!(hertz_to_mel(0.0), 0.0);
    }

    #[test]
    fn test_weight_matrix_shape_and_dc() {
        let weights = linear_to_mel_weight_matrix(40, 257, 16000, 0.0, 8000.0).unwrap();
        assert_eq!(weights.dim(), (257, 40));
        assert!(weights.row(0).iter().all(|&w| w == 0.0));
        assert!(weights.iter().all(|&w| (0.0..=1.0).contains(&w)));
    }

    #[test]
    fn test_every_band_gets_energy() {
        let weights = linear_to_mel_weight_matrix(40, 257, 16000, 0.0, 8000.0).unwrap();
        for band in weights.columns() {
            assert!(band.sum() > 0.0);
        }
    }

    #[test]
    fn test_bands_beyond_nyquist_are_empty() {
        // Upper edge at the full rate: the top bands start above Nyquist
        let weights = linear_to_mel_weight_matrix(40, 257, 5333, 0.0, 5333.0).unwrap();
        let top = weights.column(39);
        assert_eq!(top.sum(), 0.0);
        assert!(weights.column(0).sum() > 0.0);
    }

    #[test]
    fn test_invalid_band_edges() {
        assert!(linear_to_mel_weight_matrix(40, 257, 16000, 8000.0, 8000.0).is_err());
        assert!(linear_to_mel_weight_matrix(0, 257, 16000, 0.0, 8000.0).is_err());
    }

    #[test]
    fn test_linear_to_mel_projection() {
        let weights = linear_to_mel_weight_matrix(4, 9, 16000, 0.0, 8000.0).unwrap();
        let spec = Array3::<f32>::ones((2, 3, 9));
        let mel = linear_to_mel(spec.view(), &weights).unwrap();
        assert_eq!(mel.dim(), (2, 3, 4));

        let column_sums: Vec<f32> = weights.columns().into_iter().map(|c| c.sum()).collect();
        for (band, expected) in column_sums.iter().enumerate() {
            assert_abs_diff_eq!(mel[[1, 2, band]], *expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_linear_to_mel_bin_mismatch() {
        let weights = linear_to_mel_weight_matrix(4, 9, 16000, 0.0, 8000.0).unwrap();
        let spec = Array3::<f32>::ones((1, 3, 10));
        let err = linear_to_mel(spec.view(), &weights).unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_MISMATCH");
    }
}
