//! Log-mel feature extraction
//!
//! Two pipelines produce CMVN-normalized log-mel spectrograms shaped
//! `[batch, frames, num_mel_bins]`:
//! - [`spec2logmel`] starts from a power spectrogram in decibels
//! - [`signals2logmel`] starts from raw waveforms
//!
//! Both are pure: the same input always yields the same output.

pub mod audio;
pub mod mel;
pub mod normalize;

use ndarray::{Array3, ArrayView2, ArrayView3, Axis};

use crate::error::{Result, WebfeatError};

pub use audio::{db_to_power, decimate, ms_to_frames, power_stft};
pub use mel::{linear_to_mel, linear_to_mel_weight_matrix};
pub use normalize::{cmvn, log_with_floor, LOG_FLOOR};

/// Waveforms are decimated by this factor before framing
pub const DECIMATION_FACTOR: u32 = 3;

/// Analysis window length
pub const FRAME_LENGTH_MS: u32 = 25;

/// Hop between consecutive windows
pub const FRAME_STEP_MS: u32 = 10;

/// FFT size for the waveform pipeline
pub const FFT_LENGTH: usize = 512;

/// Time axis of `[batch, time, bins]` tensors
pub const TIME_AXIS: Axis = Axis(1);

/// Log-mel features from a decibel power spectrogram `[batch, time, bins]`
///
/// Mel bands span 0 Hz to `sample_rate / 2`.
///
/// # Errors
/// * `InvalidParameter` - `sample_rate` or `num_mel_bins` is zero, or the
///   spectrogram has no frequency bins
pub fn spec2logmel(
    spec: ArrayView3<f32>,
    sample_rate: u32,
    num_mel_bins: usize,
) -> Result<Array3<f32>> {
    check_positive("sample_rate", sample_rate as usize)?;
    check_positive("num_mel_bins", num_mel_bins)?;

    let power = spec.mapv(db_to_power);
    let weights = linear_to_mel_weight_matrix(
        num_mel_bins,
        power.len_of(Axis(2)),
        sample_rate,
        0.0,
        sample_rate as f64 / 2.0,
    )?;

    let mut features = linear_to_mel(power.view(), &weights)?;
    log_with_floor(&mut features);
    cmvn(&mut features, TIME_AXIS);
    Ok(features)
}

/// Log-mel features from raw waveforms `[batch, samples]`
///
/// Signals are decimated by [`DECIMATION_FACTOR`] without filtering, framed
/// with 25 ms windows every 10 ms at the reduced rate, and transformed with a
/// 512-point FFT. Mel bands span 0 Hz up to the reduced rate itself, so bands
/// above its Nyquist frequency stay empty before normalization.
///
/// A signal shorter than one frame yields an empty time axis.
///
/// # Errors
/// * `InvalidParameter` - zero parameters, or a rate so low that the frame
///   length or step rounds down to zero samples
pub fn signals2logmel(
    signals: ArrayView2<f32>,
    sample_rate: u32,
    num_mel_bins: usize,
) -> Result<Array3<f32>> {
    check_positive("sample_rate", sample_rate as usize)?;
    check_positive("num_mel_bins", num_mel_bins)?;

    let signals = decimate(signals, DECIMATION_FACTOR as usize);
    let sample_rate = sample_rate / DECIMATION_FACTOR;

    let frame_length = ms_to_frames(sample_rate, FRAME_LENGTH_MS);
    let frame_step = ms_to_frames(sample_rate, FRAME_STEP_MS);
    log::debug!(
        "signals2logmel: {} Hz after decimation, frame {} step {}",
        sample_rate,
        frame_length,
        frame_step
    );

    let power = power_stft(signals.view(), frame_length, frame_step, FFT_LENGTH)?;
    let weights = linear_to_mel_weight_matrix(
        num_mel_bins,
        power.len_of(Axis(2)),
        sample_rate,
        0.0,
        sample_rate as f64,
    )?;

    let mut features = linear_to_mel(power.view(), &weights)?;
    log_with_floor(&mut features);
    cmvn(&mut features, TIME_AXIS);
    Ok(features)
}

fn check_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(WebfeatError::InvalidParameter {
            name: name.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn tone(frequency: f32, sample_rate: u32, seconds: f32) -> Array2<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin()
                    + 0.01 * ((i * 7919 % 101) as f32 / 101.0 - 0.5)
            })
            .collect();
        Array2::from_shape_vec((1, n), samples).unwrap()
    }

    #[test]
    fn test_spec2logmel_shape() {
        let spec = Array3::<f32>::from_shape_fn((2, 50, 257), |(b, t, f)| {
            -60.0 + (b + t % 7 + f % 13) as f32
        });
        let out = spec2logmel(spec.view(), 16000, 40).unwrap();
        assert_eq!(out.dim(), (2, 50, 40));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_signals2logmel_frame_count() {
        // 1 s at 16 kHz -> 5334 samples at 5333 Hz, 133-sample frames every 53
        let signals = tone(440.0, 16000, 1.0);
        let out = signals2logmel(signals.view(), 16000, 40).unwrap();
        assert_eq!(out.dim(), (1, 1 + (5334 - 133) / 53, 40));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_signals2logmel_short_signal() {
        let signals = Array2::<f32>::ones((3, 100));
        let out = signals2logmel(signals.view(), 16000, 40).unwrap();
        assert_eq!(out.dim(), (3, 0, 40));
    }

    #[test]
    fn test_signals2logmel_rejects_tiny_rate() {
        let signals = Array2::<f32>::ones((1, 100));
        let err = signals2logmel(signals.view(), 90, 40).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_zero_parameters() {
        let spec = Array3::<f32>::zeros((1, 4, 9));
        assert!(spec2logmel(spec.view(), 0, 40).is_err());
        assert!(spec2logmel(spec.view(), 16000, 0).is_err());
    }
}
