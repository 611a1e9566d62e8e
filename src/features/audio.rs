//! Signal-level building blocks
//!
//! Decibel conversion, decimation, framing and the power STFT.

use ndarray::{s, Array2, Array3, ArrayView2};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{Result, WebfeatError};

/// Convert decibels to power, relative to a reference power of 1.0
pub fn db_to_power(db: f32) -> f32 {
    10.0_f32.powf(0.1 * db)
}

/// Convert a duration in milliseconds to a whole number of samples
///
/// Truncates toward zero, so short windows at low rates can yield 0.
pub fn ms_to_frames(sample_rate: u32, ms: u32) -> usize {
    (sample_rate as f32 * 1e-3 * ms as f32) as usize
}

/// Keep every `factor`-th sample of each row, starting at the first
///
/// No anti-aliasing filter is applied.
pub fn decimate(signals: ArrayView2<f32>, factor: usize) -> Array2<f32> {
    signals.slice(s![.., ..;factor]).to_owned()
}

/// Periodic Hann window of the given length
pub fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|i| {
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / length as f32).cos()
        })
        .collect()
}

/// Number of complete frames that fit in `num_samples`
///
/// The signal end is not padded, so a signal shorter than one frame has none.
pub fn num_frames(num_samples: usize, frame_length: usize, frame_step: usize) -> usize {
    if num_samples < frame_length {
        0
    } else {
        1 + (num_samples - frame_length) / frame_step
    }
}

/// Magnitude-squared short-time Fourier transform
///
/// Each frame is Hann-windowed and zero-padded (or truncated) to
/// `fft_length` before a forward FFT. Returns `[batch, frames, fft_length / 2 + 1]`.
///
/// # Errors
/// * `InvalidParameter` - `frame_length`, `frame_step` or `fft_length` is zero
pub fn power_stft(
    signals: ArrayView2<f32>,
    frame_length: usize,
    frame_step: usize,
    fft_length: usize,
) -> Result<Array3<f32>> {
    for (name, value) in [
        ("frame_length", frame_length),
        ("frame_step", frame_step),
        ("fft_length", fft_length),
    ] {
        if value == 0 {
            return Err(WebfeatError::InvalidParameter {
                name: name.to_string(),
                reason: "must be at least one sample".to_string(),
            });
        }
    }

    let (batch, num_samples) = signals.dim();
    let frames = num_frames(num_samples, frame_length, frame_step);
    let num_bins = fft_length / 2 + 1;
    let mut output = Array3::<f32>::zeros((batch, frames, num_bins));

    let window = hann_window(frame_length);
    let used = frame_length.min(fft_length);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_length);
    let mut buffer = vec![Complex::new(0.0_f32, 0.0); fft_length];

    for b in 0..batch {
        let row = signals.row(b);
        for frame in 0..frames {
            let start = frame * frame_step;

            buffer.fill(Complex::new(0.0, 0.0));
            for (i, slot) in buffer.iter_mut().take(used).enumerate() {
                *slot = Complex::new(row[start + i] * window[i], 0.0);
            }

            fft.process(&mut buffer);

            for (bin, value) in buffer.iter().take(num_bins).enumerate() {
                output[[b, frame, bin]] = value.norm_sqr();
            }
        }
    }

    Ok(output)
}
