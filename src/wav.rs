//! WAV input for local feature extraction
//!
//! Reads any integer or float WAV, converts to f32 and mixes down to mono.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WebfeatError};
use crate::transform::Transform;

/// Mono waveform with its sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct MonoSignal {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoSignal {
    /// `[1, samples]` view for the waveform transforms
    pub fn to_batch(&self) -> Array2<f32> {
        Array2::from_shape_vec((1, self.samples.len()), self.samples.clone())
            .unwrap_or_else(|_| Array2::zeros((1, 0)))
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Load a WAV file and average its channels
///
/// # Errors
/// * `FileNotFound` - the file does not exist
/// * `InvalidAudio` - not a WAV file, or an unsupported sample layout
pub fn load_mono(path: &Path) -> Result<MonoSignal> {
    if !path.exists() {
        return Err(WebfeatError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| WebfeatError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(WebfeatError::InvalidAudio {
            reason: "WAV header declares zero channels".to_string(),
        });
    }

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    let samples = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok(MonoSignal {
        samples,
        sample_rate: spec.sample_rate,
    })
}

fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |e: hound::Error| WebfeatError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
    };

    match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        // 24-bit stored as i32 in hound
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(invalid),
        (SampleFormat::Int, bits) => Err(WebfeatError::InvalidAudio {
            reason: format!("{}-bit integer audio is not supported", bits),
        }),
    }
}

/// Serializable feature output, one row per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub transform: String,
    pub sample_rate: u32,
    pub num_mel_bins: usize,
    /// `[frames, num_mel_bins]`
    pub shape: [usize; 2],
    pub frames: Vec<Vec<f32>>,
}

impl FeatureMatrix {
    /// Take the first batch entry of a `[batch, frames, mels]` tensor
    pub fn from_tensor(transform: &str, sample_rate: u32, features: &Array3<f32>) -> Self {
        let (_, num_frames, num_mel_bins) = features.dim();
        let frames = features
            .outer_iter()
            .next()
            .map(|batch| batch.outer_iter().map(|row| row.to_vec()).collect())
            .unwrap_or_default();

        Self {
            transform: transform.to_string(),
            sample_rate,
            num_mel_bins,
            shape: [num_frames, num_mel_bins],
            frames,
        }
    }
}

/// Run a waveform transform over a WAV file
pub fn extract_features(
    transform: &dyn Transform,
    path: &Path,
    num_mel_bins: usize,
) -> Result<FeatureMatrix> {
    let signal = load_mono(path)?;
    log::info!(
        "Loaded {} ({:.2}s at {} Hz)",
        path.display(),
        signal.duration_secs(),
        signal.sample_rate
    );

    let batch = signal.to_batch();
    let features = transform.apply(batch.view().into_dyn(), signal.sample_rate, num_mel_bins)?;
    Ok(FeatureMatrix::from_tensor(
        transform.name(),
        signal.sample_rate,
        &features,
    ))
}
