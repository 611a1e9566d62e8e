//! `signals2logmel`: raw waveforms to normalized log-mel

use ndarray::{Array3, ArrayViewD, Ix2};
use serde_json::json;

use super::{check_input, TensorSpec, Transform};
use crate::error::{Result, WebfeatError};
use crate::export::{ops, Graph};
use crate::features::{
    self, DECIMATION_FACTOR, FFT_LENGTH, FRAME_LENGTH_MS, FRAME_STEP_MS, LOG_FLOOR,
};

/// Log-mel transform for `[batch, samples]` waveforms
#[derive(Debug, Clone, Copy, Default)]
pub struct Signals2LogMel;

impl Transform for Signals2LogMel {
    fn name(&self) -> &'static str {
        "signals2logmel"
    }

    fn input_spec(&self) -> TensorSpec {
        TensorSpec::dynamic_float("signals", 2)
    }

    fn apply(
        &self,
        input: ArrayViewD<f32>,
        sample_rate: u32,
        num_mel_bins: usize,
    ) -> Result<Array3<f32>> {
        check_input(self, input.shape())?;
        let signals = input
            .into_dimensionality::<Ix2>()
            .map_err(|e| WebfeatError::ShapeMismatch {
                transform: self.name().to_string(),
                expected: self.input_spec().to_string(),
                actual: e.to_string(),
            })?;
        features::signals2logmel(signals, sample_rate, num_mel_bins)
    }

    fn graph(&self) -> Graph {
        Graph::builder(self.signature())
            .scalar("lower_edge_hertz", 0.0)
            .scalar("log_floor", LOG_FLOOR)
            .node_with_attrs(
                "decimated",
                ops::STRIDED_SLICE,
                &["signals"],
                &[("axis", json!(1)), ("stride", json!(DECIMATION_FACTOR))],
            )
            .node_with_attrs(
                "decimated_rate",
                ops::FLOOR_DIV,
                &["sample_rate"],
                &[("divisor", json!(DECIMATION_FACTOR))],
            )
            .node_with_attrs(
                "frame_length",
                ops::MS_TO_FRAMES,
                &["decimated_rate"],
                &[("ms", json!(FRAME_LENGTH_MS))],
            )
            .node_with_attrs(
                "frame_step",
                ops::MS_TO_FRAMES,
                &["decimated_rate"],
                &[("ms", json!(FRAME_STEP_MS))],
            )
            .node_with_attrs(
                "stft",
                ops::STFT,
                &["decimated", "frame_length", "frame_step"],
                &[
                    ("fft_length", json!(FFT_LENGTH)),
                    ("window", json!("hann_periodic")),
                    ("pad_end", json!(false)),
                ],
            )
            .node("magnitude", ops::COMPLEX_ABS, &["stft"])
            .node("power", ops::SQUARE, &["magnitude"])
            .node_with_attrs("upper_edge_hertz", ops::CAST, &["decimated_rate"], &[("to", json!("float32"))])
            .node_with_attrs("num_bins", ops::SHAPE_DIM, &["power"], &[("axis", json!(2))])
            .node_with_attrs(
                "mel_weights",
                ops::MEL_WEIGHT_MATRIX,
                &["num_mel_bins", "num_bins", "decimated_rate", "lower_edge_hertz", "upper_edge_hertz"],
                &[("scale", json!("htk"))],
            )
            .node_with_attrs("mel", ops::TENSOR_DOT, &["power", "mel_weights"], &[("axes", json!(1))])
            .node("floored", ops::ADD, &["mel", "log_floor"])
            .node("log_mel", ops::LOG, &["floored"])
            .node_with_attrs(
                "cmvn",
                ops::CMVN,
                &["log_mel"],
                &[("axis", json!(1)), ("normalize_variance", json!(true))],
            )
            .output("cmvn")
            .build()
    }
}
