//! `spec2logmel`: decibel spectrogram to normalized log-mel

use ndarray::{Array3, ArrayViewD, Ix3};
use serde_json::json;

use super::{check_input, TensorSpec, Transform};
use crate::error::{Result, WebfeatError};
use crate::export::{ops, Graph};
use crate::features::{self, LOG_FLOOR};

/// Log-mel transform for `[batch, time, bins]` power spectrograms in dB
#[derive(Debug, Clone, Copy, Default)]
pub struct Spec2LogMel;

impl Transform for Spec2LogMel {
    fn name(&self) -> &'static str {
        "spec2logmel"
    }

    fn input_spec(&self) -> TensorSpec {
        TensorSpec::dynamic_float("spec", 3)
    }

    fn apply(
        &self,
        input: ArrayViewD<f32>,
        sample_rate: u32,
        num_mel_bins: usize,
    ) -> Result<Array3<f32>> {
        check_input(self, input.shape())?;
        let spec = input
            .into_dimensionality::<Ix3>()
            .map_err(|e| WebfeatError::ShapeMismatch {
                transform: self.name().to_string(),
                expected: self.input_spec().to_string(),
                actual: e.to_string(),
            })?;
        features::spec2logmel(spec, sample_rate, num_mel_bins)
    }

    fn graph(&self) -> Graph {
        Graph::builder(self.signature())
            .scalar("db_base", 10.0)
            .scalar("db_scale", 0.1)
            .scalar("half", 0.5)
            .scalar("lower_edge_hertz", 0.0)
            .scalar("log_floor", LOG_FLOOR)
            .node("power", ops::DB_TO_POWER, &["spec", "db_base", "db_scale"])
            .node_with_attrs("rate", ops::CAST, &["sample_rate"], &[("to", json!("float32"))])
            .node("upper_edge_hertz", ops::MUL, &["rate", "half"])
            .node_with_attrs("num_bins", ops::SHAPE_DIM, &["power"], &[("axis", json!(2))])
            .node_with_attrs(
                "mel_weights",
                ops::MEL_WEIGHT_MATRIX,
                &["num_mel_bins", "num_bins", "sample_rate", "lower_edge_hertz", "upper_edge_hertz"],
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

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_apply_matches_pipeline() {
        let spec = Array3::<f32>::from_shape_fn((1, 20, 129), |(_, t, f)| {
            -80.0 + ((t * 3 + f) % 17) as f32
        });
        let via_trait = Spec2LogMel.apply(spec.view().into_dyn(), 8000, 23).unwrap();
        let direct = features::spec2logmel(spec.view(), 8000, 23).unwrap();
        assert_eq!(via_trait, direct);
    }

    #[test]
    fn test_rank_mismatch() {
        let signals = Array2::<f32>::zeros((1, 400));
        let err = Spec2LogMel
            .apply(signals.view().into_dyn(), 16000, 40)
            .unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_MISMATCH");
        assert!(err.to_string().contains("spec2logmel"));
    }

    #[test]
    fn test_graph_is_valid() {
        let graph = Spec2LogMel.graph();
        assert!(graph.validate().is_ok());
        assert_eq!(graph.inputs.len(), 3);
        assert_eq!(graph.outputs, vec!["cmvn".to_string()]);
        assert!(graph.op_names().contains(&ops::DB_TO_POWER));
    }
}
