//! Exportable feature transforms
//!
//! A [`Transform`] is a named, pure function with a fixed input signature:
//! one float tensor plus two scalar integers (sample rate and number of mel
//! bins). Each transform can both run natively and describe itself as a
//! [`Graph`] for export.

mod registry;
mod signals2logmel;
mod spec2logmel;

use std::fmt;

use ndarray::{Array3, ArrayViewD};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WebfeatError};
use crate::export::Graph;

pub use registry::TransformRegistry;
pub use signals2logmel::Signals2LogMel;
pub use spec2logmel::Spec2LogMel;

/// Element type of a tensor in a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
    Int32,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Float32 => write!(f, "float32"),
            DType::Int32 => write!(f, "int32"),
        }
    }
}

/// Declared shape and dtype of one signature input
///
/// `None` dimensions accept any length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<Option<usize>>,
    pub dtype: DType,
}

impl TensorSpec {
    pub fn new(name: &str, shape: Vec<Option<usize>>, dtype: DType) -> Self {
        Self {
            name: name.to_string(),
            shape,
            dtype,
        }
    }

    /// Float tensor of the given rank with every dimension dynamic
    pub fn dynamic_float(name: &str, rank: usize) -> Self {
        Self::new(name, vec![None; rank], DType::Float32)
    }

    /// Scalar int32 input
    pub fn scalar_int(name: &str) -> Self {
        Self::new(name, Vec::new(), DType::Int32)
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Check a concrete shape against this spec
    pub fn accepts(&self, shape: &[usize]) -> bool {
        shape.len() == self.rank()
            && self
                .shape
                .iter()
                .zip(shape)
                .all(|(declared, actual)| declared.map_or(true, |d| d == *actual))
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .shape
            .iter()
            .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
            .collect();
        write!(f, "{}[{}]", self.dtype, dims.join(", "))
    }
}

/// A named feature transform that can run natively and be exported
pub trait Transform: Send + Sync {
    /// Export name, also the artifact directory name
    fn name(&self) -> &'static str;

    /// Spec of the tensor input
    fn input_spec(&self) -> TensorSpec;

    /// Full input signature: the tensor, then `sample_rate` and `num_mel_bins`
    fn signature(&self) -> Vec<TensorSpec> {
        vec![
            self.input_spec(),
            TensorSpec::scalar_int("sample_rate"),
            TensorSpec::scalar_int("num_mel_bins"),
        ]
    }

    /// Run the transform, returning `[batch, frames, num_mel_bins]`
    fn apply(
        &self,
        input: ArrayViewD<f32>,
        sample_rate: u32,
        num_mel_bins: usize,
    ) -> Result<Array3<f32>>;

    /// Describe the computation for export
    fn graph(&self) -> Graph;
}

/// Fail with `ShapeMismatch` unless `shape` fits the transform's input spec
pub fn check_input(transform: &dyn Transform, shape: &[usize]) -> Result<()> {
    let spec = transform.input_spec();
    if spec.accepts(shape) {
        return Ok(());
    }
    Err(WebfeatError::ShapeMismatch {
        transform: transform.name().to_string(),
        expected: spec.to_string(),
        actual: format!("float32{shape:?}"),
    })
}
