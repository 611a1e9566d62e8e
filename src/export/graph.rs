//! Computation graph description
//!
//! A graph lists signature placeholders, float32 constants and operator nodes
//! in topological order. Integer settings travel as node attributes; float
//! constants are stored as weights in the exported artifact.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WebfeatError};
use crate::transform::{DType, TensorSpec};

/// Operator names emitted by the built-in transforms
pub mod ops {
    pub const PLACEHOLDER: &str = "Placeholder";
    pub const CONST: &str = "Const";
    pub const CAST: &str = "Cast";
    pub const MUL: &str = "Mul";
    pub const ADD: &str = "AddV2";
    pub const LOG: &str = "Log";
    pub const SQUARE: &str = "Square";
    pub const COMPLEX_ABS: &str = "ComplexAbs";
    pub const FLOOR_DIV: &str = "FloorDiv";
    pub const STRIDED_SLICE: &str = "StridedSlice";
    pub const SHAPE_DIM: &str = "ShapeDim";
    pub const DB_TO_POWER: &str = "DbToPower";
    pub const MS_TO_FRAMES: &str = "MsToFrames";
    pub const STFT: &str = "Stft";
    pub const MEL_WEIGHT_MATRIX: &str = "LinearToMelWeightMatrix";
    pub const TENSOR_DOT: &str = "TensorDot";
    pub const CMVN: &str = "Cmvn";

    /// Every operator the default converter can translate
    pub const ALL: &[&str] = &[
        PLACEHOLDER,
        CONST,
        CAST,
        MUL,
        ADD,
        LOG,
        SQUARE,
        COMPLEX_ABS,
        FLOOR_DIV,
        STRIDED_SLICE,
        SHAPE_DIM,
        DB_TO_POWER,
        MS_TO_FRAMES,
        STFT,
        MEL_WEIGHT_MATRIX,
        TENSOR_DOT,
        CMVN,
    ];
}

/// One operator application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub op: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, Value>,
}

/// Named float32 constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

/// Exportable description of a transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub inputs: Vec<TensorSpec>,
    pub nodes: Vec<Node>,
    pub outputs: Vec<String>,
    pub constants: Vec<Constant>,
}

impl Graph {
    /// Start a graph whose placeholders follow `signature`
    pub fn builder(signature: Vec<TensorSpec>) -> GraphBuilder {
        let nodes = signature
            .iter()
            .map(|spec| Node {
                name: spec.name.clone(),
                op: ops::PLACEHOLDER.to_string(),
                inputs: Vec::new(),
                attrs: BTreeMap::from([
                    ("dtype".to_string(), Value::String(spec.dtype.to_string())),
                    ("rank".to_string(), Value::from(spec.rank())),
                ]),
            })
            .collect();

        GraphBuilder {
            graph: Graph {
                inputs: signature,
                nodes,
                outputs: Vec::new(),
                constants: Vec::new(),
            },
        }
    }

    /// Distinct operator names, in first-use order
    pub fn op_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .map(|n| n.op.as_str())
            .filter(|op| seen.insert(*op))
            .collect()
    }

    /// Total number of constant values
    pub fn num_weights(&self) -> usize {
        self.constants.iter().map(|c| c.values.len()).sum()
    }

    /// Check structural consistency
    ///
    /// Node names are unique, every input refers to an earlier node, outputs
    /// exist, constant shapes match their values, and every constant has a
    /// matching `Const` node.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut defined = HashSet::new();
        for node in &self.nodes {
            for input in &node.inputs {
                if !defined.contains(input.as_str()) {
                    return Err(format!(
                        "node '{}' reads '{}' before it is defined",
                        node.name, input
                    ));
                }
            }
            if !defined.insert(node.name.as_str()) {
                return Err(format!("duplicate node name '{}'", node.name));
            }
        }

        for output in &self.outputs {
            if !defined.contains(output.as_str()) {
                return Err(format!("output '{output}' is not a node"));
            }
        }

        for constant in &self.constants {
            let expected: usize = constant.shape.iter().product();
            if expected != constant.values.len() {
                return Err(format!(
                    "constant '{}' has {} values for shape {:?}",
                    constant.name,
                    constant.values.len(),
                    constant.shape
                ));
            }
            let has_node = self
                .nodes
                .iter()
                .any(|n| n.name == constant.name && n.op == ops::CONST);
            if !has_node {
                return Err(format!("constant '{}' has no Const node", constant.name));
            }
        }

        Ok(())
    }
}

/// Incremental graph construction
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    /// Add a scalar float32 constant and its `Const` node
    pub fn scalar(self, name: &str, value: f32) -> Self {
        self.constant(name, Vec::new(), vec![value])
    }

    /// Add a float32 constant and its `Const` node
    pub fn constant(mut self, name: &str, shape: Vec<usize>, values: Vec<f32>) -> Self {
        self.graph.nodes.push(Node {
            name: name.to_string(),
            op: ops::CONST.to_string(),
            inputs: Vec::new(),
            attrs: BTreeMap::from([(
                "dtype".to_string(),
                Value::String(DType::Float32.to_string()),
            )]),
        });
        self.graph.constants.push(Constant {
            name: name.to_string(),
            shape,
            values,
        });
        self
    }

    /// Add an operator node without attributes
    pub fn node(self, name: &str, op: &str, inputs: &[&str]) -> Self {
        self.node_with_attrs(name, op, inputs, &[])
    }

    /// Add an operator node
    pub fn node_with_attrs(
        mut self,
        name: &str,
        op: &str,
        inputs: &[&str],
        attrs: &[(&str, Value)],
    ) -> Self {
        self.graph.nodes.push(Node {
            name: name.to_string(),
            op: op.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
        self
    }

    /// Mark a node as a graph output
    pub fn output(mut self, name: &str) -> Self {
        self.graph.outputs.push(name.to_string());
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// Validate a graph, mapping problems to `InvalidArtifact` for `context`
pub(crate) fn ensure_valid(graph: &Graph, context: &std::path::Path) -> Result<()> {
    graph
        .validate()
        .map_err(|reason| WebfeatError::InvalidArtifact {
            path: context.to_path_buf(),
            reason,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        Graph::builder(vec![TensorSpec::dynamic_float("x", 2)])
            .scalar("floor", 1e-6)
            .node("sum", ops::ADD, &["x", "floor"])
            .node("log", ops::LOG, &["sum"])
            .output("log")
            .build()
    }

    #[test]
    fn test_builder_creates_placeholders_and_consts() {
        let graph = sample();
        assert_eq!(graph.nodes[0].op, ops::PLACEHOLDER);
        assert_eq!(graph.nodes[1].op, ops::CONST);
        assert_eq!(graph.num_weights(), 1);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_op_names_are_distinct() {
        let graph = sample();
        assert_eq!(
            graph.op_names(),
            vec![ops::PLACEHOLDER, ops::CONST, ops::ADD, ops::LOG]
        );
    }

    #[test]
    fn test_validate_rejects_forward_reference() {
        let graph = Graph::builder(vec![TensorSpec::dynamic_float("x", 2)])
            .node("a", ops::LOG, &["b"])
            .node("b", ops::LOG, &["x"])
            .output("a")
            .build();
        assert!(graph.validate().unwrap_err().contains("before it is defined"));
    }

    #[test]
    fn test_validate_rejects_bad_constant_shape() {
        let graph = Graph::builder(Vec::new())
            .constant("w", vec![2, 2], vec![1.0, 2.0, 3.0])
            .build();
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_output() {
        let graph = Graph::builder(vec![TensorSpec::dynamic_float("x", 1)])
            .output("y")
            .build();
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_serde_skips_empty_fields() {
        let json = serde_json::to_value(&sample()).unwrap();
        let log_node = &json["nodes"][3];
        assert_eq!(log_node["op"], "Log");
        assert!(log_node.get("attrs").is_none());
    }
}
