//! Native saved-module format
//!
//! Staging representation of one transform: `saved_module.json` holds the
//! signature, topology and constant specs, `constants.bin` holds the
//! constant values as little-endian float32 in declaration order.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::graph::{ensure_valid, Constant, Graph, Node};
use crate::error::{Result, WebfeatError};
use crate::transform::{TensorSpec, Transform};

pub const SAVED_MODULE_FILE: &str = "saved_module.json";
pub const CONSTANTS_FILE: &str = "constants.bin";
pub const SAVED_MODULE_VERSION: u32 = 1;

/// Shape of a constant stored in `constants.bin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ConstantSpec {
    name: String,
    shape: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedModuleFile {
    format_version: u32,
    name: String,
    signature: Vec<TensorSpec>,
    nodes: Vec<Node>,
    outputs: Vec<String>,
    constants: Vec<ConstantSpec>,
}

/// A transform's graph, ready to be written to or read from a staging directory
#[derive(Debug, Clone, PartialEq)]
pub struct SavedModule {
    pub name: String,
    pub graph: Graph,
}

impl SavedModule {
    /// Capture a transform's graph
    pub fn from_transform(transform: &dyn Transform) -> Self {
        Self {
            name: transform.name().to_string(),
            graph: transform.graph(),
        }
    }

    /// Write the module into `dir`, which must already exist
    pub fn save(&self, dir: &Path) -> Result<()> {
        ensure_valid(&self.graph, dir)?;

        let file = SavedModuleFile {
            format_version: SAVED_MODULE_VERSION,
            name: self.name.clone(),
            signature: self.graph.inputs.clone(),
            nodes: self.graph.nodes.clone(),
            outputs: self.graph.outputs.clone(),
            constants: self
                .graph
                .constants
                .iter()
                .map(|c| ConstantSpec {
                    name: c.name.clone(),
                    shape: c.shape.clone(),
                })
                .collect(),
        };

        let bytes: Vec<u8> = self
            .graph
            .constants
            .iter()
            .flat_map(|c| c.values.iter().flat_map(|v| v.to_le_bytes()))
            .collect();

        write_file(&dir.join(SAVED_MODULE_FILE), serde_json::to_string_pretty(&file)?.as_bytes())?;
        write_file(&dir.join(CONSTANTS_FILE), &bytes)?;

        debug!(
            "Saved module '{}' ({} nodes, {} constant bytes) to {}",
            self.name,
            self.graph.nodes.len(),
            bytes.len(),
            dir.display()
        );
        Ok(())
    }

    /// Read a module back from `dir`
    ///
    /// # Errors
    /// * `FileNotFound` / `FileReadError` - missing or unreadable files
    /// * `InvalidArtifact` - unknown format version, truncated constants, or
    ///   an inconsistent graph
    pub fn load(dir: &Path) -> Result<Self> {
        let meta_path = dir.join(SAVED_MODULE_FILE);
        let file: SavedModuleFile = serde_json::from_slice(&read_file(&meta_path)?)?;
        if file.format_version != SAVED_MODULE_VERSION {
            return Err(WebfeatError::InvalidArtifact {
                path: meta_path,
                reason: format!("unsupported format version {}", file.format_version),
            });
        }

        let constants_path = dir.join(CONSTANTS_FILE);
        let bytes = read_file(&constants_path)?;
        let needed: usize = file
            .constants
            .iter()
            .map(|c| c.shape.iter().product::<usize>() * 4)
            .sum();
        if bytes.len() != needed {
            return Err(WebfeatError::InvalidArtifact {
                path: constants_path,
                reason: format!("expected {} bytes of constants, found {}", needed, bytes.len()),
            });
        }

        let mut values = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        let constants = file
            .constants
            .into_iter()
            .map(|spec| {
                let count = spec.shape.iter().product();
                Constant {
                    name: spec.name,
                    shape: spec.shape,
                    values: values.by_ref().take(count).collect(),
                }
            })
            .collect();

        let graph = Graph {
            inputs: file.signature,
            nodes: file.nodes,
            outputs: file.outputs,
            constants,
        };
        ensure_valid(&graph, &meta_path)?;

        Ok(Self {
            name: file.name,
            graph,
        })
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).map_err(|e| WebfeatError::FileWriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => WebfeatError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => WebfeatError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        },
    })
}
