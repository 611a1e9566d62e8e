//! Saved-module to deployable graph conversion
//!
//! Writes the browser-facing layout: `model.json` with the topology and a
//! weights manifest, plus weight shard files named
//! `group1-shard{k}of{n}.bin`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::graph::{ops, Node};
use super::saved::SavedModule;
use crate::error::{Result, WebfeatError};
use crate::transform::{DType, TensorSpec};

pub const MODEL_FILE: &str = "model.json";
pub const MODEL_FORMAT: &str = "graph-model";

/// Default upper bound on a single weight shard
pub const DEFAULT_SHARD_SIZE_BYTES: usize = 4 * 1024 * 1024;

/// One entry of the weights manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
}

/// A group of shards holding consecutive weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightGroup {
    pub paths: Vec<String>,
    pub weights: Vec<WeightEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSignature {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTopology {
    pub node: Vec<Node>,
}

/// Contents of `model.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelJson {
    pub format: String,
    pub generated_by: String,
    pub converted_by: String,
    pub signature: ModelSignature,
    pub model_topology: ModelTopology,
    pub weights_manifest: Vec<WeightGroup>,
    /// SHA-256 of each shard, keyed by shard path
    pub shard_checksums: BTreeMap<String, String>,
}

impl ModelJson {
    /// Read `model.json` from an artifact directory
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MODEL_FILE);
        let content = fs::read_to_string(&path).map_err(|e| WebfeatError::FileReadError {
            path: path.clone(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Converts saved modules into the deployable layout
#[derive(Debug, Clone)]
pub struct Converter {
    supported_ops: BTreeSet<String>,
    shard_size_bytes: usize,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            supported_ops: ops::ALL.iter().map(|op| op.to_string()).collect(),
            shard_size_bytes: DEFAULT_SHARD_SIZE_BYTES,
        }
    }
}

impl Converter {
    /// Drop an operator from the supported set
    pub fn without_op(mut self, op: &str) -> Self {
        self.supported_ops.remove(op);
        self
    }

    /// Set the shard size, rounded down to whole float32 values (minimum one)
    pub fn with_shard_size(mut self, bytes: usize) -> Self {
        self.shard_size_bytes = (bytes / 4).max(1) * 4;
        self
    }

    pub fn supports(&self, op: &str) -> bool {
        self.supported_ops.contains(op)
    }

    pub fn shard_size_bytes(&self) -> usize {
        self.shard_size_bytes
    }

    /// Convert the saved module in `saved_dir` into `target_dir`
    ///
    /// Every operator is checked before anything is written, so an
    /// unsupported graph leaves `target_dir` untouched.
    ///
    /// Returns the written files, `model.json` first.
    ///
    /// # Errors
    /// * `UnsupportedOperator` - a node uses an operator outside the supported set
    /// * `DirectoryCreateError` / `FileWriteError` - the target is not writable
    pub fn convert(&self, saved_dir: &Path, target_dir: &Path) -> Result<Vec<PathBuf>> {
        let module = SavedModule::load(saved_dir)?;

        if let Some(node) = module.graph.nodes.iter().find(|n| !self.supports(&n.op)) {
            return Err(WebfeatError::UnsupportedOperator {
                op: node.op.clone(),
                node: node.name.clone(),
                transform: module.name.clone(),
            });
        }

        fs::create_dir_all(target_dir).map_err(|e| WebfeatError::DirectoryCreateError {
            path: target_dir.to_path_buf(),
            source: e,
        })?;

        let weights: Vec<u8> = module
            .graph
            .constants
            .iter()
            .flat_map(|c| c.values.iter().flat_map(|v| v.to_le_bytes()))
            .collect();
        let shards: Vec<&[u8]> = weights.chunks(self.shard_size_bytes).collect();

        let mut written = vec![target_dir.join(MODEL_FILE)];
        let mut paths = Vec::with_capacity(shards.len());
        let mut shard_checksums = BTreeMap::new();

        for (index, shard) in shards.iter().enumerate() {
            let file_name = shard_file_name(index, shards.len());
            let path = target_dir.join(&file_name);
            fs::write(&path, shard).map_err(|e| WebfeatError::FileWriteError {
                path: path.clone(),
                source: e,
            })?;

            shard_checksums.insert(file_name.clone(), format!("{:x}", Sha256::digest(shard)));
            debug!("Wrote shard {} ({} bytes)", path.display(), shard.len());
            paths.push(file_name);
            written.push(path);
        }

        let generator = format!("webfeat {}", env!("CARGO_PKG_VERSION"));
        let model = ModelJson {
            format: MODEL_FORMAT.to_string(),
            generated_by: generator.clone(),
            converted_by: generator,
            signature: ModelSignature {
                inputs: module.graph.inputs.clone(),
                outputs: module.graph.outputs.clone(),
            },
            model_topology: ModelTopology {
                node: module.graph.nodes.clone(),
            },
            weights_manifest: vec![WeightGroup {
                paths,
                weights: module
                    .graph
                    .constants
                    .iter()
                    .map(|c| WeightEntry {
                        name: c.name.clone(),
                        shape: c.shape.clone(),
                        dtype: DType::Float32,
                    })
                    .collect(),
            }],
            shard_checksums,
        };

        let model_path = target_dir.join(MODEL_FILE);
        fs::write(&model_path, serde_json::to_string_pretty(&model)?).map_err(|e| {
            WebfeatError::FileWriteError {
                path: model_path.clone(),
                source: e,
            }
        })?;

        info!(
            "Converted '{}' into {} ({} shard(s))",
            module.name,
            target_dir.display(),
            shards.len()
        );
        Ok(written)
    }
}

/// Shard file name for the zero-based `index` out of `count`
pub fn shard_file_name(index: usize, count: usize) -> String {
    format!("group1-shard{}of{}.bin", index + 1, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Signals2LogMel, Spec2LogMel, Transform};
    use tempfile::tempdir;

    fn stage(transform: &dyn Transform) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        SavedModule::from_transform(transform)
            .save(dir.path())
            .unwrap();
        dir
    }

    #[test]
    fn test_convert_writes_model_and_shard() {
        let saved = stage(&Spec2LogMel);
        let out = tempdir().unwrap();
        let target = out.path().join("spec2logmel");

        let files = Converter::default().convert(saved.path(), &target).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with(MODEL_FILE));

        let model = ModelJson::load(&target).unwrap();
        assert_eq!(model.format, MODEL_FORMAT);
        assert_eq!(model.weights_manifest[0].paths, vec!["group1-shard1of1.bin"]);
        assert_eq!(model.signature.inputs.len(), 3);

        let shard = fs::read(target.join("group1-shard1of1.bin")).unwrap();
        assert!(!shard.is_empty());
        assert_eq!(
            model.shard_checksums["group1-shard1of1.bin"],
            format!("{:x}", Sha256::digest(&shard))
        );
    }

    #[test]
    fn test_small_shards() {
        let saved = stage(&Spec2LogMel);
        let out = tempdir().unwrap();
        let num_weights = Spec2LogMel.graph().num_weights();

        let converter = Converter::default().with_shard_size(8);
        let files = converter.convert(saved.path(), out.path()).unwrap();

        let expected_shards = (num_weights * 4 + 7) / 8;
        assert_eq!(files.len(), 1 + expected_shards);
        assert!(out
            .path()
            .join(shard_file_name(expected_shards - 1, expected_shards))
            .exists());
    }

    #[test]
    fn test_unsupported_operator_writes_nothing() {
        let saved = stage(&Signals2LogMel);
        let out = tempdir().unwrap();
        let target = out.path().join("signals2logmel");

        let err = Converter::default()
            .without_op(ops::STFT)
            .convert(saved.path(), &target)
            .unwrap_err();

        match err {
            WebfeatError::UnsupportedOperator { op, transform, .. } => {
                assert_eq!(op, "Stft");
                assert_eq!(transform, "signals2logmel");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!target.exists());
    }

    #[test]
    fn test_shard_size_rounds_to_floats() {
        assert_eq!(Converter::default().with_shard_size(10).shard_size_bytes(), 8);
        assert_eq!(Converter::default().with_shard_size(0).shard_size_bytes(), 4);
    }

    #[test]
    fn test_shard_file_name() {
        assert_eq!(shard_file_name(0, 1), "group1-shard1of1.bin");
        assert_eq!(shard_file_name(2, 3), "group1-shard3of3.bin");
    }
}
