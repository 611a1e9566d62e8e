//! Feature graph export
//!
//! Each transform is staged as a [`SavedModule`] in a scoped temporary
//! directory, then converted into the deployable layout under
//! `<out_dir>/tfjs/<name>/`. The staging directory is removed whether or not
//! the conversion succeeds.

mod convert;
mod graph;
mod saved;

use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::error::{Result, WebfeatError};
use crate::transform::{Transform, TransformRegistry};

pub use convert::{
    shard_file_name, Converter, ModelJson, WeightEntry, WeightGroup, DEFAULT_SHARD_SIZE_BYTES,
    MODEL_FILE, MODEL_FORMAT,
};
pub use graph::{ops, Constant, Graph, GraphBuilder, Node};
pub use saved::{SavedModule, CONSTANTS_FILE, SAVED_MODULE_FILE, SAVED_MODULE_VERSION};

/// Directory under the output root that holds deployable artifacts
pub const TARGET_FORMAT_TAG: &str = "tfjs";

/// What to do when one export fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportPolicy {
    /// Stop at the first failure and skip the remaining exports
    #[default]
    AbortOnFirstFailure,
    /// Attempt every export and report the failures at the end
    ContinueOnError,
}

/// Exporter settings
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Output root; artifacts land in `<out_dir>/tfjs/<name>/`
    pub out_dir: PathBuf,
    pub policy: ExportPolicy,
    pub converter: Converter,
    /// Parent for staging directories, the system temp dir when `None`
    pub staging_root: Option<PathBuf>,
}

impl ExportConfig {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            policy: ExportPolicy::default(),
            converter: Converter::default(),
            staging_root: None,
        }
    }

    pub fn with_policy(mut self, policy: ExportPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }
}

/// One successfully written artifact
#[derive(Debug, Clone)]
pub struct ExportedArtifact {
    pub name: String,
    pub dir: PathBuf,
    /// Files in the artifact directory, sorted by path
    pub files: Vec<PathBuf>,
    pub total_bytes: u64,
}

/// One failed export under [`ExportPolicy::ContinueOnError`]
#[derive(Debug)]
pub struct ExportFailure {
    pub name: String,
    pub error: WebfeatError,
}

/// Outcome of an export run
#[derive(Debug, Default)]
pub struct ExportReport {
    pub exported: Vec<ExportedArtifact>,
    pub failures: Vec<ExportFailure>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.exported.iter().map(|a| a.total_bytes).sum()
    }
}

/// Artifact directory for `name` under `out_dir`
pub fn artifact_dir(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(TARGET_FORMAT_TAG).join(name)
}

/// Export a single transform
pub fn export_transform(transform: &dyn Transform, config: &ExportConfig) -> Result<ExportedArtifact> {
    let name = transform.name();
    let target = artifact_dir(&config.out_dir, name);

    let mut builder = tempfile::Builder::new();
    builder.prefix("webfeat-saved-");
    let staging = match &config.staging_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }?;

    SavedModule::from_transform(transform).save(staging.path())?;
    config.converter.convert(staging.path(), &target)?;

    let mut files = Vec::new();
    let mut total_bytes = 0;
    for entry in WalkDir::new(&target).sort_by_file_name() {
        let entry = entry.map_err(|e| WebfeatError::InvalidArtifact {
            path: target.clone(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            let metadata = entry.metadata().map_err(|e| WebfeatError::InvalidArtifact {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;
            total_bytes += metadata.len();
            files.push(entry.into_path());
        }
    }

    Ok(ExportedArtifact {
        name: name.to_string(),
        dir: target,
        files,
        total_bytes,
    })
}

/// Export every transform in `registry`, in order
///
/// Under [`ExportPolicy::AbortOnFirstFailure`] the first error is returned
/// and later transforms are not attempted. Under
/// [`ExportPolicy::ContinueOnError`] failures are collected in the report.
pub fn export_all(registry: &TransformRegistry, config: &ExportConfig) -> Result<ExportReport> {
    info!(
        "Exporting {} transform(s) to {}",
        registry.len(),
        config.out_dir.join(TARGET_FORMAT_TAG).display()
    );

    let mut report = ExportReport::default();
    for transform in registry.iter() {
        match export_transform(transform, config) {
            Ok(artifact) => {
                info!(
                    "Exported {} ({} files, {} bytes)",
                    artifact.name,
                    artifact.files.len(),
                    artifact.total_bytes
                );
                report.exported.push(artifact);
            }
            Err(error) => match config.policy {
                ExportPolicy::AbortOnFirstFailure => return Err(error),
                ExportPolicy::ContinueOnError => {
                    warn!("Export of {} failed: {}", transform.name(), error);
                    report.failures.push(ExportFailure {
                        name: transform.name().to_string(),
                        error,
                    });
                }
            },
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Spec2LogMel;
    use tempfile::tempdir;

    #[test]
    fn test_artifact_dir_layout() {
        let dir = artifact_dir(Path::new("/tmp/x"), "spec2logmel");
        assert_eq!(dir, PathBuf::from("/tmp/x/tfjs/spec2logmel"));
    }

    #[test]
    fn test_export_transform_lists_files() {
        let out = tempdir().unwrap();
        let artifact = export_transform(&Spec2LogMel, &ExportConfig::new(out.path())).unwrap();

        assert_eq!(artifact.name, "spec2logmel");
        assert_eq!(artifact.files.len(), 2);
        assert!(artifact.files[0].ends_with("group1-shard1of1.bin"));
        assert!(artifact.files[1].ends_with(MODEL_FILE));
        let on_disk: u64 = artifact
            .files
            .iter()
            .map(|f| std::fs::metadata(f).unwrap().len())
            .sum();
        assert!(artifact.total_bytes > 0);
        assert_eq!(artifact.total_bytes, on_disk);
    }

    #[test]
    fn test_staging_is_removed() {
        let out = tempdir().unwrap();
        let staging = tempdir().unwrap();
        let config = ExportConfig::new(out.path()).with_staging_root(staging.path());

        export_transform(&Spec2LogMel, &config).unwrap();
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);

        let failing = config.with_converter(Converter::default().without_op(ops::CMVN));
        assert!(export_transform(&Spec2LogMel, &failing).is_err());
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_default_policy_aborts() {
        assert_eq!(ExportPolicy::default(), ExportPolicy::AbortOnFirstFailure);
    }
}
