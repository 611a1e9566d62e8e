//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::error::{Result, WebfeatError};
use crate::export::{export_all, ExportConfig, ExportPolicy};
use crate::render::{render_to_file, RenderConfig};
use crate::transform::{Signals2LogMel, TransformRegistry};
use crate::wav::extract_features;

/// Render the Markdown page into `outpath`.
pub fn render_page(outpath: &Path, template: &Path, markdown: &Path) -> Result<()> {
    let config = RenderConfig::new(template, markdown);
    render_to_file(&config, outpath)?;

    println!("Page written: {}", outpath.display());
    Ok(())
}

/// Export every registered transform under `out_dir`.
///
/// With `continue_on_error`, all exports are attempted and the first
/// recorded failure is returned at the end.
pub fn export_features(out_dir: &Path, continue_on_error: bool) -> Result<()> {
    let policy = if continue_on_error {
        ExportPolicy::ContinueOnError
    } else {
        ExportPolicy::AbortOnFirstFailure
    };
    let config = ExportConfig::new(out_dir).with_policy(policy);
    run_export(&TransformRegistry::with_defaults(), &config)
}

fn run_export(registry: &TransformRegistry, config: &ExportConfig) -> Result<()> {
    let report = export_all(registry, config)?;
    let total_bytes = report.total_bytes();

    for artifact in &report.exported {
        println!("{}: {}", artifact.name, artifact.dir.display());
        for file in &artifact.files {
            println!("    {}", file.display());
        }
    }

    if let Some(first) = report.failures.into_iter().next() {
        warn!("Export of {} failed", first.name);
        return Err(first.error);
    }

    info!("Export complete: {} bytes", total_bytes);
    Ok(())
}

/// Compute `signals2logmel` features for a WAV file.
pub fn compute_features(input: &Path, num_mel_bins: usize, output: Option<&Path>) -> Result<()> {
    let matrix = extract_features(&Signals2LogMel, input, num_mel_bins)?;
    let json = serde_json::to_string(&matrix)?;

    match output {
        Some(path) => {
            fs::write(path, json).map_err(|e| WebfeatError::FileWriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
            println!(
                "Features written: {} ({} frames x {} bins)",
                path.display(),
                matrix.shape[0],
                matrix.shape[1]
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
