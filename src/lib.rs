//! Webfeat - site page renderer and log-mel feature exporter
//!
//! Two independent tools share this crate:
//! 1. Renderer - converts a Markdown page to HTML inside a page template
//! 2. Feature exporter - log-mel transforms for the browser, exported as
//!    deployable graph artifacts
//!
//! # Architecture
//!
//! - `render`: Markdown conversion and `${body}` template substitution
//! - `features`: numeric kernels (dB to power, STFT, mel filterbank, CMVN)
//! - `transform`: the two named transforms behind the `Transform` trait
//! - `export`: saved-module staging and conversion to `<out>/tfjs/<name>/`
//! - `wav`: WAV loading for local feature extraction

pub mod cli;
pub mod error;
pub mod export;
pub mod features;
pub mod render;
pub mod transform;
pub mod wav;

pub use error::{Result, WebfeatError};
pub use export::{export_all, ExportConfig, ExportPolicy, ExportReport};
pub use render::{render, render_to_file, RenderConfig};
pub use transform::{Transform, TransformRegistry};
