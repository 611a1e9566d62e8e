//! CLI Module
//!
//! Command-line interface for the page renderer and the feature exporter.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::render::{DEFAULT_MARKDOWN_PATH, DEFAULT_TEMPLATE_PATH};

/// Webfeat - site page renderer and log-mel feature exporter
#[derive(Parser, Debug)]
#[command(name = "webfeat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the Markdown page into the HTML template
    #[command(name = "render")]
    Render {
        /// Destination HTML file
        outpath: PathBuf,

        /// HTML template with a ${body} placeholder
        #[arg(long, default_value = DEFAULT_TEMPLATE_PATH)]
        template: PathBuf,

        /// Markdown source
        #[arg(long, default_value = DEFAULT_MARKDOWN_PATH)]
        markdown: PathBuf,
    },

    /// Export the feature transforms as deployable graphs
    #[command(name = "export")]
    Export {
        /// Output root; artifacts go to <out_dir>/tfjs/<name>/
        out_dir: PathBuf,

        /// Keep exporting after a failure instead of stopping
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Compute log-mel features for a WAV file
    #[command(name = "features")]
    Features {
        /// Input WAV file
        input: PathBuf,

        /// Number of mel bands
        #[arg(short, long, default_value_t = 40)]
        num_mel_bins: usize,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
