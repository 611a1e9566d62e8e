//! Webfeat CLI
//!
//! Command-line entry point for the page renderer and the feature exporter.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, error};

use webfeat::cli::{commands, Cli, Commands};
use webfeat::WebfeatError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("webfeat v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Render {
            outpath,
            template,
            markdown,
        } => commands::render_page(&outpath, &template, &markdown)
            .with_context(|| format!("failed to render {}", outpath.display())),
        Commands::Export {
            out_dir,
            continue_on_error,
        } => commands::export_features(&out_dir, continue_on_error)
            .with_context(|| format!("failed to export features to {}", out_dir.display())),
        Commands::Features {
            input,
            num_mel_bins,
            output,
        } => commands::compute_features(&input, num_mel_bins, output.as_deref())
            .with_context(|| format!("failed to compute features for {}", input.display())),
    };

    if let Err(err) = &result {
        if let Some(suggestion) = err
            .downcast_ref::<WebfeatError>()
            .and_then(WebfeatError::recovery_suggestion)
        {
            error!("{}", suggestion);
        }
    }

    result
}
