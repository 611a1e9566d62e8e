//! Page Renderer
//!
//! Converts a Markdown document to HTML and places it into a page template
//! at the `body` placeholder.

mod markdown;
mod template;

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Result, WebfeatError};

pub use markdown::{markdown_to_fragment, MarkdownOptions};
pub use template::Template;

/// Placeholder the converted Markdown is substituted into
pub const BODY_PLACEHOLDER: &str = "body";

/// Default template location, relative to the working directory
pub const DEFAULT_TEMPLATE_PATH: &str = "./index.template.html";

/// Default Markdown source location, relative to the working directory
pub const DEFAULT_MARKDOWN_PATH: &str = "./index.md";

/// Renderer inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// HTML template containing the `body` placeholder
    pub template_path: PathBuf,
    /// Markdown document to convert
    pub markdown_path: PathBuf,
    /// Markdown dialect
    pub markdown: MarkdownOptions,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            markdown_path: PathBuf::from(DEFAULT_MARKDOWN_PATH),
            markdown: MarkdownOptions::default(),
        }
    }
}

impl RenderConfig {
    /// Create a config for the given template and Markdown paths
    pub fn new(template_path: impl Into<PathBuf>, markdown_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            markdown_path: markdown_path.into(),
            ..Self::default()
        }
    }

    /// Replace the Markdown dialect
    pub fn with_markdown_options(mut self, markdown: MarkdownOptions) -> Self {
        self.markdown = markdown;
        self
    }
}

/// Render a page from in-memory template and Markdown sources
///
/// # Errors
/// * `InvalidPlaceholder` - Malformed `$` syntax in the template
/// * `MissingPlaceholder` - The template has no `body` placeholder
/// * `UnknownPlaceholder` - The template references a name other than `body`
pub fn render_str(template: &str, markdown: &str, options: &MarkdownOptions) -> Result<String> {
    let template = Template::parse(template)?;
    if !template.has_placeholder(BODY_PLACEHOLDER) {
        return Err(WebfeatError::MissingPlaceholder {
            name: BODY_PLACEHOLDER.to_string(),
        });
    }

    let body = markdown_to_fragment(markdown, options);
    debug!("Converted Markdown to {} bytes of HTML", body.len());

    template.substitute(&HashMap::from([(BODY_PLACEHOLDER, body.as_str())]))
}

/// Render the page described by `config`
///
/// Returns the complete HTML document. Writing it out is left to the caller,
/// see [`render_to_file`].
///
/// # Errors
/// * `FileNotFound` - The template or the Markdown source does not exist
/// * `FileReadError` - A source exists but cannot be read as UTF-8
/// * Any template error from [`render_str`]
pub fn render(config: &RenderConfig) -> Result<String> {
    let markdown = read_source(&config.markdown_path)?;
    let template = read_source(&config.template_path)?;
    render_str(&template, &markdown, &config.markdown)
}

/// Render the page and write it to `outpath`, followed by a newline
///
/// The output file is only created once rendering has succeeded.
pub fn render_to_file(config: &RenderConfig, outpath: &Path) -> Result<()> {
    info!(
        "Rendering {} with template {}",
        config.markdown_path.display(),
        config.template_path.display()
    );

    let mut page = render(config)?;
    page.push('\n');

    fs::write(outpath, page).map_err(|e| WebfeatError::FileWriteError {
        path: outpath.to_path_buf(),
        source: e,
    })?;

    info!("Wrote {}", outpath.display());
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => WebfeatError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => WebfeatError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        },
    })
}
