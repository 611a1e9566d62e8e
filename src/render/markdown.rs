//! Markdown to HTML conversion
//!
//! CommonMark via comrak, with the GitHub-flavored extensions selected in
//! [`MarkdownOptions`].

use comrak::{markdown_to_html, Options};

/// Markdown dialect settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Pipe tables
    pub tables: bool,
    /// `~~strikethrough~~`
    pub strikethrough: bool,
    /// Bare URLs become links
    pub autolink: bool,
    /// Pass raw HTML through instead of escaping it
    pub allow_raw_html: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: true,
            allow_raw_html: false,
        }
    }
}

impl MarkdownOptions {
    /// Strict CommonMark with no extensions
    pub fn commonmark() -> Self {
        Self {
            tables: false,
            strikethrough: false,
            autolink: false,
            allow_raw_html: false,
        }
    }
}

/// Convert Markdown source to an HTML fragment
///
/// Trailing newlines are trimmed so the fragment sits flush inside the
/// surrounding template markup.
pub fn markdown_to_fragment(source: &str, options: &MarkdownOptions) -> String {
    let mut comrak_options = Options::default();
    comrak_options.extension.table = options.tables;
    comrak_options.extension.strikethrough = options.strikethrough;
    comrak_options.extension.autolink = options.autolink;
    comrak_options.render.unsafe_ = options.allow_raw_html;
    comrak_options.render.escape = !options.allow_raw_html;

    let html = markdown_to_html(source, &comrak_options);
    html.trim_end_matches('\n').to_string()
}
