//! Page template with `$name` / `${name}` placeholders
//!
//! `$$` is an escaped literal dollar sign. Any other `$` is an error, reported
//! with its 1-based line and column.

use std::collections::HashMap;

use crate::error::{Result, WebfeatError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source
    ///
    /// # Errors
    /// * `InvalidPlaceholder` - A `$` that does not start `$$`, `$ident` or `${ident}`
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            if c != '$' {
                literal.push(c);
                continue;
            }

            match chars.peek().map(|&(_, next)| next) {
                Some('$') => {
                    chars.next();
                    literal.push('$');
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    while let Some((_, next)) = chars.next() {
                        if next == '}' {
                            closed = true;
                            break;
                        }
                        name.push(next);
                    }
                    if !closed || !is_identifier(&name) {
                        return Err(invalid_at(source, offset));
                    }
                    flush(&mut segments, &mut literal);
                    segments.push(Segment::Placeholder(name));
                }
                Some(next) if is_identifier_start(next) => {
                    let mut name = String::new();
                    while let Some(&(_, next)) = chars.peek() {
                        if !is_identifier_continue(next) {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    flush(&mut segments, &mut literal);
                    segments.push(Segment::Placeholder(name));
                }
                _ => return Err(invalid_at(source, offset)),
            }
        }

        flush(&mut segments, &mut literal);
        Ok(Self { segments })
    }

    /// Check whether the template references `name` at least once
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Iterate over placeholder names in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder in a single pass
    ///
    /// Substituted values are inserted verbatim and never re-scanned.
    ///
    /// # Errors
    /// * `UnknownPlaceholder` - The template references a name missing from `values`
    pub fn substitute(&self, values: &HashMap<&str, &str>) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value =
                        values
                            .get(name.as_str())
                            .ok_or_else(|| WebfeatError::UnknownPlaceholder {
                                name: name.clone(),
                            })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn flush(segments: &mut Vec<Segment>, literal: &mut String) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_identifier_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => is_identifier_start(first) && chars.all(is_identifier_continue),
        None => false,
    }
}

fn invalid_at(source: &str, offset: usize) -> WebfeatError {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = source[line_start..offset].chars().count() + 1;
    WebfeatError::InvalidPlaceholder { line, column }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: &str) -> HashMap<&str, &str> {
        HashMap::from([("body", value)])
    }

    #[test]
    fn test_braced_and_bare_placeholders() {
        let template = Template::parse("<p>${body}</p><i>$body</i>").unwrap();
        assert_eq!(template.placeholders().count(), 2);
        assert_eq!(
            template.substitute(&body("x")).unwrap(),
            "<p>x</p><i>x</i>"
        );
    }

    #[test]
    fn test_bare_placeholder_stops_at_non_identifier() {
        let template = Template::parse("$body.</p>").unwrap();
        assert_eq!(template.substitute(&body("hi")).unwrap(), "hi.</p>");
    }

    #[test]
    fn test_escaped_dollar() {
        let template = Template::parse("cost: $$5 ${body}").unwrap();
        assert_eq!(template.substitute(&body("ok")).unwrap(), "cost: $5 ok");
    }

    #[test]
    fn test_value_is_not_rescanned() {
        let template = Template::parse("${body}").unwrap();
        assert_eq!(
            template.substitute(&body("$$ ${body}")).unwrap(),
            "$$ ${body}"
        );
    }

    #[test]
    fn test_invalid_placeholder_position() {
        let err = Template::parse("<html>\n  <p>$ 5</p>").unwrap_err();
        match err {
            WebfeatError::InvalidPlaceholder { line, column } => {
                assert_eq!(line, 2);
                assert_eq!(column, 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_brace() {
        assert!(matches!(
            Template::parse("${body"),
            Err(WebfeatError::InvalidPlaceholder { line: 1, column: 1 })
        ));
        assert!(Template::parse("${9lives}").is_err());
        assert!(Template::parse("trailing $").is_err());
    }

    #[test]
    fn test_unknown_placeholder() {
        let template = Template::parse("${title} ${body}").unwrap();
        assert!(template.has_placeholder("body"));
        let err = template.substitute(&body("x")).unwrap_err();
        assert!(matches!(err, WebfeatError::UnknownPlaceholder { name } if name == "title"));
    }
}
