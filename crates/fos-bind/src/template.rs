//! Templates
//!
//! Markup templates rendered against the context snapshot. The stock
//! [`DelimitedRenderer`] understands two tag kinds:
//!
//! - interpolate (`<%= model.title %>`): value written as is
//! - escape (`<%- model.title %>`): value HTML-escaped
//!
//! Expressions are dotted lookups into the data; numeric segments index
//! arrays. Evaluate tags (`<% ... %>`) carry code and are rejected.

use serde_json::Value;

use crate::Delimiters;

/// Template compile error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unclosed '{open}' tag at offset {offset}")]
    Unclosed { open: String, offset: usize },

    #[error("Evaluate tags are not supported")]
    UnsupportedEvaluate,

    #[error("Empty expression at offset {0}")]
    EmptyExpression(usize),
}

/// Compiles template source into a render function
pub trait TemplateRenderer {
    fn compile(&self, source: &str, delimiters: &Delimiters) -> Result<CompiledTemplate, TemplateError>;
}

/// Compiled template
pub struct CompiledTemplate {
    render: Box<dyn Fn(&Value) -> String>,
}

impl std::fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplate").finish_non_exhaustive()
    }
}

impl CompiledTemplate {
    pub fn new(render: impl Fn(&Value) -> String + 'static) -> Self {
        Self {
            render: Box::new(render),
        }
    }

    pub fn render(&self, data: &Value) -> String {
        (self.render)(data)
    }
}

/// Text form of a value as written into the DOM.
///
/// Strings are written without quotes and `null` as nothing.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
enum Part {
    Text(String),
    Raw(Vec<String>),
    Escaped(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Evaluate,
    Interpolate,
    Escape,
}

/// Default renderer for interpolate and escape tags
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedRenderer;

impl DelimitedRenderer {
    fn parse(source: &str, delimiters: &Delimiters) -> Result<Vec<Part>, TemplateError> {
        let kinds = [
            (TagKind::Evaluate, &delimiters.evaluate),
            (TagKind::Interpolate, &delimiters.interpolate),
            (TagKind::Escape, &delimiters.escape),
        ];

        let mut parts = Vec::new();
        let mut offset = 0;
        while offset < source.len() {
            let rest = &source[offset..];

            // earliest opening marker; the longer one wins a tie (`<%=` over `<%`)
            let next = kinds
                .iter()
                .filter_map(|(kind, d)| rest.find(d.open.as_str()).map(|at| (at, *kind, *d)))
                .min_by(|a, b| a.0.cmp(&b.0).then(b.2.open.len().cmp(&a.2.open.len())));

            let Some((at, kind, delimiter)) = next else {
                parts.push(Part::Text(rest.to_string()));
                break;
            };
            if at > 0 {
                parts.push(Part::Text(rest[..at].to_string()));
            }

            let tag_start = offset + at;
            let body_start = tag_start + delimiter.open.len();
            let body_len = source[body_start..]
                .find(delimiter.close.as_str())
                .ok_or_else(|| TemplateError::Unclosed {
                    open: delimiter.open.clone(),
                    offset: tag_start,
                })?;

            let expression = source[body_start..body_start + body_len].trim();
            let path: Vec<String> = match kind {
                TagKind::Evaluate => return Err(TemplateError::UnsupportedEvaluate),
                _ if expression.is_empty() => return Err(TemplateError::EmptyExpression(tag_start)),
                _ => expression.split('.').map(|s| s.trim().to_string()).collect(),
            };
            parts.push(match kind {
                TagKind::Escape => Part::Escaped(path),
                _ => Part::Raw(path),
            });

            offset = body_start + body_len + delimiter.close.len();
        }
        Ok(parts)
    }
}

impl TemplateRenderer for DelimitedRenderer {
    fn compile(&self, source: &str, delimiters: &Delimiters) -> Result<CompiledTemplate, TemplateError> {
        let parts = Self::parse(source, delimiters)?;
        Ok(CompiledTemplate::new(move |data: &Value| {
            let mut out = String::new();
            for part in &parts {
                match part {
                    Part::Text(text) => out.push_str(text),
                    Part::Raw(path) => out.push_str(&lookup(data, path).map(display_value).unwrap_or_default()),
                    Part::Escaped(path) => {
                        let value = lookup(data, path).map(display_value).unwrap_or_default();
                        out.push_str(&escape_html(&value));
                    }
                }
            }
            out
        }))
    }
}

fn lookup<'a>(data: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
