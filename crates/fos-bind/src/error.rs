//! Binding errors

use fos_dom::SelectorError;

use crate::TemplateError;

/// Binding error
///
/// Setup-time variants are fatal to [`Engine::new`](crate::Engine::new).
/// `InvalidPath` is downgraded to a warning and a no-op render when it
/// happens while handling an event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    #[error("Invalid path '{path}': segment '{segment}' not found")]
    InvalidPath { path: String, segment: String },

    #[error("Missing subject: {0}")]
    MissingSubject(String),

    #[error("Missing template: nothing matches '{0}'")]
    MissingTemplate(String),

    #[error("Malformed {attribute} item: '{item}'")]
    MalformedDirective { attribute: String, item: String },

    #[error("Context entry '{0}' is read-only")]
    ReadOnly(String),

    #[error("Method '{name}' failed: {reason}")]
    Method { name: String, reason: String },

    #[error("Invalid selector: {0}")]
    Selector(#[from] SelectorError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid options: {0}")]
    Config(String),
}

impl BindError {
    /// Build a `Method` error
    pub fn method(name: &str, reason: impl std::fmt::Display) -> Self {
        BindError::Method {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
