//! Engine Configuration

use serde::Deserialize;

use crate::BindError;

/// Default attribute prefix
pub const DEFAULT_PREFIX: &str = "bind-";

/// Opening and closing marker of one template tag kind
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Delimiter {
    pub open: String,
    pub close: String,
}

impl Delimiter {
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
        }
    }
}

/// Template tag markers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    /// Code blocks (`<% ... %>`)
    pub evaluate: Delimiter,
    /// Raw value output (`<%= ... %>`)
    pub interpolate: Delimiter,
    /// HTML-escaped value output (`<%- ... %>`)
    pub escape: Delimiter,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            evaluate: Delimiter::new("<%", "%>"),
            interpolate: Delimiter::new("<%=", "%>"),
            escape: Delimiter::new("<%-", "%>"),
        }
    }
}

/// Engine configuration options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Prefix of every directive attribute, also the namespace of identity tokens
    pub prefix: String,

    /// Template tag markers
    pub template_delimiters: Delimiters,

    /// Log every flow at debug level
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            template_delimiters: Delimiters::default(),
            debug: false,
        }
    }
}

impl Options {
    /// Parse options from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self, BindError> {
        let options: Options =
            serde_json::from_str(json).map_err(|e| BindError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Use a different attribute prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Enable or disable flow logging
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn validate(&self) -> Result<(), BindError> {
        if self.prefix.trim().is_empty() {
            return Err(BindError::Config("prefix must not be empty".into()));
        }
        let d = &self.template_delimiters;
        for (kind, delimiter) in [
            ("evaluate", &d.evaluate),
            ("interpolate", &d.interpolate),
            ("escape", &d.escape),
        ] {
            if delimiter.open.is_empty() || delimiter.close.is_empty() {
                return Err(BindError::Config(format!("{kind} delimiter must not be empty")));
            }
        }
        Ok(())
    }

    /// Full attribute name of a directive
    pub fn attribute(&self, directive: &str) -> String {
        format!("{}{}", self.prefix, directive)
    }
}
