//! Path resolution
//!
//! Grammar:
//!
//! ```text
//! path    = head [ ":" member [ ":" args ] ]
//! head    = segment { "." segment }
//! args    = arg { "," arg }
//! ```
//!
//! Without a member, the last head segment is the property and the segments
//! before it are walked from the context (`model.status`). With a member,
//! every head segment is walked and the member names the property or method
//! (`model:status`, `app.user:name`, `model:greet:Ada, Lovelace`).
//!
//! A path without `.` whose head is not a context name is a literal and
//! resolves to itself, so attributes can carry plain values such as `"true"`.

use std::rc::Rc;

use serde_json::Value;

use crate::{BindError, Context, SetOptions, Subject};

/// Parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    /// Subjects to walk, starting from the context
    pub path_segments: Vec<String>,
    /// Property or method on the last walked subject
    pub final_property: String,
    /// Literal arguments for a method call
    pub inline_args: Vec<String>,
    raw: String,
}

impl PathSpec {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (head, tail) = match raw.split_once(':') {
            Some((head, tail)) => (head, Some(tail)),
            None => (raw, None),
        };
        let mut segments: Vec<String> = head.split('.').map(|s| s.trim().to_string()).collect();

        let (final_property, inline_args) = match tail {
            Some(tail) => {
                let (member, rest) = match tail.split_once(':') {
                    Some((member, rest)) => (member, Some(rest)),
                    None => (tail, None),
                };
                let args = rest
                    .filter(|r| !r.trim().is_empty())
                    .map(|r| r.split(',').map(|a| a.trim().to_string()).collect())
                    .unwrap_or_default();
                (member.trim().to_string(), args)
            }
            None => (segments.pop().unwrap_or_default(), Vec::new()),
        };

        Self {
            path_segments: segments,
            final_property,
            inline_args,
            raw: raw.to_string(),
        }
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// First name of the head, looked up directly in the context
    fn head_name(&self) -> &str {
        let head = self.raw.split(':').next().unwrap_or_default();
        head.split('.').next().unwrap_or_default().trim()
    }

    fn is_literal_candidate(&self) -> bool {
        !self.raw.contains('.')
    }
}

impl std::fmt::Display for PathSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

enum Holder {
    Context,
    Subject(Rc<dyn Subject>),
}

/// Resolves paths against a [`Context`]
#[derive(Debug, Clone)]
pub struct PathResolver {
    context: Context,
}

impl PathResolver {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Resolve `path`, treating an unresolvable segment as absence.
    ///
    /// Returns `Ok(None)` after logging when a segment is missing. Other
    /// failures (a method error, a failing `set`) are returned as errors.
    pub fn resolve(
        &self,
        path: &str,
        value: Option<Value>,
        extra_args: &[Value],
    ) -> Result<Option<Value>, BindError> {
        self.resolve_spec(&PathSpec::parse(path), value, extra_args)
    }

    /// [`resolve`](Self::resolve) for a pre-parsed path
    pub fn resolve_spec(
        &self,
        spec: &PathSpec,
        value: Option<Value>,
        extra_args: &[Value],
    ) -> Result<Option<Value>, BindError> {
        match self.try_resolve_spec(spec, value, extra_args) {
            Ok(resolved) => Ok(Some(resolved)),
            Err(BindError::InvalidPath { path, segment }) => {
                tracing::warn!(%path, %segment, "unresolvable path segment");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    /// Resolve `path`, reporting a missing segment as [`BindError::InvalidPath`]
    pub fn try_resolve(
        &self,
        path: &str,
        value: Option<Value>,
        extra_args: &[Value],
    ) -> Result<Value, BindError> {
        self.try_resolve_spec(&PathSpec::parse(path), value, extra_args)
    }

    /// [`try_resolve`](Self::try_resolve) for a pre-parsed path.
    ///
    /// A callable member is invoked with the inline arguments, then `value`,
    /// then `extra_args`. Otherwise `value` is assigned when given, or the
    /// property is read.
    pub fn try_resolve_spec(
        &self,
        spec: &PathSpec,
        value: Option<Value>,
        extra_args: &[Value],
    ) -> Result<Value, BindError> {
        if spec.is_literal_candidate() && !self.context.contains(spec.head_name()) {
            return Ok(Value::String(spec.as_str().to_string()));
        }

        let mut holder = Holder::Context;
        for segment in &spec.path_segments {
            let next = match &holder {
                Holder::Context => self.context.get(segment),
                Holder::Subject(subject) => subject.child(segment),
            };
            holder = Holder::Subject(next.ok_or_else(|| BindError::InvalidPath {
                path: spec.as_str().to_string(),
                segment: segment.clone(),
            })?);
        }

        let property = spec.final_property.as_str();
        let subject = match holder {
            Holder::Subject(subject) => subject,
            Holder::Context => {
                // bare subject name
                if value.is_some() {
                    return Err(BindError::ReadOnly(property.to_string()));
                }
                return Ok(self
                    .context
                    .get(property)
                    .map(|s| s.snapshot())
                    .unwrap_or(Value::Null));
            }
        };

        if let Some(method) = subject.method(property) {
            let args: Vec<Value> = spec
                .inline_args
                .iter()
                .map(|a| Value::String(a.clone()))
                .chain(value)
                .chain(extra_args.iter().cloned())
                .collect();
            return method(&args);
        }

        match value {
            Some(value) => {
                subject.set(property, value.clone(), SetOptions::default())?;
                Ok(value)
            }
            None => Ok(subject.get(property).unwrap_or(Value::Null)),
        }
    }

    /// Resolve a (possibly dotted) subject name
    pub fn subject(&self, name: &str) -> Result<Rc<dyn Subject>, BindError> {
        let mut segments = name.split('.').map(str::trim);
        let first = segments.next().unwrap_or_default();
        let mut subject = self
            .context
            .get(first)
            .ok_or_else(|| BindError::MissingSubject(name.to_string()))?;
        for segment in segments {
            subject = subject
                .child(segment)
                .ok_or_else(|| BindError::MissingSubject(name.to_string()))?;
        }
        Ok(subject)
    }
}
