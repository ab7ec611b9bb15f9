//! Directive Registry
//!
//! Ordered table of directive descriptors. Each descriptor decides from the
//! parsed directive whether it applies, and names the flow that drives its
//! handler. Setup walks the table in order, so the built-in order
//! (auto-render, subscribe, publish) is the setup order of every element.

use std::rc::Rc;

use fos_dom::DomEvent;

use crate::{flows, BindError, BindingDirective, BoundElement, Session, SubjectEvent};

/// What drives a directive handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    /// Once, while the element is being bound
    Init,
    /// Each subscribed subject event
    Render,
    /// Each DOM event of the element's publish listener
    Publish,
}

/// Cause of a handler invocation
#[derive(Debug, Clone, Copy)]
pub enum Trigger<'a> {
    Init,
    Subject(&'a SubjectEvent),
    Dom(&'a DomEvent),
    /// Host call through the engine
    Manual,
}

impl Trigger<'_> {
    /// Identity token carried by a subject event, if any
    pub fn source(&self) -> Option<&str> {
        match self {
            Trigger::Subject(event) => event.options.source.as_deref(),
            _ => None,
        }
    }
}

pub type FlowHandler = Rc<dyn Fn(&Session, &BoundElement, &Trigger<'_>) -> Result<(), BindError>>;

/// One entry of the registry
#[derive(Clone)]
pub struct DirectiveDescriptor {
    pub trigger: FlowKind,
    /// Whether the descriptor applies to an element
    pub autoload: fn(&BindingDirective) -> bool,
    pub handler: FlowHandler,
}

impl std::fmt::Debug for DirectiveDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectiveDescriptor")
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

impl DirectiveDescriptor {
    pub fn new<F>(trigger: FlowKind, autoload: fn(&BindingDirective) -> bool, handler: F) -> Self
    where
        F: Fn(&Session, &BoundElement, &Trigger<'_>) -> Result<(), BindError> + 'static,
    {
        Self {
            trigger,
            autoload,
            handler: Rc::new(handler),
        }
    }
}

/// Directive table, one per engine
#[derive(Debug, Clone, Default)]
pub struct DirectiveRegistry {
    entries: Vec<(String, DirectiveDescriptor)>,
}

impl DirectiveRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in directives
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            "auto-render",
            DirectiveDescriptor::new(FlowKind::Init, |d| d.auto_render, flows::auto_render),
        );
        registry.register(
            "subscribe",
            DirectiveDescriptor::new(FlowKind::Render, |d| !d.subscriptions.is_empty(), flows::render),
        );
        registry.register(
            "publish",
            DirectiveDescriptor::new(FlowKind::Publish, |d| !d.publish_targets.is_empty(), flows::publish),
        );
        registry
    }

    /// Add a descriptor, replacing one registered under the same name in place
    pub fn register(&mut self, name: &str, descriptor: DirectiveDescriptor) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = descriptor,
            None => self.entries.push((name.to_string(), descriptor)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveDescriptor> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Descriptors in setup order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DirectiveDescriptor)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Names that are not built in, for the directive parser
    pub fn custom_names(&self) -> Vec<String> {
        const BUILTIN: [&str; 3] = ["auto-render", "subscribe", "publish"];
        self.entries
            .iter()
            .map(|(n, _)| n)
            .filter(|n| !BUILTIN.contains(&n.as_str()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
