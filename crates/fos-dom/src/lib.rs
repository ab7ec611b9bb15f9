//! fOS DOM - Document Object Model
//!
//! Arena-backed DOM tree that hosts declarative bindings: attribute access,
//! inner markup, form control values, per-node structured data, simple
//! selectors, bubbling event dispatch with delegation, and mutation records.
//!
//! The document is single-threaded. Share it through [`DocumentHandle`],
//! which never holds a borrow while an event listener runs.

mod node;
mod tree;
mod document;
mod selector;
mod dom_events;
mod observer;
pub mod forms;

pub use node::{Attribute, ElementData, Node, NodeData};
pub use tree::DomTree;
pub use document::{Document, DocumentHandle};
pub use selector::{Selector, SelectorContext, SelectorError};
pub use dom_events::{DomEvent, DomEventType, EventHandler, ListenerId};
pub use observer::{MutationRecord, MutationType};
pub use forms::ControlKind;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node" links
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this ID refers to a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
