//! DOM Events
//!
//! Listener registry with bubbling dispatch and selector-based delegation.

use std::rc::Rc;

use crate::{NodeId, Selector};

/// DOM event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEventType {
    Click,
    Change,
    Input,
    Focus,
    Blur,
}

impl DomEventType {
    /// Check if this event type can bubble
    pub fn bubbles(&self) -> bool {
        !matches!(self, DomEventType::Focus | DomEventType::Blur)
    }

    /// DOM event name
    pub fn name(&self) -> &'static str {
        match self {
            DomEventType::Click => "click",
            DomEventType::Change => "change",
            DomEventType::Input => "input",
            DomEventType::Focus => "focus",
            DomEventType::Blur => "blur",
        }
    }
}

/// DOM event as seen by a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub event_type: DomEventType,
    /// Node the event was dispatched to
    pub target: NodeId,
    /// Node the listener is attached to
    pub current_target: NodeId,
    /// For delegated listeners, the nearest node between `target` and
    /// `current_target` that matched the delegate selector
    pub delegate_target: Option<NodeId>,
}

/// Listener handle, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Event listener callback. Errors abort the dispatch and reach its caller.
pub type EventHandler = Rc<dyn Fn(&DomEvent) -> anyhow::Result<()>>;

struct Listener {
    id: ListenerId,
    node: NodeId,
    event_type: DomEventType,
    delegate: Option<Selector>,
    handler: EventHandler,
}

/// Registered listeners of one document
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn add(
        &mut self,
        node: NodeId,
        event_type: DomEventType,
        delegate: Option<Selector>,
        handler: EventHandler,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(Listener {
            id,
            node,
            event_type,
            delegate,
            handler,
        });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() < before
    }

    pub fn count_for(&self, node: NodeId) -> usize {
        self.listeners.iter().filter(|l| l.node == node).count()
    }

    /// Listeners attached to `node` for `event_type`, in registration order
    pub fn matching(
        &self,
        node: NodeId,
        event_type: DomEventType,
    ) -> impl Iterator<Item = (Option<&Selector>, &EventHandler)> {
        self.listeners
            .iter()
            .filter(move |l| l.node == node && l.event_type == event_type)
            .map(|l| (l.delegate.as_ref(), &l.handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bubbles() {
        assert!(DomEventType::Click.bubbles());
        assert!(DomEventType::Change.bubbles());
        assert!(!DomEventType::Focus.bubbles());
    }

    #[test]
    fn test_registry_add_remove() {
        let mut registry = ListenerRegistry::default();
        let handler: EventHandler = Rc::new(|_: &DomEvent| -> anyhow::Result<()> { Ok(()) });
        let a = registry.add(NodeId(1), DomEventType::Click, None, handler.clone());
        let b = registry.add(NodeId(1), DomEventType::Change, None, handler);

        assert_ne!(a, b);
        assert_eq!(registry.count_for(NodeId(1)), 2);
        assert_eq!(registry.matching(NodeId(1), DomEventType::Click).count(), 1);
        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert_eq!(registry.count_for(NodeId(1)), 1);
    }
}
