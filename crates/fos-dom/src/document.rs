//! Document - High-level document API

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use serde_json::Value;

use crate::dom_events::ListenerRegistry;
use crate::observer::MutationLog;
use crate::{
    ControlKind, DomEvent, DomEventType, DomTree, ElementData, EventHandler, ListenerId,
    MutationRecord, NodeData, NodeId, Selector, SelectorContext, SelectorError,
};

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
    pub(crate) listeners: ListenerRegistry,
    mutations: MutationLog,
}

impl Document {
    /// Create a document with `<html>`, `<head>` and `<body>`
    pub fn new() -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        tree.append_child(tree.root(), html);
        tree.append_child(html, head);
        tree.append_child(html, body);

        Self {
            tree,
            html_element: html,
            head_element: head,
            body_element: body,
            listeners: ListenerRegistry::default(),
            mutations: MutationLog::default(),
        }
    }

    /// Create an empty document (no structure)
    pub fn empty() -> Self {
        Self {
            tree: DomTree::new(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
            listeners: ListenerRegistry::default(),
            mutations: MutationLog::default(),
        }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        self.tree.get(node)?.as_element()
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        self.tree.get_mut(node)?.as_element_mut()
    }

    // ========================================================================
    // STRUCTURE
    // ========================================================================

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.tree.create_element(tag)
    }

    /// Append `child` under `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.tree.append_child(parent, child);
        self.mutations.push(|| MutationRecord::child_list(parent));
    }

    /// Create an element and append it under `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.tree.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Append a text node under `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.tree.create_text(text);
        self.append_child(parent, id);
        id
    }

    /// Detach a node (and its subtree) from the document
    pub fn remove(&mut self, node: NodeId) {
        let parent = self.tree.get(node).map(|n| n.parent).unwrap_or(NodeId::NONE);
        self.tree.detach(node);
        if parent.is_valid() {
            self.mutations.push(|| MutationRecord::child_list(parent));
        }
    }

    /// Check whether a node is connected to the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.tree.is_inclusive_descendant(node, self.tree.root())
    }

    /// Lowercase tag name of an element
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    // ========================================================================
    // ATTRIBUTES
    // ========================================================================

    /// Get an attribute value
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.get_attr(name)
    }

    /// All attributes of an element as owned pairs, in insertion order
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.element(node)
            .map(|e| {
                e.attrs
                    .iter()
                    .map(|a| (a.name.clone(), a.value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set an attribute. Returns false if `node` is not an element.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(el) = self.element_mut(node) else {
            return false;
        };
        let old = el.set_attr(name, value.to_string());
        self.mutations
            .push(|| MutationRecord::attribute(node, name, old));
        true
    }

    /// Remove an attribute, returning its former value
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        let old = self.element_mut(node)?.remove_attr(name)?;
        let recorded = old.clone();
        self.mutations
            .push(|| MutationRecord::attribute(node, name, Some(recorded)));
        Some(old)
    }

    // ========================================================================
    // CONTENT
    // ========================================================================

    /// Serialized markup of the node's children
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for (child, _) in self.tree.children(node) {
            self.serialize_into(child, &mut out);
        }
        out
    }

    /// Replace the node's children with `markup`, stored verbatim
    pub fn set_inner_html(&mut self, node: NodeId, markup: &str) {
        if self.tree.get(node).is_none() {
            return;
        }
        self.tree.clear_children(node);
        if !markup.is_empty() {
            let content = self.tree.create_markup(markup);
            self.tree.append_child(node, content);
        }
        self.mutations.push(|| MutationRecord::child_list(node));
    }

    /// Concatenated text of all descendant text and markup nodes
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.tree.descendants_inclusive(node) {
            match self.tree.get(id).map(|n| &n.data) {
                Some(NodeData::Text(t)) | Some(NodeData::Markup(t)) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    fn serialize_into(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.tree.get(id) else { return };
        match &node.data {
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for attr in &el.attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape(&attr.value, true));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                    return;
                }
                for (child, _) in self.tree.children(id) {
                    self.serialize_into(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
            NodeData::Text(text) => out.push_str(&escape(text, false)),
            NodeData::Markup(markup) => out.push_str(markup),
            NodeData::Document => {
                for (child, _) in self.tree.children(id) {
                    self.serialize_into(child, out);
                }
            }
        }
    }

    // ========================================================================
    // FORM CONTROLS
    // ========================================================================

    /// Form control kind of an element, if it is one
    pub fn control_kind(&self, node: NodeId) -> Option<ControlKind> {
        ControlKind::from_tag(&self.element(node)?.tag)
    }

    /// Current value of a form control
    pub fn form_value(&self, node: NodeId) -> Option<String> {
        let el = self.element(node)?;
        let kind = ControlKind::from_tag(&el.tag)?;
        if let Some(value) = &el.value {
            return Some(value.clone());
        }
        Some(match kind {
            ControlKind::Input => el.get_attr("value").unwrap_or_default().to_string(),
            ControlKind::TextArea => self.text_content(node),
            ControlKind::Select => self.default_option_value(node),
        })
    }

    fn default_option_value(&self, select: NodeId) -> String {
        let options: Vec<NodeId> = self
            .tree
            .descendants_inclusive(select)
            .into_iter()
            .filter(|&id| self.tag_name(id) == Some("option"))
            .collect();
        let chosen = options
            .iter()
            .copied()
            .find(|&id| self.attribute(id, "selected").is_some())
            .or_else(|| options.first().copied());
        match chosen {
            Some(option) => self
                .attribute(option, "value")
                .map(str::to_string)
                .unwrap_or_else(|| self.text_content(option)),
            None => String::new(),
        }
    }

    /// Set the current value of a form control. Returns false for other nodes.
    pub fn set_form_value(&mut self, node: NodeId, value: &str) -> bool {
        if self.control_kind(node).is_none() {
            return false;
        }
        let old = self.form_value(node);
        if let Some(el) = self.element_mut(node) {
            el.value = Some(value.to_string());
        }
        self.mutations.push(|| MutationRecord::value(node, old));
        true
    }

    // ========================================================================
    // NODE DATA
    // ========================================================================

    /// Structured data associated with an element
    pub fn node_data(&self, node: NodeId) -> Option<&Value> {
        self.element(node)?.data.as_ref()
    }

    /// Associate structured data with an element
    pub fn set_node_data(&mut self, node: NodeId, data: Value) {
        if let Some(el) = self.element_mut(node) {
            el.data = Some(data);
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Get element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants_inclusive(self.tree.root())
            .into_iter()
            .find(|&node| self.element(node).and_then(|e| e.id()) == Some(id))
    }

    /// Check an element against a parsed selector
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// All descendants of `root` (excluding `root`) matching `selector`
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .tree
            .descendants_inclusive(root)
            .into_iter()
            .skip(1)
            .filter(|&id| self.matches(id, &selector))
            .collect())
    }

    /// First descendant of `root` matching `selector`
    pub fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        Ok(self.query_selector_all(root, selector)?.into_iter().next())
    }

    /// Nearest inclusive ancestor of `node` matching `selector`, stopping
    /// before `boundary`
    pub fn closest_within(&self, node: NodeId, selector: &Selector, boundary: NodeId) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.tree.ancestors(node))
            .take_while(|&id| id != boundary)
            .find(|&id| self.matches(id, selector))
    }

    /// `root` and its descendants carrying at least one attribute whose name
    /// starts with `prefix`, in document order
    pub fn elements_with_attribute_prefix(&self, root: NodeId, prefix: &str) -> Vec<NodeId> {
        self.tree
            .descendants_inclusive(root)
            .into_iter()
            .filter(|&id| {
                self.element(id)
                    .is_some_and(|e| e.attrs.iter().any(|a| a.name.starts_with(prefix)))
            })
            .collect()
    }

    /// Number of listeners attached to a node
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.count_for(node)
    }

    // ========================================================================
    // MUTATION RECORDS
    // ========================================================================

    /// Start or stop recording mutations. Stopping discards pending records.
    pub fn observe_mutations(&mut self, enabled: bool) {
        self.mutations.set_enabled(enabled);
    }

    /// Drain recorded mutations
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.mutations.take()
    }
}

impl SelectorContext for Document {
    fn element(&self, node: NodeId) -> Option<&ElementData> {
        self.tree.get(node)?.as_element()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.get(node).map(|n| n.parent).filter(|&p| p != NodeId::NONE)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(input: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Shared, single-threaded handle to a [`Document`].
///
/// Event dispatch goes through the handle so that no borrow of the document
/// is held while listeners run; listeners are free to mutate the document.
#[derive(Debug, Clone, Default)]
pub struct DocumentHandle {
    inner: Rc<RefCell<Document>>,
}

impl DocumentHandle {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Rc::new(RefCell::new(document)),
        }
    }

    pub fn borrow(&self) -> Ref<'_, Document> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Document> {
        self.inner.borrow_mut()
    }

    /// Check whether two handles share a document
    pub fn ptr_eq(&self, other: &DocumentHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Attach a listener. With `delegate`, the listener only fires for events
    /// whose target lies at or below a descendant matching the selector.
    pub fn add_event_listener(
        &self,
        node: NodeId,
        event_type: DomEventType,
        delegate: Option<&str>,
        handler: EventHandler,
    ) -> Result<ListenerId, SelectorError> {
        let delegate = delegate.map(Selector::parse).transpose()?;
        Ok(self
            .inner
            .borrow_mut()
            .listeners
            .add(node, event_type, delegate, handler))
    }

    /// Detach a listener
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.borrow_mut().listeners.remove(id)
    }

    /// Dispatch an event at `target`, bubbling through its ancestors when the
    /// event type bubbles. Returns the number of listeners invoked; the first
    /// listener error stops the dispatch and is returned.
    pub fn dispatch_event(&self, target: NodeId, event_type: DomEventType) -> anyhow::Result<usize> {
        tracing::trace!(event = event_type.name(), %target, "dispatching DOM event");

        let calls: Vec<(DomEvent, EventHandler)> = {
            let doc = self.inner.borrow();
            let path: Vec<NodeId> = if event_type.bubbles() {
                std::iter::once(target).chain(doc.tree.ancestors(target)).collect()
            } else {
                vec![target]
            };

            let mut calls = Vec::new();
            for current in path {
                for (delegate, handler) in doc.listeners.matching(current, event_type) {
                    let delegate_target = match delegate {
                        None => None,
                        Some(selector) => match doc.closest_within(target, selector, current) {
                            Some(found) => Some(found),
                            None => continue,
                        },
                    };
                    calls.push((
                        DomEvent {
                            event_type,
                            target,
                            current_target: current,
                            delegate_target,
                        },
                        Rc::clone(handler),
                    ));
                }
            }
            calls
        };

        let invoked = calls.len();
        for (event, handler) in calls {
            handler(&event)?;
        }
        Ok(invoked)
    }

    /// Simulate a user click
    pub fn click(&self, node: NodeId) -> anyhow::Result<usize> {
        self.dispatch_event(node, DomEventType::Click)
    }

    /// Simulate a user committing `value` into a form control
    pub fn change(&self, node: NodeId, value: &str) -> anyhow::Result<usize> {
        if !self.inner.borrow_mut().set_form_value(node, value) {
            anyhow::bail!("node {node} is not a form control");
        }
        self.dispatch_event(node, DomEventType::Change)
    }

    /// Simulate a user typing `value` into a form control
    pub fn input(&self, node: NodeId, value: &str) -> anyhow::Result<usize> {
        if !self.inner.borrow_mut().set_form_value(node, value) {
            anyhow::bail!("node {node} is not a form control");
        }
        self.dispatch_event(node, DomEventType::Input)
    }
}
