//! Element identity tokens
//!
//! Every bound element carries a token in its `{prefix}uuid` attribute. The
//! token tags model writes originating from the element so that the element
//! can recognize, and skip, the change events it caused itself.

use std::sync::atomic::{AtomicU64, Ordering};

use fos_dom::{Document, NodeId};

/// Process-wide token counter; tokens are never reused
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Assigns and reads identity tokens
#[derive(Debug, Clone)]
pub struct IdentityManager {
    namespace: String,
    attribute: String,
}

impl IdentityManager {
    pub fn new(prefix: &str) -> Self {
        Self {
            namespace: prefix.to_string(),
            attribute: format!("{prefix}uuid"),
        }
    }

    /// Name of the attribute holding the token
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Token of `node`, assigning a fresh one if it has none.
    ///
    /// An empty attribute counts as absent.
    pub fn identify(&self, document: &mut Document, node: NodeId) -> String {
        if let Some(existing) = self.peek(document, node) {
            return existing;
        }
        let token = format!("{}{}", self.namespace, NEXT_TOKEN.fetch_add(1, Ordering::Relaxed));
        document.set_attribute(node, &self.attribute, &token);
        tracing::trace!(%node, %token, "assigned identity");
        token
    }

    /// Replace the token of `node` with a fresh one
    pub fn reassign(&self, document: &mut Document, node: NodeId) -> String {
        document.remove_attribute(node, &self.attribute);
        self.identify(document, node)
    }

    /// Token of `node` without assigning one
    pub fn peek(&self, document: &Document, node: NodeId) -> Option<String> {
        document
            .attribute(node, &self.attribute)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_is_idempotent() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(body, "span");
        let identities = IdentityManager::new("bind-");

        let first = identities.identify(&mut doc, span);
        let second = identities.identify(&mut doc, span);
        assert_eq!(first, second);
        assert!(first.starts_with("bind-"));
        assert_eq!(doc.attribute(span, "bind-uuid"), Some(first.as_str()));
    }

    #[test]
    fn test_reassign_replaces_token() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(body, "span");
        doc.set_attribute(span, "bind-uuid", "copied");
        let identities = IdentityManager::new("bind-");

        let fresh = identities.reassign(&mut doc, span);
        assert_ne!(fresh, "copied");
        assert_eq!(identities.peek(&doc, span), Some(fresh));
    }

    #[test]
    fn test_tokens_are_unique() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.append_element(body, "span");
        let b = doc.append_element(body, "span");
        let identities = IdentityManager::new("bind-");
        assert_ne!(identities.identify(&mut doc, a), identities.identify(&mut doc, b));
    }

    #[test]
    fn test_existing_token_is_kept() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(body, "span");
        doc.set_attribute(span, "bind-uuid", "custom");
        let identities = IdentityManager::new("bind-");
        assert_eq!(identities.identify(&mut doc, span), "custom");
    }

    #[test]
    fn test_empty_token_is_replaced() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(body, "span");
        doc.set_attribute(span, "bind-uuid", "");
        let identities = IdentityManager::new("bind-");
        assert_eq!(identities.peek(&doc, span), None);
        assert_ne!(identities.identify(&mut doc, span), "");
    }
}
