//! Binding context
//!
//! Named subjects shared by every binding of an engine. The set of names is
//! fixed once built; the subjects themselves are free to change.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::Subject;

/// Named subjects available to paths, subscriptions and publish targets
#[derive(Clone, Default)]
pub struct Context {
    subjects: Rc<BTreeMap<String, Rc<dyn Subject>>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.subjects.keys()).finish()
    }
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Look up a subject by its top-level name
    pub fn get(&self, name: &str) -> Option<Rc<dyn Subject>> {
        self.subjects.get(name).cloned()
    }

    /// Check if a top-level name exists
    pub fn contains(&self, name: &str) -> bool {
        self.subjects.contains_key(name)
    }

    /// Subject names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Object of every subject's snapshot, keyed by name
    pub fn snapshot(&self) -> Value {
        let map: Map<String, Value> = self
            .subjects
            .iter()
            .map(|(name, subject)| (name.clone(), subject.snapshot()))
            .collect();
        Value::Object(map)
    }
}

/// Builder for [`Context`]
#[derive(Default)]
pub struct ContextBuilder {
    subjects: BTreeMap<String, Rc<dyn Subject>>,
}

impl ContextBuilder {
    /// Add a subject under `name`
    pub fn subject(self, name: &str, subject: impl Subject + 'static) -> Self {
        self.shared(name, Rc::new(subject))
    }

    /// Add an already shared subject under `name`
    pub fn shared(mut self, name: &str, subject: Rc<dyn Subject>) -> Self {
        self.subjects.insert(name.to_string(), subject);
        self
    }

    pub fn build(self) -> Context {
        Context {
            subjects: Rc::new(self.subjects),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Model;
    use serde_json::json;

    #[test]
    fn test_lookup_and_snapshot() {
        let model = Model::new().with("status", "active");
        let view = Model::new().with("title", "Home");
        let context = Context::builder()
            .subject("model", model)
            .subject("view", view)
            .build();

        assert_eq!(context.len(), 2);
        assert!(context.contains("model"));
        assert!(!context.contains("store"));
        assert_eq!(context.names().collect::<Vec<_>>(), vec!["model", "view"]);
        assert_eq!(
            context.snapshot(),
            json!({ "model": { "status": "active" }, "view": { "title": "Home" } })
        );
    }

    #[test]
    fn test_clones_share_subjects() {
        let model = Model::new();
        let context = Context::builder().subject("model", model.clone()).build();
        let copy = context.clone();
        model
            .set("x", json!(1), crate::SetOptions::default())
            .unwrap();
        assert_eq!(copy.get("model").unwrap().get("x"), Some(json!(1)));
    }
}
