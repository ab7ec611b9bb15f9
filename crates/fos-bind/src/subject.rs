//! Subjects
//!
//! A subject is any observable object the bindings talk to: it emits named
//! events, exposes properties through `get`/`set`, and may expose callable
//! members. [`Model`] is the stock implementation.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::BindError;

/// Options passed along with a `set`, and echoed in the resulting events
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SetOptions {
    /// Identity token of the element that caused the change
    pub source: Option<String>,
    /// Suppress change events
    pub silent: bool,
}

impl SetOptions {
    /// Options tagged with the identity of the originating element
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            silent: false,
        }
    }

    /// Options that suppress change events
    pub fn silent() -> Self {
        Self {
            source: None,
            silent: true,
        }
    }
}

/// Event emitted by a subject
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectEvent {
    /// Event name, e.g. `change` or `change:status`
    pub name: String,
    /// Property the event is about, if any
    pub property: Option<String>,
    /// New value of that property
    pub value: Value,
    /// Options of the `set` that caused the event
    pub options: SetOptions,
}

/// Subscription handle, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Event callback. Errors propagate back to whoever triggered the event.
pub type SubjectHandler = Rc<dyn Fn(&SubjectEvent) -> Result<(), BindError>>;

/// Callable member of a subject
pub type Method = Rc<dyn Fn(&[Value]) -> Result<Value, BindError>>;

/// Observable object reachable from a [`Context`](crate::Context)
pub trait Subject {
    /// Subscribe to an event by name. Colon-qualified names such as
    /// `change:status` are matched literally.
    fn on(&self, event: &str, handler: SubjectHandler) -> SubscriptionId;

    /// Remove a subscription
    fn off(&self, id: SubscriptionId) -> bool;

    /// Read a property
    fn get(&self, property: &str) -> Option<Value>;

    /// Write a property
    fn set(&self, property: &str, value: Value, options: SetOptions) -> Result<(), BindError>;

    /// Callable member by name
    fn method(&self, _name: &str) -> Option<Method> {
        None
    }

    /// Nested subject by name, for dotted paths
    fn child(&self, _name: &str) -> Option<Rc<dyn Subject>> {
        None
    }

    /// Plain value view, used as template data
    fn snapshot(&self) -> Value;
}

type ModelMethod = Rc<dyn Fn(&Model, &[Value]) -> Result<Value, BindError>>;

struct Subscriber {
    id: SubscriptionId,
    event: String,
    handler: SubjectHandler,
}

#[derive(Default)]
struct ModelInner {
    attributes: RefCell<Map<String, Value>>,
    subscribers: RefCell<Vec<Subscriber>>,
    methods: RefCell<HashMap<String, ModelMethod>>,
    children: RefCell<BTreeMap<String, Rc<dyn Subject>>>,
    next_id: Cell<u64>,
    version: Cell<u64>,
}

/// Key/value model with change events.
///
/// A `set` that changes a property emits `change:{property}` and then
/// `change`. Setting an equal value is a no-op. Clones share state.
///
/// Besides user-defined methods, `get`, `set`, `has` and `toJSON` are
/// callable through paths (`model:get:status`).
#[derive(Clone, Default)]
pub struct Model {
    inner: Rc<ModelInner>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("attributes", &self.inner.attributes.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model from a JSON object. Other values yield an empty model.
    pub fn from_value(value: Value) -> Self {
        let model = Self::new();
        if let Value::Object(map) = value {
            *model.inner.attributes.borrow_mut() = map;
        }
        model
    }

    /// Builder-style initial attribute, set without events
    pub fn with(self, property: &str, value: impl Into<Value>) -> Self {
        self.inner
            .attributes
            .borrow_mut()
            .insert(property.to_string(), value.into());
        self
    }

    /// Register a callable member
    pub fn define_method<F>(&self, name: &str, method: F)
    where
        F: Fn(&Model, &[Value]) -> Result<Value, BindError> + 'static,
    {
        self.inner
            .methods
            .borrow_mut()
            .insert(name.to_string(), Rc::new(method));
    }

    /// Attach a nested subject reachable as `parent.name`
    pub fn insert_child(&self, name: &str, child: Rc<dyn Subject>) {
        self.inner
            .children
            .borrow_mut()
            .insert(name.to_string(), child);
    }

    /// Number of effective writes so far
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Check if a property is set
    pub fn has(&self, property: &str) -> bool {
        self.inner.attributes.borrow().contains_key(property)
    }

    /// Copy of all attributes
    pub fn attributes(&self) -> Map<String, Value> {
        self.inner.attributes.borrow().clone()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    fn emit(&self, event: &SubjectEvent) -> Result<(), BindError> {
        let handlers: Vec<SubjectHandler> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.event == event.name)
            .map(|s| Rc::clone(&s.handler))
            .collect();
        for handler in handlers {
            handler(event)?;
        }
        Ok(())
    }

    fn builtin(&self, name: &str) -> Option<ModelMethod> {
        let method: ModelMethod = match name {
            "get" => Rc::new(|model: &Model, args: &[Value]| -> Result<Value, BindError> {
                let key = key_arg(args, "get")?;
                Ok(model.get(&key).unwrap_or(Value::Null))
            }),
            "has" => Rc::new(|model: &Model, args: &[Value]| -> Result<Value, BindError> {
                let key = key_arg(args, "has")?;
                Ok(Value::Bool(model.has(&key)))
            }),
            "set" => Rc::new(|model: &Model, args: &[Value]| -> Result<Value, BindError> {
                let key = key_arg(args, "set")?;
                let value = args.get(1).cloned().unwrap_or(Value::Null);
                let options = match args.get(2) {
                    Some(raw) => SetOptions::deserialize(raw)
                        .map_err(|e| BindError::method("set", e))?,
                    None => SetOptions::default(),
                };
                model.set(&key, value.clone(), options)?;
                Ok(value)
            }),
            "toJSON" => Rc::new(|model: &Model, _: &[Value]| -> Result<Value, BindError> {
                Ok(model.snapshot())
            }),
            _ => return None,
        };
        Some(method)
    }
}

fn key_arg(args: &[Value], method: &str) -> Result<String, BindError> {
    match args.first() {
        Some(Value::String(key)) => Ok(key.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(BindError::method(method, "missing property name")),
    }
}

impl Subject for Model {
    fn on(&self, event: &str, handler: SubjectHandler) -> SubscriptionId {
        let next = self.inner.next_id.get() + 1;
        self.inner.next_id.set(next);
        let id = SubscriptionId(next);
        self.inner.subscribers.borrow_mut().push(Subscriber {
            id,
            event: event.to_string(),
            handler,
        });
        id
    }

    fn off(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() < before
    }

    fn get(&self, property: &str) -> Option<Value> {
        self.inner.attributes.borrow().get(property).cloned()
    }

    fn set(&self, property: &str, value: Value, options: SetOptions) -> Result<(), BindError> {
        {
            let mut attributes = self.inner.attributes.borrow_mut();
            if attributes.get(property) == Some(&value) {
                return Ok(());
            }
            attributes.insert(property.to_string(), value.clone());
        }
        self.inner.version.set(self.inner.version.get() + 1);

        if options.silent {
            return Ok(());
        }

        let specific = SubjectEvent {
            name: format!("change:{property}"),
            property: Some(property.to_string()),
            value,
            options,
        };
        self.emit(&specific)?;

        let general = SubjectEvent {
            name: "change".to_string(),
            ..specific
        };
        self.emit(&general)
    }

    fn method(&self, name: &str) -> Option<Method> {
        let method = self
            .inner
            .methods
            .borrow()
            .get(name)
            .cloned()
            .or_else(|| self.builtin(name))?;
        let model = self.clone();
        let bound: Method = Rc::new(move |args: &[Value]| method(&model, args));
        Some(bound)
    }

    fn child(&self, name: &str) -> Option<Rc<dyn Subject>> {
        self.inner.children.borrow().get(name).cloned()
    }

    fn snapshot(&self) -> Value {
        let mut map = self.inner.attributes.borrow().clone();
        for (name, child) in self.inner.children.borrow().iter() {
            map.entry(name.clone()).or_insert_with(|| child.snapshot());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(model: &Model, event: &str) -> Rc<RefCell<Vec<SubjectEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        model.on(
            event,
            Rc::new(move |e: &SubjectEvent| -> Result<(), BindError> {
                sink.borrow_mut().push(e.clone());
                Ok(())
            }),
        );
        seen
    }

    #[test]
    fn test_set_emits_specific_then_general() {
        let model = Model::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["change", "change:status"] {
            let sink = Rc::clone(&order);
            model.on(
                name,
                Rc::new(move |e: &SubjectEvent| -> Result<(), BindError> {
                    sink.borrow_mut().push(e.name.clone());
                    Ok(())
                }),
            );
        }

        model
            .set("status", json!("on"), SetOptions::from_source("bind-7"))
            .unwrap();
        assert_eq!(*order.borrow(), vec!["change:status", "change"]);
        assert_eq!(model.get("status"), Some(json!("on")));
        assert_eq!(model.version(), 1);
    }

    #[test]
    fn test_equal_set_is_noop() {
        let model = Model::new().with("n", 1);
        let seen = recorder(&model, "change");
        model.set("n", json!(1), SetOptions::default()).unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(model.version(), 0);
    }

    #[test]
    fn test_silent_set_updates_without_events() {
        let model = Model::new();
        let seen = recorder(&model, "change");
        model.set("n", json!(2), SetOptions::silent()).unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(model.get("n"), Some(json!(2)));
    }

    #[test]
    fn test_event_carries_source() {
        let model = Model::new();
        let seen = recorder(&model, "change:name");
        model
            .set("name", json!("alice"), SetOptions::from_source("bind-3"))
            .unwrap();
        let events = seen.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].options.source.as_deref(), Some("bind-3"));
        assert_eq!(events[0].property.as_deref(), Some("name"));
    }

    #[test]
    fn test_off_removes_subscription() {
        let model = Model::new();
        let id = model.on(
            "change",
            Rc::new(|_: &SubjectEvent| -> Result<(), BindError> { Ok(()) }),
        );
        assert_eq!(model.subscriber_count(), 1);
        assert!(model.off(id));
        assert!(!model.off(id));
        assert_eq!(model.subscriber_count(), 0);
    }

    #[test]
    fn test_builtin_and_defined_methods() {
        let model = Model::new().with("status", "active");
        model.define_method("shout", |model, args| {
            let key = args.first().and_then(Value::as_str).unwrap_or_default();
            let value = model.get(key).unwrap_or(Value::Null);
            Ok(json!(value.as_str().unwrap_or_default().to_uppercase()))
        });

        let get = model.method("get").unwrap();
        assert_eq!(get(&[json!("status")]).unwrap(), json!("active"));

        let shout = model.method("shout").unwrap();
        assert_eq!(shout(&[json!("status")]).unwrap(), json!("ACTIVE"));

        let set = model.method("set").unwrap();
        set(&[json!("status"), json!("idle"), json!({ "source": "bind-1" })]).unwrap();
        assert_eq!(model.get("status"), Some(json!("idle")));

        assert!(model.method("status").is_none());
        assert!(matches!(get(&[]), Err(BindError::Method { .. })));
    }

    #[test]
    fn test_handler_error_propagates_to_setter() {
        let model = Model::new();
        model.on(
            "change",
            Rc::new(|_: &SubjectEvent| -> Result<(), BindError> {
                Err(BindError::MissingTemplate("#nope".into()))
            }),
        );
        let err = model.set("x", json!(1), SetOptions::default()).unwrap_err();
        assert_eq!(err, BindError::MissingTemplate("#nope".into()));
    }

    #[test]
    fn test_snapshot_includes_children() {
        let user = Model::new().with("name", "ada");
        let app = Model::new().with("title", "demo");
        app.insert_child("user", Rc::new(user));
        assert_eq!(app.snapshot(), json!({ "title": "demo", "user": { "name": "ada" } }));
        assert!(app.child("user").is_some());
    }
}
