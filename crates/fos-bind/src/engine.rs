//! Engine - Binding entry point
//!
//! The engine discovers elements carrying directive attributes, tags them
//! with an identity, and wires both flows through the directive registry:
//! subject events render into the element, DOM events publish out of it.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use fos_dom::{DocumentHandle, DomEvent, DomEventType, EventHandler, ListenerId, NodeId};
use serde_json::Value;

use crate::notify::Notifier;
use crate::{
    display_value, BindError, BindingDirective, CompiledTemplate, Context, DelimitedRenderer,
    DirectiveDescriptor, DirectiveParser, DirectiveRegistry, FlowHandler, FlowKind, IdentityManager,
    Options, PathResolver, SetOptions, Subject, SubjectEvent, SubjectHandler, SubscriptionId,
    TaskQueue, TemplateRenderer, Trigger, UpdateChannel, UpdateElement,
};

/// Part of a document the engine binds
#[derive(Debug, Clone)]
pub struct Scope {
    pub document: DocumentHandle,
    /// Query root, bound itself when it carries directives
    pub root: NodeId,
}

impl Scope {
    pub fn new(document: DocumentHandle, root: NodeId) -> Self {
        Self { document, root }
    }

    /// The whole document
    pub fn document(document: DocumentHandle) -> Self {
        let root = document.borrow().root();
        Self { document, root }
    }
}

/// A bound element
#[derive(Debug, Clone, PartialEq)]
pub struct BoundElement {
    pub node: NodeId,
    /// Identity token, also stored in the element's `{prefix}uuid` attribute
    pub identity: String,
    pub directive: BindingDirective,
}

struct BindingRecord {
    bound: Rc<BoundElement>,
    listeners: Vec<ListenerId>,
    subscriptions: Vec<(Rc<dyn Subject>, SubscriptionId)>,
}

// ============================================================================
// SESSION
// ============================================================================

/// Engine state shared with every flow handler
pub struct Session {
    document: DocumentHandle,
    context: Context,
    options: Options,
    resolver: PathResolver,
    identities: IdentityManager,
    parser: DirectiveParser,
    registry: DirectiveRegistry,
    renderer: Rc<dyn TemplateRenderer>,
    templates: RefCell<HashMap<String, Rc<CompiledTemplate>>>,
    queue: TaskQueue,
    notifier: Notifier,
    bindings: RefCell<BTreeMap<NodeId, BindingRecord>>,
    index: RefCell<HashMap<String, NodeId>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .field("options", &self.options)
            .field("bound", &self.bindings.borrow().len())
            .field("update_handlers", &self.notifier.len())
            .field("pending_tasks", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn document(&self) -> &DocumentHandle {
        &self.document
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Bound element record of `node`
    pub fn bound(&self, node: NodeId) -> Option<Rc<BoundElement>> {
        self.bindings
            .borrow()
            .get(&node)
            .map(|record| Rc::clone(&record.bound))
    }

    /// Write the element's current value into the DOM.
    ///
    /// Returns false when there was nothing to write: no template and no
    /// value path, or a value path that does not resolve. A successful write
    /// schedules an [`UpdateElement`] notification on the task queue.
    pub fn render(&self, bound: &BoundElement) -> Result<bool, BindError> {
        let directive = &bound.directive;
        // template output always goes to content
        let (value, attribute_target) = if let Some(selector) = &directive.template_ref {
            let template = self.template(selector)?;
            (Value::String(template.render(&self.context.snapshot())), None)
        } else if let Some(path) = &directive.value_ref {
            match self.resolver.resolve_spec(path, None, &[])? {
                Some(value) => (value, directive.attribute_target.as_deref()),
                None => return Ok(false),
            }
        } else {
            return Ok(false);
        };

        let text = display_value(&value);
        let element_id = {
            let mut doc = self.document.borrow_mut();
            match attribute_target {
                Some(attribute) => {
                    doc.set_attribute(bound.node, attribute, &text);
                }
                None if doc.control_kind(bound.node).is_some() => {
                    doc.set_form_value(bound.node, &text);
                }
                None => doc.set_inner_html(bound.node, &text),
            }
            doc.attribute(bound.node, "id").map(str::to_string)
        };

        let update = UpdateElement {
            node: bound.node,
            identity: bound.identity.clone(),
            element_id,
            value,
        };
        let notifier = self.notifier.clone();
        self.queue.schedule_microtask(move || notifier.emit(&update));
        Ok(true)
    }

    /// Value an element publishes for `trigger`
    pub fn effective_value(&self, bound: &BoundElement, trigger: &Trigger<'_>) -> Value {
        let doc = self.document.borrow();
        if let Some(value) = doc.form_value(bound.node) {
            return Value::String(value);
        }
        if let Trigger::Dom(DomEvent {
            delegate_target: Some(target),
            ..
        }) = trigger
        {
            return match doc.node_data(*target) {
                Some(data) => data.clone(),
                None => Value::String(doc.inner_html(*target)),
            };
        }
        Value::String(doc.inner_html(bound.node))
    }

    /// Set `value` on every publish target, tagged with the element's identity
    pub fn publish_value(&self, bound: &BoundElement, value: Value) -> Result<(), BindError> {
        for target in &bound.directive.publish_targets {
            let subject = self.resolver.subject(&target.subject_name)?;
            subject.set(
                &target.property_name,
                value.clone(),
                SetOptions::from_source(bound.identity.as_str()),
            )?;
        }
        Ok(())
    }

    fn template(&self, selector: &str) -> Result<Rc<CompiledTemplate>, BindError> {
        if let Some(compiled) = self.templates.borrow().get(selector) {
            return Ok(Rc::clone(compiled));
        }

        let source = {
            let doc = self.document.borrow();
            let node = doc
                .query_selector(doc.root(), selector)?
                .ok_or_else(|| BindError::MissingTemplate(selector.to_string()))?;
            doc.inner_html(node)
        };
        let compiled = Rc::new(self.renderer.compile(&source, &self.options.template_delimiters)?);
        self.templates
            .borrow_mut()
            .insert(selector.to_string(), Rc::clone(&compiled));
        Ok(compiled)
    }

    // ========================================================================
    // SETUP
    // ========================================================================

    /// Bind `root` and its descendants that carry directives, skipping
    /// elements that are already bound. On failure the elements bound by this
    /// call are unbound again.
    fn bind_scope(self: &Rc<Self>, root: NodeId) -> Result<Vec<Rc<BoundElement>>, BindError> {
        let candidates = self
            .document
            .borrow()
            .elements_with_attribute_prefix(root, &self.options.prefix);

        let mut bound: Vec<Rc<BoundElement>> = Vec::new();
        for node in candidates {
            match self.bind_element(node) {
                Ok(Some(element)) => bound.push(element),
                Ok(None) => {}
                Err(err) => {
                    for element in &bound {
                        self.unbind(element.node);
                    }
                    return Err(err);
                }
            }
        }
        tracing::info!("Bound {} element(s) under {}", bound.len(), root);
        Ok(bound)
    }

    fn bind_element(self: &Rc<Self>, node: NodeId) -> Result<Option<Rc<BoundElement>>, BindError> {
        if self.bindings.borrow().contains_key(&node) {
            return Ok(None);
        }

        let attributes = self.document.borrow().attributes(node);
        let Some(mut directive) = self.parser.parse(&attributes)? else {
            return Ok(None);
        };
        let identity = {
            let mut doc = self.document.borrow_mut();
            let mut token = self.identities.identify(&mut doc, node);
            while self.index.borrow().get(&token).is_some_and(|&owner| owner != node) {
                tracing::warn!(%node, %token, "identity already bound to another element, reassigning");
                token = self.identities.reassign(&mut doc, node);
            }
            token
        };
        directive.identity = Some(identity.clone());

        let bound = Rc::new(BoundElement {
            node,
            identity,
            directive,
        });
        let mut record = BindingRecord {
            bound: Rc::clone(&bound),
            listeners: Vec::new(),
            subscriptions: Vec::new(),
        };

        if let Err(err) = self.attach(&bound, &mut record) {
            self.detach(&record);
            return Err(err);
        }

        self.index.borrow_mut().insert(bound.identity.clone(), node);
        self.bindings.borrow_mut().insert(node, record);
        Ok(Some(bound))
    }

    /// Run every applicable descriptor in registry order
    fn attach(self: &Rc<Self>, bound: &Rc<BoundElement>, record: &mut BindingRecord) -> Result<(), BindError> {
        let session: &Session = self;
        let element: &BoundElement = bound;

        for (name, descriptor) in self.registry.iter() {
            if !(descriptor.autoload)(&element.directive) && !element.directive.extras.contains_key(name) {
                continue;
            }
            match descriptor.trigger {
                FlowKind::Init => (descriptor.handler)(session, element, &Trigger::Init)?,
                FlowKind::Render => {
                    for subscription in &element.directive.subscriptions {
                        let subject = self.resolver.subject(&subscription.subject_name)?;
                        let handler = self.subject_handler(bound, &descriptor.handler);
                        let id = subject.on(&subscription.event_name, handler);
                        record.subscriptions.push((subject, id));
                    }
                }
                FlowKind::Publish => {
                    let id = self.attach_listener(bound, &descriptor.handler)?;
                    record.listeners.push(id);
                }
            }
            if self.options.debug {
                tracing::debug!(directive = name, node = %element.node, identity = %element.identity, "attached");
            }
        }
        Ok(())
    }

    fn subject_handler(self: &Rc<Self>, bound: &Rc<BoundElement>, handler: &FlowHandler) -> SubjectHandler {
        let session = Rc::downgrade(self);
        let bound = Rc::clone(bound);
        let handler = Rc::clone(handler);
        Rc::new(move |event: &SubjectEvent| -> Result<(), BindError> {
            let Some(session) = session.upgrade() else {
                return Ok(());
            };
            handler(&*session, &*bound, &Trigger::Subject(event))
        })
    }

    /// Form controls publish on change, elements with a child selector on
    /// delegated clicks, everything else on clicks on itself
    fn attach_listener(self: &Rc<Self>, bound: &Rc<BoundElement>, handler: &FlowHandler) -> Result<ListenerId, BindError> {
        let event_type = match self.document.borrow().control_kind(bound.node) {
            Some(kind) => kind.value_event(),
            None => DomEventType::Click,
        };
        let delegate = match event_type {
            DomEventType::Click => bound.directive.child_selector.as_deref(),
            _ => None,
        };

        let session = Rc::downgrade(self);
        let element = Rc::clone(bound);
        let handler = Rc::clone(handler);
        let listener: EventHandler = Rc::new(move |event: &DomEvent| -> anyhow::Result<()> {
            let Some(session) = session.upgrade() else {
                return Ok(());
            };
            handler(&*session, &*element, &Trigger::Dom(event))?;
            Ok(())
        });
        Ok(self
            .document
            .add_event_listener(bound.node, event_type, delegate, listener)?)
    }

    fn detach(&self, record: &BindingRecord) {
        for id in &record.listeners {
            self.document.remove_event_listener(*id);
        }
        for (subject, id) in &record.subscriptions {
            subject.off(*id);
        }
    }

    fn unbind(&self, node: NodeId) -> bool {
        let Some(record) = self.bindings.borrow_mut().remove(&node) else {
            return false;
        };
        self.index.borrow_mut().remove(&record.bound.identity);
        self.detach(&record);
        true
    }

    fn unbind_all(&self) {
        let records = std::mem::take(&mut *self.bindings.borrow_mut());
        self.index.borrow_mut().clear();
        for record in records.values() {
            self.detach(record);
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Declarative binding engine
///
/// Dropping the engine leaves its listeners and subscriptions in place as
/// no-ops; call [`Engine::unbind_all`] to remove them.
#[must_use = "bindings stop working once the engine is dropped"]
#[derive(Debug, Clone)]
pub struct Engine {
    session: Rc<Session>,
}

impl Engine {
    /// Bind every element under `scope` with the built-in directives.
    ///
    /// Fails on the first element whose setup fails; nothing stays bound.
    #[must_use = "bindings stop working once the engine is dropped"]
    pub fn new(scope: Scope, context: Context, options: Options) -> Result<Self, BindError> {
        Self::builder(scope.document, context)
            .options(options)
            .build(scope.root)
    }

    pub fn builder(document: DocumentHandle, context: Context) -> EngineBuilder {
        EngineBuilder::new(document, context)
    }

    /// Bind directive-carrying elements under `root` that are not bound yet.
    /// Returns the number of newly bound elements.
    ///
    /// Fails on the first element whose setup fails. Elements bound by this
    /// call are unbound again; earlier bindings stay. DOM writes already made
    /// by auto-render are not undone.
    pub fn bind_scope(&self, root: NodeId) -> Result<usize, BindError> {
        Ok(self.session.bind_scope(root)?.len())
    }

    /// Remove an element's listeners and subscriptions
    pub fn unbind(&self, node: NodeId) -> bool {
        self.session.unbind(node)
    }

    /// Unbind every element
    pub fn unbind_all(&self) {
        self.session.unbind_all();
    }

    /// Run the render flow of a bound element now. Returns whether the DOM
    /// was written.
    pub fn render(&self, node: NodeId) -> Result<bool, BindError> {
        match self.session.bound(node) {
            Some(bound) => self.session.render(&bound),
            None => Ok(false),
        }
    }

    /// Run the publish flow of a bound element now, with `value` or the
    /// element's current value. Returns false if `node` is not bound.
    pub fn publish(&self, node: NodeId, value: Option<Value>) -> Result<bool, BindError> {
        let Some(bound) = self.session.bound(node) else {
            return Ok(false);
        };
        let value = value.unwrap_or_else(|| self.session.effective_value(&bound, &Trigger::Manual));
        self.session.publish_value(&bound, value)?;
        Ok(true)
    }

    /// Listen for update notifications
    pub fn on_update<F>(&self, channel: UpdateChannel, handler: F)
    where
        F: Fn(&UpdateElement) + 'static,
    {
        self.session.notifier.subscribe(channel, Rc::new(handler));
    }

    /// Element bound under `identity`
    pub fn element_for(&self, identity: &str) -> Option<NodeId> {
        self.session.index.borrow().get(identity).copied()
    }

    /// Parsed directive of a bound element
    pub fn directive(&self, node: NodeId) -> Option<BindingDirective> {
        self.session.bound(node).map(|bound| bound.directive.clone())
    }

    /// Identity token of a bound element
    pub fn identity(&self, node: NodeId) -> Option<String> {
        self.session.bound(node).map(|bound| bound.identity.clone())
    }

    pub fn bound_count(&self) -> usize {
        self.session.bindings.borrow().len()
    }

    /// Resolve a path against the engine's context
    pub fn resolve(&self, path: &str) -> Result<Option<Value>, BindError> {
        self.session.resolver.resolve(path, None, &[])
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.session.queue
    }

    pub fn document(&self) -> &DocumentHandle {
        &self.session.document
    }

    pub fn context(&self) -> &Context {
        &self.session.context
    }

    pub fn options(&self) -> &Options {
        &self.session.options
    }

    pub fn session(&self) -> &Rc<Session> {
        &self.session
    }
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    document: DocumentHandle,
    context: Context,
    options: Options,
    registry: DirectiveRegistry,
    renderer: Rc<dyn TemplateRenderer>,
    queue: TaskQueue,
}

impl EngineBuilder {
    pub fn new(document: DocumentHandle, context: Context) -> Self {
        Self {
            document,
            context,
            options: Options::default(),
            registry: DirectiveRegistry::builtin(),
            renderer: Rc::new(DelimitedRenderer),
            queue: TaskQueue::new(),
        }
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Register a directive. Its `{prefix}{name}` attribute becomes
    /// recognized, and an element carrying it gets the handler even when the
    /// autoload predicate says no.
    pub fn directive(mut self, name: &str, descriptor: DirectiveDescriptor) -> Self {
        self.registry.register(name, descriptor);
        self
    }

    /// Replace the template renderer
    pub fn renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.renderer = Rc::new(renderer);
        self
    }

    /// Share a task queue with the host
    pub fn queue(mut self, queue: TaskQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Build the engine and bind every element under `root`
    #[must_use = "bindings stop working once the engine is dropped"]
    pub fn build(self, root: NodeId) -> Result<Engine, BindError> {
        self.options.validate()?;

        let parser = DirectiveParser::new(&self.options.prefix).with_custom(self.registry.custom_names());
        let session = Rc::new(Session {
            resolver: PathResolver::new(self.context.clone()),
            identities: IdentityManager::new(&self.options.prefix),
            parser,
            document: self.document,
            context: self.context,
            options: self.options,
            registry: self.registry,
            renderer: self.renderer,
            templates: RefCell::new(HashMap::new()),
            queue: self.queue,
            notifier: Notifier::default(),
            bindings: RefCell::new(BTreeMap::new()),
            index: RefCell::new(HashMap::new()),
        });
        tracing::info!("fOS Bind {} initialized (prefix '{}')", crate::VERSION, session.options.prefix);

        if let Err(err) = session.bind_scope(root) {
            tracing::warn!("Binding setup failed: {}", err);
            session.unbind_all();
            return Err(err);
        }
        Ok(Engine { session })
    }
}
