//! fOS Bind - Declarative data binding
//!
//! Synchronizes observable subjects with DOM elements using nothing but
//! attributes on the elements themselves.
//!
//! ```text
//! <span bind-subscribe="model.change:status"
//!       bind-set-value="model:status"
//!       bind-set-attribute="class"
//!       bind-auto-render="true"></span>
//!
//! <input bind-publish="model:username">
//! ```
//!
//! Features:
//! - Path expressions (`model:status`, `app.user:name`, `model:greet:a,b`)
//!   resolved against a named [`Context`] of subjects
//! - Model → DOM rendering through value paths or templates
//! - DOM → model publishing from form controls, clicks and delegated clicks
//! - Echo suppression: every publish is tagged with the element's identity
//!   token and the element ignores change events carrying its own token
//! - Deferred `UpdateElement` notifications on an explicit [`TaskQueue`]
//!
//! # Example
//! ```rust,ignore
//! use fos_bind::{Context, Engine, Model, Options, Scope};
//!
//! let model = Model::new().with("status", "active");
//! let context = Context::builder().subject("model", model.clone()).build();
//! let engine = Engine::new(Scope::document(document), context, Options::default())?;
//! model.set("status", "inactive".into(), Default::default())?;
//! engine.queue().run_until_idle();
//! ```

mod config;
mod context;
mod directive;
mod engine;
mod error;
mod flows;
mod identity;
mod notify;
mod path;
mod queue;
mod registry;
mod subject;
mod template;

pub use config::{Delimiter, Delimiters, Options};
pub use context::{Context, ContextBuilder};
pub use directive::{BindingDirective, DirectiveParser, PublishSpec, SubscriptionSpec};
pub use engine::{BoundElement, Engine, EngineBuilder, Scope, Session};
pub use error::BindError;
pub use identity::IdentityManager;
pub use notify::{UpdateChannel, UpdateElement, UpdateHandler};
pub use path::{PathResolver, PathSpec};
pub use queue::TaskQueue;
pub use registry::{DirectiveDescriptor, DirectiveRegistry, FlowHandler, FlowKind, Trigger};
pub use subject::{Method, Model, SetOptions, Subject, SubjectEvent, SubjectHandler, SubscriptionId};
pub use template::{display_value, CompiledTemplate, DelimitedRenderer, TemplateError, TemplateRenderer};

// Re-export the DOM crate for hosts that only depend on fos-bind
pub use fos_dom as dom;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
