//! Update notifications
//!
//! Emitted on the task queue after every render that wrote to the DOM.

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::NodeId;
use serde_json::Value;

/// Channel of [`UpdateElement`] notifications
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateChannel {
    /// Every update
    All,
    /// Updates of the element with this DOM `id`
    Element(String),
}

impl UpdateChannel {
    /// Event name of the channel
    pub fn key(&self) -> String {
        match self {
            UpdateChannel::All => "updateElement".to_string(),
            UpdateChannel::Element(id) => format!("updateElement:{id}"),
        }
    }
}

/// Payload of an update notification
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateElement {
    pub node: NodeId,
    pub identity: String,
    /// DOM `id` of the element, if any
    pub element_id: Option<String>,
    /// Value that was written
    pub value: Value,
}

pub type UpdateHandler = Rc<dyn Fn(&UpdateElement)>;

/// Update listeners, keyed by channel
#[derive(Clone, Default)]
pub(crate) struct Notifier {
    handlers: Rc<RefCell<Vec<(UpdateChannel, UpdateHandler)>>>,
}

impl Notifier {
    pub fn subscribe(&self, channel: UpdateChannel, handler: UpdateHandler) {
        self.handlers.borrow_mut().push((channel, handler));
    }

    /// Deliver to the global channel, then to the element's own channel
    pub fn emit(&self, update: &UpdateElement) {
        let handlers: Vec<UpdateHandler> = {
            let handlers = self.handlers.borrow();
            let global = handlers
                .iter()
                .filter(|(channel, _)| *channel == UpdateChannel::All);
            let own = handlers.iter().filter(|(channel, _)| match channel {
                UpdateChannel::Element(id) => update.element_id.as_deref() == Some(id.as_str()),
                UpdateChannel::All => false,
            });
            global.chain(own).map(|(_, h)| Rc::clone(h)).collect()
        };
        for handler in handlers {
            handler(update);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }
}
