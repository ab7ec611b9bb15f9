//! Binding Directives
//!
//! Reads the prefixed attributes of one element into a [`BindingDirective`].

use std::collections::{BTreeMap, BTreeSet};

use crate::{BindError, PathSpec};

/// Model event subscription, from `subject.event`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    pub subject_name: String,
    /// Event name, colon suffix included (`change:status`)
    pub event_name: String,
}

/// Publish target, from `subject:property`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSpec {
    pub subject_name: String,
    pub property_name: String,
}

/// Everything an element asked for through its attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingDirective {
    pub subscriptions: Vec<SubscriptionSpec>,
    pub publish_targets: Vec<PublishSpec>,
    /// Selector of the element holding template markup
    pub template_ref: Option<String>,
    /// Path of the rendered value
    pub value_ref: Option<PathSpec>,
    /// Attribute receiving the rendered value instead of inner content
    pub attribute_target: Option<String>,
    /// Delegate selector for click publishing
    pub child_selector: Option<String>,
    pub auto_render: bool,
    /// Identity token already present on the element
    pub identity: Option<String>,
    /// Values of registered custom directives
    pub extras: BTreeMap<String, String>,
}

impl BindingDirective {
    /// Check if the element has anything to render
    pub fn renders(&self) -> bool {
        self.template_ref.is_some() || self.value_ref.is_some()
    }
}

const SUBSCRIBE: &str = "subscribe";
const PUBLISH: &str = "publish";
const AUTO_RENDER: &str = "auto-render";
const TEMPLATE: &str = "template";
const SET_VALUE: &str = "set-value";
const SET: &str = "set";
const SET_ATTRIBUTE: &str = "set-attribute";
const LISTEN_TO: &str = "listen-to";
const LISTEN: &str = "listen";
const UUID: &str = "uuid";

/// Item separator of list-valued directives
const ITEM_DELIMITER: char = ',';

/// Directive attribute parser
#[derive(Debug, Clone)]
pub struct DirectiveParser {
    prefix: String,
    custom: BTreeSet<String>,
}

impl DirectiveParser {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            custom: BTreeSet::new(),
        }
    }

    /// Also accept `{prefix}{name}`, collected into `extras`
    pub fn with_custom(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.custom.extend(names);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Parse an element's attributes.
    ///
    /// Returns `Ok(None)` when no recognized directive is present; the
    /// identity attribute alone does not make an element bindable.
    pub fn parse(&self, attributes: &[(String, String)]) -> Result<Option<BindingDirective>, BindError> {
        let mut directive = BindingDirective::default();
        let mut recognized = false;
        let mut set_value: Option<&str> = None;
        let mut set: Option<&str> = None;
        let mut listen_to: Option<&str> = None;
        let mut listen: Option<&str> = None;

        for (name, value) in attributes {
            let Some(key) = name.strip_prefix(self.prefix.as_str()) else {
                continue;
            };
            match key {
                SUBSCRIBE => {
                    for item in split_items(value) {
                        directive.subscriptions.push(self.subscription(name, item)?);
                    }
                }
                PUBLISH => {
                    for item in split_items(value) {
                        directive.publish_targets.push(self.publish(name, item)?);
                    }
                }
                AUTO_RENDER => directive.auto_render = value.trim() != "false",
                TEMPLATE => directive.template_ref = non_empty(value),
                SET_VALUE => set_value = Some(value.as_str()),
                SET => set = Some(value.as_str()),
                SET_ATTRIBUTE => directive.attribute_target = non_empty(value),
                LISTEN_TO => listen_to = Some(value.as_str()),
                LISTEN => listen = Some(value.as_str()),
                UUID => {
                    directive.identity = non_empty(value);
                    continue;
                }
                other if self.custom.contains(other) => {
                    directive.extras.insert(other.to_string(), value.clone());
                }
                _ => continue,
            }
            recognized = true;
        }

        if !recognized {
            return Ok(None);
        }

        directive.value_ref = set_value.or(set).and_then(non_empty).map(|path| PathSpec::parse(&path));
        directive.child_selector = listen_to.or(listen).and_then(non_empty);
        Ok(Some(directive))
    }

    fn subscription(&self, attribute: &str, item: &str) -> Result<SubscriptionSpec, BindError> {
        match item.split_once('.') {
            Some((subject, event)) if !subject.trim().is_empty() && !event.trim().is_empty() => {
                Ok(SubscriptionSpec {
                    subject_name: subject.trim().to_string(),
                    event_name: event.trim().to_string(),
                })
            }
            _ => Err(malformed(attribute, item)),
        }
    }

    fn publish(&self, attribute: &str, item: &str) -> Result<PublishSpec, BindError> {
        match item.split_once(':') {
            Some((subject, property)) if !subject.trim().is_empty() && !property.trim().is_empty() => {
                Ok(PublishSpec {
                    subject_name: subject.trim().to_string(),
                    property_name: property.trim().to_string(),
                })
            }
            _ => Err(malformed(attribute, item)),
        }
    }
}

fn split_items(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(ITEM_DELIMITER)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn malformed(attribute: &str, item: &str) -> BindError {
    BindError::MalformedDirective {
        attribute: attribute.to_string(),
        item: item.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_full_directive() {
        let parser = DirectiveParser::new("bind-");
        let directive = parser
            .parse(&attrs(&[
                ("id", "status"),
                ("bind-subscribe", "model.change:status, view.change"),
                ("bind-set-value", "model:status"),
                ("bind-set-attribute", "class"),
                ("bind-auto-render", "true"),
            ]))
            .unwrap()
            .unwrap();

        assert_eq!(
            directive.subscriptions,
            vec![
                SubscriptionSpec {
                    subject_name: "model".into(),
                    event_name: "change:status".into()
                },
                SubscriptionSpec {
                    subject_name: "view".into(),
                    event_name: "change".into()
                },
            ]
        );
        assert_eq!(directive.value_ref, Some(PathSpec::parse("model:status")));
        assert_eq!(directive.attribute_target.as_deref(), Some("class"));
        assert!(directive.auto_render);
        assert!(directive.renders());
    }

    #[test]
    fn test_parse_publish_targets() {
        let parser = DirectiveParser::new("bind-");
        let directive = parser
            .parse(&attrs(&[("bind-publish", "model:username,audit:lastInput,")]))
            .unwrap()
            .unwrap();
        assert_eq!(directive.publish_targets.len(), 2);
        assert_eq!(directive.publish_targets[1].subject_name, "audit");
        assert_eq!(directive.publish_targets[1].property_name, "lastInput");
        assert!(!directive.auto_render);
    }

    #[test]
    fn test_no_directives() {
        let parser = DirectiveParser::new("bind-");
        assert_eq!(parser.parse(&attrs(&[("class", "x")])).unwrap(), None);
        // identity alone is not a binding
        assert_eq!(parser.parse(&attrs(&[("bind-uuid", "bind-4")])).unwrap(), None);
    }

    #[test]
    fn test_identity_and_aliases() {
        let parser = DirectiveParser::new("bind-");
        let directive = parser
            .parse(&attrs(&[
                ("bind-uuid", "bind-9"),
                ("bind-set", "model:a"),
                ("bind-set-value", "model:b"),
                ("bind-listen", "li"),
                ("bind-publish", "model:picked"),
            ]))
            .unwrap()
            .unwrap();
        assert_eq!(directive.identity.as_deref(), Some("bind-9"));
        assert_eq!(directive.value_ref.unwrap().final_property, "b");
        assert_eq!(directive.child_selector.as_deref(), Some("li"));
    }

    #[test]
    fn test_auto_render_false() {
        let parser = DirectiveParser::new("bind-");
        let directive = parser
            .parse(&attrs(&[("bind-auto-render", "false"), ("bind-set", "model:a")]))
            .unwrap()
            .unwrap();
        assert!(!directive.auto_render);
    }

    #[test]
    fn test_malformed_items() {
        let parser = DirectiveParser::new("bind-");
        assert_eq!(
            parser.parse(&attrs(&[("bind-subscribe", "model")])),
            Err(BindError::MalformedDirective {
                attribute: "bind-subscribe".into(),
                item: "model".into()
            })
        );
        assert!(matches!(
            parser.parse(&attrs(&[("bind-publish", "model.username")])),
            Err(BindError::MalformedDirective { .. })
        ));
    }

    #[test]
    fn test_custom_prefix_and_extras() {
        let parser = DirectiveParser::new("data-x-").with_custom(["toggle".to_string()]);
        let directive = parser
            .parse(&attrs(&[("bind-publish", "model:a"), ("data-x-toggle", "hidden")]))
            .unwrap()
            .unwrap();
        assert!(directive.publish_targets.is_empty());
        assert_eq!(directive.extras.get("toggle").map(String::as_str), Some("hidden"));
    }
}
