//! Form controls
//!
//! Value semantics for `input`, `select` and `textarea`.

/// Kind of native form control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Input,
    Select,
    TextArea,
}

impl ControlKind {
    /// Classify an element by its (lowercase) tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "input" => Some(Self::Input),
            "select" => Some(Self::Select),
            "textarea" => Some(Self::TextArea),
            _ => None,
        }
    }

    /// Event name fired when the user commits a new value
    pub fn value_event(&self) -> crate::DomEventType {
        crate::DomEventType::Change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag() {
        assert_eq!(ControlKind::from_tag("input"), Some(ControlKind::Input));
        assert_eq!(ControlKind::from_tag("select"), Some(ControlKind::Select));
        assert_eq!(ControlKind::from_tag("textarea"), Some(ControlKind::TextArea));
        assert_eq!(ControlKind::from_tag("button"), None);
    }
}
