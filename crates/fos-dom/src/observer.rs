//! Mutation records
//!
//! A lightweight stand-in for MutationObserver: when observation is enabled
//! on a [`Document`](crate::Document), every write is appended to a log that
//! can be drained with `take_records`.

use crate::NodeId;

/// Kind of mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    ChildList,
    /// A form control's current value changed
    Value,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    pub fn child_list(target: NodeId) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            attribute_name: None,
            old_value: None,
        }
    }

    pub fn value(target: NodeId, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Value,
            target,
            attribute_name: None,
            old_value,
        }
    }
}

/// Mutation log
#[derive(Debug, Default)]
pub(crate) struct MutationLog {
    enabled: bool,
    records: Vec<MutationRecord>,
}

impl MutationLog {
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.records.clear();
        }
    }

    pub fn push(&mut self, record: impl FnOnce() -> MutationRecord) {
        if self.enabled {
            self.records.push(record());
        }
    }

    pub fn take(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }
}
