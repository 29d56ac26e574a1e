//! Scheduler-owned storage.
//!
//! The committed environment, the per-tick port buffer, and the external
//! event queue. Reactions receive read-only views; all mutation funnels
//! through the scheduler's phases.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use cadence_ir::{PortRef, Sample, Tag, Value, VarId};

/// Committed variable values. A variable with no entry reads as ABSENT.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    committed: IndexMap<VarId, Value>,
}

impl Environment {
    pub fn init(&mut self, id: VarId, value: Value) {
        self.committed.insert(id, value);
    }

    pub fn get(&self, id: &VarId) -> Sample {
        self.committed.get(id).copied().into()
    }

    /// Publish a resolved value; `None` clears the slot (a committed
    /// absence, e.g. a delay state whose deferred expression was ABSENT).
    pub fn commit(&mut self, id: VarId, value: Option<Value>) {
        match value {
            Some(v) => {
                self.committed.insert(id, v);
            }
            None => {
                self.committed.shift_remove(&id);
            }
        }
    }

    pub fn snapshot(&self) -> IndexMap<VarId, Value> {
        self.committed.clone()
    }

    /// Working copy for an SCC's microstep iteration
    pub fn working_copy(&self) -> IndexMap<VarId, Value> {
        self.committed.clone()
    }
}

/// Per-tick port values; cleared at tick start so unread outputs become
/// ABSENT in the next tick.
#[derive(Debug, Default)]
pub struct PortBuffer {
    values: IndexMap<PortRef, Sample>,
}

impl PortBuffer {
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn set(&mut self, port: PortRef, value: Sample) {
        self.values.insert(port, value);
    }

    pub fn get(&self, port: &PortRef) -> Sample {
        self.values.get(port).copied().unwrap_or(Sample::Absent)
    }

    /// Whether anything was written to the port this tick
    pub fn is_written(&self, port: &PortRef) -> bool {
        self.values.contains_key(port)
    }
}

/// Tag-ordered external events
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BTreeMap<Tag, Vec<(PortRef, Value)>>,
}

impl EventQueue {
    pub fn push(&mut self, tag: Tag, port: PortRef, value: Value) {
        self.events.entry(tag).or_default().push((port, value));
    }

    /// Drain every event scheduled at exactly this tag
    pub fn take_at(&mut self, tag: Tag) -> Vec<(PortRef, Value)> {
        self.events.remove(&tag).unwrap_or_default()
    }

    /// Whether a later microstep of the same tick still has events
    pub fn pending_same_tick(&self, tag: Tag) -> bool {
        self.events
            .range(tag.next_micro()..Tag::new(tag.tick + 1, 0))
            .next()
            .is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
