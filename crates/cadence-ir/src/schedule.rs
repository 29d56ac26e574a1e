//! Compiled execution schedules.
//!
//! Produced by the causality pass (unit order) and the SDF pass (firing
//! counts), consumed by the runtime. Shared here so the runtime does not
//! depend on the compiler.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{NodeId, ReactionKey};

/// One step of the propose phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScheduleUnit {
    /// An acyclic reaction, fired once (times its SDF firing count)
    Single(ReactionKey),
    /// An algebraic cycle, iterated to a fixed point under a microstep
    /// budget. Members keep their discovery order for determinism.
    Cycle {
        members: Vec<ReactionKey>,
        /// Tightest declared `max_microsteps` among the members; the
        /// runtime default applies when none was declared
        budget: Option<u32>,
    },
}

/// Topologically ordered plan for one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub units: Vec<ScheduleUnit>,
    /// Firings per macro-period for actors in balanced SDF regions;
    /// actors not listed fire once per tick
    pub firing_counts: IndexMap<NodeId, u32>,
}

impl Schedule {
    pub fn firings_for(&self, node: &NodeId) -> u32 {
        self.firing_counts.get(node).copied().unwrap_or(1)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
