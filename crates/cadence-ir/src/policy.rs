//! Write policies: deterministic collapse of concurrent variable writes.
//!
//! Every variable carries exactly one policy. During the resolve phase the
//! scheduler groups buffered intents per variable and asks the policy for a
//! single value; the answer must not depend on proposal order except where
//! LWW's priority list makes the order explicit.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{NodeId, VarId};
use crate::value::Value;

/// A pending write proposed during the propose phase
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub var: VarId,
    pub producer: NodeId,
    pub value: Value,
}

/// Commutative, associative merge with an identity element.
///
/// Monoids are monotone in the value lattice, which makes variables with a
/// merge policy admissible inside constructive cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Monoid {
    Sum,
    Max,
    Min,
}

impl Monoid {
    pub fn identity(&self) -> Value {
        match self {
            Monoid::Sum => Value::Scalar(0.0),
            Monoid::Max => Value::Scalar(f64::NEG_INFINITY),
            Monoid::Min => Value::Scalar(f64::INFINITY),
        }
    }

    pub fn combine(&self, a: f64, b: f64) -> f64 {
        match self {
            Monoid::Sum => a + b,
            Monoid::Max => a.max(b),
            Monoid::Min => a.min(b),
        }
    }
}

impl fmt::Display for Monoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Monoid::Sum => write!(f, "sum"),
            Monoid::Max => write!(f, "max"),
            Monoid::Min => write!(f, "min"),
        }
    }
}

/// Policy resolving multiple intents on one variable within a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WritePolicy {
    /// At most one concrete writer per tick; more is a runtime error
    Error,
    /// Last writer wins; `priority` ranks producers, later entries win.
    /// Producers missing from the list lose to every listed one.
    LastWriterWins { priority: Vec<NodeId> },
    /// Fold all intents through a monoid
    Merge(Monoid),
}

impl WritePolicy {
    pub fn is_monotone(&self) -> bool {
        matches!(self, WritePolicy::Merge(_))
    }

    /// Collapse grouped intents into one value.
    ///
    /// The slice holds every intent for a single variable, in proposal
    /// order. Callers never pass an empty slice; an unwritten variable
    /// simply keeps its committed value.
    pub fn merge(&self, var: &VarId, intents: &[Intent]) -> Result<Value, PolicyError> {
        match self {
            WritePolicy::Error => {
                if intents.len() > 1 {
                    return Err(PolicyError::Conflict {
                        var: var.clone(),
                        producers: intents.iter().map(|i| i.producer.clone()).collect(),
                    });
                }
                intents
                    .first()
                    .map(|i| i.value)
                    .ok_or_else(|| PolicyError::Empty { var: var.clone() })
            }
            WritePolicy::LastWriterWins { priority } => {
                let rank = |producer: &NodeId| -> i64 {
                    priority
                        .iter()
                        .position(|p| p == producer)
                        .map(|i| i as i64)
                        .unwrap_or(-1)
                };
                let mut best: Option<(&Intent, i64)> = None;
                for intent in intents {
                    let r = rank(&intent.producer);
                    // >= keeps the later intent on ties: last writer wins
                    if best.map(|(_, br)| r >= br).unwrap_or(true) {
                        best = Some((intent, r));
                    }
                }
                best.map(|(i, _)| i.value)
                    .ok_or_else(|| PolicyError::Empty { var: var.clone() })
            }
            WritePolicy::Merge(monoid) => {
                let mut acc = monoid.identity().as_scalar().unwrap_or(0.0);
                let mut any = false;
                for intent in intents {
                    let v = intent.value.as_scalar().ok_or_else(|| PolicyError::Type {
                        var: var.clone(),
                        found: intent.value,
                    })?;
                    acc = monoid.combine(acc, v);
                    any = true;
                }
                if !any {
                    return Err(PolicyError::Empty { var: var.clone() });
                }
                Ok(Value::Scalar(acc))
            }
        }
    }
}

/// Errors produced while merging intents
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    #[error("multiple writers for '{var}' under ErrorPolicy: {producers:?}")]
    Conflict { var: VarId, producers: Vec<NodeId> },

    #[error("no intents to merge for '{var}'")]
    Empty { var: VarId },

    #[error("non-scalar value {found} merged into '{var}'")]
    Type { var: VarId, found: Value },
}
