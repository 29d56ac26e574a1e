//! Runtime values and the first-class absence marker.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ElemType;

/// A concrete runtime value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(f64),
    Bool(bool),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn elem_type(&self) -> ElemType {
        match self {
            Value::Scalar(_) => ElemType::Scalar,
            Value::Bool(_) => ElemType::Bool,
        }
    }

    /// Non-finite scalars are rejected by the scheduler at commit.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Scalar(v) => v.is_finite(),
            Value::Bool(_) => true,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A port or variable observation: either a value or `ABSENT`.
///
/// `ABSENT` means "no value this tick" and is visible to readers; it is
/// distinct from every concrete value and propagates through arithmetic.
/// It is not the analyzer's ⊥, which never reaches the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Sample {
    #[default]
    Absent,
    Present(Value),
}

impl Sample {
    pub fn is_absent(&self) -> bool {
        matches!(self, Sample::Absent)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Sample::Present(_))
    }

    pub fn value(&self) -> Option<Value> {
        match self {
            Sample::Present(v) => Some(*v),
            Sample::Absent => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        self.value().and_then(|v| v.as_scalar())
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value().and_then(|v| v.as_bool())
    }
}

impl From<Value> for Sample {
    fn from(v: Value) -> Self {
        Sample::Present(v)
    }
}

impl From<Option<Value>> for Sample {
    fn from(v: Option<Value>) -> Self {
        match v {
            Some(v) => Sample::Present(v),
            None => Sample::Absent,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Absent => write!(f, "ABSENT"),
            Sample::Present(v) => write!(f, "{v}"),
        }
    }
}
