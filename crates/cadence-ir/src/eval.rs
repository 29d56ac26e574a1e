//! Concrete expression evaluator.
//!
//! Maps an expression plus an environment to a [`Sample`]. `ABSENT`
//! propagates through every strict operator; only builtins observe raw
//! samples and may handle absence themselves.

use indexmap::IndexMap;
use thiserror::Error;

use crate::expr::{BinOp, CmpOp, Expr, ExprKind, LogicOp, Ref};
use crate::value::{Sample, Value};

/// Read-only view of the values visible to a reaction
pub trait Env {
    fn lookup(&self, r: &Ref) -> Sample;
}

impl Env for IndexMap<Ref, Sample> {
    fn lookup(&self, r: &Ref) -> Sample {
        self.get(r).copied().unwrap_or(Sample::Absent)
    }
}

/// Implementation of an opaque builtin
pub type BuiltinFn = Box<dyn Fn(&[Sample]) -> Sample + Send + Sync>;

/// Builtin implementations, registered by name
#[derive(Default)]
pub struct Builtins {
    fns: IndexMap<String, BuiltinFn>,
}

impl Builtins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, f: BuiltinFn) {
        self.fns.insert(name.into(), f);
    }

    pub fn get(&self, name: &str) -> Option<&BuiltinFn> {
        self.fns.get(name)
    }
}

/// Evaluation failures.
///
/// Type confusion is only reachable through `Any`-typed references feeding
/// a strict operator; fully typed graphs cannot produce it.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("builtin '{0}' has no registered implementation")]
    UnknownBuiltin(String),

    #[error("runtime type confusion in {0}")]
    Type(&'static str),
}

/// Evaluate an expression against an environment.
pub fn eval(expr: &Expr, env: &dyn Env, builtins: &Builtins) -> Result<Sample, EvalError> {
    match &expr.kind {
        ExprKind::Const(v) => Ok(Sample::Present(*v)),
        ExprKind::Ref(r) => Ok(env.lookup(r)),
        ExprKind::Bin { op, lhs, rhs } => {
            let l = eval(lhs, env, builtins)?;
            let r = eval(rhs, env, builtins)?;
            let (Some(l), Some(r)) = (l.value(), r.value()) else {
                return Ok(Sample::Absent);
            };
            let (Some(l), Some(r)) = (l.as_scalar(), r.as_scalar()) else {
                return Err(EvalError::Type("arithmetic"));
            };
            Ok(Sample::Present(Value::Scalar(apply_bin(*op, l, r))))
        }
        ExprKind::Cmp { op, lhs, rhs } => {
            let l = eval(lhs, env, builtins)?;
            let r = eval(rhs, env, builtins)?;
            let (Some(l), Some(r)) = (l.value(), r.value()) else {
                return Ok(Sample::Absent);
            };
            Ok(Sample::Present(Value::Bool(apply_cmp(*op, l, r)?)))
        }
        ExprKind::Logic { op, lhs, rhs } => {
            let l = eval(lhs, env, builtins)?;
            let r = eval(rhs, env, builtins)?;
            let (Some(l), Some(r)) = (l.value(), r.value()) else {
                return Ok(Sample::Absent);
            };
            let (Some(l), Some(r)) = (l.as_bool(), r.as_bool()) else {
                return Err(EvalError::Type("logic"));
            };
            let out = match op {
                LogicOp::And => l && r,
                LogicOp::Or => l || r,
            };
            Ok(Sample::Present(Value::Bool(out)))
        }
        ExprKind::Not(inner) => {
            let v = eval(inner, env, builtins)?;
            let Some(v) = v.value() else {
                return Ok(Sample::Absent);
            };
            let Some(b) = v.as_bool() else {
                return Err(EvalError::Type("negation"));
            };
            Ok(Sample::Present(Value::Bool(!b)))
        }
        ExprKind::If { cond, then_, else_ } => {
            let c = eval(cond, env, builtins)?;
            let Some(c) = c.value() else {
                return Ok(Sample::Absent);
            };
            let Some(c) = c.as_bool() else {
                return Err(EvalError::Type("conditional guard"));
            };
            if c {
                eval(then_, env, builtins)
            } else {
                eval(else_, env, builtins)
            }
        }
        ExprKind::Call { name, args } => {
            let f = builtins
                .get(name)
                .ok_or_else(|| EvalError::UnknownBuiltin(name.clone()))?;
            let mut samples = Vec::with_capacity(args.len());
            for arg in args {
                samples.push(eval(arg, env, builtins)?);
            }
            Ok(f(&samples))
        }
        // Lowering removes Delay before anything executes; evaluating an
        // unlowered tree yields the declared default.
        ExprKind::Delay { default, .. } => Ok(Sample::Present(*default)),
    }
}

fn apply_bin(op: BinOp, l: f64, r: f64) -> f64 {
    match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => l / r,
        BinOp::Min => l.min(r),
        BinOp::Max => l.max(r),
    }
}

fn apply_cmp(op: CmpOp, l: Value, r: Value) -> Result<bool, EvalError> {
    if let CmpOp::Eq = op {
        return match (l, r) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(a == b),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            _ => Err(EvalError::Type("equality")),
        };
    }
    let (Some(l), Some(r)) = (l.as_scalar(), r.as_scalar()) else {
        return Err(EvalError::Type("comparison"));
    };
    Ok(match op {
        CmpOp::Lt => l < r,
        CmpOp::Le => l <= r,
        CmpOp::Ge => l >= r,
        CmpOp::Gt => l > r,
        CmpOp::Eq => unreachable!(),
    })
}
