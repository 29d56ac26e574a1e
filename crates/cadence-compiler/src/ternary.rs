//! Three-valued domain for constructive causality analysis.
//!
//! During fixed-point iteration a reference is ⊥ ("not yet determined"),
//! ABSENT, or a concrete value, ordered `⊥ ⊑ ABSENT` and `⊥ ⊑ present(v)`.
//! The evaluator is total and monotone in that order. The type is private
//! to this crate: ⊥ must never reach the runtime, and keeping it out of
//! the IR enforces that structurally.

use cadence_ir::{BinOp, CmpOp, Expr, ExprKind, LogicOp, Ref, Value};

/// A three-valued observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tri {
    /// Not yet determined this iteration
    Bottom,
    /// Determined to carry no value
    Absent,
    /// Determined to carry a value
    Present(Value),
}

impl Tri {
    pub fn is_bottom(&self) -> bool {
        matches!(self, Tri::Bottom)
    }

    pub fn is_determined(&self) -> bool {
        !self.is_bottom()
    }
}

/// Join a newly computed value into the iteration state.
///
/// Returns the merged value and whether it changed. Moving down the order
/// (a determined value back to ⊥) never happens: ⊥ on the right is a
/// no-op. Two differing present values replace each other and count as a
/// change; a cycle that keeps flipping burns its iteration budget and is
/// reported non-constructive.
pub fn join(old: Tri, new: Tri) -> (Tri, bool) {
    match (old, new) {
        (_, Tri::Bottom) => (old, false),
        (Tri::Bottom, determined) => (determined, true),
        (Tri::Absent, Tri::Absent) => (old, false),
        (Tri::Absent, Tri::Present(_)) => (new, true),
        (Tri::Present(_), Tri::Absent) => (old, false),
        (Tri::Present(a), Tri::Present(b)) => {
            if a == b {
                (old, false)
            } else {
                (new, true)
            }
        }
    }
}

/// Evaluate an expression in the three-valued domain.
///
/// `lookup` supplies the current iteration value for every reference;
/// callers route SCC-internal references to the iteration state and
/// external ones to their committed baseline.
pub fn eval3(expr: &Expr, lookup: &dyn Fn(&Ref) -> Tri) -> Tri {
    match &expr.kind {
        ExprKind::Const(v) => Tri::Present(*v),
        ExprKind::Ref(r) => lookup(r),
        ExprKind::Bin { op, lhs, rhs } => {
            let (l, r) = (eval3(lhs, lookup), eval3(rhs, lookup));
            lift_scalar2(l, r, |a, b| {
                Value::Scalar(match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Min => a.min(b),
                    BinOp::Max => a.max(b),
                })
            })
        }
        ExprKind::Cmp { op, lhs, rhs } => {
            let (l, r) = (eval3(lhs, lookup), eval3(rhs, lookup));
            match (l, r) {
                (Tri::Bottom, _) | (_, Tri::Bottom) => Tri::Bottom,
                (Tri::Absent, _) | (_, Tri::Absent) => Tri::Absent,
                (Tri::Present(a), Tri::Present(b)) => match cmp_values(*op, a, b) {
                    Some(out) => Tri::Present(Value::Bool(out)),
                    None => Tri::Bottom,
                },
            }
        }
        ExprKind::Logic { op, lhs, rhs } => {
            let (l, r) = (eval3(lhs, lookup), eval3(rhs, lookup));
            match (l, r) {
                (Tri::Bottom, _) | (_, Tri::Bottom) => Tri::Bottom,
                (Tri::Absent, _) | (_, Tri::Absent) => Tri::Absent,
                (Tri::Present(a), Tri::Present(b)) => match (a.as_bool(), b.as_bool()) {
                    (Some(a), Some(b)) => Tri::Present(Value::Bool(match op {
                        LogicOp::And => a && b,
                        LogicOp::Or => a || b,
                    })),
                    _ => Tri::Bottom,
                },
            }
        }
        ExprKind::Not(inner) => match eval3(inner, lookup) {
            Tri::Bottom => Tri::Bottom,
            Tri::Absent => Tri::Absent,
            Tri::Present(v) => match v.as_bool() {
                Some(b) => Tri::Present(Value::Bool(!b)),
                None => Tri::Bottom,
            },
        },
        // A ⊥ guard stays ⊥: until the condition is determined, nothing
        // about the result is known.
        ExprKind::If { cond, then_, else_ } => match eval3(cond, lookup) {
            Tri::Bottom => Tri::Bottom,
            Tri::Absent => Tri::Absent,
            Tri::Present(v) => match v.as_bool() {
                Some(true) => eval3(then_, lookup),
                Some(false) => eval3(else_, lookup),
                None => Tri::Bottom,
            },
        },
        // Opaque builtins cannot be iterated symbolically; fail closed.
        ExprKind::Call { .. } => Tri::Bottom,
        // A delayed read observes the previous tick, which is determined
        // by the time any microstep of this tick runs.
        ExprKind::Delay { default, .. } => Tri::Present(*default),
    }
}

fn lift_scalar2(l: Tri, r: Tri, f: impl Fn(f64, f64) -> Value) -> Tri {
    match (l, r) {
        (Tri::Bottom, _) | (_, Tri::Bottom) => Tri::Bottom,
        (Tri::Absent, _) | (_, Tri::Absent) => Tri::Absent,
        (Tri::Present(a), Tri::Present(b)) => match (a.as_scalar(), b.as_scalar()) {
            (Some(a), Some(b)) => Tri::Present(f(a, b)),
            _ => Tri::Bottom,
        },
    }
}

fn cmp_values(op: CmpOp, a: Value, b: Value) -> Option<bool> {
    if let CmpOp::Eq = op {
        return match (a, b) {
            (Value::Scalar(a), Value::Scalar(b)) => Some(a == b),
            (Value::Bool(a), Value::Bool(b)) => Some(a == b),
            _ => None,
        };
    }
    let (a, b) = (a.as_scalar()?, b.as_scalar()?);
    Some(match op {
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Ge => a >= b,
        CmpOp::Gt => a > b,
        CmpOp::Eq => unreachable!(),
    })
}
