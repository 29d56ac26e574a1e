//! Typed expression trees for Core reactions.
//!
//! Expressions are built through checked constructors; every node carries
//! its result type, so a malformed tree cannot be represented. References
//! are resolved `(kind, id)` pairs, never names.
//!
//! `Delay(inner, default)` is the only non-strict form: it reads as the
//! previous tick's value of `inner` and is rewritten by delay lowering into
//! a hidden state variable plus a post-commit write. Compiled graphs
//! contain no `Delay` nodes.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ElemType, PortRef, VarId};
use crate::value::Value;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

/// Logical combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
}

/// A resolved reference inside an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ref {
    Port(PortRef),
    Var(VarId),
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Port(p) => write!(f, "{p}"),
            Ref::Var(v) => write!(f, "{v}"),
        }
    }
}

/// Declared signature of an opaque builtin.
///
/// The IR only knows the signature; implementations are registered on the
/// runtime's builtin table. A builtin sees raw samples and may handle
/// `ABSENT` itself, unlike the strict operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinSig {
    pub name: String,
    pub params: Vec<ElemType>,
    pub ret: ElemType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Const(Value),
    Ref(Ref),
    Bin {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cmp {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    If {
        cond: Box<Expr>,
        then_: Box<Expr>,
        else_: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Delay {
        inner: Box<Expr>,
        default: Value,
    },
}

/// An expression node with its result type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: ElemType,
}

/// Construction-time type errors
#[derive(Debug, Clone, Error)]
pub enum ExprError {
    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: &'static str,
        expected: ElemType,
        found: ElemType,
    },

    #[error("builtin '{builtin}' expects {expected} arguments, found {found}")]
    Arity {
        builtin: String,
        expected: usize,
        found: usize,
    },
}

fn expect(ty: ElemType, expected: ElemType, context: &'static str) -> Result<(), ExprError> {
    if ty.unifies_with(expected) {
        Ok(())
    } else {
        Err(ExprError::TypeMismatch {
            context,
            expected,
            found: ty,
        })
    }
}

/// Pick the more concrete of two unified types.
fn narrow(a: ElemType, b: ElemType) -> ElemType {
    if a.is_any() {
        b
    } else {
        a
    }
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            ty: value.elem_type(),
            kind: ExprKind::Const(value),
        }
    }

    pub fn port(port: PortRef, ty: ElemType) -> Self {
        Self {
            kind: ExprKind::Ref(Ref::Port(port)),
            ty,
        }
    }

    pub fn var(var: impl Into<VarId>, ty: ElemType) -> Self {
        Self {
            kind: ExprKind::Ref(Ref::Var(var.into())),
            ty,
        }
    }

    pub fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Result<Self, ExprError> {
        expect(lhs.ty, ElemType::Scalar, "arithmetic operand")?;
        expect(rhs.ty, ElemType::Scalar, "arithmetic operand")?;
        Ok(Self {
            kind: ExprKind::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty: ElemType::Scalar,
        })
    }

    pub fn cmp(op: CmpOp, lhs: Expr, rhs: Expr) -> Result<Self, ExprError> {
        if !matches!(op, CmpOp::Eq) {
            // Ordered comparisons are numeric; equality works on any type
            expect(lhs.ty, ElemType::Scalar, "comparison operand")?;
            expect(rhs.ty, ElemType::Scalar, "comparison operand")?;
        } else if !lhs.ty.unifies_with(rhs.ty) {
            return Err(ExprError::TypeMismatch {
                context: "equality operands",
                expected: lhs.ty,
                found: rhs.ty,
            });
        }
        Ok(Self {
            kind: ExprKind::Cmp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty: ElemType::Bool,
        })
    }

    pub fn logic(op: LogicOp, lhs: Expr, rhs: Expr) -> Result<Self, ExprError> {
        expect(lhs.ty, ElemType::Bool, "logical operand")?;
        expect(rhs.ty, ElemType::Bool, "logical operand")?;
        Ok(Self {
            kind: ExprKind::Logic {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty: ElemType::Bool,
        })
    }

    pub fn not(inner: Expr) -> Result<Self, ExprError> {
        expect(inner.ty, ElemType::Bool, "negation operand")?;
        Ok(Self {
            kind: ExprKind::Not(Box::new(inner)),
            ty: ElemType::Bool,
        })
    }

    pub fn if_(cond: Expr, then_: Expr, else_: Expr) -> Result<Self, ExprError> {
        expect(cond.ty, ElemType::Bool, "conditional guard")?;
        if !then_.ty.unifies_with(else_.ty) {
            return Err(ExprError::TypeMismatch {
                context: "conditional branches",
                expected: then_.ty,
                found: else_.ty,
            });
        }
        let ty = narrow(then_.ty, else_.ty);
        Ok(Self {
            kind: ExprKind::If {
                cond: Box::new(cond),
                then_: Box::new(then_),
                else_: Box::new(else_),
            },
            ty,
        })
    }

    pub fn call(sig: &BuiltinSig, args: Vec<Expr>) -> Result<Self, ExprError> {
        if args.len() != sig.params.len() {
            return Err(ExprError::Arity {
                builtin: sig.name.clone(),
                expected: sig.params.len(),
                found: args.len(),
            });
        }
        for (arg, param) in args.iter().zip(&sig.params) {
            expect(arg.ty, *param, "builtin argument")?;
        }
        Ok(Self {
            kind: ExprKind::Call {
                name: sig.name.clone(),
                args,
            },
            ty: sig.ret,
        })
    }

    pub fn delay(inner: Expr, default: impl Into<Value>) -> Result<Self, ExprError> {
        let default = default.into();
        if !inner.ty.unifies_with(default.elem_type()) {
            return Err(ExprError::TypeMismatch {
                context: "delay default",
                expected: inner.ty,
                found: default.elem_type(),
            });
        }
        let ty = narrow(inner.ty, default.elem_type());
        Ok(Self {
            kind: ExprKind::Delay {
                inner: Box::new(inner),
                default,
            },
            ty,
        })
    }
}

/// Recursively walk an expression tree in pre-order, calling the visitor
/// for each node before its children. `Delay` inners are visited too; use
/// [`collect_refs`] for the instantaneous view.
pub fn walk<V>(expr: &Expr, visitor: &mut V)
where
    V: FnMut(&Expr),
{
    visitor(expr);
    match &expr.kind {
        ExprKind::Bin { lhs, rhs, .. }
        | ExprKind::Cmp { lhs, rhs, .. }
        | ExprKind::Logic { lhs, rhs, .. } => {
            walk(lhs, visitor);
            walk(rhs, visitor);
        }
        ExprKind::Not(inner) => walk(inner, visitor),
        ExprKind::If { cond, then_, else_ } => {
            walk(cond, visitor);
            walk(then_, visitor);
            walk(else_, visitor);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                walk(arg, visitor);
            }
        }
        ExprKind::Delay { inner, .. } => walk(inner, visitor),
        ExprKind::Const(_) | ExprKind::Ref(_) => {}
    }
}

/// Collect the references an expression reads *instantaneously*.
///
/// `Delay` subtrees are skipped entirely: a delayed read observes the
/// previous tick and does not create a same-tick dependency.
pub fn collect_refs(expr: &Expr, out: &mut IndexSet<Ref>) {
    match &expr.kind {
        ExprKind::Ref(r) => {
            out.insert(r.clone());
        }
        ExprKind::Bin { lhs, rhs, .. }
        | ExprKind::Cmp { lhs, rhs, .. }
        | ExprKind::Logic { lhs, rhs, .. } => {
            collect_refs(lhs, out);
            collect_refs(rhs, out);
        }
        ExprKind::Not(inner) => collect_refs(inner, out),
        ExprKind::If { cond, then_, else_ } => {
            collect_refs(cond, out);
            collect_refs(then_, out);
            collect_refs(else_, out);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                collect_refs(arg, out);
            }
        }
        ExprKind::Delay { .. } => {}
        ExprKind::Const(_) => {}
    }
}

/// Whether any `Delay` node remains in the tree
pub fn contains_delay(expr: &Expr) -> bool {
    let mut found = false;
    walk(expr, &mut |e| {
        if matches!(e.kind, ExprKind::Delay { .. }) {
            found = true;
        }
    });
    found
}
