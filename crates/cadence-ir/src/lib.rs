//! Cadence IR
//!
//! The typed graph model shared by the compiler and the runtime: nodes,
//! ports, variables, reactions with expression ASTs, write policies, and
//! the compiled schedule.

pub mod eval;
pub mod expr;
pub mod graph;
pub mod policy;
pub mod schedule;
pub mod types;
pub mod value;

pub use eval::{eval, BuiltinFn, Builtins, Env, EvalError};
pub use expr::{collect_refs, contains_delay, walk, BinOp, BuiltinSig, CmpOp, Expr, ExprError, ExprKind, LogicOp, Ref};
pub use graph::{Edge, Graph, Node, OutputBinding, Port, PostWrite, RankSpec, Reaction, ReactionBody, VarKind, Variable};
pub use policy::{Intent, Monoid, PolicyError, WritePolicy};
pub use schedule::{Schedule, ScheduleUnit};
pub use types::{Contract, Direction, ElemType, Mode, NodeId, NodeKind, PortRef, ReactionId, ReactionKey, Tag, VarId};
pub use value::{Sample, Value};
