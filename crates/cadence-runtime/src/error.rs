//! Runtime errors.
//!
//! A tick is atomic: every error raised mid-tick aborts that tick before
//! commit, discards its intents, and leaves the previously committed
//! environment intact.

use thiserror::Error;

use cadence_ir::{EvalError, PolicyError, PortRef, ReactionKey, Tag, VarId};

/// Runtime result type
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("cycle {members:?} exceeded {limit} microsteps at {tag}")]
    Zeno {
        tag: Tag,
        members: Vec<ReactionKey>,
        limit: u32,
    },

    #[error("write policy violation: {0}")]
    WritePolicy(#[from] PolicyError),

    #[error("non-finite value committed to '{target}'")]
    Numeric { target: String },

    #[error("reaction '{key}' failed: {message}")]
    NodeFault { key: ReactionKey, message: String },

    #[error("no implementation registered for '{key}'")]
    Unregistered { key: String },

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("unknown port '{0}'")]
    UnknownPort(PortRef),

    #[error("unknown variable '{0}'")]
    UnknownVariable(VarId),

    #[error("event tag {tag} is in the past (current {current})")]
    PastTag { tag: Tag, current: Tag },
}
