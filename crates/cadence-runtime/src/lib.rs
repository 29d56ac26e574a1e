//! Cadence Runtime
//!
//! Executes compiled pipelines under a deterministic three-phase tick
//! with superdense time.

pub mod continuous;
pub mod error;
pub mod scheduler;
pub mod storage;

pub use continuous::{euler_step, rk4_step, ContinuousCtx, ContinuousFn};
pub use error::{Error, Result};
pub use scheduler::{BlackBoxFn, BlackBoxInput, Runtime, TickSnapshot};
