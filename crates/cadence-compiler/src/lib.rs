//! Cadence Compiler
//!
//! Lowers authored dataflow graphs into frozen IR, runs the analysis
//! pipeline (structure, types, write conflicts, causality, non-Zeno,
//! initialization, SDF balancing, continuous boundaries), and emits the
//! schedule the runtime executes.

pub mod builder;
mod deps;
pub mod diag;
pub mod lower;
pub mod passes;
pub mod pipeline;
pub mod schedule;
mod ternary;

pub use builder::{BodySpec, BuildError, GraphBuilder, NodeSpec, PortSpec, ReactionSpec, StateSpec};
pub use diag::{codes, Diagnostic, DiagnosticSink, Report, Severity};
pub use lower::lower_delays;
pub use pipeline::{compile, CompileOutcome, CompiledPipeline};
pub use schedule::build_schedule;
