//! Shared harness for end-to-end Cadence tests.

use cadence_compiler::{compile, CompileOutcome, GraphBuilder};
use cadence_ir::{Mode, PortRef, Sample, Tag, Value, VarId};
use cadence_runtime::{Runtime, TickSnapshot};

/// Compile-then-run helper: builds a runtime from an authored graph and
/// panics with the full report when the graph is rejected.
pub struct TestHarness {
    runtime: Runtime,
}

impl TestHarness {
    pub fn from_builder(builder: &GraphBuilder) -> Self {
        Self::from_builder_mode(builder, Mode::Pragmatic)
    }

    pub fn from_builder_mode(builder: &GraphBuilder, mode: Mode) -> Self {
        let outcome = compile(builder, mode).expect("graph assembly failed");
        let pipeline = outcome
            .pipeline
            .unwrap_or_else(|| panic!("compile rejected the graph:\n{}", outcome.report));
        Self {
            runtime: Runtime::new(pipeline.graph, pipeline.schedule),
        }
    }

    /// Compile without running, for diagnostics-focused tests
    pub fn try_compile(builder: &GraphBuilder, mode: Mode) -> CompileOutcome {
        compile(builder, mode).expect("graph assembly failed")
    }

    pub fn runtime(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    pub fn tick(&mut self) -> TickSnapshot {
        self.runtime.step().expect("tick failed")
    }

    pub fn run_ticks(&mut self, n: u64) -> Vec<TickSnapshot> {
        (0..n).map(|_| self.tick()).collect()
    }

    pub fn var_scalar(&self, name: &str) -> Option<f64> {
        self.runtime.get_var(&VarId::from(name)).as_scalar()
    }

    pub fn enqueue(&mut self, tag: Tag, node: &str, port: &str, value: f64) {
        self.runtime
            .events_in(tag, PortRef::new(node, port), Value::Scalar(value))
            .expect("event rejected");
    }
}

/// Output-port sample from a snapshot
pub fn output(snapshot: &TickSnapshot, node: &str, port: &str) -> Sample {
    snapshot
        .outputs
        .get(&PortRef::new(node, port))
        .copied()
        .unwrap_or(Sample::Absent)
}

/// Scalar output-port value, panicking when absent
pub fn output_scalar(snapshot: &TickSnapshot, node: &str, port: &str) -> f64 {
    output(snapshot, node, port)
        .as_scalar()
        .unwrap_or_else(|| panic!("{node}.{port} is not a present scalar"))
}
