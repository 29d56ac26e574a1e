//! Unified compile entry point.
//!
//! Build → lower delays → structural group → semantic group → schedule.
//! The semantic passes assume structural invariants and are skipped when
//! the structural group reported errors; either way the caller gets every
//! diagnostic collected so far.

use tracing::debug;

use cadence_ir::{Graph, Mode, Schedule};

use crate::builder::{BuildError, GraphBuilder};
use crate::diag::{DiagnosticSink, Report};
use crate::lower::lower_delays;
use crate::passes::{
    causality::CausalityPass, continuous::ContinuousPass, init::InitPass, sdf::SdfPass,
    structural::StructuralPass, typecheck::TypeCheckPass, write_conflict::WriteConflictPass,
    zeno::NonZenoPass, Pass,
};
use crate::schedule::build_schedule;

/// An accepted graph, ready to hand to the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPipeline {
    pub graph: Graph,
    pub schedule: Schedule,
}

/// Result of a compile: the artifact when accepted, the report always
#[derive(Debug)]
pub struct CompileOutcome {
    pub pipeline: Option<CompiledPipeline>,
    pub report: Report,
}

impl CompileOutcome {
    pub fn success(&self) -> bool {
        self.pipeline.is_some()
    }
}

/// Run the analysis pipeline over the authored graph.
///
/// The builder is borrowed, not consumed: compiling the same builder
/// twice produces identical IR and identical diagnostics.
pub fn compile(builder: &GraphBuilder, mode: Mode) -> Result<CompileOutcome, BuildError> {
    let mut graph = builder.build()?;
    lower_delays(&mut graph);

    let mut sink = DiagnosticSink::new(mode);

    let structural: [&dyn Pass; 3] = [&StructuralPass, &TypeCheckPass, &ContinuousPass];
    run_group(&structural, &graph, &mut sink);
    if sink.has_errors() {
        debug!("structural group failed; skipping semantic passes");
        return Ok(CompileOutcome {
            pipeline: None,
            report: sink.into_report(),
        });
    }

    let semantic: [&dyn Pass; 5] = [
        &WriteConflictPass,
        &CausalityPass,
        &NonZenoPass,
        &InitPass,
        &SdfPass,
    ];
    run_group(&semantic, &graph, &mut sink);

    let pipeline = if sink.has_errors() {
        None
    } else {
        let schedule = build_schedule(&graph);
        debug!(units = schedule.units.len(), "graph accepted");
        Some(CompiledPipeline { graph, schedule })
    };
    Ok(CompileOutcome {
        pipeline,
        report: sink.into_report(),
    })
}

fn run_group(passes: &[&dyn Pass], graph: &Graph, sink: &mut DiagnosticSink) {
    for pass in passes {
        debug!(pass = pass.name(), "running pass");
        pass.run(graph, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{NodeSpec, ReactionSpec};
    use crate::diag::codes;
    use cadence_ir::{ElemType, Expr};

    fn simple_builder() -> GraphBuilder {
        let mut b = GraphBuilder::new();
        b.add_node(
            NodeSpec::core("a")
                .output("out", ElemType::Scalar)
                .reaction(ReactionSpec::output("emit", "out", Expr::constant(3.0))),
        )
        .unwrap();
        b
    }

    #[test]
    fn test_clean_graph_compiles() {
        let outcome = compile(&simple_builder(), Mode::Pragmatic).unwrap();
        assert!(outcome.success());
        assert!(outcome.report.diagnostics.is_empty());
        assert_eq!(outcome.pipeline.unwrap().schedule.units.len(), 1);
    }

    #[test]
    fn test_compile_is_idempotent() {
        let b = simple_builder();
        let first = compile(&b, Mode::Pragmatic).unwrap();
        let second = compile(&b, Mode::Pragmatic).unwrap();
        assert_eq!(first.pipeline, second.pipeline);
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn test_structural_errors_skip_semantic_passes() {
        let mut b = GraphBuilder::new();
        // Unconnected input AND a self-feeding variable write; only the
        // structural code must surface.
        b.add_variable(
            "v",
            ElemType::Scalar,
            Some(cadence_ir::Value::Scalar(0.0)),
            cadence_ir::WritePolicy::Merge(cadence_ir::Monoid::Max),
        )
        .unwrap();
        b.add_node(
            NodeSpec::core("broken")
                .input("x", ElemType::Scalar)
                .output("y", ElemType::Scalar)
                .reaction(ReactionSpec::output(
                    "calc",
                    "y",
                    Expr::var("x", ElemType::Scalar),
                ))
                .reaction(ReactionSpec::new("spin").writes(
                    "v",
                    Expr::bin(
                        cadence_ir::BinOp::Add,
                        Expr::var("v", ElemType::Scalar),
                        Expr::constant(1.0),
                    )
                    .unwrap(),
                )),
        )
        .unwrap();
        let outcome = compile(&b, Mode::Pragmatic).unwrap();
        assert!(!outcome.success());
        assert!(outcome.report.has_code(codes::STRUCT001));
        assert!(!outcome.report.has_code(codes::ZEN001));
    }
}
