//! Write-conflict resolution checks.

use indexmap::IndexSet;

use cadence_ir::{Graph, Mode, NodeId, WritePolicy};

use crate::diag::{codes, DiagnosticSink};
use crate::passes::Pass;

pub struct WriteConflictPass;

impl Pass for WriteConflictPass {
    fn name(&self) -> &'static str {
        "write-conflict"
    }

    fn run(&self, ir: &Graph, sink: &mut DiagnosticSink) {
        let strict = sink.mode() == Mode::Strict;

        for var in ir.variables.values() {
            if var.is_delay_state() {
                continue;
            }
            let writers = ir.writers_of(&var.id);
            if writers.len() <= 1 {
                continue;
            }

            match &var.policy {
                WritePolicy::Error => {
                    let list: Vec<String> = writers.iter().map(|w| w.to_string()).collect();
                    sink.error(
                        codes::WRITE001,
                        format!(
                            "multiple writers for '{}' under ErrorPolicy: {}",
                            var.id,
                            list.join(", ")
                        ),
                        Some(var.id.to_string()),
                    )
                    .hint = Some("declare a merge policy or remove all but one writer".to_string());
                }
                WritePolicy::LastWriterWins { priority } => {
                    let producers: IndexSet<&NodeId> = writers.iter().map(|w| &w.node).collect();
                    let all_ranked = !priority.is_empty()
                        && producers.iter().all(|p| priority.contains(p))
                        && producers.len() == writers.len();
                    if !all_ranked {
                        let msg = format!(
                            "multiple writers for '{}' under LWW without a total priority order; \
                             determinism depends on the schedule",
                            var.id
                        );
                        if strict {
                            sink.error(codes::WRITE002, msg, Some(var.id.to_string())).hint =
                                Some("list every producer in the priority order".to_string());
                        } else {
                            sink.warning(codes::WRITE002, msg, Some(var.id.to_string()));
                        }
                    }
                }
                WritePolicy::Merge(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GraphBuilder, NodeSpec, ReactionSpec};
    use cadence_ir::{ElemType, Expr, Monoid, Value};

    fn two_writer_graph(policy: WritePolicy) -> Graph {
        let mut b = GraphBuilder::new();
        b.add_variable("v", ElemType::Scalar, Some(Value::Scalar(0.0)), policy)
            .unwrap();
        for id in ["a", "b"] {
            b.add_node(
                NodeSpec::core(id)
                    .reaction(ReactionSpec::new("w").writes("v", Expr::constant(1.0))),
            )
            .unwrap();
        }
        b.build().unwrap()
    }

    fn run(graph: &Graph, mode: Mode) -> crate::diag::Report {
        let mut sink = DiagnosticSink::new(mode);
        WriteConflictPass.run(graph, &mut sink);
        sink.into_report()
    }

    #[test]
    fn test_error_policy_two_writers_is_write001() {
        let report = run(&two_writer_graph(WritePolicy::Error), Mode::Pragmatic);
        assert!(report.has_code(codes::WRITE001));
        assert!(!report.success());
    }

    #[test]
    fn test_merge_policy_accepts_many_writers() {
        let report = run(
            &two_writer_graph(WritePolicy::Merge(Monoid::Sum)),
            Mode::Pragmatic,
        );
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_unranked_lww_warns_pragmatic_errors_strict() {
        let graph = two_writer_graph(WritePolicy::LastWriterWins {
            priority: vec!["a".into()],
        });
        let report = run(&graph, Mode::Pragmatic);
        assert!(report.success());
        assert!(report.has_code(codes::WRITE002));

        let report = run(&graph, Mode::Strict);
        assert!(!report.success());
        assert!(report.has_code(codes::WRITE002));
    }

    #[test]
    fn test_fully_ranked_lww_is_clean() {
        let graph = two_writer_graph(WritePolicy::LastWriterWins {
            priority: vec!["a".into(), "b".into()],
        });
        let report = run(&graph, Mode::Pragmatic);
        assert!(report.diagnostics.is_empty());
    }
}
