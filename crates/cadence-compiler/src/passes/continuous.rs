//! Continuous-wrapper boundary checks.
//!
//! A wrapper must expose `u`/`dt` inputs (with a positive `dt` default to
//! avoid zero-time integration) and `state`/`y` outputs. The wrapper is
//! opaque to causality: its outputs depend on previous state plus held
//! input, never instantaneously on `u`.

use cadence_ir::{Graph, NodeKind, Value};

use crate::diag::{codes, DiagnosticSink};
use crate::passes::Pass;

pub struct ContinuousPass;

impl Pass for ContinuousPass {
    fn name(&self) -> &'static str {
        "continuous"
    }

    fn run(&self, ir: &Graph, sink: &mut DiagnosticSink) {
        for node in ir.nodes.values() {
            if node.kind != NodeKind::ContinuousWrapper {
                continue;
            }

            if node.input("u").is_none() {
                sink.error(
                    codes::CT001,
                    format!("continuous wrapper '{}' must have input 'u'", node.id),
                    Some(node.id.to_string()),
                );
            }

            match node.input("dt") {
                None => {
                    sink.error(
                        codes::CT001,
                        format!(
                            "continuous wrapper '{}' must have input 'dt' with a positive default",
                            node.id
                        ),
                        Some(node.id.to_string()),
                    );
                }
                Some(port) => match port.default {
                    None => {
                        sink.error(
                            codes::CT001,
                            format!("continuous wrapper '{}' has no 'dt' default", node.id),
                            Some(node.id.to_string()),
                        );
                    }
                    Some(Value::Scalar(dt)) if dt <= 0.0 => {
                        sink.error(
                            codes::CT002,
                            format!(
                                "continuous wrapper '{}' has non-positive dt default: {dt}",
                                node.id
                            ),
                            Some(node.id.to_string()),
                        );
                    }
                    Some(Value::Bool(_)) => {
                        sink.error(
                            codes::CT002,
                            format!("continuous wrapper '{}' has a non-scalar dt default", node.id),
                            Some(node.id.to_string()),
                        );
                    }
                    Some(_) => {}
                },
            }

            if node.output("state").is_none() || node.output("y").is_none() {
                sink.warning(
                    codes::CT003,
                    format!(
                        "continuous wrapper '{}' should expose 'state' and 'y' outputs",
                        node.id
                    ),
                    Some(node.id.to_string()),
                );
            }
        }
    }
}
