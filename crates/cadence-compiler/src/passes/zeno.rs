//! Non-Zeno rank checks.
//!
//! A reaction that reads and writes the same signal in the same tick can
//! spin forever inside its SCC's microstep loop. Such reactions must
//! declare a rank over a well-founded order plus a microstep budget; the
//! runtime watchdog enforces the budget. Anything else fails closed.

use cadence_ir::{ElemType, Graph, Ref, VarId};

use crate::diag::{codes, DiagnosticSink};
use crate::passes::Pass;

pub struct NonZenoPass;

impl Pass for NonZenoPass {
    fn name(&self) -> &'static str {
        "non-zeno"
    }

    fn run(&self, ir: &Graph, sink: &mut DiagnosticSink) {
        for (key, reaction) in ir.reactions() {
            let overlap: Vec<&VarId> = reaction
                .writes_vars
                .iter()
                .filter(|v| {
                    // Delay-backed state never overlaps instantaneously
                    let delayed = ir
                        .variable(v)
                        .map(|var| var.is_delay_state())
                        .unwrap_or(false);
                    !delayed && reaction.reads.contains(&Ref::Var((*v).clone()))
                })
                .collect();

            match (&reaction.rank, overlap.is_empty()) {
                (None, false) => {
                    let names: Vec<String> = overlap.iter().map(|v| v.to_string()).collect();
                    sink.error(
                        codes::ZEN001,
                        format!(
                            "reaction '{key}' reads and writes {} without a non-Zeno rank",
                            names.join(", ")
                        ),
                        Some(key.to_string()),
                    )
                    .hint = Some("declare a rank expression and max_microsteps".to_string());
                }
                (Some(spec), _) => {
                    // Rank must range over an integer-valued, well-founded
                    // order; anything else fails closed.
                    if spec.rank.ty != ElemType::Scalar {
                        sink.error(
                            codes::ZEN001,
                            format!(
                                "reaction '{key}' declares a rank of type {}, expected an \
                                 integer-valued scalar",
                                spec.rank.ty
                            ),
                            Some(key.to_string()),
                        );
                    }
                    if spec.max_microsteps == 0 {
                        sink.error(
                            codes::ZEN001,
                            format!("reaction '{key}' declares a zero microstep budget"),
                            Some(key.to_string()),
                        );
                    }
                }
                (None, true) => {}
            }
        }
    }
}
