//! Edge type unification.

use cadence_ir::Graph;

use crate::diag::{codes, DiagnosticSink};
use crate::passes::Pass;

pub struct TypeCheckPass;

impl Pass for TypeCheckPass {
    fn name(&self) -> &'static str {
        "typecheck"
    }

    fn run(&self, ir: &Graph, sink: &mut DiagnosticSink) {
        for edge in &ir.edges {
            let (Some(src), Some(dst)) = (ir.port(&edge.from), ir.port(&edge.to)) else {
                continue;
            };
            if src.ty == dst.ty {
                continue;
            }
            if src.ty.is_any() || dst.ty.is_any() {
                sink.warning(
                    codes::TYPE001,
                    format!(
                        "widening on edge {} ({}) -> {} ({})",
                        edge.from, src.ty, edge.to, dst.ty
                    ),
                    Some(edge.from.to_string()),
                );
            } else {
                sink.error(
                    codes::TYPE001,
                    format!(
                        "incompatible types on edge {} ({}) -> {} ({})",
                        edge.from, src.ty, edge.to, dst.ty
                    ),
                    Some(edge.from.to_string()),
                );
            }
        }
    }
}
