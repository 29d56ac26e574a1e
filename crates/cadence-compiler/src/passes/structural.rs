//! Structural checks: connectivity, fan-in, delay-state initialization.

use indexmap::IndexMap;

use cadence_ir::{Graph, PortRef};

use crate::diag::{codes, DiagnosticSink};
use crate::passes::Pass;

pub struct StructuralPass;

impl Pass for StructuralPass {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn run(&self, ir: &Graph, sink: &mut DiagnosticSink) {
        let mut fan_in: IndexMap<&PortRef, usize> = IndexMap::new();
        for edge in &ir.edges {
            *fan_in.entry(&edge.to).or_insert(0) += 1;
        }

        for (dst, count) in &fan_in {
            if *count > 1 {
                sink.error(
                    codes::STRUCT002,
                    format!("input '{dst}' has {count} incoming edges"),
                    Some(dst.to_string()),
                )
                .hint = Some("merge through a shared variable with a merge policy".to_string());
            }
        }

        for node in ir.nodes.values() {
            for (name, port) in &node.inputs {
                let pref = PortRef::new(node.id.clone(), name.clone());
                let connected = fan_in.contains_key(&&pref);
                if !connected && port.default.is_none() {
                    sink.error(
                        codes::STRUCT001,
                        format!("input '{pref}' is unconnected and has no default"),
                        Some(pref.to_string()),
                    )
                    .hint = Some("connect the port or declare a default".to_string());
                }
            }
        }

        // Lowering always seeds an initial value; a missing one means the
        // graph was hand-assembled badly.
        for var in ir.variables.values() {
            if var.is_delay_state() && var.init.is_none() {
                sink.error(
                    codes::INIT002,
                    format!("delay state '{}' has no initial value", var.id),
                    Some(var.id.to_string()),
                );
            }
        }
    }
}
