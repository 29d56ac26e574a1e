//! Initialization analysis, strict mode only.
//!
//! Walks the compiled schedule order and requires every variable read to
//! be initialized or written by an earlier unit. Cycle units count their
//! own writes as available: the constructive fixed point defines them.

use indexmap::IndexSet;

use cadence_ir::{Graph, Mode, ReactionKey, Ref, ScheduleUnit, VarId};

use crate::diag::{codes, DiagnosticSink};
use crate::passes::Pass;
use crate::schedule::build_schedule;

pub struct InitPass;

impl Pass for InitPass {
    fn name(&self) -> &'static str {
        "init"
    }

    fn run(&self, ir: &Graph, sink: &mut DiagnosticSink) {
        if sink.mode() != Mode::Strict {
            return;
        }

        for var in ir.variables.values() {
            // Delay states are covered by the structural INIT002 check
            if !var.is_delay_state() && var.init.is_none() {
                sink.error(
                    codes::INIT001,
                    format!("variable '{}' has no initial value", var.id),
                    Some(var.id.to_string()),
                )
                .hint = Some("provide an init".to_string());
            }
        }

        // Happens-before: walk units in schedule order, tracking which
        // variables are defined by the time each reaction first reads.
        let schedule = build_schedule(ir);
        let mut written: IndexSet<VarId> = ir
            .variables
            .values()
            .filter(|v| v.init.is_some())
            .map(|v| v.id.clone())
            .collect();

        for unit in &schedule.units {
            match unit {
                ScheduleUnit::Single(key) => {
                    self.check_reads(ir, key, &written, sink);
                    self.absorb_writes(ir, key, &mut written);
                }
                ScheduleUnit::Cycle { members, .. } => {
                    for key in members {
                        self.absorb_writes(ir, key, &mut written);
                    }
                    for key in members {
                        self.check_reads(ir, key, &written, sink);
                    }
                }
            }
        }
    }
}

impl InitPass {
    fn check_reads(
        &self,
        ir: &Graph,
        key: &ReactionKey,
        written: &IndexSet<VarId>,
        sink: &mut DiagnosticSink,
    ) {
        let Some(reaction) = ir.reaction(key) else {
            return;
        };
        for r in &reaction.reads {
            let Ref::Var(var) = r else {
                continue;
            };
            let delay_state = ir
                .variable(var)
                .map(|v| v.is_delay_state())
                .unwrap_or(false);
            if !delay_state && !written.contains(var) {
                sink.error(
                    codes::INIT003,
                    format!("reaction '{key}' reads '{var}' before any write or init"),
                    Some(key.to_string()),
                )
                .hint = Some("initialize the variable or reorder the writers".to_string());
            }
        }
    }

    fn absorb_writes(&self, ir: &Graph, key: &ReactionKey, written: &mut IndexSet<VarId>) {
        if let Some(reaction) = ir.reaction(key) {
            written.extend(reaction.writes_vars.iter().cloned());
        }
    }
}
