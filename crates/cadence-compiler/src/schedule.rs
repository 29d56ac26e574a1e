//! Schedule construction.
//!
//! Turns the dependency graph into the runtime's execution plan: SCCs of
//! the instantaneous graph become units, ordered by a deterministic Kahn
//! pass over the condensation of the full graph (delay-backed edges
//! reversed, so consumers observe previous-tick values first). SDF firing
//! counts ride along when the rated regions are balanced.

use cadence_ir::{Graph, Schedule, ScheduleUnit};

use crate::deps;
use crate::passes::sdf;

/// Build the tick plan for an analyzed graph.
///
/// Total by construction: cycles become `Cycle` units rather than errors,
/// because admissibility was already decided by the causality pass.
pub fn build_schedule(ir: &Graph) -> Schedule {
    let dep = deps::build(ir);
    let sccs = deps::tarjan(dep.keys.len(), &dep.instant);
    let order = deps::condensation_order(&dep, &sccs);

    let mut units = Vec::with_capacity(sccs.len());
    for idx in order {
        let scc = &sccs[idx];
        if scc.len() == 1 && !dep.has_self_loop(scc[0]) {
            units.push(ScheduleUnit::Single(dep.keys[scc[0]].clone()));
        } else {
            let members: Vec<_> = scc.iter().map(|&i| dep.keys[i].clone()).collect();
            let budget = members
                .iter()
                .filter_map(|key| ir.reaction(key).and_then(|r| r.rank.as_ref()))
                .map(|spec| spec.max_microsteps)
                .min();
            units.push(ScheduleUnit::Cycle { members, budget });
        }
    }

    Schedule {
        units,
        firing_counts: sdf::analyze(ir).firing_counts,
    }
}
