//! Causality analysis: SCC detection, cycle admissibility, and the
//! constructive three-valued fixed point.
//!
//! The dependency graph lives in [`crate::deps`]; this pass classifies
//! every algebraic cycle:
//!
//! - any Raw or wrapper member → `CAUS001`
//! - any Ext member without `monotone=true` → `CAUS002`
//! - a non-monotone shared variable inside the cycle → `CAUS004`
//! - otherwise the cycle must reach a ⊥-free fixed point within its
//!   height budget, or `CAUS003` is emitted. Cycles that declare non-Zeno
//!   ranks skip the constructive check and run under the runtime
//!   microstep budget instead.

use indexmap::{IndexMap, IndexSet};

use cadence_ir::{
    Graph, NodeKind, PortRef, ReactionBody, ReactionKey, Ref, VarId,
};

use crate::deps::{self, DepGraph};
use crate::diag::{codes, DiagnosticSink};
use crate::passes::Pass;
use crate::ternary::{eval3, join, Tri};

/// Iteration cap when no height bounds are declared
const DEFAULT_ITER_LIMIT: u32 = 20;

pub struct CausalityPass;

impl Pass for CausalityPass {
    fn name(&self) -> &'static str {
        "causality"
    }

    fn run(&self, ir: &Graph, sink: &mut DiagnosticSink) {
        let dep = deps::build(ir);
        let sccs = deps::tarjan(dep.keys.len(), &dep.instant);

        for scc in &sccs {
            let cyclic = scc.len() > 1 || dep.has_self_loop(scc[0]);
            if !cyclic {
                continue;
            }
            self.check_cycle(ir, &dep, scc, sink);
        }
    }
}

impl CausalityPass {
    fn check_cycle(
        &self,
        ir: &Graph,
        dep: &DepGraph,
        scc: &[usize],
        sink: &mut DiagnosticSink,
    ) {
        let members: Vec<ReactionKey> = scc.iter().map(|&i| dep.keys[i].clone()).collect();
        let listing: Vec<String> = members.iter().map(|k| k.to_string()).collect();
        let location = listing.join(", ");

        // Admissibility by node kind and contract
        for key in &members {
            let Some(node) = ir.node(&key.node) else {
                continue;
            };
            match node.kind {
                NodeKind::Raw | NodeKind::ContinuousWrapper => {
                    sink.error(
                        codes::CAUS001,
                        format!("algebraic cycle contains non-Core node '{}'", key.node),
                        Some(location.clone()),
                    )
                    .hint = Some("break the cycle with a Delay".to_string());
                    return;
                }
                NodeKind::Ext => {
                    if !node.contract.monotone {
                        sink.error(
                            codes::CAUS002,
                            format!(
                                "Ext node '{}' participates in a cycle without monotone=true",
                                key.node
                            ),
                            Some(location.clone()),
                        )
                        .hint = Some("declare a monotone contract or insert a Delay".to_string());
                        return;
                    }
                }
                NodeKind::Core => {}
            }
        }

        // Shared variables written and read within the cycle must merge
        // monotonically
        let cycle_vars = self.cycle_vars(ir, &members);
        let bad: Vec<&VarId> = cycle_vars
            .iter()
            .filter(|v| {
                ir.variable(v)
                    .map(|var| !var.policy.is_monotone())
                    .unwrap_or(false)
            })
            .collect();
        if !bad.is_empty() {
            let names: Vec<String> = bad.iter().map(|v| v.to_string()).collect();
            sink.error(
                codes::CAUS004,
                format!(
                    "cycle routes through non-monotone state: {}",
                    names.join(", ")
                ),
                Some(location.clone()),
            )
            .hint = Some("use a Delay or a monotone merge policy".to_string());
            return;
        }

        // Ranked cycles are governed by the runtime microstep budget
        let ranked = members
            .iter()
            .any(|key| ir.reaction(key).map(|r| r.rank.is_some()).unwrap_or(false));
        if ranked {
            return;
        }

        if !self.constructive(ir, &members, &cycle_vars) {
            sink.error(
                codes::CAUS003,
                "non-constructive cycle: no ⊥-free fixed point within the height budget",
                Some(location),
            )
            .hint = Some("insert a Delay or declare a non-Zeno rank".to_string());
        }
    }

    /// Variables both written and read (instantaneously) by cycle members
    fn cycle_vars(&self, ir: &Graph, members: &[ReactionKey]) -> IndexSet<VarId> {
        let mut written = IndexSet::new();
        let mut read = IndexSet::new();
        for key in members {
            let Some(reaction) = ir.reaction(key) else {
                continue;
            };
            written.extend(reaction.writes_vars.iter().cloned());
            for r in &reaction.reads {
                if let Ref::Var(v) = r {
                    read.insert(v.clone());
                }
            }
        }
        written.intersection(&read).cloned().collect()
    }

    /// Iterate the three-valued evaluator to a fixed point.
    ///
    /// Every reference the cycle writes starts at ⊥; everything external
    /// takes its committed baseline (variable init, port default, or
    /// ABSENT). Success means every written reference is determined.
    fn constructive(
        &self,
        ir: &Graph,
        members: &[ReactionKey],
        cycle_vars: &IndexSet<VarId>,
    ) -> bool {
        // The iteration domain: refs written by members
        let mut env: IndexMap<Ref, Tri> = IndexMap::new();
        for key in members {
            let Some(reaction) = ir.reaction(key) else {
                continue;
            };
            for var in &reaction.writes_vars {
                env.insert(Ref::Var(var.clone()), Tri::Bottom);
            }
            if reaction.delay_backed_port().is_none() {
                for port in reaction.written_ports(&key.node) {
                    env.insert(Ref::Port(port), Tri::Bottom);
                }
            }
        }

        let height_budget: u32 = cycle_vars
            .iter()
            .filter_map(|v| ir.variable(v).and_then(|var| var.height_bound))
            .sum();
        let limit = if height_budget > 0 {
            height_budget + 1
        } else {
            DEFAULT_ITER_LIMIT
        };

        for _ in 0..limit {
            let snapshot = env.clone();
            let lookup = |r: &Ref| -> Tri { resolve(ir, &snapshot, r) };

            let mut changed_any = false;
            for key in members {
                let Some(reaction) = ir.reaction(key) else {
                    continue;
                };
                let ReactionBody::Dataflow { output, writes } = &reaction.body else {
                    // Monotone Ext members are opaque; their outputs stay ⊥
                    // unless determined elsewhere, which fails closed below.
                    continue;
                };

                for (var, expr) in writes {
                    let val = eval3(expr, &lookup);
                    if let Some(slot) = env.get_mut(&Ref::Var(var.clone())) {
                        let (merged, changed) = join(*slot, val);
                        *slot = merged;
                        changed_any |= changed;
                    }
                }

                if let Some(binding) = output {
                    if binding.delay_backed.is_none() {
                        let pref = Ref::Port(PortRef::new(key.node.clone(), binding.port.clone()));
                        let val = eval3(&binding.expr, &lookup);
                        if let Some(slot) = env.get_mut(&pref) {
                            let (merged, changed) = join(*slot, val);
                            *slot = merged;
                            changed_any |= changed;
                        }
                    }
                }
            }

            if !changed_any {
                return env.values().all(|t| t.is_determined());
            }
        }
        false
    }
}

/// Resolve a read during iteration: cycle-written refs come from the
/// iteration state (following edges from input port to source output);
/// everything else takes its committed baseline.
fn resolve(ir: &Graph, env: &IndexMap<Ref, Tri>, r: &Ref) -> Tri {
    if let Some(t) = env.get(r) {
        return *t;
    }
    if let Ref::Port(pref) = r {
        if let Some(src) = ir.source_of(pref) {
            if let Some(t) = env.get(&Ref::Port(src.clone())) {
                return *t;
            }
            return baseline(ir, &Ref::Port(src.clone()));
        }
    }
    baseline(ir, r)
}

fn baseline(ir: &Graph, r: &Ref) -> Tri {
    match r {
        Ref::Var(v) => match ir.variable(v) {
            Some(var) => match var.init {
                Some(init) => Tri::Present(init),
                None => Tri::Bottom,
            },
            None => Tri::Bottom,
        },
        Ref::Port(pref) => match ir.port(pref) {
            Some(port) => match port.default {
                Some(default) => Tri::Present(default),
                None => Tri::Absent,
            },
            None => Tri::Absent,
        },
    }
}
