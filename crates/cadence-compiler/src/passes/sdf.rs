//! Synchronous-dataflow rate balancing.
//!
//! Maximal subgraphs whose edges carry fixed token rates are solved for
//! the minimal positive integer firing vector (Γ·q = 0 over exact
//! rationals). Balanced regions get a periodic admissible sequential
//! schedule built by token simulation; regions that admit none degrade to
//! event-driven execution with a warning. Rated regions overlapping an
//! algebraic cycle are rejected outright.

use indexmap::{IndexMap, IndexSet};

use cadence_ir::{Graph, NodeId};

use crate::deps;
use crate::diag::{codes, DiagnosticSink};
use crate::passes::Pass;

pub struct SdfPass;

impl Pass for SdfPass {
    fn name(&self) -> &'static str {
        "sdf"
    }

    fn run(&self, ir: &Graph, sink: &mut DiagnosticSink) {
        for problem in analyze(ir).problems {
            match problem {
                SdfProblem::Inconsistent { src, dst } => {
                    sink.error(
                        codes::SDF001,
                        format!("inconsistent token rates between '{src}' and '{dst}'"),
                        Some(src.to_string()),
                    )
                    .hint = Some("balance the port rates so a firing vector exists".to_string());
                }
                SdfProblem::OverlapsCycle { node } => {
                    sink.error(
                        codes::SDF001,
                        format!("rated node '{node}' participates in an algebraic cycle"),
                        Some(node.to_string()),
                    )
                    .hint = Some("break the cycle with a Delay before rating the ports".to_string());
                }
                SdfProblem::NoStaticSchedule { component } => {
                    let names: Vec<String> = component.iter().map(|n| n.to_string()).collect();
                    sink.warning(
                        codes::SDF001,
                        format!(
                            "no admissible static schedule for rated region [{}]; \
                             falling back to event-driven execution",
                            names.join(", ")
                        ),
                        None,
                    );
                }
            }
        }
    }
}

#[derive(Debug)]
pub(crate) enum SdfProblem {
    Inconsistent { src: NodeId, dst: NodeId },
    OverlapsCycle { node: NodeId },
    NoStaticSchedule { component: Vec<NodeId> },
}

pub(crate) struct SdfOutcome {
    pub firing_counts: IndexMap<NodeId, u32>,
    pub problems: Vec<SdfProblem>,
}

struct Channel {
    src: NodeId,
    dst: NodeId,
    prod: u64,
    cons: u64,
    /// Previous-tick delivery: carries a full period of initial tokens
    delayed: bool,
}

/// Solve every rated region. Shared with the schedule builder, which only
/// wants the firing counts.
pub(crate) fn analyze(ir: &Graph) -> SdfOutcome {
    let mut outcome = SdfOutcome {
        firing_counts: IndexMap::new(),
        problems: Vec::new(),
    };

    let rated: IndexSet<NodeId> = ir
        .nodes
        .values()
        .filter(|n| {
            n.inputs
                .values()
                .chain(n.outputs.values())
                .any(|p| p.rate.is_some())
        })
        .map(|n| n.id.clone())
        .collect();
    if rated.is_empty() {
        return outcome;
    }

    let channels: Vec<Channel> = ir
        .edges
        .iter()
        .filter(|e| rated.contains(&e.from.node) && rated.contains(&e.to.node))
        .map(|e| {
            let prod = ir.port(&e.from).and_then(|p| p.rate).unwrap_or(1) as u64;
            let cons = ir.port(&e.to).and_then(|p| p.rate).unwrap_or(1) as u64;
            let delayed = ir
                .node(&e.from.node)
                .map(|n| {
                    n.reactions.iter().any(|r| {
                        r.delay_backed_port()
                            .map(|(port, _)| port == e.from.port)
                            .unwrap_or(false)
                    })
                })
                .unwrap_or(false);
            Channel {
                src: e.from.node.clone(),
                dst: e.to.node.clone(),
                prod,
                cons,
                delayed,
            }
        })
        .collect();
    if channels.is_empty() {
        return outcome;
    }

    // Nodes whose reactions sit inside an algebraic cycle; rated regions
    // may not overlap them (conservative rejection)
    let dep = deps::build(ir);
    let sccs = deps::tarjan(dep.keys.len(), &dep.instant);
    let mut cyclic_nodes: IndexSet<NodeId> = IndexSet::new();
    for scc in &sccs {
        if scc.len() > 1 || dep.has_self_loop(scc[0]) {
            for &idx in scc {
                cyclic_nodes.insert(dep.keys[idx].node.clone());
            }
        }
    }

    for component in components(&rated, &channels) {
        if let Some(node) = component.iter().find(|n| cyclic_nodes.contains(*n)) {
            outcome.problems.push(SdfProblem::OverlapsCycle {
                node: node.clone(),
            });
            continue;
        }
        solve_component(&component, &channels, &mut outcome);
    }

    outcome
}

/// Connected components of the rated subgraph (undirected over channels)
fn components(rated: &IndexSet<NodeId>, channels: &[Channel]) -> Vec<Vec<NodeId>> {
    let mut seen: IndexSet<NodeId> = IndexSet::new();
    let mut out = Vec::new();
    for start in rated {
        if seen.contains(start) {
            continue;
        }
        let mut component = vec![start.clone()];
        seen.insert(start.clone());
        let mut frontier = vec![start.clone()];
        while let Some(current) = frontier.pop() {
            for ch in channels {
                let peer = if ch.src == current {
                    &ch.dst
                } else if ch.dst == current {
                    &ch.src
                } else {
                    continue;
                };
                if seen.insert(peer.clone()) {
                    component.push(peer.clone());
                    frontier.push(peer.clone());
                }
            }
        }
        if component.len() > 1 {
            out.push(component);
        }
    }
    out
}

fn solve_component(component: &[NodeId], channels: &[Channel], outcome: &mut SdfOutcome) {
    let in_component = |n: &NodeId| component.contains(n);

    // Balance equations over exact rationals, propagated by BFS
    let mut q: IndexMap<NodeId, Ratio> = IndexMap::new();
    q.insert(component[0].clone(), Ratio::new(1, 1));
    let mut frontier = vec![component[0].clone()];
    while let Some(current) = frontier.pop() {
        let q_current = q[&current];
        for ch in channels {
            let (peer, expected) = if ch.src == current && in_component(&ch.dst) {
                // q_src * prod = q_dst * cons
                (&ch.dst, q_current.scale(ch.prod, ch.cons))
            } else if ch.dst == current && in_component(&ch.src) {
                (&ch.src, q_current.scale(ch.cons, ch.prod))
            } else {
                continue;
            };
            match q.get(peer) {
                Some(existing) => {
                    if *existing != expected {
                        outcome.problems.push(SdfProblem::Inconsistent {
                            src: ch.src.clone(),
                            dst: ch.dst.clone(),
                        });
                        return;
                    }
                }
                None => {
                    q.insert(peer.clone(), expected);
                    frontier.push(peer.clone());
                }
            }
        }
    }

    // Scale to the minimal positive integer vector
    let lcm_den = q.values().fold(1u64, |acc, r| lcm(acc, r.den));
    let mut counts: IndexMap<NodeId, u64> =
        q.iter().map(|(n, r)| (n.clone(), r.num * (lcm_den / r.den))).collect();
    let gcd_num = counts.values().fold(0u64, |acc, &v| gcd(acc, v));
    for v in counts.values_mut() {
        *v /= gcd_num;
    }

    // Periodic admissible sequential schedule by token simulation; the
    // delayed channels start with a full period of tokens.
    let mut tokens: Vec<u64> = channels
        .iter()
        .map(|ch| {
            if ch.delayed && in_component(&ch.src) && in_component(&ch.dst) {
                ch.cons * counts.get(&ch.dst).copied().unwrap_or(0)
            } else {
                0
            }
        })
        .collect();
    let mut remaining = counts.clone();
    while remaining.values().any(|&r| r > 0) {
        let fireable = component.iter().find(|node| {
            remaining.get(*node).copied().unwrap_or(0) > 0
                && channels.iter().enumerate().all(|(i, ch)| {
                    ch.dst != **node || !in_component(&ch.src) || tokens[i] >= ch.cons
                })
        });
        let Some(node) = fireable else {
            outcome.problems.push(SdfProblem::NoStaticSchedule {
                component: component.to_vec(),
            });
            return;
        };
        for (i, ch) in channels.iter().enumerate() {
            if ch.dst == *node && in_component(&ch.src) {
                tokens[i] -= ch.cons;
            }
            if ch.src == *node && in_component(&ch.dst) {
                tokens[i] += ch.prod;
            }
        }
        *remaining.get_mut(node).unwrap() -= 1;
    }

    for (node, count) in counts {
        outcome.firing_counts.insert(node, count as u32);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ratio {
    num: u64,
    den: u64,
}

impl Ratio {
    fn new(num: u64, den: u64) -> Self {
        let g = gcd(num, den).max(1);
        Self {
            num: num / g,
            den: den / g,
        }
    }

    fn scale(self, num: u64, den: u64) -> Self {
        Self::new(self.num * num, self.den * den)
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b).max(1) * b
}
