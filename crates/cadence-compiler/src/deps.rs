//! Reaction dependency graphs.
//!
//! Two adjacency relations over the same reaction set:
//!
//! - **instant**: `r1 → r2` iff `r2` reads, in the same tick, something
//!   `r1` writes. Delay-state reads and readers declaring
//!   `no_instant_loop` are excluded. SCCs of this graph are the algebraic
//!   cycles.
//! - **full**: every dependency, used for ordering. Edges through
//!   delay-backed output ports run *reversed* (consumer before producer)
//!   so readers observe the previous tick's value before the buffer is
//!   touched.

use indexmap::{IndexMap, IndexSet};

use cadence_ir::{Graph, PortRef, Reaction, ReactionKey, Ref};

pub(crate) struct DepGraph {
    pub keys: Vec<ReactionKey>,
    pub instant: Vec<IndexSet<usize>>,
    pub full: Vec<IndexSet<usize>>,
}

impl DepGraph {
    pub fn has_self_loop(&self, idx: usize) -> bool {
        self.instant[idx].contains(&idx)
    }
}

pub(crate) fn build(ir: &Graph) -> DepGraph {
    let reactions: Vec<(ReactionKey, &Reaction)> = ir.reactions().collect();
    let n = reactions.len();

    // Readers per reference; delay-state reads create no dependency at all
    let mut readers: IndexMap<Ref, Vec<usize>> = IndexMap::new();
    let mut no_loop = vec![false; n];
    for (idx, (key, reaction)) in reactions.iter().enumerate() {
        no_loop[idx] = ir
            .node(&key.node)
            .map(|n| n.contract.no_instant_loop)
            .unwrap_or(false);
        for r in &reaction.reads {
            if let Ref::Var(v) = r {
                if ir.variable(v).map(|v| v.is_delay_state()).unwrap_or(false) {
                    continue;
                }
            }
            readers.entry(r.clone()).or_default().push(idx);
        }
    }

    // Fanout of each output port: the port itself (self reads) plus every
    // connected input
    let fanout = |port: &PortRef| -> Vec<PortRef> {
        let mut targets = vec![port.clone()];
        for edge in &ir.edges {
            if &edge.from == port {
                targets.push(edge.to.clone());
            }
        }
        targets
    };

    let mut instant: Vec<IndexSet<usize>> = vec![IndexSet::new(); n];
    let mut full: Vec<IndexSet<usize>> = vec![IndexSet::new(); n];

    for (w, (key, reaction)) in reactions.iter().enumerate() {
        for var in &reaction.writes_vars {
            if let Some(readers) = readers.get(&Ref::Var(var.clone())) {
                for &r in readers {
                    full[w].insert(r);
                    if !no_loop[r] {
                        instant[w].insert(r);
                    }
                }
            }
        }

        let delay_port = reaction.delay_backed_port().map(|(p, _)| p.to_string());
        for port in reaction.written_ports(&key.node) {
            let delayed = delay_port.as_deref() == Some(port.port.as_str());
            for target in fanout(&port) {
                if let Some(readers) = readers.get(&Ref::Port(target)) {
                    for &r in readers {
                        if delayed {
                            // Previous-tick delivery: order consumer first
                            if r != w {
                                full[r].insert(w);
                            }
                        } else {
                            full[w].insert(r);
                            if !no_loop[r] {
                                instant[w].insert(r);
                            }
                        }
                    }
                }
            }
        }
    }

    DepGraph {
        keys: reactions.into_iter().map(|(k, _)| k).collect(),
        instant,
        full,
    }
}

/// Tarjan's algorithm over the instantaneous graph. Components come out
/// in reverse topological order; callers that need execution order run
/// the condensation below.
pub(crate) fn tarjan(n: usize, adj: &[IndexSet<usize>]) -> Vec<Vec<usize>> {
    struct State<'a> {
        adj: &'a [IndexSet<usize>],
        index: Vec<Option<usize>>,
        low: Vec<usize>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        next_index: usize,
        sccs: Vec<Vec<usize>>,
    }

    fn strongconnect(v: usize, st: &mut State) {
        st.index[v] = Some(st.next_index);
        st.low[v] = st.next_index;
        st.next_index += 1;
        st.stack.push(v);
        st.on_stack[v] = true;

        let succs: Vec<usize> = st.adj[v].iter().copied().collect();
        for w in succs {
            if st.index[w].is_none() {
                strongconnect(w, st);
                st.low[v] = st.low[v].min(st.low[w]);
            } else if st.on_stack[w] {
                st.low[v] = st.low[v].min(st.index[w].unwrap());
            }
        }

        if st.low[v] == st.index[v].unwrap() {
            let mut scc = Vec::new();
            while let Some(w) = st.stack.pop() {
                st.on_stack[w] = false;
                scc.push(w);
                if w == v {
                    break;
                }
            }
            st.sccs.push(scc);
        }
    }

    let mut st = State {
        adj,
        index: vec![None; n],
        low: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        next_index: 0,
        sccs: Vec::new(),
    };
    for v in 0..n {
        if st.index[v].is_none() {
            strongconnect(v, &mut st);
        }
    }
    st.sccs
}

/// Topological order of the SCC condensation over the full dependency
/// graph, Kahn's algorithm with a sorted ready queue for determinism.
pub(crate) fn condensation_order(dep: &DepGraph, sccs: &[Vec<usize>]) -> Vec<usize> {
    let mut scc_of = vec![0usize; dep.keys.len()];
    for (i, scc) in sccs.iter().enumerate() {
        for &v in scc {
            scc_of[v] = i;
        }
    }

    let mut adj: IndexMap<usize, IndexSet<usize>> = IndexMap::new();
    let mut indeg = vec![0usize; sccs.len()];
    for (v, succs) in dep.full.iter().enumerate() {
        for &w in succs {
            let (a, b) = (scc_of[v], scc_of[w]);
            if a != b && adj.entry(a).or_default().insert(b) {
                indeg[b] += 1;
            }
        }
    }

    let mut ready: Vec<usize> = (0..sccs.len()).filter(|&i| indeg[i] == 0).collect();
    ready.sort_unstable();
    let mut order = Vec::with_capacity(sccs.len());
    while let Some(current) = ready.first().copied() {
        ready.remove(0);
        order.push(current);
        if let Some(succs) = adj.get(&current) {
            for &next in succs {
                indeg[next] -= 1;
                if indeg[next] == 0 {
                    ready.push(next);
                }
            }
        }
        ready.sort_unstable();
    }

    // A cycle in the full graph leaves components unordered; fall back to
    // discovery order so scheduling stays total.
    if order.len() != sccs.len() {
        return (0..sccs.len()).collect();
    }
    order
}
