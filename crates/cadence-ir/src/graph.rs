//! The frozen intermediate representation.
//!
//! A [`Graph`] is built once per compile from the authored descriptors and
//! never mutated afterwards except by delay lowering, which runs before any
//! analysis pass. Adjacency is stored by reference ids; nothing owns
//! anything across node boundaries.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::expr::{BuiltinSig, Expr, Ref};
use crate::policy::WritePolicy;
use crate::types::{Contract, Direction, ElemType, NodeId, NodeKind, PortRef, ReactionId, ReactionKey, VarId};
use crate::value::Value;

/// A typed, optionally rated port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub direction: Direction,
    pub ty: ElemType,
    /// Read when the port is unconnected or its source is ABSENT
    pub default: Option<Value>,
    /// Tokens per firing; unset means event-driven
    pub rate: Option<u32>,
}

/// Scope of a variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    /// Observable by any reader
    Shared,
    /// Node-private state, scoped as `"{node}.{name}"`
    State { owner: NodeId },
    /// Hidden state materialized by delay lowering; never user-visible
    DelayState { owner: NodeId },
}

/// A shared variable or node state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VarId,
    pub ty: ElemType,
    pub init: Option<Value>,
    pub policy: WritePolicy,
    /// Lattice height bound, budget input for constructive iteration
    pub height_bound: Option<u32>,
    pub kind: VarKind,
}

impl Variable {
    pub fn is_delay_state(&self) -> bool {
        matches!(self.kind, VarKind::DelayState { .. })
    }
}

/// Non-Zeno declaration on a reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankSpec {
    /// Well-founded rank expression; must be integer-valued
    pub rank: Expr,
    /// Microstep budget for the SCC this reaction participates in
    pub max_microsteps: u32,
}

/// An output-port expression of a dataflow reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputBinding {
    pub port: String,
    pub expr: Expr,
    /// Set by lowering when the whole output was a `Delay`: the port is
    /// prefilled from this state at tick start and the edge is treated as
    /// non-instantaneous.
    pub delay_backed: Option<VarId>,
}

/// What a reaction does when fired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReactionBody {
    /// Pure evaluation of expression trees (Core nodes)
    Dataflow {
        output: Option<OutputBinding>,
        /// Variable writes, each an expression over the reaction's reads
        writes: IndexMap<VarId, Expr>,
    },
    /// Black box registered on the runtime by key (Ext/Raw/wrapper nodes);
    /// the IR only records the declared port footprint
    External {
        reads: Vec<String>,
        writes: Vec<String>,
    },
}

/// A reaction record with derived read/write sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: ReactionId,
    /// Instantaneous reads, derived from the ASTs (delay reads excluded)
    pub reads: IndexSet<Ref>,
    /// Variables this reaction may write in a tick
    pub writes_vars: IndexSet<VarId>,
    pub body: ReactionBody,
    pub rank: Option<RankSpec>,
}

impl Reaction {
    /// Output ports written when this reaction fires
    pub fn written_ports(&self, owner: &NodeId) -> Vec<PortRef> {
        match &self.body {
            ReactionBody::Dataflow { output, .. } => output
                .iter()
                .map(|o| PortRef::new(owner.clone(), o.port.clone()))
                .collect(),
            ReactionBody::External { writes, .. } => writes
                .iter()
                .map(|p| PortRef::new(owner.clone(), p.clone()))
                .collect(),
        }
    }

    /// Whether the output edge from `port` delivers previous-tick values
    pub fn delay_backed_port(&self) -> Option<(&str, &VarId)> {
        match &self.body {
            ReactionBody::Dataflow {
                output: Some(o), ..
            } => o.delay_backed.as_ref().map(|v| (o.port.as_str(), v)),
            _ => None,
        }
    }
}

/// A node record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub inputs: IndexMap<String, Port>,
    pub outputs: IndexMap<String, Port>,
    pub reactions: Vec<Reaction>,
    pub contract: Contract,
}

impl Node {
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.get(name)
    }
}

/// A directed port-to-port connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: PortRef,
    pub to: PortRef,
}

/// A deferred write of a hidden delay state, applied after commit over the
/// newly committed environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostWrite {
    pub var: VarId,
    pub expr: Expr,
    pub owner: ReactionKey,
}

/// The complete intermediate representation of a submitted graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: IndexMap<NodeId, Node>,
    pub edges: Vec<Edge>,
    pub variables: IndexMap<VarId, Variable>,
    /// Delay-state writes scheduled by lowering
    pub post_writes: Vec<PostWrite>,
    /// Declared builtin signatures
    pub builtins: IndexMap<String, BuiltinSig>,
}

impl Graph {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn variable(&self, id: &VarId) -> Option<&Variable> {
        self.variables.get(id)
    }

    /// All reactions in node insertion order
    pub fn reactions(&self) -> impl Iterator<Item = (ReactionKey, &Reaction)> {
        self.nodes.values().flat_map(|node| {
            node.reactions
                .iter()
                .map(move |r| (ReactionKey::new(node.id.clone(), r.id.clone()), r))
        })
    }

    pub fn reaction(&self, key: &ReactionKey) -> Option<&Reaction> {
        self.nodes
            .get(&key.node)?
            .reactions
            .iter()
            .find(|r| r.id == key.reaction)
    }

    /// Resolve a port reference against its node
    pub fn port(&self, pref: &PortRef) -> Option<&Port> {
        let node = self.nodes.get(&pref.node)?;
        node.input(&pref.port).or_else(|| node.output(&pref.port))
    }

    /// The output feeding an input port. With fan-in rejected by the
    /// structural pass, at most one edge matches; the last one wins for
    /// graphs that are executed best-effort despite the diagnostic.
    pub fn source_of(&self, input: &PortRef) -> Option<&PortRef> {
        self.edges
            .iter()
            .rev()
            .find(|e| &e.to == input)
            .map(|e| &e.from)
    }

    /// Static writers of a variable
    pub fn writers_of(&self, var: &VarId) -> Vec<ReactionKey> {
        self.reactions()
            .filter(|(_, r)| r.writes_vars.contains(var))
            .map(|(k, _)| k)
            .collect()
    }

    /// Output ports that deliver previous-tick values of a delay state,
    /// prefilled by the scheduler before the propose phase
    pub fn delay_backed_outputs(&self) -> Vec<(PortRef, VarId)> {
        let mut out = Vec::new();
        for node in self.nodes.values() {
            for reaction in &node.reactions {
                if let Some((port, var)) = reaction.delay_backed_port() {
                    out.push((PortRef::new(node.id.clone(), port), var.clone()));
                }
            }
        }
        out
    }
}
