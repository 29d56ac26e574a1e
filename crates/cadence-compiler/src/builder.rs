//! Graph builder: authored descriptors to canonical IR.
//!
//! The builder is the only place where names are resolved. Inside a node's
//! reactions, a bare variable reference may mean a node state, one of the
//! node's own ports, or a shared variable, in that order; the built IR
//! carries only resolved `(kind, id)` references with declared types. Anything the
//! builder rejects is an authoring bug and surfaces as a [`BuildError`],
//! not a diagnostic.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use cadence_ir::{
    collect_refs, BuiltinSig, Contract, Direction, Edge, ElemType, Expr, ExprError, ExprKind,
    Graph, Node, NodeId, NodeKind, OutputBinding, Port, PortRef, RankSpec, Reaction, ReactionBody,
    ReactionId, Ref, Value, VarId, VarKind, Variable, WritePolicy,
};

/// Errors raised while assembling the IR
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("node '{0}' already exists")]
    DuplicateNode(NodeId),

    #[error("variable '{0}' already exists")]
    DuplicateVariable(VarId),

    #[error("builtin '{0}' already declared")]
    DuplicateBuiltin(String),

    #[error("duplicate port '{port}' on node '{node}'")]
    DuplicatePort { node: NodeId, port: String },

    #[error("unknown node '{0}'")]
    UnknownNode(NodeId),

    #[error("unknown port '{0}'")]
    UnknownPort(PortRef),

    #[error("'{0}' is not an output port")]
    NotAnOutput(PortRef),

    #[error("'{0}' is not an input port")]
    NotAnInput(PortRef),

    #[error("unknown reference '{name}' in reaction '{node}.{reaction}'")]
    UnknownReference {
        node: NodeId,
        reaction: ReactionId,
        name: String,
    },

    #[error("unknown builtin '{name}' in reaction '{node}.{reaction}'")]
    UnknownBuiltin {
        node: NodeId,
        reaction: ReactionId,
        name: String,
    },

    #[error("type mismatch on '{what}': declared {declared}, used as {used}")]
    TypeMismatch {
        what: String,
        declared: ElemType,
        used: ElemType,
    },

    #[error("reaction '{node}.{reaction}': {source}")]
    Expr {
        node: NodeId,
        reaction: ReactionId,
        source: ExprError,
    },
}

/// Port descriptor
#[derive(Debug, Clone)]
pub struct PortSpec {
    pub name: String,
    pub direction: Direction,
    pub ty: ElemType,
    pub default: Option<Value>,
    pub rate: Option<u32>,
}

impl PortSpec {
    pub fn input(name: impl Into<String>, ty: ElemType) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Input,
            ty,
            default: None,
            rate: None,
        }
    }

    pub fn output(name: impl Into<String>, ty: ElemType) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Output,
            ty,
            default: None,
            rate: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = Some(rate);
        self
    }
}

/// Node-scoped state descriptor; lowered to a variable named
/// `"{node}.{name}"`
#[derive(Debug, Clone)]
pub struct StateSpec {
    pub name: String,
    pub ty: ElemType,
    pub init: Option<Value>,
    pub policy: WritePolicy,
    pub height_bound: Option<u32>,
}

impl StateSpec {
    pub fn new(name: impl Into<String>, ty: ElemType) -> Self {
        Self {
            name: name.into(),
            ty,
            init: None,
            policy: WritePolicy::Error,
            height_bound: None,
        }
    }

    pub fn with_init(mut self, value: impl Into<Value>) -> Self {
        self.init = Some(value.into());
        self
    }

    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_height_bound(mut self, bound: u32) -> Self {
        self.height_bound = Some(bound);
        self
    }
}

/// Reaction descriptor. Expressions may reference input ports, node
/// states, and shared variables by bare name.
#[derive(Debug, Clone)]
pub struct ReactionSpec {
    pub name: String,
    pub body: BodySpec,
    pub rank: Option<(Expr, u32)>,
}

#[derive(Debug, Clone)]
pub enum BodySpec {
    Dataflow {
        output: Option<(String, Expr)>,
        writes: Vec<(String, Expr)>,
    },
    External {
        reads: Vec<String>,
        writes: Vec<String>,
    },
}

impl ReactionSpec {
    /// A dataflow reaction producing `port` from `expr`
    pub fn output(name: impl Into<String>, port: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            body: BodySpec::Dataflow {
                output: Some((port.into(), expr)),
                writes: Vec::new(),
            },
            rank: None,
        }
    }

    /// A dataflow reaction with no output port
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: BodySpec::Dataflow {
                output: None,
                writes: Vec::new(),
            },
            rank: None,
        }
    }

    /// A black-box reaction with a declared port footprint; the
    /// implementation is registered on the runtime under this key
    pub fn external(
        name: impl Into<String>,
        reads: Vec<&str>,
        writes: Vec<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            body: BodySpec::External {
                reads: reads.into_iter().map(String::from).collect(),
                writes: writes.into_iter().map(String::from).collect(),
            },
            rank: None,
        }
    }

    /// Add a state/variable write
    pub fn writes(mut self, target: impl Into<String>, expr: Expr) -> Self {
        if let BodySpec::Dataflow { writes, .. } = &mut self.body {
            writes.push((target.into(), expr));
        }
        self
    }

    /// Declare a non-Zeno rank and microstep budget
    pub fn with_rank(mut self, rank: Expr, max_microsteps: u32) -> Self {
        self.rank = Some((rank, max_microsteps));
        self
    }
}

/// Node descriptor
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub id: NodeId,
    pub kind: NodeKind,
    pub ports: Vec<PortSpec>,
    pub states: Vec<StateSpec>,
    pub reactions: Vec<ReactionSpec>,
    pub contract: Contract,
}

impl NodeSpec {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        let contract = match kind {
            // Wrappers never feed their inputs through instantaneously
            NodeKind::ContinuousWrapper => Contract {
                no_instant_loop: true,
                ..Contract::default()
            },
            _ => Contract::default(),
        };
        Self {
            id: id.into(),
            kind,
            ports: Vec::new(),
            states: Vec::new(),
            reactions: Vec::new(),
            contract,
        }
    }

    pub fn core(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Core)
    }

    pub fn ext(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Ext)
    }

    pub fn raw(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Raw)
    }

    pub fn continuous(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::ContinuousWrapper)
    }

    pub fn port(mut self, spec: PortSpec) -> Self {
        self.ports.push(spec);
        self
    }

    pub fn input(self, name: &str, ty: ElemType) -> Self {
        self.port(PortSpec::input(name, ty))
    }

    pub fn output(self, name: &str, ty: ElemType) -> Self {
        self.port(PortSpec::output(name, ty))
    }

    pub fn state(mut self, spec: StateSpec) -> Self {
        self.states.push(spec);
        self
    }

    pub fn reaction(mut self, spec: ReactionSpec) -> Self {
        self.reactions.push(spec);
        self
    }

    pub fn contract(mut self, contract: Contract) -> Self {
        self.contract = contract;
        self
    }
}

/// Accumulates descriptors and freezes them into a [`Graph`]
#[derive(Default)]
pub struct GraphBuilder {
    nodes: IndexMap<NodeId, NodeSpec>,
    shared: IndexMap<VarId, Variable>,
    edges: Vec<Edge>,
    builtins: IndexMap<String, BuiltinSig>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_builtin(&mut self, sig: BuiltinSig) -> Result<(), BuildError> {
        if self.builtins.contains_key(&sig.name) {
            return Err(BuildError::DuplicateBuiltin(sig.name));
        }
        self.builtins.insert(sig.name.clone(), sig);
        Ok(())
    }

    /// Register a shared variable
    pub fn add_variable(
        &mut self,
        id: impl Into<VarId>,
        ty: ElemType,
        init: Option<Value>,
        policy: WritePolicy,
    ) -> Result<(), BuildError> {
        self.add_variable_spec(id, ty, init, policy, None)
    }

    pub fn add_variable_spec(
        &mut self,
        id: impl Into<VarId>,
        ty: ElemType,
        init: Option<Value>,
        policy: WritePolicy,
        height_bound: Option<u32>,
    ) -> Result<(), BuildError> {
        let id = id.into();
        if self.shared.contains_key(&id) {
            return Err(BuildError::DuplicateVariable(id));
        }
        self.shared.insert(
            id.clone(),
            Variable {
                id,
                ty,
                init,
                policy,
                height_bound,
                kind: VarKind::Shared,
            },
        );
        Ok(())
    }

    pub fn add_node(&mut self, spec: NodeSpec) -> Result<(), BuildError> {
        if self.nodes.contains_key(&spec.id) {
            return Err(BuildError::DuplicateNode(spec.id));
        }
        self.nodes.insert(spec.id.clone(), spec);
        Ok(())
    }

    /// Connect an output port to an input port
    pub fn connect(&mut self, from: PortRef, to: PortRef) -> Result<(), BuildError> {
        let from_spec = self.port_spec(&from)?;
        if from_spec.direction != Direction::Output {
            return Err(BuildError::NotAnOutput(from));
        }
        let to_spec = self.port_spec(&to)?;
        if to_spec.direction != Direction::Input {
            return Err(BuildError::NotAnInput(to));
        }
        self.edges.push(Edge { from, to });
        Ok(())
    }

    fn port_spec(&self, pref: &PortRef) -> Result<&PortSpec, BuildError> {
        let node = self
            .nodes
            .get(&pref.node)
            .ok_or_else(|| BuildError::UnknownNode(pref.node.clone()))?;
        node.ports
            .iter()
            .find(|p| p.name == pref.port)
            .ok_or_else(|| BuildError::UnknownPort(pref.clone()))
    }

    /// Freeze the descriptors into canonical IR. The builder is left
    /// untouched, so building twice yields identical graphs.
    pub fn build(&self) -> Result<Graph, BuildError> {
        let mut graph = Graph {
            builtins: self.builtins.clone(),
            edges: self.edges.clone(),
            ..Graph::default()
        };

        for var in self.shared.values() {
            graph.variables.insert(var.id.clone(), var.clone());
        }

        // Scope node states into the shared variable namespace first so
        // cross-node reads of "{node}.{state}" resolve.
        for spec in self.nodes.values() {
            for state in &spec.states {
                let id = VarId(format!("{}.{}", spec.id, state.name));
                if graph.variables.contains_key(&id) {
                    return Err(BuildError::DuplicateVariable(id));
                }
                graph.variables.insert(
                    id.clone(),
                    Variable {
                        id,
                        ty: state.ty,
                        init: state.init,
                        policy: state.policy.clone(),
                        height_bound: state.height_bound,
                        kind: VarKind::State {
                            owner: spec.id.clone(),
                        },
                    },
                );
            }
        }

        for spec in self.nodes.values() {
            let node = self.build_node(spec, &graph)?;
            graph.nodes.insert(node.id.clone(), node);
        }

        Ok(graph)
    }

    fn build_node(&self, spec: &NodeSpec, graph: &Graph) -> Result<Node, BuildError> {
        let mut inputs = IndexMap::new();
        let mut outputs = IndexMap::new();
        for port in &spec.ports {
            let target = match port.direction {
                Direction::Input => &mut inputs,
                Direction::Output => &mut outputs,
            };
            let prev = target.insert(
                port.name.clone(),
                Port {
                    name: port.name.clone(),
                    direction: port.direction,
                    ty: port.ty,
                    default: port.default,
                    rate: port.rate,
                },
            );
            if prev.is_some() {
                return Err(BuildError::DuplicatePort {
                    node: spec.id.clone(),
                    port: port.name.clone(),
                });
            }
        }

        let mut reactions = Vec::new();
        for rspec in &spec.reactions {
            reactions.push(self.build_reaction(spec, rspec, &inputs, &outputs, graph)?);
        }

        // Wrappers get a synthesized step reaction covering all ports so
        // scheduling and analysis see their footprint.
        if spec.kind == NodeKind::ContinuousWrapper && reactions.is_empty() {
            reactions.push(Reaction {
                id: "step".into(),
                reads: inputs
                    .keys()
                    .map(|p| Ref::Port(PortRef::new(spec.id.clone(), p.clone())))
                    .collect(),
                writes_vars: IndexSet::new(),
                body: ReactionBody::External {
                    reads: inputs.keys().cloned().collect(),
                    writes: outputs.keys().cloned().collect(),
                },
                rank: None,
            });
        }

        Ok(Node {
            id: spec.id.clone(),
            kind: spec.kind,
            inputs,
            outputs,
            reactions,
            contract: spec.contract.clone(),
        })
    }

    fn build_reaction(
        &self,
        node: &NodeSpec,
        rspec: &ReactionSpec,
        inputs: &IndexMap<String, Port>,
        outputs: &IndexMap<String, Port>,
        graph: &Graph,
    ) -> Result<Reaction, BuildError> {
        let rid: ReactionId = rspec.name.as_str().into();
        let resolver = RefResolver {
            node: &node.id,
            reaction: &rid,
            states: &node.states,
            inputs,
            outputs,
            graph,
            builtins: &self.builtins,
        };

        match &rspec.body {
            BodySpec::External { reads, writes } => {
                for name in reads {
                    if !inputs.contains_key(name) {
                        return Err(BuildError::UnknownPort(PortRef::new(
                            node.id.clone(),
                            name.clone(),
                        )));
                    }
                }
                for name in writes {
                    if !outputs.contains_key(name) {
                        return Err(BuildError::UnknownPort(PortRef::new(
                            node.id.clone(),
                            name.clone(),
                        )));
                    }
                }
                Ok(Reaction {
                    id: rid,
                    reads: reads
                        .iter()
                        .map(|p| Ref::Port(PortRef::new(node.id.clone(), p.clone())))
                        .collect(),
                    writes_vars: IndexSet::new(),
                    body: ReactionBody::External {
                        reads: reads.clone(),
                        writes: writes.clone(),
                    },
                    rank: None,
                })
            }
            BodySpec::Dataflow { output, writes } => {
                let output = match output {
                    Some((port_name, expr)) => {
                        let port = outputs.get(port_name).ok_or_else(|| {
                            BuildError::UnknownPort(PortRef::new(
                                node.id.clone(),
                                port_name.clone(),
                            ))
                        })?;
                        let expr = resolver.resolve(expr)?;
                        if !expr.ty.unifies_with(port.ty) {
                            return Err(BuildError::TypeMismatch {
                                what: format!("{}.{}", node.id, port_name),
                                declared: port.ty,
                                used: expr.ty,
                            });
                        }
                        Some(OutputBinding {
                            port: port_name.clone(),
                            expr,
                            delay_backed: None,
                        })
                    }
                    None => None,
                };

                let mut resolved_writes = IndexMap::new();
                for (target, expr) in writes {
                    let (var_id, var_ty) = resolver.resolve_write_target(target)?;
                    let expr = resolver.resolve(expr)?;
                    if !expr.ty.unifies_with(var_ty) {
                        return Err(BuildError::TypeMismatch {
                            what: var_id.to_string(),
                            declared: var_ty,
                            used: expr.ty,
                        });
                    }
                    resolved_writes.insert(var_id, expr);
                }

                let rank = match &rspec.rank {
                    Some((expr, max)) => Some(RankSpec {
                        rank: resolver.resolve(expr)?,
                        max_microsteps: *max,
                    }),
                    None => None,
                };

                // Instantaneous reads: everything the output and write
                // expressions reference outside Delay subtrees.
                let mut reads = IndexSet::new();
                if let Some(binding) = &output {
                    collect_refs(&binding.expr, &mut reads);
                }
                for expr in resolved_writes.values() {
                    collect_refs(expr, &mut reads);
                }

                Ok(Reaction {
                    id: rid,
                    reads,
                    writes_vars: resolved_writes.keys().cloned().collect(),
                    body: ReactionBody::Dataflow {
                        output,
                        writes: resolved_writes,
                    },
                    rank,
                })
            }
        }
    }
}

/// Resolves bare names inside one reaction: node state, then input port,
/// then own output port (self-reference, e.g. `x := Delay(x + 1, 0)`),
/// then shared variable.
struct RefResolver<'a> {
    node: &'a NodeId,
    reaction: &'a ReactionId,
    states: &'a [StateSpec],
    inputs: &'a IndexMap<String, Port>,
    outputs: &'a IndexMap<String, Port>,
    graph: &'a Graph,
    builtins: &'a IndexMap<String, BuiltinSig>,
}

impl RefResolver<'_> {
    fn resolve(&self, expr: &Expr) -> Result<Expr, BuildError> {
        let wrap = |source: ExprError| BuildError::Expr {
            node: self.node.clone(),
            reaction: self.reaction.clone(),
            source,
        };
        match &expr.kind {
            ExprKind::Const(v) => Ok(Expr::constant(*v)),
            ExprKind::Ref(r) => self.resolve_ref(r, expr.ty),
            ExprKind::Bin { op, lhs, rhs } => {
                Expr::bin(*op, self.resolve(lhs)?, self.resolve(rhs)?).map_err(wrap)
            }
            ExprKind::Cmp { op, lhs, rhs } => {
                Expr::cmp(*op, self.resolve(lhs)?, self.resolve(rhs)?).map_err(wrap)
            }
            ExprKind::Logic { op, lhs, rhs } => {
                Expr::logic(*op, self.resolve(lhs)?, self.resolve(rhs)?).map_err(wrap)
            }
            ExprKind::Not(inner) => Expr::not(self.resolve(inner)?).map_err(wrap),
            ExprKind::If { cond, then_, else_ } => Expr::if_(
                self.resolve(cond)?,
                self.resolve(then_)?,
                self.resolve(else_)?,
            )
            .map_err(wrap),
            ExprKind::Call { name, args } => {
                let sig = self
                    .builtins
                    .get(name)
                    .ok_or_else(|| BuildError::UnknownBuiltin {
                        node: self.node.clone(),
                        reaction: self.reaction.clone(),
                        name: name.clone(),
                    })?;
                let args = args
                    .iter()
                    .map(|a| self.resolve(a))
                    .collect::<Result<Vec<_>, _>>()?;
                Expr::call(sig, args).map_err(wrap)
            }
            ExprKind::Delay { inner, default } => {
                Expr::delay(self.resolve(inner)?, *default).map_err(wrap)
            }
        }
    }

    fn resolve_ref(&self, r: &Ref, used_ty: ElemType) -> Result<Expr, BuildError> {
        let (resolved, declared) = match r {
            Ref::Var(name) => {
                if let Some(state) = self.states.iter().find(|s| s.name == name.0) {
                    let scoped = VarId(format!("{}.{}", self.node, state.name));
                    (Expr::var(scoped, state.ty), state.ty)
                } else if let Some(port) = self.inputs.get(&name.0).or_else(|| self.outputs.get(&name.0)) {
                    (
                        Expr::port(PortRef::new(self.node.clone(), name.0.clone()), port.ty),
                        port.ty,
                    )
                } else if let Some(var) = self.graph.variable(name) {
                    (Expr::var(name.clone(), var.ty), var.ty)
                } else {
                    return Err(BuildError::UnknownReference {
                        node: self.node.clone(),
                        reaction: self.reaction.clone(),
                        name: name.to_string(),
                    });
                }
            }
            Ref::Port(pref) => {
                let port = self
                    .graph
                    .port(pref)
                    .ok_or_else(|| BuildError::UnknownPort(pref.clone()))?;
                (Expr::port(pref.clone(), port.ty), port.ty)
            }
        };
        if !used_ty.unifies_with(declared) {
            return Err(BuildError::TypeMismatch {
                what: r.to_string(),
                declared,
                used: used_ty,
            });
        }
        Ok(resolved)
    }

    fn resolve_write_target(&self, target: &str) -> Result<(VarId, ElemType), BuildError> {
        if let Some(state) = self.states.iter().find(|s| s.name == target) {
            return Ok((VarId(format!("{}.{}", self.node, target)), state.ty));
        }
        let id = VarId(target.to_string());
        if let Some(var) = self.graph.variable(&id) {
            return Ok((id, var.ty));
        }
        Err(BuildError::UnknownReference {
            node: self.node.clone(),
            reaction: self.reaction.clone(),
            name: target.to_string(),
        })
    }
}
