//! Three-phase tick scheduler.
//!
//! Each tick runs propose / resolve / commit over the compiled schedule:
//! reactions evaluate against read-only views of the committed environment
//! and the per-tick port buffer, buffering variable writes as intents;
//! write policies collapse the intents; commit publishes the results and
//! applies the deferred delay-state writes. Algebraic cycles iterate a
//! bounded microstep loop; exceeding the budget is a Zeno violation.
//!
//! Determinism: maps are insertion-ordered, schedule order is fixed at
//! compile time, and policies are commutative or priority-tiebroken, so
//! identical inputs replay to bit-identical environments.

use indexmap::IndexMap;
use tracing::{debug, info, instrument, trace, warn};

use cadence_ir::{
    eval, Builtins, Env, Graph, Intent, NodeKind, PortRef, ReactionBody, ReactionKey, Ref,
    Sample, Schedule, ScheduleUnit, Tag, Value, VarId,
};

use crate::continuous::{ContinuousCtx, ContinuousFn, ContinuousNode};
use crate::error::{Error, Result};
use crate::storage::{Environment, EventQueue, PortBuffer};

/// Default microstep budget for cycles that declare no rank
const DEFAULT_MAX_MICROSTEPS: u32 = 20;

/// Inputs handed to a black-box reaction: one sample per declared read
pub struct BlackBoxInput {
    pub ports: IndexMap<String, Sample>,
}

/// A registered Ext/Raw reaction body. Returns one value per written
/// port; an `Err` is a user-code fault and aborts the tick.
pub type BlackBoxFn =
    Box<dyn Fn(&BlackBoxInput) -> std::result::Result<IndexMap<String, Value>, String> + Send + Sync>;

/// Committed state published by one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickSnapshot {
    pub tag: Tag,
    pub time: f64,
    pub variables: IndexMap<VarId, Value>,
    pub outputs: IndexMap<PortRef, Sample>,
}

/// Executes a compiled pipeline tick by tick
pub struct Runtime {
    graph: Graph,
    schedule: Schedule,
    env: Environment,
    ports: PortBuffer,
    events: EventQueue,
    builtins: Builtins,
    externals: IndexMap<ReactionKey, BlackBoxFn>,
    continuous: IndexMap<cadence_ir::NodeId, ContinuousNode>,
    pending_continuous: Vec<(cadence_ir::NodeId, Value)>,
    tag: Tag,
    time: f64,
    max_microsteps: u32,
}

impl Runtime {
    pub fn new(graph: Graph, schedule: Schedule) -> Self {
        let mut env = Environment::default();
        for var in graph.variables.values() {
            if let Some(init) = var.init {
                env.init(var.id.clone(), init);
            }
        }
        info!(
            nodes = graph.nodes.len(),
            units = schedule.units.len(),
            "runtime created"
        );
        Self {
            graph,
            schedule,
            env,
            ports: PortBuffer::default(),
            events: EventQueue::default(),
            builtins: Builtins::new(),
            externals: IndexMap::new(),
            continuous: IndexMap::new(),
            pending_continuous: Vec::new(),
            tag: Tag::default(),
            time: 0.0,
            max_microsteps: DEFAULT_MAX_MICROSTEPS,
        }
    }

    /// Register a builtin implementation by declared name
    pub fn register_builtin(&mut self, name: impl Into<String>, f: cadence_ir::eval::BuiltinFn) {
        self.builtins.register(name, f);
    }

    /// Register the body of an Ext/Raw reaction
    pub fn register_external(&mut self, key: ReactionKey, f: BlackBoxFn) {
        debug!(key = %key, "external body registered");
        self.externals.insert(key, f);
    }

    /// Register a continuous wrapper's stepper and initial hidden state
    pub fn register_continuous(
        &mut self,
        node: impl Into<cadence_ir::NodeId>,
        init: Value,
        stepper: ContinuousFn,
    ) {
        let node = node.into();
        debug!(node = %node, "continuous stepper registered");
        self.continuous
            .insert(node, ContinuousNode { state: init, stepper });
    }

    /// Override the default microstep budget for unranked cycles
    pub fn set_max_microsteps(&mut self, limit: u32) {
        self.max_microsteps = limit;
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Last committed value of a variable
    pub fn get_var(&self, id: &VarId) -> Sample {
        self.env.get(id)
    }

    /// Enqueue an external event for a current or future tag
    pub fn events_in(&mut self, tag: Tag, port: PortRef, value: Value) -> Result<()> {
        if self.graph.port(&port).is_none() {
            return Err(Error::UnknownPort(port));
        }
        if tag < self.tag {
            return Err(Error::PastTag {
                tag,
                current: self.tag,
            });
        }
        debug!(tag = %tag, port = %port, "event enqueued");
        self.events.push(tag, port, value);
        Ok(())
    }

    /// Drive the scheduler for a number of ticks, seeding `dt` if given
    pub fn run(&mut self, ticks: u64, dt: Option<f64>) -> Result<()> {
        for _ in 0..ticks {
            self.run_tick(dt)?;
        }
        Ok(())
    }

    /// Advance a single tick and observe the committed state
    pub fn step(&mut self) -> Result<TickSnapshot> {
        self.run_tick(None)
    }

    /// Advance a single tick with an explicit time step
    pub fn step_with(&mut self, dt: f64) -> Result<TickSnapshot> {
        self.run_tick(Some(dt))
    }

    #[instrument(skip(self), fields(tag = %self.tag))]
    fn run_tick(&mut self, dt: Option<f64>) -> Result<TickSnapshot> {
        trace!("tick start");
        self.ports.clear();
        self.pending_continuous.clear();

        // Delay-backed outputs deliver the previous tick's state
        for (pref, var) in self.graph.delay_backed_outputs() {
            let value = self.env.get(&var);
            self.ports.set(pref, value);
        }

        if let Some(dt) = dt {
            let dt_ports: Vec<PortRef> = self
                .graph
                .nodes
                .values()
                .filter(|n| n.inputs.contains_key("dt"))
                .map(|n| PortRef::new(n.id.clone(), "dt"))
                .collect();
            for pref in dt_ports {
                self.ports.set(pref, Sample::Present(Value::Scalar(dt)));
            }
        }

        for (port, value) in self.events.take_at(self.tag) {
            trace!(port = %port, "event applied");
            self.ports.set(port, Sample::Present(value));
        }

        let intents = self.propose()?;
        let updates = self.resolve(&intents)?;

        // Deferred delay-state writes evaluate over the newly committed
        // view; staging keeps the tick atomic if one of them fails.
        let staged = StagedView {
            graph: &self.graph,
            env: &self.env,
            ports: &self.ports,
            overlay: None,
            updates: Some(&updates),
        };
        let mut post_updates: Vec<(VarId, Option<Value>)> = Vec::new();
        for post in &self.graph.post_writes {
            let val = eval(&post.expr, &staged, &self.builtins)?;
            match val {
                Sample::Present(v) if !v.is_finite() => {
                    return Err(Error::Numeric {
                        target: post.var.to_string(),
                    });
                }
                Sample::Present(v) => post_updates.push((post.var.clone(), Some(v))),
                Sample::Absent => post_updates.push((post.var.clone(), None)),
            }
        }

        self.commit(updates, post_updates);

        let snapshot = self.snapshot();

        if self.events.pending_same_tick(self.tag) {
            self.tag = self.tag.next_micro();
        } else {
            self.tag = self.tag.next_tick();
            if let Some(dt) = dt {
                self.time += dt;
            }
        }
        trace!("tick complete");
        Ok(snapshot)
    }

    #[instrument(skip_all, name = "propose")]
    fn propose(&mut self) -> Result<Vec<Intent>> {
        let mut intents = Vec::new();
        let units = self.schedule.units.clone();
        for unit in &units {
            match unit {
                ScheduleUnit::Single(key) => {
                    let firings = self.schedule.firings_for(&key.node);
                    for _ in 0..firings {
                        self.fire(key, None, &mut intents)?;
                    }
                }
                ScheduleUnit::Cycle { members, budget } => {
                    self.run_cycle(members, *budget, &mut intents)?;
                }
            }
        }
        Ok(intents)
    }

    /// Evaluate one reaction: port writes go straight to the tick buffer,
    /// variable writes become intents. ABSENT writes are non-writes.
    fn fire(
        &mut self,
        key: &ReactionKey,
        overlay: Option<&IndexMap<VarId, Value>>,
        intents: &mut Vec<Intent>,
    ) -> Result<()> {
        let reaction = self
            .graph
            .reaction(key)
            .ok_or_else(|| Error::NodeFault {
                key: key.clone(),
                message: "reaction not present in compiled graph".to_string(),
            })?;
        let kind = self
            .graph
            .node(&key.node)
            .map(|n| n.kind)
            .unwrap_or(NodeKind::Raw);

        // The black-box path needs `&mut self` helpers, so pull the port
        // footprint out of the graph borrow first.
        let footprint = match &reaction.body {
            ReactionBody::Dataflow { output, writes } => {
                let view = StagedView {
                    graph: &self.graph,
                    env: &self.env,
                    ports: &self.ports,
                    overlay,
                    updates: None,
                };
                let out_val = match output {
                    Some(binding) => Some((
                        PortRef::new(key.node.clone(), binding.port.clone()),
                        eval(&binding.expr, &view, &self.builtins)?,
                    )),
                    None => None,
                };
                let mut var_vals = Vec::with_capacity(writes.len());
                for (var, expr) in writes {
                    var_vals.push((var.clone(), eval(expr, &view, &self.builtins)?));
                }

                if let Some((pref, val)) = out_val {
                    self.ports.set(pref, val);
                }
                for (var, val) in var_vals {
                    if let Sample::Present(value) = val {
                        intents.push(Intent {
                            var,
                            producer: key.node.clone(),
                            value,
                        });
                    }
                }
                return Ok(());
            }
            ReactionBody::External { reads, writes } => (reads.clone(), writes.clone()),
        };

        if kind == NodeKind::ContinuousWrapper {
            self.step_wrapper(key)
        } else {
            self.step_black_box(key, &footprint.0, &footprint.1)
        }
    }

    fn step_black_box(
        &mut self,
        key: &ReactionKey,
        reads: &[String],
        writes: &[String],
    ) -> Result<()> {
        let f = self
            .externals
            .get(key)
            .ok_or_else(|| Error::Unregistered {
                key: key.to_string(),
            })?;

        let mut input = BlackBoxInput {
            ports: IndexMap::new(),
        };
        for name in reads {
            let pref = PortRef::new(key.node.clone(), name.clone());
            input
                .ports
                .insert(name.clone(), read_port(&self.graph, &self.ports, &pref));
        }

        let outputs = f(&input).map_err(|message| Error::NodeFault {
            key: key.clone(),
            message,
        })?;

        for (name, value) in outputs {
            if writes.iter().any(|w| w == &name) {
                self.ports
                    .set(PortRef::new(key.node.clone(), name), Sample::Present(value));
            } else {
                warn!(key = %key, port = %name, "undeclared output ignored");
            }
        }
        Ok(())
    }

    /// One zero-order-hold integration step. The new hidden state is
    /// staged and committed with the tick.
    fn step_wrapper(&mut self, key: &ReactionKey) -> Result<()> {
        let u = read_port(&self.graph, &self.ports, &PortRef::new(key.node.clone(), "u"));
        let dt = read_port(&self.graph, &self.ports, &PortRef::new(key.node.clone(), "dt"))
            .as_scalar()
            .unwrap_or(0.0);

        let wrapper = self
            .continuous
            .get(&key.node)
            .ok_or_else(|| Error::Unregistered {
                key: key.node.to_string(),
            })?;
        let ctx = ContinuousCtx {
            u,
            state: wrapper.state,
            dt,
        };
        let (state, y) = (wrapper.stepper)(&ctx);

        self.pending_continuous.push((key.node.clone(), state));
        self.ports.set(
            PortRef::new(key.node.clone(), "state"),
            Sample::Present(state),
        );
        self.ports
            .set(PortRef::new(key.node.clone(), "y"), Sample::Present(y));
        Ok(())
    }

    /// Iterate an algebraic cycle to a fixed point under its budget
    fn run_cycle(
        &mut self,
        members: &[ReactionKey],
        budget: Option<u32>,
        intents: &mut Vec<Intent>,
    ) -> Result<()> {
        let limit = budget
            .map(|b| b.min(self.max_microsteps))
            .unwrap_or(self.max_microsteps);
        let mut working = self.env.working_copy();
        let mut prev_outputs: IndexMap<PortRef, Sample> = IndexMap::new();

        for micro in 0..limit {
            trace!(micro, "cycle microstep");
            let mut iter_intents = Vec::new();
            let mut changed = false;

            for key in members {
                self.fire(key, Some(&working), &mut iter_intents)?;
            }
            for key in members {
                if let Some(node) = self.graph.node(&key.node) {
                    for name in node.outputs.keys() {
                        let pref = PortRef::new(key.node.clone(), name.clone());
                        let val = self.ports.get(&pref);
                        if prev_outputs.get(&pref) != Some(&val) {
                            changed = true;
                            prev_outputs.insert(pref, val);
                        }
                    }
                }
            }

            let updates = self.resolve(&iter_intents)?;
            for (var, value) in updates {
                if working.get(&var) != Some(&value) {
                    changed = true;
                    working.insert(var, value);
                }
            }

            if !changed {
                intents.extend(iter_intents);
                return Ok(());
            }
        }

        Err(Error::Zeno {
            tag: self.tag,
            members: members.to_vec(),
            limit,
        })
    }

    /// Collapse intents per variable through its write policy
    #[instrument(skip_all, name = "resolve")]
    fn resolve(&self, intents: &[Intent]) -> Result<IndexMap<VarId, Value>> {
        let mut grouped: IndexMap<VarId, Vec<Intent>> = IndexMap::new();
        for intent in intents {
            grouped
                .entry(intent.var.clone())
                .or_default()
                .push(intent.clone());
        }

        let mut updates = IndexMap::new();
        for (var, group) in grouped {
            let variable = self
                .graph
                .variable(&var)
                .ok_or_else(|| Error::UnknownVariable(var.clone()))?;
            let value = variable.policy.merge(&var, &group)?;
            if !value.is_finite() {
                return Err(Error::Numeric {
                    target: var.to_string(),
                });
            }
            trace!(var = %var, %value, "resolved");
            updates.insert(var, value);
        }
        Ok(updates)
    }

    fn commit(
        &mut self,
        updates: IndexMap<VarId, Value>,
        post_updates: Vec<(VarId, Option<Value>)>,
    ) {
        for (var, value) in updates {
            self.env.commit(var, Some(value));
        }
        for (var, value) in post_updates {
            self.env.commit(var, value);
        }
        for (node, state) in self.pending_continuous.drain(..) {
            if let Some(wrapper) = self.continuous.get_mut(&node) {
                wrapper.state = state;
            }
        }
    }

    fn snapshot(&self) -> TickSnapshot {
        let mut outputs = IndexMap::new();
        for node in self.graph.nodes.values() {
            for name in node.outputs.keys() {
                let pref = PortRef::new(node.id.clone(), name.clone());
                let value = self.ports.get(&pref);
                outputs.insert(pref, value);
            }
        }
        TickSnapshot {
            tag: self.tag,
            time: self.time,
            variables: self.env.snapshot(),
            outputs,
        }
    }
}

/// Read-only view reactions evaluate against: committed variables (plus
/// an SCC working overlay or the staged resolve results) and the current
/// tick's ports.
struct StagedView<'a> {
    graph: &'a Graph,
    env: &'a Environment,
    ports: &'a PortBuffer,
    overlay: Option<&'a IndexMap<VarId, Value>>,
    updates: Option<&'a IndexMap<VarId, Value>>,
}

impl Env for StagedView<'_> {
    fn lookup(&self, r: &Ref) -> Sample {
        match r {
            Ref::Var(v) => {
                if let Some(updates) = self.updates {
                    if let Some(value) = updates.get(v) {
                        return Sample::Present(*value);
                    }
                }
                if let Some(overlay) = self.overlay {
                    if let Some(value) = overlay.get(v) {
                        return Sample::Present(*value);
                    }
                }
                self.env.get(v)
            }
            Ref::Port(pref) => read_port(self.graph, self.ports, pref),
        }
    }
}

/// Resolve a port read: inputs follow their edge to the source output,
/// falling back to injected values and then the declared default; outputs
/// read the tick buffer directly.
fn read_port(graph: &Graph, ports: &PortBuffer, pref: &PortRef) -> Sample {
    let Some(port) = graph.port(pref) else {
        return Sample::Absent;
    };
    match port.direction {
        cadence_ir::Direction::Output => ports.get(pref),
        cadence_ir::Direction::Input => {
            let raw = if let Some(src) = graph.source_of(pref) {
                ports.get(src)
            } else if ports.is_written(pref) {
                ports.get(pref)
            } else {
                Sample::Absent
            };
            if raw.is_absent() {
                port.default.into()
            } else {
                raw
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_compiler::{
        compile, GraphBuilder, NodeSpec, PortSpec, ReactionSpec,
    };
    use cadence_ir::{BinOp, ElemType, Expr, Mode, Monoid, WritePolicy};

    fn sv(name: &str) -> Expr {
        Expr::var(name, ElemType::Scalar)
    }

    fn runtime_for(builder: &GraphBuilder) -> Runtime {
        let outcome = compile(builder, Mode::Pragmatic).unwrap();
        let pipeline = outcome.pipeline.unwrap_or_else(|| {
            panic!("compile failed:\n{}", outcome.report);
        });
        Runtime::new(pipeline.graph, pipeline.schedule)
    }

    #[test]
    fn test_delay_counter_counts_ticks() {
        let mut b = GraphBuilder::new();
        b.add_node(
            NodeSpec::core("counter")
                .output("x", ElemType::Scalar)
                .reaction(ReactionSpec::output(
                    "tick",
                    "x",
                    Expr::delay(
                        Expr::bin(BinOp::Add, sv("x"), Expr::constant(1.0)).unwrap(),
                        0.0,
                    )
                    .unwrap(),
                )),
        )
        .unwrap();
        let mut rt = runtime_for(&b);

        // Tick 0 reads the default; tick k reads the value of x + 1 from
        // tick k - 1.
        let snap = rt.step().unwrap();
        let x = PortRef::new("counter", "x");
        assert_eq!(snap.outputs[&x], Sample::Present(Value::Scalar(0.0)));

        for expected in 1..=4 {
            let snap = rt.step().unwrap();
            assert_eq!(
                snap.outputs[&x],
                Sample::Present(Value::Scalar(expected as f64))
            );
        }
    }

    #[test]
    fn test_multiwriter_sum_is_order_independent() {
        let mut b = GraphBuilder::new();
        b.add_variable(
            "v",
            ElemType::Scalar,
            Some(Value::Scalar(0.0)),
            WritePolicy::Merge(Monoid::Sum),
        )
        .unwrap();
        b.add_node(
            NodeSpec::core("a").reaction(ReactionSpec::new("w").writes("v", Expr::constant(2.0))),
        )
        .unwrap();
        b.add_node(
            NodeSpec::core("b").reaction(ReactionSpec::new("w").writes("v", Expr::constant(5.0))),
        )
        .unwrap();
        let mut rt = runtime_for(&b);
        rt.step().unwrap();
        assert_eq!(rt.get_var(&"v".into()), Sample::Present(Value::Scalar(7.0)));
    }

    #[test]
    fn test_external_event_is_visible_at_its_tag() {
        let mut b = GraphBuilder::new();
        b.add_node(
            NodeSpec::core("amp")
                .port(PortSpec::input("inp", ElemType::Scalar).with_default(0.0))
                .output("out", ElemType::Scalar)
                .reaction(ReactionSpec::output(
                    "double",
                    "out",
                    Expr::bin(BinOp::Mul, sv("inp"), Expr::constant(2.0)).unwrap(),
                )),
        )
        .unwrap();
        let mut rt = runtime_for(&b);
        let out = PortRef::new("amp", "out");

        rt.events_in(Tag::new(1, 0), PortRef::new("amp", "inp"), Value::Scalar(21.0))
            .unwrap();

        let snap = rt.step().unwrap();
        assert_eq!(snap.outputs[&out], Sample::Present(Value::Scalar(0.0)));

        let snap = rt.step().unwrap();
        assert_eq!(snap.outputs[&out], Sample::Present(Value::Scalar(42.0)));
    }

    #[test]
    fn test_past_event_rejected() {
        let mut b = GraphBuilder::new();
        b.add_node(
            NodeSpec::core("amp")
                .port(PortSpec::input("inp", ElemType::Scalar).with_default(0.0))
                .output("out", ElemType::Scalar)
                .reaction(ReactionSpec::output("id", "out", sv("inp"))),
        )
        .unwrap();
        let mut rt = runtime_for(&b);
        rt.step().unwrap();
        let err = rt
            .events_in(Tag::new(0, 0), PortRef::new("amp", "inp"), Value::Scalar(1.0))
            .unwrap_err();
        assert!(matches!(err, Error::PastTag { .. }));
    }

    #[test]
    fn test_unregistered_external_fails() {
        let mut b = GraphBuilder::new();
        b.add_node(
            NodeSpec::raw("box")
                .port(PortSpec::input("inp", ElemType::Any).with_default(0.0))
                .output("out", ElemType::Any)
                .reaction(ReactionSpec::external("step", vec!["inp"], vec!["out"])),
        )
        .unwrap();
        let mut rt = runtime_for(&b);
        assert!(matches!(
            rt.step().unwrap_err(),
            Error::Unregistered { .. }
        ));
    }

    #[test]
    fn test_black_box_faults_abort_the_tick() {
        let mut b = GraphBuilder::new();
        b.add_node(
            NodeSpec::raw("box")
                .port(PortSpec::input("inp", ElemType::Any).with_default(0.0))
                .output("out", ElemType::Any)
                .reaction(ReactionSpec::external("step", vec!["inp"], vec!["out"])),
        )
        .unwrap();
        let mut rt = runtime_for(&b);
        rt.register_external(
            ReactionKey::new("box", "step"),
            Box::new(|_| Err("boom".to_string())),
        );
        let err = rt.step().unwrap_err();
        assert!(matches!(err, Error::NodeFault { .. }));
        // Prior committed state intact, runtime usable for the next tick
        assert_eq!(rt.tag(), Tag::new(0, 0));
    }

    #[test]
    fn test_continuous_wrapper_integrates_with_held_input() {
        use crate::continuous::euler_step;
        let mut b = GraphBuilder::new();
        b.add_node(
            NodeSpec::continuous("plant")
                .port(PortSpec::input("u", ElemType::Scalar).with_default(3.0))
                .port(PortSpec::input("dt", ElemType::Scalar).with_default(0.1))
                .output("state", ElemType::Scalar)
                .output("y", ElemType::Scalar),
        )
        .unwrap();
        let mut rt = runtime_for(&b);
        // dx/dt = u, y = x
        rt.register_continuous(
            "plant",
            Value::Scalar(0.0),
            Box::new(|ctx| {
                let u = ctx.u.as_scalar().unwrap_or(0.0);
                let x = ctx.state.as_scalar().unwrap_or(0.0);
                let next = euler_step(|_, u| u, x, u, ctx.dt);
                (Value::Scalar(next), Value::Scalar(next))
            }),
        );

        for _ in 0..10 {
            rt.step().unwrap();
        }
        let snap = rt.step().unwrap();
        let y = snap.outputs[&PortRef::new("plant", "y")].as_scalar().unwrap();
        // 11 steps of dx = 3.0 * 0.1
        assert!((y - 3.3).abs() < 1e-9, "y={y}");
    }

    #[test]
    fn test_zeno_budget_enforced() {
        // rank-declared self-accumulating reaction never stabilizes; the
        // watchdog trips once the budget is spent
        let mut b = GraphBuilder::new();
        b.add_variable(
            "v",
            ElemType::Scalar,
            Some(Value::Scalar(0.0)),
            WritePolicy::Merge(Monoid::Sum),
        )
        .unwrap();
        b.add_node(
            NodeSpec::core("spin").reaction(
                ReactionSpec::new("w")
                    .writes(
                        "v",
                        Expr::bin(BinOp::Add, sv("v"), Expr::constant(1.0)).unwrap(),
                    )
                    .with_rank(sv("v"), 4),
            ),
        )
        .unwrap();
        let mut rt = runtime_for(&b);
        let err = rt.step().unwrap_err();
        match err {
            Error::Zeno { members, limit, .. } => {
                assert_eq!(limit, 4);
                assert_eq!(members, vec![ReactionKey::new("spin", "w")]);
            }
            other => panic!("expected Zeno, got {other:?}"),
        }
        // The failed tick committed nothing
        assert_eq!(rt.get_var(&"v".into()), Sample::Present(Value::Scalar(0.0)));
    }
}
