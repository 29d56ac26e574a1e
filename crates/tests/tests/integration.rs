//! End-to-end tests for the Cadence pipeline:
//! build graph → compile → execute → verify committed state.

use cadence_compiler::{codes, GraphBuilder, NodeSpec, PortSpec, ReactionSpec, Severity};
use cadence_ir::{
    BinOp, CmpOp, ElemType, Expr, Mode, Monoid, PortRef, ReactionKey, Sample, Tag, Value,
    WritePolicy,
};
use cadence_runtime::{Error, Runtime};
use cadence_tests::{output, output_scalar, TestHarness};

fn sv(name: &str) -> Expr {
    Expr::var(name, ElemType::Scalar)
}

fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::bin(BinOp::Add, lhs, rhs).unwrap()
}

/// A (x = 3) -> B (y = x + 1) -> C (z = y * 2)
fn chain_builder() -> GraphBuilder {
    let mut b = GraphBuilder::new();
    b.add_node(
        NodeSpec::core("a")
            .output("x", ElemType::Scalar)
            .reaction(ReactionSpec::output("emit", "x", Expr::constant(3.0))),
    )
    .unwrap();
    b.add_node(
        NodeSpec::core("b")
            .input("x", ElemType::Scalar)
            .output("y", ElemType::Scalar)
            .reaction(ReactionSpec::output("calc", "y", add(sv("x"), Expr::constant(1.0)))),
    )
    .unwrap();
    b.add_node(
        NodeSpec::core("c")
            .input("y", ElemType::Scalar)
            .output("z", ElemType::Scalar)
            .reaction(ReactionSpec::output(
                "calc",
                "z",
                Expr::bin(BinOp::Mul, sv("y"), Expr::constant(2.0)).unwrap(),
            )),
    )
    .unwrap();
    b.connect(PortRef::new("a", "x"), PortRef::new("b", "x"))
        .unwrap();
    b.connect(PortRef::new("b", "y"), PortRef::new("c", "y"))
        .unwrap();
    b
}

/// x := Delay(x + 1, 0)
fn counter_builder() -> GraphBuilder {
    let mut b = GraphBuilder::new();
    b.add_node(
        NodeSpec::core("counter")
            .output("x", ElemType::Scalar)
            .reaction(ReactionSpec::output(
                "tick",
                "x",
                Expr::delay(add(sv("x"), Expr::constant(1.0)), 0.0).unwrap(),
            )),
    )
    .unwrap();
    b
}

/// Two nodes writing +2 and +5 into a sum-merged variable; insertion
/// order is the caller's choice.
fn sum_builder(order: &[(&str, f64)]) -> GraphBuilder {
    let mut b = GraphBuilder::new();
    b.add_variable(
        "v",
        ElemType::Scalar,
        Some(Value::Scalar(0.0)),
        WritePolicy::Merge(Monoid::Sum),
    )
    .unwrap();
    for (id, amount) in order {
        b.add_node(
            NodeSpec::core(*id)
                .reaction(ReactionSpec::new("w").writes("v", Expr::constant(*amount))),
        )
        .unwrap();
    }
    b
}

#[test]
fn test_simple_chain_propagates_in_one_tick() {
    let mut harness = TestHarness::from_builder(&chain_builder());
    let snap = harness.tick();
    assert_eq!(output_scalar(&snap, "a", "x"), 3.0);
    assert_eq!(output_scalar(&snap, "b", "y"), 4.0);
    assert_eq!(output_scalar(&snap, "c", "z"), 8.0);
}

#[test]
fn test_multiwriter_sum_commutes() {
    let mut forward = TestHarness::from_builder(&sum_builder(&[("p", 2.0), ("q", 5.0)]));
    let mut reverse = TestHarness::from_builder(&sum_builder(&[("q", 5.0), ("p", 2.0)]));
    forward.tick();
    reverse.tick();
    assert_eq!(forward.var_scalar("v"), Some(7.0));
    assert_eq!(reverse.var_scalar("v"), Some(7.0));
}

#[test]
fn test_error_policy_conflict_rejected_at_compile() {
    let mut b = GraphBuilder::new();
    b.add_variable("v", ElemType::Scalar, Some(Value::Scalar(0.0)), WritePolicy::Error)
        .unwrap();
    for id in ["p", "q"] {
        b.add_node(
            NodeSpec::core(id).reaction(ReactionSpec::new("w").writes("v", Expr::constant(1.0))),
        )
        .unwrap();
    }
    let outcome = TestHarness::try_compile(&b, Mode::Pragmatic);
    assert!(!outcome.success());
    assert!(outcome.report.has_code(codes::WRITE001));
}

/// Delay round-trip: at tick 0 the output is the default; at tick k it is
/// the value of the delayed expression at tick k - 1.
#[test]
fn test_delay_round_trip() {
    let outcome = TestHarness::try_compile(&counter_builder(), Mode::Pragmatic);
    assert!(outcome.success(), "{}", outcome.report);
    assert!(
        outcome.report.diagnostics.is_empty(),
        "delay must break the cycle: {}",
        outcome.report
    );

    let mut harness = TestHarness::from_builder(&counter_builder());
    for expected in 0..6 {
        let snap = harness.tick();
        assert_eq!(output_scalar(&snap, "counter", "x"), expected as f64);
    }
}

#[test]
fn test_non_constructive_cycle_rejected() {
    // a := if b then 0 else 1; b := (a == 1)
    let mut b = GraphBuilder::new();
    b.add_variable("a", ElemType::Scalar, None, WritePolicy::Merge(Monoid::Max))
        .unwrap();
    b.add_variable("b", ElemType::Bool, None, WritePolicy::Merge(Monoid::Max))
        .unwrap();
    b.add_node(NodeSpec::core("r1").reaction(ReactionSpec::new("w").writes(
        "a",
        Expr::if_(
            Expr::var("b", ElemType::Bool),
            Expr::constant(0.0),
            Expr::constant(1.0),
        )
        .unwrap(),
    )))
    .unwrap();
    b.add_node(NodeSpec::core("r2").reaction(ReactionSpec::new("w").writes(
        "b",
        Expr::cmp(CmpOp::Eq, sv("a"), Expr::constant(1.0)).unwrap(),
    )))
    .unwrap();

    let outcome = TestHarness::try_compile(&b, Mode::Pragmatic);
    assert!(!outcome.success());
    assert!(outcome.report.has_code(codes::CAUS003));
}

#[test]
fn test_sdf_inconsistent_rates_rejected() {
    // Diamond with conflicting rate ratios on its two arms
    let mut b = GraphBuilder::new();
    b.add_node(
        NodeSpec::core("src")
            .port(PortSpec::output("o1", ElemType::Scalar).with_rate(1))
            .port(PortSpec::output("o2", ElemType::Scalar).with_rate(1))
            .reaction(ReactionSpec::output("e1", "o1", Expr::constant(1.0)))
            .reaction(ReactionSpec::output("e2", "o2", Expr::constant(1.0))),
    )
    .unwrap();
    for (id, rate) in [("left", 1u32), ("right", 2u32)] {
        b.add_node(
            NodeSpec::core(id)
                .port(PortSpec::input("inp", ElemType::Scalar).with_rate(rate))
                .port(PortSpec::output("out", ElemType::Scalar).with_rate(1))
                .reaction(ReactionSpec::output("pass", "out", sv("inp"))),
        )
        .unwrap();
    }
    b.add_node(
        NodeSpec::core("sink")
            .port(PortSpec::input("i1", ElemType::Scalar).with_rate(1))
            .port(PortSpec::input("i2", ElemType::Scalar).with_rate(1))
            .output("out", ElemType::Scalar)
            .reaction(ReactionSpec::output("join", "out", sv("i1"))),
    )
    .unwrap();
    b.connect(PortRef::new("src", "o1"), PortRef::new("left", "inp"))
        .unwrap();
    b.connect(PortRef::new("src", "o2"), PortRef::new("right", "inp"))
        .unwrap();
    b.connect(PortRef::new("left", "out"), PortRef::new("sink", "i1"))
        .unwrap();
    b.connect(PortRef::new("right", "out"), PortRef::new("sink", "i2"))
        .unwrap();

    let outcome = TestHarness::try_compile(&b, Mode::Pragmatic);
    assert!(!outcome.success());
    assert!(outcome.report.has_code(codes::SDF001));
}

/// Producer rate 1 feeding consumer rate 3 balances with firing vector
/// q = (3, 1): the producer fires three times per tick.
#[test]
fn test_sdf_firing_vector_drives_the_tick() {
    let mut b = GraphBuilder::new();
    b.add_variable(
        "fired",
        ElemType::Scalar,
        Some(Value::Scalar(0.0)),
        WritePolicy::Merge(Monoid::Sum),
    )
    .unwrap();
    b.add_node(
        NodeSpec::core("p")
            .port(PortSpec::output("out", ElemType::Scalar).with_rate(1))
            .reaction(
                ReactionSpec::output("emit", "out", Expr::constant(1.0))
                    .writes("fired", Expr::constant(1.0)),
            ),
    )
    .unwrap();
    b.add_node(
        NodeSpec::core("q")
            .port(PortSpec::input("inp", ElemType::Scalar).with_rate(3))
            .output("out", ElemType::Scalar)
            .reaction(ReactionSpec::output("consume", "out", sv("inp"))),
    )
    .unwrap();
    b.connect(PortRef::new("p", "out"), PortRef::new("q", "inp"))
        .unwrap();

    let mut harness = TestHarness::from_builder(&b);
    harness.tick();
    // One firing per intent: three proposals summed
    assert_eq!(harness.var_scalar("fired"), Some(3.0));
}

#[test]
fn test_zeno_budget_trips_at_runtime() {
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
                .writes("v", add(sv("v"), Expr::constant(1.0)))
                .with_rank(sv("v"), 4),
        ),
    )
    .unwrap();

    let mut harness = TestHarness::from_builder(&b);
    let err = harness.runtime().step().unwrap_err();
    match err {
        Error::Zeno { members, limit, tag } => {
            assert_eq!(limit, 4);
            assert_eq!(members, vec![ReactionKey::new("spin", "w")]);
            assert_eq!(tag, Tag::new(0, 0));
        }
        other => panic!("expected Zeno, got {other:?}"),
    }
}

/// A ranked self-accumulating reaction that does stabilize finishes well
/// inside its declared budget.
#[test]
fn test_microstep_termination_within_budget() {
    let mut b = GraphBuilder::new();
    b.add_variable(
        "v",
        ElemType::Scalar,
        Some(Value::Scalar(0.0)),
        WritePolicy::Merge(Monoid::Max),
    )
    .unwrap();
    b.add_node(
        NodeSpec::core("clamp").reaction(
            ReactionSpec::new("w")
                .writes(
                    "v",
                    Expr::bin(BinOp::Max, sv("v"), Expr::constant(5.0)).unwrap(),
                )
                .with_rank(sv("v"), 6),
        ),
    )
    .unwrap();

    let mut harness = TestHarness::from_builder(&b);
    harness.tick();
    assert_eq!(harness.var_scalar("v"), Some(5.0));
}

#[test]
fn test_determinism_across_runs() {
    let build = || {
        let mut b = counter_builder();
        b.add_variable(
            "acc",
            ElemType::Scalar,
            Some(Value::Scalar(0.0)),
            WritePolicy::Merge(Monoid::Sum),
        )
        .unwrap();
        b.add_node(
            NodeSpec::core("w1").reaction(ReactionSpec::new("w").writes("acc", Expr::constant(1.5))),
        )
        .unwrap();
        b.add_node(
            NodeSpec::core("w2").reaction(ReactionSpec::new("w").writes("acc", Expr::constant(2.5))),
        )
        .unwrap();
        b
    };

    let mut first = TestHarness::from_builder(&build());
    let mut second = TestHarness::from_builder(&build());
    let a = first.run_ticks(20);
    let b = second.run_ticks(20);
    assert_eq!(a, b, "identical runs must commit identical environments");
}

#[test]
fn test_absence_propagates_through_arithmetic() {
    let mut b = GraphBuilder::new();
    b.add_node(
        NodeSpec::ext("silent")
            .output("out", ElemType::Any)
            .reaction(ReactionSpec::external("step", vec![], vec!["out"])),
    )
    .unwrap();
    b.add_node(
        NodeSpec::core("math")
            .input("x", ElemType::Scalar)
            .output("y", ElemType::Scalar)
            .reaction(ReactionSpec::output("calc", "y", add(sv("x"), Expr::constant(1.0)))),
    )
    .unwrap();
    b.connect(PortRef::new("silent", "out"), PortRef::new("math", "x"))
        .unwrap();

    let mut harness = TestHarness::from_builder(&b);
    harness
        .runtime()
        .register_external(ReactionKey::new("silent", "step"), Box::new(|_| Ok(Default::default())));

    let snap = harness.tick();
    assert!(output(&snap, "math", "y").is_absent());
}

#[test]
fn test_compile_is_idempotent() {
    let b = chain_builder();
    let first = TestHarness::try_compile(&b, Mode::Pragmatic);
    let second = TestHarness::try_compile(&b, Mode::Pragmatic);
    assert_eq!(first.report, second.report);
    assert_eq!(first.pipeline, second.pipeline);
}

/// Events for a later microstep of the same tick advance µ, not t.
#[test]
fn test_superdense_microstep_advance() {
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

    let mut harness = TestHarness::from_builder(&b);
    harness.enqueue(Tag::new(1, 1), "amp", "inp", 21.0);

    assert_eq!(harness.tick().tag, Tag::new(0, 0));
    assert_eq!(harness.tick().tag, Tag::new(1, 0));

    let snap = harness.tick();
    assert_eq!(snap.tag, Tag::new(1, 1), "µ advances within the tick");
    assert_eq!(output_scalar(&snap, "amp", "out"), 42.0);

    assert_eq!(harness.tick().tag, Tag::new(2, 0), "µ resets when t advances");
}

#[test]
fn test_strict_mode_promotes_lww_conflicts() {
    let mut b = GraphBuilder::new();
    b.add_variable(
        "v",
        ElemType::Scalar,
        Some(Value::Scalar(0.0)),
        WritePolicy::LastWriterWins { priority: vec![] },
    )
    .unwrap();
    for id in ["p", "q"] {
        b.add_node(
            NodeSpec::core(id).reaction(ReactionSpec::new("w").writes("v", Expr::constant(1.0))),
        )
        .unwrap();
    }

    let pragmatic = TestHarness::try_compile(&b, Mode::Pragmatic);
    assert!(pragmatic.success());
    assert!(pragmatic
        .report
        .diagnostics
        .iter()
        .any(|d| d.code == codes::WRITE002 && d.severity == Severity::Warning));

    let strict = TestHarness::try_compile(&b, Mode::Strict);
    assert!(!strict.success());
    assert!(strict
        .report
        .diagnostics
        .iter()
        .any(|d| d.code == codes::WRITE002 && d.severity == Severity::Error));
}

/// Closed loop across the hybrid boundary: a discrete source drives a
/// wrapped integrator through a zero-order hold.
#[test]
fn test_hybrid_wrapper_closed_loop() {
    let mut b = GraphBuilder::new();
    b.add_node(
        NodeSpec::core("setpoint")
            .output("u", ElemType::Scalar)
            .reaction(ReactionSpec::output("emit", "u", Expr::constant(2.0))),
    )
    .unwrap();
    b.add_node(
        NodeSpec::continuous("plant")
            .port(PortSpec::input("u", ElemType::Scalar).with_default(0.0))
            .port(PortSpec::input("dt", ElemType::Scalar).with_default(0.5))
            .output("state", ElemType::Scalar)
            .output("y", ElemType::Scalar),
    )
    .unwrap();
    b.connect(PortRef::new("setpoint", "u"), PortRef::new("plant", "u"))
        .unwrap();

    let mut harness = TestHarness::from_builder(&b);
    harness.runtime().register_continuous(
        "plant",
        Value::Scalar(0.0),
        Box::new(|ctx| {
            let u = ctx.u.as_scalar().unwrap_or(0.0);
            let x = ctx.state.as_scalar().unwrap_or(0.0);
            let next = cadence_runtime::euler_step(|_, u| u, x, u, ctx.dt);
            (Value::Scalar(next), Value::Scalar(next))
        }),
    );

    // dx/dt = u = 2.0, dt = 0.5: state grows by 1.0 per tick
    for expected in 1..=4 {
        let snap = harness.tick();
        let y = output_scalar(&snap, "plant", "y");
        assert!((y - expected as f64).abs() < 1e-9, "tick {expected}: y={y}");
    }
}

/// The runtime surfaces a write-policy conflict as a structured error
/// when a hand-assembled schedule reaches it anyway.
#[test]
fn test_runtime_write_conflict_error() {
    let mut b = GraphBuilder::new();
    b.add_variable("v", ElemType::Scalar, Some(Value::Scalar(0.0)), WritePolicy::Error)
        .unwrap();
    for id in ["p", "q"] {
        b.add_node(
            NodeSpec::core(id).reaction(ReactionSpec::new("w").writes("v", Expr::constant(1.0))),
        )
        .unwrap();
    }
    // Bypass the pipeline gate: build the graph and schedule directly
    let graph = {
        let mut graph = b.build().unwrap();
        cadence_compiler::lower_delays(&mut graph);
        graph
    };
    let schedule = cadence_compiler::build_schedule(&graph);
    let mut runtime = Runtime::new(graph, schedule);

    let err = runtime.step().unwrap_err();
    assert!(matches!(err, Error::WritePolicy(_)));
    // Tick is atomic: nothing committed
    assert_eq!(
        runtime.get_var(&"v".into()),
        Sample::Present(Value::Scalar(0.0))
    );
}
