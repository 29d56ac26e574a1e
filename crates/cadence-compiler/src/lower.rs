//! Delay lowering.
//!
//! Rewrites every `Delay(e, d)` into a hidden state variable initialized to
//! `d` plus a post-commit write of `e`. The reaction's instantaneous read of
//! the state returns the previous tick's value; the new value becomes
//! visible at the next tick. This is the only mechanism that breaks
//! instantaneous cycles, and it runs before any analysis pass, so the rest
//! of the compiler never sees a `Delay` node.

use indexmap::IndexSet;

use cadence_ir::{
    collect_refs, Expr, ExprKind, Graph, NodeId, PostWrite, ReactionBody, ReactionKey, Ref,
    VarId, VarKind, Variable, WritePolicy,
};

/// Rewrite all delays in place, allocating hidden states on the graph.
pub fn lower_delays(graph: &mut Graph) {
    let mut new_vars: Vec<Variable> = Vec::new();
    let mut new_posts: Vec<PostWrite> = Vec::new();

    for node in graph.nodes.values_mut() {
        let owner = node.id.clone();
        for reaction in &mut node.reactions {
            let key = ReactionKey::new(owner.clone(), reaction.id.clone());
            let mut cx = LowerCx {
                owner: &owner,
                key: &key,
                counter: 0,
                vars: &mut new_vars,
                posts: &mut new_posts,
            };

            let ReactionBody::Dataflow { output, writes } = &mut reaction.body else {
                continue;
            };

            if let Some(binding) = output {
                let whole_output_delayed = matches!(binding.expr.kind, ExprKind::Delay { .. });
                binding.expr = cx.rewrite(&binding.expr);
                if whole_output_delayed {
                    if let ExprKind::Ref(Ref::Var(v)) = &binding.expr.kind {
                        binding.delay_backed = Some(v.clone());
                    }
                }
            }
            for expr in writes.values_mut() {
                *expr = cx.rewrite(expr);
            }

            // Reads changed shape: delayed subtrees became state reads.
            let mut reads = IndexSet::new();
            if let Some(binding) = output {
                collect_refs(&binding.expr, &mut reads);
            }
            for expr in writes.values() {
                collect_refs(expr, &mut reads);
            }
            reaction.reads = reads;
        }
    }

    for var in new_vars {
        graph.variables.insert(var.id.clone(), var);
    }
    graph.post_writes.extend(new_posts);
}

struct LowerCx<'a> {
    owner: &'a NodeId,
    key: &'a ReactionKey,
    counter: usize,
    vars: &'a mut Vec<Variable>,
    posts: &'a mut Vec<PostWrite>,
}

impl LowerCx<'_> {
    fn rewrite(&mut self, expr: &Expr) -> Expr {
        let ty = expr.ty;
        let kind = match &expr.kind {
            ExprKind::Delay { inner, default } => {
                // Inner delays lower first so the deferred expression is
                // itself delay-free.
                let inner = self.rewrite(inner);
                let var_id = VarId(format!(
                    "{}.__delay_{}_{}",
                    self.owner, self.key.reaction, self.counter
                ));
                self.counter += 1;
                self.vars.push(Variable {
                    id: var_id.clone(),
                    ty,
                    init: Some(*default),
                    policy: WritePolicy::Error,
                    height_bound: None,
                    kind: VarKind::DelayState {
                        owner: self.owner.clone(),
                    },
                });
                self.posts.push(PostWrite {
                    var: var_id.clone(),
                    expr: inner,
                    owner: self.key.clone(),
                });
                ExprKind::Ref(Ref::Var(var_id))
            }
            ExprKind::Bin { op, lhs, rhs } => ExprKind::Bin {
                op: *op,
                lhs: Box::new(self.rewrite(lhs)),
                rhs: Box::new(self.rewrite(rhs)),
            },
            ExprKind::Cmp { op, lhs, rhs } => ExprKind::Cmp {
                op: *op,
                lhs: Box::new(self.rewrite(lhs)),
                rhs: Box::new(self.rewrite(rhs)),
            },
            ExprKind::Logic { op, lhs, rhs } => ExprKind::Logic {
                op: *op,
                lhs: Box::new(self.rewrite(lhs)),
                rhs: Box::new(self.rewrite(rhs)),
            },
            ExprKind::Not(inner) => ExprKind::Not(Box::new(self.rewrite(inner))),
            ExprKind::If { cond, then_, else_ } => ExprKind::If {
                cond: Box::new(self.rewrite(cond)),
                then_: Box::new(self.rewrite(then_)),
                else_: Box::new(self.rewrite(else_)),
            },
            ExprKind::Call { name, args } => ExprKind::Call {
                name: name.clone(),
                args: args.iter().map(|a| self.rewrite(a)).collect(),
            },
            ExprKind::Const(_) | ExprKind::Ref(_) => expr.kind.clone(),
        };
        Expr { kind, ty }
    }
}
