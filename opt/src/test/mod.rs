//! Cross-module test suite: equilibrium scenarios, CSE counts, properties.


use std::rc::Rc;

use graft_ir::{Graph, GraphCloner, Manager, Node, Primitive, Value, isomorphic, render_graph};

use crate::equilibrium::{EquilibriumOptimizer, OptStats};
use crate::pattern::{Pattern, var};
use crate::rules::RewriteRule;

pub(crate) fn op(name: &str) -> Rc<Node> {
    Node::constant(Value::Prim(Primitive::new(name)))
}

pub(crate) fn pat1(op: &str, arg: Pattern) -> Pattern {
    Pattern::apply(vec![Primitive::new(op).into(), arg])
}

pub(crate) fn pat2(op: &str, lhs: Pattern, rhs: Pattern) -> Pattern {
    Pattern::apply(vec![Primitive::new(op).into(), lhs, rhs])
}

// The rule set from the original optimizer suite, over fake primitives
// P, Q, R and scalar add/mul.

pub(crate) fn idempotent_p() -> RewriteRule {
    RewriteRule::sub("idempotent_P", pat1("P", pat1("P", var("X"))), pat1("P", var("X")))
}

pub(crate) fn elim_r() -> RewriteRule {
    RewriteRule::sub("elim_R", pat1("R", var("X")), var("X"))
}

pub(crate) fn q0_to_r() -> RewriteRule {
    RewriteRule::sub("Q0_to_R", pat1("Q", 0.into()), pat1("R", 0.into()))
}

pub(crate) fn qp_to_qr() -> RewriteRule {
    RewriteRule::sub("QP_to_QR", pat1("Q", pat1("P", var("X"))), pat1("Q", pat1("R", var("X"))))
}

pub(crate) fn multiply_by_zero_l() -> RewriteRule {
    RewriteRule::sub("multiply_by_zero_l", pat2("mul", 0.into(), var("X")), 0.into())
}

pub(crate) fn multiply_by_zero_r() -> RewriteRule {
    RewriteRule::sub("multiply_by_zero_r", pat2("mul", var("X"), 0.into()), 0.into())
}

pub(crate) fn add_zero_l() -> RewriteRule {
    RewriteRule::sub("add_zero_l", pat2("add", 0.into(), var("X")), var("X"))
}

pub(crate) fn add_zero_r() -> RewriteRule {
    RewriteRule::sub("add_zero_r", pat2("add", var("X"), 0.into()), var("X"))
}

/// Optimize a total clone of `before` to equilibrium and compare it against
/// `after`; the input graph itself is never touched.
pub(crate) fn check_opt(before: &Rc<Graph>, after: &Rc<Graph>, rules: Vec<RewriteRule>) -> OptStats {
    let work = GraphCloner::total(before).unwrap().get(before).unwrap();
    let manager = Manager::new();
    manager.manage(&[work.clone()]).unwrap();
    let stats = EquilibriumOptimizer::new(rules).run(&manager).unwrap();
    assert!(
        isomorphic(&work, after).unwrap(),
        "optimized:\n{}\nexpected:\n{}",
        render_graph(&work),
        render_graph(after),
    );
    stats
}
