use std::rc::Rc;

use test_case::test_case;

use crate::clone::{GraphCloner, clone_graph};
use crate::error::Error;
use crate::graph::Graph;
use crate::isomorphism::isomorphic;
use crate::node::Node;
use crate::value::{Primitive, Value};

fn prim(name: &str) -> Rc<Node> {
    Node::constant(Value::Prim(Primitive::new(name)))
}

/// g(x) = P(x)
fn wrap_once(graph_name: &str, param_name: &str, op: &str) -> Rc<Graph> {
    let g = Graph::named(graph_name);
    let x = g.add_parameter(param_name);
    g.set_output(g.apply(vec![prim(op), x]));
    g
}

/// g(x) = g(P(x)), a self-referential graph
fn recursive_graph(name: &str) -> Rc<Graph> {
    let g = Graph::named(name);
    let x = g.add_parameter("x");
    let wrapped = g.apply(vec![prim("P"), x]);
    g.set_output(g.apply(vec![g.as_operand(), wrapped]));
    g
}

/// main(x) = sub() where sub() = Q(P(x))
fn closure_graph() -> (Rc<Graph>, Rc<Node>) {
    let main = Graph::named("main");
    let x = main.add_parameter("x");
    let y = main.apply(vec![prim("P"), x]);
    let sub = Graph::named("sub");
    sub.set_output(sub.apply(vec![prim("Q"), y.clone()]));
    main.set_output(main.apply(vec![sub.as_operand()]));
    (main, y)
}

#[test_case("P", "P" => true; "renaming is tolerated")]
#[test_case("P", "Q" => false; "operations must agree")]
fn isomorphism_of_single_wrappers(a_op: &str, b_op: &str) -> bool {
    let a = wrap_once("f", "x", a_op);
    let b = wrap_once("g", "y", b_op);
    isomorphic(&a, &b).unwrap()
}

#[test]
fn isomorphic_rejects_parameter_count_mismatch() {
    let a = wrap_once("f", "x", "P");
    let b = wrap_once("g", "x", "P");
    b.add_parameter("extra");
    assert!(!isomorphic(&a, &b).unwrap());
}

#[test]
fn isomorphic_rejects_arity_mismatch() {
    let a = Graph::named("f");
    let x = a.add_parameter("x");
    a.set_output(a.apply(vec![prim("P"), x.clone()]));

    let b = Graph::named("g");
    let y = b.add_parameter("y");
    b.set_output(b.apply(vec![prim("P"), y.clone(), y]));

    assert!(!isomorphic(&a, &b).unwrap());
}

#[test]
fn isomorphic_respects_sharing() {
    // add(t, t) with one shared subtree vs add(P(x), P(x)) with two copies
    let a = Graph::named("shared");
    let x = a.add_parameter("x");
    let t = a.apply(vec![prim("P"), x]);
    a.set_output(a.apply(vec![prim("add"), t.clone(), t]));

    let b = Graph::named("split");
    let y = b.add_parameter("y");
    let t1 = b.apply(vec![prim("P"), y.clone()]);
    let t2 = b.apply(vec![prim("P"), y]);
    b.set_output(b.apply(vec![prim("add"), t1, t2]));

    assert!(!isomorphic(&a, &b).unwrap());
    assert!(isomorphic(&a, &a).unwrap());
    assert!(isomorphic(&b, &b).unwrap());
}

#[test]
fn isomorphic_is_an_equivalence_relation() {
    let graphs = [wrap_once("a", "x", "P"), wrap_once("b", "y", "P"), wrap_once("c", "z", "P")];
    for g in &graphs {
        assert!(isomorphic(g, g).unwrap());
    }
    for left in &graphs {
        for right in &graphs {
            assert_eq!(isomorphic(left, right).unwrap(), isomorphic(right, left).unwrap());
        }
    }
    // transitivity across the three renamed copies
    assert!(isomorphic(&graphs[0], &graphs[1]).unwrap());
    assert!(isomorphic(&graphs[1], &graphs[2]).unwrap());
    assert!(isomorphic(&graphs[0], &graphs[2]).unwrap());
}

#[test]
fn isomorphic_handles_recursive_graphs() {
    let a = recursive_graph("fix_a");
    let b = recursive_graph("fix_b");
    assert!(isomorphic(&a, &a).unwrap());
    assert!(isomorphic(&a, &b).unwrap());

    let plain = wrap_once("plain", "x", "P");
    assert!(!isomorphic(&a, &plain).unwrap());
}

#[test]
fn isomorphic_errors_on_dangling_reference() {
    let outer = Graph::named("outer");
    let x = outer.add_parameter("x");
    let orphan_a = Graph::named("orphan_a");
    orphan_a.set_output(orphan_a.apply(vec![prim("P"), x.clone()]));
    let orphan_b = Graph::named("orphan_b");
    orphan_b.set_output(orphan_b.apply(vec![prim("P"), x]));

    let err = isomorphic(&orphan_a, &orphan_b).unwrap_err();
    assert!(matches!(err, Error::StructuralInvariant { .. }));
}

#[test]
fn clone_is_isomorphic_to_original() {
    let g = wrap_once("f", "x", "P");
    let copy = clone_graph(&g).unwrap();
    assert_ne!(g.id(), copy.id());
    assert!(isomorphic(&g, &copy).unwrap());
}

#[test]
fn clone_is_independent() {
    let g = wrap_once("f", "x", "P");
    let copy = clone_graph(&g).unwrap();

    // rewrite the clone's output in place; the original must not move
    let original_output = g.output().unwrap();
    let copy_output = copy.output().unwrap();
    copy_output.set_inputs(vec![prim("Q"), copy.parameters()[0].clone()]);

    assert!(Rc::ptr_eq(&g.output().unwrap(), &original_output));
    assert_eq!(original_output.input(0).unwrap().value(), Some(Value::Prim(Primitive::new("P"))));
    assert!(!isomorphic(&g, &copy).unwrap());
}

#[test]
fn clone_preserves_closure_topology() {
    let (main, y) = closure_graph();
    let cloner = GraphCloner::total(&main).unwrap();
    let main_copy = cloner.get(&main).unwrap();

    assert!(isomorphic(&main, &main_copy).unwrap());

    // the cloned closure must capture the cloned y, not the original
    let y_copy = cloner.node(&y).unwrap();
    assert_ne!(y.id(), y_copy.id());
    let sub_copy = main_copy.output().unwrap().input(0).unwrap().graph_value().unwrap();
    let captured = sub_copy.output().unwrap().input(1).unwrap();
    assert!(Rc::ptr_eq(&captured, &y_copy));
}

#[test]
fn clone_preserves_recursion() {
    let g = recursive_graph("fix");
    let copy = clone_graph(&g).unwrap();
    assert!(isomorphic(&g, &copy).unwrap());

    // the clone calls itself, not the original
    let callee = copy.output().unwrap().input(0).unwrap().graph_value().unwrap();
    assert_eq!(callee.id(), copy.id());
}

#[test]
fn clone_preserves_annotations() {
    use crate::node::TypeTag;
    let g = wrap_once("f", "x", "P");
    g.output().unwrap().set_annotation(Some(TypeTag::new("i64")));
    let copy = clone_graph(&g).unwrap();
    assert_eq!(copy.output().unwrap().annotation().unwrap().as_str(), "i64");
}

#[test]
fn clone_errors_on_dangling_reference() {
    let outer = Graph::named("outer");
    let x = outer.add_parameter("x");
    let orphan = Graph::named("orphan");
    orphan.set_output(orphan.apply(vec![prim("P"), x]));

    let err = GraphCloner::total(&orphan).unwrap_err();
    assert!(matches!(err, Error::StructuralInvariant { .. }));
}
