//! Property tests: cloning and isomorphism laws over arbitrary expression
//! trees.
//!
//! Graphs contain `Rc` internals, so strategies generate a plain recipe
//! first and build the graph from it inside the property.

use std::rc::Rc;

use proptest::prelude::*;

use crate::clone::clone_graph;
use crate::graph::Graph;
use crate::isomorphism::isomorphic;
use crate::node::Node;
use crate::traverse::toposort;
use crate::value::{Primitive, Value};

const OPS: [&str; 4] = ["P", "Q", "R", "S"];
const PARAMS: usize = 3;

#[derive(Debug, Clone)]
enum Recipe {
    Param(usize),
    Const(i64),
    Apply(usize, Vec<Recipe>),
}

fn recipe_strategy() -> impl Strategy<Value = Recipe> {
    let leaf = prop_oneof![
        (0..PARAMS).prop_map(Recipe::Param),
        (-8i64..8).prop_map(Recipe::Const),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        (0..OPS.len(), prop::collection::vec(inner, 1..4))
            .prop_map(|(op, args)| Recipe::Apply(op, args))
    })
}

fn build_node(recipe: &Recipe, graph: &Rc<Graph>, params: &[Rc<Node>]) -> Rc<Node> {
    match recipe {
        Recipe::Param(i) => params[i % PARAMS].clone(),
        Recipe::Const(v) => Node::constant(*v),
        Recipe::Apply(op, args) => {
            let mut inputs = vec![Node::constant(Value::Prim(Primitive::new(OPS[op % OPS.len()])))];
            inputs.extend(args.iter().map(|arg| build_node(arg, graph, params)));
            graph.apply(inputs)
        }
    }
}

fn build_graph(recipe: &Recipe) -> Rc<Graph> {
    let g = Graph::named("gen");
    let params: Vec<Rc<Node>> = (0..PARAMS).map(|i| g.add_parameter(format!("p{i}"))).collect();
    let out = build_node(recipe, &g, &params);
    g.set_output(out);
    g
}

proptest! {
    #[test]
    fn clone_is_isomorphic(recipe in recipe_strategy()) {
        let g = build_graph(&recipe);
        let copy = clone_graph(&g).unwrap();
        prop_assert!(isomorphic(&g, &copy).unwrap());
        prop_assert!(isomorphic(&copy, &g).unwrap());
    }

    #[test]
    fn isomorphism_is_reflexive(recipe in recipe_strategy()) {
        let g = build_graph(&recipe);
        prop_assert!(isomorphic(&g, &g).unwrap());
    }

    #[test]
    fn toposort_orders_dependencies_first(recipe in recipe_strategy()) {
        let g = build_graph(&recipe);
        let sorted = toposort(&g.output().unwrap());
        let position = |id: u64| sorted.iter().position(|n| n.id() == id);
        for node in &sorted {
            let here = position(node.id()).unwrap();
            for input in node.inputs().unwrap_or_default() {
                prop_assert!(position(input.id()).unwrap() < here);
            }
        }
    }
}
