//! Building graphs from pattern trees.
//!
//! Callers (and tests) often want a one-off graph for a small expression;
//! `sexp_to_graph` turns a pattern tree into one, with variables becoming
//! parameters in first-occurrence order.

use std::rc::Rc;

use graft_ir::{Graph, Node};

use crate::pattern::{Env, Pattern};

fn sexp_to_node(sexp: &Pattern, graph: &Rc<Graph>, env: &mut Env) -> Rc<Node> {
    match sexp {
        Pattern::Value(value) => Node::constant(value.clone()),
        Pattern::Var(pattern_var) => match env.get(pattern_var.name()) {
            Some(param) => param.clone(),
            None => {
                let param = graph.add_parameter(pattern_var.name());
                env.bind_param(pattern_var.name(), param.clone());
                param
            }
        },
        Pattern::Apply(items) => {
            let inputs = items.iter().map(|item| sexp_to_node(item, graph, env)).collect();
            graph.apply(inputs)
        }
    }
}

/// Build a graph whose output is the tree described by `sexp`. Each distinct
/// variable becomes one parameter, ordered by first occurrence; repeated
/// variables share the parameter.
pub fn sexp_to_graph(sexp: &Pattern) -> Rc<Graph> {
    let graph = Graph::new();
    let mut env = Env::new();
    let output = sexp_to_node(sexp, &graph, &mut env);
    graph.set_output(output);
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::var;
    use graft_ir::{Primitive, Value, isomorphic};

    #[test]
    fn constants_only() {
        // 10 * (5 + 4)
        let mul = Primitive::new("mul");
        let add = Primitive::new("add");
        let sexp = Pattern::apply(vec![
            (&mul).into(),
            10.into(),
            Pattern::apply(vec![(&add).into(), 5.into(), Pattern::from(Value::Int(4))]),
        ]);
        let g = sexp_to_graph(&sexp);

        let by_hand = Graph::new();
        let inner = by_hand.apply(vec![
            Node::constant(Value::Prim(add)),
            Node::constant(5),
            Node::constant(4),
        ]);
        by_hand.set_output(by_hand.apply(vec![Node::constant(Value::Prim(mul)), Node::constant(10), inner]));

        assert!(isomorphic(&g, &by_hand).unwrap());
    }

    #[test]
    fn variables_become_shared_parameters() {
        let add = Primitive::new("add");
        let sexp = Pattern::apply(vec![(&add).into(), var("x"), var("x")]);
        let g = sexp_to_graph(&sexp);

        assert_eq!(g.parameters().len(), 1);
        let inputs = g.output().unwrap().inputs().unwrap();
        assert!(Rc::ptr_eq(&inputs[1], &inputs[2]));
    }
}
