//! Total graph cloning.
//!
//! A total clone copies every graph transitively reachable from the root,
//! preserving arities, constant values, annotations, and closure-capture
//! topology, with fresh identities throughout. Graph shells (and their
//! parameters) are created before any body is cloned, so self-referential
//! graphs terminate.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Result, StructuralInvariantSnafu};
use crate::graph::Graph;
use crate::node::Node;
use crate::traverse::reachable_graphs;
use crate::value::Value;

#[derive(Debug)]
pub struct GraphCloner {
    graph_map: HashMap<u64, Rc<Graph>>,
    node_map: HashMap<u64, Rc<Node>>,
}

impl GraphCloner {
    /// Clone `root` and every graph reachable from it.
    pub fn total(root: &Rc<Graph>) -> Result<GraphCloner> {
        let graphs = reachable_graphs(root);
        let mut cloner = GraphCloner { graph_map: HashMap::new(), node_map: HashMap::new() };

        for graph in &graphs {
            let copy = Graph::new();
            copy.set_name(graph.name());
            for param in graph.parameters() {
                let param_copy = copy.add_parameter(param.parameter_name().unwrap_or_default());
                param_copy.set_annotation(param.annotation());
                cloner.node_map.insert(param.id(), param_copy);
            }
            cloner.graph_map.insert(graph.id(), copy);
        }

        for graph in &graphs {
            let output = graph.output().ok_or_else(|| {
                StructuralInvariantSnafu {
                    reason: format!("graph {} has no output", graph.label()),
                }
                .build()
            })?;
            let output_copy = cloner.clone_node(&output)?;
            cloner.graph_map[&graph.id()].set_output(output_copy);
        }
        Ok(cloner)
    }

    fn clone_node(&mut self, node: &Rc<Node>) -> Result<Rc<Node>> {
        if let Some(copy) = self.node_map.get(&node.id()) {
            return Ok(copy.clone());
        }
        let copy = if let Some(inputs) = node.inputs() {
            let input_copies =
                inputs.iter().map(|input| self.clone_node(input)).collect::<Result<Vec<_>>>()?;
            match node.owner().and_then(|g| self.graph_map.get(&g.id()).cloned()) {
                Some(owner) => owner.apply(input_copies),
                None => Node::apply(input_copies),
            }
        } else if let Some(value) = node.value() {
            let value = match value {
                Value::Graph(nested) => {
                    // Reachable graphs were all shelled above; anything else
                    // stays shared with the original.
                    Value::Graph(self.graph_map.get(&nested.id()).cloned().unwrap_or(nested))
                }
                other => other,
            };
            Node::constant(value)
        } else {
            // A parameter that was not pre-seeded belongs to a graph outside
            // the clone set: a dangling free reference.
            return StructuralInvariantSnafu {
                reason: format!("parameter {} refers to an unreachable graph", node.id()),
            }
            .fail();
        };
        copy.set_annotation(node.annotation());
        self.node_map.insert(node.id(), copy.clone());
        Ok(copy)
    }

    /// The clone of a graph, if it was in the cloned set.
    pub fn get(&self, graph: &Rc<Graph>) -> Option<Rc<Graph>> {
        self.graph_map.get(&graph.id()).cloned()
    }

    /// The clone of a node, if it was reachable.
    pub fn node(&self, node: &Rc<Node>) -> Option<Rc<Node>> {
        self.node_map.get(&node.id()).cloned()
    }
}

/// Convenience wrapper: the total clone of `root` itself.
pub fn clone_graph(root: &Rc<Graph>) -> Result<Rc<Graph>> {
    let cloner = GraphCloner::total(root)?;
    Ok(cloner.get(root).expect("root graph is always in the clone set"))
}
