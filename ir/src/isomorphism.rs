//! Structural equality up to renaming.
//!
//! Two graphs are isomorphic when a single consistent correspondence exists:
//! a bijection between their parameters, value equality between their
//! constants, and a position-wise correspondence between their apply nodes,
//! extending through nested graphs and free-variable references. The check
//! is coinductive: a node pair is recorded before its inputs are compared,
//! so a repeated pair (a cycle through a recursive graph) is trivially equal
//! instead of recursing forever.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Result, StructuralInvariantSnafu};
use crate::graph::Graph;
use crate::node::Node;
use crate::value::Value;

#[derive(Default)]
struct Correspondence {
    graph_fwd: HashMap<u64, u64>,
    graph_rev: HashMap<u64, u64>,
    node_fwd: HashMap<u64, u64>,
    node_rev: HashMap<u64, u64>,
}

impl Correspondence {
    /// Record a node pair; false when either side is already paired with a
    /// different partner (a sharing or bijectivity mismatch).
    fn pair_nodes(&mut self, a: &Rc<Node>, b: &Rc<Node>) -> bool {
        match (self.node_fwd.get(&a.id()), self.node_rev.get(&b.id())) {
            (Some(&fwd), Some(&rev)) => fwd == b.id() && rev == a.id(),
            (None, None) => {
                self.node_fwd.insert(a.id(), b.id());
                self.node_rev.insert(b.id(), a.id());
                true
            }
            _ => false,
        }
    }

    fn graphs_match(&mut self, a: &Rc<Graph>, b: &Rc<Graph>) -> Result<bool> {
        if let Some(&mapped) = self.graph_fwd.get(&a.id()) {
            return Ok(mapped == b.id() && self.graph_rev.get(&b.id()) == Some(&a.id()));
        }
        if self.graph_rev.contains_key(&b.id()) {
            return Ok(false);
        }
        let (params_a, params_b) = (a.parameters(), b.parameters());
        if params_a.len() != params_b.len() {
            return Ok(false);
        }
        self.graph_fwd.insert(a.id(), b.id());
        self.graph_rev.insert(b.id(), a.id());
        for (pa, pb) in params_a.iter().zip(&params_b) {
            if !self.pair_nodes(pa, pb) {
                return Ok(false);
            }
        }
        let output_a = required_output(a)?;
        let output_b = required_output(b)?;
        self.nodes_match(&output_a, &output_b)
    }

    fn nodes_match(&mut self, a: &Rc<Node>, b: &Rc<Node>) -> Result<bool> {
        if let Some(&mapped) = self.node_fwd.get(&a.id()) {
            return Ok(mapped == b.id() && self.node_rev.get(&b.id()) == Some(&a.id()));
        }

        if a.is_parameter() || b.is_parameter() {
            // Parameters are paired when their graph pair is entered; an
            // unpaired parameter either pairs differently (not isomorphic)
            // or refers to a graph outside the correspondence (malformed).
            if !a.is_parameter() || !b.is_parameter() {
                return Ok(false);
            }
            self.check_in_scope(a, |g| self.graph_fwd.contains_key(&g.id()))?;
            self.check_in_scope(b, |g| self.graph_rev.contains_key(&g.id()))?;
            return Ok(false);
        }

        match (a.value(), b.value()) {
            (Some(Value::Graph(ga)), Some(Value::Graph(gb))) => {
                return self.graphs_match(&ga, &gb);
            }
            (Some(va), Some(vb)) => return Ok(va == vb),
            (Some(_), None) | (None, Some(_)) => return Ok(false),
            (None, None) => {}
        }

        let (Some(inputs_a), Some(inputs_b)) = (a.inputs(), b.inputs()) else {
            return Ok(false);
        };
        if inputs_a.len() != inputs_b.len() {
            return Ok(false);
        }
        if !self.pair_nodes(a, b) {
            return Ok(false);
        }
        for (ia, ib) in inputs_a.iter().zip(&inputs_b) {
            if !self.nodes_match(ia, ib)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_in_scope(&self, param: &Rc<Node>, known: impl Fn(&Rc<Graph>) -> bool) -> Result<()> {
        let owner = param.owner().ok_or_else(|| {
            StructuralInvariantSnafu {
                reason: format!("parameter {} has no owning graph", param.id()),
            }
            .build()
        })?;
        if !known(&owner) {
            return StructuralInvariantSnafu {
                reason: format!(
                    "parameter {} refers to graph {} outside the compared graphs",
                    param.id(),
                    owner.label()
                ),
            }
            .fail();
        }
        Ok(())
    }
}

fn required_output(graph: &Rc<Graph>) -> Result<Rc<Node>> {
    graph.output().ok_or_else(|| {
        StructuralInvariantSnafu { reason: format!("graph {} has no output", graph.label()) }
            .build()
    })
}

/// Structural equality of two graphs, tolerant of parameter and constant
/// renaming but not of structural or closure differences.
///
/// Errors only on malformed input (dangling free references, missing
/// outputs); those are distinct from a `false` result.
pub fn isomorphic(a: &Rc<Graph>, b: &Rc<Graph>) -> Result<bool> {
    Correspondence::default().graphs_match(a, b)
}
