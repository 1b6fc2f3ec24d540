//! Common-subexpression elimination.
//!
//! A single dependency-order pass over a graph's reachable nodes. The dedup
//! table keys constants by value, parameters by identity, and applies by
//! their owning graph plus input identities. Inputs are visited before their
//! users and `Manager::replace` rewires in place, so by the time a node is
//! keyed its live inputs are already canonical.
//!
//! Applies dedup only within their owning graph: merging across a closure
//! boundary could leave an enclosing graph referencing a node owned by a
//! nested one, which the ownership invariant forbids in that direction.

use std::collections::HashMap;
use std::rc::Rc;

use graft_ir::error::StructuralInvariantSnafu;
use graft_ir::{Graph, Manager, Node, ValueKey, toposort};
use smallvec::SmallVec;

use crate::error::Result;

#[derive(PartialEq, Eq, Hash)]
enum CseKey {
    Constant(ValueKey),
    Identity(u64),
    Apply { owner: Option<u64>, inputs: SmallVec<[u64; 4]> },
}

fn key_of(node: &Rc<Node>) -> CseKey {
    if let Some(value) = node.value() {
        CseKey::Constant(ValueKey(value))
    } else if let Some(inputs) = node.inputs() {
        CseKey::Apply {
            owner: node.owner().map(|g| g.id()),
            inputs: inputs.iter().map(|input| input.id()).collect(),
        }
    } else {
        CseKey::Identity(node.id())
    }
}

/// Deduplicate structurally identical subexpressions under `graph`,
/// aliasing each duplicate to one representative. Never increases the node
/// count and never changes operation semantics.
pub fn cse(graph: &Rc<Graph>, manager: &Manager) -> Result<Rc<Graph>> {
    let output = graph.output().ok_or_else(|| {
        StructuralInvariantSnafu { reason: format!("graph {} has no output", graph.label()) }
            .build()
    })?;

    let mut table: HashMap<CseKey, Rc<Node>> = HashMap::new();
    for node in toposort(&output) {
        // replaced earlier in this pass
        if !manager.contains_node(&node) {
            continue;
        }
        match table.entry(key_of(&node)) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                let representative = entry.get().clone();
                if !Rc::ptr_eq(&representative, &node) {
                    tracing::debug!(
                        duplicate = node.id(),
                        representative = representative.id(),
                        "cse merge"
                    );
                    manager.replace(&node, &representative)?;
                }
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(node);
            }
        }
    }
    Ok(graph.clone())
}
