//! Reachability and dependency-order traversal.
//!
//! Traversal follows apply inputs and, through graph-valued constants, the
//! parameters and output of nested graphs. All orders are deterministic:
//! breadth-first in discovery order for reachability, iterative post-order
//! for topological sorting. Cycles (self-referential graphs) are broken by
//! an id-keyed seen set.

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use crate::graph::Graph;
use crate::node::Node;

/// Successor edges of a node: apply inputs, plus the parameters and output of
/// a graph referenced by a graph-valued constant.
pub(crate) fn successors(node: &Rc<Node>) -> Vec<Rc<Node>> {
    if let Some(inputs) = node.inputs() {
        return inputs;
    }
    if let Some(graph) = node.graph_value() {
        let mut succ = graph.parameters();
        succ.extend(graph.output());
        return succ;
    }
    Vec::new()
}

/// Every node reachable from `roots`, breadth-first, deduplicated by id.
pub fn reachable_nodes(roots: &[Rc<Node>]) -> Vec<Rc<Node>> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<Rc<Node>> = VecDeque::new();
    for root in roots {
        if seen.insert(root.id()) {
            queue.push_back(root.clone());
        }
    }
    while let Some(node) = queue.pop_front() {
        for succ in successors(&node) {
            if seen.insert(succ.id()) {
                queue.push_back(succ.clone());
            }
        }
        order.push(node);
    }
    order
}

/// Every graph reachable from `root` (through graph-valued constants in
/// outputs), `root` first.
pub fn reachable_graphs(root: &Rc<Graph>) -> Vec<Rc<Graph>> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<Rc<Graph>> = VecDeque::new();
    seen.insert(root.id());
    queue.push_back(root.clone());
    while let Some(graph) = queue.pop_front() {
        let roots: Vec<Rc<Node>> = graph.output().into_iter().collect();
        for node in reachable_nodes(&roots) {
            if let Some(nested) = node.graph_value()
                && seen.insert(nested.id())
            {
                queue.push_back(nested);
            }
        }
        order.push(graph);
    }
    order
}

/// Dependency order from `root`: every input (and nested-graph body) comes
/// before the node that uses it; shared nodes appear once.
///
/// On a cyclic graph (a recursive function) the back edge is skipped rather
/// than diverging.
pub fn toposort(root: &Rc<Node>) -> Vec<Rc<Node>> {
    let mut order = Vec::new();
    let mut done: HashSet<u64> = HashSet::new();
    let mut expanded: HashSet<u64> = HashSet::new();
    let mut stack: Vec<(Rc<Node>, bool)> = vec![(root.clone(), false)];
    while let Some((node, children_visited)) = stack.pop() {
        if children_visited {
            if done.insert(node.id()) {
                order.push(node);
            }
            continue;
        }
        if done.contains(&node.id()) || !expanded.insert(node.id()) {
            continue;
        }
        stack.push((node.clone(), true));
        for succ in successors(&node).into_iter().rev() {
            if !done.contains(&succ.id()) {
                stack.push((succ, false));
            }
        }
    }
    order
}
