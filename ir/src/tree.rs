//! Tree visualization for node graphs.
//!
//! Pretty-prints a node's subtree as an ASCII tree. Shared nodes (a node may
//! be used by many applies) are shown once and referenced back afterwards.
//! Graph-valued constants render as `GRAPH(name)` without descending, so a
//! recursive graph prints finitely.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;

use ptree::{Style, TreeItem};

use crate::graph::Graph;
use crate::node::Node;
use crate::value::Value;

/// Compact renderer with back-references for shared nodes.
#[derive(Clone)]
pub struct NodeTree {
    node: Rc<Node>,
    visited: Rc<RefCell<HashSet<u64>>>,
    /// True if this node was already visited when write_self was called.
    is_backref: RefCell<bool>,
}

impl NodeTree {
    pub fn new(node: &Rc<Node>) -> Self {
        Self {
            node: node.clone(),
            visited: Rc::new(RefCell::new(HashSet::new())),
            is_backref: RefCell::new(false),
        }
    }

    fn from_child(node: Rc<Node>, visited: Rc<RefCell<HashSet<u64>>>) -> Self {
        Self { node, visited, is_backref: RefCell::new(false) }
    }
}

impl TreeItem for NodeTree {
    type Child = NodeTree;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        let mut visited = self.visited.borrow_mut();
        if visited.contains(&self.node.id()) {
            *self.is_backref.borrow_mut() = true;
            write!(f, "[{}] -> (see above)", self.node.id())
        } else {
            visited.insert(self.node.id());
            write!(f, "{}", format_node(&self.node))
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        if *self.is_backref.borrow() {
            return Cow::Borrowed(&[]);
        }
        let children: Vec<_> = self
            .node
            .inputs()
            .unwrap_or_default()
            .into_iter()
            .map(|input| NodeTree::from_child(input, self.visited.clone()))
            .collect();
        Cow::Owned(children)
    }
}

/// Format a single node: `[id] KIND(detail)` plus the annotation if present.
fn format_node(node: &Rc<Node>) -> String {
    let body = if let Some(value) = node.value() {
        match value {
            Value::Prim(p) => format!("PRIM({p})"),
            Value::Graph(g) => format!("GRAPH({})", g.label()),
            other => format!("CONST({other:?})"),
        }
    } else if node.is_parameter() {
        format!("PARAM({})", node.parameter_name().unwrap_or_else(|| format!("%{}", node.id())))
    } else {
        "APPLY".to_string()
    };
    match node.annotation() {
        Some(tag) => format!("[{}] {} : {}", node.id(), body, tag.as_str()),
        None => format!("[{}] {}", node.id(), body),
    }
}

/// Render a node's subtree as an ASCII tree string.
pub fn render_tree(node: &Rc<Node>) -> String {
    let tree = NodeTree::new(node);
    let mut buf = Vec::new();
    ptree::write_tree(&tree, &mut buf).expect("tree rendering failed");
    String::from_utf8(buf).expect("invalid utf8 in tree")
}

/// Render a graph: a header with its parameters, then its output tree.
pub fn render_graph(graph: &Rc<Graph>) -> String {
    let params: Vec<String> = graph
        .parameters()
        .iter()
        .map(|p| p.parameter_name().unwrap_or_else(|| format!("%{}", p.id())))
        .collect();
    let body = match graph.output() {
        Some(output) => render_tree(&output),
        None => "<no output>\n".to_string(),
    };
    format!("graph {}({})\n{}", graph.label(), params.join(", "), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Primitive;

    #[test]
    fn shared_nodes_render_as_backrefs() {
        let g = Graph::named("f");
        let x = g.add_parameter("x");
        let add = Node::constant(Value::Prim(Primitive::new("add")));
        let sum = g.apply(vec![add, x.clone(), x.clone()]);
        let out = render_tree(&sum);
        assert!(out.contains("APPLY"));
        assert!(out.contains("PARAM(x)"));
        assert!(out.contains("(see above)"));
    }

    #[test]
    fn recursive_graph_renders_finitely() {
        let g = Graph::named("loop");
        let x = g.add_parameter("x");
        g.set_output(g.apply(vec![g.as_operand(), x]));
        let out = render_graph(&g);
        assert!(out.contains("GRAPH(loop)"));
    }
}
