//! Graphs: ordered parameters plus one designated output node.
//!
//! A graph may be nested inside another: an apply node whose operation
//! position is a graph-valued constant is a call, and a nested graph's body
//! may reference nodes owned by an enclosing graph (a free variable). The
//! cross-graph reference invariant is enforced by the manager, not here.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::manager::{Manager, ManagerInner};
use crate::node::{Node, next_id};
use crate::value::Value;

pub struct Graph {
    id: u64,
    name: RefCell<Option<String>>,
    parameters: RefCell<Vec<Rc<Node>>>,
    output: RefCell<Option<Rc<Node>>>,
    pub(crate) manager: RefCell<Option<Weak<ManagerInner>>>,
}

impl Graph {
    pub fn new() -> Rc<Graph> {
        Rc::new(Graph {
            id: next_id(),
            name: RefCell::new(None),
            parameters: RefCell::new(Vec::new()),
            output: RefCell::new(None),
            manager: RefCell::new(None),
        })
    }

    pub fn named(name: impl Into<String>) -> Rc<Graph> {
        let g = Self::new();
        g.set_name(Some(name.into()));
        g
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: Option<String>) {
        *self.name.borrow_mut() = name;
    }

    /// Debug label: the name if set, otherwise `g<id>`.
    pub fn label(&self) -> String {
        self.name().unwrap_or_else(|| format!("g{}", self.id))
    }

    /// Append a fresh parameter owned by this graph.
    pub fn add_parameter(self: &Rc<Self>, name: impl Into<String>) -> Rc<Node> {
        let param = Node::parameter(Some(name.into()), self);
        self.parameters.borrow_mut().push(param.clone());
        param
    }

    pub fn parameters(&self) -> Vec<Rc<Node>> {
        self.parameters.borrow().clone()
    }

    pub fn output(&self) -> Option<Rc<Node>> {
        self.output.borrow().clone()
    }

    pub fn set_output(&self, node: Rc<Node>) {
        *self.output.borrow_mut() = Some(node);
    }

    /// Create an apply node owned by this graph.
    pub fn apply(self: &Rc<Self>, inputs: Vec<Rc<Node>>) -> Rc<Node> {
        Node::apply_in(inputs, self)
    }

    /// A graph-valued constant referencing this graph, for use in the
    /// operation position of a call.
    pub fn as_operand(self: &Rc<Self>) -> Rc<Node> {
        Node::constant(Value::Graph(self.clone()))
    }

    /// The manager this graph is registered with, if any.
    pub fn manager(&self) -> Option<Manager> {
        self.manager.borrow().as_ref().and_then(Weak::upgrade).map(Manager::from_inner)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("name", &*self.name.borrow())
            .finish_non_exhaustive()
    }
}

/// Wrapper implementing `Eq`/`Ord`/`Hash` over a graph's stable id.
#[derive(Clone)]
pub struct GraphKey(pub Rc<Graph>);

impl fmt::Debug for GraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphKey(id={})", self.0.id())
    }
}

impl PartialEq for GraphKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }
}

impl Eq for GraphKey {}

impl PartialOrd for GraphKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GraphKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.id().cmp(&other.0.id())
    }
}

impl Hash for GraphKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id().hash(state);
    }
}
