//! IR nodes.
//!
//! Nodes are shared through `Rc` and mutated through `RefCell`; the core is
//! single-threaded, and every structural mutation of a *managed* node must go
//! through [`Manager::replace`](crate::manager::Manager::replace) so the
//! use/user indices stay consistent.

use std::cell::{Ref, RefCell};
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::graph::Graph;
use crate::manager::ManagerInner;
use crate::value::Value;

// Global atomic counter for stable ids shared by nodes, graphs, and managers.
//
// Ids are monotonic and never reused, so they double as a deterministic
// ordering key for work-lists and index iteration.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_id() -> u64 {
    ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Opaque inferred-type annotation.
///
/// Written and interpreted by the external inference pass; this core only
/// stores it and never copies it onto freshly created nodes, so a downstream
/// re-validation pass can detect rewritten regions by their missing
/// annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeTag(Rc<str>);

impl TypeTag {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(Rc::from(tag.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Node payload variants.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Immutable literal or operation/graph reference; equality is value
    /// equality.
    Constant(Value),
    /// Formal parameter of exactly one graph; identity-significant.
    Parameter { name: Option<String> },
    /// Application of `inputs[0]` to `inputs[1..]`; the input sequence is
    /// replaceable in place.
    Apply(Vec<Rc<Node>>),
}

/// A node in the IR graph.
#[derive(derive_more::Debug)]
pub struct Node {
    id: u64,
    kind: RefCell<NodeKind>,
    /// Owning graph for parameters and applies; `None` for constants, which
    /// are graph-less and shared.
    #[debug(skip)]
    owner: RefCell<Option<Weak<Graph>>>,
    annotation: RefCell<Option<TypeTag>>,
    #[debug(skip)]
    pub(crate) manager: RefCell<Option<Weak<ManagerInner>>>,
}

impl Node {
    fn with_kind(kind: NodeKind, owner: Option<&Rc<Graph>>) -> Rc<Node> {
        Rc::new(Node {
            id: next_id(),
            kind: RefCell::new(kind),
            owner: RefCell::new(owner.map(Rc::downgrade)),
            annotation: RefCell::new(None),
            manager: RefCell::new(None),
        })
    }

    /// Create a constant node.
    pub fn constant(value: impl Into<Value>) -> Rc<Node> {
        Self::with_kind(NodeKind::Constant(value.into()), None)
    }

    /// Create an apply node with no owning graph.
    ///
    /// The node is adopted by the graph through which it is first reached at
    /// manage time; use [`Graph::apply`] when the owner is known.
    pub fn apply(inputs: Vec<Rc<Node>>) -> Rc<Node> {
        Self::with_kind(NodeKind::Apply(inputs), None)
    }

    pub(crate) fn apply_in(inputs: Vec<Rc<Node>>, owner: &Rc<Graph>) -> Rc<Node> {
        Self::with_kind(NodeKind::Apply(inputs), Some(owner))
    }

    pub(crate) fn parameter(name: Option<String>, owner: &Rc<Graph>) -> Rc<Node> {
        Self::with_kind(NodeKind::Parameter { name }, Some(owner))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn kind(&self) -> Ref<'_, NodeKind> {
        self.kind.borrow()
    }

    pub fn is_constant(&self) -> bool {
        matches!(&*self.kind.borrow(), NodeKind::Constant(_))
    }

    pub fn is_parameter(&self) -> bool {
        matches!(&*self.kind.borrow(), NodeKind::Parameter { .. })
    }

    pub fn is_apply(&self) -> bool {
        matches!(&*self.kind.borrow(), NodeKind::Apply(_))
    }

    /// The constant's value, if this is a constant node.
    pub fn value(&self) -> Option<Value> {
        match &*self.kind.borrow() {
            NodeKind::Constant(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// The referenced graph, if this is a graph-valued constant.
    pub fn graph_value(&self) -> Option<Rc<Graph>> {
        match &*self.kind.borrow() {
            NodeKind::Constant(Value::Graph(g)) => Some(g.clone()),
            _ => None,
        }
    }

    pub fn parameter_name(&self) -> Option<String> {
        match &*self.kind.borrow() {
            NodeKind::Parameter { name } => name.clone(),
            _ => None,
        }
    }

    /// The input sequence, if this is an apply node.
    pub fn inputs(&self) -> Option<Vec<Rc<Node>>> {
        match &*self.kind.borrow() {
            NodeKind::Apply(inputs) => Some(inputs.clone()),
            _ => None,
        }
    }

    pub fn input(&self, index: usize) -> Option<Rc<Node>> {
        match &*self.kind.borrow() {
            NodeKind::Apply(inputs) => inputs.get(index).cloned(),
            _ => None,
        }
    }

    /// Replace the whole input sequence of an apply node.
    ///
    /// For managed nodes this bypasses the manager's indices; use
    /// [`Manager::replace`](crate::manager::Manager::replace) instead.
    pub fn set_inputs(&self, inputs: Vec<Rc<Node>>) {
        if let NodeKind::Apply(slots) = &mut *self.kind.borrow_mut() {
            *slots = inputs;
        }
    }

    pub(crate) fn set_input(&self, index: usize, node: Rc<Node>) {
        if let NodeKind::Apply(slots) = &mut *self.kind.borrow_mut() {
            slots[index] = node;
        }
    }

    pub fn owner(&self) -> Option<Rc<Graph>> {
        self.owner.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_owner(&self, owner: &Rc<Graph>) {
        *self.owner.borrow_mut() = Some(Rc::downgrade(owner));
    }

    pub fn annotation(&self) -> Option<TypeTag> {
        self.annotation.borrow().clone()
    }

    pub fn set_annotation(&self, tag: Option<TypeTag>) {
        *self.annotation.borrow_mut() = tag;
    }
}

/// Wrapper implementing `Eq`/`Ord`/`Hash` over a node's stable id.
///
/// Lets `Rc<Node>` participate in maps and ordered sets without hashing
/// through interior-mutable fields.
#[derive(Clone)]
pub struct NodeKey(pub Rc<Node>);

impl std::fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeKey(id={})", self.0.id())
    }
}

impl PartialEq for NodeKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }
}

impl Eq for NodeKey {}

impl PartialOrd for NodeKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.id().cmp(&other.0.id())
    }
}

impl Hash for NodeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id().hash(state);
    }
}
