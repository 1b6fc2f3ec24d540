//! Graph ownership and the atomic replacement primitive.
//!
//! The manager is the single synchronization point for structural mutation:
//! it owns the set of managed graphs and nodes, a users index (for every
//! node, which apply nodes reference it and at which input position), and
//! per-graph membership. [`Manager::replace`] rewires every use of a node in
//! one step and reclaims whatever became unreachable, including nested
//! graphs no longer referenced by any constant.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::rc::{Rc, Weak};

use crate::error::{OwnershipConflictSnafu, Result, StructuralInvariantSnafu};
use crate::graph::Graph;
use crate::node::{Node, NodeKind, next_id};
use crate::value::Value;

pub(crate) struct ManagerInner {
    id: u64,
    state: std::cell::RefCell<State>,
}

#[derive(Default)]
struct State {
    /// Graphs explicitly passed to `manage`; pinned against reclamation.
    roots: Vec<Rc<Graph>>,
    /// All managed graphs, id-ordered.
    graphs: BTreeMap<u64, Rc<Graph>>,
    /// All managed nodes, id-ordered.
    nodes: BTreeMap<u64, Rc<Node>>,
    /// node id -> ordered (user id, input position) pairs.
    users: HashMap<u64, BTreeSet<(u64, usize)>>,
    /// graph id -> ids of the parameters and applies it owns.
    members: HashMap<u64, BTreeSet<u64>>,
    /// graph id -> ids of the managed constants referencing it.
    graph_refs: HashMap<u64, BTreeSet<u64>>,
}

/// Handle to a manager; cheap to clone, compares by identity.
#[derive(Clone)]
pub struct Manager {
    inner: Rc<ManagerInner>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Manager")
            .field("id", &self.inner.id)
            .field("graphs", &state.graphs.len())
            .field("nodes", &state.nodes.len())
            .finish()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ManagerInner { id: next_id(), state: std::cell::RefCell::new(State::default()) }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<ManagerInner>) -> Self {
        Self { inner }
    }

    /// Register `graphs` and everything transitively reachable from them.
    ///
    /// Nested graphs are discovered through graph-valued constants. Fails
    /// with [`Error::OwnershipConflict`](crate::error::Error) if any node or
    /// graph already belongs to a different manager, and with
    /// `StructuralInvariant` if a reachable parameter's owning graph is not
    /// itself reachable (a dangling free reference) or a graph has no output.
    pub fn manage(&self, graphs: &[Rc<Graph>]) -> Result<()> {
        let mut state = self.inner.state.borrow_mut();
        let mut adopted = Vec::new();
        for graph in graphs {
            if !state.roots.iter().any(|g| Rc::ptr_eq(g, graph)) {
                state.roots.push(graph.clone());
            }
            self.adopt_graph(&mut state, graph, &mut adopted)?;
        }
        self.verify_ownership(&state, &adopted)
    }

    /// Rewire every use of `old` to `new`, then reclaim whatever became
    /// unreachable.
    ///
    /// A no-op when `old` and `new` are the same node. `new`'s subtree is
    /// adopted first, so replacements may mix fresh nodes with aliases of
    /// pre-existing managed structure. Calling this with `new` reachable from
    /// `old` is a caller error: the indices stay consistent, but the
    /// resulting program is undefined.
    pub fn replace(&self, old: &Rc<Node>, new: &Rc<Node>) -> Result<()> {
        if Rc::ptr_eq(old, new) {
            return Ok(());
        }
        let mut state = self.inner.state.borrow_mut();

        let mut adopted = Vec::new();
        self.adopt_tree(&mut state, new, old.owner().as_ref(), &mut adopted)?;
        self.verify_ownership(&state, &adopted)?;

        let uses: Vec<(u64, usize)> =
            state.users.remove(&old.id()).map(|set| set.into_iter().collect()).unwrap_or_default();
        for &(user_id, position) in &uses {
            let user = state.nodes.get(&user_id).cloned();
            if let Some(user) = user {
                user.set_input(position, new.clone());
                state.users.entry(new.id()).or_default().insert((user_id, position));
            }
        }

        let retargeted: Vec<Rc<Graph>> = state
            .graphs
            .values()
            .filter(|g| g.output().is_some_and(|out| Rc::ptr_eq(&out, old)))
            .cloned()
            .collect();
        for graph in &retargeted {
            graph.set_output(new.clone());
        }

        tracing::debug!(
            old = old.id(),
            new = new.id(),
            users = uses.len(),
            outputs = retargeted.len(),
            "replace"
        );

        release_if_dead(&mut state, old);
        Ok(())
    }

    /// Current (user node, input position) pairs referencing `node`, in
    /// (id, position) order.
    pub fn users_of(&self, node: &Rc<Node>) -> Vec<(Rc<Node>, usize)> {
        let state = self.inner.state.borrow();
        state
            .users
            .get(&node.id())
            .map(|set| {
                set.iter()
                    .filter_map(|&(user_id, position)| {
                        state.nodes.get(&user_id).map(|user| (user.clone(), position))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains_node(&self, node: &Rc<Node>) -> bool {
        self.inner.state.borrow().nodes.contains_key(&node.id())
    }

    pub fn contains_graph(&self, graph: &Rc<Graph>) -> bool {
        self.inner.state.borrow().graphs.contains_key(&graph.id())
    }

    /// All managed graphs in id order.
    pub fn graphs(&self) -> Vec<Rc<Graph>> {
        self.inner.state.borrow().graphs.values().cloned().collect()
    }

    pub fn roots(&self) -> Vec<Rc<Graph>> {
        self.inner.state.borrow().roots.clone()
    }

    /// All managed nodes in id order; the equilibrium work-list seed.
    pub fn all_nodes(&self) -> Vec<Rc<Node>> {
        self.inner.state.borrow().nodes.values().cloned().collect()
    }

    /// The parameters and apply nodes owned by `graph`, in id order.
    /// Constants are graph-less and never counted here.
    pub fn nodes_of(&self, graph: &Rc<Graph>) -> Vec<Rc<Node>> {
        let state = self.inner.state.borrow();
        state
            .members
            .get(&graph.id())
            .map(|ids| ids.iter().filter_map(|id| state.nodes.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self, graph: &Rc<Graph>) -> usize {
        self.inner.state.borrow().members.get(&graph.id()).map_or(0, BTreeSet::len)
    }

    /// Nodes captured by `graph` from enclosing graphs: inputs of its apply
    /// nodes (and its output) owned by a different graph. Computed on
    /// demand, id-ordered.
    pub fn free_variables(&self, graph: &Rc<Graph>) -> Vec<Rc<Node>> {
        let state = self.inner.state.borrow();
        let mut free: BTreeMap<u64, Rc<Node>> = BTreeMap::new();
        let mut consider = |node: &Rc<Node>| {
            if let Some(owner) = node.owner()
                && owner.id() != graph.id()
            {
                free.insert(node.id(), node.clone());
            }
        };
        if let Some(members) = state.members.get(&graph.id()) {
            for id in members {
                let Some(node) = state.nodes.get(id) else { continue };
                for input in node.inputs().unwrap_or_default() {
                    consider(&input);
                }
            }
        }
        if let Some(out) = graph.output() {
            consider(&out);
        }
        free.into_values().collect()
    }

    fn owned_by_self(&self, slot: &std::cell::RefCell<Option<Weak<ManagerInner>>>) -> Option<bool> {
        slot.borrow().as_ref().and_then(Weak::upgrade).map(|m| Rc::ptr_eq(&m, &self.inner))
    }

    fn adopt_graph(
        &self,
        state: &mut State,
        graph: &Rc<Graph>,
        adopted: &mut Vec<Rc<Node>>,
    ) -> Result<()> {
        match self.owned_by_self(&graph.manager) {
            Some(true) => return Ok(()),
            Some(false) => {
                return OwnershipConflictSnafu { entity: "graph", id: graph.id() }.fail();
            }
            None => {}
        }
        *graph.manager.borrow_mut() = Some(Rc::downgrade(&self.inner));
        state.graphs.insert(graph.id(), graph.clone());
        state.members.entry(graph.id()).or_default();

        for param in graph.parameters() {
            self.adopt_tree(state, &param, Some(graph), adopted)?;
        }
        let output = graph.output().ok_or_else(|| {
            StructuralInvariantSnafu { reason: format!("graph {} has no output", graph.label()) }
                .build()
        })?;
        self.adopt_tree(state, &output, Some(graph), adopted)
    }

    /// Walk the subtree under `root`, registering every unmanaged node.
    /// Apply nodes without an owner are assigned `default_owner`; user edges
    /// are recorded for every input of every newly adopted apply node.
    fn adopt_tree(
        &self,
        state: &mut State,
        root: &Rc<Node>,
        default_owner: Option<&Rc<Graph>>,
        adopted: &mut Vec<Rc<Node>>,
    ) -> Result<()> {
        let mut queue: VecDeque<Rc<Node>> = VecDeque::new();
        queue.push_back(root.clone());
        while let Some(node) = queue.pop_front() {
            if state.nodes.contains_key(&node.id()) {
                continue;
            }
            match self.owned_by_self(&node.manager) {
                Some(true) => {
                    // Backref survived but the node was reclaimed; re-adopt.
                }
                Some(false) => {
                    return OwnershipConflictSnafu { entity: "node", id: node.id() }.fail();
                }
                None => {}
            }
            *node.manager.borrow_mut() = Some(Rc::downgrade(&self.inner));
            state.nodes.insert(node.id(), node.clone());
            adopted.push(node.clone());

            match &*node.kind() {
                NodeKind::Constant(value) => {
                    if let Value::Graph(nested) = value {
                        state.graph_refs.entry(nested.id()).or_default().insert(node.id());
                        self.adopt_graph(state, nested, adopted)?;
                    }
                }
                NodeKind::Parameter { .. } => {
                    let owner = node.owner().ok_or_else(|| {
                        StructuralInvariantSnafu {
                            reason: format!("parameter {} has no owning graph", node.id()),
                        }
                        .build()
                    })?;
                    state.members.entry(owner.id()).or_default().insert(node.id());
                }
                NodeKind::Apply(inputs) => {
                    if node.owner().is_none()
                        && let Some(owner) = default_owner
                    {
                        node.set_owner(owner);
                    }
                    if let Some(owner) = node.owner() {
                        state.members.entry(owner.id()).or_default().insert(node.id());
                    }
                    for (position, input) in inputs.iter().enumerate() {
                        state.users.entry(input.id()).or_default().insert((node.id(), position));
                        queue.push_back(input.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Every adopted parameter and apply must be owned by a managed graph;
    /// anything else is a dangling reference. Checked after adoption so that
    /// sibling graphs registered later in the same `manage` call are visible.
    fn verify_ownership(&self, state: &State, adopted: &[Rc<Node>]) -> Result<()> {
        for node in adopted {
            if let Some(owner) = node.owner()
                && !state.graphs.contains_key(&owner.id())
            {
                return StructuralInvariantSnafu {
                    reason: format!(
                        "node {} belongs to unmanaged graph {}",
                        node.id(),
                        owner.label()
                    ),
                }
                .fail();
            }
        }
        Ok(())
    }
}

/// Reclaim `node` if nothing references it: no users, not a parameter, and
/// not the output of any managed graph. Cascades through the freed node's
/// inputs, and through nested graphs once their last referencing constant
/// dies.
fn release_if_dead(state: &mut State, node: &Rc<Node>) {
    let mut worklist: Vec<Rc<Node>> = vec![node.clone()];
    while let Some(node) = worklist.pop() {
        if !state.nodes.contains_key(&node.id()) {
            continue;
        }
        if state.users.get(&node.id()).is_some_and(|set| !set.is_empty()) {
            continue;
        }
        if node.is_parameter() {
            continue;
        }
        if state.graphs.values().any(|g| g.output().is_some_and(|out| Rc::ptr_eq(&out, &node))) {
            continue;
        }

        state.nodes.remove(&node.id());
        state.users.remove(&node.id());
        *node.manager.borrow_mut() = None;
        if let Some(owner) = node.owner()
            && let Some(members) = state.members.get_mut(&owner.id())
        {
            members.remove(&node.id());
        }

        if let Some(inputs) = node.inputs() {
            for (position, input) in inputs.iter().enumerate() {
                if let Some(set) = state.users.get_mut(&input.id()) {
                    set.remove(&(node.id(), position));
                }
                worklist.push(input.clone());
            }
        } else if let Some(nested) = node.graph_value() {
            let last_ref = state
                .graph_refs
                .get_mut(&nested.id())
                .map(|refs| {
                    refs.remove(&node.id());
                    refs.is_empty()
                })
                .unwrap_or(true);
            let pinned = state.roots.iter().any(|g| Rc::ptr_eq(g, &nested));
            if last_ref && !pinned {
                release_graph(state, &nested, &mut worklist);
            }
        }
    }
}

/// Drop a nested graph whose last referencing constant died: its parameters
/// leave the managed set and its output subtree is re-examined for
/// reclamation.
fn release_graph(state: &mut State, graph: &Rc<Graph>, worklist: &mut Vec<Rc<Node>>) {
    if state.graphs.remove(&graph.id()).is_none() {
        return;
    }
    tracing::debug!(graph = graph.id(), "releasing graph");
    *graph.manager.borrow_mut() = None;
    state.members.remove(&graph.id());
    state.graph_refs.remove(&graph.id());
    for param in graph.parameters() {
        state.nodes.remove(&param.id());
        state.users.remove(&param.id());
        *param.manager.borrow_mut() = None;
    }
    if let Some(out) = graph.output() {
        worklist.push(out);
    }
}
