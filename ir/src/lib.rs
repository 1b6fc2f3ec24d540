//! Graph-based functional IR: the substrate shared by every rewriting pass.
//!
//! # Module Organization
//!
//! - [`value`] - Constant payloads and the operation resolution table
//! - [`node`] - Nodes (constants, parameters, applies) with stable ids
//! - [`graph`] - Graphs: ordered parameters plus one designated output
//! - [`manager`] - Ownership, use/user indices, atomic replacement
//! - [`traverse`] - Reachability and dependency-order traversal
//! - [`clone`] - Total graph cloning
//! - [`isomorphism`] - Structural equality up to renaming
//! - [`tree`] - ASCII tree rendering
//! - [`error`] - Error types and result handling

pub mod clone;
pub mod error;
pub mod graph;
pub mod isomorphism;
pub mod manager;
pub mod node;
pub mod prelude;
pub mod traverse;
pub mod tree;
pub mod value;

#[cfg(test)]
mod test;

pub use clone::{GraphCloner, clone_graph};
pub use error::{Error, Result};
pub use graph::{Graph, GraphKey};
pub use isomorphism::isomorphic;
pub use manager::Manager;
pub use node::{Node, NodeKey, NodeKind, TypeTag};
pub use traverse::{reachable_graphs, reachable_nodes, toposort};
pub use tree::{render_graph, render_tree};
pub use value::{OpRegistry, Primitive, Value, ValueKey};
