//! Common imports for working with IR graphs.
//!
//! ```rust,ignore
//! use graft_ir::prelude::*;
//! ```

pub use crate::clone::{GraphCloner, clone_graph};
pub use crate::error::{Error, Result};
pub use crate::graph::{Graph, GraphKey};
pub use crate::isomorphism::isomorphic;
pub use crate::manager::Manager;
pub use crate::node::{Node, NodeKey, NodeKind, TypeTag};
pub use crate::value::{OpRegistry, Primitive, Value, ValueKey};
