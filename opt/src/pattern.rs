//! Pattern matching over IR subtrees.
//!
//! Patterns are s-expression-shaped trees: concrete values match equal
//! constants, variables match anything and bind once per attempt, and apply
//! shapes match apply nodes of exactly the same arity. A predicate variable
//! additionally requires its predicate to hold on the candidate node.
//!
//! # Example
//!
//! ```ignore
//! // Match: P(P(x)) for any subtree x
//! let p = Primitive::new("P");
//! let pat = Pattern::apply(vec![
//!     p.clone().into(),
//!     Pattern::apply(vec![p.into(), var("X")]),
//! ]);
//! ```

use std::rc::Rc;

use graft_ir::{Graph, Node, Primitive, Value};
use smallvec::SmallVec;

use crate::error::{Result, UnboundVariableSnafu};

/// A logic variable: matches any node, bound once per match attempt. When the
/// same variable repeats in a pattern, later occurrences must unify with the
/// first binding (the same node, or a constant of equal value).
#[derive(Clone)]
pub struct PatternVar {
    name: Rc<str>,
    predicate: Option<Rc<dyn Fn(&Rc<Node>) -> bool>>,
}

impl PatternVar {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for PatternVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternVar")
            .field("name", &self.name)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// S-expression-shaped pattern tree.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Concrete leaf; matches a constant with an equal value.
    Value(Value),
    /// Logic variable, optionally predicate-guarded.
    Var(PatternVar),
    /// Application shape; arity must match exactly.
    Apply(Vec<Pattern>),
}

impl Pattern {
    pub fn apply(items: Vec<Pattern>) -> Pattern {
        Pattern::Apply(items)
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        Pattern::Value(value)
    }
}

impl From<i64> for Pattern {
    fn from(value: i64) -> Self {
        Pattern::Value(Value::Int(value))
    }
}

impl From<Primitive> for Pattern {
    fn from(value: Primitive) -> Self {
        Pattern::Value(Value::Prim(value))
    }
}

impl From<&Primitive> for Pattern {
    fn from(value: &Primitive) -> Self {
        Pattern::Value(Value::Prim(value.clone()))
    }
}

/// An opaque variable matching any node.
pub fn var(name: impl AsRef<str>) -> Pattern {
    Pattern::Var(PatternVar { name: Rc::from(name.as_ref()), predicate: None })
}

/// A predicate-guarded variable: matches only nodes the predicate accepts.
pub fn pvar(name: impl AsRef<str>, predicate: impl Fn(&Rc<Node>) -> bool + 'static) -> Pattern {
    Pattern::Var(PatternVar { name: Rc::from(name.as_ref()), predicate: Some(Rc::new(predicate)) })
}

/// Binding environment produced by a successful match.
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: SmallVec<[(Rc<str>, Rc<Node>); 4]>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Node>> {
        self.bindings.iter().find(|(n, _)| n.as_ref() == name).map(|(_, node)| node)
    }

    fn bind(&mut self, name: Rc<str>, node: Rc<Node>) {
        self.bindings.push((name, node));
    }

    pub(crate) fn bind_param(&mut self, name: &str, node: Rc<Node>) {
        self.bind(Rc::from(name), node);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Two bindings unify when they are literally the same node, or constants of
/// equal value. Applies and parameters are identity-significant.
fn same_binding(a: &Rc<Node>, b: &Rc<Node>) -> bool {
    Rc::ptr_eq(a, b)
        || match (a.value(), b.value()) {
            (Some(va), Some(vb)) => va == vb,
            _ => false,
        }
}

/// Structural match of `pattern` against `node`, threading bindings through
/// `env`. Deterministic and total: an arity mismatch is "no match", never an
/// error. On failure `env` may hold partial bindings and must be discarded.
pub fn match_pattern(pattern: &Pattern, node: &Rc<Node>, env: &mut Env) -> bool {
    match pattern {
        Pattern::Value(value) => node.value().is_some_and(|nv| nv == *value),
        Pattern::Var(pattern_var) => {
            if let Some(predicate) = &pattern_var.predicate
                && !predicate(node)
            {
                return false;
            }
            if let Some(bound) = env.get(&pattern_var.name) {
                return same_binding(bound, node);
            }
            env.bind(pattern_var.name.clone(), node.clone());
            true
        }
        Pattern::Apply(items) => {
            let Some(inputs) = node.inputs() else {
                return false;
            };
            if inputs.len() != items.len() {
                return false;
            }
            items.iter().zip(&inputs).all(|(item, input)| match_pattern(item, input, env))
        }
    }
}

/// Build a replacement tree from `pattern` under `env`.
///
/// Bound variables are substituted with their matched node *verbatim*, so a
/// replacement may alias pre-existing shared structure; values and apply
/// shapes become fresh nodes owned by `owner` (conventionally the matched
/// node's graph). An unbound variable is a fatal error.
pub fn instantiate(
    pattern: &Pattern,
    env: &Env,
    owner: Option<&Rc<Graph>>,
    rule: &str,
) -> Result<Rc<Node>> {
    match pattern {
        Pattern::Var(pattern_var) => env.get(&pattern_var.name).cloned().ok_or_else(|| {
            UnboundVariableSnafu { var: pattern_var.name.to_string(), rule: rule.to_string() }
                .build()
        }),
        Pattern::Value(value) => Ok(Node::constant(value.clone())),
        Pattern::Apply(items) => {
            let inputs = items
                .iter()
                .map(|item| instantiate(item, env, owner, rule))
                .collect::<Result<Vec<_>>>()?;
            Ok(match owner {
                Some(graph) => graph.apply(inputs),
                None => Node::apply(inputs),
            })
        }
    }
}
