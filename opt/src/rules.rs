//! Rewrite rules.
//!
//! A rule pairs a left-side pattern with either a replacement pattern
//! (declarative substitution) or a procedure (the escape hatch for rewrites
//! unification alone cannot encode, e.g. unwinding a run of same-operation
//! wrappers of unbounded depth). Both kinds expose the same `try_apply`
//! interface and are dispatched uniformly by the scheduler.

use std::rc::Rc;

use graft_ir::{Manager, Node};

use crate::error::Result;
use crate::pattern::{Env, Pattern, instantiate, match_pattern};

/// Procedural replacement: inspects the matched node and its bindings and
/// returns the replacement, or `None` meaning "no rewrite applies after all".
/// An `Err` aborts the whole optimization run.
pub type ReplaceFn = Rc<dyn Fn(&Manager, &Rc<Node>, &Env) -> Result<Option<Rc<Node>>>>;

#[derive(Clone)]
pub enum RuleKind {
    Substitute(Pattern),
    Procedure(ReplaceFn),
}

#[derive(Clone)]
pub struct RewriteRule {
    name: String,
    pattern: Pattern,
    kind: RuleKind,
}

impl std::fmt::Debug for RewriteRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            RuleKind::Substitute(_) => "substitute",
            RuleKind::Procedure(_) => "procedure",
        };
        f.debug_struct("RewriteRule").field("name", &self.name).field("kind", &kind).finish()
    }
}

impl RewriteRule {
    /// Declarative pattern-to-pattern substitution.
    pub fn sub(name: impl Into<String>, pattern: Pattern, replacement: Pattern) -> Self {
        Self { name: name.into(), pattern, kind: RuleKind::Substitute(replacement) }
    }

    /// Pattern-guarded procedural replacement.
    pub fn replacer(
        name: impl Into<String>,
        pattern: Pattern,
        replace: impl Fn(&Manager, &Rc<Node>, &Env) -> Result<Option<Rc<Node>>> + 'static,
    ) -> Self {
        Self { name: name.into(), pattern, kind: RuleKind::Procedure(Rc::new(replace)) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Match this rule against `node` and compute the replacement.
    ///
    /// `Ok(None)` means the pattern did not match or the procedure declined;
    /// an error from a procedure is fatal to the optimization run.
    pub fn try_apply(&self, manager: &Manager, node: &Rc<Node>) -> Result<Option<Rc<Node>>> {
        let mut env = Env::new();
        if !match_pattern(&self.pattern, node, &mut env) {
            return Ok(None);
        }
        match &self.kind {
            RuleKind::Substitute(replacement) => {
                instantiate(replacement, &env, node.owner().as_ref(), &self.name).map(Some)
            }
            RuleKind::Procedure(replace) => replace(manager, node, &env),
        }
    }
}
