//! Equilibrium rewrite scheduler.
//!
//! Drives an ordered rule set over every graph under management until no
//! rule matches anywhere (equilibrium). The work-list is a FIFO queue seeded
//! with all managed nodes in id order; after each applied rewrite the
//! replacement's subtree and every former user of the replaced node are
//! re-queued, which is what lets multi-step chains collapse fully.
//!
//! Termination is the caller's responsibility: a non-well-founded rule set
//! loops until `max_iterations` (if configured) aborts the run.

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use graft_ir::{Manager, Node, reachable_nodes};

use crate::error::{EquilibriumNotReachedSnafu, Result};
use crate::rules::RewriteRule;

/// Outcome of an optimization run.
#[derive(Debug, Default)]
pub struct OptStats {
    /// Number of applied replacements.
    pub replacements: usize,
    /// Number of work-list pops.
    pub pops: usize,
    /// Nodes created by rewrites, recorded only in watch mode, so a
    /// downstream re-inference pass can re-validate them.
    pub marked: Vec<Rc<Node>>,
}

pub struct EquilibriumOptimizer {
    rules: Vec<RewriteRule>,
    max_iterations: Option<usize>,
    watch: bool,
}

impl EquilibriumOptimizer {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules, max_iterations: None, watch: false }
    }

    /// Cap on work-list pops; exceeding it aborts with
    /// [`Error::EquilibriumNotReached`](crate::error::Error).
    pub fn with_max_iterations(mut self, limit: usize) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    /// Record nodes created by rewrites in [`OptStats::marked`] for
    /// downstream re-validation.
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Run the rule set to equilibrium over everything `manager` owns.
    pub fn run(&self, manager: &Manager) -> Result<OptStats> {
        let mut stats = OptStats::default();
        let mut queue: VecDeque<Rc<Node>> = manager.all_nodes().into();
        let mut queued: HashSet<u64> = queue.iter().map(|n| n.id()).collect();

        while let Some(node) = queue.pop_front() {
            queued.remove(&node.id());
            stats.pops += 1;
            if let Some(limit) = self.max_iterations
                && stats.pops > limit
            {
                return EquilibriumNotReachedSnafu { limit }.fail();
            }
            // reclaimed while waiting in the queue
            if !manager.contains_node(&node) {
                continue;
            }

            for rule in &self.rules {
                let Some(replacement) = rule.try_apply(manager, &node)? else {
                    continue;
                };
                if Rc::ptr_eq(&replacement, &node) {
                    continue;
                }

                let former_users = manager.users_of(&node);
                let replacement_region = reachable_nodes(&[replacement.clone()]);
                let fresh: Vec<Rc<Node>> = if self.watch {
                    replacement_region
                        .iter()
                        .filter(|n| !manager.contains_node(n))
                        .cloned()
                        .collect()
                } else {
                    Vec::new()
                };

                manager.replace(&node, &replacement)?;
                stats.replacements += 1;
                tracing::debug!(rule = rule.name(), old = node.id(), new = replacement.id(), "rewrite applied");

                for n in replacement_region {
                    if queued.insert(n.id()) {
                        queue.push_back(n);
                    }
                }
                for (user, _) in former_users {
                    if queued.insert(user.id()) {
                        queue.push_back(user);
                    }
                }
                stats.marked.extend(fresh);
                break;
            }
        }
        tracing::debug!(
            replacements = stats.replacements,
            pops = stats.pops,
            "equilibrium reached"
        );
        Ok(stats)
    }
}

impl std::fmt::Debug for EquilibriumOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquilibriumOptimizer")
            .field("rules", &self.rules.iter().map(RewriteRule::name).collect::<Vec<_>>())
            .field("max_iterations", &self.max_iterations)
            .field("watch", &self.watch)
            .finish()
    }
}
