use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Error propagated from the IR layer.
    #[snafu(context(false), display("{source}"))]
    Ir { source: graft_ir::Error },

    /// The work-list cap was hit before the rule set converged.
    #[snafu(display("equilibrium not reached within {limit} work-list pops"))]
    EquilibriumNotReached { limit: usize },

    /// A replacement pattern used a variable the left side never bound.
    #[snafu(display("variable `{var}` is unbound in the replacement of rule `{rule}`"))]
    UnboundVariable { var: String, rule: String },

    /// A procedural rule failed; this aborts the whole optimization run.
    #[snafu(display("rule `{rule}` failed: {reason}"))]
    Rule { rule: String, reason: String },
}
