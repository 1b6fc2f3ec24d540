use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A node or graph was handed to a second manager while still owned by
    /// another one.
    #[snafu(display("{entity} {id} already belongs to a different manager"))]
    OwnershipConflict { entity: &'static str, id: u64 },

    /// The graph structure violates a core invariant: a dangling free-variable
    /// reference, a parameter without an owning graph, or a graph without an
    /// output.
    #[snafu(display("structural invariant violated: {reason}"))]
    StructuralInvariant { reason: String },
}
