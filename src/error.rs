use crate::Variable;
use thiserror::Error;

/// Rejected configuration values.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The p-value threshold must lie strictly between 0 and 1.
    #[error("p-value threshold must lie in (0, 1), got {0}")]
    PValueThreshold(f64),
    /// The budget share must lie in (0, 1].
    #[error("budget share must lie in (0, 1], got {0}")]
    BudgetShare(f64),
    /// A clique cap below 2 would forbid every edge.
    #[error("maximum clique size must be at least 2, got {0}")]
    MaxCliqueSize(usize),
    /// The lattice must be allowed to materialize at least one cell.
    #[error("the lattice cell limit must be positive")]
    MaxCells,
}

/// Problems with the presence sets or instances handed to a [`Lattice`](crate::Lattice).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LatticeError {
    /// A variable whose domain has no values.
    #[error("variable {variable} has an empty domain")]
    EmptyDomain {
        /// The offending variable.
        variable: Variable,
    },
    /// A presence set sized for a different number of instances.
    #[error("presence set for variable {variable} covers {found} instances instead of {expected}")]
    UniverseMismatch {
        /// The offending variable.
        variable: Variable,
        /// The number of instances in the dataset.
        expected: usize,
        /// The universe of the presence set.
        found: usize,
    },
    /// The presence sets of a variable must assign exactly one value to every instance.
    #[error("variable {variable} does not assign exactly one value to every instance")]
    NotAPartition {
        /// The offending variable.
        variable: Variable,
    },
    /// Cell counts are stored as `u32`.
    #[error("{0} instances exceed the supported maximum")]
    TooManyInstances(usize),
    /// An instance with the wrong number of values.
    #[error("instance {instance} has {found} values but {expected} variables were declared")]
    RowLength {
        /// Index of the instance.
        instance: usize,
        /// The number of variables.
        expected: usize,
        /// The number of values in the row.
        found: usize,
    },
    /// A value index outside its variable's domain.
    #[error("instance {instance} has value {value} for variable {variable}, whose domain has {domain} values")]
    ValueOutOfDomain {
        /// Index of the instance.
        instance: usize,
        /// The offending variable.
        variable: Variable,
        /// The value found.
        value: usize,
        /// The declared domain size.
        domain: usize,
    },
    /// A missing value while missing values are disabled.
    #[error("instance {instance} has no value for variable {variable} and missing values are disabled")]
    MissingValue {
        /// Index of the instance.
        instance: usize,
        /// The offending variable.
        variable: Variable,
    },
}

/// Contract violations on a [`ChordalGraph`](crate::ChordalGraph).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A vertex index past the end of the graph.
    #[error("vertex {vertex} is out of range for a graph over {nb_vertices} vertices")]
    UnknownVertex {
        /// The offending vertex.
        vertex: Variable,
        /// The number of vertices in the graph.
        nb_vertices: usize,
    },
    /// The edge is already present, is a loop, or would break chordality.
    #[error("edge ({a}, {b}) cannot be added without breaking chordality")]
    NotEligible {
        /// One endpoint.
        a: Variable,
        /// The other endpoint.
        b: Variable,
    },
}

/// Any error this crate reports.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`LatticeError`].
    #[error(transparent)]
    Lattice(#[from] LatticeError),
    /// See [`GraphError`].
    #[error(transparent)]
    Graph(#[from] GraphError),
}
