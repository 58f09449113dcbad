/// Main error type
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    /// Fewer runs were requested than the model has terms.
    #[error("run count {run_count} is lower than the model size {model_size}")]
    RunCountTooSmall {
        /// Requested number of runs.
        run_count: usize,
        /// Number of model terms.
        model_size: usize,
    },
    /// A named model order could not be recognized.
    #[error("unknown model order '{name}'")]
    UnknownModelOrder {
        /// The name that failed to parse.
        name: String,
    },
    /// A vector contains a minimum value lower than required.
    #[error("minimal value for {vector} on dim {dim} is {ge_value} but found {value}")]
    MinValue {
        /// Vector name
        vector: &'static str,
        /// Position of the violating value
        dim: usize,
        /// Value at position dim
        value: usize,
        /// Required minimum value
        ge_value: usize,
    },
    /// A scalar parameter lies outside of its open interval.
    #[error("{name} = {value} is outside of ({low}, {high})")]
    OutOfRange {
        /// Parameter name.
        name: &'static str,
        /// Found value.
        value: f64,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// Minimal dimensional distance requirement is violated.
    #[error(
        "min distance between vectors {vector1} and {vector2} found on dim {dim} with {distance} but should > {gt_distance}"
    )]
    MinDistanceBetweenVectors {
        /// Name of vector1.
        vector1: &'static str,
        /// Name of vector2.
        vector2: &'static str,
        /// Dimension on which the distance requirement is violated.
        dim: usize,
        /// Found distance between dim-values of vector1 and vector2.
        distance: f64,
        /// Minimal required distance.
        gt_distance: f64,
    },
    /// Two given tensors do not have the same shape.
    #[error(
        "mat {mat1} with shape {shape1:?} and {mat2} with {shape2:?} have different len on dim {dim1} and {dim2}"
    )]
    ShapeMismatch {
        /// Name of matrix 1.
        mat1: &'static str,
        /// Name of matrix .
        mat2: &'static str,
        /// Affected shape of dimension on matrix 1.
        dim1: usize,
        /// Affected shape of dimension on matrix 2.
        dim2: usize,
        /// Shape of matrix 1.
        shape1: (usize, usize),
        /// Shape of matrix 2.
        shape2: (usize, usize),
    },
    /// The starting point of a sampler violates a constraint.
    #[error("start point violates constraint {constraint} by {violation}")]
    InfeasibleStart {
        /// Row of the violated constraint.
        constraint: usize,
        /// Amount by which `A x <= b` is exceeded.
        violation: f64,
    },
    /// No direction with a bounded, non-empty feasible chord was found.
    #[error("no feasible direction found after {attempts} attempts")]
    DegenerateSampling {
        /// Number of directions drawn.
        attempts: usize,
    },
    /// Every bootstrap design was singular.
    #[error("no non-singular bootstrap design found after {attempts} attempts")]
    SingularStart {
        /// Number of bootstrap draws.
        attempts: usize,
    },
    /// A matrix that has to be inverted is singular.
    #[error("matrix {mat} is singular")]
    SingularMatrix {
        /// Name of the singular matrix.
        mat: &'static str,
    },
}

/// Main result type
pub type Result<T> = std::result::Result<T, Error>;
