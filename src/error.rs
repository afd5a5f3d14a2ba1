//! Error types for the tensor engine.

/// Errors surfaced at the API boundary.
///
/// All variants are recoverable by the caller. Internal invariants
/// (index-count arithmetic of the atoms, child ownership) are asserted
/// instead and indicate a bug in the caller of an internal constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TensorError {
    /// Deserialization failed; the bytes do not match the expected schema.
    WrongFormat(String),
    /// `evaluate` received the wrong argument count, or an assignment
    /// does not cover every index name.
    IncompleteIndexAssignment { expected: usize, got: usize },
    /// Summands do not carry permutation-equivalent index sets.
    CannotAdd,
    /// Factor index sets violate the contraction constraints.
    CannotMultiply(String),
    /// An index name occurs too often to contract.
    CannotContract(String),
    /// Target indices are not a permutation of the source indices.
    NotAPermutation,
    /// A product of two variables appeared inside a single scale factor.
    QuadraticVariables,
    /// Row reduction produced a row the basis collection cannot interpret.
    RowReductionFailed,
}

impl std::fmt::Display for TensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TensorError::WrongFormat(detail) => {
                write!(f, "wrong format, cannot deserialize: {}", detail)
            }
            TensorError::IncompleteIndexAssignment { expected, got } => {
                write!(
                    f,
                    "incomplete index assignment: expected {} indices, got {}",
                    expected, got
                )
            }
            TensorError::CannotAdd => {
                write!(f, "cannot add tensors due to incompatible indices")
            }
            TensorError::CannotMultiply(detail) => {
                write!(f, "cannot multiply tensors: {}", detail)
            }
            TensorError::CannotContract(detail) => {
                write!(f, "cannot contract indices: {}", detail)
            }
            TensorError::NotAPermutation => {
                write!(f, "the indices have to be a permutation of each other")
            }
            TensorError::QuadraticVariables => {
                write!(f, "products of variables are not supported in scale factors")
            }
            TensorError::RowReductionFailed => {
                write!(f, "row reduction produced an unexpected row pattern")
            }
        }
    }
}

impl std::error::Error for TensorError {}

pub type TensorResult<T> = Result<T, TensorError>;
