//! covtensor: a symbolic engine for covariant tensor expressions over
//! finite index ranges.
//!
//! Tensors are expression trees over a small set of atoms (Kronecker
//! delta, Levi-Civita epsilon, flat metric gamma, a fused epsilon-gamma
//! product, scalar constants) combined by addition, multiplication,
//! scaling and index substitution. Evaluation assigns values to index
//! *names*, which keeps sums over differently-ordered index sets and
//! contractions inside products well-defined.
//!
//! The engineering centrepiece is `Tensor::simplify`, which factorises an
//! additive expression over its linearly independent component vectors by
//! row-reducing a component matrix, and the symmetrisation family
//! (`symmetrize`, `anti_symmetrize`, `exchange_symmetrize`), which
//! enumerates index permutations in parallel and collects like terms by
//! canonical form.

pub mod error;
pub mod index;
pub mod matrix;
pub mod permutation;
pub mod scalar;
pub mod tensor;

pub use error::{TensorError, TensorResult};
pub use index::{Index, IndexAssignments, IndexRange, Indices};
pub use permutation::Permutation;
pub use scalar::Scalar;
pub use tensor::{ExtractedVariables, Tensor, TensorKind};
