//! Tensor expressions and their transformations.
//!
//! The expression tree lives in `expr`; the remaining modules attach the
//! engine's operations to it:
//! - **algebra**: checked `add`/`mul` factories, scaling, contraction
//!   heuristics, `expand`, operator traits
//! - **canonical**: canonical index ordering per atom
//! - **simplify**: factorisation over linearly independent components
//! - **symmetrize**: (anti-/exchange-) symmetrisation
//! - **variables**: variable extraction and linear systems
//! - **serialize**: the tagged binary codec

mod algebra;
mod canonical;
mod expr;
mod serialize;
mod simplify;
mod symmetrize;
mod variables;

pub use expr::{Tensor, TensorKind};
pub use variables::ExtractedVariables;
