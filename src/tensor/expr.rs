//! The tensor expression tree.
//!
//! A tensor is a shared header (name, glyph, index sequence) over a tagged
//! variant. Atoms evaluate in closed form; algebraic nodes compose child
//! evaluations through the named index-assignment protocol, which is what
//! makes `T_{ab} + T_{ba}` well-defined: a sum evaluates its summands by
//! index *name*, never by position.
//!
//! Children are uniquely owned; `Clone` is a structural deep copy. After
//! construction the only mutation is `set_indices`, which renames
//! positions and propagates the renaming into every descendant.

use std::collections::BTreeMap;

use num_rational::Rational64;
use num_traits::One;

use crate::error::{TensorError, TensorResult};
use crate::index::{Index, IndexAssignments, IndexRange, Indices};
use crate::permutation::Permutation;
use crate::scalar::Scalar;

/// Per-variant payload of a tensor expression.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorKind {
    /// The zero tensor (rank 0, identically zero).
    Zero,
    /// A rank-0 scalar value.
    Scalar { value: Scalar },
    /// Kronecker delta: rank 2, one index up, one down.
    Delta,
    /// Totally antisymmetric Levi-Civita symbol; rank equals the range size.
    Epsilon,
    /// Flat metric with a (p, q) signature.
    Gamma { signature: (u32, u32) },
    /// Fused product of at most one epsilon and a list of gammas, with
    /// index layout `[ε₁ε₂ε₃, γ₁₁γ₁₂, γ₂₁γ₂₂, …]`.
    EpsilonGamma {
        num_epsilon: usize,
        num_gamma: usize,
    },
    /// A tensor scaled by a scalar.
    Scaled { tensor: Box<Tensor>, scale: Scalar },
    /// Sum of tensors over permutation-equivalent index sets.
    Added { summands: Vec<Tensor> },
    /// Product of two tensors; shared names are contracted.
    Multiplied {
        left: Box<Tensor>,
        right: Box<Tensor>,
    },
    /// Index renaming: the header indices are a permutation of the
    /// child's.
    Substitute { tensor: Box<Tensor> },
}

/// A covariant tensor expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub(crate) name: String,
    pub(crate) printable: String,
    pub(crate) indices: Indices,
    pub(crate) kind: TensorKind,
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

impl Tensor {
    pub(crate) fn build(
        name: impl Into<String>,
        printable: impl Into<String>,
        indices: Indices,
        kind: TensorKind,
    ) -> Self {
        Self {
            name: name.into(),
            printable: printable.into(),
            indices,
            kind,
        }
    }

    /// The zero tensor.
    pub fn zero() -> Self {
        Self::build("0", "0", Indices::empty(), TensorKind::Zero)
    }

    /// The rank-0 unit.
    pub fn one() -> Self {
        Self::build("1", "1", Indices::empty(), TensorKind::Scalar {
            value: Scalar::one(),
        })
    }

    /// A rank-0 scalar tensor.
    pub fn scalar(value: Scalar) -> Self {
        let printable = value.to_string();
        Self::build(
            printable.clone(),
            printable,
            Indices::empty(),
            TensorKind::Scalar { value },
        )
    }

    /// Kronecker delta over two indices; the first is made contravariant,
    /// the second covariant.
    pub fn delta(indices: Indices) -> Self {
        assert_eq!(indices.len(), 2, "delta carries exactly two indices");
        let mut indices = indices;
        indices.set_variance(0, true);
        indices.set_variance(1, false);
        Self::build("delta", "\\delta", indices, TensorKind::Delta)
    }

    /// Levi-Civita symbol; the rank must equal the index range size.
    pub fn epsilon(indices: Indices) -> Self {
        assert!(
            !indices.is_empty() && indices.len() == indices[0].range().len(),
            "epsilon rank must equal its range size"
        );
        Self::build("epsilon", "\\epsilon", indices, TensorKind::Epsilon)
    }

    /// Levi-Civita symbol on the spatial slice (three roman indices).
    pub fn epsilon_space(offset: usize) -> Self {
        Self::epsilon(Indices::roman_series(3, IndexRange::space(), offset))
    }

    /// Flat metric with the spatial default signature (0, 3).
    pub fn gamma(indices: Indices) -> Self {
        Self::gamma_signature(indices, 0, 3)
    }

    /// Flat metric with an explicit (p, q) signature.
    pub fn gamma_signature(indices: Indices, p: u32, q: u32) -> Self {
        assert_eq!(indices.len(), 2, "gamma carries exactly two indices");
        Self::build("gamma", "\\gamma", indices, TensorKind::Gamma {
            signature: (p, q),
        })
    }

    /// Euclidean metric, signature (0, 4), greek indices over spacetime.
    pub fn gamma_euclidean(offset: usize) -> Self {
        Self::gamma_signature(Indices::greek_series(2, IndexRange::space_time(), offset), 0, 4)
    }

    /// Minkowskian metric, signature (1, 3), greek indices over spacetime.
    pub fn gamma_minkowskian(offset: usize) -> Self {
        Self::gamma_signature(Indices::greek_series(2, IndexRange::space_time(), offset), 1, 3)
    }

    /// Spatial metric, signature (0, 3), roman indices on the slice.
    pub fn gamma_spatial(offset: usize) -> Self {
        Self::gamma_signature(Indices::roman_series(2, IndexRange::space(), offset), 0, 3)
    }

    /// Fused epsilon-gamma product atom.
    pub fn epsilon_gamma(num_epsilon: usize, num_gamma: usize, indices: Indices) -> Self {
        assert!(num_epsilon <= 1, "at most one epsilon factor");
        assert_eq!(
            3 * num_epsilon + 2 * num_gamma,
            indices.len(),
            "epsilon-gamma index count must match its factors"
        );
        Self::build("", "", indices, TensorKind::EpsilonGamma {
            num_epsilon,
            num_gamma,
        })
    }
}

// ============================================================================
// ACCESSORS & PREDICATES
// ============================================================================

impl Tensor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn printable(&self) -> &str {
        &self.printable
    }

    pub fn indices(&self) -> &Indices {
        &self.indices
    }

    pub fn kind(&self) -> &TensorKind {
        &self.kind
    }

    pub fn is_zero_tensor(&self) -> bool {
        matches!(self.kind, TensorKind::Zero)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, TensorKind::Scalar { .. })
    }

    pub fn is_delta(&self) -> bool {
        matches!(self.kind, TensorKind::Delta)
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self.kind, TensorKind::Epsilon)
    }

    pub fn is_gamma(&self) -> bool {
        matches!(self.kind, TensorKind::Gamma { .. })
    }

    pub fn is_epsilon_gamma(&self) -> bool {
        matches!(self.kind, TensorKind::EpsilonGamma { .. })
    }

    pub fn is_scaled(&self) -> bool {
        matches!(self.kind, TensorKind::Scaled { .. })
    }

    pub fn is_added(&self) -> bool {
        matches!(self.kind, TensorKind::Added { .. })
    }

    pub fn is_multiplied(&self) -> bool {
        matches!(self.kind, TensorKind::Multiplied { .. })
    }

    pub fn is_substitute(&self) -> bool {
        matches!(self.kind, TensorKind::Substitute { .. })
    }

    pub fn type_to_string(&self) -> &'static str {
        match self.kind {
            TensorKind::Zero => "Zero",
            TensorKind::Scalar { .. } => "Scalar",
            TensorKind::Delta => "Delta",
            TensorKind::Epsilon => "Epsilon",
            TensorKind::Gamma { .. } => "Gamma",
            TensorKind::EpsilonGamma { .. } => "EpsilonGamma",
            TensorKind::Scaled { .. } => "Scaled",
            TensorKind::Added { .. } => "Addition",
            TensorKind::Multiplied { .. } => "Multiplication",
            TensorKind::Substitute { .. } => "Substitute",
        }
    }

    pub fn all_ranges_equal(&self) -> bool {
        self.indices.all_ranges_equal()
    }

    /// All value combinations of the declared index ranges.
    pub fn all_index_combinations(&self) -> Vec<Vec<usize>> {
        self.indices.all_combinations().collect()
    }
}

// ============================================================================
// INDEX RENAMING
// ============================================================================

impl Tensor {
    /// Rename the declared indices and propagate the renaming into every
    /// descendant through a position mapping.
    pub fn set_indices(&mut self, new_indices: &Indices) {
        debug_assert_eq!(new_indices.len(), self.indices.len());
        match &mut self.kind {
            TensorKind::Zero
            | TensorKind::Scalar { .. }
            | TensorKind::Epsilon
            | TensorKind::Gamma { .. }
            | TensorKind::EpsilonGamma { .. } => {
                self.indices = new_indices.clone();
            }
            TensorKind::Delta => {
                let mut indices = new_indices.clone();
                indices.set_variance(0, true);
                indices.set_variance(1, false);
                self.indices = indices;
            }
            TensorKind::Added { summands } => {
                let mapping = position_mapping(&self.indices, new_indices);
                self.indices = new_indices.clone();
                for summand in summands {
                    let shuffled = summand.indices.shuffle(&mapping);
                    summand.set_indices(&shuffled);
                }
            }
            TensorKind::Multiplied { left, right } => {
                let mapping = position_mapping(&self.indices, new_indices);
                self.indices = new_indices.clone();
                let shuffled = left.indices.shuffle(&mapping);
                left.set_indices(&shuffled);
                let shuffled = right.indices.shuffle(&mapping);
                right.set_indices(&shuffled);
            }
            TensorKind::Scaled { tensor, .. } => {
                self.indices = new_indices.clone();
                tensor.set_indices(new_indices);
            }
            TensorKind::Substitute { tensor } => {
                let permutation = Permutation::between(&self.indices, &tensor.indices)
                    .expect("substitute header is a permutation of its child");
                self.indices = new_indices.clone();
                let child_indices = permutation.apply(new_indices);
                tensor.set_indices(&child_indices);
            }
        }
    }

    /// Apply a positional permutation to the declared indices.
    pub fn permute_indices(&mut self, permutation: &Permutation) {
        let permuted = permutation.apply(&self.indices);
        self.set_indices(&permuted);
    }
}

pub(crate) fn position_mapping(old: &Indices, new: &Indices) -> BTreeMap<Index, Index> {
    old.iter()
        .zip(new.iter())
        .map(|(o, n)| (o.clone(), n.clone()))
        .collect()
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Closed form of the Levi-Civita component:
/// `Π_{p<q} (a_q − a_p) / (q − p)`, exactly ±1 on permutations of the
/// range and 0 when two values collide.
pub(crate) fn epsilon_component(args: &[usize]) -> Scalar {
    let mut result = Rational64::one();
    for p in 0..args.len() {
        for q in (p + 1)..args.len() {
            let numerator = args[q] as i64 - args[p] as i64;
            if numerator == 0 {
                return Scalar::zero();
            }
            result *= Rational64::new(numerator, (q - p) as i64);
        }
    }
    Scalar::Rational(result)
}

/// Flat metric component: 0 off-diagonal, −1 on the first `p` diagonal
/// entries of the range, +1 on the rest.
pub(crate) fn gamma_component(args: &[usize], from: usize, p: u32) -> Scalar {
    if args[0] != args[1] {
        return Scalar::zero();
    }
    if args[0] - from < p as usize {
        Scalar::integer(-1)
    } else {
        Scalar::one()
    }
}

impl Tensor {
    fn expect_args(&self, args: &[usize]) -> TensorResult<()> {
        if args.len() != self.indices.len() {
            return Err(TensorError::IncompleteIndexAssignment {
                expected: self.indices.len(),
                got: args.len(),
            });
        }
        Ok(())
    }

    /// Evaluate the component at a positional index assignment.
    pub fn evaluate(&self, args: &[usize]) -> TensorResult<Scalar> {
        match &self.kind {
            TensorKind::Zero => Ok(Scalar::zero()),
            TensorKind::Scalar { value } => Ok(value.clone()),
            TensorKind::Delta => {
                self.expect_args(args)?;
                if args[0] == args[1] {
                    Ok(Scalar::one())
                } else {
                    Ok(Scalar::zero())
                }
            }
            TensorKind::Epsilon => {
                self.expect_args(args)?;
                Ok(epsilon_component(args))
            }
            TensorKind::Gamma { signature } => {
                self.expect_args(args)?;
                Ok(gamma_component(args, self.indices[0].range().from(), signature.0))
            }
            TensorKind::EpsilonGamma {
                num_epsilon,
                num_gamma,
            } => {
                self.expect_args(args)?;
                let mut result = Scalar::one();
                let mut pos = 0;

                for _ in 0..*num_epsilon {
                    result *= epsilon_component(&args[pos..pos + 3]);
                    if result.is_zero() {
                        return Ok(result);
                    }
                    pos += 3;
                }

                for _ in 0..*num_gamma {
                    let from = self.indices[pos].range().from();
                    result *= gamma_component(&args[pos..pos + 2], from, 0);
                    if result.is_zero() {
                        return Ok(result);
                    }
                    pos += 2;
                }

                Ok(result)
            }
            TensorKind::Scaled { tensor, scale } => {
                Ok(tensor.evaluate(args)? * scale.clone())
            }
            TensorKind::Added { summands } => {
                let assignment = IndexAssignments::from_indices(&self.indices, args)?;
                let mut result = Scalar::zero();
                for summand in summands {
                    result += summand.evaluate_assigned(&assignment)?;
                }
                Ok(result)
            }
            TensorKind::Multiplied { left, right } => {
                self.expect_args(args)?;

                // Contracted names: child indices absent from the declared
                // sequence, each listed once.
                let mut contracted = Indices::empty();
                for index in left.indices.iter().chain(right.indices.iter()) {
                    if !self.indices.contains(index) && !contracted.contains(index) {
                        contracted.push(index.clone());
                    }
                }

                let mut result = Scalar::zero();
                for combination in contracted.all_combinations() {
                    let mut left_assignment = IndexAssignments::new();
                    let mut right_assignment = IndexAssignments::new();

                    for (i, index) in contracted.iter().enumerate() {
                        if left.indices.contains(index) {
                            left_assignment.insert(index.name(), combination[i]);
                        }
                        if right.indices.contains(index) {
                            right_assignment.insert(index.name(), combination[i]);
                        }
                    }

                    for (i, index) in self.indices.iter().enumerate() {
                        if left.indices.contains(index) {
                            left_assignment.insert(index.name(), args[i]);
                        }
                        if right.indices.contains(index) {
                            right_assignment.insert(index.name(), args[i]);
                        }
                    }

                    result += left.evaluate_assigned(&left_assignment)?
                        * right.evaluate_assigned(&right_assignment)?;
                }
                Ok(result)
            }
            TensorKind::Substitute { tensor } => {
                let assignment = IndexAssignments::from_indices(&self.indices, args)?;
                tensor.evaluate_assigned(&assignment)
            }
        }
    }

    /// Evaluate through a name-keyed assignment, regardless of the
    /// internal index ordering.
    pub fn evaluate_assigned(&self, assignment: &IndexAssignments) -> TensorResult<Scalar> {
        let args = assignment.apply(&self.indices)?;
        self.evaluate(&args)
    }

    /// Evaluate with a per-position range check on the arguments.
    ///
    /// Panics if an argument falls outside its index's range; use
    /// `evaluate` for the unchecked form.
    pub fn component(&self, args: &[usize]) -> TensorResult<Scalar> {
        self.expect_args(args)?;
        for (index, &value) in self.indices.iter().zip(args) {
            assert!(
                index.range().contains(value),
                "value {} out of range for index '{}'",
                value,
                index.name()
            );
        }
        self.evaluate(args)
    }

    /// True iff every component is numerically zero and variable-free.
    pub fn is_zero(&self) -> TensorResult<bool> {
        for combination in self.indices.all_combinations() {
            let value = self.evaluate(&combination)?;
            if value.has_variables() || value.to_f64() != 0.0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Pointwise equality: same declared indices and equal components at
    /// every combination.
    pub fn is_equal(&self, other: &Tensor) -> TensorResult<bool> {
        if self.indices != other.indices {
            return Ok(false);
        }
        for combination in self.indices.all_combinations() {
            if self.evaluate(&combination)? != other.evaluate(&combination)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ============================================================================
// RENDERING
// ============================================================================

impl std::fmt::Display for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TensorKind::Zero => write!(f, "0"),
            TensorKind::Scalar { .. } => write!(f, "{}", self.printable),
            TensorKind::Delta => write!(f, "\\delta{}", self.indices),
            TensorKind::Epsilon => write!(f, "\\epsilon{}", self.indices),
            TensorKind::Gamma { .. } => write!(f, "\\gamma{}", self.indices),
            TensorKind::EpsilonGamma {
                num_epsilon,
                num_gamma,
            } => {
                let mut pos = 0;
                for _ in 0..*num_epsilon {
                    write!(f, "\\epsilon{}", self.indices.partial(pos..pos + 3))?;
                    pos += 3;
                }
                for _ in 0..*num_gamma {
                    write!(f, "\\gamma{}", self.indices.partial(pos..pos + 2))?;
                    pos += 2;
                }
                Ok(())
            }
            TensorKind::Scaled { tensor, scale } => {
                if *scale == Scalar::integer(-1) {
                    write!(f, "-")?;
                } else if *scale != Scalar::one() {
                    if scale.is_added() {
                        write!(f, "({}) * ", scale)?;
                    } else {
                        write!(f, "{} * ", scale)?;
                    }
                }
                if tensor.is_added() {
                    write!(f, "({})", tensor)
                } else {
                    write!(f, "{}", tensor)
                }
            }
            TensorKind::Added { summands } => {
                for (i, summand) in summands.iter().enumerate() {
                    if i > 0 {
                        // Fold a leading -1 scale into the sum rendering.
                        if let TensorKind::Scaled { tensor, scale } = &summand.kind {
                            if *scale == Scalar::integer(-1) {
                                write!(f, " - {}", tensor)?;
                                continue;
                            }
                        }
                        write!(f, " + ")?;
                    }
                    write!(f, "{}", summand)?;
                }
                Ok(())
            }
            TensorKind::Multiplied { left, right } => write!(f, "{}{}", left, right),
            TensorKind::Substitute { tensor } => write!(f, "{}", tensor),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn roman(n: usize) -> Indices {
        Indices::roman_series(n, IndexRange::space(), 0)
    }

    #[test]
    fn test_delta_components() {
        let delta = Tensor::delta(Indices::greek_series(2, IndexRange::space_time(), 0));
        assert_eq!(delta.evaluate(&[0, 0]).unwrap(), Scalar::one());
        assert_eq!(delta.evaluate(&[0, 1]).unwrap(), Scalar::zero());
        assert_eq!(delta.evaluate(&[1, 1]).unwrap(), Scalar::one());
    }

    #[test]
    fn test_delta_variance() {
        let delta = Tensor::delta(roman(2));
        assert!(delta.indices()[0].is_contravariant());
        assert!(!delta.indices()[1].is_contravariant());
    }

    #[test]
    fn test_epsilon_components() {
        let eps = Tensor::epsilon(roman(3));
        assert_eq!(eps.evaluate(&[1, 2, 3]).unwrap(), Scalar::one());
        assert_eq!(eps.evaluate(&[2, 1, 3]).unwrap(), Scalar::integer(-1));
        assert_eq!(eps.evaluate(&[1, 1, 3]).unwrap(), Scalar::zero());
        assert_eq!(eps.evaluate(&[3, 1, 2]).unwrap(), Scalar::one());
    }

    #[test]
    fn test_gamma_components() {
        let gamma = Tensor::gamma_minkowskian(0);
        assert_eq!(gamma.evaluate(&[0, 0]).unwrap(), Scalar::integer(-1));
        assert_eq!(gamma.evaluate(&[1, 1]).unwrap(), Scalar::one());
        assert_eq!(gamma.evaluate(&[2, 3]).unwrap(), Scalar::zero());
        assert_eq!(gamma.evaluate(&[3, 3]).unwrap(), Scalar::one());
    }

    #[test]
    fn test_epsilon_gamma_blocks() {
        // One epsilon (a b c) and one gamma (d e) on the spatial slice.
        let tensor = Tensor::epsilon_gamma(1, 1, roman(5));
        assert_eq!(tensor.evaluate(&[1, 2, 3, 1, 1]).unwrap(), Scalar::one());
        assert_eq!(
            tensor.evaluate(&[2, 1, 3, 2, 2]).unwrap(),
            Scalar::integer(-1)
        );
        assert_eq!(tensor.evaluate(&[1, 2, 3, 1, 2]).unwrap(), Scalar::zero());
        assert_eq!(tensor.evaluate(&[1, 1, 3, 2, 2]).unwrap(), Scalar::zero());
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        let eps = Tensor::epsilon(roman(3));
        assert!(matches!(
            eps.evaluate(&[1, 2]),
            Err(TensorError::IncompleteIndexAssignment { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_zero_is_zero() {
        assert!(Tensor::zero().is_zero().unwrap());
        assert!(!Tensor::one().is_zero().unwrap());
    }

    #[test]
    fn test_set_indices_on_atom() {
        let mut eps = Tensor::epsilon(roman(3));
        let xyz: Indices = ["x", "y", "z"]
            .iter()
            .map(|n| Index::named(*n, IndexRange::space()))
            .collect();
        eps.set_indices(&xyz);
        assert_eq!(eps.indices(), &xyz);
    }

    #[test]
    fn test_evaluate_assigned_ignores_order() {
        let eps = Tensor::epsilon(roman(3));
        let mut assignment = IndexAssignments::new();
        assignment.insert("c", 3);
        assignment.insert("a", 1);
        assignment.insert("b", 2);
        assert_eq!(eps.evaluate_assigned(&assignment).unwrap(), Scalar::one());
    }

    #[test]
    #[should_panic]
    fn test_component_checks_bounds() {
        let eps = Tensor::epsilon(roman(3));
        let _ = eps.component(&[0, 1, 2]); // 0 is outside the 1..=3 range
    }
}
