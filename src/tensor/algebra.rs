//! Factories and algebraic composition of tensor expressions.
//!
//! `add` and `mul` are the checked constructors: they enforce the index
//! contracts (`CannotAdd` / `CannotMultiply` / `CannotContract`), apply the
//! zero/one short-circuits, merge summand lists, and offer every atom the
//! contraction heuristic before building a generic product. The operator
//! traits delegate to them and panic on contract violation; use the checked
//! forms where failure must be observable.

use std::collections::BTreeMap;

use crate::error::{TensorError, TensorResult};
use crate::index::{Index, Indices};
use crate::scalar::Scalar;
use crate::tensor::expr::{Tensor, TensorKind};

impl Tensor {
    /// Checked addition.
    ///
    /// Requires permutation-equivalent index sets. Pushing into an existing
    /// sum reuses its summand list instead of nesting.
    pub fn add(first: &Tensor, second: &Tensor) -> TensorResult<Tensor> {
        if first.is_zero_tensor() {
            return Ok(second.clone());
        }
        if second.is_zero_tensor() {
            return Ok(first.clone());
        }
        if !first.indices.is_permutation_of(&second.indices) {
            return Err(TensorError::CannotAdd);
        }

        match (first.is_added(), second.is_added()) {
            (true, false) => {
                let mut result = first.clone();
                if let TensorKind::Added { summands } = &mut result.kind {
                    summands.push(second.clone());
                }
                Ok(result)
            }
            (false, true) => {
                let mut result = second.clone();
                if let TensorKind::Added { summands } = &mut result.kind {
                    summands.insert(0, first.clone());
                }
                Ok(result)
            }
            (true, true) => {
                let mut result = first.clone();
                if let (TensorKind::Added { summands }, TensorKind::Added { summands: other }) =
                    (&mut result.kind, &second.kind)
                {
                    summands.extend(other.iter().cloned());
                }
                Ok(result)
            }
            (false, false) => Ok(Tensor::build(
                "",
                "",
                first.indices.clone(),
                TensorKind::Added {
                    summands: vec![first.clone(), second.clone()],
                },
            )),
        }
    }

    /// Checked multiplication.
    ///
    /// Shared index names are contracted (summed at evaluation); each atom
    /// is offered the contraction heuristic first.
    pub fn mul(first: &Tensor, second: &Tensor) -> TensorResult<Tensor> {
        if first.is_zero_tensor() || second.is_zero_tensor() {
            return Ok(Tensor::zero());
        }

        if let Some(contracted) = first.try_contract(second) {
            return Ok(contracted);
        }
        if let Some(contracted) = second.try_contract(first) {
            return Ok(contracted);
        }

        // A contracted name must range over the same values on both sides.
        for index in first.indices.iter() {
            if let Some(position) = second
                .indices
                .iter()
                .position(|other| other.name() == index.name())
            {
                if second.indices[position].range() != index.range() {
                    return Err(TensorError::CannotMultiply(format!(
                        "index '{}' has mismatched ranges",
                        index.name()
                    )));
                }
            }
        }

        let indices = first.indices.contract(&second.indices)?;
        Ok(Tensor::build(
            "",
            "",
            indices,
            TensorKind::Multiplied {
                left: Box::new(first.clone()),
                right: Box::new(second.clone()),
            },
        ))
    }

    /// Contraction heuristic hook: the Kronecker delta substitutes its
    /// free index for the shared name in the partner, in place.
    pub(crate) fn try_contract(&self, other: &Tensor) -> Option<Tensor> {
        if !self.is_delta() {
            return None;
        }

        let shared: Vec<&Index> = self
            .indices
            .iter()
            .filter(|index| other.indices.contains(index))
            .collect();
        if shared.len() != 1 {
            return None;
        }
        let shared = shared[0].clone();
        let replacement = self.indices.iter().find(|index| **index != shared)?.clone();
        if other.indices.contains(&replacement) {
            return None;
        }

        let mut mapping = BTreeMap::new();
        mapping.insert(shared, replacement);
        let renamed = other.indices.shuffle(&mapping);

        let mut clone = other.clone();
        clone.set_indices(&renamed);
        Some(clone)
    }

    /// Multiply by a scalar.
    ///
    /// Scaling a scale merges the factors; scaling a substitution pushes
    /// the factor into the child.
    pub fn scale(&self, factor: Scalar) -> Tensor {
        if factor == Scalar::one() {
            return self.clone();
        }
        if factor.is_zero() {
            return Tensor::zero();
        }
        if self.is_zero_tensor() {
            return self.clone();
        }

        match &self.kind {
            TensorKind::Scaled { tensor, scale } => {
                let merged = scale.clone() * factor;
                if merged == Scalar::one() {
                    return (**tensor).clone();
                }
                Tensor::build(
                    "",
                    "",
                    self.indices.clone(),
                    TensorKind::Scaled {
                        tensor: tensor.clone(),
                        scale: merged,
                    },
                )
            }
            TensorKind::Substitute { tensor } => Tensor::build(
                "",
                "",
                self.indices.clone(),
                TensorKind::Substitute {
                    tensor: Box::new(tensor.scale(factor)),
                },
            ),
            _ => Tensor::build(
                "",
                "",
                self.indices.clone(),
                TensorKind::Scaled {
                    tensor: Box::new(self.clone()),
                    scale: factor,
                },
            ),
        }
    }

    /// Rename a tensor's indices and sum over any contraction the new
    /// sequence introduces.
    pub fn contraction(tensor: &Tensor, indices: &Indices) -> TensorResult<Tensor> {
        if indices.len() != tensor.indices.len() {
            return Err(TensorError::CannotContract(format!(
                "expected {} indices, got {}",
                tensor.indices.len(),
                indices.len()
            )));
        }

        let mut clone = tensor.clone();
        clone.set_indices(indices);

        if !indices.contains_contractions() {
            return Ok(clone);
        }

        // Multiplying by the unit routes the repeated name through the
        // product evaluator, which performs the sum.
        Tensor::mul(&Tensor::one(), &clone)
    }

    /// Reorder the evaluation indices without renaming the child:
    /// evaluating the result at the target order evaluates the child at
    /// its own order.
    pub fn substitute(tensor: &Tensor, indices: &Indices) -> TensorResult<Tensor> {
        // Distribute over sums and through scales.
        if let TensorKind::Added { summands } = &tensor.kind {
            let mut result = Tensor::zero();
            for summand in summands {
                result = Tensor::add(&result, &Tensor::substitute(summand, indices)?)?;
            }
            return Ok(result);
        }
        if let TensorKind::Scaled { tensor: child, scale } = &tensor.kind {
            return Ok(Tensor::substitute(child, indices)?.scale(scale.clone()));
        }

        if !indices.is_permutation_of(&tensor.indices) {
            return Err(TensorError::NotAPermutation);
        }
        Ok(Tensor::build(
            "",
            "",
            indices.clone(),
            TensorKind::Substitute {
                tensor: Box::new(tensor.clone()),
            },
        ))
    }

    /// Top-level summands (the tensor itself if it is not a sum).
    pub fn summands(&self) -> Vec<Tensor> {
        match &self.kind {
            TensorKind::Added { summands } => summands.clone(),
            _ => vec![self.clone()],
        }
    }

    /// Split into (scale factor, scale-free tensor). Substitutions are
    /// transparent: the scale is pulled out of the child and the
    /// substitution re-wrapped around the remainder.
    pub fn separate_scale_factor(&self) -> (Scalar, Tensor) {
        match &self.kind {
            TensorKind::Scaled { tensor, scale } => (scale.clone(), (**tensor).clone()),
            TensorKind::Substitute { tensor } => {
                let (scale, stripped) = tensor.separate_scale_factor();
                let rewrapped = Tensor::build(
                    "",
                    "",
                    self.indices.clone(),
                    TensorKind::Substitute {
                        tensor: Box::new(stripped),
                    },
                );
                (scale, rewrapped)
            }
            _ => (Scalar::one(), self.clone()),
        }
    }

    /// Distribute products over sums, keeping scalar brackets intact:
    /// `(A + B) · C` becomes `A·C + B·C`, but `(3 + e_1) · A` keeps its
    /// scalar factor.
    pub fn expand(&self) -> TensorResult<Tensor> {
        let mut result = Tensor::zero();

        for tensor in self.summands() {
            match &tensor.kind {
                TensorKind::Scaled { tensor: child, scale } => {
                    for summand in child.expand()?.summands() {
                        result = Tensor::add(&result, &summand.scale(scale.clone()))?;
                    }
                }
                TensorKind::Multiplied { left, right } => {
                    let left_terms = left.expand()?.summands();
                    let right_terms = right.expand()?.summands();
                    if left_terms.len() == 1 && right_terms.len() == 1 {
                        result = Tensor::add(&result, &tensor)?;
                    } else {
                        for l in &left_terms {
                            for r in &right_terms {
                                result = Tensor::add(&result, &Tensor::mul(l, r)?)?;
                            }
                        }
                    }
                }
                _ => {
                    result = Tensor::add(&result, &tensor)?;
                }
            }
        }

        Ok(result)
    }
}

// ============================================================================
// OPERATORS
// ============================================================================

impl std::ops::Add<&Tensor> for &Tensor {
    type Output = Tensor;

    fn add(self, other: &Tensor) -> Tensor {
        Tensor::add(self, other).expect("incompatible indices in tensor addition")
    }
}

impl std::ops::Add for Tensor {
    type Output = Tensor;

    fn add(self, other: Tensor) -> Tensor {
        &self + &other
    }
}

impl std::ops::AddAssign<&Tensor> for Tensor {
    fn add_assign(&mut self, other: &Tensor) {
        let value = std::mem::replace(self, Tensor::zero());
        *self = &value + other;
    }
}

impl std::ops::AddAssign for Tensor {
    fn add_assign(&mut self, other: Tensor) {
        *self += &other;
    }
}

impl std::ops::Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        self.scale(Scalar::integer(-1))
    }
}

impl std::ops::Neg for Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        -&self
    }
}

impl std::ops::Sub<&Tensor> for &Tensor {
    type Output = Tensor;

    fn sub(self, other: &Tensor) -> Tensor {
        self + &(-other)
    }
}

impl std::ops::Sub for Tensor {
    type Output = Tensor;

    fn sub(self, other: Tensor) -> Tensor {
        &self - &other
    }
}

impl std::ops::SubAssign for Tensor {
    fn sub_assign(&mut self, other: Tensor) {
        let value = std::mem::replace(self, Tensor::zero());
        *self = value - other;
    }
}

impl std::ops::Mul<&Tensor> for &Tensor {
    type Output = Tensor;

    fn mul(self, other: &Tensor) -> Tensor {
        Tensor::mul(self, other).expect("incompatible indices in tensor multiplication")
    }
}

impl std::ops::Mul for Tensor {
    type Output = Tensor;

    fn mul(self, other: Tensor) -> Tensor {
        &self * &other
    }
}

impl std::ops::MulAssign for Tensor {
    fn mul_assign(&mut self, other: Tensor) {
        let value = std::mem::replace(self, Tensor::zero());
        *self = value * other;
    }
}

impl std::ops::Mul<Scalar> for &Tensor {
    type Output = Tensor;

    fn mul(self, scale: Scalar) -> Tensor {
        self.scale(scale)
    }
}

impl std::ops::Mul<Scalar> for Tensor {
    type Output = Tensor;

    fn mul(self, scale: Scalar) -> Tensor {
        self.scale(scale)
    }
}

impl std::ops::Mul<Tensor> for Scalar {
    type Output = Tensor;

    fn mul(self, tensor: Tensor) -> Tensor {
        tensor.scale(self)
    }
}

impl std::ops::Mul<&Tensor> for Scalar {
    type Output = Tensor;

    fn mul(self, tensor: &Tensor) -> Tensor {
        tensor.scale(self)
    }
}

impl std::ops::MulAssign<Scalar> for Tensor {
    fn mul_assign(&mut self, scale: Scalar) {
        let value = std::mem::replace(self, Tensor::zero());
        *self = value.scale(scale);
    }
}

// ============================================================================
// TESTS
// ============================================================================
