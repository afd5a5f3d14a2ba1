//! Variable extraction and linear systems over tensorial equations.
//!
//! A tensorial ansatz is a sum of basis tensors with variable prefactors.
//! These routines pull the variables out of the scale factors, regroup
//! terms per variable, and materialise the coefficient tensors as the
//! numeric matrix of a homogeneous linear system.

use nalgebra::DMatrix;

use crate::error::TensorResult;
use crate::index::IndexAssignments;
use crate::scalar::Scalar;
use crate::tensor::expr::{Tensor, TensorKind};

/// Result of pulling the variables out of an expression: per-variable
/// coefficient tensors plus the variable-free remainder.
#[derive(Clone, Debug)]
pub struct ExtractedVariables {
    pub pairs: Vec<(Scalar, Tensor)>,
    pub inhomogeneous: Tensor,
}

impl Tensor {
    /// True iff any summand's scale factor carries a variable.
    pub fn has_variables(&self) -> bool {
        self.summands()
            .iter()
            .any(|summand| summand.separate_scale_factor().0.has_variables())
    }

    /// Record, for every variable in the scale factors, the sum of the
    /// tensors it multiplies. Numeric-only parts accumulate in the
    /// inhomogeneous remainder.
    ///
    /// Products of two variables inside one scale are rejected with
    /// `QuadraticVariables`.
    pub fn extract_variables(&self) -> TensorResult<ExtractedVariables> {
        let mut pairs: Vec<(Scalar, Tensor)> = Vec::new();
        let mut inhomogeneous = Tensor::zero();

        for summand in self.summands() {
            let (scale, tensor) = summand.separate_scale_factor();
            let (variable_terms, rest) = scale.separate_variables_from_rest()?;

            for (variable, coefficient) in variable_terms {
                let contribution = tensor.scale(coefficient);
                if let Some(entry) = pairs.iter_mut().find(|(v, _)| *v == variable) {
                    entry.1 = Tensor::add(&entry.1, &contribution)?;
                } else {
                    pairs.push((variable, contribution));
                }
            }

            if !rest.is_zero() {
                inhomogeneous = Tensor::add(&inhomogeneous, &tensor.scale(rest))?;
            }
        }

        Ok(ExtractedVariables {
            pairs,
            inhomogeneous,
        })
    }

    /// Materialise the variable coefficients as a real matrix
    /// `M[j][i] = tensor_i(combination_j)`, returned with the ordered
    /// variable list.
    pub fn to_homogeneous_linear_system(&self) -> TensorResult<(DMatrix<f64>, Vec<Scalar>)> {
        let extracted = self.extract_variables()?;
        let combinations: Vec<Vec<usize>> = self.indices.all_combinations().collect();

        let mut matrix = DMatrix::zeros(combinations.len(), extracted.pairs.len());
        let mut variables = Vec::with_capacity(extracted.pairs.len());

        for (i, (variable, tensor)) in extracted.pairs.iter().enumerate() {
            variables.push(variable.clone());
            for (j, combination) in combinations.iter().enumerate() {
                let assignment = IndexAssignments::from_indices(&self.indices, combination)?;
                matrix[(j, i)] = tensor.evaluate_assigned(&assignment)?.to_f64();
            }
        }

        Ok((matrix, variables))
    }

    /// Regroup an expanded expression as `Σ variable_i · coefficient_i`
    /// plus the variable-free remainder.
    pub fn collect_by_variables(&self) -> TensorResult<Tensor> {
        let expanded = self.expand()?;

        let mut variables: Vec<Scalar> = Vec::new();
        let mut tensors: Vec<Tensor> = Vec::new();
        let mut rest = Tensor::zero();

        for summand in expanded.summands() {
            let (scale, tensor) = summand.separate_scale_factor();
            let (variable_terms, numeric_rest) = scale.separate_variables_from_rest()?;

            for (variable, coefficient) in variable_terms {
                let contribution = tensor.scale(coefficient);
                if let Some(position) = variables.iter().position(|v| *v == variable) {
                    tensors[position] = Tensor::add(&tensors[position], &contribution)?;
                } else {
                    variables.push(variable);
                    tensors.push(contribution);
                }
            }

            if !numeric_rest.is_zero() {
                rest = Tensor::add(&rest, &tensor.scale(numeric_rest))?;
            }
        }

        let mut result = Tensor::zero();
        for (variable, tensor) in variables.into_iter().zip(tensors) {
            result = Tensor::add(&result, &tensor.scale(variable))?;
        }
        Tensor::add(&result, &rest)
    }

    /// Replace a variable by a scalar expression in every scale factor.
    pub fn substitute_variable(&self, variable: &Scalar, expression: &Scalar) -> TensorResult<Tensor> {
        let mut result = Tensor::zero();
        for summand in self.summands() {
            let (scale, tensor) = summand.separate_scale_factor();
            let substituted = scale.substitute(variable, expression);
            result = Tensor::add(&result, &tensor.scale(substituted))?;
        }
        Ok(result)
    }

    /// Apply a list of substitutions, then regroup by the remaining
    /// variables.
    pub fn substitute_variables(
        &self,
        substitutions: &[(Scalar, Scalar)],
    ) -> TensorResult<Tensor> {
        let mut result = self.clone();
        for (variable, expression) in substitutions {
            result = result.substitute_variable(variable, expression)?;
        }
        result.collect_by_variables()
    }

    /// Replace every variable-carrying prefactor by a fresh variable of
    /// the given family, numbered from `1 + offset`.
    pub fn redefine_variables(&self, name: &str, offset: u32) -> TensorResult<Tensor> {
        let mut result = Tensor::zero();
        let mut counter = 1 + offset;

        for summand in self.summands() {
            match &summand.kind {
                TensorKind::Scaled { tensor, scale } if scale.has_variables() => {
                    let fresh = Scalar::variable(name, counter);
                    counter += 1;
                    result = Tensor::add(&result, &tensor.scale(fresh))?;
                }
                TensorKind::Multiplied { left, right } => {
                    let (left_scale, left_tensor) = left.separate_scale_factor();
                    let (right_scale, right_tensor) = right.separate_scale_factor();
                    let product = Tensor::mul(&left_tensor, &right_tensor)?;
                    if left_scale.has_variables() || right_scale.has_variables() {
                        let fresh = Scalar::variable(name, counter);
                        counter += 1;
                        result = Tensor::add(&result, &product.scale(fresh))?;
                    } else {
                        result = Tensor::add(
                            &result,
                            &product.scale(left_scale * right_scale),
                        )?;
                    }
                }
                _ => {
                    result = Tensor::add(&result, &summand)?;
                }
            }
        }

        Ok(result)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Index, IndexRange, Indices};

    fn named(names: &[&str]) -> Indices {
        names
            .iter()
            .map(|n| Index::named(*n, IndexRange::space()))
            .collect()
    }

    fn ansatz() -> (Tensor, Scalar, Scalar) {
        // e_1 * gamma_{ab} + e_2 * epsilon-gamma_{ab} + gamma_{ab}
        let e1 = Scalar::variable("e", 1);
        let e2 = Scalar::variable("e", 2);
        let gamma = Tensor::gamma(named(&["a", "b"]));
        let eps_gamma = Tensor::epsilon_gamma(0, 1, named(&["a", "b"]));

        let sum = Tensor::add(
            &Tensor::add(&gamma.scale(e1.clone()), &eps_gamma.scale(e2.clone())).unwrap(),
            &gamma,
        )
        .unwrap();
        (sum, e1, e2)
    }

    #[test]
    fn test_has_variables() {
        let (sum, _, _) = ansatz();
        assert!(sum.has_variables());
        assert!(!Tensor::gamma(named(&["a", "b"])).has_variables());
    }

    #[test]
    fn test_extract_variables() {
        let (sum, e1, e2) = ansatz();
        let extracted = sum.extract_variables().unwrap();

        assert_eq!(extracted.pairs.len(), 2);
        assert_eq!(extracted.pairs[0].0, e1);
        assert_eq!(extracted.pairs[1].0, e2);
        assert!(extracted.pairs[0].1.is_gamma());
        assert!(!extracted.inhomogeneous.is_zero_tensor());
    }

    #[test]
    fn test_extract_merges_repeated_variables() {
        let e1 = Scalar::variable("e", 1);
        let gamma = Tensor::gamma(named(&["a", "b"]));
        let eps_gamma = Tensor::epsilon_gamma(0, 1, named(&["a", "b"]));
        let sum = Tensor::add(
            &gamma.scale(e1.clone()),
            &eps_gamma.scale(e1.clone()),
        )
        .unwrap();

        let extracted = sum.extract_variables().unwrap();
        assert_eq!(extracted.pairs.len(), 1);
        assert!(extracted.pairs[0].1.is_added());
    }

    #[test]
    fn test_homogeneous_linear_system_shape() {
        let (sum, _, _) = ansatz();
        let (matrix, variables) = sum.to_homogeneous_linear_system().unwrap();

        assert_eq!(variables.len(), 2);
        assert_eq!(matrix.nrows(), 9); // 3 x 3 index combinations
        assert_eq!(matrix.ncols(), 2);

        // The gamma column has ones on the diagonal combinations.
        assert_eq!(matrix[(0, 0)], 1.0); // (1, 1)
        assert_eq!(matrix[(1, 0)], 0.0); // (1, 2)
    }

    #[test]
    fn test_substitute_variable() {
        let (sum, e1, _) = ansatz();
        let substituted = sum
            .substitute_variable(&e1, &Scalar::integer(2))
            .unwrap();
        assert!(substituted.has_variables()); // e_2 remains

        let fixed = substituted
            .substitute_variable(&Scalar::variable("e", 2), &Scalar::zero())
            .unwrap();
        assert!(!fixed.has_variables());

        // gamma picked up 2 + 1, epsilon-gamma dropped out.
        for combination in sum.all_index_combinations() {
            let gamma = Tensor::gamma(named(&["a", "b"]));
            assert_eq!(
                fixed.evaluate(&combination).unwrap(),
                gamma.evaluate(&combination).unwrap() * Scalar::integer(3)
            );
        }
    }

    #[test]
    fn test_collect_by_variables_groups() {
        let e1 = Scalar::variable("e", 1);
        let gamma = Tensor::gamma(named(&["a", "b"]));
        let eps_gamma = Tensor::epsilon_gamma(0, 1, named(&["a", "b"]));
        let sum = Tensor::add(
            &gamma.scale(e1.clone()),
            &eps_gamma.scale(e1.clone()),
        )
        .unwrap();

        let collected = sum.collect_by_variables().unwrap();
        // One variable, so one scaled group.
        assert!(collected.is_scaled());
    }

    #[test]
    fn test_redefine_variables() {
        let (sum, _, _) = ansatz();
        let redefined = sum.redefine_variables("q", 0).unwrap();

        let extracted = redefined.extract_variables().unwrap();
        let names: Vec<String> = extracted
            .pairs
            .iter()
            .map(|(v, _)| v.to_string())
            .collect();
        assert_eq!(names, vec!["q_1", "q_2"]);
    }
}
