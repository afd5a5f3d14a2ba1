//! Factorisation of sums over linearly independent component vectors.
//!
//! A sum of tensorial terms usually hides linear dependencies that are
//! invisible term-by-term (numerical identities between the atoms). The
//! component matrix makes them explicit: one column per summand, one row
//! per index combination. Row reduction finds a basis among the columns;
//! every other column is a linear combination of basis columns and folds
//! its scale into theirs.

use log::debug;
use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::error::{TensorError, TensorResult};
use crate::index::IndexAssignments;
use crate::matrix::{to_row_echelon_form, PIVOT_TOLERANCE};
use crate::scalar::Scalar;
use crate::tensor::expr::{Tensor, TensorKind};

impl Tensor {
    /// Factorise the expression over its linearly independent components.
    ///
    /// Preserves every component pointwise. Scales distribute, products
    /// simplify factor-wise, and sums are reduced through the component
    /// matrix; anything else is already as simple as it gets.
    pub fn simplify(&self) -> TensorResult<Tensor> {
        match &self.kind {
            TensorKind::Scaled { .. } => {
                let (scale, tensor) = self.separate_scale_factor();
                Ok(tensor.simplify()?.scale(scale))
            }
            TensorKind::Multiplied { left, right } => {
                Tensor::mul(&left.simplify()?, &right.simplify()?)
            }
            TensorKind::Added { .. } => self.simplify_sum(),
            _ => Ok(self.clone()),
        }
    }

    fn simplify_sum(&self) -> TensorResult<Tensor> {
        let summands = self.summands();
        let stripped: Vec<(Scalar, Tensor)> = summands
            .iter()
            .map(Tensor::separate_scale_factor)
            .collect();

        let combinations: Vec<Vec<usize>> = self.indices.all_combinations().collect();
        let dimension = combinations.len();
        debug!(
            "simplify: {} summands over {} index combinations",
            stripped.len(),
            dimension
        );

        // One task per summand; each produces its own column.
        let columns: Vec<Vec<f64>> = stripped
            .par_iter()
            .map(|(_, tensor)| -> TensorResult<Vec<f64>> {
                combinations
                    .iter()
                    .map(|combination| {
                        let assignment =
                            IndexAssignments::from_indices(&self.indices, combination)?;
                        Ok(tensor.evaluate_assigned(&assignment)?.to_f64())
                    })
                    .collect()
            })
            .collect::<TensorResult<Vec<_>>>()?;

        let mut matrix = DMatrix::zeros(dimension, stripped.len());
        for (i, column) in columns.iter().enumerate() {
            for (j, &value) in column.iter().enumerate() {
                if value != 0.0 {
                    matrix[(j, i)] = value;
                }
            }
        }

        to_row_echelon_form(&mut matrix);

        // Walk the reduced rows: the pivot column selects the basis
        // summand, later nonzero entries fold their summand's scale in.
        let mut collected: Vec<(Scalar, Tensor)> = Vec::new();
        let mut next_pivot = 0;
        let max_rows = dimension.min(stripped.len());

        for row in 0..max_rows {
            let mut coefficient = Scalar::zero();
            let mut basis: Option<Tensor> = None;

            for i in next_pivot..stripped.len() {
                let value = matrix[(row, i)];
                if value == 0.0 {
                    continue;
                }
                if basis.is_none() {
                    if (value - 1.0).abs() <= PIVOT_TOLERANCE {
                        coefficient = stripped[i].0.clone();
                        basis = Some(stripped[i].1.clone());
                        next_pivot = i + 1;
                    } else {
                        // A pivot of a reduced matrix is a leading 1; a
                        // different leading value means the input violated
                        // the routine's contract.
                        return Err(TensorError::RowReductionFailed);
                    }
                } else {
                    coefficient += stripped[i].0.clone() * Scalar::from_f64_approx(value);
                }
            }

            let basis = match basis {
                Some(tensor) => tensor,
                // An all-zero row: the remaining rows carry no information.
                None => break,
            };

            if let Some(entry) = collected.iter_mut().find(|(s, _)| *s == coefficient) {
                entry.1 = Tensor::add(&entry.1, &basis)?;
            } else {
                collected.push((coefficient, basis));
            }
        }

        let mut result = Tensor::zero();
        for (coefficient, tensor) in collected {
            result = Tensor::add(&result, &tensor.scale(coefficient))?;
        }
        Ok(result)
    }
}
