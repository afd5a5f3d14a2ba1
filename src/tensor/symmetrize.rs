//! Symmetrisation of tensor expressions.
//!
//! All three routines share one skeleton: enumerate the index orderings
//! the symmetry group allows, build a canonicalised clone per ordering
//! (in parallel), then collect like terms by comparing scale-stripped
//! canonical forms. The final weight is `1/|permutations|`.

use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;

use crate::error::{TensorError, TensorResult};
use crate::index::{Index, Indices};
use crate::permutation::Permutation;
use crate::scalar::Scalar;
use crate::tensor::expr::Tensor;

impl Tensor {
    /// Symmetrize over the given subset of the declared indices.
    ///
    /// Every index of `subset` must be declared; otherwise
    /// `NotAPermutation` is returned.
    pub fn symmetrize(&self, subset: &Indices) -> TensorResult<Tensor> {
        self.symmetrize_impl(subset, false)
    }

    /// Anti-symmetrize over the given subset of the declared indices.
    pub fn anti_symmetrize(&self, subset: &Indices) -> TensorResult<Tensor> {
        self.symmetrize_impl(subset, true)
    }

    fn symmetrize_impl(&self, subset: &Indices, anti: bool) -> TensorResult<Tensor> {
        if self.is_zero_tensor() {
            return Ok(self.clone());
        }

        // Sums: transform every summand in parallel, then try to collect.
        if self.is_added() {
            let summands = self.summands();
            let results: Vec<(Scalar, Tensor)> = summands
                .par_iter()
                .map(|summand| {
                    summand
                        .symmetrize_impl(subset, anti)
                        .map(|r| r.separate_scale_factor())
                })
                .collect::<TensorResult<Vec<_>>>()?;
            return collect_parallel_results(results, anti);
        }

        // Scales distribute; a zero result swallows the scale.
        if self.is_scaled() {
            let (scale, tensor) = self.separate_scale_factor();
            let symmetrized = tensor.symmetrize_impl(subset, anti)?;
            if symmetrized.is_zero_tensor() {
                return Ok(symmetrized);
            }
            return Ok(symmetrized.scale(scale));
        }

        let permutations = self.permutations_fixing(subset)?;
        let count = permutations.len();
        debug!(
            "symmetrize: {} orderings of {} indices",
            count,
            subset.len()
        );

        let original = self.indices.clone();
        let stack: Vec<Tensor> = permutations
            .par_iter()
            .map(|permuted| -> TensorResult<Tensor> {
                let mut clone = self.clone();
                clone.set_indices(permuted);
                let mut term = clone.canonicalize();
                if anti {
                    let sign = Permutation::between(&original, permuted)?.sign();
                    if sign < 0 {
                        term = term.scale(Scalar::integer(-1));
                    }
                }
                Ok(term)
            })
            .collect::<TensorResult<Vec<_>>>()?;

        let reduced = reduce_stack(stack);

        let mut result = Tensor::zero();
        for (scale, tensor) in reduced {
            result = Tensor::add(&result, &tensor.scale(scale))?;
        }
        if !result.is_zero_tensor() {
            result = result.scale(Scalar::fraction(1, count as i64));
        }
        Ok(result)
    }

    /// Symmetrize under the exchange `from[i] → to[i]`; both sequences
    /// must be permutations of the declared indices.
    pub fn exchange_symmetrize(&self, from: &Indices, to: &Indices) -> TensorResult<Tensor> {
        if from.len() != to.len()
            || !from.is_permutation_of(&self.indices)
            || !to.is_permutation_of(&self.indices)
        {
            return Err(TensorError::NotAPermutation);
        }
        if self.is_zero_tensor() {
            return Ok(self.clone());
        }

        let mut mapping: BTreeMap<Index, Index> = BTreeMap::new();
        for i in 0..from.len() {
            mapping.insert(from[i].clone(), to[i].clone());
        }

        if self.is_added() {
            let summands = self.summands();
            let results: Vec<(Scalar, Tensor)> = summands
                .par_iter()
                .map(|summand| {
                    let target = summand.indices().shuffle(&mapping);
                    summand
                        .exchange_symmetrize(summand.indices(), &target)
                        .map(|r| r.separate_scale_factor())
                })
                .collect::<TensorResult<Vec<_>>>()?;
            return collect_parallel_results(results, true);
        }

        if self.is_scaled() {
            let (scale, tensor) = self.separate_scale_factor();
            return Ok(tensor.exchange_symmetrize(from, to)?.scale(scale));
        }

        let target = self.indices.shuffle(&mapping);
        let mut clone = self.clone();
        clone.set_indices(&target);
        let clone = clone.canonicalize();

        let (first_scale, stripped) = self.separate_scale_factor();
        let (second_scale, exchanged) = clone.separate_scale_factor();

        if stripped == exchanged {
            // Equal modulo scale: the half-sum acts on the scales alone.
            let new_scale = Scalar::fraction(1, 2) * (first_scale + second_scale);
            Ok(stripped.scale(new_scale))
        } else {
            Ok(Tensor::add(self, &clone)?.scale(Scalar::fraction(1, 2)))
        }
    }

    /// All orderings of the declared indices that permute only the
    /// positions of `subset`.
    fn permutations_fixing(&self, subset: &Indices) -> TensorResult<Vec<Indices>> {
        let mut positions = Vec::with_capacity(subset.len());
        for index in subset.iter() {
            match self.indices.position_of(index) {
                Some(position) => positions.push(position),
                None => return Err(TensorError::NotAPermutation),
            }
        }

        let items: Vec<Index> = positions.iter().map(|&p| self.indices[p].clone()).collect();
        let base = self.indices.as_slice().to_vec();

        Ok(permutations_of(&items)
            .into_iter()
            .map(|ordering| {
                let mut indices = base.clone();
                for (&slot, index) in positions.iter().zip(ordering) {
                    indices[slot] = index;
                }
                Indices::new(indices)
            })
            .collect())
    }
}

/// All orderings of a list of indices (recursive enumeration).
fn permutations_of(items: &[Index]) -> Vec<Vec<Index>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations_of(&rest) {
            tail.insert(0, head.clone());
            result.push(tail);
        }
    }
    result
}

/// Collect like terms: pop the first term, fold in every later term whose
/// scale-stripped form matches, summing scales; drop zero scales.
fn reduce_stack(stack: Vec<Tensor>) -> Vec<(Scalar, Tensor)> {
    let mut stack = stack;
    let mut reduced = Vec::new();

    while !stack.is_empty() {
        let (mut scale, current) = stack.remove(0).separate_scale_factor();

        let mut i = 0;
        while i < stack.len() {
            let (other_scale, other) = stack[i].separate_scale_factor();
            if other == current {
                scale += other_scale;
                stack.remove(i);
            } else {
                i += 1;
            }
        }

        if !scale.is_zero() {
            reduced.push((scale, current));
        }
    }

    reduced
}

/// Collection pass over per-summand results: if every summand came back
/// with the same prefactor (up to sign when `signed`), flatten onto one
/// stack and deduplicate; otherwise just sum the prefactor·term pairs.
fn collect_parallel_results(
    results: Vec<(Scalar, Tensor)>,
    signed: bool,
) -> TensorResult<Tensor> {
    if results.is_empty() {
        return Ok(Tensor::zero());
    }

    let overall = results[0].0.clone();
    let same_scale = results
        .iter()
        .all(|(scale, _)| *scale == overall || (signed && *scale == -overall.clone()));

    if !same_scale {
        let mut result = Tensor::zero();
        for (scale, tensor) in results {
            result = Tensor::add(&result, &tensor.scale(scale))?;
        }
        return Ok(result);
    }

    let mut stack = Vec::new();
    for (scale, tensor) in &results {
        for term in tensor.summands() {
            if *scale == overall {
                stack.push(term);
            } else {
                stack.push(term.scale(Scalar::integer(-1)));
            }
        }
    }

    let reduced = reduce_stack(stack);
    if reduced.is_empty() {
        return Ok(Tensor::zero());
    }

    let common = reduced[0].0.clone();
    let all_common = reduced
        .iter()
        .all(|(scale, _)| *scale == common || (signed && *scale == -common.clone()));

    let mut result = Tensor::zero();
    if all_common {
        for (scale, tensor) in &reduced {
            if *scale == common {
                result = Tensor::add(&result, tensor)?;
            } else {
                result = Tensor::add(&result, &tensor.scale(Scalar::integer(-1)))?;
            }
        }
        result = result.scale(common);
    } else {
        for (scale, tensor) in reduced {
            result = Tensor::add(&result, &tensor.scale(scale))?;
        }
    }

    Ok(result.scale(overall))
}

// ============================================================================
// TESTS
// ============================================================================
