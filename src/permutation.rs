//! Permutations of index positions and their signs.

use crate::error::{TensorError, TensorResult};
use crate::index::Indices;

/// A bijection on positions `[0, n)`.
///
/// `between(from, to)` builds the permutation carrying `from` into `to`;
/// applying it to any sequence of the same length performs the same
/// positional rearrangement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    // map[j] = position in the source that lands at position j
    map: Vec<usize>,
}

impl Permutation {
    /// Identity permutation on `n` positions.
    pub fn identity(n: usize) -> Self {
        Self {
            map: (0..n).collect(),
        }
    }

    /// The permutation taking `from` into `to`.
    ///
    /// Requires the sequences to be permutations of each other. Repeated
    /// indices are matched left to right.
    pub fn between(from: &Indices, to: &Indices) -> TensorResult<Self> {
        if !from.is_permutation_of(to) {
            return Err(TensorError::NotAPermutation);
        }

        let mut used = vec![false; from.len()];
        let mut map = Vec::with_capacity(from.len());
        for target in to.iter() {
            let source = from
                .iter()
                .enumerate()
                .position(|(i, index)| !used[i] && index == target)
                .ok_or(TensorError::NotAPermutation)?;
            used[source] = true;
            map.push(source);
        }

        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Sign of the permutation: +1 for even, -1 for odd (inversion count).
    pub fn sign(&self) -> i32 {
        let mut inversions = 0;
        for p in 0..self.map.len() {
            for q in (p + 1)..self.map.len() {
                if self.map[p] > self.map[q] {
                    inversions += 1;
                }
            }
        }
        if inversions % 2 == 0 {
            1
        } else {
            -1
        }
    }

    /// Apply the positional rearrangement to an index sequence.
    pub fn apply(&self, indices: &Indices) -> Indices {
        debug_assert_eq!(indices.len(), self.map.len());
        self.map.iter().map(|&i| indices[i].clone()).collect()
    }
}
