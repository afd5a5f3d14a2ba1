//! Canonical index ordering of atoms.
//!
//! Each atom's symmetry group fixes a unique representative: epsilon is
//! fully antisymmetric (sorting its indices flips the sign per swap),
//! gamma is symmetric, and the gamma pairs inside an epsilon-gamma
//! commute. Composite nodes canonicalize their children; products and
//! substitutions have no canonical form of their own.

use crate::permutation::Permutation;
use crate::scalar::Scalar;
use crate::tensor::expr::{Tensor, TensorKind};

impl Tensor {
    /// Return the expression with every atom's indices in canonical order,
    /// with permutation signs accounted for as scale factors.
    pub fn canonicalize(&self) -> Tensor {
        match &self.kind {
            TensorKind::Zero
            | TensorKind::Scalar { .. }
            | TensorKind::Delta
            | TensorKind::Multiplied { .. }
            | TensorKind::Substitute { .. } => self.clone(),

            TensorKind::Epsilon => {
                let sorted = self.indices.ordered();
                let sign = Permutation::between(&self.indices, &sorted)
                    .expect("sorting permutes the indices")
                    .sign();
                let epsilon = Tensor::epsilon(sorted);
                if sign < 0 {
                    epsilon.scale(Scalar::integer(-1))
                } else {
                    epsilon
                }
            }

            TensorKind::Gamma { signature } => {
                // The metric is symmetric; sorting costs no sign.
                Tensor::gamma_signature(self.indices.ordered(), signature.0, signature.1)
            }

            TensorKind::EpsilonGamma {
                num_epsilon,
                num_gamma,
            } => {
                let mut sign = 1;
                let mut new_indices = crate::index::Indices::empty();
                let mut pos = 0;

                if *num_epsilon == 1 {
                    let epsilon_indices = self.indices.partial(0..3);
                    let sorted = epsilon_indices.ordered();
                    sign = Permutation::between(&epsilon_indices, &sorted)
                        .expect("sorting permutes the indices")
                        .sign();
                    new_indices.append(&sorted);
                    pos = 3;
                }

                let mut gammas = Vec::with_capacity(*num_gamma);
                for _ in 0..*num_gamma {
                    gammas.push(self.indices.partial(pos..pos + 2).ordered());
                    pos += 2;
                }
                // Gammas commute; order the pairs by their first index.
                gammas.sort_by(|a, b| a[0].cmp(&b[0]));
                for gamma_indices in &gammas {
                    new_indices.append(gamma_indices);
                }

                let canonical = Tensor::epsilon_gamma(*num_epsilon, *num_gamma, new_indices);
                if sign < 0 {
                    canonical.scale(Scalar::integer(-1))
                } else {
                    canonical
                }
            }

            TensorKind::Scaled { tensor, scale } => {
                // Canonicalizing the child may surface another scale;
                // `scale` collapses nested scales into one factor.
                tensor.canonicalize().scale(scale.clone())
            }

            TensorKind::Added { summands } => Tensor::build(
                "",
                "",
                self.indices.clone(),
                TensorKind::Added {
                    summands: summands.iter().map(Tensor::canonicalize).collect(),
                },
            ),
        }
    }
}
