//! Property tests for the tensor engine.
//!
//! Checks the algebraic laws the engine promises: evaluation determinism,
//! canonicalisation idempotence and component preservation, simplify
//! preserving components pointwise, the symmetrisation symmetries, and
//! the delta contraction rule.


use covtensor::{Index, IndexAssignments, IndexRange, Indices, Scalar, Tensor};
use generators::{arb_rank2_atom, arb_rank2_sum, arb_rank3_atom};
use proptest::prelude::*;

fn assignment_for(tensor: &Tensor, combination: &[usize]) -> IndexAssignments {
    IndexAssignments::from_indices(tensor.indices(), combination)
        .expect("combination matches the declared indices")
}

// ============================================================================
// Evaluation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Repeated evaluation returns equal scalars.
    #[test]
    fn evaluate_is_deterministic(tensor in arb_rank2_sum()) {
        for combination in tensor.all_index_combinations() {
            let first = tensor.evaluate(&combination).unwrap();
            let second = tensor.evaluate(&combination).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    /// Name-keyed evaluation agrees with positional evaluation.
    #[test]
    fn assigned_evaluation_matches_positional(tensor in arb_rank3_atom()) {
        for combination in tensor.all_index_combinations() {
            let assignment = assignment_for(&tensor, &combination);
            prop_assert_eq!(
                tensor.evaluate(&combination).unwrap(),
                tensor.evaluate_assigned(&assignment).unwrap()
            );
        }
    }
}

// ============================================================================
// Canonicalisation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Canonicalisation is idempotent.
    #[test]
    fn canonicalize_idempotent(tensor in arb_rank3_atom()) {
        let once = tensor.canonicalize();
        let twice = once.canonicalize();
        prop_assert_eq!(once, twice);
    }

    /// Canonicalisation preserves every component.
    #[test]
    fn canonicalize_preserves_components(tensor in arb_rank3_atom()) {
        let canonical = tensor.canonicalize();
        for combination in tensor.all_index_combinations() {
            let assignment = assignment_for(&tensor, &combination);
            prop_assert_eq!(
                tensor.evaluate(&combination).unwrap(),
                canonical.evaluate_assigned(&assignment).unwrap()
            );
        }
    }

    /// Canonicalisation of sums preserves components summand-wise.
    #[test]
    fn canonicalize_sum_preserves_components(tensor in arb_rank2_sum()) {
        let canonical = tensor.canonicalize();
        for combination in tensor.all_index_combinations() {
            let assignment = assignment_for(&tensor, &combination);
            prop_assert_eq!(
                tensor.evaluate(&combination).unwrap(),
                canonical.evaluate_assigned(&assignment).unwrap()
            );
        }
    }
}

// ============================================================================
// Simplify
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Simplify preserves components pointwise.
    #[test]
    fn simplify_preserves_components(tensor in arb_rank2_sum()) {
        let simplified = tensor.simplify().unwrap();
        for combination in tensor.all_index_combinations() {
            let assignment = assignment_for(&tensor, &combination);
            prop_assert_eq!(
                tensor.evaluate(&combination).unwrap(),
                simplified.evaluate_assigned(&assignment).unwrap()
            );
        }
    }
}

// ============================================================================
// Symmetrisation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A symmetrized tensor is invariant under exchanging the
    /// symmetrized positions.
    #[test]
    fn symmetrize_makes_components_invariant(tensor in arb_rank2_atom()) {
        let subset = tensor.indices().clone();
        let symmetrized = tensor.symmetrize(&subset).unwrap();

        if symmetrized.is_zero_tensor() {
            return Ok(());
        }

        for combination in symmetrized.all_index_combinations() {
            let mut swapped = combination.clone();
            swapped.swap(0, 1);
            prop_assert_eq!(
                symmetrized.evaluate(&combination).unwrap(),
                symmetrized.evaluate(&swapped).unwrap()
            );
        }
    }

    /// An anti-symmetrized tensor flips sign under exchanging the
    /// anti-symmetrized positions.
    #[test]
    fn anti_symmetrize_makes_components_alternate(tensor in arb_rank2_atom()) {
        let subset = tensor.indices().clone();
        let anti = tensor.anti_symmetrize(&subset).unwrap();

        if anti.is_zero_tensor() {
            return Ok(());
        }

        for combination in anti.all_index_combinations() {
            let mut swapped = combination.clone();
            swapped.swap(0, 1);
            let value = anti.evaluate(&combination).unwrap();
            let flipped = anti.evaluate(&swapped).unwrap();
            prop_assert_eq!(value, -flipped);
        }
    }

    /// Symmetrisation is a projector: applying it twice equals once.
    #[test]
    fn symmetrize_is_idempotent_pointwise(tensor in arb_rank2_atom()) {
        let subset = tensor.indices().clone();
        let once = tensor.symmetrize(&subset).unwrap();
        if once.is_zero_tensor() {
            return Ok(());
        }
        let twice = once.symmetrize(&subset).unwrap();

        for combination in once.all_index_combinations() {
            let assignment = assignment_for(&once, &combination);
            let first = once.evaluate(&combination).unwrap();
            let second = if twice.is_zero_tensor() {
                Scalar::zero()
            } else {
                twice.evaluate_assigned(&assignment).unwrap()
            };
            prop_assert_eq!(first, second);
        }
    }
}

// ============================================================================
// Delta contraction
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// `delta^a_b · T^{…b…}` evaluates identically to `T^{…a…}`.
    #[test]
    fn delta_contraction_renames_in_place(tensor in arb_rank3_atom(), slot in 0usize..3) {
        // Build a delta sharing exactly one name with the tensor.
        let shared = tensor.indices()[slot].clone();
        let fresh = Index::named("z", IndexRange::space());
        prop_assume!(!tensor.indices().contains(&fresh));

        let delta = Tensor::delta(Indices::new(vec![fresh.clone(), shared.clone()]));
        let contracted = Tensor::mul(&delta, &tensor).unwrap();

        // The expected result is the tensor with the shared name replaced
        // in place by the fresh one.
        let mut renamed_indices: Vec<Index> = tensor.indices().iter().cloned().collect();
        renamed_indices[slot] = fresh;
        let mut expected = tensor.clone();
        expected.set_indices(&Indices::new(renamed_indices));

        prop_assert_eq!(contracted.indices(), expected.indices());
        for combination in expected.all_index_combinations() {
            prop_assert_eq!(
                contracted.evaluate(&combination).unwrap(),
                expected.evaluate(&combination).unwrap()
            );
        }
    }
}

// ============================================================================
// Serialisation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Serialisation round-trips structurally.
    #[test]
    fn serialization_roundtrip(tensor in arb_rank2_sum()) {
        let decoded = Tensor::from_bytes(&tensor.to_bytes()).unwrap();
        prop_assert_eq!(&decoded, &tensor);
        prop_assert!(decoded.is_equal(&tensor).unwrap());
    }
}
