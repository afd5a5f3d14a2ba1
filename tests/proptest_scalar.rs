//! Property tests for the scalar sub-language.


use covtensor::Scalar;
use generators::{arb_linear_scalar, arb_rational, arb_variable};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Rational arithmetic is exact and commutative.
    #[test]
    fn rational_addition_commutes(a in arb_rational(), b in arb_rational()) {
        prop_assert_eq!(a.clone() + b.clone(), b + a);
    }

    #[test]
    fn rational_multiplication_commutes(a in arb_rational(), b in arb_rational()) {
        prop_assert_eq!(a.clone() * b.clone(), b * a);
    }

    /// Numeric identities hold for symbolic scalars too.
    #[test]
    fn additive_identity(s in arb_linear_scalar()) {
        prop_assert_eq!(s.clone() + Scalar::zero(), s);
    }

    #[test]
    fn multiplicative_identity(s in arb_linear_scalar()) {
        prop_assert_eq!(s.clone() * Scalar::one(), s.clone());
        prop_assert_eq!(s * Scalar::zero(), Scalar::zero());
    }

    /// Negation flips the numeric value.
    #[test]
    fn negation_flips_value(s in arb_linear_scalar()) {
        let negated = -s.clone();
        prop_assert!((negated.to_f64() + s.to_f64()).abs() < 1e-12);
    }

    /// Separation reassembles to the original value at any variable
    /// assignment (checked numerically at variables = 0, where only the
    /// rest survives).
    #[test]
    fn separation_preserves_numeric_rest(s in arb_linear_scalar()) {
        let (pairs, rest) = s.separate_variables_from_rest().unwrap();
        // Variables evaluate to zero in to_f64, so the numeric parts agree.
        prop_assert!((s.to_f64() - rest.to_f64()).abs() < 1e-12);
        for (variable, _) in pairs {
            prop_assert!(variable.is_variable());
        }
    }

    /// Substituting a variable by a rational eliminates it.
    #[test]
    fn substitution_eliminates_variable(c in arb_rational(), v in arb_variable()) {
        let scalar = c.clone() * v.clone() + Scalar::integer(1);
        let substituted = scalar.substitute(&v, &Scalar::fraction(1, 2));
        prop_assert!(!substituted.has_variables());
        let expected = c * Scalar::fraction(1, 2) + Scalar::integer(1);
        prop_assert!((substituted.to_f64() - expected.to_f64()).abs() < 1e-12);
    }

    /// Float reconstruction inverts exact rationals with small
    /// denominators.
    #[test]
    fn float_reconstruction_roundtrip(n in -100i64..=100, d in 1i64..=64) {
        let rational = Scalar::fraction(n, d);
        prop_assert_eq!(Scalar::from_f64_approx(rational.to_f64()), rational);
    }

    /// Scalar serialisation round-trips.
    #[test]
    fn scalar_serialization_roundtrip(s in arb_linear_scalar()) {
        prop_assert_eq!(Scalar::from_bytes(&s.to_bytes()).unwrap(), s);
    }
}
