//! The scalar sub-language: exact rationals, named variables, and their
//! sums and products.
//!
//! Scalars appear as tensor components and as scale factors. Numeric
//! arithmetic folds eagerly; symbolic terms build structure. Rationals use
//! machine-sized integers (`Rational64`), whose reduced normal form gives
//! cross-multiplication equality and a positive denominator for free.

use num_rational::Rational64;
use num_traits::Zero;

use crate::error::{TensorError, TensorResult};

/// A symbolic scalar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scalar {
    /// Exact rational with machine-sized numerator and denominator.
    Rational(Rational64),
    /// Named variable; the integer suffix distinguishes generated families.
    Variable { name: String, index: u32 },
    /// Sum of scalars.
    Added(Vec<Scalar>),
    /// Product of two scalars.
    Multiplied(Box<Scalar>, Box<Scalar>),
}

impl Scalar {
    pub fn zero() -> Self {
        Scalar::Rational(Rational64::zero())
    }

    pub fn one() -> Self {
        Scalar::Rational(Rational64::from_integer(1))
    }

    pub fn integer(value: i64) -> Self {
        Scalar::Rational(Rational64::from_integer(value))
    }

    /// Exact fraction; the representation reduces and keeps the
    /// denominator positive.
    pub fn fraction(numerator: i64, denominator: i64) -> Self {
        assert!(denominator != 0, "fraction denominator must be nonzero");
        Scalar::Rational(Rational64::new(numerator, denominator))
    }

    pub fn variable(name: impl Into<String>, index: u32) -> Self {
        Scalar::Variable {
            name: name.into(),
            index,
        }
    }

    /// Reconstruct a rational from a floating-point row-reduction residual
    /// by bounded continued-fraction approximation (denominator ≤ 10⁶,
    /// tolerance 1e-9). Integral inputs reconstruct exactly.
    pub fn from_f64_approx(value: f64) -> Self {
        const MAX_DENOMINATOR: i64 = 1_000_000;
        const TOLERANCE: f64 = 1e-9;

        if !value.is_finite() {
            return Scalar::zero();
        }

        let negative = value < 0.0;
        let target = value.abs();

        let (mut h0, mut k0, mut h1, mut k1) = (0i64, 1i64, 1i64, 0i64);
        let mut x = target;
        loop {
            let a = x.floor();
            if a >= i64::MAX as f64 {
                break;
            }
            let a = a as i64;
            let h2 = match a.checked_mul(h1).and_then(|v| v.checked_add(h0)) {
                Some(v) => v,
                None => break,
            };
            let k2 = match a.checked_mul(k1).and_then(|v| v.checked_add(k0)) {
                Some(v) => v,
                None => break,
            };
            if k2 > MAX_DENOMINATOR {
                break;
            }
            h0 = h1;
            k0 = k1;
            h1 = h2;
            k1 = k2;

            if (h1 as f64 / k1 as f64 - target).abs() < TOLERANCE {
                break;
            }
            let fractional = x - a as f64;
            if fractional < TOLERANCE {
                break;
            }
            x = 1.0 / fractional;
        }

        let mut rational = Rational64::new(h1, k1.max(1));
        if negative {
            rational = -rational;
        }
        Scalar::Rational(rational)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Rational(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Scalar::Variable { .. })
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Scalar::Added(_))
    }

    /// Numerically zero and free of variables.
    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::Rational(r) => r.is_zero(),
            _ => false,
        }
    }

    pub fn has_variables(&self) -> bool {
        match self {
            Scalar::Rational(_) => false,
            Scalar::Variable { .. } => true,
            Scalar::Added(summands) => summands.iter().any(Scalar::has_variables),
            Scalar::Multiplied(left, right) => left.has_variables() || right.has_variables(),
        }
    }

    /// Numeric value; variables contribute zero.
    pub fn to_f64(&self) -> f64 {
        match self {
            Scalar::Rational(r) => *r.numer() as f64 / *r.denom() as f64,
            Scalar::Variable { .. } => 0.0,
            Scalar::Added(summands) => summands.iter().map(Scalar::to_f64).sum(),
            Scalar::Multiplied(left, right) => left.to_f64() * right.to_f64(),
        }
    }

    /// Top-level summands of the scalar (the scalar itself if not a sum).
    pub fn summands(&self) -> Vec<Scalar> {
        match self {
            Scalar::Added(summands) => summands.clone(),
            other => vec![other.clone()],
        }
    }

    /// Separate a scalar into (variable, coefficient) pairs and the numeric
    /// rest, expanding sums on the way down.
    ///
    /// A product of two variables (or any non-linear shape) is rejected
    /// with `QuadraticVariables`.
    pub fn separate_variables_from_rest(&self) -> TensorResult<(Vec<(Scalar, Scalar)>, Scalar)> {
        let mut pairs: Vec<(Scalar, Scalar)> = Vec::new();
        let mut rest = Scalar::zero();
        self.collect_linear_terms(&Scalar::one(), &mut pairs, &mut rest)?;
        Ok((pairs, rest))
    }

    fn collect_linear_terms(
        &self,
        coefficient: &Scalar,
        pairs: &mut Vec<(Scalar, Scalar)>,
        rest: &mut Scalar,
    ) -> TensorResult<()> {
        match self {
            Scalar::Rational(_) => {
                *rest = rest.clone() + self.clone() * coefficient.clone();
                Ok(())
            }
            Scalar::Variable { .. } => {
                push_pair(pairs, self.clone(), coefficient.clone());
                Ok(())
            }
            Scalar::Added(summands) => {
                for summand in summands {
                    summand.collect_linear_terms(coefficient, pairs, rest)?;
                }
                Ok(())
            }
            Scalar::Multiplied(left, right) => match (left.as_ref(), right.as_ref()) {
                (variable @ Scalar::Variable { .. }, numeric) if !numeric.has_variables() => {
                    push_pair(
                        pairs,
                        variable.clone(),
                        numeric.clone() * coefficient.clone(),
                    );
                    Ok(())
                }
                (numeric, variable @ Scalar::Variable { .. }) if !numeric.has_variables() => {
                    push_pair(
                        pairs,
                        variable.clone(),
                        numeric.clone() * coefficient.clone(),
                    );
                    Ok(())
                }
                (numeric, sum @ Scalar::Added(_)) if !numeric.has_variables() => {
                    sum.collect_linear_terms(&(numeric.clone() * coefficient.clone()), pairs, rest)
                }
                (sum @ Scalar::Added(_), numeric) if !numeric.has_variables() => {
                    sum.collect_linear_terms(&(numeric.clone() * coefficient.clone()), pairs, rest)
                }
                (left, right) if !left.has_variables() && !right.has_variables() => {
                    *rest = rest.clone() + self.clone() * coefficient.clone();
                    Ok(())
                }
                _ => Err(TensorError::QuadraticVariables),
            },
        }
    }

    /// Replace every occurrence of `variable` by `expression`.
    pub fn substitute(&self, variable: &Scalar, expression: &Scalar) -> Scalar {
        if self == variable {
            return expression.clone();
        }
        match self {
            Scalar::Rational(_) | Scalar::Variable { .. } => self.clone(),
            Scalar::Added(summands) => summands
                .iter()
                .map(|s| s.substitute(variable, expression))
                .fold(Scalar::zero(), |acc, s| acc + s),
            Scalar::Multiplied(left, right) => {
                left.substitute(variable, expression) * right.substitute(variable, expression)
            }
        }
    }
}

fn push_pair(pairs: &mut Vec<(Scalar, Scalar)>, variable: Scalar, coefficient: Scalar) {
    if let Some(entry) = pairs.iter_mut().find(|(v, _)| *v == variable) {
        entry.1 = entry.1.clone() + coefficient;
    } else {
        pairs.push((variable, coefficient));
    }
}

// ============================================================================
// ARITHMETIC
// ============================================================================

impl std::ops::Add for Scalar {
    type Output = Scalar;

    fn add(self, other: Scalar) -> Scalar {
        match (self, other) {
            (Scalar::Rational(a), Scalar::Rational(b)) => Scalar::Rational(a + b),
            (a, b) if a.is_zero() => b,
            (a, b) if b.is_zero() => a,
            (Scalar::Added(mut left), Scalar::Added(right)) => {
                left.extend(right);
                Scalar::Added(left)
            }
            (Scalar::Added(mut left), b) => {
                left.push(b);
                Scalar::Added(left)
            }
            (a, Scalar::Added(mut right)) => {
                right.insert(0, a);
                Scalar::Added(right)
            }
            (a, b) => Scalar::Added(vec![a, b]),
        }
    }
}

impl std::ops::Mul for Scalar {
    type Output = Scalar;

    fn mul(self, other: Scalar) -> Scalar {
        match (self, other) {
            (Scalar::Rational(a), Scalar::Rational(b)) => Scalar::Rational(a * b),
            (a, b) if a.is_zero() || b.is_zero() => Scalar::zero(),
            (a, b) if a == Scalar::one() => b,
            (a, b) if b == Scalar::one() => a,
            (a, b) => Scalar::Multiplied(Box::new(a), Box::new(b)),
        }
    }
}

impl std::ops::Neg for Scalar {
    type Output = Scalar;

    fn neg(self) -> Scalar {
        match self {
            Scalar::Rational(r) => Scalar::Rational(-r),
            other => Scalar::integer(-1) * other,
        }
    }
}

impl std::ops::Sub for Scalar {
    type Output = Scalar;

    fn sub(self, other: Scalar) -> Scalar {
        self + (-other)
    }
}

impl std::ops::AddAssign for Scalar {
    fn add_assign(&mut self, other: Scalar) {
        let value = std::mem::replace(self, Scalar::zero());
        *self = value + other;
    }
}

impl std::ops::SubAssign for Scalar {
    fn sub_assign(&mut self, other: Scalar) {
        let value = std::mem::replace(self, Scalar::zero());
        *self = value - other;
    }
}

impl std::ops::MulAssign for Scalar {
    fn mul_assign(&mut self, other: Scalar) {
        let value = std::mem::replace(self, Scalar::zero());
        *self = value * other;
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::integer(value)
    }
}

impl From<Rational64> for Scalar {
    fn from(value: Rational64) -> Self {
        Scalar::Rational(value)
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Rational(r) => {
                if r.denom() == &1 {
                    write!(f, "{}", r.numer())
                } else if r.numer().is_negative() {
                    write!(f, "-{}/{}", r.numer().abs(), r.denom())
                } else {
                    write!(f, "{}/{}", r.numer(), r.denom())
                }
            }
            Scalar::Variable { name, index } => write!(f, "{}_{}", name, index),
            Scalar::Added(summands) => {
                for (i, summand) in summands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{}", summand)?;
                }
                Ok(())
            }
            Scalar::Multiplied(left, right) => {
                if left.is_added() {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, " * ")?;
                if right.is_added() {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_normalizes() {
        assert_eq!(Scalar::fraction(2, 4), Scalar::fraction(1, 2));
        assert_eq!(Scalar::fraction(1, -2), Scalar::fraction(-1, 2));
    }

    #[test]
    fn test_numeric_folding() {
        let sum = Scalar::fraction(1, 2) + Scalar::fraction(1, 3);
        assert_eq!(sum, Scalar::fraction(5, 6));

        let product = Scalar::fraction(2, 3) * Scalar::fraction(3, 4);
        assert_eq!(product, Scalar::fraction(1, 2));
    }

    #[test]
    fn test_identities() {
        let e = Scalar::variable("e", 1);
        assert_eq!(e.clone() + Scalar::zero(), e);
        assert_eq!(e.clone() * Scalar::one(), e);
        assert_eq!(e.clone() * Scalar::zero(), Scalar::zero());
    }

    #[test]
    fn test_has_variables() {
        let e = Scalar::variable("e", 1);
        assert!(e.has_variables());
        assert!((Scalar::integer(2) * e).has_variables());
        assert!(!Scalar::fraction(3, 7).has_variables());
    }

    #[test]
    fn test_separate_linear_terms() {
        let e1 = Scalar::variable("e", 1);
        let e2 = Scalar::variable("e", 2);
        let scalar =
            Scalar::integer(2) * e1.clone() + e2.clone() * Scalar::fraction(1, 2) + Scalar::integer(5);

        let (pairs, rest) = scalar.separate_variables_from_rest().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (e1, Scalar::integer(2)));
        assert_eq!(pairs[1], (e2, Scalar::fraction(1, 2)));
        assert_eq!(rest, Scalar::integer(5));
    }

    #[test]
    fn test_separate_merges_repeated_variable() {
        let e1 = Scalar::variable("e", 1);
        let scalar = Scalar::integer(2) * e1.clone() + Scalar::integer(3) * e1.clone();

        let (pairs, _) = scalar.separate_variables_from_rest().unwrap();
        assert_eq!(pairs, vec![(e1, Scalar::integer(5))]);
    }

    #[test]
    fn test_separate_rejects_quadratic() {
        let e1 = Scalar::variable("e", 1);
        let e2 = Scalar::variable("e", 2);
        let scalar = e1 * e2;
        assert_eq!(
            scalar.separate_variables_from_rest(),
            Err(TensorError::QuadraticVariables)
        );
    }

    #[test]
    fn test_substitute_variable() {
        let e1 = Scalar::variable("e", 1);
        let scalar = Scalar::integer(3) * e1.clone() + Scalar::integer(1);
        let substituted = scalar.substitute(&e1, &Scalar::fraction(1, 3));
        assert_eq!(substituted, Scalar::integer(2));
    }

    #[test]
    fn test_from_f64_approx() {
        assert_eq!(Scalar::from_f64_approx(2.0), Scalar::integer(2));
        assert_eq!(Scalar::from_f64_approx(-3.0), Scalar::integer(-3));
        assert_eq!(Scalar::from_f64_approx(0.5), Scalar::fraction(1, 2));
        assert_eq!(
            Scalar::from_f64_approx(1.0 / 3.0),
            Scalar::fraction(1, 3)
        );
        assert_eq!(Scalar::from_f64_approx(0.0), Scalar::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Scalar::fraction(-1, 2).to_string(), "-1/2");
        assert_eq!(Scalar::integer(7).to_string(), "7");
        assert_eq!(Scalar::variable("e", 3).to_string(), "e_3");
    }
}
