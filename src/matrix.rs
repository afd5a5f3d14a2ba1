//! Dense real matrix helpers.
//!
//! The engine consumes exactly one piece of linear algebra: an in-place
//! reduced row-echelon form over `f64`. `nalgebra`'s `DMatrix` is the
//! buffer; the reduction lives here.

use nalgebra::DMatrix;

/// Entries with absolute value at or below this are treated as zero
/// during pivot selection and in the reduced output.
pub const PIVOT_TOLERANCE: f64 = 1e-9;

/// Reduce the matrix to reduced row-echelon form in place
/// (partial pivoting, pivot rows normalized to a leading 1).
pub fn to_row_echelon_form(matrix: &mut DMatrix<f64>) {
    let (rows, cols) = matrix.shape();
    let mut pivot_row = 0;

    for col in 0..cols {
        if pivot_row >= rows {
            break;
        }

        // Partial pivot: largest magnitude in the column at or below pivot_row.
        let mut best_row = pivot_row;
        let mut best_value = matrix[(pivot_row, col)].abs();
        for row in (pivot_row + 1)..rows {
            let value = matrix[(row, col)].abs();
            if value > best_value {
                best_row = row;
                best_value = value;
            }
        }
        if best_value <= PIVOT_TOLERANCE {
            continue;
        }

        matrix.swap_rows(pivot_row, best_row);

        let pivot = matrix[(pivot_row, col)];
        for j in col..cols {
            matrix[(pivot_row, j)] /= pivot;
        }
        matrix[(pivot_row, col)] = 1.0;

        for row in 0..rows {
            if row == pivot_row {
                continue;
            }
            let factor = matrix[(row, col)];
            if factor.abs() <= PIVOT_TOLERANCE {
                continue;
            }
            for j in col..cols {
                let update = matrix[(pivot_row, j)] * factor;
                matrix[(row, j)] -= update;
            }
            matrix[(row, col)] = 0.0;
        }

        pivot_row += 1;
    }

    // Flush residual noise so downstream walks see exact zeros.
    for entry in matrix.iter_mut() {
        if entry.abs() <= PIVOT_TOLERANCE {
            *entry = 0.0;
        }
    }
}

/// Number of nonzero rows of a reduced matrix.
pub fn rank(matrix: &DMatrix<f64>) -> usize {
    (0..matrix.nrows())
        .filter(|&row| (0..matrix.ncols()).any(|col| matrix[(row, col)].abs() > PIVOT_TOLERANCE))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rref_identity() {
        let mut m = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        to_row_echelon_form(&mut m);
        assert_eq!(m, DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_rref_dependent_columns() {
        // Second column is twice the first.
        let mut m = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        to_row_echelon_form(&mut m);
        assert_eq!(rank(&m), 1);
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(0, 1)], 2.0);
    }

    #[test]
    fn test_rref_eliminates_above() {
        let mut m = DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 3.0, 0.0, 1.0, 2.0]);
        to_row_echelon_form(&mut m);
        // Reduced form clears the entry above the second pivot.
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(m[(0, 2)], 1.0);
        assert_eq!(m[(1, 2)], 2.0);
    }

    #[test]
    fn test_rank_zero_matrix() {
        let m = DMatrix::zeros(3, 3);
        assert_eq!(rank(&m), 0);
    }
}
