//! Tridiagonal linear systems.
//!
//! Storage and elimination follow the LAPACK `gtsv` layout: the sub-, main-
//! and superdiagonal are kept as separate vectors and the system is solved by
//! Gaussian elimination with partial pivoting, which introduces fill-in on a
//! second superdiagonal (stored in the freed subdiagonal slots).

use nalgebra::DMatrix;

use crate::error::SplineError;

/// Square tridiagonal matrix of dimension `n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tridiagonal {
    /// Subdiagonal, `sub[i]` is the element at `(i + 1, i)`.
    sub: Vec<f64>,
    /// Main diagonal.
    diag: Vec<f64>,
    /// Superdiagonal, `sup[i]` is the element at `(i, i + 1)`.
    sup: Vec<f64>,
}

impl Tridiagonal {
    /// Create a system from its three diagonals. The off-diagonals must have
    /// exactly one element less than the main diagonal.
    pub fn new(sub: Vec<f64>, diag: Vec<f64>, sup: Vec<f64>) -> Result<Self, SplineError> {
        if diag.is_empty() || sub.len() + 1 != diag.len() || sup.len() + 1 != diag.len() {
            return Err(SplineError::InvalidInput(format!(
                "inconsistent band sizes: sub {}, diag {}, sup {}",
                sub.len(),
                diag.len(),
                sup.len()
            )));
        }
        Ok(Tridiagonal { sub, diag, sup })
    }

    /// Dimension of the system.
    pub fn dim(&self) -> usize {
        self.diag.len()
    }

    /// Expand into a dense matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.dim();
        DMatrix::from_fn(n, n, |r, c| {
            if r == c {
                self.diag[r]
            } else if r == c + 1 {
                self.sub[c]
            } else if c == r + 1 {
                self.sup[r]
            } else {
                0.0
            }
        })
    }

    /// Solve `A X = B` in place, `rhs` holds one right hand side per column
    /// and is overwritten with the solution. Consumes the system as its
    /// diagonals are destroyed by the factorisation.
    pub fn solve(self, rhs: &mut DMatrix<f64>) -> Result<(), SplineError> {
        let n = self.dim();
        if rhs.nrows() != n {
            return Err(SplineError::InvalidInput(format!(
                "right hand side has {} rows, system has dimension {}",
                rhs.nrows(),
                n
            )));
        }
        let nrhs = rhs.ncols();
        let Tridiagonal {
            sub: mut dl,
            diag: mut d,
            sup: mut du,
        } = self;

        // forward elimination with partial pivoting
        for i in 0..n.saturating_sub(1) {
            if d[i].abs() >= dl[i].abs() {
                // no row interchange required
                if d[i] == 0.0 {
                    return Err(SplineError::SingularSystem { row: i });
                }
                let fact = dl[i] / d[i];
                d[i + 1] -= fact * du[i];
                for j in 0..nrhs {
                    rhs[(i + 1, j)] -= fact * rhs[(i, j)];
                }
                dl[i] = 0.0;
            } else {
                // interchange rows i and i + 1
                let fact = d[i] / dl[i];
                d[i] = dl[i];
                let temp = d[i + 1];
                d[i + 1] = du[i] - fact * temp;
                if i + 2 < n {
                    dl[i] = du[i + 1];
                    du[i + 1] = -fact * dl[i];
                } else {
                    dl[i] = 0.0;
                }
                du[i] = temp;
                for j in 0..nrhs {
                    let temp = rhs[(i, j)];
                    rhs[(i, j)] = rhs[(i + 1, j)];
                    rhs[(i + 1, j)] = temp - fact * rhs[(i + 1, j)];
                }
            }
        }
        if d[n - 1] == 0.0 {
            return Err(SplineError::SingularSystem { row: n - 1 });
        }

        // back substitution, dl now holds the second superdiagonal
        for j in 0..nrhs {
            rhs[(n - 1, j)] /= d[n - 1];
            if n > 1 {
                rhs[(n - 2, j)] = (rhs[(n - 2, j)] - du[n - 2] * rhs[(n - 1, j)]) / d[n - 2];
            }
            for i in (0..n.saturating_sub(2)).rev() {
                rhs[(i, j)] = (rhs[(i, j)] - du[i] * rhs[(i + 1, j)] - dl[i] * rhs[(i + 2, j)]) / d[i];
            }
        }

        if rhs.iter().any(|v| !v.is_finite()) {
            return Err(SplineError::SingularSystem { row: n - 1 });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dense_solution(system: &Tridiagonal, rhs: &DMatrix<f64>) -> DMatrix<f64> {
        system.to_dense().lu().solve(rhs).unwrap()
    }

    #[test]
    fn diagonally_dominant_system() {
        let system = Tridiagonal::new(
            vec![1.0, -1.0, 0.5, 2.0],
            vec![4.0, 5.0, 6.0, 5.0, 7.0],
            vec![1.0, 2.0, -1.0, 1.0],
        )
        .unwrap();
        let rhs = DMatrix::from_column_slice(5, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, -1.0, 0.0, 1.0, 0.0, -1.0]);
        let expected = dense_solution(&system, &rhs);

        let mut x = rhs.clone();
        system.solve(&mut x).unwrap();
        assert_relative_eq!(x, expected, epsilon = 1e-12);
    }

    #[test]
    fn zero_on_diagonal_requires_pivoting() {
        // layout of a Hermite interpolation system: the first data row has a
        // zero on the main diagonal
        let system = Tridiagonal::new(
            vec![1.0, 0.25, 0.0, -3.0],
            vec![-3.0, 0.0, 0.5, 0.0, 3.0],
            vec![3.0, 0.0, 0.25, 1.0],
        )
        .unwrap();
        let rhs = DMatrix::from_column_slice(5, 1, &[1.0, 0.0, 1.0, 2.0, 1.0]);
        let expected = dense_solution(&system, &rhs);

        let mut x = rhs.clone();
        system.solve(&mut x).unwrap();
        assert_relative_eq!(x, expected, epsilon = 1e-12);
    }

    #[test]
    fn singular_system_is_reported() {
        let system = Tridiagonal::new(vec![0.0, 0.0], vec![1.0, 0.0, 1.0], vec![0.0, 0.0]).unwrap();
        let mut rhs = DMatrix::from_column_slice(3, 1, &[1.0, 1.0, 1.0]);
        assert_eq!(system.solve(&mut rhs), Err(SplineError::SingularSystem { row: 1 }));
    }

    #[test]
    fn band_sizes_are_validated() {
        assert!(Tridiagonal::new(vec![1.0], vec![1.0, 2.0, 3.0], vec![1.0, 1.0]).is_err());
        let system = Tridiagonal::new(vec![], vec![2.0], vec![]).unwrap();
        let mut rhs = DMatrix::from_column_slice(1, 1, &[4.0]);
        system.solve(&mut rhs).unwrap();
        assert_eq!(rhs[(0, 0)], 2.0);
    }
}
