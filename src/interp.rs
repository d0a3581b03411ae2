//! Cubic spline interpolation with Hermite boundary conditions.
//!
//! The interpolating curve is written in the B-spline basis over a clamped
//! knot vector built from the data abscissae. With `N` data points the curve
//! has `N + 2` control points: `N` equations come from requiring that the
//! curve passes through every data point and the two remaining ones fix the
//! first derivative at either end. Every equation only involves the basis
//! functions overlapping its abscissa, so the system is tridiagonal.

use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::banded::Tridiagonal;
use crate::basis::{basis_spline, basis_spline_derivative};
use crate::error::SplineError;
use crate::point::{ControlPoint, Vec3};
use crate::spline_curve::{Native, SplineCurve};

/// Boundary condition imposed at both ends of the interpolation range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryCondition {
    /// First derivative prescribed at either end, estimated from the data.
    Hermite,
    /// Vanishing second derivative at either end. Not implemented.
    Natural,
}

/// End of the data range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Lo,
    Hi,
}

/// Method for estimating the slope of the data at an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointDerivative {
    /// Three point parabolic fit, exact for quadratic data.
    Parabolic,
    /// Two point finite difference.
    FiniteDifference,
}

/// Interpolator producing cubic B-spline curves.
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicSplineInterp;

impl CubicSplineInterp {
    /// Polynomial degree of the produced curves.
    pub const DEGREE: usize = 3;

    pub fn new() -> Self {
        CubicSplineInterp
    }

    /// Interpolate the data values `f` given at the strictly increasing
    /// abscissae `x`. At least three data points are required for the
    /// endpoint derivative estimate.
    pub fn interpolate<P: ControlPoint>(
        &self,
        x: &[f64],
        f: &[P],
        bc: BoundaryCondition,
    ) -> Result<SplineCurve<P, Native>, SplineError> {
        if bc != BoundaryCondition::Hermite {
            return Err(SplineError::UnsupportedBoundaryCondition(bc));
        }
        check_data(x, f.len())?;

        let knots = prepare_knot_vector(x, Self::DEGREE);
        let system = assemble_diagonals(&knots, x, Self::DEGREE)?;
        let mut rhs = assemble_rhs(x, f);
        debug!(
            "interpolating {} data points with {:?} boundary conditions, system size {}",
            x.len(),
            bc,
            system.dim()
        );
        system.solve(&mut rhs)?;

        let ctrl_points = (0..rhs.nrows())
            .map(|i| P::from_axes(|a| rhs[(i, a)]))
            .collect();
        SplineCurve::new(Self::DEGREE, knots, ctrl_points)
    }

    /// Interpolate a sequence of points, parameterised by their index.
    pub fn interpolate_points(
        &self,
        points: &[Vec3],
        bc: BoundaryCondition,
    ) -> Result<SplineCurve<Vec3, Native>, SplineError> {
        let x: Vec<f64> = (0..points.len()).map(|i| i as f64).collect();
        self.interpolate(&x, points, bc)
    }
}

fn check_data(x: &[f64], nf: usize) -> Result<(), SplineError> {
    if x.len() != nf {
        return Err(SplineError::InvalidInput(format!(
            "{} abscissae but {} data values",
            x.len(),
            nf
        )));
    }
    if x.len() < 3 {
        return Err(SplineError::InvalidInput(format!(
            "at least 3 data points are required, got {}",
            x.len()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SplineError::InvalidInput("abscissae must be finite".into()));
    }
    if let Some(i) = x.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SplineError::InvalidInput(format!(
            "abscissae must be strictly increasing, violated at index {}",
            i + 1
        )));
    }
    Ok(())
}

/// Copy of the abscissae with the first and last element repeated `degree` more times.
pub fn prepare_knot_vector(x: &[f64], degree: usize) -> Vec<f64> {
    let mut knots = Vec::with_capacity(x.len() + 2 * degree);
    if let (Some(&first), Some(&last)) = (x.first(), x.last()) {
        knots.extend(core::iter::repeat(first).take(degree));
        knots.extend_from_slice(x);
        knots.extend(core::iter::repeat(last).take(degree));
    }
    knots
}

/// Set up the tridiagonal interpolation matrix. Row `0` and row `N + 1` hold
/// the first derivative of the basis at the boundary abscissae, row `r` in
/// between holds the basis functions at abscissa `x[r - 1]`.
fn assemble_diagonals(knots: &[f64], x: &[f64], degree: usize) -> Result<Tridiagonal, SplineError> {
    let n_dat = x.len();
    let n_sys = n_dat + 2;
    let x_lo = x[0];
    let x_hi = x[n_dat - 1];

    let mut sub = vec![0.0; n_sys - 1];
    let mut diag = vec![0.0; n_sys];
    let mut sup = vec![0.0; n_sys - 1];

    // Hermite rows
    diag[0] = basis_spline_derivative(knots, degree, 0, x_lo, 1);
    sup[0] = basis_spline_derivative(knots, degree, 1, x_lo, 1);
    diag[n_sys - 1] = basis_spline_derivative(knots, degree, n_sys - 1, x_hi, 1);
    sub[n_sys - 2] = basis_spline_derivative(knots, degree, n_sys - 2, x_hi, 1);

    // interpolation rows
    for (j, &xj) in x.iter().enumerate() {
        let row = j + 1;
        sub[row - 1] = basis_spline(knots, degree, row - 1, xj);
        diag[row] = basis_spline(knots, degree, row, xj);
        sup[row] = basis_spline(knots, degree, row + 1, xj);
    }

    Tridiagonal::new(sub, diag, sup)
}

/// Right hand side with one column per coordinate axis.
fn assemble_rhs<P: ControlPoint>(x: &[f64], f: &[P]) -> DMatrix<f64> {
    let n_dat = x.len();
    let n_sys = n_dat + 2;

    let lo = estimate_endpoint_deriv(x, f, Endpoint::Lo, EndpointDerivative::Parabolic);
    let hi = estimate_endpoint_deriv(x, f, Endpoint::Hi, EndpointDerivative::Parabolic);

    DMatrix::from_fn(n_sys, P::DIM, |row, axis| {
        if row == 0 {
            lo.axis(axis)
        } else if row == n_sys - 1 {
            hi.axis(axis)
        } else {
            f[row - 1].axis(axis)
        }
    })
}

/// Estimate the slope of the data at one end of the range. The parabolic
/// estimate needs three data points, the finite difference two.
pub fn estimate_endpoint_deriv<P: ControlPoint>(
    x: &[f64],
    f: &[P],
    endpoint: Endpoint,
    method: EndpointDerivative,
) -> P {
    let n = x.len();
    match method {
        EndpointDerivative::Parabolic => {
            let (x_delta_lo, x_delta_hi, f_delta_lo, f_delta_hi) = match endpoint {
                Endpoint::Lo => {
                    let x_delta_lo = x[0] - x[2];
                    let x_delta_hi = x[1] - x[0];
                    (
                        x_delta_lo,
                        x_delta_hi,
                        (f[0] - f[2]) * (1.0 / x_delta_lo),
                        (f[1] - f[0]) * (1.0 / x_delta_hi),
                    )
                }
                Endpoint::Hi => {
                    let x_delta_lo = x[n - 1] - x[n - 2];
                    let x_delta_hi = x[n - 3] - x[n - 1];
                    (
                        x_delta_lo,
                        x_delta_hi,
                        (f[n - 1] - f[n - 2]) * (1.0 / x_delta_lo),
                        (f[n - 3] - f[n - 1]) * (1.0 / x_delta_hi),
                    )
                }
            };
            (f_delta_hi * x_delta_lo + f_delta_lo * x_delta_hi) * (1.0 / (x_delta_lo + x_delta_hi))
        }
        EndpointDerivative::FiniteDifference => {
            let (lo, hi) = match endpoint {
                Endpoint::Lo => (0, 1),
                Endpoint::Hi => (n - 2, n - 1),
            };
            (f[hi] - f[lo]) * (1.0 / (x[hi] - x[lo]))
        }
    }
}
