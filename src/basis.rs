//! B-spline basis functions and their derivatives.
//!
//! The `i`-th basis spline of degree `k` over a knot vector `t` is evaluated
//! with the Cox-de Boor recursion
//!
//! ```text
//! B[i,k](x) = (x - t[i]) / (t[i+k] - t[i]) * B[i,k-1](x)
//!           + (t[i+k+1] - x) / (t[i+k+1] - t[i+1]) * B[i+1,k-1](x)
//! ```
//!
//! bottoming out in the piecewise constant `B[i,0](x) = 1` for
//! `t[i] <= x < t[i+1]` and `0` otherwise. A zero division is defined as
//! `0/0 = 0`, i.e. any prefactor whose denominator is below machine epsilon
//! contributes nothing.
//!
//! Derivatives use
//!
//! ```text
//! d/dx B[i,k](x) = k * ( B[i,k-1](x) / (t[i+k] - t[i]) - B[i+1,k-1](x) / (t[i+k+1] - t[i+1]) )
//! ```
//!
//! applied to itself for higher orders.
//!
//! All functions are free functions taking every input explicitly. Each call
//! builds its own padded knot buffer, so concurrent evaluation is safe.

use tinyvec::TinyVec;

use crate::error::SplineError;
use crate::EPSILON;

/// Knot buffers up to this size live on the stack.
type KnotBuffer = TinyVec<[f64; 32]>;

/// Clamp the knot vector so that the first and last knot each appear
/// `degree + 1` times. Knot vectors that are already clamped are copied as is.
fn pad_knots(knots: &[f64], degree: usize) -> KnotBuffer {
    let mut padded = KnotBuffer::new();
    let (first, last) = match (knots.first(), knots.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return padded,
    };

    let front_mult = knots.iter().take_while(|&&k| k == first).count();
    let back_mult = knots.iter().rev().take_while(|&&k| k == last).count();

    for _ in front_mult..=degree {
        padded.push(first);
    }
    padded.extend_from_slice(knots);
    for _ in back_mult..=degree {
        padded.push(last);
    }
    padded
}

/// Number of basis functions of the given degree the (padded) knot vector supports.
pub fn basis_count(knots: &[f64], degree: usize) -> usize {
    pad_knots(knots, degree).len().saturating_sub(degree + 1)
}

#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den < EPSILON {
        0.0
    } else {
        num / den
    }
}

/// Cox-de Boor recursion on a clamped knot vector. The half-open base
/// interval is closed at the very last knot so that lower order terms used
/// by the derivative recursion stay defined on the right boundary.
fn cox_de_boor(t: &[f64], k: usize, i: usize, x: f64) -> f64 {
    if k == 0 {
        let last = t[t.len() - 1];
        let inside = t[i] <= x && x < t[i + 1];
        let on_end = x == last && t[i] < t[i + 1] && t[i + 1] == last;
        return if inside || on_end { 1.0 } else { 0.0 };
    }

    let frst = ratio(x - t[i], t[i + k] - t[i]);
    let scnd = ratio(t[i + k + 1] - x, t[i + k + 1] - t[i + 1]);

    let mut value = 0.0;
    if frst != 0.0 {
        value += frst * cox_de_boor(t, k - 1, i, x);
    }
    if scnd != 0.0 {
        value += scnd * cox_de_boor(t, k - 1, i + 1, x);
    }
    value
}

fn derivative_recursion(t: &[f64], k: usize, i: usize, x: f64, order: usize) -> f64 {
    if order == 0 {
        return cox_de_boor(t, k, i, x);
    }
    if k == 0 {
        return 0.0;
    }

    let lo = ratio(1.0, t[i + k] - t[i]);
    let hi = ratio(1.0, t[i + k + 1] - t[i + 1]);

    let mut value = 0.0;
    if lo != 0.0 {
        value += lo * derivative_recursion(t, k - 1, i, x, order - 1);
    }
    if hi != 0.0 {
        value -= hi * derivative_recursion(t, k - 1, i + 1, x, order - 1);
    }
    k as f64 * value
}

/// Evaluate the `interval`-th basis spline of `degree` over `knots` at `x`.
///
/// The knot vector is clamped before evaluation by repeating its boundary
/// knots until they have multiplicity `degree + 1`. If `x` lies exactly on the
/// last knot only the last basis function is nonzero (and equal to one).
/// Indices without a basis function, and empty knot vectors, evaluate to zero.
///
/// # Examples
/// ```rust
/// use molpath::basis::basis_spline;
///
/// let knots = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
/// assert_eq!(basis_spline(&knots, 2, 0, 0.0), 1.0);
/// ```
pub fn basis_spline(knots: &[f64], degree: usize, interval: usize, x: f64) -> f64 {
    let t = pad_knots(knots, degree);
    if t.len() < degree + 2 || interval >= t.len() - degree - 1 {
        return 0.0;
    }

    // upper boundary knot: only the last basis function is nonzero
    if x == t[t.len() - 1] {
        return if interval == t.len() - degree - 2 { 1.0 } else { 0.0 };
    }

    cox_de_boor(&t, degree, interval, x)
}

/// Evaluate the `order`-th derivative of the `interval`-th basis spline of
/// `degree` over `knots` at `x`. Order zero is identical to [`basis_spline`],
/// orders above the degree vanish.
pub fn basis_spline_derivative(knots: &[f64], degree: usize, interval: usize, x: f64, order: usize) -> f64 {
    if order == 0 {
        return basis_spline(knots, degree, interval, x);
    }
    if order > degree {
        return 0.0;
    }

    let t = pad_knots(knots, degree);
    if t.len() < degree + 2 || interval >= t.len() - degree - 1 {
        return 0.0;
    }

    derivative_recursion(&t, degree, interval, x, order)
}

/// Checked variant of [`basis_spline`] that reports invalid knot vectors and
/// basis indices instead of evaluating them to zero.
pub fn try_basis_spline(knots: &[f64], degree: usize, interval: usize, x: f64) -> Result<f64, SplineError> {
    check_arguments(knots, degree, interval)?;
    Ok(basis_spline(knots, degree, interval, x))
}

/// Checked variant of [`basis_spline_derivative`].
pub fn try_basis_spline_derivative(
    knots: &[f64],
    degree: usize,
    interval: usize,
    x: f64,
    order: usize,
) -> Result<f64, SplineError> {
    check_arguments(knots, degree, interval)?;
    Ok(basis_spline_derivative(knots, degree, interval, x, order))
}

fn check_arguments(knots: &[f64], degree: usize, interval: usize) -> Result<(), SplineError> {
    if knots.is_empty() {
        return Err(SplineError::InvalidKnotVector("knot vector is empty".into()));
    }
    if knots.windows(2).any(|w| w[1] < w[0]) {
        return Err(SplineError::InvalidKnotVector("knots must be non-decreasing".into()));
    }
    let count = basis_count(knots, degree);
    if interval >= count {
        return Err(SplineError::BasisIndexOutOfRange { index: interval, count });
    }
    Ok(())
}
