//! Spline curves over clamped knot vectors.
//!
//! A [`SplineCurve`] is generic over its control point type, `f64` for scalar
//! profiles and [`Vec3`] for space curves, and over a parameterization marker.
//! Curves produced by interpolation carry the [`Native`] parameterization of
//! their data abscissae. A 3D curve can be reparameterized by arc length
//! exactly once: [`SplineCurve::arc_length_param`] consumes the native curve
//! and returns a curve marked [`ArcLength`], which has no such method.
//!
//! Only native curves can be built from raw coefficients:
//!
//! ```compile_fail
//! use molpath::{ArcLength, SplineCurve, Vec3};
//!
//! let knots = vec![0.0, 0.0, 1.0, 1.0];
//! let ctrl = vec![Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0)];
//! let curve = SplineCurve::<Vec3, ArcLength>::new(1, knots, ctrl);
//! ```

use core::marker::PhantomData;

use log::debug;

use crate::basis::basis_spline_derivative;
use crate::error::SplineError;
use crate::interp::{BoundaryCondition, CubicSplineInterp};
use crate::point::{ControlPoint, Vec3};
use crate::quadrature::integrate_piecewise;

/// Curve parameter is the abscissa it was interpolated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Native;

/// Curve parameter is arc length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArcLength;

/// Scalar valued curve, e.g. a radius profile.
pub type SplineCurve1D = SplineCurve<f64, Native>;

/// Curve in 3D space.
pub type SplineCurve3D<S = Native> = SplineCurve<Vec3, S>;

/// Curvature below which a curve is treated as straight when constructing normals.
const STRAIGHT_CURVATURE: f64 = 1e-9;

/// Slack when comparing tangent components for the reference frame.
const AXIS_TIE: f64 = 1e-9;

/// B-spline curve of arbitrary degree. The knot vector is clamped, so the
/// curve starts at its first and ends at its last control point.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineCurve<P: ControlPoint, S = Native> {
    degree: usize,
    knots: Vec<f64>,
    ctrl_points: Vec<P>,
    unique_knots: Vec<f64>,
    param: PhantomData<S>,
}

impl<P: ControlPoint> SplineCurve<P, Native> {
    /// Create a curve from its degree, knot vector and control points.
    ///
    /// The knots must be finite and non-decreasing with the first and last
    /// knot repeated `degree + 1` times, and
    /// `knots.len() == ctrl_points.len() + degree + 1` must hold.
    pub fn new(degree: usize, knots: Vec<f64>, ctrl_points: Vec<P>) -> Result<Self, SplineError> {
        Self::from_parts(degree, knots, ctrl_points)
    }
}

impl<P: ControlPoint, S> SplineCurve<P, S> {
    /// Checked construction with any parameterization marker. Arc length
    /// curves may only be restored from coefficients this crate produced.
    pub(crate) fn from_parts(degree: usize, knots: Vec<f64>, ctrl_points: Vec<P>) -> Result<Self, SplineError> {
        if ctrl_points.len() <= degree {
            return Err(SplineError::InvalidKnotVector(format!(
                "a curve of degree {} needs more than {} control points, got {}",
                degree,
                degree,
                ctrl_points.len()
            )));
        }
        if knots.len() != ctrl_points.len() + degree + 1 {
            return Err(SplineError::InvalidKnotVector(format!(
                "invalid number of knots, got {}, expected {}",
                knots.len(),
                ctrl_points.len() + degree + 1
            )));
        }
        if knots.iter().any(|k| !k.is_finite()) || knots.windows(2).any(|w| w[1] < w[0]) {
            return Err(SplineError::InvalidKnotVector(
                "knots must be finite and non-decreasing".into(),
            ));
        }
        let (first, last) = (knots[0], knots[knots.len() - 1]);
        let clamped = knots[..=degree].iter().all(|&k| k == first)
            && knots[knots.len() - degree - 1..].iter().all(|&k| k == last);
        if !clamped || !(first < last) {
            return Err(SplineError::InvalidKnotVector(
                "knot vector must be clamped over a non-empty domain".into(),
            ));
        }

        let mut unique_knots = knots.clone();
        unique_knots.dedup();

        Ok(SplineCurve {
            degree,
            knots,
            ctrl_points,
            unique_knots,
            param: PhantomData,
        })
    }

    fn reparameterized<T>(self) -> SplineCurve<P, T> {
        SplineCurve {
            degree: self.degree,
            knots: self.knots,
            ctrl_points: self.ctrl_points,
            unique_knots: self.unique_knots,
            param: PhantomData,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Knot vector without repetitions, i.e. the breakpoints of the piecewise polynomial.
    pub fn unique_knots(&self) -> &[f64] {
        &self.unique_knots
    }

    pub fn ctrl_points(&self) -> &[P] {
        &self.ctrl_points
    }

    pub fn n_ctrl_points(&self) -> usize {
        self.ctrl_points.len()
    }

    /// Inclusive parameter range the curve is defined over.
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[0], self.knots[self.knots.len() - 1])
    }

    /// Evaluate the `order`-th derivative of the curve at `s`.
    ///
    /// Outside of the domain the curve is continued linearly from the
    /// nearest end: values follow the end tangent, the first derivative is
    /// the end tangent and all higher derivatives vanish.
    pub fn evaluate(&self, s: f64, order: usize) -> P {
        let (lo, hi) = self.domain();
        if s < lo {
            return self.extrapolate(lo, s, order);
        }
        if s > hi {
            return self.extrapolate(hi, s, order);
        }
        self.evaluate_inside(s, order)
    }

    fn extrapolate(&self, end: f64, s: f64, order: usize) -> P {
        match order {
            0 => self.evaluate_inside(end, 0) + self.evaluate_inside(end, 1) * (s - end),
            1 => self.evaluate_inside(end, 1),
            _ => P::zero(),
        }
    }

    /// Sum of control points weighted by basis (derivative) values. Only the
    /// `degree + 1` basis functions whose support contains `s` contribute.
    fn evaluate_inside(&self, s: f64, order: usize) -> P {
        let n = self.ctrl_points.len();
        let span = self
            .knots
            .partition_point(|&k| k <= s)
            .saturating_sub(1)
            .clamp(self.degree, n - 1);

        let mut value = P::zero();
        for i in span - self.degree..=span {
            let b = basis_spline_derivative(&self.knots, self.degree, i, s, order);
            if b != 0.0 {
                value = value + self.ctrl_points[i] * b;
            }
        }
        value
    }

    /// First derivative with respect to the curve parameter.
    pub fn tangent_vec(&self, s: f64) -> P {
        self.evaluate(s, 1)
    }
}

impl<S> SplineCurve<Vec3, S> {
    /// Magnitude of the tangent, i.e. arc length per unit parameter.
    pub fn speed(&self, s: f64) -> f64 {
        self.evaluate(s, 1).norm()
    }

    /// Arc length between the parameter values `lo` and `hi`, negative if `hi < lo`.
    pub fn arc_length(&self, lo: f64, hi: f64) -> f64 {
        integrate_piecewise(&|s| self.speed(s), &self.unique_knots, lo, hi)
    }

    /// Total arc length over the domain.
    pub fn length(&self) -> f64 {
        let (lo, hi) = self.domain();
        self.arc_length(lo, hi)
    }

    /// Cumulative arc length at every unique knot, starting from zero at the
    /// first one. For an interpolated curve these are the arc lengths of the
    /// original data points.
    pub fn ctrl_point_arc_length(&self) -> Vec<f64> {
        let mut arc_length = Vec::with_capacity(self.unique_knots.len());
        let mut total = 0.0;
        arc_length.push(total);
        for w in self.unique_knots.windows(2) {
            total += self.arc_length(w[0], w[1]);
            arc_length.push(total);
        }
        arc_length
    }

    /// Unit tangent at `s`.
    pub fn norm_tangent_vec(&self, s: f64) -> Vec3 {
        let tangent = self.tangent_vec(s);
        let norm = tangent.norm();
        if norm > 0.0 {
            tangent / norm
        } else {
            tangent
        }
    }

    /// Unit principal normal at `s`. Where the curve is (numerically)
    /// straight the principal normal is undefined and a fixed unit vector
    /// perpendicular to the tangent is returned instead.
    pub fn normal_vec(&self, s: f64) -> Vec3 {
        let d1 = self.evaluate(s, 1);
        let d2 = self.evaluate(s, 2);
        let speed_sq = d1.norm_squared();
        if speed_sq == 0.0 {
            return Vec3::zeros();
        }

        let tangent = d1 / speed_sq.sqrt();
        let normal = d2 - tangent * d2.dot(&tangent);
        if normal.norm() / speed_sq > STRAIGHT_CURVATURE {
            normal.normalize()
        } else {
            reference_normal(&tangent)
        }
    }

    /// Rigid translation of the curve.
    pub fn shift(&mut self, offset: &Vec3) {
        for p in self.ctrl_points.iter_mut() {
            *p += offset;
        }
    }

    /// Map a Cartesian point onto the curve.
    ///
    /// The foot point is searched for inside the parameter bracket
    /// `[lo, hi]`, typically spanned by the reference points around the
    /// nearest neighbour of `point`. A safeguarded Newton iteration on
    /// `g(s) = (c(s) - p) . c'(s)` falls back to bisection whenever a step
    /// would leave the bracket. Iteration stops once a step is shorter than
    /// `tol`; if this does not happen within `max_iter` steps the last
    /// estimate is returned with `converged` unset.
    pub fn cartesian_to_curvilinear(
        &self,
        point: &Vec3,
        lo: f64,
        hi: f64,
        tol: f64,
        max_iter: usize,
    ) -> CurvilinearCoord {
        let (mut a, mut b) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let mut s = 0.5 * (a + b);
        let mut converged = false;
        let mut stalled = false;

        for _ in 0..max_iter {
            let diff = self.evaluate(s, 0) - point;
            let d1 = self.evaluate(s, 1);
            let d2 = self.evaluate(s, 2);
            let g = diff.dot(&d1);
            let dg = d1.dot(&d1) + diff.dot(&d2);

            // distance decreases towards larger s while g is negative
            if g < 0.0 {
                a = s;
            } else if g > 0.0 {
                b = s;
            } else {
                converged = true;
                break;
            }

            let newton = s - g / dg;
            let next = if dg > 0.0 && newton >= a && newton <= b {
                newton
            } else {
                0.5 * (a + b)
            };

            let step = (next - s).abs();
            s = next;
            if step < tol {
                stalled = true;
                break;
            }
        }

        // a short step also occurs when bisection collapses onto a bracket
        // end that excludes the foot point
        if stalled {
            converged = self.is_stationary(point, s, tol);
        }
        self.curvilinear_at(point, s, converged)
    }

    /// Whether the Newton correction at `s` is within `tol`, i.e. `s` is
    /// a foot point of `point` up to the requested accuracy.
    fn is_stationary(&self, point: &Vec3, s: f64, tol: f64) -> bool {
        let diff = self.evaluate(s, 0) - point;
        let d1 = self.evaluate(s, 1);
        let g = diff.dot(&d1);
        if g == 0.0 {
            return true;
        }
        let dg = d1.dot(&d1) + diff.dot(&self.evaluate(s, 2));
        dg > 0.0 && (g / dg).abs() <= 2.0 * tol
    }

    fn curvilinear_at(&self, point: &Vec3, s: f64, converged: bool) -> CurvilinearCoord {
        let diff = point - self.evaluate(s, 0);
        let tangent = self.norm_tangent_vec(s);
        let normal = self.normal_vec(s);
        let binormal = tangent.cross(&normal);

        CurvilinearCoord {
            s,
            rho: diff.norm(),
            phi: diff.dot(&binormal).atan2(diff.dot(&normal)),
            converged,
        }
    }
}

impl SplineCurve<Vec3, Native> {
    /// Reparameterize the curve by arc length.
    ///
    /// The arc length at every unique knot is obtained by integrating the
    /// speed, then the curve points at the unique knots are interpolated
    /// again with these arc lengths as abscissae. Consumes the curve, an
    /// arc length parameterized curve can not be reparameterized again.
    pub fn arc_length_param(self) -> Result<SplineCurve3D<ArcLength>, SplineError> {
        let arc_length = self.ctrl_point_arc_length();
        self.reparameterize(&arc_length)
    }

    /// Reparameterize with precomputed arc lengths at the unique knots.
    pub(crate) fn reparameterize(self, arc_length: &[f64]) -> Result<SplineCurve3D<ArcLength>, SplineError> {
        let points: Vec<Vec3> = self.unique_knots.iter().map(|&k| self.evaluate(k, 0)).collect();
        let curve = CubicSplineInterp::new().interpolate(arc_length, &points, BoundaryCondition::Hermite)?;
        debug!(
            "reparameterized centre line by arc length, length {:.6}",
            arc_length.last().copied().unwrap_or(0.0)
        );
        Ok(curve.reparameterized())
    }
}

/// Position relative to a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvilinearCoord {
    /// Curve parameter of the foot point, arc length for arc length curves.
    pub s: f64,
    /// Distance from the foot point.
    pub rho: f64,
    /// Angle around the tangent, measured from the normal towards the binormal.
    pub phi: f64,
    /// Whether the foot point refinement met its tolerance.
    pub converged: bool,
}

/// Unit vector perpendicular to `tangent`, built from the Cartesian axis
/// least aligned with it. Near ties go to the lower axis so that round-off
/// does not flip the frame.
fn reference_normal(tangent: &Vec3) -> Vec3 {
    let mut axis = 0;
    for i in 1..3 {
        if tangent[i].abs() < tangent[axis].abs() - AXIS_TIE {
            axis = i;
        }
    }
    let mut reference = Vec3::zeros();
    reference[axis] = 1.0;
    (reference - tangent * reference.dot(tangent)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use core::f64::consts::PI;

    fn straight_line() -> SplineCurve3D {
        let points: Vec<Vec3> = (0..5).map(|i| Vec3::new(1.0, -1.0, 0.5 * i as f64)).collect();
        CubicSplineInterp::new()
            .interpolate_points(&points, BoundaryCondition::Hermite)
            .unwrap()
    }

    fn quarter_circle(radius: f64, n: usize) -> Vec<Vec3> {
        (0..n)
            .map(|i| {
                let angle = 0.5 * PI * i as f64 / (n - 1) as f64;
                Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
            })
            .collect()
    }

    #[test]
    fn construction_checks_invariants() {
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let ctrl = vec![0.0, 1.0, 2.0, 3.0];
        assert!(SplineCurve1D::new(3, knots.clone(), ctrl.clone()).is_ok());
        assert!(SplineCurve1D::new(3, knots[1..].to_vec(), ctrl.clone()).is_err());
        assert!(SplineCurve1D::new(3, knots.clone(), ctrl[..3].to_vec()).is_err());

        let unclamped = vec![0.0, 0.0, 0.0, 0.5, 0.6, 1.0, 1.0, 1.0];
        assert!(SplineCurve1D::new(3, unclamped, ctrl.clone()).is_err());

        let decreasing = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.5];
        assert!(SplineCurve1D::new(3, decreasing, ctrl).is_err());
    }

    #[test]
    fn unique_knots_and_domain() {
        let curve = SplineCurve1D::new(
            3,
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 2.0, 2.0],
            vec![0.0, 1.0, 0.0, 1.0, 0.0],
        )
        .unwrap();
        assert_eq!(curve.unique_knots(), &[0.0, 1.0, 2.0]);
        assert_eq!(curve.domain(), (0.0, 2.0));
        assert_eq!(curve.evaluate(0.0, 0), 0.0);
        assert_eq!(curve.evaluate(2.0, 0), 0.0);
    }

    #[test]
    fn bezier_special_case() {
        // a single cubic segment is a Bezier curve
        let curve = SplineCurve1D::new(
            3,
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            vec![0.0, 1.0, 3.0, 2.0],
        )
        .unwrap();
        let bezier = |t: f64| {
            let u = 1.0 - t;
            3.0 * u * u * t + 3.0 * 3.0 * u * t * t + 2.0 * t * t * t
        };
        for step in 0..=10 {
            let t = step as f64 / 10.0;
            assert_abs_diff_eq!(curve.evaluate(t, 0), bezier(t), epsilon = 1e-12);
        }
    }

    #[test]
    fn linear_extrapolation_outside_domain() {
        let curve = straight_line();
        let (lo, hi) = curve.domain();
        let slope = curve.evaluate(lo, 1);
        assert_relative_eq!(curve.evaluate(lo - 2.0, 0), curve.evaluate(lo, 0) - slope * 2.0, epsilon = 1e-12);
        assert_relative_eq!(curve.evaluate(hi + 1.0, 1), curve.evaluate(hi, 1), epsilon = 1e-12);
        assert_eq!(curve.evaluate(hi + 1.0, 2), Vec3::zeros());
    }

    #[test]
    fn arc_length_of_straight_line() {
        let curve = straight_line();
        assert_relative_eq!(curve.length(), 2.0, epsilon = 1e-12);
        let arc = curve.ctrl_point_arc_length();
        assert_eq!(arc.len(), 5);
        for (i, s) in arc.iter().enumerate() {
            assert_relative_eq!(*s, 0.5 * i as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn arc_length_parameterization_keeps_endpoints() {
        let points = quarter_circle(2.0, 9);
        let curve = CubicSplineInterp::new()
            .interpolate_points(&points, BoundaryCondition::Hermite)
            .unwrap();
        let length = curve.length();
        let curve = curve.arc_length_param().unwrap();

        let (lo, hi) = curve.domain();
        assert_eq!(lo, 0.0);
        assert_relative_eq!(hi, length, epsilon = 1e-12);
        assert_relative_eq!(curve.evaluate(lo, 0), points[0], epsilon = 1e-9);
        assert_relative_eq!(curve.evaluate(hi, 0), points[8], epsilon = 1e-9);

        // quarter circle of radius two
        assert_relative_eq!(hi, PI, epsilon = 1e-3);
        // unit speed everywhere
        for step in 0..=20 {
            let s = hi * step as f64 / 20.0;
            assert_abs_diff_eq!(curve.speed(s), 1.0, epsilon = 2e-2);
        }
    }

    #[test]
    fn normals_are_perpendicular_unit_vectors() {
        let curve = CubicSplineInterp::new()
            .interpolate_points(&quarter_circle(1.0, 7), BoundaryCondition::Hermite)
            .unwrap()
            .arc_length_param()
            .unwrap();
        let (lo, hi) = curve.domain();
        for step in 0..=10 {
            let s = lo + (hi - lo) * step as f64 / 10.0;
            let n = curve.normal_vec(s);
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(n.dot(&curve.norm_tangent_vec(s)), 0.0, epsilon = 1e-12);
            // points towards the centre of the circle
            assert!(n.dot(&-curve.evaluate(s, 0)) > 0.9);
        }

        let line = straight_line();
        let n = line.normal_vec(1.0);
        assert_relative_eq!(n, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn curvilinear_coordinates_of_straight_line() {
        let curve = straight_line().arc_length_param().unwrap();
        let point = Vec3::new(1.0, -1.0 + 0.3, 1.2);
        let coord = curve.cartesian_to_curvilinear(&point, 0.5, 1.5, 1e-10, 100);
        assert!(coord.converged);
        assert_relative_eq!(coord.s, 1.2, epsilon = 1e-8);
        assert_relative_eq!(coord.rho, 0.3, epsilon = 1e-8);
        // normal along x, binormal along y
        assert_relative_eq!(coord.phi, 0.5 * PI, epsilon = 1e-8);
    }

    #[test]
    fn curvilinear_coordinates_of_arc() {
        let curve = CubicSplineInterp::new()
            .interpolate_points(&quarter_circle(2.0, 11), BoundaryCondition::Hermite)
            .unwrap()
            .arc_length_param()
            .unwrap();
        // point inside the arc, on the bisecting ray
        let point = Vec3::new(1.5 * (0.25 * PI).cos(), 1.5 * (0.25 * PI).sin(), 0.0);
        let coord = curve.cartesian_to_curvilinear(&point, 1.0, 2.0, 1e-10, 100);
        assert!(coord.converged);
        // a quarter of the way along a radius two arc
        assert_abs_diff_eq!(coord.s, 0.5 * PI, epsilon = 5e-3);
        assert_abs_diff_eq!(coord.rho, 0.5, epsilon = 5e-3);
        // lies in the direction of the principal normal
        assert_abs_diff_eq!(coord.phi, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn refinement_reports_missing_convergence() {
        let curve = straight_line().arc_length_param().unwrap();
        let point = Vec3::new(1.0, -1.0, 1.2);
        let coord = curve.cartesian_to_curvilinear(&point, 0.0, 2.0, 1e-14, 0);
        assert!(!coord.converged);
        assert_relative_eq!(coord.s, 1.0);
    }

    #[test]
    fn bracket_excluding_foot_point_is_not_converged() {
        let curve = straight_line().arc_length_param().unwrap();
        let point = Vec3::new(1.1, -1.0, 1.8);
        let coord = curve.cartesian_to_curvilinear(&point, 0.5, 1.0, 1e-6, 100);
        assert!(!coord.converged);
        assert_abs_diff_eq!(coord.s, 1.0, epsilon = 1e-5);

        let coord = curve.cartesian_to_curvilinear(&point, 0.5, 2.0, 1e-6, 100);
        assert!(coord.converged);
        assert_relative_eq!(coord.s, 1.8, epsilon = 1e-6);
        assert_relative_eq!(coord.rho, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn shift_moves_curve_rigidly() {
        let mut curve = straight_line();
        let before = curve.evaluate(1.3, 0);
        let tangent = curve.tangent_vec(1.3);
        let offset = Vec3::new(0.5, 1.0, -2.0);
        curve.shift(&offset);
        assert_relative_eq!(curve.evaluate(1.3, 0), before + offset, epsilon = 1e-12);
        assert_relative_eq!(curve.tangent_vec(1.3), tangent, epsilon = 1e-12);
    }
}
