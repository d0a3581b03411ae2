use core::fmt::Debug;
use core::ops::{Add, Mul, Sub};

use nalgebra::Vector3;
use num_traits::Zero;

/// Cartesian point or vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Trait over the control point types a spline curve can carry.
/// Scalar curves (e.g. radius profiles) use `f64`, centre lines use `Vec3`.
/// Keeping the trait minimal means the interpolator and the curve evaluation
/// only need the vector space operations plus per-axis access.
pub trait ControlPoint:
    Copy + Debug + PartialEq + Zero + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self>
{
    /// Number of independent coordinates.
    const DIM: usize;

    /// Returns the component on the axis corresponding to `index`, e.g. [0, 1, 2] -> [x, y, z]
    fn axis(&self, index: usize) -> f64;

    /// Build a point from per-axis values.
    fn from_axes<F: FnMut(usize) -> f64>(f: F) -> Self;
}

impl ControlPoint for f64 {
    const DIM: usize = 1;

    fn axis(&self, _index: usize) -> f64 {
        *self
    }

    fn from_axes<F: FnMut(usize) -> f64>(mut f: F) -> Self {
        f(0)
    }
}

impl ControlPoint for Vec3 {
    const DIM: usize = 3;

    fn axis(&self, index: usize) -> f64 {
        self[index]
    }

    fn from_axes<F: FnMut(usize) -> f64>(mut f: F) -> Self {
        Vec3::new(f(0), f(1), f(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_round_trip_through_from_axes() {
        let p = Vec3::new(1.0, -2.0, 3.5);
        let q = Vec3::from_axes(|i| p.axis(i));
        assert_eq!(p, q);

        let r = 4.25f64;
        assert_eq!(<f64 as ControlPoint>::DIM, 1);
        assert_eq!(f64::from_axes(|_| r.axis(0)), r);
    }
}
