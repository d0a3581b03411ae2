//! B-spline description of tubular molecular pathways.
//!
//! The crate is layered bottom-up:
//!
//! - [`basis`] evaluates B-spline basis functions and their derivatives with
//!   the Cox-de Boor recursion,
//! - [`interp`] interpolates data with C2 continuous cubic splines under
//!   Hermite end conditions, solving the collocation system with [`banded`],
//! - [`spline_curve`] evaluates the resulting curves, reparameterizes space
//!   curves by arc length and maps Cartesian points onto them,
//! - [`pathway`] combines an arc length parameterized centre line with a
//!   radius profile.
//!
//! ```rust
//! use molpath::{PathMappingParameters, Pathway, Vec3};
//!
//! let points = (0..4).map(|i| Vec3::new(0.0, 0.0, i as f64)).collect();
//! let pathway = Pathway::new(points, vec![1.0; 4]).unwrap();
//! assert!((pathway.length() - 3.0).abs() < 1e-9);
//!
//! let params = PathMappingParameters::default();
//! let mapped = pathway.map_selection(&[(42, Vec3::new(0.3, 0.0, 1.2))], &params).unwrap();
//! assert!((mapped[&42].s - 1.2).abs() < 1e-6);
//! assert!(pathway.check_if_inside(&mapped, 0.0)[&42]);
//! ```

pub mod banded;
pub mod basis;
pub mod config;
pub mod document;
pub mod error;
pub mod interp;
pub mod pathway;
pub mod point;
pub mod quadrature;
pub mod search;
pub mod spline_curve;

pub use config::PathMappingParameters;
pub use document::{CurveDocument, PathwayDocument, PropertyDocument};
pub use error::{ConfigError, PathwayError, SplineError};
pub use interp::{BoundaryCondition, CubicSplineInterp};
pub use pathway::Pathway;
pub use point::{ControlPoint, Vec3};
pub use search::{KdTreeSearch, LinearSearch, NeighbourMatch, NeighbourhoodSearch};
pub use spline_curve::{ArcLength, CurvilinearCoord, Native, SplineCurve, SplineCurve1D, SplineCurve3D};

/// Denominators of the basis recursion below this value count as zero.
pub const EPSILON: f64 = f64::EPSILON;
