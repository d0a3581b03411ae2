//! Persisted representation of a pathway.
//!
//! The document stores the original path data together with the spline
//! coefficients, so a pathway can be restored without interpolating again:
//!
//! ```json
//! {
//!   "pathPoints": [[0.0, 0.0, 0.0], ...],
//!   "pathRadii": [1.0, ...],
//!   "centreLine": { "degree": 3, "knots": [...], "ctrlPoints": [[x, y, z], ...] },
//!   "poreRadius": { "degree": 3, "knots": [...], "ctrlPoints": [r, ...] },
//!   "properties": { "density": { "curve": { ... }, "divergent": false } }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SplineError;
use crate::point::{ControlPoint, Vec3};
use crate::spline_curve::{Native, SplineCurve};

/// Coefficients of a single spline curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveDocument<P> {
    pub degree: usize,
    pub knots: Vec<f64>,
    pub ctrl_points: Vec<P>,
}

impl<P: ControlPoint> CurveDocument<P> {
    pub fn from_curve<S>(curve: &SplineCurve<P, S>) -> Self {
        CurveDocument {
            degree: curve.degree(),
            knots: curve.knots().to_vec(),
            ctrl_points: curve.ctrl_points().to_vec(),
        }
    }

    /// Rebuild the curve, checking the knot vector invariants.
    pub fn to_curve(&self) -> Result<SplineCurve<P, Native>, SplineError> {
        SplineCurve::new(self.degree, self.knots.clone(), self.ctrl_points.clone())
    }

    /// Rebuild a curve under the parameterization it was persisted with.
    pub(crate) fn to_curve_as<S>(&self) -> Result<SplineCurve<P, S>, SplineError> {
        SplineCurve::from_parts(self.degree, self.knots.clone(), self.ctrl_points.clone())
    }
}

/// Scalar property attached to a pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub curve: CurveDocument<f64>,
    pub divergent: bool,
}

/// Everything needed to restore a [`Pathway`](crate::Pathway).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayDocument {
    pub path_points: Vec<Vec3>,
    pub path_radii: Vec<f64>,
    pub centre_line: CurveDocument<Vec3>,
    pub pore_radius: CurveDocument<f64>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline_curve::SplineCurve1D;

    #[test]
    fn curve_document_round_trip() {
        let curve = SplineCurve1D::new(
            3,
            vec![0.0, 0.0, 0.0, 0.0, 0.1, 0.7, 0.7, 0.7, 0.7],
            vec![1.0 / 3.0, 0.2, 0.30000000000000004, 1e-17, 2.5],
        )
        .unwrap();
        let doc = CurveDocument::from_curve(&curve);
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"ctrlPoints\""));

        let restored: CurveDocument<f64> = serde_json::from_str(&json).unwrap();
        let restored: SplineCurve1D = restored.to_curve().unwrap();
        assert_eq!(restored, curve);
    }

    #[test]
    fn vector_control_points_are_arrays() {
        let doc = CurveDocument {
            degree: 1,
            knots: vec![0.0, 0.0, 1.0, 1.0],
            ctrl_points: vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)],
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["ctrlPoints"][1], serde_json::json!([4.0, 5.0, 6.0]));
    }

    #[test]
    fn inconsistent_curve_is_rejected() {
        let doc = CurveDocument {
            degree: 3,
            knots: vec![0.0, 0.0, 1.0, 1.0],
            ctrl_points: vec![0.0, 1.0],
        };
        assert!(doc.to_curve().is_err());
        assert!(doc.to_curve_as::<crate::spline_curve::ArcLength>().is_err());
    }
}
