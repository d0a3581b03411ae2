//! Molecular pathways.
//!
//! A [`Pathway`] describes a tube through space, e.g. the pore of an ion
//! channel. It is built from the ordered centre line points and radii found
//! by a path finder: the points are interpolated by a C2 continuous cubic
//! spline which is then reparameterized by arc length, and the radii are
//! interpolated over the arc length of their points. Together the two curves
//! allow mapping particle positions onto the pathway
//! ([`Pathway::map_selection`]) and deciding whether they lie inside it
//! ([`Pathway::check_if_inside`]).

use std::collections::BTreeMap;
use std::f64::consts::PI;

use log::{debug, warn};

use crate::config::PathMappingParameters;
use crate::document::{CurveDocument, PathwayDocument, PropertyDocument};
use crate::error::{ConfigError, PathwayError};
use crate::interp::{BoundaryCondition, CubicSplineInterp};
use crate::point::Vec3;
use crate::quadrature::integrate_piecewise;
use crate::search::{KdTreeSearch, NeighbourhoodSearch};
use crate::spline_curve::{ArcLength, CurvilinearCoord, SplineCurve1D, SplineCurve3D};

/// Minimum number of radius samples scanned by [`Pathway::min_radius`].
const MIN_RADIUS_SAMPLES: usize = 1000;
/// Golden section steps refining the minimum radius location.
const MIN_RADIUS_REFINE_ITERS: usize = 60;
/// Upper bound on the reference sample built by [`Pathway::map_positions`].
const MAX_REFERENCE_SAMPLES: usize = 10_000_000;

/// Pathway with an arc length parameterized centre line and radius profile.
#[derive(Debug, Clone)]
pub struct Pathway {
    // original path data
    path_points: Vec<Vec3>,
    path_radii: Vec<f64>,

    centre_line: SplineCurve3D<ArcLength>,
    pore_radius: SplineCurve1D,

    // centre line mapped properties and whether they diverge at the openings
    properties: BTreeMap<String, (SplineCurve1D, bool)>,

    opening_lo: f64,
    opening_hi: f64,
    length: f64,
}

impl Pathway {
    /// Build a pathway from centre line points and the corresponding radii.
    ///
    /// At least three points are required and consecutive points must not
    /// coincide.
    pub fn new(path_points: Vec<Vec3>, path_radii: Vec<f64>) -> Result<Self, PathwayError> {
        if path_points.len() != path_radii.len() {
            return Err(PathwayError::MismatchedInput {
                points: path_points.len(),
                radii: path_radii.len(),
            });
        }

        let interp = CubicSplineInterp::new();
        let centre_line = interp.interpolate_points(&path_points, BoundaryCondition::Hermite)?;

        // arc length at the original points
        let arc_length = centre_line.ctrl_point_arc_length();
        let opening_lo = arc_length[0];
        let opening_hi = arc_length[arc_length.len() - 1];
        let length = (opening_hi - opening_lo).abs();

        let pore_radius = interp.interpolate(&arc_length, &path_radii, BoundaryCondition::Hermite)?;
        let centre_line = centre_line.reparameterize(&arc_length)?;

        debug!(
            "constructed pathway from {} points, length {:.6}, openings at {:.6} and {:.6}",
            path_points.len(),
            length,
            opening_lo,
            opening_hi
        );

        Ok(Pathway {
            path_points,
            path_radii,
            centre_line,
            pore_radius,
            properties: BTreeMap::new(),
            opening_lo,
            opening_hi,
            length,
        })
    }

    /// Restore a pathway from its persisted coefficients without interpolating.
    pub fn from_document(doc: &PathwayDocument) -> Result<Self, PathwayError> {
        if doc.path_points.len() != doc.path_radii.len() {
            return Err(PathwayError::MismatchedInput {
                points: doc.path_points.len(),
                radii: doc.path_radii.len(),
            });
        }

        let centre_line: SplineCurve3D<ArcLength> = doc.centre_line.to_curve_as()?;
        let pore_radius: SplineCurve1D = doc.pore_radius.to_curve()?;
        if centre_line.unique_knots().len() != doc.path_points.len() {
            return Err(PathwayError::InvalidDocument(format!(
                "centre line has {} unique knots but there are {} path points",
                centre_line.unique_knots().len(),
                doc.path_points.len()
            )));
        }
        if pore_radius.domain() != centre_line.domain() {
            return Err(PathwayError::InvalidDocument(format!(
                "pore radius is defined over {:?} but the centre line over {:?}",
                pore_radius.domain(),
                centre_line.domain()
            )));
        }

        let mut properties = BTreeMap::new();
        for (name, property) in doc.properties.iter() {
            properties.insert(name.clone(), (property.curve.to_curve()?, property.divergent));
        }

        let (opening_lo, opening_hi) = centre_line.domain();
        Ok(Pathway {
            path_points: doc.path_points.clone(),
            path_radii: doc.path_radii.clone(),
            centre_line,
            pore_radius,
            properties,
            opening_lo,
            opening_hi,
            length: (opening_hi - opening_lo).abs(),
        })
    }

    pub fn to_document(&self) -> PathwayDocument {
        PathwayDocument {
            path_points: self.path_points.clone(),
            path_radii: self.path_radii.clone(),
            centre_line: CurveDocument::from_curve(&self.centre_line),
            pore_radius: CurveDocument::from_curve(&self.pore_radius),
            properties: self
                .properties
                .iter()
                .map(|(name, (curve, divergent))| {
                    (
                        name.clone(),
                        PropertyDocument {
                            curve: CurveDocument::from_curve(curve),
                            divergent: *divergent,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, PathwayError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn from_json(json: &str) -> Result<Self, PathwayError> {
        let doc: PathwayDocument = serde_json::from_str(json)?;
        Self::from_document(&doc)
    }

    /// Map positions onto the pathway, using the original path points as
    /// reference for the nearest neighbour search.
    pub fn map_selection(
        &self,
        selection: &[(usize, Vec3)],
        params: &PathMappingParameters,
    ) -> Result<BTreeMap<usize, CurvilinearCoord>, PathwayError> {
        let search = KdTreeSearch::new(&self.path_points);
        self.map_selection_with(selection, &search, params)
    }

    /// Map identified positions onto the pathway with a caller supplied
    /// neighbourhood search. The search must be built over
    /// [`path_points`](Pathway::path_points), its indices are used to bracket
    /// the foot point refinement. Positions without a reference point within
    /// the cutoff are left out of the result.
    pub fn map_selection_with<N: NeighbourhoodSearch + ?Sized>(
        &self,
        selection: &[(usize, Vec3)],
        search: &N,
        params: &PathMappingParameters,
    ) -> Result<BTreeMap<usize, CurvilinearCoord>, PathwayError> {
        params.validate()?;

        // arc length of the original path points
        let reference = self.centre_line.unique_knots();

        let mut mapped = BTreeMap::new();
        let mut degraded = 0;
        for (id, position) in selection.iter() {
            let index = match search.nearest(position, params.nbh_cutoff) {
                Some(m) if m.index < reference.len() => m.index,
                Some(m) => {
                    warn!("neighbourhood search returned unknown reference point {}", m.index);
                    continue;
                }
                None => continue,
            };

            let (lo, hi) = bracket(reference, index, params.nbh_cutoff);
            let coord = self
                .centre_line
                .cartesian_to_curvilinear(position, lo, hi, params.map_tol, params.max_iter);
            if !coord.converged {
                degraded += 1;
            }
            mapped.insert(*id, coord);
        }

        debug!(
            "mapped {} of {} positions onto pathway",
            mapped.len(),
            selection.len()
        );
        if degraded > 0 {
            warn!(
                "curvilinear refinement did not converge for {} positions, tolerance {}",
                degraded, params.map_tol
            );
        }
        Ok(mapped)
    }

    /// Map every position onto the pathway against a fine reference sample
    /// of the centre line spaced `sample_step` apart and extending
    /// `extrap_dist` beyond the openings. No cutoff applies.
    pub fn map_positions(
        &self,
        positions: &[Vec3],
        params: &PathMappingParameters,
    ) -> Result<Vec<CurvilinearCoord>, PathwayError> {
        params.validate()?;
        let n_samples = self.num_sample_points(params)?;
        let arc_length_sample = self.sample_arc_length(n_samples, params.extrap_dist)?;
        let point_sample = self.sample_points(&arc_length_sample);
        let search = KdTreeSearch::new(&point_sample);

        let mut degraded = 0;
        let mut mapped = Vec::with_capacity(positions.len());
        for position in positions.iter() {
            let (lo, hi) = match search.nearest(position, f64::INFINITY) {
                Some(m) => bracket(&arc_length_sample, m.index, params.sample_step),
                None => (arc_length_sample[0], arc_length_sample[n_samples - 1]),
            };
            let coord = self
                .centre_line
                .cartesian_to_curvilinear(position, lo, hi, params.map_tol, params.max_iter);
            if !coord.converged {
                degraded += 1;
            }
            mapped.push(coord);
        }

        if degraded > 0 {
            warn!(
                "curvilinear refinement did not converge for {} positions, tolerance {}",
                degraded, params.map_tol
            );
        }
        Ok(mapped)
    }

    fn num_sample_points(&self, params: &PathMappingParameters) -> Result<usize, PathwayError> {
        let span = self.length + 2.0 * params.extrap_dist;
        let intervals = (span / params.sample_step).ceil();
        if !(intervals < MAX_REFERENCE_SAMPLES as f64) {
            return Err(ConfigError::Invalid(format!(
                "sample_step {} is too small for a pathway spanning {}",
                params.sample_step, span
            ))
            .into());
        }
        Ok((intervals as usize + 1).max(2))
    }

    /// Decide for mapped positions whether they lie within the pore radius
    /// (plus `margin`) at their arc length.
    pub fn check_if_inside(&self, mapped: &BTreeMap<usize, CurvilinearCoord>, margin: f64) -> BTreeMap<usize, bool> {
        mapped
            .iter()
            .map(|(id, coord)| (*id, self.is_inside(coord, margin)))
            .collect()
    }

    /// As [`check_if_inside`](Pathway::check_if_inside), additionally
    /// requiring the arc length to fall within `[s_lo, s_hi]`.
    pub fn check_if_inside_range(
        &self,
        mapped: &BTreeMap<usize, CurvilinearCoord>,
        margin: f64,
        s_lo: f64,
        s_hi: f64,
    ) -> BTreeMap<usize, bool> {
        mapped
            .iter()
            .map(|(id, coord)| {
                let in_range = coord.s >= s_lo && coord.s <= s_hi;
                (*id, in_range && self.is_inside(coord, margin))
            })
            .collect()
    }

    fn is_inside(&self, coord: &CurvilinearCoord, margin: f64) -> bool {
        coord.rho < self.radius(coord.s) + margin
    }

    /// Attach a property curve over the pathway's arc length, replacing any
    /// property of the same name.
    pub fn add_scalar_property(&mut self, name: impl Into<String>, property: SplineCurve1D, divergent: bool) {
        self.properties.insert(name.into(), (property, divergent));
    }

    pub fn scalar_properties(&self) -> &BTreeMap<String, (SplineCurve1D, bool)> {
        &self.properties
    }

    pub fn scalar_property(&self, name: &str) -> Option<&(SplineCurve1D, bool)> {
        self.properties.get(name)
    }

    /// Translate the pathway rigidly.
    pub fn shift(&mut self, offset: &Vec3) {
        self.centre_line.shift(offset);
        for p in self.path_points.iter_mut() {
            *p += offset;
        }
    }

    pub fn path_points(&self) -> &[Vec3] {
        &self.path_points
    }

    pub fn path_radii(&self) -> &[f64] {
        &self.path_radii
    }

    pub fn centre_line(&self) -> &SplineCurve3D<ArcLength> {
        &self.centre_line
    }

    pub fn pore_radius(&self) -> &SplineCurve1D {
        &self.pore_radius
    }

    /// Arc length distance between the first and the last path point.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Arc length of the first path point.
    pub fn s_lo(&self) -> f64 {
        self.opening_lo
    }

    /// Arc length of the last path point.
    pub fn s_hi(&self) -> f64 {
        self.opening_hi
    }

    /// Pore radius at arc length `s`.
    pub fn radius(&self, s: f64) -> f64 {
        self.pore_radius.evaluate(s, 0)
    }

    /// Location and value of the smallest radius between the openings.
    pub fn min_radius(&self) -> (f64, f64) {
        let n = MIN_RADIUS_SAMPLES.max(10 * self.pore_radius.unique_knots().len());
        let step = self.length / (n - 1) as f64;

        let mut best = 0;
        let mut best_radius = f64::INFINITY;
        for i in 0..n {
            let r = self.radius(self.opening_lo + i as f64 * step);
            if r < best_radius {
                best = i;
                best_radius = r;
            }
        }

        // golden section search between the neighbouring samples
        let inv_phi = 0.5 * (5f64.sqrt() - 1.0);
        let mut a = self.opening_lo + best.saturating_sub(1) as f64 * step;
        let mut b = self.opening_lo + (best + 1).min(n - 1) as f64 * step;
        let mut c = b - inv_phi * (b - a);
        let mut d = a + inv_phi * (b - a);
        for _ in 0..MIN_RADIUS_REFINE_ITERS {
            if self.radius(c) < self.radius(d) {
                b = d;
            } else {
                a = c;
            }
            c = b - inv_phi * (b - a);
            d = a + inv_phi * (b - a);
        }
        let s = 0.5 * (a + b);
        let r = self.radius(s);

        let s_best = self.opening_lo + best as f64 * step;
        if r <= best_radius {
            (s, r)
        } else {
            (s_best, best_radius)
        }
    }

    /// Volume enclosed between the openings, the integral of `pi r(s)^2`.
    pub fn volume(&self) -> f64 {
        integrate_piecewise(
            &|s| PI * self.radius(s).powi(2),
            self.pore_radius.unique_knots(),
            self.opening_lo,
            self.opening_hi,
        )
    }

    pub fn pore_radius_knots(&self) -> &[f64] {
        self.pore_radius.knots()
    }

    pub fn pore_radius_unique_knots(&self) -> &[f64] {
        self.pore_radius.unique_knots()
    }

    pub fn pore_radius_ctrl_points(&self) -> &[f64] {
        self.pore_radius.ctrl_points()
    }

    pub fn centre_line_knots(&self) -> &[f64] {
        self.centre_line.knots()
    }

    pub fn centre_line_unique_knots(&self) -> &[f64] {
        self.centre_line.unique_knots()
    }

    pub fn centre_line_ctrl_points(&self) -> &[Vec3] {
        self.centre_line.ctrl_points()
    }

    /// `n` evenly spaced arc length values reaching `extrap_dist` beyond
    /// either opening.
    pub fn sample_arc_length(&self, n: usize, extrap_dist: f64) -> Result<Vec<f64>, PathwayError> {
        if n < 2 {
            return Err(PathwayError::InvalidSampleCount(n));
        }
        let step = (self.length + 2.0 * extrap_dist) / (n - 1) as f64;
        Ok((0..n)
            .map(|i| self.opening_lo - extrap_dist + i as f64 * step)
            .collect())
    }

    /// Centre line points at the given arc lengths.
    pub fn sample_points(&self, arc_length: &[f64]) -> Vec<Vec3> {
        arc_length.iter().map(|&s| self.centre_line.evaluate(s, 0)).collect()
    }

    pub fn sample_points_n(&self, n: usize, extrap_dist: f64) -> Result<Vec<Vec3>, PathwayError> {
        Ok(self.sample_points(&self.sample_arc_length(n, extrap_dist)?))
    }

    /// Centre line tangents at the given arc lengths.
    pub fn sample_tangents(&self, arc_length: &[f64]) -> Vec<Vec3> {
        arc_length.iter().map(|&s| self.centre_line.tangent_vec(s)).collect()
    }

    pub fn sample_tangents_n(&self, n: usize, extrap_dist: f64) -> Result<Vec<Vec3>, PathwayError> {
        Ok(self.sample_tangents(&self.sample_arc_length(n, extrap_dist)?))
    }

    /// Unit tangents at the given arc lengths.
    pub fn sample_norm_tangents(&self, arc_length: &[f64]) -> Vec<Vec3> {
        arc_length.iter().map(|&s| self.centre_line.norm_tangent_vec(s)).collect()
    }

    pub fn sample_norm_tangents_n(&self, n: usize, extrap_dist: f64) -> Result<Vec<Vec3>, PathwayError> {
        Ok(self.sample_norm_tangents(&self.sample_arc_length(n, extrap_dist)?))
    }

    /// Unit normals at the given arc lengths.
    pub fn sample_normals(&self, arc_length: &[f64]) -> Vec<Vec3> {
        arc_length.iter().map(|&s| self.centre_line.normal_vec(s)).collect()
    }

    pub fn sample_normals_n(&self, n: usize, extrap_dist: f64) -> Result<Vec<Vec3>, PathwayError> {
        Ok(self.sample_normals(&self.sample_arc_length(n, extrap_dist)?))
    }

    /// Pore radii at the given arc lengths.
    pub fn sample_radii(&self, arc_length: &[f64]) -> Vec<f64> {
        arc_length.iter().map(|&s| self.radius(s)).collect()
    }

    pub fn sample_radii_n(&self, n: usize, extrap_dist: f64) -> Result<Vec<f64>, PathwayError> {
        Ok(self.sample_radii(&self.sample_arc_length(n, extrap_dist)?))
    }
}

/// Arc length bracket spanned by the neighbours of reference point `index`,
/// widened by `extension` past the first and last reference point.
fn bracket(reference: &[f64], index: usize, extension: f64) -> (f64, f64) {
    let last = reference.len() - 1;
    let lo = if index == 0 {
        reference[0] - extension
    } else {
        reference[index - 1]
    };
    let hi = if index >= last {
        reference[last] + extension
    } else {
        reference[index + 1]
    };
    (lo, hi)
}
