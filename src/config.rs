//! Parameters for mapping positions onto a pathway.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parameters controlling [`Pathway::map_selection`](crate::Pathway::map_selection)
/// and [`Pathway::map_positions`](crate::Pathway::map_positions).
///
/// Missing fields take their default value when loading from TOML:
///
/// ```rust
/// use molpath::PathMappingParameters;
///
/// let params = PathMappingParameters::from_toml_str("nbh_cutoff = 1.5").unwrap();
/// assert_eq!(params.nbh_cutoff, 1.5);
/// assert_eq!(params.max_iter, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathMappingParameters {
    /// Convergence tolerance of the foot point refinement, in arc length.
    pub map_tol: f64,
    /// Positions farther than this from every reference point are not mapped.
    pub nbh_cutoff: f64,
    /// Distance the reference sample extends beyond either opening.
    pub extrap_dist: f64,
    /// Arc length spacing of the reference sample used by `map_positions`.
    pub sample_step: f64,
    /// Iteration budget of the foot point refinement.
    pub max_iter: usize,
}

impl Default for PathMappingParameters {
    fn default() -> Self {
        PathMappingParameters {
            map_tol: 1e-6,
            nbh_cutoff: 0.5,
            extrap_dist: 1.0,
            sample_step: 0.1,
            max_iter: 100,
        }
    }
}

impl PathMappingParameters {
    /// Parse and validate parameters from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let params: PathMappingParameters = toml::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("map_tol", self.map_tol),
            ("nbh_cutoff", self.nbh_cutoff),
            ("sample_step", self.sample_step),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !(self.extrap_dist >= 0.0) || !self.extrap_dist.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "extrap_dist must be finite and non-negative, got {}",
                self.extrap_dist
            )));
        }
        if self.max_iter == 0 {
            return Err(ConfigError::Invalid("max_iter must be at least one".into()));
        }
        Ok(())
    }
}
