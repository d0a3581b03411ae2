//! Error types for spline construction, pathway handling and configuration.

use thiserror::Error;

use crate::interp::BoundaryCondition;

/// Failures of the spline kernel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    #[error("boundary condition {0:?} is not implemented, only Hermite boundary conditions are supported")]
    UnsupportedBoundaryCondition(BoundaryCondition),

    #[error("invalid interpolation input: {0}")]
    InvalidInput(String),

    #[error("invalid knot vector: {0}")]
    InvalidKnotVector(String),

    #[error("basis index {index} out of range, knot vector supports {count} basis functions")]
    BasisIndexOutOfRange { index: usize, count: usize },

    #[error("banded system is singular, zero pivot in row {row}")]
    SingularSystem { row: usize },
}

/// Failures while building, loading or querying a [`Pathway`](crate::Pathway).
#[derive(Error, Debug)]
pub enum PathwayError {
    #[error(transparent)]
    Spline(#[from] SplineError),

    #[error("got {points} path points but {radii} radii")]
    MismatchedInput { points: usize, radii: usize },

    #[error("invalid pathway document: {0}")]
    InvalidDocument(String),

    #[error("pathway document could not be (de)serialized: {0}")]
    Json(#[from] serde_json::Error),

    #[error("at least two sample points are required, got {0}")]
    InvalidSampleCount(usize),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures while loading mapping parameters.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not parse mapping parameters: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid mapping parameter: {0}")]
    Invalid(String),
}
