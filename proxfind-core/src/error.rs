//! Error types for geometry and index operations.

use thiserror::Error;

/// Errors produced by geometry construction and measurement.
///
/// These are per-operation errors; the matcher converts them into
/// [`Warning`](crate::matcher::Warning) values rather than aborting a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeomError {
    /// The geometry has no coordinates.
    #[error("geometry is empty")]
    EmptyGeometry,

    /// Buffer radii must be strictly positive.
    #[error("buffer radius must be positive (got {0})")]
    InvalidRadius(f64),

    /// The geometry has no computable centroid.
    #[error("geometry has no centroid")]
    NoCentroid,

    /// The geometry has no computable bounding rectangle.
    #[error("geometry has no bounding rectangle")]
    NoBoundingRect,

    /// A measurement produced a non-finite value (NaN coordinates, usually).
    #[error("distance measurement is not finite")]
    NonFiniteDistance,
}

pub type Result<T> = std::result::Result<T, GeomError>;
