//! Errors raised while building a scene or starting a render

use thiserror::Error;

/// Everything that can stop a render before (or while) it runs.
///
/// Numeric edge cases met during tracing (parallel rays, tangent hits, shadow
/// rays that find nothing) are not errors; they resolve to "no contribution".
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("zero vector where a direction is required")]
    DegenerateVector,

    #[error("camera axes are not orthogonal")]
    NonOrthogonalCamera,

    #[error("plane points are collinear or repeated")]
    DegeneratePlane,

    #[error("invalid polygon: {0}")]
    InvalidPolygon(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("missing render field: {0}")]
    MissingField(&'static str),

    #[error("{0} render worker(s) panicked")]
    WorkerPanicked(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
