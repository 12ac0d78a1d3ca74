//! Error type shared by the library modules.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = GeoError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GeoError {
    /// A polygon with no usable vertices reached index construction.
    #[error("invalid geometry for polygon {id}: {reason}")]
    InvalidGeometry { id: usize, reason: String },

    #[error("dimension mismatch: expected {expected} coordinates, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("unknown distance metric '{0}'")]
    UnknownMetric(String),

    #[error("unknown projection '{0}'")]
    UnknownProjection(String),

    /// Two inputs that must pair up record for record have different lengths.
    #[error("{what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column {column}: cannot parse '{value}'")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("duplicate clip keys: {0:?}")]
    DuplicateKeys(Vec<String>),

    #[error("column '{column}' not found in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("unsupported shape in {}: expected {expected}", path.display())]
    UnsupportedShape { expected: &'static str, path: PathBuf },

    #[error("invalid field name '{name}': {reason}")]
    FieldName { name: String, reason: String },

    #[error("projection failed for ({lon}, {lat}): {reason}")]
    Projection { lon: f64, lat: f64, reason: String },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Shapefile(#[from] shapefile::Error),

    #[error(transparent)]
    Dbase(#[from] shapefile::dbase::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
