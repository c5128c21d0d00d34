//! Boundary data sources.

use std::path::{Path, PathBuf};

use thiserror::Error;

use climate_common::OverlayError;

use crate::geojson::{parse_feature_collection, BoundaryPolygon};

/// Boundary-loading errors. Surface as `BoundaryDataUnavailable`, which
/// callers recover from with an all-land mask.
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<BoundaryError> for OverlayError {
    fn from(err: BoundaryError) -> Self {
        OverlayError::BoundaryDataUnavailable(err.to_string())
    }
}

/// Supplies land polygons in geographic coordinates. Consumed once per
/// resolution; results are cacheable.
pub trait BoundarySource: Send + Sync {
    fn load(&self) -> Result<Vec<BoundaryPolygon>, BoundaryError>;
}

/// Loads boundaries from a GeoJSON file on disk.
#[derive(Debug, Clone)]
pub struct GeoJsonFileSource {
    path: PathBuf,
}

impl GeoJsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BoundarySource for GeoJsonFileSource {
    fn load(&self) -> Result<Vec<BoundaryPolygon>, BoundaryError> {
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| BoundaryError::Io(format!("{}: {}", self.path.display(), e)))?;
        parse_feature_collection(&json)
    }
}
