//! Land/water masking for composited overlays.
//!
//! Rasterizes a land-polygon boundary dataset into a binary mask at the
//! target resolution, using the same lon/lat -> pixel projection as the
//! rest of the pipeline. Masks are cached per resolution; when boundary
//! data cannot be loaded, callers fall back to an all-land mask so
//! rendering degrades instead of failing.

pub mod cache;
pub mod geojson;
pub mod mask;
pub mod source;

pub use cache::MaskCache;
pub use geojson::{parse_feature_collection, BoundaryPolygon};
pub use mask::LandMask;
pub use source::{BoundaryError, BoundarySource, GeoJsonFileSource};
