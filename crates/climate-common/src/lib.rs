//! Common types shared across the climate-globe crates.

pub mod config;
pub mod error;
pub mod rect;
pub mod raster;
pub mod sample;
pub mod testdata;

pub use config::{HourSelection, VisualizationConfig};
pub use error::{OverlayError, OverlayResult};
pub use raster::{RasterImage, Rgba};
pub use rect::GeoRect;
pub use sample::{ClimateVariable, NormalizationRange, Sample, SampleSet, SampleValues};
