//! Image rendering for climate overlays.
//!
//! Implements the rendering styles used by the globe host:
//! - Color ramps (continuous gradients and discrete bands)
//! - Nearest-sample raster compositing with land masking
//! - Value-scaled point markers
//! - Wind glyph placement
//! - PNG encoding

pub mod compositor;
pub mod glyphs;
pub mod png;
pub mod ramp;

pub use compositor::{
    composite, composite_markers, composite_with_index, CompositeOptions, RangeSelection,
};
pub use glyphs::{place_glyphs, PlacedGlyph};
pub use ramp::{ramp_for, ColorRamp, Interpolation, RampStop};
