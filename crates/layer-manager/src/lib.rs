//! Layer lifecycle management.
//!
//! Owns the sequence of generated overlay images and the handoff to the
//! display host. The defining correctness property: at most one
//! realized image resource is alive per visualization slot at any time.
//! Every replaced or superseded image is released exactly once, and a
//! stale install (an older request completing after a newer one) is
//! discarded instead of clobbering the newer state.

pub mod layer;
pub mod series;
pub mod slot;

pub use layer::{ImageHandle, Layer, ResourceRegistry};
pub use series::{format_hour, Frame, HourlySeries};
pub use slot::{GenerationCounter, LayerSlot};
