//! Display host boundary.

use climate_common::{GeoRect, RasterImage};

/// The 3-D scene that actually paints overlays.
///
/// The engine pushes `(image, rectangle, alpha)` at it after every
/// successful install; the host translates its own input events into
/// [`crate::Visualizer::pick`] calls, decoupled from any UI framework.
pub trait DisplayHost {
    fn present(&mut self, image: &RasterImage, rectangle: GeoRect, alpha: f32);
}
