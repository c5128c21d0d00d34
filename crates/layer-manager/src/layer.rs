//! Image resource ownership tokens and the display layer type.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use climate_common::{GeoRect, RasterImage};

/// Counts live image resources for one visualization slot.
///
/// The browser original leaned on object-URL revocation for this; here
/// the accounting is explicit so the at-most-one-alive property is
/// observable in tests and at runtime.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    alive: AtomicUsize,
    released_total: AtomicUsize,
}

impl ResourceRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn register(&self) {
        self.alive.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.alive.fetch_sub(1, Ordering::SeqCst);
        self.released_total.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of currently live image resources.
    pub fn alive(&self) -> usize {
        self.alive.load(Ordering::SeqCst)
    }

    /// Total resources released over the registry's lifetime.
    pub fn released_total(&self) -> usize {
        self.released_total.load(Ordering::SeqCst)
    }
}

/// Exclusive handle to a realized raster.
///
/// The backing image is released exactly once: either explicitly via
/// [`ImageHandle::release`] or implicitly on drop, whichever comes
/// first. A released handle keeps existing but no longer exposes
/// pixels, so use-after-release shows up as `None` instead of stale
/// data.
#[derive(Debug)]
pub struct ImageHandle {
    image: Option<RasterImage>,
    registry: Arc<ResourceRegistry>,
}

impl ImageHandle {
    pub fn new(image: RasterImage, registry: Arc<ResourceRegistry>) -> Self {
        registry.register();
        Self {
            image: Some(image),
            registry,
        }
    }

    /// The backing image, or `None` once released.
    pub fn image(&self) -> Option<&RasterImage> {
        self.image.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.image.is_none()
    }

    /// Release the backing image. Idempotent: the second and later
    /// calls are no-ops, so a handle can never double-free.
    pub fn release(&mut self) {
        if self.image.take().is_some() {
            trace!("image resource released");
            self.registry.release();
        }
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// A displayable overlay: an owned image plus display metadata.
#[derive(Debug)]
pub struct Layer {
    image: ImageHandle,
    pub rectangle: GeoRect,
    alpha: f32,
    pub time_index: Option<u8>,
}

impl Layer {
    /// Alpha is clamped into [0, 1] before assignment; the rectangle of
    /// locally composited layers is always the full globe.
    pub fn new(image: ImageHandle, rectangle: GeoRect, alpha: f32) -> Self {
        Self {
            image,
            rectangle,
            alpha: alpha.clamp(0.0, 1.0),
            time_index: None,
        }
    }

    pub fn with_time_index(mut self, hour: u8) -> Self {
        self.time_index = Some(hour);
        self
    }

    pub fn image(&self) -> Option<&RasterImage> {
        self.image.image()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Release the backing image resource.
    pub fn release(&mut self) {
        self.image.release();
    }

    pub fn is_released(&self) -> bool {
        self.image.is_released()
    }
}
