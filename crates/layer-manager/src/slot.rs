//! The active layer slot and its generation-counter install guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use climate_common::{OverlayError, OverlayResult};

use crate::layer::{Layer, ResourceRegistry};

/// Monotonic request sequence numbers. Every visualization request
/// takes the next generation before doing any work; the slot then
/// refuses installs from superseded generations.
#[derive(Debug, Default)]
pub struct GenerationCounter(AtomicU64);

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next generation, starting at 1.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The most recently issued generation.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// One visualization slot: Empty until the first install, then Active
/// until cleared.
///
/// Installing releases the previously displayed image exactly once;
/// a stale install (generation at or below the last installed one)
/// releases the incoming image instead and leaves the slot untouched.
#[derive(Debug)]
pub struct LayerSlot {
    active: Option<Layer>,
    installed_generation: u64,
    registry: Arc<ResourceRegistry>,
}

impl LayerSlot {
    pub fn new() -> Self {
        Self {
            active: None,
            installed_generation: 0,
            registry: ResourceRegistry::new(),
        }
    }

    /// The registry new image handles for this slot must be created
    /// against, so the at-most-one-alive accounting stays truthful.
    pub fn registry(&self) -> Arc<ResourceRegistry> {
        Arc::clone(&self.registry)
    }

    /// Install a layer produced by request `generation`.
    ///
    /// Out-of-order completions resolve here: if a newer generation has
    /// already been installed the incoming layer is released and
    /// `StaleResultDiscarded` returned, an internal signal, not a
    /// user-visible failure. On success the previous layer's image is
    /// released immediately after the swap.
    pub fn install(&mut self, mut layer: Layer, generation: u64) -> OverlayResult<()> {
        if generation <= self.installed_generation {
            let current = self.installed_generation;
            trace!(generation, current, "discarding stale install");
            layer.release();
            return Err(OverlayError::StaleResultDiscarded {
                stale: generation,
                current,
            });
        }

        debug!(generation, "installing layer");
        let previous = self.active.replace(layer);
        self.installed_generation = generation;
        if let Some(mut old) = previous {
            old.release();
        }
        Ok(())
    }

    /// Mutate the active layer's opacity in place; no resource churn.
    /// Returns false when the slot is empty.
    pub fn set_opacity(&mut self, alpha: f32) -> bool {
        match self.active.as_mut() {
            Some(layer) => {
                layer.set_alpha(alpha);
                true
            }
            None => false,
        }
    }

    /// Re-tag the active layer with an hour index; no resource churn.
    pub fn advance_time(&mut self, hour: u8) -> bool {
        match self.active.as_mut() {
            Some(layer) => {
                layer.time_index = Some(hour);
                true
            }
            None => false,
        }
    }

    /// Release the active layer and return to Empty. The generation
    /// watermark is kept so late arrivals from before the clear are
    /// still discarded.
    pub fn clear(&mut self) {
        if let Some(mut layer) = self.active.take() {
            layer.release();
        }
    }

    pub fn active(&self) -> Option<&Layer> {
        self.active.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_none()
    }

    pub fn installed_generation(&self) -> u64 {
        self.installed_generation
    }
}

impl Default for LayerSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::ImageHandle;
    use climate_common::{GeoRect, RasterImage};

    fn layer_for(slot: &LayerSlot, tag: u8) -> Layer {
        let mut image = RasterImage::new(4, 2).unwrap();
        image.put_pixel(0, 0, climate_common::Rgba::new(tag, 0, 0, 255));
        Layer::new(
            ImageHandle::new(image, slot.registry()),
            GeoRect::GLOBE,
            0.8,
        )
    }

    #[test]
    fn empty_to_active_to_empty() {
        let mut slot = LayerSlot::new();
        assert!(slot.is_empty());
        assert!(!slot.set_opacity(0.5));

        let layer = layer_for(&slot, 1);
        slot.install(layer, 1).unwrap();
        assert!(!slot.is_empty());

        slot.clear();
        assert!(slot.is_empty());
        assert_eq!(slot.registry().alive(), 0);
    }

    #[test]
    fn install_releases_the_previous_image() {
        let mut slot = LayerSlot::new();
        let registry = slot.registry();

        for generation in 1..=5u64 {
            let layer = layer_for(&slot, generation as u8);
            slot.install(layer, generation).unwrap();
            // Exactly one backing resource alive after every install.
            assert_eq!(registry.alive(), 1);
        }
        assert_eq!(registry.released_total(), 4);

        let active = slot.active().unwrap();
        assert_eq!(active.image().unwrap().pixel(0, 0).r, 5);
    }

    #[test]
    fn stale_install_is_discarded_and_released() {
        let mut slot = LayerSlot::new();
        let registry = slot.registry();

        // G2 completes first.
        slot.install(layer_for(&slot, 2), 2).unwrap();
        // G1 arrives late.
        let result = slot.install(layer_for(&slot, 1), 1);
        assert!(matches!(
            result,
            Err(OverlayError::StaleResultDiscarded { stale: 1, current: 2 })
        ));

        // The newer layer stays displayed and only one resource lives.
        assert_eq!(slot.active().unwrap().image().unwrap().pixel(0, 0).r, 2);
        assert_eq!(registry.alive(), 1);
        assert_eq!(slot.installed_generation(), 2);
    }

    #[test]
    fn generation_ordering_holds_regardless_of_completion_order() {
        // Both orders end with G2 active.
        for g1_first in [true, false] {
            let mut slot = LayerSlot::new();
            let (a, b) = if g1_first { (1, 2) } else { (2, 1) };
            let _ = slot.install(layer_for(&slot, a as u8), a);
            let _ = slot.install(layer_for(&slot, b as u8), b);
            assert_eq!(slot.installed_generation(), 2);
            assert_eq!(slot.active().unwrap().image().unwrap().pixel(0, 0).r, 2);
            assert_eq!(slot.registry().alive(), 1);
        }
    }

    #[test]
    fn late_arrival_after_clear_is_still_stale() {
        let mut slot = LayerSlot::new();
        slot.install(layer_for(&slot, 3), 3).unwrap();
        slot.clear();

        let result = slot.install(layer_for(&slot, 2), 2);
        assert!(result.is_err());
        assert!(slot.is_empty());
        assert_eq!(slot.registry().alive(), 0);
    }

    #[test]
    fn opacity_and_time_mutate_without_churn() {
        let mut slot = LayerSlot::new();
        slot.install(layer_for(&slot, 1), 1).unwrap();
        let registry = slot.registry();
        let released_before = registry.released_total();

        assert!(slot.set_opacity(0.25));
        assert!(slot.advance_time(13));
        assert_eq!(slot.active().unwrap().alpha(), 0.25);
        assert_eq!(slot.active().unwrap().time_index, Some(13));
        assert_eq!(registry.released_total(), released_before);
    }

    #[test]
    fn counter_is_monotonic() {
        let counter = GenerationCounter::new();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.current(), 2);
        assert_eq!(counter.next(), 3);
    }
}
