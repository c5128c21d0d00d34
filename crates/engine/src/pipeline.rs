//! The visualization pipeline.
//!
//! One in-flight fetch/compute per request. Every request takes a
//! generation before any work happens; rasterization runs on the
//! blocking pool so the interactive thread never stalls; the install
//! step discards results whose generation has been superseded. A
//! failed update never clears a working display.

use std::sync::Arc;

use tracing::{info, trace, warn};

use climate_common::{
    ClimateVariable, GeoRect, HourSelection, OverlayError, OverlayResult, RasterImage, Sample,
    SampleSet, VisualizationConfig,
};
use landmask::{BoundarySource, LandMask, MaskCache};
use layer_manager::{GenerationCounter, HourlySeries, ImageHandle, Layer, LayerSlot};
use renderer::CompositeOptions;
use spatial_index::SampleIndex;

use crate::host::DisplayHost;
use crate::source::{SampleSource, SourceResponse};

/// The current sample set and its index, kept for interactive picking.
/// The index is built exactly once per sample set.
struct Dataset {
    samples: Arc<SampleSet>,
    index: Arc<SampleIndex>,
}

/// Orchestrates fetch -> composite -> install for one visualization
/// slot, and answers the display host's pick queries.
pub struct Visualizer {
    source: Arc<dyn SampleSource>,
    boundaries: Option<Arc<dyn BoundarySource>>,
    mask_cache: Arc<MaskCache>,
    slot: LayerSlot,
    generations: GenerationCounter,
    width: usize,
    height: usize,
    config: VisualizationConfig,
    options: CompositeOptions,
    dataset: Option<Dataset>,
    series: Option<HourlySeries>,
}

impl Visualizer {
    pub fn new(
        source: Arc<dyn SampleSource>,
        boundaries: Option<Arc<dyn BoundarySource>>,
        width: usize,
        height: usize,
    ) -> OverlayResult<Self> {
        if width == 0 || height == 0 {
            return Err(OverlayError::InvalidDimensions { width, height });
        }
        Ok(Self {
            source,
            boundaries,
            mask_cache: Arc::new(MaskCache::new()),
            slot: LayerSlot::new(),
            generations: GenerationCounter::new(),
            width,
            height,
            config: VisualizationConfig::new(ClimateVariable::Temperature),
            options: CompositeOptions::default(),
            dataset: None,
            series: None,
        })
    }

    /// Override compositing options (range selection, blur).
    pub fn set_composite_options(&mut self, options: CompositeOptions) {
        self.options = options;
    }

    /// Run one visualization request end to end.
    ///
    /// A `Live` hour fetches and composites the current data; a
    /// specific hour goes through the hourly-series path, reusing an
    /// already realized frame when one exists.
    pub async fn visualize(&mut self, config: VisualizationConfig) -> OverlayResult<()> {
        config.validate()?;

        // A series is built per metric-selection event; switching
        // variables invalidates the old frames.
        if config.variable != self.config.variable {
            self.series = None;
        }
        self.config = config;

        let generation = self.next_generation();
        match config.hour {
            HourSelection::Live => {
                let response = self.source.fetch_live().await?;
                let (image, rectangle) = self.prepare(response).await?;
                self.install_frame(image, rectangle, None, generation)
            }
            HourSelection::At(hour) => self.scrub_to(hour, generation).await,
        }
    }

    /// Move to a different hour of the current series.
    pub async fn advance_time(&mut self, hour: u8) -> OverlayResult<()> {
        if hour > 23 {
            return Err(OverlayError::InvalidConfig(format!(
                "hour out of range: {}",
                hour
            )));
        }
        let generation = self.next_generation();
        self.scrub_to(hour, generation).await
    }

    async fn scrub_to(&mut self, hour: u8, generation: u64) -> OverlayResult<()> {
        let series = self.series.get_or_insert_with(HourlySeries::new);

        // Realized frames swap immediately, no recompute.
        if let Some(image) = series.select(hour).cloned() {
            trace!(hour, "hourly frame already realized");
            return self.install_frame(image, GeoRect::GLOBE, Some(hour), generation);
        }

        // Pending frame: the previously displayed layer stays up while
        // this one is fetched and composited; the swap happens exactly
        // once, at install.
        info!(hour, "materializing hourly frame");
        let response = self.source.fetch_hour(hour).await?;
        let (image, rectangle) = self.prepare(response).await?;
        if let Some(series) = self.series.as_mut() {
            series.set_frame(hour, image.clone());
            series.select(hour);
        }
        self.install_frame(image, rectangle, Some(hour), generation)
    }

    /// Turn a source response into a displayable frame.
    ///
    /// Raw samples are indexed once, then composited on the blocking
    /// pool; pre-rendered rasters pass straight through.
    async fn prepare(
        &mut self,
        response: SourceResponse,
    ) -> OverlayResult<(RasterImage, GeoRect)> {
        match response {
            SourceResponse::Raster { image, rectangle } => {
                // A pre-rendered frame must arrive at the dimensions
                // the layer was configured for.
                if image.width() != self.width || image.height() != self.height {
                    return Err(OverlayError::FetchFailed(format!(
                        "pre-rendered raster is {}x{}, expected {}x{}",
                        image.width(),
                        image.height(),
                        self.width,
                        self.height
                    )));
                }
                Ok((image, rectangle))
            }
            SourceResponse::Samples(set) => {
                let samples = Arc::new(set);
                let index = Arc::new(SampleIndex::build(&samples, self.width, self.height)?);

                let task_samples = Arc::clone(&samples);
                let task_index = Arc::clone(&index);
                let boundaries = self.boundaries.clone();
                let cache = Arc::clone(&self.mask_cache);
                let (width, height) = (self.width, self.height);
                let variable = self.config.variable;
                let options = self.options;

                let image = tokio::task::spawn_blocking(move || -> OverlayResult<RasterImage> {
                    let mask = resolve_mask(boundaries.as_deref(), &cache, width, height)?;
                    renderer::composite_with_index(
                        &task_samples,
                        &task_index,
                        variable,
                        &mask,
                        &options,
                    )
                })
                .await
                .map_err(|e| OverlayError::RenderFailed(e.to_string()))??;

                self.dataset = Some(Dataset { samples, index });
                Ok((image, GeoRect::GLOBE))
            }
        }
    }

    /// Reserve the next request generation. Exposed for hosts that
    /// produce frames themselves and install via [`Self::install_frame`].
    pub fn next_generation(&self) -> u64 {
        self.generations.next()
    }

    /// Install a finished frame under the generation guard.
    ///
    /// A stale generation is dropped silently: its image is released,
    /// the newer layer stays displayed, and the call still succeeds
    /// (the discard is internal, not a failed visualization).
    pub fn install_frame(
        &mut self,
        image: RasterImage,
        rectangle: GeoRect,
        time_index: Option<u8>,
        generation: u64,
    ) -> OverlayResult<()> {
        let handle = ImageHandle::new(image, self.slot.registry());
        let mut layer = Layer::new(handle, rectangle, self.config.alpha());
        if let Some(hour) = time_index {
            layer = layer.with_time_index(hour);
        }
        match self.slot.install(layer, generation) {
            Ok(()) => Ok(()),
            Err(err) if err.is_silent() => {
                trace!(generation, "install superseded");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Update opacity of the displayed layer; no refetch, no churn.
    pub fn set_opacity(&mut self, opacity: u8) -> OverlayResult<()> {
        if opacity > 100 {
            return Err(OverlayError::InvalidConfig(format!(
                "opacity out of range: {}",
                opacity
            )));
        }
        self.config.opacity = opacity;
        self.slot.set_opacity(self.config.alpha());
        Ok(())
    }

    /// Tear down the displayed layer and forget the current dataset.
    pub fn clear(&mut self) {
        self.slot.clear();
        self.dataset = None;
        self.series = None;
    }

    /// The sample nearest a geographic pick point, with its id.
    ///
    /// Returns the full record; every variable is available for the
    /// host's readout, not just the one on display.
    pub fn pick(&self, lat: f64, lon: f64) -> Option<(usize, &Sample)> {
        let dataset = self.dataset.as_ref()?;
        let id = dataset.index.nearest(lat, lon);
        dataset.samples.get(id).map(|s| (id, s))
    }

    /// Push the active layer at the display host.
    pub fn present_to(&self, host: &mut dyn DisplayHost) {
        if let Some(layer) = self.slot.active() {
            if let Some(image) = layer.image() {
                host.present(image, layer.rectangle, layer.alpha());
            }
        }
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.slot.active()
    }

    /// Live-resource accounting for this slot.
    pub fn resource_registry(&self) -> Arc<layer_manager::ResourceRegistry> {
        self.slot.registry()
    }

    pub fn current_config(&self) -> &VisualizationConfig {
        &self.config
    }
}

/// Load and rasterize the land mask, falling back to all-land when
/// boundary data is unavailable: a missing coastline degrades the
/// picture, it must not block rendering.
fn resolve_mask(
    boundaries: Option<&dyn BoundarySource>,
    cache: &MaskCache,
    width: usize,
    height: usize,
) -> OverlayResult<Arc<LandMask>> {
    let source = match boundaries {
        Some(source) => source,
        None => return Ok(Arc::new(LandMask::all_land(width, height)?)),
    };

    if let Some(mask) = cache.get(width, height) {
        return Ok(mask);
    }

    match try_boundary_mask(source, cache, width, height) {
        Ok(mask) => Ok(mask),
        Err(err @ OverlayError::BoundaryDataUnavailable(_)) => {
            warn!(error = %err, "rendering all land");
            Ok(Arc::new(LandMask::all_land(width, height)?))
        }
        Err(err) => Err(err),
    }
}

fn try_boundary_mask(
    source: &dyn BoundarySource,
    cache: &MaskCache,
    width: usize,
    height: usize,
) -> OverlayResult<Arc<LandMask>> {
    let polygons = source.load()?;
    cache.get_or_rasterize(&polygons, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use climate_common::testdata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const W: usize = 128;
    const H: usize = 64;

    /// Source serving the deterministic test grid, counting fetches.
    struct GridSource {
        live_fetches: AtomicUsize,
        hour_fetches: AtomicUsize,
    }

    impl GridSource {
        fn new() -> Self {
            Self {
                live_fetches: AtomicUsize::new(0),
                hour_fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SampleSource for GridSource {
        async fn fetch_live(&self) -> OverlayResult<SourceResponse> {
            self.live_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(SourceResponse::Samples(testdata::global_grid(30)))
        }

        async fn fetch_hour(&self, _hour: u8) -> OverlayResult<SourceResponse> {
            self.hour_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(SourceResponse::Samples(testdata::global_grid(30)))
        }
    }

    /// Source that always fails.
    struct FailingSource;

    #[async_trait]
    impl SampleSource for FailingSource {
        async fn fetch_live(&self) -> OverlayResult<SourceResponse> {
            Err(OverlayError::Timeout)
        }

        async fn fetch_hour(&self, _hour: u8) -> OverlayResult<SourceResponse> {
            Err(OverlayError::Timeout)
        }
    }

    /// Boundary source that never loads.
    struct BrokenBoundaries;

    impl BoundarySource for BrokenBoundaries {
        fn load(&self) -> Result<Vec<landmask::BoundaryPolygon>, landmask::BoundaryError> {
            Err(landmask::BoundaryError::Io("connection refused".into()))
        }
    }

    fn visualizer(source: Arc<dyn SampleSource>) -> Visualizer {
        Visualizer::new(source, None, W, H).unwrap()
    }

    #[tokio::test]
    async fn visualize_installs_exactly_one_resource() {
        let mut vis = visualizer(Arc::new(GridSource::new()));
        let registry = vis.resource_registry();

        for _ in 0..4 {
            vis.visualize(VisualizationConfig::new(ClimateVariable::Temperature))
                .await
                .unwrap();
            assert_eq!(registry.alive(), 1);
        }
        assert_eq!(registry.released_total(), 3);
    }

    #[tokio::test]
    async fn out_of_order_completions_keep_the_newer_frame() {
        let mut vis = visualizer(Arc::new(GridSource::new()));
        let g1 = vis.next_generation();
        let g2 = vis.next_generation();

        let mut newer = RasterImage::new(W, H).unwrap();
        newer.put_pixel(0, 0, climate_common::Rgba::new(2, 0, 0, 255));
        let mut older = RasterImage::new(W, H).unwrap();
        older.put_pixel(0, 0, climate_common::Rgba::new(1, 0, 0, 255));

        // The newer request finishes first; the older arrives late and
        // must be dropped without disturbing the display.
        vis.install_frame(newer, GeoRect::GLOBE, None, g2).unwrap();
        vis.install_frame(older, GeoRect::GLOBE, None, g1).unwrap();

        let active = vis.active_layer().unwrap();
        assert_eq!(active.image().unwrap().pixel(0, 0).r, 2);
        assert_eq!(vis.resource_registry().alive(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_the_display_untouched() {
        let grid: Arc<dyn SampleSource> = Arc::new(GridSource::new());
        let mut vis = visualizer(Arc::clone(&grid));
        vis.visualize(VisualizationConfig::new(ClimateVariable::Humidity))
            .await
            .unwrap();

        vis.source = Arc::new(FailingSource);
        let err = vis
            .visualize(VisualizationConfig::new(ClimateVariable::Humidity))
            .await
            .unwrap_err();
        assert!(matches!(err, OverlayError::Timeout));

        // The previous layer is still displayed and alive.
        assert!(vis.active_layer().is_some());
        assert_eq!(vis.resource_registry().alive(), 1);
    }

    #[tokio::test]
    async fn scrubbing_realized_hours_does_not_refetch() {
        let source = Arc::new(GridSource::new());
        let mut vis = visualizer(Arc::clone(&source) as Arc<dyn SampleSource>);

        vis.advance_time(5).await.unwrap();
        assert_eq!(source.hour_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(vis.active_layer().unwrap().time_index, Some(5));

        // Same hour again: realized frame, immediate swap.
        vis.advance_time(5).await.unwrap();
        assert_eq!(source.hour_fetches.load(Ordering::SeqCst), 1);

        // A new hour materializes on demand.
        vis.advance_time(7).await.unwrap();
        assert_eq!(source.hour_fetches.load(Ordering::SeqCst), 2);
        assert_eq!(vis.active_layer().unwrap().time_index, Some(7));

        // Back to the first hour: still cached.
        vis.advance_time(5).await.unwrap();
        assert_eq!(source.hour_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn each_scrub_swaps_exactly_once() {
        let mut vis = visualizer(Arc::new(GridSource::new()));
        let registry = vis.resource_registry();

        vis.advance_time(0).await.unwrap();
        let baseline = registry.released_total();

        vis.advance_time(1).await.unwrap();
        assert_eq!(registry.released_total(), baseline + 1);
        vis.advance_time(0).await.unwrap();
        assert_eq!(registry.released_total(), baseline + 2);
        assert_eq!(registry.alive(), 1);
    }

    #[tokio::test]
    async fn switching_variables_rebuilds_the_series() {
        let source = Arc::new(GridSource::new());
        let mut vis = visualizer(Arc::clone(&source) as Arc<dyn SampleSource>);

        let mut config = VisualizationConfig::new(ClimateVariable::Temperature);
        config.hour = HourSelection::At(3);
        vis.visualize(config).await.unwrap();
        assert_eq!(source.hour_fetches.load(Ordering::SeqCst), 1);

        // Same variable, same hour: cached frame.
        vis.visualize(config).await.unwrap();
        assert_eq!(source.hour_fetches.load(Ordering::SeqCst), 1);

        // New variable invalidates the series.
        let mut config = VisualizationConfig::new(ClimateVariable::Sunlight);
        config.hour = HourSelection::At(3);
        vis.visualize(config).await.unwrap();
        assert_eq!(source.hour_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pre_rendered_rasters_install_directly() {
        struct RasterSource;

        #[async_trait]
        impl SampleSource for RasterSource {
            async fn fetch_live(&self) -> OverlayResult<SourceResponse> {
                let mut image = RasterImage::new(W, H).unwrap();
                image.put_pixel(1, 1, climate_common::Rgba::new(9, 9, 9, 255));
                Ok(SourceResponse::Raster {
                    image,
                    rectangle: GeoRect::GLOBE,
                })
            }

            async fn fetch_hour(&self, _hour: u8) -> OverlayResult<SourceResponse> {
                self.fetch_live().await
            }
        }

        let mut vis = visualizer(Arc::new(RasterSource));
        vis.visualize(VisualizationConfig::new(ClimateVariable::Temperature))
            .await
            .unwrap();

        let active = vis.active_layer().unwrap();
        assert_eq!(active.image().unwrap().pixel(1, 1).r, 9);
    }

    #[tokio::test]
    async fn mismatched_raster_dimensions_are_rejected() {
        struct WrongSizeSource;

        #[async_trait]
        impl SampleSource for WrongSizeSource {
            async fn fetch_live(&self) -> OverlayResult<SourceResponse> {
                Ok(SourceResponse::Raster {
                    image: RasterImage::new(10, 10).unwrap(),
                    rectangle: GeoRect::GLOBE,
                })
            }

            async fn fetch_hour(&self, _hour: u8) -> OverlayResult<SourceResponse> {
                self.fetch_live().await
            }
        }

        let mut vis = visualizer(Arc::new(WrongSizeSource));
        let err = vis
            .visualize(VisualizationConfig::new(ClimateVariable::Temperature))
            .await
            .unwrap_err();
        assert!(matches!(err, OverlayError::FetchFailed(_)));
        assert!(vis.active_layer().is_none());
    }

    #[tokio::test]
    async fn broken_boundaries_fall_back_to_all_land() {
        let mut vis = Visualizer::new(
            Arc::new(GridSource::new()),
            Some(Arc::new(BrokenBoundaries)),
            W,
            H,
        )
        .unwrap();

        vis.visualize(VisualizationConfig::new(ClimateVariable::Temperature))
            .await
            .unwrap();
        // Every pixel rendered: the grid covers the globe and the
        // fallback mask marks everything land.
        let image = vis.active_layer().unwrap().image().unwrap();
        assert!(image.pixels().chunks_exact(4).all(|p| p[3] != 0));
    }

    #[tokio::test]
    async fn pick_returns_the_nearest_full_record() {
        let source = Arc::new(GridSource::new());
        let mut vis = visualizer(source);
        vis.visualize(VisualizationConfig::new(ClimateVariable::Temperature))
            .await
            .unwrap();

        let (_, sample) = vis.pick(0.0, 0.0).unwrap();
        assert_eq!(sample.latitude, 0.0);
        assert_eq!(sample.longitude, 0.0);
        // The full record is available, not just the displayed variable.
        assert!(sample.values.humidity > 0.0);

        let (_, far_north) = vis.pick(89.0, 10.0).unwrap();
        assert_eq!(far_north.latitude, 90.0);
    }

    #[tokio::test]
    async fn clear_releases_everything() {
        let mut vis = visualizer(Arc::new(GridSource::new()));
        vis.visualize(VisualizationConfig::new(ClimateVariable::Temperature))
            .await
            .unwrap();
        let registry = vis.resource_registry();
        assert_eq!(registry.alive(), 1);

        vis.clear();
        assert!(vis.active_layer().is_none());
        assert!(vis.pick(0.0, 0.0).is_none());
        assert_eq!(registry.alive(), 0);
    }

    #[tokio::test]
    async fn opacity_updates_in_place() {
        let mut vis = visualizer(Arc::new(GridSource::new()));
        vis.visualize(VisualizationConfig::new(ClimateVariable::Temperature))
            .await
            .unwrap();
        let registry = vis.resource_registry();
        let released = registry.released_total();

        vis.set_opacity(25).unwrap();
        assert!((vis.active_layer().unwrap().alpha() - 0.25).abs() < 1e-6);
        assert_eq!(registry.released_total(), released);
        assert!(vis.set_opacity(120).is_err());
    }
}
