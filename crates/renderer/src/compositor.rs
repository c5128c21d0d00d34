//! Sparse-to-dense raster compositing.
//!
//! For every land pixel the compositor asks the spatial index which
//! sample owns the pixel, normalizes that sample's value and maps it
//! through the variable's color ramp. Water pixels stay fully
//! transparent. An optional blur pass smooths the Voronoi cell edges;
//! the mask is re-applied afterwards so blurred color never bleeds into
//! water.

use image::{imageops, ImageBuffer, Rgba as ImageRgba};
use rayon::prelude::*;
use tracing::debug;

use climate_common::{
    ClimateVariable, GeoRect, NormalizationRange, OverlayError, OverlayResult, RasterImage, Rgba,
    SampleSet,
};
use landmask::LandMask;
use spatial_index::SampleIndex;

/// Marker discs grow from this radius at t=0...
const MARKER_BASE_RADIUS: f32 = 5.0;
/// ...by up to this much at t=1...
const MARKER_RADIUS_GROWTH: f32 = 10.0;
/// ...but never past this, to limit overdraw.
const MARKER_MAX_RADIUS: f32 = 15.0;

/// How the normalization range is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeSelection {
    /// The variable's fixed range (temperature -40..50 and so on).
    Fixed,
    /// Min/max observed over the current sample set.
    Observed,
    /// An explicit caller-supplied range.
    Explicit(NormalizationRange),
}

/// Compositing options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeOptions {
    pub range: RangeSelection,
    /// Gaussian blur sigma in pixels; `None` disables the pass.
    pub blur_sigma: Option<f32>,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            range: RangeSelection::Fixed,
            blur_sigma: None,
        }
    }
}

fn resolve_range(
    samples: &SampleSet,
    variable: ClimateVariable,
    selection: RangeSelection,
) -> NormalizationRange {
    match selection {
        RangeSelection::Fixed => variable.fixed_range(),
        RangeSelection::Observed => NormalizationRange::from_samples(samples, variable),
        RangeSelection::Explicit(range) => range,
    }
}

/// Composite a full-frame overlay raster, building a fresh index.
///
/// Callers that keep a [`SampleIndex`] for interactive picking should
/// use [`composite_with_index`] instead; the index for a sample set is
/// meant to be built once and shared.
pub fn composite(
    samples: &SampleSet,
    variable: ClimateVariable,
    mask: &LandMask,
    options: &CompositeOptions,
) -> OverlayResult<RasterImage> {
    let index = SampleIndex::build(samples, mask.width(), mask.height())?;
    composite_with_index(samples, &index, variable, mask, options)
}

/// Composite a full-frame overlay raster using a prebuilt index.
///
/// The mask dimensions define the output dimensions; the index must
/// have been built at the same resolution. Rows are filled in parallel.
pub fn composite_with_index(
    samples: &SampleSet,
    index: &SampleIndex,
    variable: ClimateVariable,
    mask: &LandMask,
    options: &CompositeOptions,
) -> OverlayResult<RasterImage> {
    let (width, height) = (mask.width(), mask.height());
    if samples.is_empty() {
        return Err(OverlayError::InsufficientData);
    }
    if width == 0 || height == 0 {
        return Err(OverlayError::InvalidDimensions { width, height });
    }

    let range = resolve_range(samples, variable, options.range);
    let ramp = crate::ramp::ramp_for(variable);

    // One color per sample: the ramp result only depends on the sample's
    // value, so per-pixel work reduces to an index query and a copy.
    let colors: Vec<Rgba> = samples
        .iter()
        .map(|s| ramp.color_at(range.normalize(variable.value_of(&s.values))))
        .collect();

    debug!(%variable, width, height, samples = samples.len(), "compositing overlay");

    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row = vec![0u8; width * 4];
            for x in 0..width {
                if !mask.is_land(x, y) {
                    continue;
                }
                let id = index.locate(x as f64 + 0.5, y as f64 + 0.5);
                let color = colors[id];
                let idx = x * 4;
                row[idx] = color.r;
                row[idx + 1] = color.g;
                row[idx + 2] = color.b;
                row[idx + 3] = color.a;
            }
            row
        })
        .collect();

    let mut pixels = Vec::with_capacity(width * height * 4);
    for row in rows {
        pixels.extend_from_slice(&row);
    }

    let mut image = RasterImage::from_pixels(width, height, pixels)?;
    if let Some(sigma) = options.blur_sigma {
        image = blur_masked(image, mask, sigma)?;
    }
    Ok(image)
}

/// Gaussian-blur the raster, then force water pixels back to
/// transparent so no color leaks across the coastline.
fn blur_masked(image: RasterImage, mask: &LandMask, sigma: f32) -> OverlayResult<RasterImage> {
    if sigma <= 0.0 {
        return Ok(image);
    }
    let (width, height) = (image.width(), image.height());
    let buffer: ImageBuffer<ImageRgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width as u32, height as u32, image.into_pixels())
            .ok_or_else(|| OverlayError::RenderFailed("pixel buffer size mismatch".into()))?;

    let blurred = imageops::blur(&buffer, sigma);
    let mut image = RasterImage::from_pixels(width, height, blurred.into_raw())?;

    for y in 0..height {
        for x in 0..width {
            if !mask.is_land(x, y) {
                image.put_pixel(x, y, Rgba::transparent());
            }
        }
    }
    Ok(image)
}

/// Render value-scaled point markers instead of a filled raster.
///
/// Each sample becomes a disc at its projected position; radius and
/// alpha grow monotonically with the normalized value, radius clamped
/// so dense clusters don't wash out the globe.
pub fn composite_markers(
    samples: &SampleSet,
    variable: ClimateVariable,
    width: usize,
    height: usize,
    options: &CompositeOptions,
) -> OverlayResult<RasterImage> {
    let mut image = RasterImage::new(width, height)?;
    if samples.is_empty() {
        return Err(OverlayError::InsufficientData);
    }

    let range = resolve_range(samples, variable, options.range);
    let ramp = crate::ramp::ramp_for(variable);
    let rect = GeoRect::GLOBE;

    for sample in samples.iter() {
        let t = range.normalize(variable.value_of(&sample.values));
        let radius = (MARKER_BASE_RADIUS + MARKER_RADIUS_GROWTH * t).min(MARKER_MAX_RADIUS);
        let alpha = 0.5 + 0.5 * t;
        let base = ramp.color_at(t);
        let color = Rgba::new(base.r, base.g, base.b, (alpha * 255.0).round() as u8);

        let (cx, cy) = rect.to_pixel(sample.longitude, sample.latitude, width, height);
        draw_disc(&mut image, cx, cy, radius, color);
    }

    Ok(image)
}

fn draw_disc(image: &mut RasterImage, cx: f64, cy: f64, radius: f32, color: Rgba) {
    let r = radius as f64;
    let x_min = ((cx - r).floor().max(0.0)) as usize;
    let y_min = ((cy - r).floor().max(0.0)) as usize;
    let x_max = ((cx + r).ceil().min(image.width() as f64)) as usize;
    let y_max = ((cy + r).ceil().min(image.height() as f64)) as usize;

    for y in y_min..y_max {
        for x in x_min..x_max {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                image.put_pixel(x, y, color);
            }
        }
    }
}
