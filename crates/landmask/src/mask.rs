//! Scanline rasterization of land polygons into a binary mask.

use rayon::prelude::*;

use climate_common::{GeoRect, OverlayError, OverlayResult};

use crate::geojson::BoundaryPolygon;

/// A width x height land/water bit set. Bit set = land (renderable),
/// clear = water (suppressed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandMask {
    width: usize,
    height: usize,
    bits: Vec<u8>,
}

/// One polygon edge in pixel coordinates.
#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl LandMask {
    /// Rasterize land polygons with even-odd scanline fill.
    ///
    /// Ring points are projected once through the shared globe
    /// projection; each pixel row is then filled from the sorted edge
    /// crossings at the row's center. Holes fall out of the even-odd
    /// rule without special casing. The result is deterministic:
    /// rasterizing the same polygons at the same resolution twice yields
    /// bit-identical masks.
    pub fn rasterize(
        polygons: &[BoundaryPolygon],
        width: usize,
        height: usize,
    ) -> OverlayResult<Self> {
        if width == 0 || height == 0 {
            return Err(OverlayError::InvalidDimensions { width, height });
        }

        let edges = collect_edges(polygons, width, height);

        let rows: Vec<Vec<u8>> = (0..height)
            .into_par_iter()
            .map(|y| fill_row(y, width, &edges))
            .collect();

        let row_bytes = width.div_ceil(8);
        let mut bits = Vec::with_capacity(row_bytes * height);
        for row in rows {
            bits.extend_from_slice(&row);
        }

        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// A mask with every pixel marked land. Fallback for when boundary
    /// data is unavailable: render everything rather than nothing.
    pub fn all_land(width: usize, height: usize) -> OverlayResult<Self> {
        if width == 0 || height == 0 {
            return Err(OverlayError::InvalidDimensions { width, height });
        }
        let row_bytes = width.div_ceil(8);
        Ok(Self {
            width,
            height,
            bits: vec![0xFF; row_bytes * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_land(&self, x: usize, y: usize) -> bool {
        debug_assert!(x < self.width && y < self.height);
        let row_bytes = self.width.div_ceil(8);
        let byte = self.bits[y * row_bytes + x / 8];
        byte & (1 << (x % 8)) != 0
    }

    /// Fraction of pixels marked land, for logging and sanity checks.
    pub fn land_fraction(&self) -> f64 {
        let mut count = 0usize;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_land(x, y) {
                    count += 1;
                }
            }
        }
        count as f64 / (self.width * self.height) as f64
    }
}

/// Project all rings into pixel space and flatten them into edges.
fn collect_edges(polygons: &[BoundaryPolygon], width: usize, height: usize) -> Vec<Edge> {
    let rect = GeoRect::GLOBE;
    let mut edges = Vec::new();
    let mut push_ring = |ring: &[(f64, f64)]| {
        if ring.len() < 3 {
            return;
        }
        let projected: Vec<(f64, f64)> = ring
            .iter()
            .map(|&(lon, lat)| rect.to_pixel(lon, lat, width, height))
            .collect();
        for i in 0..projected.len() {
            let (x0, y0) = projected[i];
            let (x1, y1) = projected[(i + 1) % projected.len()];
            // Horizontal edges never cross a scanline center.
            if y0 != y1 {
                edges.push(Edge { x0, y0, x1, y1 });
            }
        }
    };

    for polygon in polygons {
        push_ring(&polygon.outer);
        for hole in &polygon.holes {
            push_ring(hole);
        }
    }
    edges
}

/// Fill one pixel row from the even-odd crossings at its center line.
fn fill_row(y: usize, width: usize, edges: &[Edge]) -> Vec<u8> {
    let yc = y as f64 + 0.5;
    let mut crossings: Vec<f64> = edges
        .iter()
        .filter(|e| (e.y0 > yc) != (e.y1 > yc))
        .map(|e| e.x0 + (yc - e.y0) * (e.x1 - e.x0) / (e.y1 - e.y0))
        .collect();
    crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let row_bytes = width.div_ceil(8);
    let mut row = vec![0u8; row_bytes];
    for span in crossings.chunks_exact(2) {
        // Pixels whose centers fall inside [span0, span1).
        let start = (span[0] - 0.5).ceil().max(0.0) as usize;
        let end = ((span[1] - 0.5).ceil().max(0.0) as usize).min(width);
        for x in start..end {
            row[x / 8] |= 1 << (x % 8);
        }
    }
    row
}
