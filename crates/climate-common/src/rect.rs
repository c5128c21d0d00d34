//! Geographic rectangle and the shared lon/lat -> pixel projection.

use serde::{Deserialize, Serialize};

/// A geographic rectangle in degrees (EPSG:4326).
///
/// Every generated overlay spans the full globe, but the type keeps the
/// corners explicit so pre-rendered frames from the sample source can
/// declare their own extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRect {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoRect {
    /// Full-globe extent used by every locally composited layer.
    pub const GLOBE: GeoRect = GeoRect {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Width in degrees.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Check if a geographic point falls inside this rectangle.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }

    /// Project a geographic coordinate to pixel space.
    ///
    /// For the full globe this is `x = (lon+180)/360 * W`,
    /// `y = (90-lat)/180 * H`, the projection shared by the spatial
    /// index, the land mask, and the compositor. Pixel y grows downward.
    pub fn to_pixel(&self, lon: f64, lat: f64, width: usize, height: usize) -> (f64, f64) {
        let x = (lon - self.west) / self.width() * width as f64;
        let y = (self.north - lat) / self.height() * height as f64;
        (x, y)
    }

    /// Geographic coordinate of a pixel's center.
    pub fn pixel_center(&self, x: usize, y: usize, width: usize, height: usize) -> (f64, f64) {
        let lon = self.west + (x as f64 + 0.5) / width as f64 * self.width();
        let lat = self.north - (y as f64 + 0.5) / height as f64 * self.height();
        (lon, lat)
    }
}
