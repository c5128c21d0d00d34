//! GeoJSON boundary parsing.
//!
//! Accepts a FeatureCollection of Polygon and MultiPolygon features in
//! geographic coordinates, the shape served by the usual country-outline
//! datasets. Other geometry types are skipped.

use serde::Deserialize;
use tracing::warn;

use crate::source::BoundaryError;

#[derive(Debug, Deserialize)]
struct GeoJsonFeatureCollection {
    features: Vec<GeoJsonFeature>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeature {
    geometry: GeoJsonGeometry,
}

#[derive(Debug, Deserialize)]
struct GeoJsonGeometry {
    #[serde(rename = "type")]
    ty: String,
    coordinates: serde_json::Value,
}

/// A land polygon: one outer ring plus any interior holes, in
/// (longitude, latitude) degrees. Rings are stored open; the
/// duplicated GeoJSON closing vertex is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    pub outer: Vec<(f64, f64)>,
    pub holes: Vec<Vec<(f64, f64)>>,
}

/// Parse a GeoJSON FeatureCollection into boundary polygons.
pub fn parse_feature_collection(json: &str) -> Result<Vec<BoundaryPolygon>, BoundaryError> {
    let fc: GeoJsonFeatureCollection =
        serde_json::from_str(json).map_err(|e| BoundaryError::Parse(e.to_string()))?;

    let mut polygons = Vec::new();
    for feature in fc.features {
        match feature.geometry.ty.as_str() {
            "Polygon" => {
                if let Some(polygon) = parse_polygon(&feature.geometry.coordinates)? {
                    polygons.push(polygon);
                }
            }
            "MultiPolygon" => {
                let parts = feature
                    .geometry
                    .coordinates
                    .as_array()
                    .ok_or_else(|| BoundaryError::Parse("invalid MultiPolygon".into()))?;
                for part in parts {
                    if let Some(polygon) = parse_polygon(part)? {
                        polygons.push(polygon);
                    }
                }
            }
            other => {
                warn!(geometry = other, "skipping unsupported boundary geometry");
            }
        }
    }

    if polygons.is_empty() {
        return Err(BoundaryError::Parse(
            "no usable polygons in boundary data".into(),
        ));
    }
    Ok(polygons)
}

/// Parse one Polygon coordinate array: `[outer_ring, hole_ring, ...]`.
/// Returns `None` for degenerate rings with fewer than three vertices.
fn parse_polygon(coordinates: &serde_json::Value) -> Result<Option<BoundaryPolygon>, BoundaryError> {
    let rings = coordinates
        .as_array()
        .ok_or_else(|| BoundaryError::Parse("invalid Polygon coordinates".into()))?;
    if rings.is_empty() {
        return Ok(None);
    }

    let mut parsed: Vec<Vec<(f64, f64)>> = Vec::with_capacity(rings.len());
    for ring in rings {
        let points = ring
            .as_array()
            .ok_or_else(|| BoundaryError::Parse("invalid Polygon ring".into()))?;
        let mut verts: Vec<(f64, f64)> = Vec::with_capacity(points.len());
        for point in points {
            let pair = point
                .as_array()
                .ok_or_else(|| BoundaryError::Parse("invalid coordinate pair".into()))?;
            if pair.len() < 2 {
                return Err(BoundaryError::Parse("invalid coordinate pair".into()));
            }
            let lon = pair[0].as_f64().unwrap_or(0.0);
            let lat = pair[1].as_f64().unwrap_or(0.0);
            verts.push((lon, lat));
        }
        // Drop the duplicated closing vertex if present.
        if verts.len() >= 2 {
            let first = verts[0];
            let last = verts[verts.len() - 1];
            if (first.0 - last.0).abs() < 1e-9 && (first.1 - last.1).abs() < 1e-9 {
                verts.pop();
            }
        }
        parsed.push(verts);
    }

    if parsed[0].len() < 3 {
        return Ok(None);
    }
    let outer = parsed.remove(0);
    let holes = parsed.into_iter().filter(|r| r.len() >= 3).collect();
    Ok(Some(BoundaryPolygon { outer, holes }))
}
