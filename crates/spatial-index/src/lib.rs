//! Planar nearest-neighbor index over samples projected to pixel space.
//!
//! Built once per sample set and immutable afterwards. `locate` answers
//! the rasterizer's "which sample owns this pixel" query (the owning
//! sample is the nearest one under Euclidean distance in pixel space,
//! i.e. the Voronoi cell owner); `nearest` answers interactive picks in
//! geographic coordinates through the same projection.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;

use climate_common::{GeoRect, OverlayError, OverlayResult, SampleSet};

/// A sample's projected pixel position plus its index in the set.
#[derive(Debug, Clone, PartialEq)]
struct ProjectedSample {
    x: f64,
    y: f64,
    id: usize,
}

impl RTreeObject for ProjectedSample {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for ProjectedSample {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Nearest-sample index for one sample set at one raster resolution.
#[derive(Debug)]
pub struct SampleIndex {
    tree: RTree<ProjectedSample>,
    rect: GeoRect,
    width: usize,
    height: usize,
}

impl SampleIndex {
    /// Project every sample into pixel space and bulk-load the R-tree.
    ///
    /// The sample set guarantees at least one sample; dimensions must be
    /// positive because they define the projection.
    pub fn build(samples: &SampleSet, width: usize, height: usize) -> OverlayResult<Self> {
        if width == 0 || height == 0 {
            return Err(OverlayError::InvalidDimensions { width, height });
        }
        if samples.is_empty() {
            return Err(OverlayError::InsufficientData);
        }

        let rect = GeoRect::GLOBE;
        let points: Vec<ProjectedSample> = samples
            .iter()
            .enumerate()
            .map(|(id, s)| {
                let (x, y) = rect.to_pixel(s.longitude, s.latitude, width, height);
                ProjectedSample { x, y, id }
            })
            .collect();

        debug!(samples = points.len(), width, height, "building sample index");

        Ok(Self {
            tree: RTree::bulk_load(points),
            rect,
            width,
            height,
        })
    }

    /// The sample owning a pixel: nearest under Euclidean pixel distance.
    pub fn locate(&self, px: f64, py: f64) -> usize {
        self.nearest_projected(px, py)
    }

    /// The sample nearest a geographic pick point.
    pub fn nearest(&self, lat: f64, lon: f64) -> usize {
        let (x, y) = self.rect.to_pixel(lon, lat, self.width, self.height);
        self.nearest_projected(x, y)
    }

    /// Nearest sample id with a deterministic tie-break: among
    /// equidistant candidates the lowest index wins, so coincident
    /// duplicate samples resolve the same way on every query.
    fn nearest_projected(&self, x: f64, y: f64) -> usize {
        let mut best_id = 0usize;
        let mut best_d = f64::INFINITY;
        for (point, d) in self.tree.nearest_neighbor_iter_with_distance_2(&[x, y]) {
            if d > best_d {
                break;
            }
            if d < best_d {
                best_d = d;
                best_id = point.id;
            } else {
                best_id = best_id.min(point.id);
            }
        }
        best_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::testdata;
    use climate_common::{Sample, SampleSet, SampleValues};

    const W: usize = 360;
    const H: usize = 180;

    #[test]
    fn zero_dimensions_are_rejected() {
        let set = testdata::three_point_temperature();
        assert!(matches!(
            SampleIndex::build(&set, 0, H),
            Err(OverlayError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn single_sample_owns_everything() {
        let set = SampleSet::new(vec![testdata::sample_at(45.0, -120.0)]).unwrap();
        let index = SampleIndex::build(&set, W, H).unwrap();
        assert_eq!(index.locate(0.0, 0.0), 0);
        assert_eq!(index.locate(359.0, 179.0), 0);
        assert_eq!(index.nearest(-80.0, 170.0), 0);
    }

    #[test]
    fn locate_returns_the_nearest_sample() {
        // Samples at lon 0, 90, -90 on the equator project to pixel
        // x = 180, 270, 90 (y = 90 for all three).
        let set = testdata::three_point_temperature();
        let index = SampleIndex::build(&set, W, H).unwrap();

        assert_eq!(index.locate(180.0, 90.0), 0);
        assert_eq!(index.locate(265.0, 95.0), 1);
        assert_eq!(index.locate(92.0, 88.0), 2);
        // Far north pixels still resolve to the closest column.
        assert_eq!(index.locate(180.0, 0.0), 0);
    }

    #[test]
    fn nearest_uses_the_same_projection_as_locate() {
        let set = testdata::three_point_temperature();
        let index = SampleIndex::build(&set, W, H).unwrap();

        assert_eq!(index.nearest(0.0, 1.0), 0);
        assert_eq!(index.nearest(5.0, 88.0), 1);
        assert_eq!(index.nearest(-5.0, -93.0), 2);
    }

    #[test]
    fn coincident_duplicates_break_ties_to_lowest_index() {
        let dup = |_: usize| Sample {
            latitude: 10.0,
            longitude: 10.0,
            values: SampleValues::default(),
        };
        let set = SampleSet::new(vec![dup(0), dup(1), dup(2)]).unwrap();
        let index = SampleIndex::build(&set, W, H).unwrap();

        assert_eq!(index.nearest(10.0, 10.0), 0);
        assert_eq!(index.nearest(10.2, 10.2), 0);
    }

    #[test]
    fn midpoint_between_two_samples_prefers_lower_index() {
        let set = SampleSet::new(vec![
            testdata::sample_at(0.0, -10.0),
            testdata::sample_at(0.0, 10.0),
        ])
        .unwrap();
        let index = SampleIndex::build(&set, W, H).unwrap();
        // Pixel exactly between the two projected points.
        assert_eq!(index.locate(180.0, 90.0), 0);
    }
}
