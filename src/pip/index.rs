//! Bounding-box indexes for candidate lookup.

use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use crate::error::Result;
use crate::models::{BoundingBox, PolygonRecord};

/// Candidate lookup by bounding box.
///
/// Implementations return the position, in the slice the index was built
/// from, of every polygon whose bounding box strictly contains the point
/// (`left < x < right`, `bottom < y < top`). The result is a superset of the
/// polygons that actually contain the point; callers must still run the exact
/// test. No ordering is guaranteed.
pub trait Locator: Send + Sync {
    fn candidates(&self, x: f64, y: f64) -> Vec<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which index to build for a polygon set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    #[default]
    RTree,
    BboxTable,
}

impl IndexBackend {
    pub fn build(self, polygons: &[PolygonRecord]) -> Result<Box<dyn Locator>> {
        Ok(match self {
            IndexBackend::RTree => Box::new(SpatialIndex::build(polygons)?),
            IndexBackend::BboxTable => Box::new(BboxTable::build(polygons)?),
        })
    }
}

/// Wrapper for R-tree indexing of polygon bounding boxes
#[derive(Debug, Clone)]
struct IndexedBox {
    pos: usize,
    bbox: BoundingBox,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min_corner(), self.bbox.max_corner())
    }
}

/// R-tree over polygon bounding boxes.
pub struct SpatialIndex {
    tree: RTree<IndexedBox>,
}

impl SpatialIndex {
    /// Build the index. Fails on the first degenerate polygon; no partial
    /// index is returned.
    pub fn build(polygons: &[PolygonRecord]) -> Result<Self> {
        info!("Building R-tree for {} polygons...", polygons.len());

        let boxes = polygons
            .iter()
            .enumerate()
            .map(|(pos, p)| {
                p.validate()?;
                Ok(IndexedBox { pos, bbox: p.bbox })
            })
            .collect::<Result<Vec<_>>>()?;

        let tree = RTree::bulk_load(boxes);
        info!("R-tree built with {} entries", tree.size());

        Ok(Self { tree })
    }
}

impl Locator for SpatialIndex {
    fn candidates(&self, x: f64, y: f64) -> Vec<usize> {
        let query_envelope = AABB::from_point([x, y]);

        // Envelope intersection is closed; tighten to the strict edge rule
        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ib| ib.bbox.contains_strict(x, y))
            .map(|ib| ib.pos)
            .collect()
    }

    fn len(&self) -> usize {
        self.tree.size()
    }
}

/// Flat table of bounding boxes, scanned linearly per query.
pub struct BboxTable {
    boxes: Vec<BoundingBox>,
}

impl BboxTable {
    pub fn build(polygons: &[PolygonRecord]) -> Result<Self> {
        info!("Building bounding-box table for {} polygons...", polygons.len());
        let boxes = polygons
            .iter()
            .map(|p| {
                p.validate()?;
                Ok(p.bbox)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { boxes })
    }
}

impl Locator for BboxTable {
    fn candidates(&self, x: f64, y: f64) -> Vec<usize> {
        self.boxes
            .iter()
            .enumerate()
            .filter(|(_, bbox)| bbox.contains_strict(x, y))
            .map(|(pos, _)| pos)
            .collect()
    }

    fn len(&self) -> usize {
        self.boxes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(id: usize, x0: f64, y0: f64, side: f64) -> PolygonRecord {
        PolygonRecord::from_polygon(
            id,
            polygon![
                (x: x0, y: y0),
                (x: x0 + side, y: y0),
                (x: x0 + side, y: y0 + side),
                (x: x0, y: y0 + side),
                (x: x0, y: y0),
            ],
        )
        .unwrap()
    }

    fn sorted(mut ids: Vec<usize>) -> Vec<usize> {
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::build(&[]).unwrap();
        assert!(index.is_empty());
        assert!(index.candidates(0.5, 0.5).is_empty());
    }

    #[test]
    fn test_candidates_include_overlapping_boxes() {
        let polys = vec![square(0, 0.0, 0.0, 2.0), square(1, 1.0, 1.0, 2.0)];
        let index = SpatialIndex::build(&polys).unwrap();
        assert_eq!(sorted(index.candidates(1.5, 1.5)), vec![0, 1]);
        assert_eq!(index.candidates(0.5, 0.5), vec![0]);
        assert!(index.candidates(5.0, 5.0).is_empty());
    }

    #[test]
    fn test_edge_points_are_not_candidates() {
        let polys = vec![square(0, 0.0, 0.0, 1.0), square(1, 1.0, 0.0, 1.0)];
        for backend in [IndexBackend::RTree, IndexBackend::BboxTable] {
            let index = backend.build(&polys).unwrap();
            // Shared edge between the two boxes
            assert!(index.candidates(1.0, 0.5).is_empty());
            // Outer corner
            assert!(index.candidates(0.0, 0.0).is_empty());
        }
    }

    #[test]
    fn test_degenerate_polygon_fails_build() {
        let mut bad = square(1, 0.0, 0.0, 1.0);
        bad.geometry = geo::MultiPolygon::new(vec![]);
        let polys = vec![square(0, 0.0, 0.0, 1.0), bad];
        for backend in [IndexBackend::RTree, IndexBackend::BboxTable] {
            let err = backend.build(&polys).err().unwrap();
            assert!(matches!(
                err,
                crate::error::GeoError::InvalidGeometry { id: 1, .. }
            ));
        }
    }

    #[test]
    fn test_candidates_are_slice_positions() {
        let polys = vec![square(40, 0.0, 0.0, 1.0), square(7, 2.0, 0.0, 1.0)];
        for backend in [IndexBackend::RTree, IndexBackend::BboxTable] {
            let index = backend.build(&polys).unwrap();
            assert_eq!(index.candidates(2.5, 0.5), vec![1]);
            assert_eq!(index.candidates(0.5, 0.5), vec![0]);
        }
    }

    #[test]
    fn test_backends_agree() {
        let polys: Vec<PolygonRecord> = (0..25)
            .map(|i| square(i, (i % 5) as f64 * 0.8, (i / 5) as f64 * 0.8, 1.0))
            .collect();
        let rtree = SpatialIndex::build(&polys).unwrap();
        let table = BboxTable::build(&polys).unwrap();

        for step_x in 0..40 {
            for step_y in 0..40 {
                let (x, y) = (step_x as f64 * 0.125, step_y as f64 * 0.125);
                assert_eq!(
                    sorted(rtree.candidates(x, y)),
                    sorted(table.candidates(x, y)),
                    "mismatch at ({x}, {y})"
                );
            }
        }
        assert_eq!(rtree.len(), table.len());
    }
}
