//! Polygon records and their bounding boxes.

use geo::{BoundingRect, Contains, CoordsIter, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use super::Point;
use crate::error::{GeoError, Result};

/// Axis-aligned bounding box, named after the edges it describes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Strict containment: points lying on an edge are outside.
    pub fn contains_strict(&self, x: f64, y: f64) -> bool {
        self.left < x && x < self.right && self.bottom < y && y < self.top
    }

    pub fn min_corner(&self) -> [f64; 2] {
        [self.left, self.bottom]
    }

    pub fn max_corner(&self) -> [f64; 2] {
        [self.right, self.top]
    }
}

impl From<geo::Rect<f64>> for BoundingBox {
    fn from(rect: geo::Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// A loaded polygon with its 0-based ID and cached bounding box.
///
/// IDs are positions in the loaded sequence: the first record of a shapefile
/// is polygon 0.
#[derive(Debug, Clone)]
pub struct PolygonRecord {
    pub id: usize,
    pub geometry: MultiPolygon<f64>,
    pub bbox: BoundingBox,
}

impl PolygonRecord {
    /// Validate the geometry and compute its bounding box.
    pub fn new(id: usize, geometry: MultiPolygon<f64>) -> Result<Self> {
        check_vertices(id, &geometry)?;

        let bbox = geometry
            .bounding_rect()
            .map(BoundingBox::from)
            .ok_or_else(|| GeoError::InvalidGeometry {
                id,
                reason: "polygon has no bounding box".to_string(),
            })?;

        Ok(Self { id, geometry, bbox })
    }

    /// Re-check a record that may have been assembled by hand.
    pub fn validate(&self) -> Result<()> {
        check_vertices(self.id, &self.geometry)?;
        let b = &self.bbox;
        if !(b.left <= b.right && b.bottom <= b.top) {
            return Err(GeoError::InvalidGeometry {
                id: self.id,
                reason: format!("inverted or non-finite bounding box {b:?}"),
            });
        }
        Ok(())
    }

    pub fn from_polygon(id: usize, polygon: Polygon<f64>) -> Result<Self> {
        Self::new(id, MultiPolygon::new(vec![polygon]))
    }

    /// Exact point-in-polygon test. Points on the boundary are not contained.
    pub fn contains(&self, point: &Point) -> bool {
        self.geometry.contains(&geo::Point::new(point.x, point.y))
    }
}

fn check_vertices(id: usize, geometry: &MultiPolygon<f64>) -> Result<()> {
    if geometry.coords_count() == 0 {
        return Err(GeoError::InvalidGeometry {
            id,
            reason: "polygon has no vertices".to_string(),
        });
    }

    if geometry
        .coords_iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(GeoError::InvalidGeometry {
            id,
            reason: "polygon has non-finite coordinates".to_string(),
        });
    }

    Ok(())
}

/// Load an ordered sequence of geometries as polygon records with 0-based IDs.
pub fn records_from_geometries<I>(geometries: I) -> Result<Vec<PolygonRecord>>
where
    I: IntoIterator<Item = MultiPolygon<f64>>,
{
    geometries
        .into_iter()
        .enumerate()
        .map(|(id, geometry)| PolygonRecord::new(id, geometry))
        .collect()
}
