//! Point-in-Polygon (PIP) assignment.
//!
//! Polygons are pre-filtered by bounding box (R-tree or flat table) and the
//! surviving candidates get an exact containment test, first match wins.

mod index;
mod matcher;

pub use index::{BboxTable, IndexBackend, Locator, SpatialIndex};
pub use matcher::{CandidateOrder, PointMatcher};
