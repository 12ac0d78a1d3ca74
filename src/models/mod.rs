//! Core data models shared by the matching and distance kernels.

pub mod correspondence;
pub mod point;
pub mod polygon;

pub use correspondence::{render, Correspondence, LabelLookup, Sentinels};
pub use point::Point;
pub use polygon::{records_from_geometries, BoundingBox, PolygonRecord};
