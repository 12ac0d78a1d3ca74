//! Geotools - geographic data utilities
//!
//! Point-in-polygon assignment with bounding-box pruning, pairwise distances
//! with nearest-K truncation, shapefile clipping and lon/lat reprojection.

pub mod config;
pub mod distance;
pub mod error;
pub mod models;
pub mod parallel;
pub mod pip;
pub mod reproject;
pub mod shp;
pub mod table;

pub use error::{GeoError, Result};
pub use models::{BoundingBox, Correspondence, Point, PolygonRecord};
pub use parallel::{CancellationToken, Parallelism};
