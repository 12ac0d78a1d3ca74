//! Shapefile plumbing around the matching kernels.
//!
//! Geometry and attributes come from the `shapefile` crate; this module only
//! converts them into the crate's models and writes results back.

mod clip;
mod pip;
mod read;
mod write;

pub use clip::clip_shp;
pub use pip::{pip_shps, pip_xy_shp, PipOptions};
pub use read::{field_text, read_column, read_points, read_polygons};
pub use write::{write_correspondences, write_points, DEFAULT_COLUMN};
