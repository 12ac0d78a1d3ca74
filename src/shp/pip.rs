//! Shapefile-level point-in-polygon drivers.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::read::{read_column, read_points, read_polygons};
use super::write::{write_correspondences, write_points, DEFAULT_COLUMN};
use crate::error::Result;
use crate::models::{render, LabelLookup, Point, Sentinels};
use crate::parallel::{CancellationToken, Parallelism};
use crate::pip::{CandidateOrder, IndexBackend, PointMatcher};

/// Settings for a point-in-polygon run over a polygon shapefile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipOptions {
    pub backend: IndexBackend,
    pub order: CandidateOrder,
    pub parallelism: Parallelism,
    /// Polygon DBF column used to label matches instead of the polygon ID
    pub poly_id_col: Option<String>,
    pub sentinels: Sentinels,
    /// Where to write the points with correspondences appended
    pub out_shp: Option<PathBuf>,
}

impl PipOptions {
    /// Linear bounding-box scan on the calling thread.
    pub fn sequential() -> Self {
        Self {
            backend: IndexBackend::BboxTable,
            parallelism: Parallelism::Sequential,
            ..Default::default()
        }
    }

    /// R-tree lookup fanned out over every core.
    pub fn multicore() -> Self {
        Self {
            backend: IndexBackend::RTree,
            parallelism: Parallelism::all_cores(),
            ..Default::default()
        }
    }

    fn column_name(&self) -> &str {
        self.poly_id_col.as_deref().unwrap_or(DEFAULT_COLUMN)
    }
}

/// Assign every point of `pt_shp` to the polygon of `poly_shp` containing it.
///
/// Returns one rendered correspondence per point, in file order.
pub fn pip_shps(
    pt_shp: &Path,
    poly_shp: &Path,
    options: &PipOptions,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<String>> {
    let points = read_points(pt_shp)?;
    let values = pip_points(&points, poly_shp, options, cancel)?;

    if let Some(out_shp) = &options.out_shp {
        write_correspondences(pt_shp, out_shp, options.column_name(), &values)?;
    }

    Ok(values)
}

/// Same as [`pip_shps`] for in-memory coordinates.
///
/// When an output path is set, a new point shapefile is written holding the
/// coordinates and the correspondence column.
pub fn pip_xy_shp(
    xy: &[Point],
    poly_shp: &Path,
    options: &PipOptions,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<String>> {
    let values = pip_points(xy, poly_shp, options, cancel)?;

    if let Some(out_shp) = &options.out_shp {
        write_points(out_shp, xy, options.column_name(), &values)?;
    }

    Ok(values)
}

fn pip_points(
    points: &[Point],
    poly_shp: &Path,
    options: &PipOptions,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<String>> {
    let start = Instant::now();
    let polygons = read_polygons(poly_shp)?;
    let labels = options
        .poly_id_col
        .as_deref()
        .map(|col| read_column(poly_shp, col).map(LabelLookup::new))
        .transpose()?;
    let locator = options.backend.build(&polygons)?;
    info!(
        "{:.3} secs to build {:?} index",
        start.elapsed().as_secs_f64(),
        options.backend
    );

    let correspondences = PointMatcher::new(locator.as_ref(), &polygons)
        .with_order(options.order)
        .match_all(points, options.parallelism, cancel)?;

    let convert = Instant::now();
    let values = render(&correspondences, labels.as_ref(), &options.sentinels);
    info!(
        "{:.3} secs to convert correspondences",
        convert.elapsed().as_secs_f64()
    );

    Ok(values)
}
