//! Writing point layers back out with correspondences appended.

use std::fs;
use std::path::Path;
use std::time::Instant;

use shapefile::dbase::{self, FieldName, FieldValue, TableWriterBuilder};
use tracing::{info, warn};

use crate::error::{GeoError, Result};
use crate::models::Point;

/// Column name used when no polygon label column was requested.
pub const DEFAULT_COLUMN: &str = "in_poly";

/// Width bounds of the appended character column.
const MIN_COLUMN_WIDTH: usize = 14;
const MAX_COLUMN_WIDTH: usize = 254;

/// Copy `pt_shp` to `out_shp`, appending `values` as a character column.
///
/// `values[i]` lands on record `i`; the two must have the same length. The
/// `.prj` sidecar is copied when present.
pub fn write_correspondences(
    pt_shp: &Path,
    out_shp: &Path,
    column: &str,
    values: &[String],
) -> Result<()> {
    let start = Instant::now();

    let points = shapefile::read_shapes_as::<_, shapefile::Point>(pt_shp)?;
    let records = dbase::read(pt_shp.with_extension("dbf"))?;
    if records.len() != points.len() {
        return Err(GeoError::LengthMismatch {
            what: "DBF records per point shape",
            expected: points.len(),
            found: records.len(),
        });
    }
    if values.len() != points.len() {
        return Err(GeoError::LengthMismatch {
            what: "correspondence values per point",
            expected: points.len(),
            found: values.len(),
        });
    }

    let dbf = dbase::Reader::from_path(pt_shp.with_extension("dbf"))?;
    if dbf
        .fields()
        .iter()
        .any(|f| f.name().eq_ignore_ascii_case(column))
    {
        return Err(GeoError::FieldName {
            name: column.to_string(),
            reason: format!("already a column of {}", pt_shp.display()),
        });
    }

    let width = column_width(values);
    let builder =
        TableWriterBuilder::from_reader(dbf).add_character_field(field_name(column)?, width);

    let mut writer = shapefile::Writer::from_path(out_shp, builder)?;
    for ((point, mut record), value) in points.iter().zip(records).zip(values) {
        record.insert(column.to_string(), character(value, width));
        writer.write_shape_and_record(point, &record)?;
    }
    drop(writer);

    copy_prj(pt_shp, out_shp)?;

    info!(
        "{:.3} seconds to write shapefile",
        start.elapsed().as_secs_f64()
    );
    info!("Shapefile written to {}", out_shp.display());
    Ok(())
}

/// Write bare coordinates as a new point shapefile with one attribute column.
pub fn write_points(out_shp: &Path, points: &[Point], column: &str, values: &[String]) -> Result<()> {
    if values.len() != points.len() {
        return Err(GeoError::LengthMismatch {
            what: "correspondence values per point",
            expected: points.len(),
            found: values.len(),
        });
    }

    let width = column_width(values);
    let builder = TableWriterBuilder::new().add_character_field(field_name(column)?, width);

    let mut writer = shapefile::Writer::from_path(out_shp, builder)?;
    for (point, value) in points.iter().zip(values) {
        let mut record = dbase::Record::default();
        record.insert(column.to_string(), character(value, width));
        writer.write_shape_and_record(&shapefile::Point::new(point.x, point.y), &record)?;
    }

    info!("Shapefile written to {}", out_shp.display());
    Ok(())
}

pub(crate) fn copy_prj(from_shp: &Path, to_shp: &Path) -> Result<()> {
    let prj = from_shp.with_extension("prj");
    if prj.exists() {
        fs::copy(&prj, to_shp.with_extension("prj"))?;
    }
    Ok(())
}

pub(crate) fn field_name(name: &str) -> Result<FieldName> {
    FieldName::try_from(name).map_err(|e| GeoError::FieldName {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn column_width(values: &[String]) -> u8 {
    values
        .iter()
        .map(|v| v.len())
        .max()
        .unwrap_or(0)
        .clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH) as u8
}

fn character(value: &str, width: u8) -> FieldValue {
    let mut text = value.to_string();
    if text.len() > width as usize {
        // Cut on a char boundary at or below the column width
        let mut end = width as usize;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        warn!("Truncating '{}' to {} bytes", value, end);
        text.truncate(end);
    }
    FieldValue::Character(Some(text))
}
