//! Reading polygons, points and attribute columns from shapefiles.

use std::path::Path;

use geo::MultiPolygon;
use shapefile::dbase::{self, FieldValue};
use tracing::debug;

use crate::error::{GeoError, Result};
use crate::models::{polygon::records_from_geometries, Point, PolygonRecord};

/// Load every polygon of a shapefile, numbered from 0 in file order.
pub fn read_polygons<P: AsRef<Path>>(path: P) -> Result<Vec<PolygonRecord>> {
    let path = path.as_ref();
    let shapes = shapefile::read_shapes_as::<_, shapefile::Polygon>(path)?;
    debug!("Read {} polygons from {}", shapes.len(), path.display());

    records_from_geometries(shapes.into_iter().map(MultiPolygon::<f64>::from))
}

/// Load every point of a point shapefile in file order.
pub fn read_points<P: AsRef<Path>>(path: P) -> Result<Vec<Point>> {
    let path = path.as_ref();
    let shapes = shapefile::read_shapes_as::<_, shapefile::Point>(path)?;
    debug!("Read {} points from {}", shapes.len(), path.display());

    Ok(shapes.into_iter().map(Point::from).collect())
}

/// Read one DBF column as text, one entry per record.
///
/// `path` may point at the `.shp` or the `.dbf`. Null values read as empty
/// strings.
pub fn read_column<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<String>> {
    let dbf_path = path.as_ref().with_extension("dbf");
    let mut reader = dbase::Reader::from_path(&dbf_path)?;

    if !reader.fields().iter().any(|f| f.name() == column) {
        return Err(GeoError::MissingColumn {
            column: column.to_string(),
            path: dbf_path,
        });
    }

    let records = reader.read()?;
    Ok(records
        .iter()
        .map(|r| r.get(column).and_then(field_text).unwrap_or_default())
        .collect())
}

/// Text form of a DBF value, used for label lookups and clip keys.
///
/// Nulls and field types without a natural text form yield `None`.
pub fn field_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(s) => s.as_ref().map(|s| s.trim().to_string()),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        FieldValue::Numeric(n) => n.map(format_number),
        FieldValue::Float(f) => f.map(|f| format_number(f64::from(f))),
        FieldValue::Double(d) => Some(format_number(*d)),
        FieldValue::Currency(c) => Some(format_number(*c)),
        FieldValue::Integer(i) => Some(i.to_string()),
        FieldValue::Logical(b) => b.map(|b| b.to_string()),
        _ => None,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_text() {
        assert_eq!(
            field_text(&FieldValue::Character(Some(" Ohio  ".to_string()))),
            Some("Ohio".to_string())
        );
        assert_eq!(field_text(&FieldValue::Character(None)), None);
        assert_eq!(
            field_text(&FieldValue::Numeric(Some(12.0))),
            Some("12".to_string())
        );
        assert_eq!(
            field_text(&FieldValue::Numeric(Some(1.5))),
            Some("1.5".to_string())
        );
        assert_eq!(field_text(&FieldValue::Integer(-3)), Some("-3".to_string()));
    }
}
