//! Clip a shapefile down to the records whose attribute matches a key set.

use std::path::{Path, PathBuf};
use std::time::Instant;

use hashbrown::HashSet;
use shapefile::dbase::{self, TableWriterBuilder};
use shapefile::record::{EsriShape, ReadableShape};
use shapefile::ShapeType;
use tracing::info;

use super::read::field_text;
use super::write::copy_prj;
use crate::error::{GeoError, Result};

/// Write the records of `shp_in` whose `column` value is one of `keys`.
///
/// Keys are compared against the text form of the DBF value. Output defaults
/// to `<name>_clipped.shp` next to the input. Returns the output path.
pub fn clip_shp(
    shp_in: &Path,
    column: &str,
    keys: &[String],
    shp_out: Option<&Path>,
) -> Result<PathBuf> {
    let start = Instant::now();
    let key_set = unique_keys(keys)?;

    let shp_out = shp_out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| clipped_path(shp_in));

    let dbf = dbase::Reader::from_path(shp_in.with_extension("dbf"))?;
    if !dbf.fields().iter().any(|f| f.name() == column) {
        return Err(GeoError::MissingColumn {
            column: column.to_string(),
            path: shp_in.with_extension("dbf"),
        });
    }

    let shape_type = shapefile::Reader::from_path(shp_in)?.header().shape_type;
    let written = match shape_type {
        ShapeType::Point => clip_as::<shapefile::Point>(shp_in, &shp_out, column, &key_set),
        ShapeType::Polyline => clip_as::<shapefile::Polyline>(shp_in, &shp_out, column, &key_set),
        ShapeType::Polygon => clip_as::<shapefile::Polygon>(shp_in, &shp_out, column, &key_set),
        ShapeType::Multipoint => {
            clip_as::<shapefile::Multipoint>(shp_in, &shp_out, column, &key_set)
        }
        _ => Err(GeoError::UnsupportedShape {
            expected: "Point, Polyline, Polygon or Multipoint",
            path: shp_in.to_path_buf(),
        }),
    }?;

    copy_prj(shp_in, &shp_out)?;

    info!(
        "Clipped {} records into {} in {:.3} secs",
        written,
        shp_out.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(shp_out)
}

fn clip_as<S>(shp_in: &Path, shp_out: &Path, column: &str, keys: &HashSet<String>) -> Result<usize>
where
    S: ReadableShape + EsriShape,
{
    let mut reader = shapefile::Reader::from_path(shp_in)?;
    let builder =
        TableWriterBuilder::from_reader(dbase::Reader::from_path(shp_in.with_extension("dbf"))?);
    let mut writer = shapefile::Writer::from_path(shp_out, builder)?;

    let mut written = 0;
    for item in reader.iter_shapes_and_records_as::<S, dbase::Record>() {
        let (shape, record) = item?;
        let keep = record
            .get(column)
            .and_then(field_text)
            .is_some_and(|value| keys.contains(&value));
        if keep {
            writer.write_shape_and_record(&shape, &record)?;
            written += 1;
        }
    }

    Ok(written)
}

fn unique_keys(keys: &[String]) -> Result<HashSet<String>> {
    let mut set = HashSet::with_capacity(keys.len());
    let mut duplicates = Vec::new();
    for key in keys {
        if !set.insert(key.clone()) {
            duplicates.push(key.clone());
        }
    }
    if duplicates.is_empty() {
        Ok(set)
    } else {
        Err(GeoError::DuplicateKeys(duplicates))
    }
}

fn clipped_path(shp_in: &Path) -> PathBuf {
    let stem = shp_in
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    shp_in.with_file_name(format!("{}_clipped.shp", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_keys_rejected() {
        let keys = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        match unique_keys(&keys) {
            Err(GeoError::DuplicateKeys(d)) => assert_eq!(d, vec!["a".to_string()]),
            other => panic!("unexpected {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            clipped_path(Path::new("/data/counties.shp")),
            PathBuf::from("/data/counties_clipped.shp")
        );
    }

    #[test]
    fn test_clip_points_by_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sites.shp");
        let points = vec![
            crate::models::Point::new(0.0, 0.0),
            crate::models::Point::new(1.0, 1.0),
            crate::models::Point::new(2.0, 2.0),
        ];
        let labels = vec!["keep".to_string(), "drop".to_string(), "also".to_string()];
        super::super::write_points(&input, &points, "tag", &labels).unwrap();

        let keys = vec!["keep".to_string(), "also".to_string()];
        let out = clip_shp(&input, "tag", &keys, None).unwrap();

        assert_eq!(out, dir.path().join("sites_clipped.shp"));
        assert_eq!(
            super::super::read_points(&out).unwrap(),
            vec![points[0], points[2]]
        );
        assert_eq!(
            super::super::read_column(&out, "tag").unwrap(),
            vec!["keep".to_string(), "also".to_string()]
        );
    }

    #[test]
    fn test_clip_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sites.shp");
        super::super::write_points(
            &input,
            &[crate::models::Point::new(0.0, 0.0)],
            "tag",
            &["x".to_string()],
        )
        .unwrap();

        let res = clip_shp(&input, "nope", &["x".to_string()], None);
        assert!(matches!(res, Err(GeoError::MissingColumn { .. })));
    }
}
