//! CSV tables for point sets, distance series and lon/lat rows.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::distance::{DistanceSeries, Observation, PointSet};
use crate::error::{GeoError, Result};
use crate::parallel::{CancellationToken, Parallelism};
use crate::reproject::{reproject, CrsTransform};

/// Read `id,c1,c2,...` rows into a point set. The header row is skipped.
pub fn read_point_set<R: Read>(reader: R) -> Result<PointSet> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut observations = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let record = result?;
        let id = parse_field(&record, 0, row)?;
        let coords = (1..record.len())
            .map(|i| parse_field(&record, i, row))
            .collect::<Result<Vec<f64>>>()?;
        observations.push(Observation::new(id, coords));
    }

    PointSet::new(observations)
}

pub fn read_point_set_file(path: &Path) -> Result<PointSet> {
    read_point_set(File::open(path)?)
}

/// Write `a,b,distance` rows.
pub fn write_series<W: Write>(writer: W, series: &DistanceSeries, header: bool) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    if header {
        csv_writer.write_record(["a", "b", "distance"])?;
    }
    for e in series.entries() {
        csv_writer.write_record(&[e.a.to_string(), e.b.to_string(), e.distance.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Append projected `x` and `y` columns to a CSV holding lon/lat columns.
///
/// Returns the number of rows written.
pub fn reproject_csv<R: Read, W: Write, T: CrsTransform + ?Sized>(
    reader: R,
    writer: W,
    lon_col: &str,
    lat_col: &str,
    transform: &T,
    parallelism: Parallelism,
    cancel: Option<&CancellationToken>,
) -> Result<usize> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let lon_idx = column_index(&headers, lon_col)?;
    let lat_idx = column_index(&headers, lat_col)?;

    let records = csv_reader.records().collect::<Result<Vec<_>, _>>()?;
    let lon_lat = records
        .iter()
        .enumerate()
        .map(|(row, r)| Ok((parse_field(r, lon_idx, row)?, parse_field(r, lat_idx, row)?)))
        .collect::<Result<Vec<(f64, f64)>>>()?;

    let projected = reproject(&lon_lat, transform, parallelism, cancel)?;

    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    let mut out_headers = headers.clone();
    out_headers.push_field("x");
    out_headers.push_field("y");
    csv_writer.write_record(&out_headers)?;

    for (record, (x, y)) in records.iter().zip(&projected) {
        let mut out = record.clone();
        out.push_field(&x.to_string());
        out.push_field(&y.to_string());
        csv_writer.write_record(&out)?;
    }
    csv_writer.flush()?;

    Ok(records.len())
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| GeoError::MissingColumn {
            column: name.to_string(),
            path: "<csv>".into(),
        })
}

fn parse_field<T: std::str::FromStr>(record: &StringRecord, idx: usize, row: usize) -> Result<T> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse().map_err(|_| GeoError::Parse {
        row: row + 1,
        column: idx + 1,
        value: raw.to_string(),
    })
}
