//! Synthetic point-in-polygon benchmark.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use geo_types::{polygon, MultiPolygon};
use serde::Serialize;
use tracing::info;
use xxhash_rust::xxh64::xxh64;

use geotools::config::Config;
use geotools::models::{records_from_geometries, render};
use geotools::pip::PointMatcher;
use geotools::shp::{write_points, DEFAULT_COLUMN};
use geotools::Point;

use super::MatchingArgs;

#[derive(clap::Args, Debug)]
pub struct BenchArgs {
    /// Number of unit-square polygons, laid out on a square grid
    #[arg(long, default_value_t = 10_000)]
    polygons: usize,

    /// Number of pseudo-random points
    #[arg(long, default_value_t = 1_000_000)]
    points: usize,

    /// Seed for point generation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Also write the points and correspondences to this shapefile
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the timing report as JSON on stdout
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    matching: MatchingArgs,
}

#[derive(Debug, Serialize)]
struct BenchReport {
    polygons: usize,
    points: usize,
    matched: usize,
    build_secs: f64,
    match_secs: f64,
    write_secs: Option<f64>,
}

pub fn run(args: &BenchArgs, config: &Config) -> Result<()> {
    let options = args.matching.to_options(config);
    let side = grid_side(args.polygons);
    info!(
        "Benchmarking {} polygons ({}x{} grid) against {} points",
        args.polygons, side, side, args.points
    );

    let polygons = records_from_geometries(grid(args.polygons, side))?;
    let points = random_points(args.points, side as f64, args.seed);

    let start = Instant::now();
    let locator = options.backend.build(&polygons)?;
    let build_secs = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let correspondences = PointMatcher::new(locator.as_ref(), &polygons)
        .with_order(options.order)
        .match_all(&points, options.parallelism, None)?;
    let match_secs = start.elapsed().as_secs_f64();

    let write_secs = match &args.output {
        Some(out) => {
            let start = Instant::now();
            let values = render(&correspondences, None, &options.sentinels);
            write_points(out, &points, DEFAULT_COLUMN, &values)?;
            Some(start.elapsed().as_secs_f64())
        }
        None => None,
    };

    let report = BenchReport {
        polygons: polygons.len(),
        points: points.len(),
        matched: correspondences.iter().filter(|c| c.is_matched()).count(),
        build_secs,
        match_secs,
        write_secs,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!("{:.3} secs to build {:?} index", report.build_secs, options.backend);
        info!(
            "{:.3} secs to match {} points ({} matched)",
            report.match_secs, report.points, report.matched
        );
        if let Some(secs) = report.write_secs {
            info!("{:.3} secs to write output", secs);
        }
    }

    Ok(())
}

fn grid_side(n: usize) -> usize {
    let mut side = (n as f64).sqrt() as usize;
    while side * side < n {
        side += 1;
    }
    side.max(1)
}

/// First `n` unit squares of a `side` x `side` grid, row by row.
fn grid(n: usize, side: usize) -> impl Iterator<Item = MultiPolygon<f64>> {
    (0..n).map(move |i| {
        let x = (i % side) as f64;
        let y = (i / side) as f64;
        MultiPolygon::new(vec![polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ]])
    })
}

/// Deterministic points in `[0, extent)` squared.
fn random_points(m: usize, extent: f64, seed: u64) -> Vec<Point> {
    (0..m as u64)
        .map(|i| {
            let bytes = i.to_le_bytes();
            Point::new(
                unit(xxh64(&bytes, seed)) * extent,
                unit(xxh64(&bytes, seed.wrapping_add(1))) * extent,
            )
        })
        .collect()
}

fn unit(hash: u64) -> f64 {
    (hash >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_side() {
        assert_eq!(grid_side(0), 1);
        assert_eq!(grid_side(1), 1);
        assert_eq!(grid_side(4), 2);
        assert_eq!(grid_side(5), 3);
    }

    #[test]
    fn test_random_points_are_deterministic_and_in_range() {
        let a = random_points(100, 7.0, 1);
        let b = random_points(100, 7.0, 1);
        assert_eq!(a, b);
        assert!(a.iter().all(|p| (0.0..7.0).contains(&p.x) && (0.0..7.0).contains(&p.y)));
        assert_ne!(a, random_points(100, 7.0, 2));
    }

    #[test]
    fn test_grid_cells() {
        let cells: Vec<_> = grid(5, 3).collect();
        assert_eq!(cells.len(), 5);
        let records = records_from_geometries(cells).unwrap();
        assert!(records[4].contains(&Point::new(1.5, 1.5)));
    }
}
