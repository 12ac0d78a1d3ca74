//! Command-line front end for the geotools library.
//!
//! Every subcommand is a single read-compute-write pass over files.

mod bench;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geotools::config::Config;
use geotools::distance::{compute_distances, DistanceOptions, Metric, PointSet};
use geotools::parallel::Parallelism;
use geotools::pip::{CandidateOrder, IndexBackend};
use geotools::reproject::Projection;
use geotools::shp::{clip_shp, pip_shps, PipOptions};
use geotools::table::{read_point_set_file, reproject_csv, write_series};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "geotools")]
#[command(about = "Point-in-polygon, distance and reprojection utilities")]
struct Args {
    /// TOML file with default settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Keep only the records whose column value is one of the keys
    Clip {
        #[arg(short, long)]
        input: PathBuf,

        /// DBF column to filter on
        #[arg(long)]
        column: String,

        /// Values to keep (repeatable)
        #[arg(short, long = "key", required = true)]
        keys: Vec<String>,

        /// Defaults to <input>_clipped.shp
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Assign each point to the polygon containing it
    Pip {
        /// Point shapefile
        #[arg(long)]
        points: PathBuf,

        /// Polygon shapefile
        #[arg(long)]
        polygons: PathBuf,

        /// Polygon DBF column to report instead of the polygon ID
        #[arg(long)]
        id_col: Option<String>,

        /// Write the points with the correspondence column appended
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        matching: MatchingArgs,
    },

    /// Distances from every point in A to every point in B
    Dist {
        /// CSV with id,c1,c2,... rows
        #[arg(long)]
        a: PathBuf,

        /// CSV with id,c1,c2,... rows
        #[arg(long)]
        b: PathBuf,

        /// euclidean, sqeuclidean, cityblock, chebyshev, minkowski[:p], cosine, canberra, braycurtis
        #[arg(long)]
        metric: Option<String>,

        /// Keep only the K nearest B points per A point (0 keeps all)
        #[arg(short = 'k', long)]
        nearest_k: Option<usize>,

        /// Worker threads (0 = all cores); sequential when omitted
        #[arg(long)]
        threads: Option<usize>,

        /// Rows of A computed and written per block
        #[arg(long)]
        block_size: Option<usize>,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add projected x/y columns to a CSV of WGS84 lon/lat rows
    Reproject {
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// epsg:3857 or equirectangular:<lon0>,<lat0>
        #[arg(long, default_value = "epsg:3857", value_parser = parse_projection)]
        target: Projection,

        #[arg(long, default_value = "lon")]
        lon_col: String,

        #[arg(long, default_value = "lat")]
        lat_col: String,
    },

    /// Time index build and matching on a synthetic grid
    Bench(bench::BenchArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct MatchingArgs {
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    #[arg(long, value_enum)]
    order: Option<OrderArg>,

    /// Worker threads (0 = all cores)
    #[arg(long, conflicts_with = "sequential")]
    threads: Option<usize>,

    /// Match on the calling thread
    #[arg(long)]
    sequential: bool,

    /// Value written for points outside every polygon
    #[arg(long)]
    unmatched: Option<String>,

    /// Value written when the ID column lookup misses
    #[arg(long)]
    empty: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum BackendArg {
    Rtree,
    BboxTable,
}

impl From<BackendArg> for IndexBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Rtree => IndexBackend::RTree,
            BackendArg::BboxTable => IndexBackend::BboxTable,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum OrderArg {
    Ascending,
    Descending,
    AsLocated,
}

impl From<OrderArg> for CandidateOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Ascending => CandidateOrder::Ascending,
            OrderArg::Descending => CandidateOrder::Descending,
            OrderArg::AsLocated => CandidateOrder::AsLocated,
        }
    }
}

impl MatchingArgs {
    /// Merge flags over the config file defaults.
    fn to_options(&self, config: &Config) -> PipOptions {
        let defaults = &config.matching;
        let mut sentinels = defaults.sentinels();
        if let Some(unmatched) = &self.unmatched {
            sentinels.unmatched = unmatched.clone();
        }
        if let Some(empty) = &self.empty {
            sentinels.empty = empty.clone();
        }

        let parallelism = if self.sequential {
            Parallelism::Sequential
        } else if let Some(threads) = self.threads {
            Parallelism::Threads {
                threads,
                chunk_size: defaults.chunk_size,
            }
        } else {
            defaults.parallelism()
        };

        PipOptions {
            backend: self.backend.map(Into::into).unwrap_or(defaults.backend),
            order: self.order.map(Into::into).unwrap_or(defaults.order),
            parallelism,
            sentinels,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    match args.command {
        Command::Clip {
            input,
            column,
            keys,
            output,
        } => {
            let out = clip_shp(&input, &column, &keys, output.as_deref())
                .with_context(|| format!("Failed to clip {}", input.display()))?;
            info!("Clipped shapefile written to {}", out.display());
        }
        Command::Pip {
            points,
            polygons,
            id_col,
            output,
            matching,
        } => {
            let options = PipOptions {
                poly_id_col: id_col,
                out_shp: output.clone(),
                ..matching.to_options(&config)
            };
            let values = pip_shps(&points, &polygons, &options, None)
                .context("Point-in-polygon run failed")?;

            if output.is_none() {
                let stdout = io::stdout();
                let mut out = BufWriter::new(stdout.lock());
                for value in &values {
                    writeln!(out, "{}", value)?;
                }
                out.flush()?;
            }
        }
        Command::Dist {
            a,
            b,
            metric,
            nearest_k,
            threads,
            block_size,
            output,
        } => {
            let defaults = &config.distance;
            let metric: Metric = metric
                .as_deref()
                .unwrap_or(&defaults.metric)
                .parse()
                .context("Invalid metric")?;
            let options = DistanceOptions {
                metric,
                nearest_k: NonZeroUsize::new(nearest_k.or(defaults.nearest_k).unwrap_or(0)),
                parallelism: match threads {
                    Some(threads) => Parallelism::Threads {
                        threads,
                        chunk_size: 1,
                    },
                    None => defaults.parallelism(),
                },
            };
            let block_size = block_size.unwrap_or(defaults.block_size).max(1);
            run_dist(&a, &b, &options, block_size, output)?;
        }
        Command::Reproject {
            input,
            output,
            target,
            lon_col,
            lat_col,
        } => {
            let reader = File::open(&input)
                .with_context(|| format!("Failed to open {}", input.display()))?;
            let writer = open_output(output.as_ref())?;
            let rows = reproject_csv(
                reader,
                writer,
                &lon_col,
                &lat_col,
                &target,
                config.matching.parallelism(),
                None,
            )?;
            info!("Reprojected {} rows to {:?}", rows, target);
        }
        Command::Bench(bench_args) => bench::run(&bench_args, &config)?,
    }

    Ok(())
}

/// Compute A-to-B distances block by block so output streams as it goes.
fn run_dist(
    a_path: &Path,
    b_path: &Path,
    options: &DistanceOptions,
    block_size: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let a = read_point_set_file(a_path)
        .with_context(|| format!("Failed to read {}", a_path.display()))?;
    let b = read_point_set_file(b_path)
        .with_context(|| format!("Failed to read {}", b_path.display()))?;
    info!(
        "Computing {} distances for {} x {} points",
        options.metric,
        a.len(),
        b.len()
    );

    let mut writer = open_output(output.as_ref())?;

    let pb = ProgressBar::new(a.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    for (i, block) in a.observations().chunks(block_size).enumerate() {
        let block = PointSet::new(block.to_vec())?;
        let series = compute_distances(&block, &b, options, None)?;
        write_series(&mut writer, &series, i == 0)?;
        pb.inc(block.len() as u64);
    }

    if a.is_empty() {
        write_series(&mut writer, &Default::default(), true)?;
    }

    pb.finish_with_message("Distances complete");
    Ok(())
}

fn parse_projection(s: &str) -> std::result::Result<Projection, String> {
    s.parse().map_err(|e: geotools::GeoError| e.to_string())
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}
