//! Pairwise distance engine between two point sets.

mod engine;
mod metric;

pub use engine::{
    compute_distances, DistanceEntry, DistanceOptions, DistanceSeries, Observation, PointSet,
};
pub use metric::Metric;
