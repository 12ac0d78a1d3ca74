//! A-to-B pairwise distances with optional nearest-K truncation.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::Metric;
use crate::error::{GeoError, Result};
use crate::parallel::{map_ordered, CancellationToken, Parallelism};

/// A point with a caller-chosen ID and any number of coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: u64,
    pub coords: Vec<f64>,
}

impl Observation {
    pub fn new(id: u64, coords: Vec<f64>) -> Self {
        Self { id, coords }
    }
}

/// Observations that all share one dimensionality.
#[derive(Debug, Clone, Default)]
pub struct PointSet {
    dims: usize,
    observations: Vec<Observation>,
}

impl PointSet {
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        let dims = observations.first().map_or(0, |o| o.coords.len());
        if let Some(bad) = observations.iter().find(|o| o.coords.len() != dims) {
            return Err(GeoError::DimensionMismatch {
                expected: dims,
                found: bad.coords.len(),
            });
        }
        Ok(Self { dims, observations })
    }

    /// Planar points numbered 0..n.
    pub fn from_xy<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Self {
        let observations = points
            .into_iter()
            .enumerate()
            .map(|(i, (x, y))| Observation::new(i as u64, vec![x, y]))
            .collect();
        Self {
            dims: 2,
            observations,
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceEntry {
    pub a: u64,
    pub b: u64,
    pub distance: f64,
}

/// Distances keyed by (A ID, B ID).
///
/// Rows are grouped by A in A's input order. Within a group, rows follow B's
/// order, or ascending distance (ties by B position) when truncated to the
/// nearest K.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceSeries {
    entries: Vec<DistanceEntry>,
}

impl DistanceSeries {
    pub fn entries(&self) -> &[DistanceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<DistanceEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distance for one (a, b) pair.
    ///
    /// Scans the rows linearly; use [`DistanceSeries::to_map`] for repeated
    /// keyed lookups.
    pub fn get(&self, a: u64, b: u64) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.a == a && e.b == b)
            .map(|e| e.distance)
    }

    /// Rows for one A observation.
    pub fn for_a(&self, a: u64) -> impl Iterator<Item = &DistanceEntry> {
        self.entries.iter().filter(move |e| e.a == a)
    }

    /// Keyed view. Later rows win if IDs repeat.
    pub fn to_map(&self) -> BTreeMap<(u64, u64), f64> {
        self.entries
            .iter()
            .map(|e| ((e.a, e.b), e.distance))
            .collect()
    }

    /// Append another series, e.g. the next block of A rows.
    pub fn extend(&mut self, other: DistanceSeries) {
        self.entries.extend(other.entries);
    }
}

/// Settings for one distance computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceOptions {
    pub metric: Metric,
    pub nearest_k: Option<NonZeroUsize>,
    pub parallelism: Parallelism,
}

/// Distance from every observation in `a` to every observation in `b`.
///
/// Inputs are validated before any distance is computed.
pub fn compute_distances(
    a: &PointSet,
    b: &PointSet,
    options: &DistanceOptions,
    cancel: Option<&CancellationToken>,
) -> Result<DistanceSeries> {
    if !a.is_empty() && !b.is_empty() && a.dims() != b.dims() {
        return Err(GeoError::DimensionMismatch {
            expected: a.dims(),
            found: b.dims(),
        });
    }

    let start = Instant::now();
    let metric = options.metric;
    let nearest_k = options.nearest_k;

    let rows = map_ordered(a.observations(), options.parallelism, cancel, |obs| {
        Ok(distances_from(obs, b, metric, nearest_k))
    })?;

    let entries: Vec<DistanceEntry> = rows.into_iter().flatten().collect();

    info!(
        "{:.3} secs to compute {} {} distances ({} x {} points)",
        start.elapsed().as_secs_f64(),
        entries.len(),
        metric,
        a.len(),
        b.len()
    );

    Ok(DistanceSeries { entries })
}

fn distances_from(
    a: &Observation,
    b: &PointSet,
    metric: Metric,
    nearest_k: Option<NonZeroUsize>,
) -> Vec<DistanceEntry> {
    let mut row: Vec<DistanceEntry> = b
        .observations()
        .iter()
        .map(|obs| DistanceEntry {
            a: a.id,
            b: obs.id,
            distance: metric.distance(&a.coords, &obs.coords),
        })
        .collect();

    if let Some(k) = nearest_k {
        // NaN sorts last whatever its sign; the stable sort keeps B order
        // among equal distances
        row.sort_by(|x, y| {
            x.distance
                .is_nan()
                .cmp(&y.distance.is_nan())
                .then(x.distance.total_cmp(&y.distance))
        });
        row.truncate(k.get());
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(n: usize) -> Option<NonZeroUsize> {
        NonZeroUsize::new(n)
    }

    #[test]
    fn test_nearest_two() {
        let a = PointSet::from_xy([(0.0, 0.0)]);
        let b = PointSet::from_xy([(0.0, 0.0), (1.0, 0.0), (0.0, 2.0)]);
        let options = DistanceOptions {
            nearest_k: k(2),
            ..Default::default()
        };

        let series = compute_distances(&a, &b, &options, None).unwrap();
        let expected: BTreeMap<(u64, u64), f64> =
            [((0, 0), 0.0), ((0, 1), 1.0)].into_iter().collect();
        assert_eq!(series.to_map(), expected);
        assert_eq!(series.get(0, 2), None);
    }

    #[test]
    fn test_all_pairs_without_k() {
        let a = PointSet::from_xy([(0.0, 0.0), (1.0, 1.0)]);
        let b = PointSet::from_xy([(0.0, 1.0), (2.0, 1.0), (5.0, 5.0)]);
        let series = compute_distances(&a, &b, &DistanceOptions::default(), None).unwrap();

        assert_eq!(series.len(), 6);
        let b_ids: Vec<u64> = series.for_a(1).map(|e| e.b).collect();
        assert_eq!(b_ids, vec![0, 1, 2]);
        assert_eq!(series.get(1, 1), Some(1.0));
    }

    #[test]
    fn test_k_larger_than_b_keeps_all_sorted() {
        let a = PointSet::from_xy([(0.0, 0.0)]);
        let b = PointSet::from_xy([(3.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let options = DistanceOptions {
            nearest_k: k(10),
            ..Default::default()
        };
        let series = compute_distances(&a, &b, &options, None).unwrap();
        let d: Vec<f64> = series.entries().iter().map(|e| e.distance).collect();
        assert_eq!(d, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ties_broken_by_b_position() {
        let a = PointSet::from_xy([(0.0, 0.0)]);
        // Four points at distance 1, ids follow position
        let b = PointSet::from_xy([(0.0, 1.0), (1.0, 0.0), (0.0, -1.0), (-1.0, 0.0)]);
        let options = DistanceOptions {
            nearest_k: k(3),
            parallelism: Parallelism::all_cores(),
            ..Default::default()
        };
        let series = compute_distances(&a, &b, &options, None).unwrap();
        let b_ids: Vec<u64> = series.entries().iter().map(|e| e.b).collect();
        assert_eq!(b_ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_undefined_distances_sort_after_real_ones() {
        // Cosine against the zero vector is undefined
        let a = PointSet::from_xy([(1.0, 0.0)]);
        let b = PointSet::from_xy([(1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
        let options = DistanceOptions {
            metric: Metric::Cosine,
            nearest_k: k(1),
            ..Default::default()
        };
        let series = compute_distances(&a, &b, &options, None).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.entries()[0].b, 0);
        assert!(series.entries()[0].distance.abs() < 1e-12);

        let all = DistanceOptions {
            nearest_k: k(3),
            ..options
        };
        let b_ids: Vec<u64> = compute_distances(&a, &b, &all, None)
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.b)
            .collect();
        assert_eq!(b_ids, vec![0, 2, 1]);

        let a = PointSet::from_xy([(0.0, 0.0)]);
        let b = PointSet::from_xy([(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let options = DistanceOptions {
            metric: Metric::BrayCurtis,
            nearest_k: k(1),
            ..Default::default()
        };
        let series = compute_distances(&a, &b, &options, None).unwrap();
        assert_eq!(series.entries()[0].b, 1);
        assert_eq!(series.entries()[0].distance, 1.0);
    }

    #[test]
    fn test_each_a_has_min_k_len_b_rows() {
        let a = PointSet::from_xy((0..50).map(|i| (i as f64 * 0.3, (i % 7) as f64)));
        let b = PointSet::from_xy((0..9).map(|i| ((i * i) as f64 * 0.1, i as f64)));

        for n in [1, 4, 9, 20] {
            let options = DistanceOptions {
                nearest_k: k(n),
                parallelism: Parallelism::Threads {
                    threads: 3,
                    chunk_size: 4,
                },
                ..Default::default()
            };
            let series = compute_distances(&a, &b, &options, None).unwrap();
            for obs in a.observations() {
                let d: Vec<f64> = series.for_a(obs.id).map(|e| e.distance).collect();
                assert_eq!(d.len(), n.min(b.len()));
                assert!(d.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let a = PointSet::from_xy((0..40).map(|i| (i as f64, (i * 3 % 11) as f64)));
        let b = PointSet::from_xy((0..30).map(|i| ((i * 7 % 13) as f64, i as f64 * 0.5)));
        let seq = DistanceOptions {
            metric: Metric::Chebyshev,
            nearest_k: k(5),
            parallelism: Parallelism::Sequential,
        };
        let par = DistanceOptions {
            parallelism: Parallelism::all_cores(),
            ..seq
        };
        assert_eq!(
            compute_distances(&a, &b, &seq, None).unwrap(),
            compute_distances(&a, &b, &par, None).unwrap()
        );
    }

    #[test]
    fn test_euclidean_symmetry() {
        let a = PointSet::from_xy([(0.5, 1.5), (-2.0, 3.0)]);
        let b = PointSet::from_xy([(4.0, -1.0), (0.0, 0.0), (7.5, 2.25)]);
        let options = DistanceOptions::default();
        let ab = compute_distances(&a, &b, &options, None).unwrap().to_map();
        let ba = compute_distances(&b, &a, &options, None).unwrap().to_map();
        for ((i, j), d) in &ab {
            assert_eq!(ba[&(*j, *i)], *d);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = PointSet::new(vec![Observation::new(0, vec![0.0, 0.0, 0.0])]).unwrap();
        let b = PointSet::from_xy([(1.0, 1.0)]);
        let err = compute_distances(&a, &b, &DistanceOptions::default(), None).unwrap_err();
        assert!(matches!(
            err,
            GeoError::DimensionMismatch {
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_ragged_point_set_rejected() {
        let res = PointSet::new(vec![
            Observation::new(0, vec![0.0, 0.0]),
            Observation::new(1, vec![1.0]),
        ]);
        assert!(matches!(res, Err(GeoError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let a = PointSet::from_xy([(0.0, 0.0)]);
        let b = PointSet::from_xy([(1.0, 0.0)]);
        let res = compute_distances(&a, &b, &DistanceOptions::default(), Some(&token));
        assert!(matches!(res, Err(GeoError::Cancelled)));
    }
}
