//! First-match point-in-polygon assignment.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::index::Locator;
use crate::error::Result;
use crate::models::{Correspondence, Point, PolygonRecord};
use crate::parallel::{map_ordered, CancellationToken, Parallelism};

/// Order in which bounding-box candidates get the exact test.
///
/// Matching stops at the first polygon that contains the point, so when
/// polygons overlap the answer depends on this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrder {
    #[default]
    Ascending,
    Descending,
    /// Whatever order the locator yields
    AsLocated,
}

impl CandidateOrder {
    fn arrange(self, candidates: &mut [&PolygonRecord]) {
        match self {
            CandidateOrder::Ascending => candidates.sort_by_key(|p| p.id),
            CandidateOrder::Descending => candidates.sort_by(|a, b| b.id.cmp(&a.id)),
            CandidateOrder::AsLocated => {}
        }
    }
}

/// Matches points against a fixed polygon set through a bounding-box locator.
///
/// The locator must have been built from `polygons`: it reports slice
/// positions, and matches are reported by each record's own `id`.
pub struct PointMatcher<'a> {
    locator: &'a dyn Locator,
    polygons: &'a [PolygonRecord],
    order: CandidateOrder,
}

impl<'a> PointMatcher<'a> {
    pub fn new(locator: &'a dyn Locator, polygons: &'a [PolygonRecord]) -> Self {
        Self {
            locator,
            polygons,
            order: CandidateOrder::default(),
        }
    }

    pub fn with_order(mut self, order: CandidateOrder) -> Self {
        self.order = order;
        self
    }

    /// Return the first candidate polygon that contains the point.
    pub fn match_point(&self, point: &Point) -> Correspondence {
        let mut candidates: Vec<&PolygonRecord> = self
            .locator
            .candidates(point.x, point.y)
            .into_iter()
            .filter_map(|pos| self.polygons.get(pos))
            .collect();
        self.order.arrange(&mut candidates);

        candidates
            .into_iter()
            .find(|polygon| polygon.contains(point))
            .map(|polygon| Correspondence::Polygon(polygon.id))
            .unwrap_or(Correspondence::Unmatched)
    }

    /// Match every point, keeping `output[i]` for `points[i]`.
    pub fn match_all(
        &self,
        points: &[Point],
        parallelism: Parallelism,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Correspondence>> {
        let start = Instant::now();

        let correspondences =
            map_ordered(points, parallelism, cancel, |p| Ok(self.match_point(p)))?;

        let matched = correspondences.iter().filter(|c| c.is_matched()).count();
        info!(
            "{:.3} secs to get correspondences ({} of {} points matched)",
            start.elapsed().as_secs_f64(),
            matched,
            points.len()
        );
        debug!("Matching used {:?} with {:?} order", parallelism, self.order);

        Ok(correspondences)
    }
}
