//! Distance metrics over real vectors, named the way `cdist` names them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeoError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Euclidean,
    SqEuclidean,
    /// Also accepted as `manhattan`
    Cityblock,
    Chebyshev,
    Minkowski { p: f64 },
    Cosine,
    Canberra,
    BrayCurtis,
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Euclidean
    }
}

impl Metric {
    /// Distance between two equal-length vectors.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let pairs = a.iter().zip(b);

        match self {
            Metric::Euclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt(),
            Metric::SqEuclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum(),
            Metric::Cityblock => pairs.map(|(x, y)| (x - y).abs()).sum(),
            Metric::Chebyshev => pairs.map(|(x, y)| (x - y).abs()).fold(0.0, f64::max),
            Metric::Minkowski { p } => pairs
                .map(|(x, y)| (x - y).abs().powf(*p))
                .sum::<f64>()
                .powf(1.0 / p),
            Metric::Cosine => {
                let (dot, na, nb) = pairs.fold((0.0, 0.0, 0.0), |(d, na, nb), (x, y)| {
                    (d + x * y, na + x * x, nb + y * y)
                });
                1.0 - dot / (na.sqrt() * nb.sqrt())
            }
            Metric::Canberra => pairs
                .map(|(x, y)| {
                    let denom = x.abs() + y.abs();
                    // 0/0 terms contribute nothing
                    if denom == 0.0 {
                        0.0
                    } else {
                        (x - y).abs() / denom
                    }
                })
                .sum(),
            Metric::BrayCurtis => {
                let (num, denom) = pairs.fold((0.0, 0.0), |(n, d), (x, y)| {
                    (n + (x - y).abs(), d + (x + y).abs())
                });
                num / denom
            }
        }
    }
}

impl FromStr for Metric {
    type Err = GeoError;

    /// Parse a metric name. Minkowski takes an optional order: `minkowski:3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (name, param) = match lower.split_once(':') {
            Some((name, param)) => (name, Some(param)),
            None => (lower.as_str(), None),
        };

        let metric = match (name, param) {
            ("euclidean", None) => Metric::Euclidean,
            ("sqeuclidean", None) => Metric::SqEuclidean,
            ("cityblock" | "manhattan", None) => Metric::Cityblock,
            ("chebyshev", None) => Metric::Chebyshev,
            ("minkowski", None) => Metric::Minkowski { p: 2.0 },
            ("minkowski", Some(p)) => match p.parse::<f64>() {
                Ok(p) if p >= 1.0 && p.is_finite() => Metric::Minkowski { p },
                _ => return Err(GeoError::UnknownMetric(s.to_string())),
            },
            ("cosine", None) => Metric::Cosine,
            ("canberra", None) => Metric::Canberra,
            ("braycurtis", None) => Metric::BrayCurtis,
            _ => return Err(GeoError::UnknownMetric(s.to_string())),
        };

        Ok(metric)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Euclidean => write!(f, "euclidean"),
            Metric::SqEuclidean => write!(f, "sqeuclidean"),
            Metric::Cityblock => write!(f, "cityblock"),
            Metric::Chebyshev => write!(f, "chebyshev"),
            Metric::Minkowski { p } => write!(f, "minkowski:{}", p),
            Metric::Cosine => write!(f, "cosine"),
            Metric::Canberra => write!(f, "canberra"),
            Metric::BrayCurtis => write!(f, "braycurtis"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("euclidean".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert_eq!("Manhattan".parse::<Metric>().unwrap(), Metric::Cityblock);
        assert_eq!(
            "minkowski:3".parse::<Metric>().unwrap(),
            Metric::Minkowski { p: 3.0 }
        );
        assert!(matches!(
            "mahalanobis".parse::<Metric>(),
            Err(GeoError::UnknownMetric(_))
        ));
        assert!("minkowski:0.5".parse::<Metric>().is_err());
        assert!("euclidean:2".parse::<Metric>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for m in [
            Metric::Euclidean,
            Metric::Chebyshev,
            Metric::Minkowski { p: 3.0 },
            Metric::BrayCurtis,
        ] {
            assert_eq!(m.to_string().parse::<Metric>().unwrap(), m);
        }
    }

    #[test]
    fn test_known_values() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert_eq!(Metric::Euclidean.distance(&a, &b), 5.0);
        assert_eq!(Metric::SqEuclidean.distance(&a, &b), 25.0);
        assert_eq!(Metric::Cityblock.distance(&a, &b), 7.0);
        assert_eq!(Metric::Chebyshev.distance(&a, &b), 4.0);
        assert!((Metric::Minkowski { p: 2.0 }.distance(&a, &b) - 5.0).abs() < 1e-12);
        assert!(Metric::Cosine.distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-12);
        assert!((Metric::Cosine.distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert_eq!(Metric::Canberra.distance(&[0.0, 1.0], &[0.0, 3.0]), 0.5);
        assert_eq!(Metric::BrayCurtis.distance(&[1.0, 1.0], &[3.0, 1.0]), 2.0 / 6.0);
    }

    #[test]
    fn test_symmetry() {
        let a = [1.5, -2.0, 0.25];
        let b = [-0.5, 4.0, 2.0];
        for m in [
            Metric::Euclidean,
            Metric::Cityblock,
            Metric::Chebyshev,
            Metric::Minkowski { p: 3.0 },
            Metric::Canberra,
        ] {
            assert_eq!(m.distance(&a, &b), m.distance(&b, &a), "{m}");
        }
    }
}
