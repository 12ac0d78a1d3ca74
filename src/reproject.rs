//! Reprojection of WGS84 lon/lat coordinates.
//!
//! The CRS itself is opaque to the rest of the crate: anything implementing
//! [`CrsTransform`] can be plugged in. Two simple projections are provided.

use std::f64::consts::FRAC_PI_4;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GeoError, Result};
use crate::parallel::{map_ordered, CancellationToken, Parallelism};

/// WGS84 semi-major axis in metres.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude bound of the square Web Mercator world.
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_6;

/// Forward transform from WGS84 lon/lat (degrees) to a target CRS.
pub trait CrsTransform: Send + Sync {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Projection {
    /// Spherical Web Mercator (EPSG:3857)
    WebMercator,
    /// Equirectangular projection centred on (lon0, lat0), in metres
    Equirectangular { lon0: f64, lat0: f64 },
}

impl CrsTransform for Projection {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return Err(GeoError::Projection {
                lon,
                lat,
                reason: "not a WGS84 coordinate".to_string(),
            });
        }

        match self {
            Projection::WebMercator => {
                if lat.abs() > MERCATOR_MAX_LAT {
                    return Err(GeoError::Projection {
                        lon,
                        lat,
                        reason: format!("latitude beyond ±{MERCATOR_MAX_LAT}"),
                    });
                }
                let x = EARTH_RADIUS * lon.to_radians();
                let y = EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
                Ok((x, y))
            }
            Projection::Equirectangular { lon0, lat0 } => {
                let x = EARTH_RADIUS * (lon - lon0).to_radians() * lat0.to_radians().cos();
                let y = EARTH_RADIUS * (lat - lat0).to_radians();
                Ok((x, y))
            }
        }
    }
}

impl FromStr for Projection {
    type Err = GeoError;

    /// `epsg:3857`, `web_mercator`, or `equirectangular:<lon0>,<lat0>`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "epsg:3857" | "web_mercator" | "webmercator" => return Ok(Projection::WebMercator),
            _ => {}
        }

        let unknown = || GeoError::UnknownProjection(s.to_string());
        if let Some(origin) = lower.strip_prefix("equirectangular:") {
            let (lon0, lat0) = origin.split_once(',').ok_or_else(unknown)?;
            let lon0 = lon0.trim().parse().map_err(|_| unknown())?;
            let lat0 = lat0.trim().parse().map_err(|_| unknown())?;
            return Ok(Projection::Equirectangular { lon0, lat0 });
        }

        Err(unknown())
    }
}

/// Project every (lon, lat) pair, keeping input order. Any failing row fails
/// the batch.
pub fn reproject<T: CrsTransform + ?Sized>(
    lon_lat: &[(f64, f64)],
    transform: &T,
    parallelism: Parallelism,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<(f64, f64)>> {
    let projected = map_ordered(lon_lat, parallelism, cancel, |(lon, lat)| {
        transform.forward(*lon, *lat)
    })?;
    info!("Reprojected {} coordinates", projected.len());
    Ok(projected)
}
