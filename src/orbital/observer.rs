//! Ground station (observer) location

use crate::core::coordinates::{Geodetic, qrb};
use serde::{Deserialize, Serialize};

/// Observer location. Longitudes are east-positive degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qth {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Altitude above sea level in metres
    pub alt_m: f64,
}

/// Minimal copy of a [`Qth`], stored alongside a computed pass so the pass can
/// be invalidated when the observer moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QthSmall {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
}

impl Default for Qth {
    fn default() -> Self {
        Self {
            name: "Greenwich".to_string(),
            lat: 51.4779,
            lon: -0.0015,
            alt_m: 45.0,
        }
    }
}

impl Qth {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64, alt_m: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            alt_m,
        }
    }

    pub fn geodetic(&self) -> Geodetic {
        Geodetic::from_degrees(self.lat, self.lon, self.alt_m / 1000.0)
    }

    pub fn small(&self) -> QthSmall {
        QthSmall {
            lat: self.lat,
            lon: self.lon,
            alt_m: self.alt_m,
        }
    }

    /// Great-circle distance in km between this location and a saved copy.
    ///
    /// Invalid coordinates count as "infinitely far" so that anything cached
    /// against them gets recomputed.
    pub fn small_dist(&self, other: &QthSmall) -> f64 {
        qrb(self.lon, self.lat, other.lon, other.lat)
            .map(|(dist, _)| dist)
            .unwrap_or(f64::INFINITY)
    }
}
