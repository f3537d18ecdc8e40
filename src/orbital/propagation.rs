//! Orbital propagation utilities
//!
//! A [`Satellite`] wraps the SGP4 model built from one element set and
//! evaluates it for an observer at a Julian date.

use crate::core::coordinates::{
    AE, XKMPER, XMNPDA, ecef_to_geodetic, eci_to_ecef_km, gmst_from_jd, julian_date_utc,
    look_angles, wrap_lon_deg,
};
use crate::orbital::observer::Qth;
use crate::tle::parser::{catalog_number, parse_tle_epoch_to_utc};
use crate::tle::types::TleData;
use anyhow::{Context, anyhow};
use glam::DVec3;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Minutes between the element set epoch and `jd`, as SGP4 expects them
pub fn minutes_since_epoch(jd: f64, epoch_jd: f64) -> f64 {
    (jd - epoch_jd) * XMNPDA
}

/// Satellite state at one instant as seen from one observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatState {
    pub jd: f64,
    /// Azimuth, degrees
    pub az: f64,
    /// Elevation, degrees
    pub el: f64,
    /// Slant range, km
    pub range: f64,
    pub ssplat: f64,
    pub ssplon: f64,
    /// Altitude above the ellipsoid, km
    pub alt: f64,
    /// Footprint diameter, km
    pub footprint: f64,
    pub orbit: i64,
}

/// Satellite model built from one TLE.
pub struct Satellite {
    pub catnum: u32,
    pub name: String,
    pub epoch_jd: f64,
    /// Mean motion, revolutions per day
    pub meanmo: f64,
    pub eccentricity: f64,
    /// Inclination, radians
    pub inclination: f64,
    /// Mean anomaly at epoch, radians
    pub mean_anomaly: f64,
    /// Argument of perigee, radians
    pub arg_perigee: f64,
    pub bstar: f64,
    /// Half the first derivative of the mean motion, rev/day²
    pub ndot2: f64,
    pub revnum: i64,
    constants: sgp4::Constants,
}

impl std::fmt::Debug for Satellite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Satellite")
            .field("catnum", &self.catnum)
            .field("name", &self.name)
            .field("epoch_jd", &self.epoch_jd)
            .field("meanmo", &self.meanmo)
            .finish_non_exhaustive()
    }
}

impl Satellite {
    pub fn from_tle(tle: &TleData) -> anyhow::Result<Self> {
        let catnum = catalog_number(&tle.line1)
            .ok_or_else(|| anyhow!("invalid catalogue number in '{}'", tle.line1))?;
        let epoch_utc = parse_tle_epoch_to_utc(&tle.line1).unwrap_or(tle.epoch_utc);

        // Build SGP4 model: parse TLE -> Elements -> Constants
        let elements =
            sgp4::Elements::from_tle(tle.name.clone(), tle.line1.as_bytes(), tle.line2.as_bytes())
                .map_err(|e| anyhow!("norad={} elements error: {}", catnum, e))?;
        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| anyhow!("norad={} constants error: {}", catnum, e))?;

        Ok(Self {
            catnum,
            name: tle
                .name
                .clone()
                .unwrap_or_else(|| format!("NORAD {}", catnum)),
            epoch_jd: julian_date_utc(epoch_utc),
            meanmo: elements.mean_motion,
            eccentricity: elements.eccentricity,
            inclination: elements.inclination.to_radians(),
            mean_anomaly: elements.mean_anomaly.to_radians(),
            arg_perigee: elements.argument_of_perigee.to_radians(),
            bstar: elements.drag_term,
            ndot2: elements.mean_motion_dot,
            revnum: elements.revolution_number as i64,
            constants,
        })
    }

    /// Evaluate the model for `qth` at Julian date `jd`.
    pub fn compute(&self, qth: &Qth, jd: f64) -> anyhow::Result<SatState> {
        let mins = minutes_since_epoch(jd, self.epoch_jd);
        let prediction = self
            .constants
            .propagate(sgp4::MinutesSinceEpoch(mins))
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("propagating {} to jd {:.5}", self.name, jd))?;

        let pos = prediction.position; // [f64; 3] in km (TEME)
        let eci = DVec3::new(pos[0], pos[1], pos[2]);
        let ecef = eci_to_ecef_km(eci, gmst_from_jd(jd));
        let geo = ecef_to_geodetic(ecef);
        let look = look_angles(&qth.geodetic(), ecef);

        Ok(SatState {
            jd,
            az: look.az,
            el: look.el,
            range: look.range,
            ssplat: geo.lat.to_degrees(),
            ssplon: wrap_lon_deg(geo.lon.to_degrees()),
            alt: geo.alt,
            footprint: footprint_km(geo.alt),
            orbit: self.orbit_number(jd),
        })
    }

    /// Revolution number at `jd`.
    pub fn orbit_number(&self, jd: f64) -> i64 {
        let age = jd - self.epoch_jd;
        ((self.meanmo + age * self.bstar * AE) * age + (self.mean_anomaly + self.arg_perigee) / TAU)
            .floor() as i64
            + self.revnum
    }

    pub fn is_geostationary(&self) -> bool {
        geostationary(self.meanmo)
    }

    pub fn is_decayed(&self, jd: f64) -> bool {
        decayed(self.epoch_jd, self.meanmo, self.ndot2, jd)
    }

    /// Whether the satellite can ever rise above the horizon of `qth`.
    pub fn has_aos(&self, qth: &Qth, jd: f64) -> bool {
        if self.is_geostationary() || self.is_decayed(jd) {
            return false;
        }
        orbit_reaches_latitude(self.meanmo, self.eccentricity, self.inclination, qth.lat)
    }
}

/// Diameter of the footprint (km) for a satellite at `alt` km.
pub fn footprint_km(alt: f64) -> f64 {
    12756.33 * (XKMPER / (XKMPER + alt)).min(1.0).acos()
}

pub fn geostationary(meanmo: f64) -> bool {
    (meanmo - 1.0027).abs() < 0.0002
}

pub fn decayed(epoch_jd: f64, meanmo: f64, ndot2: f64, jd: f64) -> bool {
    if ndot2 == 0.0 {
        return false;
    }
    epoch_jd + (16.666666 - meanmo) / (10.0 * ndot2.abs()) < jd
}

/// Whether an orbit with the given shape covers latitude `lat_deg`.
pub fn orbit_reaches_latitude(meanmo: f64, eccentricity: f64, incl_rad: f64, lat_deg: f64) -> bool {
    if meanmo == 0.0 {
        return false;
    }
    let mut lin = incl_rad;
    if lin >= FRAC_PI_2 {
        lin = PI - lin;
    }
    let sma = 331.25 * ((1440.0 / meanmo).ln() * (2.0 / 3.0)).exp();
    let apogee = sma * (1.0 + eccentricity) - XKMPER;
    (XKMPER / (apogee + XKMPER)).acos() + lin > lat_deg.to_radians().abs()
}
