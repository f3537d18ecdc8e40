//! Ground tracks on the world map
//!
//! A track covers a whole number of orbits starting with the current one.
//! The sub-satellite points are kept in lat/lon so the polylines can be
//! rebuilt after a resize without propagating again.

use crate::config::Rgba;
use crate::orbital::observer::Qth;
use crate::orbital::snapshot::{OrbitPredictor, SatelliteSnapshot};
use crate::view::projection::{MapProjection, Ssp};
use crate::view::surface::{DrawingSurface, ItemHandle};
use thiserror::Error;
use tracing::{debug, error};

/// Backward search step for the start of the orbit, ~1 minute.
const ORBIT_START_STEP: f64 = 0.0007;
/// Sampling step along the track, ~30 seconds.
const TRACK_STEP: f64 = 0.00035;
/// Upper bound on samples, far beyond any sensible orbit count.
const MAX_SAMPLES: usize = 200_000;
/// Minimum device distance between consecutive track vertices.
const MIN_VERTEX_DIST: f64 = 1.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackError {
    #[error("ground track for {name} ended in orbit {got}, expected {expected}")]
    OrbitMismatch { name: String, expected: i64, got: i64 },
    #[error("could not propagate {name} at {jd}")]
    Propagation { name: String, jd: f64 },
    #[error("{0} has decayed")]
    Decayed(String),
}

/// Sub-satellite points for `num_orbits` orbits starting with the current one.
pub fn compute_ground_track(
    predictor: &dyn OrbitPredictor,
    sat: &SatelliteSnapshot,
    qth: &Qth,
    now: f64,
    num_orbits: u32,
) -> Result<Vec<Ssp>, TrackError> {
    if sat.decayed {
        return Err(TrackError::Decayed(sat.nickname.clone()));
    }
    let sample = |t: f64| {
        predictor.sample(sat.catnum, qth, t).ok_or_else(|| TrackError::Propagation {
            name: sat.nickname.clone(),
            jd: t,
        })
    };

    let this_orbit = sat.orbit;
    let max_orbit = this_orbit - 1 + num_orbits as i64;
    debug!("ground track for {}: orbits {}..={}", sat.nickname, this_orbit, max_orbit);

    // back to the last sample of the previous orbit, at most one day
    let mut orbit = this_orbit;
    let mut t = now;
    while orbit == this_orbit && t + 1.0 > now {
        orbit = sample(t)?.orbit;
        t -= ORBIT_START_STEP;
    }
    t += 2.0 * ORBIT_START_STEP;

    let mut s = sample(t)?;
    let mut points = Vec::new();
    while s.orbit <= max_orbit && s.orbit >= this_orbit && !s.decayed && points.len() < MAX_SAMPLES {
        t += TRACK_STEP;
        s = sample(t)?;
        points.push(Ssp { lat: s.lat, lon: s.lon });
    }

    if s.orbit != max_orbit + 1 {
        let err = TrackError::OrbitMismatch {
            name: sat.nickname.clone(),
            expected: max_orbit + 1,
            got: s.orbit,
        };
        error!("{}", err);
        return Err(err);
    }
    Ok(points)
}

fn wrap_detected(map: &MapProjection, x1: f64, x2: f64) -> bool {
    (x1 - x2).abs() > map.width / 2.0
}

/// Split a track into polylines that never jump across the map edge,
/// dropping vertices closer than a device unit to the previous one.
pub fn create_polylines(points: &[Ssp], map: &MapProjection) -> Vec<Vec<(f64, f64)>> {
    let mut lines = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    let (mut lastx, mut lasty) = (-50.0, -50.0);

    for (i, ssp) in points.iter().enumerate() {
        let (x, y) = map.lonlat_to_xy(ssp.lon, ssp.lat);
        if i == 0 {
            current.push((x, y));
        } else if wrap_detected(map, lastx, x) {
            if current.len() > 1 {
                lines.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
            current.push((x, y));
        } else if (lastx - x).abs() > MIN_VERTEX_DIST || (lasty - y).abs() > MIN_VERTEX_DIST {
            current.push((x, y));
        } else {
            continue;
        }
        lastx = x;
        lasty = y;
    }

    if current.len() > 1 {
        lines.push(current);
    }
    lines
}

/// A satellite's ground track and the polylines drawing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundTrack {
    pub latlon: Vec<Ssp>,
    pub lines: Vec<ItemHandle>,
    /// Orbit the track was computed in.
    pub orbit: i64,
}

impl GroundTrack {
    /// Propagate and draw a new track below `marker`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        predictor: &dyn OrbitPredictor,
        sat: &SatelliteSnapshot,
        qth: &Qth,
        now: f64,
        num_orbits: u32,
        map: &MapProjection,
        surface: &mut dyn DrawingSurface,
        marker: ItemHandle,
        colour: Rgba,
    ) -> Result<Self, TrackError> {
        let mut track = Self {
            latlon: compute_ground_track(predictor, sat, qth, now, num_orbits)?,
            lines: Vec::new(),
            orbit: sat.orbit,
        };
        track.rebuild_lines(map, surface, marker, colour);
        Ok(track)
    }

    /// Re-segment the cached points, e.g. after the map changed size.
    pub fn rebuild_lines(
        &mut self,
        map: &MapProjection,
        surface: &mut dyn DrawingSurface,
        marker: ItemHandle,
        colour: Rgba,
    ) {
        self.remove_lines(surface);
        for points in create_polylines(&self.latlon, map) {
            let line = surface.create_polyline(&points, colour, Rgba::TRANSPARENT);
            surface.lower_below(line, marker);
            self.lines.push(line);
        }
    }

    fn remove_lines(&mut self, surface: &mut dyn DrawingSurface) {
        for line in self.lines.drain(..) {
            surface.remove(line);
        }
    }

    pub fn delete(mut self, surface: &mut dyn DrawingSurface) {
        self.remove_lines(surface);
    }
}
