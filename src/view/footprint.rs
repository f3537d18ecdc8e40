//! Range circle geometry on the world map
//!
//! The circle is sampled on its western half and mirrored in longitude to
//! get 360 device points. A ring that wraps around a pole or across the map
//! edge cannot be drawn as one closed polyline, so it is reshaped first:
//!
//! * pole covered: sorted by x and closed along the top or bottom map edge;
//! * crossing the map edge: split into two parts, one per map side;
//! * otherwise the ring is used as is.

use crate::core::coordinates::{XKMPER, arccos, qrb};
use crate::view::projection::{MapProjection, Ssp};
use std::cmp::Ordering;
use std::f64::consts::PI;
use tracing::{debug, error};

pub const FOOTPRINT_POINTS: usize = 360;

/// Longitude above which the sub-satellite point counts as sitting on the
/// map seam.
const SEAM_LON: f64 = 179.4;

/// Slack when comparing ring points against the sub-satellite x, whose
/// first sample lands on it up to rounding.
const SCAN_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootprintOutcome {
    Nominal,
    PoleCovered,
    Split,
}

/// Range circle in device coordinates, one or two polylines.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub parts: Vec<Vec<(f64, f64)>>,
    outcome: FootprintOutcome,
}

impl Footprint {
    pub fn outcome(&self) -> FootprintOutcome {
        self.outcome
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    fn single(points: Vec<(f64, f64)>, outcome: FootprintOutcome) -> Self {
        Self {
            parts: vec![points],
            outcome,
        }
    }
}

fn pole_covered(ssp: Ssp, footprint_km: f64, pole_lat: f64) -> bool {
    match qrb(ssp.lon, ssp.lat, 0.0, pole_lat) {
        Ok((dist, _)) => dist <= 0.5 * footprint_km,
        Err(e) => {
            error!("bad data measuring distance to pole {}: {}", pole_lat, e);
            false
        }
    }
}

pub fn north_pole_covered(ssp: Ssp, footprint_km: f64) -> bool {
    pole_covered(ssp, footprint_km, 90.0)
}

pub fn south_pole_covered(ssp: Ssp, footprint_km: f64) -> bool {
    pole_covered(ssp, footprint_km, -90.0)
}

fn in_half(lon: f64, mapbreak: f64) -> bool {
    (lon >= mapbreak && lon < mapbreak + 180.0) || (lon < mapbreak - 180.0 && lon >= mapbreak - 360.0)
}

/// Mirror `rangelon` to the east of `ssplon`.
///
/// Returns the mirrored longitude and whether the pair straddles the map
/// break at `mapbreak`, the longitude of the left map edge.
pub fn mirror_lon(ssplon: f64, rangelon: f64, mapbreak: f64) -> (f64, bool) {
    let mut diff = ssplon - rangelon;
    while diff < 0.0 {
        diff += 360.0;
    }
    while diff > 360.0 {
        diff -= 360.0;
    }

    let mut mlon = ssplon + diff.abs();
    while mlon > 180.0 {
        mlon -= 360.0;
    }
    while mlon < -180.0 {
        mlon += 360.0;
    }

    let warped = if in_half(ssplon, mapbreak) {
        !in_half(rangelon, mapbreak)
    } else {
        in_half(mlon, mapbreak)
    };
    (mlon, warped)
}

/// Range circle of a satellite at `ssp` with a footprint diameter in km.
pub fn calculate_footprint(ssp: Ssp, footprint_km: f64, map: &MapProjection) -> Footprint {
    let ssplat = ssp.lat.to_radians();
    let ssplon = ssp.lon.to_radians();
    let beta = 0.5 * footprint_km / XKMPER;
    let north = north_pole_covered(ssp, footprint_km);
    let south = south_pole_covered(ssp, footprint_km);

    let mut points = vec![(0.0, 0.0); FOOTPRINT_POINTS];
    let mut warped = false;

    for azi in 0..FOOTPRINT_POINTS / 2 {
        let azimuth = (azi as f64).to_radians();
        let rangelat = (ssplat.sin() * beta.cos() + azimuth.cos() * beta.sin() * ssplat.cos()).asin();
        let num = beta.cos() - ssplat.sin() * rangelat.sin();
        let dem = ssplat.cos() * rangelat.cos();

        let mut rangelon = if azi == 0 && north {
            ssplon + PI
        } else if (num / dem).abs() > 1.0 {
            ssplon
        } else {
            ssplon - arccos(num, dem)
        };
        while rangelon < -PI {
            rangelon += 2.0 * PI;
        }
        while rangelon > PI {
            rangelon -= 2.0 * PI;
        }

        let rangelat = rangelat.to_degrees();
        let rangelon = rangelon.to_degrees();
        let (mlon, w) = mirror_lon(ssp.lon, rangelon, map.left_side_lon);
        warped |= w;

        points[azi] = map.lonlat_to_xy(rangelon, rangelat);
        points[FOOTPRINT_POINTS - 1 - azi] = map.lonlat_to_xy(mlon, rangelat);
    }

    if north || south {
        sort_points_x(&mut points, ssp.lat, map);
        Footprint::single(points, FootprintOutcome::PoleCovered)
    } else if warped {
        let (sspx, _) = map.lonlat_to_xy(ssp.lon, ssp.lat);
        match split_points(&points, ssp.lon, sspx, map) {
            Some((p1, p2)) => Footprint {
                parts: vec![p1, p2],
                outcome: FootprintOutcome::Split,
            },
            None => {
                debug!("degenerate footprint split at lon {:.2}, drawing one part", ssp.lon);
                Footprint::single(points, FootprintOutcome::Nominal)
            }
        }
    } else {
        Footprint::single(points, FootprintOutcome::Nominal)
    }
}

fn by_x(a: &(f64, f64), b: &(f64, f64)) -> Ordering {
    a.0.total_cmp(&b.0)
}

fn by_y(a: &(f64, f64), b: &(f64, f64)) -> Ordering {
    a.1.total_cmp(&b.1)
}

/// Sort a pole-covering ring left to right and close it along the map edge
/// nearest the covered pole. The second and second-to-last points are
/// overwritten to make room for the edge points.
pub fn sort_points_x(points: &mut [(f64, f64)], ssplat: f64, map: &MapProjection) {
    let n = points.len();
    if n < 4 {
        return;
    }
    points.sort_by(by_x);

    let left = map.x0;
    let right = map.x0 + map.width;
    points[1] = (left, points[0].1);
    points[n - 2] = (right, points[n - 1].1);

    let edge_y = if ssplat > 0.0 { map.y0 } else { map.y0 + map.height };
    points[0] = (left, edge_y);
    points[n - 1] = (right, edge_y);
}

/// Split a ring that crosses the map edge into the part on each side.
///
/// `None` when one side would be empty.
pub fn split_points(
    points: &[(f64, f64)],
    ssplon: f64,
    sspx: f64,
    map: &MapProjection,
) -> Option<(Vec<(f64, f64)>, Vec<(f64, f64)>)> {
    let n = points.len();
    let mid = map.x0 + map.width / 2.0;
    let mut tps1 = Vec::with_capacity(n);
    let mut tps2 = Vec::with_capacity(n);

    if ssplon.abs() >= SEAM_LON {
        for &p in points {
            if p.0 > mid {
                tps1.push(p);
            } else {
                tps2.push(p);
            }
        }
        tps1.sort_by(by_y);
        tps2.sort_by(by_y);
    } else if sspx < mid {
        // forward from the first point east of the sub-satellite point
        let mut i = 0;
        while i < n && points[i].0 <= sspx + SCAN_EPS {
            i += 1;
        }
        let ns = i;
        while i < n && points[i].0 > mid {
            tps2.push(points[i]);
            i += 1;
        }
        tps1.extend_from_slice(&points[i..]);
        tps1.extend_from_slice(&points[..ns]);
    } else {
        // mirror image: backwards from the last point west of it
        let mut i = n;
        while i > 0 && points[i - 1].0 >= sspx - SCAN_EPS {
            i -= 1;
        }
        let ns = i;
        while i > 0 && points[i - 1].0 < mid {
            tps2.push(points[i - 1]);
            i -= 1;
        }
        tps1.extend(points[..i].iter().rev());
        tps1.extend(points[ns..].iter().rev());
    }

    if tps1.is_empty() || tps2.is_empty() {
        return None;
    }

    let left = map.x0;
    let right = map.x0 + map.width;
    let (x1, x2) = if tps1[0].0 > mid { (right, left) } else { (left, right) };
    stretch_ends(&mut tps1, x1);
    stretch_ends(&mut tps2, x2);
    Some((tps1, tps2))
}

fn stretch_ends(part: &mut [(f64, f64)], x: f64) {
    if let Some(first) = part.first_mut() {
        first.0 = x;
    }
    if let Some(last) = part.last_mut() {
        last.0 = x;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> MapProjection {
        let mut m = MapProjection::new(0.0, false);
        m.resize(720, 360);
        m
    }

    const LEO_FOOTPRINT: f64 = 4500.0;

    #[test]
    fn test_nominal_circle_is_one_ring() {
        let fp = calculate_footprint(Ssp { lat: 10.0, lon: 20.0 }, LEO_FOOTPRINT, &map());
        assert_eq!(fp.outcome(), FootprintOutcome::Nominal);
        assert_eq!(fp.part_count(), 1);
        assert_eq!(fp.parts[0].len(), FOOTPRINT_POINTS);
        // ring is centred on the sub-satellite point
        let (sx, _) = map().lonlat_to_xy(20.0, 10.0);
        let mean_x = fp.parts[0].iter().map(|p| p.0).sum::<f64>() / FOOTPRINT_POINTS as f64;
        assert!((mean_x - sx).abs() < 2.0);
    }

    #[test]
    fn test_pole_covered_closes_along_top_edge() {
        let m = map();
        let fp = calculate_footprint(Ssp { lat: 80.0, lon: 30.0 }, LEO_FOOTPRINT, &m);
        assert_eq!(fp.outcome(), FootprintOutcome::PoleCovered);
        let ring = &fp.parts[0];
        assert_eq!(ring.len(), FOOTPRINT_POINTS);
        assert_eq!(ring[0], (m.x0, m.y0));
        assert_eq!(ring[FOOTPRINT_POINTS - 1], (m.x0 + m.width, m.y0));
        assert_eq!(ring[1].0, m.x0);
        assert_eq!(ring[FOOTPRINT_POINTS - 2].0, m.x0 + m.width);
        assert!(ring.windows(2).skip(1).take(FOOTPRINT_POINTS - 4).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_south_pole_closes_along_bottom_edge() {
        let m = map();
        let fp = calculate_footprint(Ssp { lat: -82.0, lon: -100.0 }, LEO_FOOTPRINT, &m);
        assert_eq!(fp.outcome(), FootprintOutcome::PoleCovered);
        assert_eq!(fp.parts[0][0], (m.x0, m.y0 + m.height));
    }

    #[test]
    fn test_edge_crossing_splits_in_two() {
        let m = map();
        for lon in [170.0, -172.0, 179.8] {
            let fp = calculate_footprint(Ssp { lat: 5.0, lon }, LEO_FOOTPRINT, &m);
            assert_eq!(fp.outcome(), FootprintOutcome::Split, "lon {}", lon);
            assert_eq!(fp.part_count(), 2);
            let total: usize = fp.parts.iter().map(Vec::len).sum();
            assert_eq!(total, FOOTPRINT_POINTS);
            let edges: Vec<f64> = fp.parts.iter().map(|p| p[0].0).collect();
            assert!(edges.contains(&m.x0) && edges.contains(&(m.x0 + m.width)));
            for part in &fp.parts {
                assert_eq!(part[0].0, part[part.len() - 1].0);
            }
        }
    }

    #[test]
    fn test_outcomes_are_exclusive() {
        let m = map();
        for lat in (-85..=85).step_by(17) {
            for lon in (-180..180).step_by(23) {
                let ssp = Ssp {
                    lat: lat as f64,
                    lon: lon as f64,
                };
                let fp = calculate_footprint(ssp, LEO_FOOTPRINT, &m);
                let pole = north_pole_covered(ssp, LEO_FOOTPRINT) || south_pole_covered(ssp, LEO_FOOTPRINT);
                match fp.outcome() {
                    FootprintOutcome::PoleCovered => assert!(pole),
                    FootprintOutcome::Split => {
                        assert!(!pole);
                        assert_eq!(fp.part_count(), 2);
                    }
                    FootprintOutcome::Nominal => assert_eq!(fp.part_count(), 1),
                }
            }
        }
    }

    #[test]
    fn test_ring_invariants_across_maps() {
        let mut maps = Vec::new();
        for (clon, keep_ratio, w, h) in [(0.0, false, 720, 360), (45.0, false, 720, 360), (-90.0, true, 800, 300)] {
            let mut m = MapProjection::new(clon, keep_ratio);
            m.resize(w, h);
            maps.push(m);
        }

        for m in &maps {
            for lat in (-90..=90).step_by(5) {
                for lon in (-180..180).step_by(15) {
                    for km in [1.0, 500.0, 4500.0, 10_000.0, 15_000.0, 20_000.0] {
                        let ssp = Ssp {
                            lat: lat as f64,
                            lon: lon as f64,
                        };
                        let fp = calculate_footprint(ssp, km, m);
                        let total: usize = fp.parts.iter().map(Vec::len).sum();
                        assert_eq!(total, FOOTPRINT_POINTS, "lat {} lon {} km {}", lat, lon, km);

                        for &(x, y) in fp.parts.iter().flatten() {
                            assert!(x.is_finite() && y.is_finite(), "lat {} lon {} km {}", lat, lon, km);
                            assert!(x >= m.x0 - 1e-9 && x <= m.x0 + m.width + 1e-9, "x {} off the map", x);
                        }

                        let pole = north_pole_covered(ssp, km) || south_pole_covered(ssp, km);
                        match fp.outcome() {
                            FootprintOutcome::PoleCovered => {
                                assert!(pole);
                                assert_eq!(fp.part_count(), 1);
                            }
                            FootprintOutcome::Split => {
                                assert!(!pole);
                                assert_eq!(fp.part_count(), 2);
                            }
                            FootprintOutcome::Nominal => assert_eq!(fp.part_count(), 1),
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_letterboxed_map_splits_at_edge() {
        let mut m = MapProjection::new(0.0, true);
        m.resize(800, 300);
        assert_eq!(m.x0, 100.0);

        let fp = calculate_footprint(Ssp { lat: 5.0, lon: 170.0 }, LEO_FOOTPRINT, &m);
        assert_eq!(fp.outcome(), FootprintOutcome::Split);
        let edges: Vec<f64> = fp.parts.iter().map(|p| p[0].0).collect();
        assert!(edges.contains(&m.x0) && edges.contains(&(m.x0 + m.width)));
    }

    #[test]
    fn test_mirror_lon() {
        let (mlon, warped) = mirror_lon(10.0, -5.0, -180.0);
        assert!((mlon - 25.0).abs() < 1e-9);
        assert!(!warped);

        let (mlon, warped) = mirror_lon(175.0, 165.0, -180.0);
        assert!((mlon - -175.0).abs() < 1e-9);
        assert!(warped);
    }

    #[test]
    fn test_split_scans_are_bounded() {
        let m = map();
        // every point left of the sub-satellite point: nothing to split
        let pts = vec![(10.0, 10.0); 8];
        assert!(split_points(&pts, 0.0, 700.0, &m).is_none());
        assert!(split_points(&pts, 0.0, 5.0, &m).is_none());
        assert!(split_points(&[], 0.0, 5.0, &m).is_none());
    }

    #[test]
    fn test_degenerate_footprint_does_not_panic() {
        let m = map();
        for fp_km in [0.0, 1.0, 40_000.0] {
            let fp = calculate_footprint(Ssp { lat: 0.0, lon: 0.0 }, fp_km, &m);
            assert!(!fp.parts.is_empty());
        }
    }
}
