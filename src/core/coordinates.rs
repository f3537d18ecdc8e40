//! Core coordinate utilities
//!
//! Earth model constants, time conversions and the frame transformations used
//! by the orbit engine:
//! - Julian dates and Greenwich sidereal time
//! - TEME (ECI) -> Earth-fixed rotation
//! - Earth-fixed position -> geodetic latitude/longitude/altitude (WGS-72)
//! - Observer-relative azimuth/elevation/range
//! - Great-circle distance and bearing between two geographic points

use chrono::{DateTime, Datelike, Timelike, Utc};
use glam::DVec3;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use thiserror::Error;

/// WGS-72 equatorial radius used by the SGP4 family of models (km).
pub const XKMPER: f64 = 6378.135;
/// WGS-72 flattening.
pub const FLATTENING: f64 = 3.352_810_664_747_48e-3;
/// Distance units per Earth radius.
pub const AE: f64 = 1.0;
/// Minutes per day.
pub const XMNPDA: f64 = 1440.0;
/// Kilometres per degree of great-circle arc.
pub const ARC_IN_KM: f64 = 111.2;

/// Julian date of the Unix epoch.
const JD_UNIX_EPOCH: f64 = 2_440_587.5;

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),
}

/// Geodetic position on the WGS-72 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    /// Latitude, radians north
    pub lat: f64,
    /// Longitude, radians east in [-π, π]
    pub lon: f64,
    /// Altitude above the ellipsoid, km
    pub alt: f64,
}

impl Geodetic {
    pub fn from_degrees(lat_deg: f64, lon_deg: f64, alt_km: f64) -> Self {
        Self {
            lat: lat_deg.to_radians(),
            lon: lon_deg.to_radians(),
            alt: alt_km,
        }
    }
}

/// Topocentric look angles from an observer to a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    /// Azimuth, degrees clockwise from north in [0, 360)
    pub az: f64,
    /// Elevation, degrees above the horizon
    pub el: f64,
    /// Slant range, km
    pub range: f64,
}

// ========================= Time =========================

/// Compute the Julian Date (UTC) for a given timestamp.
/// Uses the standard Gregorian calendar to JD conversion.
pub fn julian_date_utc(t: DateTime<Utc>) -> f64 {
    let mut y = t.year();
    let mut m = t.month() as i32;
    let d = t.day() as i32;

    // Convert time of day to fraction of day
    let hour = t.hour() as f64;
    let minute = t.minute() as f64;
    let sec = t.second() as f64 + (t.nanosecond() as f64) * 1e-9_f64;
    let day_fraction = (hour + (minute + sec / 60.0) / 60.0) / 24.0;

    if m <= 2 {
        y -= 1;
        m += 12;
    }

    let a = (y as f64 / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    let jd0 = (365.25 * (y as f64 + 4716.0)).floor()
        + (30.6001 * ((m + 1) as f64)).floor()
        + d as f64
        + b
        - 1524.5;

    jd0 + day_fraction
}

/// Inverse of [`julian_date_utc`], rounded to the millisecond.
pub fn julian_date_to_utc(jd: f64) -> Option<DateTime<Utc>> {
    let millis = ((jd - JD_UNIX_EPOCH) * 86_400_000.0).round();
    if !millis.is_finite() {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
}

/// Greenwich Mean Sidereal Time (radians) for a Julian date, IAU 1982 polynomial.
/// Assumes UT1 ~= UTC.
pub fn gmst_from_jd(jd: f64) -> f64 {
    let t_cent = (jd - 2451545.0) / 36525.0; // Julian centuries from J2000.0

    // GMST in seconds (IAU 1982 with update terms). See Vallado and IERS Conventions.
    let gmst_sec =
        67310.54841 + (876600.0 * 3600.0 + 8640184.812866) * t_cent + 0.093104 * t_cent * t_cent
            - 6.2e-6 * t_cent * t_cent * t_cent;

    // Normalize to [0, 86400)
    let sec_in_day = 86400.0_f64;
    let mut s = gmst_sec % sec_in_day;
    if s < 0.0 {
        s += sec_in_day;
    }

    s * (TAU / sec_in_day)
}

/// Greenwich Mean Sidereal Time (radians) for a UTC timestamp.
pub fn gmst_rad(t: DateTime<Utc>) -> f64 {
    gmst_from_jd(julian_date_utc(t))
}

// ========================= Frames =========================

/// Rotate ECI (TEME) -> ECEF using simple GMST rotation about Z
/// Standard transformation rotates by -GMST (clockwise when viewed from +Z)
pub fn eci_to_ecef_km(eci: DVec3, gmst: f64) -> DVec3 {
    let (s, c) = gmst.sin_cos();
    let x = c * eci.x + s * eci.y;
    let y = -s * eci.x + c * eci.y;
    DVec3::new(x, y, eci.z)
}

/// Earth-fixed position (km) -> geodetic coordinates.
///
/// Iterates the latitude on the WGS-72 ellipsoid until it converges to
/// 1e-10 rad.
pub fn ecef_to_geodetic(ecef: DVec3) -> Geodetic {
    let r = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    let e2 = FLATTENING * (2.0 - FLATTENING);
    let lon = ecef.y.atan2(ecef.x);

    let mut lat = ecef.z.atan2(r);
    let mut c = 1.0;
    for _ in 0..20 {
        let phi = lat;
        let s = phi.sin();
        c = 1.0 / (1.0 - e2 * s * s).sqrt();
        lat = (ecef.z + XKMPER * c * e2 * s).atan2(r);
        if (lat - phi).abs() < 1e-10 {
            break;
        }
    }

    let alt = if lat.cos().abs() > 1e-12 {
        r / lat.cos() - XKMPER * c
    } else {
        // on the polar axis
        ecef.z.abs() - XKMPER * (1.0 - FLATTENING)
    };

    if lat > FRAC_PI_2 {
        lat -= TAU;
    }

    Geodetic { lat, lon, alt }
}

/// Geodetic coordinates -> Earth-fixed position (km).
pub fn geodetic_to_ecef(geo: &Geodetic) -> DVec3 {
    let (sin_lat, cos_lat) = geo.lat.sin_cos();
    let c = 1.0 / (1.0 + FLATTENING * (FLATTENING - 2.0) * sin_lat * sin_lat).sqrt();
    let sq = (1.0 - FLATTENING) * (1.0 - FLATTENING) * c;
    let achcp = (XKMPER * c + geo.alt) * cos_lat;
    DVec3::new(
        achcp * geo.lon.cos(),
        achcp * geo.lon.sin(),
        (XKMPER * sq + geo.alt) * sin_lat,
    )
}

/// Azimuth, elevation and range from an observer to an Earth-fixed target.
pub fn look_angles(observer: &Geodetic, target_ecef: DVec3) -> LookAngles {
    let obs = geodetic_to_ecef(observer);
    let rho = target_ecef - obs;
    let range = rho.length();

    let (sin_lat, cos_lat) = observer.lat.sin_cos();
    let (sin_lon, cos_lon) = observer.lon.sin_cos();

    let top_s = sin_lat * cos_lon * rho.x + sin_lat * sin_lon * rho.y - cos_lat * rho.z;
    let top_e = -sin_lon * rho.x + cos_lon * rho.y;
    let top_z = cos_lat * cos_lon * rho.x + cos_lat * sin_lon * rho.y + sin_lat * rho.z;

    let mut az = top_e.atan2(-top_s);
    if az < 0.0 {
        az += TAU;
    }
    let el = if range > 0.0 {
        (top_z / range).clamp(-1.0, 1.0).asin()
    } else {
        FRAC_PI_2
    };

    LookAngles {
        az: az.to_degrees(),
        el: el.to_degrees(),
        range,
    }
}

// ========================= Geographic helpers =========================

/// Wrap an angle in degrees into [-180, 180].
pub fn wrap_lon_deg(mut lon: f64) -> f64 {
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

/// Great-circle distance (km) and initial bearing (degrees) from point 1 to point 2.
///
/// Inputs are degrees, longitudes east-positive.
pub fn qrb(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Result<(f64, f64), GeoError> {
    for lat in [lat1, lat2] {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
    }
    for lon in [lon1, lon2] {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::InvalidLongitude(lon));
        }
    }

    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let delta_lon = (lon2 - lon1).to_radians();
    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_lat2, cos_lat2) = lat2.sin_cos();

    let cos_arc = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * delta_lon.cos();

    // same point
    if cos_arc > 0.999_999_999_999_999 {
        return Ok((0.0, 0.0));
    }
    // antipodal
    if cos_arc < -0.999_999 {
        return Ok((180.0 * ARC_IN_KM, 0.0));
    }

    let arc = cos_arc.acos();
    let distance = ARC_IN_KM * arc.to_degrees();

    let y = delta_lon.sin() * cos_lat2;
    let x = cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * delta_lon.cos();
    let mut azimuth = y.atan2(x).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }

    Ok((distance, azimuth))
}

/// `acos(x / y)` guarded against a zero divisor, returning 0 instead of NaN.
pub fn arccos(x: f64, y: f64) -> f64 {
    if x != 0.0 && y != 0.0 {
        if y > 0.0 {
            return (x / y).acos();
        }
        if y < 0.0 {
            return PI + (x / y).acos();
        }
    }
    0.0
}

// =================================== Tests ===================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_julian_date_j2000() {
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((julian_date_utc(t) - 2451545.0).abs() < EPS);
    }

    #[test]
    fn test_julian_date_round_trip() {
        let t = Utc.with_ymd_and_hms(2024, 3, 10, 6, 30, 15).unwrap();
        let back = julian_date_to_utc(julian_date_utc(t)).expect("valid date");
        assert!((back - t).num_milliseconds().abs() <= 1);
    }

    #[test]
    fn test_gmst_at_j2000() {
        // GMST at J2000.0 is ~280.46 degrees
        let gmst = gmst_from_jd(2451545.0).to_degrees();
        assert!((gmst - 280.46061837).abs() < 1e-3, "gmst {}", gmst);
    }

    #[test]
    fn test_gmst_rad_matches_jd_variant() {
        let t = Utc.with_ymd_and_hms(2023, 7, 1, 18, 0, 0).unwrap();
        assert!((gmst_rad(t) - gmst_from_jd(julian_date_utc(t))).abs() < EPS);
    }

    #[test]
    fn test_eci_to_ecef_rotation() {
        let eci = DVec3::new(7000.0, 0.0, 100.0);
        let ecef = eci_to_ecef_km(eci, FRAC_PI_2);
        assert!((ecef.x).abs() < 1e-9);
        assert!((ecef.y + 7000.0).abs() < 1e-9);
        assert!((ecef.z - 100.0).abs() < 1e-12);
        assert!((ecef.length() - eci.length()).abs() < 1e-9);
    }

    #[test]
    fn test_geodetic_round_trip() {
        let geo = Geodetic::from_degrees(55.7, 12.5, 0.4);
        let back = ecef_to_geodetic(geodetic_to_ecef(&geo));
        assert!((back.lat - geo.lat).abs() < 1e-9);
        assert!((back.lon - geo.lon).abs() < 1e-9);
        assert!((back.alt - geo.alt).abs() < 1e-6);
    }

    #[test]
    fn test_geodetic_equator_altitude() {
        let geo = ecef_to_geodetic(DVec3::new(XKMPER + 400.0, 0.0, 0.0));
        assert!(geo.lat.abs() < 1e-12);
        assert!(geo.lon.abs() < 1e-12);
        assert!((geo.alt - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_look_angles_zenith() {
        let obs = Geodetic::from_degrees(10.0, 20.0, 0.0);
        let above = geodetic_to_ecef(&Geodetic::from_degrees(10.0, 20.0, 500.0));
        let look = look_angles(&obs, above);
        assert!((look.el - 90.0).abs() < 1e-3, "el {}", look.el);
        assert!((look.range - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_look_angles_cardinal_directions() {
        let obs = Geodetic::from_degrees(0.0, 0.0, 0.0);
        let north = geodetic_to_ecef(&Geodetic::from_degrees(5.0, 0.0, 800.0));
        let east = geodetic_to_ecef(&Geodetic::from_degrees(0.0, 5.0, 800.0));
        let az_n = look_angles(&obs, north).az;
        let az_e = look_angles(&obs, east).az;
        assert!(az_n < 1e-6 || (360.0 - az_n) < 1e-6, "north az {}", az_n);
        assert!((az_e - 90.0).abs() < 1e-6, "east az {}", az_e);
    }

    #[test]
    fn test_qrb_quarter_meridian() {
        let (dist, az) = qrb(0.0, 0.0, 0.0, 90.0).unwrap();
        assert!((dist - 90.0 * ARC_IN_KM).abs() < 1e-6);
        assert!(az.abs() < 1e-9);
    }

    #[test]
    fn test_qrb_bearing_east() {
        let (_, az) = qrb(0.0, 0.0, 10.0, 0.0).unwrap();
        assert!((az - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_qrb_same_point_and_invalid() {
        assert_eq!(qrb(12.0, 55.0, 12.0, 55.0).unwrap(), (0.0, 0.0));
        assert_eq!(
            qrb(0.0, 91.0, 0.0, 0.0),
            Err(GeoError::InvalidLatitude(91.0))
        );
        assert_eq!(
            qrb(0.0, 0.0, 181.0, 0.0),
            Err(GeoError::InvalidLongitude(181.0))
        );
    }

    #[test]
    fn test_arccos_guarded() {
        assert_eq!(arccos(0.0, 1.0), 0.0);
        assert_eq!(arccos(0.5, 0.0), 0.0);
        assert!((arccos(0.5, 1.0) - (0.5f64).acos()).abs() < EPS);
        assert!((arccos(0.5, -1.0) - (PI + (-0.5f64).acos())).abs() < EPS);
    }

    #[test]
    fn test_wrap_lon_deg() {
        assert!((wrap_lon_deg(190.0) + 170.0).abs() < EPS);
        assert!((wrap_lon_deg(-540.0) + 180.0).abs() < EPS);
        assert!((wrap_lon_deg(45.0) - 45.0).abs() < EPS);
    }
}
