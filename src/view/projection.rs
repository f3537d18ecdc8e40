//! Device coordinate transforms for the polar chart and the world map

use crate::core::coordinates::wrap_lon_deg;
use std::f64::consts::PI;

/// Sub-satellite point in degrees, longitude east-positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ssp {
    pub lat: f64,
    pub lon: f64,
}

/// Space between the horizon circle and the edge of the polar view.
pub const POLAR_MARGIN: f64 = 25.0;

/// Where north, east, south and west sit on the polar chart, read clockwise
/// from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolarOrientation {
    #[default]
    Nesw,
    Nwse,
    Senw,
    Swne,
}

impl PolarOrientation {
    pub fn from_config(value: i64) -> Self {
        match value {
            1 => Self::Nwse,
            2 => Self::Senw,
            3 => Self::Swne,
            _ => Self::Nesw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarProjection {
    pub cx: f64,
    pub cy: f64,
    /// Radius of the horizon circle.
    pub r: f64,
    pub size: u32,
    pub orientation: PolarOrientation,
}

impl PolarProjection {
    pub fn new(orientation: PolarOrientation) -> Self {
        Self {
            cx: 0.0,
            cy: 0.0,
            r: 0.0,
            size: 0,
            orientation,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = width.min(height);
        self.r = (self.size / 2) as f64 - POLAR_MARGIN;
        self.cx = (width / 2) as f64;
        self.cy = (height / 2) as f64;
    }

    /// Azimuth and elevation in degrees to device coordinates.
    ///
    /// Below the horizon the result is `(0, 0)`; callers only plot
    /// satellites that are up.
    pub fn azel_to_xy(&self, az: f64, el: f64) -> (f64, f64) {
        if el < 0.0 {
            return (0.0, 0.0);
        }
        let az = az.to_radians();
        let el = el.to_radians();
        let rel = self.r - 2.0 * self.r * el / PI;

        let az = match self.orientation {
            PolarOrientation::Nesw => az,
            PolarOrientation::Nwse => 2.0 * PI - az,
            PolarOrientation::Senw => PI - az,
            PolarOrientation::Swne => PI + az,
        };

        (self.cx + rel * az.sin(), self.cy - rel * az.cos())
    }

    /// Device coordinates to (az, el) in degrees.
    pub fn xy_to_azel(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.cx;
        let dy = self.cy - y;
        let dist = dx.hypot(dy);
        let el = 90.0 * (self.r - dist) / self.r;

        let mut az = dx.atan2(dy).to_degrees();
        if x < self.cx {
            az += 360.0;
        }

        let az = match self.orientation {
            PolarOrientation::Nesw => az,
            PolarOrientation::Nwse => 360.0 - az,
            PolarOrientation::Senw if az <= 180.0 => 180.0 - az,
            PolarOrientation::Senw => 540.0 - az,
            PolarOrientation::Swne if az >= 180.0 => az - 180.0,
            PolarOrientation::Swne => 180.0 + az,
        };
        (az, el)
    }

    /// Text for the cursor readout, empty outside the horizon circle.
    pub fn cursor_text(&self, x: f64, y: f64) -> String {
        let (az, el) = self.xy_to_azel(x, y);
        if el > 0.0 {
            format!("AZ {:.0}\u{b0}\nEL {:.0}\u{b0}", az, el)
        } else {
            String::new()
        }
    }
}

/// Equirectangular world map placed inside the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapProjection {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
    pub height: f64,
    /// Longitude at the left map edge, set from the centre longitude.
    pub left_side_lon: f64,
    pub keep_ratio: bool,
    /// Width over height of the background map.
    pub ratio: f64,
}

impl Default for MapProjection {
    fn default() -> Self {
        Self {
            x0: 0.0,
            y0: 0.0,
            width: 0.0,
            height: 0.0,
            left_side_lon: -180.0,
            keep_ratio: false,
            ratio: 2.0,
        }
    }
}

impl MapProjection {
    pub fn new(center_lon: f64, keep_ratio: bool) -> Self {
        let mut proj = Self {
            keep_ratio,
            ..Self::default()
        };
        proj.set_center_lon(center_lon);
        proj
    }

    pub fn set_center_lon(&mut self, clon: f64) {
        self.left_side_lon = if clon > 0.0 {
            -180.0 + clon
        } else if clon < 0.0 {
            180.0 + clon
        } else {
            -180.0
        };
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.keep_ratio {
            let size = (width as f64).min(self.ratio * height as f64).floor();
            self.width = size;
            self.height = (size / self.ratio).floor();
            self.x0 = ((width as f64 - self.width) / 2.0).floor();
            self.y0 = ((height as f64 - self.height) / 2.0).floor();
        } else {
            self.x0 = 0.0;
            self.y0 = 0.0;
            self.width = width as f64;
            self.height = height as f64;
        }
    }

    /// Longitude and latitude in degrees to device coordinates.
    pub fn lonlat_to_xy(&self, lon: f64, lat: f64) -> (f64, f64) {
        let mut x = self.x0 + (lon - self.left_side_lon) * self.width / 360.0;
        let y = self.y0 + (90.0 - lat) * self.height / 180.0;
        if self.width > 0.0 {
            while x < self.x0 {
                x += self.width;
            }
            while x > self.x0 + self.width {
                x -= self.width;
            }
        }
        (x, y)
    }

    pub fn xy_to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        let lat = 90.0 - (180.0 / self.height) * (y - self.y0);
        let lon = wrap_lon_deg((360.0 / self.width) * (x - self.x0) + self.left_side_lon);
        (lon, lat)
    }

    pub fn cursor_text(&self, x: f64, y: f64) -> String {
        let (lon, lat) = self.xy_to_lonlat(x, y);
        format!("LON:{:.0}\u{b0} LAT:{:.0}\u{b0}", lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPS: f64 = 1e-9;

    fn unit(orientation: PolarOrientation) -> PolarProjection {
        PolarProjection {
            cx: 0.0,
            cy: 0.0,
            r: 1.0,
            size: 2,
            orientation,
        }
    }

    #[test]
    fn test_orientation_from_config() {
        assert_eq!(PolarOrientation::from_config(0), PolarOrientation::Nesw);
        assert_eq!(PolarOrientation::from_config(1), PolarOrientation::Nwse);
        assert_eq!(PolarOrientation::from_config(2), PolarOrientation::Senw);
        assert_eq!(PolarOrientation::from_config(3), PolarOrientation::Swne);
        assert_eq!(PolarOrientation::from_config(17), PolarOrientation::Nesw);
    }

    #[test]
    fn test_orientation_reference_values() {
        // az=90, el=45 on a unit chart: r_el = 0.5
        let (x, y) = unit(PolarOrientation::Nesw).azel_to_xy(90.0, 45.0);
        assert_relative_eq!(x, 0.5, epsilon = EPS);
        assert_relative_eq!(y, 0.0, epsilon = EPS);

        let (x, y) = unit(PolarOrientation::Nwse).azel_to_xy(90.0, 45.0);
        assert_relative_eq!(x, -0.5, epsilon = EPS);
        assert_relative_eq!(y, 0.0, epsilon = EPS);

        let (x, y) = unit(PolarOrientation::Senw).azel_to_xy(30.0, 45.0);
        assert_relative_eq!(x, 0.5 * (150f64).to_radians().sin(), epsilon = EPS);
        assert_relative_eq!(y, -0.5 * (150f64).to_radians().cos(), epsilon = EPS);

        let (x, y) = unit(PolarOrientation::Swne).azel_to_xy(30.0, 45.0);
        assert_relative_eq!(x, 0.5 * (210f64).to_radians().sin(), epsilon = EPS);
        assert_relative_eq!(y, -0.5 * (210f64).to_radians().cos(), epsilon = EPS);
    }

    #[test]
    fn test_orientations_distinct_away_from_zenith() {
        let modes = [
            PolarOrientation::Nesw,
            PolarOrientation::Nwse,
            PolarOrientation::Senw,
            PolarOrientation::Swne,
        ];
        let pts: Vec<_> = modes.iter().map(|m| unit(*m).azel_to_xy(60.0, 20.0)).collect();
        for i in 0..pts.len() {
            for j in (i + 1)..pts.len() {
                let d = (pts[i].0 - pts[j].0).hypot(pts[i].1 - pts[j].1);
                assert!(d > 1e-6, "{:?} and {:?} coincide", modes[i], modes[j]);
            }
        }
        // zenith is the centre for every mode
        for m in modes {
            let (x, y) = unit(m).azel_to_xy(123.0, 90.0);
            assert!(x.abs() < EPS && y.abs() < EPS);
        }
    }

    #[test]
    fn test_below_horizon_sentinel() {
        let mut p = PolarProjection::new(PolarOrientation::Nesw);
        p.resize(300, 200);
        assert_eq!(p.azel_to_xy(45.0, -0.1), (0.0, 0.0));
    }

    #[test]
    fn test_polar_resize_integer_division() {
        let mut p = PolarProjection::new(PolarOrientation::Nesw);
        p.resize(301, 201);
        assert_eq!(p.size, 201);
        assert_relative_eq!(p.r, 75.0);
        assert_relative_eq!(p.cx, 150.0);
        assert_relative_eq!(p.cy, 100.0);
    }

    #[test]
    fn test_polar_round_trip_all_orientations() {
        for m in [
            PolarOrientation::Nesw,
            PolarOrientation::Nwse,
            PolarOrientation::Senw,
            PolarOrientation::Swne,
        ] {
            let mut p = PolarProjection::new(m);
            p.resize(400, 400);
            for &(az, el) in &[(10.0, 5.0), (95.0, 30.0), (200.0, 60.0), (350.0, 80.0)] {
                let (x, y) = p.azel_to_xy(az, el);
                let (az2, el2) = p.xy_to_azel(x, y);
                assert!((el2 - el).abs() < 1e-6, "{:?} el {} -> {}", m, el, el2);
                let daz = (az2 - az).rem_euclid(360.0);
                assert!(daz < 1e-6 || daz > 360.0 - 1e-6, "{:?} az {} -> {}", m, az, az2);
            }
        }
    }

    #[test]
    fn test_polar_cursor_text() {
        let mut p = PolarProjection::new(PolarOrientation::Nesw);
        p.resize(250, 250);
        // straight up from centre at half radius: az 0, el 45
        let text = p.cursor_text(p.cx, p.cy - p.r / 2.0);
        assert_eq!(text, "AZ 0\u{b0}\nEL 45\u{b0}");
        assert!(p.cursor_text(0.0, 0.0).is_empty());
    }

    #[test]
    fn test_center_lon() {
        assert_relative_eq!(MapProjection::new(0.0, false).left_side_lon, -180.0);
        assert_relative_eq!(MapProjection::new(30.0, false).left_side_lon, -150.0);
        assert_relative_eq!(MapProjection::new(-90.0, false).left_side_lon, 90.0);
    }

    #[test]
    fn test_map_keep_ratio_letterbox() {
        let mut m = MapProjection::new(0.0, true);
        m.resize(1000, 300);
        assert_relative_eq!(m.width, 600.0);
        assert_relative_eq!(m.height, 300.0);
        assert_relative_eq!(m.x0, 200.0);
        assert_relative_eq!(m.y0, 0.0);

        m.resize(400, 400);
        assert_relative_eq!(m.width, 400.0);
        assert_relative_eq!(m.height, 200.0);
        assert_relative_eq!(m.y0, 100.0);

        let mut fill = MapProjection::new(0.0, false);
        fill.resize(1000, 300);
        assert_relative_eq!(fill.width, 1000.0);
        assert_relative_eq!(fill.x0, 0.0);
    }

    #[test]
    fn test_map_round_trip() {
        // letterboxed maps start at x0 > 0
        for (clon, keep_ratio, w, h) in [
            (0.0, false, 720, 360),
            (45.0, false, 720, 360),
            (-120.0, false, 720, 360),
            (0.0, true, 800, 300),
            (60.0, true, 800, 300),
        ] {
            let mut m = MapProjection::new(clon, keep_ratio);
            m.resize(w, h);
            for &(lon, lat) in &[(0.0, 0.0), (12.5, 55.7), (-170.0, -40.0), (100.0, 80.0), (170.0, 0.0), (179.9, 5.0)] {
                let (x, y) = m.lonlat_to_xy(lon, lat);
                assert!((m.x0..=m.x0 + m.width).contains(&x), "lon {} -> x {}", lon, x);
                let (lon2, lat2) = m.xy_to_lonlat(x, y);
                assert_relative_eq!(lat2, lat, epsilon = 1e-9);
                let dlon = (lon2 - lon).rem_euclid(360.0);
                assert!(dlon < 1e-9 || dlon > 360.0 - 1e-9, "{} -> {}", lon, lon2);
            }
        }
    }

    #[test]
    fn test_map_lonlat_reference() {
        let mut m = MapProjection::new(0.0, false);
        m.resize(360, 180);
        assert_eq!(m.lonlat_to_xy(0.0, 0.0), (180.0, 90.0));
        assert_eq!(m.lonlat_to_xy(-180.0, 90.0), (0.0, 0.0));
        assert_eq!(m.cursor_text(180.0, 90.0), "LON:0\u{b0} LAT:0\u{b0}");
    }
}
