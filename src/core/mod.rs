//! Core Earth model and coordinate utilities shared by the orbit engine and
//! the plotting views.

pub mod coordinates;

pub use coordinates::{
    GeoError, Geodetic, LookAngles, XKMPER, arccos, julian_date_to_utc, julian_date_utc, qrb,
    wrap_lon_deg,
};
