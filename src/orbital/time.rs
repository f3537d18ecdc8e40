//! Simulation clock

use crate::core::coordinates::julian_date_utc;
use chrono::{DateTime, Duration, Utc};

/// Simulated UTC that advances by scaled wall-clock time.
///
/// A negative `time_scale` runs the clock backwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    pub current_utc: DateTime<Utc>,
    pub time_scale: f64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self {
            current_utc: Utc::now(),
            time_scale: 1.0,
        }
    }
}

impl SimulationClock {
    pub fn new(start: DateTime<Utc>, time_scale: f64) -> Self {
        Self {
            current_utc: start,
            time_scale,
        }
    }

    /// Advance by `real_elapsed` of wall time, scaled.
    pub fn advance(&mut self, real_elapsed: std::time::Duration) {
        let scaled_nanos = real_elapsed.as_secs_f64() * self.time_scale * 1.0e9;
        if scaled_nanos.is_finite() && scaled_nanos != 0.0 {
            self.current_utc += Duration::nanoseconds(scaled_nanos.round() as i64);
        }
    }

    pub fn julian_date(&self) -> f64 {
        julian_date_utc(self.current_utc)
    }
}
