//! Satellite plotting views
//!
//! The polar view charts the sky above the observer and the map view plots
//! sub-satellite points, range circles and ground tracks on a world map.
//! Both are driven by a periodic tick with a fresh set of snapshots and draw
//! through a [`surface::DrawingSurface`].

pub mod cache;
pub mod footprint;
pub mod ground_track;
pub mod map;
pub mod polar;
pub mod projection;
pub mod surface;

pub use cache::{ObjectCache, SatelliteDrawable, SelectionColours, Transition};
pub use footprint::{Footprint, FootprintOutcome, calculate_footprint};
pub use ground_track::{GroundTrack, TrackError, create_polylines};
pub use map::MapView;
pub use polar::PolarView;
pub use projection::{MapProjection, PolarOrientation, PolarProjection, Ssp};
pub use surface::{Anchor, DrawingSurface, ItemHandle, RecordingSurface};

use crate::orbital::snapshot::SatelliteSnapshot;
use std::collections::BTreeMap;
use tracing::error;

/// Handles of the four text items in the corners of a view: cursor
/// readout, observer name, next event and selected satellite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfoItems {
    pub curs: ItemHandle,
    pub locnam: ItemHandle,
    pub next: ItemHandle,
    pub sel: ItemHandle,
}

impl InfoItems {
    pub(crate) fn all(&self) -> [ItemHandle; 4] {
        [self.curs, self.locnam, self.next, self.sel]
    }
}

/// Time left until a Julian date, split into hours, minutes and seconds.
/// Times already passed count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Countdown {
    pub h: u32,
    pub m: u32,
    pub s: u32,
}

impl Countdown {
    pub(crate) fn until(target: f64, now: f64) -> Self {
        // float to int casts saturate, so negative spans become 0
        let total = ((target - now) * 86400.0) as u32;
        Self {
            h: total / 3600,
            m: (total % 3600) / 60,
            s: total % 60,
        }
    }

    pub(crate) fn total_minutes(self) -> u32 {
        self.h * 60 + self.m
    }

    /// `hh:mm:ss`, or `mm:ss` under an hour.
    pub(crate) fn clock(self) -> String {
        if self.h > 0 {
            format!("{:02}:{:02}:{:02}", self.h, self.m, self.s)
        } else {
            format!("{:02}:{:02}", self.m, self.s)
        }
    }
}

/// Earliest upcoming AOS seen during a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct NextAos {
    pub naos: f64,
    pub ncat: u32,
}

impl NextAos {
    pub(crate) fn consider(&mut self, sat: &SatelliteSnapshot, now: f64) {
        if sat.aos > now && (sat.aos < self.naos || self.naos == 0.0) {
            self.naos = sat.aos;
            self.ncat = sat.catnum;
        }
    }

    /// Text for the next-event label. `separator` goes between the name and
    /// the countdown.
    pub(crate) fn text(
        &self,
        enabled: bool,
        sats: &BTreeMap<u32, SatelliteSnapshot>,
        now: f64,
        separator: &str,
    ) -> String {
        if !enabled {
            return String::new();
        }
        if self.naos == 0.0 {
            return "Next: N/A".to_string();
        }
        match sats.get(&self.ncat) {
            Some(sat) => format!(
                "Next: {}{}in {}",
                sat.nickname,
                separator,
                Countdown::until(self.naos, now).clock()
            ),
            None => {
                error!("can not find next satellite {}", self.ncat);
                "Next: ERR".to_string()
            }
        }
    }
}
