//! Per-tick satellite snapshots and the predictor seam used by the views

use crate::orbital::observer::{Qth, QthSmall};
use crate::orbital::passes::{PredictSettings, Pass, find_aos, find_los, get_current_pass};
use crate::orbital::propagation::{SatState, Satellite};
use crate::tle::types::TleData;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Read-only satellite state for one tick. Times are Julian dates, 0.0 = none.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteSnapshot {
    pub catnum: u32,
    pub nickname: String,
    pub az: f64,
    pub el: f64,
    pub range: f64,
    pub ssplat: f64,
    pub ssplon: f64,
    pub alt: f64,
    pub footprint: f64,
    pub aos: f64,
    pub los: f64,
    pub orbit: i64,
    pub decayed: bool,
}

impl SatelliteSnapshot {
    fn from_state(sat: &Satellite, st: &SatState, aos: f64, los: f64) -> Self {
        Self {
            catnum: sat.catnum,
            nickname: sat.name.clone(),
            az: st.az,
            el: st.el,
            range: st.range,
            ssplat: st.ssplat,
            ssplon: st.ssplon,
            alt: st.alt,
            footprint: st.footprint,
            aos,
            los,
            orbit: st.orbit,
            decayed: sat.is_decayed(st.jd),
        }
    }
}

/// Sub-satellite point sampled for ground tracks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitSample {
    pub lat: f64,
    pub lon: f64,
    pub orbit: i64,
    pub decayed: bool,
}

/// Orbit queries the views need beyond the per-tick snapshot.
///
/// `None` means the satellite is unknown, has no such event, or could not
/// be propagated.
pub trait OrbitPredictor {
    fn sample(&self, catnum: u32, qth: &Qth, jd: f64) -> Option<OrbitSample>;
    fn current_pass(&self, catnum: u32, qth: &Qth, now: f64) -> Option<Pass>;
    fn next_aos(&self, catnum: u32, qth: &Qth, now: f64, horizon: f64) -> Option<f64>;
    fn next_los(&self, catnum: u32, qth: &Qth, now: f64, horizon: f64) -> Option<f64>;
}

impl Satellite {
    /// Snapshot at `jd` with the next AOS/LOS inside `look_ahead` days.
    pub fn snapshot(&self, qth: &Qth, jd: f64, look_ahead: f64) -> anyhow::Result<SatelliteSnapshot> {
        let (aos, los) = if self.has_aos(qth, jd) {
            (
                find_aos(self, qth, jd, look_ahead)?.unwrap_or(0.0),
                find_los(self, qth, jd, look_ahead)?.unwrap_or(0.0),
            )
        } else {
            (0.0, 0.0)
        };
        let st = self.compute(qth, jd)?;
        Ok(SatelliteSnapshot::from_state(self, &st, aos, los))
    }
}

/// SGP4 predictor over a set of satellites.
pub struct Sgp4Predictor<'a> {
    pub sats: &'a BTreeMap<u32, Satellite>,
    pub settings: &'a PredictSettings,
}

impl Sgp4Predictor<'_> {
    fn with_sat<T>(
        &self,
        catnum: u32,
        what: &str,
        f: impl FnOnce(&Satellite) -> anyhow::Result<Option<T>>,
    ) -> Option<T> {
        let sat = self.sats.get(&catnum)?;
        match f(sat) {
            Ok(v) => v,
            Err(e) => {
                error!("{} for {} failed: {:#}", what, sat.name, e);
                None
            }
        }
    }
}

impl OrbitPredictor for Sgp4Predictor<'_> {
    fn sample(&self, catnum: u32, qth: &Qth, jd: f64) -> Option<OrbitSample> {
        self.with_sat(catnum, "sampling", |sat| {
            let st = sat.compute(qth, jd)?;
            Ok(Some(OrbitSample {
                lat: st.ssplat,
                lon: st.ssplon,
                orbit: st.orbit,
                decayed: sat.is_decayed(jd),
            }))
        })
    }

    fn current_pass(&self, catnum: u32, qth: &Qth, now: f64) -> Option<Pass> {
        self.with_sat(catnum, "current pass", |sat| {
            get_current_pass(sat, qth, now, self.settings)
        })
    }

    fn next_aos(&self, catnum: u32, qth: &Qth, now: f64, horizon: f64) -> Option<f64> {
        self.with_sat(catnum, "AOS search", |sat| find_aos(sat, qth, now, horizon))
    }

    fn next_los(&self, catnum: u32, qth: &Qth, now: f64, horizon: f64) -> Option<f64> {
        self.with_sat(catnum, "LOS search", |sat| find_los(sat, qth, now, horizon))
    }
}

/// Observer movement, in km, that invalidates cached event times.
const MAX_QTH_DRIFT_KM: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
struct EventTimes {
    aos: f64,
    los: f64,
    computed_at: f64,
}

/// Loaded satellites plus cached AOS/LOS times.
pub struct Catalog {
    sats: BTreeMap<u32, Satellite>,
    events: BTreeMap<u32, EventTimes>,
    /// Observer the cached events were searched for.
    events_qth: Option<QthSmall>,
    pub settings: PredictSettings,
}

impl Catalog {
    pub fn new(settings: PredictSettings) -> Self {
        Self {
            sats: BTreeMap::new(),
            events: BTreeMap::new(),
            events_qth: None,
            settings,
        }
    }

    pub fn insert(&mut self, sat: Satellite) {
        self.events.remove(&sat.catnum);
        self.sats.insert(sat.catnum, sat);
    }

    /// Build models for `tles`; element sets SGP4 rejects are logged and skipped.
    pub fn load_tles(&mut self, tles: &[TleData]) -> usize {
        let mut loaded = 0;
        for tle in tles {
            match Satellite::from_tle(tle) {
                Ok(sat) => {
                    self.insert(sat);
                    loaded += 1;
                }
                Err(e) => error!("skipping element set {:?}: {:#}", tle.name, e),
            }
        }
        info!("{} of {} element sets loaded", loaded, tles.len());
        loaded
    }

    pub fn get(&self, catnum: u32) -> Option<&Satellite> {
        self.sats.get(&catnum)
    }

    pub fn satellites(&self) -> &BTreeMap<u32, Satellite> {
        &self.sats
    }

    pub fn len(&self) -> usize {
        self.sats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sats.is_empty()
    }

    /// Forget cached event times, e.g. after the observer moved.
    pub fn refresh_events(&mut self) {
        self.events.clear();
    }

    pub fn predictor(&self) -> Sgp4Predictor<'_> {
        Sgp4Predictor {
            sats: &self.sats,
            settings: &self.settings,
        }
    }

    /// Snapshots of every satellite at `jd`.
    ///
    /// Event times are searched once and then only when they fall behind
    /// `jd`, or when time went backwards past the moment they were computed.
    pub fn snapshots(&mut self, qth: &Qth, jd: f64) -> BTreeMap<u32, SatelliteSnapshot> {
        if self.events_qth.is_some_and(|q| qth.small_dist(&q) > MAX_QTH_DRIFT_KM) {
            debug!("observer moved to {}, dropping cached events", qth.name);
            self.refresh_events();
        }
        self.events_qth = Some(qth.small());

        let maxdt = self.settings.look_ahead_days;
        let mut out = BTreeMap::new();

        for (&catnum, sat) in &self.sats {
            let st = match sat.compute(qth, jd) {
                Ok(st) => st,
                Err(e) => {
                    error!("{} not propagated: {:#}", sat.name, e);
                    continue;
                }
            };

            let cached = self.events.get(&catnum).copied();
            let mut ev = match cached {
                Some(ev) if jd >= ev.computed_at => ev,
                _ => {
                    debug!("searching events for {}", sat.name);
                    EventTimes {
                        aos: search(sat, qth, jd, maxdt, find_aos),
                        los: search(sat, qth, jd, maxdt, find_los),
                        computed_at: jd,
                    }
                }
            };
            if ev.aos > 0.0 && ev.aos < jd {
                ev.aos = search(sat, qth, jd, maxdt, find_aos);
            }
            if ev.los > 0.0 && ev.los < jd {
                ev.los = search(sat, qth, jd, maxdt, find_los);
            }
            self.events.insert(catnum, ev);

            out.insert(catnum, SatelliteSnapshot::from_state(sat, &st, ev.aos, ev.los));
        }
        out
    }
}

type EventSearch = fn(&Satellite, &Qth, f64, f64) -> anyhow::Result<Option<f64>>;

fn search(sat: &Satellite, qth: &Qth, jd: f64, maxdt: f64, find: EventSearch) -> f64 {
    if !sat.has_aos(qth, jd) {
        return 0.0;
    }
    match find(sat, qth, jd, maxdt) {
        Ok(t) => t.unwrap_or(0.0),
        Err(e) => {
            error!("event search for {} failed: {:#}", sat.name, e);
            0.0
        }
    }
}
