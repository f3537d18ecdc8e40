//! Pass prediction
//!
//! AOS/LOS searches step through time with variable step sizes derived from
//! the current elevation and altitude, then refine near the horizon. Every
//! search honours an upper time limit (`maxdt`, days after `start`; zero or
//! negative means no limit) and an iteration watchdog.

use crate::config::{ConfigAccessor, defaults, keys};
use crate::orbital::observer::{Qth, QthSmall};
use crate::orbital::propagation::{SatState, Satellite};
use tracing::{debug, error, info, warn};

/// Gap between a LOS and the start of the next search, ~20 minutes
pub const NEXT_PASS_GAP: f64 = 0.014;

const SEARCH_WATCHDOG: usize = 20_000;
const ONE_SECOND: f64 = 1.0 / 86400.0;

/// One sampled point of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassDetail {
    pub time: f64,
    pub az: f64,
    pub el: f64,
    pub range: f64,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub footprint: f64,
    pub orbit: i64,
}

impl From<&SatState> for PassDetail {
    fn from(st: &SatState) -> Self {
        Self {
            time: st.jd,
            az: st.az,
            el: st.el,
            range: st.range,
            lat: st.ssplat,
            lon: st.ssplon,
            alt: st.alt,
            footprint: st.footprint,
            orbit: st.orbit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    pub satname: String,
    pub aos: f64,
    pub los: f64,
    /// Time of closest approach
    pub tca: f64,
    pub max_el: f64,
    pub aos_az: f64,
    pub los_az: f64,
    pub maxel_az: f64,
    pub orbit: i64,
    pub details: Vec<PassDetail>,
    /// Observer the pass was computed for
    pub qth_comp: QthSmall,
}

/// Pass prediction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PredictSettings {
    /// Minimum peak elevation for a pass to count, degrees
    pub min_el: f64,
    /// Number of detail entries per pass
    pub num_entries: u32,
    /// Smallest spacing between detail entries, seconds
    pub time_resolution_secs: f64,
    pub look_ahead_days: f64,
    pub num_passes: usize,
}

impl Default for PredictSettings {
    fn default() -> Self {
        Self {
            min_el: defaults::PRED_MIN_EL as f64,
            num_entries: defaults::PRED_NUM_ENTRIES as u32,
            time_resolution_secs: defaults::PRED_RESOLUTION as f64,
            look_ahead_days: defaults::PRED_LOOK_AHEAD as f64,
            num_passes: defaults::PRED_NUM_PASSES as usize,
        }
    }
}

impl PredictSettings {
    pub fn from_config(cfg: &dyn ConfigAccessor) -> Self {
        let section = keys::SECTION_PREDICT;
        Self {
            min_el: cfg.get_int(section, keys::MINIMUM_ELEV, defaults::PRED_MIN_EL) as f64,
            num_entries: cfg
                .get_int(section, keys::NUMBER_OF_ENTRIES, defaults::PRED_NUM_ENTRIES)
                .max(1) as u32,
            time_resolution_secs: cfg
                .get_int(section, keys::TIME_RESOLUTION, defaults::PRED_RESOLUTION)
                .max(1) as f64,
            look_ahead_days: cfg
                .get_int(section, keys::LOOK_AHEAD, defaults::PRED_LOOK_AHEAD)
                .max(1) as f64,
            num_passes: cfg
                .get_int(section, keys::NUMBER_OF_PASSES, defaults::PRED_NUM_PASSES)
                .max(0) as usize,
        }
    }
}

struct Watchdog {
    search: &'static str,
    left: usize,
}

impl Watchdog {
    fn new(search: &'static str) -> Self {
        Self {
            search,
            left: SEARCH_WATCHDOG,
        }
    }

    /// Returns false once the iteration budget is spent.
    fn tick(&mut self, sat: &Satellite) -> bool {
        if self.left == 0 {
            warn!("{} search for {} gave up", self.search, sat.name);
            return false;
        }
        self.left -= 1;
        true
    }
}

fn window_end(start: f64, maxdt: f64) -> f64 {
    if maxdt > 0.0 {
        start + maxdt
    } else {
        f64::INFINITY
    }
}

/// Time of the first AOS no earlier than `start`.
///
/// When the satellite is already up the search restarts after the coming LOS.
pub fn find_aos(sat: &Satellite, qth: &Qth, start: f64, maxdt: f64) -> anyhow::Result<Option<f64>> {
    let mut st = sat.compute(qth, start)?;
    if !sat.has_aos(qth, start) {
        return Ok(None);
    }

    let mut t = start;
    if st.el > 0.0 {
        match find_los(sat, qth, start, maxdt)? {
            Some(los) => t = los + NEXT_PASS_GAP,
            None => return Ok(None),
        }
        st = sat.compute(qth, t)?;
    }

    let limit = window_end(start, maxdt);
    let mut watchdog = Watchdog::new("AOS");

    // coarse time steps
    while st.el < -1.0 && t <= limit {
        if !watchdog.tick(sat) {
            return Ok(None);
        }
        t -= 0.00035 * (st.el * ((st.alt / 8400.0) + 0.46) - 2.0);
        st = sat.compute(qth, t)?;
    }

    // fine steps
    while t <= limit {
        if st.el.abs() < 0.005 {
            return Ok(Some(t));
        }
        if !watchdog.tick(sat) {
            return Ok(None);
        }
        t -= st.el * st.alt.sqrt() / 530000.0;
        st = sat.compute(qth, t)?;
    }

    Ok(None)
}

/// Time of the first LOS no earlier than `start`.
///
/// When the satellite is down the search starts shortly after the next AOS.
pub fn find_los(sat: &Satellite, qth: &Qth, start: f64, maxdt: f64) -> anyhow::Result<Option<f64>> {
    let mut st = sat.compute(qth, start)?;
    if !sat.has_aos(qth, start) {
        return Ok(None);
    }

    let mut t = start;
    if st.el < 0.0 {
        match find_aos(sat, qth, start, maxdt)? {
            Some(aos) => t = aos + 0.001,
            None => return Ok(None),
        }
        st = sat.compute(qth, t)?;
    }

    let limit = window_end(start, maxdt);
    let mut watchdog = Watchdog::new("LOS");

    // coarse steps
    while st.el >= 1.0 && t <= limit {
        if !watchdog.tick(sat) {
            return Ok(None);
        }
        t += (st.el - 1.0).to_radians().cos() * st.alt.sqrt() / 25000.0;
        st = sat.compute(qth, t)?;
    }

    // fine steps
    while t <= limit {
        if !watchdog.tick(sat) {
            return Ok(None);
        }
        t += st.el * st.alt.sqrt() / 502500.0;
        st = sat.compute(qth, t)?;

        if st.el.abs() < 0.005 {
            // LOS only when descending through the horizon
            let before = sat.compute(qth, t - ONE_SECOND)?;
            if before.el > st.el {
                return Ok(Some(t));
            }
        }
    }

    Ok(None)
}

/// AOS of the pass in progress at `start`.
pub fn find_prev_aos(sat: &Satellite, qth: &Qth, start: f64) -> anyhow::Result<Option<f64>> {
    let mut st = sat.compute(qth, start)?;
    if !sat.has_aos(qth, start) {
        return Ok(None);
    }

    let mut t = start;
    let mut watchdog = Watchdog::new("previous AOS");
    while st.el >= 0.0 {
        if !watchdog.tick(sat) {
            return Ok(None);
        }
        t -= 0.0005;
        st = sat.compute(qth, t)?;
    }
    Ok(Some(t))
}

/// First pass with AOS in `[start, start + maxdt]` peaking at `min_el` or higher.
pub fn get_pass_engine(
    sat: &Satellite,
    qth: &Qth,
    start: f64,
    maxdt: f64,
    min_el: f64,
    settings: &PredictSettings,
) -> anyhow::Result<Option<Pass>> {
    let tres = settings.time_resolution_secs.max(1.0) * ONE_SECOND;
    let mut t0 = start;
    let mut watchdog = Watchdog::new("pass");

    loop {
        if !watchdog.tick(sat) {
            return Ok(None);
        }

        // a LOS before the AOS means a pass is in progress
        let los = find_los(sat, qth, t0, maxdt)?;
        let mut aos = find_aos(sat, qth, t0, start + maxdt - t0)?;
        if let (Some(a), Some(l)) = (aos, los) {
            if a > l {
                aos = find_prev_aos(sat, qth, t0)?;
            }
        }

        let (Some(aos), Some(los)) = (aos, los) else {
            return Ok(None);
        };
        if maxdt > 0.0 && aos > start + maxdt {
            return Ok(None);
        }

        let step = ((los - aos) / settings.num_entries.max(1) as f64).max(tres);
        let mut pass = Pass {
            satname: sat.name.clone(),
            aos,
            los,
            tca: 0.0,
            max_el: 0.0,
            aos_az: 0.0,
            los_az: 0.0,
            maxel_az: 0.0,
            orbit: 0,
            details: Vec::with_capacity(settings.num_entries as usize + 1),
            qth_comp: qth.small(),
        };

        let mut max_el = 0.0;
        let mut tca = 0.0;
        let mut t = aos;
        while t <= los {
            let st = sat.compute(qth, t)?;
            if t == aos {
                pass.aos_az = st.az;
                pass.orbit = st.orbit;
            }
            pass.details.push(PassDetail::from(&st));
            if st.el > max_el {
                max_el = st.el;
                tca = t;
                pass.maxel_az = st.az;
            }
            t += step;
        }

        pass.los_az = sat.compute(qth, los)?.az;
        pass.max_el = max_el;
        pass.tca = tca;

        if max_el >= min_el {
            debug!(
                "pass for {}: aos {:.5} los {:.5} max el {:.1}",
                sat.name, pass.aos, pass.los, pass.max_el
            );
            return Ok(Some(pass));
        }
        t0 = los + NEXT_PASS_GAP;
    }
}

/// Next pass reaching the configured minimum elevation (at least 1°).
pub fn get_pass(
    sat: &Satellite,
    qth: &Qth,
    start: f64,
    maxdt: f64,
    settings: &PredictSettings,
) -> anyhow::Result<Option<Pass>> {
    let min_el = if settings.min_el == 0.0 { 1.0 } else { settings.min_el };
    get_pass_engine(sat, qth, start, maxdt, min_el, settings)
}

pub fn get_pass_no_min_el(
    sat: &Satellite,
    qth: &Qth,
    start: f64,
    maxdt: f64,
    settings: &PredictSettings,
) -> anyhow::Result<Option<Pass>> {
    get_pass_engine(sat, qth, start, maxdt, 0.0, settings)
}

/// Up to `num` consecutive passes in `[start, start + maxdt]`; `num = 0` means 100.
pub fn get_passes(
    sat: &Satellite,
    qth: &Qth,
    start: f64,
    maxdt: f64,
    num: usize,
    settings: &PredictSettings,
) -> anyhow::Result<Vec<Pass>> {
    let num = if num == 0 { 100 } else { num };
    let mut passes = Vec::new();
    let mut t = start;

    while passes.len() < num {
        let Some(pass) = get_pass(sat, qth, t, maxdt, settings)? else {
            break;
        };
        t = pass.los + NEXT_PASS_GAP;
        passes.push(pass);
        if maxdt > 0.0 && t >= start + maxdt {
            break;
        }
    }

    info!(
        "Found {} passes for {} in time window [{:.5};{:.5}]",
        passes.len(),
        sat.name,
        start,
        start + maxdt
    );
    Ok(passes)
}

/// The pass in progress at `start`, or the next one if the satellite is down.
pub fn get_current_pass(
    sat: &Satellite,
    qth: &Qth,
    start: f64,
    settings: &PredictSettings,
) -> anyhow::Result<Option<Pass>> {
    let mut st = sat.compute(qth, start)?;
    let el0 = st.el;
    if !sat.has_aos(qth, start) {
        return Ok(None);
    }

    // find a time before AOS
    let mut t = start;
    let mut watchdog = Watchdog::new("current pass");
    while st.el > 0.0 {
        if !watchdog.tick(sat) {
            return Ok(None);
        }
        st = sat.compute(qth, t)?;
        t -= 0.007;
    }

    let pass = get_pass_no_min_el(sat, qth, t, 0.0, settings)?;
    if el0 > 0.0 {
        if let Some(p) = &pass {
            if p.aos > start {
                error!(
                    "Returning a pass for {} that starts after the seeded time.",
                    sat.name
                );
            }
            if p.los < start {
                error!(
                    "Returning a pass for {} that ends before the seeded time.",
                    sat.name
                );
            }
        }
    }
    Ok(pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbital::propagation::tests::{copenhagen, iss};

    fn first_pass() -> (Satellite, Qth, Pass) {
        let sat = iss();
        let qth = copenhagen();
        let pass = get_pass(&sat, &qth, sat.epoch_jd, 2.0, &PredictSettings::default())
            .expect("propagates")
            .expect("ISS passes over Copenhagen within two days");
        (sat, qth, pass)
    }

    #[test]
    fn test_find_aos_is_on_horizon() {
        let sat = iss();
        let qth = copenhagen();
        let aos = find_aos(&sat, &qth, sat.epoch_jd, 2.0)
            .expect("propagates")
            .expect("aos found");
        assert!(aos >= sat.epoch_jd);
        let st = sat.compute(&qth, aos).expect("propagates");
        assert!(st.el.abs() < 0.01, "el at aos {}", st.el);
    }

    #[test]
    fn test_aos_precedes_los() {
        let sat = iss();
        let qth = copenhagen();
        let aos = find_aos(&sat, &qth, sat.epoch_jd, 2.0).unwrap().unwrap();
        let los = find_los(&sat, &qth, aos + 0.0001, 2.0).unwrap().unwrap();
        assert!(los > aos);
        // LEO passes last well under half an hour
        assert!(los - aos < 0.02, "duration {}", los - aos);
    }

    #[test]
    fn test_pass_details_within_window() {
        let (_, _, pass) = first_pass();
        assert!(pass.aos < pass.los);
        assert!(pass.max_el >= 5.0);
        assert!(pass.tca >= pass.aos && pass.tca <= pass.los);
        assert!(!pass.details.is_empty());
        assert!(pass.details.len() <= 21 + 1);
        for d in &pass.details {
            assert!(d.time >= pass.aos && d.time <= pass.los);
        }
        assert!(pass.details.windows(2).all(|w| w[0].time < w[1].time));
        assert!((0.0..360.0).contains(&pass.aos_az));
        assert!((0.0..360.0).contains(&pass.los_az));
    }

    #[test]
    fn test_pass_stores_observer() {
        let (_, qth, pass) = first_pass();
        assert_eq!(pass.qth_comp, qth.small());
        assert!(qth.small_dist(&pass.qth_comp) < 1.0);
    }

    #[test]
    fn test_get_passes_are_ordered() {
        let sat = iss();
        let qth = copenhagen();
        let passes = get_passes(&sat, &qth, sat.epoch_jd, 1.0, 4, &PredictSettings::default())
            .expect("propagates");
        assert!(!passes.is_empty() && passes.len() <= 4);
        for w in passes.windows(2) {
            assert!(w[0].los < w[1].aos);
        }
    }

    #[test]
    fn test_current_pass_contains_now() {
        let (sat, qth, pass) = first_pass();
        let current = get_current_pass(&sat, &qth, pass.tca, &PredictSettings::default())
            .expect("propagates")
            .expect("pass in progress");
        assert!(current.aos <= pass.tca + 1e-6);
        assert!(current.los >= pass.tca - 1e-6);
    }

    #[test]
    fn test_find_prev_aos_from_mid_pass() {
        let (sat, qth, pass) = first_pass();
        let prev = find_prev_aos(&sat, &qth, pass.tca).unwrap().unwrap();
        assert!(prev < pass.aos + 1e-4);
        assert!(pass.aos - prev < 0.001);
    }

    #[test]
    fn test_window_end() {
        assert_eq!(window_end(10.0, 2.0), 12.0);
        assert!(window_end(10.0, 0.0).is_infinite());
    }
}
