//! Polar (sky) view
//!
//! Plots the satellites that are above the observer's horizon on an
//! azimuth/elevation chart. An object exists only while its satellite is up;
//! it owns the current pass and, when enabled, the sky track drawn from it.

use crate::config::{ConfigAccessor, Rgba, defaults, keys};
use crate::core::coordinates::julian_date_to_utc;
use crate::orbital::observer::Qth;
use crate::orbital::passes::Pass;
use crate::orbital::snapshot::{OrbitPredictor, SatelliteSnapshot};
use crate::view::cache::{ObjectCache, SatelliteDrawable, SelectionColours, Transition};
use crate::view::projection::{PolarOrientation, PolarProjection};
use crate::view::surface::{Anchor, DrawingSurface, ItemHandle};
use crate::view::{Countdown, InfoItems, NextAos};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;
use tracing::{debug, error};

const MARKER_HALF: f64 = 2.0;
/// Overshoot of the axis lines past the horizon circle.
const POLV_LINE_EXTRA: f64 = 5.0;
const TRACK_TICK_NUM: usize = 4;
const TICK_OFFSET: f64 = 5.0;
/// Observer movement, in km, that invalidates a cached pass.
const MAX_QTH_DRIFT_KM: f64 = 1.0;
const CIRCLE_SEGMENTS: usize = 72;
/// Elevation circles at 0, 30 and 60 degrees as fractions of the radius.
const CIRCLE_FRACTIONS: [f64; 3] = [1.0, 0.6667, 0.3333];

#[derive(Debug, Clone, Copy, PartialEq)]
struct PolarColours {
    sat: Rgba,
    sat_sel: Rgba,
    track: Rgba,
    info: Rgba,
    axis: Rgba,
    tick: Rgba,
}

impl PolarColours {
    fn from_config(cfg: &dyn ConfigAccessor) -> Self {
        let s = keys::SECTION_POLAR;
        Self {
            sat: cfg.get_color(s, keys::SAT_COLOUR, defaults::POLAR_SAT_COLOUR),
            sat_sel: cfg.get_color(s, keys::SAT_SEL_COLOUR, defaults::POLAR_SAT_SEL_COLOUR),
            track: cfg.get_color(s, keys::TRACK_COLOUR, defaults::POLAR_TRACK_COLOUR),
            info: cfg.get_color(s, keys::INFO_COLOUR, defaults::POLAR_INFO_COLOUR),
            axis: cfg.get_color(s, keys::AXIS_COLOUR, defaults::POLAR_AXIS_COLOUR),
            tick: cfg.get_color(s, keys::TICK_COLOUR, defaults::POLAR_TICK_COLOUR),
        }
    }

    fn selection(&self) -> SelectionColours {
        SelectionColours {
            default: self.sat,
            selected: self.sat_sel,
        }
    }
}

/// Time label on a sky track, tied to a vertex of the track polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackTick {
    pub item: ItemHandle,
    pub vertex: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkyTrack {
    pub line: ItemHandle,
    pub ticks: Vec<TrackTick>,
}

struct TrackLayout {
    points: Vec<(f64, f64)>,
    /// (vertex, julian date) for each time tick
    ticks: Vec<(usize, f64)>,
}

/// Vertices of a pass on the chart: AOS on the horizon, the pass samples,
/// LOS on the horizon. Samples below the horizon repeat the previous vertex.
fn sky_track_layout(pass: &Pass, proj: &PolarProjection) -> Option<TrackLayout> {
    let num = pass.details.len();
    if num == 0 {
        return None;
    }
    let tres = num.saturating_sub(2) / (TRACK_TICK_NUM - 1);

    let mut xy = proj.azel_to_xy(pass.aos_az, 0.0);
    let mut points = Vec::with_capacity(num.max(2));
    let mut ticks = vec![(0, pass.aos)];
    points.push(xy);

    for (i, detail) in pass.details.iter().enumerate().take(num - 1).skip(1) {
        if detail.el >= 0.0 {
            xy = proj.azel_to_xy(detail.az, detail.el);
        }
        points.push(xy);
        if tres != 0 && i % tres == 0 && ticks.len() < TRACK_TICK_NUM {
            ticks.push((i, detail.time));
        }
    }

    points.push(proj.azel_to_xy(pass.los_az, 0.0));
    Some(TrackLayout { points, ticks })
}

/// Tick labels sit beside the track, on the side facing away from the centre.
fn tick_placement(x: f64, cx: f64) -> (f64, Anchor) {
    if x > cx {
        (x - TICK_OFFSET, Anchor::East)
    } else {
        (x + TICK_OFFSET, Anchor::West)
    }
}

fn tick_label(jd: f64) -> String {
    julian_date_to_utc(jd)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

impl SkyTrack {
    fn create(pass: &Pass, proj: &PolarProjection, surface: &mut dyn DrawingSurface, colour: Rgba) -> Option<Self> {
        let Some(layout) = sky_track_layout(pass, proj) else {
            error!("pass of {} has no points", pass.satname);
            return None;
        };

        let ticks = layout
            .ticks
            .iter()
            .map(|&(vertex, time)| {
                let (x, y) = layout.points[vertex];
                let (x, anchor) = tick_placement(x, proj.cx);
                TrackTick {
                    item: surface.create_text(x, y, &tick_label(time), anchor, colour),
                    vertex,
                }
            })
            .collect();
        let line = surface.create_polyline(&layout.points, colour, Rgba::TRANSPARENT);
        Some(Self { line, ticks })
    }

    fn reproject(&self, pass: &Pass, proj: &PolarProjection, surface: &mut dyn DrawingSurface) {
        let Some(layout) = sky_track_layout(pass, proj) else {
            return;
        };
        surface.set_points(self.line, &layout.points);
        for tick in &self.ticks {
            if let Some(&(x, y)) = layout.points.get(tick.vertex) {
                let (x, anchor) = tick_placement(x, proj.cx);
                surface.set_position(tick.item, x, y);
                surface.set_anchor(tick.item, anchor);
            }
        }
    }

    fn delete(self, surface: &mut dyn DrawingSurface) {
        surface.remove(self.line);
        for tick in self.ticks {
            surface.remove(tick.item);
        }
    }
}

/// A satellite currently above the horizon.
#[derive(Debug)]
pub struct PolarObject {
    pub catnum: u32,
    pub marker: ItemHandle,
    pub label: ItemHandle,
    pub selected: bool,
    pub showtrack: bool,
    pub pass: Option<Pass>,
    pub sky_track: Option<SkyTrack>,
}

impl PolarObject {
    fn drop_track(&mut self, surface: &mut dyn DrawingSurface) {
        if let Some(track) = self.sky_track.take() {
            track.delete(surface);
        }
    }

    fn build_track(&mut self, proj: &PolarProjection, surface: &mut dyn DrawingSurface, colour: Rgba) {
        self.drop_track(surface);
        match &self.pass {
            Some(pass) => self.sky_track = SkyTrack::create(pass, proj, surface, colour),
            None => debug!("no pass for {}, sky track deferred", self.catnum),
        }
    }
}

impl SatelliteDrawable for PolarObject {
    fn is_selected(&self) -> bool {
        self.selected
    }

    fn set_selected(&mut self, selected: bool, surface: &mut dyn DrawingSurface, colour: Rgba) {
        self.selected = selected;
        surface.set_color(self.marker, colour);
        surface.set_color(self.label, colour);
    }

    fn destroy(mut self, surface: &mut dyn DrawingSurface) {
        self.drop_track(surface);
        surface.remove(self.marker);
        surface.remove(self.label);
    }
}

#[derive(Clone, Copy)]
enum Pole {
    N,
    E,
    S,
    W,
}

impl Pole {
    const ALL: [Pole; 4] = [Pole::N, Pole::E, Pole::S, Pole::W];

    fn azimuth(self) -> f64 {
        match self {
            Pole::N => 0.0,
            Pole::E => 90.0,
            Pole::S => 180.0,
            Pole::W => 270.0,
        }
    }

    fn letter(self) -> &'static str {
        match self {
            Pole::N => "N",
            Pole::E => "E",
            Pole::S => "S",
            Pole::W => "W",
        }
    }

    /// Offset and anchor that keep the letter outside the horizon circle.
    fn label_offset(self, orientation: PolarOrientation) -> (f64, f64, Anchor) {
        use PolarOrientation::*;
        let ns_swapped = matches!(orientation, Senw | Swne);
        let ew_swapped = matches!(orientation, Nwse | Swne);
        let e = POLV_LINE_EXTRA;
        match self {
            Pole::N if ns_swapped => (0.0, e, Anchor::North),
            Pole::N => (0.0, -e, Anchor::South),
            Pole::S if ns_swapped => (0.0, -e, Anchor::South),
            Pole::S => (0.0, e, Anchor::North),
            Pole::E if ew_swapped => (-e, 0.0, Anchor::East),
            Pole::E => (e, 0.0, Anchor::West),
            Pole::W if ew_swapped => (e, 0.0, Anchor::West),
            Pole::W => (-e, 0.0, Anchor::East),
        }
    }

    fn label_position(self, proj: &PolarProjection) -> (f64, f64, Anchor) {
        let (x, y) = proj.azel_to_xy(self.azimuth(), 0.0);
        let (dx, dy, anchor) = self.label_offset(proj.orientation);
        (x + dx, y + dy, anchor)
    }
}

fn circle(cx: f64, cy: f64, r: f64) -> Vec<(f64, f64)> {
    (0..=CIRCLE_SEGMENTS)
        .map(|i| {
            let a = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
            (cx + r * a.cos(), cy + r * a.sin())
        })
        .collect()
}

/// Elevation circles, axis lines and compass letters.
#[derive(Debug)]
struct PolarGrid {
    circles: Vec<ItemHandle>,
    hl: ItemHandle,
    vl: ItemHandle,
    letters: Vec<ItemHandle>,
}

impl PolarGrid {
    fn axis_lines(proj: &PolarProjection) -> ([(f64, f64); 2], [(f64, f64); 2]) {
        let reach = proj.r + POLV_LINE_EXTRA;
        (
            [(proj.cx - reach, proj.cy), (proj.cx + reach, proj.cy)],
            [(proj.cx, proj.cy - reach), (proj.cx, proj.cy + reach)],
        )
    }

    fn create(proj: &PolarProjection, surface: &mut dyn DrawingSurface, colours: &PolarColours) -> Self {
        let circles = CIRCLE_FRACTIONS
            .iter()
            .map(|f| surface.create_polyline(&circle(proj.cx, proj.cy, f * proj.r), colours.axis, Rgba::TRANSPARENT))
            .collect();
        let (h, v) = Self::axis_lines(proj);
        let hl = surface.create_polyline(&h, colours.axis, Rgba::TRANSPARENT);
        let vl = surface.create_polyline(&v, colours.axis, Rgba::TRANSPARENT);
        let letters = Pole::ALL
            .iter()
            .map(|pole| {
                let (x, y, anchor) = pole.label_position(proj);
                surface.create_text(x, y, pole.letter(), anchor, colours.tick)
            })
            .collect();
        Self {
            circles,
            hl,
            vl,
            letters,
        }
    }

    fn layout(&self, proj: &PolarProjection, surface: &mut dyn DrawingSurface) {
        for (item, f) in self.circles.iter().zip(CIRCLE_FRACTIONS) {
            surface.set_points(*item, &circle(proj.cx, proj.cy, f * proj.r));
        }
        let (h, v) = Self::axis_lines(proj);
        surface.set_points(self.hl, &h);
        surface.set_points(self.vl, &v);
        for (item, pole) in self.letters.iter().zip(Pole::ALL) {
            let (x, y, anchor) = pole.label_position(proj);
            surface.set_position(*item, x, y);
            surface.set_anchor(*item, anchor);
        }
    }

    fn delete(self, surface: &mut dyn DrawingSurface) {
        for item in self.circles.into_iter().chain([self.hl, self.vl]).chain(self.letters) {
            surface.remove(item);
        }
    }
}

/// Corner text positions: cursor, observer, next event, selection.
fn info_positions(proj: &PolarProjection) -> [(f64, f64); 4] {
    let left = proj.cx - proj.r - 2.0 * POLV_LINE_EXTRA;
    let right = proj.cx + proj.r + 2.0 * POLV_LINE_EXTRA;
    let top = proj.cy - proj.r - POLV_LINE_EXTRA;
    let bottom = proj.cy + proj.r + POLV_LINE_EXTRA;
    [(left, bottom), (left, top), (right, top), (right, bottom)]
}

fn los_text(sat: &SatelliteSnapshot, now: f64) -> String {
    if sat.los > 0.0 {
        format!("LOS in {}", Countdown::until(sat.los, now).clock())
    } else {
        format!("{}\nAlways in range", sat.nickname)
    }
}

fn az_el_tooltip(sat: &SatelliteSnapshot) -> String {
    format!("{}\nAz: {:5.1}\u{b0}\nEl: {:5.1}\u{b0}\n", sat.nickname, sat.az, sat.el)
}

fn u32_set(values: Vec<i64>) -> BTreeSet<u32> {
    values.into_iter().filter_map(|v| u32::try_from(v).ok()).collect()
}

pub struct PolarView {
    proj: PolarProjection,
    qth: Qth,
    colours: PolarColours,
    refresh: u32,
    counter: u32,
    next: NextAos,
    pending_resize: Option<(u32, u32)>,
    show_track_default: bool,
    showtracks_on: BTreeSet<u32>,
    showtracks_off: BTreeSet<u32>,
    qth_info: bool,
    event_info: bool,
    cursor_info: bool,
    objects: ObjectCache<PolarObject>,
    grid: PolarGrid,
    info: InfoItems,
}

impl PolarView {
    /// Build the chart on `surface`. The first call to [`PolarView::update`]
    /// lays it out for a `width` x `height` surface.
    pub fn new(cfg: &dyn ConfigAccessor, qth: Qth, surface: &mut dyn DrawingSurface, width: u32, height: u32) -> Self {
        let s = keys::SECTION_POLAR;
        let colours = PolarColours::from_config(cfg);
        let orientation = PolarOrientation::from_config(cfg.get_int(s, keys::ORIENTATION, defaults::POLAR_ORIENTATION));
        let mut proj = PolarProjection::new(orientation);
        proj.resize(width, height);

        let qth_info = cfg.get_bool(s, keys::QTH_INFO, defaults::POLAR_QTH_INFO);
        let [curs, locnam, next, sel] = info_positions(&proj);
        let qth_name = if qth_info { qth.name.as_str() } else { "" };
        let info = InfoItems {
            curs: surface.create_text(curs.0, curs.1, "", Anchor::West, colours.info),
            locnam: surface.create_text(locnam.0, locnam.1, qth_name, Anchor::SouthWest, colours.info),
            next: surface.create_text(next.0, next.1, "", Anchor::East, colours.info),
            sel: surface.create_text(sel.0, sel.1, "", Anchor::East, colours.info),
        };

        let refresh = cfg.get_int(s, keys::REFRESH, defaults::POLAR_REFRESH);
        Self {
            grid: PolarGrid::create(&proj, surface, &colours),
            proj,
            qth,
            colours,
            refresh: u32::try_from(refresh).unwrap_or(defaults::POLAR_REFRESH as u32),
            counter: 1,
            next: NextAos::default(),
            pending_resize: Some((width, height)),
            show_track_default: cfg.get_bool(s, keys::SHOW_TRACK, defaults::POLAR_SHOW_TRACK),
            showtracks_on: u32_set(cfg.get_int_list(s, keys::SHOWTRACKS)),
            showtracks_off: u32_set(cfg.get_int_list(s, keys::HIDETRACKS)),
            qth_info,
            event_info: cfg.get_bool(s, keys::NEXT_EVENT, defaults::POLAR_NEXT_EVENT),
            cursor_info: cfg.get_bool(s, keys::CURSOR_TRACK, defaults::POLAR_CURSOR_TRACK),
            objects: ObjectCache::new(),
            info,
        }
    }

    pub fn projection(&self) -> &PolarProjection {
        &self.proj
    }

    pub fn objects(&self) -> &ObjectCache<PolarObject> {
        &self.objects
    }

    pub fn info_items(&self) -> InfoItems {
        self.info
    }

    /// Takes effect on the next tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
    }

    /// Move the observer. Passes computed for the old location are
    /// recomputed on the next refresh.
    pub fn set_qth(&mut self, qth: Qth, surface: &mut dyn DrawingSurface) {
        if self.qth_info {
            surface.set_text(self.info.locnam, &qth.name);
        }
        self.qth = qth;
    }

    fn apply_pending_resize(&mut self, surface: &mut dyn DrawingSurface) -> bool {
        let Some((width, height)) = self.pending_resize.take() else {
            return false;
        };
        self.proj.resize(width, height);
        self.grid.layout(&self.proj, surface);
        for (item, (x, y)) in self.info.all().into_iter().zip(info_positions(&self.proj)) {
            surface.set_position(item, x, y);
        }
        for (_, obj) in self.objects.iter() {
            if let (Some(track), Some(pass)) = (&obj.sky_track, &obj.pass) {
                track.reproject(pass, &self.proj, surface);
            }
        }
        true
    }

    /// One timer tick. Returns true when the satellites were refreshed.
    pub fn update(
        &mut self,
        now: f64,
        sats: &BTreeMap<u32, SatelliteSnapshot>,
        predictor: &dyn OrbitPredictor,
        surface: &mut dyn DrawingSurface,
    ) -> bool {
        let resized = self.apply_pending_resize(surface);
        if self.counter < self.refresh && !resized {
            self.counter += 1;
            return false;
        }
        self.counter = 1;
        self.next = NextAos::default();

        for catnum in self.objects.catnums() {
            if !sats.contains_key(&catnum) {
                debug!("satellite {} no longer available", catnum);
                self.destroy_object(catnum, surface);
            }
        }

        for sat in sats.values() {
            self.next.consider(sat, now);
            self.update_sat(sat, now, predictor, surface);
        }

        let text = self.next.text(self.event_info, sats, now, "\n");
        surface.set_text(self.info.next, &text);
        true
    }

    fn update_sat(
        &mut self,
        sat: &SatelliteSnapshot,
        now: f64,
        predictor: &dyn OrbitPredictor,
        surface: &mut dyn DrawingSurface,
    ) {
        let wanted = sat.el >= 0.0 && !sat.decayed;
        match Transition::next(self.objects.contains(sat.catnum), wanted) {
            Transition::Create => self.create_object(sat, now, predictor, surface),
            Transition::Update => self.update_object(sat, now, predictor, surface),
            Transition::Destroy => self.destroy_object(sat.catnum, surface),
            Transition::Ignore => {}
        }
    }

    fn create_object(
        &mut self,
        sat: &SatelliteSnapshot,
        now: f64,
        predictor: &dyn OrbitPredictor,
        surface: &mut dyn DrawingSurface,
    ) {
        let showtrack = if self.showtracks_on.contains(&sat.catnum) {
            true
        } else if self.showtracks_off.contains(&sat.catnum) {
            false
        } else {
            self.show_track_default
        };

        let (x, y) = self.proj.azel_to_xy(sat.az, sat.el);
        let tooltip = az_el_tooltip(sat);
        let colour = self.colours.sat;
        let marker = surface.create_point_marker(
            x - MARKER_HALF,
            y - MARKER_HALF,
            2.0 * MARKER_HALF,
            2.0 * MARKER_HALF,
            colour,
        );
        let label = surface.create_text(x, y + 2.0, &sat.nickname, Anchor::North, colour);
        surface.set_tooltip(marker, &tooltip);
        surface.set_tooltip(label, &tooltip);
        surface.raise_above(marker, None);
        surface.raise_above(label, None);

        let mut obj = PolarObject {
            catnum: sat.catnum,
            marker,
            label,
            selected: false,
            showtrack,
            pass: predictor.current_pass(sat.catnum, &self.qth, now),
            sky_track: None,
        };
        if obj.showtrack {
            obj.build_track(&self.proj, surface, self.colours.track);
        }
        debug!("{} rose above the horizon", sat.nickname);
        self.objects.insert(sat.catnum, obj);
    }

    fn update_object(
        &mut self,
        sat: &SatelliteSnapshot,
        now: f64,
        predictor: &dyn OrbitPredictor,
        surface: &mut dyn DrawingSurface,
    ) {
        let Some(obj) = self.objects.get_mut(sat.catnum) else {
            return;
        };
        let (x, y) = self.proj.azel_to_xy(sat.az, sat.el);
        let losstr = los_text(sat, now);
        let tooltip = format!("{}{}", az_el_tooltip(sat), losstr);

        surface.set_text(obj.label, &sat.nickname);
        surface.set_position(obj.marker, x - MARKER_HALF, y - MARKER_HALF);
        surface.set_position(obj.label, x, y + 2.0);
        surface.set_tooltip(obj.marker, &tooltip);
        surface.set_tooltip(obj.label, &tooltip);

        if obj.selected {
            surface.set_text(self.info.sel, &format!("{}\n{}", sat.nickname, losstr));
        }

        let stale = match &obj.pass {
            None => true,
            Some(pass) => {
                let moved = self.qth.small_dist(&pass.qth_comp) > MAX_QTH_DRIFT_KM;
                let outside = !(pass.aos <= now && pass.los >= now);
                if moved || outside {
                    debug!("updating pass of {} (moved: {}, time: {})", sat.catnum, moved, outside);
                }
                moved || outside
            }
        };
        if stale {
            obj.drop_track(surface);
            obj.pass = predictor.current_pass(sat.catnum, &self.qth, now);
            if obj.showtrack {
                obj.build_track(&self.proj, surface, self.colours.track);
            }
        }
    }

    fn destroy_object(&mut self, catnum: u32, surface: &mut dyn DrawingSurface) {
        let Some(obj) = self.objects.remove(catnum) else {
            return;
        };
        if obj.selected {
            surface.set_text(self.info.sel, "");
        }
        debug!("removing {} from the polar view", catnum);
        obj.destroy(surface);
    }

    /// Select `catnum` and deselect every other satellite.
    pub fn select_sat(&mut self, catnum: u32, surface: &mut dyn DrawingSurface) {
        if !self.objects.select(catnum, surface, self.colours.selection()) {
            debug!("requested satellite {} is not within range", catnum);
        }
    }

    /// Flip the selection of `catnum`, as a click on its marker does.
    pub fn toggle_sat(&mut self, catnum: u32, surface: &mut dyn DrawingSurface) {
        let Some(selected) = self.objects.get(catnum).map(|o| o.selected) else {
            error!("can not find clicked object {}", catnum);
            return;
        };
        if selected {
            if let Some(obj) = self.objects.get_mut(catnum) {
                obj.set_selected(false, surface, self.colours.sat);
            }
            surface.set_text(self.info.sel, "");
        } else {
            self.objects.select(catnum, surface, self.colours.selection());
        }
    }

    /// Show or hide the sky track of `catnum`. The choice outlives the
    /// satellite's current pass.
    pub fn set_show_track(&mut self, catnum: u32, show: bool, surface: &mut dyn DrawingSurface) {
        if show {
            self.showtracks_off.remove(&catnum);
            self.showtracks_on.insert(catnum);
        } else {
            self.showtracks_on.remove(&catnum);
            self.showtracks_off.insert(catnum);
        }

        let Some(obj) = self.objects.get_mut(catnum) else {
            return;
        };
        obj.showtrack = show;
        if show {
            if obj.sky_track.is_none() {
                obj.build_track(&self.proj, surface, self.colours.track);
            }
        } else {
            obj.drop_track(surface);
        }
    }

    /// Pointer moved to (x, y).
    pub fn cursor_moved(&self, x: f64, y: f64, surface: &mut dyn DrawingSurface) {
        if self.cursor_info {
            surface.set_text(self.info.curs, &self.proj.cursor_text(x, y));
        }
    }

    /// Remove everything the view put on the surface.
    pub fn close(mut self, surface: &mut dyn DrawingSurface) {
        self.objects.clear(surface);
        self.grid.delete(surface);
        for item in self.info.all() {
            surface.remove(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::view::surface::RecordingSurface;
    use crate::view::testing::{BASE_JD, FakePredictor, pass, visible};
    use approx::assert_relative_eq;

    const MINUTE: f64 = 1.0 / 1440.0;

    fn config(extra: &[(&str, serde_json::Value)]) -> ModuleConfig {
        let mut cfg = ModuleConfig::empty();
        cfg.set(keys::SECTION_POLAR, keys::REFRESH, 1);
        for (key, value) in extra {
            cfg.set(keys::SECTION_POLAR, key, value.clone());
        }
        cfg
    }

    fn view(cfg: &ModuleConfig, surface: &mut RecordingSurface) -> PolarView {
        PolarView::new(cfg, Qth::default(), surface, 400, 400)
    }

    fn sats(list: &[SatelliteSnapshot]) -> BTreeMap<u32, SatelliteSnapshot> {
        list.iter().map(|s| (s.catnum, s.clone())).collect()
    }

    fn text(surface: &RecordingSurface, item: ItemHandle) -> String {
        surface.get(item).and_then(|i| i.text()).unwrap_or_default().to_string()
    }

    #[test]
    fn test_object_follows_elevation() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[]);
        let mut pv = view(&cfg, &mut surface);
        let fake = FakePredictor::default();
        let static_items = surface.len();

        let mut present = Vec::new();
        for (tick, el) in [-1.0, -1.0, 5.0, 10.0, -1.0].into_iter().enumerate() {
            let now = BASE_JD + tick as f64 * MINUTE;
            pv.update(now, &sats(&[visible(7, 120.0, el)]), &fake, &mut surface);
            present.push(pv.objects().contains(7));
        }

        assert_eq!(present, vec![false, false, true, true, false]);
        assert_eq!(surface.len(), static_items);
    }

    #[test]
    fn test_refresh_divisor() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[(keys::REFRESH, 3.into())]);
        let mut pv = view(&cfg, &mut surface);
        let fake = FakePredictor::default();
        let list = sats(&[visible(1, 0.0, 20.0)]);

        let refreshed: Vec<bool> = (0..7)
            .map(|i| pv.update(BASE_JD + i as f64 * MINUTE, &list, &fake, &mut surface))
            .collect();
        // the first tick consumes the initial layout
        assert_eq!(refreshed, vec![true, false, false, true, false, false, true]);

        pv.resize(300, 300);
        assert!(pv.update(BASE_JD, &list, &fake, &mut surface));
        assert_relative_eq!(pv.projection().r, 125.0);
    }

    #[test]
    fn test_marker_and_tooltip() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[]);
        let mut pv = view(&cfg, &mut surface);
        let fake = FakePredictor::default();
        let now = BASE_JD;
        let mut sat = visible(3, 90.0, 45.0);
        sat.los = now + 125.0 / 86400.0;

        pv.update(now, &sats(&[sat.clone()]), &fake, &mut surface);
        let obj = pv.objects().get(3).expect("object");
        let tip = surface.get(obj.marker).and_then(|i| i.tooltip.clone()).expect("tooltip");
        assert_eq!(tip, "SAT 3\nAz:  90.0\u{b0}\nEl:  45.0\u{b0}\n");
        // r = 175, so the satellite sits halfway out on the east axis
        let (x, y) = surface.position(obj.marker).expect("marker");
        assert_relative_eq!(x, 200.0 + 87.5 - MARKER_HALF, epsilon = 1e-9);
        assert_relative_eq!(y, 200.0 - MARKER_HALF, epsilon = 1e-9);

        pv.update(now, &sats(&[sat]), &fake, &mut surface);
        let obj = pv.objects().get(3).expect("object");
        let tip = surface.get(obj.label).and_then(|i| i.tooltip.clone()).expect("tooltip");
        assert!(tip.starts_with("SAT 3\nAz:  90.0\u{b0}\nEl:  45.0\u{b0}\nLOS in 02:0"), "{}", tip);
    }

    #[test]
    fn test_always_in_range_text() {
        let sat = visible(9, 10.0, 10.0);
        assert_eq!(los_text(&sat, BASE_JD), "SAT 9\nAlways in range");
        let mut sat = sat;
        sat.los = BASE_JD + (3600.0 + 61.0) / 86400.0;
        assert!(los_text(&sat, BASE_JD).starts_with("LOS in 01:01:0"));
    }

    #[test]
    fn test_next_event_text() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[]);
        let mut pv = view(&cfg, &mut surface);
        let fake = FakePredictor::default();
        let now = BASE_JD;

        let mut a = visible(1, 0.0, -3.0);
        a.aos = now + 2.0 / 24.0 + 1e-7;
        let mut b = visible(2, 0.0, -3.0);
        b.aos = now + 30.0 * MINUTE + 1e-7;
        pv.update(now, &sats(&[a.clone(), b]), &fake, &mut surface);
        assert_eq!(text(&surface, pv.info_items().next), "Next: SAT 2\nin 30:00");

        pv.update(now, &sats(&[a]), &fake, &mut surface);
        assert_eq!(text(&surface, pv.info_items().next), "Next: SAT 1\nin 02:00:00");

        pv.update(now, &BTreeMap::new(), &fake, &mut surface);
        assert_eq!(text(&surface, pv.info_items().next), "Next: N/A");
    }

    #[test]
    fn test_selection_is_exclusive() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[]);
        let mut pv = view(&cfg, &mut surface);
        let fake = FakePredictor::default();
        let list = sats(&[visible(1, 10.0, 10.0), visible(2, 200.0, 30.0), visible(3, 300.0, 50.0)]);
        pv.update(BASE_JD, &list, &fake, &mut surface);

        pv.select_sat(1, &mut surface);
        pv.select_sat(2, &mut surface);
        assert_eq!(pv.objects().selected(), Some(2));
        let count = pv.objects().iter().filter(|(_, o)| o.selected).count();
        assert_eq!(count, 1);

        let colours = PolarColours::from_config(&cfg);
        let fill = |cat: u32| pv.objects().get(cat).and_then(|o| surface.get(o.marker)).map(|i| i.fill);
        assert_eq!(fill(1), Some(colours.sat));
        assert_eq!(fill(2), Some(colours.sat_sel));

        pv.update(BASE_JD, &list, &fake, &mut surface);
        assert_eq!(text(&surface, pv.info_items().sel), "SAT 2\nSAT 2\nAlways in range");

        pv.toggle_sat(2, &mut surface);
        assert_eq!(pv.objects().selected(), None);
        assert!(text(&surface, pv.info_items().sel).is_empty());

        pv.toggle_sat(3, &mut surface);
        pv.update(BASE_JD, &list, &fake, &mut surface);
        let set = sats(&[visible(1, 10.0, 10.0), visible(2, 200.0, 30.0), visible(3, 300.0, -1.0)]);
        pv.update(BASE_JD, &set, &fake, &mut surface);
        assert!(!pv.objects().contains(3));
        assert!(text(&surface, pv.info_items().sel).is_empty());
    }

    #[test]
    fn test_pass_recomputed_when_stale() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[]);
        let mut pv = view(&cfg, &mut surface);
        let qth = Qth::default();
        let now = BASE_JD;
        let fake = FakePredictor {
            pass: Some(pass(now - MINUTE, now + 5.0 * MINUTE, 10, &qth)),
            ..FakePredictor::default()
        };
        let list = sats(&[visible(5, 100.0, 20.0)]);

        pv.update(now, &list, &fake, &mut surface);
        assert_eq!(fake.pass_calls.get(), 1);
        pv.update(now + MINUTE, &list, &fake, &mut surface);
        assert_eq!(fake.pass_calls.get(), 1);

        // past LOS of the cached pass
        pv.update(now + 6.0 * MINUTE, &list, &fake, &mut surface);
        assert_eq!(fake.pass_calls.get(), 2);

        pv.set_qth(Qth::new("Aarhus", 56.15, 10.2, 40.0), &mut surface);
        pv.update(now, &list, &fake, &mut surface);
        assert_eq!(fake.pass_calls.get(), 3);
        assert_eq!(text(&surface, pv.info_items().locnam), "Aarhus");
    }

    #[test]
    fn test_missing_pass_is_retried() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[]);
        let mut pv = view(&cfg, &mut surface);
        let fake = FakePredictor::default();
        let list = sats(&[visible(5, 100.0, 20.0)]);
        pv.update(BASE_JD, &list, &fake, &mut surface);
        pv.update(BASE_JD, &list, &fake, &mut surface);
        assert_eq!(fake.pass_calls.get(), 2);
        assert!(pv.objects().get(5).is_some_and(|o| o.pass.is_none()));
    }

    #[test]
    fn test_sky_track_with_ticks() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[(keys::SHOW_TRACK, true.into())]);
        let mut pv = view(&cfg, &mut surface);
        let qth = Qth::default();
        let now = BASE_JD + MINUTE;
        let fake = FakePredictor {
            pass: Some(pass(BASE_JD, BASE_JD + 10.0 * MINUTE, 11, &qth)),
            ..FakePredictor::default()
        };
        pv.update(now, &sats(&[visible(4, 100.0, 10.0)]), &fake, &mut surface);

        let track = pv.objects().get(4).and_then(|o| o.sky_track.clone()).expect("track");
        let points = surface.get(track.line).and_then(|i| i.points().map(<[_]>::to_vec)).expect("points");
        assert_eq!(points.len(), 11);
        // AOS due east on the horizon
        assert_relative_eq!(points[0].0, 375.0, epsilon = 1e-9);
        assert_relative_eq!(points[0].1, 200.0, epsilon = 1e-9);
        // LOS due west
        assert_relative_eq!(points[10].0, 25.0, epsilon = 1e-9);

        // (11 - 2) / 3 = 3: ticks at AOS and samples 3, 6, 9
        let vertices: Vec<usize> = track.ticks.iter().map(|t| t.vertex).collect();
        assert_eq!(vertices, vec![0, 3, 6, 9]);
        let first = surface.get(track.ticks[0].item).expect("tick");
        assert_eq!(first.text(), Some("00:00"));
        assert_eq!(first.anchor(), Some(Anchor::East));
        assert_eq!(surface.get(track.ticks[3].item).and_then(|i| i.anchor()), Some(Anchor::West));

        pv.resize(200, 200);
        pv.update(now, &sats(&[visible(4, 100.0, 10.0)]), &fake, &mut surface);
        let points = surface.get(track.line).and_then(|i| i.points().map(<[_]>::to_vec)).expect("points");
        assert_relative_eq!(points[0].0, 175.0, epsilon = 1e-9);
        let (x, _) = surface.position(track.ticks[0].item).expect("tick");
        assert_relative_eq!(x, 170.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_pass_track() {
        let proj = {
            let mut p = PolarProjection::new(PolarOrientation::Nesw);
            p.resize(400, 400);
            p
        };
        let qth = Qth::default();

        let layout = sky_track_layout(&pass(BASE_JD, BASE_JD + MINUTE, 3, &qth), &proj).expect("layout");
        assert_eq!(layout.points.len(), 3);
        assert_eq!(layout.ticks.len(), 1);

        let layout = sky_track_layout(&pass(BASE_JD, BASE_JD + MINUTE, 1, &qth), &proj).expect("layout");
        assert_eq!(layout.points.len(), 2);

        let mut empty = pass(BASE_JD, BASE_JD + MINUTE, 1, &qth);
        empty.details.clear();
        assert!(sky_track_layout(&empty, &proj).is_none());
    }

    #[test]
    fn test_set_show_track() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[]);
        let mut pv = view(&cfg, &mut surface);
        let qth = Qth::default();
        let fake = FakePredictor {
            pass: Some(pass(BASE_JD, BASE_JD + 10.0 * MINUTE, 11, &qth)),
            ..FakePredictor::default()
        };
        let list = sats(&[visible(4, 100.0, 10.0)]);
        pv.update(BASE_JD + MINUTE, &list, &fake, &mut surface);
        let before = surface.len();

        pv.set_show_track(4, true, &mut surface);
        assert!(pv.objects().get(4).is_some_and(|o| o.sky_track.is_some()));
        assert_eq!(surface.len(), before + 1 + TRACK_TICK_NUM);

        pv.set_show_track(4, false, &mut surface);
        assert_eq!(surface.len(), before);

        // the choice sticks for the next time the satellite rises
        pv.set_show_track(4, true, &mut surface);
        pv.update(BASE_JD, &sats(&[visible(4, 100.0, -1.0)]), &fake, &mut surface);
        pv.update(BASE_JD + MINUTE, &list, &fake, &mut surface);
        assert!(pv.objects().get(4).is_some_and(|o| o.sky_track.is_some()));
    }

    #[test]
    fn test_compass_letters_follow_orientation() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[(keys::ORIENTATION, 2.into())]);
        let pv = view(&cfg, &mut surface);
        let north = pv.grid.letters[0];
        // SENW puts north at the bottom, label below the circle
        let (x, y) = surface.position(north).expect("N");
        assert_relative_eq!(x, 200.0, epsilon = 1e-9);
        assert_relative_eq!(y, 375.0 + POLV_LINE_EXTRA, epsilon = 1e-9);
        assert_eq!(surface.get(north).and_then(|i| i.anchor()), Some(Anchor::North));

        let (_, _, anchor) = Pole::E.label_offset(PolarOrientation::Nesw);
        assert_eq!(anchor, Anchor::West);
        let (_, _, anchor) = Pole::E.label_offset(PolarOrientation::Swne);
        assert_eq!(anchor, Anchor::East);
    }

    #[test]
    fn test_cursor_readout() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[]);
        let pv = view(&cfg, &mut surface);
        pv.cursor_moved(200.0, 200.0 - 87.5, &mut surface);
        assert_eq!(text(&surface, pv.info_items().curs), "AZ 0\u{b0}\nEL 45\u{b0}");
        pv.cursor_moved(5.0, 5.0, &mut surface);
        assert!(text(&surface, pv.info_items().curs).is_empty());
    }

    #[test]
    fn test_close_clears_surface() {
        let mut surface = RecordingSurface::new();
        let cfg = config(&[(keys::SHOW_TRACK, true.into())]);
        let mut pv = view(&cfg, &mut surface);
        let fake = FakePredictor {
            pass: Some(pass(BASE_JD, BASE_JD + 10.0 * MINUTE, 11, &Qth::default())),
            ..FakePredictor::default()
        };
        pv.update(BASE_JD + MINUTE, &sats(&[visible(4, 100.0, 10.0)]), &fake, &mut surface);
        pv.close(&mut surface);
        assert!(surface.is_empty());
    }
}
