//! World map view
//!
//! Every satellite that has not decayed gets a marker at its sub-satellite
//! point, a range circle and optionally a ground track. Objects live until
//! the satellite decays, leaves the snapshot set or the view is closed.

use crate::config::{ConfigAccessor, Rgba, defaults, keys};
use crate::orbital::observer::Qth;
use crate::orbital::snapshot::{OrbitPredictor, SatelliteSnapshot};
use crate::view::cache::{ObjectCache, SatelliteDrawable, SelectionColours, Transition};
use crate::view::footprint::{Footprint, calculate_footprint};
use crate::view::ground_track::GroundTrack;
use crate::view::projection::{MapProjection, Ssp};
use crate::view::surface::{Anchor, DrawingSurface, ItemHandle};
use crate::view::{Countdown, InfoItems, NextAos};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, warn};

const MARKER_HALF: f64 = 1.0;
/// Labels closer than this to the left or right map edge flip sides.
const LABEL_EDGE_X: f64 = 50.0;
/// Labels closer than this to the bottom edge go above the marker.
const LABEL_EDGE_Y: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MapColours {
    sat: Rgba,
    sat_sel: Rgba,
    coverage: Rgba,
    track: Rgba,
    info: Rgba,
    qth: Rgba,
    /// Black at the configured shadow alpha.
    shadow: Rgba,
}

impl MapColours {
    fn from_config(cfg: &dyn ConfigAccessor) -> Self {
        let s = keys::SECTION_MAP;
        let alpha = cfg.get_int(s, keys::SHADOW_ALPHA, defaults::MAP_SHADOW_ALPHA).clamp(0, 0xFF) as u8;
        Self {
            sat: cfg.get_color(s, keys::SAT_COLOUR, defaults::MAP_SAT_COLOUR),
            sat_sel: cfg.get_color(s, keys::SAT_SEL_COLOUR, defaults::MAP_SAT_SEL_COLOUR),
            coverage: cfg.get_color(s, keys::COV_AREA_COLOUR, defaults::MAP_COV_AREA_COLOUR),
            track: cfg.get_color(s, keys::TRACK_COLOUR, defaults::MAP_TRACK_COLOUR),
            info: cfg.get_color(s, keys::INFO_COLOUR, defaults::MAP_INFO_COLOUR),
            qth: cfg.get_color(s, keys::QTH_COLOUR, defaults::MAP_QTH_COLOUR),
            shadow: Rgba::TRANSPARENT.with_alpha(alpha),
        }
    }

    fn selection(&self) -> SelectionColours {
        SelectionColours {
            default: self.sat,
            selected: self.sat_sel,
        }
    }

    fn coverage_fill(&self, showcov: bool) -> Rgba {
        if showcov { self.coverage } else { Rgba::TRANSPARENT }
    }
}

/// A satellite plotted on the map.
#[derive(Debug)]
pub struct MapObject {
    pub catnum: u32,
    pub marker: ItemHandle,
    pub shadow_marker: ItemHandle,
    pub label: ItemHandle,
    pub shadow_label: ItemHandle,
    pub range1: ItemHandle,
    pub range2: Option<ItemHandle>,
    /// Number of range circle parts drawn last.
    pub rc_parts: usize,
    pub selected: bool,
    pub showtrack: bool,
    pub showcov: bool,
    pub track: Option<GroundTrack>,
}

impl MapObject {
    fn stroke(&self, colours: &MapColours) -> Rgba {
        if self.selected { colours.sat_sel } else { colours.sat }
    }

    /// Redraw the range circle, adding or removing the second part when the
    /// part count changes.
    fn update_range(&mut self, fp: &Footprint, surface: &mut dyn DrawingSurface, colours: &MapColours) {
        if let Some(first) = fp.parts.first() {
            surface.set_points(self.range1, first);
        }
        match (self.range2, fp.parts.get(1)) {
            (None, Some(points)) => {
                let fill = colours.coverage_fill(self.showcov);
                self.range2 = Some(surface.create_polyline(points, self.stroke(colours), fill));
            }
            (Some(range2), Some(points)) => surface.set_points(range2, points),
            (Some(range2), None) => {
                surface.remove(range2);
                self.range2 = None;
            }
            (None, None) => {}
        }
        self.rc_parts = fp.part_count();
    }

    fn ranges(&self) -> impl Iterator<Item = ItemHandle> + '_ {
        std::iter::once(self.range1).chain(self.range2)
    }

    fn delete_track(&mut self, surface: &mut dyn DrawingSurface) {
        if let Some(track) = self.track.take() {
            track.delete(surface);
        }
    }
}

impl SatelliteDrawable for MapObject {
    fn is_selected(&self) -> bool {
        self.selected
    }

    fn set_selected(&mut self, selected: bool, surface: &mut dyn DrawingSurface, colour: Rgba) {
        self.selected = selected;
        surface.set_color(self.marker, colour);
        surface.set_color(self.label, colour);
        for range in self.ranges() {
            surface.set_color(range, colour);
        }
    }

    fn destroy(mut self, surface: &mut dyn DrawingSurface) {
        self.delete_track(surface);
        for item in [self.marker, self.shadow_marker, self.label, self.shadow_label] {
            surface.remove(item);
        }
        for range in self.ranges() {
            surface.remove(range);
        }
    }
}

/// Label position and anchor for a marker at (x, y), keeping the text
/// inside the map.
fn label_placement(x: f64, y: f64, map: &MapProjection) -> (f64, f64, Anchor) {
    if x - map.x0 < LABEL_EDGE_X {
        (x + 3.0, y, Anchor::West)
    } else if map.x0 + map.width - x < LABEL_EDGE_X {
        (x - 3.0, y, Anchor::East)
    } else if map.y0 + map.height - y < LABEL_EDGE_Y {
        (x, y - 2.0, Anchor::South)
    } else {
        (x, y + 2.0, Anchor::North)
    }
}

fn position_tooltip(sat: &SatelliteSnapshot) -> String {
    format!(
        "{}\nLon: {:5.1}\u{b0}\nLat: {:5.1}\u{b0}\n Az: {:5.1}\u{b0}\n El: {:5.1}\u{b0}",
        sat.nickname, sat.ssplon, sat.ssplat, sat.az, sat.el
    )
}

/// Minutes to the next event: LOS while up, AOS while down.
fn aoslos_text(sat: &SatelliteSnapshot, now: f64) -> String {
    if sat.el > 0.0 {
        format!("LOS in {} minutes", Countdown::until(sat.los, now).total_minutes())
    } else {
        format!("AOS in {} minutes", Countdown::until(sat.aos, now).total_minutes())
    }
}

fn selected_text(sat: &SatelliteSnapshot, now: f64) -> String {
    let event = if sat.el > 0.0 {
        (sat.los > 0.0).then_some(("LOS", sat.los))
    } else {
        (sat.aos > 0.0).then_some(("AOS", sat.aos))
    };
    match event {
        Some((what, t)) => format!("{} {} in {}", sat.nickname, what, Countdown::until(t, now).clock()),
        None if sat.el > 0.0 => format!("{}: Always in range", sat.nickname),
        None => format!("{}: Always out of range", sat.nickname),
    }
}

fn info_positions(map: &MapProjection) -> [(f64, f64); 4] {
    let left = map.x0 + 2.0;
    let right = map.x0 + map.width - 2.0;
    let top = map.y0 + 1.0;
    let bottom = map.y0 + map.height - 1.0;
    [(left, bottom), (left, top), (right, top), (right, bottom)]
}

fn u32_set(values: Vec<i64>) -> BTreeSet<u32> {
    values.into_iter().filter_map(|v| u32::try_from(v).ok()).collect()
}

pub struct MapView {
    proj: MapProjection,
    qth: Qth,
    colours: MapColours,
    refresh: u32,
    counter: u32,
    next: NextAos,
    pending_resize: Option<(u32, u32)>,
    track_orbits: u32,
    showtracks: BTreeSet<u32>,
    hidecovs: BTreeSet<u32>,
    qth_info: bool,
    event_info: bool,
    cursor_info: bool,
    objects: ObjectCache<MapObject>,
    qth_mark: ItemHandle,
    qth_label: ItemHandle,
    info: InfoItems,
}

impl MapView {
    pub fn new(cfg: &dyn ConfigAccessor, qth: Qth, surface: &mut dyn DrawingSurface, width: u32, height: u32) -> Self {
        let s = keys::SECTION_MAP;
        let colours = MapColours::from_config(cfg);
        let center = cfg.get_int(s, keys::CENTER, defaults::MAP_CENTER);
        let mut proj = MapProjection::new(center as f64, cfg.get_bool(s, keys::KEEP_RATIO, defaults::MAP_KEEP_RATIO));
        proj.resize(width, height);

        let (x, y) = proj.lonlat_to_xy(qth.lon, qth.lat);
        let qth_mark = surface.create_point_marker(
            x - MARKER_HALF,
            y - MARKER_HALF,
            2.0 * MARKER_HALF,
            2.0 * MARKER_HALF,
            colours.qth,
        );
        let qth_label = surface.create_text(x, y + 2.0, &qth.name, Anchor::North, colours.qth);

        let qth_info = cfg.get_bool(s, keys::QTH_INFO, defaults::MAP_QTH_INFO);
        let [curs, locnam, next, sel] = info_positions(&proj);
        let qth_name = if qth_info { qth.name.as_str() } else { "" };
        let info = InfoItems {
            curs: surface.create_text(curs.0, curs.1, "", Anchor::SouthWest, colours.info),
            locnam: surface.create_text(locnam.0, locnam.1, qth_name, Anchor::NorthWest, colours.info),
            next: surface.create_text(next.0, next.1, "", Anchor::NorthEast, colours.info),
            sel: surface.create_text(sel.0, sel.1, "", Anchor::SouthEast, colours.info),
        };

        let refresh = cfg.get_int(s, keys::REFRESH, defaults::MAP_REFRESH);
        let track_orbits = cfg.get_int(s, keys::TRACK_NUMBER, defaults::MAP_TRACK_NUMBER);
        Self {
            proj,
            qth,
            colours,
            refresh: u32::try_from(refresh).unwrap_or(defaults::MAP_REFRESH as u32),
            counter: 1,
            next: NextAos::default(),
            pending_resize: Some((width, height)),
            track_orbits: u32::try_from(track_orbits).unwrap_or(defaults::MAP_TRACK_NUMBER as u32),
            showtracks: u32_set(cfg.get_int_list(s, keys::SHOWTRACKS)),
            hidecovs: u32_set(cfg.get_int_list(s, keys::HIDECOVS)),
            qth_info,
            event_info: cfg.get_bool(s, keys::NEXT_EVENT, defaults::MAP_NEXT_EVENT),
            cursor_info: cfg.get_bool(s, keys::CURSOR_TRACK, defaults::MAP_CURSOR_TRACK),
            objects: ObjectCache::new(),
            qth_mark,
            qth_label,
            info,
        }
    }

    pub fn projection(&self) -> &MapProjection {
        &self.proj
    }

    pub fn objects(&self) -> &ObjectCache<MapObject> {
        &self.objects
    }

    pub fn info_items(&self) -> InfoItems {
        self.info
    }

    pub fn qth_mark(&self) -> ItemHandle {
        self.qth_mark
    }

    /// Takes effect on the next tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
    }

    /// Move the observer. The mark follows on the next tick.
    pub fn set_qth(&mut self, qth: Qth, surface: &mut dyn DrawingSurface) {
        surface.set_text(self.qth_label, &qth.name);
        if self.qth_info {
            surface.set_text(self.info.locnam, &qth.name);
        }
        self.qth = qth;
    }

    fn place_qth(&self, surface: &mut dyn DrawingSurface) {
        let (x, y) = self.proj.lonlat_to_xy(self.qth.lon, self.qth.lat);
        surface.set_position(self.qth_mark, x - MARKER_HALF, y - MARKER_HALF);
        surface.set_position(self.qth_label, x, y + 2.0);
    }

    /// Reposition the observer mark if it is off by a marker size or more.
    fn qth_moved(&self, surface: &mut dyn DrawingSurface) -> bool {
        let (x, y) = self.proj.lonlat_to_xy(self.qth.lon, self.qth.lat);
        let Some((ox, oy)) = surface.position(self.qth_mark) else {
            return false;
        };
        let moved = (ox + MARKER_HALF - x).abs() >= 2.0 * MARKER_HALF || (oy + MARKER_HALF - y).abs() >= 2.0 * MARKER_HALF;
        if moved {
            self.place_qth(surface);
        }
        moved
    }

    fn apply_pending_resize(&mut self, surface: &mut dyn DrawingSurface) -> bool {
        let Some((width, height)) = self.pending_resize.take() else {
            return false;
        };
        self.proj.resize(width, height);
        self.place_qth(surface);
        for (item, (x, y)) in self.info.all().into_iter().zip(info_positions(&self.proj)) {
            surface.set_position(item, x, y);
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
        if self.qth_moved(surface) {
            self.counter = self.refresh;
        }
        if self.counter < self.refresh && !resized {
            self.counter += 1;
            return false;
        }
        self.counter = 1;
        self.next = NextAos::default();

        for catnum in self.objects.catnums() {
            if !sats.contains_key(&catnum) {
                debug!("satellite {} no longer available", catnum);
                self.free_sat(catnum, surface);
            }
        }

        for sat in sats.values() {
            self.next.consider(sat, now);
            match Transition::next(self.objects.contains(sat.catnum), !sat.decayed) {
                Transition::Create => self.plot_sat(sat, now, predictor, surface),
                Transition::Update => self.update_sat(sat, now, predictor, surface, resized),
                Transition::Destroy => self.free_sat(sat.catnum, surface),
                Transition::Ignore => {}
            }
        }

        let text = self.next.text(self.event_info, sats, now, " ");
        surface.set_text(self.info.next, &text);
        true
    }

    fn plot_sat(
        &mut self,
        sat: &SatelliteSnapshot,
        now: f64,
        predictor: &dyn OrbitPredictor,
        surface: &mut dyn DrawingSurface,
    ) {
        let colours = self.colours;
        let showcov = !self.hidecovs.contains(&sat.catnum);
        let cov = colours.coverage_fill(showcov);
        let (x, y) = self.proj.lonlat_to_xy(sat.ssplon, sat.ssplat);
        let size = 2.0 * MARKER_HALF;
        let tooltip = position_tooltip(sat);

        // shadows go first so they stay underneath
        let shadow_marker =
            surface.create_point_marker(x - MARKER_HALF + 1.0, y - MARKER_HALF + 1.0, size, size, colours.shadow);
        let marker = surface.create_point_marker(x - MARKER_HALF, y - MARKER_HALF, size, size, colours.sat);
        let shadow_label = surface.create_text(x + 1.0, y + 3.0, &sat.nickname, Anchor::North, colours.shadow);
        let label = surface.create_text(x, y + 2.0, &sat.nickname, Anchor::North, colours.sat);
        surface.set_tooltip(marker, &tooltip);
        surface.set_tooltip(label, &tooltip);

        let fp = calculate_footprint(Ssp { lat: sat.ssplat, lon: sat.ssplon }, sat.footprint, &self.proj);
        let first = fp.parts.first().map(Vec::as_slice).unwrap_or_default();
        let range1 = surface.create_polyline(first, colours.sat, cov);
        let range2 = fp.parts.get(1).map(|points| surface.create_polyline(points, colours.sat, cov));

        let mut obj = MapObject {
            catnum: sat.catnum,
            marker,
            shadow_marker,
            label,
            shadow_label,
            range1,
            range2,
            rc_parts: fp.part_count(),
            selected: false,
            showtrack: self.showtracks.contains(&sat.catnum),
            showcov,
            track: None,
        };
        if obj.showtrack {
            self.recompute_track(&mut obj, sat, now, predictor, surface);
        }
        debug!("plotted {} on the map", sat.nickname);
        self.objects.insert(sat.catnum, obj);
    }

    fn recompute_track(
        &self,
        obj: &mut MapObject,
        sat: &SatelliteSnapshot,
        now: f64,
        predictor: &dyn OrbitPredictor,
        surface: &mut dyn DrawingSurface,
    ) {
        obj.delete_track(surface);
        debug!("computing ground track of {} for orbit {}", sat.nickname, sat.orbit);
        match GroundTrack::create(
            predictor,
            sat,
            &self.qth,
            now,
            self.track_orbits,
            &self.proj,
            surface,
            obj.marker,
            self.colours.track,
        ) {
            Ok(track) => obj.track = Some(track),
            Err(e) => warn!("no ground track for {}: {}", sat.nickname, e),
        }
    }

    fn update_sat(
        &mut self,
        sat: &SatelliteSnapshot,
        now: f64,
        predictor: &dyn OrbitPredictor,
        surface: &mut dyn DrawingSurface,
        resized: bool,
    ) {
        let Some(mut obj) = self.objects.remove(sat.catnum) else {
            return;
        };
        let colours = self.colours;

        if obj.selected {
            surface.set_text(self.info.sel, &selected_text(sat, now));
        }
        surface.set_text(obj.label, &sat.nickname);
        surface.set_text(obj.shadow_label, &sat.nickname);
        let tooltip = format!("{}\n{}", position_tooltip(sat), aoslos_text(sat, now));
        surface.set_tooltip(obj.marker, &tooltip);
        surface.set_tooltip(obj.label, &tooltip);

        let (x, y) = self.proj.lonlat_to_xy(sat.ssplon, sat.ssplat);
        let moved = match surface.position(obj.marker) {
            Some((ox, oy)) => {
                (ox + MARKER_HALF - x).abs() >= 2.0 * MARKER_HALF || (oy + MARKER_HALF - y).abs() >= 2.0 * MARKER_HALF
            }
            None => true,
        };
        if moved || resized {
            surface.set_position(obj.marker, x - MARKER_HALF, y - MARKER_HALF);
            surface.set_position(obj.shadow_marker, x - MARKER_HALF + 1.0, y - MARKER_HALF + 1.0);
            let (lx, ly, anchor) = label_placement(x, y, &self.proj);
            surface.set_position(obj.label, lx, ly);
            surface.set_anchor(obj.label, anchor);
            surface.set_position(obj.shadow_label, lx + 1.0, ly + 1.0);
            surface.set_anchor(obj.shadow_label, anchor);

            let fp = calculate_footprint(Ssp { lat: sat.ssplat, lon: sat.ssplon }, sat.footprint, &self.proj);
            obj.update_range(&fp, surface, &colours);
        }

        if obj.showtrack {
            let orbit_changed = obj.track.as_ref().map(|t| t.orbit) != Some(sat.orbit);
            if orbit_changed {
                self.recompute_track(&mut obj, sat, now, predictor, surface);
            } else if resized {
                if let Some(track) = obj.track.as_mut() {
                    track.rebuild_lines(&self.proj, surface, obj.marker, colours.track);
                }
            }
        }

        self.objects.insert(sat.catnum, obj);
    }

    fn free_sat(&mut self, catnum: u32, surface: &mut dyn DrawingSurface) {
        let Some(obj) = self.objects.remove(catnum) else {
            return;
        };
        if obj.selected {
            surface.set_text(self.info.sel, "");
        }
        debug!("removing {} from the map", catnum);
        obj.destroy(surface);
    }

    pub fn select_sat(&mut self, catnum: u32, surface: &mut dyn DrawingSurface) {
        if !self.objects.select(catnum, surface, self.colours.selection()) {
            error!("can not find satellite {} on the map", catnum);
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

    /// Show or hide the ground track of `catnum` right away.
    pub fn set_show_track(
        &mut self,
        catnum: u32,
        show: bool,
        sats: &BTreeMap<u32, SatelliteSnapshot>,
        now: f64,
        predictor: &dyn OrbitPredictor,
        surface: &mut dyn DrawingSurface,
    ) {
        if show {
            self.showtracks.insert(catnum);
        } else {
            self.showtracks.remove(&catnum);
        }

        let Some(mut obj) = self.objects.remove(catnum) else {
            return;
        };
        obj.showtrack = show;
        if !show {
            obj.delete_track(surface);
        } else if obj.track.is_none() {
            match sats.get(&catnum) {
                Some(sat) => self.recompute_track(&mut obj, sat, now, predictor, surface),
                None => error!("no data for satellite {}", catnum),
            }
        }
        self.objects.insert(catnum, obj);
    }

    /// Fill or clear the range circle of `catnum`.
    pub fn set_show_coverage(&mut self, catnum: u32, show: bool, surface: &mut dyn DrawingSurface) {
        if show {
            self.hidecovs.remove(&catnum);
        } else {
            self.hidecovs.insert(catnum);
        }
        let fill = self.colours.coverage_fill(show);
        if let Some(obj) = self.objects.get_mut(catnum) {
            obj.showcov = show;
            for range in obj.ranges() {
                surface.set_fill(range, fill);
            }
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
        surface.remove(self.qth_mark);
        surface.remove(self.qth_label);
        for item in self.info.all() {
            surface.remove(item);
        }
    }
}
