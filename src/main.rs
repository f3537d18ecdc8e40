//! Headless satellite plotting
//!
//! Loads element sets, steps a simulation clock and drives the polar and map
//! views against in-memory surfaces, then reports what ended up on them.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use orbitview::config::{ModuleConfig, Settings};
use orbitview::orbital::passes::get_passes;
use orbitview::orbital::{Catalog, PredictSettings, Qth, SatelliteSnapshot, SimulationClock};
use orbitview::tle::{TleCache, TleData, fetch_blocking, parse_tle_file};
use orbitview::view::{InfoItems, ItemHandle, MapView, PolarView, RecordingSurface};

/// Days before a cached element set is fetched again.
const TLE_CACHE_DAYS: i64 = 2;
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "orbitview", about = "Polar and map satellite plots, headless")]
struct Args {
    /// Element set file, 2- or 3-line format
    #[arg(long = "tle")]
    tle_files: Vec<PathBuf>,

    /// Fetch element sets by catalog number
    #[arg(long, value_delimiter = ',')]
    norad: Vec<u32>,

    /// Fetch a Celestrak group, e.g. "stations"
    #[arg(long)]
    group: Vec<String>,

    /// Settings file (JSON), defaults to the platform config dir
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the on-disk element set cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    #[arg(long, default_value_t = 51.4779, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, default_value_t = -0.0015, allow_negative_numbers = true)]
    lon: f64,

    /// Observer altitude in metres
    #[arg(long, default_value_t = 45.0, allow_negative_numbers = true)]
    alt: f64,

    #[arg(long, default_value = "Greenwich")]
    qth_name: String,

    /// Simulation start (RFC 3339), defaults to now
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Number of timer ticks to run
    #[arg(long, default_value_t = 10)]
    ticks: u32,

    /// Wall-clock seconds per tick
    #[arg(long, default_value_t = 1.0)]
    step_secs: f64,

    /// Simulated seconds per wall-clock second, negative runs backwards
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    time_scale: f64,

    /// Map width in device units
    #[arg(long, default_value_t = 720)]
    width: u32,

    /// Map height in device units
    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Side of the square polar chart
    #[arg(long, default_value_t = 400)]
    polar_size: u32,

    /// Catalog number to select in both views
    #[arg(long)]
    select: Option<u32>,

    /// Catalog number whose track is shown in both views
    #[arg(long)]
    show_track: Vec<u32>,

    /// List up to N upcoming passes for the selected satellite, or for
    /// every loaded one without --select
    #[arg(long, value_name = "N")]
    passes: Option<usize>,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_settings(path: Option<&PathBuf>) -> Settings {
    let loaded = match path {
        Some(p) => Settings::load_from(p),
        None => Settings::load(),
    };
    loaded.unwrap_or_else(|e| {
        warn!("settings not loaded, using defaults: {:#}", e);
        Settings {
            path: None,
            global: Default::default(),
        }
    })
}

fn load_tles(args: &Args) -> anyhow::Result<Vec<TleData>> {
    let mut tles = Vec::new();
    for path in &args.tle_files {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let sets = parse_tle_file(&text);
        info!("{} element sets in {}", sets.len(), path.display());
        tles.extend(sets);
    }

    if !args.norad.is_empty() || !args.group.is_empty() {
        let cache = if args.no_cache {
            None
        } else {
            TleCache::new(TLE_CACHE_DAYS)
                .map_err(|e| warn!("TLE cache unavailable: {:#}", e))
                .ok()
        };
        tles.extend(fetch_blocking(&args.norad, &args.group, cache.as_ref(), FETCH_TIMEOUT)?);
    }
    Ok(tles)
}

fn text_of(surface: &RecordingSurface, item: ItemHandle) -> &str {
    surface.get(item).and_then(|i| i.text()).unwrap_or_default()
}

fn report(title: &str, surface: &RecordingSurface, info: InfoItems, objects: usize) {
    let (lines, points) = surface
        .polylines()
        .filter_map(|item| item.points())
        .fold((0, 0), |(n, p), pts| (n + 1, p + pts.len()));
    println!("{}", title);
    println!("  objects:   {}", objects);
    println!("  next:      {}", text_of(surface, info.next).replace('\n', " "));
    println!("  selected:  {}", text_of(surface, info.sel).replace('\n', " "));
    println!("  items:     {} ({} polylines, {} vertices)", surface.len(), lines, points);
}

fn report_passes(catalog: &Catalog, qth: &Qth, start: f64, num: usize, only: Option<u32>) {
    let settings = &catalog.settings;
    for (catnum, sat) in catalog.satellites() {
        if only.is_some_and(|c| c != *catnum) {
            continue;
        }
        println!("passes of {} ({}) over {}", sat.name, catnum, qth.name);
        let passes = match get_passes(sat, qth, start, settings.look_ahead_days, num, settings) {
            Ok(p) => p,
            Err(e) => {
                warn!("pass search for {} failed: {:#}", sat.name, e);
                continue;
            }
        };
        if passes.is_empty() {
            println!("  none within {} days", settings.look_ahead_days);
        }
        for pass in passes {
            let when = |jd: f64| {
                orbitview::core::julian_date_to_utc(jd)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "?".to_string())
            };
            println!(
                "  AOS {}  LOS {}  max el {:5.1}\u{b0} at az {:5.1}\u{b0}  orbit {}",
                when(pass.aos),
                when(pass.los),
                pass.max_el,
                pass.maxel_az,
                pass.orbit
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = load_settings(args.config.as_ref());
    let cfg = settings.module(ModuleConfig::empty());
    let qth = Qth::new(args.qth_name.clone(), args.lat, args.lon, args.alt);
    let step = Duration::try_from_secs_f64(args.step_secs).context("invalid --step-secs")?;

    let tles = load_tles(&args)?;
    let mut catalog = Catalog::new(PredictSettings::from_config(&cfg));
    if catalog.load_tles(&tles) == 0 {
        anyhow::bail!("no usable element sets, pass --tle, --norad or --group");
    }

    let mut clock = SimulationClock::new(args.start.unwrap_or_else(Utc::now), args.time_scale);
    let mut polar_surface = RecordingSurface::new();
    let mut map_surface = RecordingSurface::new();
    let mut polar = PolarView::new(&cfg, qth.clone(), &mut polar_surface, args.polar_size, args.polar_size);
    let mut map = MapView::new(&cfg, qth.clone(), &mut map_surface, args.width, args.height);

    let mut sats: BTreeMap<u32, SatelliteSnapshot> = BTreeMap::new();
    for tick in 0..args.ticks {
        let jd = clock.julian_date();
        sats = catalog.snapshots(&qth, jd);
        let predictor = catalog.predictor();

        let polar_refreshed = polar.update(jd, &sats, &predictor, &mut polar_surface);
        let map_refreshed = map.update(jd, &sats, &predictor, &mut map_surface);
        debug!(
            "tick {} at {}: polar {} map {}",
            tick, clock.current_utc, polar_refreshed, map_refreshed
        );

        if tick == 0 {
            if let Some(catnum) = args.select {
                polar.select_sat(catnum, &mut polar_surface);
                map.select_sat(catnum, &mut map_surface);
            }
            for &catnum in &args.show_track {
                polar.set_show_track(catnum, true, &mut polar_surface);
                map.set_show_track(catnum, true, &sats, jd, &predictor, &mut map_surface);
            }
        }
        clock.advance(step);
    }

    let visible = sats.values().filter(|s| s.el > 0.0).count();
    println!("{} satellites at {}, {} above the horizon", sats.len(), clock.current_utc, visible);
    report("polar", &polar_surface, polar.info_items(), polar.objects().len());
    report("map", &map_surface, map.info_items(), map.objects().len());
    if let Some(num) = args.passes {
        report_passes(&catalog, &qth, clock.julian_date(), num, args.select);
    }

    polar.close(&mut polar_surface);
    map.close(&mut map_surface);
    Ok(())
}
