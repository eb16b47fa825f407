use crate::core::input::{Keymap, parse_key_token};
use crate::core::network::DEFAULT_GENERATOR_MODEL;
use crate::game::gameplay::DEFAULT_END_LINGER_SECONDS;
use crate::game::note::{DEFAULT_LANE_COUNT, MAX_LANES};
use crate::game::scroll::{DEFAULT_APPROACH_DURATION_S, DEFAULT_HIT_LINE_Y, DEFAULT_SPAWN_Y};
use crate::game::timing_windows::{
    BASE_BAD_S, BASE_GOOD_S, BASE_HOLD_RELEASE_GRACE_S, BASE_LATE_TOLERANCE_S, BASE_PERFECT_S,
    clamp_bad_window_s,
};
use ini::Ini;
use log::{info, warn};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

const CONFIG_PATH: &str = "lanefall.ini";

const MIN_FRAME_RATE: u32 = 10;
const MAX_FRAME_RATE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    /// Seconds a note takes from spawn to the hit line.
    pub approach_duration: f32,
    pub hit_line_y: f32,
    pub spawn_y: f32,
    pub lane_count: usize,
    pub perfect_window: f32,
    pub good_window: f32,
    /// Outer hit window, kept within 0.15..=0.20s.
    pub bad_window: f32,
    pub late_tolerance: f32,
    pub hold_release_grace: f32,
    pub bad_breaks_combo: bool,
    pub end_linger_seconds: f32,
    pub frame_rate: u32,
    // 1 = sleep between frames on the wall clock, 0 = step song time as fast as possible.
    pub realtime: bool,
    pub autoplay_jitter_ms: f32,
    pub demo_seed: u64,
    // None = no file; "builtin:<name>" selects a bundled chart.
    pub beatmap_path: Option<String>,
    pub generator_prompt: Option<String>,
    pub generator_model: String,
    pub keymap: Keymap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            approach_duration: DEFAULT_APPROACH_DURATION_S,
            hit_line_y: DEFAULT_HIT_LINE_Y,
            spawn_y: DEFAULT_SPAWN_Y,
            lane_count: DEFAULT_LANE_COUNT,
            perfect_window: BASE_PERFECT_S,
            good_window: BASE_GOOD_S,
            bad_window: BASE_BAD_S,
            late_tolerance: BASE_LATE_TOLERANCE_S,
            hold_release_grace: BASE_HOLD_RELEASE_GRACE_S,
            bad_breaks_combo: false,
            end_linger_seconds: DEFAULT_END_LINGER_SECONDS,
            frame_rate: 60,
            realtime: true,
            autoplay_jitter_ms: 40.0,
            demo_seed: 0x5eed,
            beatmap_path: None,
            generator_prompt: None,
            generator_model: DEFAULT_GENERATOR_MODEL.to_string(),
            keymap: Keymap::default(),
        }
    }
}

// Global, mutable configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- Value parsing ---

fn parse_bool(v: &str) -> Option<bool> {
    let v = v.trim();
    if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("on") {
        Some(true)
    } else if v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        v.parse::<u8>().ok().map(|n| n != 0)
    }
}

fn get_f32(conf: &Ini, section: &str, key: &str, default: f32) -> f32 {
    conf.get_from(Some(section), key)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn get_bool(conf: &Ini, section: &str, key: &str, default: bool) -> bool {
    conf.get_from(Some(section), key)
        .and_then(parse_bool)
        .unwrap_or(default)
}

fn get_string(conf: &Ini, section: &str, key: &str) -> Option<String> {
    conf.get_from(Some(section), key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[inline(always)]
const fn bool_str(v: bool) -> &'static str {
    if v { "1" } else { "0" }
}

/// Builds a `Config` from a parsed INI, falling back to defaults for missing
/// or unparseable keys and clamping values into their valid ranges.
pub fn from_ini(conf: &Ini) -> Config {
    let default = Config::default();
    let mut cfg = default.clone();

    cfg.log_level = conf
        .get_from(Some("Options"), "LogLevel")
        .and_then(|v| LogLevel::from_str(v).ok())
        .unwrap_or(default.log_level);
    cfg.approach_duration = get_f32(conf, "Options", "ApproachDuration", default.approach_duration);
    if cfg.approach_duration <= 0.0 {
        warn!("ApproachDuration must be positive; using {}.", default.approach_duration);
        cfg.approach_duration = default.approach_duration;
    }
    cfg.hit_line_y = get_f32(conf, "Options", "HitLineY", default.hit_line_y);
    cfg.spawn_y = get_f32(conf, "Options", "SpawnY", default.spawn_y);
    cfg.lane_count = conf
        .get_from(Some("Options"), "LaneCount")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(|n| n.clamp(1, MAX_LANES))
        .unwrap_or(default.lane_count);

    cfg.bad_window = clamp_bad_window_s(get_f32(conf, "Options", "BadWindow", default.bad_window));
    cfg.good_window = get_f32(conf, "Options", "GoodWindow", default.good_window).clamp(0.0, cfg.bad_window);
    cfg.perfect_window =
        get_f32(conf, "Options", "PerfectWindow", default.perfect_window).clamp(0.0, cfg.good_window);
    cfg.late_tolerance = get_f32(conf, "Options", "LateTolerance", default.late_tolerance);
    if cfg.late_tolerance <= 0.0 {
        cfg.late_tolerance = default.late_tolerance;
    }
    cfg.hold_release_grace =
        get_f32(conf, "Options", "HoldReleaseGrace", default.hold_release_grace).max(0.0);
    cfg.bad_breaks_combo = get_bool(conf, "Options", "BadBreaksCombo", default.bad_breaks_combo);
    cfg.end_linger_seconds =
        get_f32(conf, "Options", "EndLingerSeconds", default.end_linger_seconds).max(0.0);
    cfg.frame_rate = conf
        .get_from(Some("Options"), "FrameRate")
        .and_then(|v| v.trim().parse::<u32>().ok())
        .map(|v| v.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE))
        .unwrap_or(default.frame_rate);
    cfg.realtime = get_bool(conf, "Options", "Realtime", default.realtime);
    cfg.autoplay_jitter_ms =
        get_f32(conf, "Options", "AutoplayJitterMs", default.autoplay_jitter_ms).max(0.0);
    cfg.demo_seed = conf
        .get_from(Some("Options"), "DemoSeed")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default.demo_seed);

    cfg.beatmap_path = get_string(conf, "Paths", "Beatmap");
    cfg.generator_prompt = get_string(conf, "Generator", "Prompt");
    cfg.generator_model = get_string(conf, "Generator", "Model").unwrap_or(default.generator_model);

    if let Some(section) = conf.section(Some("Keymaps")) {
        let mut keymap = Keymap::empty();
        for lane in 0..MAX_LANES {
            let Some(tok) = section.get(format!("Lane{lane}")) else {
                continue;
            };
            match parse_key_token(tok) {
                Some(key) => keymap.bind(lane, key),
                None => warn!("Ignoring unrecognized key '{tok}' for Lane{lane}."),
            }
        }
        cfg.keymap = keymap;
    }
    cfg
}

/// Serialises `cfg` back into INI form with a stable key order.
pub fn to_ini(cfg: &Config) -> Ini {
    let mut conf = Ini::new();
    conf.with_section(Some("Options"))
        .set("ApproachDuration", cfg.approach_duration.to_string())
        .set("AutoplayJitterMs", cfg.autoplay_jitter_ms.to_string())
        .set("BadBreaksCombo", bool_str(cfg.bad_breaks_combo))
        .set("BadWindow", cfg.bad_window.to_string())
        .set("DemoSeed", cfg.demo_seed.to_string())
        .set("EndLingerSeconds", cfg.end_linger_seconds.to_string())
        .set("FrameRate", cfg.frame_rate.to_string())
        .set("GoodWindow", cfg.good_window.to_string())
        .set("HitLineY", cfg.hit_line_y.to_string())
        .set("HoldReleaseGrace", cfg.hold_release_grace.to_string())
        .set("LaneCount", cfg.lane_count.to_string())
        .set("LateTolerance", cfg.late_tolerance.to_string())
        .set("LogLevel", cfg.log_level.as_str())
        .set("PerfectWindow", cfg.perfect_window.to_string())
        .set("Realtime", bool_str(cfg.realtime))
        .set("SpawnY", cfg.spawn_y.to_string());
    conf.with_section(Some("Paths"))
        .set("Beatmap", cfg.beatmap_path.clone().unwrap_or_default());
    conf.with_section(Some("Generator"))
        .set("Model", cfg.generator_model.clone())
        .set("Prompt", cfg.generator_prompt.clone().unwrap_or_default());
    for lane in 0..cfg.lane_count {
        let key = cfg
            .keymap
            .key_for_lane(lane)
            .map(|c| c.to_ascii_uppercase().to_string())
            .unwrap_or_default();
        conf.with_section(Some("Keymaps"))
            .set(format!("Lane{lane}"), key);
    }
    conf
}

// --- File I/O ---

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    to_ini(&Config::default()).write_to_file(path)
}

pub fn load() {
    let path = Path::new(CONFIG_PATH);
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    match Ini::load_from_file(path) {
        Ok(conf) => {
            let cfg = from_ini(&conf);
            *CONFIG.lock().unwrap() = cfg;
            info!("Configuration loaded from '{CONFIG_PATH}'.");
        }
        Err(e) => {
            warn!("Failed to load '{CONFIG_PATH}': {e}. Using default settings.");
        }
    }
}

pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}
