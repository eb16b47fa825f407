mod autoplay;
mod config;
mod core;
mod game;

use crate::autoplay::Autoplay;
use crate::config::Config;
use crate::core::clock::{ManualTrack, SongClock};
use crate::core::network;
use crate::game::beatmap::{BUILTIN_PREFIX, Beatmap, BeatmapError};
use crate::game::gameplay::{self, GameplayConfig, SessionPhase, State};
use crate::game::scores::ScoreListener;
use crate::game::stage_stats::StageSummary;
use log::{debug, info, warn};
use std::error::Error;
use std::time::{Duration, Instant};

// Hard stop for a stepped run, past the point the session should have ended.
const STEPPED_OVERRUN_SECONDS: f32 = 10.0;

struct ScoreLogger;

impl ScoreListener for ScoreLogger {
    fn on_score_update(&mut self, score: u64, combo: u32) {
        debug!("Score update: score={score}, combo={combo}");
    }

    fn on_session_end(&mut self) {
        info!("Session end signalled.");
    }
}

fn load_configured_beatmap(path: &str, cfg: &Config) -> Result<Beatmap, BeatmapError> {
    match path.strip_prefix(BUILTIN_PREFIX) {
        Some(name) => Beatmap::load_builtin(name, cfg.lane_count, cfg.demo_seed),
        None => Beatmap::load_from_file(path, cfg.lane_count),
    }
}

/// Picks the chart for this run: the configured file or built-in, else a
/// generated one, else the seeded demo chart.
fn select_beatmap(cfg: &Config) -> Result<Beatmap, BeatmapError> {
    if let Some(path) = cfg.beatmap_path.as_deref() {
        match load_configured_beatmap(path, cfg) {
            Ok(map) => return Ok(map),
            Err(e) => warn!("Could not load beatmap '{path}': {e}. Falling back."),
        }
    }

    if let Some(prompt) = cfg.generator_prompt.as_deref() {
        let records = network::generate_beatmap(prompt, &cfg.generator_model);
        if records.is_empty() {
            warn!("Generator produced no notes. Falling back to the demo chart.");
        } else {
            match Beatmap::from_records(&records, cfg.lane_count) {
                Ok(map) => return Ok(map),
                Err(e) => warn!("Generated beatmap rejected: {e}. Falling back to the demo chart."),
            }
        }
    }

    info!("Using demo chart (seed {}).", cfg.demo_seed);
    Beatmap::demo(cfg.lane_count, cfg.demo_seed)
}

fn run_realtime(state: &mut State, bot: &mut Autoplay, frame_period: Duration) {
    loop {
        let frame_start = Instant::now();
        if gameplay::update(state) != SessionPhase::Running {
            return;
        }
        bot.drive(state);
        autoplay::log_frame_events(state);
        if let Some(rest) = frame_period.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }
}

fn log_summary(summary: &StageSummary) {
    info!(
        "Finished {}: score={}, max_combo={}{}",
        summary.finished_at.format("%Y-%m-%d %H:%M:%S"),
        summary.score,
        summary.max_combo,
        if summary.is_full_combo() { " (full combo)" } else { "" }
    );
    info!(
        "Perfect={} Good={} Bad={} Miss={} | holds held={} let go={} | {}/{} notes judged",
        summary.perfect,
        summary.good,
        summary.bad,
        summary.miss,
        summary.holds_held,
        summary.holds_let_go,
        summary.judged(),
        summary.total_notes
    );
    info!(
        "Timing: mean={:.2}ms, mean_abs={:.2}ms, stddev={:.2}ms, max_abs={:.2}ms over {} hits",
        summary.timing.mean_ms,
        summary.timing.mean_abs_ms,
        summary.timing.stddev_ms,
        summary.timing.max_abs_ms,
        summary.timing.count
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let keys: Vec<String> = (0..cfg.lane_count)
        .map(|lane| {
            cfg.keymap
                .key_for_lane(lane)
                .map_or_else(|| "-".to_string(), |c| c.to_ascii_uppercase().to_string())
        })
        .collect();
    info!("Lane keys: {}", keys.join(" "));

    let beatmap = select_beatmap(&cfg)?;
    let gameplay_cfg = GameplayConfig::from(&cfg);
    let mut bot = Autoplay::new(cfg.demo_seed, cfg.autoplay_jitter_ms);
    let frame_period = Duration::from_secs_f32(1.0 / cfg.frame_rate as f32);

    let mut state = if cfg.realtime {
        let mut state = gameplay::init(beatmap, gameplay_cfg, SongClock::wall(), Box::new(ScoreLogger));
        if !gameplay::start(&mut state) {
            return Err("session failed to start".into());
        }
        run_realtime(&mut state, &mut bot, frame_period);
        state
    } else {
        let track = ManualTrack::new();
        let clock = SongClock::new(Some(Box::new(track.clone())));
        let mut state = gameplay::init(beatmap, gameplay_cfg, clock, Box::new(ScoreLogger));
        if !gameplay::start(&mut state) {
            return Err("session failed to start".into());
        }
        let limit = state.session_end_time() + STEPPED_OVERRUN_SECONDS;
        autoplay::run_stepped(&mut state, &mut bot, &track, frame_period.as_secs_f32(), limit);
        state
    };

    match state.summary.take() {
        Some(summary) => log_summary(&summary),
        None => warn!("Session stopped at {:.2}s without finishing.", state.current_time),
    }
    Ok(())
}
