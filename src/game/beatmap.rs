use crate::game::note::{MAX_LANES, NoteEvent, NoteKind};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const BUILTIN_PREFIX: &str = "builtin:";

// Procedural fallback chart: one short note every half second.
const DEMO_FIRST_NOTE_S: f32 = 2.0;
const DEMO_END_S: f32 = 60.0;
const DEMO_STEP_S: f32 = 0.5;

/// One beatmap entry as supplied by a file or the generator service.
///
/// Every field is optional here so that validation can report exactly which
/// one is missing instead of failing inside the deserializer.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NoteRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl NoteRecord {
    pub fn short(time: f64, lane: i64) -> Self {
        Self {
            time: Some(time),
            lane: Some(lane),
            kind: Some(NoteKind::Short.as_str().to_string()),
            duration: None,
        }
    }

    pub fn long(time: f64, lane: i64, duration: f64) -> Self {
        Self {
            time: Some(time),
            lane: Some(lane),
            kind: Some(NoteKind::Long.as_str().to_string()),
            duration: Some(duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoteIssue {
    MissingField(&'static str),
    InvalidTime(f64),
    LaneOutOfRange { lane: i64, lane_count: usize },
    UnknownKind(String),
    InvalidDuration(f64),
}

impl fmt::Display for NoteIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field '{field}'"),
            Self::InvalidTime(t) => write!(f, "time must be a finite number >= 0, got {t}"),
            Self::LaneOutOfRange { lane, lane_count } => {
                write!(f, "lane {lane} is outside 0..{lane_count}")
            }
            Self::UnknownKind(kind) => {
                write!(f, "type must be \"short\" or \"long\", got \"{kind}\"")
            }
            Self::InvalidDuration(d) => {
                write!(f, "long note duration must be a finite number > 0, got {d}")
            }
        }
    }
}

#[derive(Debug)]
pub enum BeatmapError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    InvalidNote { index: usize, issue: NoteIssue },
    InvalidLaneCount(usize),
    UnknownBuiltin(String),
}

impl fmt::Display for BeatmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read beatmap: {e}"),
            Self::Parse(e) => write!(f, "beatmap is not a valid note list: {e}"),
            Self::InvalidNote { index, issue } => write!(f, "note #{index}: {issue}"),
            Self::InvalidLaneCount(n) => write!(f, "lane count {n} is outside 1..={MAX_LANES}"),
            Self::UnknownBuiltin(name) => write!(f, "no built-in beatmap named '{name}'"),
        }
    }
}

impl std::error::Error for BeatmapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BeatmapError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for BeatmapError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

fn validate_record(record: &NoteRecord, lane_count: usize) -> Result<NoteEvent, NoteIssue> {
    let time = record.time.ok_or(NoteIssue::MissingField("time"))?;
    // Checked after narrowing to f32 as well; values past f32::MAX become inf.
    let time_s = time as f32;
    if !time.is_finite() || time < 0.0 || !time_s.is_finite() {
        return Err(NoteIssue::InvalidTime(time));
    }
    let lane = record.lane.ok_or(NoteIssue::MissingField("lane"))?;
    if lane < 0 || lane as u64 >= lane_count as u64 {
        return Err(NoteIssue::LaneOutOfRange { lane, lane_count });
    }
    let kind = match record.kind.as_deref().map(str::trim) {
        None => return Err(NoteIssue::MissingField("type")),
        Some(k) if k.eq_ignore_ascii_case("short") => NoteKind::Short,
        Some(k) if k.eq_ignore_ascii_case("long") => NoteKind::Long,
        Some(k) => return Err(NoteIssue::UnknownKind(k.to_string())),
    };
    let duration = match kind {
        NoteKind::Short => None,
        NoteKind::Long => {
            let d = record.duration.ok_or(NoteIssue::MissingField("duration"))?;
            let d_s = d as f32;
            if !d.is_finite() || !d_s.is_finite() || d_s <= 0.0 || !(time_s + d_s).is_finite() {
                return Err(NoteIssue::InvalidDuration(d));
            }
            Some(d_s)
        }
    };
    Ok(NoteEvent {
        time: time_s,
        lane: lane as usize,
        kind,
        duration,
    })
}

/// A validated chart, sorted ascending by time once at load and never
/// reordered afterwards.
#[derive(Clone, Debug)]
pub struct Beatmap {
    notes: Vec<NoteEvent>,
    lane_count: usize,
}

impl Beatmap {
    pub fn from_records(records: &[NoteRecord], lane_count: usize) -> Result<Self, BeatmapError> {
        if lane_count == 0 || lane_count > MAX_LANES {
            return Err(BeatmapError::InvalidLaneCount(lane_count));
        }
        let mut notes = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let note = validate_record(record, lane_count)
                .map_err(|issue| BeatmapError::InvalidNote { index, issue })?;
            if note.kind == NoteKind::Short && record.duration.is_some() {
                debug!("note #{index}: ignoring duration on a short note");
            }
            notes.push(note);
        }

        let was_sorted = notes.windows(2).all(|w| w[0].time <= w[1].time);
        if !was_sorted {
            warn!("Beatmap notes arrived out of order; sorting by time.");
            // Stable, so simultaneous notes keep their record order.
            notes.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        Ok(Self { notes, lane_count })
    }

    pub fn from_json_str(json: &str, lane_count: usize) -> Result<Self, BeatmapError> {
        let records: Vec<NoteRecord> = serde_json::from_str(json)?;
        Self::from_records(&records, lane_count)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P, lane_count: usize) -> Result<Self, BeatmapError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let map = Self::from_json_str(&json, lane_count)?;
        info!("Loaded beatmap '{}' ({} notes).", path.display(), map.len());
        Ok(map)
    }

    /// Deterministic fallback chart used when nothing else is available.
    pub fn demo(lane_count: usize, seed: u64) -> Result<Self, BeatmapError> {
        if lane_count == 0 || lane_count > MAX_LANES {
            return Err(BeatmapError::InvalidLaneCount(lane_count));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut records = Vec::new();
        let mut i = 0u32;
        loop {
            let time = DEMO_FIRST_NOTE_S + DEMO_STEP_S * i as f32;
            if time >= DEMO_END_S {
                break;
            }
            let lane = rng.random_range(0..lane_count) as i64;
            records.push(NoteRecord::short(f64::from(time), lane));
            i += 1;
        }
        Self::from_records(&records, lane_count)
    }

    pub fn twinkle(lane_count: usize) -> Result<Self, BeatmapError> {
        Self::from_records(&twinkle_records(), lane_count)
    }

    /// Resolves a `builtin:<name>` chart reference.
    pub fn load_builtin(name: &str, lane_count: usize, seed: u64) -> Result<Self, BeatmapError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "demo" => Self::demo(lane_count, seed),
            "twinkle" => Self::twinkle(lane_count),
            _ => Err(BeatmapError::UnknownBuiltin(name.to_string())),
        }
    }

    #[inline(always)]
    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    #[inline(always)]
    pub const fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// Latest moment any note still needs the player: the tail of a long
    /// note or the head of a short one. Zero for an empty chart.
    pub fn last_note_end_time(&self) -> f32 {
        self.notes
            .iter()
            .fold(0.0_f32, |acc, n| acc.max(n.end_time()))
    }

    pub fn long_note_count(&self) -> usize {
        self.notes.iter().filter(|n| n.is_long()).count()
    }
}

// "Twinkle Twinkle Little Star", one lane per pitch group.
fn twinkle_records() -> Vec<NoteRecord> {
    vec![
        NoteRecord::short(0.0, 0),
        NoteRecord::short(0.5, 0),
        NoteRecord::short(1.0, 3),
        NoteRecord::short(1.5, 3),
        NoteRecord::short(2.0, 1),
        NoteRecord::short(2.5, 1),
        NoteRecord::long(3.0, 3, 1.0),
        NoteRecord::short(4.5, 2),
        NoteRecord::short(5.0, 2),
        NoteRecord::short(5.5, 1),
        NoteRecord::short(6.0, 1),
        NoteRecord::short(6.5, 0),
        NoteRecord::short(7.0, 0),
        NoteRecord::long(7.5, 0, 1.0),
        NoteRecord::short(9.0, 3),
        NoteRecord::short(9.5, 3),
        NoteRecord::short(10.0, 2),
        NoteRecord::short(10.5, 2),
        NoteRecord::short(11.0, 1),
        NoteRecord::short(11.5, 1),
        NoteRecord::short(12.0, 0),
        NoteRecord::short(13.5, 3),
        NoteRecord::short(14.0, 3),
        NoteRecord::short(14.5, 2),
        NoteRecord::short(15.0, 2),
        NoteRecord::short(15.5, 1),
        NoteRecord::short(16.0, 1),
        NoteRecord::long(16.5, 0, 1.0),
    ]
}
