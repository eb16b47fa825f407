use crate::config::Config;
use crate::core::clock::SongClock;
use crate::core::input::Keymap;
use crate::game::beatmap::Beatmap;
use crate::game::judgment::{HoldResult, JudgeGrade, Judgment};
use crate::game::note::{ActiveHold, ActiveNote, MAX_LANES};
use crate::game::scores::{ScoreListener, ScoreState};
use crate::game::scroll::NoteField;
use crate::game::stage_stats::StageSummary;
use crate::game::timing::{TimingProfile, classify_offset_s, is_past_late_tolerance};
use log::{debug, info, warn};

// Linger after the last note resolves before the session ends on its own.
pub const DEFAULT_END_LINGER_SECONDS: f32 = 2.0;
const HEARTBEAT_INTERVAL_SECONDS: f32 = 1.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GameplayConfig {
    pub field: NoteField,
    pub timing: TimingProfile,
    pub lane_count: usize,
    pub bad_breaks_combo: bool,
    pub end_linger_seconds: f32,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            field: NoteField::default(),
            timing: TimingProfile::default(),
            lane_count: crate::game::note::DEFAULT_LANE_COUNT,
            bad_breaks_combo: false,
            end_linger_seconds: DEFAULT_END_LINGER_SECONDS,
        }
    }
}

impl From<&Config> for GameplayConfig {
    fn from(cfg: &Config) -> Self {
        let mut timing = TimingProfile::new(
            cfg.perfect_window,
            cfg.good_window,
            cfg.bad_window,
            cfg.late_tolerance,
        );
        timing.hold_release_grace_s = cfg.hold_release_grace;
        Self {
            field: NoteField::new(cfg.approach_duration, cfg.hit_line_y, cfg.spawn_y),
            timing,
            lane_count: cfg.lane_count,
            bad_breaks_combo: cfg.bad_breaks_combo,
            end_linger_seconds: cfg.end_linger_seconds,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
    Ended,
}

/// Things that happened since the host last drained them, for judgement text
/// and hit effects in the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    Judged(Judgment),
    Hold {
        lane: usize,
        note_index: usize,
        result: HoldResult,
    },
}

pub struct State {
    pub beatmap: Beatmap,
    pub config: GameplayConfig,
    pub phase: SessionPhase,
    pub current_time: f32,
    pub note_spawn_cursor: usize,
    pub score: ScoreState,
    pub summary: Option<StageSummary>,
    clock: SongClock,
    active_notes: Vec<ActiveNote>,
    active_holds: [Option<ActiveHold>; MAX_LANES],
    lane_pressed: [bool; MAX_LANES],
    hit_offsets_ms: Vec<f32>,
    session_end_time: f32,
    events: Vec<FrameEvent>,
    listener: Box<dyn ScoreListener>,
    next_heartbeat_at: f32,
}

/// Latest song time at which the session may end on its own.
fn compute_session_end_time(beatmap: &Beatmap, config: &GameplayConfig) -> f32 {
    let linger = if config.end_linger_seconds.is_finite() {
        config.end_linger_seconds.max(0.0)
    } else {
        DEFAULT_END_LINGER_SECONDS
    };
    if beatmap.is_empty() {
        return linger;
    }
    beatmap.last_note_end_time() + config.timing.late_tolerance_s + linger
}

pub fn init(
    beatmap: Beatmap,
    config: GameplayConfig,
    clock: SongClock,
    listener: Box<dyn ScoreListener>,
) -> State {
    let mut config = config;
    if config.lane_count != beatmap.lane_count() {
        warn!(
            "Configured lane count {} differs from beatmap lane count {}; using the beatmap's.",
            config.lane_count,
            beatmap.lane_count()
        );
        config.lane_count = beatmap.lane_count();
    }
    let session_end_time = compute_session_end_time(&beatmap, &config);
    info!(
        "Session ready: {} notes ({} long), approach={:.2}s, windows_ms={:?}, ends by {:.2}s.",
        beatmap.len(),
        beatmap.long_note_count(),
        config.field.approach_duration_s,
        config.timing.windows_ms(),
        session_end_time
    );
    State {
        active_notes: Vec::with_capacity(beatmap.len().min(256)),
        beatmap,
        config,
        phase: SessionPhase::Idle,
        current_time: 0.0,
        note_spawn_cursor: 0,
        score: ScoreState::default(),
        summary: None,
        clock,
        active_holds: std::array::from_fn(|_| None),
        lane_pressed: [false; MAX_LANES],
        hit_offsets_ms: Vec::new(),
        session_end_time,
        events: Vec::new(),
        listener,
        next_heartbeat_at: 0.0,
    }
}

/// Idle → Running. Sets the clock epoch and starts audio if a track exists.
/// Returns false if the session already ran; a finished session cannot be
/// restarted, build a new one with `init`.
pub fn start(state: &mut State) -> bool {
    match state.phase {
        SessionPhase::Idle => {
            state.clock.start();
            state.current_time = state.clock.now();
            state.next_heartbeat_at = state.current_time + HEARTBEAT_INTERVAL_SECONDS;
            state.phase = SessionPhase::Running;
            info!(
                "Session started ({} clock).",
                if state.clock.using_audio_clock() { "audio" } else { "wall" }
            );
            true
        }
        SessionPhase::Running => false,
        SessionPhase::Ended => {
            warn!("Ignoring start on a finished session.");
            false
        }
    }
}

impl State {
    #[inline(always)]
    pub fn active_notes(&self) -> &[ActiveNote] {
        &self.active_notes
    }

    #[inline(always)]
    pub fn active_hold(&self, lane: usize) -> Option<&ActiveHold> {
        self.active_holds.get(lane).and_then(Option::as_ref)
    }

    #[inline(always)]
    pub fn session_end_time(&self) -> f32 {
        self.session_end_time
    }

    #[inline(always)]
    pub fn using_audio_clock(&self) -> bool {
        self.clock.using_audio_clock()
    }

    pub fn drain_events(&mut self) -> Vec<FrameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Position of an active note at the current frame time. Pure: calling it
    /// again without a new frame gives the same value.
    #[inline(always)]
    pub fn note_y(&self, note: &ActiveNote) -> f32 {
        self.config.field.y_for(note.event.time, self.current_time)
    }

    fn push_score(&mut self) {
        self.listener
            .on_score_update(self.score.score, self.score.combo);
    }
}

/* ============================ Frame passes ============================ */

#[inline(always)]
fn spawn_due_notes(state: &mut State, now: f32) {
    let notes = state.beatmap.notes();
    let mut cursor = state.note_spawn_cursor;
    while cursor < notes.len() {
        let note = notes[cursor];
        if now < state.config.field.spawn_time_for(note.time) {
            // Sorted, so nothing later is due either.
            break;
        }
        let y = state.config.field.y_for(note.time, now);
        state.active_notes.push(ActiveNote::new(cursor, note, y));
        debug!("Spawned note #{cursor} lane={} time={:.3}", note.lane, note.time);
        cursor += 1;
    }
    state.note_spawn_cursor = cursor;
}

#[inline(always)]
pub fn update_positions(state: &mut State, now: f32) {
    let field = state.config.field;
    for note in &mut state.active_notes {
        note.y = field.y_for(note.event.time, now);
    }
}

/// Drops unhit notes that are too late to judge. Only the first
/// `sweep_limit` notes are considered so a note is never swept on the frame
/// it spawned.
#[inline(always)]
fn sweep_missed_notes(state: &mut State, now: f32, sweep_limit: usize) {
    let profile = state.config.timing;
    let mut missed: Vec<ActiveNote> = Vec::new();
    let mut idx = 0usize;
    let mut examined = 0usize;
    while idx < state.active_notes.len() && examined < sweep_limit {
        examined += 1;
        let note = &state.active_notes[idx];
        if !note.consumed && is_past_late_tolerance(note.event.time, now, &profile) {
            missed.push(state.active_notes.remove(idx));
        } else {
            idx += 1;
        }
    }

    for note in missed {
        let time_error_ms = (now - note.event.time) * 1000.0;
        let judgment = Judgment::new(JudgeGrade::Miss, note.event.lane, note.note_index, time_error_ms);
        info!(
            "TIMING MISS: note=#{}, lane={}, note_time_s={:.6}, miss_time_s={:.6}, offset_ms={:.2}",
            note.note_index, note.event.lane, note.event.time, now, time_error_ms
        );
        state
            .score
            .apply_judgment(&judgment, state.config.bad_breaks_combo);
        state.events.push(FrameEvent::Judged(judgment));
        state.push_score();
    }
}

fn finish_hold(state: &mut State, lane: usize, result: HoldResult, now: f32) {
    let Some(hold) = state.active_holds[lane].take() else {
        return;
    };
    info!(
        "HOLD {:?}: note=#{}, lane={}, start_s={:.6}, end_time_s={:.6}, at_s={:.6}, pressed={}",
        result, hold.note_index, lane, hold.start_time, hold.end_time, now, hold.is_pressed
    );
    state.score.apply_hold_result(result);
    state.events.push(FrameEvent::Hold {
        lane,
        note_index: hold.note_index,
        result,
    });
    state.push_score();
}

#[inline(always)]
fn update_active_holds(state: &mut State, now: f32) {
    for lane in 0..state.config.lane_count {
        let done = state.active_holds[lane]
            .as_ref()
            .is_some_and(|hold| now >= hold.end_time);
        if done {
            finish_hold(state, lane, HoldResult::Held, now);
        }
    }
}

fn maybe_end_session(state: &mut State, now: f32) {
    let exhausted = state.note_spawn_cursor >= state.beatmap.len();
    let drained = state.active_notes.is_empty() && state.active_holds.iter().all(Option::is_none);
    if !(exhausted && drained && now >= state.session_end_time) {
        return;
    }
    state.phase = SessionPhase::Ended;
    let summary = StageSummary::build(
        &state.score,
        state.beatmap.len(),
        &state.hit_offsets_ms,
        state.config.bad_breaks_combo,
    );
    info!(
        "Session ended at {:.2}s: score={}, max_combo={}, P/G/B/M={}/{}/{}/{}, mean_ms={:.2}, stddev_ms={:.2}",
        now,
        summary.score,
        summary.max_combo,
        summary.perfect,
        summary.good,
        summary.bad,
        summary.miss,
        summary.timing.mean_ms,
        summary.timing.stddev_ms
    );
    state.summary = Some(summary);
    state.listener.on_session_end();
}

/// One frame: spawn, then position, then sweep, then holds and the end
/// check. Does nothing outside `Running`.
pub fn update(state: &mut State) -> SessionPhase {
    if state.phase != SessionPhase::Running {
        return state.phase;
    }
    let now = state.clock.now();
    state.current_time = now;

    let sweep_limit = state.active_notes.len();
    spawn_due_notes(state, now);
    update_positions(state, now);
    sweep_missed_notes(state, now, sweep_limit);
    update_active_holds(state, now);
    maybe_end_session(state, now);

    if now >= state.next_heartbeat_at {
        info!(
            "Time: {:.2}, Score: {}, Combo: {}, Active Notes: {}, Cursor: {}/{}",
            now,
            state.score.score,
            state.score.combo,
            state.active_notes.len(),
            state.note_spawn_cursor,
            state.beatmap.len()
        );
        state.next_heartbeat_at = now + HEARTBEAT_INTERVAL_SECONDS;
    }
    state.phase
}

/* ================================ Input ================================ */

/// Finds the closest unconsumed note in `lane`. Ties keep the earlier note
/// because the active set is in spawn (= time) order.
fn closest_candidate(state: &State, lane: usize, now: f32) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, note) in state
        .active_notes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.event.lane == lane && !n.consumed)
    {
        let diff = (now - note.event.time).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((idx, diff)),
        }
    }
    best
}

/// Judges a press on `lane` against the active set.
///
/// A press with nothing inside the outer window is a whiff and returns
/// `None` without touching any note, the score, or the combo.
pub fn on_lane_press(state: &mut State, lane: usize) -> Option<Judgment> {
    if state.phase != SessionPhase::Running || lane >= state.config.lane_count {
        return None;
    }
    state.lane_pressed[lane] = true;
    let now = state.clock.now();

    let (idx, diff) = closest_candidate(state, lane, now)?;
    let note_time = state.active_notes[idx].event.time;
    let time_error_s = now - note_time;
    let Some(grade) = classify_offset_s(time_error_s, &state.config.timing) else {
        debug!("Whiff on lane {lane} at {now:.3}s (closest note {diff:.3}s away)");
        return None;
    };

    state.active_notes[idx].consumed = true;
    let note = state.active_notes.remove(idx);
    let judgment = Judgment::new(grade, lane, note.note_index, time_error_s * 1000.0);
    info!(
        "TIMING HIT: grade={:?}, note=#{}, lane={}, note_time_s={:.6}, event_time_s={:.6}, offset_ms={:.2}",
        grade, note.note_index, lane, note_time, now, judgment.time_error_ms
    );

    state
        .score
        .apply_judgment(&judgment, state.config.bad_breaks_combo);
    state.hit_offsets_ms.push(judgment.time_error_ms);
    state.events.push(FrameEvent::Judged(judgment.clone()));
    state.push_score();

    if note.event.is_long() {
        // A new head in the same lane resolves whatever hold is still open there.
        if let Some(prev_end) = state.active_holds[lane].as_ref().map(|h| h.end_time) {
            let grace = state.config.timing.hold_release_grace_s;
            let result = if now >= prev_end - grace {
                HoldResult::Held
            } else {
                HoldResult::LetGo
            };
            finish_hold(state, lane, result, now);
        }
        state.active_holds[lane] = Some(ActiveHold {
            note_index: note.note_index,
            start_time: now,
            end_time: note.event.end_time(),
            is_pressed: true,
        });
    }
    Some(judgment)
}

/// Lane release. Only matters while a long note is being held there: letting
/// go earlier than the grace window before its end drops the hold.
pub fn on_lane_release(state: &mut State, lane: usize) -> Option<HoldResult> {
    if state.phase != SessionPhase::Running || lane >= state.config.lane_count {
        return None;
    }
    state.lane_pressed[lane] = false;
    let now = state.clock.now();
    let grace = state.config.timing.hold_release_grace_s;
    let end_time = state.active_holds[lane].as_ref()?.end_time;
    if let Some(hold) = state.active_holds[lane].as_mut() {
        hold.is_pressed = false;
    }
    let result = if now >= end_time - grace {
        HoldResult::Held
    } else {
        HoldResult::LetGo
    };
    finish_hold(state, lane, result, now);
    Some(result)
}

#[inline(always)]
pub fn is_lane_pressed(state: &State, lane: usize) -> bool {
    state.lane_pressed.get(lane).copied().unwrap_or(false)
}

/// Routes a raw key through the keymap. Key repeat while already down is
/// ignored so holding a key never re-judges.
pub fn handle_key(state: &mut State, keymap: &Keymap, key: char, pressed: bool) -> Option<FrameEvent> {
    let lane = keymap.lane_for_key(key)?;
    if pressed {
        if is_lane_pressed(state, lane) {
            return None;
        }
        on_lane_press(state, lane).map(FrameEvent::Judged)
    } else {
        let note_index = state.active_hold(lane).map(|h| h.note_index);
        let result = on_lane_release(state, lane)?;
        note_index.map(|note_index| FrameEvent::Hold {
            lane,
            note_index,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualTrack;
    use crate::game::beatmap::NoteRecord;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorded {
        updates: Vec<(u64, u32)>,
        ended: u32,
    }

    struct RecordingListener(Rc<RefCell<Recorded>>);

    impl ScoreListener for RecordingListener {
        fn on_score_update(&mut self, score: u64, combo: u32) {
            self.0.borrow_mut().updates.push((score, combo));
        }

        fn on_session_end(&mut self) {
            self.0.borrow_mut().ended += 1;
        }
    }

    fn session(records: &[NoteRecord]) -> (State, ManualTrack, Rc<RefCell<Recorded>>) {
        session_with(records, GameplayConfig::default())
    }

    fn session_with(
        records: &[NoteRecord],
        config: GameplayConfig,
    ) -> (State, ManualTrack, Rc<RefCell<Recorded>>) {
        let beatmap = Beatmap::from_records(records, 4).expect("test beatmap is valid");
        let track = ManualTrack::new();
        let clock = SongClock::new(Some(Box::new(track.clone())));
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut state = init(
            beatmap,
            config,
            clock,
            Box::new(RecordingListener(recorded.clone())),
        );
        assert!(start(&mut state));
        (state, track, recorded)
    }

    fn tick_at(state: &mut State, track: &ManualTrack, t: f32) -> SessionPhase {
        track.set_position(t);
        update(state)
    }

    #[test]
    fn scenario_a_perfect_on_time() {
        let (mut state, track, recorded) = session(&[NoteRecord::short(1.0, 0)]);
        // time - approach = -0.5, so it is due on the very first frame.
        tick_at(&mut state, &track, 0.0);
        assert_eq!(state.active_notes().len(), 1);
        tick_at(&mut state, &track, 0.6);
        assert_eq!(state.active_notes().len(), 1);

        track.set_position(1.0);
        let j = on_lane_press(&mut state, 0).expect("press on time judges");
        assert_eq!(j.grade, JudgeGrade::Perfect);
        assert_eq!(j.points, 300);
        assert_eq!((state.score.score, state.score.combo), (300, 1));
        assert!(state.active_notes().is_empty());
        assert_eq!(recorded.borrow().updates, vec![(300, 1)]);
    }

    #[test]
    fn scenario_b_good_when_slightly_late() {
        let (mut state, track, _) = session(&[NoteRecord::short(1.0, 0)]);
        tick_at(&mut state, &track, 0.5);
        track.set_position(1.08);
        let j = on_lane_press(&mut state, 0).expect("inside window");
        assert_eq!(j.grade, JudgeGrade::Good);
        assert_eq!(state.score.score, 100);
        assert!(j.time_error_ms > 0.0);
    }

    #[test]
    fn scenario_c_sweeper_misses_unhit_note() {
        let (mut state, track, recorded) = session(&[
            NoteRecord::short(0.5, 0),
            NoteRecord::short(1.0, 0),
        ]);
        tick_at(&mut state, &track, 0.0);
        track.set_position(0.5);
        on_lane_press(&mut state, 0).expect("first note hit");
        assert_eq!(state.score.combo, 1);

        tick_at(&mut state, &track, 1.19);
        assert_eq!(state.active_notes().len(), 1, "still inside late tolerance");
        tick_at(&mut state, &track, 1.21);
        assert!(state.active_notes().is_empty());
        assert_eq!(state.score.combo, 0);
        assert_eq!(state.score.score, 300);
        assert_eq!(state.score.count(JudgeGrade::Miss), 1);
        assert_eq!(recorded.borrow().updates.last(), Some(&(300, 0)));
        let events = state.drain_events();
        assert!(matches!(
            events.last(),
            Some(FrameEvent::Judged(Judgment { grade: JudgeGrade::Miss, .. }))
        ));
    }

    #[test]
    fn scenario_d_tie_prefers_earlier_note() {
        let (mut state, track, _) = session(&[
            NoteRecord::short(1.0, 2),
            NoteRecord::short(1.3, 2),
        ]);
        tick_at(&mut state, &track, 0.0);
        assert_eq!(state.active_notes().len(), 2);
        track.set_position(1.15);
        let j = on_lane_press(&mut state, 2).expect("0.15 is inside the outer window");
        assert_eq!(j.note_index, 0);
        assert_eq!(j.grade, JudgeGrade::Bad);
        assert_eq!(state.active_notes()[0].note_index, 1);
    }

    #[test]
    fn closest_note_wins_over_earlier_one() {
        let (mut state, track, _) = session(&[
            NoteRecord::short(1.0, 1),
            NoteRecord::short(1.2, 1),
        ]);
        tick_at(&mut state, &track, 0.0);
        track.set_position(1.17);
        let j = on_lane_press(&mut state, 1).expect("hit");
        assert_eq!(j.note_index, 1);
        assert_eq!(j.grade, JudgeGrade::Perfect);
    }

    #[test]
    fn whiff_has_no_side_effects() {
        let (mut state, track, recorded) = session(&[
            NoteRecord::short(0.5, 0),
            NoteRecord::short(2.0, 0),
        ]);
        tick_at(&mut state, &track, 0.5);
        on_lane_press(&mut state, 0).expect("hit");
        let before = state.score.clone();

        track.set_position(1.0);
        assert!(on_lane_press(&mut state, 0).is_none(), "next note is 1s away");
        assert!(on_lane_press(&mut state, 3).is_none(), "empty lane");
        assert_eq!(state.score, before);
        assert_eq!(state.active_notes().len(), 1);
        assert!(!state.active_notes()[0].consumed);
        assert_eq!(recorded.borrow().updates.len(), 1);
    }

    #[test]
    fn each_note_spawns_once_in_time_order() {
        let records: Vec<NoteRecord> = (0..40)
            .map(|i| NoteRecord::short(f64::from(i) * 0.25, i64::from(i % 4)))
            .collect();
        let (mut state, track, _) = session(&records);
        let mut seen = Vec::new();
        let mut t = 0.0_f32;
        while t < 12.0 {
            tick_at(&mut state, &track, t);
            for n in state.active_notes() {
                if !seen.contains(&n.note_index) {
                    seen.push(n.note_index);
                }
            }
            t += 1.0 / 60.0;
        }
        assert_eq!(seen, (0..40).collect::<Vec<_>>());
        assert_eq!(state.note_spawn_cursor, 40);
        assert_eq!(state.score.count(JudgeGrade::Miss), 40);
    }

    #[test]
    fn cursor_never_rewinds_after_clock_jump_back() {
        let (mut state, track, _) = session(&[
            NoteRecord::short(1.0, 0),
            NoteRecord::short(5.0, 0),
        ]);
        tick_at(&mut state, &track, 4.0);
        assert_eq!(state.note_spawn_cursor, 2);
        tick_at(&mut state, &track, 0.0);
        assert_eq!(state.note_spawn_cursor, 2);
    }

    #[test]
    fn positions_track_clock_and_are_idempotent() {
        let (mut state, track, _) = session(&[NoteRecord::short(3.0, 0)]);
        tick_at(&mut state, &track, 2.0);
        let y1 = state.active_notes()[0].y;
        update_positions(&mut state, 2.0);
        assert_eq!(state.active_notes()[0].y, y1);
        assert_eq!(state.note_y(&state.active_notes()[0]), y1);

        tick_at(&mut state, &track, 3.0);
        let hit_line = state.config.field.hit_line_y;
        assert!((state.active_notes()[0].y - hit_line).abs() < 1e-4);
    }

    #[test]
    fn late_spawn_is_not_swept_on_its_first_frame() {
        let (mut state, track, _) = session(&[NoteRecord::short(1.0, 0)]);
        // Clock jumps straight past the note's late tolerance.
        tick_at(&mut state, &track, 5.0);
        assert_eq!(state.active_notes().len(), 1);
        tick_at(&mut state, &track, 5.01);
        assert!(state.active_notes().is_empty());
        assert_eq!(state.score.count(JudgeGrade::Miss), 1);
    }

    #[test]
    fn bad_keeps_combo_by_default_and_breaks_it_when_configured() {
        let records = [NoteRecord::short(1.0, 0), NoteRecord::short(2.0, 0)];
        for (breaks, expected_combo) in [(false, 2), (true, 1)] {
            let config = GameplayConfig {
                bad_breaks_combo: breaks,
                ..GameplayConfig::default()
            };
            let (mut state, track, _) = session_with(&records, config);
            tick_at(&mut state, &track, 0.9);
            track.set_position(1.0);
            on_lane_press(&mut state, 0).expect("perfect");
            tick_at(&mut state, &track, 1.5);
            track.set_position(2.14);
            let j = on_lane_press(&mut state, 0).expect("bad");
            assert_eq!(j.grade, JudgeGrade::Bad);
            if breaks {
                assert_eq!(state.score.combo, 0);
            }
            track.set_position(2.5);
            update(&mut state);
            assert_eq!(state.score.max_combo, expected_combo);
        }
    }

    #[test]
    fn long_note_held_to_end_scores_hold_bonus() {
        let (mut state, track, _) = session(&[NoteRecord::long(1.0, 3, 1.0)]);
        tick_at(&mut state, &track, 0.5);
        track.set_position(1.0);
        on_lane_press(&mut state, 3).expect("head hit");
        assert!(state.active_hold(3).is_some());
        tick_at(&mut state, &track, 1.5);
        assert!(state.active_hold(3).is_some());
        tick_at(&mut state, &track, 2.0);
        assert!(state.active_hold(3).is_none());
        assert_eq!(state.score.score, 350);
        assert_eq!(state.score.combo, 2);
        assert_eq!(state.score.holds_held, 1);
    }

    #[test]
    fn early_release_drops_the_hold() {
        let (mut state, track, _) = session(&[NoteRecord::long(1.0, 3, 1.0)]);
        tick_at(&mut state, &track, 0.5);
        track.set_position(1.0);
        on_lane_press(&mut state, 3).expect("head hit");
        track.set_position(1.4);
        assert_eq!(on_lane_release(&mut state, 3), Some(HoldResult::LetGo));
        assert_eq!(state.score.combo, 0);
        assert_eq!(state.score.score, 300);
        assert_eq!(on_lane_release(&mut state, 3), None);
    }

    #[test]
    fn release_inside_grace_counts_as_held() {
        let (mut state, track, _) = session(&[NoteRecord::long(1.0, 0, 1.0)]);
        tick_at(&mut state, &track, 0.5);
        track.set_position(1.0);
        on_lane_press(&mut state, 0).expect("head hit");
        track.set_position(1.9);
        assert_eq!(on_lane_release(&mut state, 0), Some(HoldResult::Held));
    }

    #[test]
    fn session_ends_once_after_linger() {
        let (mut state, track, recorded) = session(&[NoteRecord::short(1.0, 0)]);
        tick_at(&mut state, &track, 0.5);
        track.set_position(1.0);
        on_lane_press(&mut state, 0).expect("hit");
        let end = state.session_end_time();
        assert!((end - 3.2).abs() < 1e-4, "end={end}");
        assert_eq!(tick_at(&mut state, &track, 3.0), SessionPhase::Running);
        assert_eq!(tick_at(&mut state, &track, 3.3), SessionPhase::Ended);
        assert_eq!(tick_at(&mut state, &track, 4.0), SessionPhase::Ended);
        assert_eq!(recorded.borrow().ended, 1);
        let summary = state.summary.as_ref().expect("summary recorded");
        assert_eq!(summary.perfect, 1);
        assert!(summary.is_full_combo());
        assert!(!start(&mut state), "no resume from Ended");
        track.set_position(4.0);
        assert!(on_lane_press(&mut state, 0).is_none());
    }

    #[test]
    fn empty_beatmap_ends_after_linger() {
        let (mut state, track, recorded) = session(&[]);
        assert_eq!(tick_at(&mut state, &track, 1.0), SessionPhase::Running);
        assert_eq!(tick_at(&mut state, &track, 2.0), SessionPhase::Ended);
        assert_eq!(recorded.borrow().ended, 1);
    }

    #[test]
    fn idle_session_ignores_frames_and_input() {
        let beatmap = Beatmap::from_records(&[NoteRecord::short(0.0, 0)], 4).expect("valid");
        let mut state = init(
            beatmap,
            GameplayConfig::default(),
            SongClock::wall(),
            Box::new(crate::game::scores::NullListener),
        );
        assert_eq!(update(&mut state), SessionPhase::Idle);
        assert!(on_lane_press(&mut state, 0).is_none());
        assert!(state.active_notes().is_empty());
    }

    #[test]
    fn key_repeat_does_not_rejudge() {
        let (mut state, track, _) = session(&[
            NoteRecord::short(1.0, 1),
            NoteRecord::short(1.05, 1),
        ]);
        let keymap = Keymap::default();
        tick_at(&mut state, &track, 0.5);
        track.set_position(1.0);
        assert!(handle_key(&mut state, &keymap, 'f', true).is_some());
        assert!(handle_key(&mut state, &keymap, 'f', true).is_none());
        handle_key(&mut state, &keymap, 'f', false);
        assert!(handle_key(&mut state, &keymap, 'F', true).is_some());
        assert!(handle_key(&mut state, &keymap, 'x', true).is_none());
    }

    #[test]
    fn overlapping_holds_in_one_lane_both_resolve() {
        let (mut state, track, recorded) = session(&[
            NoteRecord::long(1.0, 0, 2.0),
            NoteRecord::long(1.5, 0, 0.5),
        ]);
        tick_at(&mut state, &track, 0.5);
        track.set_position(1.0);
        on_lane_press(&mut state, 0).expect("first head");
        track.set_position(1.5);
        on_lane_press(&mut state, 0).expect("second head");
        // The first hold was still 1.5s from its end, so it is dropped.
        assert_eq!(state.score.holds_let_go, 1);
        assert_eq!(state.active_hold(0).map(|h| h.note_index), Some(1));

        let events = state.drain_events();
        assert!(events.contains(&FrameEvent::Hold {
            lane: 0,
            note_index: 0,
            result: HoldResult::LetGo,
        }));

        tick_at(&mut state, &track, 2.0);
        assert_eq!(state.score.holds_held, 1);
        let mut t = 2.0;
        while tick_at(&mut state, &track, t) == SessionPhase::Running {
            t += 0.25;
            assert!(t < 20.0, "session never ended");
        }
        let summary = state.summary.as_ref().expect("summary recorded");
        assert_eq!(summary.holds_held + summary.holds_let_go, 2);
        assert_eq!(recorded.borrow().updates.len(), 4);
    }

    #[test]
    fn lanes_past_the_lane_count_are_ignored() {
        let (mut state, track, recorded) = session(&[NoteRecord::short(1.0, 0)]);
        tick_at(&mut state, &track, 0.5);
        track.set_position(1.0);
        assert!(on_lane_press(&mut state, 4).is_none());
        assert!(on_lane_release(&mut state, 4).is_none());
        assert!(on_lane_press(&mut state, MAX_LANES).is_none());
        assert!(!is_lane_pressed(&state, 4));
        assert_eq!(state.score, ScoreState::default());
        assert_eq!(state.active_notes().len(), 1);
        assert!(recorded.borrow().updates.is_empty());
    }
}
