use crate::core::clock::ManualTrack;
use crate::game::gameplay::{self, FrameEvent, SessionPhase, State};
use crate::game::note::MAX_LANES;
use log::{debug, trace, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};

// How long a short-note press stays down before the lane is released.
const TAP_HOLD_SECONDS: f32 = 0.05;

/// Plays a session by pressing each note's lane near its time, with a random
/// offset of up to `jitter_ms` either side. Long notes are held to their end.
pub struct Autoplay {
    rng: StdRng,
    jitter_s: f32,
    cursor: usize,
    // Offset drawn for the note at `cursor`, kept until that note is pressed.
    pending_offset: Option<f32>,
    releases: [Option<f32>; MAX_LANES],
}

impl Autoplay {
    pub fn new(seed: u64, jitter_ms: f32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            jitter_s: (jitter_ms / 1000.0).max(0.0),
            cursor: 0,
            pending_offset: None,
            releases: [None; MAX_LANES],
        }
    }

    fn next_offset(&mut self) -> f32 {
        if self.jitter_s <= 0.0 {
            return 0.0;
        }
        if let Some(offset) = self.pending_offset {
            return offset;
        }
        let offset = self.rng.random_range(-self.jitter_s..=self.jitter_s);
        self.pending_offset = Some(offset);
        offset
    }

    /// Issues the presses and releases due at `state.current_time`. Call after
    /// `gameplay::update` each frame. Returns the number of presses made.
    pub fn drive(&mut self, state: &mut State) -> usize {
        let now = state.current_time;
        for lane in 0..state.config.lane_count {
            if self.releases[lane].is_some_and(|at| now >= at) {
                self.releases[lane] = None;
                gameplay::on_lane_release(state, lane);
            }
        }

        let mut presses = 0;
        while self.cursor < state.beatmap.len() {
            let note = state.beatmap.notes()[self.cursor];
            let offset = self.next_offset();
            if now < note.time + offset {
                break;
            }
            if gameplay::on_lane_press(state, note.lane).is_none() {
                debug!("Autoplay press for note #{} landed outside every window.", self.cursor);
            }
            self.releases[note.lane] = Some(if note.is_long() {
                note.end_time()
            } else {
                now + TAP_HOLD_SECONDS
            });
            self.pending_offset = None;
            self.cursor += 1;
            presses += 1;
        }
        presses
    }
}

/// Drains the frame's judgement events into the trace log, standing in for
/// the judgement text a drawing host would show.
pub fn log_frame_events(state: &mut State) {
    for event in state.drain_events() {
        match event {
            FrameEvent::Judged(j) => trace!(
                "lane {} {} ({:+.1}ms)",
                j.lane,
                j.grade.as_str(),
                j.time_error_ms
            ),
            FrameEvent::Hold { lane, note_index, result } => {
                trace!("lane {lane} hold #{note_index} {result:?}");
            }
        }
    }
}

/// Runs a started session on a hand-stepped track, advancing song time by
/// `step_s` per frame until it ends or passes `max_seconds`.
pub fn run_stepped(
    state: &mut State,
    autoplay: &mut Autoplay,
    track: &ManualTrack,
    step_s: f32,
    max_seconds: f32,
) -> SessionPhase {
    loop {
        let phase = gameplay::update(state);
        if phase != SessionPhase::Running {
            return phase;
        }
        autoplay.drive(state);
        log_frame_events(state);
        if state.current_time > max_seconds {
            warn!("Stepped run stopped at {max_seconds:.1}s before the session ended.");
            return phase;
        }
        track.advance(step_s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::SongClock;
    use crate::game::beatmap::{Beatmap, NoteRecord};
    use crate::game::gameplay::GameplayConfig;
    use crate::game::judgment::JudgeGrade;
    use crate::game::scores::NullListener;

    fn stepped_session(beatmap: Beatmap) -> (State, ManualTrack) {
        let track = ManualTrack::new();
        let clock = SongClock::new(Some(Box::new(track.clone())));
        let mut state = gameplay::init(beatmap, GameplayConfig::default(), clock, Box::new(NullListener));
        assert!(gameplay::start(&mut state));
        (state, track)
    }

    #[test]
    fn exact_autoplay_clears_twinkle() {
        let beatmap = Beatmap::twinkle(4).expect("builtin chart");
        let total = beatmap.len();
        let longs = beatmap.long_note_count() as u32;
        let (mut state, track) = stepped_session(beatmap);
        let mut bot = Autoplay::new(1, 0.0);

        let phase = run_stepped(&mut state, &mut bot, &track, 1.0 / 120.0, 60.0);
        assert_eq!(phase, SessionPhase::Ended);
        let summary = state.summary.as_ref().expect("summary after end");
        assert_eq!(summary.miss, 0);
        assert_eq!(summary.perfect as usize, total);
        assert_eq!(summary.holds_held, longs);
        assert!(summary.is_full_combo());
        assert_eq!(state.score.max_combo as usize, total + longs as usize);
    }

    #[test]
    fn jittered_autoplay_stays_inside_windows() {
        let beatmap = Beatmap::demo(4, 7).expect("demo chart");
        let total = beatmap.len() as u32;
        let (mut state, track) = stepped_session(beatmap);
        let mut bot = Autoplay::new(99, 40.0);

        let phase = run_stepped(&mut state, &mut bot, &track, 1.0 / 240.0, 120.0);
        assert_eq!(phase, SessionPhase::Ended);
        let summary = state.summary.as_ref().expect("summary after end");
        assert_eq!(summary.miss, 0);
        assert_eq!(summary.judged(), total);
        assert!(summary.timing.max_abs_ms <= 45.0, "max_abs_ms={}", summary.timing.max_abs_ms);
        assert_eq!(summary.bad, 0);
    }

    #[test]
    fn releases_follow_presses() {
        let beatmap = Beatmap::from_records(&[NoteRecord::short(1.0, 2)], 4).expect("valid");
        let (mut state, track) = stepped_session(beatmap);
        let mut bot = Autoplay::new(3, 0.0);

        track.set_position(1.0);
        gameplay::update(&mut state);
        assert_eq!(bot.drive(&mut state), 1);
        assert!(gameplay::is_lane_pressed(&state, 2));
        assert_eq!(state.score.count(JudgeGrade::Perfect), 1);

        track.set_position(1.1);
        gameplay::update(&mut state);
        assert_eq!(bot.drive(&mut state), 0);
        assert!(!gameplay::is_lane_pressed(&state, 2));
    }
}
