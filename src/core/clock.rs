use log::{info, warn};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A playing music track as seen by the timing engine. The host's audio
/// layer implements this; the engine only ever reads the position.
pub trait MusicTrack {
    fn play(&mut self);
    fn is_playing(&self) -> bool;
    /// Current playback position in seconds.
    fn position_seconds(&self) -> f32;
}

/// Track whose position is set by hand. Clones share the same position, so
/// one handle can drive a session that owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualTrack {
    position: Rc<Cell<f32>>,
    playing: Rc<Cell<bool>>,
}

impl ManualTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&self, seconds: f32) {
        self.position.set(seconds);
    }

    pub fn advance(&self, seconds: f32) {
        self.position.set(self.position.get() + seconds);
    }

    pub fn stop(&self) {
        self.playing.set(false);
    }
}

impl MusicTrack for ManualTrack {
    fn play(&mut self) {
        self.playing.set(true);
    }

    fn is_playing(&self) -> bool {
        self.playing.get()
    }

    fn position_seconds(&self) -> f32 {
        self.position.get()
    }
}

/// Song time source. The backing mode is chosen once in `start()` and never
/// re-evaluated for the rest of the session.
pub struct SongClock {
    track: Option<Box<dyn MusicTrack>>,
    epoch: Option<Instant>,
    using_audio_clock: bool,
    // Last position read from a playing track, with the instant it was read.
    last_audio_read: Cell<Option<(f32, Instant)>>,
}

impl SongClock {
    pub fn new(track: Option<Box<dyn MusicTrack>>) -> Self {
        Self {
            track,
            epoch: None,
            using_audio_clock: false,
            last_audio_read: Cell::new(None),
        }
    }

    pub fn wall() -> Self {
        Self::new(None)
    }

    /// Sets the epoch and, if an audio track was supplied, starts it and
    /// locks the clock into audio mode.
    pub fn start(&mut self) {
        self.epoch = Some(Instant::now());
        match self.track.as_mut() {
            Some(track) => {
                track.play();
                self.using_audio_clock = true;
                info!("Song clock started on audio playback position.");
            }
            None => {
                self.using_audio_clock = false;
                warn!("No audio track loaded; song clock using wall-clock fallback.");
            }
        }
    }

    #[inline(always)]
    pub const fn using_audio_clock(&self) -> bool {
        self.using_audio_clock
    }

    #[inline(always)]
    pub const fn is_started(&self) -> bool {
        self.epoch.is_some()
    }

    /// Song time in seconds. Zero before `start()`.
    ///
    /// In audio mode a track that stops playing (end of file, device loss)
    /// does not rewind time: the clock keeps running on wall time from the
    /// last position it saw.
    pub fn now(&self) -> f32 {
        if !self.using_audio_clock {
            return self.elapsed_wall_seconds();
        }
        if let Some(track) = self.track.as_ref()
            && track.is_playing()
        {
            let pos = track.position_seconds();
            self.last_audio_read.set(Some((pos, Instant::now())));
            return pos;
        }
        match self.last_audio_read.get() {
            Some((pos, at)) => pos + at.elapsed().as_secs_f32(),
            None => self.elapsed_wall_seconds(),
        }
    }

    #[inline(always)]
    fn elapsed_wall_seconds(&self) -> f32 {
        self.epoch
            .map_or(0.0, |epoch| epoch.elapsed().as_secs_f32())
    }
}
