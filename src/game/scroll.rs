pub const DEFAULT_APPROACH_DURATION_S: f32 = 1.5;
pub const DEFAULT_HIT_LINE_Y: f32 = 700.0;
pub const DEFAULT_SPAWN_Y: f32 = -50.0;

/// Fixed-speed playfield geometry. A note's y is a pure function of its
/// time-to-hit, so seeks and dropped frames correct themselves on the next
/// frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NoteField {
    pub approach_duration_s: f32,
    pub hit_line_y: f32,
    pub spawn_y: f32,
}

impl Default for NoteField {
    fn default() -> Self {
        Self {
            approach_duration_s: DEFAULT_APPROACH_DURATION_S,
            hit_line_y: DEFAULT_HIT_LINE_Y,
            spawn_y: DEFAULT_SPAWN_Y,
        }
    }
}

impl NoteField {
    pub fn new(approach_duration_s: f32, hit_line_y: f32, spawn_y: f32) -> Self {
        let approach_duration_s = if approach_duration_s.is_finite() && approach_duration_s > 0.0 {
            approach_duration_s
        } else {
            DEFAULT_APPROACH_DURATION_S
        };
        Self {
            approach_duration_s,
            hit_line_y,
            spawn_y,
        }
    }

    /// Pixels per second of song time.
    #[inline(always)]
    pub fn speed(&self) -> f32 {
        (self.hit_line_y - self.spawn_y) / self.approach_duration_s
    }

    #[inline(always)]
    pub fn spawn_time_for(&self, note_time: f32) -> f32 {
        note_time - self.approach_duration_s
    }

    #[inline(always)]
    pub fn y_for(&self, note_time: f32, now: f32) -> f32 {
        let time_until_hit = note_time - now;
        self.hit_line_y - time_until_hit * self.speed()
    }
}
