pub const MAX_LANES: usize = 8;
pub const DEFAULT_LANE_COUNT: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteKind {
    Short,
    Long,
}

impl NoteKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

/// A validated chart note. Only `game::beatmap` constructs these, so
/// `time >= 0` and `duration > 0` for long notes always hold.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NoteEvent {
    pub time: f32,
    pub lane: usize,
    pub kind: NoteKind,
    pub duration: Option<f32>,
}

impl NoteEvent {
    #[inline(always)]
    pub fn end_time(&self) -> f32 {
        match (self.kind, self.duration) {
            (NoteKind::Long, Some(d)) => self.time + d,
            _ => self.time,
        }
    }

    #[inline(always)]
    pub const fn is_long(&self) -> bool {
        matches!(self.kind, NoteKind::Long)
    }
}

/// A note living in the active set. `note_index` is the note's position in
/// the sorted beatmap and doubles as its identity for the presentation layer.
#[derive(Clone, Debug)]
pub struct ActiveNote {
    pub note_index: usize,
    pub event: NoteEvent,
    pub consumed: bool,
    // Recomputed every frame by the position pass; never read back as input.
    pub y: f32,
}

impl ActiveNote {
    pub const fn new(note_index: usize, event: NoteEvent, y: f32) -> Self {
        Self {
            note_index,
            event,
            consumed: false,
            y,
        }
    }
}

/// A long note whose head was hit and whose body is still being sustained.
#[derive(Clone, Debug)]
pub struct ActiveHold {
    pub note_index: usize,
    pub start_time: f32,
    pub end_time: f32,
    pub is_pressed: bool,
}
