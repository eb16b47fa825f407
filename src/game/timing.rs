use crate::game::judgment::JudgeGrade;
use crate::game::timing_windows::{
    BASE_BAD_S, BASE_GOOD_S, BASE_HOLD_RELEASE_GRACE_S, BASE_LATE_TOLERANCE_S, BASE_PERFECT_S,
    clamp_bad_window_s,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimingProfile {
    // Nested tap windows (seconds): Perfect, Good, Bad. Bad is the outer window.
    pub windows_s: [f32; 3],
    pub late_tolerance_s: f32,
    pub hold_release_grace_s: f32,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self {
            windows_s: [BASE_PERFECT_S, BASE_GOOD_S, BASE_BAD_S],
            late_tolerance_s: BASE_LATE_TOLERANCE_S,
            hold_release_grace_s: BASE_HOLD_RELEASE_GRACE_S,
        }
    }
}

impl TimingProfile {
    /// Builds a profile from user-provided windows, keeping them nested and
    /// the outer window inside its allowed band.
    pub fn new(perfect_s: f32, good_s: f32, bad_s: f32, late_tolerance_s: f32) -> Self {
        let bad = clamp_bad_window_s(bad_s);
        let good = if good_s.is_finite() { good_s.clamp(0.0, bad) } else { BASE_GOOD_S.min(bad) };
        let perfect = if perfect_s.is_finite() {
            perfect_s.clamp(0.0, good)
        } else {
            BASE_PERFECT_S.min(good)
        };
        let late = if late_tolerance_s.is_finite() && late_tolerance_s > 0.0 {
            late_tolerance_s
        } else {
            BASE_LATE_TOLERANCE_S
        };
        Self {
            windows_s: [perfect, good, bad],
            late_tolerance_s: late,
            hold_release_grace_s: BASE_HOLD_RELEASE_GRACE_S,
        }
    }

    #[inline(always)]
    pub const fn outer_window_s(&self) -> f32 {
        self.windows_s[2]
    }

    #[inline(always)]
    pub fn windows_ms(&self) -> [f32; 3] {
        let s = self.windows_s;
        [s[0] * 1000.0, s[1] * 1000.0, s[2] * 1000.0]
    }
}

/// Classify a signed tap offset (seconds), inner window first.
///
/// Returns `None` outside the outer window: the press is a whiff and must not
/// touch any note.
#[inline(always)]
pub fn classify_offset_s(offset_s: f32, profile: &TimingProfile) -> Option<JudgeGrade> {
    let abs = offset_s.abs();
    let w = profile.windows_s;
    if abs <= w[0] {
        Some(JudgeGrade::Perfect)
    } else if abs <= w[1] {
        Some(JudgeGrade::Good)
    } else if abs <= w[2] {
        Some(JudgeGrade::Bad)
    } else {
        None
    }
}

/// True once a note is far enough in the past that it can no longer be hit.
#[inline(always)]
pub fn is_past_late_tolerance(note_time: f32, now: f32, profile: &TimingProfile) -> bool {
    now - note_time > profile.late_tolerance_s
}
