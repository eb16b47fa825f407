// Shared timing window definitions to keep judging and expiry in sync.

// All base windows are in seconds.
pub const BASE_PERFECT_S: f32 = 0.050;
pub const BASE_GOOD_S: f32 = 0.100;
pub const BASE_BAD_S: f32 = 0.150;

// Outer window is configurable, but only inside this band.
pub const BAD_WINDOW_MIN_S: f32 = 0.150;
pub const BAD_WINDOW_MAX_S: f32 = 0.200;

// How far past its time an unhit note survives before the sweeper drops it.
pub const BASE_LATE_TOLERANCE_S: f32 = 0.200;

// Early release allowance at the end of a long note.
pub const BASE_HOLD_RELEASE_GRACE_S: f32 = 0.200;

#[inline(always)]
pub fn clamp_bad_window_s(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(BAD_WINDOW_MIN_S, BAD_WINDOW_MAX_S)
    } else {
        BASE_BAD_S
    }
}
