pub mod beatmap;
pub mod gameplay;
pub mod judgment;
pub mod note;
pub mod scores;
pub mod scroll;
pub mod stage_stats;
pub mod timing;
pub mod timing_stats;
pub mod timing_windows;
