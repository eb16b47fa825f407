use crate::game::note::{DEFAULT_LANE_COUNT, MAX_LANES};
use log::warn;

pub const DEFAULT_LANE_KEYS: [char; DEFAULT_LANE_COUNT] = ['d', 'f', 'j', 'k'];

/// Key → lane bindings. Keys are stored lowercase and matched
/// case-insensitively.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Keymap {
    keys: [Option<char>; MAX_LANES],
}

impl Default for Keymap {
    fn default() -> Self {
        let mut keys = [None; MAX_LANES];
        for (slot, key) in keys.iter_mut().zip(DEFAULT_LANE_KEYS) {
            *slot = Some(key);
        }
        Self { keys }
    }
}

impl Keymap {
    pub const fn empty() -> Self {
        Self {
            keys: [None; MAX_LANES],
        }
    }

    /// Binds `key` to `lane`, removing it from any other lane first so one key
    /// never drives two lanes.
    pub fn bind(&mut self, lane: usize, key: char) {
        if lane >= MAX_LANES {
            warn!("Ignoring binding for lane {lane}: only {MAX_LANES} lanes exist.");
            return;
        }
        let key = key.to_ascii_lowercase();
        for slot in &mut self.keys {
            if *slot == Some(key) {
                *slot = None;
            }
        }
        self.keys[lane] = Some(key);
    }

    #[inline(always)]
    pub fn key_for_lane(&self, lane: usize) -> Option<char> {
        self.keys.get(lane).copied().flatten()
    }

    #[inline(always)]
    pub fn lane_for_key(&self, key: char) -> Option<usize> {
        let key = key.to_ascii_lowercase();
        self.keys.iter().position(|k| *k == Some(key))
    }
}

/// Parses a single-character binding token from config, e.g. "D" or "j".
pub fn parse_key_token(tok: &str) -> Option<char> {
    let mut chars = tok.trim().chars();
    let c = chars.next()?;
    if chars.next().is_some() || c.is_whitespace() {
        return None;
    }
    Some(c.to_ascii_lowercase())
}
