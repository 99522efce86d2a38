use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::shared::SlotKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PressTimer {
    key: SlotKey,
    deadline: Instant,
}

/// Turns raw key edges into presses and long presses.
///
/// A press fires right away on key-down so playback feels instant. The
/// same key-down also arms a long-press timer; if the key is still held
/// when it runs out, the press is reclassified as a long press. Only one
/// timer exists at a time, so while one key is held a second key can play
/// but cannot arm its own timer.
pub struct InputDispatcher {
    threshold: Duration,
    timer: Option<PressTimer>,
    held: HashSet<SlotKey>,
    // Without release events a timer could never be cancelled, so long
    // presses are off and every key-down counts.
    releases_reported: bool,
}

impl InputDispatcher {
    pub fn new(threshold: Duration, releases_reported: bool) -> Self {
        Self {
            threshold,
            timer: None,
            held: HashSet::new(),
            releases_reported,
        }
    }

    /// Returns the key to press, if `c` is a bound key and not a repeat.
    pub fn key_down(&mut self, c: char, now: Instant) -> Option<SlotKey> {
        let key = SlotKey::from_char(c)?;
        if !self.releases_reported {
            return Some(key);
        }
        // Dedup: ignore if already held
        if !self.held.insert(key) {
            return None;
        }
        if self.timer.is_none() {
            self.timer = Some(PressTimer {
                key,
                deadline: now + self.threshold,
            });
        }
        Some(key)
    }

    pub fn key_up(&mut self, c: char) {
        let Some(key) = SlotKey::from_char(c) else {
            return;
        };
        self.held.remove(&key);
        if self.timer.is_some_and(|t| t.key == key) {
            self.timer = None;
        }
    }

    /// Returns the held key once its timer has run out. Fires at most once
    /// per key-down.
    pub fn poll_long_press(&mut self, now: Instant) -> Option<SlotKey> {
        let timer = self.timer?;
        if now < timer.deadline {
            return None;
        }
        self.timer = None;
        Some(timer.key)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.map(|t| t.deadline)
    }

    // teardown: nothing may fire after this
    pub fn cancel(&mut self) {
        self.timer = None;
        self.held.clear();
    }
}
