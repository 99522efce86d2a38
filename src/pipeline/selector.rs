use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::shared::{SlotKey, NUM_KEYS};

/// How a press picks which of a key's clips to play. One policy is active
/// per process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackPolicy {
    /// Uniform pick on every press, repeats allowed.
    #[default]
    Random,
    /// Walk the clips in order while the same key keeps being pressed.
    RoundRobin,
    /// Pressing the playing key again stops it.
    ToggleSingle,
}

impl PlaybackPolicy {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackPolicy::Random => "random",
            PlaybackPolicy::RoundRobin => "round-robin",
            PlaybackPolicy::ToggleSingle => "toggle",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Play(usize), // index into the key's slot
    Stop,
    Nothing, // empty slot, caller does nothing at all
}

pub struct PlaybackSelector {
    policy: PlaybackPolicy,
    cursor_by_key: [usize; NUM_KEYS], // last played index, unused by Random
    last_key: Option<SlotKey>,
    rng: StdRng,
}

impl PlaybackSelector {
    pub fn new(policy: PlaybackPolicy, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            policy,
            cursor_by_key: [0; NUM_KEYS],
            last_key: None,
            rng,
        }
    }

    pub fn cursor(&self, key: SlotKey) -> usize {
        self.cursor_by_key[key.index()]
    }

    /// Decide what a press of `key` does, given how many clips it holds and
    /// which key (if any) is audible right now.
    pub fn select(&mut self, key: SlotKey, slot_len: usize, active_key: Option<SlotKey>) -> Selection {
        // an empty key still counts as pressed in between for round-robin
        let repeated = self.last_key == Some(key);
        self.last_key = Some(key);
        if slot_len == 0 {
            return Selection::Nothing;
        }
        let cursor = &mut self.cursor_by_key[key.index()];
        *cursor = (*cursor).min(slot_len - 1);

        match self.policy {
            PlaybackPolicy::Random => Selection::Play(self.rng.gen_range(0..slot_len)),
            PlaybackPolicy::RoundRobin => {
                if repeated {
                    *cursor = (*cursor + 1) % slot_len;
                }
                Selection::Play(*cursor)
            }
            PlaybackPolicy::ToggleSingle => {
                if active_key == Some(key) {
                    Selection::Stop
                } else {
                    Selection::Play(*cursor)
                }
            }
        }
    }

    // keep the cursor pointing at a real clip after the slot shrank
    pub fn slot_changed(&mut self, key: SlotKey, slot_len: usize) {
        let cursor = &mut self.cursor_by_key[key.index()];
        *cursor = if slot_len == 0 { 0 } else { (*cursor).min(slot_len - 1) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> SlotKey {
        SlotKey::new(n).unwrap()
    }

    #[test]
    fn empty_slot_selects_nothing() {
        for policy in [
            PlaybackPolicy::Random,
            PlaybackPolicy::RoundRobin,
            PlaybackPolicy::ToggleSingle,
        ] {
            let mut selector = PlaybackSelector::new(policy, Some(7));
            assert_eq!(selector.select(key(1), 0, None), Selection::Nothing);
        }
    }

    #[test]
    fn round_robin_walks_and_wraps() {
        let mut selector = PlaybackSelector::new(PlaybackPolicy::RoundRobin, None);
        let k = key(4);
        let picks: Vec<_> = (0..4).map(|_| selector.select(k, 3, Some(k))).collect();
        assert_eq!(
            picks,
            [
                Selection::Play(0),
                Selection::Play(1),
                Selection::Play(2),
                Selection::Play(0),
            ]
        );
    }

    #[test]
    fn round_robin_resumes_after_another_key() {
        let mut selector = PlaybackSelector::new(PlaybackPolicy::RoundRobin, None);
        assert_eq!(selector.select(key(1), 3, None), Selection::Play(0));
        assert_eq!(selector.select(key(1), 3, Some(key(1))), Selection::Play(1));
        assert_eq!(selector.select(key(2), 2, Some(key(1))), Selection::Play(0));
        // back on key 1: the stored cursor, not the next one
        assert_eq!(selector.select(key(1), 3, Some(key(2))), Selection::Play(1));
        assert_eq!(selector.select(key(1), 3, Some(key(1))), Selection::Play(2));
    }

    #[test]
    fn empty_key_in_between_breaks_the_streak() {
        let mut selector = PlaybackSelector::new(PlaybackPolicy::RoundRobin, None);
        assert_eq!(selector.select(key(1), 3, None), Selection::Play(0));
        assert_eq!(selector.select(key(5), 0, Some(key(1))), Selection::Nothing);
        assert_eq!(selector.select(key(1), 3, Some(key(1))), Selection::Play(0));
        assert_eq!(selector.select(key(1), 3, Some(key(1))), Selection::Play(1));
    }

    #[test]
    fn toggle_stops_the_playing_key() {
        let mut selector = PlaybackSelector::new(PlaybackPolicy::ToggleSingle, None);
        assert_eq!(selector.select(key(0), 2, None), Selection::Play(0));
        assert_eq!(selector.select(key(0), 2, Some(key(0))), Selection::Stop);
        assert_eq!(selector.select(key(0), 2, None), Selection::Play(0));
        assert_eq!(selector.select(key(3), 1, Some(key(0))), Selection::Play(0));
    }

    #[test]
    fn random_stays_in_range_and_is_seedable() {
        let mut a = PlaybackSelector::new(PlaybackPolicy::Random, Some(42));
        let mut b = PlaybackSelector::new(PlaybackPolicy::Random, Some(42));
        for _ in 0..50 {
            let pick = a.select(key(5), 4, None);
            assert!(matches!(pick, Selection::Play(i) if i < 4));
            assert_eq!(pick, b.select(key(5), 4, None));
        }
    }

    #[test]
    fn shrinking_slot_clamps_the_cursor() {
        let mut selector = PlaybackSelector::new(PlaybackPolicy::RoundRobin, None);
        let k = key(6);
        for _ in 0..3 {
            selector.select(k, 3, Some(k));
        }
        assert_eq!(selector.cursor(k), 2);

        selector.slot_changed(k, 2);
        assert_eq!(selector.cursor(k), 1);
        selector.slot_changed(k, 0);
        assert_eq!(selector.cursor(k), 0);
    }
}
