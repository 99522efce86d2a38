// Types shared between the tui, the middle layer and the audio thread.
//
// Keys:
//   1 2 3         //  KeyDown('1') ... play a clip bound to that key
//   4 5 6         //  holding a key for a second force-stops playback
//   7 8 9
//     0
//
// Other keys:
//   +             //  add clips: then a digit for the key, a path (';' separated), Enter
//   Backspace     //  remove the clip that is currently playing
//   Tab           //  cycle which key's clip list is shown
//   Esc           //  Quit
//
// Like the pad grid in a pocket sampler, the tui never owns playback state.
// It turns key presses into InputEvents and renders whatever DisplayState the
// middle layer hands back each frame.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::pipeline::project::ClipId;
use crate::pipeline::selector::PlaybackPolicy;

pub const NUM_KEYS: usize = 10;
pub const MAX_CLIPS_PER_KEY: usize = 10;
pub const DEFAULT_LONG_PRESS_MS: u64 = 1000;

/// One of the ten bindable keys, `'0'` through `'9'`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey(u8);

impl SlotKey {
    pub fn new(n: u8) -> Option<Self> {
        (n < NUM_KEYS as u8).then_some(SlotKey(n))
    }

    pub fn from_char(c: char) -> Option<Self> {
        c.to_digit(10).and_then(|d| Self::new(d as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_char(self) -> char {
        (b'0' + self.0) as char
    }

    // 0..=9 in slot order
    pub fn all() -> impl Iterator<Item = SlotKey> {
        (0..NUM_KEYS as u8).map(SlotKey)
    }

    pub fn next(self) -> Self {
        SlotKey((self.0 + 1) % NUM_KEYS as u8)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for SlotKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                SlotKey::from_char(c).ok_or_else(|| format!("'{s}' is not a key between 0 and 9"))
            }
            _ => Err(format!("'{s}' is not a key between 0 and 9")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // raw key edges; the dispatcher decides which of these are bound keys
    KeyDown(char),
    KeyUp(char),

    // resolved by the tui prompt
    AddClips { key: SlotKey, paths: Vec<PathBuf> },
    RemoveActiveClip,
    ShowKey(SlotKey),

    Quit,
}

/// Highlight intents emitted by the playback core. The view layer owns the
/// actual widget state; these are folded into `DisplayState` before a frame
/// is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiEvent {
    KeyActive { key: SlotKey, active: bool },
    ClipActive { key: SlotKey, clip: ClipId, active: bool },
    SlotChanged(SlotKey),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyView {
    pub clip_count: usize,
    pub active: bool,
    pub full: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClipView {
    pub id: ClipId,
    pub name: String,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub keys: [KeyView; NUM_KEYS],
    pub shown_key: SlotKey,
    pub shown_clips: Vec<ClipView>, // clip list of shown_key, in slot order
    pub active_clip: Option<ClipId>,
    pub policy: PlaybackPolicy,
    pub notice: Option<String>, // last thing the user should know about
}

impl DisplayState {
    pub fn new(policy: PlaybackPolicy) -> Self {
        Self {
            keys: std::array::from_fn(|_| KeyView::default()),
            shown_key: SlotKey(1),
            shown_clips: Vec::new(),
            active_clip: None,
            policy,
            notice: None,
        }
    }

    pub fn active_key(&self) -> Option<SlotKey> {
        SlotKey::all().find(|k| self.keys[k.index()].active)
    }
}
