// the data the clip store owns, plus the serde shape it is saved as

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize}; // serde does json

use crate::audio::SampleId;
use crate::shared::{MAX_CLIPS_PER_KEY, NUM_KEYS};

pub const SNAPSHOT_VERSION: u32 = 1;

static NEXT_CLIP_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(pub u64);

pub fn next_clip_id() -> ClipId {
    ClipId(NEXT_CLIP_ID.fetch_add(1, Ordering::Relaxed))
}

/// One audio file bound to a key.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    pub id: ClipId,
    pub name: String,
    pub source: PathBuf,  // where the bytes live; this is what gets saved
    pub sample: SampleId, // playable handle, only meaningful to the running engine
}

/// The clips bound to one key, in the order they were added. Never more
/// than `MAX_CLIPS_PER_KEY`.
#[derive(Clone, Debug, Default)]
pub struct ClipSlot {
    clips: Vec<Clip>,
}

impl ClipSlot {
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn remaining(&self) -> usize {
        MAX_CLIPS_PER_KEY - self.clips.len()
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    // callers check capacity first
    pub(super) fn push(&mut self, clip: Clip) {
        debug_assert!(!self.is_full());
        self.clips.push(clip);
    }

    pub(super) fn remove(&mut self, id: ClipId) -> Option<Clip> {
        let pos = self.clips.iter().position(|c| c.id == id)?;
        Some(self.clips.remove(pos))
    }

    pub(super) fn drain(&mut self) -> Vec<Clip> {
        std::mem::take(&mut self.clips)
    }
}

// -- saved shape --
// Handles and ids are never written; they are rebuilt on every start.

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredClip {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BindingsSnapshot {
    pub version: u32,
    pub keys: Vec<Vec<StoredClip>>, // one list per key, index = key
}

impl Default for BindingsSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            keys: vec![Vec::new(); NUM_KEYS],
        }
    }
}
