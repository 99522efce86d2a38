// Owns every clip. Playback only ever reads from here; the only writers are
// the add/remove paths driven by the user.

use crate::audio::next_sample_id;
use crate::error::{ClipError, PersistError};
use crate::loader::sample_loader::SourceFile;
use crate::shared::{SlotKey, MAX_CLIPS_PER_KEY, NUM_KEYS};

use super::project::{next_clip_id, BindingsSnapshot, Clip, ClipId, ClipSlot, StoredClip, SNAPSHOT_VERSION};

pub fn validate_media_type(file: &SourceFile) -> Result<(), ClipError> {
    if file.is_audio() {
        Ok(())
    } else {
        Err(ClipError::InvalidMediaType {
            name: file.name.clone(),
            media_type: file.media_type.to_string(),
        })
    }
}

pub fn check_capacity(key: SlotKey, slot_len: usize) -> Result<(), ClipError> {
    if slot_len < MAX_CLIPS_PER_KEY {
        Ok(())
    } else {
        Err(ClipError::CapacityExceeded { key, remaining: 0 })
    }
}

/// Outcome of adding several files at once. Valid files are added even when
/// others in the same batch are rejected.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub added: Vec<(Clip, T)>,
    pub rejected: Vec<ClipError>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ClipStore {
    slots: [ClipSlot; NUM_KEYS],
    changed: Vec<SlotKey>, // "slot changed" notifications not yet picked up
}

impl ClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clip(&mut self, key: SlotKey, file: &SourceFile) -> Result<Clip, ClipError> {
        let slot = &mut self.slots[key.index()];
        check_capacity(key, slot.len())?;
        validate_media_type(file)?;

        let clip = Clip {
            id: next_clip_id(),
            name: file.name.clone(),
            source: file.path.clone(),
            sample: next_sample_id(),
        };
        slot.push(clip.clone());
        let count = slot.len();
        self.mark_changed(key);
        log::debug!("key {key}: added \"{}\" ({count} clips)", clip.name);
        Ok(clip)
    }

    // `prepare` runs only for files that passed validation and fit, right
    // before they are added; an error from it rejects just that file.
    pub fn add_clips<T>(
        &mut self,
        key: SlotKey,
        files: &[SourceFile],
        mut prepare: impl FnMut(&SourceFile) -> Result<T, ClipError>,
    ) -> BatchReport<T> {
        let mut report = BatchReport::default();
        let remaining = self.slots[key.index()].remaining();
        let mut overflowed = false;

        for file in files {
            if let Err(e) = validate_media_type(file) {
                report.rejected.push(e);
                continue;
            }
            if self.slots[key.index()].is_full() {
                overflowed = true;
                continue;
            }
            let prepared = match prepare(file) {
                Ok(p) => p,
                Err(e) => {
                    report.rejected.push(e);
                    continue;
                }
            };
            match self.add_clip(key, file) {
                Ok(clip) => report.added.push((clip, prepared)),
                Err(e) => report.rejected.push(e),
            }
        }

        if overflowed {
            report.rejected.push(ClipError::CapacityExceeded { key, remaining });
        }
        report
    }

    /// Takes the clip out of its slot. The caller owns the returned clip and
    /// is responsible for releasing its playable handle.
    pub fn remove_clip(&mut self, key: SlotKey, id: ClipId) -> Option<Clip> {
        let removed = self.slots[key.index()].remove(id)?;
        self.mark_changed(key);
        log::debug!("key {key}: removed \"{}\"", removed.name);
        Some(removed)
    }

    pub fn clear_key(&mut self, key: SlotKey) -> Vec<Clip> {
        let removed = self.slots[key.index()].drain();
        if !removed.is_empty() {
            self.mark_changed(key);
        }
        removed
    }

    pub fn list_clips(&self, key: SlotKey) -> &[Clip] {
        self.slots[key.index()].clips()
    }

    pub fn slot(&self, key: SlotKey) -> &ClipSlot {
        &self.slots[key.index()]
    }

    // every clip, key by key
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &Clip)> {
        SlotKey::all().flat_map(move |k| self.list_clips(k).iter().map(move |c| (k, c)))
    }

    pub fn take_changes(&mut self) -> Vec<SlotKey> {
        std::mem::take(&mut self.changed)
    }

    fn mark_changed(&mut self, key: SlotKey) {
        if !self.changed.contains(&key) {
            self.changed.push(key);
        }
    }

    pub fn snapshot(&self) -> BindingsSnapshot {
        BindingsSnapshot {
            version: SNAPSHOT_VERSION,
            keys: SlotKey::all()
                .map(|k| {
                    self.list_clips(k)
                        .iter()
                        .map(|c| StoredClip {
                            name: c.name.clone(),
                            path: c.source.clone(),
                        })
                        .collect()
                })
                .collect(),
        }
    }

    /// Rebuild a store from saved bindings. Anything that breaks the slot
    /// invariants is treated as corrupt rather than partially trusted.
    pub fn restore(snapshot: BindingsSnapshot) -> Result<Self, PersistError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistError::Corrupt(format!(
                "unknown version {}",
                snapshot.version
            )));
        }
        if snapshot.keys.len() != NUM_KEYS {
            return Err(PersistError::Corrupt(format!(
                "expected {NUM_KEYS} keys, found {}",
                snapshot.keys.len()
            )));
        }

        let mut store = Self::new();
        for (key, stored) in SlotKey::all().zip(snapshot.keys) {
            if stored.len() > MAX_CLIPS_PER_KEY {
                return Err(PersistError::Corrupt(format!(
                    "key {key} has {} clips",
                    stored.len()
                )));
            }
            for s in stored {
                store.slots[key.index()].push(Clip {
                    id: next_clip_id(),
                    name: s.name,
                    source: s.path,
                    sample: next_sample_id(),
                });
            }
        }
        Ok(store)
    }
}
