// Loaded once on startup, saved after every change to the bindings and on quit.
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::PersistError;
use crate::pipeline::project::BindingsSnapshot;

pub const SOUNDBOARD_DIR: &str = ".soundboard";
const BINDINGS_FILE: &str = "bindings.json";

pub trait SnapshotStore {
    /// `Ok(None)` when nothing was ever saved.
    fn load(&self) -> Result<Option<BindingsSnapshot>, PersistError>;
    fn save(&mut self, snapshot: &BindingsSnapshot) -> anyhow::Result<()>;
}

/// Bindings kept as JSON next to the project: `<project_dir>/.soundboard/bindings.json`
pub struct ProjectDir {
    path: PathBuf,
}

impl ProjectDir {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            path: project_dir.join(SOUNDBOARD_DIR).join(BINDINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for ProjectDir {
    fn load(&self) -> Result<Option<BindingsSnapshot>, PersistError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    // making the directory if it doesn't exist already
    fn save(&mut self, snapshot: &BindingsSnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// Keeps the last saved snapshot in memory; the save count lets tests see
/// that every mutation was persisted.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    pub saved: Option<BindingsSnapshot>,
    pub saves: usize,
    pub corrupt: bool,
}

#[cfg(test)]
impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<BindingsSnapshot>, PersistError> {
        if self.corrupt {
            return Err(PersistError::Corrupt("test".into()));
        }
        Ok(self.saved.clone())
    }

    fn save(&mut self, snapshot: &BindingsSnapshot) -> anyhow::Result<()> {
        self.saved = Some(snapshot.clone());
        self.saves += 1;
        Ok(())
    }
}

// shared handle so a test can look at the store after handing it over
#[cfg(test)]
impl SnapshotStore for std::rc::Rc<std::cell::RefCell<MemoryStore>> {
    fn load(&self) -> Result<Option<BindingsSnapshot>, PersistError> {
        self.borrow().load()
    }

    fn save(&mut self, snapshot: &BindingsSnapshot) -> anyhow::Result<()> {
        self.borrow_mut().save(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::project::StoredClip;

    #[test]
    fn missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectDir::new(dir.path());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProjectDir::new(dir.path());

        let mut snapshot = BindingsSnapshot::default();
        snapshot.keys[2].push(StoredClip {
            name: "horn.wav".into(),
            path: dir.path().join("horn.wav"),
        });
        store.save(&snapshot).unwrap();

        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), Some(snapshot));
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectDir::new(dir.path());
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{\"version\": 1, \"keys\": [[{\"nam").unwrap();

        assert!(matches!(store.load(), Err(PersistError::Corrupt(_))));
    }

    #[test]
    fn wrong_shape_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectDir::new(dir.path());
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "[1, 2, 3]").unwrap();

        assert!(matches!(store.load(), Err(PersistError::Corrupt(_))));
    }
}
