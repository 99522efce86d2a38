// The middle layer: the only place with playback and binding state. The tui
// hands it InputEvents, the audio thread hands it AudioEvents, and every call
// returns the AudioCommands that should be sent to the engine, in order.
// Everything runs on the ui thread, one event at a time.

use std::path::PathBuf;
use std::time::Instant;

use crate::audio_api::{AudioCommand, AudioEvent};
use crate::config::Config;
use crate::error::ClipError;
use crate::loader::sample_loader::{self, SourceFile};
use crate::pipeline::clip_store::ClipStore;
use crate::pipeline::dispatcher::InputDispatcher;
use crate::pipeline::persistence::SnapshotStore;
use crate::pipeline::playback::PlaybackController;
use crate::pipeline::project::{Clip, ClipId};
use crate::pipeline::selector::PlaybackSelector;
use crate::shared::{ClipView, DisplayState, InputEvent, SlotKey, UiEvent};

pub struct Middle {
    store: ClipStore,
    selector: PlaybackSelector,
    controller: PlaybackController,
    dispatcher: InputDispatcher,
    snapshots: Box<dyn SnapshotStore>,
    sample_rate: u32,
    commands: Vec<AudioCommand>, // outbox, drained by every public entry point
    display: DisplayState,
}

impl Middle {
    pub fn new(
        config: &Config,
        snapshots: Box<dyn SnapshotStore>,
        sample_rate: u32,
        releases_reported: bool,
    ) -> Self {
        Self {
            store: ClipStore::new(),
            selector: PlaybackSelector::new(config.policy, config.seed),
            controller: PlaybackController::new(),
            dispatcher: InputDispatcher::new(config.long_press(), releases_reported),
            snapshots,
            sample_rate,
            commands: Vec::new(),
            display: DisplayState::new(config.policy),
        }
    }

    /// Load the saved bindings and decode every clip. Bad saved data means
    /// starting empty; clips whose files can't be read anymore are dropped.
    pub fn restore(&mut self) -> Vec<AudioCommand> {
        let restored = match self.snapshots.load() {
            Ok(Some(snapshot)) => ClipStore::restore(snapshot),
            Ok(None) => Ok(ClipStore::new()),
            Err(e) => Err(e),
        };
        match restored {
            Ok(store) => self.store = store,
            Err(e) => {
                log::warn!("{e}; starting with no bindings");
                self.display.notice = Some(format!("{e}, starting empty"));
                self.store = ClipStore::new();
            }
        }
        // fresh store, every slot counts as changed
        for key in SlotKey::all() {
            self.apply(UiEvent::SlotChanged(key));
        }

        let mut unreadable = Vec::new();
        let clips: Vec<(SlotKey, Clip)> = self.store.iter().map(|(k, c)| (k, c.clone())).collect();
        for (key, clip) in clips {
            let file = SourceFile::probe(&clip.source);
            match sample_loader::load(&file, self.sample_rate) {
                Ok(buffer) => self.commands.push(AudioCommand::RegisterSample {
                    id: clip.sample,
                    buffer,
                }),
                Err(e) => {
                    log::warn!("dropping \"{}\" from key {key}: {e:#}", clip.name);
                    unreadable.push((key, clip.id));
                }
            }
        }
        if !unreadable.is_empty() {
            self.display.notice = Some(format!("{} saved clip(s) could not be loaded", unreadable.len()));
            for (key, id) in unreadable {
                self.take_out(key, id);
            }
            self.save();
        }
        log::info!("restored {} clip(s)", self.store.iter().count());
        self.flush()
    }

    pub fn handle_input(&mut self, event: InputEvent, now: Instant) -> Vec<AudioCommand> {
        match event {
            InputEvent::KeyDown(c) => {
                if let Some(key) = self.dispatcher.key_down(c, now) {
                    self.press(key);
                }
            }
            InputEvent::KeyUp(c) => self.dispatcher.key_up(c),
            InputEvent::AddClips { key, paths } => {
                self.add_files(key, &paths);
            }
            InputEvent::RemoveActiveClip => {
                if let Some((key, id)) = self.controller.active_clip() {
                    self.remove_clip(key, id);
                }
            }
            InputEvent::ShowKey(key) => self.display.shown_key = key,
            InputEvent::Quit => return self.shutdown(),
        }
        self.flush()
    }

    pub fn on_audio_event(&mut self, event: AudioEvent) -> Vec<AudioCommand> {
        self.controller.on_audio_event(event);
        self.flush()
    }

    // checks the long-press timer; call every loop iteration
    pub fn tick(&mut self, now: Instant) -> Vec<AudioCommand> {
        if let Some(key) = self.dispatcher.poll_long_press(now) {
            self.controller.force_stop(key);
        }
        self.flush()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.dispatcher.next_deadline()
    }

    fn press(&mut self, key: SlotKey) {
        self.display.shown_key = key;
        self.controller
            .press(key, self.store.list_clips(key), &mut self.selector);
        self.pull_controller();
    }

    /// Decode and bind a batch of files. Whatever can be added is added;
    /// each rejection is returned (and shown) on its own.
    pub fn add_files(&mut self, key: SlotKey, paths: &[PathBuf]) -> (Vec<Clip>, Vec<ClipError>) {
        let files: Vec<SourceFile> = paths.iter().map(|p| SourceFile::probe(p)).collect();
        let rate = self.sample_rate;
        let report = self.store.add_clips(key, &files, |file| {
            sample_loader::load(file, rate).map_err(|e| ClipError::Unreadable {
                name: file.name.clone(),
                reason: format!("{e:#}"),
            })
        });

        let mut added = Vec::with_capacity(report.added.len());
        for (clip, buffer) in report.added {
            log::info!("key {key}: bound \"{}\"", clip.name);
            self.commands.push(AudioCommand::RegisterSample {
                id: clip.sample,
                buffer,
            });
            added.push(clip);
        }
        for e in &report.rejected {
            log::warn!("{e}");
        }
        if let Some(last) = report.rejected.last() {
            self.display.notice = Some(last.to_string());
        } else if !added.is_empty() {
            self.display.notice = Some(format!("added {} clip(s) to key {key}", added.len()));
        }
        if !added.is_empty() {
            self.save();
        }
        (added, report.rejected)
    }

    /// Remove one clip. If it is playing it is stopped before its handle is
    /// released.
    pub fn remove_clip(&mut self, key: SlotKey, id: ClipId) -> Option<Clip> {
        let removed = self.take_out(key, id)?;
        self.save();
        self.display.notice = Some(format!("removed \"{}\" from key {key}", removed.name));
        Some(removed)
    }

    // 0-based position in the key's list
    pub fn remove_at(&mut self, key: SlotKey, index: usize) -> Option<Clip> {
        let id = self.store.list_clips(key).get(index)?.id;
        self.remove_clip(key, id)
    }

    pub fn clear_key(&mut self, key: SlotKey) -> usize {
        if self.controller.active_key() == Some(key) {
            self.controller.stop();
            self.pull_controller();
        }
        let removed = self.store.clear_key(key);
        for clip in &removed {
            self.commands.push(AudioCommand::ReleaseSample { id: clip.sample });
        }
        self.selector.slot_changed(key, 0);
        if !removed.is_empty() {
            self.save();
        }
        removed.len()
    }

    // stop -> remove -> release, in that order
    fn take_out(&mut self, key: SlotKey, id: ClipId) -> Option<Clip> {
        self.controller.clip_removed(key, id);
        self.pull_controller();
        let removed = self.store.remove_clip(key, id)?;
        self.commands.push(AudioCommand::ReleaseSample { id: removed.sample });
        self.selector.slot_changed(key, self.store.slot(key).len());
        Some(removed)
    }

    /// Teardown: cancel the long-press timer, stop playback, save.
    pub fn shutdown(&mut self) -> Vec<AudioCommand> {
        self.dispatcher.cancel();
        self.controller.stop();
        self.pull_controller();
        self.save();
        self.flush()
    }

    fn save(&mut self) {
        if let Err(e) = self.snapshots.save(&self.store.snapshot()) {
            log::warn!("failed to save bindings: {e:#}");
            self.display.notice = Some(format!("could not save bindings: {e}"));
        }
    }

    pub fn store(&self) -> &ClipStore {
        &self.store
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn display_state(&self) -> &DisplayState {
        &self.display
    }

    // move controller output into our outbox/display so ordering is kept
    fn pull_controller(&mut self) {
        self.commands.extend(self.controller.take_commands());
        for event in self.controller.take_ui_events() {
            self.apply(event);
        }
        if let Some(notice) = self.controller.take_notices().pop() {
            self.display.notice = Some(notice);
        }
    }

    fn flush(&mut self) -> Vec<AudioCommand> {
        self.pull_controller();
        for key in self.store.take_changes() {
            self.apply(UiEvent::SlotChanged(key));
        }
        self.display.shown_clips = self
            .store
            .list_clips(self.display.shown_key)
            .iter()
            .map(|c| ClipView {
                id: c.id,
                name: c.name.clone(),
                active: self.display.active_clip == Some(c.id),
            })
            .collect();
        std::mem::take(&mut self.commands)
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::KeyActive { key, active } => self.display.keys[key.index()].active = active,
            UiEvent::ClipActive { clip, active, .. } => {
                if active {
                    self.display.active_clip = Some(clip);
                } else if self.display.active_clip == Some(clip) {
                    self.display.active_clip = None;
                }
            }
            UiEvent::SlotChanged(key) => {
                let slot = self.store.slot(key);
                let view = &mut self.display.keys[key.index()];
                view.clip_count = slot.len();
                view.full = slot.is_full();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::audio::SampleId;
    use crate::audio_api::PlaybackToken;
    use crate::pipeline::persistence::{MemoryStore, ProjectDir};
    use crate::pipeline::playback::PlaybackState;
    use crate::pipeline::selector::PlaybackPolicy;

    fn key(n: u8) -> SlotKey {
        SlotKey::new(n).unwrap()
    }

    fn write_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample((i % 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn wavs(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|n| {
                let path = dir.join(n);
                write_wav(&path, 64);
                path
            })
            .collect()
    }

    fn middle_with(policy: PlaybackPolicy) -> Middle {
        let config = Config {
            policy,
            seed: Some(1),
            ..Config::default()
        };
        Middle::new(&config, Box::new(MemoryStore::default()), 44100, true)
    }

    fn press(middle: &mut Middle, c: char, now: Instant) -> Vec<AudioCommand> {
        let mut cmds = middle.handle_input(InputEvent::KeyDown(c), now);
        cmds.extend(middle.handle_input(InputEvent::KeyUp(c), now));
        cmds
    }

    fn playing_token(middle: &Middle) -> PlaybackToken {
        match middle.controller().state() {
            PlaybackState::Playing { token, .. } => token,
            PlaybackState::Idle => panic!("not playing"),
        }
    }

    #[test]
    fn added_files_are_registered_and_listed() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = wavs(dir.path(), &["a.wav", "b.wav"]);
        paths.push(dir.path().join("notes.txt"));
        let mut middle = middle_with(PlaybackPolicy::Random);

        let (added, rejected) = middle.add_files(key(1), &paths);
        let cmds = middle.handle_input(InputEvent::ShowKey(key(1)), Instant::now());

        assert_eq!(added.len(), 2);
        assert!(matches!(rejected[..], [ClipError::InvalidMediaType { .. }]));
        let registered: Vec<SampleId> = cmds
            .iter()
            .filter_map(|c| match c {
                AudioCommand::RegisterSample { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(registered, [added[0].sample, added[1].sample]);

        let ds = middle.display_state();
        assert_eq!(ds.keys[1].clip_count, 2);
        assert_eq!(ds.shown_clips.len(), 2);
        assert_eq!(ds.shown_clips[0].name, "a.wav");
        assert!(ds.notice.is_some());
    }

    #[test]
    fn undecodable_audio_is_reported_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.wav");
        std::fs::write(&broken, b"nope").unwrap();
        let mut paths = wavs(dir.path(), &["ok.wav"]);
        paths.push(broken);
        paths.push(dir.path().join("song.mp3"));

        let mut middle = middle_with(PlaybackPolicy::Random);
        let (added, rejected) = middle.add_files(key(2), &paths);
        assert_eq!(added.len(), 1);
        assert_eq!(rejected.len(), 2);
        assert!(rejected.iter().all(|e| matches!(e, ClipError::Unreadable { .. })));
    }

    #[test]
    fn pressing_another_key_stops_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut middle = middle_with(PlaybackPolicy::Random);
        middle.add_files(key(1), &wavs(dir.path(), &["a.wav"]));
        middle.add_files(key(2), &wavs(dir.path(), &["b.wav"]));
        let now = Instant::now();

        press(&mut middle, '1', now);
        let first = playing_token(&middle);
        let cmds = press(&mut middle, '2', now);

        assert!(matches!(cmds[0], AudioCommand::Stop { token } if token == first));
        assert!(matches!(cmds[1], AudioCommand::Play { .. }));
        let ds = middle.display_state();
        assert_eq!(ds.active_key(), Some(key(2)));
        assert!(!ds.keys[1].active);
        assert_eq!(ds.shown_key, key(2));
        assert!(ds.shown_clips[0].active);
    }

    #[test]
    fn unbound_and_empty_keys_do_nothing() {
        let mut middle = middle_with(PlaybackPolicy::RoundRobin);
        let now = Instant::now();
        assert!(press(&mut middle, 'q', now).is_empty());
        assert!(press(&mut middle, '5', now).is_empty());
        assert_eq!(middle.controller().state(), PlaybackState::Idle);
    }

    #[test]
    fn removing_the_playing_clip_stops_then_releases() {
        let dir = tempfile::tempdir().unwrap();
        let mut middle = middle_with(PlaybackPolicy::RoundRobin);
        let (added, _) = middle.add_files(key(3), &wavs(dir.path(), &["a.wav"]));
        press(&mut middle, '3', Instant::now());

        let cmds = middle.handle_input(InputEvent::RemoveActiveClip, Instant::now());

        assert_eq!(middle.controller().state(), PlaybackState::Idle);
        assert!(matches!(cmds[0], AudioCommand::Stop { .. }));
        assert!(matches!(cmds[1], AudioCommand::ReleaseSample { id } if id == added[0].sample));
        assert_eq!(cmds.len(), 2);
        assert!(middle.store().list_clips(key(3)).is_empty());
        assert_eq!(middle.display_state().active_key(), None);
        assert_eq!(middle.selector.cursor(key(3)), 0);
    }

    #[test]
    fn removing_an_idle_clip_only_releases() {
        let dir = tempfile::tempdir().unwrap();
        let mut middle = middle_with(PlaybackPolicy::RoundRobin);
        let (added, _) = middle.add_files(key(4), &wavs(dir.path(), &["a.wav", "b.wav"]));
        middle.flush();

        let removed = middle.remove_at(key(4), 1).unwrap();
        assert_eq!(removed.id, added[1].id);
        let cmds = middle.flush();
        assert!(matches!(cmds[..], [AudioCommand::ReleaseSample { .. }]));
        assert!(middle.remove_at(key(4), 5).is_none());
    }

    #[test]
    fn every_mutation_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let memory = Rc::new(RefCell::new(MemoryStore::default()));
        let mut middle = Middle::new(&Config::default(), Box::new(memory.clone()), 44100, true);
        let paths = wavs(dir.path(), &["a.wav", "b.wav", "c.wav"]);

        middle.add_files(key(0), &paths);
        assert_eq!(memory.borrow().saves, 1);
        middle.remove_at(key(0), 0);
        assert_eq!(memory.borrow().saved.as_ref().unwrap().keys[0].len(), 2);
        middle.clear_key(key(0));
        assert_eq!(memory.borrow().saves, 3);
        // nothing changed, nothing saved
        middle.add_files(key(0), &[dir.path().join("x.txt")]);
        middle.clear_key(key(0));
        assert_eq!(memory.borrow().saves, 3);
        assert!(memory.borrow().saved.as_ref().unwrap().keys[0].is_empty());
    }

    #[test]
    fn corrupt_memory_store_starts_empty() {
        let memory = MemoryStore {
            corrupt: true,
            ..MemoryStore::default()
        };
        let mut middle = Middle::new(&Config::default(), Box::new(memory), 44100, true);
        assert!(middle.restore().is_empty());
        assert!(middle.display_state().notice.is_some());
    }

    #[test]
    fn long_press_forces_a_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut middle = middle_with(PlaybackPolicy::RoundRobin);
        middle.add_files(key(6), &wavs(dir.path(), &["a.wav"]));
        let t0 = Instant::now();

        middle.handle_input(InputEvent::KeyDown('6'), t0);
        assert_eq!(middle.next_deadline(), Some(t0 + Duration::from_millis(1000)));
        assert!(middle.tick(t0 + Duration::from_millis(500)).is_empty());

        let cmds = middle.tick(t0 + Duration::from_millis(1000));
        assert!(matches!(cmds[..], [AudioCommand::Stop { .. }]));
        assert_eq!(middle.controller().state(), PlaybackState::Idle);
    }

    #[test]
    fn quick_release_keeps_playing() {
        let dir = tempfile::tempdir().unwrap();
        let mut middle = middle_with(PlaybackPolicy::RoundRobin);
        middle.add_files(key(6), &wavs(dir.path(), &["a.wav"]));
        let t0 = Instant::now();

        press(&mut middle, '6', t0);
        assert!(middle.tick(t0 + Duration::from_secs(2)).is_empty());
        assert_eq!(middle.controller().active_key(), Some(key(6)));
    }

    #[test]
    fn start_failure_shows_a_notice() {
        let dir = tempfile::tempdir().unwrap();
        let mut middle = middle_with(PlaybackPolicy::Random);
        middle.add_files(key(7), &wavs(dir.path(), &["a.wav"]));
        press(&mut middle, '7', Instant::now());
        let token = playing_token(&middle);

        middle.on_audio_event(AudioEvent::StartFailed {
            token,
            reason: "sample 3 is not loaded".into(),
        });

        let ds = middle.display_state();
        assert_eq!(ds.active_key(), None);
        assert_eq!(ds.active_clip, None);
        assert_eq!(ds.notice.as_deref(), Some("could not play: sample 3 is not loaded"));
    }

    #[test]
    fn natural_end_clears_highlight() {
        let dir = tempfile::tempdir().unwrap();
        let mut middle = middle_with(PlaybackPolicy::Random);
        middle.add_files(key(8), &wavs(dir.path(), &["a.wav"]));
        press(&mut middle, '8', Instant::now());
        let token = playing_token(&middle);

        let cmds = middle.on_audio_event(AudioEvent::Ended { token });
        assert!(cmds.is_empty());
        assert_eq!(middle.display_state().active_key(), None);
    }

    #[test]
    fn bindings_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let paths = wavs(dir.path(), &["a.wav", "b.wav", "c.wav"]);
        let config = Config::default();

        let mut first = Middle::new(&config, Box::new(ProjectDir::new(dir.path())), 44100, true);
        first.restore();
        first.add_files(key(1), &paths[..2]);
        first.add_files(key(9), &paths[2..]);
        first.shutdown();

        let mut second = Middle::new(&config, Box::new(ProjectDir::new(dir.path())), 44100, true);
        let cmds = second.restore();

        assert_eq!(cmds.len(), 3);
        for k in SlotKey::all() {
            let before: Vec<_> = first.store().list_clips(k).iter().map(|c| (&c.name, &c.source)).collect();
            let after: Vec<_> = second.store().list_clips(k).iter().map(|c| (&c.name, &c.source)).collect();
            assert_eq!(before, after);
        }
        assert_eq!(second.display_state().keys[1].clip_count, 2);
    }

    #[test]
    fn corrupt_bindings_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        let bindings = ProjectDir::new(dir.path());
        std::fs::create_dir_all(bindings.path().parent().unwrap()).unwrap();
        std::fs::write(bindings.path(), "{ this is not json").unwrap();

        let mut middle = Middle::new(&Config::default(), Box::new(bindings), 44100, true);
        let cmds = middle.restore();

        assert!(cmds.is_empty());
        assert_eq!(middle.store().iter().count(), 0);
        assert!(middle.display_state().notice.as_deref().unwrap_or("").contains("corrupt"));
    }

    #[test]
    fn vanished_files_are_dropped_on_restore() {
        let dir = tempfile::tempdir().unwrap();
        let paths = wavs(dir.path(), &["keep.wav", "gone.wav"]);
        let config = Config::default();

        let mut first = Middle::new(&config, Box::new(ProjectDir::new(dir.path())), 44100, true);
        first.add_files(key(2), &paths);
        std::fs::remove_file(&paths[1]).unwrap();

        let mut second = Middle::new(&config, Box::new(ProjectDir::new(dir.path())), 44100, true);
        second.restore();
        let names: Vec<_> = second.store().list_clips(key(2)).iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, ["keep.wav"]);

        // and the trimmed list was written back
        let reloaded = ProjectDir::new(dir.path()).load().unwrap().unwrap();
        assert_eq!(reloaded.keys[2].len(), 1);
        // the user is told, not just the log
        assert_eq!(
            second.display_state().notice.as_deref(),
            Some("1 saved clip(s) could not be loaded")
        );
    }

    #[test]
    fn relative_paths_are_saved_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let sounds = tempfile::tempdir_in(&cwd).unwrap();
        write_wav(&sounds.path().join("kick.wav"), 64);
        let relative = sounds.path().strip_prefix(&cwd).unwrap().join("kick.wav");
        assert!(relative.is_relative());

        let project = tempfile::tempdir().unwrap();
        let config = Config::default();
        let mut first = Middle::new(&config, Box::new(ProjectDir::new(project.path())), 44100, true);
        let (added, rejected) = first.add_files(key(1), &[relative]);
        assert_eq!(added.len(), 1, "{rejected:?}");

        let saved = ProjectDir::new(project.path()).load().unwrap().unwrap();
        assert_eq!(saved.keys[1][0].path, sounds.path().join("kick.wav"));
        assert!(saved.keys[1][0].path.is_absolute());

        // resolving no longer depends on where we were started from
        let mut second = Middle::new(&config, Box::new(ProjectDir::new(project.path())), 44100, true);
        assert_eq!(second.restore().len(), 1);
        assert_eq!(second.store().list_clips(key(1)).len(), 1);
    }

    #[test]
    fn shutdown_stops_and_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let mut middle = middle_with(PlaybackPolicy::Random);
        middle.add_files(key(5), &wavs(dir.path(), &["a.wav"]));
        let t0 = Instant::now();
        middle.handle_input(InputEvent::KeyDown('5'), t0);

        let cmds = middle.handle_input(InputEvent::Quit, t0);
        assert!(matches!(cmds[..], [AudioCommand::Stop { .. }]));
        assert!(middle.tick(t0 + Duration::from_secs(5)).is_empty());
    }
}
