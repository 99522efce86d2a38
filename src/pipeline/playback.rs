//! Single-slot playback state machine.
//!
//! At most one clip is audible system-wide. Every transition that starts a
//! clip first stops the previous one, and both the stop and the start are
//! queued as commands/highlight events within the same call, so a frame can
//! never observe two active keys.
//!
//! Results from the audio thread (`Started`, `StartFailed`, `Ended`) are fed
//! back through [`PlaybackController::on_audio_event`]. They carry the token
//! of the playback they belong to, and anything that doesn't match the
//! current playback is stale and ignored. That is what keeps a natural end
//! and an explicit stop from both counting as a stop.

use crate::audio::SampleId;
use crate::audio_api::{AudioCommand, AudioEvent, PlaybackToken};
use crate::shared::{SlotKey, UiEvent};

use super::project::{Clip, ClipId};
use super::selector::{PlaybackSelector, Selection};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing {
        key: SlotKey,
        clip: ClipId,
        sample: SampleId,
        token: PlaybackToken,
    },
}

#[derive(Debug)]
pub struct PlaybackController {
    state: PlaybackState,
    next_token: u64,
    commands: Vec<AudioCommand>,
    ui_events: Vec<UiEvent>,
    notices: Vec<String>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            next_token: 1,
            commands: Vec::new(),
            ui_events: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn active_key(&self) -> Option<SlotKey> {
        match self.state {
            PlaybackState::Playing { key, .. } => Some(key),
            PlaybackState::Idle => None,
        }
    }

    pub fn active_clip(&self) -> Option<(SlotKey, ClipId)> {
        match self.state {
            PlaybackState::Playing { key, clip, .. } => Some((key, clip)),
            PlaybackState::Idle => None,
        }
    }

    /// A short press of `key` whose slot currently holds `clips`.
    pub fn press(&mut self, key: SlotKey, clips: &[Clip], selector: &mut PlaybackSelector) {
        match selector.select(key, clips.len(), self.active_key()) {
            Selection::Nothing => {}
            Selection::Stop => {
                log::debug!("key {key} pressed again, toggling off");
                self.stop();
            }
            Selection::Play(index) => match clips.get(index) {
                Some(clip) => self.play(key, clip),
                None => log::warn!("selector picked clip {index} of {} on key {key}", clips.len()),
            },
        }
    }

    /// Start `clip` from the top, stopping whatever was playing first.
    pub fn play(&mut self, key: SlotKey, clip: &Clip) {
        self.stop();

        let token = PlaybackToken(self.next_token);
        self.next_token += 1;

        self.commands.push(AudioCommand::Play {
            sample: clip.sample,
            token,
        });
        self.ui_events.push(UiEvent::KeyActive { key, active: true });
        self.ui_events.push(UiEvent::ClipActive {
            key,
            clip: clip.id,
            active: true,
        });
        self.state = PlaybackState::Playing {
            key,
            clip: clip.id,
            sample: clip.sample,
            token,
        };
        log::debug!("key {key}: playing \"{}\"", clip.name);
    }

    /// Stop playback. Calling this while idle does nothing. Returns whether
    /// anything was actually stopped.
    pub fn stop(&mut self) -> bool {
        let PlaybackState::Playing { token, .. } = self.state else {
            return false;
        };
        self.commands.push(AudioCommand::Stop { token });
        self.go_idle();
        true
    }

    // long press: stops no matter which policy is active
    pub fn force_stop(&mut self, held: SlotKey) {
        if self.stop() {
            log::debug!("long press on key {held}, playback stopped");
        }
    }

    /// Must be called before a clip is destroyed so nothing keeps playing a
    /// handle that is about to be released.
    pub fn clip_removed(&mut self, key: SlotKey, clip: ClipId) {
        if self.active_clip() == Some((key, clip)) {
            self.stop();
        }
    }

    pub fn on_audio_event(&mut self, event: AudioEvent) {
        let current = match self.state {
            PlaybackState::Playing { token, .. } => Some(token),
            PlaybackState::Idle => None,
        };
        match event {
            AudioEvent::Started { token } if Some(token) == current => {
                log::debug!("playback {} started", token.0);
            }
            AudioEvent::StartFailed { token, reason } if Some(token) == current => {
                log::warn!("playback failed to start: {reason}");
                self.notices.push(format!("could not play: {reason}"));
                self.go_idle();
            }
            AudioEvent::Ended { token } if Some(token) == current => {
                log::debug!("playback {} reached the end", token.0);
                self.go_idle();
            }
            stale => log::debug!("ignoring stale audio event {stale:?}"),
        }
    }

    fn go_idle(&mut self) {
        if let PlaybackState::Playing { key, clip, .. } = self.state {
            self.ui_events.push(UiEvent::ClipActive {
                key,
                clip,
                active: false,
            });
            self.ui_events.push(UiEvent::KeyActive { key, active: false });
        }
        self.state = PlaybackState::Idle;
    }

    pub fn take_commands(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn take_ui_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.ui_events)
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}
