use std::collections::HashMap;

use crossbeam_channel::Sender;

use super::frame::StereoFrame;
use super::sample_buffer::{SampleBuffer, SampleId};
use super::voice::Voice;
use crate::audio_api::{AudioCommand, AudioEvent, PlaybackToken};

// Runs on the audio thread. Holds every registered buffer but only ever
// plays one voice: starting a new one replaces the old without an Ended.
pub struct Engine {
    samples: HashMap<SampleId, SampleBuffer>,
    voice: Option<Voice>,
    gain: f32,
    events_tx: Sender<AudioEvent>,
}

impl Engine {
    pub fn new(gain: f32, events_tx: Sender<AudioEvent>) -> Self {
        Self {
            samples: HashMap::new(),
            voice: None,
            gain: gain.clamp(0.0, 1.0),
            events_tx,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.samples.insert(id, buffer);
            }
            AudioCommand::Play { sample, token } => self.start_voice(sample, token),
            AudioCommand::Stop { token } => {
                if self.voice.as_ref().is_some_and(|v| v.token == token) {
                    self.voice = None;
                }
            }
            AudioCommand::ReleaseSample { id } => {
                if self.voice.as_ref().is_some_and(|v| v.sample == id) {
                    self.voice = None;
                }
                self.samples.remove(&id);
            }
        }
    }

    fn start_voice(&mut self, sample: SampleId, token: PlaybackToken) {
        if !self.samples.contains_key(&sample) {
            self.voice = None;
            self.emit(AudioEvent::StartFailed {
                token,
                reason: format!("sample {} is not loaded", sample.0),
            });
            return;
        }
        self.voice = Some(Voice::new(sample, token));
        self.emit(AudioEvent::Started { token });
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::default());

        let Some(voice) = self.voice.as_mut() else {
            return;
        };
        let finished = match self.samples.get(&voice.sample) {
            Some(buffer) => voice.render_into(buffer, self.gain, out),
            None => true,
        };
        if finished {
            let token = voice.token;
            self.voice = None;
            self.emit(AudioEvent::Ended { token });
        }
    }

    #[cfg(test)]
    pub fn playing(&self) -> Option<PlaybackToken> {
        self.voice.as_ref().map(|v| v.token)
    }

    fn emit(&self, event: AudioEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            log::warn!("audio event queue full, dropping {:?}", e.into_inner());
        }
    }
}
