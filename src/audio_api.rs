pub use crate::audio::{SampleBuffer, SampleId};

// Every Play gets a fresh token. Events coming back from the audio thread
// carry it, so the middle layer can drop anything about a playback it has
// already stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaybackToken(pub u64);

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't load files (interrupts thread), so a decoded buffer
    // is registered first and then referred to by id
    RegisterSample { id: SampleId, buffer: SampleBuffer },

    // Start from frame zero, replacing whatever the single voice is playing
    Play { sample: SampleId, token: PlaybackToken },

    // Pause + rewind; a no-op if the token is no longer playing
    Stop { token: PlaybackToken },

    // The clip was removed, drop its buffer
    ReleaseSample { id: SampleId },
}

#[derive(Clone, Debug, PartialEq)]
pub enum AudioEvent {
    Started { token: PlaybackToken },
    StartFailed { token: PlaybackToken, reason: String },
    Ended { token: PlaybackToken },
}
