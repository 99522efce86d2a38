use super::frame::StereoFrame;
use super::sample_buffer::{SampleBuffer, SampleId};
use crate::audio_api::PlaybackToken;

// The one thing the engine is allowed to be playing.
#[derive(Clone, Debug)]
pub struct Voice {
    pub sample: SampleId,
    pub token: PlaybackToken,
    pos: usize,
}

impl Voice {
    // always starts from frame zero
    pub fn new(sample: SampleId, token: PlaybackToken) -> Self {
        Self {
            sample,
            token,
            pos: 0,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    // Mix this voice into `out`. Returns true once the whole buffer has been played.
    pub fn render_into(&mut self, buffer: &SampleBuffer, gain: f32, out: &mut [StereoFrame]) -> bool {
        let remaining = buffer.data.len().saturating_sub(self.pos);
        let n = remaining.min(out.len());

        for (frame, sample) in out.iter_mut().zip(&buffer.data[self.pos..self.pos + n]) {
            let s = sample.scaled(gain);
            frame.left += s.left;
            frame.right += s.right;
        }
        self.pos += n;

        self.pos >= buffer.data.len()
    }
}
