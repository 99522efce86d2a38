use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::{AudioCommand, AudioEvent};

mod engine;
mod frame;
mod sample_buffer;
mod voice;

pub use frame::StereoFrame;
pub use sample_buffer::{next_sample_id, SampleBuffer, SampleId};

use engine::Engine;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    events_rx: Receiver<AudioEvent>,
    sample_rate: u32,
    stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        if self.tx.try_send(cmd).is_err() {
            log::warn!("audio command queue full, dropping command");
        }
    }

    // drained once per loop iteration so results land in order with key events
    pub fn poll_events(&self) -> Vec<AudioEvent> {
        self.events_rx.try_iter().collect()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            log::warn!("failed to pause audio stream: {e}");
        }
        log::info!("audio stream stopped");
    }
}

pub fn start_audio(gain: f32) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);
    let (events_tx, events_rx) = crossbeam_channel::bounded::<AudioEvent>(256);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let supported = device.default_output_config().context("no default output config")?;

    let dev_name = device.name().unwrap_or_else(|_| "Unknown".into());
    let config: cpal::StreamConfig = supported.config();
    let sample_rate = config.sample_rate;
    let channels = config.channels as usize;
    log::info!("using audio device: {dev_name} ({channels}ch, {sample_rate}Hz)");

    match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            let engine = Engine::new(gain, events_tx);
            let output_stream = build_output_stream_f32(&device, &config, rx, engine, channels)?;
            output_stream.play().context("failed to play output stream")?;

            Ok(AudioHandle {
                tx,
                events_rx,
                sample_rate,
                stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    // stereo scratch buffer, reused every callback
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(4096);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels;
            scratch.resize(n_frames, StereoFrame::default());
            engine.render_block(&mut scratch);

            // fan the stereo frames out to however many channels the device has
            for (out, frame) in data.chunks_exact_mut(channels).zip(&scratch) {
                match out {
                    [mono] => *mono = (frame.left + frame.right) * 0.5,
                    [l, r, rest @ ..] => {
                        *l = frame.left;
                        *r = frame.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        |err| log::error!("audio output stream error: {err}"),
        None,
    )?;

    Ok(stream)
}
