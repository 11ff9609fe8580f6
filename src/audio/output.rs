use super::voice::{AdsrConfig, Voice};
use crate::events::PlayerCommand;
use crate::timing::NoteSink;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

const BUFFER_SAMPLES: u32 = 512;
const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// No-op sink for tests and headless runs without an audio device.
#[derive(Debug, Default)]
pub struct NullPlayer;

impl NoteSink for NullPlayer {
    fn note_on(&mut self, _pitch: u8, _velocity: u8) {}
    fn note_off(&mut self, _pitch: u8) {}
    fn stop_all(&mut self) {}
}

/// Owns the cpal stream. Kept on the thread that created it (the stream
/// is not Send); the [`CpalPlayer`] command handle is what crosses into
/// the driver.
pub struct CpalOutput {
    _stream: cpal::Stream,
    sample_rate: u32,
}

/// Nonblocking command handle feeding the audio callback. Failures are
/// logged and swallowed here so a transient audio hiccup never stalls or
/// desyncs the trigger state machine.
pub struct CpalPlayer {
    producer: HeapProd<PlayerCommand>,
}

impl CpalOutput {
    pub fn new() -> Result<(CpalOutput, CpalPlayer), PlayerError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(PlayerError::NoDevice)?;
        let config = device.default_output_config()?;

        let mut stream_config: cpal::StreamConfig = config.into();
        stream_config.buffer_size = cpal::BufferSize::Fixed(BUFFER_SAMPLES);

        let sample_rate = stream_config.sample_rate;
        let num_channels = stream_config.channels as usize;

        let ring = HeapRb::<PlayerCommand>::new(COMMAND_QUEUE_CAPACITY);
        let (producer, consumer) = ring.split();

        let mut synth = SynthState {
            consumer,
            voices: Vec::with_capacity(32),
            adsr: AdsrConfig::default(),
            sample_rate: sample_rate as f32,
            num_channels,
        };

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                synth.render(data);
            },
            |err| warn!("audio stream error: {err}"),
            None,
        )?;
        stream.play()?;

        info!(sample_rate, num_channels, "audio output started");

        Ok((
            CpalOutput {
                _stream: stream,
                sample_rate,
            },
            CpalPlayer { producer },
        ))
    }

    /// Output-path delay of this stream, fed to the latency compensator.
    pub fn output_latency(&self) -> f64 {
        BUFFER_SAMPLES as f64 / self.sample_rate as f64
    }
}

impl NoteSink for CpalPlayer {
    fn note_on(&mut self, pitch: u8, velocity: u8) {
        if self
            .producer
            .try_push(PlayerCommand::NoteOn { pitch, velocity })
            .is_err()
        {
            warn!(pitch, "player queue full, dropping note-on");
        }
    }

    fn note_off(&mut self, pitch: u8) {
        if self
            .producer
            .try_push(PlayerCommand::NoteOff { pitch })
            .is_err()
        {
            warn!(pitch, "player queue full, dropping note-off");
        }
    }

    fn stop_all(&mut self) {
        if self.producer.try_push(PlayerCommand::StopAll).is_err() {
            warn!("player queue full, dropping stop-all");
        }
    }
}

/// Callback-side state: drains the command queue, then renders the active
/// voices into the interleaved output buffer.
struct SynthState {
    consumer: HeapCons<PlayerCommand>,
    voices: Vec<Voice>,
    adsr: AdsrConfig,
    sample_rate: f32,
    num_channels: usize,
}

impl SynthState {
    fn render(&mut self, data: &mut [f32]) {
        while let Some(command) = self.consumer.try_pop() {
            match command {
                PlayerCommand::NoteOn { pitch, velocity } => {
                    self.voices.push(Voice::new(pitch, velocity));
                }
                PlayerCommand::NoteOff { pitch } => {
                    for voice in self.voices.iter_mut().filter(|v| v.pitch == pitch) {
                        voice.release();
                    }
                }
                PlayerCommand::StopAll => {
                    for voice in &mut self.voices {
                        voice.release();
                    }
                }
            }
        }

        data.fill(0.0);
        for frame in data.chunks_mut(self.num_channels) {
            let mut sample = 0.0;
            for voice in &mut self.voices {
                sample += voice.next_sample(&self.adsr, self.sample_rate);
            }
            sample *= 0.2;
            for channel in frame.iter_mut() {
                *channel = sample;
            }
        }

        self.voices.retain(|v| !v.is_finished());
    }
}
