pub mod output;

pub use output::CpalAudio;

/// Format of the decoded audio handed to an output stream. The device may
/// run at a different rate; see [`AudioSink::sample_rate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoDevice,
    #[error("unsupported output format: {0}")]
    Format(String),
    #[error("no usable output configuration: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// Opens output streams on the audio device.
pub trait AudioBackend {
    type Stream: AudioSink;

    fn open_stream(&mut self, format: AudioFormat) -> Result<Self::Stream, AudioError>;
}

/// A playing output stream. Dropping it closes the stream.
pub trait AudioSink {
    fn play(&mut self) -> Result<(), AudioError>;

    /// Rate the output actually runs at. Pushed samples must be at this rate.
    fn sample_rate(&self) -> u32;

    /// True when the stream can take another chunk without growing its queue.
    fn is_processed(&self) -> bool;

    /// Queue interleaved samples for playback.
    fn push(&mut self, samples: &[f32]);
}
