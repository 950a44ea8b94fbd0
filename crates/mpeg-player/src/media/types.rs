use std::path::PathBuf;

/// Stereo frames carried by one decoded audio chunk.
pub const SAMPLES_PER_AUDIO_FRAME: usize = 1152;

/// Interleaved channels in every decoded audio chunk.
pub const AUDIO_CHANNELS: u16 = 2;

/// Metadata derived from a source when it is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Video frames per second.
    pub frame_rate: f64,
    /// Audio samples per second (0 when the source has no audio).
    pub sample_rate: u32,
    pub width: u32,
    pub height: u32,
    pub audio_streams: usize,
}

/// A decoded video frame, interleaved RGB8.
pub struct VideoFrame {
    pub data: Vec<u8>, // RGB8
    pub width: u32,
    pub height: u32,
}

/// One decoded chunk of interleaved stereo `f32` samples.
pub struct AudioChunk {
    pub samples: Vec<f32>,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },
    #[error("{} has no video stream", path.display())]
    NoVideoStream { path: PathBuf },
    #[error("invalid frame rate {rate:?} in {}", path.display())]
    InvalidFrameRate { path: PathBuf, rate: String },
    #[error("ffmpeg/ffprobe not found on PATH")]
    FfmpegMissing,
    #[error("audio stream {index} out of range ({available} available)")]
    AudioStream { index: usize, available: usize },
    #[error("decoder process error: {0}")]
    Process(#[from] std::io::Error),
}
