pub mod ffmpeg;
pub mod types;

use std::path::Path;

pub use ffmpeg::FfmpegBackend;
pub use types::{AudioChunk, MediaError, SourceInfo, VideoFrame};

/// Opens media sources. One backend instance lives for the whole session.
pub trait MediaBackend {
    type Source: MediaSource;

    fn open(&mut self, path: &Path) -> Result<Self::Source, MediaError>;
}

/// An opened media file with independent video and audio decode cursors.
///
/// Decode calls return `None`/`false` at end-of-stream; that is a normal
/// outcome, not an error. Dropping the source releases it.
pub trait MediaSource {
    fn info(&self) -> &SourceInfo;

    /// Enable decoding of the given audio stream, resampled to `sample_rate`
    /// (0 keeps the source rate). Audio decode calls return `None` until
    /// this succeeds.
    fn enable_audio(&mut self, stream: usize, sample_rate: u32) -> Result<(), MediaError>;

    fn decode_video(&mut self) -> Option<VideoFrame>;

    /// Advance the video cursor by one frame without producing pixels.
    fn skip_video(&mut self) -> bool;

    fn decode_audio(&mut self) -> Option<AudioChunk>;

    /// Move both cursors back to the start of the source.
    fn rewind(&mut self) -> Result<(), MediaError>;
}
