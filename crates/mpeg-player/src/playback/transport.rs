use std::time::{Duration, Instant};

use crate::media::VideoFrame;

/// Catch-up threshold and the fixed drift reference, ~one audio frame.
pub const SYNC_SLACK: Duration = Duration::from_millis(40);

/// Audio chunks drained from the decoder in a single tick, at most.
pub const MAX_AUDIO_CHUNKS_PER_TICK: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Empty,
    Playing,
    Paused,
}

/// What `time_excess` is measured against on every video advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftReference {
    /// Drift against the source's nominal frame duration.
    NominalFrame,
    /// Drift against a constant duration regardless of frame rate.
    Fixed(Duration),
}

/// Frame pacing policy. Approximate by nature: when the accumulated drift
/// passes the threshold, one extra frame is decoded in the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    pub reference: DriftReference,
    pub catch_up_threshold: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            reference: DriftReference::NominalFrame,
            catch_up_threshold: SYNC_SLACK,
        }
    }
}

impl SyncPolicy {
    /// The constant-slack variant: drift measured against 40 ms.
    pub fn fixed_slack() -> Self {
        Self {
            reference: DriftReference::Fixed(SYNC_SLACK),
            catch_up_threshold: SYNC_SLACK,
        }
    }

    pub fn reference_secs(&self, frame_duration: Duration) -> f64 {
        match self.reference {
            DriftReference::NominalFrame => frame_duration.as_secs_f64(),
            DriftReference::Fixed(d) => d.as_secs_f64(),
        }
    }
}

/// Per-source transport state. Reset wholesale on load, seek and teardown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transport {
    /// When the last video advance happened; `None` until the first one.
    pub time_base: Option<Instant>,
    /// Accumulated drift in seconds (signed).
    pub time_excess: f64,
    pub paused: bool,
    pub video_frame: u64,
    pub audio_frame: u64,
}

/// Frame totals counted by the pre-scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamTotals {
    pub video_frames: u64,
    pub audio_frames: u64,
}

/// The controller's decoded-frame buffer: interleaved RGB8, `width*height*3` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 3],
        }
    }

    /// Overwrite in place with a decoded frame. Frames of another size are
    /// cropped or zero-filled to the buffer's dimensions.
    pub fn fill_from(&mut self, frame: &VideoFrame) {
        if frame.width == self.width
            && frame.height == self.height
            && frame.data.len() >= self.data.len()
        {
            let len = self.data.len();
            self.data.copy_from_slice(&frame.data[..len]);
            return;
        }
        let row = self.width as usize * 3;
        let src_row = frame.width as usize * 3;
        let copy = row.min(src_row);
        for (y, dst) in self.data.chunks_exact_mut(row).enumerate() {
            let start = y * src_row;
            if y < frame.height as usize && start + copy <= frame.data.len() {
                dst[..copy].copy_from_slice(&frame.data[start..start + copy]);
                dst[copy..].fill(0);
            } else {
                dst.fill(0);
            }
        }
    }

    /// Expand to RGBA8 (opaque) for texture upload.
    pub fn to_rgba(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.data.len() / 3 * 4);
        for px in self.data.chunks_exact(3) {
            out.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
    }
}

/// Read-only view of the controller for the HUD.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub file_name: Option<String>,
    pub video_frame: u64,
    pub audio_frame: u64,
    pub totals: StreamTotals,
}

impl PlaybackStatus {
    /// Playback position in `[0, 1]` by video frames.
    pub fn progress(&self) -> f32 {
        if self.totals.video_frames == 0 {
            return 0.0;
        }
        (self.video_frame as f64 / self.totals.video_frames as f64).clamp(0.0, 1.0) as f32
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub video_decodes: u32,
    pub audio_chunks: u32,
    pub end_of_stream: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_uses_nominal_frame() {
        let p = SyncPolicy::default();
        assert_eq!(p.reference, DriftReference::NominalFrame);
        assert_eq!(p.catch_up_threshold, Duration::from_millis(40));
        let frame = Duration::from_secs_f64(1.0 / 24.0);
        assert_eq!(p.reference_secs(frame), frame.as_secs_f64());
    }

    #[test]
    fn fixed_slack_ignores_frame_rate() {
        let p = SyncPolicy::fixed_slack();
        assert_eq!(p.reference_secs(Duration::from_millis(16)), 0.040);
    }

    #[test]
    fn transport_defaults_zeroed() {
        let t = Transport::default();
        assert!(t.time_base.is_none());
        assert_eq!(t.time_excess, 0.0);
        assert!(!t.paused);
        assert_eq!(t.video_frame, 0);
        assert_eq!(t.audio_frame, 0);
    }

    #[test]
    fn frame_buffer_sized_rgb() {
        let fb = FrameBuffer::new(4, 2);
        assert_eq!(fb.data.len(), 24);
    }

    #[test]
    fn frame_buffer_fill_same_size() {
        let mut fb = FrameBuffer::new(2, 1);
        let frame = VideoFrame {
            data: vec![1, 2, 3, 4, 5, 6],
            width: 2,
            height: 1,
        };
        fb.fill_from(&frame);
        assert_eq!(fb.data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn frame_buffer_fill_smaller_frame_zero_pads() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.data.fill(9);
        let frame = VideoFrame {
            data: vec![1, 2, 3],
            width: 1,
            height: 1,
        };
        fb.fill_from(&frame);
        assert_eq!(fb.data, vec![1, 2, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn rgba_expansion_is_opaque() {
        let mut fb = FrameBuffer::new(2, 1);
        fb.data = vec![10, 20, 30, 40, 50, 60];
        let mut out = Vec::new();
        fb.to_rgba(&mut out);
        assert_eq!(out, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn progress_clamped() {
        let status = PlaybackStatus {
            state: PlaybackState::Playing,
            file_name: None,
            video_frame: 30,
            audio_frame: 0,
            totals: StreamTotals {
                video_frames: 120,
                audio_frames: 0,
            },
        };
        assert!((status.progress() - 0.25).abs() < 1e-6);

        let empty = PlaybackStatus {
            totals: StreamTotals::default(),
            ..status
        };
        assert_eq!(empty.progress(), 0.0);
    }
}
