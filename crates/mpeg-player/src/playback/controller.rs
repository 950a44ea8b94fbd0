use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::audio::{AudioBackend, AudioFormat, AudioSink};
use crate::media::types::AUDIO_CHANNELS;
use crate::media::{MediaBackend, MediaError, MediaSource, SourceInfo, VideoFrame};

use super::transport::{
    FrameBuffer, MAX_AUDIO_CHUNKS_PER_TICK, PlaybackState, PlaybackStatus, StreamTotals,
    SyncPolicy, TickOutcome, Transport,
};

/// Everything that exists only while a source is loaded. Dropping it
/// releases the source handle and the audio stream.
struct Loaded<S, A> {
    path: PathBuf,
    file_name: String,
    epoch: u64,
    source: S,
    stream: Option<A>,
    info: SourceInfo,
    totals: StreamTotals,
    frame_duration: Duration,
    transport: Transport,
    frame: FrameBuffer,
    needs_upload: bool,
}

impl<S: MediaSource, A: AudioSink> Loaded<S, A> {
    /// Decode one video frame and advance the frame counter.
    fn decode_next(&mut self, outcome: &mut TickOutcome) -> Option<VideoFrame> {
        let frame = self.source.decode_video();
        outcome.video_decodes += 1;
        self.transport.video_frame = (self.transport.video_frame + 1).min(self.totals.video_frames);
        frame
    }

    fn advance_video(&mut self, now: Instant, policy: &SyncPolicy, outcome: &mut TickOutcome) {
        if let Some(base) = self.transport.time_base {
            let elapsed = now.saturating_duration_since(base).as_secs_f64();
            self.transport.time_excess += elapsed - policy.reference_secs(self.frame_duration);
        }
        self.transport.time_base = Some(now);

        let mut latest = self.decode_next(outcome);

        // Behind schedule: one extra decode this tick, then start drift over
        if self.transport.time_excess >= policy.catch_up_threshold.as_secs_f64()
            && self.transport.video_frame < self.totals.video_frames
        {
            log::debug!(
                "Catch-up decode at frame {} (excess {:.3}s)",
                self.transport.video_frame,
                self.transport.time_excess
            );
            latest = self.decode_next(outcome);
            self.transport.time_excess = 0.0;
        }

        if let Some(frame) = latest {
            self.frame.fill_from(&frame);
            self.needs_upload = true;
        }
    }

    /// Feed the audio stream for as long as it reports a free buffer.
    fn drain_audio(&mut self, outcome: &mut TickOutcome) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let mut polled = 0;
        while polled < MAX_AUDIO_CHUNKS_PER_TICK && stream.is_processed() {
            polled += 1;
            let Some(chunk) = self.source.decode_audio() else {
                break;
            };
            self.transport.audio_frame =
                (self.transport.audio_frame + 1).min(self.totals.audio_frames);
            stream.push(&chunk.samples);
            outcome.audio_chunks += 1;
        }
    }

    /// Rewind and linearly re-decode up to the given targets.
    fn seek_to(&mut self, audio_target: u64, video_target: u64) -> Result<(), MediaError> {
        self.source.rewind()?;
        let paused = self.transport.paused;
        self.transport = Transport {
            paused,
            ..Transport::default()
        };

        let mut audio = 0;
        if self.info.audio_streams > 0 {
            while audio < audio_target && self.source.decode_audio().is_some() {
                audio += 1;
            }
        }
        let mut video = 0;
        while video < video_target && self.source.skip_video() {
            video += 1;
        }

        self.transport.audio_frame = audio;
        self.transport.video_frame = video;
        log::debug!("Seek: audio frame {audio}/{audio_target}, video frame {video}/{video_target}");
        Ok(())
    }
}

/// Target audio and video frame for a transport-bar fraction. The video
/// target follows the audio target proportionally to keep both aligned.
pub fn seek_targets(fraction: f64, totals: StreamTotals) -> (u64, u64) {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let audio = ((fraction * totals.audio_frames as f64).round() as u64).min(totals.audio_frames);
    let video = if totals.audio_frames > 0 {
        (u128::from(audio) * u128::from(totals.video_frames) / u128::from(totals.audio_frames))
            as u64
    } else {
        (fraction * totals.video_frames as f64).round() as u64
    };
    (audio, video.min(totals.video_frames))
}

/// Nominal frame duration, rejecting rates no `Duration` can represent.
fn frame_duration_for(path: &Path, frame_rate: f64) -> Result<Duration, MediaError> {
    let invalid = || MediaError::InvalidFrameRate {
        path: path.to_path_buf(),
        rate: frame_rate.to_string(),
    };
    if !(frame_rate.is_finite() && frame_rate > 0.0) {
        return Err(invalid());
    }
    match Duration::try_from_secs_f64(1.0 / frame_rate) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(invalid()),
    }
}

/// Owns all transport state and drives decode and presentation calls once
/// per display refresh.
pub struct PlaybackController<M: MediaBackend, A: AudioBackend> {
    media: M,
    audio: A,
    policy: SyncPolicy,
    loaded: Option<Loaded<M::Source, A::Stream>>,
    next_epoch: u64,
}

impl<M: MediaBackend, A: AudioBackend> PlaybackController<M, A> {
    pub fn new(media: M, audio: A, policy: SyncPolicy) -> Self {
        Self {
            media,
            audio,
            policy,
            loaded: None,
            next_epoch: 1,
        }
    }

    pub fn state(&self) -> PlaybackState {
        match &self.loaded {
            None => PlaybackState::Empty,
            Some(l) if l.transport.paused => PlaybackState::Paused,
            Some(_) => PlaybackState::Playing,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        match &self.loaded {
            None => PlaybackStatus {
                state: PlaybackState::Empty,
                file_name: None,
                video_frame: 0,
                audio_frame: 0,
                totals: StreamTotals::default(),
            },
            Some(l) => PlaybackStatus {
                state: self.state(),
                file_name: Some(l.file_name.clone()),
                video_frame: l.transport.video_frame,
                audio_frame: l.transport.audio_frame,
                totals: l.totals,
            },
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> Option<&Transport> {
        self.loaded.as_ref().map(|l| &l.transport)
    }

    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.loaded.as_ref().map(|l| &l.info)
    }

    pub fn path(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|l| l.path.as_path())
    }

    #[cfg(test)]
    pub fn frame_duration(&self) -> Option<Duration> {
        self.loaded.as_ref().map(|l| l.frame_duration)
    }

    /// Identifies the current load; changes on every successful `load`.
    pub fn loaded_epoch(&self) -> Option<u64> {
        self.loaded.as_ref().map(|l| l.epoch)
    }

    /// The frame buffer, if a new frame was decoded since the last call.
    pub fn take_frame(&mut self) -> Option<&FrameBuffer> {
        let loaded = self.loaded.as_mut()?;
        if !loaded.needs_upload {
            return None;
        }
        loaded.needs_upload = false;
        Some(&loaded.frame)
    }

    /// Tear down any current source, pre-scan `path` for frame totals, then
    /// open it fresh for playback. Blocks for the length of the scan.
    pub fn load(&mut self, path: &Path) -> Result<(), MediaError> {
        if self.loaded.is_some() {
            self.teardown("replaced");
        }

        match self.open_loaded(path) {
            Ok(loaded) => {
                log::info!(
                    "[{}] Loaded successfully. Framerate: {:.3} - Samplerate: {} - {}x{}",
                    path.display(),
                    loaded.info.frame_rate,
                    loaded.info.sample_rate,
                    loaded.info.width,
                    loaded.info.height
                );
                log::info!(
                    "Video total frames: {}, audio total frames: {}",
                    loaded.totals.video_frames,
                    loaded.totals.audio_frames
                );
                self.loaded = Some(loaded);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                Err(e)
            }
        }
    }

    fn open_loaded(&mut self, path: &Path) -> Result<Loaded<M::Source, A::Stream>, MediaError> {
        let mut source = self.media.open(path)?;
        let info = source.info().clone();
        let frame_duration = frame_duration_for(path, info.frame_rate)?;

        // The output may run at another rate than the source; decode, count
        // and play audio at the rate the stream reports
        let stream = if info.audio_streams > 0 {
            self.open_audio(&info)
        } else {
            None
        };
        let audio_rate = stream.as_ref().map_or(info.sample_rate, |s| s.sample_rate());

        let totals = self.prescan(path, audio_rate)?;
        if info.audio_streams > 0 {
            source.enable_audio(0, audio_rate)?;
        }

        let epoch = self.next_epoch;
        self.next_epoch += 1;

        Ok(Loaded {
            path: path.to_path_buf(),
            file_name: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string(),
            epoch,
            source,
            stream,
            frame: FrameBuffer::new(info.width, info.height),
            info,
            totals,
            frame_duration,
            transport: Transport::default(),
            needs_upload: false,
        })
    }

    /// Count every video and audio frame by decoding the whole file once,
    /// on a handle of its own.
    fn prescan(&mut self, path: &Path, audio_rate: u32) -> Result<StreamTotals, MediaError> {
        let mut scan = self.media.open(path)?;
        let mut totals = StreamTotals::default();
        while scan.skip_video() {
            totals.video_frames += 1;
        }
        if scan.info().audio_streams > 0 {
            scan.enable_audio(0, audio_rate)?;
            while scan.decode_audio().is_some() {
                totals.audio_frames += 1;
            }
        }
        Ok(totals)
    }

    fn open_audio(&mut self, info: &SourceInfo) -> Option<A::Stream> {
        let format = AudioFormat {
            sample_rate: info.sample_rate,
            bits_per_sample: 32,
            channels: AUDIO_CHANNELS,
        };
        let opened = self.audio.open_stream(format).and_then(|mut stream| {
            stream.play()?;
            Ok(stream)
        });
        match opened {
            Ok(stream) => Some(stream),
            Err(e) => {
                log::warn!("Audio unavailable, playing video only: {e}");
                None
            }
        }
    }

    /// Advance playback against the wall clock. No-op when Empty or Paused.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let policy = self.policy;
        let Some(loaded) = self.loaded.as_mut() else {
            return outcome;
        };
        if loaded.transport.paused {
            return outcome;
        }

        let due = match loaded.transport.time_base {
            None => true,
            Some(base) => now.saturating_duration_since(base) >= loaded.frame_duration,
        };
        if due {
            loaded.advance_video(now, &policy, &mut outcome);
        }

        loaded.drain_audio(&mut outcome);

        if loaded.transport.video_frame >= loaded.totals.video_frames {
            outcome.end_of_stream = true;
            self.teardown("end of stream");
        }
        outcome
    }

    /// Jump to `fraction` of the transport bar by rewinding and re-decoding.
    pub fn seek(&mut self, fraction: f32) -> Result<(), MediaError> {
        let Some(loaded) = self.loaded.as_mut() else {
            return Ok(());
        };
        let (audio_target, video_target) = seek_targets(f64::from(fraction), loaded.totals);
        let result = loaded.seek_to(audio_target, video_target);
        if let Err(e) = &result {
            log::error!("Seek failed: {e}");
            self.teardown("seek failed");
        }
        result
    }

    pub fn toggle_pause(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.transport.paused = !loaded.transport.paused;
            log::info!("{}", if loaded.transport.paused { "Paused" } else { "Resumed" });
        }
    }

    /// Return to Empty from any state.
    pub fn reset(&mut self) {
        self.teardown("reset");
    }

    fn teardown(&mut self, reason: &str) {
        if let Some(loaded) = self.loaded.take() {
            log::info!("Closed {} ({reason})", loaded.file_name);
        }
    }
}
