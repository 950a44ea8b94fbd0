//! Streaming decode through ffmpeg subprocesses.
//!
//! - `ffprobe` probes metadata (dimensions, fps, sample rate) synchronously at open
//! - `ffmpeg -f rawvideo -pix_fmt rgb24` streams video, one `w*h*3` read per frame
//! - `ffmpeg -f f32le -ac 2` streams audio, one 1152-frame chunk per read
//! - Children are spawned lazily and killed on rewind/drop; the next read respawns

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::OnceLock;

use serde::Deserialize;

use super::types::{
    AUDIO_CHANNELS, AudioChunk, MediaError, SAMPLES_PER_AUDIO_FRAME, SourceInfo, VideoFrame,
};
use super::{MediaBackend, MediaSource};

/// Bytes in one decoded audio chunk (interleaved stereo f32le).
const AUDIO_CHUNK_BYTES: usize = SAMPLES_PER_AUDIO_FRAME * AUDIO_CHANNELS as usize * 4;

/// Check if ffmpeg/ffprobe are available on the system. Cached per process.
pub fn ffmpeg_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        ["ffprobe", "ffmpeg"].iter().all(|tool| {
            Command::new(tool)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        })
    })
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
}

/// Run ffprobe on `path` and derive the source metadata.
pub fn probe(path: &Path) -> Result<SourceInfo, MediaError> {
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()?;

    if !output.status.success() {
        return Err(MediaError::Open {
            path: path.to_path_buf(),
            reason: "ffprobe returned non-zero exit code".into(),
        });
    }

    parse_probe(path, &output.stdout)
}

fn parse_probe(path: &Path, json: &[u8]) -> Result<SourceInfo, MediaError> {
    let probe: ProbeOutput = serde_json::from_slice(json).map_err(|e| MediaError::Open {
        path: path.to_path_buf(),
        reason: format!("unreadable ffprobe output: {e}"),
    })?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::NoVideoStream {
            path: path.to_path_buf(),
        })?;

    let (Some(width), Some(height)) = (video.width, video.height) else {
        return Err(MediaError::Open {
            path: path.to_path_buf(),
            reason: "video stream has no dimensions".into(),
        });
    };

    let rate_text = video.r_frame_rate.clone().unwrap_or_default();
    let frame_rate = parse_frame_rate(&rate_text).ok_or_else(|| MediaError::InvalidFrameRate {
        path: path.to_path_buf(),
        rate: rate_text.clone(),
    })?;

    let audio: Vec<&ProbeStream> = probe
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("audio"))
        .collect();
    let sample_rate = audio
        .first()
        .and_then(|s| s.sample_rate.as_deref())
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    Ok(SourceInfo {
        frame_rate,
        sample_rate,
        width,
        height,
        // A stream we cannot resample has nothing to play
        audio_streams: if sample_rate > 0 { audio.len() } else { 0 },
    })
}

/// Parse `"num/den"` or a plain decimal. Rejects zero, negative and non-finite rates.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = if let Some((num, den)) = rate.split_once('/') {
        let n: f64 = num.trim().parse().ok()?;
        let d: f64 = den.trim().parse().ok()?;
        if d == 0.0 {
            return None;
        }
        n / d
    } else {
        rate.trim().parse().ok()?
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Read until `buf` is full or the stream ends. Returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Convert a (possibly short) f32le read into one full chunk, zero-padding the tail.
fn chunk_from_le_bytes(bytes: &[u8], valid: usize) -> Vec<f32> {
    let mut samples = vec![0.0f32; AUDIO_CHUNK_BYTES / 4];
    for (dst, src) in samples.iter_mut().zip(bytes[..valid].chunks_exact(4)) {
        *dst = f32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    }
    samples
}

/// A running ffmpeg child with its stdout pipe. Killed and reaped on drop.
struct Pipe {
    child: Child,
    stdout: ChildStdout,
}

impl Pipe {
    fn spawn(command: &mut Command) -> Result<Self, MediaError> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("ffmpeg: no stdout pipe"))?;
        Ok(Self { child, stdout })
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Opens sources by probing them with ffprobe.
/// Output options for an audio decoder: stream `stream` as interleaved
/// stereo `f32le`, resampled to `sample_rate`.
fn audio_output_args(stream: usize, sample_rate: u32) -> Vec<String> {
    vec![
        "-vn".into(),
        "-map".into(),
        format!("0:a:{stream}"),
        "-f".into(),
        "f32le".into(),
        "-ac".into(),
        AUDIO_CHANNELS.to_string(),
        "-ar".into(),
        sample_rate.to_string(),
        "pipe:1".into(),
    ]
}

pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        if ffmpeg_available() {
            log::info!("ffmpeg decoder available");
        } else {
            log::warn!("ffmpeg/ffprobe not found on PATH; files will fail to open");
        }
        Self
    }
}

impl MediaBackend for FfmpegBackend {
    type Source = FfmpegSource;

    fn open(&mut self, path: &Path) -> Result<FfmpegSource, MediaError> {
        if !ffmpeg_available() {
            return Err(MediaError::FfmpegMissing);
        }
        let info = probe(path)?;
        Ok(FfmpegSource::new(path.to_path_buf(), info))
    }
}

pub struct FfmpegSource {
    path: PathBuf,
    info: SourceInfo,
    audio_stream: Option<usize>,
    audio_rate: u32,
    video: Option<Pipe>,
    audio: Option<Pipe>,
    video_eof: bool,
    audio_eof: bool,
    scratch: Vec<u8>,
}

impl FfmpegSource {
    fn new(path: PathBuf, info: SourceInfo) -> Self {
        Self {
            path,
            info,
            audio_stream: None,
            audio_rate: 0,
            video: None,
            audio: None,
            video_eof: false,
            audio_eof: false,
            scratch: Vec::new(),
        }
    }

    fn frame_size(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 3
    }

    fn video_pipe(&mut self) -> Option<&mut Pipe> {
        if self.video.is_none() {
            let mut cmd = Command::new("ffmpeg");
            cmd.args(["-v", "quiet", "-i"])
                .arg(&self.path)
                .args([
                    "-an",
                    "-fps_mode", "passthrough",
                    "-f", "rawvideo",
                    "-pix_fmt", "rgb24",
                    "pipe:1",
                ]);
            match Pipe::spawn(&mut cmd) {
                Ok(pipe) => self.video = Some(pipe),
                Err(e) => {
                    log::error!("Failed to spawn ffmpeg video decoder: {e}");
                    self.video_eof = true;
                    return None;
                }
            }
        }
        self.video.as_mut()
    }

    fn audio_pipe(&mut self, stream: usize) -> Option<&mut Pipe> {
        if self.audio.is_none() {
            let mut cmd = Command::new("ffmpeg");
            cmd.args(["-v", "quiet", "-i"])
                .arg(&self.path)
                .args(audio_output_args(stream, self.audio_rate));
            match Pipe::spawn(&mut cmd) {
                Ok(pipe) => self.audio = Some(pipe),
                Err(e) => {
                    log::error!("Failed to spawn ffmpeg audio decoder: {e}");
                    self.audio_eof = true;
                    return None;
                }
            }
        }
        self.audio.as_mut()
    }

    /// Read one video frame into `scratch`. False at end-of-stream.
    fn read_video_frame(&mut self) -> bool {
        if self.video_eof {
            return false;
        }
        let size = self.frame_size();
        self.scratch.resize(size, 0);
        let mut scratch = std::mem::take(&mut self.scratch);
        let read = match self.video_pipe() {
            Some(pipe) => read_full(&mut pipe.stdout, &mut scratch),
            None => Ok(0),
        };
        self.scratch = scratch;
        match read {
            Ok(n) if n == size => true,
            Ok(_) => {
                self.video_eof = true;
                false
            }
            Err(e) => {
                log::warn!("Video pipe read failed: {e}");
                self.video_eof = true;
                false
            }
        }
    }
}

impl MediaSource for FfmpegSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn enable_audio(&mut self, stream: usize, sample_rate: u32) -> Result<(), MediaError> {
        if stream >= self.info.audio_streams {
            return Err(MediaError::AudioStream {
                index: stream,
                available: self.info.audio_streams,
            });
        }
        let rate = if sample_rate > 0 {
            sample_rate
        } else {
            self.info.sample_rate
        };
        if self.audio_stream != Some(stream) || self.audio_rate != rate {
            self.audio = None;
            self.audio_eof = false;
        }
        self.audio_stream = Some(stream);
        self.audio_rate = rate;
        Ok(())
    }

    fn decode_video(&mut self) -> Option<VideoFrame> {
        if !self.read_video_frame() {
            return None;
        }
        Some(VideoFrame {
            data: self.scratch.clone(),
            width: self.info.width,
            height: self.info.height,
        })
    }

    fn skip_video(&mut self) -> bool {
        self.read_video_frame()
    }

    fn decode_audio(&mut self) -> Option<AudioChunk> {
        let stream = self.audio_stream?;
        if self.audio_eof {
            return None;
        }
        let mut bytes = vec![0u8; AUDIO_CHUNK_BYTES];
        let read = read_full(&mut self.audio_pipe(stream)?.stdout, &mut bytes);
        match read {
            Ok(0) => {
                self.audio_eof = true;
                None
            }
            Ok(n) => {
                if n < AUDIO_CHUNK_BYTES {
                    self.audio_eof = true;
                }
                Some(AudioChunk {
                    samples: chunk_from_le_bytes(&bytes, n - n % 4),
                })
            }
            Err(e) => {
                log::warn!("Audio pipe read failed: {e}");
                self.audio_eof = true;
                None
            }
        }
    }

    fn rewind(&mut self) -> Result<(), MediaError> {
        // Dropping the pipes kills the children; the next read respawns from the start
        self.video = None;
        self.audio = None;
        self.video_eof = false;
        self.audio_eof = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "mpeg1video",
             "width": 640, "height": 360, "r_frame_rate": "24/1"},
            {"index": 1, "codec_type": "audio", "codec_name": "mp2",
             "sample_rate": "44100", "channels": 2}
        ]
    }"#;

    #[test]
    fn parse_frame_rate_fraction() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn parse_frame_rate_decimal() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate(" 23.976 "), Some(23.976));
    }

    #[test]
    fn parse_frame_rate_rejects_degenerate() {
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0/1"), None);
        assert_eq!(parse_frame_rate("-25"), None);
        assert_eq!(parse_frame_rate("abc"), None);
        assert_eq!(parse_frame_rate(""), None);
    }

    #[test]
    fn parse_probe_video_and_audio() {
        let info = parse_probe(Path::new("a.mpg"), PROBE_JSON.as_bytes()).unwrap();
        assert_eq!(
            info,
            SourceInfo {
                frame_rate: 24.0,
                sample_rate: 44100,
                width: 640,
                height: 360,
                audio_streams: 1,
            }
        );
    }

    #[test]
    fn parse_probe_video_only() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 320,
            "height": 240, "r_frame_rate": "25/1"}]}"#;
        let info = parse_probe(Path::new("silent.mpg"), json.as_bytes()).unwrap();
        assert_eq!(info.audio_streams, 0);
        assert_eq!(info.sample_rate, 0);
    }

    #[test]
    fn parse_probe_without_video_fails() {
        let json = r#"{"streams": [{"codec_type": "audio", "sample_rate": "32000"}]}"#;
        let err = parse_probe(Path::new("music.mpg"), json.as_bytes()).unwrap_err();
        assert!(matches!(err, MediaError::NoVideoStream { .. }));
    }

    #[test]
    fn parse_probe_bad_rate_fails() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 2,
            "height": 2, "r_frame_rate": "0/0"}]}"#;
        let err = parse_probe(Path::new("x.mpg"), json.as_bytes()).unwrap_err();
        assert!(matches!(err, MediaError::InvalidFrameRate { .. }));
    }

    #[test]
    fn parse_probe_garbage_fails() {
        let err = parse_probe(Path::new("x.mpg"), b"not json").unwrap_err();
        assert!(matches!(err, MediaError::Open { .. }));
    }

    #[test]
    fn read_full_stops_at_eof() {
        let mut reader = Cursor::new(vec![1u8; 10]);
        let mut buf = [0u8; 16];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 10);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn read_full_fills_exact_frames() {
        let mut reader = Cursor::new(vec![7u8; 12]);
        let mut buf = [0u8; 6];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 6);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 6);
        assert_eq!(buf, [7u8; 6]);
    }

    #[test]
    fn partial_audio_chunk_is_zero_padded() {
        let mut bytes = vec![0u8; AUDIO_CHUNK_BYTES];
        bytes[..4].copy_from_slice(&0.5f32.to_le_bytes());
        bytes[4..8].copy_from_slice(&(-0.25f32).to_le_bytes());
        bytes[8..12].copy_from_slice(&1.0f32.to_le_bytes());
        let samples = chunk_from_le_bytes(&bytes, 8);
        assert_eq!(samples.len(), SAMPLES_PER_AUDIO_FRAME * 2);
        assert_eq!(samples[0], 0.5);
        assert_eq!(samples[1], -0.25);
        // Past the valid prefix everything is silence
        assert_eq!(samples[2], 0.0);
        assert!(samples[3..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn enable_audio_rejects_missing_stream() {
        let info = parse_probe(Path::new("a.mpg"), PROBE_JSON.as_bytes()).unwrap();
        let mut source = FfmpegSource::new(PathBuf::from("a.mpg"), info);
        assert!(source.enable_audio(0, 44100).is_ok());
        assert!(matches!(
            source.enable_audio(1, 44100),
            Err(MediaError::AudioStream { index: 1, available: 1 })
        ));
    }

    #[test]
    fn audio_disabled_decodes_nothing() {
        let info = parse_probe(Path::new("a.mpg"), PROBE_JSON.as_bytes()).unwrap();
        let mut source = FfmpegSource::new(PathBuf::from("a.mpg"), info);
        assert!(source.decode_audio().is_none());
    }

    #[test]
    fn audio_decoder_resamples_to_output_rate() {
        let args = audio_output_args(1, 48000);
        let ar = args.iter().position(|a| a == "-ar").unwrap();
        assert_eq!(args[ar + 1], "48000");
        assert!(args.contains(&"0:a:1".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn enable_audio_tracks_output_rate() {
        let info = parse_probe(Path::new("a.mpg"), PROBE_JSON.as_bytes()).unwrap();
        let mut source = FfmpegSource::new(PathBuf::from("a.mpg"), info);
        source.enable_audio(0, 48000).unwrap();
        assert_eq!(source.audio_rate, 48000);
        // 0 means "no preference": decode at the source's own rate
        source.enable_audio(0, 0).unwrap();
        assert_eq!(source.audio_rate, 44100);
    }
}
