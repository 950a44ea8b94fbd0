use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};

use super::{AudioBackend, AudioError, AudioFormat, AudioSink};
use crate::media::types::{AUDIO_CHANNELS, SAMPLES_PER_AUDIO_FRAME};

/// Ring buffer size (power of 2 for fast modular arithmetic).
const RING_SIZE: usize = 32768;
const RING_MASK: u32 = (RING_SIZE - 1) as u32;

/// Lock-free single-producer single-consumer ring buffer of `f32` samples.
/// The frame loop pushes, the cpal callback reads.
pub struct RingBuffer {
    data: Box<[AtomicU32]>,
    write_pos: AtomicU32,
    read_pos: AtomicU32,
}

impl RingBuffer {
    pub fn new() -> Self {
        Self {
            data: (0..RING_SIZE).map(|_| AtomicU32::new(0)).collect(),
            write_pos: AtomicU32::new(0),
            read_pos: AtomicU32::new(0),
        }
    }

    /// Push as many samples as fit. Returns the number written.
    pub fn push(&self, samples: &[f32]) -> usize {
        let wp = self.write_pos.load(Ordering::Relaxed);
        let rp = self.read_pos.load(Ordering::Acquire);
        let free = RING_SIZE - wp.wrapping_sub(rp) as usize;
        let to_write = free.min(samples.len());

        for (i, &sample) in samples[..to_write].iter().enumerate() {
            let idx = (wp.wrapping_add(i as u32) & RING_MASK) as usize;
            self.data[idx].store(sample.to_bits(), Ordering::Relaxed);
        }

        self.write_pos
            .store(wp.wrapping_add(to_write as u32), Ordering::Release);
        to_write
    }

    /// Read available samples into dst. Returns number of samples read.
    pub fn read(&self, dst: &mut [f32]) -> usize {
        let wp = self.write_pos.load(Ordering::Acquire);
        let rp = self.read_pos.load(Ordering::Relaxed);
        let available = wp.wrapping_sub(rp) as usize;
        let to_read = available.min(dst.len());

        for (i, out) in dst[..to_read].iter_mut().enumerate() {
            let idx = (rp.wrapping_add(i as u32) & RING_MASK) as usize;
            *out = f32::from_bits(self.data[idx].load(Ordering::Relaxed));
        }

        self.read_pos
            .store(rp.wrapping_add(to_read as u32), Ordering::Release);
        to_read
    }

    /// Number of samples available to read.
    pub fn available(&self) -> usize {
        let wp = self.write_pos.load(Ordering::Acquire);
        let rp = self.read_pos.load(Ordering::Acquire);
        wp.wrapping_sub(rp) as usize
    }
}

/// Producer side of an output stream: a bounded queue of whole chunks.
pub struct SampleQueue {
    ring: Arc<RingBuffer>,
    chunk_len: usize,
    depth: usize,
}

impl SampleQueue {
    pub fn new(ring: Arc<RingBuffer>, chunk_len: usize, depth: usize) -> Self {
        let max_depth = (RING_SIZE / chunk_len.max(1)).max(2);
        Self {
            ring,
            chunk_len,
            depth: depth.clamp(2, max_depth),
        }
    }

    /// A chunk slot is free: at most `depth - 1` chunks are still queued.
    pub fn has_room(&self) -> bool {
        self.ring.available() + self.chunk_len <= self.depth * self.chunk_len
    }

    pub fn push(&self, samples: &[f32]) {
        let written = self.ring.push(samples);
        if written < samples.len() {
            log::warn!("Audio queue full, dropped {} samples", samples.len() - written);
        }
    }
}

/// Copy interleaved stereo `src` into a device buffer with `channels`
/// channels per frame. Mono devices get the average, channels past the
/// second stay silent, and frames past the end of `src` are silence.
fn write_frames<T>(out: &mut [T], channels: usize, src: &[f32])
where
    T: Sample + FromSample<f32>,
{
    for (i, frame) in out.chunks_mut(channels.max(1)).enumerate() {
        let (l, r) = match src.get(i * 2..i * 2 + 2) {
            Some(&[l, r]) => (l, r),
            _ => (0.0, 0.0),
        };
        if let [mono] = frame {
            *mono = T::from_sample((l + r) * 0.5);
            continue;
        }
        frame[0] = T::from_sample(l);
        frame[1] = T::from_sample(r);
        for s in &mut frame[2..] {
            *s = T::EQUILIBRIUM;
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    ring: Arc<RingBuffer>,
) -> Result<Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len() / channels.max(1) * 2, 0.0);
            let read = ring.read(&mut scratch);
            // Underrun: whatever was not queued plays as silence
            write_frames(data, channels, &scratch[..read]);
        },
        |err| {
            log::error!("Audio output stream error: {err}");
        },
        None,
    )?;
    Ok(stream)
}

/// Opens cpal output streams on the default device, in whatever rate,
/// channel count and sample format the device prefers.
pub struct CpalAudio {
    queue_chunks: usize,
}

impl CpalAudio {
    pub fn new(queue_chunks: usize) -> Self {
        Self { queue_chunks }
    }
}

impl AudioBackend for CpalAudio {
    type Stream = CpalStream;

    fn open_stream(&mut self, format: AudioFormat) -> Result<CpalStream, AudioError> {
        if format.bits_per_sample != 32 || format.channels != AUDIO_CHANNELS {
            return Err(AudioError::Format(format!("{format:?}")));
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let device_name = device
            .description()
            .map(|d| d.name().to_string())
            .unwrap_or_else(|_| "Unknown".into());

        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        if config.channels == 0 {
            return Err(AudioError::Format("device reports 0 channels".into()));
        }

        let ring = Arc::new(RingBuffer::new());
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, ring.clone())?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, ring.clone())?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, ring.clone())?,
            other => {
                return Err(AudioError::Format(format!("device sample format {other:?}")));
            }
        };

        log::info!(
            "Audio output: {device_name}, {}Hz, {}ch, {sample_format:?}",
            config.sample_rate,
            config.channels
        );
        if config.sample_rate != format.sample_rate {
            log::info!(
                "Source audio {}Hz will be resampled to {}Hz",
                format.sample_rate,
                config.sample_rate
            );
        }

        let chunk_len = SAMPLES_PER_AUDIO_FRAME * format.channels as usize;
        Ok(CpalStream {
            stream,
            queue: SampleQueue::new(ring, chunk_len, self.queue_chunks),
            sample_rate: config.sample_rate,
        })
    }
}

pub struct CpalStream {
    stream: Stream,
    queue: SampleQueue,
    sample_rate: u32,
}

impl AudioSink for CpalStream {
    fn play(&mut self) -> Result<(), AudioError> {
        self.stream.play()?;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_processed(&self) -> bool {
        self.queue.has_room()
    }

    fn push(&mut self, samples: &[f32]) {
        self.queue.push(samples);
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        let _ = self.stream.pause();
        log::debug!("Audio output stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_push_then_read() {
        let ring = RingBuffer::new();
        assert_eq!(ring.push(&[0.1, 0.2, 0.3]), 3);
        assert_eq!(ring.available(), 3);
        let mut out = [0.0f32; 8];
        assert_eq!(ring.read(&mut out), 3);
        assert_eq!(&out[..3], &[0.1, 0.2, 0.3]);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn ring_refuses_overflow() {
        let ring = RingBuffer::new();
        let big = vec![1.0f32; RING_SIZE + 10];
        assert_eq!(ring.push(&big), RING_SIZE);
        assert_eq!(ring.push(&[2.0]), 0);
        assert_eq!(ring.available(), RING_SIZE);
    }

    #[test]
    fn ring_wraps_around() {
        let ring = RingBuffer::new();
        let mut sink = vec![0.0f32; RING_SIZE];
        ring.push(&vec![0.0f32; RING_SIZE - 2]);
        ring.read(&mut sink);
        ring.push(&[1.0, 2.0, 3.0, 4.0]);
        let mut out = [0.0f32; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn queue_signals_room_per_chunk() {
        let ring = Arc::new(RingBuffer::new());
        let queue = SampleQueue::new(ring.clone(), 4, 3);
        assert!(queue.has_room());
        queue.push(&[0.0; 4]);
        assert!(queue.has_room());
        queue.push(&[0.0; 4]);
        // Two of three slots queued: one still free
        assert!(queue.has_room());
        queue.push(&[0.0; 4]);
        assert!(!queue.has_room());

        let mut out = [0.0f32; 4];
        ring.read(&mut out);
        assert!(queue.has_room());
    }

    #[test]
    fn queue_depth_is_clamped() {
        let ring = Arc::new(RingBuffer::new());
        let queue = SampleQueue::new(ring, 4, 0);
        queue.push(&[0.0; 4]);
        assert!(queue.has_room());
        queue.push(&[0.0; 4]);
        assert!(!queue.has_room());
    }

    #[test]
    fn stereo_device_gets_samples_then_silence() {
        let mut out = [9.0f32; 6];
        write_frames(&mut out, 2, &[0.25, -0.5]);
        assert_eq!(out, [0.25, -0.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn mono_device_gets_average() {
        let mut out = [9.0f32; 2];
        write_frames(&mut out, 1, &[0.5, 0.25, -1.0, 1.0]);
        assert_eq!(out, [0.375, 0.0]);
    }

    #[test]
    fn surround_device_keeps_extra_channels_silent() {
        let mut out = [9.0f32; 12];
        write_frames(&mut out, 6, &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(out, [0.1, 0.2, 0.0, 0.0, 0.0, 0.0, 0.3, 0.4, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn integer_devices_are_converted() {
        let mut out = [1i16; 4];
        write_frames(&mut out, 2, &[1.0, 0.0]);
        assert_eq!(out[1], 0);
        assert!(out[0] > 32000);
        assert_eq!(&out[2..], &[0, 0]);

        let mut out = [0u16; 2];
        write_frames(&mut out, 2, &[0.0, 0.0]);
        assert_eq!(out, [u16::EQUILIBRIUM; 2]);
    }
}
