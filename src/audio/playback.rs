use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::decode::AudioAsset;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no audio asset loaded")]
    NoAssetLoaded,
    #[error("no audio output device available")]
    NoOutputDevice,
    #[error("failed to query audio output config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Elapsed-time bookkeeping for pause/resume. `paused_offset` is the
/// authoritative elapsed position while paused; while playing the true
/// position is `paused_offset + (now - started_at)`. Exactly one of the two
/// holds at any instant.
///
/// All transitions take an explicit `now` so call sequences with known
/// timestamps are testable; `position` wraps the wall clock.
#[derive(Debug, Default)]
pub struct PlaybackClock {
    is_playing: bool,
    started_at: Option<Instant>,
    paused_offset: Duration,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a newly loaded asset, discarding any prior position.
    pub fn load(&mut self) {
        *self = Self::default();
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Start counting from the current offset. No-op if already playing.
    pub fn play_at(&mut self, now: Instant) {
        if self.is_playing {
            return;
        }
        self.started_at = Some(now);
        self.is_playing = true;
    }

    /// Freeze the elapsed position. A second consecutive pause is a no-op.
    pub fn pause_at(&mut self, now: Instant) {
        if !self.is_playing {
            return;
        }
        if let Some(started) = self.started_at.take() {
            self.paused_offset += now.saturating_duration_since(started);
        }
        self.is_playing = false;
    }

    /// Elapsed playback position at `now`.
    pub fn position_at(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started) if self.is_playing => {
                self.paused_offset + now.saturating_duration_since(started)
            }
            _ => self.paused_offset,
        }
    }

    pub fn position(&self) -> Duration {
        self.position_at(Instant::now())
    }
}

/// Bounded buffer of the most recently rendered output samples, shared
/// between the audio callback (writer) and the frame-rate analyser (reader).
#[derive(Clone)]
pub struct AnalysisTap {
    buffer: Arc<Mutex<Vec<f32>>>,
    capacity: usize,
}

impl AnalysisTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push_block(&self, samples: &[f32]) {
        let mut buf = self.buffer.lock().unwrap();
        buf.extend_from_slice(samples);
        let len = buf.len();
        if len > self.capacity {
            buf.drain(0..len - self.capacity);
        }
    }

    /// Copy the newest `out.len()` samples into `out`. Returns false (and
    /// leaves `out` untouched) if that many have not been rendered yet.
    pub fn latest(&self, out: &mut [f32]) -> bool {
        let buf = self.buffer.lock().unwrap();
        if buf.len() < out.len() {
            return false;
        }
        out.copy_from_slice(&buf[buf.len() - out.len()..]);
        true
    }

    pub fn clear(&self) {
        self.buffer.lock().unwrap().clear();
    }
}

/// An active cpal output stream bound to a start offset within the asset.
/// Only one source is ever active: the session drops the previous one before
/// starting a new one, which stops its callback. Past the end of the asset
/// the stream renders silence.
pub struct PlaybackSource {
    _stream: cpal::Stream,
}

impl PlaybackSource {
    pub fn start(
        asset: &AudioAsset,
        start_sample: usize,
        tap: AnalysisTap,
    ) -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoOutputDevice)?;
        let config = device.default_output_config()?;

        let channels = config.channels() as usize;
        let device_rate = config.sample_rate().0;
        // Asset-domain samples consumed per output frame; interpolation
        // absorbs any device/asset rate mismatch.
        let step = asset.sample_rate as f64 / device_rate as f64;

        log::info!(
            "Playback: {} @ {}Hz ({}ch), asset {}Hz, offset sample {}",
            device.name().unwrap_or_else(|_| "unknown device".into()),
            device_rate,
            channels,
            asset.sample_rate,
            start_sample
        );

        let samples = Arc::clone(&asset.samples);
        let mut cursor = start_sample as f64;
        let mut rendered: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                rendered.clear();
                for frame in data.chunks_mut(channels) {
                    let sample = sample_at(&samples, cursor);
                    for slot in frame.iter_mut() {
                        *slot = sample;
                    }
                    rendered.push(sample);
                    cursor += step;
                }
                tap.push_block(&rendered);
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        Ok(Self { _stream: stream })
    }
}

fn sample_at(samples: &[f32], cursor: f64) -> f32 {
    let i = cursor as usize;
    if i + 1 < samples.len() {
        let frac = (cursor - i as f64) as f32;
        samples[i] * (1.0 - frac) + samples[i + 1] * frac
    } else if i < samples.len() {
        samples[i]
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn starts_stopped_at_zero() {
        let clock = PlaybackClock::new();
        assert!(!clock.is_playing());
        assert_eq!(clock.position_at(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn elapsed_equals_time_spent_playing() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new();

        clock.play_at(t0);
        assert!(clock.is_playing());
        assert_eq!(clock.position_at(t0 + secs(3)), secs(3));

        clock.pause_at(t0 + secs(5));
        assert!(!clock.is_playing());
        assert_eq!(clock.position_at(t0 + secs(5)), secs(5));
        // Position is frozen while paused
        assert_eq!(clock.position_at(t0 + secs(100)), secs(5));

        clock.play_at(t0 + secs(5));
        clock.pause_at(t0 + secs(8));
        assert_eq!(clock.position_at(t0 + secs(8)), secs(8));
    }

    #[test]
    fn pause_twice_is_a_noop() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new();

        clock.play_at(t0);
        clock.pause_at(t0 + secs(2));
        clock.pause_at(t0 + secs(9));
        assert_eq!(clock.position_at(t0 + secs(9)), secs(2));
    }

    #[test]
    fn play_twice_keeps_the_original_start() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new();

        clock.play_at(t0);
        clock.play_at(t0 + secs(4));
        assert_eq!(clock.position_at(t0 + secs(6)), secs(6));
    }

    #[test]
    fn load_discards_prior_position() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new();

        clock.play_at(t0);
        clock.pause_at(t0 + secs(7));
        clock.load();
        assert!(!clock.is_playing());
        assert_eq!(clock.position_at(t0 + secs(10)), Duration::ZERO);
    }

    #[test]
    fn tap_keeps_only_the_newest_samples() {
        let tap = AnalysisTap::new(4);
        tap.push_block(&[1.0, 2.0, 3.0]);
        tap.push_block(&[4.0, 5.0, 6.0]);

        let mut out = [0.0f32; 4];
        assert!(tap.latest(&mut out));
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn tap_reports_underfill() {
        let tap = AnalysisTap::new(8);
        tap.push_block(&[1.0, 2.0]);

        let mut out = [9.0f32; 4];
        assert!(!tap.latest(&mut out));
        assert_eq!(out, [9.0; 4]);
    }

    #[test]
    fn sample_interpolation_and_end_silence() {
        let samples = [0.0f32, 1.0];
        assert_eq!(sample_at(&samples, 0.5), 0.5);
        assert_eq!(sample_at(&samples, 1.0), 1.0);
        assert_eq!(sample_at(&samples, 2.0), 0.0);
    }
}
