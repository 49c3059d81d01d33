use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::time::Instant;

use crate::audio::analyser::SpectrumAnalyser;
use crate::audio::decode::{self, DecodeOutcome};
use crate::audio::playback::{AnalysisTap, PlaybackClock, PlaybackError, PlaybackSource};
use crate::render::mesh::SphereMesh;
use crate::settings::VisualSettings;

const SECTORS: u32 = 64;
const STACKS: u32 = 64;
// Fixed per-frame increment of the shader time uniform.
const SHADER_TIME_STEP: f32 = 0.05;

/// Owns every piece of mutable visualizer state: the playback clock, the
/// decoded asset, the analyser, the mesh, the settings, and the in-flight
/// decode bookkeeping. All operations go through here; there are no ambient
/// globals. GPU-free, so the whole frame step is unit-testable.
pub struct VisualizerSession {
    pub settings: VisualSettings,
    pub mesh: SphereMesh,
    pub(crate) clock: PlaybackClock,
    asset: Option<decode::AudioAsset>,
    analyser: Option<SpectrumAnalyser>,
    fft_size: usize,
    pub(crate) tap: AnalysisTap,
    source: Option<PlaybackSource>,
    generation: u64,
    decode_tx: Sender<DecodeOutcome>,
    decode_rx: Receiver<DecodeOutcome>,
    window_scratch: Vec<f32>,
    rotation_x: f32,
    rotation_y: f32,
    shader_time: f32,
}

impl VisualizerSession {
    pub fn new(settings: VisualSettings, fft_size: usize) -> Self {
        let (decode_tx, decode_rx) = decode::decode_channel();
        Self {
            settings,
            mesh: SphereMesh::new(SECTORS, STACKS),
            clock: PlaybackClock::new(),
            asset: None,
            analyser: None,
            fft_size,
            tap: AnalysisTap::new(fft_size * 8),
            source: None,
            generation: 0,
            decode_tx,
            decode_rx,
            window_scratch: vec![0.0; fft_size],
            rotation_x: 0.0,
            rotation_y: 0.0,
            shader_time: 0.0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.asset.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn rotation(&self) -> (f32, f32) {
        (self.rotation_x, self.rotation_y)
    }

    pub fn shader_time(&self) -> f32 {
        self.shader_time
    }

    /// Kick off a background decode, superseding any decode still in flight.
    /// Any active playback stops immediately, as in a fresh file selection.
    pub fn request_load(&mut self, path: PathBuf) {
        self.pause();
        self.generation += 1;
        log::info!("Loading {} (generation {})", path.display(), self.generation);
        decode::spawn_decode(path, self.generation, self.decode_tx.clone());
    }

    /// Drain finished decodes, applying only the one matching the current
    /// generation. Returns true if a new asset was applied.
    pub fn poll_decode(&mut self) -> bool {
        let mut applied = false;
        while let Ok(outcome) = self.decode_rx.try_recv() {
            if self.apply_outcome(outcome) {
                applied = true;
            }
        }
        applied
    }

    fn apply_outcome(&mut self, outcome: DecodeOutcome) -> bool {
        if outcome.generation != self.generation {
            log::info!(
                "Discarding superseded decode (generation {} < {})",
                outcome.generation,
                self.generation
            );
            return false;
        }

        match outcome.result {
            Ok(asset) => {
                log::info!("Audio ready: {:.1}s", asset.duration_secs());
                self.asset = Some(asset);
                // The analyser is created once, on the first successful load.
                if self.analyser.is_none() {
                    match SpectrumAnalyser::new(self.fft_size) {
                        Ok(analyser) => self.analyser = Some(analyser),
                        Err(err) => log::error!("Cannot create analyser: {:#}", err),
                    }
                }
                self.clock.load();
                self.mesh.reset();
                self.tap.clear();
                true
            }
            Err(err) => {
                // Decode failure is logged; playback simply never becomes
                // available for this file.
                log::error!("Failed to decode audio: {:#}", err);
                false
            }
        }
    }

    /// Start (or resume) playback from the current clock offset. Requires a
    /// loaded asset; the stream is bound to the offset at call time.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        let now = Instant::now();
        let asset = self.asset.as_ref().ok_or(PlaybackError::NoAssetLoaded)?;
        if self.clock.is_playing() {
            return Ok(());
        }

        let start_sample =
            (self.clock.position_at(now).as_secs_f64() * asset.sample_rate as f64) as usize;
        // Drop any previous stream before starting a new one; overlapping
        // sources would play simultaneously.
        self.source = None;
        self.source = Some(PlaybackSource::start(asset, start_sample, self.tap.clone())?);
        self.clock.play_at(now);
        Ok(())
    }

    /// Stop the active source and freeze the clock. Idempotent.
    pub fn pause(&mut self) {
        self.source = None;
        self.clock.pause_at(Instant::now());
    }

    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        if self.clock.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// One display frame: analyse and deform when playing, then advance the
    /// idle animation unconditionally.
    pub fn advance_frame(&mut self) {
        if self.clock.is_playing() {
            if let Some(analyser) = self.analyser.as_mut() {
                if self.tap.latest(&mut self.window_scratch) {
                    analyser.process(&self.window_scratch);
                    self.mesh
                        .apply_sample(analyser.bins(), self.settings.sensitivity);
                }
            }
        }

        self.rotation_x += self.settings.rotation_speed_x;
        self.rotation_y += self.settings.rotation_speed_y;
        self.shader_time += SHADER_TIME_STEP;
    }

    /// Playback status for the window title.
    pub fn status_line(&self) -> String {
        if !self.is_loaded() {
            return "drop an audio file".to_string();
        }
        let secs = self.clock.position().as_secs();
        let stamp = format!("{:02}:{:02}", secs / 60, secs % 60);
        if self.is_playing() {
            format!("Playing {}", stamp)
        } else {
            format!("Paused {}", stamp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::AudioAsset;
    use std::sync::Arc;

    fn asset(samples: Vec<f32>) -> AudioAsset {
        AudioAsset {
            samples: Arc::new(samples),
            sample_rate: 44100,
        }
    }

    fn session() -> VisualizerSession {
        VisualizerSession::new(VisualSettings::default(), 256)
    }

    #[test]
    fn play_without_asset_is_a_typed_error() {
        let mut session = session();
        assert!(matches!(session.play(), Err(PlaybackError::NoAssetLoaded)));
        assert!(!session.is_playing());
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut session = session();
        session.generation = 3;

        let applied = session.apply_outcome(DecodeOutcome {
            generation: 2,
            result: Ok(asset(vec![0.0; 1024])),
        });
        assert!(!applied);
        assert!(!session.is_loaded());
    }

    #[test]
    fn current_generation_is_applied_and_resets_state() {
        let mut session = session();
        session.generation = 1;

        let applied = session.apply_outcome(DecodeOutcome {
            generation: 1,
            result: Ok(asset(vec![0.0; 1024])),
        });
        assert!(applied);
        assert!(session.is_loaded());
        assert!(!session.is_playing());
        assert!(session.analyser.is_some());
    }

    #[test]
    fn failed_decode_leaves_playback_unavailable() {
        let mut session = session();
        session.generation = 1;

        let applied = session.apply_outcome(DecodeOutcome {
            generation: 1,
            result: Err(anyhow::anyhow!("bad file")),
        });
        assert!(!applied);
        assert!(!session.is_loaded());
        assert!(matches!(session.play(), Err(PlaybackError::NoAssetLoaded)));
    }

    #[test]
    fn analyser_survives_a_reload() {
        let mut session = session();
        session.generation = 1;
        session.apply_outcome(DecodeOutcome {
            generation: 1,
            result: Ok(asset(vec![0.0; 64])),
        });
        // Leave a mark on the analyser state; a recreated analyser would
        // come back all-zero.
        session.analyser.as_mut().unwrap().process(&[0.5; 256]);
        assert!(session.analyser.as_ref().unwrap().bins().iter().any(|&b| b > 0));

        session.generation = 2;
        session.apply_outcome(DecodeOutcome {
            generation: 2,
            result: Ok(asset(vec![0.0; 64])),
        });
        assert!(session.analyser.as_ref().unwrap().bins().iter().any(|&b| b > 0));
    }

    #[test]
    fn idle_animation_advances_while_paused() {
        let mut session = session();
        session.advance_frame();
        session.advance_frame();

        let (rx, ry) = session.rotation();
        assert!((rx - 2.0 * session.settings.rotation_speed_x).abs() < 1e-6);
        assert!((ry - 2.0 * session.settings.rotation_speed_y).abs() < 1e-6);
        assert!((session.shader_time() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn deformation_only_happens_while_playing() {
        let mut session = session();
        session.generation = 1;
        session.apply_outcome(DecodeOutcome {
            generation: 1,
            result: Ok(asset(vec![0.5; 44100])),
        });
        session.mesh.take_dirty();

        // Paused: tap data exists but the audio branch is gated off.
        session.tap.push_block(&vec![0.5; 256]);
        session.advance_frame();
        assert!(!session.mesh.take_dirty());

        // Playing: the same data deforms the mesh.
        session.clock.play_at(Instant::now());
        session.advance_frame();
        assert!(session.mesh.take_dirty());
    }

    #[test]
    fn status_line_tracks_state() {
        let mut session = session();
        assert_eq!(session.status_line(), "drop an audio file");

        session.generation = 1;
        session.apply_outcome(DecodeOutcome {
            generation: 1,
            result: Ok(asset(vec![0.0; 64])),
        });
        assert_eq!(session.status_line(), "Paused 00:00");
    }
}
