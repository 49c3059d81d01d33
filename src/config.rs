use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visual: VisualConfig,
}

#[derive(Debug, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// FFT window size; the analysis sample has half this many bins.
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct VisualConfig {
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed_x: f32,
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed_y: f32,
    #[serde(default = "default_color_intensity")]
    pub color_intensity: f32,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            rotation_speed_x: default_rotation_speed(),
            rotation_speed_y: default_rotation_speed(),
            color_intensity: default_color_intensity(),
            sensitivity: default_sensitivity(),
        }
    }
}

fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_fft_size() -> usize { 256 }
fn default_radius() -> f32 { 2.0 }
fn default_rotation_speed() -> f32 { 0.01 }
fn default_color_intensity() -> f32 { 10.0 }
fn default_sensitivity() -> f32 { 128.0 }

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.window.width, 1280);
        assert_eq!(cfg.window.height, 720);
        assert_eq!(cfg.audio.fft_size, 256);
        assert_eq!(cfg.visual.sensitivity, 128.0);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            "[visual]\nsensitivity = 200.0\n\n[window]\nwidth = 800\n",
        )
        .unwrap();
        assert_eq!(cfg.window.width, 800);
        assert_eq!(cfg.window.height, 720);
        assert_eq!(cfg.visual.sensitivity, 200.0);
        assert_eq!(cfg.visual.radius, 2.0);
    }
}
