use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sphera", about = "Audio-reactive sphere visualizer")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG); may also be dropped onto the window
    pub input: Option<PathBuf>,

    /// Window width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// FFT window size (power of two); the spectrum has half this many bins
    #[arg(long, default_value_t = 256)]
    pub fft_size: usize,

    /// Sphere radius in world units
    #[arg(long, default_value_t = 2.0)]
    pub radius: f32,

    /// Per-frame rotation around X (radians)
    #[arg(long, default_value_t = 0.01)]
    pub rotation_speed_x: f32,

    /// Per-frame rotation around Y (radians)
    #[arg(long, default_value_t = 0.01)]
    pub rotation_speed_y: f32,

    /// Color cycling frequency multiplier
    #[arg(long, default_value_t = 10.0)]
    pub color_intensity: f32,

    /// Deformation divisor; lower values react harder (50-255)
    #[arg(long, default_value_t = 128.0)]
    pub sensitivity: f32,

    /// Config file path (default: auto-detect sphera.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
