mod app;
mod audio;
mod cli;
mod config;
mod render;
mod session;
mod settings;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use session::VisualizerSession;
use settings::VisualSettings;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect sphera.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = std::path::PathBuf::from("sphera.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("sphera").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("sphera").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.width == 1280 { cli.width = cfg.window.width; }
            if cli.height == 720 { cli.height = cfg.window.height; }
            if cli.fft_size == 256 { cli.fft_size = cfg.audio.fft_size; }
            if cli.radius == 2.0 { cli.radius = cfg.visual.radius; }
            if cli.rotation_speed_x == 0.01 { cli.rotation_speed_x = cfg.visual.rotation_speed_x; }
            if cli.rotation_speed_y == 0.01 { cli.rotation_speed_y = cfg.visual.rotation_speed_y; }
            if cli.color_intensity == 10.0 { cli.color_intensity = cfg.visual.color_intensity; }
            if cli.sensitivity == 128.0 { cli.sensitivity = cfg.visual.sensitivity; }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if cli.fft_size == 0 || !cli.fft_size.is_power_of_two() {
        anyhow::bail!("--fft-size must be a power of two, got {}", cli.fft_size);
    }

    log::info!("sphera - audio-reactive sphere visualizer");
    log::info!("Window: {}x{}", cli.width, cli.height);
    log::info!("FFT window: {} ({} bins)", cli.fft_size, cli.fft_size / 2);

    let settings = VisualSettings {
        radius: cli.radius,
        rotation_speed_x: cli.rotation_speed_x,
        rotation_speed_y: cli.rotation_speed_y,
        color_intensity: cli.color_intensity,
        sensitivity: cli.sensitivity,
    }
    .clamped();

    let mut session = VisualizerSession::new(settings, cli.fft_size);

    if let Some(input) = cli.input.take() {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
        log::info!("Input: {}", input.display());
        session.request_load(input);
    }

    app::VizApp::new(session, cli.width, cli.height).run()
}
