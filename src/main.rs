// Retro Host - Main Entry Point
//
// Opens a window, connects audio output and runs the selected program image
// on the built-in demo core. Without a ROM argument the built-in test pattern
// runs.

use clap::Parser;
use retro_host::audio::{AudioHost, NullAudioHost};
use retro_host::core::{CoreOptions, DemoCore, EmulationCore, ProgramImage, BUILTIN_IMAGE};
use retro_host::display::run_host;
use retro_host::emulator::{HostConfig, Session, CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to ROM file
    rom: Option<PathBuf>,

    /// Configuration file (created with defaults if missing)
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Run without opening an audio device
    #[arg(long)]
    no_audio: bool,

    /// Window scale factor (1-8), overrides the configuration file
    #[arg(long)]
    scale: Option<u32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Retro Host v{}", env!("CARGO_PKG_VERSION"));

    let config = HostConfig::load_or_default(&args.config)?;
    tracing::info!("Configuration loaded from '{}'", args.config.display());

    let mut window_config = config.window_config();
    if let Some(scale) = args.scale {
        window_config = window_config.with_scale(scale);
    }

    let factory = |options: CoreOptions| Box::new(DemoCore::new(options)) as Box<dyn EmulationCore>;
    let audio_host = select_audio_host(&config, args.no_audio);

    let mut session = Session::new(Box::new(factory), audio_host)
        .with_audio_config(config.audio_config())
        .with_key_map(config.input.to_key_map()?);

    match &args.rom {
        Some(path) => {
            tracing::info!("Loading '{}'", path.display());
            session.request_load_file(path);
        }
        None => {
            tracing::info!("No ROM supplied, running the built-in test pattern");
            session.request_load(ProgramImage::from_bytes("built-in", BUILTIN_IMAGE));
        }
    }

    tracing::info!("Controls: arrows, X = A, Z = B, Enter = Start, Ctrl = Select");
    tracing::info!("Escape stops, F1 reloads, close the window to exit");

    run_host(window_config, session)?;

    tracing::info!("Window closed.");
    Ok(())
}

fn select_audio_host(config: &HostConfig, no_audio: bool) -> Box<dyn AudioHost> {
    if no_audio || !config.audio.enabled {
        tracing::info!("Audio disabled");
        return Box::new(NullAudioHost);
    }

    #[cfg(feature = "audio")]
    {
        Box::new(retro_host::audio::CpalAudioHost)
    }

    #[cfg(not(feature = "audio"))]
    {
        tracing::info!("Built without audio support");
        Box::new(NullAudioHost)
    }
}
