//! theremin - gesture-driven tone in the terminal
//!
//! Run with: cargo run --bin theremin -- [--quantize] [--reverb]
//!
//! Click and drag on the pad: left/right is pitch, up/down is volume.

mod app;
mod ui;

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};

use app::App;
use theremin_dsp::{synth::WaveformId, EngineConfig};

#[derive(Debug, Parser)]
#[command(name = "theremin", about = "Gesture-driven tone engine in the terminal")]
struct Args {
    /// JSON configuration file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session name used in clip filenames
    #[arg(long)]
    session: Option<String>,

    /// Starting waveform (sine, square, sawtooth, triangle, warm-saw, warm-square)
    #[arg(long)]
    waveform: Option<WaveformId>,

    /// Snap pitch to the nearest semitone
    #[arg(long)]
    quantize: bool,

    /// Start with reverb enabled
    #[arg(long)]
    reverb: bool,

    /// Where exported clips are written
    #[arg(long, default_value = ".")]
    clips_dir: PathBuf,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "theremin.log")]
    log_file: PathBuf,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse();

    init_logging(&args.log_file)?;
    let config = load_config(&args)?;

    App::new(config, args.clips_dir)?.run()
}

fn init_logging(path: &Path) -> EyreResult<()> {
    let file = File::create(path)
        .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn load_config(args: &Args) -> EyreResult<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            EngineConfig::from_json_str(&json)
                .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Some(session) = &args.session {
        config = config.with_session_name(session.clone());
    }
    if let Some(waveform) = args.waveform {
        config = config.with_waveform(waveform);
    }
    if args.quantize {
        config = config.with_quantize(true);
    }
    if args.reverb {
        let ratio = config.wet_ratio;
        config = config.with_reverb(true, ratio);
    }

    config.validate().wrap_err("invalid configuration")?;
    Ok(config)
}
