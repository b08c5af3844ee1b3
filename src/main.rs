//! Renders a YAML render file to a png
use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use log::{error, LevelFilter};
use ray_tracer::{config::RenderConfig, error::Result, scheduler::Threads};

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser)]
#[command(name = "ray-tracer")]
#[command(about = "Recursive Phong ray tracer")]
struct Args {
    /// Render file describing the scene, camera and output
    config: PathBuf,

    /// Directory the png is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Worker threads: a count, 0 for one thread, or "auto". Overrides the render file
    #[arg(short, long)]
    threads: Option<Threads>,

    /// Show a progress bar
    #[arg(short, long)]
    progress: bool,

    #[arg(long, default_value = "info", help = "Set the logging level")]
    debug_level: LogLevel,
}

fn run(args: Args) -> Result<PathBuf> {
    let config = RenderConfig::load(&args.config)?;
    let mut camera = config.build_camera()?.with_progress(args.progress);
    if let Some(threads) = args.threads {
        camera = camera.with_threads(threads);
    }
    camera.render_image()?;
    camera.write_to_image(&args.output_dir)
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(args.debug_level.clone().into())
        .init();

    match run(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
