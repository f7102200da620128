use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod assets;
mod config;
mod core;
mod plugins;
mod render;

use crate::assets::{BitmapFont, IconSet};
use crate::config::{
    FrameConfig, SchedulerConfig, SinkKind, TemperatureUnit, WeatherConfig, WeatherCorner,
};
use crate::core::{Scheduler, SystemClock};
use crate::plugins::WeatherPlugin;
use crate::render::sink::{ImageSink, NullSink, RawSink};
use crate::render::{Renderer, Sink};

#[derive(Parser, Debug)]
#[command(name = "pixelframe", about = "Photo frame and clock for small LED panels")]
struct Args {
    /// Output sink: null, image, raw
    #[arg(short, long, default_value = "null")]
    sink: String,

    /// Pixels per side of the (square) display
    #[arg(short = 'n', long, default_value_t = 32)]
    size: u32,

    /// Display pixels per virtual pixel for text and icons
    #[arg(short = 'q', long, default_value_t = 1)]
    scale: u32,

    /// Background image: file path or http(s) URL
    #[arg(short, long)]
    background: Option<String>,

    /// PNG preview path (image sink)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Redraw rate while a crossfade runs
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Where-on-earth id for the weather plugin; omit to disable it
    #[arg(long)]
    woeid: Option<u32>,

    /// Directory for the weather cache file (defaults to $HOME)
    #[arg(long)]
    weather_cache_dir: Option<PathBuf>,

    /// Show temperatures in Celsius instead of Fahrenheit
    #[arg(long)]
    celsius: bool,

    /// Bottom corner for the weather readout: bottom-right, bottom-left
    #[arg(long, default_value = "bottom-right")]
    weather_corner: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn frame_config(&self) -> Result<FrameConfig> {
        let sink: SinkKind = self.sink.parse().map_err(anyhow::Error::msg)?;
        let corner: WeatherCorner = self.weather_corner.parse().map_err(anyhow::Error::msg)?;

        let weather = self.woeid.map(|woeid| {
            let cache_dir = self
                .weather_cache_dir
                .clone()
                .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
                .unwrap_or_else(std::env::temp_dir);
            let mut weather = WeatherConfig::new(woeid, cache_dir);
            if self.celsius {
                weather.unit = TemperatureUnit::Celsius;
            }
            weather.corner = corner;
            weather
        });

        Ok(FrameConfig {
            width: self.size,
            height: self.size,
            scale: self.scale.max(1),
            sink,
            output_path: self.output.clone(),
            background: self.background.clone(),
            scheduler: SchedulerConfig {
                fps: self.fps,
                ..SchedulerConfig::default()
            },
            weather,
        })
    }
}

fn build_sink(config: &FrameConfig) -> Box<dyn Sink> {
    match config.sink {
        SinkKind::Null => Box::new(NullSink::new(config.width, config.height)),
        SinkKind::Image => Box::new(ImageSink::new(
            config.width,
            config.height,
            config.output_path.clone(),
        )),
        SinkKind::Raw => Box::new(RawSink::new(config.width, config.height)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.parse().unwrap_or_default()),
        )
        .init();

    let config = args.frame_config()?;
    info!(
        "pixelframe v{} starting ({}x{}, scale {}, {:?} sink)",
        env!("CARGO_PKG_VERSION"),
        config.width,
        config.height,
        config.scale,
        config.sink
    );

    let font = Arc::new(BitmapFont::builtin().context("Built-in font is invalid")?);
    let icons = IconSet::builtin().context("Built-in icons are invalid")?;

    let sink = build_sink(&config);
    let presentation = sink.start();
    let renderer = Renderer::new(sink, font, config.scale);
    let scheduler = Scheduler::start(renderer, Arc::new(SystemClock), config.scheduler.clone());

    // Load the background off the startup path
    let loader = config.background.clone().map(|source| {
        let handle = scheduler.handle();
        tokio::spawn(async move {
            match crate::core::background::load(&source).await {
                Ok(image) => {
                    if let Err(e) = handle.set_background(image) {
                        warn!("Failed to draw background: {}", e);
                    }
                }
                Err(e) => warn!("No background: {:#}", e),
            }
        })
    });

    if let Some(weather) = config.weather.clone() {
        let plugin = WeatherPlugin::new(weather, &icons).context("Weather icons missing")?;
        if let Err(e) = scheduler.add_plugin(Box::new(plugin)) {
            warn!("{:#}", e);
        }
    }

    let outcome = tokio::select! {
        outcome = presentation => outcome,
        _ = scheduler.halted() => {
            error!("Redraw loop halted, exiting");
            Ok(())
        }
    };

    if let Some(loader) = loader {
        loader.abort();
    }
    scheduler.shutdown().await?;
    outcome?;

    info!("pixelframe shutdown");
    Ok(())
}
