/// Weather plugin.
/// Shows the current temperature with a condition icon in a bottom corner.
/// Responses are cached on disk and refreshed in the background.
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::assets::{AssetError, Icon, IconSet};
use crate::config::{TemperatureUnit, WeatherConfig, WeatherCorner};
use crate::core::{Plugin, SchedulerHandle};
use crate::render::{Anchor, IconSide, Renderer, TextStyle};

/// Cache file layout: fetch time plus the raw API response
#[derive(Debug, Serialize, Deserialize)]
struct CachedWeather {
    timestamp: i64,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct LocationWeather {
    consolidated_weather: Vec<DayWeather>,
}

#[derive(Debug, Deserialize)]
struct DayWeather {
    the_temp: f64,
    #[serde(default)]
    weather_state_abbr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Clear,
    Rain,
    Storm,
}

impl Condition {
    fn from_abbr(abbr: &str) -> Self {
        match abbr {
            "c" | "lc" => Condition::Clear,
            "s" | "lr" | "hr" => Condition::Rain,
            _ => Condition::Storm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub celsius: f64,
    pub condition: Condition,
}

impl Report {
    /// Today's weather from a location response
    fn from_response(data: &serde_json::Value) -> Result<Self> {
        let location = LocationWeather::deserialize(data).context("Unexpected weather response")?;
        let today = location
            .consolidated_weather
            .first()
            .context("Weather response has no forecast days")?;
        Ok(Self {
            celsius: today.the_temp,
            condition: Condition::from_abbr(&today.weather_state_abbr),
        })
    }

    pub fn temperature(&self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.celsius,
            TemperatureUnit::Fahrenheit => self.celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

struct WeatherIcons {
    sun: Arc<Icon>,
    rain: Arc<Icon>,
    storm: Arc<Icon>,
}

impl WeatherIcons {
    fn for_condition(&self, condition: Condition) -> Arc<Icon> {
        let icon = match condition {
            Condition::Clear => &self.sun,
            Condition::Rain => &self.rain,
            Condition::Storm => &self.storm,
        };
        Arc::clone(icon)
    }
}

pub struct WeatherPlugin {
    config: WeatherConfig,
    icons: WeatherIcons,
    report: Arc<Mutex<Option<Report>>>,
    refresher: Option<JoinHandle<()>>,
}

impl WeatherPlugin {
    pub fn new(config: WeatherConfig, icons: &IconSet) -> Result<Self, AssetError> {
        Ok(Self {
            config,
            icons: WeatherIcons {
                sun: icons.require("sun")?,
                rain: icons.require("rain")?,
                storm: icons.require("storm")?,
            },
            report: Arc::new(Mutex::new(None)),
            refresher: None,
        })
    }

    fn current(&self) -> Option<Report> {
        *self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Plugin for WeatherPlugin {
    fn name(&self) -> &str {
        "weather"
    }

    fn setup(&mut self, _scheduler: &SchedulerHandle, renderer: &mut Renderer) -> Result<()> {
        info!("Setting up weather for location {}", self.config.woeid);
        let runtime = tokio::runtime::Handle::try_current()
            .context("Weather refresh needs a tokio runtime")?;

        let now = Utc::now().timestamp();
        let mut first_fetch = Duration::ZERO;
        if let Some(cached) = read_cache(&self.config.cache_path()) {
            match Report::from_response(&cached.data) {
                Ok(report) if is_fresh(cached.timestamp, now, self.config.refresh) => {
                    debug!("Using cached weather from {}", cached.timestamp);
                    publish(&self.report, report);
                    let age = now.saturating_sub(cached.timestamp).max(0) as u64;
                    first_fetch = self.config.refresh.saturating_sub(Duration::from_secs(age));
                }
                Ok(_) => debug!("Cached weather is stale"),
                Err(e) => warn!("Ignoring unreadable weather cache: {:#}", e),
            }
        }

        let config = self.config.clone();
        let report = Arc::clone(&self.report);
        self.refresher = Some(runtime.spawn(refresh_loop(config, report, first_fetch)));

        self.update(renderer);
        Ok(())
    }

    fn update(&mut self, renderer: &mut Renderer) {
        let Some(report) = self.current() else {
            return;
        };

        let text = format!("{:.0}", report.temperature(self.config.unit));
        let (anchor, side) = placement(self.config.corner);
        let style = TextStyle::anchored(anchor)
            .with_icon(self.icons.for_condition(report.condition), side);
        if let Err(e) = renderer.draw_string(&text, &style) {
            warn!("Failed to draw weather {:?}: {}", text, e);
        }
    }
}

impl Drop for WeatherPlugin {
    fn drop(&mut self) {
        if let Some(task) = self.refresher.take() {
            task.abort();
        }
    }
}

/// Anchor for the readout and the side its icon goes on
fn placement(corner: WeatherCorner) -> (Anchor, IconSide) {
    match corner {
        WeatherCorner::BottomRight => (Anchor::BOTTOM | Anchor::RIGHT, IconSide::Right),
        WeatherCorner::BottomLeft => (Anchor::BOTTOM | Anchor::LEFT, IconSide::Left),
    }
}

fn publish(slot: &Mutex<Option<Report>>, report: Report) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
}

fn is_fresh(fetched_at: i64, now: i64, refresh: Duration) -> bool {
    now <= fetched_at.saturating_add(refresh.as_secs() as i64)
}

fn read_cache(path: &Path) -> Option<CachedWeather> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(cached) => Some(cached),
        Err(e) => {
            warn!("Ignoring corrupt weather cache {}: {}", path.display(), e);
            None
        }
    }
}

async fn write_cache(path: &Path, cached: &CachedWeather) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let json = serde_json::to_string(cached)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write weather cache {}", path.display()))
}

async fn fetch(client: &reqwest::Client, config: &WeatherConfig) -> Result<Report> {
    let url = config.url();
    info!("Refreshing weather data for {}", config.woeid);
    let data: serde_json::Value = client
        .get(&url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("Failed to fetch {url}"))?
        .json()
        .await
        .context("Failed to parse weather response")?;

    let report = Report::from_response(&data)?;
    let cached = CachedWeather {
        timestamp: Utc::now().timestamp(),
        data,
    };
    if let Err(e) = write_cache(&config.cache_path(), &cached).await {
        warn!("{:#}", e);
    }
    Ok(report)
}

async fn refresh_loop(config: WeatherConfig, report: Arc<Mutex<Option<Report>>>, first: Duration) {
    let client = reqwest::Client::new();
    let mut delay = first;
    loop {
        time::sleep(delay).await;
        match fetch(&client, &config).await {
            Ok(fresh) => {
                info!("Weather: {:.1}C, {:?}", fresh.celsius, fresh.condition);
                publish(&report, fresh);
            }
            Err(e) => warn!("Weather refresh failed: {:#}", e),
        }
        delay = config.refresh;
    }
}
