use std::path::PathBuf;
use std::time::Duration;

/// Top-level frame configuration
#[derive(Debug, Clone)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub sink: SinkKind,
    /// PNG preview path for the image sink
    pub output_path: Option<PathBuf>,
    /// Path or http(s) URL of the first background
    pub background: Option<String>,
    pub scheduler: SchedulerConfig,
    pub weather: Option<WeatherConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkKind {
    /// Discard frames, just run the loop
    #[default]
    Null,
    /// Keep an in-memory preview, optionally written as PNG
    Image,
    /// Packed RGB frames on stdout (for piping)
    Raw,
}

impl std::str::FromStr for SinkKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "null" | "dummy" | "none" => Ok(SinkKind::Null),
            "image" | "png" | "preview" => Ok(SinkKind::Image),
            "raw" | "stdout" => Ok(SinkKind::Raw),
            _ => Err(format!("Unknown sink: {s}")),
        }
    }
}

/// Timing of the redraw loop and the background crossfade
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Longest wait between clock checks while idle
    pub idle_timeout: Duration,
    /// Redraw rate while a crossfade is running
    pub fps: u32,
    pub fade_start: f32,
    pub fade_end: f32,
    pub fade_duration: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(500),
            fps: 30,
            fade_start: 0.0,
            fade_end: 0.5,
            fade_duration: Duration::from_secs(2),
        }
    }
}

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

impl SchedulerConfig {
    /// Wait between crossfade frames, never shorter than 1 ms
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.fps.max(1) as u64).max(MIN_FRAME_INTERVAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

/// Bottom corner the weather readout sits in; the icon goes on the outer side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeatherCorner {
    #[default]
    BottomRight,
    BottomLeft,
}

impl std::str::FromStr for WeatherCorner {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bottom-right" | "right" | "br" => Ok(WeatherCorner::BottomRight),
            "bottom-left" | "left" | "bl" => Ok(WeatherCorner::BottomLeft),
            _ => Err(format!("Unknown weather corner: {s}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Where-on-earth id of the location
    pub woeid: u32,
    pub api_base: String,
    pub cache_dir: PathBuf,
    pub refresh: Duration,
    pub unit: TemperatureUnit,
    pub corner: WeatherCorner,
}

impl WeatherConfig {
    pub fn new(woeid: u32, cache_dir: PathBuf) -> Self {
        Self {
            woeid,
            api_base: "https://www.metaweather.com/api/location".to_string(),
            cache_dir,
            refresh: Duration::from_secs(60 * 60),
            unit: TemperatureUnit::default(),
            corner: WeatherCorner::default(),
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(format!("weather_{}.data", self.woeid))
    }

    pub fn url(&self) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), self.woeid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_kind_from_str() {
        assert_eq!("image".parse::<SinkKind>(), Ok(SinkKind::Image));
        assert_eq!("PNG".parse::<SinkKind>(), Ok(SinkKind::Image));
        assert_eq!("dummy".parse::<SinkKind>(), Ok(SinkKind::Null));
        assert_eq!("stdout".parse::<SinkKind>(), Ok(SinkKind::Raw));
        assert!("matrix".parse::<SinkKind>().is_err());
    }

    #[test]
    fn test_frame_interval() {
        let config = SchedulerConfig::default();
        assert_eq!(config.frame_interval(), Duration::from_millis(33));
        let stalled = SchedulerConfig {
            fps: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(stalled.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_frame_interval_never_zero() {
        for fps in [1001, 5000, u32::MAX] {
            let config = SchedulerConfig {
                fps,
                ..SchedulerConfig::default()
            };
            assert_eq!(config.frame_interval(), Duration::from_millis(1));
        }
    }

    #[test]
    fn test_weather_corner_from_str() {
        assert_eq!("bottom-left".parse::<WeatherCorner>(), Ok(WeatherCorner::BottomLeft));
        assert_eq!("BR".parse::<WeatherCorner>(), Ok(WeatherCorner::BottomRight));
        assert!("top".parse::<WeatherCorner>().is_err());
    }

    #[test]
    fn test_weather_paths() {
        let config = WeatherConfig::new(2455920, PathBuf::from("/tmp"));
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/weather_2455920.data"));
        assert_eq!(
            config.url(),
            "https://www.metaweather.com/api/location/2455920"
        );
    }
}
