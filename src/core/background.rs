/// Background sources: local files and http(s) URLs.
use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;
use tracing::{debug, info};

/// Load a background from `source`, which is either a URL or a file path.
pub async fn load(source: &str) -> Result<RgbImage> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch(source).await
    } else {
        load_file(Path::new(source))
    }
}

pub fn load_file(path: &Path) -> Result<RgbImage> {
    debug!("Loading background: {}", path.display());
    let image = image::open(path)
        .with_context(|| format!("Failed to open background {}", path.display()))?;
    Ok(image.to_rgb8())
}

pub async fn fetch(url: &str) -> Result<RgbImage> {
    info!("Fetching background from {}", url);
    let bytes = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("Failed to fetch background {url}"))?
        .bytes()
        .await
        .context("Failed to read background body")?;

    decode(&bytes).with_context(|| format!("Failed to decode background {url}"))
}

pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes)?;
    debug!("Decoded {}x{} background", image.width(), image.height());
    Ok(image.to_rgb8())
}
