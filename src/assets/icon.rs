/// Palette-indexed icon bitmaps.
use image::Rgb;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::AssetError;

const BUILTIN_ICONS: &str = include_str!("../../assets/icons.json");

#[derive(Debug, Deserialize)]
struct IconSpec {
    width: u32,
    raster: Vec<u8>,
    palette: Vec<u32>,
}

/// An icon is a raster of palette indices: 0 is transparent, anything else
/// is a 1-based index into `palette`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    width: u32,
    raster: Vec<u8>,
    palette: Vec<u32>,
}

impl Icon {
    /// Build an icon, checking the raster shape and palette indices.
    pub fn new(width: u32, raster: Vec<u8>, palette: Vec<u32>) -> Result<Self, AssetError> {
        if width == 0 {
            return Err(AssetError::IconWidth);
        }
        if raster.len() % width as usize != 0 {
            return Err(AssetError::IconRaster {
                len: raster.len(),
                width,
            });
        }
        if let Some(&index) = raster.iter().find(|&&i| i as usize > palette.len()) {
            return Err(AssetError::IconPalette {
                index,
                len: palette.len(),
            });
        }
        Ok(Self {
            width,
            raster,
            palette,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.raster.len() as u32 / self.width
    }

    /// Palette index at (column, row); 0 means transparent.
    pub fn index_at(&self, column: u32, row: u32) -> u8 {
        self.raster[(row * self.width + column) as usize]
    }

    /// Resolve a non-zero palette index to its color.
    pub fn color(&self, index: u8) -> Option<Rgb<u8>> {
        let packed = *self.palette.get((index as usize).checked_sub(1)?)?;
        Some(unpack_rgb(packed))
    }

    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }
}

/// Split a packed 0xRRGGBB value into channels
pub fn unpack_rgb(packed: u32) -> Rgb<u8> {
    Rgb([
        ((packed >> 16) & 0xFF) as u8,
        ((packed >> 8) & 0xFF) as u8,
        (packed & 0xFF) as u8,
    ])
}

/// Named icon table
#[derive(Debug, Clone, Default)]
pub struct IconSet {
    icons: HashMap<String, Arc<Icon>>,
}

impl IconSet {
    pub fn builtin() -> Result<Self, AssetError> {
        Self::from_json(BUILTIN_ICONS)
    }

    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        let specs: HashMap<String, IconSpec> =
            serde_json::from_str(json).map_err(AssetError::Parse)?;

        let mut icons = HashMap::with_capacity(specs.len());
        for (name, spec) in specs {
            let icon = Icon::new(spec.width, spec.raster, spec.palette)?;
            icons.insert(name, Arc::new(icon));
        }
        Ok(Self { icons })
    }

    pub fn get(&self, name: &str) -> Option<Arc<Icon>> {
        self.icons.get(name).cloned()
    }

    /// Like `get`, but a missing icon is an asset error.
    pub fn require(&self, name: &str) -> Result<Arc<Icon>, AssetError> {
        self.get(name)
            .ok_or_else(|| AssetError::MissingIcon(name.to_string()))
    }
}
