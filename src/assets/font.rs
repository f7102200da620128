/// Bitmap font tables.
/// Parses the JSON glyph schema and validates every raster once at load time,
/// so draw-time lookups only ever fail for characters the table lacks.
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::AssetError;

const BUILTIN_FONT: &str = include_str!("../../assets/font.json");

/// On-disk representation of a font table
#[derive(Debug, Deserialize)]
struct FontFile {
    /// Shared (cell_width, cell_height)
    cell: (u32, u32),
    glyphs: BTreeMap<String, GlyphSpec>,
}

#[derive(Debug, Deserialize)]
struct GlyphSpec {
    raster: Vec<u8>,
    #[serde(default)]
    width: Option<u32>,
}

/// A single glyph: a flat 0/1 raster filling the font cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    raster: Vec<u8>,
    width: u32,
}

impl Glyph {
    /// Horizontal advance of the glyph, never wider than the cell.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster value at (column, row) within the cell
    pub fn lit(&self, column: u32, row: u32, cell_width: u32) -> bool {
        self.raster
            .get((row * cell_width + column) as usize)
            .is_some_and(|&v| v != 0)
    }
}

#[derive(Debug, Clone)]
pub struct BitmapFont {
    cell_width: u32,
    cell_height: u32,
    glyphs: HashMap<char, Glyph>,
}

impl BitmapFont {
    /// The 3x5 digit font compiled into the binary.
    pub fn builtin() -> Result<Self, AssetError> {
        Self::from_json(BUILTIN_FONT)
    }

    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        let file: FontFile = serde_json::from_str(json).map_err(AssetError::Parse)?;
        let (cell_width, cell_height) = file.cell;
        let expected = (cell_width * cell_height) as usize;

        let mut glyphs = HashMap::with_capacity(file.glyphs.len());
        for (key, spec) in file.glyphs {
            let mut chars = key.chars();
            let ch = match (chars.next(), chars.next()) {
                (Some(ch), None) => ch,
                _ => return Err(AssetError::GlyphKey(key)),
            };

            if spec.raster.len() != expected {
                return Err(AssetError::RasterLength {
                    glyph: ch,
                    expected,
                    actual: spec.raster.len(),
                });
            }

            let width = spec.width.unwrap_or(cell_width);
            if width > cell_width {
                return Err(AssetError::GlyphWidth {
                    glyph: ch,
                    width,
                    cell_width,
                });
            }

            glyphs.insert(
                ch,
                Glyph {
                    raster: spec.raster,
                    width,
                },
            );
        }

        debug!(
            "Loaded font with {} glyphs ({}x{} cell)",
            glyphs.len(),
            cell_width,
            cell_height
        );

        Ok(Self {
            cell_width,
            cell_height,
            glyphs,
        })
    }

    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }

    pub fn cell_height(&self) -> u32 {
        self.cell_height
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }
}
