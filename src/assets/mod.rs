pub mod font;
pub mod icon;

use thiserror::Error;

pub use font::BitmapFont;
pub use icon::{Icon, IconSet};

/// Problems found while loading font or icon tables
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("malformed asset JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("glyph key {0:?} must be exactly one character")]
    GlyphKey(String),
    #[error("glyph {glyph:?} has {actual} raster cells, expected {expected}")]
    RasterLength {
        glyph: char,
        expected: usize,
        actual: usize,
    },
    #[error("glyph {glyph:?} is {width} wide but the cell is only {cell_width}")]
    GlyphWidth {
        glyph: char,
        width: u32,
        cell_width: u32,
    },
    #[error("icon width must be non-zero")]
    IconWidth,
    #[error("icon raster of {len} cells is not a multiple of width {width}")]
    IconRaster { len: usize, width: u32 },
    #[error("icon references palette index {index} but the palette has {len} colors")]
    IconPalette { index: u8, len: usize },
    #[error("no icon named {0:?}")]
    MissingIcon(String),
}
