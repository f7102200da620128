use thiserror::Error;

/// Draw-time failures. All of these indicate a layout or asset defect in the
/// caller and are never clamped or skipped.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("({x}, {y}) at scale {scale} is out of bounds for a {width}x{height} buffer")]
    OutOfBounds {
        x: i32,
        y: i32,
        scale: u32,
        width: u32,
        height: u32,
    },
    #[error("font has no glyph for {0:?}")]
    UnknownGlyph(char),
    #[error("palette index {index} outside palette of {len} colors")]
    PaletteIndex { index: u8, len: usize },
    #[error("sink failed to present frame: {0:#}")]
    Sink(#[source] anyhow::Error),
}
