/// Rendering engine: composites the background, bitmap text and icons into
/// a fixed-size RGB buffer and flushes it to a sink.
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use std::sync::Arc;
use tracing::{debug, info};

use crate::assets::{BitmapFont, Icon};
use crate::render::anchor::Anchor;
use crate::render::color;
use crate::render::error::RenderError;
use crate::render::sink::Sink;

pub type Result<T> = std::result::Result<T, RenderError>;

/// Which side of the text an attached icon sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconSide {
    Left,
    Right,
}

/// Layout options for `Renderer::draw_string`
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub anchor: Anchor,
    /// `None` picks black or white against whatever is underneath
    pub color: Option<Rgb<u8>>,
    pub padding: u32,
    pub spacing: u32,
    pub icon: Option<(Arc<Icon>, IconSide)>,
    /// `None` uses the renderer's scale
    pub scale: Option<u32>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            anchor: Anchor::LEFT,
            color: None,
            padding: 1,
            spacing: 1,
            icon: None,
            scale: None,
        }
    }
}

impl TextStyle {
    pub fn anchored(anchor: Anchor) -> Self {
        Self {
            anchor,
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: Arc<Icon>, side: IconSide) -> Self {
        self.icon = Some((icon, side));
        self
    }
}

pub struct Renderer {
    buffer: RgbImage,
    sink: Box<dyn Sink>,
    font: Arc<BitmapFont>,
    scale: u32,
}

impl Renderer {
    pub fn new(sink: Box<dyn Sink>, font: Arc<BitmapFont>, scale: u32) -> Self {
        let (width, height) = sink.size();
        info!("Renderer init({}x{}, scale {})", width, height, scale);
        info!("Renderer sink: {}", sink.name());

        Self {
            buffer: RgbImage::new(width, height),
            sink,
            font,
            scale: scale.max(1),
        }
    }

    pub fn clear(&mut self, color: Rgb<u8>) {
        for pixel in self.buffer.pixels_mut() {
            *pixel = color;
        }
    }

    /// Write `color` into the `scale`×`scale` block whose top-left is (x, y),
    /// dimmed through HSV when `brightness` is not 1.0. Every covered cell
    /// must lie inside the buffer.
    pub fn set_pixel_scaled(
        &mut self,
        x: i32,
        y: i32,
        color: Rgb<u8>,
        brightness: f32,
        scale: u32,
    ) -> Result<()> {
        let scale = scale.max(1);
        self.check_block(x, y, scale)?;

        let color = if brightness == 1.0 {
            color
        } else {
            color::modify_brightness(color, brightness)
        };

        for dy in 0..scale {
            for dx in 0..scale {
                self.buffer.put_pixel(x as u32 + dx, y as u32 + dy, color);
            }
        }
        Ok(())
    }

    fn check_block(&self, x: i32, y: i32, scale: u32) -> Result<()> {
        let (width, height) = self.buffer.dimensions();
        let far_x = x as i64 + scale as i64;
        let far_y = y as i64 + scale as i64;
        if x < 0 || y < 0 || far_x > width as i64 || far_y > height as i64 {
            return Err(RenderError::OutOfBounds {
                x,
                y,
                scale,
                width,
                height,
            });
        }
        Ok(())
    }

    /// Center-crop `image` to a square, resize it to the window and draw it
    /// at `brightness`. Images always draw at scale 1.
    pub fn draw_image(&mut self, image: &RgbImage, brightness: f32) -> Result<()> {
        let (src_w, src_h) = image.dimensions();
        let side = src_w.min(src_h);
        if side == 0 {
            debug!("Skipping empty {}x{} image", src_w, src_h);
            return Ok(());
        }

        let left = (src_w - side) / 2;
        let top = (src_h - side) / 2;
        let cropped = imageops::crop_imm(image, left, top, side, side).to_image();

        let (width, height) = self.buffer.dimensions();
        let resized = imageops::resize(&cropped, width, height, FilterType::CatmullRom);

        for (x, y, color) in resized.enumerate_pixels() {
            self.set_pixel_scaled(x as i32, y as i32, *color, brightness, 1)?;
        }
        Ok(())
    }

    /// Draw one glyph with its cell's top-left at (x, y). Narrow glyphs are
    /// right-aligned in the cell. Returns the cursor after the glyph, without
    /// any spacing.
    pub fn draw_char(
        &mut self,
        ch: char,
        x: i32,
        y: i32,
        color: Rgb<u8>,
        scale: u32,
    ) -> Result<i32> {
        let font = Arc::clone(&self.font);
        let cell_width = font.cell_width();
        let glyph = font.glyph(ch).ok_or(RenderError::UnknownGlyph(ch))?;
        let width_offset = cell_width - glyph.width();
        let step = scale as i32;

        for row in 0..font.cell_height() {
            for column in width_offset..cell_width {
                if glyph.lit(column, row, cell_width) {
                    let px = x + (column - width_offset) as i32 * step;
                    let py = y + row as i32 * step;
                    self.set_pixel_scaled(px, py, color, 1.0, scale)?;
                }
            }
        }

        Ok(x + glyph.width() as i32 * step)
    }

    /// Unscaled width of `text`: glyph widths plus spacing between them.
    pub fn text_width(&self, text: &str, spacing: u32) -> Result<u32> {
        let mut length = 0;
        for ch in text.chars() {
            let glyph = self.font.glyph(ch).ok_or(RenderError::UnknownGlyph(ch))?;
            length += glyph.width() + spacing;
        }
        Ok(length.saturating_sub(spacing))
    }

    /// Lay out and draw `text` (plus an optional icon) against the window edge
    /// selected by the style's anchor.
    pub fn draw_string(&mut self, text: &str, style: &TextStyle) -> Result<()> {
        let scale = style.scale.unwrap_or(self.scale).max(1);
        let step = scale as i32;
        let spacing = style.spacing as i32 * step;
        let padding = style.padding as i32 * step;

        let text_length = self.text_width(text, style.spacing)? as i32 * step;
        let icon_length = style
            .icon
            .as_ref()
            .map_or(0, |(icon, _)| (icon.width() as i32 + style.spacing as i32) * step);
        let block_length = text_length + icon_length;
        let block_height = self.font.cell_height() as i32 * step;

        let (width, height) = self.buffer.dimensions();
        let x = style.anchor.horizontal().origin(width, block_length, padding);
        let y = style.anchor.vertical().origin(height, block_height, padding);

        let color = match style.color {
            Some(color) => color,
            None => self.contrast_color(x, y, block_length, block_height)?,
        };

        let mut cursor = x;
        if let Some((icon, IconSide::Left)) = &style.icon {
            self.draw_bitmap(icon, cursor, y, scale)?;
            cursor += icon.width() as i32 * step + spacing;
        }

        for ch in text.chars() {
            cursor = self.draw_char(ch, cursor, y, color, scale)? + spacing;
        }

        if let Some((icon, IconSide::Right)) = &style.icon {
            if text.is_empty() {
                cursor = x;
            }
            self.draw_bitmap(icon, cursor, y, scale)?;
        }

        Ok(())
    }

    /// Black or white, whichever contrasts with the mean of every channel
    /// currently in the given rectangle.
    fn contrast_color(&self, x: i32, y: i32, width: i32, height: i32) -> Result<Rgb<u8>> {
        if width <= 0 || height <= 0 {
            return Ok(color::WHITE);
        }
        self.check_region(x, y, width, height)?;

        let mut sum: u64 = 0;
        for py in y..y + height {
            for px in x..x + width {
                let Rgb([r, g, b]) = *self.buffer.get_pixel(px as u32, py as u32);
                sum += r as u64 + g as u64 + b as u64;
            }
        }
        let channels = (width as u64) * (height as u64) * 3;
        Ok(color::contrast_for(sum as f64 / channels as f64))
    }

    fn check_region(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        let (buf_w, buf_h) = self.buffer.dimensions();
        if x < 0 || y < 0 || (x + width) as i64 > buf_w as i64 || (y + height) as i64 > buf_h as i64
        {
            return Err(RenderError::OutOfBounds {
                x,
                y,
                scale: 1,
                width: buf_w,
                height: buf_h,
            });
        }
        Ok(())
    }

    /// Draw a palette icon with its top-left at (x, y); index 0 is transparent.
    pub fn draw_bitmap(&mut self, icon: &Icon, x: i32, y: i32, scale: u32) -> Result<()> {
        let step = scale.max(1) as i32;
        for row in 0..icon.height() {
            for column in 0..icon.width() {
                let index = icon.index_at(column, row);
                if index == 0 {
                    continue;
                }
                let color = icon.color(index).ok_or(RenderError::PaletteIndex {
                    index,
                    len: icon.palette_len(),
                })?;
                let px = x + column as i32 * step;
                let py = y + row as i32 * step;
                self.set_pixel_scaled(px, py, color, 1.0, scale)?;
            }
        }
        Ok(())
    }

    /// Flush the whole buffer to the sink in index order, then present.
    pub fn render(&mut self) -> Result<()> {
        let width = self.buffer.width();
        for (index, color) in self.buffer.pixels().enumerate() {
            let index = index as u32;
            self.sink.set_pixel(index % width, index / width, *color);
        }
        self.sink.present().map_err(RenderError::Sink)
    }
}

#[cfg(test)]
impl Renderer {
    pub fn size(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn buffer(&self) -> &RgbImage {
        &self.buffer
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb<u8>> {
        self.buffer.get_pixel_checked(x, y).copied()
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb<u8>) -> Result<()> {
        self.set_pixel_scaled(x, y, color, 1.0, 1)
    }
}
