use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::compositor::blend;
use crate::error::EngineError;
use crate::labels::GlyphMetrics;

/// Outline offsets drawn under each glyph, in pixels.
const OUTLINE: [(i32, i32); 8] = [
    (-2, 0),
    (2, 0),
    (0, -2),
    (0, 2),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

pub struct TextRenderer {
    font: FontArc,
}

impl TextRenderer {
    pub fn new(font_data: Vec<u8>) -> Result<Self, EngineError> {
        let font = FontArc::try_from_vec(font_data).map_err(|_| EngineError::Font { path: None })?;
        Ok(Self { font })
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let data = std::fs::read(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(data).map_err(|_| EngineError::Font {
            path: Some(path.to_path_buf()),
        })?;
        Ok(Self { font })
    }

    /// Draws `text` centred on `center` with extra `letter_spacing` between
    /// glyphs: a dark outline first, then the fill.
    pub fn draw_label(
        &self,
        image: &mut RgbaImage,
        text: &str,
        center: (f32, f32),
        px: f32,
        letter_spacing: f32,
        fill: Rgba<u8>,
        outline: Rgba<u8>,
    ) {
        let scale = PxScale { x: px, y: px };
        let scaled_font = self.font.as_scaled(scale);
        let gaps = text.chars().count().saturating_sub(1) as f32;
        let total = self.text_width(text, px) + letter_spacing * gaps;
        let baseline = center.1 + (scaled_font.ascent() + scaled_font.descent()) / 2.0;

        for (offset, color) in OUTLINE
            .iter()
            .map(|&o| (o, outline))
            .chain(std::iter::once(((0, 0), fill)))
        {
            let mut x_pos = center.0 - total / 2.0;
            for c in text.chars() {
                if c.is_control() {
                    continue;
                }
                let glyph_id = self.font.glyph_id(c);
                let glyph = glyph_id.with_scale_and_position(
                    scale,
                    point(x_pos + offset.0 as f32, baseline + offset.1 as f32),
                );
                if let Some(outlined) = self.font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|x, y, coverage| {
                        let px = bounds.min.x as i64 + x as i64;
                        let py = bounds.min.y as i64 + y as i64;
                        if px >= 0
                            && py >= 0
                            && px < image.width() as i64
                            && py < image.height() as i64
                        {
                            blend(image.get_pixel_mut(px as u32, py as u32), color, coverage);
                        }
                    });
                }
                x_pos += scaled_font.h_advance(glyph_id) + letter_spacing;
            }
        }
    }
}

impl GlyphMetrics for TextRenderer {
    fn text_width(&self, text: &str, px: f32) -> f32 {
        let scaled_font = self.font.as_scaled(PxScale { x: px, y: px });
        text.chars()
            .filter(|c| !c.is_control())
            .map(|c| scaled_font.h_advance(self.font.glyph_id(c)))
            .sum()
    }
}
