//! Composites the map layers under the camera into the visible surface.
//!
//! Draw order: background, terrain, water, political tint, rivers, country
//! borders, selection outline, labels. Sampling is nearest-neighbour; layers
//! that are not ready are simply skipped.

use image::{Rgba, RgbaImage};
use log::debug;
use mapdata::ProvinceIndex;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::camera::Camera;
use crate::labels::PlacedLabel;
use crate::text::TextRenderer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerStyle {
    pub background: [u8; 3],
    pub water_tint: [u8; 3],
    pub river_tint: [u8; 3],
    pub border_color: [u8; 4],
    pub selection_color: [u8; 3],
    pub selection_opacity: f32,
    pub label_fill: [u8; 4],
    pub label_outline: [u8; 4],
    pub terrain_opacity: f32,
    pub water_opacity: f32,
    pub political_opacity: f32,
    pub river_opacity: f32,
    pub border_opacity: f32,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            background: [0x33, 0x4a, 0x5e],
            water_tint: [64, 164, 223],
            river_tint: [0x28, 0x3a, 0x4a],
            border_color: [0, 0, 0, 178],
            selection_color: [255, 255, 240],
            selection_opacity: 0.7,
            label_fill: [255, 255, 255, 255],
            label_outline: [0, 0, 0, 255],
            terrain_opacity: 0.4,
            water_opacity: 1.0,
            political_opacity: 0.85,
            river_opacity: 0.7,
            border_opacity: 1.0,
        }
    }
}

/// Selection highlight opacity over a 1.5 s pulse cycle.
pub fn selection_pulse(elapsed_ms: f64) -> f32 {
    let progress = elapsed_ms.rem_euclid(1500.0) / 1500.0;
    ((progress * PI).sin() * 0.4 + 0.3) as f32
}

/// Static layers prepared once per asset load.
#[derive(Debug, Clone, Default)]
pub struct BaseLayers {
    pub terrain: Option<RgbaImage>,
    pub water: Option<RgbaImage>,
    pub rivers: Option<RgbaImage>,
}

impl BaseLayers {
    pub fn prepare(
        terrain: Option<&RgbaImage>,
        water: Option<&RgbaImage>,
        rivers: Option<&RgbaImage>,
        index: &ProvinceIndex,
        style: &LayerStyle,
    ) -> Self {
        Self {
            terrain: terrain.map(|t| mask_by_province(t, index, false)),
            water: water.map(|w| mask_by_province(w, index, true)),
            rivers: rivers.map(|r| recolor(r, style.river_tint)),
        }
    }
}

/// Keeps only the pixels over land provinces (or water provinces when
/// `water` is set); everything else becomes transparent.
pub fn mask_by_province(src: &RgbaImage, index: &ProvinceIndex, water: bool) -> RgbaImage {
    let mut out = src.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let keep = index
            .slot_at(x, y)
            .and_then(|slot| index.province(slot))
            .is_some_and(|p| p.is_water() == water);
        if !keep {
            px[3] = 0;
        }
    }
    out
}

/// Replaces every colour with `tint`, keeping the source alpha.
pub fn recolor(src: &RgbaImage, tint: [u8; 3]) -> RgbaImage {
    let mut out = src.clone();
    for px in out.pixels_mut() {
        px[0] = tint[0];
        px[1] = tint[1];
        px[2] = tint[2];
    }
    out
}

/// Selected province outline with its current opacity.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub outline: &'a [(u32, u32)],
    pub opacity: f32,
}

/// Everything drawn in one frame.
pub struct Frame<'a> {
    pub base: &'a BaseLayers,
    pub political: Option<&'a RgbaImage>,
    pub borders: Option<&'a RgbaImage>,
    pub selection: Option<Selection<'a>>,
    pub labels: &'a [PlacedLabel],
    pub text: Option<&'a TextRenderer>,
}

/// Source-over blend of `src` with its alpha scaled by `opacity` (or glyph
/// coverage).
#[inline]
pub(crate) fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let a = src[3] as f32 / 255.0 * opacity.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    for i in 0..3 {
        dst[i] = (src[i] as f32 * a + dst[i] as f32 * (1.0 - a)).round() as u8;
    }
    dst[3] = (a * 255.0 + dst[3] as f32 * (1.0 - a)).round().min(255.0) as u8;
}

/// World pixels covered by the selection, as 3x3 blocks around each
/// outline pixel.
struct SelectionMask {
    min_x: i64,
    min_y: i64,
    width: i64,
    height: i64,
    cells: Vec<bool>,
}

impl SelectionMask {
    fn new(outline: &[(u32, u32)]) -> Option<Self> {
        let min_x = outline.iter().map(|p| p.0).min()? as i64 - 1;
        let min_y = outline.iter().map(|p| p.1).min()? as i64 - 1;
        let max_x = outline.iter().map(|p| p.0).max()? as i64 + 1;
        let max_y = outline.iter().map(|p| p.1).max()? as i64 + 1;
        let (width, height) = (max_x - min_x + 1, max_y - min_y + 1);
        let mut cells = vec![false; (width * height) as usize];
        for &(x, y) in outline {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let cx = x as i64 + dx - min_x;
                    let cy = y as i64 + dy - min_y;
                    cells[(cy * width + cx) as usize] = true;
                }
            }
        }
        Some(Self {
            min_x,
            min_y,
            width,
            height,
            cells,
        })
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        let (cx, cy) = (x - self.min_x, y - self.min_y);
        cx >= 0 && cy >= 0 && cx < self.width && cy < self.height && self.cells[(cy * self.width + cx) as usize]
    }
}

/// Renders one frame at the camera's viewport size.
pub fn composite(frame: &Frame<'_>, camera: &Camera, style: &LayerStyle) -> RgbaImage {
    let (vw, vh) = camera.viewport();
    let (vw, vh) = (vw.max(0.0) as u32, vh.max(0.0) as u32);
    let (world_w, world_h) = camera.world_size();
    let (world_w, world_h) = (world_w as i64, world_h as i64);

    let [br, bg, bb] = style.background;
    let mut out = RgbaImage::from_pixel(vw, vh, Rgba([br, bg, bb, 255]));

    let raster_layers: Vec<(&RgbaImage, f32)> = [
        (frame.base.terrain.as_ref(), style.terrain_opacity),
        (frame.base.water.as_ref(), style.water_opacity),
        (frame.political, style.political_opacity),
        (frame.base.rivers.as_ref(), style.river_opacity),
        (frame.borders, style.border_opacity),
    ]
    .into_iter()
    .filter_map(|(layer, opacity)| layer.map(|l| (l, opacity)))
    .collect();

    let selection = frame
        .selection
        .and_then(|s| SelectionMask::new(s.outline).map(|m| (m, s.opacity)));
    let [sr, sg, sb] = style.selection_color;
    let selection_color = Rgba([sr, sg, sb, 255]);

    for sy in 0..vh {
        let wy = ((sy as f64 + 0.5 - camera.y) / camera.zoom).floor() as i64;
        if wy < 0 || wy >= world_h {
            continue;
        }
        for sx in 0..vw {
            let wx = ((sx as f64 + 0.5 - camera.x) / camera.zoom).floor() as i64;
            if wx < 0 || wx >= world_w {
                continue;
            }
            let dst = out.get_pixel_mut(sx, sy);
            for &(layer, opacity) in &raster_layers {
                if let Some(src) = layer.get_pixel_checked(wx as u32, wy as u32) {
                    blend(dst, *src, opacity);
                }
            }
            if let Some((mask, opacity)) = &selection
                && mask.contains(wx, wy)
            {
                blend(dst, selection_color, *opacity);
            }
        }
    }

    if let Some(text) = frame.text {
        let fill = Rgba(style.label_fill);
        let outline = Rgba(style.label_outline);
        for label in frame.labels {
            let (x, y) = camera.world_to_screen((label.x, label.y));
            let px = label.font_size * camera.zoom as f32;
            if px < 1.0 {
                continue;
            }
            text.draw_label(
                &mut out,
                &label.text,
                (x as f32, y as f32),
                px,
                label.letter_spacing * camera.zoom as f32,
                fill,
                outline,
            );
        }
    }

    debug!(
        "Composited {}x{} frame: {} raster layers, {} labels",
        vw,
        vh,
        raster_layers.len(),
        frame.labels.len()
    );
    out
}

/// Coalesces redraw requests so at most one render runs per frame.
#[derive(Debug, Clone, Default)]
pub struct RedrawScheduler {
    pending: bool,
}

impl RedrawScheduler {
    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Called once per display frame; `true` means render now.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}
