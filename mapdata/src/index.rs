//! Colour-keyed province index over the province-identity raster.
//!
//! The raster is decoded once into a dense buffer of province slots so that
//! full-raster passes (political colouring, borders, label sampling) can read
//! a `u32` per pixel instead of re-hashing colours.

use image::RgbaImage;
use log::info;
use std::collections::HashMap;

use crate::ProvinceId;
use crate::color::ColorKey;
use crate::definitions::{RegionCategory, RegionDefinition};
use crate::error::DataError;

/// Slot value for pixels that resolve to no region.
pub const NO_SLOT: u32 = u32::MAX;

/// Inclusive pixel bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelRect {
    pub fn point(x: u32, y: u32) -> Self {
        PixelRect {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// A discrete map region. Immutable once the index is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Province {
    pub id: ProvinceId,
    pub color: ColorKey,
    pub category: RegionCategory,
    pub coastal: bool,
    pub terrain: String,
    pub continent: String,
    /// Number of raster pixels carrying this region's colour.
    pub pixel_count: u64,
    /// Tight bounds of those pixels; `None` if the colour never appears.
    pub bounds: Option<PixelRect>,
}

impl Province {
    pub fn is_water(&self) -> bool {
        self.category.is_water()
    }
}

#[derive(Debug, Clone)]
pub struct ProvinceIndex {
    width: u32,
    height: u32,
    provinces: Vec<Province>,
    by_color: HashMap<ColorKey, u32>,
    by_id: HashMap<ProvinceId, u32>,
    slots: Vec<u32>,
}

impl ProvinceIndex {
    /// Builds the index in one go. See [`IndexBuilder`] for the incremental form.
    pub fn build(definitions: &[RegionDefinition], raster: &RgbaImage) -> Result<Self, DataError> {
        let mut builder = IndexBuilder::new(definitions, raster)?;
        while !builder.step(u32::MAX) {}
        Ok(builder.finish())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resolves an integer pixel coordinate. Out of bounds, transparent and
    /// unknown colours all yield `None`.
    pub fn lookup(&self, x: i64, y: i64) -> Option<&Province> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        self.slot_at(x as u32, y as u32)
            .and_then(|slot| self.province(slot))
    }

    /// Resolves a world-space position (floored to the containing pixel).
    pub fn lookup_world(&self, x: f64, y: f64) -> Option<&Province> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        self.lookup(x.floor() as i64, y.floor() as i64)
    }

    /// Slot of the pixel at `(x, y)`, or `None` for background and out of bounds.
    #[inline]
    pub fn slot_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let slot = self.slots[(y as usize) * (self.width as usize) + x as usize];
        (slot != NO_SLOT).then_some(slot)
    }

    /// Dense per-pixel slot buffer in row-major order, [`NO_SLOT`] for background.
    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    pub fn province(&self, slot: u32) -> Option<&Province> {
        self.provinces.get(slot as usize)
    }

    pub fn slot_count(&self) -> usize {
        self.provinces.len()
    }

    pub fn slot_of(&self, id: ProvinceId) -> Option<u32> {
        self.by_id.get(&id).copied()
    }

    pub fn by_id(&self, id: ProvinceId) -> Option<&Province> {
        self.slot_of(id).and_then(|slot| self.province(slot))
    }

    pub fn by_color(&self, color: ColorKey) -> Option<&Province> {
        self.by_color
            .get(&color)
            .and_then(|&slot| self.province(slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Province> {
        self.provinces.iter()
    }

    pub fn land_provinces(&self) -> impl Iterator<Item = &Province> {
        self.provinces.iter().filter(|p| !p.is_water())
    }
}

/// Incremental index construction, one band of rows per [`step`](Self::step).
///
/// Colour registration (and the duplicate-colour check) happens up front in
/// [`new`](Self::new), so a builder only exists for a consistent table.
pub struct IndexBuilder<'a> {
    raster: &'a RgbaImage,
    provinces: Vec<Province>,
    by_color: HashMap<ColorKey, u32>,
    by_id: HashMap<ProvinceId, u32>,
    slots: Vec<u32>,
    next_row: u32,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(definitions: &[RegionDefinition], raster: &'a RgbaImage) -> Result<Self, DataError> {
        let mut provinces = Vec::with_capacity(definitions.len());
        let mut by_color = HashMap::with_capacity(definitions.len());
        let mut by_id = HashMap::with_capacity(definitions.len());

        for def in definitions {
            let slot = provinces.len() as u32;
            if let Some(&existing) = by_color.get(&def.color) {
                let first: &Province = &provinces[existing as usize];
                return Err(DataError::DuplicateColor {
                    color: def.color,
                    first: first.id,
                    second: def.id,
                });
            }
            if by_id.insert(def.id, slot).is_some() {
                return Err(DataError::DuplicateRegionId(def.id));
            }
            by_color.insert(def.color, slot);
            provinces.push(Province {
                id: def.id,
                color: def.color,
                category: def.category.clone(),
                coastal: def.coastal,
                terrain: def.terrain.clone(),
                continent: def.continent.clone(),
                pixel_count: 0,
                bounds: None,
            });
        }

        let pixel_total = raster.width() as usize * raster.height() as usize;
        Ok(IndexBuilder {
            raster,
            provinces,
            by_color,
            by_id,
            slots: Vec::with_capacity(pixel_total),
            next_row: 0,
        })
    }

    pub fn rows_done(&self) -> u32 {
        self.next_row
    }

    /// Decodes up to `max_rows` rows. Returns `true` once the whole raster is done.
    pub fn step(&mut self, max_rows: u32) -> bool {
        let raster = self.raster;
        let (width, height) = raster.dimensions();
        let end = self.next_row.saturating_add(max_rows.max(1)).min(height);

        // Provinces are large flat fills, so consecutive pixels usually share a colour.
        let mut last: Option<(ColorKey, u32)> = None;
        for y in self.next_row..end {
            for x in 0..width {
                let px = raster.get_pixel(x, y);
                if px[3] == 0 {
                    self.slots.push(NO_SLOT);
                    continue;
                }
                let key = ColorKey::from_pixel(px);
                let slot = match last {
                    Some((k, s)) if k == key => s,
                    _ => {
                        let s = self.by_color.get(&key).copied().unwrap_or(NO_SLOT);
                        last = Some((key, s));
                        s
                    }
                };
                self.slots.push(slot);
                if slot != NO_SLOT {
                    let province = &mut self.provinces[slot as usize];
                    province.pixel_count += 1;
                    match &mut province.bounds {
                        Some(b) => b.include(x, y),
                        None => province.bounds = Some(PixelRect::point(x, y)),
                    }
                }
            }
        }
        self.next_row = end;
        self.next_row >= height
    }

    pub fn finish(mut self) -> ProvinceIndex {
        while !self.step(u32::MAX) {}
        let (width, height) = self.raster.dimensions();
        let assigned = self.slots.iter().filter(|&&s| s != NO_SLOT).count();
        info!(
            "Province index built: {} regions, {}/{} pixels assigned ({}x{})",
            self.provinces.len(),
            assigned,
            self.slots.len(),
            width,
            height
        );
        ProvinceIndex {
            width,
            height,
            provinces: self.provinces,
            by_color: self.by_color,
            by_id: self.by_id,
            slots: self.slots,
        }
    }
}
