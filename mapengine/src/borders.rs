//! Country borders and single-province outlines from 4-neighbour tests.

use image::{Rgba, RgbaImage};
use log::{debug, info};
use mapdata::{ProvinceId, ProvinceIndex};
use std::collections::HashMap;

use crate::job::{Progress, RowCursor};
use crate::world::{SlotOwners, World};

/// Raster pixels on a boundary, as a mask plus an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderSet {
    width: u32,
    height: u32,
    mask: Vec<bool>,
    pixels: Vec<(u32, u32)>,
}

impl BorderSet {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mask: vec![false; width as usize * height as usize],
            pixels: Vec::new(),
        }
    }

    fn mark(&mut self, x: u32, y: u32) {
        let i = y as usize * self.width as usize + x as usize;
        if !self.mask[i] {
            self.mask[i] = true;
            self.pixels.push((x, y));
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.mask[y as usize * self.width as usize + x as usize]
    }

    /// Border pixels in row-major discovery order.
    pub fn pixels(&self) -> &[(u32, u32)] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Draws each border pixel as a 2x2 block in `color`.
    pub fn to_layer(&self, color: Rgba<u8>) -> RgbaImage {
        let mut img = RgbaImage::new(self.width, self.height);
        for &(x, y) in &self.pixels {
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (px, py) = (x + dx, y + dy);
                if px < self.width && py < self.height {
                    img.put_pixel(px, py, color);
                }
            }
        }
        img
    }
}

/// Incremental country-border scan.
///
/// A land pixel is a border pixel when a 4-neighbour belongs to a different
/// province with a different owner. Water and background neighbours never
/// count, so coastlines are not political borders.
#[derive(Debug, Clone)]
pub struct BorderJob {
    cursor: RowCursor,
    owners: SlotOwners,
    set: BorderSet,
}

impl BorderJob {
    pub fn new(world: &World) -> Self {
        let (width, height) = world.index.dimensions();
        Self {
            cursor: RowCursor::new(height),
            owners: world.slot_owners(),
            set: BorderSet::new(width, height),
        }
    }

    pub fn step(&mut self, world: &World, budget: usize) -> Progress {
        let (width, height) = world.index.dimensions();
        let Some(rows) = self.cursor.next_band(width, budget) else {
            return self.cursor.progress();
        };
        let slots = world.index.slots();
        let w = width as usize;
        for y in rows.clone() {
            for x in 0..width {
                let i = y as usize * w + x as usize;
                let slot = slots[i];
                let code = self.owners.code(slot);
                if code == SlotOwners::WATER || code == SlotOwners::BACKGROUND {
                    continue;
                }
                let neighbours = [
                    (x > 0).then(|| i - 1),
                    (x + 1 < width).then(|| i + 1),
                    (y > 0).then(|| i - w),
                    (y + 1 < height).then(|| i + w),
                ];
                let on_border = neighbours.into_iter().flatten().any(|j| {
                    let other = slots[j];
                    if other == slot {
                        return false;
                    }
                    let other_code = self.owners.code(other);
                    other_code != SlotOwners::WATER
                        && other_code != SlotOwners::BACKGROUND
                        && other_code != code
                });
                if on_border {
                    self.set.mark(x, y);
                }
            }
        }
        debug!("Border scan rows {}..{}", rows.start, rows.end);
        self.cursor.progress()
    }

    pub fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    pub fn finish(mut self, world: &World) -> BorderSet {
        while !self.step(world, usize::MAX).is_complete() {}
        info!("Country borders built: {} pixels", self.set.len());
        self.set
    }
}

/// One-shot country border build.
pub fn build_country_borders(world: &World) -> BorderSet {
    BorderJob::new(world).finish(world)
}

/// Edge pixels of one province: pixels with a 4-neighbour in any other
/// province, the background, or off the raster.
pub fn province_outline(index: &ProvinceIndex, id: ProvinceId) -> Vec<(u32, u32)> {
    let (Some(slot), Some(bounds)) = (index.slot_of(id), index.by_id(id).and_then(|p| p.bounds))
    else {
        return Vec::new();
    };
    let same = |x: i64, y: i64| -> bool {
        x >= 0
            && y >= 0
            && index.slot_at(x as u32, y as u32) == Some(slot)
    };

    let mut outline = Vec::new();
    for y in bounds.min_y..=bounds.max_y {
        for x in bounds.min_x..=bounds.max_x {
            if index.slot_at(x, y) != Some(slot) {
                continue;
            }
            let (xi, yi) = (x as i64, y as i64);
            if !(same(xi - 1, yi) && same(xi + 1, yi) && same(xi, yi - 1) && same(xi, yi + 1)) {
                outline.push((x, y));
            }
        }
    }
    outline
}

/// Outlines computed on first request and kept per province id.
#[derive(Debug, Clone, Default)]
pub struct OutlineCache {
    outlines: HashMap<ProvinceId, Vec<(u32, u32)>>,
}

impl OutlineCache {
    pub fn get(&mut self, index: &ProvinceIndex, id: ProvinceId) -> &[(u32, u32)] {
        self.outlines
            .entry(id)
            .or_insert_with(|| province_outline(index, id))
    }

    pub fn is_cached(&self, id: ProvinceId) -> bool {
        self.outlines.contains_key(&id)
    }

    pub fn invalidate(&mut self, id: ProvinceId) {
        self.outlines.remove(&id);
    }

    pub fn clear(&mut self) {
        self.outlines.clear();
    }
}
