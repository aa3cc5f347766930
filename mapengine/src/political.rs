//! Political colouring of the province raster.
//!
//! The owner/water decision is made once per province slot and then fanned
//! out over every pixel of that slot.

use image::{Rgba, RgbaImage};
use log::{debug, info};
use mapdata::index::NO_SLOT;

use crate::job::{Progress, RowCursor};
use crate::world::World;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Incremental political map build. Drop and recreate it when ownership
/// changes; partial output is never merged.
#[derive(Debug, Clone)]
pub struct PoliticalJob {
    cursor: RowCursor,
    palette: Vec<Option<Rgba<u8>>>,
    image: RgbaImage,
}

impl PoliticalJob {
    pub fn new(world: &World) -> Self {
        let (width, height) = world.index.dimensions();
        Self {
            cursor: RowCursor::new(height),
            palette: vec![None; world.index.slot_count()],
            image: RgbaImage::new(width, height),
        }
    }

    /// Colours the next band of rows within `budget` pixels.
    pub fn step(&mut self, world: &World, water_tint: [u8; 3], budget: usize) -> Progress {
        let width = world.index.width();
        if let Some(rows) = self.cursor.next_band(width, budget) {
            let slots = world.index.slots();
            for y in rows.clone() {
                let row = y as usize * width as usize;
                for x in 0..width {
                    let slot = slots[row + x as usize];
                    if slot == NO_SLOT {
                        continue;
                    }
                    let color = *self.palette[slot as usize]
                        .get_or_insert_with(|| decide(world, slot, water_tint));
                    if color[3] != 0 {
                        self.image.put_pixel(x, y, color);
                    }
                }
            }
            debug!("Political map rows {}..{}", rows.start, rows.end);
        }
        self.cursor.progress()
    }

    pub fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    /// Finishes any remaining rows and returns the layer.
    pub fn finish(mut self, world: &World, water_tint: [u8; 3]) -> RgbaImage {
        while !self.step(world, water_tint, usize::MAX).is_complete() {}
        let decided = self.palette.iter().filter(|c| c.is_some()).count();
        info!("Political map built ({} province colours)", decided);
        self.image
    }
}

fn decide(world: &World, slot: u32, water_tint: [u8; 3]) -> Rgba<u8> {
    let Some(province) = world.index.province(slot) else {
        return TRANSPARENT;
    };
    if province.is_water() {
        let [r, g, b] = water_tint;
        return Rgba([r, g, b, 255]);
    }
    match world.ownership.owner(province.id) {
        Some(tag) => {
            let [r, g, b] = world.countries.color_of(tag);
            Rgba([r, g, b, 255])
        }
        None => TRANSPARENT,
    }
}

/// One-shot political map build.
pub fn build_political_map(world: &World, water_tint: [u8; 3]) -> RgbaImage {
    PoliticalJob::new(world).finish(world, water_tint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GRN, RED, grid_world, two_country_world};

    const WATER: [u8; 3] = [64, 164, 223];

    #[test]
    fn test_two_country_scenario() {
        let world = two_country_world();
        let img = build_political_map(&world, WATER);
        for (x, _, px) in img.enumerate_pixels() {
            let expected = if x < 2 { RED } else { GRN };
            assert_eq!(px.0, [expected[0], expected[1], expected[2], 255]);
        }
    }

    #[test]
    fn test_water_unowned_and_background() {
        let world = grid_world(&["A~.C"], &[('A', "RED")]);
        let img = build_political_map(&world, WATER);
        assert_eq!(img.get_pixel(0, 0).0, [RED[0], RED[1], RED[2], 255]);
        assert_eq!(img.get_pixel(1, 0).0, [64, 164, 223, 255]);
        assert_eq!(img.get_pixel(2, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(3, 0).0, [0, 0, 0, 0], "unowned land");
    }

    #[test]
    fn test_unknown_owner_gets_fallback_color() {
        let world = grid_world(&["A"], &[('A', "ZZZ")]);
        let img = build_political_map(&world, WATER);
        let [r, g, b] = mapdata::color::fallback_country_color("ZZZ");
        assert_eq!(img.get_pixel(0, 0).0, [r, g, b, 255]);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let world = grid_world(
            &["AAB~", "ACB~", "CCB.", "~~.."],
            &[('A', "RED"), ('B', "GRN"), ('C', "BLU")],
        );
        let first = build_political_map(&world, WATER);
        let second = build_political_map(&world, WATER);
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn test_chunked_matches_one_shot() {
        let world = grid_world(
            &["AAB~", "ACB~", "CCB.", "~~.."],
            &[('A', "RED"), ('B', "GRN")],
        );
        let mut job = PoliticalJob::new(&world);
        let mut steps = 0;
        while !job.step(&world, WATER, 4).is_complete() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert!(job.is_done());
        let chunked = job.finish(&world, WATER);
        assert_eq!(chunked.as_raw(), build_political_map(&world, WATER).as_raw());
    }
}
