//! Synthetic worlds for unit tests.
//!
//! Maps are drawn as ASCII art: each letter is a land province (id = the
//! character code), `~` and `=` are water provinces, `.` is a transparent
//! background pixel.

use image::{Rgba, RgbaImage};
use mapdata::{
    ColorKey, CountryTable, OwnershipMap, ProvinceId, ProvinceIndex, RegionCategory,
    RegionDefinition,
};

use crate::text::TextRenderer;
use crate::world::World;

pub const RED: [u8; 3] = [220, 20, 60];
pub const GRN: [u8; 3] = [34, 139, 34];
pub const BLU: [u8; 3] = [30, 60, 200];

pub fn province_id(c: char) -> ProvinceId {
    c as ProvinceId
}

pub fn province_color(c: char) -> [u8; 3] {
    [c as u8, 10, 20]
}

/// Builds a world from ASCII rows and `(province char, owner tag)` pairs.
pub fn grid_world(rows: &[&str], owners: &[(char, &str)]) -> World {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, |r| r.chars().count()) as u32;

    let mut chars: Vec<char> = rows
        .iter()
        .flat_map(|r| r.chars())
        .filter(|&c| c != '.')
        .collect();
    chars.sort_unstable();
    chars.dedup();

    let definitions: Vec<RegionDefinition> = chars
        .iter()
        .map(|&c| {
            let [r, g, b] = province_color(c);
            RegionDefinition {
                id: province_id(c),
                color: ColorKey::from_rgb(r, g, b),
                category: if c == '~' || c == '=' {
                    RegionCategory::Sea
                } else {
                    RegionCategory::Land
                },
                coastal: false,
                terrain: "plains".into(),
                continent: String::new(),
            }
        })
        .collect();

    let raster = RgbaImage::from_fn(width, height, |x, y| {
        let c = rows[y as usize].chars().nth(x as usize).unwrap_or('.');
        if c == '.' {
            Rgba([0, 0, 0, 0])
        } else {
            let [r, g, b] = province_color(c);
            Rgba([r, g, b, 255])
        }
    });

    let index = ProvinceIndex::build(&definitions, &raster).unwrap();
    let ownership: OwnershipMap = owners
        .iter()
        .map(|&(c, tag)| (province_id(c), tag.to_string()))
        .collect();
    World::new(index, ownership, countries())
}

pub fn countries() -> CountryTable {
    let mut table = CountryTable::new();
    table.insert("RED", "Red Kingdom", RED);
    table.insert("GRN", "Green Union", GRN);
    table.insert("BLU", "Blue Empire", BLU);
    table
}

/// 4x4 raster: province `A` on the left half owned by RED, province `B` on
/// the right half owned by GRN.
pub fn two_country_world() -> World {
    grid_world(
        &["AABB", "AABB", "AABB", "AABB"],
        &[('A', "RED"), ('B', "GRN")],
    )
}

/// Renderer over the bundled DejaVu Sans Mono test font.
pub fn test_font() -> TextRenderer {
    TextRenderer::new(include_bytes!("../tests/data/DejaVuSansMono.ttf").to_vec()).unwrap()
}
