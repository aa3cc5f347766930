use image::Rgba;
use std::fmt;

/// An RGB triple packed as `r << 16 | g << 8 | b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorKey(u32);

impl ColorKey {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        ColorKey(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Alpha is ignored; callers decide what a transparent pixel means.
    pub fn from_pixel(px: &Rgba<u8>) -> Self {
        Self::from_rgb(px[0], px[1], px[2])
    }

    pub const fn rgb(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    pub const fn packed(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.rgb();
        write!(f, "{},{},{}", r, g, b)
    }
}

/// Parses `#RRGGBB` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Deterministic colour for a country that has no entry in the colour table.
///
/// Hashes the tag (djb2) onto a hue and converts from HSV with fixed
/// saturation and value so fallback colours stay readable.
pub fn fallback_country_color(tag: &str) -> [u8; 3] {
    let mut hash: u32 = 5381;
    for byte in tag.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u32);
    }

    let hue = (hash % 360) as f32;
    let sat = 0.7;
    let val = 0.8;

    let c = val * sat;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = val - c;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    ]
}
