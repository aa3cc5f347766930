//! Country label placement.
//!
//! Each country's anchor is the centre of the largest axis-aligned rectangle
//! that fits inside its territory, searched on a coarse occupancy grid built
//! from sparse samples. Which anchors are drawn, and how large, is decided
//! per frame by [`select_visible`].

use log::{debug, info};
use mapdata::{CountryTag, ProvinceIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::job::Progress;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStep {
    /// Applies when the territory's smaller extent is below this many pixels.
    pub below: u32,
    pub cell: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Spacing of the sample lattice used to find each territory's extent.
    pub sample_stride: u32,
    /// Grid cell size by territory extent, checked in order.
    pub cell_steps: Vec<CellStep>,
    /// Cell size when no step matches.
    pub max_cell: u32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        let step = |below, cell| CellStep { below, cell };
        Self {
            sample_stride: 50,
            cell_steps: vec![step(100, 10), step(250, 20), step(500, 30), step(1000, 40)],
            max_cell: 50,
        }
    }
}

impl LabelConfig {
    /// Larger territories get coarser grids.
    pub fn cell_size(&self, extent: u32) -> u32 {
        self.cell_steps
            .iter()
            .find(|s| extent < s.below)
            .map_or(self.max_cell, |s| s.cell)
            .max(1)
    }
}

/// Boolean grid, `true` where the cell's sample point is inside the territory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut grid = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                grid.set(x, y, f(x, y));
            }
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.cells[(y * self.width + x) as usize] = value;
        }
    }
}

/// Rectangle in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl GridRect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Largest rectangle under a histogram (monotonic stack sweep). The result's
/// `y` is always 0; on equal areas the first one found is kept.
pub fn largest_rectangle_in_histogram(heights: &[u32]) -> GridRect {
    let mut stack: Vec<usize> = Vec::with_capacity(heights.len());
    let mut best = GridRect::default();

    for i in 0..=heights.len() {
        let h = heights.get(i).copied().unwrap_or(0);
        while let Some(&top) = stack.last() {
            if h >= heights[top] {
                break;
            }
            stack.pop();
            let height = heights[top];
            let left = stack.last().map_or(0, |&s| s + 1);
            let width = (i - left) as u32;
            let candidate = GridRect {
                x: left as u32,
                y: 0,
                width,
                height,
            };
            if candidate.area() > best.area() {
                best = candidate;
            }
        }
        stack.push(i);
    }
    best
}

/// Largest all-`true` rectangle in the grid, one histogram sweep per row.
pub fn largest_inscribed_rectangle(grid: &OccupancyGrid) -> GridRect {
    let mut heights = vec![0u32; grid.width() as usize];
    let mut best = GridRect::default();

    for row in 0..grid.height() {
        for (col, h) in heights.iter_mut().enumerate() {
            *h = if grid.get(col as u32, row) { *h + 1 } else { 0 };
        }
        let rect = largest_rectangle_in_histogram(&heights);
        if rect.area() > best.area() {
            best = GridRect {
                y: row + 1 - rect.height,
                ..rect
            };
        }
    }
    best
}

/// World-space label anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

/// Bounding box of a country's lattice samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledExtent {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub samples: u32,
}

impl SampledExtent {
    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.samples += 1;
    }
}

/// Owner of the land province under a pixel.
fn land_owner<'w>(world: &'w World, index: &ProvinceIndex, x: u32, y: u32) -> Option<&'w str> {
    let slot = index.slot_at(x, y)?;
    if index.province(slot)?.is_water() {
        return None;
    }
    world.owner_of_slot(slot)
}

/// One pass over the sample lattice collecting each country's extent.
/// With `only`, other countries are ignored.
pub fn sample_extents(
    world: &World,
    stride: u32,
    only: Option<&BTreeSet<CountryTag>>,
) -> BTreeMap<CountryTag, SampledExtent> {
    let (width, height) = world.index.dimensions();
    let stride = stride.max(1) as usize;
    let mut extents: BTreeMap<CountryTag, SampledExtent> = BTreeMap::new();

    for y in (0..height).step_by(stride) {
        for x in (0..width).step_by(stride) {
            let Some(tag) = land_owner(world, &world.index, x, y) else {
                continue;
            };
            if only.is_some_and(|set| !set.contains(tag)) {
                continue;
            }
            match extents.get_mut(tag) {
                Some(extent) => extent.include(x, y),
                None => {
                    extents.insert(
                        tag.to_string(),
                        SampledExtent {
                            min_x: x,
                            min_y: y,
                            max_x: x,
                            max_y: y,
                            samples: 1,
                        },
                    );
                }
            }
        }
    }
    extents
}

/// Anchor for one country, or `None` when no rectangle fits.
pub fn compute_anchor(
    world: &World,
    tag: &str,
    extent: &SampledExtent,
    config: &LabelConfig,
) -> Option<Anchor> {
    let (map_w, map_h) = world.index.dimensions();
    let width = extent.max_x - extent.min_x;
    let height = extent.max_y - extent.min_y;
    let cell = config.cell_size(width.min(height));

    let grid = OccupancyGrid::from_fn(width.div_ceil(cell), height.div_ceil(cell), |gx, gy| {
        let x = extent.min_x + gx * cell;
        let y = extent.min_y + gy * cell;
        x < map_w && y < map_h && land_owner(world, &world.index, x, y) == Some(tag)
    });

    let rect = largest_inscribed_rectangle(&grid);
    if rect.area() == 0 {
        return None;
    }
    let cell = cell as f64;
    Some(Anchor {
        x: extent.min_x as f64 + rect.x as f64 * cell + rect.width as f64 * cell / 2.0,
        y: extent.min_y as f64 + rect.y as f64 * cell + rect.height as f64 * cell / 2.0,
    })
}

/// Anchors for every owning country in one go.
pub fn compute_anchors(world: &World, config: &LabelConfig) -> BTreeMap<CountryTag, Anchor> {
    sample_extents(world, config.sample_stride, None)
        .iter()
        .filter_map(|(tag, extent)| {
            compute_anchor(world, tag, extent, config).map(|a| (tag.clone(), a))
        })
        .collect()
}

/// Per-country anchor cache. Ownership changes mark the countries involved
/// dirty; [`step`](Self::step) recomputes a few of them at a time.
#[derive(Debug, Clone, Default)]
pub struct LabelCache {
    anchors: BTreeMap<CountryTag, Anchor>,
    dirty: BTreeSet<CountryTag>,
    done: u32,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self, tag: &str) {
        self.dirty.insert(tag.to_string());
    }

    /// Every owning country plus every cached anchor needs recomputing.
    pub fn mark_all_dirty(&mut self, world: &World) {
        self.dirty
            .extend(world.ownership.countries().into_iter().map(str::to_string));
        self.dirty.extend(self.anchors.keys().cloned());
    }

    pub fn is_ready(&self) -> bool {
        self.dirty.is_empty()
    }

    pub fn anchors(&self) -> &BTreeMap<CountryTag, Anchor> {
        &self.anchors
    }

    pub fn anchor(&self, tag: &str) -> Option<Anchor> {
        self.anchors.get(tag).copied()
    }

    /// Recomputes up to `max_countries` dirty anchors.
    pub fn step(&mut self, world: &World, config: &LabelConfig, max_countries: usize) -> Progress {
        let mut batch = BTreeSet::new();
        while batch.len() < max_countries.max(1) {
            match self.dirty.pop_first() {
                Some(tag) => {
                    batch.insert(tag);
                }
                None => break,
            }
        }
        if batch.is_empty() {
            return Progress::Complete;
        }

        let extents = sample_extents(world, config.sample_stride, Some(&batch));
        for tag in &batch {
            let anchor = extents
                .get(tag)
                .and_then(|extent| compute_anchor(world, tag, extent, config));
            match anchor {
                Some(anchor) => {
                    self.anchors.insert(tag.clone(), anchor);
                }
                None => {
                    self.anchors.remove(tag);
                }
            }
        }
        self.done += batch.len() as u32;
        debug!("Recomputed {} label anchors", batch.len());

        if self.dirty.is_empty() {
            info!("Label anchors ready: {} countries", self.anchors.len());
            self.done = 0;
            Progress::Complete
        } else {
            Progress::Pending {
                done: self.done,
                total: self.done + self.dirty.len() as u32,
            }
        }
    }

    pub fn finish(&mut self, world: &World, config: &LabelConfig) {
        while !self.step(world, config, usize::MAX).is_complete() {}
    }
}

/// Text measurement used for label boxes.
pub trait GlyphMetrics {
    /// Advance width of `text` at `px` pixels, without extra letter spacing.
    fn text_width(&self, text: &str, px: f32) -> f32;
}

/// Fixed-advance estimate for when no font is loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMetrics;

impl GlyphMetrics for ApproxMetrics {
    fn text_width(&self, text: &str, px: f32) -> f32 {
        text.chars().count() as f32 * px * 0.6
    }
}

/// Label candidate: a country with an anchor and its territory size.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    pub tag: CountryTag,
    pub name: String,
    pub anchor: Anchor,
    /// Number of provinces owned.
    pub size: usize,
}

/// A label accepted for drawing. Coordinates and sizes are world units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLabel {
    pub tag: CountryTag,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f32,
    pub letter_spacing: f32,
    /// Collision box, centred on `(x, y)`.
    pub width: f32,
    pub height: f32,
    pub size: usize,
}

impl PlacedLabel {
    /// True when the boxes are more than `padding` apart on some axis.
    pub fn separated(&self, other: &PlacedLabel, padding: f32) -> bool {
        let gap = |c1: f64, s1: f32, c2: f64, s2: f32| {
            let a = (c1 - s1 as f64 / 2.0, c1 + s1 as f64 / 2.0);
            let b = (c2 - s2 as f64 / 2.0, c2 + s2 as f64 / 2.0);
            (b.0 - a.1).max(a.0 - b.1)
        };
        let padding = padding as f64;
        gap(self.x, self.width, other.x, other.width) > padding
            || gap(self.y, self.height, other.y, other.height) > padding
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CullRule {
    /// Applies while zoom is below this value.
    pub below_zoom: f64,
    /// Territories smaller than this are hidden.
    pub min_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub base_font: f32,
    pub font_range: f32,
    pub min_font: f32,
    pub max_font: f32,
    pub base_spacing: f32,
    pub spacing_range: f32,
    pub box_margin_x: f32,
    pub box_margin_y: f32,
    pub padding: f32,
    pub cull: Vec<CullRule>,
    /// Font multiplier when zoomed far out, zoomed out, and zoomed in.
    pub far_zoom: (f64, f32),
    pub mid_zoom: (f64, f32),
    pub near_zoom: (f64, f32),
}

impl Default for LabelStyle {
    fn default() -> Self {
        let cull = |below_zoom, min_size| CullRule {
            below_zoom,
            min_size,
        };
        Self {
            base_font: 16.0,
            font_range: 32.0,
            min_font: 14.0,
            max_font: 56.0,
            base_spacing: 4.0,
            spacing_range: 12.0,
            box_margin_x: 40.0,
            box_margin_y: 25.0,
            padding: 25.0,
            cull: vec![cull(0.5, 100), cull(1.0, 30), cull(2.0, 10)],
            far_zoom: (0.5, 2.0),
            mid_zoom: (1.0, 1.5),
            near_zoom: (3.0, 0.8),
        }
    }
}

impl LabelStyle {
    pub fn is_culled(&self, zoom: f64, size: usize) -> bool {
        self.cull
            .iter()
            .any(|rule| zoom < rule.below_zoom && size < rule.min_size)
    }

    pub fn zoom_scale(&self, zoom: f64) -> f32 {
        if zoom < self.far_zoom.0 {
            self.far_zoom.1
        } else if zoom < self.mid_zoom.0 {
            self.mid_zoom.1
        } else if zoom > self.near_zoom.0 {
            self.near_zoom.1
        } else {
            1.0
        }
    }
}

/// Candidates for every anchored country, named from the colour table.
pub fn candidates(world: &World, anchors: &BTreeMap<CountryTag, Anchor>) -> Vec<LabelCandidate> {
    let territories = world.ownership.territories();
    anchors
        .iter()
        .map(|(tag, &anchor)| LabelCandidate {
            tag: tag.clone(),
            name: world.countries.name_of(tag).to_string(),
            anchor,
            size: territories.get(tag.as_str()).map_or(0, Vec::len),
        })
        .collect()
}

/// Smallest and largest territory, in provinces, over every owning country
/// whether or not it has an anchor. `None` when nothing is owned.
pub fn territory_size_range(world: &World) -> Option<(usize, usize)> {
    let territories = world.ownership.territories();
    let min = territories.values().map(Vec::len).min()?;
    let max = territories.values().map(Vec::len).max()?;
    Some((min, max))
}

/// Sizes, culls and de-overlaps labels for the current zoom. Font size is
/// normalised over `sizes`, the `(min, max)` territory size. Larger
/// territories are placed first and win contested space.
pub fn select_visible(
    candidates: &[LabelCandidate],
    sizes: (usize, usize),
    zoom: f64,
    metrics: &dyn GlyphMetrics,
    style: &LabelStyle,
) -> Vec<PlacedLabel> {
    let (min, max) = sizes;

    let mut labels: Vec<PlacedLabel> = candidates
        .iter()
        .filter(|c| !style.is_culled(zoom, c.size))
        .map(|c| {
            let ratio = if max <= min {
                1.0
            } else {
                (c.size.saturating_sub(min) as f32 / (max - min) as f32).min(1.0)
            };
            let font_size = ((style.base_font + ratio * style.font_range) * style.zoom_scale(zoom))
                .clamp(style.min_font, style.max_font);
            let letter_spacing = style.base_spacing + ratio * style.spacing_range;
            let text = c.name.to_uppercase();
            let gaps = text.chars().count().saturating_sub(1) as f32;
            let text_width = metrics.text_width(&text, font_size) + letter_spacing * gaps;
            PlacedLabel {
                tag: c.tag.clone(),
                text,
                x: c.anchor.x,
                y: c.anchor.y,
                font_size,
                letter_spacing,
                width: text_width + style.box_margin_x,
                height: font_size + style.box_margin_y,
                size: c.size,
            }
        })
        .collect();

    labels.sort_by(|a, b| b.size.cmp(&a.size));

    let mut accepted: Vec<PlacedLabel> = Vec::with_capacity(labels.len());
    for label in labels {
        if accepted
            .iter()
            .all(|placed| label.separated(placed, style.padding))
        {
            accepted.push(label);
        }
    }
    accepted
}
