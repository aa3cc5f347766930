//! The map coordinator.
//!
//! [`MapEngine`] owns the [`World`] and every cache derived from it. Pointer
//! input goes in through [`MapEngine::handle_pointer`]; notifications for the
//! host come back as [`MapEvent`]s. Long raster passes advance a band at a
//! time in [`MapEngine::tick`], and frames are produced by
//! [`MapEngine::render_if_needed`].

use image::{Rgba, RgbaImage};
use log::{debug, info};
use mapdata::index::IndexBuilder;
use mapdata::{
    CountryRules, CountryTable, CountryTag, ImportReport, MapAssets, OwnershipChange,
    OwnershipMap, Province, ProvinceId,
};
use std::collections::BTreeMap;

use crate::borders::{BorderJob, OutlineCache};
use crate::camera::Camera;
use crate::compositor::{self, BaseLayers, Frame, RedrawScheduler, Selection};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::{GestureMachine, InputCommand, PointerEvent};
use crate::job::{self, Progress};
use crate::labels::{self, Anchor, ApproxMetrics, GlyphMetrics, LabelCache, PlacedLabel};
use crate::political::PoliticalJob;
use crate::text::TextRenderer;
use crate::world::World;

pub use crate::input::InteractionMode;

/// Notifications for the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEvent {
    /// A land province became selected.
    ProvinceClicked(ProvinceId),
    /// The land province under the pointer changed.
    HoverChanged(Option<ProvinceId>),
    OwnershipChanged(OwnershipChange),
}

pub struct MapEngine {
    world: World,
    config: EngineConfig,
    camera: Camera,
    gestures: GestureMachine,
    mode: InteractionMode,
    paint_country: Option<CountryTag>,
    selected: Option<ProvinceId>,
    hovered: Option<ProvinceId>,
    selection_opacity: f32,
    /// Political opacity restored when the layer is toggled back on.
    political_shown: f32,

    base: BaseLayers,
    political_job: Option<PoliticalJob>,
    political: Option<RgbaImage>,
    border_job: Option<BorderJob>,
    borders: Option<RgbaImage>,
    labels: LabelCache,
    outlines: OutlineCache,

    scheduler: RedrawScheduler,
    text: Option<TextRenderer>,
}

impl MapEngine {
    /// Starts every derived layer building; nothing is drawable until
    /// [`tick`](Self::tick) or [`finish_rebuilds`](Self::finish_rebuilds)
    /// has run.
    pub fn new(world: World, base: BaseLayers, viewport: (u32, u32), config: EngineConfig) -> Self {
        let camera = Camera::new(world.index.dimensions(), viewport, &config.camera);
        let mut labels = LabelCache::new();
        labels.mark_all_dirty(&world);
        let mut scheduler = RedrawScheduler::default();
        scheduler.request();

        Self {
            political_job: Some(PoliticalJob::new(&world)),
            border_job: Some(BorderJob::new(&world)),
            gestures: GestureMachine::new(config.input.clone()),
            selection_opacity: config.layers.selection_opacity,
            political_shown: config.layers.political_opacity,
            world,
            camera,
            mode: InteractionMode::default(),
            paint_country: None,
            selected: None,
            hovered: None,
            base,
            political: None,
            borders: None,
            labels,
            outlines: OutlineCache::default(),
            scheduler,
            text: None,
            config,
        }
    }

    /// Loads in one go. See [`EngineLoader`] for the incremental form.
    pub fn from_assets(
        assets: &MapAssets,
        viewport: (u32, u32),
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        Ok(EngineLoader::new(assets, viewport, config)?.finish())
    }

    fn assemble(
        world: World,
        assets: &MapAssets,
        viewport: (u32, u32),
        config: EngineConfig,
    ) -> Self {
        let base = BaseLayers::prepare(
            assets.terrain.as_ref(),
            assets.water.as_ref(),
            assets.rivers.as_ref(),
            &world.index,
            &config.layers,
        );
        info!(
            "Map engine ready to build: {}x{} raster, {} provinces, {} owned",
            world.index.width(),
            world.index.height(),
            world.index.slot_count(),
            world.ownership.len()
        );
        Self::new(world, base, viewport, config)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Direct camera control. Requests a redraw.
    pub fn camera_mut(&mut self) -> &mut Camera {
        self.scheduler.request();
        &mut self.camera
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn selected(&self) -> Option<ProvinceId> {
        self.selected
    }

    pub fn hovered(&self) -> Option<ProvinceId> {
        self.hovered
    }

    pub fn paint_country(&self) -> Option<&str> {
        self.paint_country.as_deref()
    }

    pub fn set_text_renderer(&mut self, text: TextRenderer) {
        self.text = Some(text);
        self.scheduler.request();
    }

    pub fn political_opacity(&self) -> f32 {
        self.config.layers.political_opacity
    }

    /// Sets the political tint opacity, clamped to `0.0..=1.0`.
    pub fn set_political_opacity(&mut self, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        self.config.layers.political_opacity = opacity;
        if opacity > 0.0 {
            self.political_shown = opacity;
        }
        self.scheduler.request();
    }

    /// Hides the political tint, or brings it back at its last opacity.
    /// Returns whether the tint is now shown.
    pub fn toggle_political_colors(&mut self) -> bool {
        let opacity = if self.political_opacity() > 0.0 {
            0.0
        } else {
            self.political_shown
        };
        self.set_political_opacity(opacity);
        opacity > 0.0
    }

    /// Advances pending rebuilds by one frame's budget, shared between the
    /// raster passes still running. Returns `true` once every cache is ready.
    pub fn tick(&mut self) -> bool {
        let running =
            usize::from(self.political_job.is_some()) + usize::from(self.border_job.is_some());
        let budget = (self.config.jobs.pixel_budget / running.max(1)).max(1);
        let water_tint = self.config.layers.water_tint;

        let political_done = match &mut self.political_job {
            Some(job) => job.step(&self.world, water_tint, budget).is_complete(),
            None => false,
        };
        if political_done && let Some(job) = self.political_job.take() {
            self.political = Some(job.finish(&self.world, water_tint));
            self.scheduler.request();
        }

        let borders_done = match &mut self.border_job {
            Some(job) => job.step(&self.world, budget).is_complete(),
            None => false,
        };
        if borders_done && let Some(job) = self.border_job.take() {
            self.install_borders(job);
        }

        if !self.labels.is_ready()
            && self
                .labels
                .step(&self.world, &self.config.labels, self.config.jobs.labels_per_step)
                .is_complete()
        {
            self.scheduler.request();
        }

        self.is_ready()
    }

    /// Runs every pending rebuild to completion.
    pub fn finish_rebuilds(&mut self) {
        let water_tint = self.config.layers.water_tint;
        if let Some(job) = self.political_job.take() {
            self.political = Some(job.finish(&self.world, water_tint));
        }
        if let Some(job) = self.border_job.take() {
            self.install_borders(job);
        }
        self.labels.finish(&self.world, &self.config.labels);
        self.scheduler.request();
    }

    fn install_borders(&mut self, job: BorderJob) {
        let set = job.finish(&self.world);
        self.borders = Some(set.to_layer(Rgba(self.config.layers.border_color)));
        self.scheduler.request();
    }

    pub fn is_ready(&self) -> bool {
        self.political.is_some() && self.borders.is_some() && self.labels.is_ready()
    }

    /// The political layer, if it is current.
    pub fn political_layer(&self) -> Option<&RgbaImage> {
        self.political.as_ref()
    }

    /// The country border layer, if it is current.
    pub fn border_layer(&self) -> Option<&RgbaImage> {
        self.borders.as_ref()
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Vec<MapEvent> {
        let mut events = Vec::new();
        for command in self.gestures.handle(event, self.mode) {
            match command {
                InputCommand::PanBy { dx, dy } => {
                    self.camera.pan_by(dx, dy);
                    self.scheduler.request();
                }
                InputCommand::ZoomAt { factor, x, y } => {
                    if self.camera.zoom_to(factor, (x, y)) {
                        self.scheduler.request();
                    }
                }
                InputCommand::Select { x, y } => {
                    let Some(id) = self.land_province_at(x, y) else {
                        continue;
                    };
                    if self.world.ownership.owner(id).is_none() {
                        debug!("Ignoring click on unowned province {}", id);
                        continue;
                    }
                    if self.select(Some(id)) {
                        events.push(MapEvent::ProvinceClicked(id));
                    }
                }
                InputCommand::Paint { x, y, erase } => {
                    let owner = if erase {
                        None
                    } else {
                        match &self.paint_country {
                            Some(tag) => Some(tag.clone()),
                            None => continue,
                        }
                    };
                    let Some(id) = self.land_province_at(x, y) else {
                        continue;
                    };
                    if let Some(change) = self.set_ownership(id, owner) {
                        events.push(MapEvent::OwnershipChanged(change));
                    }
                }
                InputCommand::Hover { x, y } => {
                    let id = self.land_province_at(x, y);
                    if self.set_hover(id) {
                        events.push(MapEvent::HoverChanged(id));
                    }
                }
                InputCommand::ClearHover => {
                    if self.set_hover(None) {
                        events.push(MapEvent::HoverChanged(None));
                    }
                }
            }
        }
        events
    }

    fn set_hover(&mut self, id: Option<ProvinceId>) -> bool {
        if self.hovered == id {
            return false;
        }
        self.hovered = id;
        if self.mode == InteractionMode::Edit {
            self.scheduler.request();
        }
        true
    }

    /// Province under a screen position, water included.
    pub fn province_at_screen(&self, x: f64, y: f64) -> Option<&Province> {
        let (px, py) = self.camera.screen_to_pixel((x, y));
        self.world.index.lookup(px, py)
    }

    fn land_province_at(&self, x: f64, y: f64) -> Option<ProvinceId> {
        self.province_at_screen(x, y)
            .filter(|p| !p.is_water())
            .map(|p| p.id)
    }

    /// Changes the selection. Returns `false` when it was already current.
    pub fn select(&mut self, province: Option<ProvinceId>) -> bool {
        if self.selected == province {
            return false;
        }
        self.selected = province;
        self.scheduler.request();
        true
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.gestures.cancel();
        if mode == InteractionMode::Edit {
            self.selected = None;
        }
        self.scheduler.request();
    }

    pub fn set_paint_country(&mut self, tag: Option<CountryTag>) {
        self.paint_country = tag;
    }

    pub fn assign(&mut self, province: ProvinceId, tag: &str) -> Option<OwnershipChange> {
        self.set_ownership(province, Some(tag.to_string()))
    }

    /// Sets or clears one province's owner. Water, unknown ids and unchanged
    /// owners are ignored.
    pub fn set_ownership(
        &mut self,
        province: ProvinceId,
        owner: Option<CountryTag>,
    ) -> Option<OwnershipChange> {
        if !self
            .world
            .index
            .by_id(province)
            .is_some_and(|p| !p.is_water())
        {
            debug!("Ignoring ownership change for non-land province {}", province);
            return None;
        }
        let change = self.world.ownership.assign(province, owner)?;
        self.invalidate(std::slice::from_ref(&change));
        Some(change)
    }

    /// Bulk re-import from `id;r;g;b;name;...` rows.
    pub fn import_assignments(&mut self, text: &str, rules: &CountryRules) -> ImportReport {
        let report = self
            .world
            .ownership
            .import_delimited(text, &self.world.index, rules);
        if !report.changes.is_empty() {
            self.invalidate(&report.changes);
        }
        report
    }

    pub fn export_snapshot(&self) -> String {
        self.world.ownership.to_snapshot()
    }

    /// Swaps in a whole ownership map, such as a loaded save. Camera and
    /// selection are kept.
    pub fn replace_ownership(&mut self, ownership: OwnershipMap) {
        for tag in self.world.ownership.countries() {
            self.labels.mark_dirty(tag);
        }
        self.world.ownership = ownership;
        self.labels.mark_all_dirty(&self.world);
        self.restart_layers();
        info!(
            "Ownership replaced: {} provinces, {} countries",
            self.world.ownership.len(),
            self.world.ownership.countries().len()
        );
    }

    /// Swaps in a new colour and name table. Only the political layer
    /// depends on it.
    pub fn set_countries(&mut self, countries: CountryTable) {
        self.world.countries = countries;
        self.political = None;
        self.political_job = Some(PoliticalJob::new(&self.world));
        self.scheduler.request();
    }

    fn restart_layers(&mut self) {
        self.political = None;
        self.borders = None;
        self.political_job = Some(PoliticalJob::new(&self.world));
        self.border_job = Some(BorderJob::new(&self.world));
        self.scheduler.request();
    }

    /// Restarts the ownership-derived layers and dirties the labels of every
    /// country involved.
    fn invalidate(&mut self, changes: &[OwnershipChange]) {
        self.restart_layers();
        for change in changes {
            for tag in change.affected() {
                self.labels.mark_dirty(tag);
            }
        }
        debug!("Ownership changed for {} provinces; rebuilding", changes.len());
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize(width, height);
        self.scheduler.request();
    }

    pub fn request_redraw(&mut self) {
        self.scheduler.request();
    }

    /// Selection highlight pulse; redraws only while something is selected.
    pub fn animate(&mut self, elapsed_ms: f64) {
        self.selection_opacity = compositor::selection_pulse(elapsed_ms);
        if self.selected.is_some() && self.mode == InteractionMode::Play {
            self.scheduler.request();
        }
    }

    /// Renders when a redraw is pending. Call once per display frame.
    pub fn render_if_needed(&mut self) -> Option<RgbaImage> {
        if self.scheduler.take() {
            Some(self.render())
        } else {
            None
        }
    }

    pub fn render(&mut self) -> RgbaImage {
        let labels = self.visible_labels();
        // Play mode highlights the selection, edit mode the province under the brush.
        let outlined = match self.mode {
            InteractionMode::Play => self.selected,
            InteractionMode::Edit => self.hovered,
        };
        let outline = match outlined {
            Some(id) => Some(self.outlines.get(&self.world.index, id)),
            None => None,
        };
        let frame = Frame {
            base: &self.base,
            political: self.political.as_ref(),
            borders: self.borders.as_ref(),
            selection: outline.map(|outline| Selection {
                outline,
                opacity: self.selection_opacity,
            }),
            labels: &labels,
            text: self.text.as_ref(),
        };
        compositor::composite(&frame, &self.camera, &self.config.layers)
    }

    pub fn label_anchors(&self) -> &BTreeMap<CountryTag, Anchor> {
        self.labels.anchors()
    }

    /// Labels to draw at the current zoom. Empty while anchors are stale.
    pub fn visible_labels(&self) -> Vec<PlacedLabel> {
        if !self.labels.is_ready() {
            return Vec::new();
        }
        let Some(sizes) = labels::territory_size_range(&self.world) else {
            return Vec::new();
        };
        let candidates = labels::candidates(&self.world, self.labels.anchors());
        let metrics: &dyn GlyphMetrics = match &self.text {
            Some(text) => text,
            None => &ApproxMetrics,
        };
        labels::select_visible(
            &candidates,
            sizes,
            self.camera.zoom,
            metrics,
            &self.config.label_style,
        )
    }
}

/// Incremental [`MapEngine`] construction. The province index is decoded a
/// band of rows per [`step`](Self::step), within the configured pixel budget.
pub struct EngineLoader<'a> {
    assets: &'a MapAssets,
    builder: IndexBuilder<'a>,
    viewport: (u32, u32),
    config: EngineConfig,
}

impl<'a> EngineLoader<'a> {
    /// Fails up front on duplicate colours or ids.
    pub fn new(
        assets: &'a MapAssets,
        viewport: (u32, u32),
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let builder = IndexBuilder::new(&assets.definitions, &assets.provinces)?;
        Ok(Self {
            assets,
            builder,
            viewport,
            config,
        })
    }

    pub fn step(&mut self) -> Progress {
        let (width, height) = self.assets.provinces.dimensions();
        let rows = job::rows_for_budget(width, self.config.jobs.pixel_budget);
        if self.builder.step(rows) {
            Progress::Complete
        } else {
            Progress::Pending {
                done: self.builder.rows_done(),
                total: height,
            }
        }
    }

    /// Decodes any remaining rows and hands over the engine, with its
    /// derived layers still to build.
    pub fn finish(self) -> MapEngine {
        let index = self.builder.finish();
        let world = World::new(
            index,
            self.assets.ownership.clone(),
            self.assets.countries.clone(),
        );
        MapEngine::assemble(world, self.assets, self.viewport, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::input::PointerButton::{Middle, Primary, Secondary};
    use crate::testing::{GRN, RED, grid_world, province_id, two_country_world};
    use mapdata::ownership::CountryRule;

    /// Engine whose camera maps world pixels 1:1 onto the viewport.
    fn engine(world: World) -> MapEngine {
        let size = world.index.dimensions();
        let mut config = EngineConfig {
            camera: CameraConfig {
                initial_zoom: 1.0,
                ..CameraConfig::default()
            },
            ..EngineConfig::default()
        };
        config.labels.sample_stride = 1;
        config.label_style.cull.clear();
        MapEngine::new(world, BaseLayers::default(), size, config)
    }

    fn click(engine: &mut MapEngine, x: f64, y: f64) -> Vec<MapEvent> {
        let mut events = engine.handle_pointer(PointerEvent::Down { button: Primary, x, y });
        events.extend(engine.handle_pointer(PointerEvent::Up { button: Primary, x, y }));
        events
    }

    #[test]
    fn test_two_country_scenario() {
        let mut engine = engine(two_country_world());
        assert!(!engine.is_ready());
        engine.finish_rebuilds();
        assert!(engine.is_ready());

        let political = engine.political_layer().unwrap();
        for y in 0..4 {
            assert_eq!(political.get_pixel(0, y).0, [RED[0], RED[1], RED[2], 255]);
            assert_eq!(political.get_pixel(3, y).0, [GRN[0], GRN[1], GRN[2], 255]);
        }

        let borders = engine.border_layer().unwrap();
        assert!(borders.get_pixel(1, 0)[3] > 0);
        assert!(borders.get_pixel(2, 0)[3] > 0);
        assert_eq!(engine.label_anchors().len(), 2);
    }

    #[test]
    fn test_tick_eventually_ready() {
        let mut engine = engine(two_country_world());
        let mut frames = 0;
        while !engine.tick() {
            frames += 1;
            assert!(frames < 100);
        }
        assert!(engine.political_layer().is_some());
    }

    #[test]
    fn test_click_selects_once() {
        let mut engine = engine(two_country_world());
        let a = province_id('A');
        let events = click(&mut engine, 0.5, 0.5);
        assert_eq!(
            events,
            vec![MapEvent::ProvinceClicked(a), MapEvent::HoverChanged(Some(a))]
        );
        assert_eq!(engine.selected(), Some(a));
        assert!(click(&mut engine, 1.5, 0.5).is_empty());
    }

    #[test]
    fn test_click_water_and_background_ignored() {
        let mut engine = engine(grid_world(&["A~."], &[('A', "RED")]));
        assert!(click(&mut engine, 1.5, 0.5).is_empty());
        assert!(click(&mut engine, 2.5, 0.5).is_empty());
        assert_eq!(engine.selected(), None);
        assert_eq!(engine.province_at_screen(1.5, 0.5).map(|p| p.id), Some(province_id('~')));
    }

    #[test]
    fn test_click_unowned_land_ignored() {
        let mut engine = engine(grid_world(&["AB"], &[('A', "RED")]));
        let b = province_id('B');
        let events = click(&mut engine, 1.5, 0.5);
        assert_eq!(events, vec![MapEvent::HoverChanged(Some(b))]);
        assert_eq!(engine.selected(), None);

        let a = province_id('A');
        assert_eq!(click(&mut engine, 0.5, 0.5)[0], MapEvent::ProvinceClicked(a));
        click(&mut engine, 1.5, 0.5);
        assert_eq!(engine.selected(), Some(a));
    }

    #[test]
    fn test_hover_and_leave() {
        let mut engine = engine(two_country_world());
        let b = province_id('B');
        let events = engine.handle_pointer(PointerEvent::Move { x: 3.0, y: 1.0 });
        assert_eq!(events, vec![MapEvent::HoverChanged(Some(b))]);
        assert!(engine.handle_pointer(PointerEvent::Move { x: 2.5, y: 2.0 }).is_empty());
        let events = engine.handle_pointer(PointerEvent::Leave);
        assert_eq!(events, vec![MapEvent::HoverChanged(None)]);
        assert_eq!(engine.hovered(), None);
    }

    #[test]
    fn test_middle_drag_pans() {
        let world = grid_world(&["AAAAAAAA"; 8], &[('A', "RED")]);
        let mut config = EngineConfig::default();
        config.camera.initial_zoom = 2.0;
        let mut engine = MapEngine::new(world, BaseLayers::default(), (4, 4), config);
        let before = engine.camera().x;
        engine.handle_pointer(PointerEvent::Down { button: Middle, x: 2.0, y: 2.0 });
        engine.handle_pointer(PointerEvent::Move { x: 3.0, y: 2.0 });
        assert_eq!(engine.camera().x, (before + 1.0).min(0.0));
    }

    #[test]
    fn test_edit_mode_paints_and_erases() {
        let mut engine = engine(two_country_world());
        engine.finish_rebuilds();
        click(&mut engine, 0.5, 0.5);
        engine.set_mode(InteractionMode::Edit);
        assert_eq!(engine.selected(), None);

        let a = province_id('A');
        engine.set_paint_country(Some("GRN".into()));
        let events = engine.handle_pointer(PointerEvent::Down { button: Primary, x: 0.5, y: 0.5 });
        assert_eq!(
            events,
            vec![MapEvent::OwnershipChanged(OwnershipChange {
                province: a,
                previous: Some("RED".into()),
                current: Some("GRN".into()),
            })]
        );
        assert!(!engine.is_ready());
        assert!(engine.political_layer().is_none());

        // Same owner again is a no-op.
        assert!(engine.handle_pointer(PointerEvent::Move { x: 1.5, y: 0.5 }).is_empty());
        engine.handle_pointer(PointerEvent::Up { button: Primary, x: 1.5, y: 0.5 });

        engine.finish_rebuilds();
        let political = engine.political_layer().unwrap();
        assert_eq!(political.get_pixel(0, 0).0, [GRN[0], GRN[1], GRN[2], 255]);
        assert_eq!(engine.label_anchors().len(), 1);

        let events = engine.handle_pointer(PointerEvent::Down { button: Secondary, x: 0.5, y: 0.5 });
        assert_eq!(events.len(), 1);
        assert_eq!(engine.world().ownership.owner(a), None);
    }

    #[test]
    fn test_paint_without_country_does_nothing() {
        let mut engine = engine(two_country_world());
        engine.set_mode(InteractionMode::Edit);
        assert!(
            engine
                .handle_pointer(PointerEvent::Down { button: Primary, x: 0.5, y: 0.5 })
                .is_empty()
        );
    }

    #[test]
    fn test_set_ownership_rejects_water() {
        let mut engine = engine(grid_world(&["A~"], &[]));
        assert!(engine.set_ownership(province_id('~'), Some("RED".into())).is_none());
        assert!(engine.set_ownership(9999, Some("RED".into())).is_none());
        assert!(engine.assign(province_id('A'), "RED").is_some());
    }

    #[test]
    fn test_import_and_export() {
        let mut engine = engine(two_country_world());
        engine.finish_rebuilds();
        let rules = CountryRules::new(vec![CountryRule {
            country: "BLU".into(),
            keywords: vec!["blue".into()],
        }]);
        let text = "id;r;g;b;name\n65;65;10;20;Bluewater\n66;66;10;20;Nowhere\nbad\n";
        let report = engine.import_assignments(text, &rules);
        assert_eq!((report.assigned, report.unmatched, report.skipped), (1, 1, 1));
        assert!(!engine.is_ready());

        let snapshot = engine.export_snapshot();
        assert!(snapshot.contains("65=BLU"));
        assert!(snapshot.contains("66=GRN"));
    }

    #[test]
    fn test_redraws_coalesce() {
        let mut engine = engine(two_country_world());
        let frame = engine.render_if_needed().unwrap();
        assert_eq!(frame.dimensions(), (4, 4));
        assert!(engine.render_if_needed().is_none());
        engine.request_redraw();
        engine.request_redraw();
        assert!(engine.render_if_needed().is_some());
        assert!(engine.render_if_needed().is_none());
    }

    #[test]
    fn test_visible_labels_after_rebuild() {
        let mut engine = engine(two_country_world());
        assert!(engine.visible_labels().is_empty());
        engine.finish_rebuilds();
        let labels = engine.visible_labels();
        assert!(!labels.is_empty());
        assert!(labels.iter().all(|l| l.text == l.text.to_uppercase()));
    }

    #[test]
    fn test_selection_drawn_only_in_play() {
        let mut engine = engine(grid_world(&["AAAAA"; 5], &[]));
        let plain = engine.render();
        engine.select(Some(province_id('A')));
        let selected = engine.render();
        assert_ne!(plain, selected);
        engine.set_mode(InteractionMode::Edit);
        assert_eq!(engine.render(), plain);
    }

    #[test]
    fn test_toggle_political_colors() {
        let mut engine = engine(two_country_world());
        engine.base.terrain = Some(RgbaImage::from_pixel(4, 4, Rgba([90, 140, 60, 255])));
        engine.finish_rebuilds();
        let tinted = engine.render();
        engine.render_if_needed();

        assert!(!engine.toggle_political_colors());
        assert_eq!(engine.political_opacity(), 0.0);
        assert!(engine.render_if_needed().is_some());

        let terrain_only = compositor::composite(
            &Frame {
                base: &engine.base,
                political: None,
                borders: engine.borders.as_ref(),
                selection: None,
                labels: &[],
                text: None,
            },
            &engine.camera,
            &engine.config.layers,
        );
        assert_ne!(terrain_only, tinted);
        assert_eq!(engine.render(), terrain_only);

        assert!(engine.toggle_political_colors());
        assert_eq!(engine.political_opacity(), 0.85);
        assert_eq!(engine.render(), tinted);

        engine.set_political_opacity(1.5);
        assert_eq!(engine.political_opacity(), 1.0);
        engine.set_political_opacity(0.0);
        assert!(engine.toggle_political_colors());
        assert_eq!(engine.political_opacity(), 1.0);
    }

    #[test]
    fn test_replace_ownership_keeps_view() {
        let mut engine = engine(two_country_world());
        engine.finish_rebuilds();
        let a = province_id('A');
        click(&mut engine, 0.5, 0.5);
        let camera = engine.camera().clone();

        let (save, skipped) = OwnershipMap::parse_snapshot("65=GRN\n66=GRN\n");
        assert_eq!(skipped, 0);
        engine.replace_ownership(save);
        assert!(!engine.is_ready());
        assert!(engine.political_layer().is_none());
        assert!(engine.border_layer().is_none());

        engine.finish_rebuilds();
        let political = engine.political_layer().unwrap();
        assert_eq!(political.get_pixel(0, 0).0, [GRN[0], GRN[1], GRN[2], 255]);
        assert!(engine.border_layer().unwrap().pixels().all(|p| p[3] == 0));
        assert_eq!(engine.label_anchors().keys().collect::<Vec<_>>(), ["GRN"]);
        assert_eq!(engine.selected(), Some(a));
        assert_eq!(engine.camera(), &camera);
    }

    #[test]
    fn test_set_countries_recolours() {
        let mut engine = engine(two_country_world());
        engine.finish_rebuilds();

        let mut countries = mapdata::CountryTable::new();
        countries.insert("RED", "Crimson Realm", [200, 0, 0]);
        countries.insert("GRN", "Green Union", GRN);
        engine.set_countries(countries);
        assert!(engine.political_layer().is_none());
        assert!(engine.border_layer().is_some());

        engine.finish_rebuilds();
        assert_eq!(engine.political_layer().unwrap().get_pixel(0, 0).0, [200, 0, 0, 255]);
        let candidates = labels::candidates(engine.world(), engine.label_anchors());
        let red = candidates.iter().find(|c| c.tag == "RED").unwrap();
        assert_eq!(red.name, "Crimson Realm");
    }

    #[test]
    fn test_edit_mode_outlines_hovered_province() {
        let mut engine = engine(grid_world(&["AAAAA"; 5], &[]));
        let plain = engine.render();
        engine.set_mode(InteractionMode::Edit);
        engine.render_if_needed();

        let events = engine.handle_pointer(PointerEvent::Move { x: 2.5, y: 2.5 });
        assert_eq!(events, vec![MapEvent::HoverChanged(Some(province_id('A')))]);
        assert!(engine.render_if_needed().is_some());
        assert_ne!(engine.render(), plain);

        engine.set_mode(InteractionMode::Play);
        assert_eq!(engine.render(), plain);
    }

    #[test]
    fn test_tick_shares_budget_between_passes() {
        let mut engine = engine(two_country_world());
        // Two rows of the 4x4 raster per frame, one row for each pass.
        engine.config.jobs.pixel_budget = 8;
        for _ in 0..3 {
            engine.tick();
        }
        assert!(engine.political_layer().is_none());
        assert!(engine.border_layer().is_none());
        engine.tick();
        assert!(engine.political_layer().is_some());
        assert!(engine.border_layer().is_some());
    }

    #[test]
    fn test_loader_builds_index_in_bands() {
        let red = Rgba([255, 0, 0, 255]);
        let blue = Rgba([0, 0, 255, 255]);
        let assets = MapAssets {
            provinces: RgbaImage::from_fn(4, 4, |x, _| if x < 2 { red } else { blue }),
            terrain: None,
            water: None,
            rivers: None,
            definitions: vec![
                mapdata::RegionDefinition {
                    id: 1,
                    color: mapdata::ColorKey::from_rgb(255, 0, 0),
                    category: mapdata::RegionCategory::Land,
                    coastal: false,
                    terrain: "plains".into(),
                    continent: String::new(),
                },
                mapdata::RegionDefinition {
                    id: 2,
                    color: mapdata::ColorKey::from_rgb(0, 0, 255),
                    category: mapdata::RegionCategory::Sea,
                    coastal: false,
                    terrain: "ocean".into(),
                    continent: String::new(),
                },
            ],
            countries: crate::testing::countries(),
            ownership: [(1, "RED".to_string())].into_iter().collect(),
        };
        let mut config = EngineConfig::default();
        config.jobs.pixel_budget = 4;
        let mut loader = EngineLoader::new(&assets, (4, 4), config).unwrap();
        assert_eq!(loader.step(), Progress::Pending { done: 1, total: 4 });
        let mut engine = loader.finish();
        assert_eq!(engine.world().index.lookup(3, 3).map(|p| p.id), Some(2));
        assert_eq!(engine.world().ownership.owner(1), Some("RED"));
        engine.finish_rebuilds();
        assert!(engine.is_ready());
    }
}
