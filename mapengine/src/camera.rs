//! Pan/zoom transform between world raster pixels and screen pixels.
//!
//! `screen = world * zoom + (x, y)`. The camera is re-constrained after
//! every pan and zoom so the raster stays on screen.

use crate::config::CameraConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Screen position of the raster's top-left corner.
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    viewport: (f64, f64),
    world: (f64, f64),
    initial_zoom: f64,
}

impl Camera {
    /// Creates a camera centred on the raster at the configured initial zoom.
    pub fn new(world: (u32, u32), viewport: (u32, u32), config: &CameraConfig) -> Self {
        let mut camera = Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom.max(config.min_zoom),
            viewport: (viewport.0 as f64, viewport.1 as f64),
            world: (world.0 as f64, world.1 as f64),
            initial_zoom: config.initial_zoom,
        };
        camera.reset();
        camera
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    pub fn world_size(&self) -> (f64, f64) {
        self.world
    }

    /// Back to the initial zoom, centred on the middle of the raster.
    pub fn reset(&mut self) {
        self.zoom = self.initial_zoom.clamp(self.min_zoom, self.max_zoom);
        self.x = self.viewport.0 / 2.0 - (self.world.0 / 2.0) * self.zoom;
        self.y = self.viewport.1 / 2.0 - (self.world.1 / 2.0) * self.zoom;
        self.constrain();
    }

    /// New viewport size. The view is reset, as a fresh layout would be.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width as f64, height as f64);
        self.reset();
    }

    /// Pans by screen pixel deltas.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        self.constrain();
    }

    /// Zooms by `factor`, keeping the world point under `anchor` (screen
    /// space) fixed. Returns `false` when the clamped zoom does not change.
    pub fn zoom_to(&mut self, factor: f64, anchor: (f64, f64)) -> bool {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if new_zoom == self.zoom || !new_zoom.is_finite() {
            return false;
        }
        let ratio = new_zoom / self.zoom;
        self.x = anchor.0 - (anchor.0 - self.x) * ratio;
        self.y = anchor.1 - (anchor.1 - self.y) * ratio;
        self.zoom = new_zoom;
        self.constrain();
        true
    }

    /// Sets the zoom (clamped) and centres the viewport on a world point.
    pub fn look_at(&mut self, world: (f64, f64), zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.x = self.viewport.0 / 2.0 - world.0 * self.zoom;
        self.y = self.viewport.1 / 2.0 - world.1 * self.zoom;
        self.constrain();
    }

    pub fn world_to_screen(&self, world: (f64, f64)) -> (f64, f64) {
        (world.0 * self.zoom + self.x, world.1 * self.zoom + self.y)
    }

    pub fn screen_to_world(&self, screen: (f64, f64)) -> (f64, f64) {
        ((screen.0 - self.x) / self.zoom, (screen.1 - self.y) / self.zoom)
    }

    /// Integer raster pixel under a screen position. May be out of bounds.
    pub fn screen_to_pixel(&self, screen: (f64, f64)) -> (i64, i64) {
        let (wx, wy) = self.screen_to_world(screen);
        (wx.floor() as i64, wy.floor() as i64)
    }

    /// Centres an axis whose scaled raster fits the viewport; otherwise
    /// clamps so no raster edge is dragged inside the viewport.
    pub fn constrain(&mut self) {
        self.x = Self::constrain_axis(self.x, self.world.0 * self.zoom, self.viewport.0);
        self.y = Self::constrain_axis(self.y, self.world.1 * self.zoom, self.viewport.1);
    }

    fn constrain_axis(offset: f64, scaled: f64, view: f64) -> f64 {
        if scaled <= view {
            (view - scaled) / 2.0
        } else {
            offset.clamp(view - scaled, 0.0)
        }
    }

    /// World-space rectangle `(x0, y0, x1, y1)` currently on screen.
    pub fn visible_world_rect(&self) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.screen_to_world((0.0, 0.0));
        let (x1, y1) = self.screen_to_world(self.viewport);
        (x0, y0, x1, y1)
    }
}
