//! Zoom and pan state plus raw-surface to scene coordinate mapping.
use crate::geometry::Point;
use crate::input::Modifiers;

const VIEWPORT_ZOOM_MIN_PERCENT: u16 = 1;
const VIEWPORT_ZOOM_MAX_PERCENT: u16 = 1600;
const VIEWPORT_ZOOM_LEVELS_PERCENT: &[u16] = &[
    1, 2, 3, 4, 5, 8, 10, 12, 16, 20, 25, 33, 50, 67, 75, 80, 90, 100, 110, 125, 150, 175, 200,
    250, 300, 400, 500, 600, 800, 1000, 1200, 1600,
];
const VIEWPORT_PAN_STEP_PX: f64 = 48.0;

fn clamp_zoom_percent(zoom_percent: u16) -> u16 {
    zoom_percent.clamp(VIEWPORT_ZOOM_MIN_PERCENT, VIEWPORT_ZOOM_MAX_PERCENT)
}

fn next_zoom_in_level(current_zoom_percent: u16) -> u16 {
    VIEWPORT_ZOOM_LEVELS_PERCENT
        .iter()
        .copied()
        .find(|level| *level > current_zoom_percent)
        .unwrap_or(VIEWPORT_ZOOM_MAX_PERCENT)
}

fn next_zoom_out_level(current_zoom_percent: u16) -> u16 {
    VIEWPORT_ZOOM_LEVELS_PERCENT
        .iter()
        .rev()
        .copied()
        .find(|level| *level < current_zoom_percent)
        .unwrap_or(VIEWPORT_ZOOM_MIN_PERCENT)
}

/// Raw surface position = scene position * zoom + pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom_percent: u16,
    pan_x: f64,
    pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewport {
    pub const fn new() -> Self {
        Self {
            zoom_percent: 100,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub const fn zoom_percent(&self) -> u16 {
        self.zoom_percent
    }

    pub fn scale(&self) -> f64 {
        f64::from(self.zoom_percent) / 100.0
    }

    pub const fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    pub fn to_scene(&self, raw: Point) -> Point {
        let scale = self.scale();
        Point::new((raw.x - self.pan_x) / scale, (raw.y - self.pan_y) / scale)
    }

    pub fn to_raw(&self, scene: Point) -> Point {
        let scale = self.scale();
        Point::new(scene.x * scale + self.pan_x, scene.y * scale + self.pan_y)
    }

    pub fn zoom_in(&mut self) {
        self.zoom_percent = next_zoom_in_level(clamp_zoom_percent(self.zoom_percent));
    }

    pub fn zoom_out(&mut self) {
        self.zoom_percent = next_zoom_out_level(clamp_zoom_percent(self.zoom_percent));
    }

    pub fn set_zoom_percent(&mut self, zoom_percent: u16) {
        self.zoom_percent = clamp_zoom_percent(zoom_percent);
    }

    /// Steps the zoom ladder while keeping the scene point under `anchor` fixed.
    pub fn zoom_about(&mut self, anchor: Point, zoom_in: bool) {
        let pinned = self.to_scene(anchor);
        if zoom_in {
            self.zoom_in();
        } else {
            self.zoom_out();
        }
        let scale = self.scale();
        self.pan_x = anchor.x - pinned.x * scale;
        self.pan_y = anchor.y - pinned.y * scale;
    }

    pub fn set_actual_size(&mut self) {
        self.zoom_percent = 100;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    pub fn pan_by(&mut self, delta_x: f64, delta_y: f64) {
        self.pan_x += delta_x;
        self.pan_y += delta_y;
    }

    /// Ctrl+wheel zooms about the cursor; a plain wheel pans by fixed steps.
    pub fn apply_wheel(&mut self, anchor: Point, delta_x: f64, delta_y: f64, modifiers: Modifiers) {
        if modifiers.ctrl {
            if delta_y != 0.0 {
                self.zoom_about(anchor, delta_y < 0.0);
            }
            return;
        }
        let (delta_x, delta_y) = if modifiers.shift {
            (delta_y, delta_x)
        } else {
            (delta_x, delta_y)
        };
        let step = |delta: f64| {
            if delta == 0.0 {
                0.0
            } else {
                -delta.signum() * VIEWPORT_PAN_STEP_PX
            }
        };
        self.pan_by(step(delta_x), step(delta_y));
    }
}
