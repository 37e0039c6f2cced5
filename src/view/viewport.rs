//! World-to-screen mapping.
//!
//! World space is measured in base-tile pixels with `y` pointing up. Screen
//! space is measured in window pixels with `y` pointing down and the world
//! center drawn at the middle of the window.

use crate::tile::{GridCoord, DEFAULT_TILE_SIZE};

/// Default lower bound for `scale` (world units per screen pixel).
pub const DEFAULT_MIN_SCALE: f64 = 0.5;

/// Vertical drag distance, in pixels, that doubles or halves the scale.
pub const ZOOM_DRAG_PIXELS_PER_OCTAVE: f64 = 100.0;

/// Inclusive rectangle of grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min: GridCoord,
    pub max: GridCoord,
}

impl TileRange {
    pub fn contains(&self, coord: GridCoord) -> bool {
        (self.min.x..=self.max.x).contains(&coord.x) && (self.min.y..=self.max.y).contains(&coord.y)
    }

    /// Number of coordinates in the range.
    pub fn len(&self) -> u64 {
        let span = |lo: i64, hi: i64| (hi - lo + 1).max(0) as u64;
        span(self.min.x, self.max.x) * span(self.min.y, self.max.y)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates present in both ranges, or `None` if they do not overlap.
    pub fn intersection(&self, other: &TileRange) -> Option<TileRange> {
        let min = GridCoord::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = GridCoord::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        (min.x <= max.x && min.y <= max.y).then_some(TileRange { min, max })
    }

    /// Coordinates row by row, from the top (north) row down.
    pub fn iter(&self) -> impl Iterator<Item = GridCoord> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y)
            .rev()
            .flat_map(move |y| (min.x..=max.x).map(move |x| GridCoord::new(x, y)))
    }
}

/// Current view of the plane: center, zoom and window size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    center_x: f64,
    center_y: f64,
    scale: f64,
    min_scale: f64,
    width: u32,
    height: u32,
    tile_size: u32,
}

impl Viewport {
    /// A view centered on the world origin at scale 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            scale: 1.0,
            min_scale: DEFAULT_MIN_SCALE,
            width,
            height,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    pub fn with_center(mut self, x: f64, y: f64) -> Self {
        self.center_x = x;
        self.center_y = y;
        self
    }

    /// Set the scale, clamped to the minimum.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn with_min_scale(mut self, min_scale: f64) -> Self {
        self.min_scale = min_scale;
        self.set_scale(self.scale);
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size.max(1);
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.resize(width, height);
        self
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    /// World units per screen pixel; larger means further zoomed out.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale.max(self.min_scale);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    // =========================================================================
    // Mapping
    // =========================================================================

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            (wx - self.center_x) / self.scale + f64::from(self.width) / 2.0,
            f64::from(self.height) / 2.0 - (wy - self.center_y) / self.scale,
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - f64::from(self.width) / 2.0) * self.scale + self.center_x,
            self.center_y - (sy - f64::from(self.height) / 2.0) * self.scale,
        )
    }

    /// Grid coordinates that may be on screen, with a one-tile margin on
    /// every side.
    pub fn visible_tiles(&self) -> TileRange {
        let tile = f64::from(self.tile_size);
        let half_w = f64::from(self.width) / 2.0 * self.scale;
        let half_h = f64::from(self.height) / 2.0 * self.scale;
        let cell = |world: f64| (world / tile).floor() as i64;

        TileRange {
            min: GridCoord::new(
                cell(self.center_x - half_w) - 1,
                cell(self.center_y - half_h) - 1,
            ),
            max: GridCoord::new(
                cell(self.center_x + half_w) + 1,
                cell(self.center_y + half_h) + 1,
            ),
        }
    }

    /// Screen position of the top-left corner of tile `coord`.
    ///
    /// Tile `(x, y)` spans world `[x*T, (x+1)*T)` horizontally and
    /// `[y*T, (y+1)*T)` vertically, so its top-left corner is `(x*T, (y+1)*T)`.
    pub fn tile_origin(&self, coord: GridCoord) -> (i64, i64) {
        let tile = f64::from(self.tile_size);
        let (sx, sy) = self.world_to_screen(coord.x as f64 * tile, (coord.y + 1) as f64 * tile);
        (sx.round() as i64, sy.round() as i64)
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Move the view so the content follows a pointer drag of `(dx, dy)` screen pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center_x -= dx * self.scale;
        self.center_y += dy * self.scale;
    }

    /// Apply a zoom drag: `rise` pixels of upward motion multiply the scale
    /// by `2^(rise / 100)`.
    pub fn zoom_by_drag(&mut self, rise: f64) {
        self.set_scale(self.scale * (rise / ZOOM_DRAG_PIXELS_PER_OCTAVE).exp2());
    }
}
