//! Tile cache layer.
//!
//! This module turns a directory of square image tiles into a lazily
//! materialized, non-blocking cache of base and rescaled tiles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Render Loop               │
//! └────────────────────┬────────────────────┘
//!                      │  get(coord, scale)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            ScaledTileStore              │
//! │  (scale, x, y) -> resized tile          │
//! └────────────────────┬────────────────────┘
//!                      │  get(coord)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               TileStore                 │
//! │  (x, y) -> decoded tile                 │
//! └────────────────────┬────────────────────┘
//!                      │  decode(handle)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │      TileIndex  +  TileSource           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Every lookup returns immediately. A miss installs a pending slot and
//! starts exactly one background computation for that key; later lookups
//! observe the published result.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

mod index;
mod scaled;
mod source;
mod store;


pub use index::TileIndex;
pub use scaled::{scaled_dimensions, ScaledStatus, ScaledTileStore};
pub use source::{parse_tile_name, DirectorySource, SourceHandle, TileEntry, TileSource};
pub use store::{TileStatus, TileStore};

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 2048;

/// A decoded raster tile, shared between caches and frames.
pub type TileImage = Arc<RgbaImage>;

/// Integer address of one tile slot in the unbounded plane.
///
/// `x` grows eastward and `y` grows northward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: i64,
    pub y: i64,
}

impl GridCoord {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i64, i64)> for GridCoord {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}
