//! # tile-zoom
//!
//! A pannable, zoomable viewer for an unbounded plane assembled from a grid
//! of square image tiles.
//!
//! The heart of the crate is a pair of non-blocking caches: base tiles are
//! decoded at most once per grid coordinate, rescaled copies are produced at
//! most once per `(scale, coordinate)`, and every lookup answers immediately
//! with either the image or a "not yet" status. The render loop draws what
//! is ready and lets a periodic redraw pick up the rest.
//!
//! ## Architecture
//!
//! - [`tile`] - Tile source, index and the base/scaled caches
//! - [`view`] - Viewport mapping, redraw scheduling, interaction, rendering and the window backend
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types for each layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tile_zoom::{DirectorySource, ScaledTileStore, TileIndex, TileStore, TileStatus, GridCoord};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(DirectorySource::new("./tiles"));
//!     let index = Arc::new(TileIndex::build(source.as_ref()).await?);
//!     let runtime = tokio::runtime::Handle::current();
//!
//!     let base = Arc::new(TileStore::new(index, source, runtime.clone()));
//!     let scaled = ScaledTileStore::new(Arc::clone(&base), runtime);
//!
//!     match base.get(GridCoord::new(0, 0)) {
//!         TileStatus::Ready(tile) => println!("{}x{}", tile.width(), tile.height()),
//!         TileStatus::Pending => println!("decoding"),
//!         TileStatus::Absent => println!("no tile here"),
//!     }
//!     let _ = scaled.get(GridCoord::new(0, 0), 2.0);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod tile;
pub mod view;

// Re-export commonly used types
pub use config::Config;
pub use error::{SourceError, SurfaceError, TileError};
pub use tile::{
    parse_tile_name, scaled_dimensions, DirectorySource, GridCoord, ScaledStatus, ScaledTileStore,
    SourceHandle, TileEntry, TileImage, TileIndex, TileSource, TileStatus, TileStore,
    DEFAULT_TILE_SIZE,
};
pub use view::{
    compose_frame, rescale_frame, run_ticker, DisplaySurface, FrameStats, InteractionController,
    Key, MemorySurface, PointerButton, RedrawKind, RedrawScheduler, RenderLoop, ScreenPoint,
    SharedViewport, SurfaceEvent, TileRange, Viewport, WindowBackend, WindowSurface,
};
