//! Interactive viewing layer.
//!
//! # Architecture
//!
//! ```text
//!         SurfaceEvent                      RedrawKind
//!  window ───────────► InteractionController ─────────► RedrawScheduler
//!    ▲                       │ pan / zoom                  │  ▲
//!    │                       ▼                             │  │ Periodic
//!    │                 SharedViewport                      │  run_ticker
//!    │                       │                             ▼
//!    └──────────────────── RenderLoop ◄────────────────────┘
//!           frames            │ get(coord, scale)
//!                             ▼
//!                       ScaledTileStore
//! ```
//!
//! The interaction and render tasks share the viewport behind a lock. All
//! redraw triggers funnel through the single-slot scheduler.

use std::sync::Arc;

use parking_lot::RwLock;

mod interaction;
mod render;
mod scheduler;
mod surface;
mod viewport;
mod window;

pub use interaction::InteractionController;
pub use render::{compose_frame, rescale_frame, FrameStats, RenderLoop, DEFAULT_BACKGROUND, DEFAULT_TITLE};
pub use scheduler::{run_ticker, RedrawKind, RedrawScheduler, DEFAULT_REDRAW_INTERVAL};
pub use surface::{DisplaySurface, Key, MemorySurface, PointerButton, ScreenPoint, SurfaceEvent};
pub use viewport::{TileRange, Viewport, DEFAULT_MIN_SCALE, ZOOM_DRAG_PIXELS_PER_OCTAVE};
pub use window::{UserEvent, WindowBackend, WindowSurface};

/// Viewport shared between the interaction and render tasks.
pub type SharedViewport = Arc<RwLock<Viewport>>;
