//! Pointer and keyboard handling.
//!
//! ```text
//! primary drag     ──► pan              ──► Full redraw
//! secondary drag   ──► zoom_by_drag     ──► InPlaceRescale redraw
//! secondary up     ──► clear scaled cache ─► Full redraw
//! resize           ──► viewport.resize  ──► Full redraw
//! Escape / close   ──► stop
//! ```

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use super::scheduler::{RedrawKind, RedrawScheduler};
use super::surface::{Key, PointerButton, SurfaceEvent};
use super::SharedViewport;
use crate::tile::ScaledTileStore;

/// Applies input events to the shared viewport and requests redraws.
pub struct InteractionController {
    viewport: SharedViewport,
    scaled: Arc<ScaledTileStore>,
    scheduler: Arc<RedrawScheduler>,
    zooming: bool,
}

impl InteractionController {
    pub fn new(
        viewport: SharedViewport,
        scaled: Arc<ScaledTileStore>,
        scheduler: Arc<RedrawScheduler>,
    ) -> Self {
        Self {
            viewport,
            scaled,
            scheduler,
            zooming: false,
        }
    }

    /// True between the first zoom drag and the release of the zoom button.
    pub fn is_zooming(&self) -> bool {
        self.zooming
    }

    /// Handle one event. Returns [`ControlFlow::Break`] when the viewer
    /// should shut down.
    pub fn handle(&mut self, event: &SurfaceEvent) -> ControlFlow<()> {
        match *event {
            SurfaceEvent::PointerDrag {
                button: PointerButton::Primary,
                from,
                to,
            } => {
                self.viewport.write().pan(to.x - from.x, to.y - from.y);
                self.scheduler.request(RedrawKind::Full);
            }
            SurfaceEvent::PointerDrag {
                button: PointerButton::Secondary,
                from,
                to,
            } => {
                self.viewport.write().zoom_by_drag(from.y - to.y);
                self.zooming = true;
                self.scheduler.request(RedrawKind::InPlaceRescale);
            }
            SurfaceEvent::PointerUp {
                button: PointerButton::Secondary,
            } => {
                self.zooming = false;
                // Scaled tiles at intermediate zoom levels are no longer useful
                self.scaled.clear();
                self.scheduler.request(RedrawKind::Full);
                debug!(scale = self.viewport.read().scale(), "Zoom gesture finished");
            }
            SurfaceEvent::Resize { width, height } => {
                self.viewport.write().resize(width, height);
                self.scheduler.request(RedrawKind::Full);
            }
            SurfaceEvent::KeyTyped(Key::Escape) | SurfaceEvent::Close => {
                return ControlFlow::Break(());
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    /// Consume events until the stream ends or a quit event arrives, then
    /// close the scheduler so the render loop winds down.
    pub async fn run(mut self, mut events: UnboundedReceiver<SurfaceEvent>) {
        while let Some(event) = events.recv().await {
            if self.handle(&event).is_break() {
                info!("Quit requested");
                break;
            }
        }
        self.scheduler.close();
    }
}
