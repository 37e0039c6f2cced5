//! Frame compositing.
//!
//! A full redraw asks the scaled-tile cache for every visible coordinate and
//! pastes whatever is ready over a flat background; tiles still loading just
//! leave the background showing. An in-place rescale skips the caches
//! entirely and resamples the last full frame to the current scale.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::{debug, error, trace};

use super::scheduler::{RedrawKind, RedrawScheduler};
use super::surface::DisplaySurface;
use super::viewport::{TileRange, Viewport};
use super::SharedViewport;
use crate::error::SurfaceError;
use crate::tile::{ScaledStatus, ScaledTileStore};

/// Fill shown wherever no tile has been drawn.
pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([155, 155, 155, 255]);

/// Default window title prefix.
pub const DEFAULT_TITLE: &str = "tile-zoom";

/// Tile counts for one composed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Populated coordinates inside the visible range.
    pub visible: u64,
    /// Tiles that were ready and pasted.
    pub drawn: u64,
}

/// Last fully composed frame and the scale it was drawn at.
struct Frame {
    image: RgbaImage,
    scale: f64,
}

/// Render task state: consumes redraw requests and publishes frames.
pub struct RenderLoop {
    scaled: Arc<ScaledTileStore>,
    viewport: SharedViewport,
    background: Rgba<u8>,
    title: String,
    last_frame: Option<Frame>,
    last_kind: Option<RedrawKind>,
    shown_scale: Option<f64>,
}

impl RenderLoop {
    pub fn new(scaled: Arc<ScaledTileStore>, viewport: SharedViewport) -> Self {
        Self {
            scaled,
            viewport,
            background: DEFAULT_BACKGROUND,
            title: DEFAULT_TITLE.to_string(),
            last_frame: None,
            last_kind: None,
            shown_scale: None,
        }
    }

    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Drain redraw requests until the scheduler closes, then close the surface.
    pub async fn run<S: DisplaySurface>(mut self, scheduler: Arc<RedrawScheduler>, mut surface: S) {
        while let Some(kind) = scheduler.next().await {
            match self.redraw(kind, &mut surface) {
                Ok(Some(stats)) => {
                    trace!(?kind, visible = stats.visible, drawn = stats.drawn, "Frame published");
                }
                Ok(None) => {}
                Err(SurfaceError::Closed) => {
                    debug!("Display closed, stopping render loop");
                    break;
                }
                Err(e) => error!(error = %e, ?kind, "Failed to publish frame"),
            }
        }

        scheduler.close();
        surface.close();
        debug!("Render loop stopped");
    }

    /// Perform one redraw. Returns `None` when the request was swallowed.
    ///
    /// A periodic redraw that arrives while the previous redraw was an
    /// in-place rescale is dropped: a zoom gesture is still in progress.
    pub fn redraw(
        &mut self,
        kind: RedrawKind,
        surface: &mut dyn DisplaySurface,
    ) -> Result<Option<FrameStats>, SurfaceError> {
        if kind == RedrawKind::Periodic && self.last_kind == Some(RedrawKind::InPlaceRescale) {
            trace!("Swallowing periodic redraw during zoom gesture");
            return Ok(None);
        }
        self.last_kind = Some(kind);

        let (width, height) = surface.size();
        let view = self.viewport.read().with_size(width, height);

        let stats = match kind {
            RedrawKind::Full | RedrawKind::Periodic => self.draw_full(&view, surface)?,
            RedrawKind::InPlaceRescale => self.draw_rescaled(&view, surface)?,
        };

        if self.shown_scale != Some(view.scale()) {
            self.shown_scale = Some(view.scale());
            surface.set_title(&format!("{} ({:.2}x)", self.title, 1.0 / view.scale()));
        }

        Ok(Some(stats))
    }

    fn draw_full(
        &mut self,
        view: &Viewport,
        surface: &mut dyn DisplaySurface,
    ) -> Result<FrameStats, SurfaceError> {
        let (image, stats) = compose_frame(&self.scaled, view, self.background);
        publish(&image, self.background, surface)?;
        self.last_frame = Some(Frame {
            image,
            scale: view.scale(),
        });
        Ok(stats)
    }

    fn draw_rescaled(
        &mut self,
        view: &Viewport,
        surface: &mut dyn DisplaySurface,
    ) -> Result<FrameStats, SurfaceError> {
        let Some(frame) = &self.last_frame else {
            return self.draw_full(view, surface);
        };

        let ratio = view.scale() / frame.scale;
        let image = rescale_frame(&frame.image, ratio, self.background);
        publish(&image, self.background, surface)?;
        Ok(FrameStats::default())
    }
}

/// Compose a frame for `view` from whatever scaled tiles are ready.
pub fn compose_frame(
    scaled: &ScaledTileStore,
    view: &Viewport,
    background: Rgba<u8>,
) -> (RgbaImage, FrameStats) {
    let (width, height) = view.size();
    let mut frame = RgbaImage::from_pixel(width, height, background);

    // Only the populated part of the plane can hold tiles
    let range = scaled
        .base()
        .index()
        .bounds()
        .and_then(|(min, max)| view.visible_tiles().intersection(&TileRange { min, max }));
    let mut stats = FrameStats {
        visible: range.map_or(0, |range| range.len()),
        drawn: 0,
    };

    for coord in range.iter().flat_map(TileRange::iter) {
        if let ScaledStatus::Ready(tile) = scaled.get(coord, view.scale()) {
            let (x, y) = view.tile_origin(coord);
            imageops::replace(&mut frame, tile.as_ref(), x, y);
            stats.drawn += 1;
        }
    }

    (frame, stats)
}

/// Approximate `frame` at a new scale, anchored at the frame center.
///
/// `ratio` is new scale over old scale: below 1 zooms in (the middle of the
/// frame is enlarged), above 1 zooms out (the frame shrinks and the border
/// is filled with `background`).
pub fn rescale_frame(frame: &RgbaImage, ratio: f64, background: Rgba<u8>) -> RgbaImage {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 || !ratio.is_finite() || ratio <= 0.0 || ratio == 1.0 {
        return frame.clone();
    }

    let span = |size: u32, factor: f64| ((f64::from(size) * factor).round() as u32).clamp(1, size);

    if ratio < 1.0 {
        let (crop_w, crop_h) = (span(width, ratio), span(height, ratio));
        let crop = imageops::crop_imm(
            frame,
            (width - crop_w) / 2,
            (height - crop_h) / 2,
            crop_w,
            crop_h,
        )
        .to_image();
        imageops::resize(&crop, width, height, FilterType::Nearest)
    } else {
        let (small_w, small_h) = (span(width, 1.0 / ratio), span(height, 1.0 / ratio));
        let small = imageops::resize(frame, small_w, small_h, FilterType::Nearest);
        let mut canvas = RgbaImage::from_pixel(width, height, background);
        imageops::replace(
            &mut canvas,
            &small,
            i64::from((width - small_w) / 2),
            i64::from((height - small_h) / 2),
        );
        canvas
    }
}

/// Copy `frame` into the surface's screen buffer and flush it.
fn publish(
    frame: &RgbaImage,
    background: Rgba<u8>,
    surface: &mut dyn DisplaySurface,
) -> Result<(), SurfaceError> {
    let buffer = surface.screen_buffer();
    if buffer.dimensions() == frame.dimensions() {
        buffer.copy_from_slice(frame.as_raw());
    } else {
        for pixel in buffer.pixels_mut() {
            *pixel = background;
        }
        imageops::replace(buffer, frame, 0, 0);
    }
    surface.flush()
}

// =============================================================================
// Tests
// =============================================================================
