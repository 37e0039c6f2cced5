//! Interaction, scheduling and rendering wired together over an in-memory
//! display.

use std::sync::Arc;
use std::time::Duration;

use image::Rgba;
use parking_lot::RwLock;
use tile_zoom::tile::{GridCoord, ScaledTileStore, TileIndex, TileStore};
use tile_zoom::view::{
    run_ticker, InteractionController, Key, MemorySurface, PointerButton, RedrawKind,
    RedrawScheduler, RenderLoop, ScreenPoint, SharedViewport, SurfaceEvent, Viewport,
    DEFAULT_BACKGROUND,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use super::test_utils::{eventually, CountingSource};

const SETTLE: Duration = Duration::from_secs(10);
const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);
const GREEN: Rgba<u8> = Rgba([20, 220, 20, 255]);

struct Viewer {
    events: UnboundedSender<SurfaceEvent>,
    surface: MemorySurface,
    viewport: SharedViewport,
    scaled: Arc<ScaledTileStore>,
    scheduler: Arc<RedrawScheduler>,
    interaction: JoinHandle<()>,
    render: JoinHandle<()>,
}

/// A 40x40 view over 16px tiles: red at (0, 0), green at (-1, -1).
async fn start_viewer() -> Viewer {
    let source = Arc::new(
        CountingSource::new(Duration::from_millis(5))
            .with_tile(0, 0, 16, RED.0)
            .with_tile(-1, -1, 16, GREEN.0),
    );
    let index = Arc::new(TileIndex::build(source.as_ref()).await.unwrap());
    let base = Arc::new(TileStore::new(index, source, Handle::current()));
    let scaled = Arc::new(ScaledTileStore::new(base, Handle::current()));

    let viewport: SharedViewport = Arc::new(RwLock::new(
        Viewport::new(40, 40).with_tile_size(16).with_min_scale(0.25),
    ));
    let scheduler = Arc::new(RedrawScheduler::new());
    let surface = MemorySurface::create(40, 40);
    let (events, events_rx) = mpsc::unbounded_channel();

    let interaction = tokio::spawn(
        InteractionController::new(
            Arc::clone(&viewport),
            Arc::clone(&scaled),
            Arc::clone(&scheduler),
        )
        .run(events_rx),
    );
    let render = tokio::spawn(
        RenderLoop::new(Arc::clone(&scaled), Arc::clone(&viewport))
            .run(Arc::clone(&scheduler), surface.clone()),
    );
    tokio::spawn(run_ticker(Arc::clone(&scheduler), Duration::from_millis(20)));

    Viewer {
        events,
        surface,
        viewport,
        scaled,
        scheduler,
        interaction,
        render,
    }
}

impl Viewer {
    fn send(&self, event: SurfaceEvent) {
        self.events.send(event).unwrap();
    }

    fn drag(&self, button: PointerButton, from: (f64, f64), to: (f64, f64)) {
        self.send(SurfaceEvent::PointerDrag {
            button,
            from: ScreenPoint::new(from.0, from.1),
            to: ScreenPoint::new(to.0, to.1),
        });
    }

    /// Wait for a published frame whose pixel at `(x, y)` is `color`.
    async fn wait_for_pixel(&self, x: u32, y: u32, color: Rgba<u8>) {
        eventually(SETTLE, || {
            self.surface
                .last_frame()
                .filter(|frame| frame.get_pixel(x, y) == &color)
                .map(|_| ())
        })
        .await;
    }

    async fn quit(self) {
        self.send(SurfaceEvent::KeyTyped(Key::Escape));
        self.interaction.await.unwrap();
        self.render.await.unwrap();
        assert!(self.scheduler.is_closed());
        assert!(self.surface.is_closed());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tiles_appear_after_loading() {
    let viewer = start_viewer().await;
    viewer.scheduler.request(RedrawKind::Full);

    // Tile (0, 0) sits up and right of the window center at (20, 20)
    viewer.wait_for_pixel(28, 12, RED).await;
    viewer.wait_for_pixel(12, 28, GREEN).await;

    let frame = viewer.surface.last_frame().unwrap();
    assert_eq!(frame.dimensions(), (40, 40));
    assert_eq!(frame.get_pixel(12, 12), &DEFAULT_BACKGROUND);
    assert_eq!(viewer.surface.title(), "tile-zoom (1.00x)");

    viewer.quit().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pan_moves_content_with_pointer() {
    let viewer = start_viewer().await;
    viewer.scheduler.request(RedrawKind::Full);
    viewer.wait_for_pixel(28, 12, RED).await;

    // Drag right by 16px: the red tile now starts at x = 36
    viewer.drag(PointerButton::Primary, (10.0, 10.0), (26.0, 10.0));
    viewer.wait_for_pixel(38, 12, RED).await;
    viewer.wait_for_pixel(28, 12, DEFAULT_BACKGROUND).await;

    assert_eq!(viewer.viewport.read().center(), (-16.0, 0.0));
    viewer.quit().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zoom_gesture_then_release() {
    let viewer = start_viewer().await;
    viewer.scheduler.request(RedrawKind::Full);
    viewer.wait_for_pixel(28, 12, RED).await;

    // 200px upward on the secondary button: scale 1 -> 4
    viewer.send(SurfaceEvent::PointerDown {
        button: PointerButton::Secondary,
        at: ScreenPoint::new(20.0, 300.0),
    });
    viewer.drag(PointerButton::Secondary, (20.0, 300.0), (20.0, 100.0));
    eventually(SETTLE, || (viewer.viewport.read().scale() == 4.0).then_some(())).await;

    // The in-place rescale shrinks the last frame to 10x10 around the center
    viewer.wait_for_pixel(28, 12, DEFAULT_BACKGROUND).await;

    // Populate the scaled cache so the release has something to drop
    eventually(SETTLE, || {
        viewer
            .scaled
            .get(GridCoord::new(0, 0), 4.0)
            .is_ready()
            .then_some(())
    })
    .await;
    assert!(!viewer.scaled.is_empty());
    let generation = viewer.scaled.generation();

    viewer.send(SurfaceEvent::PointerUp {
        button: PointerButton::Secondary,
    });
    eventually(SETTLE, || {
        (viewer.scaled.generation() == generation + 1).then_some(())
    })
    .await;

    // The full redraw after release repopulates the cache at scale 4
    eventually(SETTLE, || (!viewer.scaled.is_empty()).then_some(())).await;
    viewer.wait_for_pixel(22, 18, RED).await;
    eventually(SETTLE, || (viewer.surface.title() == "tile-zoom (0.25x)").then_some(())).await;
    assert_eq!(viewer.scaled.base().ready_count(), 2);

    viewer.quit().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resize_changes_frame_size() {
    let viewer = start_viewer().await;
    viewer.scheduler.request(RedrawKind::Full);
    viewer.wait_for_pixel(28, 12, RED).await;

    viewer.surface.set_size(64, 48);
    viewer.send(SurfaceEvent::Resize {
        width: 64,
        height: 48,
    });

    // Center moves to (32, 24): tile (0, 0) spans x 32..48, y 8..24
    viewer.wait_for_pixel(40, 16, RED).await;
    assert_eq!(viewer.viewport.read().size(), (64, 48));

    viewer.quit().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_event_stops_everything() {
    let viewer = start_viewer().await;
    viewer.send(SurfaceEvent::Close);

    viewer.interaction.await.unwrap();
    viewer.render.await.unwrap();
    assert!(viewer.scheduler.is_closed());
    assert!(viewer.surface.is_closed());
}

#[tokio::test]
async fn test_burst_of_requests_yields_one_frame() {
    let source = Arc::new(CountingSource::new(Duration::ZERO));
    let index = Arc::new(TileIndex::build(source.as_ref()).await.unwrap());
    let base = Arc::new(TileStore::new(index, source, Handle::current()));
    let scaled = Arc::new(ScaledTileStore::new(base, Handle::current()));
    let viewport: SharedViewport = Arc::new(RwLock::new(Viewport::new(8, 8)));
    let scheduler = Arc::new(RedrawScheduler::new());
    let surface = MemorySurface::create(8, 8);

    for _ in 0..100 {
        scheduler.request(RedrawKind::Periodic);
        scheduler.request(RedrawKind::Full);
    }

    let render = tokio::spawn(
        RenderLoop::new(scaled, viewport).run(Arc::clone(&scheduler), surface.clone()),
    );
    eventually(SETTLE, || (surface.flush_count() == 1).then_some(())).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(surface.flush_count(), 1);
    // Periodic entered the empty slot, Full replaced it, the rest coalesced
    assert_eq!(scheduler.accepted(), 2);
    assert_eq!(scheduler.dropped(), 198);

    scheduler.close();
    render.await.unwrap();
}
