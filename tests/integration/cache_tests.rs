//! Base and scaled tile cache behavior under real and concurrent load.

use std::sync::Arc;
use std::time::Duration;

use tile_zoom::tile::{
    DirectorySource, GridCoord, ScaledStatus, ScaledTileStore, TileIndex, TileStatus, TileStore,
};
use tokio::runtime::Handle;

use super::test_utils::{eventually, png_tile, three_by_three_names, CountingSource};

const SETTLE: Duration = Duration::from_secs(30);

async fn counting_store(source: Arc<CountingSource>) -> Arc<TileStore> {
    let index = Arc::new(TileIndex::build(source.as_ref()).await.unwrap());
    Arc::new(TileStore::new(index, source, Handle::current()))
}

// =============================================================================
// Full-size Tile Directory
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_size_grid_pending_then_ready() {
    let dir = tempfile::tempdir().unwrap();
    let encoded = png_tile(2048, [90, 140, 200, 255]);
    for name in three_by_three_names() {
        std::fs::write(dir.path().join(name), &encoded).unwrap();
    }

    let source = Arc::new(DirectorySource::new(dir.path()));
    let index = Arc::new(TileIndex::build(source.as_ref()).await.unwrap());
    let store = TileStore::new(index, source, Handle::current());

    let origin = GridCoord::new(0, 0);
    assert!(matches!(store.get(origin), TileStatus::Pending));

    let tile = eventually(SETTLE, || store.get(origin).into_image()).await;
    assert_eq!(tile.dimensions(), (2048, 2048));
    assert_eq!(tile.get_pixel(1000, 1000).0, [90, 140, 200, 255]);

    let outside = GridCoord::new(5, 5);
    for _ in 0..10 {
        assert!(matches!(store.get(outside), TileStatus::Absent));
    }
    assert_eq!(store.decodes_started(), 1);
    assert_eq!(store.len(), 1);
}

// =============================================================================
// Memoization
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_decode_each_tile_once() {
    let source = Arc::new(
        CountingSource::new(Duration::from_millis(50))
            .with_tile(0, 0, 16, [255, 0, 0, 255])
            .with_tile(1, 0, 16, [0, 255, 0, 255])
            .with_tile(0, 1, 16, [0, 0, 255, 255])
            .with_tile(-1, -1, 16, [9, 9, 9, 255]),
    );
    let store = counting_store(Arc::clone(&source)).await;
    let coords = [
        GridCoord::new(0, 0),
        GridCoord::new(1, 0),
        GridCoord::new(0, 1),
        GridCoord::new(-1, -1),
    ];

    let mut tasks = Vec::new();
    for i in 0..64 {
        let store = Arc::clone(&store);
        let coord = coords[i % coords.len()];
        tasks.push(tokio::spawn(async move {
            eventually(SETTLE, || store.get(coord).into_image()).await
        }));
    }

    let mut images = Vec::new();
    for task in tasks {
        images.push(task.await.unwrap());
    }

    assert_eq!(source.decode_count(), 4);
    assert_eq!(source.max_decodes_per_tile(), 1);
    assert_eq!(store.decodes_started(), 4);
    assert_eq!(store.ready_count(), 4);

    for (i, image) in images.iter().enumerate() {
        let first = &images[i % coords.len()];
        assert!(Arc::ptr_eq(image, first), "callers must share one image");
    }
}

#[tokio::test]
async fn test_lookups_return_while_decode_runs() {
    let source = Arc::new(
        CountingSource::new(Duration::from_millis(300)).with_tile(0, 0, 8, [1, 1, 1, 255]),
    );
    let store = counting_store(source).await;

    let started = std::time::Instant::now();
    for _ in 0..1000 {
        assert!(!store.get(GridCoord::new(0, 0)).is_ready());
    }
    assert!(started.elapsed() < Duration::from_millis(300));
}

#[tokio::test]
async fn test_absent_coordinates_never_decode() {
    let source = Arc::new(CountingSource::new(Duration::ZERO).with_tile(0, 0, 8, [1, 1, 1, 255]));
    let store = counting_store(Arc::clone(&source)).await;

    for x in -20..20 {
        for y in -20..20 {
            if (x, y) != (0, 0) {
                assert!(matches!(store.get(GridCoord::new(x, y)), TileStatus::Absent));
            }
        }
    }

    assert_eq!(source.decode_count(), 0);
    assert!(store.is_empty());
}

// =============================================================================
// Scaled Tiles
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scaled_tiles_per_scale_and_clear() {
    let source = Arc::new(CountingSource::new(Duration::ZERO).with_tile(0, 0, 100, [5, 6, 7, 255]));
    let base = counting_store(Arc::clone(&source)).await;
    let scaled = ScaledTileStore::new(Arc::clone(&base), Handle::current());
    let coord = GridCoord::new(0, 0);

    assert!(matches!(scaled.get(coord, 3.0), ScaledStatus::Unavailable));

    let third = eventually(SETTLE, || scaled.get(coord, 3.0).into_image()).await;
    let quarter = eventually(SETTLE, || scaled.get(coord, 4.0).into_image()).await;
    let enlarged = eventually(SETTLE, || scaled.get(coord, 0.5).into_image()).await;

    assert_eq!(third.dimensions(), (33, 33));
    assert_eq!(quarter.dimensions(), (25, 25));
    assert_eq!(enlarged.dimensions(), (200, 200));
    assert_eq!(scaled.len(), 3);
    assert_eq!(scaled.resizes_started(), 3);

    scaled.clear();
    assert!(scaled.is_empty());
    assert!(matches!(base.get(coord), TileStatus::Ready(_)));

    let again = eventually(SETTLE, || scaled.get(coord, 3.0).into_image()).await;
    assert!(!Arc::ptr_eq(&again, &third));
    assert_eq!(scaled.resizes_started(), 4);
    assert_eq!(source.decode_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scaled_requests_resize_once() {
    let source = Arc::new(CountingSource::new(Duration::ZERO).with_tile(2, 3, 64, [0, 0, 0, 255]));
    let base = counting_store(source).await;
    let coord = GridCoord::new(2, 3);
    eventually(SETTLE, || base.get(coord).into_image()).await;

    let scaled = Arc::new(ScaledTileStore::new(base, Handle::current()));
    let mut tasks = Vec::new();
    for _ in 0..32 {
        let scaled = Arc::clone(&scaled);
        tasks.push(tokio::spawn(async move {
            eventually(SETTLE, || scaled.get(coord, 2.0).into_image()).await
        }));
    }

    let first = tasks.remove(0).await.unwrap();
    for task in tasks {
        assert!(Arc::ptr_eq(&first, &task.await.unwrap()));
    }
    assert_eq!(first.dimensions(), (32, 32));
    assert_eq!(scaled.resizes_started(), 1);
}
