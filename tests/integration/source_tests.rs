//! Tile directory scanning and indexing against real files.

use std::sync::Arc;
use std::time::Duration;

use tile_zoom::error::SourceError;
use tile_zoom::tile::{DirectorySource, GridCoord, TileIndex, TileStatus, TileStore};
use tokio::runtime::Handle;

use super::test_utils::{eventually, png_tile, three_by_three_names, write_tiles};

#[tokio::test]
async fn test_three_by_three_directory_index() {
    let dir = tempfile::tempdir().unwrap();
    let names = three_by_three_names();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    write_tiles(dir.path(), &names, &png_tile(8, [10, 20, 30, 255]));

    let index = TileIndex::build(&DirectorySource::new(dir.path()))
        .await
        .unwrap();

    assert_eq!(index.len(), 9);
    assert_eq!(
        index.bounds(),
        Some((GridCoord::new(-2, -1), GridCoord::new(0, 1)))
    );
    assert!(index.contains(GridCoord::new(0, 0)));
    assert!(index.get(GridCoord::new(0, 0)).unwrap().path().ends_with("1n0w.png"));
    assert!(!index.contains(GridCoord::new(5, 5)));
}

#[tokio::test]
async fn test_duplicate_coordinates_resolve_by_name_order() {
    let dir = tempfile::tempdir().unwrap();
    // 0n0w and 1s0w both land on (0, -1); 1s0w sorts last
    write_tiles(dir.path(), &["0n0w.png", "1s0w.png"], &png_tile(4, [1, 2, 3, 255]));

    let index = TileIndex::build(&DirectorySource::new(dir.path()))
        .await
        .unwrap();

    assert_eq!(index.len(), 1);
    let handle = index.get(GridCoord::new(0, -1)).unwrap();
    assert!(handle.path().ends_with("1s0w.png"));
}

#[tokio::test]
async fn test_missing_directory_is_a_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let result = TileIndex::build(&DirectorySource::new(&missing)).await;
    assert!(matches!(result, Err(SourceError::Io { .. })));
}

#[tokio::test]
async fn test_malformed_names_are_skipped_unless_strict() {
    let dir = tempfile::tempdir().unwrap();
    write_tiles(dir.path(), &["1n1e.png", "thumbnail.png"], &png_tile(4, [0, 0, 0, 255]));

    let lenient = TileIndex::build(&DirectorySource::new(dir.path()))
        .await
        .unwrap();
    assert_eq!(lenient.len(), 1);

    let strict = TileIndex::build(&DirectorySource::new(dir.path()).with_strict_names(true)).await;
    assert!(matches!(strict, Err(SourceError::InvalidTileName { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_corrupt_tile_renders_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    write_tiles(dir.path(), &["1n1e.png"], &png_tile(4, [200, 0, 0, 255]));
    std::fs::write(dir.path().join("1n2e.png"), b"definitely not a png").unwrap();

    let source = Arc::new(DirectorySource::new(dir.path()));
    let index = Arc::new(TileIndex::build(source.as_ref()).await.unwrap());
    let store = TileStore::new(index, source, Handle::current());

    let good = GridCoord::new(0, 0);
    let bad = GridCoord::new(1, 0);
    assert!(matches!(store.get(bad), TileStatus::Pending));

    eventually(Duration::from_secs(10), || {
        matches!(store.get(bad), TileStatus::Absent).then_some(())
    })
    .await;
    let image = eventually(Duration::from_secs(10), || store.get(good).into_image()).await;

    assert_eq!(image.dimensions(), (4, 4));
    assert_eq!(store.decodes_started(), 2);
    assert!(matches!(store.get(bad), TileStatus::Absent));
    assert_eq!(store.decodes_started(), 2);
}
