//! Lazy base-resolution tile cache.
//!
//! # Slot Lifecycle
//!
//! ```text
//!   first get()            decode task publishes
//!  ───────────▶  Pending  ────────────────────────▶  Ready(image)
//!                    │
//!                    └──── decode fails ─────────▶  Absent (logged)
//! ```
//!
//! Coordinates without an index entry are Absent from the start and never
//! occupy a slot. Slots are never evicted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use super::index::TileIndex;
use super::source::{SourceHandle, TileSource};
use super::{GridCoord, TileImage};

/// Outcome of a base-tile lookup.
#[derive(Debug, Clone)]
pub enum TileStatus {
    /// The decoded tile.
    Ready(TileImage),

    /// Decoding is in flight; ask again on a later frame.
    Pending,

    /// No tile exists at this coordinate, or it failed to decode.
    Absent,
}

impl TileStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, TileStatus::Ready(_))
    }

    pub fn into_image(self) -> Option<TileImage> {
        match self {
            TileStatus::Ready(image) => Some(image),
            _ => None,
        }
    }
}

/// Single-assignment cell for one coordinate; `None` marks a failed decode.
type Slot = Arc<OnceCell<Option<TileImage>>>;

/// Base tile cache: coordinate to decoded image, decoded at most once.
///
/// # Thread Safety
///
/// `get` never waits on a decode. Installing the pending slot happens under
/// the map's shard lock, so concurrent misses on one coordinate start a
/// single decode between them.
pub struct TileStore {
    index: Arc<TileIndex>,
    source: Arc<dyn TileSource>,
    runtime: Handle,
    slots: DashMap<GridCoord, Slot>,
    decodes_started: AtomicU64,
}

impl TileStore {
    /// Create a store that runs decode tasks on `runtime`'s blocking pool.
    pub fn new(index: Arc<TileIndex>, source: Arc<dyn TileSource>, runtime: Handle) -> Self {
        Self {
            index,
            source,
            runtime,
            slots: DashMap::new(),
            decodes_started: AtomicU64::new(0),
        }
    }

    /// Look up the base tile at `coord` without blocking.
    pub fn get(&self, coord: GridCoord) -> TileStatus {
        let Some(handle) = self.index.get(coord) else {
            return TileStatus::Absent;
        };

        if let Some(slot) = self.slots.get(&coord) {
            return Self::status_of(slot.value());
        }

        let slot = match self.slots.entry(coord) {
            Entry::Occupied(occupied) => return Self::status_of(occupied.get()),
            Entry::Vacant(vacant) => {
                let slot: Slot = Arc::new(OnceCell::new());
                vacant.insert(Arc::clone(&slot));
                slot
            }
        };

        self.spawn_decode(coord, handle.clone(), slot);
        TileStatus::Pending
    }

    fn status_of(slot: &Slot) -> TileStatus {
        match slot.get() {
            None => TileStatus::Pending,
            Some(Some(image)) => TileStatus::Ready(Arc::clone(image)),
            Some(None) => TileStatus::Absent,
        }
    }

    fn spawn_decode(&self, coord: GridCoord, handle: SourceHandle, slot: Slot) {
        self.decodes_started.fetch_add(1, Ordering::Relaxed);
        let source = Arc::clone(&self.source);

        self.runtime.spawn_blocking(move || {
            debug!(%coord, source = %handle, "Decoding tile");

            let decoded = match source.decode(&handle) {
                Ok(image) => {
                    debug!(%coord, width = image.width(), height = image.height(), "Decoded tile");
                    Some(Arc::new(image))
                }
                Err(e) => {
                    error!(%coord, error = %e, "Tile decode failed, treating as absent");
                    None
                }
            };

            if slot.set(decoded).is_err() {
                warn!(%coord, "Tile slot was already published");
            }
        });
    }

    /// The index this store resolves coordinates against.
    pub fn index(&self) -> &TileIndex {
        &self.index
    }

    /// Number of coordinates with a slot (pending or settled).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of coordinates whose decoded image is available.
    pub fn ready_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value().get(), Some(Some(_))))
            .count()
    }

    /// Total decode tasks started over the store's lifetime.
    pub fn decodes_started(&self) -> u64 {
        self.decodes_started.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================
