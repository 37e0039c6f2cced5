//! Lazy cache of rescaled tiles.
//!
//! Each `(scale, x, y)` triple is resized at most once from its base tile.
//! Entries live in a generation object; [`ScaledTileStore::clear`] swaps in
//! a fresh, empty generation in one atomic store, so a reader sees either
//! the old cache or the new one and never a half-cleared map.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use image::imageops::{self, FilterType};
use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::store::{TileStatus, TileStore};
use super::{GridCoord, TileImage};

/// Resampling filter for scaled tiles.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Outcome of a scaled-tile lookup.
#[derive(Debug, Clone)]
pub enum ScaledStatus {
    /// The resized tile.
    Ready(TileImage),

    /// The resize is in flight.
    Pending,

    /// Nothing to show yet: the base tile is absent or still decoding, or the
    /// resize was only just started by this call.
    Unavailable,
}

impl ScaledStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ScaledStatus::Ready(_))
    }

    pub fn into_image(self) -> Option<TileImage> {
        match self {
            ScaledStatus::Ready(image) => Some(image),
            _ => None,
        }
    }
}

/// Target size of a tile rendered at `scale` world units per pixel.
///
/// Rounds half up and never returns a zero edge.
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let edge = |size: u32| ((0.5 + f64::from(size) / scale).floor() as u32).max(1);
    (edge(width), edge(height))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ScaledKey {
    scale_bits: u64,
    coord: GridCoord,
}

impl ScaledKey {
    fn new(coord: GridCoord, scale: f64) -> Self {
        Self {
            scale_bits: scale.to_bits(),
            coord,
        }
    }
}

type Slot = Arc<OnceCell<TileImage>>;

struct ScaledGeneration {
    id: u64,
    slots: DashMap<ScaledKey, Slot>,
}

impl ScaledGeneration {
    fn new(id: u64) -> Self {
        Self {
            id,
            slots: DashMap::new(),
        }
    }
}

/// Derived-tile cache keyed by `(scale, coordinate)`.
///
/// Every distinct scale value gets its own cache line, including the
/// transient values seen during a zoom gesture; call [`clear`] when the
/// gesture ends.
///
/// [`clear`]: ScaledTileStore::clear
pub struct ScaledTileStore {
    base: Arc<TileStore>,
    runtime: Handle,
    generation: ArcSwap<ScaledGeneration>,
    next_generation: AtomicU64,
    resizes_started: AtomicU64,
}

impl ScaledTileStore {
    /// Create a store deriving from `base`, resizing on `runtime`'s blocking pool.
    pub fn new(base: Arc<TileStore>, runtime: Handle) -> Self {
        Self {
            base,
            runtime,
            generation: ArcSwap::from_pointee(ScaledGeneration::new(0)),
            next_generation: AtomicU64::new(1),
            resizes_started: AtomicU64::new(0),
        }
    }

    /// Look up the tile at `coord` rendered at `scale`, without blocking.
    pub fn get(&self, coord: GridCoord, scale: f64) -> ScaledStatus {
        if !(scale.is_finite() && scale > 0.0) {
            warn!(scale, "Ignoring scaled tile request with invalid scale");
            return ScaledStatus::Unavailable;
        }

        let base = match self.base.get(coord) {
            TileStatus::Ready(image) => image,
            TileStatus::Pending | TileStatus::Absent => return ScaledStatus::Unavailable,
        };

        let key = ScaledKey::new(coord, scale);
        let generation = self.generation.load_full();

        if let Some(slot) = generation.slots.get(&key) {
            return Self::status_of(slot.value());
        }

        let slot = match generation.slots.entry(key) {
            Entry::Occupied(occupied) => return Self::status_of(occupied.get()),
            Entry::Vacant(vacant) => {
                let slot: Slot = Arc::new(OnceCell::new());
                vacant.insert(Arc::clone(&slot));
                slot
            }
        };

        self.spawn_resize(coord, scale, base, slot);
        ScaledStatus::Unavailable
    }

    fn status_of(slot: &Slot) -> ScaledStatus {
        match slot.get() {
            Some(image) => ScaledStatus::Ready(Arc::clone(image)),
            None => ScaledStatus::Pending,
        }
    }

    fn spawn_resize(&self, coord: GridCoord, scale: f64, base: TileImage, slot: Slot) {
        self.resizes_started.fetch_add(1, Ordering::Relaxed);

        self.runtime.spawn_blocking(move || {
            let (width, height) = scaled_dimensions(base.width(), base.height(), scale);
            let scaled = if (width, height) == base.dimensions() {
                base
            } else {
                debug!(%coord, scale, width, height, "Resizing tile");
                Arc::new(imageops::resize(base.as_ref(), width, height, RESIZE_FILTER))
            };

            if slot.set(scaled).is_err() {
                warn!(%coord, scale, "Scaled tile slot was already published");
            }
        });
    }

    /// Drop every scaled entry at once. The base store is untouched.
    ///
    /// Resizes still in flight publish into the discarded generation.
    pub fn clear(&self) {
        let id = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let previous = self.generation.swap(Arc::new(ScaledGeneration::new(id)));
        debug!(
            generation = id,
            dropped = previous.slots.len(),
            "Cleared scaled tile cache"
        );
    }

    /// Identifier of the live generation; bumps on every [`clear`](Self::clear).
    pub fn generation(&self) -> u64 {
        self.generation.load().id
    }

    /// Number of `(scale, coordinate)` entries in the live generation.
    pub fn len(&self) -> usize {
        self.generation.load().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total resize tasks started over the store's lifetime.
    pub fn resizes_started(&self) -> u64 {
        self.resizes_started.load(Ordering::Relaxed)
    }

    pub fn base(&self) -> &TileStore {
        &self.base
    }
}

// =============================================================================
// Tests
// =============================================================================
