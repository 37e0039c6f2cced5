//! Immutable map from grid coordinate to tile source handle.

use std::collections::HashMap;

use tracing::{info, warn};

use super::source::{SourceHandle, TileEntry, TileSource};
use super::GridCoord;
use crate::error::SourceError;

/// Read-only index of every tile the source can provide.
///
/// Built once at startup and shared without locking afterwards.
#[derive(Debug, Clone, Default)]
pub struct TileIndex {
    entries: HashMap<GridCoord, SourceHandle>,
    bounds: Option<(GridCoord, GridCoord)>,
}

impl TileIndex {
    /// Scan `source` and index its tiles.
    pub async fn build(source: &dyn TileSource) -> Result<Self, SourceError> {
        let entries = source.scan().await?;
        let index = Self::from_entries(entries);
        info!(tiles = index.len(), bounds = ?index.bounds(), "Indexed tiles");
        Ok(index)
    }

    /// Index entries in order. A later entry for the same coordinate replaces
    /// the earlier one.
    pub fn from_entries(entries: impl IntoIterator<Item = TileEntry>) -> Self {
        let mut map = HashMap::new();
        for TileEntry { coord, handle } in entries {
            if let Some(previous) = map.insert(coord, handle) {
                warn!(
                    %coord,
                    replaced = %previous,
                    by = %map[&coord],
                    "Duplicate tile coordinate"
                );
            }
        }
        let bounds = populated_bounds(map.keys().copied());
        Self {
            entries: map,
            bounds,
        }
    }

    /// Source handle for `coord`, if a tile exists there.
    pub fn get(&self, coord: GridCoord) -> Option<&SourceHandle> {
        self.entries.get(&coord)
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.entries.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inclusive `(min, max)` corners of the populated area.
    pub fn bounds(&self) -> Option<(GridCoord, GridCoord)> {
        self.bounds
    }
}

fn populated_bounds(mut coords: impl Iterator<Item = GridCoord>) -> Option<(GridCoord, GridCoord)> {
    let first = coords.next()?;
    Some(coords.fold((first, first), |(min, max), c| {
        (
            GridCoord::new(min.x.min(c.x), min.y.min(c.y)),
            GridCoord::new(max.x.max(c.x), max.y.max(c.y)),
        )
    }))
}
