//! Tile source collaborator.
//!
//! A [`TileSource`] discovers which grid coordinates have backing data and
//! decodes a single tile on demand. [`DirectorySource`] is the on-disk
//! implementation: one image file per tile, named after its grid position.
//!
//! # Naming Convention
//!
//! A tile file stem is `<row><n|s><col><e|w>`, e.g. `3n2w.png`:
//!
//! | Stem part | Grid value  |
//! |-----------|-------------|
//! | `Nn`      | `y = N - 1` |
//! | `Ns`      | `y = -N`    |
//! | `Ne`      | `x = N - 1` |
//! | `Nw`      | `x = -N`    |
//!
//! so `1n1e` is the tile directly north-east of the world origin and
//! `1s1w` the one directly south-west of it.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbaImage;
use tracing::{debug, warn};

use super::GridCoord;
use crate::error::{SourceError, TileError};

/// File extensions recognized as tiles (compared case-insensitively).
const TILE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

// =============================================================================
// Source Handle
// =============================================================================

/// Opaque reference to one tile's backing data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceHandle(PathBuf);

impl SourceHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// The location this handle refers to.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// One discovered tile: where it sits on the grid and how to load it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileEntry {
    pub coord: GridCoord,
    pub handle: SourceHandle,
}

impl TileEntry {
    pub fn new(coord: GridCoord, handle: SourceHandle) -> Self {
        Self { coord, handle }
    }
}

// =============================================================================
// TileSource Trait
// =============================================================================

/// Backing store for tiles.
///
/// `scan` runs once at startup. `decode` is invoked from blocking worker
/// threads, at most once per coordinate for the lifetime of a cache.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// List every tile the source can provide, in registration order.
    async fn scan(&self) -> Result<Vec<TileEntry>, SourceError>;

    /// Decode the tile behind `handle` into an RGBA raster.
    fn decode(&self, handle: &SourceHandle) -> Result<RgbaImage, TileError>;
}

// =============================================================================
// Directory Source
// =============================================================================

/// Tile source backed by a flat directory of image files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    strict_names: bool,
}

impl DirectorySource {
    /// Create a source that skips (and logs) files with malformed names.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            strict_names: false,
        }
    }

    /// Fail the scan on the first malformed tile name instead of skipping it.
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }
}

#[async_trait]
impl TileSource for DirectorySource {
    async fn scan(&self) -> Result<Vec<TileEntry>, SourceError> {
        debug!(root = %self.root.display(), "Scanning tile directory");

        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(SourceError::NotADirectory(
                self.root.display().to_string(),
            ));
        }

        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| io_error(&self.root, e))?
        {
            let path = entry.path();
            if has_tile_extension(&path) {
                paths.push(path);
            }
        }

        // Registration order must not depend on the platform's directory order
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                warn!(path = %path.display(), "Skipping tile file with non UTF-8 name");
                continue;
            };

            match parse_tile_name(stem) {
                Ok(coord) => entries.push(TileEntry::new(coord, SourceHandle::new(path))),
                Err(e) if self.strict_names => return Err(e),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping tile file"),
            }
        }

        Ok(entries)
    }

    fn decode(&self, handle: &SourceHandle) -> Result<RgbaImage, TileError> {
        let image = image::open(handle.path()).map_err(|e| TileError::Decode {
            source_name: handle.to_string(),
            message: e.to_string(),
        })?;
        Ok(image.into_rgba8())
    }
}

fn has_tile_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            TILE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn io_error(path: &Path, err: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

// =============================================================================
// Filename Parsing
// =============================================================================

/// Parse a tile file stem such as `"3n2w"` into its grid coordinate.
pub fn parse_tile_name(stem: &str) -> Result<GridCoord, SourceError> {
    let invalid = |reason: &'static str| SourceError::InvalidTileName {
        name: stem.to_string(),
        reason,
    };

    let (row, rest) = split_number(stem).ok_or_else(|| invalid("expected a row number"))?;
    let mut chars = rest.chars();
    let y = match chars.next() {
        Some('n') => row - 1,
        Some('s') => -row,
        _ => return Err(invalid("expected 'n' or 's' after the row")),
    };

    let (col, rest) =
        split_number(chars.as_str()).ok_or_else(|| invalid("expected a column number"))?;
    let x = match rest {
        "e" => col - 1,
        "w" => -col,
        _ => return Err(invalid("expected 'e' or 'w' after the column")),
    };

    Ok(GridCoord::new(x, y))
}

/// Split a leading run of ASCII digits off `s`.
fn split_number(s: &str) -> Option<(i64, &str)> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

// =============================================================================
// Tests
// =============================================================================
