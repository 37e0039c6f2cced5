//! Configuration management for tile-zoom.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `TILE_ZOOM_` prefix
//! - Defaults for every optional setting
//!
//! # Example
//!
//! ```ignore
//! use tile_zoom::config::Config;
//!
//! let config = Config::parse();
//! println!("Loading tiles from {}", config.tile_dir.display());
//! ```
//!
//! # Environment Variables
//!
//! - `TILE_ZOOM_WIDTH` / `TILE_ZOOM_HEIGHT` - Initial window size (default: 500x500)
//! - `TILE_ZOOM_TILE_SIZE` - Grid pitch in pixels (default: 2048)
//! - `TILE_ZOOM_CENTER_X` / `TILE_ZOOM_CENTER_Y` - Initial world center (default: 0,0)
//! - `TILE_ZOOM_SCALE` - Initial world units per screen pixel (default: 1)
//! - `TILE_ZOOM_MIN_SCALE` - Lower zoom clamp (default: 0.5)
//! - `TILE_ZOOM_REDRAW_INTERVAL_MS` - Periodic redraw period (default: 1000)
//! - `TILE_ZOOM_BACKGROUND` - Hex RGB fill color (default: 9b9b9b)
//! - `TILE_ZOOM_TITLE` - Window title prefix (default: tile-zoom)
//! - `TILE_ZOOM_STRICT_NAMES` - Abort on malformed tile filenames

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use image::Rgba;

use crate::tile::DEFAULT_TILE_SIZE;
use crate::view::{DEFAULT_MIN_SCALE, DEFAULT_REDRAW_INTERVAL, DEFAULT_TITLE};

// =============================================================================
// Default Values
// =============================================================================

/// Default window width and height.
pub const DEFAULT_WINDOW_SIZE: u32 = 500;

/// Default initial scale.
pub const DEFAULT_SCALE: f64 = 1.0;

/// Default background fill, as hex RGB.
pub const DEFAULT_BACKGROUND_HEX: &str = "9b9b9b";

// =============================================================================
// CLI Arguments
// =============================================================================

/// tile-zoom - A pannable, zoomable viewer for a plane of image tiles.
///
/// Tiles are read from TILE_DIR and named by grid position, e.g. `3n2w.png`.
/// Drag with the left button to pan, drag vertically with the right button
/// to zoom, press Escape to quit.
#[derive(Parser, Debug, Clone)]
#[command(name = "tile-zoom")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Directory containing the tile images.
    #[arg(value_name = "TILE_DIR")]
    pub tile_dir: PathBuf,

    // =========================================================================
    // Window Configuration
    // =========================================================================
    /// Initial window width in pixels.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE, env = "TILE_ZOOM_WIDTH")]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE, env = "TILE_ZOOM_HEIGHT")]
    pub height: u32,

    /// Background color shown where no tile is drawn (hex RGB).
    #[arg(long, default_value = DEFAULT_BACKGROUND_HEX, env = "TILE_ZOOM_BACKGROUND")]
    pub background: String,

    /// Window title; the current zoom factor is appended to it.
    #[arg(long, default_value = DEFAULT_TITLE, env = "TILE_ZOOM_TITLE")]
    pub title: String,

    // =========================================================================
    // View Configuration
    // =========================================================================
    /// Tile edge length in pixels; sets the grid pitch.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "TILE_ZOOM_TILE_SIZE")]
    pub tile_size: u32,

    /// Initial world x coordinate at the window center.
    #[arg(long, default_value_t = 0.0, env = "TILE_ZOOM_CENTER_X", allow_hyphen_values = true)]
    pub center_x: f64,

    /// Initial world y coordinate at the window center.
    #[arg(long, default_value_t = 0.0, env = "TILE_ZOOM_CENTER_Y", allow_hyphen_values = true)]
    pub center_y: f64,

    /// Initial scale in world pixels per screen pixel.
    #[arg(long, default_value_t = DEFAULT_SCALE, env = "TILE_ZOOM_SCALE")]
    pub scale: f64,

    /// Smallest scale reachable by zooming in.
    #[arg(long, default_value_t = DEFAULT_MIN_SCALE, env = "TILE_ZOOM_MIN_SCALE")]
    pub min_scale: f64,

    /// Period of the unconditional redraw, in milliseconds.
    #[arg(
        long,
        default_value_t = DEFAULT_REDRAW_INTERVAL.as_millis() as u64,
        env = "TILE_ZOOM_REDRAW_INTERVAL_MS"
    )]
    pub redraw_interval_ms: u64,

    // =========================================================================
    // Loading Configuration
    // =========================================================================
    /// Fail on tile filenames that do not follow the naming convention
    /// instead of skipping them.
    #[arg(long, default_value_t = false, env = "TILE_ZOOM_STRICT_NAMES")]
    pub strict_names: bool,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("width and height must be greater than 0".to_string());
        }

        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }

        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return Err("min_scale must be a positive number".to_string());
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err("scale must be a positive number".to_string());
        }
        if self.scale < self.min_scale {
            return Err(format!(
                "scale ({}) must not be below min_scale ({})",
                self.scale, self.min_scale
            ));
        }

        if !(self.center_x.is_finite() && self.center_y.is_finite()) {
            return Err("center coordinates must be finite".to_string());
        }

        if self.redraw_interval_ms == 0 {
            return Err("redraw_interval_ms must be greater than 0".to_string());
        }

        self.background_color()?;

        Ok(())
    }

    /// Parsed background color.
    pub fn background_color(&self) -> Result<Rgba<u8>, String> {
        parse_hex_color(&self.background)
    }

    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.redraw_interval_ms)
    }
}

/// Parse `rrggbb` or `#rrggbb` into an opaque color.
pub fn parse_hex_color(text: &str) -> Result<Rgba<u8>, String> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("background must be six hex digits, got '{text}'"));
    }

    let channel = |at: usize| {
        u8::from_str_radix(&hex[at..at + 2], 16)
            .map_err(|e| format!("background '{text}' is invalid: {e}"))
    };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

// =============================================================================
// Tests
// =============================================================================
