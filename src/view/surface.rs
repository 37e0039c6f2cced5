//! Display surface collaborator.
//!
//! The render loop only needs somewhere to draw RGBA pixels and a way to
//! publish them; the interaction task only needs a stream of
//! [`SurfaceEvent`]s. [`DisplaySurface`] captures the first half,
//! [`MemorySurface`] is an in-process implementation that records every
//! published frame.

use std::sync::Arc;

use image::RgbaImage;
use parking_lot::Mutex;

use crate::error::SurfaceError;

// =============================================================================
// Events
// =============================================================================

/// Pointer button, by role rather than physical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Pans the view.
    Primary,
    /// Zooms the view.
    Secondary,
    Middle,
}

/// A position in window pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Char(char),
    Other,
}

/// Input delivered by the display surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    PointerDown {
        button: PointerButton,
        at: ScreenPoint,
    },
    PointerDrag {
        button: PointerButton,
        from: ScreenPoint,
        to: ScreenPoint,
    },
    PointerUp {
        button: PointerButton,
    },
    KeyTyped(Key),
    Resize {
        width: u32,
        height: u32,
    },
    Close,
}

// =============================================================================
// DisplaySurface Trait
// =============================================================================

/// Pixel sink owned by the render loop.
pub trait DisplaySurface: Send {
    /// Current drawable size in pixels.
    fn size(&self) -> (u32, u32);

    /// Buffer to draw the next frame into, sized to [`size`](Self::size).
    fn screen_buffer(&mut self) -> &mut RgbaImage;

    /// Publish the contents of the screen buffer.
    fn flush(&mut self) -> Result<(), SurfaceError>;

    fn set_title(&mut self, title: &str);

    /// Tear the display down. Later flushes fail with [`SurfaceError::Closed`].
    fn close(&mut self);
}

// =============================================================================
// Memory Surface
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    size: (u32, u32),
    frames: Vec<RgbaImage>,
    title: String,
    closed: bool,
}

/// Surface that keeps every flushed frame in memory.
///
/// Clones share the recorded state, so a test can keep one handle while the
/// render loop owns another.
#[derive(Debug)]
pub struct MemorySurface {
    buffer: RgbaImage,
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySurface {
    pub fn create(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::new(width, height),
            state: Arc::new(Mutex::new(MemoryState {
                size: (width, height),
                ..MemoryState::default()
            })),
        }
    }

    /// Change the reported size, as a window resize would.
    pub fn set_size(&self, width: u32, height: u32) {
        self.state.lock().size = (width, height);
    }

    pub fn flush_count(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn last_frame(&self) -> Option<RgbaImage> {
        self.state.lock().frames.last().cloned()
    }

    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Clone for MemorySurface {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl DisplaySurface for MemorySurface {
    fn size(&self) -> (u32, u32) {
        self.state.lock().size
    }

    fn screen_buffer(&mut self) -> &mut RgbaImage {
        let (width, height) = self.size();
        if self.buffer.dimensions() != (width, height) {
            self.buffer = RgbaImage::new(width, height);
        }
        &mut self.buffer
    }

    fn flush(&mut self) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(SurfaceError::Closed);
        }
        state.frames.push(self.buffer.clone());
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        self.state.lock().title = title.to_string();
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }
}
