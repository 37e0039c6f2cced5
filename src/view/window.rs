//! Native window backend.
//!
//! winit owns the main thread, so the window side and the tokio side talk
//! through two channels:
//!
//! ```text
//!   winit event loop (main thread)            tokio runtime
//! ┌──────────────────────────────┐      ┌─────────────────────────┐
//! │ WindowApp                    │─────►│ InteractionController   │
//! │  translates WindowEvent      │ mpsc │  (SurfaceEvent stream)  │
//! │                              │      └─────────────────────────┘
//! │  presents frames through     │      ┌─────────────────────────┐
//! │  softbuffer                  │◄─────│ RenderLoop              │
//! └──────────────────────────────┘proxy │  (WindowSurface)        │
//!                                       └─────────────────────────┘
//! ```
//!
//! Published frames go through a one-frame slot, so a slow window only ever
//! presents the newest frame.

use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use softbuffer::{Context, Surface};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::{Key as WinitKey, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use super::surface::{DisplaySurface, Key, PointerButton, ScreenPoint, SurfaceEvent};
use crate::error::SurfaceError;

/// Messages from the tokio side to the event loop.
#[derive(Debug, Clone)]
pub enum UserEvent {
    /// A new frame is waiting in the shared slot.
    FrameReady,
    SetTitle(String),
    Exit,
}

type FrameSlot = Arc<Mutex<Option<RgbaImage>>>;

fn pack_size(width: u32, height: u32) -> u64 {
    (u64::from(width) << 32) | u64::from(height)
}

fn unpack_size(packed: u64) -> (u32, u32) {
    ((packed >> 32) as u32, packed as u32)
}

/// softbuffer expects `0RGB` words.
fn pack_pixel(pixel: &Rgba<u8>) -> u32 {
    let [r, g, b, _] = pixel.0;
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

// =============================================================================
// WindowSurface
// =============================================================================

/// [`DisplaySurface`] handle for the render task.
pub struct WindowSurface {
    proxy: EventLoopProxy<UserEvent>,
    size: Arc<AtomicU64>,
    slot: FrameSlot,
    buffer: RgbaImage,
    closed: bool,
}

impl DisplaySurface for WindowSurface {
    fn size(&self) -> (u32, u32) {
        unpack_size(self.size.load(Ordering::Acquire))
    }

    fn screen_buffer(&mut self) -> &mut RgbaImage {
        let (width, height) = self.size();
        if self.buffer.dimensions() != (width, height) {
            self.buffer = RgbaImage::new(width, height);
        }
        &mut self.buffer
    }

    fn flush(&mut self) -> Result<(), SurfaceError> {
        if self.closed {
            return Err(SurfaceError::Closed);
        }

        let was_empty = self.slot.lock().replace(self.buffer.clone()).is_none();
        if was_empty {
            self.proxy
                .send_event(UserEvent::FrameReady)
                .map_err(|_| SurfaceError::Closed)?;
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        if self.proxy.send_event(UserEvent::SetTitle(title.to_string())).is_err() {
            debug!("Event loop gone, dropping title update");
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            // The loop may already have exited on its own
            let _ = self.proxy.send_event(UserEvent::Exit);
        }
    }
}

// =============================================================================
// WindowApp
// =============================================================================

struct WindowApp {
    title: String,
    size: Arc<AtomicU64>,
    slot: FrameSlot,
    events: UnboundedSender<SurfaceEvent>,
    window: Option<Rc<Window>>,
    // Kept alive alongside the surface
    _context: Option<Context<Rc<Window>>>,
    surface: Option<Surface<Rc<Window>, Rc<Window>>>,
    frame: Option<RgbaImage>,
    cursor: Option<ScreenPoint>,
    held: Vec<PointerButton>,
    error: Option<SurfaceError>,
}

impl WindowApp {
    fn emit(&self, event_loop: &ActiveEventLoop, event: SurfaceEvent) {
        if self.events.send(event).is_err() {
            debug!("Input consumer gone, exiting event loop");
            event_loop.exit();
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: SurfaceError) {
        error!(error = %err, "Window backend failed");
        self.error = Some(err);
        event_loop.exit();
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SurfaceError> {
        let (width, height) = unpack_size(self.size.load(Ordering::Acquire));
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(self.title.clone())
                    .with_inner_size(PhysicalSize::new(width.max(1), height.max(1))),
            )
            .map_err(|e| SurfaceError::Window(e.to_string()))?;
        let window = Rc::new(window);

        let context = Context::new(Rc::clone(&window))
            .map_err(|e| SurfaceError::Window(e.to_string()))?;
        let surface = Surface::new(&context, Rc::clone(&window))
            .map_err(|e| SurfaceError::Window(e.to_string()))?;

        let actual = window.inner_size();
        self.size
            .store(pack_size(actual.width, actual.height), Ordering::Release);
        debug!(width = actual.width, height = actual.height, "Window created");

        self.window = Some(window);
        self._context = Some(context);
        self.surface = Some(surface);
        Ok(())
    }

    fn present(&mut self) -> Result<(), SurfaceError> {
        let (Some(window), Some(surface), Some(frame)) =
            (&self.window, self.surface.as_mut(), &self.frame)
        else {
            return Ok(());
        };

        let size = window.inner_size();
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(());
        };

        surface
            .resize(width, height)
            .map_err(|e| SurfaceError::Buffer(e.to_string()))?;
        let mut buffer = surface
            .buffer_mut()
            .map_err(|e| SurfaceError::Buffer(e.to_string()))?;

        for (y, row) in buffer.chunks_exact_mut(width.get() as usize).enumerate() {
            for (x, out) in row.iter_mut().enumerate() {
                *out = frame
                    .get_pixel_checked(x as u32, y as u32)
                    .map_or(0, pack_pixel);
            }
        }

        buffer
            .present()
            .map_err(|e| SurfaceError::Buffer(e.to_string()))
    }

    fn pointer_button(&mut self, event_loop: &ActiveEventLoop, state: ElementState, button: MouseButton) {
        let button = match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Right => PointerButton::Secondary,
            MouseButton::Middle => PointerButton::Middle,
            _ => return,
        };

        match state {
            ElementState::Pressed => {
                if !self.held.contains(&button) {
                    self.held.push(button);
                }
                let at = self.cursor.unwrap_or_default();
                self.emit(event_loop, SurfaceEvent::PointerDown { button, at });
            }
            ElementState::Released => {
                self.held.retain(|held| *held != button);
                self.emit(event_loop, SurfaceEvent::PointerUp { button });
            }
        }
    }

    fn cursor_moved(&mut self, event_loop: &ActiveEventLoop, to: ScreenPoint) {
        if let Some(from) = self.cursor {
            for &button in &self.held {
                self.emit(event_loop, SurfaceEvent::PointerDrag { button, from, to });
            }
        }
        self.cursor = Some(to);
    }
}

impl ApplicationHandler<UserEvent> for WindowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.open_window(event_loop) {
            self.fail(event_loop, err);
            return;
        }

        let (width, height) = unpack_size(self.size.load(Ordering::Acquire));
        self.emit(event_loop, SurfaceEvent::Resize { width, height });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.emit(event_loop, SurfaceEvent::Close);
            }
            WindowEvent::Resized(size) => {
                self.size
                    .store(pack_size(size.width, size.height), Ordering::Release);
                self.emit(
                    event_loop,
                    SurfaceEvent::Resize {
                        width: size.width,
                        height: size.height,
                    },
                );
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.pointer_button(event_loop, state, button);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(event_loop, ScreenPoint::new(position.x, position.y));
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let key = match &event.logical_key {
                    WinitKey::Named(NamedKey::Escape) => Key::Escape,
                    WinitKey::Character(text) => text.chars().next().map_or(Key::Other, Key::Char),
                    _ => Key::Other,
                };
                self.emit(event_loop, SurfaceEvent::KeyTyped(key));
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.present() {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::FrameReady => {
                if let Some(frame) = self.slot.lock().take() {
                    self.frame = Some(frame);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            UserEvent::SetTitle(title) => {
                if let Some(window) = &self.window {
                    window.set_title(&title);
                }
            }
            UserEvent::Exit => {
                debug!("Exit requested by render loop");
                event_loop.exit();
            }
        }
    }
}

// =============================================================================
// WindowBackend
// =============================================================================

/// The event loop plus its application state, ready to run on the main thread.
pub struct WindowBackend {
    event_loop: EventLoop<UserEvent>,
    app: WindowApp,
}

impl WindowBackend {
    /// Build the event loop and the handles the tokio side needs.
    ///
    /// The window itself is created once the loop starts running.
    pub fn create(
        width: u32,
        height: u32,
        title: &str,
    ) -> Result<(Self, WindowSurface, UnboundedReceiver<SurfaceEvent>), SurfaceError> {
        let event_loop = EventLoop::<UserEvent>::with_user_event()
            .build()
            .map_err(|e| SurfaceError::EventLoop(e.to_string()))?;

        let size = Arc::new(AtomicU64::new(pack_size(width, height)));
        let slot: FrameSlot = Arc::new(Mutex::new(None));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let surface = WindowSurface {
            proxy: event_loop.create_proxy(),
            size: Arc::clone(&size),
            slot: Arc::clone(&slot),
            buffer: RgbaImage::new(width, height),
            closed: false,
        };

        let app = WindowApp {
            title: title.to_string(),
            size,
            slot,
            events: events_tx,
            window: None,
            _context: None,
            surface: None,
            frame: None,
            cursor: None,
            held: Vec::new(),
            error: None,
        };

        Ok((Self { event_loop, app }, surface, events_rx))
    }

    /// Run until the window closes. Blocks the calling thread.
    pub fn run(self) -> Result<(), SurfaceError> {
        let Self { event_loop, mut app } = self;
        event_loop
            .run_app(&mut app)
            .map_err(|e| SurfaceError::EventLoop(e.to_string()))?;

        if app.frame.is_none() {
            warn!("Window closed before any frame was presented");
        }
        match app.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
