//! Backend-agnostic window management traits
//!
//! The event loop and window creation only talk to these traits. The GLFW
//! implementation lives in [`super::glfw_backend`]; tests supply scripted
//! fakes.

use crate::error::CoreResult;
use crate::graphics::GraphicsDevice;
use crate::input::InputEvent;

use super::{Rect, WindowSettings};

/// One native window with an OpenGL context
///
/// Window operations must happen on the thread that created the window.
pub trait WindowBackend {
    /// Start reporting key, mouse button, scroll and cursor events
    fn enable_input_polling(&mut self);

    /// Make this window's context current on the calling thread
    fn make_current(&mut self);

    /// Swap interval for the current context: 1 when enabled, 0 otherwise
    fn set_vsync(&mut self, enabled: bool);

    /// Load the OpenGL function table for the current context
    fn load_graphics(&mut self) -> CoreResult<Box<dyn GraphicsDevice>>;

    /// Process pending OS events and return the input ones, in order
    fn poll_events(&mut self) -> Vec<InputEvent>;

    /// Monotonic time in seconds
    fn time(&self) -> f64;

    /// Whether a close has been requested by the host or the OS
    fn should_close(&self) -> bool;

    /// Set or clear the close request
    fn set_should_close(&mut self, should_close: bool);

    /// Present the back buffer
    fn swap_buffers(&mut self);
}

/// The windowing library as a whole
pub trait WindowSystem {
    /// Create a window from normalized settings
    fn create_window(&mut self, settings: &WindowSettings) -> CoreResult<Box<dyn WindowBackend>>;

    /// Usable area of the primary monitor, if one is connected
    fn primary_monitor_workarea(&mut self) -> Option<Rect>;

    /// Swap interval for whichever context is current
    fn set_vsync(&mut self, enabled: bool);
}
