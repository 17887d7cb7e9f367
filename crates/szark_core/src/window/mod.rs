//! Window lifecycle and the blocking event loop
//!
//! A window moves through [`WindowState`] as `Show` drives it:
//! `Created → Shown → Closing → Closed`. The native side lives behind
//! [`WindowBackend`] so the loop itself runs without a display in tests.

pub mod backend;
pub mod event_loop;
pub mod glfw_backend;

use std::cell::{Cell, RefCell};

use slotmap::{new_key_type, Key, KeyData};

use crate::config::WindowDefaults;
use crate::error::{CoreError, CoreResult};

pub use backend::{WindowBackend, WindowSystem};
pub use event_loop::{FrameClock, LoopListener};
pub use glfw_backend::{GlfwSystem, GlfwWindow};

new_key_type! {
    /// Slot-map key behind a [`WindowHandle`]
    pub struct WindowKey;
}

/// Opaque, pointer-sized window handle handed to the host; `0` is null
///
/// The slot index sits in the low half of the word and its generation in the
/// high half. On 32-bit targets both are truncated to 16 bits, so a handle
/// that outlives its window may eventually alias a newer one.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(usize);

const HALF_BITS: u32 = usize::BITS / 2;
const HALF_MASK: u64 = (1 << HALF_BITS) - 1;

impl WindowHandle {
    /// The null handle
    pub const NULL: Self = Self(0);

    /// Whether this is the null handle
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Raw integer value
    pub const fn as_raw(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub(crate) fn key(self) -> WindowKey {
        if self.is_null() {
            return WindowKey::null();
        }
        let raw = self.0 as u64;
        let index = raw & HALF_MASK;
        let version = raw >> HALF_BITS;
        WindowKey::from(KeyData::from_ffi((version << 32) | index))
    }
}

impl From<WindowKey> for WindowHandle {
    #[allow(clippy::cast_possible_truncation)]
    fn from(key: WindowKey) -> Self {
        let ffi = key.data().as_ffi();
        let index = ffi & HALF_MASK;
        let version = (ffi >> 32) & HALF_MASK;
        Self(((version << HALF_BITS) | index) as usize)
    }
}

/// Lifecycle notification passed to the window callback
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// Context is current and the loop is about to start
    Opened,
    /// Loop has exited
    Closed,
    /// One frame; fired once per loop iteration
    Render,
}

/// Integer rectangle (monitor work area)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in screen coordinates
    pub width: i32,
    /// Height in screen coordinates
    pub height: i32,
}

/// Cursor position in window coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

/// Normalized parameters for native window creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSettings {
    /// Title bar text
    pub title: String,
    /// Client width
    pub width: u32,
    /// Client height
    pub height: u32,
    /// Undecorated, sized to the primary work area
    pub fullscreen: bool,
}

impl WindowSettings {
    /// Apply the creation fallbacks
    ///
    /// Zero dimensions and a missing title fall back to `defaults`. In
    /// fullscreen mode the size comes from `workarea`, which is only queried
    /// in that case.
    pub fn resolve(
        title: Option<String>,
        width: u32,
        height: u32,
        fullscreen: bool,
        defaults: &WindowDefaults,
        workarea: impl FnOnce() -> CoreResult<Rect>,
    ) -> CoreResult<Self> {
        let title = title.unwrap_or_else(|| defaults.title.clone());
        let mut width = if width == 0 { defaults.width } else { width };
        let mut height = if height == 0 { defaults.height } else { height };

        if fullscreen {
            let rect = workarea()?;
            width = u32::try_from(rect.width).unwrap_or(0);
            height = u32::try_from(rect.height).unwrap_or(0);
            if width == 0 || height == 0 {
                return Err(CoreError::MonitorQuery);
            }
        }

        Ok(Self {
            title,
            width,
            height,
            fullscreen,
        })
    }
}

/// Where a window is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Created, never shown
    Created,
    /// Loop running
    Shown,
    /// Close requested, loop will exit at its next check
    Closing,
    /// Loop exited and `Closed` fired
    Closed,
}

/// A live window owned by the library context
pub struct NativeWindow {
    backend: RefCell<Box<dyn WindowBackend>>,
    state: Cell<WindowState>,
}

impl NativeWindow {
    /// Wrap a freshly created backend window
    pub fn new(backend: Box<dyn WindowBackend>) -> Self {
        Self {
            backend: RefCell::new(backend),
            state: Cell::new(WindowState::Created),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WindowState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: WindowState) {
        self.state.set(state);
    }

    /// Flag the window for closing; the loop notices on its next check
    ///
    /// A request made before `Show` is kept, and that loop exits before its
    /// first frame.
    pub fn request_close(&self) {
        // Close is normally called from inside a callback, when the loop
        // holds no borrow of the backend.
        let Ok(mut backend) = self.backend.try_borrow_mut() else {
            log::warn!("close requested while the window backend is busy");
            return;
        };
        backend.set_should_close(true);
        if self.state.get() == WindowState::Shown {
            self.state.set(WindowState::Closing);
        }
    }

    /// Run `f` with exclusive access to the backend
    pub(crate) fn with_backend<R>(&self, f: impl FnOnce(&mut dyn WindowBackend) -> R) -> R {
        f(self.backend.borrow_mut().as_mut())
    }
}
