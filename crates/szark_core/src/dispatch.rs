//! Host callback slots and event fan-out
//!
//! One slot per callback kind, shared by every thread. A slot holds at most
//! one function pointer; writing `None` is ignored so the previous callback
//! stays installed. Firing copies the pointer out and releases the slot
//! first, so the host may re-enter the library from inside a callback.

use std::os::raw::c_int;
use std::sync::{Mutex, PoisonError};

use crate::input::InputEvent;
use crate::window::{WindowEvent, WindowHandle};

/// Lifecycle notification for a window
pub type WindowEventCallback = extern "C" fn(window: WindowHandle, event: WindowEvent);
/// Key press / release / repeat
pub type KeyCallback = extern "C" fn(key: c_int, action: c_int);
/// Mouse button press / release
pub type MouseCallback = extern "C" fn(button: c_int, action: c_int);
/// Scroll offset
pub type ScrollCallback = extern "C" fn(dx: f64, dy: f64);
/// Cursor position
pub type CursorCallback = extern "C" fn(x: f64, y: f64);

/// A single-writer, last-non-null-wins callback slot
pub struct CallbackSlot<F: Copy> {
    callback: Mutex<Option<F>>,
}

impl<F: Copy> Default for CallbackSlot<F> {
    fn default() -> Self {
        Self {
            callback: Mutex::new(None),
        }
    }
}

impl<F: Copy> CallbackSlot<F> {
    /// Install `callback`; `None` leaves the slot unchanged
    pub fn set(&self, callback: Option<F>) {
        if callback.is_some() {
            *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
        }
    }

    /// Currently installed callback
    pub fn get(&self) -> Option<F> {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// All host callbacks except the error sink
#[derive(Default)]
pub struct Dispatch {
    /// Opened / Render / Closed
    pub window: CallbackSlot<WindowEventCallback>,
    /// Keyboard
    pub key: CallbackSlot<KeyCallback>,
    /// Mouse buttons
    pub mouse: CallbackSlot<MouseCallback>,
    /// Scroll wheel
    pub scroll: CallbackSlot<ScrollCallback>,
    /// Cursor movement
    pub cursor: CallbackSlot<CursorCallback>,
}

impl Dispatch {
    /// Fire a lifecycle event
    pub fn window_event(&self, window: WindowHandle, event: WindowEvent) {
        if let Some(callback) = self.window.get() {
            callback(window, event);
        }
    }

    /// Route one input event to its callback
    pub fn input(&self, event: InputEvent) {
        match event {
            InputEvent::Key { key, action } => {
                if let Some(callback) = self.key.get() {
                    callback(key, action);
                }
            }
            InputEvent::MouseButton { button, action } => {
                if let Some(callback) = self.mouse.get() {
                    callback(button, action);
                }
            }
            InputEvent::Scroll { dx, dy } => {
                if let Some(callback) = self.scroll.get() {
                    callback(dx, dy);
                }
            }
            InputEvent::Cursor { x, y } => {
                if let Some(callback) = self.cursor.get() {
                    callback(x, y);
                }
            }
        }
    }
}
