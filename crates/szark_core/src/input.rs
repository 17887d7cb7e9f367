//! Raw input events delivered to the host
//!
//! Codes are GLFW's integer values, passed through untouched.

/// Key, button and action codes as GLFW reports them
pub type RawCode = i32;

/// One native input notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Keyboard key changed state
    Key {
        /// GLFW key code
        key: RawCode,
        /// 0 release, 1 press, 2 repeat
        action: RawCode,
    },
    /// Mouse button changed state
    MouseButton {
        /// GLFW button index
        button: RawCode,
        /// 0 release, 1 press
        action: RawCode,
    },
    /// Wheel or trackpad scroll
    Scroll {
        /// Horizontal offset
        dx: f64,
        /// Vertical offset
        dy: f64,
    },
    /// Cursor moved, in window coordinates
    Cursor {
        /// Horizontal position
        x: f64,
        /// Vertical position
        y: f64,
    },
}

impl InputEvent {
    /// Convert a GLFW window event, ignoring everything that is not input
    pub fn from_glfw(event: &glfw::WindowEvent) -> Option<Self> {
        match *event {
            glfw::WindowEvent::Key(key, _scancode, action, _mods) => Some(Self::Key {
                key: key as RawCode,
                action: action as RawCode,
            }),
            glfw::WindowEvent::MouseButton(button, action, _mods) => Some(Self::MouseButton {
                button: button as RawCode,
                action: action as RawCode,
            }),
            glfw::WindowEvent::Scroll(dx, dy) => Some(Self::Scroll { dx, dy }),
            glfw::WindowEvent::CursorPos(x, y) => Some(Self::Cursor { x, y }),
            _ => None,
        }
    }
}
