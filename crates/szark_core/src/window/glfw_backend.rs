//! Window management using GLFW
//!
//! Provides window creation, an OpenGL 3.3 core context per window and raw
//! input polling.

use glfw::Context;

use crate::error::{CoreError, CoreResult};
use crate::graphics::{GlDevice, GraphicsDevice};
use crate::input::InputEvent;

use super::{Rect, WindowBackend, WindowSettings, WindowSystem};

/// Symbol probed to decide whether the GL loader works for a context
const PROBE_SYMBOL: &str = "glCreateShader";

/// Initialized GLFW library
///
/// GLFW shuts down once this and every window created from it are dropped.
pub struct GlfwSystem {
    glfw: glfw::Glfw,
}

impl GlfwSystem {
    /// Start GLFW; errors raised by GLFW later on are logged
    pub fn init() -> CoreResult<Self> {
        let glfw = glfw::init(glfw::log_errors)
            .map_err(|e| CoreError::WindowSystemInit(format!("{e:?}")))?;
        log::info!("GLFW {} initialized", glfw::get_version_string());
        Ok(Self { glfw })
    }
}

impl WindowSystem for GlfwSystem {
    fn create_window(&mut self, settings: &WindowSettings) -> CoreResult<Box<dyn WindowBackend>> {
        self.glfw.default_window_hints();
        self.glfw.window_hint(glfw::WindowHint::ContextVersion(3, 3));
        self.glfw
            .window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        self.glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        self.glfw.window_hint(glfw::WindowHint::Resizable(false));
        self.glfw.window_hint(glfw::WindowHint::Decorated(!settings.fullscreen));

        let (window, events) = self
            .glfw
            .create_window(
                settings.width,
                settings.height,
                &settings.title,
                glfw::WindowMode::Windowed,
            )
            .ok_or(CoreError::WindowCreation)?;

        log::debug!(
            "created window '{}' {}x{} (fullscreen: {})",
            settings.title,
            settings.width,
            settings.height,
            settings.fullscreen
        );

        Ok(Box::new(GlfwWindow {
            glfw: self.glfw.clone(),
            window,
            events,
        }))
    }

    fn primary_monitor_workarea(&mut self) -> Option<Rect> {
        self.glfw.with_primary_monitor(|_, monitor| {
            monitor.map(|monitor| {
                let (x, y, width, height) = monitor.get_workarea();
                Rect { x, y, width, height }
            })
        })
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.glfw.set_swap_interval(swap_interval(enabled));
    }
}

/// GLFW window wrapper
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl WindowBackend for GlfwWindow {
    fn enable_input_polling(&mut self) {
        self.window.set_key_polling(true);
        self.window.set_mouse_button_polling(true);
        self.window.set_scroll_polling(true);
        self.window.set_cursor_pos_polling(true);
    }

    fn make_current(&mut self) {
        self.window.make_current();
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.glfw.set_swap_interval(swap_interval(enabled));
    }

    fn load_graphics(&mut self) -> CoreResult<Box<dyn GraphicsDevice>> {
        if self.window.get_proc_address(PROBE_SYMBOL).is_null() {
            return Err(CoreError::GraphicsLoad);
        }
        let window = &mut self.window;
        let device = GlDevice::load(|symbol| window.get_proc_address(symbol) as *const _);
        Ok(Box::new(device))
    }

    fn poll_events(&mut self) -> Vec<InputEvent> {
        self.glfw.poll_events();
        glfw::flush_messages(&self.events)
            .filter_map(|(_, event)| InputEvent::from_glfw(&event))
            .collect()
    }

    fn time(&self) -> f64 {
        self.glfw.get_time()
    }

    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    fn swap_buffers(&mut self) {
        self.window.swap_buffers();
    }
}

const fn swap_interval(enabled: bool) -> glfw::SwapInterval {
    if enabled {
        glfw::SwapInterval::Sync(1)
    } else {
        glfw::SwapInterval::None
    }
}
