//! Library context
//!
//! [`Shared`] is what every thread sees: the error sink, the callback slots
//! and the audio clips. [`Core`] adds the thread-affine part, namely the
//! window table and the GL state of the context `Show` made current. GLFW
//! only works on the thread that initialized it, so window and GL calls from
//! any other thread are refused with [`CoreError::ForeignThread`].
//!
//! Every method takes `&self`. No borrow or lock is held while a host
//! callback runs, so callbacks may call back into any method, including from
//! inside [`Core::show`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

use slotmap::SlotMap;

use crate::audio::{AudioBackend, AudioClip, AudioError, AudioSystem};
use crate::config::CoreConfig;
use crate::dispatch::Dispatch;
use crate::error::{CoreError, CoreResult, ErrorCallback, ErrorSink};
use crate::graphics::{compile_program, texture, Color, Graphics, GraphicsDevice};
use crate::input::InputEvent;
use crate::logging;
use crate::window::event_loop::{self, LoopListener};
use crate::window::{
    GlfwSystem, NativeWindow, Point, Rect, WindowEvent, WindowHandle, WindowKey, WindowSettings,
    WindowState, WindowSystem,
};

/// Library state shared by every thread
#[derive(Default)]
pub struct Shared {
    errors: ErrorSink,
    dispatch: Dispatch,
    audio: Mutex<AudioSystem>,
    owner: Mutex<Option<ThreadId>>,
}

impl Shared {
    /// Install the error sink; `None` keeps the current one
    pub fn set_error_callback(&self, callback: Option<ErrorCallback>) {
        self.errors.set(callback);
    }

    /// Window and input callback slots
    pub const fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Log `error` and pass it to the host's error callback
    pub fn report(&self, error: &CoreError) {
        self.errors.report(error);
    }

    /// Unwrap `result`, reporting a failure and substituting the sentinel
    pub fn settle<T: Default>(&self, result: CoreResult<T>) -> T {
        result.unwrap_or_else(|err| {
            self.report(&err);
            T::default()
        })
    }

    /// Thread that initialized the libraries, if they are initialized
    pub fn owner(&self) -> Option<ThreadId> {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_owner(&self, owner: Option<ThreadId>) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = owner;
    }

    fn audio(&self) -> MutexGuard<'_, AudioSystem> {
        self.audio.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the default audio output
    pub fn initialize_audio(&self) -> CoreResult<()> {
        self.audio().initialize()?;
        Ok(())
    }

    /// Use `backend` as the audio output
    pub fn attach_audio(&self, backend: Box<dyn AudioBackend>) {
        self.audio().attach(backend);
    }

    /// Decode PCM `data` into a new clip
    pub fn create_audio_clip(
        &self,
        format: i32,
        data: Option<&[u8]>,
        frequency: u32,
    ) -> CoreResult<AudioClip> {
        let data = data.ok_or(AudioError::InvalidClip("sample buffer is null"))?;
        let clip = self.audio().create_clip(format, data, frequency)?;
        Ok(clip)
    }

    /// Release a clip's ids
    pub fn destroy_audio_clip(&self, clip: AudioClip) {
        self.audio().destroy_clip(clip);
    }

    /// Play a clip's source from the start
    pub fn play_audio_clip(&self, source: u32, volume: i32, looping: bool) -> CoreResult<()> {
        self.audio().play(source, volume, looping)?;
        Ok(())
    }

    /// Stop a clip's source
    pub fn stop_audio_clip(&self, source: u32) {
        self.audio().stop(source);
    }
}

/// Library state for one thread on top of the [`Shared`] part
pub struct Core {
    shared: Arc<Shared>,
    config: RefCell<CoreConfig>,
    system: RefCell<Option<Box<dyn WindowSystem>>>,
    windows: RefCell<SlotMap<WindowKey, Rc<NativeWindow>>>,
    graphics: RefCell<Option<Graphics>>,
    delta: Cell<f64>,
    cursor: Cell<Point>,
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Core {
    /// Fresh, uninitialized context with its own shared state
    pub fn new() -> Self {
        Self::with_shared(Arc::default())
    }

    /// Fresh, uninitialized context over existing shared state
    pub fn with_shared(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            config: RefCell::default(),
            system: RefCell::default(),
            windows: RefCell::default(),
            graphics: RefCell::default(),
            delta: Cell::default(),
            cursor: Cell::default(),
        }
    }

    /// State visible to every thread
    pub const fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Install the error sink; `None` keeps the current one
    pub fn set_error_callback(&self, callback: Option<ErrorCallback>) {
        self.shared.set_error_callback(callback);
    }

    /// Window and input callback slots
    pub fn dispatch(&self) -> &Dispatch {
        self.shared.dispatch()
    }

    /// Unwrap `result`, reporting a failure and substituting the sentinel
    pub fn settle<T: Default>(&self, result: CoreResult<T>) -> T {
        self.shared.settle(result)
    }

    /// Fail unless the libraries are uninitialized or owned by this thread
    pub fn check_thread(&self) -> CoreResult<()> {
        match self.shared.owner() {
            Some(owner) if owner != thread::current().id() => Err(CoreError::ForeignThread),
            _ => Ok(()),
        }
    }

    /// Whether `InitializeLibraries` succeeded and no terminate followed
    pub fn is_initialized(&self) -> bool {
        self.system.borrow().is_some()
    }

    /// Start logging, load the configuration and bring up GLFW
    ///
    /// Does nothing when already initialized. A configuration that fails to
    /// load is reported and replaced by defaults; it does not fail the call.
    pub fn initialize(&self) -> CoreResult<()> {
        self.check_thread()?;
        if self.is_initialized() {
            log::debug!("libraries already initialized");
            return Ok(());
        }

        let loaded = CoreConfig::from_env();
        let filter = loaded
            .as_ref()
            .map_or_else(|_| CoreConfig::default().log_filter, |config| config.log_filter.clone());
        logging::init(&filter);

        let config = loaded.unwrap_or_else(|err| {
            self.shared.report(&CoreError::from(err));
            CoreConfig::default()
        });
        *self.config.borrow_mut() = config;

        let system = GlfwSystem::init()?;
        self.initialize_with(Box::new(system));
        Ok(())
    }

    /// Initialize on top of an already running window system
    ///
    /// The calling thread becomes the owner of windows and GL state.
    pub fn initialize_with(&self, system: Box<dyn WindowSystem>) {
        *self.system.borrow_mut() = Some(system);
        self.shared.set_owner(Some(thread::current().id()));
        log::info!("libraries initialized");
    }

    /// Destroy every window and shut the window system down
    ///
    /// Refused while a window loop is running, since its `Show` still needs
    /// the window.
    pub fn terminate(&self) -> CoreResult<()> {
        if !self.is_initialized() {
            return Ok(());
        }
        let running = self
            .windows
            .borrow()
            .values()
            .any(|window| matches!(window.state(), WindowState::Shown | WindowState::Closing));
        if running {
            return Err(CoreError::WindowStillShown);
        }

        let system = self.system.borrow_mut().take();
        let windows = std::mem::take(&mut *self.windows.borrow_mut());
        self.graphics.borrow_mut().take();
        self.delta.set(0.0);
        self.shared.set_owner(None);

        log::info!("libraries terminated, {} window(s) destroyed", windows.len());
        drop(windows);
        drop(system);
        Ok(())
    }

    /// Create a hidden window
    pub fn create(
        &self,
        title: Option<String>,
        width: u32,
        height: u32,
        fullscreen: bool,
    ) -> CoreResult<WindowHandle> {
        let mut system = self.system.borrow_mut();
        let system = system.as_mut().ok_or(CoreError::LibrariesNotInitialized)?;

        let settings = {
            let config = self.config.borrow();
            WindowSettings::resolve(title, width, height, fullscreen, &config.window, || {
                system.primary_monitor_workarea().ok_or(CoreError::MonitorQuery)
            })?
        };

        let backend = system.create_window(&settings)?;
        let key = self
            .windows
            .borrow_mut()
            .insert(Rc::new(NativeWindow::new(backend)));
        Ok(key.into())
    }

    fn window(&self, handle: WindowHandle) -> CoreResult<Rc<NativeWindow>> {
        self.windows
            .borrow()
            .get(handle.key())
            .cloned()
            .ok_or(CoreError::UnknownWindow(handle.as_raw()))
    }

    /// Run `handle`'s loop until it is closed
    pub fn show(&self, handle: WindowHandle) -> CoreResult<()> {
        if handle.is_null() {
            return Ok(());
        }
        let window = self.window(handle)?;
        if matches!(window.state(), WindowState::Shown | WindowState::Closing) {
            return Err(CoreError::WindowAlreadyShown(handle.as_raw()));
        }

        let vsync = self.config.borrow().vsync;
        event_loop::run(&window, vsync, &ShowListener { core: self, handle })
    }

    /// Ask `handle`'s loop to exit at its next check
    pub fn close(&self, handle: WindowHandle) -> CoreResult<()> {
        if handle.is_null() {
            return Ok(());
        }
        self.window(handle)?.request_close();
        Ok(())
    }

    /// Interval between the last two frames in seconds
    pub fn delta_time(&self) -> f64 {
        self.delta.get()
    }

    /// Last cursor position seen by the loop
    pub fn cursor(&self) -> Point {
        self.cursor.get()
    }

    /// Swap interval for the current context
    pub fn set_vsync(&self, enabled: bool) -> CoreResult<()> {
        let mut system = self.system.borrow_mut();
        let system = system.as_mut().ok_or(CoreError::LibrariesNotInitialized)?;
        system.set_vsync(enabled);
        Ok(())
    }

    /// Work area of the primary monitor
    pub fn primary_monitor_rect(&self) -> CoreResult<Rect> {
        self.system
            .borrow_mut()
            .as_mut()
            .and_then(|system| system.primary_monitor_workarea())
            .ok_or(CoreError::MonitorQuery)
    }

    fn with_graphics<R>(
        &self,
        action: &'static str,
        f: impl FnOnce(&mut Graphics) -> CoreResult<R>,
    ) -> CoreResult<R> {
        let mut graphics = self.graphics.borrow_mut();
        let graphics = graphics.as_mut().ok_or(CoreError::GraphicsUnavailable(action))?;
        f(graphics)
    }

    /// New RGB texture, or 0 without a report for empty or missing input
    pub fn generate_texture(
        &self,
        pixels: Option<&[Color]>,
        width: u32,
        height: u32,
    ) -> CoreResult<u32> {
        let Some(pixels) = pixels else {
            return Ok(0);
        };
        if width == 0 || height == 0 {
            return Ok(0);
        }
        self.with_graphics("create a texture", |graphics| {
            texture::create_texture(graphics.device.as_mut(), pixels, width, height)
        })
    }

    /// Replace a texture's pixels; empty or missing input is ignored
    pub fn update_texture(
        &self,
        id: u32,
        pixels: Option<&[Color]>,
        width: u32,
        height: u32,
    ) -> CoreResult<()> {
        let Some(pixels) = pixels else {
            return Ok(());
        };
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.with_graphics("update a texture", |graphics| {
            texture::update_texture(graphics.device.as_mut(), id, pixels, width, height)
        })
    }

    /// Bind a texture, 0 unbinds
    pub fn use_texture(&self, id: u32) -> CoreResult<()> {
        self.with_graphics("bind a texture", |graphics| {
            graphics.device.bind_texture(id);
            Ok(())
        })
    }

    /// Compile and link a program from two sources
    pub fn compile_shader(&self, vertex: Option<&str>, fragment: Option<&str>) -> CoreResult<u32> {
        self.with_graphics("compile a shader", |graphics| {
            let vertex =
                vertex.ok_or(CoreError::InvalidArgument("vertex shader source is null"))?;
            let fragment =
                fragment.ok_or(CoreError::InvalidArgument("fragment shader source is null"))?;
            compile_program(graphics.device.as_mut(), vertex, fragment)
        })
    }

    /// Bind a program, 0 unbinds
    pub fn use_shader(&self, id: u32) -> CoreResult<()> {
        self.with_graphics("use a shader", |graphics| {
            graphics.device.use_program(id);
            Ok(())
        })
    }

    /// Bind the built-in program
    pub fn use_default_shader(&self) -> CoreResult<()> {
        self.with_graphics("use the default shader", |graphics| {
            let program = graphics.renderer.default_program();
            graphics.device.use_program(program);
            Ok(())
        })
    }

    /// Build the default shader and quad for the current context
    pub fn initialize_renderer(&self) -> CoreResult<()> {
        self.with_graphics("initialize the renderer", |graphics| {
            graphics.renderer.initialize(graphics.device.as_mut())
        })
    }

    /// Draw the full-window quad
    pub fn render_quad(&self) -> CoreResult<()> {
        self.with_graphics("render a quad", |graphics| {
            graphics.renderer.render(graphics.device.as_mut())
        })
    }

    /// Set the viewport rectangle
    pub fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) -> CoreResult<()> {
        self.with_graphics("set the viewport", |graphics| {
            graphics.device.viewport(x, y, width, height);
            Ok(())
        })
    }
}

/// Routes one window's loop output into the context and the host
struct ShowListener<'a> {
    core: &'a Core,
    handle: WindowHandle,
}

impl LoopListener for ShowListener<'_> {
    fn graphics_loaded(&self, device: Box<dyn GraphicsDevice>) {
        *self.core.graphics.borrow_mut() = Some(Graphics::new(device));
    }

    fn opened(&self) {
        self.core.delta.set(0.0);
        self.core.dispatch().window_event(self.handle, WindowEvent::Opened);
    }

    fn input(&self, event: InputEvent) {
        if let InputEvent::Cursor { x, y } = event {
            self.core.cursor.set(Point { x, y });
        }
        self.core.dispatch().input(event);
    }

    fn render(&self, delta_time: f64) {
        self.core.delta.set(delta_time);
        self.core.dispatch().window_event(self.handle, WindowEvent::Render);
    }

    fn closed(&self) {
        self.core.dispatch().window_event(self.handle, WindowEvent::Closed);
    }
}

static SHARED: OnceLock<Arc<Shared>> = OnceLock::new();

thread_local! {
    static CORE: Core = Core::with_shared(Arc::clone(shared()));
}

/// Process-wide shared state behind the C surface
pub fn shared() -> &'static Arc<Shared> {
    SHARED.get_or_init(Arc::default)
}

/// Run `f` against the calling thread's context
///
/// During thread teardown, when the context is already gone, `f` is skipped
/// and the sentinel is returned.
pub fn with_core<R: Default>(f: impl FnOnce(&Core) -> R) -> R {
    CORE.try_with(f).unwrap_or_else(|_| {
        log::warn!("library context used during thread teardown");
        R::default()
    })
}
