//! Error taxonomy and the single-slot error sink
//!
//! Failures are typed internally and only flattened to text when they reach
//! the host. The host sees exactly one notification per failure, followed by
//! a sentinel return value from the call that failed.

use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::audio::AudioError;
use crate::config::ConfigError;

/// Host function receiving NUL-terminated error messages
pub type ErrorCallback = extern "C" fn(message: *const c_char);

/// Every failure the library can report
#[derive(Error, Debug)]
pub enum CoreError {
    /// A window call was made before `InitializeLibraries`
    #[error("You must initialize libraries first!")]
    LibrariesNotInitialized,

    /// GLFW refused to start
    #[error("Failed to initialize GLFW: {0}")]
    WindowSystemInit(String),

    /// Native window creation failed
    #[error("Failed to create GLFW window!")]
    WindowCreation,

    /// The OpenGL function table could not be loaded for a window
    #[error("Failed to load OpenGL functions!")]
    GraphicsLoad,

    /// A GL call was made with no context loaded by `Show`
    #[error("Cannot {0} without an OpenGL context!")]
    GraphicsUnavailable(&'static str),

    /// The driver refused to allocate an object
    #[error("Failed to create OpenGL {kind}: {reason}")]
    GraphicsResource {
        /// Object kind (texture, buffer, ...)
        kind: &'static str,
        /// Driver message
        reason: String,
    },

    /// A shader stage failed to compile; carries the driver log
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile {
        /// Stage name
        stage: &'static str,
        /// Driver info log
        log: String,
    },

    /// The program failed to link; carries the driver log
    #[error("Shader program failed to link: {0}")]
    ProgramLink(String),

    /// The built-in shader pair did not build
    #[error("Failed to compile default shader!")]
    DefaultShader,

    /// `RenderQuad` before `InitializeRenderer`
    #[error("Renderer must be initialized to render a quad!")]
    RendererNotInitialized,

    /// No primary monitor is connected
    #[error("Failed to find primary monitor!")]
    MonitorQuery,

    /// Handle does not name a live window
    #[error("Unknown window handle {0:#x}")]
    UnknownWindow(usize),

    /// `Show` called for a window whose loop is already running
    #[error("Window {0:#x} is already being shown")]
    WindowAlreadyShown(usize),

    /// `TerminateLibraries` while a window loop is still running
    #[error("Cannot terminate libraries while a window is being shown!")]
    WindowStillShown,

    /// Window or GL call from a thread other than the one that initialized
    #[error("Window and graphics calls must come from the initializing thread!")]
    ForeignThread,

    /// A pointer or value the host passed is unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Audio failure
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Configuration failure
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias used across the crate
pub type CoreResult<T> = Result<T, CoreError>;

/// Single-slot error sink, shared by every thread
///
/// Installing a callback replaces the previous one; installing `None` keeps
/// whatever was there. The slot lock is released before the host runs.
#[derive(Default)]
pub struct ErrorSink {
    callback: Mutex<Option<ErrorCallback>>,
}

impl ErrorSink {
    /// Create a sink with nothing installed
    pub const fn new() -> Self {
        Self {
            callback: Mutex::new(None),
        }
    }

    /// Install `callback` unless it is null
    pub fn set(&self, callback: Option<ErrorCallback>) {
        if callback.is_some() {
            *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
        }
    }

    /// Log `error` and forward its message to the host
    pub fn report(&self, error: &CoreError) {
        let message = error.to_string();
        log::error!("{message}");
        self.emit(&message);
    }

    fn emit(&self, message: &str) {
        let callback = *self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(callback) = callback else {
            return;
        };
        // Interior NULs would truncate the message on the host side anyway.
        let bytes: Vec<u8> = message.bytes().filter(|&b| b != 0).collect();
        if let Ok(text) = CString::new(bytes) {
            callback(text.as_ptr());
        }
    }
}
