//! # Szark Core
//!
//! Native windowing, OpenGL rendering and audio for a managed host, exposed
//! as a flat C API.
//!
//! ## Features
//!
//! - **Windows**: GLFW windows with an OpenGL 3.3 core context and a blocking
//!   per-window loop that drives host callbacks
//! - **Input**: raw key, mouse button, scroll and cursor events forwarded as-is
//! - **Rendering**: RGB textures, shader programs and a built-in full-window
//!   textured quad
//! - **Audio**: PCM clips played through the default output device
//!
//! ## Usage from a host
//!
//! ```c
//! SetErrorCallback(on_error);
//! SetWindowEventCallback(on_window_event);
//! InitializeLibraries();
//! WindowHandle window = Create("Game", 0, 0, false);
//! Show(window); /* blocks; Opened, Render..., Closed */
//! TerminateLibraries();
//! ```
//!
//! The error callback, the input and window callbacks and the audio clips are
//! process-wide. Windows and GL state belong to the thread that called
//! `InitializeLibraries`. Callbacks fire synchronously on that thread and may
//! call any export, including `Close` for the window being shown.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod audio;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod ffi;
pub mod graphics;
pub mod input;
pub mod logging;
pub mod window;

pub use audio::{AudioClip, AudioError};
pub use config::{Config, ConfigError, CoreConfig};
pub use context::{shared, with_core, Core, Shared};
pub use error::{CoreError, CoreResult};
pub use graphics::Color;
pub use window::{Point, Rect, WindowEvent, WindowHandle};
