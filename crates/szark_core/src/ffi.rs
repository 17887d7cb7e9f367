//! Flat C surface
//!
//! Callback setters and audio exports work on the process-wide [`Shared`]
//! state from any thread. Window and GL exports run against the calling
//! thread's [`Core`] and are refused off the thread that initialized the
//! libraries. A failure is reported through the error callback and the call
//! returns its sentinel (`false`, `0`, a null handle or a zeroed struct).
//! Panics are caught here and never unwind into the host.
//!
//! Pointer arguments must be null or valid for the duration of the call;
//! pixel pointers must cover `width * height` colors and audio buffers
//! `length` bytes.
#![allow(unsafe_code)]
#![allow(non_snake_case)]

use std::borrow::Cow;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};

use crate::audio::AudioClip;
use crate::context::{shared, with_core, Core, Shared};
use crate::dispatch::{
    CursorCallback, KeyCallback, MouseCallback, ScrollCallback, WindowEventCallback,
};
use crate::error::ErrorCallback;
use crate::graphics::Color;
use crate::window::{Point, Rect, WindowHandle};

fn catch<R: Default>(export: &'static str, f: impl FnOnce() -> R) -> R {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        log::error!("{export} panicked; returning the default value");
        R::default()
    })
}

/// Thread-affine export: runs on the caller's context if it owns the libraries
fn guarded<R: Default>(export: &'static str, f: impl FnOnce(&Core) -> R) -> R {
    catch(export, || {
        with_core(|core| core.settle(core.check_thread().map(|()| f(core))))
    })
}

/// Export that any thread may call
fn guarded_shared<R: Default>(export: &'static str, f: impl FnOnce(&Shared) -> R) -> R {
    catch(export, || f(shared().as_ref()))
}

/// # Safety
/// `ptr` is null or a NUL-terminated string alive for `'a`.
unsafe fn text<'a>(ptr: *const c_char) -> Option<Cow<'a, str>> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy())
}

/// # Safety
/// `ptr` is null or valid for `len` reads of `T` for `'a`.
unsafe fn slice<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    if ptr.is_null() {
        return None;
    }
    if len == 0 {
        return Some(&[]);
    }
    Some(std::slice::from_raw_parts(ptr, len))
}

/// # Safety
/// `pixels` is null or covers `width * height` colors.
unsafe fn pixels<'a>(pixels: *const Color, width: u32, height: u32) -> Option<&'a [Color]> {
    let len = (width as usize).checked_mul(height as usize)?;
    slice(pixels, len)
}

// --- Callbacks ---

/// Install the error callback
#[no_mangle]
pub extern "C" fn SetErrorCallback(callback: Option<ErrorCallback>) {
    guarded_shared("SetErrorCallback", |shared| shared.set_error_callback(callback));
}

/// Install the window lifecycle callback
#[no_mangle]
pub extern "C" fn SetWindowEventCallback(callback: Option<WindowEventCallback>) {
    guarded_shared("SetWindowEventCallback", |shared| shared.dispatch().window.set(callback));
}

/// Install the key callback
#[no_mangle]
pub extern "C" fn SetKeyCallback(callback: Option<KeyCallback>) {
    guarded_shared("SetKeyCallback", |shared| shared.dispatch().key.set(callback));
}

/// Install the mouse button callback
#[no_mangle]
pub extern "C" fn SetMouseCallback(callback: Option<MouseCallback>) {
    guarded_shared("SetMouseCallback", |shared| shared.dispatch().mouse.set(callback));
}

/// Install the scroll callback
#[no_mangle]
pub extern "C" fn SetScrollCallback(callback: Option<ScrollCallback>) {
    guarded_shared("SetScrollCallback", |shared| shared.dispatch().scroll.set(callback));
}

/// Install the cursor position callback
#[no_mangle]
pub extern "C" fn SetCursorCallback(callback: Option<CursorCallback>) {
    guarded_shared("SetCursorCallback", |shared| shared.dispatch().cursor.set(callback));
}

// --- Lifecycle ---

/// Start GLFW; `true` when the library is ready
#[no_mangle]
pub extern "C" fn InitializeLibraries() -> bool {
    guarded("InitializeLibraries", |core| core.settle(core.initialize().map(|()| true)))
}

/// Destroy every window and stop GLFW
#[no_mangle]
pub extern "C" fn TerminateLibraries() {
    guarded("TerminateLibraries", |core| core.settle(core.terminate()));
}

// --- Window ---

/// Create a hidden window; null on failure
///
/// # Safety
/// `title` is null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn Create(
    title: *const c_char,
    width: u32,
    height: u32,
    fullscreen: bool,
) -> WindowHandle {
    let title = text(title).map(Cow::into_owned);
    guarded("Create", |core| core.settle(core.create(title, width, height, fullscreen)))
}

/// Run the window's loop until it closes
#[no_mangle]
pub extern "C" fn Show(window: WindowHandle) {
    guarded("Show", |core| core.settle(core.show(window)));
}

/// Flag the window for closing
#[no_mangle]
pub extern "C" fn Close(window: WindowHandle) {
    guarded("Close", |core| core.settle(core.close(window)));
}

/// Seconds between the last two frames
#[no_mangle]
pub extern "C" fn GetDeltaTime() -> f64 {
    guarded("GetDeltaTime", Core::delta_time)
}

/// Swap interval 1 or 0 for the current context
#[no_mangle]
pub extern "C" fn SetVSync(enabled: bool) {
    guarded("SetVSync", |core| core.settle(core.set_vsync(enabled)));
}

/// Primary monitor work area; zeroed on failure
#[no_mangle]
pub extern "C" fn GetPrimaryMonitorRect() -> Rect {
    guarded("GetPrimaryMonitorRect", |core| core.settle(core.primary_monitor_rect()))
}

/// Last reported cursor position
#[no_mangle]
pub extern "C" fn GetCursor() -> Point {
    guarded("GetCursor", Core::cursor)
}

// --- Rendering ---

/// New RGB texture; 0 for empty or null input
///
/// # Safety
/// `pixels` is null or covers `width * height` colors.
#[no_mangle]
pub unsafe extern "C" fn GenerateTextureID(pixels: *const Color, width: u32, height: u32) -> u32 {
    let pixels = self::pixels(pixels, width, height);
    guarded("GenerateTextureID", |core| {
        core.settle(core.generate_texture(pixels, width, height))
    })
}

/// Replace a texture's contents
///
/// # Safety
/// `pixels` is null or covers `width * height` colors.
#[no_mangle]
pub unsafe extern "C" fn UpdateTexture(id: u32, pixels: *const Color, width: u32, height: u32) {
    let pixels = self::pixels(pixels, width, height);
    guarded("UpdateTexture", |core| {
        core.settle(core.update_texture(id, pixels, width, height));
    });
}

/// Bind a shader program
#[no_mangle]
pub extern "C" fn UseShader(id: u32) {
    guarded("UseShader", |core| core.settle(core.use_shader(id)));
}

/// Bind the built-in shader program
#[no_mangle]
pub extern "C" fn UseDefaultShader() {
    guarded("UseDefaultShader", |core| core.settle(core.use_default_shader()));
}

/// Bind a texture
#[no_mangle]
pub extern "C" fn UseTexture(id: u32) {
    guarded("UseTexture", |core| core.settle(core.use_texture(id)));
}

/// Draw the full-window quad
#[no_mangle]
pub extern "C" fn RenderQuad() {
    guarded("RenderQuad", |core| core.settle(core.render_quad()));
}

/// Compile and link a program; 0 on failure
///
/// # Safety
/// Both sources are null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn CompileShader(vertex: *const c_char, fragment: *const c_char) -> u32 {
    let vertex = text(vertex);
    let fragment = text(fragment);
    guarded("CompileShader", |core| {
        core.settle(core.compile_shader(vertex.as_deref(), fragment.as_deref()))
    })
}

/// Build the default shader and quad
#[no_mangle]
pub extern "C" fn InitializeRenderer() {
    guarded("InitializeRenderer", |core| core.settle(core.initialize_renderer()));
}

/// Set the viewport rectangle
#[no_mangle]
pub extern "C" fn SetViewport(x: c_int, y: c_int, width: c_int, height: c_int) {
    guarded("SetViewport", |core| core.settle(core.set_viewport(x, y, width, height)));
}

// --- Audio ---

/// Open the default audio output
#[no_mangle]
pub extern "C" fn InitializeAudioContext() {
    guarded_shared("InitializeAudioContext", |shared| shared.settle(shared.initialize_audio()));
}

/// Decode PCM data into a new clip; zeroed on failure
///
/// # Safety
/// `buffer` is null or covers `length` bytes.
#[no_mangle]
pub unsafe extern "C" fn CreateAudioClip(
    format: c_int,
    buffer: *const c_char,
    length: u32,
    frequency: u32,
) -> AudioClip {
    let data = slice(buffer.cast::<u8>(), length as usize);
    guarded_shared("CreateAudioClip", |shared| {
        shared.settle(shared.create_audio_clip(format, data, frequency))
    })
}

/// Stop a clip and release its ids
#[no_mangle]
pub extern "C" fn DestroyAudioClip(clip: AudioClip) {
    guarded_shared("DestroyAudioClip", |shared| shared.destroy_audio_clip(clip));
}

/// Start a clip's source from the beginning
#[no_mangle]
pub extern "C" fn PlayAudioClip(source: u32, volume: c_int, looping: bool) {
    guarded_shared("PlayAudioClip", |shared| {
        shared.settle(shared.play_audio_clip(source, volume, looping));
    });
}

/// Stop a clip's source
#[no_mangle]
pub extern "C" fn StopAudioClip(source: u32) {
    guarded_shared("StopAudioClip", |shared| shared.stop_audio_clip(source));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    use crate::error::test_sink;

    #[test]
    fn test_generate_texture_null_pixels_is_silent() {
        SetErrorCallback(Some(test_sink::record));
        test_sink::take();
        let colors = [Color::default(); 4];
        // SAFETY: pointers are null or cover the given dimensions.
        unsafe {
            assert_eq!(GenerateTextureID(ptr::null(), 2, 2), 0);
            assert_eq!(GenerateTextureID(ptr::null(), 0, 0), 0);
            assert_eq!(GenerateTextureID(colors.as_ptr(), 0, 2), 0);
            assert_eq!(GenerateTextureID(colors.as_ptr(), 2, 0), 0);
        }
        assert!(test_sink::take().is_empty());
    }

    #[test]
    fn test_calls_without_context_report_and_return_sentinels() {
        SetErrorCallback(Some(test_sink::record));
        test_sink::take();

        // SAFETY: a null title is allowed.
        assert!(unsafe { Create(ptr::null(), 0, 0, false) }.is_null());
        RenderQuad();
        assert_eq!(GetPrimaryMonitorRect(), Rect::default());
        assert_eq!(GetDeltaTime(), 0.0);
        assert_eq!(GetCursor(), Point::default());

        assert_eq!(
            test_sink::take(),
            vec![
                "You must initialize libraries first!".to_string(),
                "Cannot render a quad without an OpenGL context!".to_string(),
                "Failed to find primary monitor!".to_string(),
            ]
        );
    }

    #[test]
    fn test_null_window_is_ignored() {
        SetErrorCallback(Some(test_sink::record));
        test_sink::take();
        Show(WindowHandle::NULL);
        Close(WindowHandle::NULL);
        TerminateLibraries();
        assert!(test_sink::take().is_empty());
    }

    #[test]
    fn test_compile_shader_requires_context() {
        SetErrorCallback(Some(test_sink::record));
        test_sink::take();
        let source = CString::new("void main() {}").unwrap();
        // SAFETY: both pointers are live C strings.
        let program = unsafe { CompileShader(source.as_ptr(), source.as_ptr()) };
        assert_eq!(program, 0);
        assert_eq!(test_sink::take().len(), 1);
    }

    #[test]
    fn test_audio_without_context() {
        SetErrorCallback(Some(test_sink::record));
        test_sink::take();
        let bytes = [0u8; 8];
        // SAFETY: `bytes` covers `length`.
        let clip = unsafe { CreateAudioClip(0x1100, bytes.as_ptr().cast(), 8, 8000) };
        assert_eq!(clip, AudioClip::default());
        PlayAudioClip(1, 1, false);
        StopAudioClip(1);
        DestroyAudioClip(clip);
        assert_eq!(
            test_sink::take(),
            vec![
                "Audio context must be initialized first!".to_string(),
                "Audio context must be initialized first!".to_string(),
            ]
        );
    }

    #[test]
    fn test_pixel_slice_guards() {
        // SAFETY: only null pointers and zero lengths are built.
        unsafe {
            assert!(pixels(ptr::null(), 4, 4).is_none());
            let dangling = ptr::NonNull::<Color>::dangling().as_ptr();
            assert!(pixels(dangling, u32::MAX, 0).unwrap().is_empty());
        }
    }

    extern "C" fn mouse(_: c_int, _: c_int) {}

    #[test]
    fn test_error_callback_reaches_other_threads() {
        SetErrorCallback(Some(test_sink::record));
        let messages = std::thread::spawn(|| {
            test_sink::take();
            RenderQuad();
            PlayAudioClip(7, 1, false);
            test_sink::take()
        })
        .join()
        .unwrap();
        assert_eq!(
            messages,
            vec![
                "Cannot render a quad without an OpenGL context!".to_string(),
                "Audio context must be initialized first!".to_string(),
            ]
        );
    }

    #[test]
    fn test_callbacks_installed_on_one_thread_serve_all() {
        std::thread::spawn(|| SetMouseCallback(Some(mouse))).join().unwrap();
        assert!(shared().dispatch().mouse.get().is_some());
    }
}
