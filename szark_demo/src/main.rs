//! Szark demo application
//!
//! Drives the exported C surface the way a managed host does: an animated
//! gradient is streamed into a texture on the full-window quad. Space plays a
//! short tone, Escape closes the window.

use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

use szark_core::audio::FORMAT_MONO16;
use szark_core::ffi::{
    Close, Create, CreateAudioClip, DestroyAudioClip, GenerateTextureID, GetDeltaTime,
    InitializeAudioContext, InitializeLibraries, InitializeRenderer, PlayAudioClip, RenderQuad,
    SetErrorCallback, SetKeyCallback, SetWindowEventCallback, Show, TerminateLibraries,
    UpdateTexture, UseTexture,
};
use szark_core::{AudioClip, Color, WindowEvent, WindowHandle};

const TEXTURE_WIDTH: u32 = 160;
const TEXTURE_HEIGHT: u32 = 90;

const KEY_SPACE: c_int = 32;
const KEY_ESCAPE: c_int = 256;
const ACTION_PRESS: c_int = 1;

const TONE_RATE: u32 = 22_050;
const TONE_HZ: f64 = 440.0;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("failed to initialize libraries")]
    Initialize,
    #[error("failed to create window")]
    CreateWindow,
}

thread_local! {
    static WINDOW: Cell<WindowHandle> = const { Cell::new(WindowHandle::NULL) };
    static TEXTURE: Cell<u32> = const { Cell::new(0) };
    static ELAPSED: Cell<f64> = const { Cell::new(0.0) };
    static TONE: Cell<AudioClip> = const { Cell::new(AudioClip { source: 0, buffer: 0 }) };
}

extern "C" fn on_error(message: *const c_char) {
    // SAFETY: the library passes a NUL-terminated string that outlives the call.
    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    log::error!("core: {message}");
}

extern "C" fn on_window_event(_window: WindowHandle, event: WindowEvent) {
    match event {
        WindowEvent::Opened => {
            InitializeRenderer();
            let pixels = gradient(0.0);
            // SAFETY: `pixels` holds exactly TEXTURE_WIDTH * TEXTURE_HEIGHT colors.
            let texture =
                unsafe { GenerateTextureID(pixels.as_ptr(), TEXTURE_WIDTH, TEXTURE_HEIGHT) };
            UseTexture(texture);
            TEXTURE.with(|t| t.set(texture));
            log::info!("window opened, streaming into texture {texture}");
        }
        WindowEvent::Render => {
            let elapsed = ELAPSED.with(|e| {
                e.set(e.get() + GetDeltaTime());
                e.get()
            });
            let pixels = gradient(elapsed);
            let texture = TEXTURE.with(Cell::get);
            // SAFETY: as above.
            unsafe {
                UpdateTexture(texture, pixels.as_ptr(), TEXTURE_WIDTH, TEXTURE_HEIGHT);
            }
            RenderQuad();
        }
        WindowEvent::Closed => {
            log::info!("window closed after {:.1}s", ELAPSED.with(Cell::get));
        }
    }
}

extern "C" fn on_key(key: c_int, action: c_int) {
    if action != ACTION_PRESS {
        return;
    }
    match key {
        KEY_ESCAPE => Close(WINDOW.with(Cell::get)),
        KEY_SPACE => {
            let tone = TONE.with(Cell::get);
            if tone.source != 0 {
                PlayAudioClip(tone.source, 1, false);
            }
        }
        _ => {}
    }
}

/// Scrolling RGB gradient at `t` seconds
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn gradient(t: f64) -> Vec<Color> {
    let shift = (t * 60.0) as u32 % TEXTURE_WIDTH;
    (0..TEXTURE_HEIGHT)
        .flat_map(|y| {
            (0..TEXTURE_WIDTH).map(move |x| Color {
                r: ((x + shift) % TEXTURE_WIDTH * 255 / TEXTURE_WIDTH) as u8,
                g: (y * 255 / TEXTURE_HEIGHT) as u8,
                b: (((t * 2.0).sin() * 0.5 + 0.5) * 255.0) as u8,
            })
        })
        .collect()
}

/// Quarter-second sine tone, 16-bit little-endian mono
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn tone_samples() -> Vec<u8> {
    let frames = TONE_RATE / 4;
    (0..frames)
        .flat_map(|i| {
            let phase = f64::from(i) / f64::from(TONE_RATE) * TONE_HZ * std::f64::consts::TAU;
            let sample = (phase.sin() * f64::from(i16::MAX) * 0.3) as i16;
            sample.to_le_bytes()
        })
        .collect()
}

fn run() -> Result<(), DemoError> {
    SetErrorCallback(Some(on_error));
    SetWindowEventCallback(Some(on_window_event));
    SetKeyCallback(Some(on_key));

    if !InitializeLibraries() {
        return Err(DemoError::Initialize);
    }

    InitializeAudioContext();
    let samples = tone_samples();
    // SAFETY: `samples` covers the given length.
    #[allow(clippy::cast_possible_truncation)]
    let tone = unsafe {
        CreateAudioClip(FORMAT_MONO16, samples.as_ptr().cast(), samples.len() as u32, TONE_RATE)
    };
    TONE.with(|t| t.set(tone));

    let title = CString::new("Szark Demo").unwrap_or_default();
    // SAFETY: `title` is a live C string.
    let window = unsafe { Create(title.as_ptr(), 800, 450, false) };
    if window.is_null() {
        TerminateLibraries();
        return Err(DemoError::CreateWindow);
    }
    WINDOW.with(|w| w.set(window));

    log::info!("showing window, press Space for a tone and Escape to quit");
    Show(window);

    DestroyAudioClip(tone);
    TerminateLibraries();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting Szark demo");

    run()?;

    log::info!("Szark demo finished");
    Ok(())
}
