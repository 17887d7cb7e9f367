//! The blocking per-window loop
//!
//! Each iteration: check the close flag, poll OS events, dispatch input,
//! measure the frame interval, fire `Render` once, swap buffers. No backend
//! borrow is held while a listener runs, so listeners may call back into the
//! window (typically to close it).

use crate::error::CoreResult;
use crate::graphics::GraphicsDevice;
use crate::input::InputEvent;

use super::{NativeWindow, WindowState};

/// Frame interval tracker driven by an external time source
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_frame: f64,
    frame_count: u64,
}

impl FrameClock {
    /// Start measuring from `now` (seconds)
    pub const fn start(now: f64) -> Self {
        Self {
            last_frame: now,
            frame_count: 0,
        }
    }

    /// Record a frame at `now` and return the interval since the previous one
    ///
    /// A time source that steps backwards yields 0 rather than a negative
    /// interval.
    pub fn tick(&mut self, now: f64) -> f64 {
        let delta_time = (now - self.last_frame).max(0.0);
        self.last_frame = now;
        self.frame_count += 1;
        delta_time
    }

    /// Ticks so far
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Receives everything the loop produces
pub trait LoopListener {
    /// The window's GL function table is ready
    fn graphics_loaded(&self, device: Box<dyn GraphicsDevice>);

    /// About to enter the loop
    fn opened(&self);

    /// One raw input event
    fn input(&self, event: InputEvent);

    /// One frame with its interval in seconds
    fn render(&self, delta_time: f64);

    /// Loop exited
    fn closed(&self);
}

/// Run `window` until a close is requested
///
/// Returns early, before `opened`, if the graphics context cannot be set up.
/// A close requested before the call ends the loop before its first frame.
/// The flag is cleared on exit so the window can be shown again.
pub fn run(window: &NativeWindow, vsync: bool, listener: &impl LoopListener) -> CoreResult<()> {
    let device = window.with_backend(|backend| {
        backend.enable_input_polling();
        backend.make_current();
        backend.set_vsync(vsync);
        backend.load_graphics()
    })?;
    listener.graphics_loaded(device);

    window.set_state(WindowState::Shown);
    listener.opened();

    let mut clock = FrameClock::start(window.with_backend(|backend| backend.time()));
    loop {
        let events = window.with_backend(|backend| {
            if backend.should_close() {
                None
            } else {
                Some(backend.poll_events())
            }
        });
        let Some(events) = events else {
            break;
        };

        for event in events {
            listener.input(event);
        }

        let now = window.with_backend(|backend| backend.time());
        listener.render(clock.tick(now));

        window.with_backend(|backend| backend.swap_buffers());
    }

    log::debug!("window loop exited after {} frames", clock.frame_count());
    window.with_backend(|backend| backend.set_should_close(false));
    window.set_state(WindowState::Closed);
    listener.closed();
    Ok(())
}


#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::fake::FakeWindow;
    use super::*;
    use std::cell::{Cell, RefCell};

    use approx::assert_relative_eq;

    use crate::error::CoreError;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
        deltas: RefCell<Vec<f64>>,
        close_after: Cell<Option<usize>>,
        window: Cell<Option<*const NativeWindow>>,
    }

    impl Recorder {
        fn push(&self, entry: impl Into<String>) {
            self.events.borrow_mut().push(entry.into());
        }
    }

    impl LoopListener for Recorder {
        fn graphics_loaded(&self, _device: Box<dyn GraphicsDevice>) {
            self.push("graphics");
        }

        fn opened(&self) {
            self.push("opened");
        }

        fn input(&self, event: InputEvent) {
            self.push(format!("{event:?}"));
        }

        fn render(&self, delta_time: f64) {
            self.push("render");
            self.deltas.borrow_mut().push(delta_time);
            let renders = self.deltas.borrow().len();
            if self.close_after.get() == Some(renders) {
                if let Some(window) = self.window.get() {
                    // SAFETY: the window outlives the loop that calls us.
                    unsafe { &*window }.request_close();
                }
            }
        }

        fn closed(&self) {
            self.push("closed");
        }
    }

    fn run_with(backend: FakeWindow, close_after: usize) -> (Recorder, NativeWindow) {
        let window = NativeWindow::new(Box::new(backend));
        let recorder = Recorder::default();
        recorder.close_after.set(Some(close_after));
        recorder.window.set(Some(&window as *const _));
        run(&window, true, &recorder).unwrap();
        (recorder, window)
    }

    #[test]
    fn test_clock_starts_at_zero() {
        let mut clock = FrameClock::start(5.0);
        assert_eq!(clock.frame_count(), 0);
        assert_eq!(clock.tick(5.0), 0.0);
    }

    #[test]
    fn test_clock_never_goes_negative() {
        let mut clock = FrameClock::start(2.0);
        assert_relative_eq!(clock.tick(2.5), 0.5);
        assert_eq!(clock.tick(1.0), 0.0);
        assert_relative_eq!(clock.tick(1.25), 0.25);
        assert_eq!(clock.frame_count(), 3);
    }

    #[test]
    fn test_close_in_first_render() {
        let (recorder, window) = run_with(FakeWindow::new(), 1);
        assert_eq!(*recorder.events.borrow(), vec!["graphics", "opened", "render", "closed"]);
        assert_eq!(window.state(), WindowState::Closed);
    }

    #[test]
    fn test_input_dispatched_before_render() {
        let backend = FakeWindow::new().with_frames(vec![
            vec![InputEvent::Key { key: 65, action: 1 }],
            vec![
                InputEvent::Cursor { x: 1.0, y: 2.0 },
                InputEvent::Scroll { dx: 0.0, dy: 1.0 },
            ],
        ]);
        let (recorder, _) = run_with(backend, 2);
        assert_eq!(
            *recorder.events.borrow(),
            vec![
                "graphics",
                "opened",
                "Key { key: 65, action: 1 }",
                "render",
                "Cursor { x: 1.0, y: 2.0 }",
                "Scroll { dx: 0.0, dy: 1.0 }",
                "render",
                "closed",
            ]
        );
    }

    #[test]
    fn test_deltas_follow_clock() {
        let backend = FakeWindow::new().with_times(&[0.016, 0.050, 0.050]);
        let (recorder, _) = run_with(backend, 4);
        let deltas = recorder.deltas.borrow();
        assert_eq!(deltas.len(), 4);
        assert_eq!(deltas[0], 0.0);
        assert_relative_eq!(deltas[1], 0.016);
        assert_relative_eq!(deltas[2], 0.034, epsilon = 1e-12);
        assert_eq!(deltas[3], 0.0);
    }

    #[test]
    fn test_swap_follows_render() {
        let backend = FakeWindow::new();
        let log = backend.log.clone();
        run_with(backend, 1);
        let calls = log.borrow().calls.clone();
        assert_eq!(
            calls,
            vec![
                "enable_input_polling",
                "make_current",
                "load_graphics",
                "poll_events",
                "swap_buffers",
            ]
        );
        assert_eq!(log.borrow().vsync, Some(true));
    }

    #[test]
    fn test_graphics_failure_skips_loop() {
        let mut backend = FakeWindow::new();
        backend.fail_graphics = true;
        let window = NativeWindow::new(Box::new(backend));
        let recorder = Recorder::default();
        let result = run(&window, false, &recorder);
        assert!(matches!(result, Err(CoreError::GraphicsLoad)));
        assert!(recorder.events.borrow().is_empty());
        assert_eq!(window.state(), WindowState::Created);
    }

    #[test]
    fn test_closed_window_can_be_shown_again() {
        let (recorder, window) = run_with(FakeWindow::new(), 1);
        recorder.events.borrow_mut().clear();
        recorder.deltas.borrow_mut().clear();
        recorder.window.set(Some(&window as *const _));
        run(&window, true, &recorder).unwrap();
        assert_eq!(*recorder.events.borrow(), vec!["graphics", "opened", "render", "closed"]);
    }

    #[test]
    fn test_close_before_run_skips_frames() {
        let window = NativeWindow::new(Box::new(FakeWindow::new()));
        window.request_close();
        assert_eq!(window.state(), WindowState::Created);

        let recorder = Recorder::default();
        run(&window, true, &recorder).unwrap();
        assert_eq!(*recorder.events.borrow(), vec!["graphics", "opened", "closed"]);
        assert_eq!(window.state(), WindowState::Closed);
        assert!(!window.with_backend(|backend| backend.should_close()));
    }

    #[test]
    fn test_os_close_finishes_the_frame() {
        let mut backend = FakeWindow::new();
        backend.os_close_on_poll = Some(2);
        let window = NativeWindow::new(Box::new(backend));
        let recorder = Recorder::default();
        run(&window, true, &recorder).unwrap();
        assert_eq!(
            *recorder.events.borrow(),
            vec!["graphics", "opened", "render", "render", "closed"]
        );
    }
}
