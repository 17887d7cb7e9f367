//! Rodio audio backend
//!
//! Each source gets its own [`Sink`]. Playing a source again drops the old
//! sink, which silences it, and starts a fresh one.
//!
//! rodio's [`OutputStream`] cannot leave the thread that opened it, so it
//! lives on a parked `szark-audio` thread. The backend keeps the `Send`
//! handle and a channel whose drop releases the stream.

use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source, StreamError};

use super::AudioBackend;
use crate::audio::{AudioError, PcmBuffer};

/// Default output device plus one sink per active source
pub struct RodioBackend {
    handle: OutputStreamHandle,
    sinks: HashMap<u32, Sink>,
    /// Dropping this ends the stream thread
    _stream_guard: mpsc::Sender<()>,
}

impl RodioBackend {
    /// Open the system's default output device
    pub fn open_default() -> Result<Self, AudioError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (guard, released) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("szark-audio".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if ready_tx.send(Ok(handle)).is_ok() {
                        // Returns once the backend is dropped.
                        let _ = released.recv();
                    }
                    drop(stream);
                    log::debug!("audio output closed");
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|e| AudioError::ContextFailed(e.to_string()))?;

        let handle = ready_rx
            .recv()
            .map_err(|_| AudioError::ContextFailed("audio thread exited early".to_string()))?
            .map_err(|e| match e {
                StreamError::NoDevice => AudioError::DeviceNotFound,
                other => AudioError::ContextFailed(other.to_string()),
            })?;

        log::info!("opened default audio output");
        Ok(Self {
            handle,
            sinks: HashMap::new(),
            _stream_guard: guard,
        })
    }
}

impl AudioBackend for RodioBackend {
    fn play(
        &mut self,
        source: u32,
        buffer: &PcmBuffer,
        gain: f32,
        looping: bool,
    ) -> Result<(), AudioError> {
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| AudioError::PlaybackFailed(format!("Failed to create sink: {e}")))?;
        sink.set_volume(gain);

        let samples =
            SamplesBuffer::new(buffer.channels, buffer.sample_rate, buffer.samples.clone());
        if looping {
            sink.append(samples.repeat_infinite());
        } else {
            sink.append(samples);
        }

        if let Some(previous) = self.sinks.insert(source, sink) {
            previous.stop();
        }
        Ok(())
    }

    fn stop(&mut self, source: u32) {
        if let Some(sink) = self.sinks.remove(&source) {
            sink.stop();
        }
    }

    fn is_playing(&self, source: u32) -> bool {
        self.sinks.get(&source).is_some_and(|sink| !sink.empty())
    }
}
