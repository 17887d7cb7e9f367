//! Audio output abstraction
//!
//! The clip table only talks to this trait, so clip bookkeeping can be
//! exercised without a sound device. Backends are `Send` because the clip
//! table is shared by every thread.

pub mod rodio_backend;

use super::{AudioError, PcmBuffer};

/// Output device playing decoded clips on numbered sources
pub trait AudioBackend: Send {
    /// Start `buffer` on `source` from the beginning
    ///
    /// Anything already playing on `source` is replaced. `gain` scales the
    /// samples as given; values above 1.0 amplify.
    ///
    /// # Errors
    /// `PlaybackFailed` if the device refuses a new voice
    fn play(
        &mut self,
        source: u32,
        buffer: &PcmBuffer,
        gain: f32,
        looping: bool,
    ) -> Result<(), AudioError>;

    /// Stop `source`
    fn stop(&mut self, source: u32);

    /// Whether `source` has samples left to play
    fn is_playing(&self, source: u32) -> bool;
}
