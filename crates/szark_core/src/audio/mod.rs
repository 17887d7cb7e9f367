//! Audio clips and playback
//!
//! Clips are PCM buffers bound to a playback source, addressed by the
//! numeric ids the host keeps in its `AudioClip` struct. Formats use the
//! OpenAL codes the host already speaks. Ids stay valid until the host
//! destroys the clip; nothing is released automatically.

pub mod backend;

use std::collections::HashMap;

use thiserror::Error;

pub use backend::rodio_backend::RodioBackend;
pub use backend::AudioBackend;

/// 8-bit unsigned mono
pub const FORMAT_MONO8: i32 = 0x1100;
/// 16-bit signed little-endian mono
pub const FORMAT_MONO16: i32 = 0x1101;
/// 8-bit unsigned interleaved stereo
pub const FORMAT_STEREO8: i32 = 0x1102;
/// 16-bit signed little-endian interleaved stereo
pub const FORMAT_STEREO16: i32 = 0x1103;

/// Audio errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// No output device
    #[error("Failed to find default audio device!")]
    DeviceNotFound,

    /// Device found but the output stream could not be opened
    #[error("Failed to create audio context: {0}")]
    ContextFailed(String),

    /// Clip call before `InitializeAudioContext`
    #[error("Audio context must be initialized first!")]
    NotInitialized,

    /// Format code is not one of the four PCM layouts
    #[error("Unsupported audio format {0:#x}")]
    UnsupportedFormat(i32),

    /// Clip data or parameters are unusable
    #[error("Invalid audio clip: {0}")]
    InvalidClip(&'static str),

    /// Source id does not name a live clip
    #[error("Unknown audio source {0}")]
    UnknownSource(u32),

    /// The output refused to play
    #[error("Audio playback failed: {0}")]
    PlaybackFailed(String),
}

/// Source and buffer ids of one clip, as the host stores them
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioClip {
    /// Playback source id
    pub source: u32,
    /// Data buffer id
    pub buffer: u32,
}

/// PCM sample layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 8-bit unsigned mono
    Mono8,
    /// 16-bit signed mono
    Mono16,
    /// 8-bit unsigned stereo
    Stereo8,
    /// 16-bit signed stereo
    Stereo16,
}

impl SampleFormat {
    /// Parse an OpenAL format code
    pub const fn from_code(code: i32) -> Result<Self, AudioError> {
        match code {
            FORMAT_MONO8 => Ok(Self::Mono8),
            FORMAT_MONO16 => Ok(Self::Mono16),
            FORMAT_STEREO8 => Ok(Self::Stereo8),
            FORMAT_STEREO16 => Ok(Self::Stereo16),
            other => Err(AudioError::UnsupportedFormat(other)),
        }
    }

    /// Interleaved channel count
    pub const fn channels(self) -> u16 {
        match self {
            Self::Mono8 | Self::Mono16 => 1,
            Self::Stereo8 | Self::Stereo16 => 2,
        }
    }

    const fn is_eight_bit(self) -> bool {
        matches!(self, Self::Mono8 | Self::Stereo8)
    }
}

/// Decoded clip data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    /// Interleaved channel count
    pub channels: u16,
    /// Frames per second
    pub sample_rate: u32,
    /// Interleaved signed 16-bit samples, whole frames only
    pub samples: Vec<i16>,
}

impl PcmBuffer {
    /// Decode raw bytes in `format`; a trailing partial frame is dropped
    pub fn decode(
        format: SampleFormat,
        data: &[u8],
        sample_rate: u32,
    ) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidClip("sample rate must be positive"));
        }

        let mut samples: Vec<i16> = if format.is_eight_bit() {
            data.iter().map(|&b| (i16::from(b) - 128) << 8).collect()
        } else {
            data.chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect()
        };

        let channels = format.channels();
        let whole = samples.len() - samples.len() % usize::from(channels);
        samples.truncate(whole);

        Ok(Self {
            channels,
            sample_rate,
            samples,
        })
    }

    /// Number of frames
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }
}

/// Clip table plus the output device
#[derive(Default)]
pub struct AudioSystem {
    backend: Option<Box<dyn AudioBackend>>,
    buffers: HashMap<u32, PcmBuffer>,
    sources: HashMap<u32, u32>,
    next_id: u32,
}

impl AudioSystem {
    /// Open the default output device once
    pub fn initialize(&mut self) -> Result<(), AudioError> {
        if self.backend.is_some() {
            log::debug!("audio context already initialized");
            return Ok(());
        }
        let backend = RodioBackend::open_default()?;
        self.attach(Box::new(backend));
        Ok(())
    }

    /// Use `backend` for output
    pub fn attach(&mut self, backend: Box<dyn AudioBackend>) {
        self.backend = Some(backend);
        log::info!("audio context ready");
    }

    fn allocate_id(&mut self) -> u32 {
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            let id = self.next_id;
            if id != 0 && !self.sources.contains_key(&id) && !self.buffers.contains_key(&id) {
                return id;
            }
        }
    }

    /// Decode `data` into a new buffer bound to a new source
    pub fn create_clip(
        &mut self,
        format: i32,
        data: &[u8],
        frequency: u32,
    ) -> Result<AudioClip, AudioError> {
        if self.backend.is_none() {
            return Err(AudioError::NotInitialized);
        }
        let pcm = PcmBuffer::decode(SampleFormat::from_code(format)?, data, frequency)?;

        let source = self.allocate_id();
        let buffer = self.allocate_id();
        log::debug!(
            "audio clip {source}/{buffer}: {} frames, {} channel(s) at {} Hz",
            pcm.frames(),
            pcm.channels,
            pcm.sample_rate
        );
        self.buffers.insert(buffer, pcm);
        self.sources.insert(source, buffer);
        Ok(AudioClip { source, buffer })
    }

    /// Stop the clip's source and release both ids
    pub fn destroy_clip(&mut self, clip: AudioClip) {
        if self.sources.remove(&clip.source).is_some() {
            // Finished voices still hold their samples, so release even when idle.
            if let Some(backend) = self.backend.as_mut() {
                backend.stop(clip.source);
            }
        }
        self.buffers.remove(&clip.buffer);
    }

    /// (Re)start `source` from the beginning
    ///
    /// `volume` is the gain, passed through as-is.
    pub fn play(&mut self, source: u32, volume: i32, looping: bool) -> Result<(), AudioError> {
        let backend = self.backend.as_mut().ok_or(AudioError::NotInitialized)?;
        let pcm = self
            .sources
            .get(&source)
            .and_then(|buffer| self.buffers.get(buffer))
            .ok_or(AudioError::UnknownSource(source))?;
        #[allow(clippy::cast_precision_loss)]
        let gain = volume as f32;
        backend.play(source, pcm, gain, looping)
    }

    /// Stop `source`; unknown or idle sources are ignored
    pub fn stop(&mut self, source: u32) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        if backend.is_playing(source) {
            backend.stop(source);
        } else {
            log::debug!("audio source {source} is not playing");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeOutput;
    use super::*;

    fn system() -> (AudioSystem, FakeOutput) {
        let output = FakeOutput::default();
        let mut system = AudioSystem::default();
        system.attach(Box::new(FakeOutput { log: output.log.clone() }));
        (system, output)
    }

    #[test]
    fn test_format_codes() {
        assert_eq!(SampleFormat::from_code(0x1100).unwrap(), SampleFormat::Mono8);
        assert_eq!(SampleFormat::from_code(0x1103).unwrap().channels(), 2);
        assert!(matches!(
            SampleFormat::from_code(0x1234),
            Err(AudioError::UnsupportedFormat(0x1234))
        ));
    }

    #[test]
    fn test_decode_eight_bit_is_unsigned() {
        let pcm = PcmBuffer::decode(SampleFormat::Mono8, &[0, 128, 255], 8000).unwrap();
        assert_eq!(pcm.samples, vec![-32768, 0, 32512]);
        assert_eq!(pcm.frames(), 3);
    }

    #[test]
    fn test_decode_sixteen_bit_little_endian() {
        let bytes = [0x01, 0x00, 0xff, 0xff, 0x7f];
        let pcm = PcmBuffer::decode(SampleFormat::Mono16, &bytes, 44100).unwrap();
        assert_eq!(pcm.samples, vec![1, -1]);
    }

    #[test]
    fn test_decode_drops_partial_stereo_frame() {
        let pcm = PcmBuffer::decode(SampleFormat::Stereo16, &[0, 0, 1, 0, 2, 0], 22050).unwrap();
        assert_eq!(pcm.samples, vec![0, 1]);
        assert_eq!(pcm.frames(), 1);
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        assert!(matches!(
            PcmBuffer::decode(SampleFormat::Mono8, &[1, 2], 0),
            Err(AudioError::InvalidClip(_))
        ));
    }

    #[test]
    fn test_create_requires_initialization() {
        let mut system = AudioSystem::default();
        assert!(matches!(
            system.create_clip(FORMAT_MONO8, &[0; 4], 8000),
            Err(AudioError::NotInitialized)
        ));
    }

    #[test]
    fn test_clip_ids_are_distinct_and_nonzero() {
        let (mut system, _) = system();
        let a = system.create_clip(FORMAT_MONO8, &[0; 4], 8000).unwrap();
        let b = system.create_clip(FORMAT_STEREO16, &[0; 8], 8000).unwrap();
        let ids = [a.source, a.buffer, b.source, b.buffer];
        assert!(ids.iter().all(|&id| id != 0));
        for (i, x) in ids.iter().enumerate() {
            assert!(ids[i + 1..].iter().all(|y| y != x));
        }
    }

    #[test]
    fn test_play_stop_destroy() {
        let (mut system, output) = system();
        let clip = system.create_clip(FORMAT_MONO16, &[0; 200], 44100).unwrap();

        system.play(clip.source, 2, true).unwrap();
        assert!(output.is_playing(clip.source));
        system.stop(clip.source);
        assert!(!output.is_playing(clip.source));

        system.play(clip.source, 1, false).unwrap();
        system.destroy_clip(clip);
        assert!(!output.is_playing(clip.source));
        assert!(matches!(
            system.play(clip.source, 1, false),
            Err(AudioError::UnknownSource(_))
        ));

        let calls = output.calls();
        assert_eq!(
            calls,
            vec![
                format!("play {} frames=100 gain=2 loop=true", clip.source),
                format!("stop {}", clip.source),
                format!("play {} frames=100 gain=1 loop=false", clip.source),
                format!("stop {}", clip.source),
            ]
        );
    }

    #[test]
    fn test_volume_is_not_clamped() {
        let (mut system, output) = system();
        let clip = system.create_clip(FORMAT_MONO8, &[0; 4], 8000).unwrap();
        system.play(clip.source, 25, false).unwrap();
        assert!(output.calls()[0].contains("gain=25"));
    }

    #[test]
    fn test_destroy_unknown_clip_is_ignored() {
        let (mut system, output) = system();
        system.destroy_clip(AudioClip { source: 99, buffer: 100 });
        assert!(output.calls().is_empty());
    }

    #[test]
    fn test_stop_idle_source_is_noop() {
        let (mut system, output) = system();
        let clip = system.create_clip(FORMAT_MONO8, &[0; 4], 8000).unwrap();
        system.stop(clip.source);
        system.stop(12345);
        assert!(output.calls().is_empty());
    }
}
