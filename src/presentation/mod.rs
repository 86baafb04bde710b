//! Presentation layer.
//!
//! Decoded output leaves the pipeline through two seams:
//!
//! - [`PresentationSink`] receives decoded audio clips and video frames. The
//!   bundled [`MediaController`] accumulates a clip for an [`AudioOutput`]
//!   worker and turns frames into RGBA images.
//! - [`SampleSink`] receives one [`SampleRecord`] per decoded sample so the
//!   caller can observe extraction progress.

pub mod audio;
pub mod controller;

pub use audio::{AudioDevice, AudioOutput, Completion, NullAudioDevice};
pub use controller::MediaController;

use crate::pipeline::SampleRecord;
use asfclip_common::Result;
use asfclip_media::{AudioFormat, MediaSample, VideoFormat};

/// Consumer of decoded audio and video.
pub trait PresentationSink: Send {
    /// Prepare audio output for PCM in `format`. Called once per audio stream
    /// selection, before any clip data.
    fn open_audio_device(&mut self, format: &AudioFormat) -> Result<()>;

    /// Append a decoded audio sample to the pending clip.
    fn append_audio_clip(&mut self, sample: &MediaSample) -> Result<()>;

    /// Present one decoded frame. `data` is laid out as described by `format`.
    fn build_frame(&mut self, data: &[u8], format: &VideoFormat) -> Result<()>;

    /// Discard all presentation state.
    fn reset(&mut self);
}

/// Observer notified of every decoded sample.
pub trait SampleSink {
    fn on_sample_produced(&mut self, record: &SampleRecord);
}

impl<F> SampleSink for F
where
    F: FnMut(&SampleRecord),
{
    fn on_sample_produced(&mut self, record: &SampleRecord) {
        self(record)
    }
}
