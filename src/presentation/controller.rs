//! Default presentation sink.

use super::audio::{AudioOutput, Completion, NullAudioDevice};
use super::PresentationSink;
use asfclip_common::{Error, MediaTime, Result};
use asfclip_media::format::WAVE_FORMAT_PCM;
use asfclip_media::{AudioFormat, MediaSample, Subtype, VideoFormat};
use bytes::BytesMut;
use image::{Rgba, RgbaImage};
use std::time::Duration;
use tracing::{debug, info};

/// Collects decoded audio into a playable clip and converts decoded frames
/// to RGBA images.
#[derive(Debug, Default)]
pub struct MediaController {
    output: Option<AudioOutput>,
    audio_format: Option<AudioFormat>,
    clip: BytesMut,
    clip_samples: usize,
    frame: Option<RgbaImage>,
    frames_built: usize,
}

impl MediaController {
    /// Controller that plays clips on a [`NullAudioDevice`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller that plays clips on an existing audio output.
    pub fn with_output(output: AudioOutput) -> Self {
        Self {
            output: Some(output),
            ..Default::default()
        }
    }

    pub fn audio_format(&self) -> Option<&AudioFormat> {
        self.audio_format.as_ref()
    }

    /// PCM accumulated since the last [`play_clip`](Self::play_clip).
    pub fn clip(&self) -> &[u8] {
        &self.clip
    }

    pub fn clip_samples(&self) -> usize {
        self.clip_samples
    }

    /// Playing time of the pending clip.
    pub fn clip_duration(&self) -> MediaTime {
        match &self.audio_format {
            Some(format) if format.avg_bytes_per_sec > 0 => MediaTime::from_secs_f64(
                self.clip.len() as f64 / format.avg_bytes_per_sec as f64,
            ),
            _ => MediaTime::ZERO,
        }
    }

    /// The most recently built frame.
    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    pub fn frames_built(&self) -> usize {
        self.frames_built
    }

    /// Submit the pending clip to the audio output. Returns the number of
    /// bytes submitted; zero when nothing is pending.
    pub fn play_clip(&mut self) -> Result<usize> {
        let output = self.output.as_mut().ok_or(Error::NotInitialized)?;
        if self.clip.is_empty() {
            return Ok(0);
        }
        if output.is_busy() {
            return Err(Error::DeviceBusy);
        }
        let clip = self.clip.split().freeze();
        let len = clip.len();
        output.play(clip)?;
        info!(bytes = len, samples = self.clip_samples, "Playing audio clip");
        self.clip_samples = 0;
        Ok(len)
    }

    pub fn is_playing(&self) -> bool {
        self.output.as_ref().is_some_and(AudioOutput::is_busy)
    }

    pub fn poll_completions(&mut self) -> Vec<Completion> {
        self.output
            .as_mut()
            .map(AudioOutput::poll_completions)
            .unwrap_or_default()
    }

    pub fn wait_completion(&mut self, timeout: Duration) -> Option<Completion> {
        self.output.as_mut()?.wait_completion(timeout)
    }
}

impl PresentationSink for MediaController {
    fn open_audio_device(&mut self, format: &AudioFormat) -> Result<()> {
        if format.format_tag != WAVE_FORMAT_PCM || format.block_align == 0 {
            return Err(Error::invalid_media_type(format!(
                "audio device needs PCM, got {}",
                Subtype::WaveFormat(format.format_tag)
            )));
        }
        let output = self
            .output
            .get_or_insert_with(|| AudioOutput::spawn(NullAudioDevice::new()));
        output.open(format)?;
        debug!(
            channels = format.channels,
            rate = format.samples_per_sec,
            bits = format.bits_per_sample,
            "Opened audio device"
        );
        self.audio_format = Some(format.clone());
        self.clip.clear();
        self.clip_samples = 0;
        Ok(())
    }

    fn append_audio_clip(&mut self, sample: &MediaSample) -> Result<()> {
        if self.audio_format.is_none() {
            return Err(Error::NotInitialized);
        }
        for buffer in &sample.buffers {
            self.clip.extend_from_slice(buffer);
        }
        self.clip_samples += 1;
        Ok(())
    }

    fn build_frame(&mut self, data: &[u8], format: &VideoFormat) -> Result<()> {
        let image = bgrx_to_rgba(data, format)?;
        debug!(width = image.width(), height = image.height(), "Built frame");
        self.frame = Some(image);
        self.frames_built += 1;
        Ok(())
    }

    fn reset(&mut self) {
        self.output = None;
        self.audio_format = None;
        self.clip = BytesMut::new();
        self.clip_samples = 0;
        self.frame = None;
        self.frames_built = 0;
    }
}

/// Convert a 32-bit BGRX frame to RGBA.
///
/// A negative stride, or a zero stride with a positive height, means the
/// first row in memory is the bottom of the image.
pub fn bgrx_to_rgba(data: &[u8], format: &VideoFormat) -> Result<RgbaImage> {
    if format.is_compressed() || format.bit_count != 32 {
        return Err(Error::invalid_media_type(format!(
            "frame must be RGB32, got {}",
            format.subtype()
        )));
    }
    let width = format.width;
    let rows = format.rows();
    if width == 0 || rows == 0 {
        return Err(Error::invalid_argument("frame has no pixels"));
    }

    let row_bytes = width as usize * 4;
    let stride = match format.stride.unsigned_abs() as usize {
        0 => row_bytes,
        s => s,
    };
    if stride < row_bytes {
        return Err(Error::invalid_argument(format!(
            "stride {stride} is shorter than a {width}-pixel row"
        )));
    }
    let needed = stride * (rows as usize - 1) + row_bytes;
    if data.len() < needed {
        return Err(Error::invalid_argument(format!(
            "frame needs {needed} bytes, got {}",
            data.len()
        )));
    }

    let bottom_up = format.stride < 0 || (format.stride == 0 && format.height > 0);
    let mut image = RgbaImage::new(width, rows);
    for y in 0..rows {
        let src = (if bottom_up { rows - 1 - y } else { y }) as usize;
        let row = &data[src * stride..src * stride + row_bytes];
        for (x, px) in row.chunks_exact(4).enumerate() {
            image.put_pixel(x as u32, y, Rgba([px[2], px[1], px[0], 0xFF]));
        }
    }
    Ok(image)
}
