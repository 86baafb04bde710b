//! Passthrough transform.
//!
//! Treats compressed payload bytes as if they were already decoded. It lets
//! the pipeline run end to end on any audio or video stream without a real
//! codec: audio payloads become PCM with the stream's channel layout, video
//! payloads become RGB32 frames with the stream's dimensions.

use super::{StreamingMessage, Transform, TransformOutput};
use asfclip_common::{Error, Result};
use asfclip_media::{AudioFormat, MediaFormat, MediaSample, VideoFormat};
use bytes::Bytes;
use std::collections::VecDeque;

/// Output size used before an output type is negotiated.
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct PassthroughTransform {
    input: Option<MediaFormat>,
    output: Option<MediaFormat>,
    pending: VecDeque<MediaSample>,
    streaming: bool,
}

impl PassthroughTransform {
    pub const NAME: &'static str = "passthrough";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn frame_size(format: &VideoFormat) -> Result<usize> {
        (format.width as usize)
            .checked_mul(format.rows() as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| {
                Error::invalid_media_type(format!(
                    "{}x{} frame too large",
                    format.width,
                    format.rows()
                ))
            })
    }

    fn convert(&self, data: &[u8], buffer: &mut Vec<u8>) -> Result<()> {
        match &self.output {
            Some(MediaFormat::Video(format)) => {
                let size = Self::frame_size(format)?;
                buffer.clear();
                buffer.extend_from_slice(&data[..data.len().min(size)]);
                buffer.resize(size, 0);
            }
            Some(MediaFormat::Audio(format)) => {
                let align = format.block_align.max(1) as usize;
                let len = data.len() - data.len() % align;
                buffer.clear();
                buffer.extend_from_slice(&data[..len]);
            }
            _ => {
                buffer.clear();
                buffer.extend_from_slice(data);
            }
        }
        Ok(())
    }
}

impl Transform for PassthroughTransform {
    fn set_input_type(&mut self, format: &MediaFormat) -> Result<()> {
        match format {
            MediaFormat::Audio(_) | MediaFormat::Video(_) => {
                if let MediaFormat::Video(v) = format {
                    VideoFormat::rgb32(v.width, v.rows())?;
                }
                self.input = Some(format.clone());
                self.output = None;
                Ok(())
            }
            MediaFormat::Other { .. } => Err(Error::invalid_media_type(format!(
                "passthrough cannot decode {} streams",
                format.major_type()
            ))),
        }
    }

    fn output_type(&self, index: usize) -> Option<MediaFormat> {
        if index > 0 {
            return None;
        }
        match self.input.as_ref()? {
            MediaFormat::Audio(a) => {
                let bits = if a.bits_per_sample == 0 { 16 } else { a.bits_per_sample };
                Some(MediaFormat::Audio(AudioFormat::pcm(
                    a.channels.max(1),
                    a.samples_per_sec,
                    bits,
                )))
            }
            MediaFormat::Video(v) => {
                VideoFormat::rgb32(v.width, v.rows()).ok().map(MediaFormat::Video)
            }
            MediaFormat::Other { .. } => None,
        }
    }

    fn set_output_type(&mut self, format: &MediaFormat) -> Result<()> {
        let Some(input) = &self.input else {
            return Err(Error::NotInitialized);
        };
        if format.major_type() != input.major_type() || format.is_compressed() {
            return Err(Error::invalid_media_type(format!(
                "cannot produce {} from {}",
                format.subtype(),
                input.subtype()
            )));
        }
        if let MediaFormat::Video(v) = format {
            Self::frame_size(v)?;
        }
        self.output = Some(format.clone());
        Ok(())
    }

    fn output_buffer_size(&self) -> usize {
        match &self.output {
            Some(MediaFormat::Video(format)) => {
                Self::frame_size(format).unwrap_or(DEFAULT_BUFFER_SIZE)
            }
            _ => DEFAULT_BUFFER_SIZE,
        }
    }

    fn process_message(&mut self, message: StreamingMessage) -> Result<()> {
        match message {
            StreamingMessage::BeginStreaming => self.streaming = true,
            StreamingMessage::EndStreaming => {
                self.streaming = false;
                self.pending.clear();
            }
        }
        Ok(())
    }

    fn process_input(&mut self, sample: &MediaSample) -> Result<()> {
        if self.output.is_none() {
            return Err(Error::NotInitialized);
        }
        self.pending.push_back(sample.clone());
        Ok(())
    }

    fn process_output(&mut self, mut buffer: Vec<u8>) -> Result<TransformOutput> {
        let Some(input) = self.pending.pop_front() else {
            return Ok(TransformOutput::NeedMoreInput);
        };
        self.convert(&input.contiguous(), &mut buffer)?;

        Ok(TransformOutput::Sample(MediaSample {
            stream_number: input.stream_number,
            presentation_time: input.presentation_time,
            duration: input.duration,
            buffers: vec![Bytes::from(buffer)],
            key_frame: input.key_frame,
            discontinuity: input.discontinuity,
        }))
    }
}
