//! Decoder session state machine.
//!
//! ```text
//!   Unloaded --initialize--> Idle --start_decoding--> Streaming
//!      ^                      ^ |                        |
//!      |                      | +------unload------------+--> Unloaded
//!      |                      +------stop_decoding-------+
//! ```
//!
//! Streaming messages are sent to the transform only on actual state
//! changes, so repeated start or stop calls are no-ops.

use super::{StreamingMessage, Transform, TransformOutput};
use crate::presentation::PresentationSink;
use crate::stream::StreamKind;
use asfclip_common::{Error, Result};
use asfclip_media::{MediaFormat, MediaSample, VideoFormat};
use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

/// Lifecycle state of a [`DecoderSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Unloaded,
    Idle,
    Streaming,
}

/// One loaded transform bound to a stream kind and its negotiated output.
pub struct DecoderSession {
    kind: StreamKind,
    transform: Option<Box<dyn Transform>>,
    output_format: Option<MediaFormat>,
    streaming: bool,
}

impl DecoderSession {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            transform: None,
            output_format: None,
            streaming: false,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn state(&self) -> DecoderState {
        match (&self.transform, self.streaming) {
            (None, _) => DecoderState::Unloaded,
            (Some(_), false) => DecoderState::Idle,
            (Some(_), true) => DecoderState::Streaming,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == DecoderState::Streaming
    }

    /// Negotiated uncompressed output format.
    pub fn output_format(&self) -> Option<&MediaFormat> {
        self.output_format.as_ref()
    }

    /// Bind `transform` to `input`, choosing the first offered output type
    /// that is the uncompressed target for this stream kind. Audio sessions
    /// also open the audio device for that format.
    ///
    /// Any previously loaded transform is unloaded first. On failure the
    /// session is left unloaded.
    pub fn initialize(
        &mut self,
        mut transform: Box<dyn Transform>,
        input: &MediaFormat,
        sink: &mut dyn PresentationSink,
    ) -> Result<()> {
        self.unload();

        transform.set_input_type(input)?;

        let output = (0..)
            .map_while(|i| transform.output_type(i))
            .find(|format| self.kind.is_target_output(format))
            .ok_or_else(|| {
                Error::invalid_media_type(format!(
                    "decoder offers no {} output for {}",
                    self.kind.target_subtype(),
                    input.subtype()
                ))
            })?;
        transform.set_output_type(&output)?;

        if let MediaFormat::Audio(format) = &output {
            sink.open_audio_device(format)?;
        }

        debug!(
            kind = %self.kind,
            input = %input.subtype(),
            output = %output.subtype(),
            "Decoder initialized"
        );
        self.transform = Some(transform);
        self.output_format = Some(output);
        Ok(())
    }

    /// Enter the streaming state.
    pub fn start_decoding(&mut self) -> Result<()> {
        let transform = self.transform.as_mut().ok_or(Error::NotInitialized)?;
        if !self.streaming {
            transform.process_message(StreamingMessage::BeginStreaming)?;
            self.streaming = true;
            trace!("Decoder streaming");
        }
        Ok(())
    }

    /// Leave the streaming state.
    pub fn stop_decoding(&mut self) -> Result<()> {
        let transform = self.transform.as_mut().ok_or(Error::NotInitialized)?;
        if self.streaming {
            transform.process_message(StreamingMessage::EndStreaming)?;
            self.streaming = false;
            trace!("Decoder idle");
        }
        Ok(())
    }

    /// Release the transform. Ends streaming first if needed.
    pub fn unload(&mut self) {
        if let Some(mut transform) = self.transform.take() {
            if self.streaming {
                if let Err(e) = transform.process_message(StreamingMessage::EndStreaming) {
                    warn!(error = %e, "Failed to end streaming while unloading decoder");
                }
            }
        }
        self.streaming = false;
        self.output_format = None;
    }

    /// Decode one compressed sample, handing every produced output to the
    /// sink's audio clip. Returns the number of outputs produced.
    pub fn process_audio(
        &mut self,
        sample: &MediaSample,
        sink: &mut dyn PresentationSink,
    ) -> Result<usize> {
        let mut produced = 0;
        self.decode(sample, |out| {
            produced += 1;
            sink.append_audio_clip(&out)
        })?;
        Ok(produced)
    }

    /// Decode one compressed key frame and present the resulting image.
    pub fn process_video(
        &mut self,
        sample: &MediaSample,
        sink: &mut dyn PresentationSink,
    ) -> Result<()> {
        let format: VideoFormat = self
            .output_format
            .as_ref()
            .and_then(MediaFormat::video)
            .cloned()
            .ok_or(Error::NotInitialized)?;

        let mut frame = BytesMut::new();
        let mut buffers: Vec<Bytes> = Vec::new();
        self.decode(sample, |out| {
            buffers.extend(out.buffers);
            Ok(())
        })?;

        if buffers.is_empty() {
            debug!("Decoder produced no frame for key frame input");
            return Ok(());
        }
        let data = match buffers.as_slice() {
            [only] => only.clone(),
            many => {
                for buf in many {
                    frame.extend_from_slice(buf);
                }
                frame.freeze()
            }
        };
        sink.build_frame(&data, &format)
    }

    /// Feed one input sample and drain outputs until the transform needs
    /// more input.
    fn decode<F>(&mut self, sample: &MediaSample, mut on_output: F) -> Result<()>
    where
        F: FnMut(MediaSample) -> Result<()>,
    {
        let transform = self.transform.as_mut().ok_or(Error::NotInitialized)?;
        transform.process_input(sample)?;

        loop {
            let size = transform.output_buffer_size();
            let mut buffer = Vec::new();
            buffer
                .try_reserve_exact(size)
                .map_err(|_| Error::OutOfMemory)?;
            buffer.resize(size, 0);

            match transform.process_output(buffer)? {
                TransformOutput::Sample(out) => on_output(out)?,
                TransformOutput::NeedMoreInput => return Ok(()),
            }
        }
    }
}

impl Drop for DecoderSession {
    fn drop(&mut self) {
        self.unload();
    }
}

impl std::fmt::Debug for DecoderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderSession")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("output_format", &self.output_format)
            .finish()
    }
}
