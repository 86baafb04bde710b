//! Decode transform interface.
//!
//! A transform is a stateful codec instance: it is configured with an input
//! type and an output type, accepts compressed samples one at a time and
//! yields decoded samples into caller-allocated buffers until it reports that
//! it needs more input.

use asfclip_common::Result;
use asfclip_media::{MediaFormat, MediaSample};

/// Streaming notifications sent to a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingMessage {
    /// Samples are about to be processed.
    BeginStreaming,
    /// No more samples will be processed until the next begin.
    EndStreaming,
}

/// Outcome of a [`Transform::process_output`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutput {
    /// A decoded sample was produced.
    Sample(MediaSample),
    /// The transform's output queue is empty; feed more input.
    NeedMoreInput,
}

/// A decode transform with a single input and a single output channel.
pub trait Transform: Send {
    /// Negotiate the compressed input type.
    fn set_input_type(&mut self, format: &MediaFormat) -> Result<()>;

    /// Candidate output type at `index`, in preference order. `None` once the
    /// list is exhausted. Only meaningful after the input type is set.
    fn output_type(&self, index: usize) -> Option<MediaFormat>;

    fn set_output_type(&mut self, format: &MediaFormat) -> Result<()>;

    /// Size of the buffer [`process_output`](Self::process_output) needs.
    fn output_buffer_size(&self) -> usize;

    fn process_message(&mut self, message: StreamingMessage) -> Result<()>;

    /// Queue one compressed sample.
    fn process_input(&mut self, sample: &MediaSample) -> Result<()>;

    /// Produce the next decoded sample into `buffer`, which holds
    /// [`output_buffer_size`](Self::output_buffer_size) zeroed bytes. The
    /// transform may shrink it to the produced length.
    fn process_output(&mut self, buffer: Vec<u8>) -> Result<TransformOutput>;
}
