//! Common error types used throughout asfclip.
//!
//! Every fallible operation in the container, decoder and pipeline layers
//! reports one of these variants. The two conditions that are treated as
//! success (a transform asking for more input, a sample without a timestamp)
//! never surface here.

use crate::MajorType;

/// Common error type for asfclip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation requires a prior open/select that has not happened.
    #[error("Not initialized")]
    NotInitialized,

    /// A null/zero identifier or a malformed parameter was supplied.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An allocation could not be satisfied.
    #[error("Out of memory")]
    OutOfMemory,

    /// The container header or a data packet could not be parsed.
    #[error("Format error: {0}")]
    Format(String),

    /// The container declares no streams.
    #[error("Container declares no streams")]
    NoStreams,

    /// No decode transform is registered for the stream's media type.
    #[error("No decoder found for {major} stream with subtype {subtype}")]
    CodecNotFound {
        /// Major type of the stream.
        major: MajorType,
        /// Human-readable subtype (format tag or FourCC).
        subtype: String,
    },

    /// A media type could not be negotiated or is not acceptable.
    #[error("Invalid media type: {0}")]
    InvalidMediaType(String),

    /// The request is not supported for this stream (e.g. uncompressed).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The stream carries no index entries.
    #[error("Stream {0} is not indexed")]
    NoIndex(u16),

    /// A decode transform failed.
    #[error("Transform failed: {0}")]
    Fail(String),

    /// The audio output is still playing a previously submitted clip.
    #[error("Audio device busy")]
    DeviceBusy,

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new InvalidArgument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new Format error.
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Self::Format(msg.into())
    }

    /// Create a new InvalidMediaType error.
    pub fn invalid_media_type<S: Into<String>>(msg: S) -> Self {
        Self::InvalidMediaType(msg.into())
    }

    /// Create a new InvalidRequest error.
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new Fail error.
    pub fn fail<S: Into<String>>(msg: S) -> Self {
        Self::Fail(msg.into())
    }

    /// Create a Format error describing a truncated structure.
    pub fn truncated(what: &str, need: usize, have: usize) -> Self {
        Self::Format(format!("{what} truncated: need {need} bytes, have {have}"))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
