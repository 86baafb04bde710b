//! asfclip - seek-driven clip extraction for ASF files
//!
//! Opens an ASF container, resolves a presentation time to a byte offset in
//! the data region and decodes a bounded window from there: a short audio
//! clip, or the first video key frame past the seek point in either playback
//! direction.
//!
//! The library crate exposes the core for the CLI and for integration tests.
//!
//! # Example
//!
//! ```no_run
//! use asfclip::{CodecRegistry, ContainerSession, MediaController, SampleRecord};
//! use asfclip_common::{Direction, MediaTime};
//!
//! # fn main() -> asfclip_common::Result<()> {
//! let mut session =
//!     ContainerSession::new(CodecRegistry::with_passthrough(), MediaController::new());
//! session.open("movie.wmv")?;
//! session.select_stream(2)?;
//!
//! let mut frames = 0;
//! let summary = session.extract(
//!     MediaTime::from_secs_f64(12.0),
//!     Direction::Forward,
//!     &mut |record: &SampleRecord| frames += usize::from(record.key_frame),
//! )?;
//! assert_eq!(summary.samples, frames);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decoder;
pub mod pipeline;
pub mod presentation;
pub mod seek;
pub mod session;
pub mod stream;

pub use decoder::{CodecRegistry, DecoderSession, DecoderState, PassthroughTransform, Transform};
pub use pipeline::{ExtractOptions, ExtractSummary, SampleRecord};
pub use presentation::{MediaController, PresentationSink, SampleSink};
pub use seek::{SeekResolver, SeekResult};
pub use session::ContainerSession;
pub use stream::{PlaybackWindow, SelectedStream, StreamKind};
