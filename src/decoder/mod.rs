//! Decoding: transform interface, codec registry and the decoder session.

pub mod passthrough;
pub mod registry;
pub mod session;
pub mod transform;

pub use passthrough::PassthroughTransform;
pub use registry::{CodecInfo, CodecRegistry};
pub use session::{DecoderSession, DecoderState};
pub use transform::{StreamingMessage, Transform, TransformOutput};
