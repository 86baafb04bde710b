//! asfclip-media: ASF container parsing, demultiplexing and index lookup
//!
//! This crate provides the container-level collaborators used by the asfclip
//! extraction pipeline. It reads ASF (WMA/WMV) files without any platform
//! media framework.
//!
//! # Modules
//!
//! - `header` - Header Object, File/Stream Properties, Data Object bounds
//! - `format` - WAVEFORMATEX / BITMAPINFOHEADER media type descriptors
//! - `packet` - Data packet and payload parsing
//! - `demux` - Chunked, direction-aware demultiplexer with object reassembly
//! - `index` - Simple Index and Index Object lookup
//! - `source` - Random-access byte sources (file, memory)
//! - `fixture` - Synthetic ASF writer for tests (feature `fixtures`)
//!
//! # Example
//!
//! ```
//! use asfclip_media::{AsfDemuxer, AsfHeader, Demuxer, DATA_OBJECT_HEADER_SIZE};
//! use bytes::Bytes;
//!
//! /// Stream number of the first sample in an in-memory ASF file.
//! fn first_stream(file: &[u8]) -> asfclip_common::Result<u16> {
//!     let header = AsfHeader::parse(file)?;
//!     let mut demux = AsfDemuxer::from_header(&header)?;
//!     let data_start = header.size as usize + DATA_OBJECT_HEADER_SIZE;
//!     demux.parse(Bytes::copy_from_slice(&file[data_start..]))?;
//!     Ok(demux.next_sample().stream_number)
//! }
//! ```

pub mod demux;
pub mod format;
pub mod guid;
pub mod header;
pub mod index;
pub mod packet;
mod reader;
pub mod sample;
pub mod source;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use demux::{AsfDemuxer, Demuxer, NextSample};
pub use format::{AudioFormat, MediaFormat, Subtype, VideoFormat};
pub use guid::Guids;
pub use header::{
    AsfHeader, ContentDescription, DataObject, DataRegion, FileProperties, StreamDescriptor,
    StreamProperties, DATA_OBJECT_HEADER_SIZE, HEADER_PREFIX_SIZE,
};
pub use index::{AsfIndex, IndexPosition, SeekIndex};
pub use sample::MediaSample;
pub use source::{ByteSource, FileSource, MemorySource};
