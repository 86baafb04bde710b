//! Container session.
//!
//! A [`ContainerSession`] owns everything tied to one opened file: the byte
//! source, parsed header metadata, data region bounds, the demultiplexer and
//! optional index bound to the source, and at most one selected stream with
//! its decoder. Seek resolution and extraction are implemented on the session
//! in [`crate::seek`] and [`crate::pipeline`].

use crate::decoder::{CodecRegistry, DecoderSession};
use crate::pipeline::ExtractOptions;
use crate::presentation::PresentationSink;
use crate::stream::{SelectedStream, StreamKind};
use asfclip_common::{Error, Result};
use asfclip_media::{
    AsfDemuxer, AsfHeader, AsfIndex, ByteSource, ContentDescription, DataObject, DataRegion,
    Demuxer, FileProperties, FileSource, SeekIndex, StreamDescriptor, DATA_OBJECT_HEADER_SIZE,
    HEADER_PREFIX_SIZE,
};
use std::path::Path;
use tracing::{debug, info};

/// Largest header object accepted (64 MB) to prevent OOM on malformed files.
const MAX_HEADER_SIZE: u64 = 64 * 1024 * 1024;

/// One opened container file and its selected stream.
pub struct ContainerSession<P: PresentationSink> {
    pub(crate) registry: CodecRegistry,
    pub(crate) presentation: P,
    pub(crate) options: ExtractOptions,
    pub(crate) source: Option<Box<dyn ByteSource>>,
    pub(crate) header: Option<AsfHeader>,
    pub(crate) data: DataRegion,
    pub(crate) demuxer: Option<Box<dyn Demuxer>>,
    pub(crate) index: Option<Box<dyn SeekIndex>>,
    pub(crate) selected: Option<SelectedStream>,
    pub(crate) decoder: Option<DecoderSession>,
}

impl<P: PresentationSink> ContainerSession<P> {
    /// Create an unopened session. The registry decides which streams can be
    /// decoded; `presentation` receives decoded clips and frames.
    pub fn new(registry: CodecRegistry, presentation: P) -> Self {
        Self {
            registry,
            presentation,
            options: ExtractOptions::default(),
            source: None,
            header: None,
            data: DataRegion::default(),
            demuxer: None,
            index: None,
            selected: None,
            decoder: None,
        }
    }

    /// Override chunk size and clip length used by extraction.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ExtractOptions) {
        self.options = options;
    }

    /// Open a container file, replacing any previously opened one.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.reset();
        let source = FileSource::open(path)?;
        self.open_source(Box::new(source))
    }

    /// Open a container from any byte source, replacing any previously
    /// opened one.
    pub fn open_source(&mut self, mut source: Box<dyn ByteSource>) -> Result<()> {
        self.reset();
        let len = source.len();

        let prefix = source.read(0, HEADER_PREFIX_SIZE)?;
        let header_size = AsfHeader::header_size(&prefix)?;
        if header_size > MAX_HEADER_SIZE {
            return Err(Error::format(format!(
                "header object size {header_size} exceeds maximum {MAX_HEADER_SIZE}"
            )));
        }
        let need = header_size + DATA_OBJECT_HEADER_SIZE as u64;
        if need > len {
            return Err(Error::truncated("container header", need as usize, len as usize));
        }

        let bytes = source.read(0, need as usize)?;
        if (bytes.len() as u64) < need {
            return Err(Error::truncated("container header", need as usize, bytes.len()));
        }
        let split = header_size as usize;
        let header = AsfHeader::parse(&bytes[..split])?;
        let data_object = DataObject::parse(&bytes[split..])?;
        let data = DataRegion::locate(header_size, &data_object, &header.file_properties, len);
        let demuxer = AsfDemuxer::from_header(&header)?;

        let data_end = match header_size.checked_add(data_object.size) {
            Some(end) if data_object.size >= DATA_OBJECT_HEADER_SIZE as u64 && end <= len => end,
            _ => data.end(),
        };
        let index = AsfIndex::load(source.as_mut(), data_end, &header)?;

        info!(
            streams = header.streams.len(),
            packets = header.file_properties.packet_count,
            data_offset = data.offset,
            data_length = data.length,
            indexed = index.is_some(),
            "Opened container"
        );

        self.source = Some(source);
        self.header = Some(header);
        self.data = data;
        self.demuxer = Some(Box::new(demuxer));
        self.index = index.map(|i| Box::new(i) as Box<dyn SeekIndex>);
        Ok(())
    }

    /// Streams declared by the opened container, in header order.
    pub fn enumerate_streams(&self) -> Result<Vec<StreamDescriptor>> {
        let header = self.header.as_ref().ok_or(Error::NotInitialized)?;
        if header.streams.is_empty() {
            return Err(Error::NoStreams);
        }
        Ok(header.descriptors())
    }

    /// Select the stream to decode and bind a decoder to it.
    ///
    /// Any previously selected stream is released first, also when selection
    /// fails.
    pub fn select_stream(&mut self, stream_number: u16) -> Result<()> {
        if stream_number == 0 {
            return Err(Error::invalid_argument("stream number 0 is reserved"));
        }
        let header = self.header.as_ref().ok_or(Error::NotInitialized)?;
        let stream = header.stream(stream_number).ok_or_else(|| {
            Error::invalid_argument(format!("stream {stream_number} is not declared"))
        })?;
        let format = stream.format.clone();

        self.release_selection();

        let kind = StreamKind::from_major(format.major_type()).ok_or_else(|| {
            Error::invalid_request(format!(
                "stream {stream_number} is a {} stream",
                format.major_type()
            ))
        })?;
        if !format.is_compressed() {
            return Err(Error::invalid_request(format!(
                "stream {stream_number} is uncompressed ({})",
                format.subtype()
            )));
        }

        let (codec, transform) = self.registry.create(kind.major_type(), format.subtype())?;
        let mut decoder = DecoderSession::new(kind);
        decoder.initialize(transform, &format, &mut self.presentation)?;

        if let Some(demuxer) = self.demuxer.as_mut() {
            demuxer.flush();
            demuxer.select_streams(&[stream_number]);
        }

        info!(
            stream = stream_number,
            %kind,
            codec = %codec,
            subtype = %format.subtype(),
            "Selected stream"
        );
        self.decoder = Some(decoder);
        self.selected = Some(SelectedStream {
            stream_number,
            kind,
            format,
            codec,
        });
        Ok(())
    }

    fn release_selection(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            decoder.unload();
        }
        self.selected = None;
    }

    /// Release every owned collaborator. Safe to call at any time and
    /// repeatedly.
    pub fn reset(&mut self) {
        if self.source.is_some() || self.selected.is_some() {
            debug!("Resetting container session");
        }
        self.release_selection();
        self.demuxer = None;
        self.index = None;
        self.header = None;
        self.data = DataRegion::default();
        self.source = None;
        self.presentation.reset();
    }

    pub fn is_open(&self) -> bool {
        self.header.is_some()
    }

    pub fn file_properties(&self) -> Option<&FileProperties> {
        self.header.as_ref().map(|h| &h.file_properties)
    }

    pub fn header(&self) -> Option<&AsfHeader> {
        self.header.as_ref()
    }

    pub fn streams(&self) -> Vec<StreamDescriptor> {
        self.header
            .as_ref()
            .map(AsfHeader::descriptors)
            .unwrap_or_default()
    }

    pub fn content_description(&self) -> Option<&ContentDescription> {
        self.header.as_ref()?.content_description.as_ref()
    }

    /// Absolute byte range of the data packets.
    pub fn data_range(&self) -> DataRegion {
        self.data
    }

    pub fn selected(&self) -> Option<&SelectedStream> {
        self.selected.as_ref()
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Whether a stream carries index entries.
    pub fn is_indexed(&self, stream_number: u16) -> bool {
        self.index
            .as_ref()
            .is_some_and(|index| index.is_indexed(stream_number))
    }

    pub fn decoder(&self) -> Option<&DecoderSession> {
        self.decoder.as_ref()
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }
}

impl<P: PresentationSink> Drop for ContainerSession<P> {
    fn drop(&mut self) {
        self.release_selection();
    }
}

impl<P: PresentationSink> std::fmt::Debug for ContainerSession<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerSession")
            .field("open", &self.is_open())
            .field("data", &self.data)
            .field("selected", &self.selected)
            .field("decoder", &self.decoder)
            .field("indexed", &self.has_index())
            .finish()
    }
}
