//! Header Object parsing.
//!
//! The Header Object is the first top-level object of every ASF file. It holds
//! the File Properties, one Stream Properties object per stream and optional
//! metadata. It is immediately followed by the Data Object.

use crate::format::{AudioFormat, MediaFormat, VideoFormat};
use crate::guid::{Guids, ObjectHeader, OBJECT_HEADER_SIZE};
use crate::reader::{utf16_string, ByteReader};
use asfclip_common::{Error, MajorType, MediaTime, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Size of the Header Object prefix (GUID, size, object count, reserved).
pub const HEADER_PREFIX_SIZE: usize = 30;

/// Size of the Data Object header that precedes the first packet.
pub const DATA_OBJECT_HEADER_SIZE: usize = 50;

/// FILETIME ticks between 1601-01-01 and the Unix epoch.
const FILETIME_UNIX_OFFSET: u64 = 116_444_736_000_000_000;

/// Broadcast flag of the File Properties object.
const FLAG_BROADCAST: u32 = 0x01;
/// Seekable flag of the File Properties object.
const FLAG_SEEKABLE: u32 = 0x02;

/// Global file attributes from the File Properties object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FileProperties {
    pub file_id: Uuid,
    /// Total file size in bytes; meaningless for broadcast files.
    pub file_size: u64,
    pub creation_time: Option<DateTime<Utc>>,
    /// Number of data packets in the Data Object.
    pub packet_count: u64,
    /// Time to play the file, including preroll.
    pub play_duration: MediaTime,
    pub send_duration: MediaTime,
    /// Amount of time to buffer before playback; payload timestamps include it.
    pub preroll: MediaTime,
    pub broadcast: bool,
    pub seekable: bool,
    pub min_packet_size: u32,
    pub max_packet_size: u32,
    /// Maximum instantaneous bit rate in bits per second.
    pub max_bitrate: u32,
}

impl FileProperties {
    fn parse(body: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(body, "file properties");
        let file_id = r.guid()?;
        let file_size = r.u64()?;
        let creation_time = filetime_to_utc(r.u64()?);
        let packet_count = r.u64()?;
        let play_duration = MediaTime::from_hns(r.u64()? as i64);
        let send_duration = MediaTime::from_hns(r.u64()? as i64);
        let preroll = MediaTime::from_millis(r.u64()? as i64);
        let flags = r.u32()?;
        let min_packet_size = r.u32()?;
        let max_packet_size = r.u32()?;
        let max_bitrate = r.u32()?;

        Ok(Self {
            file_id,
            file_size,
            creation_time,
            packet_count,
            play_duration,
            send_duration,
            preroll,
            broadcast: flags & FLAG_BROADCAST != 0,
            seekable: flags & FLAG_SEEKABLE != 0,
            min_packet_size,
            max_packet_size,
            max_bitrate,
        })
    }

    /// Play duration with the preroll removed.
    pub fn presentation_duration(&self) -> MediaTime {
        self.play_duration.saturating_sub(self.preroll)
    }

    /// Fixed data packet size, if the file declares one.
    pub fn packet_size(&self) -> Option<u32> {
        (self.min_packet_size == self.max_packet_size && self.max_packet_size > 0)
            .then_some(self.max_packet_size)
    }

    /// Average of the minimum and maximum packet sizes.
    pub fn avg_packet_size(&self) -> u64 {
        (self.max_packet_size as u64 + self.min_packet_size as u64) / 2
    }
}

fn filetime_to_utc(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let since_epoch = filetime.checked_sub(FILETIME_UNIX_OFFSET)?;
    let secs = (since_epoch / 10_000_000) as i64;
    let nanos = ((since_epoch % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Per-stream attributes from a Stream Properties object.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProperties {
    /// Stream number, 1..=127.
    pub stream_number: u16,
    pub encrypted: bool,
    pub time_offset: MediaTime,
    pub format: MediaFormat,
}

impl StreamProperties {
    fn parse(body: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(body, "stream properties");
        let stream_type = r.guid()?;
        let _error_correction_type = r.guid()?;
        let time_offset = MediaTime::from_hns(r.u64()? as i64);
        let type_specific_len = r.u32()? as usize;
        let error_correction_len = r.u32()? as usize;
        let flags = r.u16()?;
        let _reserved = r.u32()?;
        let type_specific = r.bytes(type_specific_len)?;
        r.skip(error_correction_len)?;

        let format = if stream_type == Guids::AUDIO_MEDIA {
            MediaFormat::Audio(AudioFormat::parse(type_specific)?)
        } else if stream_type == Guids::VIDEO_MEDIA {
            MediaFormat::Video(VideoFormat::parse(type_specific)?)
        } else {
            MediaFormat::Other { stream_type }
        };

        Ok(Self {
            stream_number: flags & 0x7F,
            encrypted: flags & 0x8000 != 0,
            time_offset,
            format,
        })
    }

    pub fn major_type(&self) -> MajorType {
        self.format.major_type()
    }

    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            stream_number: self.stream_number,
            major_type: self.major_type(),
        }
    }
}

/// Stream number and major type, as enumerated by a container session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct StreamDescriptor {
    pub stream_number: u16,
    pub major_type: MajorType,
}

/// Title and authorship strings from the Content Description object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ContentDescription {
    pub title: String,
    pub author: String,
    pub copyright: String,
    pub description: String,
    pub rating: String,
}

impl ContentDescription {
    fn parse(body: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(body, "content description");
        let mut lengths = [0usize; 5];
        for len in &mut lengths {
            *len = r.u16()? as usize;
        }
        let [title, author, copyright, description, rating] = lengths;
        Ok(Self {
            title: utf16_string(r.bytes(title)?),
            author: utf16_string(r.bytes(author)?),
            copyright: utf16_string(r.bytes(copyright)?),
            description: utf16_string(r.bytes(description)?),
            rating: utf16_string(r.bytes(rating)?),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.author.is_empty()
            && self.copyright.is_empty()
            && self.description.is_empty()
            && self.rating.is_empty()
    }
}

/// Parsed Header Object.
#[derive(Debug, Clone, PartialEq)]
pub struct AsfHeader {
    /// Declared size of the Header Object in bytes.
    pub size: u64,
    pub file_properties: FileProperties,
    pub streams: Vec<StreamProperties>,
    pub content_description: Option<ContentDescription>,
}

impl AsfHeader {
    /// Read the declared header size from the first 30 bytes of a file.
    pub fn header_size(prefix: &[u8]) -> Result<u64> {
        let mut r = ByteReader::new(prefix, "header object");
        let object = ObjectHeader::read(&mut r)?;
        if object.guid != Guids::HEADER {
            return Err(Error::format(format!(
                "expected header object, found {}",
                object.guid
            )));
        }
        if object.size < HEADER_PREFIX_SIZE as u64 {
            return Err(Error::format(format!(
                "header object size {} is smaller than {HEADER_PREFIX_SIZE}",
                object.size
            )));
        }
        Ok(object.size)
    }

    /// Parse a complete Header Object, starting at its GUID.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let size = Self::header_size(data)?;
        if (data.len() as u64) < size {
            return Err(Error::truncated("header object", size as usize, data.len()));
        }

        let mut r = ByteReader::new(&data[..size as usize], "header object");
        r.skip(OBJECT_HEADER_SIZE)?;
        let object_count = r.u32()?;
        r.skip(2)?;

        let mut file_properties = None;
        let mut streams = Vec::new();
        let mut content_description = None;

        while r.remaining() >= OBJECT_HEADER_SIZE {
            let child = ObjectHeader::read(&mut r)?;
            if child.size < OBJECT_HEADER_SIZE as u64 {
                return Err(Error::format(format!(
                    "{} object has invalid size {}",
                    Guids::name(&child.guid),
                    child.size
                )));
            }
            let body = r.bytes(child.body_size() as usize)?;
            tracing::trace!(object = Guids::name(&child.guid), size = child.size, "Header child");

            if child.guid == Guids::FILE_PROPERTIES {
                file_properties = Some(FileProperties::parse(body)?);
            } else if child.guid == Guids::STREAM_PROPERTIES {
                streams.push(StreamProperties::parse(body)?);
            } else if child.guid == Guids::CONTENT_DESCRIPTION {
                content_description = Some(ContentDescription::parse(body)?);
            }
        }

        let file_properties = file_properties
            .ok_or_else(|| Error::format("header has no file properties object"))?;

        tracing::debug!(
            objects = object_count,
            streams = streams.len(),
            packets = file_properties.packet_count,
            "Parsed ASF header"
        );

        Ok(Self {
            size,
            file_properties,
            streams,
            content_description,
        })
    }

    /// Stream properties for a stream number.
    pub fn stream(&self, stream_number: u16) -> Option<&StreamProperties> {
        self.streams.iter().find(|s| s.stream_number == stream_number)
    }

    pub fn descriptors(&self) -> Vec<StreamDescriptor> {
        self.streams.iter().map(StreamProperties::descriptor).collect()
    }
}

/// Header of the Data Object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataObject {
    /// Declared object size, including the 50-byte header.
    pub size: u64,
    pub file_id: Uuid,
    pub packet_count: u64,
}

impl DataObject {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data, "data object");
        let object = ObjectHeader::read(&mut r)?;
        if object.guid != Guids::DATA {
            return Err(Error::format(format!(
                "expected data object after header, found {}",
                Guids::name(&object.guid)
            )));
        }
        let file_id = r.guid()?;
        let packet_count = r.u64()?;
        r.skip(2)?;
        Ok(Self {
            size: object.size,
            file_id,
            packet_count,
        })
    }
}

/// Absolute byte range of the packet payload region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct DataRegion {
    /// Offset of the first data packet.
    pub offset: u64,
    pub length: u64,
}

impl DataRegion {
    /// Locate the packet region of a Data Object starting at `object_offset`.
    ///
    /// Falls back to `packet_count * packet_size` when the declared object
    /// size is unusable (zero for live captures, or past the end of the file).
    pub fn locate(
        object_offset: u64,
        data: &DataObject,
        props: &FileProperties,
        source_len: u64,
    ) -> Self {
        let offset = object_offset + DATA_OBJECT_HEADER_SIZE as u64;
        let available = source_len.saturating_sub(offset);
        let declared = data.size.checked_sub(DATA_OBJECT_HEADER_SIZE as u64);

        let length = match declared {
            Some(len) if data.size > 0 && len <= available => len,
            _ => {
                let estimate = props
                    .packet_count
                    .saturating_mul(props.max_packet_size as u64);
                tracing::warn!(
                    declared = data.size,
                    estimate,
                    "Data object size unusable, estimating from packet count"
                );
                estimate.min(available)
            }
        };

        Self { offset, length }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}
