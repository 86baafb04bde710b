//! Synthetic ASF file writer for tests.
//!
//! Produces small but structurally complete files: a Header Object with File
//! Properties, Stream Properties and Content Description, a Data Object of
//! fixed-size multiple-payload packets (media objects are fragmented across
//! packets as needed), and optional Index / Simple Index objects.

use crate::format::{AudioFormat, MediaFormat, VideoFormat};
use crate::guid::{Guids, OBJECT_HEADER_SIZE};
use crate::header::{DATA_OBJECT_HEADER_SIZE, HEADER_PREFIX_SIZE};
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// File ID written into every fixture.
pub const FIXTURE_FILE_ID: Uuid = Uuid::from_u128(0x0A5F_C11B_0000_4000_8000_0000_0000_0001);

/// 2024-01-01T00:00:00Z as FILETIME.
const CREATION_FILETIME: u64 = 133_485_408_000_000_000;

/// EC header (3) + flags (2) + padding (2) + send time (4) + duration (2) +
/// payload flags (1).
const PACKET_HEADER_SIZE: usize = 14;
/// Stream (1) + object (1) + offset (4) + replicated length (1) + replicated
/// data (8) + payload length (2).
const PAYLOAD_HEADER_SIZE: usize = 17;
const MAX_PAYLOADS: usize = 63;

/// A stream declared in the fixture header.
#[derive(Debug, Clone)]
pub struct StreamSpec {
    pub number: u16,
    pub format: MediaFormat,
}

impl StreamSpec {
    pub fn new(number: u16, format: MediaFormat) -> Self {
        Self { number, format }
    }

    /// Windows Media Audio 2, stereo 44.1 kHz.
    pub fn wma(number: u16) -> Self {
        Self::new(
            number,
            MediaFormat::Audio(AudioFormat {
                format_tag: 0x0161,
                channels: 2,
                samples_per_sec: 44_100,
                avg_bytes_per_sec: 16_000,
                block_align: 743,
                bits_per_sample: 16,
                codec_data: Bytes::from_static(&[
                    0x00, 0x88, 0x00, 0x00, 0x0F, 0x00, 0x00, 0x00, 0x00, 0x00,
                ]),
            }),
        )
    }

    /// Uncompressed 16-bit stereo PCM.
    pub fn pcm(number: u16) -> Self {
        Self::new(number, MediaFormat::Audio(AudioFormat::pcm(2, 44_100, 16)))
    }

    /// Windows Media Video 9 at the given size.
    pub fn wmv(number: u16, width: u32, height: u32) -> Self {
        Self::new(
            number,
            MediaFormat::Video(VideoFormat {
                width,
                height: height as i32,
                bit_count: 24,
                compression: u32::from_le_bytes(*b"WMV3"),
                image_size: 0,
                stride: 0,
                codec_data: Bytes::from_static(&[0x4F, 0xD1, 0x1A, 0x01]),
            }),
        )
    }

    /// Non audio/video stream.
    pub fn command(number: u16) -> Self {
        Self::new(
            number,
            MediaFormat::Other {
                stream_type: Guids::COMMAND_MEDIA,
            },
        )
    }
}

#[derive(Debug, Clone)]
struct FixtureSample {
    stream: u16,
    time_ms: u32,
    key_frame: bool,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Fragment {
    stream: u16,
    key_frame: bool,
    object_number: u8,
    offset: u32,
    object_size: u32,
    time_ms: u32,
    data: Vec<u8>,
}

/// Builder for synthetic ASF files.
#[derive(Debug, Clone)]
pub struct AsfBuilder {
    packet_size: u32,
    preroll_ms: u64,
    play_duration_ms: Option<u64>,
    title: String,
    author: String,
    streams: Vec<StreamSpec>,
    samples: Vec<FixtureSample>,
    simple_index_ms: Option<u32>,
    index_object_ms: Option<u32>,
    zero_data_size: bool,
}

impl Default for AsfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AsfBuilder {
    pub fn new() -> Self {
        Self {
            packet_size: 512,
            preroll_ms: 0,
            play_duration_ms: None,
            title: String::new(),
            author: String::new(),
            streams: Vec::new(),
            samples: Vec::new(),
            simple_index_ms: None,
            index_object_ms: None,
            zero_data_size: false,
        }
    }

    /// Fixed data packet size (at least 32 bytes).
    pub fn packet_size(mut self, size: u32) -> Self {
        assert!(size as usize > PACKET_HEADER_SIZE + PAYLOAD_HEADER_SIZE);
        self.packet_size = size;
        self
    }

    pub fn preroll_ms(mut self, ms: u64) -> Self {
        self.preroll_ms = ms;
        self
    }

    /// Play duration including preroll. Defaults to the last sample time + 100 ms.
    pub fn play_duration_ms(mut self, ms: u64) -> Self {
        self.play_duration_ms = Some(ms);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    pub fn stream(mut self, spec: StreamSpec) -> Self {
        self.streams.push(spec);
        self
    }

    /// Append a media object. `time_ms` is the raw payload timestamp, preroll
    /// included. Objects are written in the order they are added.
    pub fn sample(
        mut self,
        stream: u16,
        time_ms: u32,
        key_frame: bool,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.samples.push(FixtureSample {
            stream,
            time_ms,
            key_frame,
            data: data.into(),
        });
        self
    }

    /// Write a Simple Index Object for each video stream.
    pub fn simple_index(mut self, interval_ms: u32) -> Self {
        self.simple_index_ms = Some(interval_ms);
        self
    }

    /// Write an Index Object covering every video stream.
    pub fn index_object(mut self, interval_ms: u32) -> Self {
        self.index_object_ms = Some(interval_ms);
        self
    }

    /// Declare a Data Object size of 0, as live captures do.
    pub fn zero_data_size(mut self) -> Self {
        self.zero_data_size = true;
        self
    }

    fn play_duration(&self) -> u64 {
        self.play_duration_ms.unwrap_or_else(|| {
            self.samples
                .iter()
                .map(|s| s.time_ms as u64 + 100)
                .max()
                .unwrap_or(self.preroll_ms)
        })
    }

    /// Serialize the file.
    pub fn build(&self) -> Vec<u8> {
        let (packets, start_packets) = self.packetize();
        let packet_count = packets.len() as u64;

        let mut children = Vec::new();
        for spec in &self.streams {
            children.push(object(Guids::STREAM_PROPERTIES, &stream_properties(spec)));
        }
        if !self.title.is_empty() || !self.author.is_empty() {
            children.push(object(Guids::CONTENT_DESCRIPTION, &self.content_description()));
        }

        let mut trailer = Vec::new();
        if let Some(interval) = self.index_object_ms {
            trailer.extend(object(Guids::INDEX, &self.index_object_body(interval, &start_packets)));
        }
        if let Some(interval) = self.simple_index_ms {
            for stream in self.video_streams() {
                trailer.extend(object(
                    Guids::SIMPLE_INDEX,
                    &self.simple_index_body(stream, interval, &start_packets),
                ));
            }
        }

        let data_size = DATA_OBJECT_HEADER_SIZE as u64 + packet_count * self.packet_size as u64;
        let file_properties_size = OBJECT_HEADER_SIZE + 80;
        let header_size = HEADER_PREFIX_SIZE
            + file_properties_size
            + children.iter().map(Vec::len).sum::<usize>();
        let file_size = header_size as u64 + data_size + trailer.len() as u64;
        children.insert(
            0,
            object(Guids::FILE_PROPERTIES, &self.file_properties(file_size, packet_count)),
        );

        let mut out = BytesMut::with_capacity(file_size as usize);
        out.put_slice(&Guids::HEADER.to_bytes_le());
        out.put_u64_le(header_size as u64);
        out.put_u32_le(children.len() as u32);
        out.put_slice(&[0x01, 0x02]);
        for child in &children {
            out.put_slice(child);
        }

        out.put_slice(&Guids::DATA.to_bytes_le());
        out.put_u64_le(if self.zero_data_size { 0 } else { data_size });
        out.put_slice(&FIXTURE_FILE_ID.to_bytes_le());
        out.put_u64_le(packet_count);
        out.put_slice(&[0x01, 0x01]);
        for packet in &packets {
            out.put_slice(packet);
        }

        out.put_slice(&trailer);
        out.to_vec()
    }

    /// Serialize the file to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }

    fn file_properties(&self, file_size: u64, packet_count: u64) -> Vec<u8> {
        let play = self.play_duration();
        let mut body = BytesMut::with_capacity(80);
        body.put_slice(&FIXTURE_FILE_ID.to_bytes_le());
        body.put_u64_le(file_size);
        body.put_u64_le(CREATION_FILETIME);
        body.put_u64_le(packet_count);
        body.put_u64_le(play * 10_000);
        body.put_u64_le(play * 10_000);
        body.put_u64_le(self.preroll_ms);
        body.put_u32_le(if self.zero_data_size { 0x01 } else { 0x02 });
        body.put_u32_le(self.packet_size);
        body.put_u32_le(self.packet_size);
        body.put_u32_le(128_000);
        body.to_vec()
    }

    fn content_description(&self) -> Vec<u8> {
        let strings = [self.title.as_str(), self.author.as_str(), "", "", ""].map(utf16_nul);
        let mut body = BytesMut::new();
        for s in &strings {
            body.put_u16_le(s.len() as u16);
        }
        for s in &strings {
            body.put_slice(s);
        }
        body.to_vec()
    }

    fn video_streams(&self) -> Vec<u16> {
        self.streams
            .iter()
            .filter(|s| s.format.major_type().is_video())
            .map(|s| s.number)
            .collect()
    }

    /// Split samples into packets. Returns the serialized packets and, for
    /// each sample, the packet holding its first fragment.
    fn packetize(&self) -> (Vec<Vec<u8>>, Vec<usize>) {
        let capacity = self.packet_size as usize - PACKET_HEADER_SIZE;
        let mut packets = Vec::new();
        let mut current: Vec<Fragment> = Vec::new();
        let mut used = 0usize;
        let mut starts = Vec::with_capacity(self.samples.len());
        let mut object_numbers: HashMap<u16, u8> = HashMap::new();

        for sample in &self.samples {
            let number = object_numbers.entry(sample.stream).or_insert(0);
            let object_number = *number;
            *number = number.wrapping_add(1);

            let mut offset = 0usize;
            loop {
                if current.len() == MAX_PAYLOADS || used + PAYLOAD_HEADER_SIZE >= capacity {
                    packets.push(self.write_packet(&current));
                    current.clear();
                    used = 0;
                }
                if offset == 0 {
                    starts.push(packets.len());
                }
                let take = (capacity - used - PAYLOAD_HEADER_SIZE).min(sample.data.len() - offset);
                current.push(Fragment {
                    stream: sample.stream,
                    key_frame: sample.key_frame,
                    object_number,
                    offset: offset as u32,
                    object_size: sample.data.len() as u32,
                    time_ms: sample.time_ms,
                    data: sample.data[offset..offset + take].to_vec(),
                });
                used += PAYLOAD_HEADER_SIZE + take;
                offset += take;
                if offset == sample.data.len() {
                    break;
                }
            }
        }
        if !current.is_empty() {
            packets.push(self.write_packet(&current));
        }
        (packets, starts)
    }

    fn write_packet(&self, fragments: &[Fragment]) -> Vec<u8> {
        let payload_bytes: usize = fragments
            .iter()
            .map(|f| PAYLOAD_HEADER_SIZE + f.data.len())
            .sum();
        let padding = self.packet_size as usize - PACKET_HEADER_SIZE - payload_bytes;

        let mut buf = BytesMut::with_capacity(self.packet_size as usize);
        buf.put_slice(&[0x82, 0x00, 0x00]);
        buf.put_u8(0x11);
        buf.put_u8(0x5D);
        buf.put_u16_le(padding as u16);
        buf.put_u32_le(fragments.first().map_or(0, |f| f.time_ms));
        buf.put_u16_le(0);
        buf.put_u8(0x80 | fragments.len() as u8);
        for f in fragments {
            buf.put_u8(f.stream as u8 | if f.key_frame { 0x80 } else { 0 });
            buf.put_u8(f.object_number);
            buf.put_u32_le(f.offset);
            buf.put_u8(8);
            buf.put_u32_le(f.object_size);
            buf.put_u32_le(f.time_ms);
            buf.put_u16_le(f.data.len() as u16);
            buf.put_slice(&f.data);
        }
        buf.put_bytes(0, padding);
        buf.to_vec()
    }

    /// For each index interval, the packet of the last key frame at or before
    /// that presentation time (preroll removed).
    fn key_frame_packets(&self, stream: u16, interval_ms: u32, starts: &[usize]) -> Vec<u32> {
        let presentation = self.play_duration().saturating_sub(self.preroll_ms);
        let count = presentation / interval_ms as u64 + 1;
        let key_frames: Vec<(u64, usize)> = self
            .samples
            .iter()
            .zip(starts)
            .filter(|(s, _)| s.stream == stream && s.key_frame)
            .map(|(s, &packet)| ((s.time_ms as u64).saturating_sub(self.preroll_ms), packet))
            .collect();

        (0..count)
            .map(|i| {
                let t = i * interval_ms as u64;
                key_frames
                    .iter()
                    .rev()
                    .find(|(time, _)| *time <= t)
                    .or(key_frames.first())
                    .map_or(0, |(_, packet)| *packet as u32)
            })
            .collect()
    }

    fn simple_index_body(&self, stream: u16, interval_ms: u32, starts: &[usize]) -> Vec<u8> {
        let entries = self.key_frame_packets(stream, interval_ms, starts);
        let mut body = BytesMut::new();
        body.put_slice(&FIXTURE_FILE_ID.to_bytes_le());
        body.put_u64_le(interval_ms as u64 * 10_000);
        body.put_u32_le(1);
        body.put_u32_le(entries.len() as u32);
        for packet in entries {
            body.put_u32_le(packet);
            body.put_u16_le(1);
        }
        body.to_vec()
    }

    fn index_object_body(&self, interval_ms: u32, starts: &[usize]) -> Vec<u8> {
        let streams = self.video_streams();
        let tables: Vec<Vec<u32>> = streams
            .iter()
            .map(|&s| self.key_frame_packets(s, interval_ms, starts))
            .collect();
        let entry_count = tables.first().map_or(0, Vec::len);

        let mut body = BytesMut::new();
        body.put_u32_le(interval_ms);
        body.put_u16_le(streams.len() as u16);
        body.put_u32_le(1);
        for &stream in &streams {
            body.put_u16_le(stream);
            body.put_u16_le(1); // nearest past data packet
        }
        body.put_u32_le(entry_count as u32);
        for _ in &streams {
            body.put_u64_le(0);
        }
        for entry in 0..entry_count {
            for table in &tables {
                body.put_u32_le(table[entry] * self.packet_size);
            }
        }
        body.to_vec()
    }
}

fn object(guid: Uuid, body: &[u8]) -> Vec<u8> {
    let mut out = BytesMut::with_capacity(OBJECT_HEADER_SIZE + body.len());
    out.put_slice(&guid.to_bytes_le());
    out.put_u64_le((OBJECT_HEADER_SIZE + body.len()) as u64);
    out.put_slice(body);
    out.to_vec()
}

fn stream_properties(spec: &StreamSpec) -> Vec<u8> {
    let (stream_type, type_specific) = match &spec.format {
        MediaFormat::Audio(a) => (Guids::AUDIO_MEDIA, a.to_bytes()),
        MediaFormat::Video(v) => (Guids::VIDEO_MEDIA, v.to_bytes()),
        MediaFormat::Other { stream_type } => (*stream_type, Vec::new()),
    };
    let mut body = BytesMut::new();
    body.put_slice(&stream_type.to_bytes_le());
    body.put_slice(&Guids::NO_ERROR_CORRECTION.to_bytes_le());
    body.put_u64_le(0);
    body.put_u32_le(type_specific.len() as u32);
    body.put_u32_le(0);
    body.put_u16_le(spec.number & 0x7F);
    body.put_u32_le(0);
    body.put_slice(&type_specific);
    body.to_vec()
}

fn utf16_nul(s: &str) -> Vec<u8> {
    if s.is_empty() {
        return Vec::new();
    }
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}
