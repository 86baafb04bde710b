//! Data packet demultiplexer.
//!
//! The demultiplexer accepts raw chunks of the data region, frames them into
//! fixed-size packets, reassembles fragmented media objects and queues
//! complete samples for the selected streams.
//!
//! In reverse mode chunks are expected in descending file order: each new
//! chunk is the range immediately preceding the previous one. Packets are then
//! consumed from the tail of the buffer and the samples of each packet are
//! queued last-first, so callers see samples in descending time order.

use crate::header::AsfHeader;
use crate::packet::{DataPacket, Payload};
use crate::sample::MediaSample;
use asfclip_common::{Direction, Error, MediaTime, Result};
use bytes::{Bytes, BytesMut};
use std::collections::{HashMap, VecDeque};

/// Result of [`Demuxer::next_sample`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextSample {
    /// More samples are ready without further input.
    pub more_available: bool,
    /// Stream of the returned sample, 0 when there is none.
    pub stream_number: u16,
    pub sample: Option<MediaSample>,
}

/// Incremental container demultiplexer.
pub trait Demuxer: Send {
    /// Restrict output to the given streams. An empty list selects all.
    fn select_streams(&mut self, streams: &[u16]);

    fn set_direction(&mut self, direction: Direction);

    fn direction(&self) -> Direction;

    /// Drop buffered bytes, partial objects and queued samples.
    fn flush(&mut self);

    /// Feed the next chunk of the data region.
    fn parse(&mut self, chunk: Bytes) -> Result<()>;

    /// Pop the next ready sample, if any.
    fn next_sample(&mut self) -> NextSample;
}

/// Media object being reassembled from fragments.
#[derive(Debug)]
struct PartialObject {
    object_size: u32,
    received: u32,
    presentation_time: Option<u32>,
    key_frame: bool,
    fragments: Vec<(u32, Bytes)>,
}

impl PartialObject {
    fn from_payload(payload: &Payload) -> Self {
        Self {
            object_size: payload.object_size,
            received: 0,
            presentation_time: payload.presentation_time,
            key_frame: payload.key_frame,
            fragments: Vec::new(),
        }
    }

    fn belongs(&self, payload: &Payload) -> bool {
        self.object_size == payload.object_size
            && self.presentation_time == payload.presentation_time
    }

    fn add(&mut self, payload: Payload) {
        if self.fragments.iter().any(|(offset, _)| *offset == payload.offset) {
            return;
        }
        self.received += payload.data.len() as u32;
        self.key_frame |= payload.key_frame;
        self.fragments.push((payload.offset, payload.data));
    }

    fn is_complete(&self) -> bool {
        self.received >= self.object_size
    }

    fn into_sample(mut self, stream_number: u16) -> MediaSample {
        self.fragments.sort_by_key(|(offset, _)| *offset);
        MediaSample {
            stream_number,
            presentation_time: self
                .presentation_time
                .map(|ms| MediaTime::from_millis(ms as i64)),
            duration: None,
            buffers: self.fragments.into_iter().map(|(_, data)| data).collect(),
            key_frame: self.key_frame,
            discontinuity: false,
        }
    }
}

/// ASF data packet demultiplexer.
#[derive(Debug)]
pub struct AsfDemuxer {
    packet_size: usize,
    direction: Direction,
    selected: Vec<u16>,
    pending: BytesMut,
    partial: HashMap<(u16, u32), PartialObject>,
    ready: VecDeque<MediaSample>,
    dropped_packets: u64,
}

impl AsfDemuxer {
    /// Create a demultiplexer for fixed-size packets.
    pub fn new(packet_size: u32) -> Result<Self> {
        if packet_size == 0 {
            return Err(Error::invalid_argument("packet size must be non-zero"));
        }
        Ok(Self {
            packet_size: packet_size as usize,
            direction: Direction::Forward,
            selected: Vec::new(),
            pending: BytesMut::new(),
            partial: HashMap::new(),
            ready: VecDeque::new(),
            dropped_packets: 0,
        })
    }

    /// Create a demultiplexer using the packet size declared in the header.
    pub fn from_header(header: &AsfHeader) -> Result<Self> {
        let props = &header.file_properties;
        let packet_size = props.packet_size().ok_or_else(|| {
            Error::format(format!(
                "variable packet size ({}..{}) is not supported",
                props.min_packet_size, props.max_packet_size
            ))
        })?;
        Self::new(packet_size)
    }

    pub fn packet_size(&self) -> u32 {
        self.packet_size as u32
    }

    /// Number of malformed packets skipped since creation.
    pub fn dropped_packets(&self) -> u64 {
        self.dropped_packets
    }

    fn is_selected(&self, stream_number: u16) -> bool {
        self.selected.is_empty() || self.selected.contains(&stream_number)
    }

    fn demux_packet(&mut self, packet: Bytes) {
        let parsed = match DataPacket::parse(&packet) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.dropped_packets += 1;
                tracing::warn!(error = %e, "Dropping malformed data packet");
                return;
            }
        };

        let mut completed = Vec::new();
        for payload in parsed.payloads {
            if !self.is_selected(payload.stream_number) {
                continue;
            }
            if payload.is_complete() {
                let stream = payload.stream_number;
                let mut object = PartialObject::from_payload(&payload);
                object.add(payload);
                completed.push(object.into_sample(stream));
                continue;
            }

            let key = (payload.stream_number, payload.object_number);
            let object = self
                .partial
                .entry(key)
                .or_insert_with(|| PartialObject::from_payload(&payload));
            if !object.belongs(&payload) {
                tracing::trace!(
                    stream = key.0,
                    object = key.1,
                    "Discarding stale partial object"
                );
                *object = PartialObject::from_payload(&payload);
            }
            object.add(payload);
            if object.is_complete() {
                if let Some(object) = self.partial.remove(&key) {
                    completed.push(object.into_sample(key.0));
                }
            }
        }

        tracing::trace!(
            send_time = parsed.send_time,
            samples = completed.len(),
            "Demuxed packet"
        );

        match self.direction {
            Direction::Forward => self.ready.extend(completed),
            Direction::Reverse => self.ready.extend(completed.into_iter().rev()),
        }
    }
}

impl Demuxer for AsfDemuxer {
    fn select_streams(&mut self, streams: &[u16]) {
        self.selected = streams.to_vec();
    }

    fn set_direction(&mut self, direction: Direction) {
        if direction != self.direction {
            self.flush();
        }
        self.direction = direction;
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn flush(&mut self) {
        self.pending.clear();
        self.partial.clear();
        self.ready.clear();
    }

    fn parse(&mut self, chunk: Bytes) -> Result<()> {
        match self.direction {
            Direction::Forward => {
                self.pending.extend_from_slice(&chunk);
                while self.pending.len() >= self.packet_size {
                    let packet = self.pending.split_to(self.packet_size).freeze();
                    self.demux_packet(packet);
                }
            }
            Direction::Reverse => {
                let mut joined = BytesMut::with_capacity(chunk.len() + self.pending.len());
                joined.extend_from_slice(&chunk);
                joined.extend_from_slice(&self.pending);
                self.pending = joined;
                while self.pending.len() >= self.packet_size {
                    let at = self.pending.len() - self.packet_size;
                    let packet = self.pending.split_off(at).freeze();
                    self.demux_packet(packet);
                }
            }
        }
        Ok(())
    }

    fn next_sample(&mut self) -> NextSample {
        match self.ready.pop_front() {
            Some(sample) => NextSample {
                more_available: !self.ready.is_empty(),
                stream_number: sample.stream_number,
                sample: Some(sample),
            },
            None => NextSample::default(),
        }
    }
}
