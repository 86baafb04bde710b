//! Seek index lookup.
//!
//! ASF files may carry top-level index objects after the Data Object. Two
//! kinds are understood:
//!
//! - the Simple Index Object, one per video stream (in stream order), whose
//!   entries name the packet holding the key frame at or before each interval
//! - the Index Object, whose blocks hold per-stream byte offsets relative to
//!   the first data packet
//!
//! Both are flattened into per-stream tables of byte offsets at a fixed time
//! interval.

use crate::guid::{Guids, ObjectHeader, OBJECT_HEADER_SIZE};
use crate::header::AsfHeader;
use crate::reader::ByteReader;
use crate::source::ByteSource;
use asfclip_common::{Direction, Error, MediaTime, Result};

/// Maximum index object size accepted (64 MB) to prevent OOM on malformed files.
const MAX_INDEX_OBJECT_SIZE: u64 = 64 * 1024 * 1024;

/// Index Object offset marking an entry with no key frame.
const INVALID_OFFSET: u32 = u32::MAX;

/// Position returned by an index lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPosition {
    /// Byte offset relative to the start of the data region.
    pub offset: u64,
    /// Time of the index entry; may differ from the requested time.
    pub approx_time: MediaTime,
}

/// Time to byte-offset lookup for indexed streams.
pub trait SeekIndex: Send {
    fn is_indexed(&self, stream_number: u16) -> bool;

    /// Find the indexed position for `time`. Forward lookups favour the entry
    /// at or before `time`; reverse lookups favour the entry at or after it.
    fn seek_position(
        &self,
        stream_number: u16,
        time: MediaTime,
        direction: Direction,
    ) -> Result<IndexPosition>;
}

/// Entries for one stream at a fixed interval.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StreamIndex {
    stream_number: u16,
    interval: MediaTime,
    entries: Vec<Option<u64>>,
}

impl StreamIndex {
    fn lookup(&self, time: MediaTime, direction: Direction) -> Option<IndexPosition> {
        let last = self.entries.len().checked_sub(1)?;
        let interval = self.interval.as_hns();
        let time = time.as_hns().max(0);

        let target = if interval <= 0 {
            0
        } else {
            match direction {
                Direction::Forward => time / interval,
                Direction::Reverse => time.saturating_add(interval - 1) / interval,
            }
        };
        let target = (target as usize).min(last);

        let before = (0..=target).rev();
        let after = target..=last;
        let found = match direction {
            Direction::Forward => before.chain(after).find(|&i| self.entries[i].is_some()),
            Direction::Reverse => after.chain(before).find(|&i| self.entries[i].is_some()),
        }?;

        Some(IndexPosition {
            offset: self.entries[found]?,
            approx_time: MediaTime::from_hns(interval.max(0).saturating_mul(found as i64)),
        })
    }
}

/// Index tables loaded from an ASF file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsfIndex {
    streams: Vec<StreamIndex>,
}

impl AsfIndex {
    /// Scan the top-level objects from `start` (the end of the Data Object)
    /// to the end of the source.
    ///
    /// Returns `None` when the source ends at `start` or no usable index is
    /// found. Malformed index objects are skipped.
    pub fn load(
        source: &mut dyn ByteSource,
        start: u64,
        header: &AsfHeader,
    ) -> Result<Option<Self>> {
        let len = source.len();
        if start >= len {
            return Ok(None);
        }

        let packet_size = header.file_properties.max_packet_size as u64;
        let mut video_streams = header
            .streams
            .iter()
            .filter(|s| s.major_type().is_video())
            .map(|s| s.stream_number);
        let mut index = Self::default();
        let mut pos = start;

        while len - pos >= OBJECT_HEADER_SIZE as u64 {
            let prefix = source.read(pos, OBJECT_HEADER_SIZE)?;
            let object = ObjectHeader::read(&mut ByteReader::new(&prefix, "index object"))?;
            if object.size < OBJECT_HEADER_SIZE as u64 || object.size > len - pos {
                tracing::warn!(offset = pos, size = object.size, "Invalid object after data");
                break;
            }

            let is_simple = object.guid == Guids::SIMPLE_INDEX;
            if is_simple || object.guid == Guids::INDEX {
                if object.body_size() > MAX_INDEX_OBJECT_SIZE {
                    tracing::warn!(size = object.size, "Index object too large, skipping");
                } else {
                    let body = source.read(
                        pos + OBJECT_HEADER_SIZE as u64,
                        object.body_size() as usize,
                    )?;
                    let parsed = if is_simple {
                        match video_streams.next() {
                            Some(stream) => {
                                parse_simple_index(&body, stream, packet_size).map(|s| vec![s])
                            }
                            None => Ok(Vec::new()),
                        }
                    } else {
                        parse_index_object(&body)
                    };
                    match parsed {
                        Ok(tables) => index.add(tables),
                        Err(e) => tracing::warn!(
                            object = Guids::name(&object.guid),
                            error = %e,
                            "Skipping malformed index"
                        ),
                    }
                }
            }
            pos += object.size;
        }

        if index.streams.is_empty() {
            return Ok(None);
        }
        tracing::debug!(streams = ?index.indexed_streams(), "Loaded seek index");
        Ok(Some(index))
    }

    fn add(&mut self, tables: Vec<StreamIndex>) {
        for table in tables {
            if table.entries.is_empty() || self.table(table.stream_number).is_some() {
                continue;
            }
            self.streams.push(table);
        }
    }

    fn table(&self, stream_number: u16) -> Option<&StreamIndex> {
        self.streams.iter().find(|s| s.stream_number == stream_number)
    }

    /// Stream numbers with index entries.
    pub fn indexed_streams(&self) -> Vec<u16> {
        self.streams.iter().map(|s| s.stream_number).collect()
    }

    /// Number of entries for a stream.
    pub fn entry_count(&self, stream_number: u16) -> usize {
        self.table(stream_number).map_or(0, |s| s.entries.len())
    }
}

impl SeekIndex for AsfIndex {
    fn is_indexed(&self, stream_number: u16) -> bool {
        self.table(stream_number).is_some()
    }

    fn seek_position(
        &self,
        stream_number: u16,
        time: MediaTime,
        direction: Direction,
    ) -> Result<IndexPosition> {
        self.table(stream_number)
            .and_then(|table| table.lookup(time, direction))
            .ok_or(Error::NoIndex(stream_number))
    }
}

fn parse_simple_index(body: &[u8], stream_number: u16, packet_size: u64) -> Result<StreamIndex> {
    let mut r = ByteReader::new(body, "simple index");
    let _file_id = r.guid()?;
    let interval = MediaTime::from_hns(r.u64()? as i64);
    let _max_packet_count = r.u32()?;
    let count = r.u32()? as usize;
    if count.saturating_mul(6) > r.remaining() {
        return Err(Error::truncated("simple index entries", count * 6, r.remaining()));
    }

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let packet = r.u32()? as u64;
        let _packet_count = r.u16()?;
        entries.push(Some(packet * packet_size));
    }

    Ok(StreamIndex {
        stream_number,
        interval,
        entries,
    })
}

fn parse_index_object(body: &[u8]) -> Result<Vec<StreamIndex>> {
    let mut r = ByteReader::new(body, "index object");
    let interval = MediaTime::from_millis(r.u32()? as i64);
    let specifier_count = r.u16()? as usize;
    let block_count = r.u32()?;

    let mut tables = Vec::with_capacity(specifier_count);
    for _ in 0..specifier_count {
        let stream_number = r.u16()?;
        let _index_type = r.u16()?;
        tables.push(StreamIndex {
            stream_number,
            interval,
            entries: Vec::new(),
        });
    }

    for _ in 0..block_count {
        let entry_count = r.u32()? as usize;
        let mut positions = Vec::with_capacity(specifier_count);
        for _ in 0..specifier_count {
            positions.push(r.u64()?);
        }
        let need = entry_count.saturating_mul(specifier_count).saturating_mul(4);
        if need > r.remaining() {
            return Err(Error::truncated("index block", need, r.remaining()));
        }
        for _ in 0..entry_count {
            for (table, &position) in tables.iter_mut().zip(&positions) {
                let offset = r.u32()?;
                table
                    .entries
                    .push((offset != INVALID_OFFSET).then(|| position + offset as u64));
            }
        }
    }

    Ok(tables)
}
