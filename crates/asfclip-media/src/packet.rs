//! Data packet parsing.
//!
//! A data packet carries an optional error-correction header, the payload
//! parsing information and one or more payloads. Each payload is a fragment
//! of a media object (or, for compressed payloads, several whole objects).

use crate::reader::ByteReader;
use asfclip_common::{Error, Result};
use bytes::Bytes;

/// Error correction data is present.
const EC_PRESENT: u8 = 0x80;
/// Error correction length type; must be 0 (length in the low nibble).
const EC_LENGTH_TYPE_MASK: u8 = 0x60;

/// Multiple payloads present.
const MULTIPLE_PAYLOADS: u8 = 0x01;

/// Key frame bit of the stream number byte.
const KEY_FRAME: u8 = 0x80;

/// Replicated data length that marks a compressed payload.
const COMPRESSED_PAYLOAD: u32 = 1;

/// One payload (media object fragment) of a data packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub stream_number: u16,
    pub key_frame: bool,
    pub object_number: u32,
    /// Offset of this fragment within its media object.
    pub offset: u32,
    /// Total size of the media object; equals `data.len()` when unknown.
    pub object_size: u32,
    /// Presentation time in milliseconds, preroll included.
    pub presentation_time: Option<u32>,
    pub data: Bytes,
}

impl Payload {
    /// Whether this fragment is the whole media object.
    pub fn is_complete(&self) -> bool {
        self.offset == 0 && self.data.len() as u32 == self.object_size
    }
}

/// A parsed data packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    /// Send time in milliseconds.
    pub send_time: u32,
    /// Duration in milliseconds.
    pub duration: u16,
    pub payloads: Vec<Payload>,
}

/// Field widths from the property flags byte.
#[derive(Debug, Clone, Copy)]
struct PropertyFlags {
    replicated_len: u8,
    offset: u8,
    object_number: u8,
}

impl PropertyFlags {
    fn from_byte(b: u8) -> Self {
        Self {
            replicated_len: b & 0x03,
            offset: (b >> 2) & 0x03,
            object_number: (b >> 4) & 0x03,
        }
    }
}

impl DataPacket {
    /// Parse one data packet.
    ///
    /// `packet` is exactly one fixed-size packet; an explicit packet length in
    /// the packet header shortens it, padding is excluded from the payloads.
    pub fn parse(packet: &Bytes) -> Result<Self> {
        let mut r = ByteReader::new(packet, "data packet");

        let mut flags = r.u8()?;
        if flags & EC_PRESENT != 0 {
            if flags & EC_LENGTH_TYPE_MASK != 0 {
                return Err(Error::format("unsupported error correction length type"));
            }
            r.skip((flags & 0x0F) as usize)?;
            flags = r.u8()?;
        }

        let property = r.u8()?;
        let packet_length = r.var(flags >> 5)? as usize;
        let _sequence = r.var(flags >> 1)?;
        let padding = r.var(flags >> 3)? as usize;
        let send_time = r.u32()?;
        let duration = r.u16()?;

        let consumed = packet.len() - r.remaining();
        let total = match packet_length {
            0 => packet.len(),
            n => n.min(packet.len()),
        };
        let end = total
            .checked_sub(padding)
            .filter(|&end| end >= consumed)
            .ok_or_else(|| {
                Error::format(format!("padding {padding} exceeds packet length {total}"))
            })?;

        let body = packet.slice(consumed..end);
        let props = PropertyFlags::from_byte(property);
        let payloads = if flags & MULTIPLE_PAYLOADS != 0 {
            parse_multiple(&body, props)?
        } else {
            let mut payloads = Vec::new();
            let mut r = ByteReader::new(&body, "payload");
            parse_payload(&body, &mut r, props, None, &mut payloads)?;
            payloads
        };

        Ok(Self {
            send_time,
            duration,
            payloads,
        })
    }
}

fn parse_multiple(body: &Bytes, props: PropertyFlags) -> Result<Vec<Payload>> {
    let mut r = ByteReader::new(body, "multiple payloads");
    let payload_flags = r.u8()?;
    let count = payload_flags & 0x3F;
    let length_type = payload_flags >> 6;

    let mut payloads = Vec::with_capacity(count as usize);
    for _ in 0..count {
        parse_payload(body, &mut r, props, Some(length_type), &mut payloads)?;
    }
    Ok(payloads)
}

/// Parse one payload header and its data. Single-payload packets pass no
/// length type; their payload runs to the end of the body.
fn parse_payload(
    body: &Bytes,
    r: &mut ByteReader<'_>,
    props: PropertyFlags,
    length_type: Option<u8>,
    out: &mut Vec<Payload>,
) -> Result<()> {
    let stream = r.u8()?;
    let object_number = r.var(props.object_number)?;
    let offset = r.var(props.offset)?;
    let replicated_len = r.var(props.replicated_len)?;
    let stream_number = (stream & 0x7F) as u16;
    let key_frame = stream & KEY_FRAME != 0;

    if replicated_len == COMPRESSED_PAYLOAD {
        let delta = r.u8()? as u32;
        let data_len = match length_type {
            Some(t) => r.var(t)? as usize,
            None => r.remaining(),
        };
        let data = r.bytes(data_len)?;
        // The offset field holds the presentation time of the first object.
        let mut sub = ByteReader::new(data, "compressed payload");
        let mut index = 0u32;
        while sub.remaining() > 0 {
            let len = sub.u8()? as usize;
            let object = sub.bytes(len)?;
            out.push(Payload {
                stream_number,
                key_frame,
                object_number: object_number.wrapping_add(index),
                offset: 0,
                object_size: len as u32,
                presentation_time: Some(offset.wrapping_add(delta.wrapping_mul(index))),
                data: body.slice_ref(object),
            });
            index += 1;
        }
        return Ok(());
    }

    let replicated = r.bytes(replicated_len as usize)?;
    let data_len = match length_type {
        Some(t) => r.var(t)? as usize,
        None => r.remaining(),
    };
    let data = body.slice_ref(r.bytes(data_len)?);

    let (object_size, presentation_time) = if replicated.len() >= 8 {
        let mut rep = ByteReader::new(replicated, "replicated data");
        (rep.u32()?, Some(rep.u32()?))
    } else {
        let end = u32::try_from(data.len())
            .ok()
            .and_then(|len| offset.checked_add(len))
            .ok_or_else(|| {
                Error::format(format!("payload at offset {offset} overruns its object"))
            })?;
        (end, None)
    };

    out.push(Payload {
        stream_number,
        key_frame,
        object_number,
        offset,
        object_size,
        presentation_time,
        data,
    });
    Ok(())
}
