//! ASF object identifiers and the common 24-byte object header.

use crate::reader::ByteReader;
use asfclip_common::Result;
use uuid::Uuid;

/// Size of the GUID + size prefix shared by every ASF object.
pub const OBJECT_HEADER_SIZE: usize = 24;

/// Well-known ASF object and stream-type GUIDs.
pub struct Guids;

impl Guids {
    pub const HEADER: Uuid = Uuid::from_u128(0x75B22630_668E_11CF_A6D9_00AA0062CE6C);
    pub const DATA: Uuid = Uuid::from_u128(0x75B22636_668E_11CF_A6D9_00AA0062CE6C);
    pub const SIMPLE_INDEX: Uuid = Uuid::from_u128(0x33000890_E5B1_11CF_89F4_00A0C90349CB);
    pub const INDEX: Uuid = Uuid::from_u128(0xD6E229D3_35DA_11D1_9034_00A0C90349BE);

    pub const FILE_PROPERTIES: Uuid = Uuid::from_u128(0x8CABDCA1_A947_11CF_8EE4_00C00C205365);
    pub const STREAM_PROPERTIES: Uuid = Uuid::from_u128(0xB7DC0791_A9B7_11CF_8EE6_00C00C205365);
    pub const CONTENT_DESCRIPTION: Uuid = Uuid::from_u128(0x75B22633_668E_11CF_A6D9_00AA0062CE6C);
    pub const HEADER_EXTENSION: Uuid = Uuid::from_u128(0x5FBF03B5_A92E_11CF_8EE3_00C00C205365);

    pub const AUDIO_MEDIA: Uuid = Uuid::from_u128(0xF8699E40_5B4D_11CF_A8FD_00805F5C442B);
    pub const VIDEO_MEDIA: Uuid = Uuid::from_u128(0xBC19EFC0_5B4D_11CF_A8FD_00805F5C442B);
    pub const COMMAND_MEDIA: Uuid = Uuid::from_u128(0x59DACFC0_59E6_11D0_A3AC_00A0C90348F6);

    pub const NO_ERROR_CORRECTION: Uuid = Uuid::from_u128(0x20FB5700_5B55_11CF_A8FD_00805F5C442B);
    pub const AUDIO_SPREAD: Uuid = Uuid::from_u128(0xBFC3CD50_618F_11CF_8BB2_00AA00B4E220);

    /// Short name for log output.
    pub fn name(guid: &Uuid) -> &'static str {
        const NAMES: [(Uuid, &str); 8] = [
            (Guids::HEADER, "header"),
            (Guids::DATA, "data"),
            (Guids::SIMPLE_INDEX, "simple-index"),
            (Guids::INDEX, "index"),
            (Guids::FILE_PROPERTIES, "file-properties"),
            (Guids::STREAM_PROPERTIES, "stream-properties"),
            (Guids::CONTENT_DESCRIPTION, "content-description"),
            (Guids::HEADER_EXTENSION, "header-extension"),
        ];
        NAMES
            .iter()
            .find(|(known, _)| known == guid)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }
}

/// Parsed GUID + size prefix of an ASF object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Object type.
    pub guid: Uuid,
    /// Object size including the 24-byte prefix.
    pub size: u64,
}

impl ObjectHeader {
    /// Read an object header from the front of `data`.
    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let guid = reader.guid()?;
        let size = reader.u64()?;
        Ok(Self { guid, size })
    }

    /// Payload size after the prefix.
    pub fn body_size(&self) -> u64 {
        self.size.saturating_sub(OBJECT_HEADER_SIZE as u64)
    }
}
