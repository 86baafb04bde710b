//! Media type descriptors carried by stream properties and negotiated with
//! decode transforms.
//!
//! Audio formats mirror WAVEFORMATEX, video formats mirror the ASF video
//! info header followed by a BITMAPINFOHEADER.

use crate::reader::ByteReader;
use asfclip_common::{Error, MajorType, Result};
use bytes::Bytes;
use std::fmt;
use uuid::Uuid;

/// WAVE_FORMAT_PCM.
pub const WAVE_FORMAT_PCM: u16 = 0x0001;
/// WAVE_FORMAT_IEEE_FLOAT.
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
/// WAVE_FORMAT_EXTENSIBLE.
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// BI_RGB.
const BI_RGB: u32 = 0;
/// BI_BITFIELDS.
const BI_BITFIELDS: u32 = 3;

/// Size of WAVEFORMATEX without the trailing codec data.
const WAVEFORMATEX_SIZE: usize = 18;
/// Size of BITMAPINFOHEADER without trailing codec data.
const BITMAPINFOHEADER_SIZE: usize = 40;

/// Media subtype: identifies the codec within a major type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtype {
    /// Audio, identified by WAVEFORMATEX format tag.
    WaveFormat(u16),
    /// Compressed video, identified by FourCC.
    FourCc([u8; 4]),
    /// Uncompressed RGB video with the given bit count.
    Rgb(u16),
    /// Non audio/video stream type.
    Other(Uuid),
}

impl Subtype {
    /// 16-bit PCM target for audio decode.
    pub const PCM: Self = Self::WaveFormat(WAVE_FORMAT_PCM);
    /// 32-bit RGB target for video decode.
    pub const RGB32: Self = Self::Rgb(32);
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaveFormat(tag) => write!(f, "0x{tag:04X}"),
            Self::FourCc(cc) => write!(f, "{}", fourcc_str(cc)),
            Self::Rgb(bits) => write!(f, "RGB{bits}"),
            Self::Other(guid) => write!(f, "{guid}"),
        }
    }
}

fn fourcc_str(cc: &[u8; 4]) -> String {
    cc.iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
        .collect()
}

/// Audio stream format (WAVEFORMATEX).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Codec-specific data following the fixed fields.
    pub codec_data: Bytes,
}

impl AudioFormat {
    /// Parse a WAVEFORMATEX structure.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data, "WAVEFORMATEX");
        let format_tag = r.u16()?;
        let channels = r.u16()?;
        let samples_per_sec = r.u32()?;
        let avg_bytes_per_sec = r.u32()?;
        let block_align = r.u16()?;
        let bits_per_sample = r.u16()?;
        // cbSize is optional for plain PCM.
        let extra = if r.remaining() >= 2 { r.u16()? as usize } else { 0 };
        let codec_data = Bytes::copy_from_slice(r.bytes(extra.min(r.remaining()))?);

        Ok(Self {
            format_tag,
            channels,
            samples_per_sec,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
            codec_data,
        })
    }

    /// Uncompressed PCM format with the given layout.
    pub fn pcm(channels: u16, samples_per_sec: u32, bits_per_sample: u16) -> Self {
        let block_align = channels * (bits_per_sample / 8);
        Self {
            format_tag: WAVE_FORMAT_PCM,
            channels,
            samples_per_sec,
            avg_bytes_per_sec: samples_per_sec * block_align as u32,
            block_align,
            bits_per_sample,
            codec_data: Bytes::new(),
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(
            self.format_tag,
            WAVE_FORMAT_PCM | WAVE_FORMAT_IEEE_FLOAT | WAVE_FORMAT_EXTENSIBLE
        )
    }

    /// Serialize back to WAVEFORMATEX bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(WAVEFORMATEX_SIZE + self.codec_data.len());
        out.extend_from_slice(&self.format_tag.to_le_bytes());
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.samples_per_sec.to_le_bytes());
        out.extend_from_slice(&self.avg_bytes_per_sec.to_le_bytes());
        out.extend_from_slice(&self.block_align.to_le_bytes());
        out.extend_from_slice(&self.bits_per_sample.to_le_bytes());
        out.extend_from_slice(&(self.codec_data.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.codec_data);
        out
    }

    /// Well-known codec name for the format tag.
    pub fn codec_name(&self) -> Option<&'static str> {
        match self.format_tag {
            WAVE_FORMAT_PCM => Some("PCM"),
            WAVE_FORMAT_IEEE_FLOAT => Some("IEEE float"),
            0x000A => Some("Windows Media Audio Voice"),
            0x0055 => Some("MPEG Layer 3"),
            0x0160 => Some("Windows Media Audio 1"),
            0x0161 => Some("Windows Media Audio 2"),
            0x0162 => Some("Windows Media Audio Professional"),
            0x0163 => Some("Windows Media Audio Lossless"),
            _ => None,
        }
    }
}

/// Video stream format (ASF video info header + BITMAPINFOHEADER).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFormat {
    pub width: u32,
    /// Positive for bottom-up rasters, negative for top-down.
    pub height: i32,
    pub bit_count: u16,
    /// biCompression: a FourCC for compressed video, BI_RGB/BI_BITFIELDS otherwise.
    pub compression: u32,
    pub image_size: u32,
    /// Bytes per row; negative when rows are stored bottom-up.
    pub stride: i32,
    /// Codec-specific data following the BITMAPINFOHEADER.
    pub codec_data: Bytes,
}

impl VideoFormat {
    /// Parse the ASF video type-specific data.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data, "video info header");
        let _encoded_width = r.u32()?;
        let _encoded_height = r.u32()?;
        let _reserved = r.u8()?;
        let _format_data_size = r.u16()?;

        let bi_size = r.u32()? as usize;
        let width = r.i32()?;
        let height = r.i32()?;
        let _planes = r.u16()?;
        let bit_count = r.u16()?;
        let compression = r.u32()?;
        let image_size = r.u32()?;
        r.skip(16)?; // pels per meter, palette counts
        let extra = bi_size.saturating_sub(BITMAPINFOHEADER_SIZE);
        let codec_data = Bytes::copy_from_slice(r.bytes(extra.min(r.remaining()))?);

        let width = width.unsigned_abs();
        let row = i32::try_from(u64::from(width) * u64::from(bit_count / 8))
            .map_err(|_| Error::format(format!("video width {width} out of range")))?;
        Ok(Self {
            width,
            height,
            bit_count,
            compression,
            image_size,
            stride: if height > 0 { -row } else { row },
            codec_data,
        })
    }

    /// Uncompressed top-down RGB32 format with the given dimensions.
    ///
    /// Fails when a frame of that size cannot be described.
    pub fn rgb32(width: u32, height: u32) -> Result<Self> {
        let too_large = || Error::invalid_media_type(format!("{width}x{height} frame too large"));
        let stride = width
            .checked_mul(4)
            .and_then(|row| i32::try_from(row).ok())
            .ok_or_else(too_large)?;
        let rows = i32::try_from(height).map_err(|_| too_large())?;
        let image_size = (stride as u32).checked_mul(height).ok_or_else(too_large)?;
        Ok(Self {
            width,
            height: -rows,
            bit_count: 32,
            compression: BI_RGB,
            image_size,
            stride,
            codec_data: Bytes::new(),
        })
    }

    /// Absolute frame height in rows.
    pub fn rows(&self) -> u32 {
        self.height.unsigned_abs()
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(self.compression, BI_RGB | BI_BITFIELDS)
    }

    pub fn subtype(&self) -> Subtype {
        if self.is_compressed() {
            Subtype::FourCc(self.compression.to_le_bytes())
        } else {
            Subtype::Rgb(self.bit_count)
        }
    }

    /// Serialize back to the ASF video type-specific layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let bi_size = (BITMAPINFOHEADER_SIZE + self.codec_data.len()) as u32;
        let mut out = Vec::with_capacity(11 + bi_size as usize);
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.rows().to_le_bytes());
        out.push(2);
        out.extend_from_slice(&(bi_size as u16).to_le_bytes());
        out.extend_from_slice(&bi_size.to_le_bytes());
        out.extend_from_slice(&(self.width as i32).to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&self.bit_count.to_le_bytes());
        out.extend_from_slice(&self.compression.to_le_bytes());
        out.extend_from_slice(&self.image_size.to_le_bytes());
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&self.codec_data);
        out
    }
}

/// Media type of a stream or of a transform's input/output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaFormat {
    Audio(AudioFormat),
    Video(VideoFormat),
    Other { stream_type: Uuid },
}

impl MediaFormat {
    pub fn major_type(&self) -> MajorType {
        match self {
            Self::Audio(_) => MajorType::Audio,
            Self::Video(_) => MajorType::Video,
            Self::Other { .. } => MajorType::Other,
        }
    }

    pub fn subtype(&self) -> Subtype {
        match self {
            Self::Audio(a) => Subtype::WaveFormat(a.format_tag),
            Self::Video(v) => v.subtype(),
            Self::Other { stream_type } => Subtype::Other(*stream_type),
        }
    }

    /// Whether samples of this type need a decode transform.
    pub fn is_compressed(&self) -> bool {
        match self {
            Self::Audio(a) => a.is_compressed(),
            Self::Video(v) => v.is_compressed(),
            Self::Other { .. } => false,
        }
    }

    pub fn audio(&self) -> Option<&AudioFormat> {
        match self {
            Self::Audio(a) => Some(a),
            _ => None,
        }
    }

    pub fn video(&self) -> Option<&VideoFormat> {
        match self {
            Self::Video(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wma2() -> AudioFormat {
        AudioFormat {
            format_tag: 0x0161,
            channels: 2,
            samples_per_sec: 44100,
            avg_bytes_per_sec: 16000,
            block_align: 2973,
            bits_per_sample: 16,
            codec_data: Bytes::from_static(&[0, 0, 0, 0, 0x0F, 0, 0, 0, 0, 0]),
        }
    }

    #[test]
    fn test_audio_format_parse() {
        let parsed = AudioFormat::parse(&wma2().to_bytes()).unwrap();
        assert_eq!(parsed.format_tag, 0x0161);
        assert_eq!(parsed.channels, 2);
        assert_eq!(parsed.codec_data.len(), 10);
        assert!(parsed.is_compressed());
        assert_eq!(parsed.codec_name(), Some("Windows Media Audio 2"));
    }

    #[test]
    fn test_pcm_is_uncompressed() {
        let pcm = AudioFormat::pcm(2, 48000, 16);
        assert!(!pcm.is_compressed());
        assert_eq!(pcm.block_align, 4);
        assert_eq!(pcm.avg_bytes_per_sec, 192_000);
        assert_eq!(MediaFormat::Audio(pcm).subtype(), Subtype::PCM);
    }

    #[test]
    fn test_audio_format_truncated() {
        assert!(AudioFormat::parse(&[1, 0, 2]).is_err());
    }

    #[test]
    fn test_video_format_parse() {
        let wmv3 = VideoFormat {
            width: 320,
            height: 240,
            bit_count: 24,
            compression: u32::from_le_bytes(*b"WMV3"),
            image_size: 0,
            stride: 0,
            codec_data: Bytes::from_static(&[0x4F, 0xD1, 0x1A, 0x01]),
        };
        let parsed = VideoFormat::parse(&wmv3.to_bytes()).unwrap();
        assert_eq!(parsed.width, 320);
        assert_eq!(parsed.rows(), 240);
        assert!(parsed.is_compressed());
        assert_eq!(parsed.subtype(), Subtype::FourCc(*b"WMV3"));
        assert_eq!(parsed.subtype().to_string(), "WMV3");
        assert_eq!(parsed.codec_data.len(), 4);
    }

    #[test]
    fn test_video_format_rejects_unrepresentable_stride() {
        let huge = VideoFormat {
            width: 1_000_000_000,
            height: 240,
            bit_count: 24,
            compression: u32::from_le_bytes(*b"WMV3"),
            image_size: 0,
            stride: 0,
            codec_data: Bytes::new(),
        };
        assert!(matches!(
            VideoFormat::parse(&huge.to_bytes()),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_rgb32_rejects_oversized_frames() {
        assert!(matches!(
            VideoFormat::rgb32(40_000, 30_000),
            Err(Error::InvalidMediaType(_))
        ));
        assert!(VideoFormat::rgb32(u32::MAX, 1).is_err());
        assert!(VideoFormat::rgb32(1, u32::MAX).is_err());
        assert_eq!(VideoFormat::rgb32(1920, 1080).unwrap().image_size, 8_294_400);
    }

    #[test]
    fn test_rgb32_target() {
        let rgb = VideoFormat::rgb32(4, 2).unwrap();
        assert!(!rgb.is_compressed());
        assert_eq!(rgb.subtype(), Subtype::RGB32);
        assert_eq!(rgb.stride, 16);
        assert_eq!(rgb.rows(), 2);
        assert_eq!(Subtype::RGB32.to_string(), "RGB32");
    }

    #[test]
    fn test_other_stream_never_compressed() {
        let other = MediaFormat::Other {
            stream_type: crate::Guids::COMMAND_MEDIA,
        };
        assert_eq!(other.major_type(), MajorType::Other);
        assert!(!other.is_compressed());
    }
}
