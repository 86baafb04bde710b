//! Seek resolution.
//!
//! Converts a presentation time into a byte offset inside the data region.
//! Video streams with index entries use the index; every other case falls
//! back to linear interpolation over the packet count, which assumes a
//! constant bitrate.
//!
//! Offsets are relative to the data region: from its start when scanning
//! forward, from its end when scanning in reverse.

use crate::presentation::PresentationSink;
use crate::session::ContainerSession;
use crate::stream::StreamKind;
use asfclip_common::{Direction, Error, MediaTime, Result};
use asfclip_media::{FileProperties, SeekIndex};
use serde::Serialize;
use tracing::debug;

/// Where a scan should begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeekResult {
    /// Offset into the data region in the scan direction.
    pub byte_offset: u64,
    /// Time of the index entry the offset came from. Only set for index
    /// resolution; key-frame matching must use it instead of the request.
    pub approx_time: Option<MediaTime>,
}

/// Interpolated data-region offset for `time`.
///
/// `fraction` is `time / duration` forward and `(duration - time) / duration`
/// in reverse; the offset is `avg_packet_size * floor(packet_count * fraction)`.
/// `time` is clamped to `[0, duration]`. A zero duration yields offset 0.
pub fn interpolated_offset(
    time: MediaTime,
    direction: Direction,
    duration: MediaTime,
    packet_count: u64,
    avg_packet_size: u64,
) -> u64 {
    if duration <= MediaTime::ZERO {
        return 0;
    }
    let duration_hns = duration.as_hns() as f64;
    let time_hns = time.clamp_to(MediaTime::ZERO, duration).as_hns() as f64;

    let fraction = match direction {
        Direction::Forward => time_hns / duration_hns,
        Direction::Reverse => (duration_hns - time_hns) / duration_hns,
    };
    let packets = (packet_count as f64 * fraction).floor() as u64;
    avg_packet_size.saturating_mul(packets.min(packet_count))
}

/// Resolves seek positions for one stream.
pub struct SeekResolver<'a> {
    pub kind: StreamKind,
    pub stream_number: u16,
    pub props: &'a FileProperties,
    pub data_length: u64,
    pub index: Option<&'a dyn SeekIndex>,
}

impl SeekResolver<'_> {
    pub fn resolve(&self, time: MediaTime, direction: Direction) -> Result<SeekResult> {
        match self.index {
            Some(index) if self.kind.uses_index() => self.from_index(index, time, direction),
            _ => Ok(self.interpolate(time, direction)),
        }
    }

    fn interpolate(&self, time: MediaTime, direction: Direction) -> SeekResult {
        let byte_offset = interpolated_offset(
            time,
            direction,
            self.props.presentation_duration(),
            self.props.packet_count,
            self.props.avg_packet_size(),
        );
        debug!(%time, %direction, byte_offset, "Interpolated seek position");
        SeekResult {
            byte_offset,
            approx_time: None,
        }
    }

    fn from_index(
        &self,
        index: &dyn SeekIndex,
        time: MediaTime,
        direction: Direction,
    ) -> Result<SeekResult> {
        if !index.is_indexed(self.stream_number) {
            return Err(Error::NoIndex(self.stream_number));
        }
        let position = index.seek_position(self.stream_number, time, direction)?;
        let last = self.data_length.saturating_sub(1);

        let byte_offset = match direction {
            Direction::Forward => position.offset.min(last),
            Direction::Reverse => {
                // Keep the whole indexed packet inside the backward scan.
                let end = position
                    .offset
                    .saturating_add(self.props.max_packet_size as u64)
                    .min(self.data_length);
                (self.data_length - end).min(last)
            }
        };
        debug!(
            %time,
            %direction,
            index_offset = position.offset,
            approx_time = %position.approx_time,
            byte_offset,
            "Indexed seek position"
        );
        Ok(SeekResult {
            byte_offset,
            approx_time: Some(position.approx_time),
        })
    }
}

impl<P: PresentationSink> ContainerSession<P> {
    /// Resolve `time` for the selected stream.
    pub fn resolve_seek(&self, time: MediaTime, direction: Direction) -> Result<SeekResult> {
        let selected = self.selected.as_ref().ok_or(Error::NotInitialized)?;
        let header = self.header.as_ref().ok_or(Error::NotInitialized)?;
        SeekResolver {
            kind: selected.kind,
            stream_number: selected.stream_number,
            props: &header.file_properties,
            data_length: self.data.length,
            index: self.index.as_deref(),
        }
        .resolve(time, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asfclip_media::IndexPosition;
    use assert_matches::assert_matches;

    const DURATION: MediaTime = MediaTime::from_hns(100);

    #[test]
    fn test_forward_example() {
        let offset =
            interpolated_offset(MediaTime::from_hns(25), Direction::Forward, DURATION, 1000, 2000);
        assert_eq!(offset, 500_000);
    }

    #[test]
    fn test_reverse_example() {
        let offset =
            interpolated_offset(MediaTime::from_hns(25), Direction::Reverse, DURATION, 1000, 2000);
        assert_eq!(offset, 1_500_000);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            interpolated_offset(MediaTime::ZERO, Direction::Forward, DURATION, 1000, 2000),
            0
        );
        assert_eq!(
            interpolated_offset(DURATION, Direction::Forward, DURATION, 1000, 2000),
            2_000_000
        );
        assert_eq!(interpolated_offset(DURATION, Direction::Reverse, DURATION, 1000, 2000), 0);
        assert_eq!(
            interpolated_offset(MediaTime::from_hns(500), Direction::Forward, DURATION, 1000, 2000),
            2_000_000
        );
    }

    #[test]
    fn test_zero_duration() {
        assert_eq!(
            interpolated_offset(
                MediaTime::from_hns(5),
                Direction::Forward,
                MediaTime::ZERO,
                10,
                10
            ),
            0
        );
    }

    struct FixedIndex {
        stream: u16,
        position: IndexPosition,
    }

    impl SeekIndex for FixedIndex {
        fn is_indexed(&self, stream_number: u16) -> bool {
            stream_number == self.stream
        }

        fn seek_position(
            &self,
            stream_number: u16,
            _: MediaTime,
            _: Direction,
        ) -> Result<IndexPosition> {
            if stream_number != self.stream {
                return Err(Error::NoIndex(stream_number));
            }
            Ok(self.position)
        }
    }

    fn props() -> FileProperties {
        FileProperties {
            file_id: uuid::Uuid::nil(),
            file_size: 0,
            creation_time: None,
            packet_count: 10,
            play_duration: MediaTime::from_millis(1000),
            send_duration: MediaTime::from_millis(1000),
            preroll: MediaTime::ZERO,
            broadcast: false,
            seekable: true,
            min_packet_size: 100,
            max_packet_size: 100,
            max_bitrate: 0,
        }
    }

    fn index_at(offset: u64) -> FixedIndex {
        FixedIndex {
            stream: 2,
            position: IndexPosition {
                offset,
                approx_time: MediaTime::from_millis(400),
            },
        }
    }

    #[test]
    fn test_index_resolution_forward_and_reverse() {
        let props = props();
        let index = index_at(300);
        let resolver = SeekResolver {
            kind: StreamKind::Video,
            stream_number: 2,
            props: &props,
            data_length: 1000,
            index: Some(&index),
        };

        let fwd = resolver.resolve(MediaTime::from_millis(450), Direction::Forward).unwrap();
        assert_eq!(fwd.byte_offset, 300);
        assert_eq!(fwd.approx_time, Some(MediaTime::from_millis(400)));

        let rev = resolver.resolve(MediaTime::from_millis(450), Direction::Reverse).unwrap();
        assert_eq!(rev.byte_offset, 600);
    }

    #[test]
    fn test_index_offset_clamped_into_region() {
        let props = props();
        let index = index_at(5000);
        let resolver = SeekResolver {
            kind: StreamKind::Video,
            stream_number: 2,
            props: &props,
            data_length: 1000,
            index: Some(&index),
        };
        for direction in [Direction::Forward, Direction::Reverse] {
            let result = resolver.resolve(MediaTime::ZERO, direction).unwrap();
            assert!(result.byte_offset < 1000);
        }
    }

    #[test]
    fn test_unindexed_video_stream_with_index_present() {
        let props = props();
        let index = index_at(0);
        let resolver = SeekResolver {
            kind: StreamKind::Video,
            stream_number: 3,
            props: &props,
            data_length: 1000,
            index: Some(&index),
        };
        assert_matches!(
            resolver.resolve(MediaTime::ZERO, Direction::Forward),
            Err(Error::NoIndex(3))
        );
    }

    #[test]
    fn test_audio_ignores_index() {
        let props = props();
        let index = index_at(300);
        let resolver = SeekResolver {
            kind: StreamKind::Audio,
            stream_number: 2,
            props: &props,
            data_length: 1000,
            index: Some(&index),
        };
        let result = resolver.resolve(MediaTime::from_millis(500), Direction::Forward).unwrap();
        assert_eq!(result.byte_offset, 500);
        assert_eq!(result.approx_time, None);
    }
}
