//! Decodable stream kinds.

use asfclip_common::{Direction, MajorType, MediaTime};
use asfclip_media::{MediaFormat, Subtype};
use serde::Serialize;
use std::fmt;

/// The two stream kinds the pipeline can decode.
///
/// Chosen once when a stream is selected; it decides the uncompressed output
/// target, how seek positions are resolved and how samples are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Decode a bounded clip of consecutive samples.
    Audio,
    /// Decode the first key frame that crosses the seek time.
    Video,
}

impl StreamKind {
    pub fn from_major(major: MajorType) -> Option<Self> {
        match major {
            MajorType::Audio => Some(Self::Audio),
            MajorType::Video => Some(Self::Video),
            MajorType::Other => None,
        }
    }

    pub fn major_type(&self) -> MajorType {
        match self {
            Self::Audio => MajorType::Audio,
            Self::Video => MajorType::Video,
        }
    }

    /// Uncompressed subtype a decoder must produce.
    pub fn target_subtype(&self) -> Subtype {
        match self {
            Self::Audio => Subtype::PCM,
            Self::Video => Subtype::RGB32,
        }
    }

    /// Whether a transform output type is the uncompressed target.
    pub fn is_target_output(&self, format: &MediaFormat) -> bool {
        format.major_type() == self.major_type() && format.subtype() == self.target_subtype()
    }

    /// Whether seeking may use the stream's index.
    pub fn uses_index(&self) -> bool {
        matches!(self, Self::Video)
    }

    /// Whether only key frames are candidates for decoding.
    pub fn key_frames_only(&self) -> bool {
        matches!(self, Self::Video)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major_type())
    }
}

/// The stream currently selected on a container session.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedStream {
    pub stream_number: u16,
    pub kind: StreamKind,
    /// Compressed input format of the stream.
    pub format: MediaFormat,
    /// Name of the decode transform bound to the stream.
    pub codec: String,
}

/// Bounds of a seek-driven extraction.
///
/// For audio the boundary is the end of the clip window; for video it is the
/// time a key frame must reach to be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackWindow {
    pub direction: Direction,
    pub boundary: MediaTime,
}

impl PlaybackWindow {
    /// Window for an audio clip of `clip` length starting at `seek`, clamped
    /// to `[0, max_seekable]`.
    pub fn audio(
        seek: MediaTime,
        direction: Direction,
        clip: MediaTime,
        max_seekable: MediaTime,
    ) -> Self {
        let boundary = if direction.is_reverse() {
            seek.saturating_sub(clip)
        } else {
            seek.saturating_add(clip).min(max_seekable)
        };
        Self {
            direction,
            boundary,
        }
    }

    /// Window for a video key frame matched against `seek`.
    pub fn video(seek: MediaTime, direction: Direction) -> Self {
        Self {
            direction,
            boundary: seek,
        }
    }

    /// Whether `time` has reached the boundary in the scan direction.
    pub fn has_crossed(&self, time: MediaTime) -> bool {
        if self.direction.is_reverse() {
            time <= self.boundary
        } else {
            time >= self.boundary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asfclip_media::{AudioFormat, VideoFormat};

    #[test]
    fn test_target_outputs() {
        let pcm = MediaFormat::Audio(AudioFormat::pcm(2, 44_100, 16));
        let rgb = MediaFormat::Video(VideoFormat::rgb32(8, 8).unwrap());
        assert!(StreamKind::Audio.is_target_output(&pcm));
        assert!(!StreamKind::Audio.is_target_output(&rgb));
        assert!(StreamKind::Video.is_target_output(&rgb));
        assert!(!StreamKind::Video.is_target_output(&pcm));
    }

    #[test]
    fn test_from_major() {
        assert_eq!(StreamKind::from_major(MajorType::Audio), Some(StreamKind::Audio));
        assert_eq!(StreamKind::from_major(MajorType::Other), None);
        assert!(StreamKind::Video.uses_index());
        assert!(!StreamKind::Audio.key_frames_only());
    }

    #[test]
    fn test_audio_window_forward_clamps_to_seekable_end() {
        let clip = MediaTime::from_secs_f64(5.0);
        let max = MediaTime::from_secs_f64(8.0);
        let w = PlaybackWindow::audio(MediaTime::from_secs_f64(1.0), Direction::Forward, clip, max);
        assert_eq!(w.boundary, MediaTime::from_secs_f64(6.0));
        let w = PlaybackWindow::audio(MediaTime::from_secs_f64(6.0), Direction::Forward, clip, max);
        assert_eq!(w.boundary, max);
    }

    #[test]
    fn test_audio_window_reverse_clamps_to_zero() {
        let clip = MediaTime::from_secs_f64(5.0);
        let max = MediaTime::from_secs_f64(60.0);
        let w =
            PlaybackWindow::audio(MediaTime::from_secs_f64(12.0), Direction::Reverse, clip, max);
        assert_eq!(w.boundary, MediaTime::from_secs_f64(7.0));
        let w = PlaybackWindow::audio(MediaTime::from_secs_f64(3.0), Direction::Reverse, clip, max);
        assert_eq!(w.boundary, MediaTime::ZERO);
    }

    #[test]
    fn test_has_crossed() {
        let fwd = PlaybackWindow::video(MediaTime::from_millis(1000), Direction::Forward);
        assert!(!fwd.has_crossed(MediaTime::from_millis(999)));
        assert!(fwd.has_crossed(MediaTime::from_millis(1000)));

        let rev = PlaybackWindow::video(MediaTime::from_millis(1000), Direction::Reverse);
        assert!(rev.has_crossed(MediaTime::from_millis(1000)));
        assert!(!rev.has_crossed(MediaTime::from_millis(1001)));
    }
}
