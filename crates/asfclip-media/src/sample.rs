//! Demultiplexed media samples.

use asfclip_common::MediaTime;
use bytes::{Bytes, BytesMut};

/// One media object delivered by the demultiplexer, or one decoded output
/// sample produced by a transform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSample {
    pub stream_number: u16,
    /// Presentation time; absent when the payload carried no timing.
    pub presentation_time: Option<MediaTime>,
    pub duration: Option<MediaTime>,
    /// Sample data, possibly split across several buffers.
    pub buffers: Vec<Bytes>,
    pub key_frame: bool,
    /// Set on the first sample after a seek.
    pub discontinuity: bool,
}

impl MediaSample {
    /// Create a sample with a single buffer.
    pub fn new(stream_number: u16, data: impl Into<Bytes>) -> Self {
        Self {
            stream_number,
            buffers: vec![data.into()],
            ..Default::default()
        }
    }

    pub fn with_time(mut self, time: MediaTime) -> Self {
        self.presentation_time = Some(time);
        self
    }

    pub fn with_key_frame(mut self, key_frame: bool) -> Self {
        self.key_frame = key_frame;
        self
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Total bytes across all buffers.
    pub fn total_length(&self) -> usize {
        self.buffers.iter().map(Bytes::len).sum()
    }

    /// All buffers as one contiguous buffer. Free for single-buffer samples.
    pub fn contiguous(&self) -> Bytes {
        match self.buffers.as_slice() {
            [] => Bytes::new(),
            [only] => only.clone(),
            many => {
                let mut out = BytesMut::with_capacity(self.total_length());
                for buf in many {
                    out.extend_from_slice(buf);
                }
                out.freeze()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_joins_buffers() {
        let mut sample = MediaSample::new(1, Bytes::from_static(b"ab"));
        sample.buffers.push(Bytes::from_static(b"cd"));
        assert_eq!(sample.buffer_count(), 2);
        assert_eq!(sample.total_length(), 4);
        assert_eq!(&sample.contiguous()[..], b"abcd");
    }

    #[test]
    fn test_builder_methods() {
        let sample = MediaSample::new(3, vec![1u8, 2, 3])
            .with_time(MediaTime::from_millis(40))
            .with_key_frame(true);
        assert_eq!(sample.presentation_time, Some(MediaTime::from_millis(40)));
        assert!(sample.key_frame);
        assert!(!sample.discontinuity);
        assert_eq!(MediaSample::default().contiguous().len(), 0);
    }
}
