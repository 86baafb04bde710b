//! Bounded extraction.
//!
//! [`ContainerSession::extract`] reads the data region in fixed-size chunks
//! from the resolved seek position, feeds each chunk to the demultiplexer,
//! drains every sample it has ready and routes the samples of the selected
//! stream through the decoder:
//!
//! - audio samples are decoded until one crosses the clip boundary;
//! - video samples are skipped until a key frame crosses the seek time, which
//!   is decoded as the single extracted frame.
//!
//! Reverse extraction reads chunks from the tail of the range backwards.

use crate::decoder::DecoderSession;
use crate::presentation::{PresentationSink, SampleSink};
use crate::seek::SeekResult;
use crate::session::ContainerSession;
use crate::stream::{PlaybackWindow, StreamKind};
use asfclip_common::{Direction, Error, MediaTime, Result};
use asfclip_media::MediaSample;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

/// Default bytes read per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default length of an extracted audio clip.
pub const DEFAULT_AUDIO_CLIP: MediaTime = MediaTime::from_millis(5_000);

/// Per-sample notification delivered to a [`SampleSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleRecord {
    pub stream_number: u16,
    /// Presentation time with the preroll removed.
    pub presentation_time: Option<MediaTime>,
    pub buffer_count: usize,
    pub total_length: usize,
    /// Set only for the extracted video key frame.
    pub key_frame: bool,
}

impl SampleRecord {
    fn from_sample(sample: &MediaSample, time: Option<MediaTime>, key_frame: bool) -> Self {
        Self {
            stream_number: sample.stream_number,
            presentation_time: time,
            buffer_count: sample.buffer_count(),
            total_length: sample.total_length(),
            key_frame,
        }
    }
}

/// Tunables for [`ContainerSession::extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub chunk_size: usize,
    pub audio_clip: MediaTime,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            audio_clip: DEFAULT_AUDIO_CLIP,
        }
    }
}

/// Outcome of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtractSummary {
    pub seek: SeekResult,
    pub window: PlaybackWindow,
    /// Number of records delivered to the sample sink.
    pub samples: usize,
    /// A completion criterion was met before the range ran out.
    pub complete: bool,
    pub bytes_read: u64,
}

/// Per-call routing state.
struct Router<'a> {
    kind: StreamKind,
    window: PlaybackWindow,
    preroll: MediaTime,
    decoder: &'a mut DecoderSession,
    presentation: &'a mut dyn PresentationSink,
    sink: &'a mut dyn SampleSink,
    samples: usize,
}

impl Router<'_> {
    /// Route one demultiplexed sample. Returns `true` once extraction is
    /// complete.
    fn route(&mut self, mut sample: MediaSample) -> Result<bool> {
        let time = sample
            .presentation_time
            .map(|t| t.saturating_sub(self.preroll));
        if self.kind.key_frames_only() && !sample.key_frame {
            return Ok(false);
        }

        match self.kind {
            StreamKind::Audio => {
                if time.is_some_and(|t| self.window.has_crossed(t)) {
                    debug!(
                        time = ?time,
                        boundary = %self.window.boundary,
                        "Audio clip boundary reached"
                    );
                    self.decoder.stop_decoding()?;
                    return Ok(true);
                }
                self.decoder.process_audio(&sample, self.presentation)?;
                self.emit(SampleRecord::from_sample(&sample, time, false));
                Ok(false)
            }
            StreamKind::Video => {
                let Some(t) = time else {
                    trace!("Skipping untimed key frame");
                    return Ok(false);
                };
                if !self.window.has_crossed(t) {
                    trace!(time = %t, "Key frame before seek point");
                    return Ok(false);
                }
                sample.discontinuity = true;
                self.decoder.process_video(&sample, self.presentation)?;
                self.emit(SampleRecord::from_sample(&sample, time, true));
                self.decoder.stop_decoding()?;
                debug!(time = %t, "Key frame extracted");
                Ok(true)
            }
        }
    }

    fn emit(&mut self, record: SampleRecord) {
        trace!(?record, "Sample produced");
        self.samples += 1;
        self.sink.on_sample_produced(&record);
    }
}

fn align_down(value: u64, align: u64) -> u64 {
    if align == 0 {
        value
    } else {
        value - value % align
    }
}

fn align_up(value: u64, align: u64) -> u64 {
    if align == 0 || value % align == 0 {
        value
    } else {
        value.saturating_add(align - value % align)
    }
}

impl<P: PresentationSink> ContainerSession<P> {
    /// Extract a bounded window of decoded samples around `seek_time` using
    /// the session's [`ExtractOptions`].
    ///
    /// Every decoded sample is reported to `sink` in decode order. Running out
    /// of data before a completion criterion is met is not an error; the
    /// summary then reports `complete == false`.
    pub fn extract(
        &mut self,
        seek_time: MediaTime,
        direction: Direction,
        sink: &mut dyn SampleSink,
    ) -> Result<ExtractSummary> {
        let options = self.options;
        let selected = self.selected.as_ref().ok_or(Error::NotInitialized)?;
        let kind = selected.kind;
        let stream_number = selected.stream_number;
        if self.decoder.is_none() {
            return Err(Error::NotInitialized);
        }
        if options.chunk_size == 0 {
            return Err(Error::invalid_argument("chunk size must be greater than 0"));
        }
        let props = self
            .header
            .as_ref()
            .map(|h| h.file_properties.clone())
            .ok_or(Error::NotInitialized)?;

        let demuxer = self.demuxer.as_mut().ok_or(Error::NotInitialized)?;
        demuxer.flush();
        demuxer.set_direction(direction);

        let seek = self.resolve_seek(seek_time, direction)?;
        let window = match kind {
            StreamKind::Audio => PlaybackWindow::audio(
                seek_time,
                direction,
                options.audio_clip,
                props.presentation_duration(),
            ),
            StreamKind::Video => {
                PlaybackWindow::video(seek.approx_time.unwrap_or(seek_time), direction)
            }
        };
        info!(
            stream = stream_number,
            %kind,
            seek = %seek_time,
            %direction,
            byte_offset = seek.byte_offset,
            boundary = %window.boundary,
            "Starting extraction"
        );

        let mut summary = ExtractSummary {
            seek,
            window,
            samples: 0,
            complete: false,
            bytes_read: 0,
        };

        let started = match self.decoder.as_mut() {
            Some(decoder) => decoder.start_decoding(),
            None => Ok(()),
        };
        if let Err(e) = started {
            warn!(error = %e, "Decoder failed to start, releasing it");
            self.decoder = None;
            return Ok(summary);
        }

        let (Some(source), Some(demuxer), Some(decoder)) = (
            self.source.as_mut(),
            self.demuxer.as_mut(),
            self.decoder.as_mut(),
        ) else {
            return Err(Error::NotInitialized);
        };

        let data = self.data;
        let packet_size = props.max_packet_size as u64;
        let offset = seek.byte_offset.min(data.length);
        let (mut low, mut high) = match direction {
            Direction::Forward => (align_down(offset, packet_size), data.length),
            Direction::Reverse => (0, align_up(data.length - offset, packet_size).min(data.length)),
        };

        let mut router = Router {
            kind,
            window,
            preroll: props.preroll,
            decoder,
            presentation: &mut self.presentation,
            sink,
            samples: 0,
        };

        while low < high && !summary.complete {
            let want = (high - low).min(options.chunk_size as u64);
            let start = match direction {
                Direction::Forward => low,
                Direction::Reverse => high - want,
            };
            let chunk = source.read(data.offset + start, want as usize)?;
            if (chunk.len() as u64) < want {
                warn!(
                    offset = data.offset + start,
                    want,
                    got = chunk.len(),
                    "Short read in data region"
                );
                if chunk.is_empty() || direction.is_reverse() {
                    break;
                }
            }
            trace!(offset = data.offset + start, len = chunk.len(), "Read chunk");
            match direction {
                Direction::Forward => low += chunk.len() as u64,
                Direction::Reverse => high -= want,
            }
            summary.bytes_read += chunk.len() as u64;
            demuxer.parse(chunk)?;

            loop {
                let next = demuxer.next_sample();
                let Some(sample) = next.sample else {
                    break;
                };
                if router.route(sample)? {
                    summary.complete = true;
                    break;
                }
                if !next.more_available {
                    break;
                }
            }
        }

        summary.samples = router.samples;
        if !summary.complete && router.decoder.is_streaming() {
            router.decoder.stop_decoding()?;
        }

        info!(
            samples = summary.samples,
            complete = summary.complete,
            bytes_read = summary.bytes_read,
            "Extraction finished"
        );
        Ok(summary)
    }
}
