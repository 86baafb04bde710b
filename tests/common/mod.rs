//! Shared test harness for integration tests.
//!
//! Provides synthetic ASF files, a [`RecordingPresentation`] sink that keeps
//! everything it is handed, and decode transforms with scripted behaviour.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use asfclip::decoder::{
    CodecRegistry, PassthroughTransform, StreamingMessage, Transform, TransformOutput,
};
use asfclip::{ContainerSession, ExtractSummary, PresentationSink, SampleRecord};
use asfclip_common::{Direction, Error, MajorType, MediaTime, Result};
use asfclip_media::fixture::{AsfBuilder, StreamSpec};
use asfclip_media::{AudioFormat, MediaFormat, MediaSample, MemorySource, VideoFormat};

pub const PACKET_SIZE: u32 = 512;
pub const AUDIO_STREAM: u16 = 1;
pub const VIDEO_STREAM: u16 = 2;

/// 100 audio objects of 64 bytes, one every 100 ms.
pub fn audio_builder(preroll_ms: u32) -> AsfBuilder {
    (0..100u32).fold(
        AsfBuilder::new()
            .packet_size(PACKET_SIZE)
            .preroll_ms(preroll_ms as u64)
            .stream(StreamSpec::wma(AUDIO_STREAM)),
        |b, i| b.sample(AUDIO_STREAM, preroll_ms + i * 100, true, vec![i as u8; 64]),
    )
}

/// 100 video frames of 64 bytes, one every 100 ms, with a key frame every
/// second.
pub fn video_builder() -> AsfBuilder {
    (0..100u32).fold(
        AsfBuilder::new()
            .packet_size(PACKET_SIZE)
            .stream(StreamSpec::wmv(VIDEO_STREAM, 4, 4)),
        |b, i| b.sample(VIDEO_STREAM, i * 100, i % 10 == 0, vec![i as u8; 64]),
    )
}

pub fn session(registry: CodecRegistry) -> ContainerSession<RecordingPresentation> {
    ContainerSession::new(registry, RecordingPresentation::default())
}

pub fn open(registry: CodecRegistry, file: Vec<u8>) -> ContainerSession<RecordingPresentation> {
    let mut s = session(registry);
    s.open_source(Box::new(MemorySource::new(file)))
        .expect("fixture should open");
    s
}

/// Run one extraction and collect the records it produced.
pub fn extract(
    session: &mut ContainerSession<RecordingPresentation>,
    seek: MediaTime,
    direction: Direction,
) -> Result<(ExtractSummary, Vec<SampleRecord>)> {
    let mut records = Vec::new();
    let summary = session.extract(seek, direction, &mut |r: &SampleRecord| records.push(*r))?;
    Ok((summary, records))
}

pub fn secs(s: f64) -> MediaTime {
    MediaTime::from_secs_f64(s)
}

/// Presentation sink that records everything it receives.
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    pub audio_format: Option<AudioFormat>,
    pub clips: Vec<MediaSample>,
    pub frames: Vec<(Vec<u8>, VideoFormat)>,
    pub resets: usize,
}

impl PresentationSink for RecordingPresentation {
    fn open_audio_device(&mut self, format: &AudioFormat) -> Result<()> {
        self.audio_format = Some(format.clone());
        Ok(())
    }

    fn append_audio_clip(&mut self, sample: &MediaSample) -> Result<()> {
        self.clips.push(sample.clone());
        Ok(())
    }

    fn build_frame(&mut self, data: &[u8], format: &VideoFormat) -> Result<()> {
        self.frames.push((data.to_vec(), format.clone()));
        Ok(())
    }

    fn reset(&mut self) {
        self.audio_format = None;
        self.clips.clear();
        self.frames.clear();
        self.resets += 1;
    }
}

/// Streaming messages received by a [`LoggingTransform`].
pub type MessageLog = Arc<Mutex<Vec<StreamingMessage>>>;

/// Scripted variations on the passthrough transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Behave like the passthrough transform.
    Plain,
    /// Reject the begin-streaming notification.
    FailStart,
    /// Produce two outputs for every input.
    Double,
    /// Offer only a compressed output type.
    NoUncompressedOutput,
    /// Fail every input.
    FailInput,
}

pub struct LoggingTransform {
    inner: PassthroughTransform,
    script: Script,
    log: MessageLog,
}

impl LoggingTransform {
    pub fn new(script: Script, log: MessageLog) -> Self {
        Self {
            inner: PassthroughTransform::new(),
            script,
            log,
        }
    }
}

impl Transform for LoggingTransform {
    fn set_input_type(&mut self, format: &MediaFormat) -> Result<()> {
        self.inner.set_input_type(format)
    }

    fn output_type(&self, index: usize) -> Option<MediaFormat> {
        match self.script {
            Script::NoUncompressedOutput => {
                let mut compressed = AudioFormat::pcm(2, 44_100, 16);
                compressed.format_tag = 0x0162;
                (index == 0).then_some(MediaFormat::Audio(compressed))
            }
            _ => self.inner.output_type(index),
        }
    }

    fn set_output_type(&mut self, format: &MediaFormat) -> Result<()> {
        self.inner.set_output_type(format)
    }

    fn output_buffer_size(&self) -> usize {
        self.inner.output_buffer_size()
    }

    fn process_message(&mut self, message: StreamingMessage) -> Result<()> {
        self.log.lock().unwrap().push(message);
        if self.script == Script::FailStart && message == StreamingMessage::BeginStreaming {
            return Err(Error::fail("begin streaming rejected"));
        }
        self.inner.process_message(message)
    }

    fn process_input(&mut self, sample: &MediaSample) -> Result<()> {
        match self.script {
            Script::FailInput => Err(Error::fail("corrupt input")),
            Script::Double => {
                self.inner.process_input(sample)?;
                self.inner.process_input(sample)
            }
            _ => self.inner.process_input(sample),
        }
    }

    fn process_output(&mut self, buffer: Vec<u8>) -> Result<TransformOutput> {
        self.inner.process_output(buffer)
    }
}

/// Registry whose audio and video transforms follow `script`, plus the log
/// their streaming messages are written to.
pub fn scripted_registry(script: Script) -> (CodecRegistry, MessageLog) {
    let log: MessageLog = Arc::default();
    let mut registry = CodecRegistry::new();
    for major in [MajorType::Audio, MajorType::Video] {
        let log = Arc::clone(&log);
        registry.register_any("scripted", major, move || {
            Box::new(LoggingTransform::new(script, Arc::clone(&log)))
        });
    }
    (registry, log)
}
