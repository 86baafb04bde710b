//! Container session integration tests
//!
//! Open, enumerate, select and reset against synthetic files on disk and in
//! memory.

mod common;

use asfclip::decoder::{CodecRegistry, DecoderState};
use asfclip::StreamKind;
use asfclip_common::{Direction, Error, MajorType};
use asfclip_media::fixture::{AsfBuilder, StreamSpec};
use asfclip_media::MemorySource;
use assert_matches::assert_matches;
use common::*;
use tempfile::tempdir;

fn mixed_file() -> Vec<u8> {
    AsfBuilder::new()
        .stream(StreamSpec::wma(1))
        .stream(StreamSpec::wmv(2, 4, 4))
        .stream(StreamSpec::pcm(3))
        .stream(StreamSpec::command(4))
        .sample(1, 0, true, vec![1u8; 32])
        .sample(2, 0, true, vec![2u8; 32])
        .sample(3, 0, true, vec![3u8; 32])
        .title("Mixed")
        .build()
}

#[test]
fn enumerate_reports_header_order() {
    let s = open(CodecRegistry::with_passthrough(), mixed_file());
    let streams = s.enumerate_streams().unwrap();
    let majors: Vec<_> = streams.iter().map(|d| (d.stream_number, d.major_type)).collect();
    assert_eq!(
        majors,
        vec![
            (1, MajorType::Audio),
            (2, MajorType::Video),
            (3, MajorType::Audio),
            (4, MajorType::Other),
        ]
    );
    assert_eq!(s.content_description().map(|d| d.title.as_str()), Some("Mixed"));
}

#[test]
fn enumerate_before_open_fails() {
    let mut s = session(CodecRegistry::with_passthrough());
    assert!(!s.is_open());
    assert_matches!(s.enumerate_streams(), Err(Error::NotInitialized));
    assert_matches!(s.select_stream(1), Err(Error::NotInitialized));
}

#[test]
fn select_rejects_invalid_streams() {
    let mut s = open(CodecRegistry::with_passthrough(), mixed_file());

    assert_matches!(s.select_stream(0), Err(Error::InvalidArgument(_)));
    assert_matches!(s.select_stream(9), Err(Error::InvalidArgument(_)));
    // Uncompressed audio cannot be decoded.
    assert_matches!(s.select_stream(3), Err(Error::InvalidRequest(_)));
    // Neither audio nor video.
    assert_matches!(s.select_stream(4), Err(Error::InvalidRequest(_)));
    assert!(s.selected().is_none());
    assert!(s.decoder().is_none());
}

#[test]
fn select_binds_decoder_and_opens_audio_device() {
    let mut s = open(CodecRegistry::with_passthrough(), mixed_file());
    s.select_stream(1).unwrap();

    let selected = s.selected().unwrap();
    assert_eq!(selected.kind, StreamKind::Audio);
    assert_eq!(selected.codec, "passthrough");
    assert_eq!(s.decoder().map(|d| d.state()), Some(DecoderState::Idle));

    let device = s.presentation().audio_format.as_ref().unwrap();
    assert_eq!(device.block_align, 4);
    assert_eq!(device.samples_per_sec, 44_100);

    s.select_stream(2).unwrap();
    assert_eq!(s.selected().map(|sel| sel.kind), Some(StreamKind::Video));
    assert_eq!(s.decoder().map(|d| d.kind()), Some(StreamKind::Video));
}

#[test]
fn select_without_codec_fails() {
    let mut s = open(CodecRegistry::new(), mixed_file());
    assert_matches!(
        s.select_stream(1),
        Err(Error::CodecNotFound { major: MajorType::Audio, .. })
    );
    assert!(s.selected().is_none());
}

#[test]
fn select_requires_uncompressed_output() {
    let (registry, _log) = scripted_registry(Script::NoUncompressedOutput);
    let mut s = open(registry, mixed_file());
    assert_matches!(s.select_stream(1), Err(Error::InvalidMediaType(_)));
    assert!(s.selected().is_none());
    assert!(s.decoder().is_none());
}

#[test]
fn select_rejects_oversized_video() {
    let file = AsfBuilder::new()
        .stream(StreamSpec::wmv(2, 40_000, 30_000))
        .sample(2, 0, true, vec![2u8; 32])
        .build();
    let mut s = open(CodecRegistry::with_passthrough(), file);
    assert_eq!(s.streams().len(), 1);
    assert_matches!(s.select_stream(2), Err(Error::InvalidMediaType(_)));
    assert!(s.selected().is_none());
    assert!(s.decoder().is_none());
}

#[test]
fn failed_select_releases_previous_selection() {
    let mut s = open(CodecRegistry::with_passthrough(), mixed_file());
    s.select_stream(1).unwrap();
    assert_matches!(s.select_stream(3), Err(Error::InvalidRequest(_)));
    assert!(s.selected().is_none());
    assert_matches!(
        s.resolve_seek(secs(0.0), Direction::Forward),
        Err(Error::NotInitialized)
    );
}

#[test]
fn reset_is_idempotent() {
    let mut s = open(CodecRegistry::with_passthrough(), audio_builder(0).build());
    s.select_stream(AUDIO_STREAM).unwrap();
    extract(&mut s, secs(1.0), Direction::Forward).unwrap();

    s.reset();
    s.reset();
    assert!(!s.is_open());
    assert!(s.header().is_none());
    assert!(s.selected().is_none());
    assert!(s.decoder().is_none());
    assert!(!s.has_index());
    assert_eq!(s.data_range().length, 0);
    assert!(s.presentation().clips.is_empty());
    assert!(s.presentation().audio_format.is_none());

    // The session is reusable after a reset.
    s.open_source(Box::new(MemorySource::new(video_builder().build())))
        .unwrap();
    s.select_stream(VIDEO_STREAM).unwrap();
    let (summary, _) = extract(&mut s, secs(1.0), Direction::Forward).unwrap();
    assert!(summary.complete);
}

#[test]
fn reopen_replaces_previous_file() {
    let mut s = open(CodecRegistry::with_passthrough(), video_builder().simple_index(1000).build());
    s.select_stream(VIDEO_STREAM).unwrap();
    assert!(s.has_index());

    s.open_source(Box::new(MemorySource::new(audio_builder(0).build())))
        .unwrap();
    assert!(s.selected().is_none());
    assert!(!s.has_index());
    assert_eq!(s.streams().len(), 1);
}

#[test]
fn open_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clip.wmv");
    video_builder().simple_index(1000).write_to(&path).unwrap();

    let mut s = session(CodecRegistry::with_passthrough());
    s.open(&path).unwrap();
    assert!(s.is_open());
    assert!(s.is_indexed(VIDEO_STREAM));
    assert_eq!(
        s.file_properties().map(|p| p.packet_count),
        Some(17)
    );
}

#[test]
fn open_missing_file_fails() {
    let dir = tempdir().unwrap();
    let mut s = session(CodecRegistry::with_passthrough());
    assert_matches!(s.open(dir.path().join("missing.wmv")), Err(Error::Io(_)));
    assert!(!s.is_open());
}

#[test]
fn open_rejects_garbage() {
    let mut s = session(CodecRegistry::with_passthrough());
    let result = s.open_source(Box::new(MemorySource::new(vec![0u8; 256])));
    assert_matches!(result, Err(Error::Format(_)));
    assert!(!s.is_open());
}

#[test]
fn open_rejects_truncated_header() {
    let file = audio_builder(0).build();
    let mut s = session(CodecRegistry::with_passthrough());
    let result = s.open_source(Box::new(MemorySource::new(file[..100].to_vec())));
    assert!(result.is_err());
    assert!(!s.is_open());
}
