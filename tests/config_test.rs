//! Integration tests for configuration loading and the registry it builds.

mod common;

use asfclip::config::{self, Config};
use asfclip::ContainerSession;
use asfclip_common::{Direction, MediaTime};
use asfclip_media::MemorySource;
use common::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn load_config_or_default_uses_explicit_path() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("asfclip.toml");
    fs::write(&path, "[extract]\naudio_clip_secs = 0.5\n").unwrap();

    let config = config::load_config_or_default(Some(&path)).unwrap();
    assert_eq!(config.extract.audio_clip_secs, 0.5);
    assert_eq!(config.extract.chunk_size, 4096);
}

#[test]
fn unknown_keys_are_ignored() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("asfclip.toml");
    fs::write(&path, "[server]\nport = 8080\n").unwrap();

    assert_eq!(config::load_config(&path).unwrap(), Config::default());
}

#[test]
fn malformed_toml_is_reported() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("asfclip.toml");
    fs::write(&path, "[extract\nchunk_size = ").unwrap();

    let err = config::load_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config file"));
}

#[test]
fn validate_rejects_non_finite_clip() {
    let mut config = Config::default();
    config.extract.audio_clip_secs = f64::NAN;
    assert!(config::validate_config(&config).is_err());
    config.extract.audio_clip_secs = 0.0;
    assert!(config::validate_config(&config).is_err());
    config.extract.audio_clip_secs = 0.25;
    assert!(config::validate_config(&config).is_ok());
}

#[test]
fn configured_session_extracts_with_configured_options() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("asfclip.toml");
    fs::write(
        &path,
        "[extract]\nchunk_size = 300\naudio_clip_secs = 2.0\n\n[decode]\npassthrough = true\n",
    )
    .unwrap();
    let config = config::load_config(&path).unwrap();

    let registry = config::build_registry(&config);
    let mut s = ContainerSession::new(registry, RecordingPresentation::default())
        .with_options(config.extract.options());
    s.open_source(Box::new(MemorySource::new(audio_builder(0).build())))
        .unwrap();
    s.select_stream(AUDIO_STREAM).unwrap();

    let (summary, records) = extract(&mut s, secs(3.0), Direction::Forward).unwrap();
    assert!(summary.complete);
    assert_eq!(summary.window.boundary, MediaTime::from_millis(5_000));
    assert_eq!(
        records.last().and_then(|r| r.presentation_time),
        Some(MediaTime::from_millis(4_900))
    );
}

#[test]
fn default_config_has_no_decoders() {
    let registry = config::build_registry(&Config::default());
    assert!(registry.is_empty());
}
