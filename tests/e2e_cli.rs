//! CLI end-to-end tests
//!
//! Tests for the asfclip command-line interface, run against synthetic ASF
//! files written to a temporary directory.

use asfclip_media::fixture::{AsfBuilder, StreamSpec};
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the asfclip binary
#[allow(deprecated)]
fn asfclip_cmd() -> Command {
    Command::cargo_bin("asfclip").unwrap()
}

/// Write a two-stream file (audio 1, video 2) with a simple index.
fn write_media(dir: &Path) -> PathBuf {
    let path = dir.join("clip.wmv");
    let builder = (0..50u32).fold(
        AsfBuilder::new()
            .title("Test Clip")
            .stream(StreamSpec::wma(1))
            .stream(StreamSpec::wmv(2, 4, 4)),
        |b, i| {
            b.sample(1, i * 100, true, vec![i as u8; 64])
                .sample(2, i * 100, i % 10 == 0, vec![i as u8; 64])
        },
    );
    builder.simple_index(1000).write_to(&path).unwrap();
    path
}

fn media() -> (TempDir, PathBuf) {
    let temp = tempdir().unwrap();
    let path = write_media(temp.path());
    (temp, path)
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = asfclip_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = asfclip_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("asfclip"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = asfclip_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("asfclip"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = asfclip_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_probe_help() {
    let mut cmd = asfclip_cmd();
    cmd.args(["probe", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Probe an ASF file"));
}

#[test]
fn test_cli_extract_help() {
    let mut cmd = asfclip_cmd();
    cmd.args(["extract", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extract a decoded audio clip"));
}

#[test]
fn test_cli_probe_nonexistent_file() {
    let mut cmd = asfclip_cmd();
    cmd.args(["probe", "/nonexistent/path/movie.wmv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found").or(predicate::str::contains("exist")));
}

#[test]
fn test_cli_probe_file() {
    let (_temp, path) = media();
    let mut cmd = asfclip_cmd();
    cmd.args(["probe", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Streams: 2"))
        .stdout(predicate::str::contains("Title: Test Clip"))
        .stdout(predicate::str::contains("[indexed]"));
}

#[test]
fn test_cli_probe_json_output() {
    let (_temp, path) = media();
    let output = asfclip_cmd()
        .args(["probe", "--json", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["streams"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["streams"][1]["major_type"], "video");
    assert_eq!(json["streams"][1]["indexed"], true);
}

#[test]
fn test_cli_probe_garbage_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("garbage.wmv");
    fs::write(&path, vec![0u8; 128]).unwrap();

    let mut cmd = asfclip_cmd();
    cmd.args(["probe", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

#[test]
fn test_cli_seek_json_output() {
    let (_temp, path) = media();
    let output = asfclip_cmd()
        .args(["seek", path.to_str().unwrap(), "-s", "2", "-t", "2.5", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["byte_offset"].is_u64());
    assert_eq!(json["approx_time"], 20_000_000);
}

#[test]
fn test_cli_seek_negative_time() {
    let (_temp, path) = media();
    let mut cmd = asfclip_cmd();
    cmd.args(["seek", path.to_str().unwrap(), "-s", "2", "--time=-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-negative"));
}

#[test]
fn test_cli_extract_video_frame() {
    let (_temp, path) = media();
    let mut cmd = asfclip_cmd();
    cmd.args([
        "extract",
        path.to_str().unwrap(),
        "-s",
        "2",
        "-t",
        "1.5",
        "--passthrough",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("[key frame]"))
    .stdout(predicate::str::contains("Frame: 4x4"));
}

#[test]
fn test_cli_extract_audio_json() {
    let (_temp, path) = media();
    let output = asfclip_cmd()
        .args([
            "extract",
            path.to_str().unwrap(),
            "-s",
            "1",
            "-t",
            "1.0",
            "--passthrough",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // The 5 s clip is clamped to the 5 s file, so the data runs out first.
    assert_eq!(json["summary"]["complete"], false);
    assert!(json["summary"]["samples"].as_u64().unwrap() > 0);
    assert!(json["clip_bytes"].as_u64().unwrap() > 0);
    assert!(json["frame"].is_null());
}

#[test]
fn test_cli_extract_without_decoder() {
    let (temp, path) = media();
    let config_file = temp.path().join("config.toml");
    fs::write(&config_file, "[decode]\npassthrough = false\n").unwrap();

    let mut cmd = asfclip_cmd();
    cmd.args([
        "--config",
        config_file.to_str().unwrap(),
        "extract",
        path.to_str().unwrap(),
        "-s",
        "1",
        "-t",
        "1.0",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("No decoder found"));
}

#[test]
fn test_cli_extract_with_config() {
    let (temp, path) = media();
    let config_file = temp.path().join("config.toml");
    fs::write(
        &config_file,
        r#"
[extract]
chunk_size = 700
audio_clip_secs = 1.0

[decode]
passthrough = true
"#,
    )
    .unwrap();

    let mut cmd = asfclip_cmd();
    cmd.args([
        "--config",
        config_file.to_str().unwrap(),
        "extract",
        path.to_str().unwrap(),
        "-s",
        "1",
        "-t",
        "2.0",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Boundary: 3.000s"))
    .stdout(predicate::str::contains("Complete: true"));
}

#[test]
fn test_cli_validate_config() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.toml");
    fs::write(&config_file, "[extract]\nchunk_size = 8192\n").unwrap();

    let mut cmd = asfclip_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("8192"));
}

#[test]
fn test_cli_config_validation() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("config.toml");
    fs::write(&config_file, "[extract]\nchunk_size = 0\n").unwrap();

    let mut cmd = asfclip_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk size"));
}
