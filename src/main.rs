mod cli;

use asfclip::{
    config,
    decoder::CodecRegistry,
    pipeline::SampleRecord,
    presentation::MediaController,
    session::ContainerSession,
    stream::StreamKind,
};
use asfclip_common::{Direction, MajorType, MediaTime};
use asfclip_media::{ContentDescription, DataRegion, FileProperties, MediaFormat};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// How long `extract` waits for the audio worker to finish the clip.
const PLAYBACK_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "asfclip=trace,asfclip_media=trace,asfclip_common=trace".to_string()
        } else {
            "asfclip=info,asfclip_media=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe { file, json } => probe_file(&file, json),
        Commands::Seek {
            file,
            stream,
            time,
            reverse,
            json,
        } => seek_file(&file, stream, time, reverse, json),
        Commands::Extract {
            file,
            stream,
            time,
            reverse,
            passthrough,
            json,
        } => extract_file(
            &file,
            cli.config.as_deref(),
            stream,
            time,
            reverse,
            passthrough,
            json,
        ),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("asfclip {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct StreamReport {
    stream_number: u16,
    major_type: MajorType,
    subtype: String,
    codec: Option<String>,
    compressed: bool,
    indexed: bool,
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    file: &'a Path,
    file_properties: &'a FileProperties,
    content_description: Option<&'a ContentDescription>,
    data: DataRegion,
    streams: Vec<StreamReport>,
}

fn codec_label(format: &MediaFormat) -> Option<String> {
    match format {
        MediaFormat::Audio(audio) => audio.codec_name().map(str::to_string),
        MediaFormat::Video(_) => Some(format.subtype().to_string()),
        MediaFormat::Other { .. } => None,
    }
}

fn open_session(
    file: &Path,
    registry: CodecRegistry,
) -> Result<ContainerSession<MediaController>> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    let mut session = ContainerSession::new(registry, MediaController::new());
    session
        .open(file)
        .with_context(|| format!("Failed to open {:?}", file))?;
    Ok(session)
}

fn seek_time(secs: f64) -> Result<MediaTime> {
    if !secs.is_finite() || secs < 0.0 {
        anyhow::bail!("Seek time must be a non-negative number of seconds, got {}", secs);
    }
    Ok(MediaTime::from_secs_f64(secs))
}

fn probe_file(file: &Path, json: bool) -> Result<()> {
    let session = open_session(file, CodecRegistry::new())?;
    let header = session.header().context("Container header missing after open")?;

    let streams: Vec<StreamReport> = header
        .streams
        .iter()
        .map(|s| StreamReport {
            stream_number: s.stream_number,
            major_type: s.major_type(),
            subtype: s.format.subtype().to_string(),
            codec: codec_label(&s.format),
            compressed: s.format.is_compressed(),
            indexed: session.is_indexed(s.stream_number),
        })
        .collect();

    let report = ProbeReport {
        file,
        file_properties: &header.file_properties,
        content_description: header.content_description.as_ref(),
        data: session.data_range(),
        streams,
    };

    if json {
        let json_str = serde_json::to_string_pretty(&report)?;
        println!("{}", json_str);
        return Ok(());
    }

    let props = report.file_properties;
    println!("File: {}", file.display());
    println!("File ID: {}", props.file_id);
    if let Some(created) = props.creation_time {
        println!("Created: {}", created);
    }
    println!("Size: {} bytes", props.file_size);
    println!("Duration: {}", props.presentation_duration());
    println!("Preroll: {}", props.preroll);
    println!(
        "Packets: {} ({}-{} bytes)",
        props.packet_count, props.min_packet_size, props.max_packet_size
    );
    println!("Max bitrate: {} bps", props.max_bitrate);
    println!("Seekable: {}", props.seekable);
    println!(
        "Data region: {} bytes at offset {}",
        report.data.length, report.data.offset
    );

    if let Some(desc) = report.content_description.filter(|d| !d.is_empty()) {
        if !desc.title.is_empty() {
            println!("Title: {}", desc.title);
        }
        if !desc.author.is_empty() {
            println!("Author: {}", desc.author);
        }
    }

    println!("\nStreams: {}", report.streams.len());
    for stream in &report.streams {
        print!(
            "  [{}] {} {}",
            stream.stream_number, stream.major_type, stream.subtype
        );
        if let Some(ref codec) = stream.codec {
            print!(" ({})", codec);
        }
        if !stream.compressed {
            print!(" [uncompressed]");
        }
        if stream.indexed {
            print!(" [indexed]");
        }
        println!();
    }

    Ok(())
}

fn seek_file(file: &Path, stream: u16, time: f64, reverse: bool, json: bool) -> Result<()> {
    let time = seek_time(time)?;
    let direction = Direction::from_reverse(reverse);

    // Selection needs a decoder binding; the passthrough one is enough to
    // resolve positions.
    let mut session = open_session(file, CodecRegistry::with_passthrough())?;
    session
        .select_stream(stream)
        .with_context(|| format!("Failed to select stream {}", stream))?;
    let result = session.resolve_seek(time, direction)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let data = session.data_range();
        println!("Stream: {}", stream);
        println!("Time: {} ({})", time, direction);
        println!("Data offset: {} bytes", result.byte_offset);
        let absolute = match direction {
            Direction::Forward => data.offset + result.byte_offset,
            Direction::Reverse => data.end().saturating_sub(result.byte_offset),
        };
        println!("File offset: {} bytes", absolute);
        match result.approx_time {
            Some(t) => println!("Index time: {}", t),
            None => println!("Index time: none (interpolated)"),
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn extract_file(
    file: &Path,
    config_path: Option<&Path>,
    stream: u16,
    time: f64,
    reverse: bool,
    passthrough: bool,
    json: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let time = seek_time(time)?;
    let direction = Direction::from_reverse(reverse);

    let mut registry = config::build_registry(&config);
    if passthrough && !config.decode.passthrough {
        registry.register_passthrough();
    }

    let mut session = open_session(file, registry)?.with_options(config.extract.options());
    session
        .select_stream(stream)
        .with_context(|| format!("Failed to select stream {}", stream))?;
    let kind = session
        .selected()
        .map(|s| s.kind)
        .context("No stream selected")?;

    let mut records: Vec<SampleRecord> = Vec::new();
    let summary = session.extract(time, direction, &mut |record: &SampleRecord| {
        if !json {
            let time = record
                .presentation_time
                .map_or_else(|| "-".to_string(), |t| t.to_string());
            println!(
                "  stream {} time {} buffers {} bytes {}{}",
                record.stream_number,
                time,
                record.buffer_count,
                record.total_length,
                if record.key_frame { " [key frame]" } else { "" }
            );
        }
        records.push(*record);
    })?;

    let controller = session.presentation_mut();
    let clip_bytes = controller.clip().len();
    let clip_duration = controller.clip_duration();
    let frame = controller.frame().map(|f| (f.width(), f.height()));

    if kind == StreamKind::Audio && clip_bytes > 0 {
        controller.play_clip()?;
        if let Some(done) = controller.wait_completion(PLAYBACK_TIMEOUT) {
            done.result.context("Audio playback failed")?;
        }
    }

    if json {
        let out = serde_json::json!({
            "summary": summary,
            "records": records,
            "clip_bytes": clip_bytes,
            "clip_duration": clip_duration,
            "frame": frame.map(|(width, height)| {
                serde_json::json!({ "width": width, "height": height })
            }),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "Seek: {} {} -> data offset {}",
        time, direction, summary.seek.byte_offset
    );
    println!("Boundary: {}", summary.window.boundary);
    println!("Samples: {}", summary.samples);
    println!("Bytes read: {}", summary.bytes_read);
    println!("Complete: {}", summary.complete);
    match kind {
        StreamKind::Audio => println!("Clip: {} bytes ({})", clip_bytes, clip_duration),
        StreamKind::Video => match frame {
            Some((width, height)) => println!("Frame: {}x{}", width, height),
            None => println!("Frame: none"),
        },
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Chunk size: {} bytes", config.extract.chunk_size);
            println!("  Audio clip: {}s", config.extract.audio_clip_secs);
            println!("  Passthrough: {}", config.decode.passthrough);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Chunk size: {} bytes", config.extract.chunk_size);
            println!("  Audio clip: {}s", config.extract.audio_clip_secs);
        }
    }

    Ok(())
}
