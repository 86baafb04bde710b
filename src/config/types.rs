use crate::pipeline::{ExtractOptions, DEFAULT_CHUNK_SIZE};
use asfclip_common::MediaTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub decode: DecodeConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExtractConfig {
    /// Bytes read from the data region per demultiplexer feed
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Length of an extracted audio clip in seconds
    #[serde(default = "default_audio_clip_secs")]
    pub audio_clip_secs: f64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            audio_clip_secs: default_audio_clip_secs(),
        }
    }
}

impl ExtractConfig {
    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            chunk_size: self.chunk_size,
            audio_clip: MediaTime::from_secs_f64(self.audio_clip_secs),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_audio_clip_secs() -> f64 {
    5.0
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DecodeConfig {
    /// Register the passthrough transform for every compressed audio and
    /// video subtype
    #[serde(default)]
    pub passthrough: bool,
}
