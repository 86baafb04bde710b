//! Core type definitions for streams and playback direction.
//!
//! All enums serialize in lowercase so they read naturally in the CLI's JSON
//! output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Major media type of a container stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MajorType {
    /// Audio stream.
    Audio,
    /// Video stream.
    Video,
    /// Any other stream kind (command, image, file transfer, ...).
    Other,
}

impl MajorType {
    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio)
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video)
    }
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Scan and playback direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn is_reverse(&self) -> bool {
        matches!(self, Self::Reverse)
    }

    /// Build from a `reverse` flag.
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Self::Reverse
        } else {
            Self::Forward
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Reverse => write!(f, "reverse"),
        }
    }
}
