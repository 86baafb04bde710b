//! Asfclip-Common: Shared types, constants, and utilities.
//!
//! This crate provides the vocabulary used across asfclip:
//!
//! - **Error Handling**: the unified [`Error`] enum and [`Result`] alias
//! - **Media Time**: [`MediaTime`], a signed count of 100-nanosecond units
//! - **Core Types**: [`MajorType`] and playback [`Direction`]
//!
//! # Examples
//!
//! ```
//! use asfclip_common::{Direction, Error, MediaTime, Result};
//!
//! let seek = MediaTime::from_secs_f64(2.5);
//! assert_eq!(seek.as_millis(), 2500);
//! assert!(Direction::Reverse.is_reverse());
//!
//! fn example() -> Result<()> {
//!     Err(Error::NotInitialized)
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use time::MediaTime;
pub use types::*;
