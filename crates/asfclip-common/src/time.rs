//! Presentation time in 100-nanosecond units.
//!
//! ASF stores durations in 100-ns ticks and payload timestamps in
//! milliseconds. All timing inside asfclip is carried as [`MediaTime`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Number of 100-ns ticks per millisecond.
pub const TICKS_PER_MILLI: i64 = 10_000;

/// Number of 100-ns ticks per second.
pub const TICKS_PER_SEC: i64 = 10_000_000;

/// A signed timestamp or duration measured in 100-nanosecond ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaTime(i64);

impl MediaTime {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    /// Create from raw 100-ns ticks.
    pub const fn from_hns(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Create from milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(TICKS_PER_MILLI))
    }

    /// Create from fractional seconds, rounding to the nearest tick.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * TICKS_PER_SEC as f64).round() as i64)
    }

    /// Raw 100-ns ticks.
    pub const fn as_hns(self) -> i64 {
        self.0
    }

    /// Whole milliseconds (truncated).
    pub const fn as_millis(self) -> i64 {
        self.0 / TICKS_PER_MILLI
    }

    /// Fractional seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / TICKS_PER_SEC as f64
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0).max(0))
    }

    /// Add without overflow.
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Clamp into `[min, max]`.
    pub fn clamp_to(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }
}

impl Add for MediaTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for MediaTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}
