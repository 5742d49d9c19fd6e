//! Unit conversion utilities
//!
//! Gcode feed rates are written in mm/min while every speed in the
//! configuration and the event series is in mm/s.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Feed rate units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedRateUnits {
    /// Millimeters per minute (gcode F words)
    MmPerMin,
    /// Millimeters per second (configuration and output)
    MmPerSec,
}

impl FeedRateUnits {
    /// Convert `value` expressed in `self` to mm/s
    pub fn to_mm_per_sec(self, value: f64) -> f64 {
        match self {
            Self::MmPerMin => value / 60.0,
            Self::MmPerSec => value,
        }
    }

    /// Convert a mm/s `value` into `self`
    pub fn from_mm_per_sec(self, value: f64) -> f64 {
        match self {
            Self::MmPerMin => value * 60.0,
            Self::MmPerSec => value,
        }
    }
}

impl Default for FeedRateUnits {
    fn default() -> Self {
        Self::MmPerSec
    }
}

impl fmt::Display for FeedRateUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MmPerMin => write!(f, "mm/min"),
            Self::MmPerSec => write!(f, "mm/s"),
        }
    }
}
