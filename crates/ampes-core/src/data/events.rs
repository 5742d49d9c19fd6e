//! Event-series records handed to the writers

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Point3, Section};

/// One row of the heat-source event series
///
/// The state it carries (power, on/off, speed) holds from `time` until the
/// next point's time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedPoint {
    /// Position with the origin offset already applied
    pub position: Point3,
    /// Cumulative time in seconds
    pub time: f64,
    /// Heat-source power (0 when off)
    pub power: f64,
    /// Heat source on
    pub laser_on: bool,
    /// Speed of the move starting here (mm/s, 0 while dwelling)
    pub scan_speed: f64,
    /// 1-indexed layer
    pub layer: u32,
    /// Section of the move starting here, None for travel and dwell
    pub section: Option<Section>,
}

/// One roller/wiper pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollerEvent {
    /// Layer the pass prepares
    pub layer: u32,
    /// Z of the pass with the origin offset applied
    pub z: f64,
    /// Pass start (seconds)
    pub start_time: f64,
    /// Pass end (seconds)
    pub end_time: f64,
}

impl RollerEvent {
    /// Pass duration
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Kind of a salient simulation timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSeriesKind {
    /// Roller pass starts
    RollerOn,
    /// First heat-source-on of a layer
    HeatOn,
    /// Last heat-source-off of a layer
    HeatOff,
    /// Uniform sample between heat on and heat off
    Sampled,
}

impl fmt::Display for TimeSeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RollerOn => write!(f, "roller_on"),
            Self::HeatOn => write!(f, "heat_on"),
            Self::HeatOff => write!(f, "heat_off"),
            Self::Sampled => write!(f, "sampled"),
        }
    }
}

/// A salient simulation timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Time in seconds
    pub time: f64,
    /// What happens at this time
    pub kind: TimeSeriesKind,
    /// Layer the timestamp belongs to
    pub layer: u32,
}
