//! Data models shared by every pipeline stage
//!
//! This module provides:
//! - 3D positions and the linear algebra the interpolator needs
//! - Parsed waypoints with their layer index and commanded speed
//! - Section labels (infill / contour)
//! - Layer group parameter sets and the detection signature
//! - Event-series records (heat-source points, roller passes, time series)

pub mod events;
pub mod layer_group;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

pub use events::{InterpolatedPoint, RollerEvent, TimeSeriesKind, TimeSeriesPoint};
pub use layer_group::{DetectionSignature, LayerGroup, Scope, SectionParams};

/// A point in machine space (millimeters)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
}

impl Point3 {
    /// Create a point from its coordinates
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Point at fraction `t` of the way from `self` to `other`
    ///
    /// `t = 0` returns `self` exactly and `t = 1` returns `other` exactly.
    pub fn lerp(&self, other: &Point3, t: f64) -> Point3 {
        if t == 1.0 {
            return *other;
        }
        Point3 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Scan section of a heat-source move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Interior fill
    Infill,
    /// Boundary outline
    Contour,
}

impl Section {
    /// Both sections, infill first
    pub const ALL: [Section; 2] = [Section::Infill, Section::Contour];

    /// Lower-case name as used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Infill => "infill",
            Self::Contour => "contour",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed motion target
///
/// Produced by the parser in file order and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Target position
    pub position: Point3,
    /// Commanded speed in mm/s (gcode F / 60), inherited when the command has none
    pub commanded_speed: f64,
    /// 1-indexed layer number
    pub layer: u32,
    /// True when the move to this point does not extrude
    pub is_travel: bool,
    /// 1-indexed source line
    pub line_number: usize,
}

impl Waypoint {
    /// X coordinate
    pub fn x(&self) -> f64 {
        self.position.x
    }

    /// Y coordinate
    pub fn y(&self) -> f64 {
        self.position.y
    }

    /// Z coordinate
    pub fn z(&self) -> f64 {
        self.position.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_and_lerp() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 4.0, 12.0);
        assert_eq!(a.distance_to(&b), 13.0);

        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid, Point3::new(1.5, 2.0, 6.0));
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.0), a);
    }

    #[test]
    fn test_section_names() {
        assert_eq!(Section::Infill.to_string(), "infill");
        assert_eq!(Section::Contour.as_str(), "contour");
        let json = serde_json::to_string(&Section::Contour).unwrap();
        assert_eq!(json, "\"contour\"");
    }
}
