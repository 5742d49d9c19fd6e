//! Layer group parameter sets
//!
//! A layer group binds print parameters to a contiguous range of build layers.
//! The first group of a configuration also carries the speed signature used to
//! recognise infill and contour moves in the gcode for the whole file.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Section;
use crate::error::ConfigError;

/// Default relative tolerance for matching a commanded speed to a base speed
pub const DEFAULT_SPEED_TOLERANCE: f64 = 1e-6;

/// Layers a group applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Every layer (only valid for a sole group)
    All,
    /// Inclusive 1-indexed layer interval
    Range {
        /// First layer
        start: u32,
        /// Last layer
        end: u32,
    },
}

impl Scope {
    /// Whether the scope covers `layer`
    pub fn contains(&self, layer: u32) -> bool {
        match *self {
            Scope::All => true,
            Scope::Range { start, end } => (start..=end).contains(&layer),
        }
    }

    /// Whether two scopes share at least one layer
    pub fn overlaps(&self, other: &Scope) -> bool {
        match (*self, *other) {
            (Scope::All, _) | (_, Scope::All) => true,
            (Scope::Range { start: a0, end: a1 }, Scope::Range { start: b0, end: b1 }) => {
                a0 <= b1 && b0 <= a1
            }
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "all"),
            Scope::Range { start, end } => write!(f, "[{}, {}]", start, end),
        }
    }
}

/// Speeds and power of one section within a group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionParams {
    /// Speed used in the gcode for this section (mm/s), detection group only
    pub base_speed: Option<f64>,
    /// Speed the event series is timed with (mm/s)
    pub output_speed: f64,
    /// Nominal heat-source power
    pub power: f64,
}

/// Resolved parameter set for a range of layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGroup {
    /// Group name as written in the configuration
    pub name: String,
    /// Layers the group applies to
    pub scope: Scope,
    /// Infill parameters
    pub infill: SectionParams,
    /// Contour parameters
    pub contour: SectionParams,
    /// Pause after each layer of this group (seconds)
    pub interlayer_dwell: f64,
}

impl LayerGroup {
    /// Parameters of `section`
    pub fn section(&self, section: Section) -> &SectionParams {
        match section {
            Section::Infill => &self.infill,
            Section::Contour => &self.contour,
        }
    }
}

/// Speed signature used to label gcode moves as infill or contour
///
/// Computed once from the detection group and passed explicitly to the
/// classifier, so later groups never need a `base_speed` of their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionSignature {
    /// Infill base speed (mm/s)
    pub infill: f64,
    /// Contour base speed (mm/s)
    pub contour: f64,
    /// Relative match tolerance
    pub tolerance: f64,
}

impl DetectionSignature {
    /// Build the signature from the detection group's base speeds
    ///
    /// # Errors
    /// - `MissingBaseSpeed` when a section has no base speed
    /// - `IndistinctBaseSpeeds` when the two base speeds match each other
    pub fn from_group(group: &LayerGroup, tolerance: f64) -> Result<Self, ConfigError> {
        let base = |section: Section| {
            group
                .section(section)
                .base_speed
                .ok_or_else(|| ConfigError::MissingBaseSpeed {
                    group: group.name.clone(),
                    section: section.to_string(),
                })
        };

        let signature = Self {
            infill: base(Section::Infill)?,
            contour: base(Section::Contour)?,
            tolerance,
        };
        if signature.matches(Section::Infill, signature.contour) {
            return Err(ConfigError::IndistinctBaseSpeeds {
                group: group.name.clone(),
                infill: signature.infill,
                contour: signature.contour,
            });
        }
        Ok(signature)
    }

    /// Base speed of `section`
    pub fn speed(&self, section: Section) -> f64 {
        match section {
            Section::Infill => self.infill,
            Section::Contour => self.contour,
        }
    }

    /// Whether `speed` matches the base speed of `section`
    pub fn matches(&self, section: Section, speed: f64) -> bool {
        let reference = self.speed(section);
        let scale = reference.abs().max(speed.abs()).max(1.0);
        (speed - reference).abs() <= self.tolerance * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(infill_base: Option<f64>) -> LayerGroup {
        LayerGroup {
            name: "group_one".to_string(),
            scope: Scope::All,
            infill: SectionParams {
                base_speed: infill_base,
                output_speed: 800.0,
                power: 4_000_000.0,
            },
            contour: SectionParams {
                base_speed: Some(500.0),
                output_speed: 600.0,
                power: 2_000_000.0,
            },
            interlayer_dwell: 10.0,
        }
    }

    #[test]
    fn test_scope_contains_and_overlaps() {
        let a = Scope::Range { start: 1, end: 95 };
        let b = Scope::Range { start: 96, end: 128 };
        assert!(a.contains(95));
        assert!(!a.contains(96));
        assert!(b.contains(96));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Scope::Range { start: 95, end: 100 }));
        assert!(Scope::All.overlaps(&b));
        assert_eq!(a.to_string(), "[1, 95]");
    }

    #[test]
    fn test_signature_matching() {
        let sig = DetectionSignature::from_group(&group(Some(1000.0)), DEFAULT_SPEED_TOLERANCE)
            .unwrap();
        assert!(sig.matches(Section::Infill, 1000.0));
        assert!(sig.matches(Section::Infill, 60000.0 / 60.0));
        assert!(!sig.matches(Section::Infill, 1001.0));
        assert!(sig.matches(Section::Contour, 500.0));
    }

    #[test]
    fn test_signature_requires_base_speed() {
        let err = DetectionSignature::from_group(&group(None), DEFAULT_SPEED_TOLERANCE)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingBaseSpeed {
                group: "group_one".to_string(),
                section: "infill".to_string(),
            }
        );
    }

    #[test]
    fn test_signature_rejects_matching_base_speeds() {
        let err = DetectionSignature::from_group(&group(Some(500.0)), DEFAULT_SPEED_TOLERANCE)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::IndistinctBaseSpeeds { ref group, .. } if group == "group_one"
        ));
    }
}
