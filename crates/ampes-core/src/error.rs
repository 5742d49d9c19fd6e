//! Error handling for AMPES
//!
//! Provides the error taxonomy for every stage of an event-series run:
//! - G-Code errors (malformed or non-monotonic input)
//! - Classification errors (ambiguous section speeds)
//! - Layer group errors (layers no group covers)
//! - Configuration errors (missing or inconsistent parameters)
//!
//! All error types use `thiserror`. Every one of them is fatal to a run: the
//! pipeline never hands a partial event series to the writers.

use thiserror::Error;

/// G-Code error type
///
/// Raised by the parser when the motion program cannot be turned into an
/// ordered, layer-indexed waypoint sequence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// A coordinate or speed word carried a non-numeric value
    #[error("Invalid parameter '{param}' at line {line_number}: {reason}")]
    InvalidParameter {
        /// The line number where the invalid parameter was found.
        line_number: usize,
        /// The parameter word (e.g. "X12.a").
        param: String,
        /// The reason the parameter is invalid.
        reason: String,
    },

    /// A layer change moved below the build plate
    #[error("Negative Z {z} at line {line_number}")]
    NegativeZ {
        /// The line number of the offending command.
        line_number: usize,
        /// The commanded Z value.
        z: f64,
    },

    /// A layer change moved down without a G92 reset
    #[error("Non-monotonic Z at line {line_number}: {current} after {previous}")]
    NonMonotonicZ {
        /// The line number of the offending command.
        line_number: usize,
        /// Z of the layer being left.
        previous: f64,
        /// The commanded Z value.
        current: f64,
    },

    /// A move of non-zero length with no feed rate to time it by
    #[error("Move at line {line_number} has no feed rate")]
    MissingFeedRate {
        /// The line number of the offending command.
        line_number: usize,
    },

    /// The program contains no layered motion at all
    #[error("G-code contains no layered motion")]
    NoLayers,
}

impl GcodeError {
    /// Source line the error refers to, if any
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::InvalidParameter { line_number, .. }
            | Self::NegativeZ { line_number, .. }
            | Self::NonMonotonicZ { line_number, .. }
            | Self::MissingFeedRate { line_number } => Some(*line_number),
            Self::NoLayers => None,
        }
    }
}

/// Section classification error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    /// The commanded speed matches both the infill and the contour signature
    #[error(
        "Ambiguous speed {speed} mm/s at line {line_number}: matches infill ({infill} mm/s) and contour ({contour} mm/s)"
    )]
    AmbiguousSpeed {
        /// The line number of the offending move.
        line_number: usize,
        /// The commanded speed in mm/s.
        speed: f64,
        /// Infill base speed of the detection group.
        infill: f64,
        /// Contour base speed of the detection group.
        contour: f64,
    },
}

/// Layer group resolution error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerGroupError {
    /// No configured layer group covers the layer
    #[error("Layer {layer} is not covered by any layer group")]
    UnmappedLayer {
        /// The 1-indexed layer number.
        layer: u32,
    },
}

/// Configuration error type
///
/// Raised while turning a loaded configuration into a `RunConfig`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required key is absent
    #[error("Config does not contain expected key '{0}'")]
    MissingKey(String),

    /// A key required by an enabled switch is absent
    #[error("'{key}' is required if '{condition}' is true")]
    MissingConditional {
        /// The missing key.
        key: String,
        /// The switch that requires it.
        condition: String,
    },

    /// The detection group does not declare a base speed
    #[error("Layer group '{group}' must declare {section}.base_speed (the speed used in the g-code)")]
    MissingBaseSpeed {
        /// The group name.
        group: String,
        /// The section name ("infill" or "contour").
        section: String,
    },

    /// The detection group's base speeds cannot be told apart
    #[error("Layer group '{group}' has infill base speed {infill} mm/s and contour base speed {contour} mm/s, which cannot be told apart")]
    IndistinctBaseSpeeds {
        /// The group name.
        group: String,
        /// Infill base speed (mm/s).
        infill: f64,
        /// Contour base speed (mm/s).
        contour: f64,
    },

    /// A non-detection group does not declare an output speed
    #[error("Layer group '{group}' must declare {section}.output_speed")]
    MissingOutputSpeed {
        /// The group name.
        group: String,
        /// The section name ("infill" or "contour").
        section: String,
    },

    /// Unknown power fluctuation scheme
    #[error("Scheme '{scheme}' is not one of gaussian, strict, uniform")]
    InvalidScheme {
        /// The scheme name given.
        scheme: String,
    },

    /// A layer range is empty or starts below layer 1
    #[error("Layer group '{group}' has invalid layer range [{start}, {end}]")]
    InvalidRange {
        /// The group name.
        group: String,
        /// Range start.
        start: i64,
        /// Range end.
        end: i64,
    },

    /// Two layer ranges share a layer
    #[error("Layer groups '{first}' and '{second}' have overlapping layer ranges")]
    OverlappingRanges {
        /// The earlier group.
        first: String,
        /// The later group.
        second: String,
    },

    /// A group omits `layers` while other groups exist
    #[error("Layer group '{group}' must declare 'layers' when more than one group is configured")]
    ScopeWithoutRange {
        /// The group name.
        group: String,
    },

    /// A value is outside its permitted domain
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// The key.
        key: String,
        /// Why the value is rejected.
        reason: String,
    },

    /// `layer_groups` is empty
    #[error("At least one layer group must be configured")]
    NoLayerGroups,
}

/// Main error type for AMPES
///
/// A unified error type that can represent any error from all stages.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed G-Code input
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Ambiguous section classification
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    /// Layer not covered by configuration
    #[error(transparent)]
    LayerGroup(#[from] LayerGroupError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a malformed input error
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }

    /// Check if this is a classification error
    pub fn is_classification_error(&self) -> bool {
        matches!(self, Error::Classification(_))
    }

    /// Check if this is an unmapped layer error
    pub fn is_unmapped_layer(&self) -> bool {
        matches!(self, Error::LayerGroup(LayerGroupError::UnmappedLayer { .. }))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcode_error_display() {
        let err = GcodeError::NonMonotonicZ {
            line_number: 42,
            previous: 0.6,
            current: 0.3,
        };
        assert_eq!(err.to_string(), "Non-monotonic Z at line 42: 0.3 after 0.6");
        assert_eq!(err.line_number(), Some(42));
        assert_eq!(GcodeError::NoLayers.line_number(), None);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingConditional {
            key: "w_dwell".to_string(),
            condition: "roller".to_string(),
        };
        assert_eq!(err.to_string(), "'w_dwell' is required if 'roller' is true");

        let err = LayerGroupError::UnmappedLayer { layer: 129 };
        assert_eq!(err.to_string(), "Layer 129 is not covered by any layer group");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = LayerGroupError::UnmappedLayer { layer: 3 }.into();
        assert!(err.is_unmapped_layer());
        assert!(!err.is_config_error());

        let err: Error = GcodeError::MissingFeedRate { line_number: 7 }.into();
        assert!(err.is_malformed_input());

        let err: Error = ConfigError::NoLayerGroups.into();
        assert!(err.is_config_error());
    }
}
