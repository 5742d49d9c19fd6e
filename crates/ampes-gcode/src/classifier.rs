//! Infill / contour classification by speed signature

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ampes_core::{ClassificationError, DetectionSignature, Section, Waypoint};

/// What the head does along a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Motion {
    /// Heat source on, scanning the given section
    Scan(Section),
    /// Heat source off
    Travel {
        /// Section whose base speed the move was commanded at, if any
        matched: Option<Section>,
    },
}

impl Motion {
    /// Section being scanned, None for travel
    pub fn section(&self) -> Option<Section> {
        match self {
            Motion::Scan(section) => Some(*section),
            Motion::Travel { .. } => None,
        }
    }

    /// Whether the heat source is on
    pub fn is_scan(&self) -> bool {
        matches!(self, Motion::Scan(_))
    }
}

/// A waypoint pair with its motion label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSegment {
    /// Segment start
    pub start: Waypoint,
    /// Segment end, carrying the commanded speed and extrusion of the move
    pub end: Waypoint,
    /// Label
    pub motion: Motion,
}

impl ClassifiedSegment {
    /// Straight-line length of the segment
    pub fn length(&self) -> f64 {
        self.start.position.distance_to(&self.end.position)
    }

    /// Whether the segment crosses into a new layer
    pub fn is_layer_change(&self) -> bool {
        self.start.layer != self.end.layer
    }
}

/// Labels moves as infill or contour using the detection group's base speeds
///
/// The same signature applies to every layer of the file, whichever group
/// later supplies the output parameters.
#[derive(Debug, Clone, Copy)]
pub struct SectionClassifier {
    signature: DetectionSignature,
}

impl SectionClassifier {
    /// Create a classifier for a detection signature
    pub fn new(signature: DetectionSignature) -> Self {
        Self { signature }
    }

    /// The signature in use
    pub fn signature(&self) -> &DetectionSignature {
        &self.signature
    }

    /// Section whose base speed `speed` matches
    ///
    /// # Errors
    /// `AmbiguousSpeed` when the speed is within tolerance of both sections.
    pub fn classify_speed(
        &self,
        speed: f64,
        line_number: usize,
    ) -> Result<Option<Section>, ClassificationError> {
        let infill = self.signature.matches(Section::Infill, speed);
        let contour = self.signature.matches(Section::Contour, speed);

        match (infill, contour) {
            (true, true) => Err(ClassificationError::AmbiguousSpeed {
                line_number,
                speed,
                infill: self.signature.infill,
                contour: self.signature.contour,
            }),
            (true, false) => Ok(Some(Section::Infill)),
            (false, true) => Ok(Some(Section::Contour)),
            (false, false) => Ok(None),
        }
    }

    /// Label every consecutive waypoint pair
    ///
    /// A segment scans when its end waypoint extrudes at a recognised speed,
    /// including an extruding move that steps up to the next layer.
    /// Everything else is travel.
    pub fn classify(
        &self,
        waypoints: &[Waypoint],
    ) -> Result<Vec<ClassifiedSegment>, ClassificationError> {
        let mut segments = Vec::with_capacity(waypoints.len().saturating_sub(1));
        let mut unmatched_extrusions = 0usize;
        let mut first_unmatched = None;

        for pair in waypoints.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let matched = self.classify_speed(end.commanded_speed, end.line_number)?;

            let motion = match matched {
                Some(section) if !end.is_travel => Motion::Scan(section),
                _ => {
                    if matched.is_none() && !end.is_travel {
                        unmatched_extrusions += 1;
                        first_unmatched.get_or_insert(end.line_number);
                    }
                    Motion::Travel { matched }
                }
            };

            segments.push(ClassifiedSegment { start, end, motion });
        }

        if let Some(line) = first_unmatched {
            warn!(
                "{} extruding moves (first at line {}) match neither infill ({} mm/s) nor contour ({} mm/s) and are treated as travel",
                unmatched_extrusions, line, self.signature.infill, self.signature.contour
            );
        }

        debug!(
            "Classified {} segments, {} scanning",
            segments.len(),
            segments.iter().filter(|s| s.motion.is_scan()).count()
        );
        Ok(segments)
    }
}
