//! Linear subdivision of classified segments

use ampes_core::Point3;
use ampes_gcode::ClassifiedSegment;

/// A classified segment with its subdivision points
///
/// `points` starts at the segment start and stops short of the segment end,
/// which the next segment supplies.
#[derive(Debug, Clone, PartialEq)]
pub struct SubdividedSegment {
    /// Segment being subdivided
    pub segment: ClassifiedSegment,
    /// `interval + 1` evenly spaced points
    pub points: Vec<Point3>,
}

/// Inserts evenly spaced points along every segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathInterpolator {
    interval: usize,
}

impl PathInterpolator {
    /// Create an interpolator inserting `interval` points per segment
    pub fn new(interval: usize) -> Self {
        Self { interval }
    }

    /// Intermediate points per segment
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Points each segment contributes (start plus intermediates)
    pub fn points_per_segment(&self) -> usize {
        self.interval + 1
    }

    /// Points from `start` towards `end` at fractions `k / (interval + 1)`
    pub fn subdivide(&self, start: Point3, end: Point3) -> Vec<Point3> {
        let steps = self.points_per_segment();
        (0..steps)
            .map(|k| start.lerp(&end, k as f64 / steps as f64))
            .collect()
    }

    /// Subdivide every segment in order
    pub fn interpolate(&self, segments: &[ClassifiedSegment]) -> Vec<SubdividedSegment> {
        segments
            .iter()
            .map(|segment| SubdividedSegment {
                segment: *segment,
                points: self.subdivide(segment.start.position, segment.end.position),
            })
            .collect()
    }
}
