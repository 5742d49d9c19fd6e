//! Cumulative timing of the interpolated path
//!
//! The accumulator walks the subdivided segments in order and stamps every
//! point with the time the head reaches it. Dwell phases (roller pass,
//! heat-up, interlayer pause) advance the clock without moving the head.
//!
//! ```text
//! Idle -> RollerDwell -> HeatUp -> Scanning <-> InterlayerDwell -> RollerDwell -> Scanning ... -> Done
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace, warn};

use crate::fluctuation::PowerFluctuator;
use crate::interpolate::SubdividedSegment;
use ampes_core::{Error, GcodeError, InterpolatedPoint, Point3, Result, RollerEvent, Section};
use ampes_gcode::Motion;
use ampes_settings::RunConfig;

/// Layer step mismatches smaller than this are not reported
const LAYER_HEIGHT_TOLERANCE: f64 = 1e-6;

/// Phase of the accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingPhase {
    /// Nothing emitted yet
    Idle,
    /// Roller pass in progress
    RollerDwell,
    /// Initial heat-up pause
    HeatUp,
    /// Moving with the heat source on
    Scanning(Section),
    /// Moving with the heat source off
    Travelling,
    /// Pause after a completed layer
    InterlayerDwell,
    /// Past the last waypoint
    Done,
}

impl fmt::Display for TimingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::RollerDwell => write!(f, "roller dwell"),
            Self::HeatUp => write!(f, "heat-up"),
            Self::Scanning(section) => write!(f, "scanning {}", section),
            Self::Travelling => write!(f, "travelling"),
            Self::InterlayerDwell => write!(f, "interlayer dwell"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Pivotal times of one layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerTiming {
    /// 1-indexed layer
    pub layer: u32,
    /// Start of the roller pass preparing the layer
    pub roller_on: Option<f64>,
    /// First heat-source-on of the layer
    pub heat_on: Option<f64>,
    /// Last heat-source-off of the layer
    pub heat_off: Option<f64>,
}

impl LayerTiming {
    fn new(layer: u32) -> Self {
        Self {
            layer,
            roller_on: None,
            heat_on: None,
            heat_off: None,
        }
    }
}

/// Timed event series before serialization
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    /// Heat-source event series
    pub points: Vec<InterpolatedPoint>,
    /// Roller passes in time order
    pub roller_events: Vec<RollerEvent>,
    /// Pivotal times per layer, in layer order
    pub layers: Vec<LayerTiming>,
    /// Time at which the last waypoint is reached
    pub total_time: f64,
}

/// Stamps interpolated points with cumulative time
pub struct TimingAccumulator<'a> {
    config: &'a RunConfig,
    offset: Point3,
}

impl<'a> TimingAccumulator<'a> {
    /// Create an accumulator for a run
    pub fn new(config: &'a RunConfig) -> Self {
        Self {
            config,
            offset: config.origin_offset(),
        }
    }

    /// Roller pass duration, 0 when the roller or dwell is disabled
    fn roller_time(&self) -> Option<f64> {
        self.config
            .roller
            .filter(|_| self.config.dwell)
            .map(|roller| roller.w_dwell)
    }

    /// Time every point of `segments`
    ///
    /// # Errors
    /// - `UnmappedLayer` when a layer has no parameter group
    /// - `MissingFeedRate` when a travel of non-zero length has no speed
    pub fn accumulate<R: Rng>(
        &self,
        segments: &[SubdividedSegment],
        fluctuator: &mut PowerFluctuator<R>,
    ) -> Result<Timeline> {
        let mut run = Run {
            time: 0.0,
            phase: TimingPhase::Idle,
            timeline: Timeline::default(),
            mismatched_steps: 0,
        };

        let Some(first) = segments.first() else {
            run.enter(TimingPhase::Done);
            return Ok(run.timeline);
        };

        let first_layer = first.segment.start.layer;
        run.timeline.layers.push(LayerTiming::new(first_layer));
        if let Some(w_dwell) = self.roller_time() {
            run.enter(TimingPhase::RollerDwell);
            self.roller_pass(&mut run, first_layer, first.segment.start.z(), w_dwell);
        }
        if self.config.dwell && self.config.heatup_time > 0.0 {
            run.enter(TimingPhase::HeatUp);
            run.time += self.config.heatup_time;
        }

        for sub in segments {
            let segment = &sub.segment;
            if segment.is_layer_change() {
                self.layer_boundary(&mut run, sub)?;
            }

            let group = self.config.layer_groups.resolve(segment.end.layer)?;
            let speed = match segment.motion {
                Motion::Scan(section) | Motion::Travel {
                    matched: Some(section),
                } => group.section(section).output_speed,
                Motion::Travel { matched: None } => segment.end.commanded_speed,
            };

            let length = segment.length();
            if length > 0.0 && speed <= 0.0 {
                return Err(Error::from(GcodeError::MissingFeedRate {
                    line_number: segment.end.line_number,
                }));
            }
            let step_time = if length > 0.0 {
                length / sub.points.len() as f64 / speed
            } else {
                0.0
            };

            let section = segment.motion.section();
            run.enter(match section {
                Some(section) => TimingPhase::Scanning(section),
                None => TimingPhase::Travelling,
            });
            let nominal = section.map_or(0.0, |s| group.section(s).power);

            if section.is_some() {
                let now = run.time;
                run.current_layer(segment.end.layer).heat_on.get_or_insert(now);
            }

            for point in &sub.points {
                let power = fluctuator.apply(nominal);
                run.timeline.points.push(InterpolatedPoint {
                    position: *point + self.offset,
                    time: run.time,
                    power,
                    laser_on: section.is_some(),
                    scan_speed: speed,
                    layer: segment.end.layer,
                    section,
                });
                run.time += step_time;
            }

            if section.is_some() {
                let time = run.time;
                run.current_layer(segment.end.layer).heat_off = Some(time);
            }
        }

        if let Some(last) = segments.last() {
            let end = last.segment.end;
            run.push_off_point(end.position + self.offset, end.layer);
        }
        run.enter(TimingPhase::Done);

        if run.mismatched_steps > 0 {
            warn!(
                "{} layer changes differ from the configured layer height of {} mm",
                run.mismatched_steps, self.config.layer_height
            );
        }

        run.timeline.total_time = run.time;
        debug!(
            "Timed {} points over {} layers, total time {:.3} s",
            run.timeline.points.len(),
            run.timeline.layers.len(),
            run.time
        );
        Ok(run.timeline)
    }

    /// Pause, roller pass, then hand over to the layer-change move
    fn layer_boundary(&self, run: &mut Run, sub: &SubdividedSegment) -> Result<()> {
        let segment = &sub.segment;
        let completed = segment.start.layer;
        let next = segment.end.layer;

        let step = segment.end.z() - segment.start.z();
        if (step - self.config.layer_height).abs() > LAYER_HEIGHT_TOLERANCE {
            debug!(
                "Layer {} -> {} steps {:.4} mm, configured layer height {} mm",
                completed, next, step, self.config.layer_height
            );
            run.mismatched_steps += 1;
        }

        let dwell = if self.config.dwell {
            self.config.layer_groups.resolve(completed)?.interlayer_dwell
        } else {
            0.0
        };
        let roller = self.roller_time();

        if dwell > 0.0 || roller.is_some() {
            run.push_off_point(segment.start.position + self.offset, completed);
        }
        if dwell > 0.0 {
            run.enter(TimingPhase::InterlayerDwell);
            run.time += dwell;
        }

        run.timeline.layers.push(LayerTiming::new(next));
        if let Some(w_dwell) = roller {
            run.enter(TimingPhase::RollerDwell);
            self.roller_pass(run, next, segment.end.z(), w_dwell);
        }
        Ok(())
    }

    fn roller_pass(&self, run: &mut Run, layer: u32, z: f64, w_dwell: f64) {
        let event = RollerEvent {
            layer,
            z: z + self.offset.z,
            start_time: run.time,
            end_time: run.time + w_dwell,
        };
        run.current_layer(layer).roller_on = Some(event.start_time);
        run.timeline.roller_events.push(event);
        run.time = event.end_time;
    }
}

/// Mutable state of one accumulation
struct Run {
    time: f64,
    phase: TimingPhase,
    timeline: Timeline,
    mismatched_steps: usize,
}

impl Run {
    fn enter(&mut self, phase: TimingPhase) {
        if self.phase != phase {
            trace!("{:.6} s: {} -> {}", self.time, self.phase, phase);
            self.phase = phase;
        }
    }

    /// Timing entry of `layer`, created if the layer has none yet
    fn current_layer(&mut self, layer: u32) -> &mut LayerTiming {
        let layers = &mut self.timeline.layers;
        if layers.last().map(|l| l.layer) != Some(layer) {
            layers.push(LayerTiming::new(layer));
        }
        let index = layers.len() - 1;
        &mut layers[index]
    }

    fn push_off_point(&mut self, position: Point3, layer: u32) {
        self.timeline.points.push(InterpolatedPoint {
            position,
            time: self.time,
            power: 0.0,
            laser_on: false,
            scan_speed: 0.0,
            layer,
            section: None,
        });
    }
}
