//! G-Code parser and modal state tracking
//!
//! Turns a RepRap motion program into the ordered, layer-indexed waypoint
//! sequence every later stage works from. Only `G0`/`G1` moves produce
//! waypoints; `G90`/`G91`, `M82`/`M83` and `G92` update the modal state and
//! every other command is skipped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{GcodeCommand, MotionCode, ProcessorPipeline};
use ampes_core::{FeedRateUnits, GcodeError, Point3, Waypoint};

/// Two Z values closer than this are the same layer height
const Z_EPSILON: f64 = 1e-9;

/// Axis distance mode (G90 / G91)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMode {
    /// G90, coordinates are absolute
    #[default]
    Absolute,
    /// G91, coordinates are offsets from the current position
    Relative,
}

/// Extruder distance mode (M82 / M83)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtrusionMode {
    /// M82, E values are absolute
    #[default]
    Absolute,
    /// M83, E values are increments
    Relative,
}

/// Modal state while walking a program
///
/// Modal values persist across lines until another command in the same
/// group changes them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GcodeState {
    /// Active motion command, applied to axis-only lines
    pub motion: Option<MotionCode>,
    /// G90 / G91
    pub distance_mode: DistanceMode,
    /// M82 / M83
    pub extrusion_mode: ExtrusionMode,
    /// Current head position
    pub position: Point3,
    /// Current extruder axis value
    pub extruder: f64,
    /// Current feed rate in mm/s
    pub feed_rate: f64,
}

impl GcodeState {
    /// Create a new state at the machine origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the feed rate (mm/s)
    pub fn set_feed_rate(&mut self, rate: f64, line_number: usize) -> Result<(), GcodeError> {
        if rate < 0.0 {
            return Err(GcodeError::InvalidParameter {
                line_number,
                param: format!("F{}", rate),
                reason: "feed rate must not be negative".to_string(),
            });
        }
        self.feed_rate = rate;
        Ok(())
    }

    /// Resolve an axis word against the current value in the active distance mode
    fn axis_target(&self, current: f64, word: Option<f64>) -> f64 {
        match (word, self.distance_mode) {
            (None, _) => current,
            (Some(v), DistanceMode::Absolute) => v,
            (Some(v), DistanceMode::Relative) => current + v,
        }
    }

    /// Advance the extruder axis and report whether material was pushed
    fn advance_extruder(&mut self, word: Option<f64>) -> bool {
        let Some(e) = word else {
            return false;
        };
        match self.extrusion_mode {
            ExtrusionMode::Absolute => {
                let extrudes = e > self.extruder;
                self.extruder = e;
                extrudes
            }
            ExtrusionMode::Relative => {
                self.extruder += e;
                e > 0.0
            }
        }
    }
}

/// Layer bookkeeping for one parse
#[derive(Debug, Default)]
struct LayerTracker {
    /// Current layer, 0 until the first extruding move
    layer: u32,
    /// Z the current layer is printed at
    layer_z: f64,
    /// A G92 Z has been seen since the last layer change
    z_reset: bool,
}

/// Parses G-Code programs into waypoints
pub struct GcodeParser {
    pipeline: ProcessorPipeline,
    feed_units: FeedRateUnits,
}

impl GcodeParser {
    /// Create a parser using the standard preprocessor pipeline and mm/min feed rates
    pub fn new() -> Self {
        Self {
            pipeline: ProcessorPipeline::standard(),
            feed_units: FeedRateUnits::MmPerMin,
        }
    }

    /// Replace the preprocessor pipeline
    pub fn with_pipeline(mut self, pipeline: ProcessorPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Units the program's `F` words are written in
    pub fn with_feed_units(mut self, units: FeedRateUnits) -> Self {
        self.feed_units = units;
        self
    }

    /// Parse a whole program into layer-indexed waypoints
    ///
    /// # Errors
    /// - `InvalidParameter` for a non-numeric coordinate or speed word
    /// - `NegativeZ` when a layer would sit below zero
    /// - `NonMonotonicZ` when Z drops without a preceding `G92 Z`
    /// - `NoLayers` when the program never extrudes
    pub fn parse_program(&self, text: &str) -> Result<Vec<Waypoint>, GcodeError> {
        for (name, description) in self.pipeline.list_processors() {
            debug!("Preprocessor '{}': {}", name, description);
        }
        let commands = self.pipeline.process_program(text)?;

        let mut state = GcodeState::new();
        let mut layers = LayerTracker::default();
        let mut waypoints = Vec::new();
        let mut warned_inches = false;

        for command in &commands {
            match command.code() {
                Some(('G', 0)) | Some(('G', 1)) => {
                    state.motion = command.motion();
                    self.apply_move(command, &mut state, &mut layers, &mut waypoints)?;
                }
                Some(('G', 90)) => state.distance_mode = DistanceMode::Absolute,
                Some(('G', 91)) => state.distance_mode = DistanceMode::Relative,
                Some(('G', 92)) => apply_position_reset(command, &mut state, &mut layers)?,
                Some(('M', 82)) => state.extrusion_mode = ExtrusionMode::Absolute,
                Some(('M', 83)) => state.extrusion_mode = ExtrusionMode::Relative,
                Some(('G', 20)) if !warned_inches => {
                    warn!(
                        "Line {}: G20 (inches) is not supported, coordinates are read as mm",
                        command.line_number
                    );
                    warned_inches = true;
                }
                Some(_) => {}
                None => {
                    let has_axis = ['X', 'Y', 'Z', 'E', 'F'].iter().any(|l| command.has_word(*l));
                    if has_axis && state.motion.is_some() {
                        self.apply_move(command, &mut state, &mut layers, &mut waypoints)?;
                    }
                }
            }
        }

        if waypoints.is_empty() {
            return Err(GcodeError::NoLayers);
        }

        info!(
            "Parsed {} waypoints across {} layers",
            waypoints.len(),
            layers.layer
        );
        Ok(waypoints)
    }

    fn apply_move(
        &self,
        command: &GcodeCommand,
        state: &mut GcodeState,
        layers: &mut LayerTracker,
        waypoints: &mut Vec<Waypoint>,
    ) -> Result<(), GcodeError> {
        let x = command.param('X')?;
        let y = command.param('Y')?;
        let z = command.param('Z')?;
        let e = command.param('E')?;

        if let Some(f) = command.param('F')? {
            state.set_feed_rate(self.feed_units.to_mm_per_sec(f), command.line_number)?;
        }

        let current = state.position;
        let target = Point3::new(
            state.axis_target(current.x, x),
            state.axis_target(current.y, y),
            state.axis_target(current.z, z),
        );
        let extrudes = state.advance_extruder(e);
        let moved = target != current;

        if layers.layer == 0 {
            if !(extrudes && moved) {
                state.position = target;
                return Ok(());
            }
            if target.z < 0.0 {
                return Err(GcodeError::NegativeZ {
                    line_number: command.line_number,
                    z: target.z,
                });
            }
            layers.layer = 1;
            layers.layer_z = target.z;
            layers.z_reset = false;
            debug!(
                "Layer 1 starts at Z {} (line {})",
                target.z, command.line_number
            );
            waypoints.push(Waypoint {
                position: current,
                commanded_speed: state.feed_rate,
                layer: 1,
                is_travel: true,
                line_number: command.line_number,
            });
        } else if (target.z - layers.layer_z).abs() > Z_EPSILON
            && (target.z - current.z).abs() > Z_EPSILON
        {
            if target.z < 0.0 {
                return Err(GcodeError::NegativeZ {
                    line_number: command.line_number,
                    z: target.z,
                });
            }
            if target.z < layers.layer_z && !layers.z_reset {
                return Err(GcodeError::NonMonotonicZ {
                    line_number: command.line_number,
                    previous: layers.layer_z,
                    current: target.z,
                });
            }
            layers.layer += 1;
            layers.layer_z = target.z;
            layers.z_reset = false;
            debug!(
                "Layer {} starts at Z {} (line {})",
                layers.layer, target.z, command.line_number
            );
        }

        if moved {
            waypoints.push(Waypoint {
                position: target,
                commanded_speed: state.feed_rate,
                layer: layers.layer,
                is_travel: !extrudes,
                line_number: command.line_number,
            });
        }
        state.position = target;
        Ok(())
    }
}

impl Default for GcodeParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a `G92` position reset
///
/// A bare `G92` zeroes every axis. A reset that sets Z permits the next layer
/// change to move below the current layer.
fn apply_position_reset(
    command: &GcodeCommand,
    state: &mut GcodeState,
    layers: &mut LayerTracker,
) -> Result<(), GcodeError> {
    let x = command.param('X')?;
    let y = command.param('Y')?;
    let z = command.param('Z')?;
    let e = command.param('E')?;

    if x.is_none() && y.is_none() && z.is_none() && e.is_none() {
        state.position = Point3::default();
        state.extruder = 0.0;
        layers.z_reset = true;
        return Ok(());
    }

    if let Some(x) = x {
        state.position.x = x;
    }
    if let Some(y) = y {
        state.position.y = y;
    }
    if let Some(z) = z {
        state.position.z = z;
        layers.z_reset = true;
    }
    if let Some(e) = e {
        state.extruder = e;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<Waypoint>, GcodeError> {
        GcodeParser::new().parse_program(text)
    }

    #[test]
    fn test_state_setters() {
        let mut state = GcodeState::new();
        assert!(state.set_feed_rate(10.0, 1).is_ok());
        assert_eq!(state.feed_rate, 10.0);
        assert!(state.set_feed_rate(-1.0, 2).is_err());
    }

    #[test]
    fn test_relative_extrusion() {
        let mut state = GcodeState::new();
        state.extrusion_mode = ExtrusionMode::Relative;
        assert!(state.advance_extruder(Some(0.2)));
        assert!(!state.advance_extruder(Some(-1.0)));
        assert!(!state.advance_extruder(None));
    }

    #[test]
    fn test_start_gcode_does_not_open_layers() {
        let program = "\
G28
G1 Z5 F5000
G1 X10 Y10 F9000
G1 Z0.3
G1 X20 Y10 E1.0 F60000
";
        let wps = parse(program).unwrap();
        assert_eq!(wps.len(), 2);
        assert_eq!(wps[0].position, Point3::new(10.0, 10.0, 0.3));
        assert!(wps[0].is_travel);
        assert_eq!(wps[1].position, Point3::new(20.0, 10.0, 0.3));
        assert!(!wps[1].is_travel);
        assert_eq!(wps[1].commanded_speed, 1000.0);
        assert!(wps.iter().all(|w| w.layer == 1));
    }

    #[test]
    fn test_layer_increment_and_speed_inheritance() {
        let program = "\
G1 X0 Y0 Z0.3 F60000
G1 X10 E1
G1 Z0.6
G1 X0 E2
";
        let wps = parse(program).unwrap();
        let layers: Vec<u32> = wps.iter().map(|w| w.layer).collect();
        assert_eq!(layers, vec![1, 1, 2, 2]);
        assert!(wps.iter().all(|w| w.commanded_speed == 1000.0));
        assert!(wps[2].is_travel);
    }

    #[test]
    fn test_no_layers() {
        assert_eq!(parse("G28\nG1 Z5\n").unwrap_err(), GcodeError::NoLayers);
        assert_eq!(parse("").unwrap_err(), GcodeError::NoLayers);
    }

    #[test]
    fn test_retraction_is_travel() {
        let program = "G1 X0 Y0 Z0.3 F600\nG1 X1 E1\nG1 X2 E0.5\n";
        let wps = parse(program).unwrap();
        assert!(!wps[1].is_travel);
        assert!(wps[2].is_travel);
    }
}
