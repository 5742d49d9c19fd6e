//! End-to-end event-series generation for one g-code program

use rand::Rng;
use tracing::info;

use crate::fluctuation::PowerFluctuator;
use crate::interpolate::PathInterpolator;
use crate::time_series::TimeSeriesExtractor;
use crate::timing::{LayerTiming, TimingAccumulator};
use ampes_core::{InterpolatedPoint, Result, RollerEvent, TimeSeriesPoint};
use ampes_gcode::{GcodeParser, SectionClassifier};
use ampes_settings::RunConfig;

/// Everything one run produces, ready for the writers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventSeries {
    /// Heat-source event series
    pub points: Vec<InterpolatedPoint>,
    /// Roller passes, empty when the roller is disabled
    pub roller_events: Vec<RollerEvent>,
    /// Pivotal timestamps, empty when the time series is disabled
    pub time_series: Vec<TimeSeriesPoint>,
    /// Pivotal times per layer
    pub layers: Vec<LayerTiming>,
    /// Build duration in seconds
    pub total_time: f64,
}

impl EventSeries {
    /// Number of layers in the build
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// Runs parse, classification, interpolation, timing and extraction in order
///
/// Every stage completes before the next starts and any error aborts the
/// run, so no partial series is ever returned.
pub struct EventSeriesGenerator<'a> {
    config: &'a RunConfig,
    parser: GcodeParser,
}

impl<'a> EventSeriesGenerator<'a> {
    /// Create a generator for a validated configuration
    pub fn new(config: &'a RunConfig) -> Self {
        Self {
            config,
            parser: GcodeParser::new(),
        }
    }

    /// Replace the g-code parser
    pub fn with_parser(mut self, parser: GcodeParser) -> Self {
        self.parser = parser;
        self
    }

    /// Generate with the fluctuation stream the configuration describes
    pub fn run(&self, gcode: &str) -> Result<EventSeries> {
        let mut fluctuator = PowerFluctuator::from_config(self.config);
        self.run_with(gcode, &mut fluctuator)
    }

    /// Generate with an explicit fluctuator
    pub fn run_with<R: Rng>(
        &self,
        gcode: &str,
        fluctuator: &mut PowerFluctuator<R>,
    ) -> Result<EventSeries> {
        info!("Reading g-code");
        let waypoints = self.parser.parse_program(gcode)?;

        let resolver = &self.config.layer_groups;
        let max_layer = waypoints.iter().map(|w| w.layer).max().unwrap_or(0);
        resolver.ensure_covers(max_layer)?;

        let classifier = SectionClassifier::new(*resolver.signature());
        let segments = classifier.classify(&waypoints)?;

        let interpolator = PathInterpolator::new(self.config.interval);
        let subdivided = interpolator.interpolate(&segments);

        info!("Populating event series output");
        let timeline = TimingAccumulator::new(self.config).accumulate(&subdivided, fluctuator)?;

        let time_series = TimeSeriesExtractor::from_config(self.config).extract(&timeline.layers);

        info!(
            "Generated {} event points over {} layers ({:.2} s)",
            timeline.points.len(),
            timeline.layers.len(),
            timeline.total_time
        );

        Ok(EventSeries {
            points: timeline.points,
            roller_events: timeline.roller_events,
            time_series,
            layers: timeline.layers,
            total_time: timeline.total_time,
        })
    }
}
