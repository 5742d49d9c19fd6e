//! Pivotal simulation timestamps

use tracing::debug;

use crate::timing::LayerTiming;
use ampes_core::{TimeSeriesKind, TimeSeriesPoint};
use ampes_settings::RunConfig;

/// Derives roller-on, heat-on, heat-off and sampled times per layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesExtractor {
    sample_points: Option<usize>,
}

impl TimeSeriesExtractor {
    /// Extractor emitting `sample_points` samples per layer, disabled on None
    pub fn new(sample_points: Option<usize>) -> Self {
        Self { sample_points }
    }

    /// Extractor for a run
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.time_series_sample_points)
    }

    /// Whether any output is produced
    pub fn is_enabled(&self) -> bool {
        self.sample_points.is_some()
    }

    /// Flat, time-ordered timestamps across all layers
    pub fn extract(&self, layers: &[LayerTiming]) -> Vec<TimeSeriesPoint> {
        let Some(samples) = self.sample_points else {
            return Vec::new();
        };

        let mut series = Vec::with_capacity(layers.len() * (samples + 3));
        for timing in layers {
            let layer = timing.layer;
            if let Some(time) = timing.roller_on {
                series.push(TimeSeriesPoint {
                    time,
                    kind: TimeSeriesKind::RollerOn,
                    layer,
                });
            }

            let (Some(on), Some(off)) = (timing.heat_on, timing.heat_off) else {
                continue;
            };
            series.push(TimeSeriesPoint {
                time: on,
                kind: TimeSeriesKind::HeatOn,
                layer,
            });
            for k in 1..=samples {
                series.push(TimeSeriesPoint {
                    time: on + (off - on) * k as f64 / (samples + 1) as f64,
                    kind: TimeSeriesKind::Sampled,
                    layer,
                });
            }
            series.push(TimeSeriesPoint {
                time: off,
                kind: TimeSeriesKind::HeatOff,
                layer,
            });
        }

        debug!("Extracted {} time series points", series.len());
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers() -> Vec<LayerTiming> {
        vec![
            LayerTiming {
                layer: 1,
                roller_on: Some(0.0),
                heat_on: Some(5.0),
                heat_off: Some(9.0),
            },
            LayerTiming {
                layer: 2,
                roller_on: Some(20.0),
                heat_on: None,
                heat_off: None,
            },
        ]
    }

    #[test]
    fn test_disabled_is_empty() {
        assert!(TimeSeriesExtractor::new(None).extract(&layers()).is_empty());
    }

    #[test]
    fn test_samples_between_on_and_off() {
        let series = TimeSeriesExtractor::new(Some(3)).extract(&layers());
        let times: Vec<f64> = series.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 5.0, 6.0, 7.0, 8.0, 9.0, 20.0]);
        assert_eq!(series[0].kind, TimeSeriesKind::RollerOn);
        assert_eq!(series[1].kind, TimeSeriesKind::HeatOn);
        assert_eq!(series[5].kind, TimeSeriesKind::HeatOff);
        assert_eq!(series[6].layer, 2);
    }

    #[test]
    fn test_zero_samples_keeps_pivots() {
        let series = TimeSeriesExtractor::new(Some(0)).extract(&layers());
        assert_eq!(series.len(), 4);
    }
}
