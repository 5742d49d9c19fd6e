//! Configuration file model and validation
//!
//! [`Config`] mirrors the configuration file as written (YAML, JSON or TOML).
//! [`Config::into_run_config`] checks it and produces the immutable
//! [`RunConfig`] a run is driven by.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{ConfigResult, SettingsError, SettingsResult};
use crate::layer_groups::{LayerGroupConfig, LayerGroupResolver};
use ampes_core::{ConfigError, Point3, DEFAULT_SPEED_TOLERANCE};

/// Default digits after the decimal point in event-series rows
pub const DEFAULT_ES_PRECISION: usize = 6;
/// Default digits after the decimal point in time-series rows
pub const DEFAULT_TS_PRECISION: usize = 2;
/// Largest accepted precision
pub const MAX_PRECISION: usize = 15;

/// Power fluctuation distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluctuationScheme {
    /// Normal(0, deviation/3) clipped to ±deviation
    Gaussian,
    /// One of -deviation, 0, +deviation
    Strict,
    /// Continuous uniform on [-deviation, +deviation]
    Uniform,
}

impl FluctuationScheme {
    /// Every scheme, in documentation order
    pub const ALL: [FluctuationScheme; 3] = [Self::Gaussian, Self::Strict, Self::Uniform];

    /// Name as written in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Strict => "strict",
            Self::Uniform => "uniform",
        }
    }
}

impl fmt::Display for FluctuationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FluctuationScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidScheme {
                scheme: s.to_string(),
            })
    }
}

/// Track the roller travels along, in machine coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollerPath {
    /// X where a pass starts
    pub start_x: f64,
    /// X where a pass ends
    pub end_x: f64,
    /// Y of the track
    pub y: f64,
}

impl Default for RollerPath {
    fn default() -> Self {
        Self {
            start_x: -90.0,
            end_x: 90.0,
            y: 180.0,
        }
    }
}

/// Configuration file as written
///
/// Required keys are optional here so a missing one is reported by name
/// during [`Config::into_run_config`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named parameter groups, in document order
    #[serde(default, with = "ordered_groups")]
    pub layer_groups: Vec<(String, LayerGroupConfig)>,
    /// Intermediate points inserted per segment
    pub interval: Option<i64>,
    /// Nominal layer height (mm)
    pub layer_height: Option<f64>,
    /// Substrate thickness (mm)
    pub substrate: Option<f64>,
    /// Origin shift in X (mm)
    pub xorg_shift: Option<f64>,
    /// Origin shift in Y (mm)
    pub yorg_shift: Option<f64>,
    /// Origin shift in Z (mm)
    pub zorg_shift: Option<f64>,
    /// Insert dwell times
    pub dwell: Option<bool>,
    /// Emit roller passes between layers
    #[serde(default)]
    pub roller: bool,
    /// Roller pass duration (s)
    pub w_dwell: Option<f64>,
    /// Initial heat-up dwell (s)
    #[serde(alias = "i_dwell")]
    pub heatup_time: Option<f64>,
    /// Perturb heat-source power
    #[serde(default)]
    pub power_fluctuation: bool,
    /// Maximum power perturbation
    pub deviation: Option<f64>,
    /// Perturbation distribution name
    pub scheme: Option<String>,
    /// Seed of the fluctuation stream
    pub seed: Option<u64>,
    /// Insert section comments into the event series
    #[serde(default)]
    pub comment_event_series: bool,
    /// Comment prefix
    pub comment_string: Option<String>,
    /// Write the process-parameter summary
    #[serde(default)]
    pub process_param_request: bool,
    /// Write the time series
    #[serde(default)]
    pub time_series: bool,
    /// Samples between heat on and heat off per layer
    pub time_series_sample_points: Option<i64>,
    /// Event-series precision
    pub es_precision: Option<usize>,
    /// Time-series precision
    pub ts_precision: Option<usize>,
    /// Relative tolerance when matching g-code speeds to base speeds
    pub speed_tolerance: Option<f64>,
    /// Also write the full-field CSV
    #[serde(default)]
    pub event_series_csv: bool,
    /// Roller track
    pub roller_path: Option<RollerPath>,
}

impl Config {
    /// Load config from file (YAML, JSON or TOML, by extension)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let config = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            other => return Err(SettingsError::UnsupportedFormat(other.to_string())),
        };

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> SettingsResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a file and validate it in one step
    pub fn load_run_config(path: &Path) -> SettingsResult<RunConfig> {
        Ok(Self::load_from_file(path)?.into_run_config()?)
    }

    /// Validate the configuration and freeze it into a [`RunConfig`]
    pub fn into_run_config(self) -> ConfigResult<RunConfig> {
        let interval = required(self.interval, "interval")?;
        let interval = usize::try_from(interval).map_err(|_| ConfigError::InvalidValue {
            key: "interval".to_string(),
            reason: "must not be negative".to_string(),
        })?;

        let layer_height = required(self.layer_height, "layer_height")?;
        if !(layer_height.is_finite() && layer_height > 0.0) {
            return Err(invalid("layer_height", "must be positive"));
        }
        let substrate = required(self.substrate, "substrate")?;
        let origin_shift = Point3::new(
            required(self.xorg_shift, "xorg_shift")?,
            required(self.yorg_shift, "yorg_shift")?,
            required(self.zorg_shift, "zorg_shift")?,
        );
        let dwell = required(self.dwell, "dwell")?;

        let speed_tolerance = self.speed_tolerance.unwrap_or(DEFAULT_SPEED_TOLERANCE);
        if !(speed_tolerance >= 0.0 && speed_tolerance.is_finite()) {
            return Err(invalid("speed_tolerance", "must be a non-negative number"));
        }
        let layer_groups = LayerGroupResolver::from_config(&self.layer_groups, speed_tolerance)?;

        let roller = if self.roller {
            let w_dwell = conditional(self.w_dwell, "w_dwell", "roller")?;
            if !(w_dwell.is_finite() && w_dwell >= 0.0) {
                return Err(invalid("w_dwell", "must not be negative"));
            }
            if !dwell {
                return Err(invalid("roller", "dwell must be enabled if roller is enabled"));
            }
            if let Some(group) = layer_groups
                .groups()
                .iter()
                .find(|g| w_dwell > g.interlayer_dwell)
            {
                return Err(invalid(
                    "w_dwell",
                    &format!(
                        "must not exceed the interlayer_dwell of layer group '{}'",
                        group.name
                    ),
                ));
            }
            Some(RollerSettings {
                w_dwell,
                path: self.roller_path.unwrap_or_default(),
            })
        } else {
            None
        };

        let heatup_time = self.heatup_time.unwrap_or(0.0);
        if !(heatup_time.is_finite() && heatup_time >= 0.0) {
            return Err(invalid("heatup_time", "must not be negative"));
        }

        let fluctuation = if self.power_fluctuation {
            let deviation = conditional(self.deviation, "deviation", "power_fluctuation")?;
            let scheme = conditional(self.scheme, "scheme", "power_fluctuation")?;
            if !(deviation >= 0.0 && deviation.is_finite()) {
                return Err(invalid("deviation", "must be a non-negative number"));
            }
            Some(FluctuationSettings {
                scheme: scheme.parse()?,
                deviation,
            })
        } else {
            None
        };

        let comment_string = if self.comment_event_series {
            Some(conditional(
                self.comment_string,
                "comment_string",
                "comment_event_series",
            )?)
        } else {
            None
        };

        let time_series_sample_points = if self.time_series {
            let points = conditional(
                self.time_series_sample_points,
                "time_series_sample_points",
                "time_series",
            )?;
            let points = usize::try_from(points)
                .map_err(|_| invalid("time_series_sample_points", "must not be negative"))?;
            if points == 0 {
                warn!("Time series requested, but number of time points requested between layers is 0");
            }
            Some(points)
        } else {
            None
        };

        let es_precision = precision(self.es_precision, "es_precision", DEFAULT_ES_PRECISION)?;
        let ts_precision = precision(self.ts_precision, "ts_precision", DEFAULT_TS_PRECISION)?;

        Ok(RunConfig {
            layer_groups,
            interval,
            layer_height,
            substrate,
            origin_shift,
            dwell,
            roller,
            heatup_time,
            fluctuation,
            seed: self.seed,
            comment_string,
            process_param_request: self.process_param_request,
            time_series_sample_points,
            es_precision,
            ts_precision,
            event_series_csv: self.event_series_csv,
        })
    }
}

fn required<T>(value: Option<T>, key: &str) -> ConfigResult<T> {
    value.ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

fn conditional<T>(value: Option<T>, key: &str, condition: &str) -> ConfigResult<T> {
    value.ok_or_else(|| ConfigError::MissingConditional {
        key: key.to_string(),
        condition: condition.to_string(),
    })
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn precision(value: Option<usize>, key: &str, default: usize) -> ConfigResult<usize> {
    match value {
        None => Ok(default),
        Some(p) if p <= MAX_PRECISION => Ok(p),
        Some(_) => Err(invalid(key, &format!("must be at most {}", MAX_PRECISION))),
    }
}

/// Roller pass parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollerSettings {
    /// Duration of one pass (s)
    pub w_dwell: f64,
    /// Track of the pass
    pub path: RollerPath,
}

/// Power fluctuation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluctuationSettings {
    /// Distribution
    pub scheme: FluctuationScheme,
    /// Largest perturbation magnitude
    pub deviation: f64,
}

/// Validated, immutable parameters of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Layer groups and the detection signature
    pub layer_groups: LayerGroupResolver,
    /// Intermediate points per segment
    pub interval: usize,
    /// Nominal layer height (mm)
    pub layer_height: f64,
    /// Substrate thickness (mm)
    pub substrate: f64,
    /// Origin shift as configured
    pub origin_shift: Point3,
    /// Dwell times enabled
    pub dwell: bool,
    /// Roller passes, None when disabled
    pub roller: Option<RollerSettings>,
    /// Initial heat-up dwell (s)
    pub heatup_time: f64,
    /// Power fluctuation, None when disabled
    pub fluctuation: Option<FluctuationSettings>,
    /// Seed of the fluctuation stream
    pub seed: Option<u64>,
    /// Section comment prefix, None when comments are disabled
    pub comment_string: Option<String>,
    /// Write the process-parameter summary
    pub process_param_request: bool,
    /// Samples per layer, None when the time series is disabled
    pub time_series_sample_points: Option<usize>,
    /// Event-series precision
    pub es_precision: usize,
    /// Time-series precision
    pub ts_precision: usize,
    /// Write the full-field CSV
    pub event_series_csv: bool,
}

impl RunConfig {
    /// Offset added to every emitted coordinate
    ///
    /// Z is measured from the top of the substrate.
    pub fn origin_offset(&self) -> Point3 {
        Point3::new(
            self.origin_shift.x,
            self.origin_shift.y,
            self.origin_shift.z - self.substrate,
        )
    }

    /// Whether the time series is requested
    pub fn time_series(&self) -> bool {
        self.time_series_sample_points.is_some()
    }

    /// Copy with the fluctuation seed replaced
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if seed.is_some() {
            self.seed = seed;
        }
        self
    }
}

/// Order-preserving (de)serialization of the `layer_groups` map
mod ordered_groups {
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    use crate::layer_groups::LayerGroupConfig;

    type Groups = Vec<(String, LayerGroupConfig)>;

    pub fn serialize<S: Serializer>(groups: &Groups, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for (name, group) in groups {
            map.serialize_entry(name, group)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Groups, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = Groups;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of layer group names to layer groups")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Groups, A::Error> {
                let mut groups = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, group)) = access.next_entry::<String, LayerGroupConfig>()? {
                    groups.push((name, group));
                }
                Ok(groups)
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_GROUP: &str = r#"
layer_groups:
  group_one:
    infill:
      base_speed: 1000
      output_speed: 800
      power: 4000000
    contour:
      base_speed: 500
      output_speed: 600
      power: 2000000
    interlayer_dwell: 10
interval: 1
layer_height: 0.03
substrate: 0.0
xorg_shift: 0
yorg_shift: 0
zorg_shift: 0
dwell: false
"#;

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("strict".parse::<FluctuationScheme>().unwrap(), FluctuationScheme::Strict);
        assert_eq!(
            "poisson".parse::<FluctuationScheme>().unwrap_err(),
            ConfigError::InvalidScheme {
                scheme: "poisson".to_string()
            }
        );
    }

    #[test]
    fn test_single_group_defaults() {
        let run = Config::from_yaml_str(SINGLE_GROUP)
            .unwrap()
            .into_run_config()
            .unwrap();
        assert_eq!(run.interval, 1);
        assert_eq!(run.es_precision, DEFAULT_ES_PRECISION);
        assert_eq!(run.ts_precision, DEFAULT_TS_PRECISION);
        assert!(run.roller.is_none());
        assert!(run.fluctuation.is_none());
        assert!(!run.time_series());
        assert_eq!(run.heatup_time, 0.0);
        assert_eq!(run.layer_groups.groups().len(), 1);
    }

    #[test]
    fn test_missing_required_key() {
        let text = SINGLE_GROUP.replace("layer_height: 0.03\n", "");
        let err = Config::from_yaml_str(&text).unwrap().into_run_config().unwrap_err();
        assert_eq!(err, ConfigError::MissingKey("layer_height".to_string()));
    }

    #[test]
    fn test_conditional_keys() {
        let text = format!("{}power_fluctuation: true\ndeviation: 5\n", SINGLE_GROUP);
        let err = Config::from_yaml_str(&text).unwrap().into_run_config().unwrap_err();
        assert_eq!(err.to_string(), "'scheme' is required if 'power_fluctuation' is true");

        let text = format!("{}roller: true\n", SINGLE_GROUP);
        let err = Config::from_yaml_str(&text).unwrap().into_run_config().unwrap_err();
        assert_eq!(err.to_string(), "'w_dwell' is required if 'roller' is true");
    }

    #[test]
    fn test_roller_requires_dwell() {
        let text = format!("{}roller: true\nw_dwell: 2\n", SINGLE_GROUP);
        let err = Config::from_yaml_str(&text).unwrap().into_run_config().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "roller"));

        let text = format!("{}roller: true\nw_dwell: 12\n", SINGLE_GROUP).replace("dwell: false", "dwell: true");
        let err = Config::from_yaml_str(&text).unwrap().into_run_config().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "w_dwell"));
    }

    #[test]
    fn test_precision_bounds() {
        let text = format!("{}es_precision: 16\n", SINGLE_GROUP);
        let err = Config::from_yaml_str(&text).unwrap().into_run_config().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "es_precision"));
    }

    #[test]
    fn test_origin_offset_subtracts_substrate() {
        let text = SINGLE_GROUP
            .replace("substrate: 0.0", "substrate: 2.5")
            .replace("zorg_shift: 0", "zorg_shift: 1");
        let run = Config::from_yaml_str(&text).unwrap().into_run_config().unwrap();
        assert_eq!(run.origin_offset(), Point3::new(0.0, 0.0, -1.5));
    }
}
