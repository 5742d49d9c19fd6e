//! Layer group resolution
//!
//! Turns the `layer_groups` section of a configuration into validated
//! [`LayerGroup`]s and maps build layers onto them. Groups are few (one or
//! two in practice) so lookup is a linear containment scan.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigResult;
use ampes_core::{
    ConfigError, DetectionSignature, LayerGroup, LayerGroupError, Scope, Section, SectionParams,
};

/// One section of a layer group as written in the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Speed used in the g-code for this section (mm/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_speed: Option<f64>,
    /// Speed the event series is timed with (mm/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_speed: Option<f64>,
    /// Heat-source power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
}

/// One layer group as written in the configuration file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerGroupConfig {
    /// Inclusive `[start, end]` layer range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<i64>>,
    /// Infill parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infill: Option<SectionConfig>,
    /// Contour parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contour: Option<SectionConfig>,
    /// Pause after each layer of the group (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interlayer_dwell: Option<f64>,
}

/// Maps layers to their parameter group
///
/// The first group is the detection group: its base speeds form the
/// [`DetectionSignature`] used to classify every move of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGroupResolver {
    groups: Vec<LayerGroup>,
    signature: DetectionSignature,
}

impl LayerGroupResolver {
    /// Build a resolver from already-resolved groups
    ///
    /// # Errors
    /// - `NoLayerGroups` when `groups` is empty
    /// - `ScopeWithoutRange` when a group without range is not the sole group
    /// - `OverlappingRanges` when two groups share a layer
    /// - `MissingBaseSpeed` when the detection group lacks a base speed
    /// - `IndistinctBaseSpeeds` when its infill and contour base speeds match
    pub fn new(groups: Vec<LayerGroup>, tolerance: f64) -> ConfigResult<Self> {
        let detection = groups.first().ok_or(ConfigError::NoLayerGroups)?;
        let signature = DetectionSignature::from_group(detection, tolerance)?;

        if groups.len() > 1 {
            if let Some(group) = groups.iter().find(|g| g.scope == Scope::All) {
                return Err(ConfigError::ScopeWithoutRange {
                    group: group.name.clone(),
                });
            }
        }

        for (i, first) in groups.iter().enumerate() {
            for second in &groups[i + 1..] {
                if first.scope.overlaps(&second.scope) {
                    return Err(ConfigError::OverlappingRanges {
                        first: first.name.clone(),
                        second: second.name.clone(),
                    });
                }
            }
        }

        Ok(Self { groups, signature })
    }

    /// Validate configuration groups (in document order) and build a resolver
    pub fn from_config(
        groups: &[(String, LayerGroupConfig)],
        tolerance: f64,
    ) -> ConfigResult<Self> {
        if groups.is_empty() {
            return Err(ConfigError::NoLayerGroups);
        }

        let resolved = groups
            .iter()
            .enumerate()
            .map(|(index, (name, raw))| resolve_group(name, raw, index == 0, groups.len()))
            .collect::<ConfigResult<Vec<_>>>()?;

        let resolver = Self::new(resolved, tolerance)?;
        debug!(
            "Resolved {} layer groups, detection signature infill={} contour={} mm/s",
            resolver.groups.len(),
            resolver.signature.infill,
            resolver.signature.contour
        );
        Ok(resolver)
    }

    /// Group whose scope contains `layer`
    pub fn resolve(&self, layer: u32) -> Result<&LayerGroup, LayerGroupError> {
        self.groups
            .iter()
            .find(|g| g.scope.contains(layer))
            .ok_or(LayerGroupError::UnmappedLayer { layer })
    }

    /// Check that every layer from 1 to `max_layer` resolves
    pub fn ensure_covers(&self, max_layer: u32) -> Result<(), LayerGroupError> {
        (1..=max_layer).try_for_each(|layer| self.resolve(layer).map(|_| ()))
    }

    /// The detection group
    pub fn detection_group(&self) -> &LayerGroup {
        &self.groups[0]
    }

    /// Speed signature of the detection group
    pub fn signature(&self) -> &DetectionSignature {
        &self.signature
    }

    /// All groups in configuration order
    pub fn groups(&self) -> &[LayerGroup] {
        &self.groups
    }

    /// Whether more than one group is configured
    pub fn is_graded(&self) -> bool {
        self.groups.len() > 1
    }
}

fn resolve_group(
    name: &str,
    raw: &LayerGroupConfig,
    is_detection: bool,
    group_count: usize,
) -> ConfigResult<LayerGroup> {
    let scope = match raw.layers.as_deref() {
        None if group_count > 1 => {
            return Err(ConfigError::ScopeWithoutRange {
                group: name.to_string(),
            })
        }
        None => Scope::All,
        Some([start, end]) => {
            if *start < 1 || start > end || *end > i64::from(u32::MAX) {
                return Err(ConfigError::InvalidRange {
                    group: name.to_string(),
                    start: *start,
                    end: *end,
                });
            }
            Scope::Range {
                start: *start as u32,
                end: *end as u32,
            }
        }
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                key: format!("layer_groups.{}.layers", name),
                reason: format!("expected [start, end], got {} values", other.len()),
            })
        }
    };

    let interlayer_dwell = raw
        .interlayer_dwell
        .ok_or_else(|| ConfigError::MissingKey(format!("layer_groups.{}.interlayer_dwell", name)))?;
    if !(interlayer_dwell.is_finite() && interlayer_dwell >= 0.0) {
        return Err(ConfigError::InvalidValue {
            key: format!("layer_groups.{}.interlayer_dwell", name),
            reason: "must be a non-negative number of seconds".to_string(),
        });
    }

    Ok(LayerGroup {
        name: name.to_string(),
        scope,
        infill: resolve_section(name, Section::Infill, raw.infill.as_ref(), is_detection)?,
        contour: resolve_section(name, Section::Contour, raw.contour.as_ref(), is_detection)?,
        interlayer_dwell,
    })
}

fn resolve_section(
    group: &str,
    section: Section,
    raw: Option<&SectionConfig>,
    is_detection: bool,
) -> ConfigResult<SectionParams> {
    let key = |field: &str| format!("layer_groups.{}.{}.{}", group, section, field);
    let raw = raw.ok_or_else(|| ConfigError::MissingKey(format!("layer_groups.{}.{}", group, section)))?;

    if is_detection && raw.base_speed.is_none() {
        return Err(ConfigError::MissingBaseSpeed {
            group: group.to_string(),
            section: section.to_string(),
        });
    }

    let output_speed = match (raw.output_speed, is_detection) {
        (Some(speed), _) => speed,
        (None, true) => raw.base_speed.unwrap_or_default(),
        (None, false) => {
            return Err(ConfigError::MissingOutputSpeed {
                group: group.to_string(),
                section: section.to_string(),
            })
        }
    };

    for (field, value) in [("base_speed", raw.base_speed), ("output_speed", Some(output_speed))] {
        if let Some(v) = value {
            if !(v > 0.0 && v.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    key: key(field),
                    reason: "speed must be a positive number of mm/s".to_string(),
                });
            }
        }
    }

    let power = raw.power.ok_or_else(|| ConfigError::MissingKey(key("power")))?;
    if !(power >= 0.0 && power.is_finite()) {
        return Err(ConfigError::InvalidValue {
            key: key("power"),
            reason: "power must not be negative".to_string(),
        });
    }

    Ok(SectionParams {
        base_speed: raw.base_speed,
        output_speed,
        power,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampes_core::DEFAULT_SPEED_TOLERANCE;

    fn section(base: Option<f64>, output: Option<f64>, power: f64) -> Option<SectionConfig> {
        Some(SectionConfig {
            base_speed: base,
            output_speed: output,
            power: Some(power),
        })
    }

    fn fgm_groups() -> Vec<(String, LayerGroupConfig)> {
        vec![
            (
                "group_one".to_string(),
                LayerGroupConfig {
                    layers: Some(vec![1, 95]),
                    infill: section(Some(1000.0), Some(800.0), 4_000_000.0),
                    contour: section(Some(500.0), None, 2_000_000.0),
                    interlayer_dwell: Some(10.0),
                },
            ),
            (
                "group_two".to_string(),
                LayerGroupConfig {
                    layers: Some(vec![96, 128]),
                    infill: section(None, Some(700.0), 3_000_000.0),
                    contour: section(None, Some(400.0), 1_500_000.0),
                    interlayer_dwell: Some(12.0),
                },
            ),
        ]
    }

    #[test]
    fn test_fgm_boundaries() {
        let resolver =
            LayerGroupResolver::from_config(&fgm_groups(), DEFAULT_SPEED_TOLERANCE).unwrap();
        assert_eq!(resolver.resolve(95).unwrap().name, "group_one");
        assert_eq!(resolver.resolve(96).unwrap().name, "group_two");
        assert_eq!(resolver.resolve(96).unwrap().infill.output_speed, 700.0);
        assert_eq!(resolver.resolve(96).unwrap().infill.base_speed, None);
        assert_eq!(
            resolver.resolve(129).unwrap_err(),
            LayerGroupError::UnmappedLayer { layer: 129 }
        );
        assert!(resolver.ensure_covers(128).is_ok());
        assert!(resolver.is_graded());
    }

    #[test]
    fn test_detection_output_defaults_to_base() {
        let resolver =
            LayerGroupResolver::from_config(&fgm_groups(), DEFAULT_SPEED_TOLERANCE).unwrap();
        let detection = resolver.detection_group();
        assert_eq!(detection.contour.output_speed, 500.0);
        assert_eq!(detection.infill.output_speed, 800.0);
        assert_eq!(resolver.signature().infill, 1000.0);
    }

    #[test]
    fn test_sole_group_applies_to_all() {
        let mut groups = fgm_groups();
        groups.truncate(1);
        groups[0].1.layers = None;
        let resolver =
            LayerGroupResolver::from_config(&groups, DEFAULT_SPEED_TOLERANCE).unwrap();
        assert_eq!(resolver.resolve(1).unwrap().scope, Scope::All);
        assert!(resolver.resolve(10_000).is_ok());
    }

    #[test]
    fn test_later_group_requires_output_speed() {
        let mut groups = fgm_groups();
        groups[1].1.contour = section(Some(400.0), None, 1.0);
        let err = LayerGroupResolver::from_config(&groups, DEFAULT_SPEED_TOLERANCE).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingOutputSpeed {
                group: "group_two".to_string(),
                section: "contour".to_string(),
            }
        );
    }

    #[test]
    fn test_range_errors() {
        let mut groups = fgm_groups();
        groups[1].1.layers = Some(vec![90, 128]);
        assert!(matches!(
            LayerGroupResolver::from_config(&groups, DEFAULT_SPEED_TOLERANCE),
            Err(ConfigError::OverlappingRanges { .. })
        ));

        groups[1].1.layers = Some(vec![130, 128]);
        assert!(matches!(
            LayerGroupResolver::from_config(&groups, DEFAULT_SPEED_TOLERANCE),
            Err(ConfigError::InvalidRange { start: 130, end: 128, .. })
        ));

        groups[1].1.layers = None;
        assert!(matches!(
            LayerGroupResolver::from_config(&groups, DEFAULT_SPEED_TOLERANCE),
            Err(ConfigError::ScopeWithoutRange { .. })
        ));

        groups[1].1.layers = Some(vec![96]);
        assert!(matches!(
            LayerGroupResolver::from_config(&groups, DEFAULT_SPEED_TOLERANCE),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_gap_is_unmapped() {
        let mut groups = fgm_groups();
        groups[1].1.layers = Some(vec![100, 128]);
        let resolver =
            LayerGroupResolver::from_config(&groups, DEFAULT_SPEED_TOLERANCE).unwrap();
        assert_eq!(
            resolver.ensure_covers(128).unwrap_err(),
            LayerGroupError::UnmappedLayer { layer: 96 }
        );
    }

    #[test]
    fn test_empty_groups() {
        assert_eq!(
            LayerGroupResolver::from_config(&[], DEFAULT_SPEED_TOLERANCE).unwrap_err(),
            ConfigError::NoLayerGroups
        );
    }
}
