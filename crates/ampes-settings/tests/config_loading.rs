//! Loading configuration files and resolving layer groups

use std::io::Write;

use ampes_core::{ConfigError, Scope};
use ampes_settings::{
    Config, FluctuationScheme, LayerGroupConfig, LayerGroupResolver, SectionConfig,
    SettingsError,
};
use proptest::prelude::*;
use tempfile::Builder;

const FGM_YAML: &str = r#"
layer_groups:
  zeta_first:
    layers: [1, 95]
    infill:
      base_speed: 1000
      output_speed: 800
      power: 4000000
    contour:
      base_speed: 500
      power: 2000000
    interlayer_dwell: 10
  alpha_second:
    layers: [96, 128]
    infill:
      output_speed: 700
      power: 3500000
    contour:
      output_speed: 450
      power: 1800000
    interlayer_dwell: 15
interval: 2
layer_height: 0.03
substrate: 5.0
xorg_shift: 10
yorg_shift: -10
zorg_shift: 0
dwell: true
roller: true
w_dwell: 5
i_dwell: 30
power_fluctuation: true
deviation: 100000
scheme: gaussian
seed: 42
time_series: true
time_series_sample_points: 3
process_param_request: true
comment_event_series: true
comment_string: "**"
"#;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_yaml_fgm_config() {
    let file = write_temp(".yaml", FGM_YAML);
    let run = Config::load_run_config(file.path()).unwrap();

    let groups = run.layer_groups.groups();
    assert_eq!(groups[0].name, "zeta_first");
    assert_eq!(groups[1].name, "alpha_second");
    assert_eq!(run.layer_groups.resolve(95).unwrap().name, "zeta_first");
    assert_eq!(run.layer_groups.resolve(96).unwrap().name, "alpha_second");
    assert_eq!(run.layer_groups.signature().contour, 500.0);

    assert_eq!(run.heatup_time, 30.0);
    assert_eq!(run.roller.unwrap().w_dwell, 5.0);
    assert_eq!(run.roller.unwrap().path.start_x, -90.0);
    let fluctuation = run.fluctuation.unwrap();
    assert_eq!(fluctuation.scheme, FluctuationScheme::Gaussian);
    assert_eq!(fluctuation.deviation, 100000.0);
    assert_eq!(run.seed, Some(42));
    assert_eq!(run.time_series_sample_points, Some(3));
    assert_eq!(run.comment_string.as_deref(), Some("**"));
    assert_eq!(run.origin_offset().z, -5.0);
}

#[test]
fn test_json_config() {
    let json = r#"{
        "layer_groups": {
            "only": {
                "infill": {"base_speed": 1000, "power": 4000000},
                "contour": {"base_speed": 500, "power": 2000000},
                "interlayer_dwell": 0
            }
        },
        "interval": 0,
        "layer_height": 0.03,
        "substrate": 0,
        "xorg_shift": 0,
        "yorg_shift": 0,
        "zorg_shift": 0,
        "dwell": false
    }"#;
    let file = write_temp(".json", json);
    let run = Config::load_run_config(file.path()).unwrap();
    let group = run.layer_groups.detection_group();
    assert_eq!(group.scope, Scope::All);
    assert_eq!(group.infill.output_speed, 1000.0);
}

#[test]
fn test_toml_config_preserves_group_order() {
    let toml = r#"
interval = 1
layer_height = 0.05
substrate = 0.0
xorg_shift = 0.0
yorg_shift = 0.0
zorg_shift = 0.0
dwell = false

[layer_groups.second_by_name]
layers = [1, 10]
interlayer_dwell = 1.0
infill = { base_speed = 20.0, power = 100.0 }
contour = { base_speed = 10.0, power = 50.0 }

[layer_groups.a_later]
layers = [11, 20]
interlayer_dwell = 1.0
infill = { output_speed = 25.0, power = 100.0 }
contour = { output_speed = 12.0, power = 50.0 }
"#;
    let file = write_temp(".toml", toml);
    let run = Config::load_run_config(file.path()).unwrap();
    assert_eq!(run.layer_groups.detection_group().name, "second_by_name");
    assert_eq!(run.layer_groups.resolve(11).unwrap().contour.output_speed, 12.0);
}

#[test]
fn test_invalid_scheme() {
    let text = FGM_YAML.replace("scheme: gaussian", "scheme: poisson");
    let err = Config::from_yaml_str(&text)
        .unwrap()
        .into_run_config()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidScheme {
            scheme: "poisson".to_string()
        }
    );
}

#[test]
fn test_missing_base_speed_in_detection_group() {
    let text = FGM_YAML.replacen("      base_speed: 500\n", "", 1);
    let err = Config::from_yaml_str(&text)
        .unwrap()
        .into_run_config()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::MissingBaseSpeed {
            group: "zeta_first".to_string(),
            section: "contour".to_string(),
        }
    );
}

#[test]
fn test_matching_base_speeds_in_detection_group() {
    let text = FGM_YAML.replacen("      base_speed: 500\n", "      base_speed: 1000\n", 1);
    let err = Config::from_yaml_str(&text)
        .unwrap()
        .into_run_config()
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::IndistinctBaseSpeeds {
            group: "zeta_first".to_string(),
            infill: 1000.0,
            contour: 1000.0,
        }
    );
}

#[test]
fn test_unsupported_extension() {
    let file = write_temp(".ini", "interval = 1");
    let err = Config::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, SettingsError::UnsupportedFormat(ref ext) if ext == "ini"));
}

#[test]
fn test_missing_file() {
    let err = Config::load_from_file(std::path::Path::new("/nonexistent/input.yaml")).unwrap_err();
    assert!(matches!(err, SettingsError::IoError(_)));
}

fn group(layers: Option<Vec<i64>>, detection: bool) -> LayerGroupConfig {
    let section = |base, output| {
        Some(SectionConfig {
            base_speed: if detection { Some(base) } else { None },
            output_speed: Some(output),
            power: Some(1000.0),
        })
    };
    LayerGroupConfig {
        layers,
        infill: section(1000.0, 800.0),
        contour: section(500.0, 400.0),
        interlayer_dwell: Some(1.0),
    }
}

proptest! {
    /// Contiguous, non-overlapping ranges resolve every layer to exactly one group
    #[test]
    fn prop_every_layer_resolves_once(lengths in proptest::collection::vec(1u32..40, 1..6)) {
        let mut start = 1i64;
        let mut groups = Vec::new();
        for (i, len) in lengths.iter().enumerate() {
            let end = start + i64::from(*len) - 1;
            groups.push((format!("group_{}", i), group(Some(vec![start, end]), i == 0)));
            start = end + 1;
        }
        let max_layer = (start - 1) as u32;

        let resolver = LayerGroupResolver::from_config(&groups, 1e-6).unwrap();
        prop_assert!(resolver.ensure_covers(max_layer).is_ok());

        for layer in 1..=max_layer {
            let covering = resolver
                .groups()
                .iter()
                .filter(|g| g.scope.contains(layer))
                .count();
            prop_assert_eq!(covering, 1);
        }
        prop_assert!(resolver.resolve(max_layer + 1).is_err());
    }
}
