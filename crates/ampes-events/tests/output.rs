//! Rendered outputs of a generated run

use ampes_events::{
    write_event_series, write_roller_series, write_time_series, EventSeriesGenerator,
    ProcessSummary,
};
use ampes_settings::{Config, RunConfig};
use chrono::{Local, TimeZone};

const PROGRAM: &str = "\
G90
M83
G1 Z0.25 F6000
G1 X20 Y0 E1 F30000
G1 X20 Y20 E1 F60000
G1 Z0.5 F6000
G1 X0 Y20 E1 F30000
";

const CONFIG: &str = r#"
layer_groups:
  lower:
    layers: [1, 1]
    infill: {base_speed: 1000, output_speed: 1000, power: 4000000}
    contour: {base_speed: 500, output_speed: 500, power: 2000000}
    interlayer_dwell: 10
  upper:
    layers: [2, 2]
    infill: {output_speed: 800, power: 3000000}
    contour: {output_speed: 400, power: 1500000}
    interlayer_dwell: 10
interval: 0
layer_height: 0.25
substrate: 0
xorg_shift: 0
yorg_shift: 0
zorg_shift: 0
dwell: true
roller: true
w_dwell: 2
comment_event_series: true
comment_string: "**"
time_series: true
time_series_sample_points: 0
ts_precision: 4
process_param_request: true
"#;

fn config() -> RunConfig {
    Config::from_yaml_str(CONFIG)
        .unwrap()
        .into_run_config()
        .unwrap()
}

fn text(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

#[test]
fn test_event_series_file() {
    let config = config();
    let series = EventSeriesGenerator::new(&config).run(PROGRAM).unwrap();

    let mut buf = Vec::new();
    write_event_series(
        &mut buf,
        &series.points,
        config.comment_string.as_deref(),
        config.es_precision,
    )
    .unwrap();
    let out = text(buf);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines[0], "** contour section");
    assert_eq!(lines[1], "2.0,0.0,0.0,0.25,2000000.0");
    assert_eq!(lines[2], "** infill section");
    assert_eq!(lines[3], "2.04,20.0,0.0,0.25,4000000.0");
    // layer 1 ends at 2.06, then off point, 10 s pause and a 2 s roller pass
    assert_eq!(lines[4], "2.06,20.0,20.0,0.25,0.0");
    assert_eq!(lines[5], "14.06,20.0,20.0,0.25,0.0");
    assert_eq!(lines[6], "** contour section");
    assert_eq!(lines[7], "14.0625,20.0,20.0,0.5,1500000.0");
    assert_eq!(lines[8], "14.1125,0.0,20.0,0.5,0.0");
    assert_eq!(lines.len(), 9);
}

#[test]
fn test_roller_and_time_series_files() {
    let config = config();
    let series = EventSeriesGenerator::new(&config).run(PROGRAM).unwrap();
    let roller = config.roller.unwrap();

    let mut buf = Vec::new();
    write_roller_series(&mut buf, &series.roller_events, &roller.path, config.es_precision)
        .unwrap();
    assert_eq!(
        text(buf),
        "0.0,-90.0,180.0,0.25,1.0\n\
         2.0,90.0,180.0,0.25,0.0\n\
         12.06,-90.0,180.0,0.5,1.0\n\
         14.06,90.0,180.0,0.5,0.0\n"
    );

    let mut buf = Vec::new();
    write_time_series(&mut buf, &series.time_series, config.ts_precision).unwrap();
    assert_eq!(
        text(buf),
        "0.0\n2.0\n2.06\n12.06\n14.0625\n14.1125\n"
    );
}

#[test]
fn test_process_summary_rows() {
    let config = config();
    let stamp = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
    let summary = ProcessSummary::from_config(&config, stamp);
    let rows = summary.rows();

    assert_eq!(rows[0], vec!["Developed 2024/07/03 at 09:05".to_string()]);
    assert!(rows.contains(&vec![
        "##Layer group print parameters".to_string(),
        "upper".to_string()
    ]));
    assert!(rows.contains(&vec![
        "Layers in Group".to_string(),
        "[2, 2]".to_string(),
        "count".to_string()
    ]));
    assert!(rows.contains(&vec![
        "Roller time".to_string(),
        "2".to_string(),
        "s".to_string()
    ]));
    let base_rows = rows
        .iter()
        .filter(|r| r.first().is_some_and(|p| p.ends_with("Base Velocity")))
        .count();
    assert_eq!(base_rows, 2);
    assert!(!rows
        .iter()
        .any(|r| r.first().is_some_and(|p| p == "##Print parameters")));

    let mut buf = Vec::new();
    summary.write_csv(&mut buf).unwrap();
    let out = text(buf);
    assert!(out.starts_with("Developed 2024/07/03 at 09:05\n\n##Layer group print parameters,lower\n"));
    assert!(out.contains("Parameter,Value,Unit\n"));
    assert!(out.contains(",s\n\n##Roller parameters\nParameter,Value,Unit\nRoller time,2,s\n\n##Overall parameters\n"));
    assert_eq!(
        out.lines().filter(|l| l.is_empty()).count(),
        rows.iter().filter(|r| r.is_empty()).count()
    );
    assert!(out.ends_with("Origin Shift in Z,0,mm\n"));
}
