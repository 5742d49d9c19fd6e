//! `.inp` and `.csv` renderers
//!
//! Thin adapters from the in-memory series to the text formats the
//! simulation solver reads. Every writer takes any `io::Write`.

use std::io::{self, Write};

use ampes_core::{InterpolatedPoint, RollerEvent, Section, TimeSeriesPoint};
use ampes_settings::RollerPath;

/// Format `value` rounded to `precision` decimals without trailing zeros
///
/// At least one decimal is kept, so `2` prints as `2.0`.
pub fn format_number(value: f64, precision: usize) -> String {
    let mut text = format!("{:.*}", precision, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').len();
        text.truncate(trimmed);
        if text.ends_with('.') {
            text.push('0');
        }
    } else {
        text.push_str(".0");
    }
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text.remove(0);
    }
    text
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_writer(writer)
}

/// Heat-source event series: `time, x, y, z, power` rows
///
/// With a comment prefix, a `"{prefix} {section} section"` line precedes
/// the first point of every run of scanning points of a new section.
pub fn write_event_series<W: Write>(
    writer: W,
    points: &[InterpolatedPoint],
    comment: Option<&str>,
    precision: usize,
) -> io::Result<()> {
    let mut out = csv_writer(writer);
    let mut current: Option<Section> = None;

    for point in points {
        if let (Some(prefix), Some(section)) = (comment, point.section) {
            if current != Some(section) {
                out.write_record([format!("{} {} section", prefix, section)])?;
                current = Some(section);
            }
        }
        out.write_record([
            format_number(point.time, precision),
            format_number(point.position.x, precision),
            format_number(point.position.y, precision),
            format_number(point.position.z, precision),
            format_number(point.power, precision),
        ])?;
    }
    out.flush()
}

/// Roller event series: a start row (`1.0`) and an end row (`0.0`) per pass
pub fn write_roller_series<W: Write>(
    writer: W,
    events: &[RollerEvent],
    path: &RollerPath,
    precision: usize,
) -> io::Result<()> {
    let mut out = csv_writer(writer);
    for event in events {
        for (time, x, state) in [
            (event.start_time, path.start_x, 1.0),
            (event.end_time, path.end_x, 0.0),
        ] {
            out.write_record([
                format_number(time, precision),
                format_number(x, precision),
                format_number(path.y, precision),
                format_number(event.z, precision),
                format_number(state, precision),
            ])?;
        }
    }
    out.flush()
}

/// Time series: one timestamp per line
pub fn write_time_series<W: Write>(
    writer: W,
    series: &[TimeSeriesPoint],
    precision: usize,
) -> io::Result<()> {
    let mut out = csv_writer(writer);
    for point in series {
        out.write_record([format_number(point.time, precision)])?;
    }
    out.flush()
}

/// Full-field CSV with a header row
pub fn write_event_csv<W: Write>(
    writer: W,
    points: &[InterpolatedPoint],
    precision: usize,
) -> io::Result<()> {
    let mut out = csv_writer(writer);
    out.write_record([
        "time",
        "x",
        "y",
        "z",
        "power",
        "laser_on",
        "scan_speed",
        "layer",
        "section",
    ])?;
    for point in points {
        out.write_record([
            format_number(point.time, precision),
            format_number(point.position.x, precision),
            format_number(point.position.y, precision),
            format_number(point.position.z, precision),
            format_number(point.power, precision),
            u8::from(point.laser_on).to_string(),
            format_number(point.scan_speed, precision),
            point.layer.to_string(),
            point.section.map(|s| s.to_string()).unwrap_or_default(),
        ])?;
    }
    out.flush()
}
