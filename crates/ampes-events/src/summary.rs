//! Process-parameter summary
//!
//! A pure projection of the run configuration, written next to the event
//! series so a simulation can be traced back to the parameters it used.

use chrono::{DateTime, Local};
use std::io::{self, Write};

use ampes_core::{LayerGroup, Scope, Section};
use ampes_settings::RunConfig;

const HEADER: [&str; 3] = ["Parameter", "Value", "Unit"];

/// Rows of the process-parameter CSV
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSummary {
    generated_at: DateTime<Local>,
    rows: Vec<Vec<String>>,
}

impl ProcessSummary {
    /// Project `config` into summary rows stamped with `generated_at`
    pub fn from_config(config: &RunConfig, generated_at: DateTime<Local>) -> Self {
        let mut rows = vec![vec![format!(
            "Developed {} at {}",
            generated_at.format("%Y/%d/%m"),
            generated_at.format("%H:%M")
        )]];

        let resolver = &config.layer_groups;
        let groups = resolver.groups();
        let single = !resolver.is_graded() && resolver.detection_group().scope == Scope::All;

        if single {
            let group = resolver.detection_group();
            rows.push(vec![]);
            rows.push(vec!["##Print parameters".to_string()]);
            rows.push(header());
            push_sections(&mut rows, group, true);
            rows.push(row("Interlayer Dwell Time", group.interlayer_dwell, "s"));
        } else {
            for (index, group) in groups.iter().enumerate() {
                rows.push(vec![]);
                rows.push(vec![
                    "##Layer group print parameters".to_string(),
                    group.name.clone(),
                ]);
                rows.push(header());
                if let Scope::Range { start, end } = group.scope {
                    rows.push(vec![
                        "Layers in Group".to_string(),
                        format!("[{}, {}]", start, end),
                        "count".to_string(),
                    ]);
                }
                push_sections(&mut rows, group, index == 0);
                rows.push(row("Dwell Time", group.interlayer_dwell, "s"));
            }
        }

        if let Some(roller) = config.roller {
            rows.push(vec![]);
            rows.push(vec!["##Roller parameters".to_string()]);
            rows.push(header());
            rows.push(row("Roller time", roller.w_dwell, "s"));
        }

        if let Some(fluctuation) = config.fluctuation {
            rows.push(vec![]);
            rows.push(vec!["##Power fluctuation parameters".to_string()]);
            rows.push(header());
            rows.push(vec![
                "Scheme".to_string(),
                fluctuation.scheme.to_string(),
                "N/A".to_string(),
            ]);
            rows.push(row("Deviation", fluctuation.deviation, "mW"));
        }

        rows.push(vec![]);
        rows.push(vec!["##Overall parameters".to_string()]);
        rows.push(vec![
            "Intervals".to_string(),
            config.interval.to_string(),
            "#".to_string(),
        ]);
        rows.push(row("Layer Height", config.layer_height, "mm"));
        rows.push(row("Substrate Thickness", config.substrate, "mm"));
        if config.heatup_time > 0.0 {
            rows.push(row("Heat-up Time", config.heatup_time, "s"));
        }
        rows.push(row("Origin Shift in X", config.origin_shift.x, "mm"));
        rows.push(row("Origin Shift in Y", config.origin_shift.y, "mm"));
        rows.push(row("Origin Shift in Z", config.origin_shift.z, "mm"));

        Self { generated_at, rows }
    }

    /// Generation timestamp
    pub fn generated_at(&self) -> DateTime<Local> {
        self.generated_at
    }

    /// Summary rows; empty rows separate blocks
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Write the summary as CSV
    ///
    /// Each empty row becomes a blank line between blocks.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for (index, block) in self.rows.split(|row| row.is_empty()).enumerate() {
            if index > 0 {
                writer.write_all(b"\n")?;
            }
            let mut out = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(&mut writer);
            for row in block {
                out.write_record(row)?;
            }
            out.flush()?;
        }
        writer.flush()
    }
}

fn header() -> Vec<String> {
    HEADER.iter().map(|s| s.to_string()).collect()
}

fn row(parameter: &str, value: f64, unit: &str) -> Vec<String> {
    vec![parameter.to_string(), value.to_string(), unit.to_string()]
}

fn push_sections(rows: &mut Vec<Vec<String>>, group: &LayerGroup, with_base: bool) {
    for section in Section::ALL {
        let params = group.section(section);
        let name = match section {
            Section::Infill => "Infill",
            Section::Contour => "Contour",
        };
        if with_base {
            if let Some(base) = params.base_speed {
                rows.push(row(&format!("{} Base Velocity", name), base, "mm/s"));
            }
        }
        rows.push(row(
            &format!("{} Output Velocity", name),
            params.output_speed,
            "mm/s",
        ));
        rows.push(row(&format!("{} Power", name), params.power, "mW"));
    }
}
