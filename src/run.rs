//! Run orchestration: input discovery, generation and output files

use anyhow::{bail, Context};
use chrono::Local;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use ampes_events::{
    write_event_csv, write_event_series, write_roller_series, write_time_series, EventSeries,
    EventSeriesGenerator, ProcessSummary,
};
use ampes_settings::RunConfig;

/// Extension of the g-code files picked up from directories
pub const GCODE_EXTENSION: &str = "gcode";

/// Where the outputs of one run are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    dir: PathBuf,
    name: String,
}

impl OutputTarget {
    /// Outputs named `<name>*` inside `dir`
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Base file name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.name, suffix))
    }

    /// Heat-source event series
    pub fn event_series(&self) -> PathBuf {
        self.file(".inp")
    }

    /// Roller event series
    pub fn roller_series(&self) -> PathBuf {
        self.file("_roller.inp")
    }

    /// Time series
    pub fn time_series(&self) -> PathBuf {
        self.file("_time_series.inp")
    }

    /// Process-parameter summary
    pub fn process_parameters(&self) -> PathBuf {
        self.file("_process_parameter.csv")
    }

    /// Full-field event CSV
    pub fn event_csv(&self) -> PathBuf {
        self.file("_event_series.csv")
    }
}

/// Resolve the g-code files to process
///
/// Directories expand to their `*.gcode` files sorted by name. With no
/// inputs the first `*.gcode` file of `cwd` is used.
pub fn discover_inputs(inputs: &[PathBuf], cwd: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        let found = gcode_files_in(cwd)?;
        let Some(first) = found.into_iter().next() else {
            bail!("No .{} file found in {}", GCODE_EXTENSION, cwd.display());
        };
        return Ok(vec![first]);
    }

    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = gcode_files_in(input)?;
            if found.is_empty() {
                bail!("No .{} file found in {}", GCODE_EXTENSION, input.display());
            }
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn gcode_files_in(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read directory {}", dir.display()))?
            .path();
        let is_gcode = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(GCODE_EXTENSION));
        if is_gcode && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read and process one g-code file
pub fn generate(config: &RunConfig, input: &Path) -> anyhow::Result<EventSeries> {
    info!("Reading g-code file {}", input.display());
    let gcode = fs::read_to_string(input)
        .with_context(|| format!("Failed to read g-code file {}", input.display()))?;
    EventSeriesGenerator::new(config)
        .run(&gcode)
        .with_context(|| format!("Failed to process {}", input.display()))
}

fn create(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Write the series files a configuration asks for
///
/// Returns the paths written, event series first.
pub fn write_series(
    config: &RunConfig,
    series: &EventSeries,
    target: &OutputTarget,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(target.dir())
        .with_context(|| format!("Failed to create {}", target.dir().display()))?;
    let mut written = Vec::new();

    let path = target.event_series();
    info!("Writing event series to {}", path.display());
    write_event_series(
        create(&path)?,
        &series.points,
        config.comment_string.as_deref(),
        config.es_precision,
    )
    .with_context(|| format!("Failed to write {}", path.display()))?;
    written.push(path);

    if let Some(roller) = config.roller {
        let path = target.roller_series();
        info!("Writing roller event series to {}", path.display());
        write_roller_series(
            create(&path)?,
            &series.roller_events,
            &roller.path,
            config.es_precision,
        )
        .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    if config.time_series() {
        let path = target.time_series();
        info!("Writing time series to {}", path.display());
        write_time_series(create(&path)?, &series.time_series, config.ts_precision)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    if config.event_series_csv {
        let path = target.event_csv();
        info!("Writing event series CSV to {}", path.display());
        write_event_csv(create(&path)?, &series.points, config.es_precision)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

/// Write the process-parameter summary if requested
pub fn write_summary(config: &RunConfig, target: &OutputTarget) -> anyhow::Result<Option<PathBuf>> {
    if !config.process_param_request {
        return Ok(None);
    }
    fs::create_dir_all(target.dir())
        .with_context(|| format!("Failed to create {}", target.dir().display()))?;
    let path = target.process_parameters();
    info!("Writing process parameters to {}", path.display());
    ProcessSummary::from_config(config, Local::now())
        .write_csv(create(&path)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Some(path))
}

/// Process every input and write all outputs
///
/// A single input writes `<name>*` files. Several inputs are processed in
/// parallel, each writing `<name>_<stem>*` files with its own fluctuation
/// stream (`seed + index`). No file is written unless every input succeeds.
pub fn run_all(
    config: &RunConfig,
    inputs: &[PathBuf],
    output_dir: &Path,
    name: &str,
) -> anyhow::Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        bail!("No g-code input given");
    }

    let runs: Vec<(RunConfig, OutputTarget, EventSeries)> = if let [input] = inputs {
        let series = generate(config, input)?;
        vec![(config.clone(), OutputTarget::new(output_dir, name), series)]
    } else {
        inputs
            .par_iter()
            .enumerate()
            .map(|(index, input)| {
                let stem = input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("input");
                let seed = config.seed.map(|s| s.wrapping_add(index as u64));
                let run_config = config.clone().with_seed(seed);
                debug!("Input {} uses seed {:?}", input.display(), run_config.seed);
                let series = generate(&run_config, input)?;
                let target = OutputTarget::new(output_dir, format!("{}_{}", name, stem));
                Ok((run_config, target, series))
            })
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    let mut written = Vec::new();
    for (run_config, target, series) in &runs {
        written.extend(write_series(run_config, series, target)?);
    }
    if let Some(path) = write_summary(config, &OutputTarget::new(output_dir, name))? {
        written.push(path);
    }

    info!("Finished writing {} files", written.len());
    Ok(written)
}
