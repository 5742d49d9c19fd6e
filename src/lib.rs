//! # AMPES
//!
//! Additive Manufacturing Process Event Series: converts layered RepRap tool
//! paths into the timed heat-source event series a thermomechanical
//! simulation consumes.
//!
//! ## Architecture
//!
//! AMPES is organized as a workspace with multiple crates:
//!
//! 1. **ampes-core** - Data model and error taxonomy
//! 2. **ampes-gcode** - Line preprocessing, g-code parsing, section classification
//! 3. **ampes-settings** - Configuration loading, validation, layer groups
//! 4. **ampes-events** - Interpolation, timing, power fluctuation, writers
//! 5. **ampes** - Command-line binary and run orchestration
//!
//! ## Features
//!
//! - **Layer Groups**: per-layer-range speeds, powers and dwells (FGM builds)
//! - **Section Detection**: infill / contour by commanded speed
//! - **Dwell Modelling**: heat-up, interlayer pauses and roller passes
//! - **Power Fluctuation**: seeded gaussian, strict or uniform perturbation
//! - **Outputs**: `.inp` event, roller and time series, parameter summary CSV

pub mod run;

pub use ampes_core::{
    ClassificationError, ConfigError, Error, GcodeError, InterpolatedPoint, LayerGroup,
    LayerGroupError, Point3, Result, RollerEvent, Section, TimeSeriesKind, TimeSeriesPoint,
    Waypoint,
};
pub use ampes_events::{EventSeries, EventSeriesGenerator, PowerFluctuator, ProcessSummary};
pub use ampes_gcode::{GcodeParser, SectionClassifier};
pub use ampes_settings::{Config, RunConfig, SettingsError};

pub use run::{discover_inputs, generate, run_all, write_series, write_summary, OutputTarget};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr, keeping stdout free for piping
/// - RUST_LOG environment variable support
/// - `level` as the default directive
pub fn init_logging(level: tracing::Level) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
