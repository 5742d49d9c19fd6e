//! # AMPES Events
//!
//! Turns classified tool-path segments into the timed heat-source event
//! series, the roller passes and the time series, and renders them in the
//! solver's `.inp` and `.csv` formats.
//!
//! ## Stages
//!
//! 1. [`PathInterpolator`] subdivides each segment into evenly spaced points
//! 2. [`TimingAccumulator`] stamps points with cumulative time, inserting
//!    roller, heat-up and interlayer dwells
//! 3. [`PowerFluctuator`] perturbs the nominal heat-source power
//! 4. [`TimeSeriesExtractor`] derives pivotal timestamps per layer
//!
//! [`EventSeriesGenerator`] runs all of them on one g-code program.

pub mod fluctuation;
pub mod generator;
pub mod interpolate;
pub mod summary;
pub mod time_series;
pub mod timing;
pub mod writer;

pub use fluctuation::PowerFluctuator;
pub use generator::{EventSeries, EventSeriesGenerator};
pub use interpolate::{PathInterpolator, SubdividedSegment};
pub use summary::ProcessSummary;
pub use time_series::TimeSeriesExtractor;
pub use timing::{LayerTiming, Timeline, TimingAccumulator, TimingPhase};
pub use writer::{
    format_number, write_event_csv, write_event_series, write_roller_series, write_time_series,
};
