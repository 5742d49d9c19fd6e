//! # AMPES Core
//!
//! Core types and error taxonomy for AMPES.
//! Provides the data model every pipeline stage exchanges: parsed waypoints,
//! layer group parameter sets, the detection signature, and the event-series
//! records handed to the writers.

pub mod data;
pub mod error;
pub mod units;

pub use data::{
    DetectionSignature, InterpolatedPoint, LayerGroup, Point3, RollerEvent, Scope, Section,
    SectionParams, TimeSeriesKind, TimeSeriesPoint, Waypoint,
};

pub use data::layer_group::DEFAULT_SPEED_TOLERANCE;

pub use error::{ClassificationError, ConfigError, Error, GcodeError, LayerGroupError, Result};

pub use units::FeedRateUnits;
