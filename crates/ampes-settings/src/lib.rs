//! # AMPES Settings
//!
//! Configuration loading and validation for AMPES.
//!
//! A configuration file (YAML, JSON or TOML) is read into [`Config`], checked,
//! and frozen into the [`RunConfig`] that drives one event-series run. The
//! [`LayerGroupResolver`] inside it maps build layers to parameter groups.

pub mod config;
pub mod error;
pub mod layer_groups;

pub use config::{
    Config, FluctuationScheme, FluctuationSettings, RollerPath, RollerSettings, RunConfig,
    DEFAULT_ES_PRECISION, DEFAULT_TS_PRECISION, MAX_PRECISION,
};
pub use error::{ConfigResult, SettingsError, SettingsResult};
pub use layer_groups::{LayerGroupConfig, LayerGroupResolver, SectionConfig};
