//! # AMPES G-Code
//!
//! RepRap g-code handling for AMPES.
//!
//! This crate provides:
//! - Line preprocessing (comment stripping, whitespace normalisation)
//! - Modal state tracking and the layer-indexing parser
//! - Infill / contour classification by speed signature

pub mod classifier;
pub mod command;
pub mod parser;
pub mod pipeline;
pub mod processors;

pub use classifier::{ClassifiedSegment, Motion, SectionClassifier};
pub use command::{GcodeCommand, MotionCode};
pub use parser::{DistanceMode, ExtrusionMode, GcodeParser, GcodeState};
pub use pipeline::{CommandProcessor, ProcessorHandle, ProcessorPipeline};
pub use processors::{CommentProcessor, WhitespaceProcessor};
