//! G-Code line preprocessors

use regex::Regex;

use super::{CommandProcessor, GcodeCommand};
use ampes_core::GcodeError;

/// Removes leading and trailing whitespace from G-code commands
///
/// Lines that are empty after trimming are dropped.
#[derive(Debug, Clone, Default)]
pub struct WhitespaceProcessor;

impl WhitespaceProcessor {
    /// Create a new whitespace processor
    pub fn new() -> Self {
        Self
    }
}

impl CommandProcessor for WhitespaceProcessor {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn description(&self) -> &str {
        "Removes leading and trailing whitespace from G-code commands"
    }

    fn process(&self, command: &GcodeCommand) -> Result<Vec<GcodeCommand>, GcodeError> {
        let trimmed = command.command.trim();

        if trimmed.is_empty() {
            Ok(vec![])
        } else {
            let mut processed = command.clone();
            processed.command = trimmed.to_string();
            Ok(vec![processed])
        }
    }
}

/// Removes G-code comments from commands
///
/// Comments in G-code can be:
/// - Parentheses: (this is a comment)
/// - Semicolon: G1 X10 ; move to X10
///
/// Slicers annotate moves with trailing semicolon comments, so everything
/// after the first `;` goes.
#[derive(Debug, Clone)]
pub struct CommentProcessor {
    pattern: Regex,
}

impl CommentProcessor {
    /// Create a new comment processor
    pub fn new() -> Self {
        static COMMENT_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        let pattern = COMMENT_REGEX
            .get_or_init(|| Regex::new(r"\([^)]*\)|;.*$|\(.*$").expect("invalid regex pattern"))
            .clone();
        Self { pattern }
    }
}

impl Default for CommentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandProcessor for CommentProcessor {
    fn name(&self) -> &str {
        "comment"
    }

    fn description(&self) -> &str {
        "Removes G-code comments (parentheses and semicolon style)"
    }

    fn process(&self, command: &GcodeCommand) -> Result<Vec<GcodeCommand>, GcodeError> {
        let stripped = self.pattern.replace_all(&command.command, " ");
        let trimmed = stripped.trim();

        if trimmed.is_empty() {
            Ok(vec![])
        } else {
            let mut processed = command.clone();
            processed.command = trimmed.to_string();
            Ok(vec![processed])
        }
    }
}
