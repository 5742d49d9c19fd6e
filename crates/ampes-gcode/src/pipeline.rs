//! G-Code preprocessor pipeline

use std::sync::Arc;

use super::{CommentProcessor, GcodeCommand, WhitespaceProcessor};
use ampes_core::GcodeError;

/// Trait for G-Code line preprocessors
///
/// Processors clean or transform a line before the parser interprets it.
/// Returning an empty vector drops the line.
pub trait CommandProcessor: Send + Sync {
    /// Get the name/identifier of this processor
    fn name(&self) -> &str;

    /// Get a description of what this processor does
    fn description(&self) -> &str;

    /// Process a single G-Code command
    fn process(&self, command: &GcodeCommand) -> Result<Vec<GcodeCommand>, GcodeError>;
}

/// Arc-wrapped processor for thread-safe sharing
pub type ProcessorHandle = Arc<dyn CommandProcessor>;

/// Ordered sequence of command processors
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use ampes_gcode::{CommentProcessor, GcodeCommand, ProcessorPipeline};
///
/// let mut pipeline = ProcessorPipeline::new();
/// pipeline.register(Arc::new(CommentProcessor::new()));
///
/// let out = pipeline
///     .process_command(&GcodeCommand::new("G1 X1 ; move", 1))
///     .unwrap();
/// assert_eq!(out[0].command, "G1 X1");
/// ```
pub struct ProcessorPipeline {
    processors: Vec<ProcessorHandle>,
}

impl ProcessorPipeline {
    /// Create a new empty processor pipeline
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    /// Pipeline used by the parser: comment stripping, then whitespace trimming
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline
            .register(Arc::new(CommentProcessor::new()))
            .register(Arc::new(WhitespaceProcessor::new()));
        pipeline
    }

    /// Register a processor in the pipeline
    ///
    /// Processors are applied in the order they are registered.
    pub fn register(&mut self, processor: ProcessorHandle) -> &mut Self {
        self.processors.push(processor);
        self
    }

    /// List all registered processors as `(name, description)`, in order
    pub fn list_processors(&self) -> Vec<(&str, &str)> {
        self.processors
            .iter()
            .map(|p| (p.name(), p.description()))
            .collect()
    }

    /// Process a single command through the entire pipeline
    pub fn process_command(&self, command: &GcodeCommand) -> Result<Vec<GcodeCommand>, GcodeError> {
        let mut current_commands = vec![command.clone()];

        for processor in &self.processors {
            let mut next_commands = Vec::new();
            for cmd in current_commands {
                match processor.process(&cmd) {
                    Ok(processed) => next_commands.extend(processed),
                    Err(e) => {
                        tracing::warn!(
                            "Processor '{}' failed on line {}: {}",
                            processor.name(),
                            cmd.line_number,
                            e
                        );
                        return Err(e);
                    }
                }
            }

            current_commands = next_commands;
            if current_commands.is_empty() {
                break;
            }
        }

        Ok(current_commands)
    }

    /// Split program text into lines and run each through the pipeline
    ///
    /// Line numbers are 1-indexed and refer to the input text.
    pub fn process_program(&self, text: &str) -> Result<Vec<GcodeCommand>, GcodeError> {
        let mut results = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let command = GcodeCommand::new(line, index + 1);
            results.extend(self.process_command(&command)?);
        }
        Ok(results)
    }
}

impl Default for ProcessorPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reject;

    impl CommandProcessor for Reject {
        fn name(&self) -> &str {
            "reject"
        }

        fn description(&self) -> &str {
            "Rejects every line"
        }

        fn process(&self, command: &GcodeCommand) -> Result<Vec<GcodeCommand>, GcodeError> {
            Err(GcodeError::InvalidParameter {
                line_number: command.line_number,
                param: command.command.clone(),
                reason: "rejected".to_string(),
            })
        }
    }

    #[test]
    fn test_standard_pipeline() {
        let pipeline = ProcessorPipeline::standard();

        let program = "; header\n\nG1 X1 Y2 ; infill\n   G0 Z0.3  \n";
        let cmds = pipeline.process_program(program).unwrap();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].command, "G1 X1 Y2");
        assert_eq!(cmds[0].line_number, 3);
        assert_eq!(cmds[1].command, "G0 Z0.3");
        assert_eq!(cmds[1].line_number, 4);
    }

    #[test]
    fn test_processor_error_propagates() {
        let mut pipeline = ProcessorPipeline::new();
        pipeline.register(Arc::new(Reject));
        let err = pipeline.process_program("G1 X1").unwrap_err();
        assert_eq!(err.line_number(), Some(1));
    }

    #[test]
    fn test_list_processors() {
        let pipeline = ProcessorPipeline::standard();
        let listed = pipeline.list_processors();
        let names: Vec<_> = listed.iter().map(|p| p.0).collect();
        assert_eq!(names, vec!["comment", "whitespace"]);
        assert!(listed.iter().all(|p| !p.1.is_empty()));
    }
}
