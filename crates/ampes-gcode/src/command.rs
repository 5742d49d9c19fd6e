//! G-Code command representation and word access

use ampes_core::GcodeError;
use serde::{Deserialize, Serialize};

/// Motion command codes recognised by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionCode {
    /// G0 / G00 rapid move
    Rapid,
    /// G1 / G01 linear move
    Linear,
}

/// One G-Code line as it moves through the preprocessor pipeline
///
/// `line` keeps the raw text for error reporting while `command` holds the
/// cleaned text processors produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcodeCommand {
    /// Raw line text
    pub line: String,
    /// 1-indexed line number in the source program
    pub line_number: usize,
    /// Cleaned command text
    pub command: String,
}

impl GcodeCommand {
    /// Create a new command from a source line
    pub fn new(line: impl Into<String>, line_number: usize) -> Self {
        let line = line.into();
        Self {
            command: line.clone(),
            line,
            line_number,
        }
    }

    /// Iterate the words of the command as `(letter, value-text)` pairs
    ///
    /// Letters are upper-cased. Slicers separate words with whitespace, so
    /// each whitespace-delimited token is one word.
    pub fn words(&self) -> impl Iterator<Item = (char, &str)> + '_ {
        self.command.split_whitespace().filter_map(|token| {
            let mut chars = token.chars();
            let letter = chars.next()?.to_ascii_uppercase();
            letter
                .is_ascii_alphabetic()
                .then(|| (letter, &token[letter.len_utf8()..]))
        })
    }

    /// The leading `G`/`M` code, e.g. `('G', 1)` for `G01 X1`
    pub fn code(&self) -> Option<(char, u32)> {
        let (letter, value) = self.words().next()?;
        if letter != 'G' && letter != 'M' {
            return None;
        }
        let number = value.split('.').next()?.parse::<u32>().ok()?;
        Some((letter, number))
    }

    /// Motion code of the command if it is a G0/G1 move
    pub fn motion(&self) -> Option<MotionCode> {
        match self.code()? {
            ('G', 0) => Some(MotionCode::Rapid),
            ('G', 1) => Some(MotionCode::Linear),
            _ => None,
        }
    }

    /// Whether the command carries a word for `letter`
    pub fn has_word(&self, letter: char) -> bool {
        self.words().any(|(l, _)| l == letter)
    }

    /// Numeric value of the `letter` word, if present
    ///
    /// # Errors
    /// Returns `GcodeError::InvalidParameter` when the value is not a number.
    pub fn param(&self, letter: char) -> Result<Option<f64>, GcodeError> {
        let Some((_, text)) = self.words().find(|(l, _)| *l == letter) else {
            return Ok(None);
        };

        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(GcodeError::InvalidParameter {
                line_number: self.line_number,
                param: format!("{}{}", letter, text),
                reason: "expected a finite number".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for GcodeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.line_number, self.command)
    }
}
