// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parser error types

use octofhir_fhirpath_core::EvalError;
use std::borrow::Cow;
use thiserror::Error;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse error with location information
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Syntax error at a specific location
    #[error("{message}")]
    SyntaxError {
        /// Position where the error occurred
        position: usize,
        /// Error message describing the syntax error
        message: Cow<'static, str>,
    },

    /// Unexpected token
    #[error("unexpected token '{token}'")]
    UnexpectedToken {
        /// The unexpected token that was found
        token: Cow<'static, str>,
        /// Position where the token was found
        position: usize,
    },

    /// Expected token
    #[error("expected {expected}, found '{found}'")]
    ExpectedToken {
        /// The expected token description
        expected: Cow<'static, str>,
        /// What was found instead
        found: Cow<'static, str>,
        /// Position where the token was expected
        position: usize,
    },

    /// Unexpected end of input
    #[error("unexpected end of input")]
    UnexpectedEof {
        /// Position where more input was expected
        position: usize,
    },

    /// Unclosed string literal
    #[error("unclosed string literal")]
    UnclosedString {
        /// Position where the string starts
        position: usize,
    },

    /// Invalid escape sequence
    #[error("invalid escape sequence '{sequence}'")]
    InvalidEscape {
        /// The invalid escape sequence
        sequence: Cow<'static, str>,
        /// Position of the literal that contains the sequence
        position: usize,
    },

    /// Invalid literal value
    #[error("invalid {literal_type} literal '{value}'")]
    InvalidLiteral {
        /// Type of literal that failed to parse
        literal_type: Cow<'static, str>,
        /// The invalid value that was encountered
        value: Cow<'static, str>,
        /// Position where the invalid literal was found
        position: usize,
    },
}

impl ParseError {
    /// Byte offset in the input where the error was detected
    pub fn position(&self) -> usize {
        match self {
            Self::SyntaxError { position, .. }
            | Self::UnexpectedToken { position, .. }
            | Self::ExpectedToken { position, .. }
            | Self::UnexpectedEof { position }
            | Self::UnclosedString { position }
            | Self::InvalidEscape { position, .. }
            | Self::InvalidLiteral { position, .. } => *position,
        }
    }

    /// Create a syntax error
    pub fn syntax(position: usize, message: impl Into<Cow<'static, str>>) -> Self {
        Self::SyntaxError {
            position,
            message: message.into(),
        }
    }

    /// Convert into the evaluator-facing error, attaching the full expression
    pub fn into_eval_error(self, expression: &str) -> EvalError {
        EvalError::syntax(expression, self.position(), self.to_string())
    }
}
