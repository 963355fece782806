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

//! Error types for FHIRPath evaluation
//!
//! Every variant of [`EvalError`] describes a defect in an expression or in the
//! engine configuration (a malformed constraint, an unknown function, a call
//! with the wrong number of arguments). Data problems in the evaluated record
//! never surface here: they produce empty collections instead.

use thiserror::Error;

/// Result type alias for FHIRPath evaluation
pub type Result<T> = std::result::Result<T, EvalError>;

/// Marker for functions that accept any number of trailing arguments
pub const UNBOUNDED_ARITY: usize = usize::MAX;

/// Error raised while parsing or evaluating a FHIRPath expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The expression text could not be parsed
    #[error("Syntax error in '{expression}' at position {position}: {message}")]
    SyntaxError {
        /// Full text of the offending expression
        expression: String,
        /// Byte offset of the failure
        position: usize,
        /// Human-readable error message
        message: String,
    },

    /// A function name that the registry does not know
    #[error("Unknown function: {name}")]
    UnknownFunction {
        /// Name used in the expression
        name: String,
    },

    /// Function invoked with an unsupported number of arguments
    #[error("Function '{function}' expects {} argument(s), got {actual}", arity_text(*min, *max))]
    ArityError {
        /// Function name
        function: String,
        /// Minimum accepted arguments
        min: usize,
        /// Maximum accepted arguments ([`UNBOUNDED_ARITY`] when variadic)
        max: usize,
        /// Arguments supplied
        actual: usize,
    },

    /// Operand types that an operator or function cannot combine
    #[error("Type error: {message}")]
    TypeError {
        /// Human-readable type error message
        message: String,
    },

    /// An operation that requires at most one item received several
    #[error("{operation} expects a single item, got {actual}")]
    SingletonExpected {
        /// Operator or function name
        operation: String,
        /// Size of the collection received
        actual: usize,
    },

    /// A function received an argument it cannot use
    #[error("Invalid argument for '{function}': {message}")]
    InvalidArgument {
        /// Function name
        function: String,
        /// Human-readable error message
        message: String,
    },

    /// The injected reference resolver failed
    #[error("Reference resolution failed: {message}")]
    ResolverError {
        /// Message reported by the resolver
        message: String,
    },

    /// The injected terminology service failed
    #[error("Terminology check failed: {message}")]
    TerminologyError {
        /// Message reported by the service
        message: String,
    },

    /// Expression nesting exceeded the configured limit
    #[error("Recursion limit of {limit} exceeded")]
    RecursionLimit {
        /// Configured limit
        limit: usize,
    },

    /// Evaluator invariant violation
    #[error("Internal evaluator error: {message}")]
    Internal {
        /// Human-readable error message
        message: String,
    },
}

fn arity_text(min: usize, max: usize) -> String {
    if min == max {
        min.to_string()
    } else if max == UNBOUNDED_ARITY {
        format!("at least {min}")
    } else {
        format!("{min} to {max}")
    }
}

impl EvalError {
    /// Create a syntax error
    pub fn syntax(
        expression: impl Into<String>,
        position: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::SyntaxError {
            expression: expression.into(),
            position,
            message: message.into(),
        }
    }

    /// Create an unknown function error
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction { name: name.into() }
    }

    /// Create an arity error
    pub fn arity(function: impl Into<String>, min: usize, max: usize, actual: usize) -> Self {
        Self::ArityError {
            function: function.into(),
            min,
            max,
            actual,
        }
    }

    /// Create a type error
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    /// Create a singleton-expected error
    pub fn singleton_expected(operation: impl Into<String>, actual: usize) -> Self {
        Self::SingletonExpected {
            operation: operation.into(),
            actual,
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Create a resolver error
    pub fn resolver(message: impl Into<String>) -> Self {
        Self::ResolverError {
            message: message.into(),
        }
    }

    /// Create a terminology service error
    pub fn terminology(message: impl Into<String>) -> Self {
        Self::TerminologyError {
            message: message.into(),
        }
    }

    /// Create a recursion limit error
    pub fn recursion_limit(limit: usize) -> Self {
        Self::RecursionLimit { limit }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the failure happened before evaluation started
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Self::SyntaxError { .. })
    }
}
