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

//! Error types for the model crate

use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model-specific error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Invalid date/time text
    #[error("Invalid date/time format: {value}")]
    InvalidDateTime {
        /// The invalid value
        value: String,
    },

    /// Incompatible units for a quantity operation
    #[error("Incompatible units: '{left}' and '{right}'")]
    IncompatibleUnits {
        /// Left unit
        left: String,
        /// Right unit
        right: String,
    },

    /// A JSON document that cannot be turned into a node tree
    #[error("Invalid resource JSON: {message}")]
    InvalidJson {
        /// What is wrong with the document
        message: String,
    },

    /// A node id used with a tree that does not contain it
    #[error("Node {id} does not belong to this tree")]
    UnknownNode {
        /// Raw node index
        id: usize,
    },

    /// Failure reported by an external collaborator (resolver, profile store, terminology)
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        /// Which collaborator failed
        collaborator: &'static str,
        /// Message reported by it
        message: String,
    },
}

impl ModelError {
    /// Create an invalid date/time error
    pub fn invalid_datetime(value: impl Into<String>) -> Self {
        Self::InvalidDateTime {
            value: value.into(),
        }
    }

    /// Create an incompatible units error
    pub fn incompatible_units(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::IncompatibleUnits {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Create an invalid JSON error
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidJson {
            message: message.into(),
        }
    }

    /// Create a resolver failure
    pub fn resolver(message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: "reference resolver",
            message: message.into(),
        }
    }

    /// Create a terminology service failure
    pub fn terminology(message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: "terminology service",
            message: message.into(),
        }
    }
}
