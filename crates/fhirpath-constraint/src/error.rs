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

//! Registry construction errors

use thiserror::Error;

/// Result type alias for constraint registry operations
pub type Result<T> = std::result::Result<T, ConstraintError>;

/// Error raised while declaring types or loading constraint sets
#[derive(Error, Debug)]
pub enum ConstraintError {
    /// The same type was declared twice
    #[error("Type '{name}' is already declared")]
    DuplicateType {
        /// Type name
        name: String,
    },

    /// Base constraints were given for a type that was never declared
    #[error("Type '{name}' is not declared")]
    UnknownType {
        /// Type name
        name: String,
    },

    /// A declared supertype does not exist
    #[error("Type '{type_name}' names unknown supertype '{supertype}'")]
    UnknownSupertype {
        /// Declaring type
        type_name: String,
        /// Missing supertype
        supertype: String,
    },

    /// Following supertypes from a type leads back to it
    #[error("Supertype chain of '{type_name}' is cyclic")]
    SupertypeCycle {
        /// A type on the cycle
        type_name: String,
    },

    /// A constraint set could not be decoded
    #[error("Invalid constraint set: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConstraintError {
    /// Create a duplicate type error
    pub fn duplicate_type(name: impl Into<String>) -> Self {
        Self::DuplicateType { name: name.into() }
    }

    /// Create an unknown type error
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }
}
