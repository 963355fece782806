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

//! Validation faults

use octofhir_fhirpath_constraint::Location;
use octofhir_fhirpath_core::EvalError;
use thiserror::Error;

/// Result type alias for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Deployment defect that aborts a validation call
///
/// Findings about the data are reported as [`Issue`](crate::Issue)s, never
/// as errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A constraint expression failed to parse or evaluate
    #[error("Constraint '{constraint_id}' failed at {path} (location {location}): {source}")]
    ConstraintFault {
        /// Constraint id
        constraint_id: String,
        /// Constraint location
        location: Location,
        /// Expression that failed: the constraint or its location expression
        expression: String,
        /// Path of the node being checked
        path: String,
        /// Evaluator error
        #[source]
        source: EvalError,
    },

    /// `bootstrap::install` was called twice
    #[error("A validation engine is already installed")]
    AlreadyInstalled,

    /// `bootstrap::engine` was called before `bootstrap::install`
    #[error("No validation engine is installed")]
    NotInstalled,
}
