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

//! Validating traversal of FHIR resources
//!
//! Walks a resource tree and evaluates the composed FHIRPath constraints of
//! every node's type. Failed constraints become [`Issue`]s; expressions that
//! cannot be evaluated abort the call with a [`ValidationError`].
//!
//! ```
//! use std::sync::Arc;
//! use octofhir_fhirpath_constraint::{Constraint, ConstraintRegistry};
//! use octofhir_fhirpath_model::{TypeHints, NodeRef, tree_from_json};
//! use octofhir_fhirpath_validator::ValidationEngine;
//!
//! let mut constraints = ConstraintRegistry::builder();
//! constraints
//!     .declare_type("Patient", None)?
//!     .base_constraint("Patient", Constraint::error("pat-1", "name.exists()"))?;
//! let engine = ValidationEngine::builder()
//!     .constraints(constraints.build()?)
//!     .build();
//!
//! let resource = serde_json::json!({"resourceType": "Patient", "active": true});
//! let tree = tree_from_json(&resource, &TypeHints::fhir_core())?;
//! let issues = engine.validate(&NodeRef::root(tree))?;
//! assert_eq!(issues[0].text, "pat-1");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod error;
pub mod issue;
pub mod validator;

pub use config::ValidatorConfig;
pub use engine::{ValidationEngine, ValidationEngineBuilder};
pub use error::{Result, ValidationError};
pub use issue::{Issue, IssueCode, IssueSeverity, ValidationOutcome, has_errors};
pub use validator::Validator;
