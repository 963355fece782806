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

//! FHIRPath evaluation and composable constraint validation
//!
//! This crate re-exports the workspace crates behind one dependency:
//!
//! - [`model`]: the immutable node tree, values and collections
//! - [`parser`] / [`ast`]: expression parsing and the parse cache
//! - [`registry`]: the function library and evaluation context
//! - [`evaluator`]: the expression engine
//! - [`constraint`]: constraints, providers and the composing registry
//! - [`validator`]: the validating traversal
//!
//! ```rust
//! use octofhir_fhirvalidate::prelude::*;
//! use serde_json::json;
//!
//! let mut constraints = ConstraintRegistry::builder();
//! constraints
//!     .declare_type("Patient", None)?
//!     .base_constraint(
//!         "Patient",
//!         Constraint::warning("foo-1", "family.exists()")
//!             .at("name")
//!             .with_description("name SHOULD have a family component"),
//!     )?;
//! let engine = ValidationEngine::builder()
//!     .constraints(constraints.build()?)
//!     .build();
//!
//! let patient = json!({"resourceType": "Patient", "name": [{"given": ["Ann"]}]});
//! let resource = NodeRef::root(tree_from_json(&patient, &TypeHints::fhir_core())?);
//! let issues = engine.validate(&resource)?;
//! assert_eq!(issues[0].path, "Patient.name[0]");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use octofhir_fhirpath_ast as ast;
pub use octofhir_fhirpath_constraint as constraint;
pub use octofhir_fhirpath_core as core;
pub use octofhir_fhirpath_evaluator as evaluator;
pub use octofhir_fhirpath_model as model;
pub use octofhir_fhirpath_parser as parser;
pub use octofhir_fhirpath_registry as registry;
pub use octofhir_fhirpath_validator as validator;

pub use octofhir_fhirpath_core::{EvalError, Result};
pub use octofhir_fhirpath_evaluator::{EvaluationConfig, FhirPathEngine};
pub use octofhir_fhirpath_registry::{EvaluationContext, FunctionRegistry};
pub use octofhir_fhirpath_validator::{Issue, ValidationEngine, ValidationError, Validator};

/// Commonly used types
pub mod prelude {
    pub use octofhir_fhirpath_constraint::{
        Constraint, ConstraintPredicate, ConstraintProvider, ConstraintRegistry, ConstraintSet,
        Level, Location, StaticConstraintProvider,
    };
    pub use octofhir_fhirpath_core::EvalError;
    pub use octofhir_fhirpath_evaluator::{EvaluationConfig, FhirPathEngine};
    pub use octofhir_fhirpath_model::{
        CodedValue, Collection, InMemoryTerminologyService, Item, NodeRef, PrimitiveValue,
        ProfileRegistry, ReferenceResolver, TerminologyService, TypeHints, tree_from_json,
    };
    pub use octofhir_fhirpath_registry::{EvaluationContext, FunctionRegistry, SupplementalIssue};
    pub use octofhir_fhirpath_validator::{
        Issue, IssueCode, IssueSeverity, ValidationEngine, ValidationError, ValidationOutcome,
        Validator, ValidatorConfig,
    };
}
