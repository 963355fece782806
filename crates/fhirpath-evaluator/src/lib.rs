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

//! FHIRPath expression evaluator
//!
//! [`FhirPathEngine`] parses expressions once (through a shared
//! [`ParseCache`](octofhir_fhirpath_parser::ParseCache)) and walks the AST
//! against an [`EvaluationContext`]. Operator semantics live in
//! [`evaluators`]; functions come from the registry held by the context.

#![warn(missing_docs)]

pub mod engine;
pub mod evaluators;

pub use engine::{EvaluationConfig, FhirPathEngine};
pub use octofhir_fhirpath_registry::EvaluationContext;
