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

//! FHIRPath function library
//!
//! This crate provides the function registry used by the evaluator, the
//! standard function library, and the per-call [`EvaluationContext`].

#![warn(missing_docs)]

pub mod context;
pub mod function;
pub mod functions;
pub mod issue;
pub mod registry;
pub mod signature;
pub mod types;

pub use context::{EvaluationContext, LOINC_SYSTEM, SCT_SYSTEM, UCUM_SYSTEM};
pub use function::{
    FhirPathFunction, FunctionImpl, LambdaEvaluationContext, LambdaEvaluator, LambdaFunction,
};
pub use functions::conversion::{to_boolean, to_decimal, to_integer, to_quantity};
pub use functions::terminology::BindingStrength;
pub use functions::types::{filter_by_type, is_type};
pub use issue::{SupplementalCode, SupplementalIssue, SupplementalSeverity};
pub use registry::{FunctionRegistry, FunctionRegistryBuilder};
pub use signature::FunctionSignature;
pub use types::{TypeNamespace, TypeSpecifier, type_closure, type_matches};
