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

//! Node model for FHIRPath evaluation
//!
//! Records are held as immutable arena trees ([`NodeTree`]) addressed through
//! [`NodeRef`] handles. Evaluation results are [`Collection`]s of [`Item`]s,
//! each either a tree node or a computed [`PrimitiveValue`].

#![warn(missing_docs)]

pub mod collection;
pub mod error;
pub mod json;
pub mod node;
pub mod provider;
pub mod quantity;
pub mod temporal;
pub mod value;

pub use collection::{Collection, Item};
pub use error::{ModelError, Result};
pub use json::{TypeHints, tree_from_json};
pub use node::{NodeData, NodeId, NodeKind, NodeRef, NodeTree, NodeTreeBuilder};
pub use provider::{
    CodedValue, DefinitionKind, EmptyProfileRegistry, FHIR_STRUCTURE_DEFINITION_BASE,
    InMemoryProfileRegistry, InMemoryTerminologyService, NoopResolver, NoopTerminologyService,
    ProfileRegistry, ReferenceResolver, TerminologyService, TypeDefinition,
};
pub use quantity::Quantity;
pub use temporal::{PrecisionDate, PrecisionDateTime, PrecisionTime, TemporalPrecision};
pub use value::PrimitiveValue;
