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

//! Constraint model and provider registry
//!
//! Each resource or data type carries a list of FHIRPath invariants. The
//! list is composed from the base constraints of the type and its
//! supertypes, then edited by [`ConstraintProvider`]s (profiles,
//! implementation guides, local policy) that add, remove or replace
//! constraints. [`ConstraintRegistry`] memoizes the composed lists.

#![warn(missing_docs)]

pub mod constraint;
pub mod error;
pub mod predicate;
pub mod provider;
pub mod registry;
pub mod set;

pub use constraint::{Constraint, Level, Location};
pub use error::{ConstraintError, Result};
pub use predicate::ConstraintPredicate;
pub use provider::{ConstraintProvider, Replacement, StaticConstraintProvider};
pub use registry::{ConstraintRegistry, ConstraintRegistryBuilder};
pub use set::{ConstraintSet, TypeConstraints};
