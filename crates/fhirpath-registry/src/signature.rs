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

//! Function signatures

use octofhir_fhirpath_core::{EvalError, Result, UNBOUNDED_ARITY};

/// Name and accepted argument count of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Function name (e.g., "where", "toInteger")
    pub name: &'static str,
    /// Minimum number of arguments
    pub min_arity: usize,
    /// Maximum number of arguments; [`UNBOUNDED_ARITY`] for variadic functions
    pub max_arity: usize,
}

impl FunctionSignature {
    /// Signature accepting between `min_arity` and `max_arity` arguments
    pub const fn new(name: &'static str, min_arity: usize, max_arity: usize) -> Self {
        Self {
            name,
            min_arity,
            max_arity,
        }
    }

    /// Signature for a function without arguments
    pub const fn no_args(name: &'static str) -> Self {
        Self::new(name, 0, 0)
    }

    /// Signature for a function with exactly `arity` arguments
    pub const fn fixed(name: &'static str, arity: usize) -> Self {
        Self::new(name, arity, arity)
    }

    /// Signature for a function with at least `min_arity` arguments
    pub const fn variadic(name: &'static str, min_arity: usize) -> Self {
        Self::new(name, min_arity, UNBOUNDED_ARITY)
    }

    /// Whether `actual` arguments are accepted
    pub fn accepts(&self, actual: usize) -> bool {
        actual >= self.min_arity && actual <= self.max_arity
    }

    /// Fail with [`EvalError::ArityError`] unless `actual` arguments are accepted
    pub fn check_arity(&self, actual: usize) -> Result<()> {
        if self.accepts(actual) {
            Ok(())
        } else {
            Err(EvalError::arity(
                self.name,
                self.min_arity,
                self.max_arity,
                actual,
            ))
        }
    }
}
