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

//! Function registry
//!
//! The registry is assembled once with [`FunctionRegistryBuilder`] and then
//! frozen behind an `Arc`; a built registry has no mutation API and can be
//! shared by any number of concurrent evaluations.

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::function::{FhirPathFunction, FunctionImpl, LambdaFunction};
use crate::functions::register_builtins;

/// Builder collecting function implementations
#[derive(Default)]
pub struct FunctionRegistryBuilder {
    functions: IndexMap<String, FunctionImpl>,
}

impl FunctionRegistryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-populated with the standard library
    pub fn with_builtins() -> Self {
        let mut builder = Self::new();
        register_builtins(&mut builder);
        builder
    }

    /// Register an eager function, replacing any function of the same name
    pub fn register_function(&mut self, function: impl FhirPathFunction + 'static) -> &mut Self {
        self.insert(FunctionImpl::Eager(Arc::new(function)))
    }

    /// Register a lambda function, replacing any function of the same name
    pub fn register_lambda(&mut self, function: impl LambdaFunction + 'static) -> &mut Self {
        self.insert(FunctionImpl::Lambda(Arc::new(function)))
    }

    /// Register an already wrapped implementation
    pub fn insert(&mut self, function: FunctionImpl) -> &mut Self {
        let name = function.name().to_string();
        if self.functions.insert(name.clone(), function).is_some() {
            log::debug!("Function '{name}' replaced by a later registration");
        }
        self
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether nothing is registered yet
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Freeze the registry
    pub fn build(self) -> Arc<FunctionRegistry> {
        log::debug!("Function registry built with {} functions", self.functions.len());
        Arc::new(FunctionRegistry {
            functions: self.functions,
        })
    }
}

/// Immutable name to function map
pub struct FunctionRegistry {
    functions: IndexMap<String, FunctionImpl>,
}

static STANDARD: OnceCell<Arc<FunctionRegistry>> = OnceCell::new();

impl FunctionRegistry {
    /// Shared registry holding only the standard library
    pub fn standard() -> Arc<FunctionRegistry> {
        STANDARD
            .get_or_init(|| FunctionRegistryBuilder::with_builtins().build())
            .clone()
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionImpl> {
        self.functions.get(name)
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.len())
            .finish()
    }
}
