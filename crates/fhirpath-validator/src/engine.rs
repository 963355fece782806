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

//! Bundled validation engine

use octofhir_fhirpath_constraint::ConstraintRegistry;
use octofhir_fhirpath_model::{
    Collection, EmptyProfileRegistry, NodeRef, NoopResolver, NoopTerminologyService,
    ProfileRegistry, ReferenceResolver, TerminologyService,
};
use octofhir_fhirpath_parser::{ParseCache, ParseCacheConfig, ParseCacheStats};
use octofhir_fhirpath_registry::FunctionRegistry;
use std::sync::Arc;

use crate::config::ValidatorConfig;
use crate::error::Result;
use crate::issue::Issue;
use crate::validator::Validator;

/// Function library, constraints, collaborators and parse cache in one place
///
/// ```
/// use octofhir_fhirpath_validator::ValidationEngine;
///
/// let engine = ValidationEngine::builder().build();
/// assert_eq!(engine.cache_stats().entries, 0);
/// ```
pub struct ValidationEngine {
    functions: Arc<FunctionRegistry>,
    constraints: Arc<ConstraintRegistry>,
    resolver: Arc<dyn ReferenceResolver>,
    profiles: Arc<dyn ProfileRegistry>,
    terminology: Arc<dyn TerminologyService>,
    cache: Arc<ParseCache>,
    validator: Validator,
}

impl ValidationEngine {
    /// Start a builder
    pub fn builder() -> ValidationEngineBuilder {
        ValidationEngineBuilder::default()
    }

    /// Validator sharing this engine's registries and parse cache
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Validate `resource`
    pub fn validate(&self, resource: &NodeRef) -> Result<Vec<Issue>> {
        self.validator.validate(resource)
    }

    /// Evaluate a free-standing expression with `resource` as context
    pub fn evaluate(&self, expression: &str, resource: &NodeRef) -> octofhir_fhirpath_core::Result<Collection> {
        let context = self.validator.context_for(resource);
        self.validator.engine().evaluate(expression, &context)
    }

    /// Function library
    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Constraint registry
    pub fn constraints(&self) -> &Arc<ConstraintRegistry> {
        &self.constraints
    }

    /// Reference resolver
    pub fn resolver(&self) -> &Arc<dyn ReferenceResolver> {
        &self.resolver
    }

    /// Profile registry
    pub fn profiles(&self) -> &Arc<dyn ProfileRegistry> {
        &self.profiles
    }

    /// Terminology service
    pub fn terminology(&self) -> &Arc<dyn TerminologyService> {
        &self.terminology
    }

    /// Parse cache statistics
    pub fn cache_stats(&self) -> ParseCacheStats {
        self.cache.stats()
    }
}

/// Builder for [`ValidationEngine`]; every part has a default
#[derive(Default)]
pub struct ValidationEngineBuilder {
    functions: Option<Arc<FunctionRegistry>>,
    constraints: Option<Arc<ConstraintRegistry>>,
    resolver: Option<Arc<dyn ReferenceResolver>>,
    profiles: Option<Arc<dyn ProfileRegistry>>,
    terminology: Option<Arc<dyn TerminologyService>>,
    cache: ParseCacheConfig,
    config: ValidatorConfig,
}

impl ValidationEngineBuilder {
    /// Function library; the standard library by default
    pub fn functions(mut self, functions: Arc<FunctionRegistry>) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Constraint registry; empty by default
    pub fn constraints(mut self, constraints: Arc<ConstraintRegistry>) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Reference resolver; resolves nothing by default
    pub fn resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Profile registry; knows nothing by default
    pub fn profiles(mut self, profiles: Arc<dyn ProfileRegistry>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Terminology service for `memberOf()`; decides nothing by default
    pub fn terminology(mut self, terminology: Arc<dyn TerminologyService>) -> Self {
        self.terminology = Some(terminology);
        self
    }

    /// Parse cache sizing
    pub fn cache_config(mut self, config: ParseCacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Validator configuration
    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the engine
    pub fn build(self) -> ValidationEngine {
        let functions = self.functions.unwrap_or_else(FunctionRegistry::standard);
        let constraints = self.constraints.unwrap_or_else(ConstraintRegistry::empty);
        let resolver = self.resolver.unwrap_or_else(|| Arc::new(NoopResolver));
        let profiles = self.profiles.unwrap_or_else(|| Arc::new(EmptyProfileRegistry));
        let terminology = self
            .terminology
            .unwrap_or_else(|| Arc::new(NoopTerminologyService));
        let cache = Arc::new(ParseCache::with_config(self.cache));

        let validator = Validator::new(Arc::clone(&functions), Arc::clone(&constraints))
            .with_resolver(Arc::clone(&resolver))
            .with_profiles(Arc::clone(&profiles))
            .with_terminology(Arc::clone(&terminology))
            .with_config(self.config)
            .with_cache(Arc::clone(&cache));

        tracing::debug!(
            functions = functions.len(),
            constraint_providers = constraints.provider_count(),
            terminology = terminology.name(),
            "validation engine assembled"
        );
        ValidationEngine {
            functions,
            constraints,
            resolver,
            profiles,
            terminology,
            cache,
            validator,
        }
    }
}
