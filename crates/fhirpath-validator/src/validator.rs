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

//! Validating traversal
//!
//! A [`Validator`] walks a resource tree depth-first in pre-order. At each
//! node it looks up the composed constraints of the node's type, skips the
//! model-checked ones, and evaluates each expression at every context node:
//! the node itself for `Base` constraints, or the tree nodes selected by the
//! location expression. `%resource`, `%rootResource` and `%context` are
//! re-bound before every evaluation.
//!
//! Only a single `false` produces an invariant [`Issue`]. A constraint that
//! yields anything else than a single boolean (or nothing) is logged and
//! passes. Findings that functions such as `memberOf()` record during an
//! evaluation are appended ahead of the constraint's own issue.

use octofhir_fhirpath_constraint::{Constraint, ConstraintRegistry, Location};
use octofhir_fhirpath_core::EvalError;
use octofhir_fhirpath_evaluator::FhirPathEngine;
use octofhir_fhirpath_model::{
    Collection, EmptyProfileRegistry, Item, NodeRef, NoopResolver, NoopTerminologyService,
    ProfileRegistry, ReferenceResolver, TerminologyService,
};
use octofhir_fhirpath_parser::ParseCache;
use octofhir_fhirpath_registry::{EvaluationContext, FunctionRegistry};
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::config::ValidatorConfig;
use crate::error::{Result, ValidationError};
use crate::issue::Issue;

/// Checks resources against a constraint registry
///
/// Holds only shared, immutable state: one validator may run on many
/// threads at once, each call owning its evaluation context and issue list.
#[derive(Clone)]
pub struct Validator {
    engine: FhirPathEngine,
    functions: Arc<FunctionRegistry>,
    constraints: Arc<ConstraintRegistry>,
    resolver: Arc<dyn ReferenceResolver>,
    profiles: Arc<dyn ProfileRegistry>,
    terminology: Arc<dyn TerminologyService>,
    config: ValidatorConfig,
}

impl Validator {
    /// Validator with no resolver, no profiles, no terminology and its own parse cache
    pub fn new(functions: Arc<FunctionRegistry>, constraints: Arc<ConstraintRegistry>) -> Self {
        Self {
            engine: FhirPathEngine::new(),
            functions,
            constraints,
            resolver: Arc::new(NoopResolver),
            profiles: Arc::new(EmptyProfileRegistry),
            terminology: Arc::new(NoopTerminologyService),
            config: ValidatorConfig::default(),
        }
    }

    /// Replace the reference resolver used by `resolve()`
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the profile registry used by `conformsTo()` and type checks
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileRegistry>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Replace the terminology service used by `memberOf()`
    pub fn with_terminology(mut self, terminology: Arc<dyn TerminologyService>) -> Self {
        self.terminology = terminology;
        self
    }

    /// Share a parse cache with other validators
    pub fn with_cache(mut self, cache: Arc<ParseCache>) -> Self {
        self.engine = FhirPathEngine::with_cache(cache).with_config(self.config.evaluation.clone());
        self
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.engine = self.engine.with_config(config.evaluation.clone());
        self.config = config;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Constraint registry in use
    pub fn constraints(&self) -> &Arc<ConstraintRegistry> {
        &self.constraints
    }

    /// Underlying expression engine
    pub fn engine(&self) -> &FhirPathEngine {
        &self.engine
    }

    /// Fresh evaluation context rooted at `node`
    pub fn context_for(&self, node: &NodeRef) -> EvaluationContext {
        EvaluationContext::new(Collection::single(node.clone()), Arc::clone(&self.functions))
            .with_resolver(Arc::clone(&self.resolver))
            .with_profiles(Arc::clone(&self.profiles))
            .with_terminology(Arc::clone(&self.terminology))
    }

    /// Validate `resource` and every node below it
    ///
    /// Issues come in traversal order. An error is returned only when an
    /// expression cannot be evaluated at all.
    pub fn validate(&self, resource: &NodeRef) -> Result<Vec<Issue>> {
        let mut context = self.context_for(resource);
        let mut issues = Vec::new();
        let mut pending = vec![resource.clone()];

        while let Some(node) = pending.pop() {
            if self.check_node(&node, &mut context, &mut issues)?.is_break() {
                tracing::debug!(path = node.path(), "stopping at first error-level issue");
                break;
            }
            let first_child = pending.len();
            pending.extend(node.children());
            pending[first_child..].reverse();
        }

        tracing::debug!(
            resource = resource.type_name(),
            issues = issues.len(),
            "validation finished"
        );
        Ok(issues)
    }

    fn check_node(
        &self,
        node: &NodeRef,
        context: &mut EvaluationContext,
        issues: &mut Vec<Issue>,
    ) -> Result<ControlFlow<()>> {
        let constraints = self.constraints.constraints_for(node.type_name());
        for constraint in constraints.iter().filter(|c| !c.model_checked) {
            context.set_constraint(constraint.id.as_str());
            let targets = self.context_nodes(constraint, node, context)?;
            let mut found = drain_findings(context);
            for target in targets {
                found.extend(self.check(constraint, &target, context)?);
                if self.record(&mut found, issues).is_break() {
                    context.unset_constraint();
                    return Ok(ControlFlow::Break(()));
                }
            }
            if self.record(&mut found, issues).is_break() {
                context.unset_constraint();
                return Ok(ControlFlow::Break(()));
            }
        }
        context.unset_constraint();
        Ok(ControlFlow::Continue(()))
    }

    /// Move `found` into `issues`, breaking on an error-level issue when
    /// failing fast
    fn record(&self, found: &mut Vec<Issue>, issues: &mut Vec<Issue>) -> ControlFlow<()> {
        for issue in found.drain(..) {
            let stop = issue.is_error() && self.config.fail_fast_on_error_level;
            issues.push(issue);
            if stop {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn context_nodes(
        &self,
        constraint: &Constraint,
        node: &NodeRef,
        context: &mut EvaluationContext,
    ) -> Result<Vec<NodeRef>> {
        match &constraint.location {
            Location::Base => Ok(vec![node.clone()]),
            Location::Path(expression) => {
                context.set_root(Collection::single(node.clone()));
                let selected = self
                    .engine
                    .evaluate(expression, context)
                    .map_err(|source| fault(constraint, expression, node, source))?;
                Ok(selected.iter().filter_map(Item::as_node).cloned().collect())
            }
        }
    }

    fn check(
        &self,
        constraint: &Constraint,
        target: &NodeRef,
        context: &mut EvaluationContext,
    ) -> Result<Vec<Issue>> {
        context.set_root(Collection::single(target.clone()));
        let result = self
            .engine
            .evaluate(&constraint.expression, context)
            .map_err(|source| fault(constraint, &constraint.expression, target, source))?;
        let mut found = drain_findings(context);

        match result.as_singleton_boolean() {
            Some(false) => found.push(Issue::invariant(constraint, target.path())),
            Some(true) => {}
            None if result.is_empty() => {}
            None => {
                tracing::warn!(
                    constraint = %constraint.id,
                    path = target.path(),
                    items = result.len(),
                    "constraint did not yield a single boolean; no issue raised"
                );
            }
        }
        Ok(found)
    }
}

fn drain_findings(context: &EvaluationContext) -> Vec<Issue> {
    context.take_issues().into_iter().map(Issue::supplemental).collect()
}

fn fault(constraint: &Constraint, expression: &str, node: &NodeRef, source: EvalError) -> ValidationError {
    tracing::error!(
        target: "fhirpath::validator",
        constraint = %constraint.id,
        location = %constraint.location,
        path = node.path(),
        expression,
        error = %source,
        "constraint evaluation fault"
    );
    ValidationError::ConstraintFault {
        constraint_id: constraint.id.clone(),
        location: constraint.location.clone(),
        expression: expression.to_string(),
        path: node.path().to_string(),
        source,
    }
}
