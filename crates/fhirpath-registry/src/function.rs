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

//! Function traits
//!
//! Most functions receive their arguments already evaluated
//! ([`FhirPathFunction`]). Functions such as `where` or `select` need the
//! argument expression itself so that it can be evaluated once per item;
//! they implement [`LambdaFunction`] and call back into the evaluator through
//! [`LambdaEvaluator`]. This keeps the registry independent of the evaluator.

use octofhir_fhirpath_ast::ExpressionNode;
use octofhir_fhirpath_core::Result;
use octofhir_fhirpath_model::{Collection, Item};
use std::sync::Arc;

use crate::context::EvaluationContext;
use crate::signature::FunctionSignature;

/// Function receiving pre-evaluated arguments
pub trait FhirPathFunction: Send + Sync {
    /// Get the function signature
    fn signature(&self) -> &FunctionSignature;

    /// Get the function name
    fn name(&self) -> &str {
        self.signature().name
    }

    /// Get function documentation
    fn documentation(&self) -> &str {
        ""
    }

    /// Evaluate against `focus`; the arity has already been checked
    fn evaluate(
        &self,
        focus: &Collection,
        args: &[Collection],
        context: &EvaluationContext,
    ) -> Result<Collection>;
}

/// Callback used by lambda functions to evaluate their argument expressions
pub trait LambdaEvaluator {
    /// Evaluate `expression` with `item` as the focus, `$this` and `$index` bound
    fn evaluate_for_item(
        &self,
        expression: &ExpressionNode,
        item: &Item,
        index: usize,
        context: &EvaluationContext,
    ) -> Result<Collection>;

    /// Evaluate `expression` with the whole collection as the focus
    fn evaluate_for_collection(
        &self,
        expression: &ExpressionNode,
        focus: &Collection,
        context: &EvaluationContext,
    ) -> Result<Collection>;
}

/// Context handed to lambda functions
pub struct LambdaEvaluationContext<'a> {
    /// Base evaluation context
    pub context: &'a EvaluationContext,
    /// Lambda expression evaluator
    pub evaluator: &'a dyn LambdaEvaluator,
}

impl LambdaEvaluationContext<'_> {
    /// Evaluate `expression` for one item
    pub fn evaluate_for_item(
        &self,
        expression: &ExpressionNode,
        item: &Item,
        index: usize,
    ) -> Result<Collection> {
        self.evaluator
            .evaluate_for_item(expression, item, index, self.context)
    }

    /// Evaluate `expression` against a whole collection
    pub fn evaluate_for_collection(
        &self,
        expression: &ExpressionNode,
        focus: &Collection,
    ) -> Result<Collection> {
        self.evaluator
            .evaluate_for_collection(expression, focus, self.context)
    }
}

/// Function receiving unevaluated argument expressions
pub trait LambdaFunction: Send + Sync {
    /// Get the function signature
    fn signature(&self) -> &FunctionSignature;

    /// Get the function name
    fn name(&self) -> &str {
        self.signature().name
    }

    /// Get function documentation
    fn documentation(&self) -> &str {
        ""
    }

    /// Evaluate against `focus`; the arity has already been checked
    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection>;
}

/// Registered implementation of a function
#[derive(Clone)]
pub enum FunctionImpl {
    /// Receives evaluated arguments
    Eager(Arc<dyn FhirPathFunction>),
    /// Receives argument expressions
    Lambda(Arc<dyn LambdaFunction>),
}

impl FunctionImpl {
    /// Get the function name
    pub fn name(&self) -> &str {
        match self {
            Self::Eager(func) => func.name(),
            Self::Lambda(func) => func.name(),
        }
    }

    /// Get the function signature
    pub fn signature(&self) -> &FunctionSignature {
        match self {
            Self::Eager(func) => func.signature(),
            Self::Lambda(func) => func.signature(),
        }
    }

    /// Get function documentation
    pub fn documentation(&self) -> &str {
        match self {
            Self::Eager(func) => func.documentation(),
            Self::Lambda(func) => func.documentation(),
        }
    }

    /// Whether argument expressions are passed unevaluated
    pub fn is_lambda(&self) -> bool {
        matches!(self, Self::Lambda(_))
    }
}

impl std::fmt::Debug for FunctionImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_lambda() { "lambda" } else { "eager" };
        write!(f, "{}({kind})", self.name())
    }
}
