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

//! FHIRPath evaluation engine
//!
//! The engine is a tree walker over [`ExpressionNode`]. Each call carries an
//! *input* collection (what a path step or function applies to) and a scope
//! holding `$this` and `$index`. At the top of an expression both are the
//! context root; lambda functions re-bind them for every item they visit.
//!
//! Arguments of ordinary functions, and index expressions, are evaluated
//! against `$this`, so `name.given.subsetOf(name.given)` compares two
//! navigations from the same resource.
//!
//! # Configuration
//!
//! ```rust
//! use octofhir_fhirpath_evaluator::{EvaluationConfig, FhirPathEngine};
//!
//! let engine = FhirPathEngine::new().with_config(EvaluationConfig {
//!     max_recursion_depth: 200,
//!     trace_enabled: true,
//! });
//! assert_eq!(engine.config().max_recursion_depth, 200);
//! ```

use octofhir_fhirpath_ast::{BinaryOpData, BinaryOperator, ExpressionNode, SpecialVariable};
use octofhir_fhirpath_core::{EvalError, Result};
use octofhir_fhirpath_model::{Collection, Item, PrimitiveValue};
use octofhir_fhirpath_parser::{ParseCache, ParseCacheStats, SharedAst};
use octofhir_fhirpath_registry::{
    EvaluationContext, FunctionImpl, LambdaEvaluationContext, LambdaEvaluator, filter_by_type,
    is_type,
};
use std::cell::Cell;
use std::sync::Arc;

use crate::evaluators::{
    ArithmeticEvaluator, CollectionEvaluator, ComparisonEvaluator, LiteralEvaluator,
    LogicalEvaluator, NavigationEvaluator,
};

/// Configuration options for FHIRPath evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// Maximum nesting of expression nodes and lambda bodies
    pub max_recursion_depth: usize,
    /// Log every function call at `trace` level
    pub trace_enabled: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: 1000,
            trace_enabled: false,
        }
    }
}

/// FHIRPath evaluation engine
///
/// Cheap to clone: clones share the parse cache. The engine holds no
/// per-call state, so one instance can serve any number of threads, each
/// with its own [`EvaluationContext`].
#[derive(Clone, Default)]
pub struct FhirPathEngine {
    cache: Arc<ParseCache>,
    config: EvaluationConfig,
}

impl FhirPathEngine {
    /// Engine with its own parse cache and the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine sharing an existing parse cache
    pub fn with_cache(cache: Arc<ParseCache>) -> Self {
        Self {
            cache,
            config: EvaluationConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EvaluationConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Parse cache statistics
    pub fn cache_stats(&self) -> ParseCacheStats {
        self.cache.stats()
    }

    /// Parse `expression` through the cache
    pub fn parse(&self, expression: &str) -> Result<SharedAst> {
        self.cache.get_or_parse(expression)
    }

    /// Evaluate an expression string against the context root
    pub fn evaluate(&self, expression: &str, context: &EvaluationContext) -> Result<Collection> {
        let ast = self.parse(expression)?;
        self.evaluate_ast(&ast, context).inspect_err(|error| {
            tracing::debug!(expression, %error, "evaluation failed");
        })
    }

    /// Evaluate a parsed expression against the context root
    pub fn evaluate_ast(&self, ast: &ExpressionNode, context: &EvaluationContext) -> Result<Collection> {
        let root = context.root().clone();
        let scope = Scope {
            this: root.clone(),
            index: None,
        };
        Walker::new(&self.config).eval(ast, &root, &scope, context)
    }
}

/// Iteration variables visible to an expression
struct Scope {
    this: Collection,
    index: Option<usize>,
}

/// Per-call tree walker; tracks the current nesting depth
struct Walker<'e> {
    config: &'e EvaluationConfig,
    depth: Cell<usize>,
}

impl<'e> Walker<'e> {
    fn new(config: &'e EvaluationConfig) -> Self {
        Self {
            config,
            depth: Cell::new(0),
        }
    }

    fn eval(
        &self,
        node: &ExpressionNode,
        input: &Collection,
        scope: &Scope,
        context: &EvaluationContext,
    ) -> Result<Collection> {
        let depth = self.depth.get() + 1;
        if depth > self.config.max_recursion_depth {
            return Err(EvalError::recursion_limit(self.config.max_recursion_depth));
        }
        self.depth.set(depth);
        let result = self.eval_node(node, input, scope, context);
        self.depth.set(depth - 1);
        result
    }

    fn eval_node(
        &self,
        node: &ExpressionNode,
        input: &Collection,
        scope: &Scope,
        context: &EvaluationContext,
    ) -> Result<Collection> {
        match node {
            ExpressionNode::Literal(literal) => LiteralEvaluator::evaluate(literal),
            ExpressionNode::Identifier(name) => Ok(NavigationEvaluator::navigate_root(input, name)),
            ExpressionNode::Path { base, path } => {
                let base = self.eval(base, input, scope, context)?;
                Ok(NavigationEvaluator::navigate(&base, path))
            }
            ExpressionNode::BinaryOp(data) => self.binary(data, input, scope, context),
            ExpressionNode::UnaryOp { op, operand } => {
                let operand = self.eval(operand, input, scope, context)?;
                ArithmeticEvaluator::evaluate_unary(*op, &operand)
            }
            ExpressionNode::FunctionCall(call) => {
                self.call(&call.name, &call.args, input, scope, context)
            }
            ExpressionNode::MethodCall(call) => {
                let focus = self.eval(&call.base, input, scope, context)?;
                self.call(&call.method, &call.args, &focus, scope, context)
            }
            ExpressionNode::Index { base, index } => {
                let base = self.eval(base, input, scope, context)?;
                let index = self.eval(index, &scope.this, scope, context)?;
                Self::index(&base, &index)
            }
            ExpressionNode::TypeCheck {
                expression,
                type_name,
            } => {
                let value = self.eval(expression, input, scope, context)?;
                is_type(&value, type_name, context.profiles())
            }
            ExpressionNode::TypeCast {
                expression,
                type_name,
            } => {
                let value = self.eval(expression, input, scope, context)?;
                Ok(filter_by_type(&value, type_name, context.profiles()))
            }
            ExpressionNode::Variable(name) => Ok(context.variable(name).unwrap_or_else(|| {
                tracing::debug!(constant = %name, "unbound external constant evaluates to empty");
                Collection::empty()
            })),
            ExpressionNode::Special(SpecialVariable::This) => Ok(scope.this.clone()),
            ExpressionNode::Special(SpecialVariable::Index) => Ok(scope
                .index
                .and_then(|i| i64::try_from(i).ok())
                .map(|i| Collection::single(PrimitiveValue::Integer(i)))
                .unwrap_or_default()),
            // No aggregating function binds $total
            ExpressionNode::Special(SpecialVariable::Total) => Ok(Collection::empty()),
        }
    }

    fn binary(
        &self,
        data: &BinaryOpData,
        input: &Collection,
        scope: &Scope,
        context: &EvaluationContext,
    ) -> Result<Collection> {
        let op = data.op;
        let left = self.eval(&data.left, input, scope, context)?;
        if op.is_logical() {
            if let Some(decided) =
                LogicalEvaluator::short_circuit(op, LogicalEvaluator::truth_value(&left))
            {
                return Ok(Collection::boolean(decided));
            }
        }
        let right = self.eval(&data.right, input, scope, context)?;

        use BinaryOperator::*;
        match op {
            Add | Subtract | Multiply | Divide | IntegerDivide | Modulo | Concatenate => {
                ArithmeticEvaluator::evaluate(op, &left, &right)
            }
            Equal | NotEqual | Equivalent | NotEquivalent | LessThan | LessThanOrEqual
            | GreaterThan | GreaterThanOrEqual => Ok(ComparisonEvaluator::evaluate(op, &left, &right)),
            Union | In | Contains => Ok(CollectionEvaluator::evaluate(op, &left, &right)),
            And | Or | Xor | Implies => Ok(LogicalEvaluator::evaluate(op, &left, &right)),
        }
    }

    fn index(base: &Collection, index: &Collection) -> Result<Collection> {
        if index.is_empty() {
            return Ok(Collection::empty());
        }
        match index.singleton().and_then(Item::to_primitive) {
            Some(PrimitiveValue::Integer(i)) => Ok(usize::try_from(i)
                .ok()
                .and_then(|i| base.get(i))
                .cloned()
                .map(Collection::single)
                .unwrap_or_default()),
            _ => Err(EvalError::type_error("index must be a single integer")),
        }
    }

    fn call(
        &self,
        name: &str,
        args: &[ExpressionNode],
        focus: &Collection,
        scope: &Scope,
        context: &EvaluationContext,
    ) -> Result<Collection> {
        let function = context
            .functions()
            .get(name)
            .ok_or_else(|| EvalError::unknown_function(name))?;
        function.signature().check_arity(args.len())?;
        if self.config.trace_enabled {
            tracing::trace!(function = name, input = focus.len(), args = args.len(), "calling function");
        }

        match function {
            FunctionImpl::Eager(function) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, &scope.this, scope, context))
                    .collect::<Result<Vec<_>>>()?;
                function.evaluate(focus, &args, context)
            }
            FunctionImpl::Lambda(function) => {
                let lambda = LambdaEvaluationContext {
                    context,
                    evaluator: self,
                };
                function.evaluate_with_lambda(focus, args, &lambda)
            }
        }
    }
}

impl LambdaEvaluator for Walker<'_> {
    fn evaluate_for_item(
        &self,
        expression: &ExpressionNode,
        item: &Item,
        index: usize,
        context: &EvaluationContext,
    ) -> Result<Collection> {
        let focus = Collection::single(item.clone());
        let scope = Scope {
            this: focus.clone(),
            index: Some(index),
        };
        self.eval(expression, &focus, &scope, context)
    }

    fn evaluate_for_collection(
        &self,
        expression: &ExpressionNode,
        focus: &Collection,
        context: &EvaluationContext,
    ) -> Result<Collection> {
        let scope = Scope {
            this: focus.clone(),
            index: None,
        };
        self.eval(expression, focus, &scope, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_model::{NodeRef, TypeHints, tree_from_json};
    use octofhir_fhirpath_registry::FunctionRegistry;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn patient_context() -> EvaluationContext {
        let patient = json!({
            "resourceType": "Patient",
            "id": "p1",
            "active": true,
            "name": [
                {"use": "official", "family": "Doe", "given": ["John", "Q"]},
                {"use": "nickname", "given": ["Johnny"]}
            ],
            "birthDate": "1980-05-02",
            "deceasedBoolean": false
        });
        let tree = tree_from_json(&patient, &TypeHints::fhir_core()).expect("tree");
        EvaluationContext::new(Collection::single(NodeRef::root(tree)), FunctionRegistry::standard())
    }

    fn eval(expression: &str) -> Result<Collection> {
        FhirPathEngine::new().evaluate(expression, &patient_context())
    }

    fn rendered(expression: &str) -> String {
        eval(expression).expect("evaluates").to_string()
    }

    #[rstest]
    #[case("Patient.name.given", "[John, Q, Johnny]")]
    #[case("name.given", "[John, Q, Johnny]")]
    #[case("name[1].given", "[Johnny]")]
    #[case("name[5].given", "[]")]
    #[case("name.where(use = 'official').family", "[Doe]")]
    #[case("name.select(given.first())", "[John, Johnny]")]
    #[case("name.given.count()", "[3]")]
    #[case("name.given | name.given", "[John, Q, Johnny]")]
    #[case("name.given.where($index > 0)", "[Q, Johnny]")]
    #[case("deceased", "[false]")]
    #[case("deceased is boolean", "[true]")]
    #[case("birthDate < @2000-01-01", "[true]")]
    #[case("birthDate + 1 year", "[1981-05-02]")]
    #[case("name.family & ', ' & name.given.first()", "[Doe, John]")]
    #[case("1 + 2 * 3", "[7]")]
    #[case("(1 | 2 | 3).where($this > 1)", "[2, 3]")]
    fn evaluates_expressions(#[case] expression: &str, #[case] expected: &str) {
        assert_eq!(rendered(expression), expected);
    }

    #[rstest]
    #[case("name.nothing = 'x'", "[]")]
    #[case("name.nothing.exists()", "[false]")]
    #[case("name.nothing.empty() and active", "[true]")]
    #[case("{} and false", "[false]")]
    #[case("{} or false", "[]")]
    #[case("false implies {}", "[true]")]
    #[case("-name.given", "[]")]
    fn empty_propagation(#[case] expression: &str, #[case] expected: &str) {
        assert_eq!(rendered(expression), expected);
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        // unknownFn would fail if it were evaluated
        assert_eq!(rendered("false and unknownFn()"), "[false]");
        assert_eq!(rendered("true or unknownFn()"), "[true]");
        assert!(matches!(
            eval("true and unknownFn()"),
            Err(EvalError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn single_and_union_semantics() {
        assert_eq!(rendered("name.family.single()"), "[Doe]");
        assert_eq!(rendered("name.given.single()"), "[]");
        assert_eq!(rendered("(1 | 1 | 2).count()"), "[2]");
        assert_eq!(rendered("(1 | 2).combine(1 | 2).count()"), "[4]");
    }

    #[test]
    fn external_constants() {
        assert_eq!(rendered("%resource.id"), "[p1]");
        assert_eq!(rendered("%context.name.count()"), "[2]");
        assert_eq!(rendered("%ucum"), "[http://unitsofmeasure.org]");
        assert_eq!(rendered("%missing"), "[]");
        assert_eq!(rendered("%missing.empty()"), "[true]");
    }

    #[test]
    fn configuration_errors() {
        assert!(matches!(eval("name."), Err(EvalError::SyntaxError { .. })));
        assert!(matches!(eval("name.frobnicate()"), Err(EvalError::UnknownFunction { .. })));
        assert!(matches!(eval("name.first(1)"), Err(EvalError::ArityError { .. })));
        assert!(matches!(eval("'a' - 1"), Err(EvalError::TypeError { .. })));
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let engine = FhirPathEngine::new().with_config(EvaluationConfig {
            max_recursion_depth: 3,
            trace_enabled: false,
        });
        let result = engine.evaluate("name.where(given.exists()).family", &patient_context());
        assert_eq!(result, Err(EvalError::RecursionLimit { limit: 3 }));
    }

    #[test]
    fn parse_cache_is_shared_between_clones() {
        let engine = FhirPathEngine::new();
        let clone = engine.clone();
        let context = patient_context();
        engine.evaluate("name.given", &context).expect("first");
        clone.evaluate("name.given", &context).expect("second");
        let stats = engine.cache_stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }
}
