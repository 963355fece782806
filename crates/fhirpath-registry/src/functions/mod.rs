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

//! Standard function library

use octofhir_fhirpath_core::{EvalError, Result};
use octofhir_fhirpath_model::{Collection, PrimitiveValue};

use crate::registry::FunctionRegistryBuilder;

/// Implements `signature()` with a static signature
macro_rules! static_signature {
    ($signature:expr) => {
        fn signature(&self) -> &$crate::signature::FunctionSignature {
            static SIGNATURE: $crate::signature::FunctionSignature = $signature;
            &SIGNATURE
        }
    };
}

pub mod conversion;
pub mod datetime;
pub mod existence;
pub mod fhir;
pub mod filtering;
pub mod string;
pub mod subsetting;
pub mod terminology;
pub mod tree;
pub mod types;

/// Register every built-in function
pub fn register_builtins(builder: &mut FunctionRegistryBuilder) {
    existence::register(builder);
    filtering::register(builder);
    subsetting::register(builder);
    conversion::register(builder);
    string::register(builder);
    types::register(builder);
    tree::register(builder);
    fhir::register(builder);
    datetime::register(builder);
    terminology::register(builder);
}

/// Primitive value of a single-item collection
///
/// Empty and multi-item collections have none.
pub(crate) fn singleton_value(collection: &Collection) -> Option<PrimitiveValue> {
    collection.singleton().and_then(|item| item.to_primitive())
}

/// String value of a single-item collection
pub(crate) fn singleton_string(collection: &Collection) -> Option<String> {
    singleton_value(collection).and_then(|value| value.as_str().map(str::to_string))
}

/// String argument at `index`; `None` when the argument is empty
pub(crate) fn string_arg(args: &[Collection], index: usize, function: &str) -> Result<Option<String>> {
    match args.get(index) {
        None => Ok(None),
        Some(arg) if arg.is_empty() => Ok(None),
        Some(arg) => match singleton_value(arg) {
            Some(PrimitiveValue::String(s)) => Ok(Some(s.to_string())),
            _ => Err(EvalError::invalid_argument(
                function,
                format!("argument {} must be a single string", index + 1),
            )),
        },
    }
}

/// Integer argument at `index`; `None` when the argument is empty
pub(crate) fn integer_arg(args: &[Collection], index: usize, function: &str) -> Result<Option<i64>> {
    match args.get(index) {
        None => Ok(None),
        Some(arg) if arg.is_empty() => Ok(None),
        Some(arg) => match singleton_value(arg) {
            Some(PrimitiveValue::Integer(i)) => Ok(Some(i)),
            _ => Err(EvalError::invalid_argument(
                function,
                format!("argument {} must be a single integer", index + 1),
            )),
        },
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use octofhir_fhirpath_ast::ExpressionNode;
    use octofhir_fhirpath_core::Result;
    use octofhir_fhirpath_model::{Collection, Item, PrimitiveValue};

    use crate::context::EvaluationContext;
    use crate::function::{FunctionImpl, LambdaEvaluationContext, LambdaEvaluator};
    use crate::registry::FunctionRegistry;

    /// Minimal lambda evaluator: understands literals, `$this`, identifiers
    /// naming children, and calls of registry functions on `$this`
    pub struct MiniEvaluator;

    impl MiniEvaluator {
        fn eval(
            &self,
            expression: &ExpressionNode,
            focus: &Collection,
            context: &EvaluationContext,
        ) -> Result<Collection> {
            match expression {
                ExpressionNode::Literal(literal) => Ok(literal_value(literal)),
                ExpressionNode::Special(_) => Ok(focus.clone()),
                ExpressionNode::Identifier(name) => Ok(focus
                    .iter()
                    .filter_map(Item::as_node)
                    .flat_map(|node| node.children_named(name).collect::<Vec<_>>())
                    .map(Item::Node)
                    .collect()),
                ExpressionNode::Path { base, path } => {
                    let base = self.eval(base, focus, context)?;
                    self.eval(&ExpressionNode::Identifier(path.clone()), &base, context)
                }
                ExpressionNode::FunctionCall(call) => call_function(
                    self,
                    &call.name,
                    &call.args,
                    focus,
                    context,
                ),
                ExpressionNode::MethodCall(call) => {
                    let base = self.eval(&call.base, focus, context)?;
                    call_function(self, &call.method, &call.args, &base, context)
                }
                ExpressionNode::BinaryOp(data) => {
                    let left = self.eval(&data.left, focus, context)?;
                    let right = self.eval(&data.right, focus, context)?;
                    let equal = match (left.singleton(), right.singleton()) {
                        (Some(l), Some(r)) => l.equals(r),
                        _ => None,
                    };
                    Ok(Collection::from_option_bool(equal))
                }
                other => panic!("unsupported in tests: {other}"),
            }
        }
    }

    fn literal_value(literal: &octofhir_fhirpath_ast::LiteralValue) -> Collection {
        use octofhir_fhirpath_ast::LiteralValue;
        match literal {
            LiteralValue::Boolean(b) => Collection::boolean(*b),
            LiteralValue::Integer(i) => Collection::single(PrimitiveValue::Integer(*i)),
            LiteralValue::String(s) => Collection::single(PrimitiveValue::string(s)),
            LiteralValue::Decimal(d) => {
                Collection::single(PrimitiveValue::Decimal(d.parse().expect("decimal")))
            }
            _ => Collection::empty(),
        }
    }

    impl LambdaEvaluator for MiniEvaluator {
        fn evaluate_for_item(
            &self,
            expression: &ExpressionNode,
            item: &Item,
            _index: usize,
            context: &EvaluationContext,
        ) -> Result<Collection> {
            self.eval(expression, &Collection::single(item.clone()), context)
        }

        fn evaluate_for_collection(
            &self,
            expression: &ExpressionNode,
            focus: &Collection,
            context: &EvaluationContext,
        ) -> Result<Collection> {
            self.eval(expression, focus, context)
        }
    }

    /// Invoke a registry function the way the evaluator does
    pub fn call_function(
        evaluator: &MiniEvaluator,
        name: &str,
        args: &[ExpressionNode],
        focus: &Collection,
        context: &EvaluationContext,
    ) -> Result<Collection> {
        let function = context
            .functions()
            .get(name)
            .cloned()
            .ok_or_else(|| octofhir_fhirpath_core::EvalError::unknown_function(name))?;
        function.signature().check_arity(args.len())?;
        match function {
            FunctionImpl::Eager(function) => {
                let args = args
                    .iter()
                    .map(|arg| evaluator.eval(arg, focus, context))
                    .collect::<Result<Vec<_>>>()?;
                function.evaluate(focus, &args, context)
            }
            FunctionImpl::Lambda(function) => {
                let lambda = LambdaEvaluationContext { context, evaluator };
                function.evaluate_with_lambda(focus, args, &lambda)
            }
        }
    }

    /// Evaluate `focus.<expression>` where expression is a single function call
    pub fn run(focus: Collection, expression: &str) -> Result<Collection> {
        let context = EvaluationContext::new(focus.clone(), FunctionRegistry::standard());
        let ast = octofhir_fhirpath_parser::parse(expression)?;
        MiniEvaluator.eval(&ast, &focus, &context)
    }

    /// Collection of integers
    pub fn integers(values: &[i64]) -> Collection {
        values
            .iter()
            .map(|v| Item::Value(PrimitiveValue::Integer(*v)))
            .collect()
    }

    /// Collection of strings
    pub fn strings(values: &[&str]) -> Collection {
        values
            .iter()
            .map(|v| Item::Value(PrimitiveValue::string(v)))
            .collect()
    }
}
