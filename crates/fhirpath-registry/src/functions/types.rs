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

//! Type functions: `ofType`, `is`, `as`

use octofhir_fhirpath_ast::ExpressionNode;
use octofhir_fhirpath_core::{EvalError, Result};
use octofhir_fhirpath_model::{Collection, ProfileRegistry};

use crate::function::{LambdaEvaluationContext, LambdaFunction};
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;
use crate::types::type_matches;

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    builder
        .register_lambda(OfTypeFunction)
        .register_lambda(IsFunction)
        .register_lambda(AsFunction);
}

fn type_argument(args: &[ExpressionNode], function: &str) -> Result<String> {
    args[0].as_type_specifier().ok_or_else(|| {
        EvalError::invalid_argument(function, format!("'{}' is not a type specifier", args[0]))
    })
}

/// Items of `focus` whose dynamic type is `type_name`
pub fn filter_by_type(focus: &Collection, type_name: &str, profiles: &dyn ProfileRegistry) -> Collection {
    focus
        .iter()
        .filter(|item| type_matches(item, type_name, profiles))
        .cloned()
        .collect()
}

/// `x is T` on a collection
///
/// An empty input is not of any type. More than one item is an error.
pub fn is_type(focus: &Collection, type_name: &str, profiles: &dyn ProfileRegistry) -> Result<Collection> {
    match focus.len() {
        0 => Ok(Collection::boolean(false)),
        1 => Ok(Collection::boolean(
            focus
                .first()
                .is_some_and(|item| type_matches(item, type_name, profiles)),
        )),
        n => Err(EvalError::singleton_expected("is", n)),
    }
}

/// `ofType(T)`
pub struct OfTypeFunction;

impl LambdaFunction for OfTypeFunction {
    static_signature!(FunctionSignature::fixed("ofType", 1));

    fn documentation(&self) -> &str {
        "Returns a collection that contains all items in the input collection that are of the given type or a subclass thereof."
    }

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        let type_name = type_argument(args, "ofType")?;
        Ok(filter_by_type(focus, &type_name, context.context.profiles()))
    }
}

/// `is(T)`
pub struct IsFunction;

impl LambdaFunction for IsFunction {
    static_signature!(FunctionSignature::fixed("is", 1));

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        let type_name = type_argument(args, "is")?;
        is_type(focus, &type_name, context.context.profiles())
    }
}

/// `as(T)`: the items of type `T`
pub struct AsFunction;

impl LambdaFunction for AsFunction {
    static_signature!(FunctionSignature::fixed("as", 1));

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        let type_name = type_argument(args, "as")?;
        Ok(filter_by_type(focus, &type_name, context.context.profiles()))
    }
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::{integers, run, strings};
    use octofhir_fhirpath_core::EvalError;
    use octofhir_fhirpath_model::{Collection, Item, PrimitiveValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn of_type_filters_mixed_collections() {
        let mut focus = integers(&[1, 2]);
        focus.extend(strings(&["a"]));
        assert_eq!(run(focus.clone(), "ofType(Integer)").expect("ok"), integers(&[1, 2]));
        assert_eq!(run(focus.clone(), "ofType(System.String)").expect("ok"), strings(&["a"]));
        assert_eq!(run(focus, "as(Boolean)").expect("ok"), Collection::empty());
    }

    #[test]
    fn is_requires_a_singleton() {
        assert_eq!(run(integers(&[1]), "is(Integer)").expect("ok"), Collection::boolean(true));
        assert_eq!(run(Collection::empty(), "is(Integer)").expect("ok"), Collection::boolean(false));
        assert!(matches!(
            run(integers(&[1, 2]), "is(Integer)"),
            Err(EvalError::SingletonExpected { .. })
        ));
    }

    #[test]
    fn type_argument_must_be_a_name() {
        let focus = Collection::single(Item::Value(PrimitiveValue::Integer(1)));
        assert!(matches!(
            run(focus, "ofType('Integer')"),
            Err(EvalError::InvalidArgument { .. })
        ));
    }
}
