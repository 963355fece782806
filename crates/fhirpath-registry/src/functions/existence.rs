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

//! Existence functions: `empty`, `exists`, `all`, `count`, `single`, ...

use octofhir_fhirpath_ast::ExpressionNode;
use octofhir_fhirpath_core::Result;
use octofhir_fhirpath_model::{Collection, Item, PrimitiveValue};

use crate::context::EvaluationContext;
use crate::function::{FhirPathFunction, LambdaEvaluationContext, LambdaFunction};
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    builder
        .register_function(EmptyFunction)
        .register_lambda(ExistsFunction)
        .register_lambda(AllFunction)
        .register_function(BooleanAggregateFunction::all_true())
        .register_function(BooleanAggregateFunction::any_true())
        .register_function(BooleanAggregateFunction::all_false())
        .register_function(BooleanAggregateFunction::any_false())
        .register_function(CountFunction)
        .register_function(DistinctFunction)
        .register_function(IsDistinctFunction)
        .register_function(SingleFunction)
        .register_function(NotFunction)
        .register_function(HasValueFunction);
}

/// `empty()`: true when the input is empty
pub struct EmptyFunction;

impl FhirPathFunction for EmptyFunction {
    static_signature!(FunctionSignature::no_args("empty"));

    fn documentation(&self) -> &str {
        "Returns true if the input collection is empty and false otherwise."
    }

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::boolean(focus.is_empty()))
    }
}

/// `exists([criteria])`
pub struct ExistsFunction;

impl LambdaFunction for ExistsFunction {
    static_signature!(FunctionSignature::new("exists", 0, 1));

    fn documentation(&self) -> &str {
        "Returns true if the collection has any elements, optionally filtered by the criteria."
    }

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        let Some(criteria) = args.first() else {
            return Ok(Collection::boolean(!focus.is_empty()));
        };
        for (index, item) in focus.iter().enumerate() {
            let result = context.evaluate_for_item(criteria, item, index)?;
            if result.as_singleton_boolean() == Some(true) {
                return Ok(Collection::boolean(true));
            }
        }
        Ok(Collection::boolean(false))
    }
}

/// `all(criteria)`: false as soon as one item's criteria is false
///
/// Items whose criteria is empty or not boolean do not count against the
/// result, and an empty input yields true.
pub struct AllFunction;

impl LambdaFunction for AllFunction {
    static_signature!(FunctionSignature::fixed("all", 1));

    fn documentation(&self) -> &str {
        "Returns true if the criteria evaluates to true for every item in the input collection."
    }

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        for (index, item) in focus.iter().enumerate() {
            let result = context.evaluate_for_item(&args[0], item, index)?;
            if result.as_singleton_boolean() == Some(false) {
                return Ok(Collection::boolean(false));
            }
        }
        Ok(Collection::boolean(true))
    }
}

#[derive(Debug, Clone, Copy)]
enum Aggregate {
    AllTrue,
    AnyTrue,
    AllFalse,
    AnyFalse,
}

/// `allTrue()`, `anyTrue()`, `allFalse()`, `anyFalse()`
pub struct BooleanAggregateFunction {
    aggregate: Aggregate,
    signature: FunctionSignature,
}

impl BooleanAggregateFunction {
    fn new(aggregate: Aggregate, name: &'static str) -> Self {
        Self {
            aggregate,
            signature: FunctionSignature::no_args(name),
        }
    }

    /// `allTrue()`
    pub fn all_true() -> Self {
        Self::new(Aggregate::AllTrue, "allTrue")
    }

    /// `anyTrue()`
    pub fn any_true() -> Self {
        Self::new(Aggregate::AnyTrue, "anyTrue")
    }

    /// `allFalse()`
    pub fn all_false() -> Self {
        Self::new(Aggregate::AllFalse, "allFalse")
    }

    /// `anyFalse()`
    pub fn any_false() -> Self {
        Self::new(Aggregate::AnyFalse, "anyFalse")
    }
}

impl FhirPathFunction for BooleanAggregateFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        let mut booleans = focus.iter().filter_map(Item::as_boolean);
        let result = match self.aggregate {
            Aggregate::AllTrue => booleans.all(|b| b),
            Aggregate::AnyTrue => booleans.any(|b| b),
            Aggregate::AllFalse => booleans.all(|b| !b),
            Aggregate::AnyFalse => booleans.any(|b| !b),
        };
        Ok(Collection::boolean(result))
    }
}

/// `count()`
pub struct CountFunction;

impl FhirPathFunction for CountFunction {
    static_signature!(FunctionSignature::no_args("count"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::single(PrimitiveValue::Integer(focus.len() as i64)))
    }
}

/// Items of `focus` without value-equal duplicates, first occurrence kept
pub(crate) fn distinct_by_value(focus: &Collection) -> Collection {
    let mut result = Collection::empty();
    for item in focus {
        if !result.contains_item(item) {
            result.push(item.clone());
        }
    }
    result
}

/// `distinct()`
pub struct DistinctFunction;

impl FhirPathFunction for DistinctFunction {
    static_signature!(FunctionSignature::no_args("distinct"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(distinct_by_value(focus))
    }
}

/// `isDistinct()`
pub struct IsDistinctFunction;

impl FhirPathFunction for IsDistinctFunction {
    static_signature!(FunctionSignature::no_args("isDistinct"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::boolean(distinct_by_value(focus).len() == focus.len()))
    }
}

/// `single()`: the input when it holds exactly one item, empty otherwise
pub struct SingleFunction;

impl FhirPathFunction for SingleFunction {
    static_signature!(FunctionSignature::no_args("single"));

    fn documentation(&self) -> &str {
        "Returns the single item in the input if there is just one item. Otherwise returns empty."
    }

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(focus
            .singleton()
            .map(|item| Collection::single(item.clone()))
            .unwrap_or_default())
    }
}

/// `not()`
pub struct NotFunction;

impl FhirPathFunction for NotFunction {
    static_signature!(FunctionSignature::no_args("not"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::from_option_bool(
            focus.as_singleton_boolean().map(|b| !b),
        ))
    }
}

/// `hasValue()`: true for a single primitive
pub struct HasValueFunction;

impl FhirPathFunction for HasValueFunction {
    static_signature!(FunctionSignature::no_args("hasValue"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::boolean(
            focus.singleton().and_then(Item::primitive).is_some(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::{integers, run, strings};
    use octofhir_fhirpath_model::Collection;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(integers(&[]), "single()", Collection::empty())]
    #[case(integers(&[7]), "single()", integers(&[7]))]
    #[case(integers(&[1, 2]), "single()", Collection::empty())]
    #[case(integers(&[]), "empty()", Collection::boolean(true))]
    #[case(integers(&[1, 2]), "exists()", Collection::boolean(true))]
    #[case(integers(&[1, 2]), "exists($this = 2)", Collection::boolean(true))]
    #[case(integers(&[1, 2]), "exists($this = 3)", Collection::boolean(false))]
    #[case(integers(&[]), "all($this = 1)", Collection::boolean(true))]
    #[case(integers(&[1, 1]), "all($this = 1)", Collection::boolean(true))]
    #[case(integers(&[1, 2]), "all($this = 1)", Collection::boolean(false))]
    #[case(integers(&[1, 2, 2]), "count()", integers(&[3]))]
    #[case(integers(&[1, 2, 2]), "distinct()", integers(&[1, 2]))]
    #[case(integers(&[1, 2, 2]), "isDistinct()", Collection::boolean(false))]
    #[case(strings(&["a"]), "hasValue()", Collection::boolean(true))]
    fn existence(#[case] focus: Collection, #[case] expression: &str, #[case] expected: Collection) {
        assert_eq!(run(focus, expression).expect("evaluates"), expected);
    }

    #[test]
    fn boolean_aggregates_ignore_non_booleans() {
        let focus: Collection = [true, false]
            .into_iter()
            .map(Collection::boolean)
            .flat_map(Collection::into_iter)
            .collect();
        assert_eq!(run(focus.clone(), "allTrue()").expect("ok"), Collection::boolean(false));
        assert_eq!(run(focus.clone(), "anyTrue()").expect("ok"), Collection::boolean(true));
        assert_eq!(run(focus, "anyFalse()").expect("ok"), Collection::boolean(true));
        assert_eq!(run(Collection::empty(), "allFalse()").expect("ok"), Collection::boolean(true));
    }

    #[test]
    fn not_on_empty_is_empty() {
        assert_eq!(run(Collection::empty(), "not()").expect("ok"), Collection::empty());
        assert_eq!(
            run(Collection::boolean(true), "not()").expect("ok"),
            Collection::boolean(false)
        );
    }
}
