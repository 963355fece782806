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

//! Subsetting and combining functions

use octofhir_fhirpath_core::Result;
use octofhir_fhirpath_model::Collection;

use crate::context::EvaluationContext;
use crate::function::FhirPathFunction;
use crate::functions::existence::distinct_by_value;
use crate::functions::integer_arg;
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    builder
        .register_function(FirstFunction)
        .register_function(LastFunction)
        .register_function(TailFunction)
        .register_function(SkipFunction)
        .register_function(TakeFunction)
        .register_function(UnionFunction)
        .register_function(CombineFunction)
        .register_function(IntersectFunction)
        .register_function(ExcludeFunction)
        .register_function(SubsetOfFunction)
        .register_function(SupersetOfFunction);
}

fn slice(focus: &Collection, skip: usize, take: usize) -> Collection {
    focus.iter().skip(skip).take(take).cloned().collect()
}

/// `first()`
pub struct FirstFunction;

impl FhirPathFunction for FirstFunction {
    static_signature!(FunctionSignature::no_args("first"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(slice(focus, 0, 1))
    }
}

/// `last()`
pub struct LastFunction;

impl FhirPathFunction for LastFunction {
    static_signature!(FunctionSignature::no_args("last"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(slice(focus, focus.len().saturating_sub(1), 1))
    }
}

/// `tail()`
pub struct TailFunction;

impl FhirPathFunction for TailFunction {
    static_signature!(FunctionSignature::no_args("tail"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(slice(focus, 1, usize::MAX))
    }
}

/// `skip(num)`
pub struct SkipFunction;

impl FhirPathFunction for SkipFunction {
    static_signature!(FunctionSignature::fixed("skip", 1));

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(match integer_arg(args, 0, "skip")? {
            Some(n) => slice(focus, n.max(0) as usize, usize::MAX),
            None => Collection::empty(),
        })
    }
}

/// `take(num)`
pub struct TakeFunction;

impl FhirPathFunction for TakeFunction {
    static_signature!(FunctionSignature::fixed("take", 1));

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(match integer_arg(args, 0, "take")? {
            Some(n) => slice(focus, 0, n.max(0) as usize),
            None => Collection::empty(),
        })
    }
}

/// `union(other)`: same as the `|` operator
pub struct UnionFunction;

impl FhirPathFunction for UnionFunction {
    static_signature!(FunctionSignature::fixed("union", 1));

    fn documentation(&self) -> &str {
        "Merges the input and other collections into a single collection without duplicates."
    }

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(focus.union(&args[0]))
    }
}

/// `combine(other)`: concatenation keeping duplicates
pub struct CombineFunction;

impl FhirPathFunction for CombineFunction {
    static_signature!(FunctionSignature::fixed("combine", 1));

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        let mut result = focus.clone();
        result.extend(args[0].clone());
        Ok(result)
    }
}

/// `intersect(other)`
pub struct IntersectFunction;

impl FhirPathFunction for IntersectFunction {
    static_signature!(FunctionSignature::fixed("intersect", 1));

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        let common = focus
            .iter()
            .filter(|item| args[0].contains_item(item))
            .cloned()
            .collect();
        Ok(distinct_by_value(&common))
    }
}

/// `exclude(other)`: keeps order and duplicates of the input
pub struct ExcludeFunction;

impl FhirPathFunction for ExcludeFunction {
    static_signature!(FunctionSignature::fixed("exclude", 1));

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(focus
            .iter()
            .filter(|item| !args[0].contains_item(item))
            .cloned()
            .collect())
    }
}

/// `subsetOf(other)`: every input item occurs in `other`
pub struct SubsetOfFunction;

impl FhirPathFunction for SubsetOfFunction {
    static_signature!(FunctionSignature::fixed("subsetOf", 1));

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::boolean(
            focus.iter().all(|item| args[0].contains_item(item)),
        ))
    }
}

/// `supersetOf(other)`: every item of `other` occurs in the input
pub struct SupersetOfFunction;

impl FhirPathFunction for SupersetOfFunction {
    static_signature!(FunctionSignature::fixed("supersetOf", 1));

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::boolean(
            args[0].iter().all(|item| focus.contains_item(item)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::{integers, run};
    use octofhir_fhirpath_core::EvalError;
    use octofhir_fhirpath_model::Collection;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("first()", integers(&[3]))]
    #[case("last()", integers(&[1]))]
    #[case("tail()", integers(&[2, 2, 1]))]
    #[case("skip(2)", integers(&[2, 1]))]
    #[case("skip(10)", integers(&[]))]
    #[case("take(2)", integers(&[3, 2]))]
    #[case("take(-1)", integers(&[]))]
    #[case("union(4)", integers(&[3, 2, 1, 4]))]
    #[case("combine(3)", integers(&[3, 2, 2, 1, 3]))]
    #[case("intersect(2)", integers(&[2]))]
    #[case("exclude(2)", integers(&[3, 1]))]
    #[case("subsetOf(1)", Collection::boolean(false))]
    #[case("supersetOf(2)", Collection::boolean(true))]
    fn subsetting(#[case] expression: &str, #[case] expected: Collection) {
        assert_eq!(run(integers(&[3, 2, 2, 1]), expression).expect("evaluates"), expected);
    }

    #[test]
    fn empty_input_is_subset_of_anything() {
        assert_eq!(
            run(Collection::empty(), "subsetOf(1)").expect("ok"),
            Collection::boolean(true)
        );
    }

    #[test]
    fn non_integer_count_is_rejected() {
        assert!(matches!(
            run(integers(&[1]), "take('a')"),
            Err(EvalError::InvalidArgument { .. })
        ));
    }
}
