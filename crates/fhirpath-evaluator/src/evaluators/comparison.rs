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

//! Equality, equivalence and ordering operators

use octofhir_fhirpath_ast::BinaryOperator;
use octofhir_fhirpath_model::{Collection, Item};
use std::cmp::Ordering;

/// Specialized evaluator for `= != ~ !~ < <= > >=`
pub struct ComparisonEvaluator;

impl ComparisonEvaluator {
    /// Dispatch a comparison operator
    pub fn evaluate(op: BinaryOperator, left: &Collection, right: &Collection) -> Collection {
        let result = match op {
            BinaryOperator::Equal => Self::equals(left, right),
            BinaryOperator::NotEqual => Self::equals(left, right).map(|equal| !equal),
            BinaryOperator::Equivalent => Some(Self::equivalent(left, right)),
            BinaryOperator::NotEquivalent => Some(!Self::equivalent(left, right)),
            BinaryOperator::LessThan => Self::order(left, right).map(Ordering::is_lt),
            BinaryOperator::LessThanOrEqual => Self::order(left, right).map(Ordering::is_le),
            BinaryOperator::GreaterThan => Self::order(left, right).map(Ordering::is_gt),
            BinaryOperator::GreaterThanOrEqual => Self::order(left, right).map(Ordering::is_ge),
            _ => None,
        };
        Collection::from_option_bool(result)
    }

    /// `=`: unknown when either side is empty
    ///
    /// Collections are compared item by item in order. A definite mismatch
    /// anywhere wins over an unknown pair.
    pub fn equals(left: &Collection, right: &Collection) -> Option<bool> {
        if left.is_empty() || right.is_empty() {
            return None;
        }
        if left.len() != right.len() {
            return Some(false);
        }
        let mut unknown = false;
        for (l, r) in left.iter().zip(right.iter()) {
            match l.equals(r) {
                Some(false) => return Some(false),
                None => unknown = true,
                Some(true) => {}
            }
        }
        (!unknown).then_some(true)
    }

    /// `~`: never unknown; order does not matter
    pub fn equivalent(left: &Collection, right: &Collection) -> bool {
        if left.len() != right.len() {
            return false;
        }
        let mut matched = vec![false; right.len()];
        left.iter().all(|l| {
            let found = right
                .iter()
                .enumerate()
                .find(|(i, r)| !matched[*i] && l.equivalent(r))
                .map(|(i, _)| i);
            match found {
                Some(i) => {
                    matched[i] = true;
                    true
                }
                None => false,
            }
        })
    }

    /// Ordering of two singleton operands of comparable kinds
    pub fn order(left: &Collection, right: &Collection) -> Option<Ordering> {
        let (l, r) = (left.singleton()?, right.singleton()?);
        let ordering = l.to_primitive()?.compare(&r.to_primitive()?);
        if ordering.is_none() {
            tracing::debug!(
                left = Item::type_name(l),
                right = Item::type_name(r),
                "operands cannot be ordered"
            );
        }
        ordering
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_model::PrimitiveValue;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn values(items: &[PrimitiveValue]) -> Collection {
        items.iter().cloned().map(Item::Value).collect()
    }

    fn s(text: &str) -> PrimitiveValue {
        PrimitiveValue::string(text)
    }

    fn i(value: i64) -> PrimitiveValue {
        PrimitiveValue::Integer(value)
    }

    #[rstest]
    #[case(values(&[i(1)]), values(&[i(1)]), Some(true))]
    #[case(values(&[i(1), i(2)]), values(&[i(1), i(2)]), Some(true))]
    #[case(values(&[i(1), i(2)]), values(&[i(2), i(1)]), Some(false))]
    #[case(values(&[i(1)]), values(&[i(1), i(1)]), Some(false))]
    #[case(values(&[]), values(&[i(1)]), None)]
    #[case(values(&[s("a")]), values(&[s("A")]), Some(false))]
    fn equality(#[case] left: Collection, #[case] right: Collection, #[case] expected: Option<bool>) {
        assert_eq!(ComparisonEvaluator::equals(&left, &right), expected);
    }

    #[test]
    fn equivalence_ignores_case_order_and_emptiness() {
        assert!(ComparisonEvaluator::equivalent(
            &values(&[s("Hello  World"), i(2)]),
            &values(&[i(2), s("hello world")])
        ));
        assert!(ComparisonEvaluator::equivalent(&Collection::empty(), &Collection::empty()));
        assert!(!ComparisonEvaluator::equivalent(&values(&[i(1)]), &Collection::empty()));
    }

    #[test]
    fn ordering_needs_singletons_of_comparable_kinds() {
        let lt = |l: &[PrimitiveValue], r: &[PrimitiveValue]| {
            ComparisonEvaluator::evaluate(BinaryOperator::LessThan, &values(l), &values(r))
        };
        assert_eq!(lt(&[i(1)], &[i(2)]), Collection::boolean(true));
        assert_eq!(lt(&[i(1), i(3)], &[i(2)]), Collection::empty());
        assert_eq!(lt(&[s("a")], &[i(2)]), Collection::empty());
    }
}
