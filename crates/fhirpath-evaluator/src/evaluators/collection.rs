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

//! Collection operators: `|`, `in`, `contains`

use octofhir_fhirpath_ast::BinaryOperator;
use octofhir_fhirpath_model::Collection;

/// Specialized evaluator for collection operators
pub struct CollectionEvaluator;

impl CollectionEvaluator {
    /// Dispatch a collection operator
    pub fn evaluate(op: BinaryOperator, left: &Collection, right: &Collection) -> Collection {
        match op {
            BinaryOperator::Union => left.union(right),
            BinaryOperator::In => Self::membership(left, right),
            BinaryOperator::Contains => Self::membership(right, left),
            _ => Collection::empty(),
        }
    }

    /// Whether the single `element` occurs in `container`
    ///
    /// Empty when `element` is empty or has several items; `false` when the
    /// container is empty.
    fn membership(element: &Collection, container: &Collection) -> Collection {
        match element.singleton() {
            Some(item) => Collection::boolean(container.contains_item(item)),
            None => Collection::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_model::{Item, PrimitiveValue};
    use pretty_assertions::assert_eq;

    fn ints(values: &[i64]) -> Collection {
        values.iter().map(|v| Item::Value(PrimitiveValue::Integer(*v))).collect()
    }

    #[test]
    fn union_removes_duplicates_in_order() {
        assert_eq!(
            CollectionEvaluator::evaluate(BinaryOperator::Union, &ints(&[1, 2, 2]), &ints(&[3, 1])),
            ints(&[1, 2, 3])
        );
    }

    #[test]
    fn membership() {
        let evaluate = CollectionEvaluator::evaluate;
        assert_eq!(evaluate(BinaryOperator::In, &ints(&[2]), &ints(&[1, 2])), Collection::boolean(true));
        assert_eq!(evaluate(BinaryOperator::In, &ints(&[]), &ints(&[1, 2])), Collection::empty());
        assert_eq!(evaluate(BinaryOperator::In, &ints(&[3]), &ints(&[])), Collection::boolean(false));
        assert_eq!(
            evaluate(BinaryOperator::Contains, &ints(&[1, 2]), &ints(&[3])),
            Collection::boolean(false)
        );
    }
}
