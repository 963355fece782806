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

//! Logical operations evaluator

use octofhir_fhirpath_ast::BinaryOperator;
use octofhir_fhirpath_model::Collection;

/// Three-valued logic; `None` stands for the empty collection
pub struct LogicalEvaluator;

impl LogicalEvaluator {
    /// Truth value of an operand under singleton evaluation
    ///
    /// A single boolean is itself, any other single item is `true`. Empty and
    /// multi-item collections are unknown.
    pub fn truth_value(operand: &Collection) -> Option<bool> {
        match operand.singleton() {
            Some(item) => Some(item.as_boolean().unwrap_or(true)),
            None => {
                if operand.len() > 1 {
                    tracing::debug!(
                        items = operand.len(),
                        "multi-item operand of a logical operator treated as empty"
                    );
                }
                None
            }
        }
    }

    /// Value that decides `op` without looking at the right operand
    pub fn short_circuit(op: BinaryOperator, left: Option<bool>) -> Option<bool> {
        match (op, left) {
            (BinaryOperator::And, Some(false)) => Some(false),
            (BinaryOperator::Or, Some(true)) => Some(true),
            (BinaryOperator::Implies, Some(false)) => Some(true),
            _ => None,
        }
    }

    /// Evaluate logical AND
    pub fn and(left: Option<bool>, right: Option<bool>) -> Option<bool> {
        match (left, right) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        }
    }

    /// Evaluate logical OR
    pub fn or(left: Option<bool>, right: Option<bool>) -> Option<bool> {
        match (left, right) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        }
    }

    /// Evaluate logical XOR
    pub fn xor(left: Option<bool>, right: Option<bool>) -> Option<bool> {
        Some(left? != right?)
    }

    /// Evaluate logical IMPLIES
    pub fn implies(left: Option<bool>, right: Option<bool>) -> Option<bool> {
        match (left, right) {
            (Some(false), _) | (_, Some(true)) => Some(true),
            (Some(true), Some(false)) => Some(false),
            _ => None,
        }
    }

    /// Apply a logical operator to evaluated operands
    pub fn evaluate(op: BinaryOperator, left: &Collection, right: &Collection) -> Collection {
        let (l, r) = (Self::truth_value(left), Self::truth_value(right));
        let result = match op {
            BinaryOperator::And => Self::and(l, r),
            BinaryOperator::Or => Self::or(l, r),
            BinaryOperator::Xor => Self::xor(l, r),
            BinaryOperator::Implies => Self::implies(l, r),
            _ => None,
        };
        Collection::from_option_bool(result)
    }
}
