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

//! Literal values

use octofhir_fhirpath_ast::LiteralValue;
use octofhir_fhirpath_core::{EvalError, Result};
use octofhir_fhirpath_model::{
    Collection, PrecisionDate, PrecisionDateTime, PrecisionTime, PrimitiveValue, Quantity,
};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Turns literal source text into typed values
pub struct LiteralEvaluator;

impl LiteralEvaluator {
    /// Evaluate a literal
    pub fn evaluate(literal: &LiteralValue) -> Result<Collection> {
        let value = match literal {
            LiteralValue::Empty => return Ok(Collection::empty()),
            LiteralValue::Boolean(b) => PrimitiveValue::Boolean(*b),
            LiteralValue::Integer(i) => PrimitiveValue::Integer(*i),
            LiteralValue::Decimal(text) => PrimitiveValue::Decimal(Self::decimal(text)?),
            LiteralValue::String(text) => PrimitiveValue::string(text),
            LiteralValue::Date(text) => PrecisionDate::parse(text)
                .map(PrimitiveValue::Date)
                .ok_or_else(|| Self::invalid("date", text))?,
            LiteralValue::DateTime(text) => PrecisionDateTime::parse(text)
                .map(PrimitiveValue::DateTime)
                .ok_or_else(|| Self::invalid("dateTime", text))?,
            LiteralValue::Time(text) => PrecisionTime::parse(text)
                .map(PrimitiveValue::Time)
                .ok_or_else(|| Self::invalid("time", text))?,
            LiteralValue::Quantity { value, unit } => {
                PrimitiveValue::Quantity(Quantity::new(Self::decimal(value)?, Some(unit)))
            }
        };
        Ok(Collection::single(value))
    }

    fn decimal(text: &str) -> Result<Decimal> {
        Decimal::from_str(text).map_err(|_| Self::invalid("decimal", text))
    }

    fn invalid(kind: &str, text: &str) -> EvalError {
        EvalError::type_error(format!("invalid {kind} literal '{text}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_model::Item;
    use pretty_assertions::assert_eq;

    #[test]
    fn typed_literals() {
        let quantity = LiteralEvaluator::evaluate(&LiteralValue::Quantity {
            value: "5".to_string(),
            unit: "mg".to_string(),
        })
        .expect("quantity");
        assert_eq!(quantity.singleton().map(Item::type_name), Some("Quantity"));

        let date = LiteralEvaluator::evaluate(&LiteralValue::Date("2020-02".to_string())).expect("date");
        assert_eq!(date.singleton().map(Item::type_name), Some("Date"));

        assert_eq!(
            LiteralEvaluator::evaluate(&LiteralValue::Empty).expect("empty"),
            Collection::empty()
        );
    }

    #[test]
    fn malformed_literal_text_is_a_type_error() {
        assert!(matches!(
            LiteralEvaluator::evaluate(&LiteralValue::Date("2020-13-45".to_string())),
            Err(EvalError::TypeError { .. })
        ));
    }
}
