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

//! Arithmetic operations evaluator
//!
//! Empty operands, overflow and division by zero yield empty. Operands of
//! kinds the operator cannot combine (`'a' - 1`) are a type error.

use chrono::{Months, NaiveDate, TimeDelta};
use octofhir_fhirpath_ast::{BinaryOperator, UnaryOperator};
use octofhir_fhirpath_core::{EvalError, Result};
use octofhir_fhirpath_model::{
    Collection, PrecisionDate, PrecisionDateTime, PrecisionTime, PrimitiveValue, Quantity,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Specialized evaluator for arithmetic operations
pub struct ArithmeticEvaluator;

impl ArithmeticEvaluator {
    /// Evaluate `+ - * / div mod &`
    pub fn evaluate(op: BinaryOperator, left: &Collection, right: &Collection) -> Result<Collection> {
        if op == BinaryOperator::Concatenate {
            return Self::concatenate(left, right);
        }
        let (Some(l), Some(r)) = (Self::operand(op, left)?, Self::operand(op, right)?) else {
            return Ok(Collection::empty());
        };
        let result = match (&l, &r) {
            (PrimitiveValue::Integer(a), PrimitiveValue::Integer(b)) => Self::integers(op, *a, *b),
            _ if l.is_numeric() && r.is_numeric() => match (l.as_decimal(), r.as_decimal()) {
                (Some(a), Some(b)) => Self::decimals(op, a, b),
                _ => None,
            },
            (PrimitiveValue::String(a), PrimitiveValue::String(b)) if op == BinaryOperator::Add => {
                Some(PrimitiveValue::string(format!("{a}{b}")))
            }
            (PrimitiveValue::Quantity(a), PrimitiveValue::Quantity(b)) => Self::quantities(op, a, b)?,
            (PrimitiveValue::Quantity(q), n) | (n, PrimitiveValue::Quantity(q))
                if n.is_numeric() =>
            {
                Self::scaled_quantity(op, q, n, matches!(l, PrimitiveValue::Quantity(_)))?
            }
            (
                PrimitiveValue::Date(_) | PrimitiveValue::DateTime(_) | PrimitiveValue::Time(_),
                PrimitiveValue::Quantity(amount),
            ) => Self::shift_temporal(op, &l, amount)?,
            _ => return Err(Self::mismatch(op, &l, &r)),
        };
        Ok(result.map(Collection::single).unwrap_or_default())
    }

    /// Evaluate unary `-` / `+`; non-singleton operands give empty
    pub fn evaluate_unary(op: UnaryOperator, operand: &Collection) -> Result<Collection> {
        let Some(value) = operand.singleton().and_then(|item| item.to_primitive()) else {
            return Ok(Collection::empty());
        };
        if op == UnaryOperator::Plus {
            return match value {
                PrimitiveValue::Integer(_) | PrimitiveValue::Decimal(_) | PrimitiveValue::Quantity(_) => {
                    Ok(Collection::single(value))
                }
                other => Err(EvalError::type_error(format!(
                    "unary + cannot be applied to {}",
                    other.type_name()
                ))),
            };
        }
        let negated = match value {
            PrimitiveValue::Integer(i) => i.checked_neg().map(PrimitiveValue::Integer),
            PrimitiveValue::Decimal(d) => Some(PrimitiveValue::Decimal(-d)),
            PrimitiveValue::Quantity(q) => Some(PrimitiveValue::Quantity(Quantity {
                value: -q.value,
                unit: q.unit,
            })),
            other => {
                return Err(EvalError::type_error(format!(
                    "unary - cannot be applied to {}",
                    other.type_name()
                )));
            }
        };
        Ok(negated.map(Collection::single).unwrap_or_default())
    }

    /// Single operand value; `None` when empty or when several items are given
    fn operand(op: BinaryOperator, operand: &Collection) -> Result<Option<PrimitiveValue>> {
        if operand.len() > 1 {
            tracing::debug!(operator = op.as_str(), items = operand.len(), "multi-item arithmetic operand");
            return Ok(None);
        }
        match operand.singleton() {
            None => Ok(None),
            Some(item) => item.to_primitive().map(Some).ok_or_else(|| {
                EvalError::type_error(format!(
                    "operator {} cannot be applied to {}",
                    op.as_str(),
                    item.type_name()
                ))
            }),
        }
    }

    fn concatenate(left: &Collection, right: &Collection) -> Result<Collection> {
        let text = |operand: &Collection| -> Result<Option<String>> {
            if operand.len() > 1 {
                return Ok(None);
            }
            match operand.singleton().map(|item| item.to_primitive()) {
                None => Ok(Some(String::new())),
                Some(Some(PrimitiveValue::String(s))) => Ok(Some(s.to_string())),
                Some(other) => Err(EvalError::type_error(format!(
                    "operator & expects strings, got {}",
                    other.map_or("element", |value| value.type_name())
                ))),
            }
        };
        Ok(match (text(left)?, text(right)?) {
            (Some(l), Some(r)) => Collection::single(PrimitiveValue::string(l + &r)),
            _ => Collection::empty(),
        })
    }

    fn integers(op: BinaryOperator, a: i64, b: i64) -> Option<PrimitiveValue> {
        let value = match op {
            BinaryOperator::Add => a.checked_add(b)?,
            BinaryOperator::Subtract => a.checked_sub(b)?,
            BinaryOperator::Multiply => a.checked_mul(b)?,
            BinaryOperator::Divide => {
                return Self::decimals(op, Decimal::from(a), Decimal::from(b));
            }
            BinaryOperator::IntegerDivide => a.checked_div(b)?,
            BinaryOperator::Modulo => a.checked_rem(b)?,
            _ => return None,
        };
        Some(PrimitiveValue::Integer(value))
    }

    fn decimals(op: BinaryOperator, a: Decimal, b: Decimal) -> Option<PrimitiveValue> {
        let value = match op {
            BinaryOperator::Add => a.checked_add(b)?,
            BinaryOperator::Subtract => a.checked_sub(b)?,
            BinaryOperator::Multiply => a.checked_mul(b)?,
            BinaryOperator::Divide => a.checked_div(b)?.normalize(),
            BinaryOperator::IntegerDivide => {
                return a.checked_div(b)?.trunc().to_i64().map(PrimitiveValue::Integer);
            }
            BinaryOperator::Modulo => a.checked_rem(b)?,
            _ => return None,
        };
        Some(PrimitiveValue::Decimal(value))
    }

    fn quantities(op: BinaryOperator, a: &Quantity, b: &Quantity) -> Result<Option<PrimitiveValue>> {
        let combined = match op {
            BinaryOperator::Add => a.add(b),
            BinaryOperator::Subtract => a.subtract(b),
            _ => {
                return Err(EvalError::type_error(format!(
                    "operator {} is not supported between quantities",
                    op.as_str()
                )));
            }
        };
        // Incommensurable units are a data condition, not a defect
        Ok(combined.ok().map(PrimitiveValue::Quantity))
    }

    fn scaled_quantity(
        op: BinaryOperator,
        quantity: &Quantity,
        number: &PrimitiveValue,
        quantity_on_left: bool,
    ) -> Result<Option<PrimitiveValue>> {
        let Some(scalar) = number.as_decimal() else {
            return Ok(None);
        };
        let scaled = match op {
            BinaryOperator::Multiply => Some(quantity.multiply_scalar(scalar)),
            BinaryOperator::Divide if quantity_on_left => quantity.divide_scalar(scalar),
            _ => {
                return Err(EvalError::type_error(format!(
                    "operator {} cannot combine a quantity with a number",
                    op.as_str()
                )));
            }
        };
        Ok(scaled.map(PrimitiveValue::Quantity))
    }

    fn shift_temporal(
        op: BinaryOperator,
        value: &PrimitiveValue,
        amount: &Quantity,
    ) -> Result<Option<PrimitiveValue>> {
        let sign = match op {
            BinaryOperator::Add => 1,
            BinaryOperator::Subtract => -1,
            _ => {
                return Err(EvalError::type_error(format!(
                    "operator {} cannot be applied to {}",
                    op.as_str(),
                    value.type_name()
                )));
            }
        };
        let Some(count) = amount.value.trunc().to_i64().and_then(|n| n.checked_mul(sign)) else {
            return Ok(None);
        };
        let unit = amount.unit_str();
        Ok(match value {
            PrimitiveValue::Date(date) => shift_date(date.date, unit, count)
                .map(|shifted| PrimitiveValue::Date(PrecisionDate::new(shifted, date.precision))),
            PrimitiveValue::DateTime(dt) => {
                let shifted = match unit {
                    "a" | "mo" => months(unit, count).and_then(|m| {
                        let magnitude = Months::new(u32::try_from(m.unsigned_abs()).ok()?);
                        if m >= 0 {
                            dt.datetime.checked_add_months(magnitude)
                        } else {
                            dt.datetime.checked_sub_months(magnitude)
                        }
                    }),
                    _ => delta(unit, count).and_then(|d| dt.datetime.checked_add_signed(d)),
                };
                shifted.map(|datetime| PrimitiveValue::DateTime(PrecisionDateTime::new(datetime, dt.precision)))
            }
            PrimitiveValue::Time(time) => match unit {
                "h" | "min" | "s" | "ms" => delta(unit, count).map(|d| {
                    let (shifted, _) = time.time.overflowing_add_signed(d);
                    PrimitiveValue::Time(PrecisionTime::new(shifted, time.precision))
                }),
                _ => None,
            },
            _ => None,
        })
    }

    fn mismatch(op: BinaryOperator, left: &PrimitiveValue, right: &PrimitiveValue) -> EvalError {
        EvalError::type_error(format!(
            "operator {} cannot be applied to {} and {}",
            op.as_str(),
            left.type_name(),
            right.type_name()
        ))
    }
}

fn months(unit: &str, count: i64) -> Option<i64> {
    match unit {
        "a" => count.checked_mul(12),
        "mo" => Some(count),
        _ => None,
    }
}

fn delta(unit: &str, count: i64) -> Option<TimeDelta> {
    match unit {
        "wk" => TimeDelta::try_weeks(count),
        "d" => TimeDelta::try_days(count),
        "h" => TimeDelta::try_hours(count),
        "min" => TimeDelta::try_minutes(count),
        "s" => TimeDelta::try_seconds(count),
        "ms" => TimeDelta::try_milliseconds(count),
        _ => None,
    }
}

fn shift_date(date: NaiveDate, unit: &str, count: i64) -> Option<NaiveDate> {
    match unit {
        "a" | "mo" => {
            let m = months(unit, count)?;
            let magnitude = Months::new(u32::try_from(m.unsigned_abs()).ok()?);
            if m >= 0 {
                date.checked_add_months(magnitude)
            } else {
                date.checked_sub_months(magnitude)
            }
        }
        "wk" | "d" => date.checked_add_signed(delta(unit, count)?),
        _ => None,
    }
}
