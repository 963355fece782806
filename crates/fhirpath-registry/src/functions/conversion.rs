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

//! Conversion functions: `toInteger`, `toDecimal`, `convertsToX`, ...
//!
//! A value that cannot be converted yields empty. A multi-item input also
//! yields empty: real records often repeat a field the expression author
//! assumed to be single, and that is a data condition rather than an engine
//! fault.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use octofhir_fhirpath_core::Result;
use octofhir_fhirpath_model::{Collection, PrimitiveValue, Quantity};

use crate::context::EvaluationContext;
use crate::function::FhirPathFunction;
use crate::functions::singleton_value;
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;

static INTEGER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d+$").expect("valid pattern")
});
static DECIMAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d+(\.\d+)?$").expect("valid pattern")
});
static QUANTITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?\d+(?:\.\d+)?)\s*(?:'([^']+)'|([a-zA-Z]+))?$")
        .expect("valid pattern")
});

/// Integer conversion
///
/// Booleans map to 0/1, integers to themselves, strings holding an integer
/// that fits in 64 bits to their value.
pub fn to_integer(value: &PrimitiveValue) -> Option<i64> {
    match value {
        PrimitiveValue::Integer(i) => Some(*i),
        PrimitiveValue::Boolean(b) => Some(i64::from(*b)),
        PrimitiveValue::String(s) if INTEGER_PATTERN.is_match(s) => s.parse().ok(),
        _ => None,
    }
}

/// Decimal conversion
pub fn to_decimal(value: &PrimitiveValue) -> Option<Decimal> {
    match value {
        PrimitiveValue::Integer(i) => Some(Decimal::from(*i)),
        PrimitiveValue::Decimal(d) => Some(*d),
        PrimitiveValue::Boolean(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        PrimitiveValue::String(s) if DECIMAL_PATTERN.is_match(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

/// Boolean conversion
pub fn to_boolean(value: &PrimitiveValue) -> Option<bool> {
    match value {
        PrimitiveValue::Boolean(b) => Some(*b),
        PrimitiveValue::Integer(1) => Some(true),
        PrimitiveValue::Integer(0) => Some(false),
        PrimitiveValue::Decimal(d) if *d == Decimal::ONE => Some(true),
        PrimitiveValue::Decimal(d) if d.is_zero() => Some(false),
        PrimitiveValue::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(true),
            "false" | "f" | "no" | "n" | "0" | "0.0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Quantity conversion; numbers become unitless quantities
pub fn to_quantity(value: &PrimitiveValue) -> Option<Quantity> {
    match value {
        PrimitiveValue::Quantity(q) => Some(q.clone()),
        PrimitiveValue::Integer(_) | PrimitiveValue::Decimal(_) => {
            value.as_decimal().map(Quantity::unitless)
        }
        PrimitiveValue::Boolean(b) => Some(Quantity::unitless(if *b {
            Decimal::ONE
        } else {
            Decimal::ZERO
        })),
        PrimitiveValue::String(s) => {
            let captures = QUANTITY_PATTERN.captures(s.trim())?;
            let number = Decimal::from_str(captures.get(1)?.as_str()).ok()?;
            let unit = captures.get(2).or_else(|| captures.get(3)).map(|m| m.as_str());
            Some(Quantity::new(number, unit))
        }
        _ => None,
    }
}

/// String conversion; every primitive has one
pub fn to_string_value(value: &PrimitiveValue) -> Option<String> {
    Some(value.to_string())
}

/// Target of a conversion function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionTarget {
    /// `Integer`
    Integer,
    /// `Decimal`
    Decimal,
    /// `Boolean`
    Boolean,
    /// `String`
    String,
    /// `Quantity`
    Quantity,
}

impl ConversionTarget {
    fn convert(self, value: &PrimitiveValue) -> Option<PrimitiveValue> {
        match self {
            Self::Integer => to_integer(value).map(PrimitiveValue::Integer),
            Self::Decimal => to_decimal(value).map(PrimitiveValue::Decimal),
            Self::Boolean => to_boolean(value).map(PrimitiveValue::Boolean),
            Self::String => to_string_value(value).map(PrimitiveValue::from),
            Self::Quantity => to_quantity(value).map(PrimitiveValue::Quantity),
        }
    }
}

/// `toX()` and `convertsToX()`
pub struct ConversionFunction {
    target: ConversionTarget,
    check_only: bool,
    signature: FunctionSignature,
}

impl ConversionFunction {
    /// `toX()`: the converted value or empty
    pub fn to(target: ConversionTarget, name: &'static str) -> Self {
        Self {
            target,
            check_only: false,
            signature: FunctionSignature::no_args(name),
        }
    }

    /// `convertsToX()`: whether `toX()` would produce a value
    pub fn converts_to(target: ConversionTarget, name: &'static str) -> Self {
        Self {
            target,
            check_only: true,
            signature: FunctionSignature::no_args(name),
        }
    }
}

impl FhirPathFunction for ConversionFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        if focus.is_empty() {
            return Ok(Collection::empty());
        }
        let converted = singleton_value(focus).and_then(|value| self.target.convert(&value));
        Ok(if self.check_only {
            Collection::boolean(converted.is_some())
        } else {
            converted.map(Collection::single).unwrap_or_default()
        })
    }
}

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    for (target, to_name, converts_name) in [
        (ConversionTarget::Integer, "toInteger", "convertsToInteger"),
        (ConversionTarget::Decimal, "toDecimal", "convertsToDecimal"),
        (ConversionTarget::Boolean, "toBoolean", "convertsToBoolean"),
        (ConversionTarget::String, "toString", "convertsToString"),
        (ConversionTarget::Quantity, "toQuantity", "convertsToQuantity"),
    ] {
        builder
            .register_function(ConversionFunction::to(target, to_name))
            .register_function(ConversionFunction::converts_to(target, converts_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_support::{integers, run, strings};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(PrimitiveValue::Boolean(true), Some(1))]
    #[case(PrimitiveValue::Boolean(false), Some(0))]
    #[case(PrimitiveValue::Integer(42), Some(42))]
    #[case(PrimitiveValue::string("-17"), Some(-17))]
    #[case(PrimitiveValue::string("+5"), Some(5))]
    #[case(PrimitiveValue::string("1.5"), None)]
    #[case(PrimitiveValue::string("abc"), None)]
    #[case(PrimitiveValue::string("99999999999999999999"), None)]
    #[case(PrimitiveValue::Decimal(Decimal::new(15, 1)), None)]
    fn integer_conversion(#[case] value: PrimitiveValue, #[case] expected: Option<i64>) {
        assert_eq!(to_integer(&value), expected);
    }

    #[rstest]
    #[case("5 'mg'", Some(Quantity::new(Decimal::from(5), Some("mg"))))]
    #[case("3 days", Some(Quantity::new(Decimal::from(3), Some("d"))))]
    #[case("2.5", Some(Quantity::unitless(Decimal::new(25, 1))))]
    #[case("mg", None)]
    fn quantity_conversion(#[case] text: &str, #[case] expected: Option<Quantity>) {
        assert_eq!(to_quantity(&PrimitiveValue::string(text)), expected);
    }

    #[test]
    fn functions_handle_cardinality() {
        assert_eq!(run(strings(&["12"]), "toInteger()").expect("ok"), integers(&[12]));
        assert_eq!(run(strings(&["x"]), "toInteger()").expect("ok"), Collection::empty());
        assert_eq!(run(integers(&[1, 2]), "toInteger()").expect("ok"), Collection::empty());
        assert_eq!(run(Collection::empty(), "toInteger()").expect("ok"), Collection::empty());
        assert_eq!(
            run(strings(&["x"]), "convertsToInteger()").expect("ok"),
            Collection::boolean(false)
        );
        assert_eq!(
            run(strings(&["Yes"]), "toBoolean()").expect("ok"),
            Collection::boolean(true)
        );
        assert_eq!(
            run(integers(&[3]), "toDecimal()").expect("ok"),
            Collection::single(PrimitiveValue::Decimal(Decimal::from(3)))
        );
    }
}
