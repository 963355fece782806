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

//! Primitive values carried by tree nodes and produced by evaluation

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::quantity::Quantity;
use crate::temporal::{PrecisionDate, PrecisionDateTime, PrecisionTime};

/// A primitive value
///
/// Strings and binaries are reference counted so that copying values out of
/// a tree into a result collection does not copy their payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveValue {
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Decimal value
    Decimal(Decimal),
    /// String value
    String(Arc<str>),
    /// Date value with precision
    Date(PrecisionDate),
    /// DateTime value with precision
    DateTime(PrecisionDateTime),
    /// Time value with precision
    Time(PrecisionTime),
    /// Quantity with optional unit
    Quantity(Quantity),
    /// Binary content (base64Binary)
    Binary(Arc<[u8]>),
}

impl PrimitiveValue {
    /// Create a string value
    pub fn string(value: impl AsRef<str>) -> Self {
        Self::String(Arc::from(value.as_ref()))
    }

    /// Name of the System type of this value (`String`, `Integer`, ...)
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::Decimal(_) => "Decimal",
            Self::String(_) | Self::Binary(_) => "String",
            Self::Date(_) => "Date",
            Self::DateTime(_) => "DateTime",
            Self::Time(_) => "Time",
            Self::Quantity(_) => "Quantity",
        }
    }

    /// Name of the FHIR primitive type a node holding this value defaults to
    pub fn fhir_type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) => "dateTime",
            Self::Time(_) => "time",
            Self::Quantity(_) => "Quantity",
            Self::Binary(_) => "base64Binary",
        }
    }

    /// Boolean payload, if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload, if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload as a decimal, for integers and decimals
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(i) => Some(Decimal::from(*i)),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// String payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is an integer or a decimal
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Decimal(_))
    }

    /// FHIRPath equality (`=`)
    ///
    /// `None` means the result is unknown: temporal values of different
    /// precision that agree on their common prefix, or quantities whose units
    /// cannot be compared. Values of unrelated kinds are simply unequal.
    pub fn equals(&self, other: &PrimitiveValue) -> Option<bool> {
        use PrimitiveValue::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => Some(a == b),
            (String(a), String(b)) => Some(a == b),
            (Binary(a), Binary(b)) => Some(a == b),
            (Integer(_) | Decimal(_), Integer(_) | Decimal(_)) => {
                Some(self.as_decimal() == other.as_decimal())
            }
            (Quantity(a), Quantity(b)) => a.equals(b),
            (Date(_) | DateTime(_) | Time(_), _) => {
                self.compare(other).map(|ord| ord == Ordering::Equal).or(
                    if self.is_temporal_comparable(other) {
                        None
                    } else {
                        Some(false)
                    },
                )
            }
            _ => Some(false),
        }
    }

    fn is_temporal_comparable(&self, other: &PrimitiveValue) -> bool {
        use PrimitiveValue::*;
        matches!(
            (self, other),
            (Date(_) | DateTime(_), Date(_) | DateTime(_)) | (Time(_), Time(_))
        )
    }

    /// FHIRPath equivalence (`~`), never unknown
    ///
    /// Strings ignore case and collapse whitespace; decimals compare at the
    /// precision of the less precise operand; temporal values of different
    /// precision are not equivalent.
    pub fn equivalent(&self, other: &PrimitiveValue) -> bool {
        use PrimitiveValue::*;
        match (self, other) {
            (String(a), String(b)) => normalize_for_equivalence(a) == normalize_for_equivalence(b),
            (Integer(_) | Decimal(_), Integer(_) | Decimal(_)) => {
                match (self.as_decimal(), other.as_decimal()) {
                    (Some(a), Some(b)) => {
                        let scale = a.scale().min(b.scale());
                        a.round_dp(scale) == b.round_dp(scale)
                    }
                    _ => false,
                }
            }
            _ => self.equals(other).unwrap_or(false),
        }
    }

    /// Ordering for comparison operators; `None` when the values are not comparable
    pub fn compare(&self, other: &PrimitiveValue) -> Option<Ordering> {
        use PrimitiveValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Integer(_) | Decimal(_), Integer(_) | Decimal(_)) => {
                Some(self.as_decimal()?.cmp(&other.as_decimal()?))
            }
            (String(a), String(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => a.partial_compare(b),
            (DateTime(a), DateTime(b)) => a.partial_compare(b),
            (Date(a), DateTime(b)) => a.to_datetime().partial_compare(b),
            (DateTime(a), Date(b)) => a.partial_compare(&b.to_datetime()),
            (Time(a), Time(b)) => a.partial_compare(b),
            (Quantity(a), Quantity(b)) => a.compare(b),
            _ => None,
        }
    }
}

fn normalize_for_equivalence(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::String(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::Quantity(q) => write!(f, "{q}"),
            Self::Binary(bytes) => f.write_str(&STANDARD.encode(bytes)),
        }
    }
}

impl From<bool> for PrimitiveValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for PrimitiveValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Decimal> for PrimitiveValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for PrimitiveValue {
    fn from(value: String) -> Self {
        Self::String(Arc::from(value))
    }
}

impl From<Quantity> for PrimitiveValue {
    fn from(value: Quantity) -> Self {
        Self::Quantity(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(text: &str) -> PrimitiveValue {
        PrimitiveValue::Decimal(Decimal::from_str(text).expect("decimal"))
    }

    #[test]
    fn numbers_compare_across_kinds() {
        assert_eq!(PrimitiveValue::Integer(1).equals(&dec("1.0")), Some(true));
        assert_eq!(
            PrimitiveValue::Integer(2).compare(&dec("1.5")),
            Some(Ordering::Greater)
        );
        assert_eq!(PrimitiveValue::Integer(1).equals(&"1".into()), Some(false));
        assert_eq!(PrimitiveValue::Integer(1).compare(&"1".into()), None);
    }

    #[test]
    fn equivalence_relaxes_strings_and_decimals() {
        let a = PrimitiveValue::from("Hello   World");
        let b = PrimitiveValue::from(" hello world ");
        assert!(a.equivalent(&b));
        assert_eq!(a.equals(&b), Some(false));
        assert!(dec("1.2").equivalent(&dec("1.23")));
        assert!(!dec("1.2").equivalent(&dec("1.3")));
    }

    #[test]
    fn temporal_equality_can_be_unknown() {
        let year = PrimitiveValue::Date(PrecisionDate::parse("2020").expect("date"));
        let day = PrimitiveValue::Date(PrecisionDate::parse("2020-01-01").expect("date"));
        let dt = PrimitiveValue::DateTime(PrecisionDateTime::parse("2020-01-01").expect("dt"));
        assert_eq!(year.equals(&day), None);
        assert_eq!(day.equals(&dt), Some(true));
        assert!(!year.equivalent(&day));
        assert_eq!(day.equals(&PrimitiveValue::Integer(1)), Some(false));
    }

    #[test]
    fn binary_displays_as_base64() {
        let value = PrimitiveValue::Binary(Arc::from(&b"hi"[..]));
        assert_eq!(value.to_string(), "aGk=");
        assert_eq!(value.fhir_type_name(), "base64Binary");
    }
}
