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

//! Quantity values
//!
//! Units are compared textually after calendar keywords are mapped to their
//! UCUM codes. A small table of common commensurable units (mass, length,
//! volume, time) allows conversion between them; anything else must match
//! exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::error::{ModelError, Result};

/// Quantity value with optional unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantity {
    /// Numeric value
    pub value: Decimal,
    /// UCUM unit code; `None` for unitless quantities
    pub unit: Option<Arc<str>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Mass,
    Length,
    Volume,
    Time,
}

/// Unit code, dimension, factor to the dimension's base unit as (mantissa, scale)
const CONVERSIONS: &[(&str, Dimension, i64, u32)] = &[
    ("kg", Dimension::Mass, 1000, 0),
    ("g", Dimension::Mass, 1, 0),
    ("mg", Dimension::Mass, 1, 3),
    ("ug", Dimension::Mass, 1, 6),
    ("km", Dimension::Length, 1000, 0),
    ("m", Dimension::Length, 1, 0),
    ("cm", Dimension::Length, 1, 2),
    ("mm", Dimension::Length, 1, 3),
    ("L", Dimension::Volume, 1, 0),
    ("dL", Dimension::Volume, 1, 1),
    ("mL", Dimension::Volume, 1, 3),
    ("wk", Dimension::Time, 604800, 0),
    ("d", Dimension::Time, 86400, 0),
    ("h", Dimension::Time, 3600, 0),
    ("min", Dimension::Time, 60, 0),
    ("s", Dimension::Time, 1, 0),
    ("ms", Dimension::Time, 1, 3),
];

fn conversion(unit: &str) -> Option<(Dimension, Decimal)> {
    CONVERSIONS
        .iter()
        .find(|(code, ..)| *code == unit)
        .map(|(_, dimension, mantissa, scale)| (*dimension, Decimal::new(*mantissa, *scale)))
}

impl Quantity {
    /// Create a new quantity, normalizing calendar keywords to UCUM codes
    pub fn new(value: Decimal, unit: Option<&str>) -> Self {
        Self {
            value,
            unit: unit
                .filter(|u| !u.is_empty() && *u != "1")
                .map(|u| Arc::from(Self::normalize_unit_name(u))),
        }
    }

    /// Create a unitless quantity
    pub fn unitless(value: Decimal) -> Self {
        Self { value, unit: None }
    }

    fn normalize_unit_name(unit: &str) -> &str {
        match unit {
            "day" | "days" => "d",
            "hour" | "hours" => "h",
            "minute" | "minutes" => "min",
            "second" | "seconds" => "s",
            "week" | "weeks" => "wk",
            "month" | "months" => "mo",
            "year" | "years" => "a",
            "millisecond" | "milliseconds" => "ms",
            other => other,
        }
    }

    /// Unit code or the empty string
    pub fn unit_str(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }

    /// Express this quantity in `target_unit`, if the units are commensurable
    pub fn convert_to(&self, target_unit: Option<&str>) -> Option<Quantity> {
        match (self.unit.as_deref(), target_unit) {
            (None, None) => Some(self.clone()),
            (Some(from), Some(to)) if from == to => Some(self.clone()),
            (Some(from), Some(to)) => {
                let (from_dim, from_factor) = conversion(from)?;
                let (to_dim, to_factor) = conversion(to)?;
                if from_dim != to_dim {
                    return None;
                }
                let value = (self.value * from_factor).checked_div(to_factor)?;
                Some(Quantity::new(value.normalize(), Some(to)))
            }
            _ => None,
        }
    }

    /// Equality after unit conversion; `None` when the units are not comparable
    pub fn equals(&self, other: &Quantity) -> Option<bool> {
        self.compare(other).map(|ord| ord == Ordering::Equal)
    }

    /// Ordering after unit conversion; `None` when the units are not comparable
    pub fn compare(&self, other: &Quantity) -> Option<Ordering> {
        let other = other.convert_to(self.unit.as_deref())?;
        Some(self.value.cmp(&other.value))
    }

    /// Add two quantities; the result carries this quantity's unit
    pub fn add(&self, other: &Quantity) -> Result<Quantity> {
        let converted = self.converted_operand(other)?;
        Ok(Quantity {
            value: self.value + converted.value,
            unit: self.unit.clone(),
        })
    }

    /// Subtract two quantities; the result carries this quantity's unit
    pub fn subtract(&self, other: &Quantity) -> Result<Quantity> {
        let converted = self.converted_operand(other)?;
        Ok(Quantity {
            value: self.value - converted.value,
            unit: self.unit.clone(),
        })
    }

    fn converted_operand(&self, other: &Quantity) -> Result<Quantity> {
        other
            .convert_to(self.unit.as_deref())
            .ok_or_else(|| ModelError::incompatible_units(self.unit_str(), other.unit_str()))
    }

    /// Multiply by a plain number
    pub fn multiply_scalar(&self, scalar: Decimal) -> Quantity {
        Quantity {
            value: self.value * scalar,
            unit: self.unit.clone(),
        }
    }

    /// Divide by a plain number; `None` on division by zero
    pub fn divide_scalar(&self, scalar: Decimal) -> Option<Quantity> {
        self.value.checked_div(scalar).map(|value| Quantity {
            value,
            unit: self.unit.clone(),
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{} '{}'", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn q(value: &str, unit: &str) -> Quantity {
        Quantity::new(Decimal::from_str(value).expect("decimal"), Some(unit))
    }

    #[test]
    fn calendar_keywords_map_to_ucum() {
        assert_eq!(q("3", "days").unit_str(), "d");
        assert_eq!(q("1", "year").unit_str(), "a");
        assert_eq!(Quantity::new(Decimal::ONE, Some("1")).unit, None);
    }

    #[test]
    fn commensurable_units_compare() {
        assert_eq!(q("1", "g").equals(&q("1000", "mg")), Some(true));
        assert_eq!(q("2", "h").compare(&q("90", "min")), Some(Ordering::Greater));
        assert_eq!(q("1", "g").equals(&q("1", "m")), None);
        assert_eq!(q("1", "[lb_av]").equals(&q("1", "[lb_av]")), Some(true));
    }

    #[test]
    fn arithmetic_keeps_left_unit() {
        let sum = q("1", "g").add(&q("500", "mg")).expect("compatible");
        assert_eq!(sum.to_string(), "1.5 'g'");
        assert!(q("1", "g").subtract(&q("1", "cm")).is_err());
    }
}
