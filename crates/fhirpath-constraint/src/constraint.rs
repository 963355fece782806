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

//! Constraint values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a failed constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// The resource is invalid
    Error,
    /// The resource is suspicious
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => f.write_str("ERROR"),
            Level::Warning => f.write_str("WARNING"),
        }
    }
}

/// Where a constraint is evaluated, relative to a node of its type
///
/// Serialized as an optional location expression: absent means `Base`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Location {
    /// The node itself
    #[default]
    Base,
    /// Every tree node selected by this expression, evaluated at the node
    Path(String),
}

impl From<Option<String>> for Location {
    fn from(expression: Option<String>) -> Self {
        expression.map_or(Location::Base, Location::Path)
    }
}

impl From<Location> for Option<String> {
    fn from(location: Location) -> Self {
        match location {
            Location::Base => None,
            Location::Path(expression) => Some(expression),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Base => f.write_str("(base)"),
            Location::Path(expression) => f.write_str(expression),
        }
    }
}

/// FHIRPath invariant attached to a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    /// Identifier such as `pat-1`
    pub id: String,
    /// Severity when the invariant fails
    pub level: Level,
    /// Evaluation location
    #[serde(default, skip_serializing_if = "is_base")]
    pub location: Location,
    /// Boolean FHIRPath expression that must hold
    pub expression: String,
    /// Human-readable description, used as the issue text
    #[serde(default)]
    pub description: String,
    /// Origin of the constraint (core specification, a profile url, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Enforced by the data model itself; skipped by the validator
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub model_checked: bool,
}

fn is_base(location: &Location) -> bool {
    *location == Location::Base
}

impl Constraint {
    /// Constraint evaluated at the node itself
    pub fn new(id: impl Into<String>, level: Level, expression: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level,
            location: Location::Base,
            expression: expression.into(),
            description: String::new(),
            source: None,
            model_checked: false,
        }
    }

    /// Shorthand for an `Error` constraint
    pub fn error(id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(id, Level::Error, expression)
    }

    /// Shorthand for a `Warning` constraint
    pub fn warning(id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(id, Level::Warning, expression)
    }

    /// Evaluate at the nodes selected by `expression`
    pub fn at(mut self, expression: impl Into<String>) -> Self {
        self.location = Location::Path(expression.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Mark as enforced by the data model
    pub fn model_checked(mut self) -> Self {
        self.model_checked = true;
        self
    }

    /// Issue text: `id: description`, or the id alone without a description
    pub fn issue_text(&self) -> String {
        if self.description.is_empty() {
            self.id.clone()
        } else {
            format!("{}: {}", self.id, self.description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn issue_text_omits_a_missing_description() {
        let constraint = Constraint::error("pat-1", "name.exists()");
        assert_eq!(constraint.issue_text(), "pat-1");
        let constraint = constraint.with_description("A name is required");
        assert_eq!(constraint.issue_text(), "pat-1: A name is required");
    }

    #[test]
    fn decodes_with_defaults() {
        let constraint: Constraint = serde_json::from_value(json!({
            "id": "pat-1",
            "level": "error",
            "expression": "name.exists()"
        }))
        .expect("decodes");
        assert_eq!(constraint, Constraint::error("pat-1", "name.exists()"));
    }

    #[test]
    fn location_is_an_optional_expression() {
        let constraint = Constraint::warning("foo-1", "family.exists()")
            .at("name")
            .with_description("Names need a family")
            .model_checked();
        let encoded = serde_json::to_value(&constraint).expect("encodes");
        assert_eq!(
            encoded,
            json!({
                "id": "foo-1",
                "level": "warning",
                "location": "name",
                "expression": "family.exists()",
                "description": "Names need a family",
                "modelChecked": true
            })
        );
        let decoded: Constraint = serde_json::from_value(encoded).expect("decodes");
        assert_eq!(decoded, constraint);
        assert_eq!(decoded.issue_text(), "foo-1: Names need a family");
    }
}
