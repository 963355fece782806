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

//! Constraint providers

use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::predicate::ConstraintPredicate;

/// Source of edits to the constraint list of a type
///
/// The registry only asks for additions, removals and replacements when
/// [`applies_to`](ConstraintProvider::applies_to) holds for the type.
pub trait ConstraintProvider: Send + Sync {
    /// Provider name, for logging
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Whether this provider edits the constraints of `type_name`
    fn applies_to(&self, type_name: &str) -> bool;

    /// Constraints appended to the list
    fn additions(&self, type_name: &str) -> Vec<Constraint>;

    /// Predicates selecting constraints to drop
    fn removals(&self, type_name: &str) -> Vec<ConstraintPredicate>;

    /// Each predicate's matches are replaced by the paired constraint
    fn replacements(&self, type_name: &str) -> Vec<(ConstraintPredicate, Constraint)>;
}

/// Replacement entry of a [`StaticConstraintProvider`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replacement {
    /// Constraints to replace
    pub matching: ConstraintPredicate,
    /// Constraint put in their place
    pub with: Constraint,
}

/// Data-driven provider: the same edits for every type it applies to
///
/// Decodes from JSON:
///
/// ```json
/// {
///   "name": "local-policy",
///   "appliesTo": ["Patient"],
///   "add": [{"id": "loc-1", "level": "warning", "expression": "telecom.exists()"}],
///   "remove": [{"id": "pat-1"}],
///   "replace": [{"matching": {"id": "pat-2"}, "with": {"id": "pat-2", "level": "warning", "expression": "true"}}]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticConstraintProvider {
    name: String,
    applies_to: Vec<String>,
    #[serde(default)]
    add: Vec<Constraint>,
    #[serde(default)]
    remove: Vec<ConstraintPredicate>,
    #[serde(default)]
    replace: Vec<Replacement>,
}

impl StaticConstraintProvider {
    /// Provider applying to no type yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Apply to `type_name` as well
    pub fn for_type(mut self, type_name: impl Into<String>) -> Self {
        self.applies_to.push(type_name.into());
        self
    }

    /// Add `constraint`
    pub fn add(mut self, constraint: Constraint) -> Self {
        self.add.push(constraint);
        self
    }

    /// Remove constraints selected by `predicate`
    pub fn remove(mut self, predicate: ConstraintPredicate) -> Self {
        self.remove.push(predicate);
        self
    }

    /// Replace constraints selected by `predicate` with `constraint`
    pub fn replace(mut self, predicate: ConstraintPredicate, constraint: Constraint) -> Self {
        self.replace.push(Replacement {
            matching: predicate,
            with: constraint,
        });
        self
    }
}

impl ConstraintProvider for StaticConstraintProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies_to(&self, type_name: &str) -> bool {
        self.applies_to.iter().any(|name| name == type_name)
    }

    fn additions(&self, _type_name: &str) -> Vec<Constraint> {
        self.add.clone()
    }

    fn removals(&self, _type_name: &str) -> Vec<ConstraintPredicate> {
        self.remove.clone()
    }

    fn replacements(&self, _type_name: &str) -> Vec<(ConstraintPredicate, Constraint)> {
        self.replace
            .iter()
            .map(|replacement| (replacement.matching.clone(), replacement.with.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_documented_shape() {
        let provider: StaticConstraintProvider = serde_json::from_str(
            r#"{
                "name": "local-policy",
                "appliesTo": ["Patient"],
                "add": [{"id": "loc-1", "level": "warning", "expression": "telecom.exists()"}],
                "remove": [{"id": "pat-1"}],
                "replace": [{"matching": {"id": "pat-2"}, "with": {"id": "pat-2", "level": "warning", "expression": "true"}}]
            }"#,
        )
        .expect("decodes");
        assert_eq!(provider.name(), "local-policy");
        assert!(provider.applies_to("Patient"));
        assert!(!provider.applies_to("Observation"));
        assert_eq!(provider.additions("Patient"), vec![Constraint::warning("loc-1", "telecom.exists()")]);
        assert_eq!(provider.removals("Patient").len(), 1);
        assert_eq!(provider.replacements("Patient")[0].1, Constraint::warning("pat-2", "true"));
    }
}
