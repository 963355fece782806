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

//! JSON constraint sets

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constraint::Constraint;
use crate::error::Result;
use crate::provider::StaticConstraintProvider;
use crate::registry::ConstraintRegistryBuilder;

/// Base constraints of one type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeConstraints {
    /// Type name
    pub name: String,
    /// Direct supertype, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supertype: Option<String>,
    /// Base constraints
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

/// Serialized bundle of type declarations and providers
///
/// ```json
/// {
///   "types": [
///     {"name": "Resource"},
///     {"name": "Patient", "supertype": "Resource",
///      "constraints": [{"id": "pat-1", "level": "error", "expression": "name.exists()"}]}
///   ],
///   "providers": [
///     {"name": "local", "appliesTo": ["Patient"], "remove": [{"id": "pat-1"}]}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintSet {
    /// Declared types, in declaration order
    #[serde(default)]
    pub types: Vec<TypeConstraints>,
    /// Providers, in registration order
    #[serde(default)]
    pub providers: Vec<StaticConstraintProvider>,
}

impl ConstraintSet {
    /// Decode a set from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Declare the types and register the providers on `builder`
    pub fn apply(self, builder: &mut ConstraintRegistryBuilder) -> Result<()> {
        for declared in self.types {
            builder.declare_type(&declared.name, declared.supertype.as_deref())?;
            for constraint in declared.constraints {
                builder.base_constraint(&declared.name, constraint)?;
            }
        }
        for provider in self.providers {
            builder.provider(Arc::new(provider));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstraintError;
    use pretty_assertions::assert_eq;

    #[test]
    fn documented_set_builds() -> Result<()> {
        let set = ConstraintSet::from_json(
            r#"{
                "types": [
                    {"name": "Resource"},
                    {"name": "Patient", "supertype": "Resource",
                     "constraints": [
                        {"id": "pat-1", "level": "error", "expression": "name.exists()"},
                        {"id": "pat-2", "level": "warning", "expression": "active.exists()"}
                     ]}
                ],
                "providers": [
                    {"name": "local", "appliesTo": ["Patient"], "remove": [{"id": "pat-1"}]}
                ]
            }"#,
        )?;
        let mut builder = ConstraintRegistryBuilder::new();
        set.apply(&mut builder)?;
        let registry = builder.build()?;

        let ids: Vec<_> = registry.constraints_for("Patient").iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec!["pat-2".to_string()]);
        Ok(())
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            ConstraintSet::from_json(r#"{"types": [{"supertype": 3}]}"#),
            Err(ConstraintError::Json(_))
        ));
    }
}
