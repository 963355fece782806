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

//! Interfaces to collaborators that live outside the engine
//!
//! Reference resolution, the canonical profile store and terminology
//! belong to the hosting server. The engine only sees these traits; the
//! defaults here resolve nothing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::node::NodeRef;

/// Base of canonical URLs for core FHIR type definitions
pub const FHIR_STRUCTURE_DEFINITION_BASE: &str = "http://hl7.org/fhir/StructureDefinition/";

/// Resolves references (`Reference.reference`) to resource nodes
pub trait ReferenceResolver: Send + Sync {
    /// Resolve `target_type/logical_id[/_history/version_id]` as seen from `context`
    ///
    /// `Ok(None)` means the target is absent, which is a data condition.
    /// `Err` is reserved for failures of the resolver itself.
    fn resolve(
        &self,
        context: &NodeRef,
        target_type: Option<&str>,
        logical_id: &str,
        version_id: Option<&str>,
    ) -> Result<Option<NodeRef>>;
}

/// Resolver that never finds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

impl ReferenceResolver for NoopResolver {
    fn resolve(
        &self,
        _context: &NodeRef,
        _target_type: Option<&str>,
        _logical_id: &str,
        _version_id: Option<&str>,
    ) -> Result<Option<NodeRef>> {
        Ok(None)
    }
}

/// Kind of a structure definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefinitionKind {
    /// Resource definition or profile
    Resource,
    /// Complex data type
    ComplexType,
    /// Primitive data type
    PrimitiveType,
    /// Extension definition
    Extension,
    /// Accept any kind
    Any,
}

impl DefinitionKind {
    fn accepts(self, actual: DefinitionKind) -> bool {
        self == DefinitionKind::Any || self == actual
    }
}

/// Minimal view of a structure definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Canonical URL
    pub url: String,
    /// Computable name
    pub name: String,
    /// Kind of definition
    pub kind: DefinitionKind,
    /// Type constrained by this definition (`Patient` for a Patient profile)
    #[serde(rename = "type")]
    pub type_name: String,
    /// Canonical URL of the parent definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,
}

impl TypeDefinition {
    /// Definition of a core type at its standard canonical URL
    pub fn core(
        name: impl Into<String>,
        kind: DefinitionKind,
        base_type: Option<&str>,
    ) -> Self {
        let name = name.into();
        Self {
            url: format!("{FHIR_STRUCTURE_DEFINITION_BASE}{name}"),
            type_name: name.clone(),
            name,
            kind,
            base_definition: base_type.map(|base| format!("{FHIR_STRUCTURE_DEFINITION_BASE}{base}")),
        }
    }
}

/// Read access to the canonical type/profile registry
pub trait ProfileRegistry: Send + Sync {
    /// Look up a definition by canonical URL; `None` when unknown or of another kind
    fn lookup(&self, canonical_url: &str, expected_kind: DefinitionKind) -> Option<TypeDefinition>;

    /// Names of `type_name` and all its ancestors, most specific first
    fn type_ancestry(&self, type_name: &str) -> Vec<String> {
        let mut chain = vec![type_name.to_string()];
        let mut url = format!("{FHIR_STRUCTURE_DEFINITION_BASE}{type_name}");
        while let Some(definition) = self.lookup(&url, DefinitionKind::Any) {
            match definition.base_definition {
                Some(base) if chain.len() < 32 => {
                    if let Some(parent) = self.lookup(&base, DefinitionKind::Any) {
                        if chain.contains(&parent.type_name) {
                            break;
                        }
                        chain.push(parent.type_name.clone());
                    }
                    url = base;
                }
                _ => break,
            }
        }
        chain
    }
}

/// Registry that knows no definitions
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyProfileRegistry;

impl ProfileRegistry for EmptyProfileRegistry {
    fn lookup(&self, _canonical_url: &str, _expected_kind: DefinitionKind) -> Option<TypeDefinition> {
        None
    }
}

/// Registry backed by an in-memory map
#[derive(Debug, Default, Clone)]
pub struct InMemoryProfileRegistry {
    definitions: IndexMap<String, TypeDefinition>,
}

impl InMemoryProfileRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, replacing any with the same URL
    pub fn with_definition(mut self, definition: TypeDefinition) -> Self {
        self.insert(definition);
        self
    }

    /// Add a definition, replacing any with the same URL
    pub fn insert(&mut self, definition: TypeDefinition) {
        self.definitions.insert(definition.url.clone(), definition);
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl ProfileRegistry for InMemoryProfileRegistry {
    fn lookup(&self, canonical_url: &str, expected_kind: DefinitionKind) -> Option<TypeDefinition> {
        // Canonical references may carry a `|version` suffix
        let url = canonical_url.split('|').next().unwrap_or(canonical_url);
        self.definitions
            .get(url)
            .filter(|definition| expected_kind.accepts(definition.kind))
            .cloned()
    }
}

/// Code checked for value set membership
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodedValue {
    /// Code system URL, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Code system version, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The code itself
    pub code: String,
}

impl CodedValue {
    /// Code without a system
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            system: None,
            version: None,
            code: code.into(),
        }
    }

    /// Code from `system`
    pub fn in_system(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            ..Self::code(code)
        }
    }

    /// Also pin the code system version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Whether `self`, as found in data, is matched by the value set entry `entry`
    ///
    /// System and version only take part when both sides carry them.
    pub fn matches(&self, entry: &CodedValue) -> bool {
        fn agree(left: &Option<String>, right: &Option<String>) -> bool {
            match (left, right) {
                (Some(left), Some(right)) => left == right,
                _ => true,
            }
        }
        self.code == entry.code && agree(&self.system, &entry.system) && agree(&self.version, &entry.version)
    }
}

impl fmt::Display for CodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.system {
            Some(system) => write!(f, "{system}|{}", self.code),
            None => f.write_str(&self.code),
        }
    }
}

/// Value set membership checks
pub trait TerminologyService: Send + Sync {
    /// Name bound to `%terminologies`
    fn name(&self) -> &str {
        "none"
    }

    /// Whether `coded` belongs to the value set at `value_set_url`
    ///
    /// `Ok(None)` means the value set is unknown to this service, which is a
    /// data condition. `Err` is reserved for failures of the service itself.
    fn member_of(&self, value_set_url: &str, coded: &CodedValue) -> Result<Option<bool>>;
}

/// Terminology service that knows no value sets
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTerminologyService;

impl TerminologyService for NoopTerminologyService {
    fn member_of(&self, _value_set_url: &str, _coded: &CodedValue) -> Result<Option<bool>> {
        Ok(None)
    }
}

/// Terminology service over enumerated value sets held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryTerminologyService {
    value_sets: IndexMap<String, Vec<CodedValue>>,
}

impl InMemoryTerminologyService {
    /// Create an empty service
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value set, replacing any with the same URL
    pub fn with_value_set(mut self, url: impl Into<String>, codes: Vec<CodedValue>) -> Self {
        self.value_sets.insert(url.into(), codes);
        self
    }
}

impl TerminologyService for InMemoryTerminologyService {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn member_of(&self, value_set_url: &str, coded: &CodedValue) -> Result<Option<bool>> {
        let url = value_set_url.split('|').next().unwrap_or(value_set_url);
        Ok(self
            .value_sets
            .get(url)
            .map(|codes| codes.iter().any(|entry| coded.matches(entry))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> InMemoryProfileRegistry {
        InMemoryProfileRegistry::new()
            .with_definition(TypeDefinition::core("Quantity", DefinitionKind::ComplexType, Some("Element")))
            .with_definition(TypeDefinition::core("Age", DefinitionKind::ComplexType, Some("Quantity")))
            .with_definition(TypeDefinition::core("Element", DefinitionKind::ComplexType, None))
    }

    #[test]
    fn lookup_respects_kind_and_version_suffix() {
        let registry = registry();
        let url = "http://hl7.org/fhir/StructureDefinition/Age|4.0.1";
        assert!(registry.lookup(url, DefinitionKind::ComplexType).is_some());
        assert!(registry.lookup(url, DefinitionKind::Resource).is_none());
        assert!(EmptyProfileRegistry.lookup(url, DefinitionKind::Any).is_none());
    }

    #[test]
    fn ancestry_walks_base_definitions() {
        assert_eq!(
            registry().type_ancestry("Age"),
            vec!["Age", "Quantity", "Element"]
        );
        assert_eq!(EmptyProfileRegistry.type_ancestry("Age"), vec!["Age"]);
    }

    #[test]
    fn membership_ignores_missing_system_and_version() {
        let service = InMemoryTerminologyService::new().with_value_set(
            "http://example.org/ValueSet/vs1",
            vec![CodedValue::in_system("http://example.org/CodeSystem/cs1", "a").with_version("1.0.0")],
        );
        let check = |coded: CodedValue| {
            service
                .member_of("http://example.org/ValueSet/vs1|1", &coded)
                .expect("no failure")
        };
        assert_eq!(check(CodedValue::code("a")), Some(true));
        assert_eq!(check(CodedValue::code("x")), Some(false));
        assert_eq!(
            check(CodedValue::in_system("http://example.org/CodeSystem/cs1", "a").with_version("2.0.0")),
            Some(false)
        );
        assert_eq!(
            service.member_of("http://example.org/ValueSet/other", &CodedValue::code("a")).expect("ok"),
            None
        );
        assert_eq!(NoopTerminologyService.member_of("any", &CodedValue::code("a")).expect("ok"), None);
    }
}
