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

//! Composed constraint lists per type

use dashmap::DashMap;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;

use crate::constraint::Constraint;
use crate::error::{ConstraintError, Result};
use crate::provider::ConstraintProvider;

#[derive(Debug, Default)]
struct TypeEntry {
    supertype: Option<String>,
    constraints: Vec<Constraint>,
}

/// Collects type declarations, base constraints and providers
///
/// ```
/// use octofhir_fhirpath_constraint::{Constraint, ConstraintRegistryBuilder};
///
/// let mut builder = ConstraintRegistryBuilder::new();
/// builder
///     .declare_type("Resource", None)?
///     .declare_type("Patient", Some("Resource"))?
///     .base_constraint("Patient", Constraint::error("pat-1", "name.exists()"))?;
/// let registry = builder.build()?;
/// assert_eq!(registry.constraints_for("Patient").len(), 1);
/// # Ok::<(), octofhir_fhirpath_constraint::ConstraintError>(())
/// ```
#[derive(Default)]
pub struct ConstraintRegistryBuilder {
    types: IndexMap<String, TypeEntry>,
    providers: Vec<Arc<dyn ConstraintProvider>>,
}

impl ConstraintRegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name`, optionally deriving from `supertype`
    ///
    /// Supertypes may be declared later; they are checked by [`build`](Self::build).
    pub fn declare_type(&mut self, name: &str, supertype: Option<&str>) -> Result<&mut Self> {
        if self.types.contains_key(name) {
            return Err(ConstraintError::duplicate_type(name));
        }
        self.types.insert(
            name.to_string(),
            TypeEntry {
                supertype: supertype.map(str::to_string),
                constraints: Vec::new(),
            },
        );
        Ok(self)
    }

    /// Attach a base constraint to a declared type
    pub fn base_constraint(&mut self, type_name: &str, constraint: Constraint) -> Result<&mut Self> {
        let entry = self
            .types
            .get_mut(type_name)
            .ok_or_else(|| ConstraintError::unknown_type(type_name))?;
        entry.constraints.push(constraint);
        Ok(self)
    }

    /// Register a provider; providers run in registration order
    pub fn provider(&mut self, provider: Arc<dyn ConstraintProvider>) -> &mut Self {
        self.providers.push(provider);
        self
    }

    /// Check the type hierarchy and compose every declared type
    pub fn build(&mut self) -> Result<Arc<ConstraintRegistry>> {
        let types = std::mem::take(&mut self.types);
        let providers = std::mem::take(&mut self.providers);

        for (name, entry) in &types {
            if let Some(supertype) = &entry.supertype {
                if !types.contains_key(supertype) {
                    return Err(ConstraintError::UnknownSupertype {
                        type_name: name.clone(),
                        supertype: supertype.clone(),
                    });
                }
            }
        }

        let mut chains = FxHashMap::default();
        for name in types.keys() {
            chains.insert(name.clone(), supertype_chain(&types, name)?);
        }

        let base = types
            .into_iter()
            .map(|(name, entry)| (name, entry.constraints))
            .collect();

        let mut registry = ConstraintRegistry {
            chains,
            base,
            providers,
            composed: FxHashMap::default(),
            on_demand: DashMap::new(),
        };

        let composed = registry
            .chains
            .keys()
            .map(|name| (name.clone(), registry.compose(name)))
            .collect();
        registry.composed = composed;

        log::debug!(
            "Built constraint registry with {} types and {} providers",
            registry.composed.len(),
            registry.providers.len()
        );
        Ok(Arc::new(registry))
    }
}

/// Root-first chain ending with `name`
fn supertype_chain(types: &IndexMap<String, TypeEntry>, name: &str) -> Result<Vec<String>> {
    let mut chain = vec![name.to_string()];
    let mut seen = FxHashSet::default();
    seen.insert(name);

    let mut current = name;
    while let Some(supertype) = types.get(current).and_then(|e| e.supertype.as_deref()) {
        if !seen.insert(supertype) {
            return Err(ConstraintError::SupertypeCycle {
                type_name: name.to_string(),
            });
        }
        chain.push(supertype.to_string());
        current = supertype;
    }

    chain.reverse();
    Ok(chain)
}

/// Immutable lookup of composed constraints per type
///
/// Declared types are composed when the registry is built. Any other type
/// name is composed from providers alone the first time it is asked for.
pub struct ConstraintRegistry {
    chains: FxHashMap<String, Vec<String>>,
    base: FxHashMap<String, Vec<Constraint>>,
    providers: Vec<Arc<dyn ConstraintProvider>>,
    composed: FxHashMap<String, Arc<[Constraint]>>,
    on_demand: DashMap<String, Arc<[Constraint]>>,
}

impl ConstraintRegistry {
    /// Start a builder
    pub fn builder() -> ConstraintRegistryBuilder {
        ConstraintRegistryBuilder::new()
    }

    /// Registry with no types and no providers
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            chains: FxHashMap::default(),
            base: FxHashMap::default(),
            providers: Vec::new(),
            composed: FxHashMap::default(),
            on_demand: DashMap::new(),
        })
    }

    /// Composed constraints of `type_name`, model-checked ones included
    pub fn constraints_for(&self, type_name: &str) -> Arc<[Constraint]> {
        if let Some(constraints) = self.composed.get(type_name) {
            return Arc::clone(constraints);
        }
        if let Some(constraints) = self.on_demand.get(type_name) {
            return Arc::clone(constraints.value());
        }
        let constraints = self.compose(type_name);
        log::trace!("Composed {} constraints on demand for '{}'", constraints.len(), type_name);
        Arc::clone(
            self.on_demand
                .entry(type_name.to_string())
                .or_insert(constraints)
                .value(),
        )
    }

    /// Root-first supertype chain, ending with `type_name`
    pub fn supertype_chain<'a>(&'a self, type_name: &'a str) -> Vec<&'a str> {
        match self.chains.get(type_name) {
            Some(chain) => chain.iter().map(String::as_str).collect(),
            None => vec![type_name],
        }
    }

    /// Whether `type_name` was declared on the builder
    pub fn is_declared(&self, type_name: &str) -> bool {
        self.chains.contains_key(type_name)
    }

    /// Number of registered providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    fn compose(&self, type_name: &str) -> Arc<[Constraint]> {
        let mut constraints: Vec<Constraint> = self
            .supertype_chain(type_name)
            .into_iter()
            .filter_map(|name| self.base.get(name))
            .flatten()
            .cloned()
            .collect();

        for provider in self.providers.iter().filter(|p| p.applies_to(type_name)) {
            let additions = provider.additions(type_name);
            let removals = provider.removals(type_name);
            let replacements = provider.replacements(type_name);
            log::trace!(
                "Provider '{}' on '{}': {} added, {} removal predicates, {} replacements",
                provider.name(),
                type_name,
                additions.len(),
                removals.len(),
                replacements.len()
            );

            constraints.extend(additions);
            constraints.retain(|c| !removals.iter().any(|predicate| predicate.matches(c)));
            for (predicate, replacement) in &replacements {
                for constraint in constraints.iter_mut().filter(|c| predicate.matches(c)) {
                    *constraint = replacement.clone();
                }
            }
        }

        constraints.into()
    }
}

impl fmt::Debug for ConstraintRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintRegistry")
            .field("types", &self.composed.len())
            .field("on_demand", &self.on_demand.len())
            .field("providers", &self.providers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ConstraintPredicate;
    use crate::provider::StaticConstraintProvider;
    use pretty_assertions::assert_eq;

    fn ids(constraints: &[Constraint]) -> Vec<&str> {
        constraints.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn supertype_constraints_come_first() -> Result<()> {
        let mut builder = ConstraintRegistryBuilder::new();
        builder
            .declare_type("DomainResource", Some("Resource"))?
            .declare_type("Resource", None)?
            .declare_type("Patient", Some("DomainResource"))?
            .base_constraint("Patient", Constraint::error("pat-1", "true"))?
            .base_constraint("DomainResource", Constraint::error("dom-2", "true"))?
            .base_constraint("Resource", Constraint::error("res-1", "true"))?;
        let registry = builder.build()?;

        assert_eq!(ids(&registry.constraints_for("Patient")), vec!["res-1", "dom-2", "pat-1"]);
        assert_eq!(
            registry.supertype_chain("Patient"),
            vec!["Resource", "DomainResource", "Patient"]
        );
        Ok(())
    }

    #[test]
    fn undeclared_types_use_providers_only() -> Result<()> {
        let provider =
            StaticConstraintProvider::new("p").for_type("Basic").add(Constraint::warning("bas-1", "true"));
        let mut builder = ConstraintRegistryBuilder::new();
        builder.provider(Arc::new(provider));
        let registry = builder.build()?;

        assert!(!registry.is_declared("Basic"));
        assert_eq!(ids(&registry.constraints_for("Basic")), vec!["bas-1"]);
        assert!(registry.constraints_for("Other").is_empty());
        Ok(())
    }

    #[test]
    fn replacement_hits_every_match() -> Result<()> {
        let provider = StaticConstraintProvider::new("p")
            .for_type("T")
            .replace(ConstraintPredicate::by_source("core"), Constraint::warning("new", "true"));
        let mut builder = ConstraintRegistryBuilder::new();
        builder
            .declare_type("T", None)?
            .base_constraint("T", Constraint::error("a", "true").with_source("core"))?
            .base_constraint("T", Constraint::error("b", "true"))?
            .base_constraint("T", Constraint::error("c", "true").with_source("core"))?
            .provider(Arc::new(provider));
        let registry = builder.build()?;

        assert_eq!(ids(&registry.constraints_for("T")), vec!["new", "b", "new"]);
        Ok(())
    }

    #[test]
    fn rejects_bad_hierarchies() {
        let mut builder = ConstraintRegistryBuilder::new();
        assert!(matches!(
            builder.declare_type("A", None).and_then(|b| b.declare_type("A", None)),
            Err(ConstraintError::DuplicateType { .. })
        ));

        let mut builder = ConstraintRegistryBuilder::new();
        assert!(matches!(
            builder.base_constraint("Nope", Constraint::error("x", "true")),
            Err(ConstraintError::UnknownType { .. })
        ));

        let mut builder = ConstraintRegistryBuilder::new();
        let _ = builder.declare_type("A", Some("Missing"));
        assert!(matches!(builder.build(), Err(ConstraintError::UnknownSupertype { .. })));

        let mut builder = ConstraintRegistryBuilder::new();
        let _ = builder.declare_type("A", Some("B")).and_then(|b| b.declare_type("B", Some("A")));
        assert!(matches!(builder.build(), Err(ConstraintError::SupertypeCycle { .. })));
    }
}
