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

//! Dynamic type tests shared by `is`, `as` and `ofType`

use octofhir_fhirpath_model::{Item, NodeRef, ProfileRegistry};

/// Namespace of a type specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeNamespace {
    /// `System.X`
    System,
    /// `FHIR.X`
    Fhir,
    /// Unqualified; the model is searched first, then System
    Unqualified,
}

/// Parsed type specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpecifier<'a> {
    /// Namespace qualifier
    pub namespace: TypeNamespace,
    /// Type name without qualifier
    pub name: &'a str,
}

impl<'a> TypeSpecifier<'a> {
    /// Split `System.String`, `FHIR.Patient` or `Patient`
    pub fn parse(specifier: &'a str) -> Self {
        let specifier = specifier.trim_matches('`');
        match specifier.split_once('.') {
            Some(("System", name)) => Self {
                namespace: TypeNamespace::System,
                name,
            },
            Some(("FHIR", name)) => Self {
                namespace: TypeNamespace::Fhir,
                name,
            },
            _ => Self {
                namespace: TypeNamespace::Unqualified,
                name: specifier,
            },
        }
    }
}

/// Built-in specializations used when the profile registry knows nothing
fn builtin_parent(type_name: &str) -> Option<&'static str> {
    Some(match type_name {
        "code" | "id" | "markdown" => "string",
        "url" | "canonical" | "oid" | "uuid" => "uri",
        "positiveInt" | "unsignedInt" => "integer",
        "Age" | "Count" | "Distance" | "Duration" | "SimpleQuantity" | "MoneyQuantity" => {
            "Quantity"
        }
        "BackboneElement" => "Element",
        "DomainResource" => "Resource",
        _ => return None,
    })
}

/// Resources that derive from `Resource` directly instead of `DomainResource`
const NON_DOMAIN_RESOURCES: &[&str] = &["Bundle", "Binary", "Parameters"];

/// Names of the node's type and all its ancestors, most specific first
pub fn type_closure(node: &NodeRef, profiles: &dyn ProfileRegistry) -> Vec<String> {
    let mut chain = profiles.type_ancestry(node.type_name());
    while let Some(parent) = chain.last().and_then(|last| builtin_parent(last)) {
        if chain.iter().any(|known| known == parent) {
            break;
        }
        chain.push(parent.to_string());
    }
    let mut push = |name: &str| {
        if !chain.iter().any(|known| known == name) {
            chain.push(name.to_string());
        }
    };
    if node.is_resource() {
        if !NON_DOMAIN_RESOURCES.contains(&node.type_name()) {
            push("DomainResource");
        }
        push("Resource");
    } else {
        push("Element");
    }
    chain
}

/// Whether `item` is of the type named by `specifier`
///
/// Tree nodes match their declared type and its ancestors. Computed values
/// and the values held by primitive nodes match their System type; the
/// System comparison is case-insensitive for unqualified names so that
/// `birthDate is date` and `birthDate is Date` both hold.
pub fn type_matches(item: &Item, specifier: &str, profiles: &dyn ProfileRegistry) -> bool {
    let spec = TypeSpecifier::parse(specifier);
    match item {
        Item::Value(value) => {
            spec.namespace != TypeNamespace::Fhir && value.type_name() == spec.name
        }
        Item::Node(node) => {
            let system_match = || {
                item.to_primitive().is_some_and(|value| match spec.namespace {
                    TypeNamespace::System => value.type_name() == spec.name,
                    _ => value.type_name().eq_ignore_ascii_case(spec.name),
                })
            };
            match spec.namespace {
                TypeNamespace::System => node.value().is_some() && system_match(),
                TypeNamespace::Fhir => type_closure(node, profiles)
                    .iter()
                    .any(|name| name == spec.name),
                TypeNamespace::Unqualified => {
                    type_closure(node, profiles)
                        .iter()
                        .any(|name| name == spec.name)
                        || (node.value().is_some() && system_match())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_model::{
        DefinitionKind, EmptyProfileRegistry, InMemoryProfileRegistry, NodeTreeBuilder,
        PrimitiveValue, TypeDefinition,
    };
    use rstest::rstest;

    fn patient() -> (NodeRef, NodeRef, NodeRef) {
        let mut builder = NodeTreeBuilder::resource("Patient");
        let root = builder.root();
        let birth = builder
            .typed_primitive(root, "birthDate", "date", PrimitiveValue::Date(
                octofhir_fhirpath_model::PrecisionDate::parse("1980-01-01").expect("date"),
            ))
            .expect("node");
        let gender = builder
            .typed_primitive(root, "gender", "code", PrimitiveValue::string("male"))
            .expect("node");
        let tree = builder.build();
        (
            NodeRef::root(tree.clone()),
            NodeRef::new(tree.clone(), birth).expect("birth"),
            NodeRef::new(tree, gender).expect("gender"),
        )
    }

    #[rstest]
    #[case("Patient", true)]
    #[case("FHIR.Patient", true)]
    #[case("DomainResource", true)]
    #[case("Resource", true)]
    #[case("Observation", false)]
    #[case("System.String", false)]
    fn resource_types(#[case] specifier: &str, #[case] expected: bool) {
        let (patient, _, _) = patient();
        assert_eq!(
            type_matches(&Item::Node(patient), specifier, &EmptyProfileRegistry),
            expected
        );
    }

    #[rstest]
    #[case("date", true)]
    #[case("Date", true)]
    #[case("System.Date", true)]
    #[case("FHIR.Date", false)]
    #[case("dateTime", false)]
    fn primitive_types(#[case] specifier: &str, #[case] expected: bool) {
        let (_, birth, _) = patient();
        assert_eq!(
            type_matches(&Item::Node(birth), specifier, &EmptyProfileRegistry),
            expected
        );
    }

    #[test]
    fn specializations_match_their_base() {
        let (_, _, gender) = patient();
        assert!(type_matches(&Item::Node(gender.clone()), "code", &EmptyProfileRegistry));
        assert!(type_matches(&Item::Node(gender.clone()), "string", &EmptyProfileRegistry));
        assert!(type_matches(&Item::Node(gender), "String", &EmptyProfileRegistry));
    }

    #[test]
    fn profile_ancestry_is_consulted() {
        let registry = InMemoryProfileRegistry::new()
            .with_definition(TypeDefinition::core(
                "Patient",
                DefinitionKind::Resource,
                Some("DomainResource"),
            ))
            .with_definition(TypeDefinition::core(
                "DomainResource",
                DefinitionKind::Resource,
                Some("Resource"),
            ))
            .with_definition(TypeDefinition::core("Resource", DefinitionKind::Resource, None));
        let (patient, _, _) = patient();
        assert_eq!(
            type_closure(&patient, &registry),
            vec!["Patient", "DomainResource", "Resource"]
        );
    }

    #[test]
    fn computed_values_match_system_types() {
        let value = Item::Value(PrimitiveValue::Integer(1));
        assert!(type_matches(&value, "Integer", &EmptyProfileRegistry));
        assert!(type_matches(&value, "System.Integer", &EmptyProfileRegistry));
        assert!(!type_matches(&value, "Decimal", &EmptyProfileRegistry));
    }
}
