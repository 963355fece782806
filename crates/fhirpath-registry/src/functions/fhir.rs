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

//! FHIR-specific functions: `resolve()`, `extension(url)`, `conformsTo(url)`

use octofhir_fhirpath_core::{EvalError, Result};
use octofhir_fhirpath_model::{Collection, DefinitionKind, Item, NodeRef, PrimitiveValue};

use crate::context::EvaluationContext;
use crate::function::FhirPathFunction;
use crate::functions::{singleton_string, string_arg};
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;
use crate::types::type_closure;

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    builder
        .register_function(ResolveFunction)
        .register_function(ExtensionFunction)
        .register_function(ConformsToFunction);
}

fn child_string(node: &NodeRef, name: &str) -> Option<String> {
    node.children_named(name)
        .find_map(|child| child.value().and_then(PrimitiveValue::as_str).map(str::to_string))
}

/// Parsed literal reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget<'a> {
    /// Resource type, when the reference names one
    pub resource_type: Option<&'a str>,
    /// Logical id
    pub logical_id: &'a str,
    /// Version from a `/_history/` suffix
    pub version_id: Option<&'a str>,
}

impl<'a> ReferenceTarget<'a> {
    /// Parse `Type/id`, `Type/id/_history/v` or an absolute URL ending in one
    pub fn parse(reference: &'a str) -> Option<Self> {
        let segments: Vec<&str> = reference.trim_end_matches('/').split('/').collect();
        let (core, version_id) = match segments.iter().rposition(|s| *s == "_history") {
            Some(at) => (&segments[..at], segments.get(at + 1).copied()),
            None => (&segments[..], None),
        };
        match core {
            [.., resource_type, logical_id]
                if resource_type.starts_with(|c: char| c.is_ascii_uppercase()) =>
            {
                Some(Self {
                    resource_type: Some(*resource_type),
                    logical_id: *logical_id,
                    version_id,
                })
            }
            [logical_id] if !logical_id.is_empty() => Some(Self {
                resource_type: None,
                logical_id: *logical_id,
                version_id,
            }),
            _ => None,
        }
    }
}

/// `#id` reference to a resource contained in an enclosing resource
fn resolve_contained(context: &NodeRef, id: &str) -> Option<NodeRef> {
    let mut resource = context.enclosing_resource();
    while let Some(container) = resource {
        if let Some(found) = container
            .children_named("contained")
            .find(|contained| child_string(contained, "id").as_deref() == Some(id))
        {
            return Some(found);
        }
        resource = container.parent().and_then(|parent| parent.enclosing_resource());
    }
    None
}

/// Reference to another entry of the enclosing Bundle
fn resolve_in_bundle(context: &NodeRef, reference: &str, target: Option<&ReferenceTarget<'_>>) -> Option<NodeRef> {
    let bundle = context.root_resource().filter(|root| root.type_name() == "Bundle")?;
    bundle.children_named("entry").find_map(|entry| {
        let resource = entry.children_named("resource").next()?;
        let full_url_matches = child_string(&entry, "fullUrl").as_deref() == Some(reference);
        let id_matches = target.is_some_and(|target| {
            target.resource_type == Some(resource.type_name())
                && child_string(&resource, "id").as_deref() == Some(target.logical_id)
        });
        (full_url_matches || id_matches).then_some(resource)
    })
}

/// `resolve()`
///
/// Contained (`#id`) and Bundle-local references are resolved inside the
/// tree; everything else goes to the injected resolver. Targets that cannot
/// be found are skipped.
pub struct ResolveFunction;

impl ResolveFunction {
    fn resolve_one(&self, item: &Item, context: &EvaluationContext) -> Result<Option<NodeRef>> {
        let (reference, origin) = match item {
            Item::Node(node) if node.value().is_none() => match child_string(node, "reference") {
                Some(reference) => (reference, node.clone()),
                None => return Ok(None),
            },
            Item::Node(node) => match node.value().and_then(PrimitiveValue::as_str) {
                Some(reference) => (reference.to_string(), node.clone()),
                None => return Ok(None),
            },
            Item::Value(PrimitiveValue::String(reference)) => {
                match context.root().first().and_then(Item::as_node) {
                    Some(root) => (reference.to_string(), root.clone()),
                    None => return Ok(None),
                }
            }
            Item::Value(_) => return Ok(None),
        };

        if let Some(id) = reference.strip_prefix('#') {
            return Ok(resolve_contained(&origin, id));
        }
        let target = ReferenceTarget::parse(&reference);
        if let Some(local) = resolve_in_bundle(&origin, &reference, target.as_ref()) {
            return Ok(Some(local));
        }
        let Some(target) = target else {
            log::debug!("Reference '{reference}' is not a literal reference");
            return Ok(None);
        };
        context
            .resolver()
            .resolve(&origin, target.resource_type, target.logical_id, target.version_id)
            .map_err(|err| EvalError::resolver(err.to_string()))
    }
}

impl FhirPathFunction for ResolveFunction {
    static_signature!(FunctionSignature::no_args("resolve"));

    fn documentation(&self) -> &str {
        "For each item in the collection, resolves the reference and returns the target resource. Unresolvable references are skipped."
    }

    fn evaluate(&self, focus: &Collection, _args: &[Collection], context: &EvaluationContext) -> Result<Collection> {
        let mut result = Collection::empty();
        for item in focus {
            if let Some(resource) = self.resolve_one(item, context)? {
                result.push(resource);
            }
        }
        Ok(result)
    }
}

/// `extension(url)`: extensions of the input with the given url
pub struct ExtensionFunction;

impl FhirPathFunction for ExtensionFunction {
    static_signature!(FunctionSignature::fixed("extension", 1));

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        let Some(url) = string_arg(args, 0, "extension")? else {
            return Ok(Collection::empty());
        };
        Ok(focus
            .iter()
            .filter_map(Item::as_node)
            .flat_map(|node| node.children_named("extension").collect::<Vec<_>>())
            .filter(|extension| child_string(extension, "url").as_deref() == Some(url.as_str()))
            .map(Item::Node)
            .collect())
    }
}

/// `conformsTo(url)`
///
/// Checks the input's type against the type constrained by the profile.
/// Unknown profiles, and inputs that are not a single node, yield empty.
pub struct ConformsToFunction;

impl FhirPathFunction for ConformsToFunction {
    static_signature!(FunctionSignature::fixed("conformsTo", 1));

    fn evaluate(&self, focus: &Collection, args: &[Collection], context: &EvaluationContext) -> Result<Collection> {
        let Some(url) = singleton_string(&args[0]) else {
            return Ok(Collection::empty());
        };
        let Some(node) = focus.singleton().and_then(Item::as_node) else {
            return Ok(Collection::empty());
        };
        let Some(definition) = context.profiles().lookup(&url, DefinitionKind::Any) else {
            log::debug!("conformsTo: profile '{url}' is not known");
            return Ok(Collection::empty());
        };
        let closure = type_closure(node, context.profiles());
        Ok(Collection::boolean(
            closure.iter().any(|name| *name == definition.type_name),
        ))
    }
}
