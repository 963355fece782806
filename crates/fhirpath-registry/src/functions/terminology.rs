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

//! Terminology functions: `memberOf(valueSet [, strength])`

use octofhir_fhirpath_core::{EvalError, Result};
use octofhir_fhirpath_model::{CodedValue, Collection, Item, NodeRef, PrimitiveValue};

use crate::context::{EvaluationContext, UCUM_SYSTEM};
use crate::function::FhirPathFunction;
use crate::functions::string_arg;
use crate::issue::SupplementalIssue;
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register_function(MemberOfFunction);
}

/// Binding strength accepted as the second `memberOf` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStrength {
    /// Codes must come from the value set
    Required,
    /// Other codes are allowed when no suitable one exists
    Extensible,
    /// Other codes are allowed
    Preferred,
    /// The value set is only an example
    Example,
}

impl BindingStrength {
    /// Parse the FHIR code of a binding strength
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "required" => Some(Self::Required),
            "extensible" => Some(Self::Extensible),
            "preferred" => Some(Self::Preferred),
            "example" => Some(Self::Example),
            _ => None,
        }
    }

    fn is_required(self) -> bool {
        self == Self::Required
    }
}

fn child_text(node: &NodeRef, name: &str) -> Option<String> {
    node.children_named(name)
        .find_map(|child| child.value().and_then(PrimitiveValue::as_str).map(str::to_string))
}

fn coded_from_value(value: &PrimitiveValue) -> Option<CodedValue> {
    match value {
        PrimitiveValue::Quantity(quantity) => quantity
            .unit
            .as_deref()
            .map(|unit| CodedValue::in_system(UCUM_SYSTEM, unit)),
        other => other.as_str().map(CodedValue::code),
    }
}

/// Codes carried by one item: a code-like primitive, a Coding, a
/// CodeableConcept (each coding), or a Quantity (system and code)
fn coded_values(item: &Item) -> Vec<CodedValue> {
    let node = match item {
        Item::Value(value) => return coded_from_value(value).into_iter().collect(),
        Item::Node(node) => node,
    };
    if let Some(value) = node.value() {
        return coded_from_value(value).into_iter().collect();
    }
    let codings: Vec<NodeRef> = node.children_named("coding").collect();
    let elements = if codings.is_empty() { vec![node.clone()] } else { codings };
    elements
        .iter()
        .filter_map(|element| {
            let code = child_text(element, "code")?;
            Some(CodedValue {
                system: child_text(element, "system"),
                version: child_text(element, "version"),
                code,
            })
        })
        .collect()
}

/// `memberOf(valueSet [, strength])`
///
/// True when a code of the single input item is in the value set. With a
/// non-required strength a code outside the value set is reported as an
/// informational finding and the result is still true. Value sets the
/// terminology service does not know yield empty.
pub struct MemberOfFunction;

impl FhirPathFunction for MemberOfFunction {
    static_signature!(FunctionSignature::new("memberOf", 1, 2));

    fn documentation(&self) -> &str {
        "Returns true if the code, Coding, CodeableConcept or Quantity is a member of the given value set."
    }

    fn evaluate(&self, focus: &Collection, args: &[Collection], context: &EvaluationContext) -> Result<Collection> {
        if focus.is_empty() {
            return Ok(Collection::empty());
        }
        let item = focus
            .singleton()
            .ok_or_else(|| EvalError::singleton_expected("memberOf", focus.len()))?;
        let Some(url) = string_arg(args, 0, "memberOf")? else {
            return Ok(Collection::empty());
        };
        let strength = match string_arg(args, 1, "memberOf")? {
            None => BindingStrength::Required,
            Some(code) => BindingStrength::parse(&code).ok_or_else(|| {
                EvalError::invalid_argument("memberOf", format!("unknown binding strength '{code}'"))
            })?,
        };

        let mut outside = Vec::new();
        for coded in coded_values(item) {
            let member = context
                .terminology()
                .member_of(&url, &coded)
                .map_err(|err| EvalError::terminology(err.to_string()))?;
            match member {
                Some(true) => return Ok(Collection::boolean(true)),
                Some(false) => outside.push(coded),
                None => {}
            }
        }

        if outside.is_empty() {
            log::debug!("memberOf: no decision for value set '{url}'");
            return Ok(Collection::empty());
        }
        if strength.is_required() {
            return Ok(Collection::boolean(false));
        }
        let path = item
            .path()
            .or_else(|| context.root().first().and_then(Item::path))
            .unwrap_or_default();
        for coded in outside {
            context.report_issue(SupplementalIssue::code_invalid(
                format!("Code '{coded}' is not in value set '{url}'"),
                path,
            ));
        }
        Ok(Collection::boolean(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{SupplementalCode, SupplementalSeverity};
    use crate::registry::FunctionRegistry;
    use octofhir_fhirpath_model::{InMemoryTerminologyService, NodeTreeBuilder};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;

    const VS1: &str = "http://example.org/fhir/ValueSet/vs1";
    const CS1: &str = "http://example.org/fhir/CodeSystem/cs1";

    fn context(focus: &Collection) -> EvaluationContext {
        let terminology = InMemoryTerminologyService::new()
            .with_value_set(VS1, vec![CodedValue::in_system(CS1, "a").with_version("1.0.0")]);
        EvaluationContext::new(focus.clone(), FunctionRegistry::standard())
            .with_terminology(Arc::new(terminology))
    }

    fn member_of(focus: &Collection, args: &[&str]) -> Result<Collection> {
        let args: Vec<Collection> = args
            .iter()
            .map(|arg| Collection::single(PrimitiveValue::string(*arg)))
            .collect();
        MemberOfFunction.evaluate(focus, &args, &context(focus))
    }

    fn coding(version: &str, code: &str) -> Collection {
        let mut builder = NodeTreeBuilder::resource("Observation");
        let root = builder.root();
        let concept = builder.element(root, "code", "CodeableConcept").expect("concept");
        let coding = builder.push_element(concept, "coding", "Coding").expect("coding");
        builder.primitive(coding, "system", CS1).expect("system");
        builder.primitive(coding, "version", version).expect("version");
        builder.primitive(coding, "code", code).expect("code");
        let tree = builder.build();
        Collection::single(NodeRef::new(tree, concept).expect("concept"))
    }

    #[rstest]
    #[case(Collection::single(PrimitiveValue::string("a")), Some(true))]
    #[case(Collection::single(PrimitiveValue::string("x")), Some(false))]
    #[case(coding("1.0.0", "a"), Some(true))]
    #[case(coding("2.0.0", "a"), Some(false))]
    #[case(Collection::empty(), None)]
    fn required_membership(#[case] focus: Collection, #[case] expected: Option<bool>) {
        assert_eq!(
            member_of(&focus, &[VS1]).expect("evaluates"),
            Collection::from_option_bool(expected)
        );
    }

    #[test]
    fn unknown_value_sets_are_empty() {
        let focus = Collection::single(PrimitiveValue::string("a"));
        assert_eq!(
            member_of(&focus, &["http://example.org/fhir/ValueSet/other"]).expect("evaluates"),
            Collection::empty()
        );
    }

    #[test]
    fn weaker_bindings_pass_with_an_informational_finding() {
        let focus = coding("1.0.0", "x");
        let context = context(&focus);
        let args = [
            Collection::single(PrimitiveValue::string(VS1)),
            Collection::single(PrimitiveValue::string("extensible")),
        ];
        let result = MemberOfFunction.evaluate(&focus, &args, &context).expect("evaluates");
        assert_eq!(result, Collection::boolean(true));

        let issues = context.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, SupplementalSeverity::Information);
        assert_eq!(issues[0].code, SupplementalCode::CodeInvalid);
        assert_eq!(issues[0].path, "Observation.code");
    }

    #[test]
    fn rejects_bad_arguments() {
        let focus = Collection::single(PrimitiveValue::string("a"));
        assert!(matches!(
            member_of(&focus, &[VS1, "mandatory"]),
            Err(EvalError::InvalidArgument { .. })
        ));
        let many = Collection::from_items(vec![
            Item::Value(PrimitiveValue::string("a")),
            Item::Value(PrimitiveValue::string("b")),
        ]);
        assert!(matches!(
            member_of(&many, &[VS1]),
            Err(EvalError::SingletonExpected { .. })
        ));
    }
}
