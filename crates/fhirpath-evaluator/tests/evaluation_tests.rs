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

//! End-to-end evaluation over JSON-built resources

use octofhir_fhirpath_evaluator::{EvaluationContext, FhirPathEngine};
use octofhir_fhirpath_model::{Collection, Item, NodeRef, TypeHints, tree_from_json};
use octofhir_fhirpath_registry::FunctionRegistry;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn context_for(resource: &Value) -> Result<EvaluationContext, Box<dyn std::error::Error>> {
    let tree = tree_from_json(resource, &TypeHints::fhir_core())?;
    Ok(EvaluationContext::new(
        Collection::single(NodeRef::root(tree)),
        FunctionRegistry::standard(),
    ))
}

fn observation() -> Value {
    json!({
        "resourceType": "Observation",
        "id": "o1",
        "status": "final",
        "code": {"coding": [{"system": "http://loinc.org", "code": "29463-7"}]},
        "valueQuantity": {"value": 72.5, "unit": "kg", "system": "http://unitsofmeasure.org", "code": "kg"},
        "component": [
            {"code": {"text": "a"}, "valueString": "left"},
            {"code": {"text": "b"}, "valueQuantity": {"value": 3, "code": "mg"}}
        ]
    })
}

#[rstest]
#[case("value.ofType(Quantity).value", "[72.5]")]
#[case("value > 70 'kg'", "[true]")]
#[case("value < 71000 'g'", "[false]")]
#[case("value is Quantity", "[true]")]
#[case("component.value.ofType(string)", "[left]")]
#[case("component.value.count()", "[2]")]
#[case("component.where(value is Quantity).code.text", "[b]")]
#[case("(value as Quantity).unit", "[kg]")]
#[case("code.coding.where(system = %loinc).code", "[29463-7]")]
#[case("iif(status = 'final', 'done', 'pending')", "[done]")]
#[case("status in ('final' | 'amended')", "[true]")]
#[case("component.code.text.intersect('b' | 'c')", "[b]")]
fn polymorphic_navigation(#[case] expression: &str, #[case] expected: &str) -> TestResult {
    let context = context_for(&observation())?;
    let result = FhirPathEngine::new().evaluate(expression, &context)?;
    assert_eq!(result.to_string(), expected);
    Ok(())
}

#[test]
fn bundle_references_resolve_locally() -> TestResult {
    let bundle = json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            {
                "fullUrl": "http://example.org/fhir/Patient/p1",
                "resource": {"resourceType": "Patient", "id": "p1", "active": true}
            },
            {
                "fullUrl": "http://example.org/fhir/Observation/o1",
                "resource": {
                    "resourceType": "Observation",
                    "id": "o1",
                    "status": "final",
                    "subject": {"reference": "Patient/p1"}
                }
            }
        ]
    });
    let context = context_for(&bundle)?;
    let engine = FhirPathEngine::new();

    let resolved = engine.evaluate("entry.resource.ofType(Observation).subject.resolve()", &context)?;
    assert_eq!(
        resolved.iter().filter_map(Item::path).collect::<Vec<_>>(),
        vec!["Bundle.entry[0].resource"]
    );
    let active = engine.evaluate(
        "entry.resource.ofType(Observation).subject.resolve().active",
        &context,
    )?;
    assert_eq!(active.to_string(), "[true]");
    Ok(())
}

#[test]
fn resource_constants_follow_the_context_node() -> TestResult {
    let bundle = json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [{"resource": {"resourceType": "Patient", "id": "inner"}}]
    });
    let tree = tree_from_json(&bundle, &TypeHints::fhir_core())?;
    let root = NodeRef::root(tree);
    let patient = root
        .children_named("entry")
        .flat_map(|entry| entry.children_named("resource").collect::<Vec<_>>())
        .next()
        .ok_or("missing patient")?;

    let engine = FhirPathEngine::new();
    let mut context = EvaluationContext::new(Collection::single(root), FunctionRegistry::standard());
    assert_eq!(engine.evaluate("%resource.type", &context)?.to_string(), "[collection]");

    context.set_root(Collection::single(patient));
    assert_eq!(engine.evaluate("%resource.id", &context)?.to_string(), "[inner]");
    assert_eq!(engine.evaluate("%rootResource.entry.count()", &context)?.to_string(), "[1]");
    assert_eq!(engine.evaluate("id", &context)?.to_string(), "[inner]");
    Ok(())
}

#[test]
fn descendants_and_repeat() -> TestResult {
    let questionnaire = json!({
        "resourceType": "Questionnaire",
        "item": [
            {"linkId": "1", "item": [{"linkId": "1.1"}, {"linkId": "1.2"}]},
            {"linkId": "2"}
        ]
    });
    let context = context_for(&questionnaire)?;
    let engine = FhirPathEngine::new();
    assert_eq!(
        engine.evaluate("repeat(item).linkId", &context)?.to_string(),
        "[1, 2, 1.1, 1.2]"
    );
    assert_eq!(
        engine.evaluate("descendants().linkId.count()", &context)?.to_string(),
        "[4]"
    );
    assert_eq!(
        engine.evaluate("item.linkId.isDistinct()", &context)?.to_string(),
        "[true]"
    );
    Ok(())
}
