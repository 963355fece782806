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

use std::sync::Arc;
use std::thread;

use octofhir_fhirpath_constraint::{
    Constraint, ConstraintPredicate, ConstraintRegistry, ConstraintRegistryBuilder, StaticConstraintProvider,
};
use octofhir_fhirpath_model::{NodeRef, TypeHints, tree_from_json};
use octofhir_fhirpath_validator::{
    Issue, IssueCode, IssueSeverity, ValidationEngine, ValidationOutcome,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn node(resource: &Value) -> Result<NodeRef, Box<dyn std::error::Error>> {
    Ok(NodeRef::root(tree_from_json(resource, &TypeHints::fhir_core())?))
}

fn patient_constraints() -> Result<Arc<ConstraintRegistry>, Box<dyn std::error::Error>> {
    let mut builder = ConstraintRegistryBuilder::new();
    builder
        .declare_type("Resource", None)?
        .declare_type("DomainResource", Some("Resource"))?
        .declare_type("Patient", Some("DomainResource"))?
        .declare_type("Element", None)?
        .declare_type("HumanName", Some("Element"))?
        .base_constraint(
            "DomainResource",
            Constraint::error("dom-3", "contained.all(id.exists())")
                .with_description("Contained resources need an id"),
        )?
        .base_constraint(
            "Patient",
            Constraint::error("pat-1", "contact.all(name.exists() or telecom.exists())")
                .with_description("Contacts need a name or telecom"),
        )?
        .base_constraint(
            "Patient",
            Constraint::warning("foo-1", "family.exists()")
                .at("name")
                .with_description("name SHOULD have a family component"),
        )?
        .base_constraint(
            "Element",
            Constraint::error("ele-1", "hasValue() or children().exists()")
                .with_description("All FHIR elements must have a @value or children")
                .model_checked(),
        )?;
    Ok(builder.build()?)
}

fn engine() -> Result<ValidationEngine, Box<dyn std::error::Error>> {
    Ok(ValidationEngine::builder().constraints(patient_constraints()?).build())
}

#[test]
fn single_unnamed_family_yields_one_warning() -> TestResult {
    let patient = node(&json!({
        "resourceType": "Patient",
        "id": "p1",
        "name": [{"given": ["Ann"]}]
    }))?;

    let issues = engine()?.validate(&patient)?;
    assert_eq!(
        issues,
        vec![Issue {
            severity: IssueSeverity::Warning,
            code: IssueCode::Invariant,
            text: "foo-1: name SHOULD have a family component".into(),
            path: "Patient.name[0]".into(),
        }]
    );
    assert!(!issues.has_errors());
    Ok(())
}

#[test]
fn validating_twice_gives_identical_issues() -> TestResult {
    let patient = node(&json!({
        "resourceType": "Patient",
        "name": [{"given": ["Ann"]}, {"family": "Lee"}, {"text": "A. N. Other"}],
        "contact": [{"gender": "female"}]
    }))?;
    let engine = engine()?;

    let first = engine.validate(&patient)?;
    let second = engine.validate(&patient)?;
    assert_eq!(first, second);

    let paths: Vec<_> = first.iter().map(|issue| issue.path.as_str()).collect();
    assert_eq!(paths, vec!["Patient", "Patient.name[0]", "Patient.name[2]"]);
    assert_eq!(first.error_count(), 1);
    Ok(())
}

#[rstest]
#[case::absent_location(json!({"resourceType": "Patient", "id": "p1"}))]
#[case::empty_name_list(json!({"resourceType": "Patient", "name": []}))]
fn constraints_without_context_nodes_never_fire(#[case] resource: Value) -> TestResult {
    let mut builder = ConstraintRegistryBuilder::new();
    builder
        .declare_type("Patient", None)?
        .base_constraint("Patient", Constraint::error("never-1", "false").at("name"))?;
    let engine = ValidationEngine::builder().constraints(builder.build()?).build();

    assert!(engine.validate(&node(&resource)?)?.is_empty());
    Ok(())
}

#[test]
fn resource_is_rebound_inside_contained_resources() -> TestResult {
    let bundle = node(&json!({
        "resourceType": "Patient",
        "id": "outer",
        "contained": [{
            "resourceType": "Practitioner",
            "id": "inner",
            "name": [{"family": "Smith"}]
        }],
        "name": [{"family": "Jones"}]
    }))?;

    let mut builder = ConstraintRegistryBuilder::new();
    builder
        .declare_type("HumanName", None)?
        .base_constraint(
            "HumanName",
            Constraint::warning("where-1", "%resource.id = 'outer'").with_description("names of the outer resource"),
        )?
        .base_constraint(
            "HumanName",
            Constraint::warning("root-1", "%rootResource.id = 'outer'"),
        )?;
    let engine = ValidationEngine::builder().constraints(builder.build()?).build();

    let issues = engine.validate(&bundle)?;
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].path, "Patient.contained[0].name[0]");
    assert_eq!(issues[0].text, "where-1: names of the outer resource");

    let selected = engine.evaluate("contained.name.select(%resource.id)", &bundle)?;
    assert_eq!(selected.to_string(), "[outer]");
    Ok(())
}

#[test]
fn providers_edit_what_the_validator_sees() -> TestResult {
    let relax = StaticConstraintProvider::new("relax")
        .for_type("Patient")
        .replace(
            ConstraintPredicate::by_id("foo-1"),
            Constraint::warning("foo-1", "family.exists() or text.exists()")
                .at("name")
                .with_description("name needs a family or text"),
        )
        .add(Constraint::error("loc-1", "active.exists()").with_description("active is required locally"));

    let mut builder = ConstraintRegistryBuilder::new();
    builder
        .declare_type("Patient", None)?
        .base_constraint("Patient", Constraint::warning("foo-1", "family.exists()").at("name"))?
        .provider(Arc::new(relax));
    let engine = ValidationEngine::builder().constraints(builder.build()?).build();

    let patient = node(&json!({
        "resourceType": "Patient",
        "name": [{"text": "Ann"}, {"given": ["Bo"]}]
    }))?;
    let issues = engine.validate(&patient)?;
    let texts: Vec<_> = issues.iter().map(|issue| issue.text.as_str()).collect();
    assert_eq!(texts, vec!["foo-1: name needs a family or text", "loc-1: active is required locally"]);
    assert_eq!(issues[0].path, "Patient.name[1]");
    assert_eq!(issues[1].path, "Patient");
    Ok(())
}

#[test]
fn one_engine_serves_many_threads() -> TestResult {
    let engine = Arc::new(engine()?);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let resource = json!({
                "resourceType": "Patient",
                "id": format!("p{i}"),
                "name": [{"given": ["Ann"]}, {"family": "Lee"}]
            });
            thread::spawn(move || -> Result<Vec<Issue>, String> {
                let tree = tree_from_json(&resource, &TypeHints::fhir_core()).map_err(|e| e.to_string())?;
                engine.validate(&NodeRef::root(tree)).map_err(|e| e.to_string())
            })
        })
        .collect();

    for handle in handles {
        let issues = handle.join().map_err(|_| "validation thread panicked")??;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "Patient.name[0]");
    }
    Ok(())
}
