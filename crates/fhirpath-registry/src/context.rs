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

//! Per-call evaluation context

use octofhir_fhirpath_model::{
    Collection, EmptyProfileRegistry, Item, NoopResolver, NoopTerminologyService, PrecisionDate,
    PrecisionDateTime, PrecisionTime, PrimitiveValue, ProfileRegistry, ReferenceResolver,
    TerminologyService,
};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::sync::Arc;

use crate::issue::SupplementalIssue;
use crate::registry::FunctionRegistry;

/// `%ucum`
pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";
/// `%loinc`
pub const LOINC_SYSTEM: &str = "http://loinc.org";
/// `%sct`
pub const SCT_SYSTEM: &str = "http://snomed.info/sct";

/// State for one evaluation call
///
/// Holds the root focus, the external constants (`%resource`, `%context`,
/// `%rootResource` and caller-defined ones), the function library and the
/// injected collaborators. A context is owned by one caller at a time; the
/// validator re-binds `%resource` and `%context` on it between expressions.
///
/// Functions may record [`SupplementalIssue`]s while they run. They stay on
/// the context until the caller takes or clears them.
pub struct EvaluationContext {
    root: Collection,
    variables: FxHashMap<String, Collection>,
    functions: Arc<FunctionRegistry>,
    resolver: Arc<dyn ReferenceResolver>,
    profiles: Arc<dyn ProfileRegistry>,
    terminology: Arc<dyn TerminologyService>,
    constraint: Option<String>,
    issues: RefCell<Vec<SupplementalIssue>>,
}

impl EvaluationContext {
    /// Context evaluating against `root`
    ///
    /// `%context` is bound to `root`. When `root` is a single tree node,
    /// `%resource` and `%rootResource` are bound to its nearest and outermost
    /// resources.
    pub fn new(root: Collection, functions: Arc<FunctionRegistry>) -> Self {
        let mut context = Self {
            root: Collection::empty(),
            variables: FxHashMap::default(),
            functions,
            resolver: Arc::new(NoopResolver),
            profiles: Arc::new(EmptyProfileRegistry),
            terminology: Arc::new(NoopTerminologyService),
            constraint: None,
            issues: RefCell::new(Vec::new()),
        };
        context.set_root(root);
        context
    }

    /// Replace the reference resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the profile registry
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileRegistry>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Replace the terminology service used by `memberOf()`
    pub fn with_terminology(mut self, terminology: Arc<dyn TerminologyService>) -> Self {
        self.terminology = terminology;
        self
    }

    /// Bind an external constant
    pub fn with_variable(mut self, name: impl Into<String>, value: Collection) -> Self {
        self.set_variable(name, value);
        self
    }

    /// Bind or re-bind an external constant
    pub fn set_variable(&mut self, name: impl Into<String>, value: Collection) {
        self.variables.insert(name.into(), value);
    }

    /// Remove an external constant
    pub fn unset_variable(&mut self, name: &str) {
        self.variables.remove(name);
    }

    /// Replace the root focus and re-derive `%context`, `%resource` and `%rootResource`
    ///
    /// A root that is not a single tree node leaves `%resource` and
    /// `%rootResource` unbound.
    pub fn set_root(&mut self, root: Collection) {
        let node = root.singleton().and_then(Item::as_node);
        match node.and_then(|node| node.enclosing_resource()) {
            Some(resource) => self.set_variable("resource", Collection::single(resource)),
            None => self.unset_variable("resource"),
        }
        match node.and_then(|node| node.root_resource()) {
            Some(outermost) => self.set_variable("rootResource", Collection::single(outermost)),
            None => self.unset_variable("rootResource"),
        }
        self.set_variable("context", root.clone());
        self.root = root;
    }

    /// Record the constraint whose expression is about to be evaluated
    pub fn set_constraint(&mut self, id: impl Into<String>) {
        self.constraint = Some(id.into());
    }

    /// Forget the constraint under evaluation
    pub fn unset_constraint(&mut self) {
        self.constraint = None;
    }

    /// Constraint under evaluation, if any
    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    /// Record a finding; it is tagged with the constraint under evaluation
    pub fn report_issue(&self, mut issue: SupplementalIssue) {
        if issue.constraint_id.is_none() {
            issue.constraint_id = self.constraint.clone();
        }
        log::debug!("Supplemental issue at '{}': {}", issue.path, issue.text);
        self.issues.borrow_mut().push(issue);
    }

    /// Findings recorded so far
    pub fn issues(&self) -> Vec<SupplementalIssue> {
        self.issues.borrow().clone()
    }

    /// Whether any finding was recorded
    pub fn has_issues(&self) -> bool {
        !self.issues.borrow().is_empty()
    }

    /// Remove and return the recorded findings
    pub fn take_issues(&self) -> Vec<SupplementalIssue> {
        self.issues.take()
    }

    /// Drop the recorded findings
    pub fn clear_issues(&self) {
        self.issues.borrow_mut().clear();
    }

    /// Value of an external constant
    ///
    /// Besides bound names this knows `%ucum`, `%loinc`, `%sct`, `%now`,
    /// `%today`, `%timeOfDay`, `%terminologies` (the terminology service
    /// name), and the `%vs-name` / `%ext-name` shorthands.
    pub fn variable(&self, name: &str) -> Option<Collection> {
        if let Some(value) = self.variables.get(name) {
            return Some(value.clone());
        }
        let text = |s: String| Some(Collection::single(PrimitiveValue::from(s)));
        match name {
            "ucum" => text(UCUM_SYSTEM.to_string()),
            "loinc" => text(LOINC_SYSTEM.to_string()),
            "sct" => text(SCT_SYSTEM.to_string()),
            "now" => Some(Collection::single(PrimitiveValue::DateTime(
                PrecisionDateTime::now(),
            ))),
            "today" => Some(Collection::single(PrimitiveValue::Date(PrecisionDate::today()))),
            "timeOfDay" => Some(Collection::single(PrimitiveValue::Time(PrecisionTime::now()))),
            "terminologies" => text(self.terminology.name().to_string()),
            _ => {
                if let Some(value_set) = name.strip_prefix("vs-") {
                    text(format!("http://hl7.org/fhir/ValueSet/{value_set}"))
                } else if let Some(extension) = name.strip_prefix("ext-") {
                    text(format!("http://hl7.org/fhir/StructureDefinition/{extension}"))
                } else {
                    None
                }
            }
        }
    }

    /// Root focus of the evaluation
    pub fn root(&self) -> &Collection {
        &self.root
    }

    /// Function library
    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Reference resolver
    pub fn resolver(&self) -> &dyn ReferenceResolver {
        self.resolver.as_ref()
    }

    /// Profile registry
    pub fn profiles(&self) -> &dyn ProfileRegistry {
        self.profiles.as_ref()
    }

    /// Terminology service
    pub fn terminology(&self) -> &dyn TerminologyService {
        self.terminology.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_model::{NodeRef, NodeTreeBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn binds_resource_constants_for_node_roots() {
        let mut builder = NodeTreeBuilder::resource("Bundle");
        let root = builder.root();
        let entry = builder.push_element(root, "entry", "BackboneElement").expect("node");
        let patient = builder
            .resource_child(entry, "resource", "Patient", false)
            .expect("node");
        let name = builder.push_element(patient, "name", "HumanName").expect("node");
        let tree = builder.build();
        let name = NodeRef::new(tree, name).expect("name");

        let context = EvaluationContext::new(
            Collection::single(name.clone()),
            FunctionRegistry::standard(),
        );
        let resource = context.variable("resource").expect("bound");
        let outermost = context.variable("rootResource").expect("bound");
        assert_eq!(resource.first().and_then(Item::path), Some("Bundle.entry[0].resource"));
        assert_eq!(outermost.first().and_then(Item::path), Some("Bundle"));
        assert_eq!(context.variable("context"), Some(Collection::single(name)));
    }

    #[test]
    fn well_known_constants() {
        let context = EvaluationContext::new(Collection::empty(), FunctionRegistry::standard());
        assert_eq!(
            context.variable("ucum").map(|c| c.to_string()),
            Some(format!("[{UCUM_SYSTEM}]"))
        );
        assert_eq!(
            context.variable("vs-administrative-gender").map(|c| c.to_string()),
            Some("[http://hl7.org/fhir/ValueSet/administrative-gender]".to_string())
        );
        assert_eq!(context.variable("unknown"), None);
        assert_eq!(
            context.variable("terminologies").map(|c| c.to_string()),
            Some("[none]".to_string())
        );
    }

    #[test]
    fn non_node_roots_unbind_resource_constants() {
        let tree = NodeTreeBuilder::resource("Patient").build();
        let patient = NodeRef::root(tree);
        let mut context = EvaluationContext::new(Collection::single(patient), FunctionRegistry::standard());
        assert!(context.variable("resource").is_some());

        context.set_root(Collection::single(PrimitiveValue::from("text".to_string())));
        assert_eq!(context.variable("resource"), None);
        assert_eq!(context.variable("rootResource"), None);
        assert_eq!(context.variable("context").map(|c| c.to_string()), Some("[text]".to_string()));
    }

    #[test]
    fn supplemental_issues_carry_the_constraint() {
        let mut context = EvaluationContext::new(Collection::empty(), FunctionRegistry::standard());
        context.set_constraint("vs-1");
        context.report_issue(SupplementalIssue::code_invalid("not in value set", "Patient.gender"));
        assert!(context.has_issues());
        assert_eq!(context.issues()[0].constraint_id.as_deref(), Some("vs-1"));

        let taken = context.take_issues();
        assert_eq!(taken.len(), 1);
        assert!(!context.has_issues());

        context.unset_constraint();
        context.report_issue(SupplementalIssue::code_invalid("again", "Patient"));
        assert_eq!(context.issues()[0].constraint_id, None);
        context.clear_issues();
        assert!(context.issues().is_empty());
    }
}
