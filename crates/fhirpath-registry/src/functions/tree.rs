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

//! Tree navigation: `children()`, `descendants()`

use std::collections::VecDeque;

use octofhir_fhirpath_core::Result;
use octofhir_fhirpath_model::{Collection, Item};

use crate::context::EvaluationContext;
use crate::function::FhirPathFunction;
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    builder
        .register_function(ChildrenFunction)
        .register_function(DescendantsFunction);
}

/// `children()`: direct child nodes in document order
pub struct ChildrenFunction;

impl FhirPathFunction for ChildrenFunction {
    static_signature!(FunctionSignature::no_args("children"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(focus
            .iter()
            .filter_map(Item::as_node)
            .flat_map(|node| node.children().collect::<Vec<_>>())
            .map(Item::Node)
            .collect())
    }
}

/// `descendants()`: all nodes below the input, breadth first
pub struct DescendantsFunction;

impl FhirPathFunction for DescendantsFunction {
    static_signature!(FunctionSignature::no_args("descendants"));

    fn evaluate(&self, focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        let mut queue: VecDeque<_> = focus.iter().filter_map(Item::as_node).cloned().collect();
        let mut result = Collection::empty();
        while let Some(node) = queue.pop_front() {
            for child in node.children() {
                queue.push_back(child.clone());
                result.push(child);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::run;
    use octofhir_fhirpath_model::{Collection, Item, NodeRef, NodeTreeBuilder};
    use pretty_assertions::assert_eq;

    fn patient() -> Collection {
        let mut builder = NodeTreeBuilder::resource("Patient");
        let root = builder.root();
        builder.primitive(root, "active", true).expect("active");
        let name = builder.push_element(root, "name", "HumanName").expect("name");
        builder.primitive(name, "family", "Doe").expect("family");
        Collection::single(NodeRef::root(builder.build()))
    }

    #[test]
    fn children_and_descendants() {
        let children = run(patient(), "children()").expect("ok");
        assert_eq!(
            children.iter().filter_map(Item::path).collect::<Vec<_>>(),
            vec!["Patient.active", "Patient.name[0]"]
        );
        let descendants = run(patient(), "descendants()").expect("ok");
        assert_eq!(
            descendants.iter().filter_map(Item::path).collect::<Vec<_>>(),
            vec!["Patient.active", "Patient.name[0]", "Patient.name[0].family"]
        );
    }
}
