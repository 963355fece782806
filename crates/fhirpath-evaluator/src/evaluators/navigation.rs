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

//! Member navigation
//!
//! Navigation keeps document order and duplicates. Missing members, and
//! navigation from computed values, yield nothing.

use octofhir_fhirpath_model::{Collection, Item, NodeRef};

/// Specialized evaluator for member access
pub struct NavigationEvaluator;

impl NavigationEvaluator {
    /// `focus.name`
    ///
    /// Choice-type elements are reachable through their base name: `value`
    /// finds `valueQuantity`, `valueString`, and so on.
    pub fn navigate(focus: &Collection, name: &str) -> Collection {
        focus
            .iter()
            .filter_map(Item::as_node)
            .flat_map(|node| Self::members(node, name))
            .map(Item::Node)
            .collect()
    }

    /// First step of a path
    ///
    /// A leading type name (`Patient` in `Patient.name`) selects the focus
    /// items of that type instead of navigating.
    pub fn navigate_root(focus: &Collection, name: &str) -> Collection {
        if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            let typed: Collection = focus
                .iter()
                .filter(|item| item.as_node().is_some_and(|node| node.type_name() == name))
                .cloned()
                .collect();
            if !typed.is_empty() {
                return typed;
            }
        }
        Self::navigate(focus, name)
    }

    fn members(node: &NodeRef, name: &str) -> Vec<NodeRef> {
        node.children()
            .filter(|child| child.name() == name || Self::is_choice_of(child, name))
            .collect()
    }

    /// `valueQuantity` is a choice of `value` when its suffix names its type
    fn is_choice_of(child: &NodeRef, base: &str) -> bool {
        child
            .name()
            .strip_prefix(base)
            .filter(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()))
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(child.type_name()))
    }
}
