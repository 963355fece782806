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

//! Evaluation results: items and ordered collections

use rustc_hash::FxHashSet;
use std::fmt;

use crate::node::{NodeKind, NodeRef};
use crate::value::PrimitiveValue;

/// One member of an evaluation result
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A node of a record tree
    Node(NodeRef),
    /// A computed value (literal, function result)
    Value(PrimitiveValue),
}

impl Item {
    /// Type name: the declared type for nodes, the System type for values
    pub fn type_name(&self) -> &str {
        match self {
            Item::Node(node) => node.type_name(),
            Item::Value(value) => value.type_name(),
        }
    }

    /// Primitive value of this item: the value itself, a primitive node's
    /// value, or the quantity held by a `Quantity`-shaped element
    pub fn to_primitive(&self) -> Option<PrimitiveValue> {
        match self {
            Item::Value(value) => Some(value.clone()),
            Item::Node(node) => match node.kind() {
                NodeKind::Primitive(value) => Some(value.clone()),
                NodeKind::Element => node.as_quantity().map(PrimitiveValue::Quantity),
                NodeKind::Resource => None,
            },
        }
    }

    /// Borrow the primitive payload without building quantities
    pub fn primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Item::Value(value) => Some(value),
            Item::Node(node) => node.value(),
        }
    }

    /// Tree node, if this item is one
    pub fn as_node(&self) -> Option<&NodeRef> {
        match self {
            Item::Node(node) => Some(node),
            Item::Value(_) => None,
        }
    }

    /// Boolean payload
    pub fn as_boolean(&self) -> Option<bool> {
        self.primitive().and_then(PrimitiveValue::as_boolean)
    }

    /// Path of the underlying node, if any
    pub fn path(&self) -> Option<&str> {
        self.as_node().map(NodeRef::path)
    }

    /// FHIRPath equality of two items; `None` when unknown
    ///
    /// Primitives (and quantity-shaped elements) compare by value; other
    /// elements compare member by member.
    pub fn equals(&self, other: &Item) -> Option<bool> {
        match (self.to_primitive(), other.to_primitive()) {
            (Some(a), Some(b)) => a.equals(&b),
            (None, None) => match (self, other) {
                (Item::Node(a), Item::Node(b)) => Some(structurally_equal(a, b, false)),
                _ => Some(false),
            },
            _ => Some(false),
        }
    }

    /// FHIRPath equivalence of two items
    pub fn equivalent(&self, other: &Item) -> bool {
        match (self.to_primitive(), other.to_primitive()) {
            (Some(a), Some(b)) => a.equivalent(&b),
            (None, None) => match (self, other) {
                (Item::Node(a), Item::Node(b)) => structurally_equal(a, b, true),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Member-wise comparison of two complex nodes
///
/// `id` children are ignored under equivalence.
fn structurally_equal(a: &NodeRef, b: &NodeRef, equivalence: bool) -> bool {
    if a == b {
        return true;
    }
    let members = |node: &NodeRef| -> Vec<NodeRef> {
        node.children()
            .filter(|child| !(equivalence && child.name() == "id"))
            .collect()
    };
    let (left, right) = (members(a), members(b));
    left.len() == right.len()
        && left.iter().zip(right.iter()).all(|(l, r)| {
            if l.name() != r.name() {
                return false;
            }
            match (l.value(), r.value()) {
                (Some(lv), Some(rv)) if equivalence => lv.equivalent(rv),
                (Some(lv), Some(rv)) => lv.equals(rv) == Some(true),
                (None, None) => structurally_equal(l, r, equivalence),
                _ => false,
            }
        })
}

impl From<PrimitiveValue> for Item {
    fn from(value: PrimitiveValue) -> Self {
        Item::Value(value)
    }
}

impl From<NodeRef> for Item {
    fn from(node: NodeRef) -> Self {
        Item::Node(node)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Value(value) => write!(f, "{value}"),
            Item::Node(node) => match node.value() {
                Some(value) => write!(f, "{value}"),
                None => write!(f, "{}@{}", node.type_name(), node.path()),
            },
        }
    }
}

/// Identity used for de-duplication
///
/// A node is identified by its tree and position, which within one tree is
/// the same as its dynamic path; computed values by their value.
#[derive(PartialEq, Eq, Hash)]
enum ItemKey<'a> {
    Node(&'a NodeRef),
    Value(&'a PrimitiveValue),
}

impl<'a> ItemKey<'a> {
    fn of(item: &'a Item) -> Self {
        match item {
            Item::Node(node) => ItemKey::Node(node),
            Item::Value(value) => ItemKey::Value(value),
        }
    }
}

/// Ordered, possibly empty sequence of items; duplicates are preserved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection(Vec<Item>);

impl Collection {
    /// Empty collection
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Collection holding one item
    pub fn single(item: impl Into<Item>) -> Self {
        Self(vec![item.into()])
    }

    /// Singleton boolean
    pub fn boolean(value: bool) -> Self {
        Self::single(PrimitiveValue::Boolean(value))
    }

    /// Empty for `None`, singleton boolean otherwise
    pub fn from_option_bool(value: Option<bool>) -> Self {
        value.map(Self::boolean).unwrap_or_default()
    }

    /// Collection over existing items
    pub fn from_items(items: Vec<Item>) -> Self {
        Self(items)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over items
    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.0.iter()
    }

    /// Items as a slice
    pub fn as_slice(&self) -> &[Item] {
        &self.0
    }

    /// Append an item
    pub fn push(&mut self, item: impl Into<Item>) {
        self.0.push(item.into());
    }

    /// Append all items of `other`, keeping duplicates
    pub fn extend(&mut self, other: Collection) {
        self.0.extend(other.0);
    }

    /// First item
    pub fn first(&self) -> Option<&Item> {
        self.0.first()
    }

    /// Last item
    pub fn last(&self) -> Option<&Item> {
        self.0.last()
    }

    /// Item at `index`
    pub fn get(&self, index: usize) -> Option<&Item> {
        self.0.get(index)
    }

    /// Consume into the underlying vector
    pub fn into_vec(self) -> Vec<Item> {
        self.0
    }

    /// The only item, if there is exactly one
    pub fn singleton(&self) -> Option<&Item> {
        match self.0.as_slice() {
            [item] => Some(item),
            _ => None,
        }
    }

    /// `Some(b)` when this is exactly one boolean
    pub fn as_singleton_boolean(&self) -> Option<bool> {
        self.singleton().and_then(Item::as_boolean)
    }

    /// Items of `self` followed by those of `other`, duplicates removed
    ///
    /// The first occurrence wins, so document order is kept.
    pub fn union(&self, other: &Collection) -> Collection {
        let mut seen = FxHashSet::default();
        let items = self
            .0
            .iter()
            .chain(other.0.iter())
            .filter(|item| seen.insert(ItemKey::of(item)))
            .cloned()
            .collect();
        Collection(items)
    }

    /// This collection without duplicates
    pub fn distinct(&self) -> Collection {
        self.union(&Collection::empty())
    }

    /// Whether some item equals `item`
    pub fn contains_item(&self, item: &Item) -> bool {
        self.0.iter().any(|candidate| candidate.equals(item) == Some(true))
    }

    /// Whether every item occurs only once
    pub fn is_distinct(&self) -> bool {
        let mut seen = FxHashSet::default();
        self.0.iter().all(|item| seen.insert(ItemKey::of(item)))
    }
}

impl FromIterator<Item> for Collection {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Collection {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Item>> for Collection {
    fn from(items: Vec<Item>) -> Self {
        Self(items)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeTreeBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn union_removes_duplicates_keeping_first_occurrence() {
        let left: Collection = [1, 2, 2].map(|i| Item::from(PrimitiveValue::Integer(i))).into_iter().collect();
        let right: Collection = [3, 1].map(|i| Item::from(PrimitiveValue::Integer(i))).into_iter().collect();
        assert_eq!(left.union(&right).to_string(), "[1, 2, 3]");
        assert_eq!(left.len(), 3);
        assert!(!left.is_distinct());
    }

    #[test]
    fn nodes_with_equal_values_stay_distinct() {
        let mut builder = NodeTreeBuilder::resource("Patient");
        let root = builder.root();
        let name = builder.push_element(root, "name", "HumanName").expect("node");
        builder.push_primitive(name, "given", "string", "Ann").expect("node");
        builder.push_primitive(name, "given", "string", "Ann").expect("node");
        let tree = builder.build();
        let given: Collection = crate::node::NodeRef::root(tree)
            .children()
            .flat_map(|n| n.children().collect::<Vec<_>>())
            .map(Item::Node)
            .collect();

        assert_eq!(given.union(&given).len(), 2);
        let with_value = given.union(&Collection::single(PrimitiveValue::from("Ann")));
        assert_eq!(with_value.len(), 3);
    }

    #[test]
    fn complex_elements_compare_member_wise() {
        let coding = |code: &str, id: Option<&str>| {
            let mut builder = NodeTreeBuilder::resource("Basic");
            let root = builder.root();
            let coding = builder.element(root, "code", "Coding").expect("node");
            if let Some(id) = id {
                builder.typed_primitive(coding, "id", "id", id).expect("node");
            }
            builder.typed_primitive(coding, "code", "code", code).expect("node");
            let node = crate::node::NodeRef::root(builder.build())
                .children()
                .next()
                .expect("coding");
            Item::Node(node)
        };
        assert_eq!(coding("a", None).equals(&coding("a", None)), Some(true));
        assert_eq!(coding("a", None).equals(&coding("b", None)), Some(false));
        assert_eq!(coding("a", Some("x")).equals(&coding("a", None)), Some(false));
        assert!(coding("a", Some("x")).equivalent(&coding("A", None)));
    }

    #[test]
    fn singleton_boolean() {
        assert_eq!(Collection::boolean(false).as_singleton_boolean(), Some(false));
        assert_eq!(Collection::empty().as_singleton_boolean(), None);
        assert_eq!(Collection::from_option_bool(None), Collection::empty());
    }
}
