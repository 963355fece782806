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

//! Arena-backed node tree
//!
//! All nodes of one record live in a single [`NodeTree`] and refer to each
//! other by [`NodeId`]. Parent links are plain indices, so the tree is
//! acyclic by construction and can be shared between threads as
//! `Arc<NodeTree>`. A [`NodeRef`] pairs a tree with a node id and is the
//! handle used everywhere outside this module.

use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::quantity::Quantity;
use crate::value::PrimitiveValue;

/// Index of a node within its [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Id of the root node of every tree
    pub const ROOT: NodeId = NodeId(0);

    /// Raw arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A typed record, possibly contained in another resource
    Resource,
    /// A typed sub-structure
    Element,
    /// A primitive value
    Primitive(PrimitiveValue),
}

/// Data stored for one node
#[derive(Debug, Clone)]
pub struct NodeData {
    kind: NodeKind,
    name: Arc<str>,
    type_name: Arc<str>,
    path: Arc<str>,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
}

impl NodeData {
    /// Node kind
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Field name under the parent; the type name for a root resource
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Dynamic path, e.g. `Patient.name[0].given[1]`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids in document order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Immutable tree of nodes for one record
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<NodeData>,
}

impl NodeTree {
    /// Look up a node
    pub fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes
            .get(id.index())
            .ok_or(ModelError::UnknownNode { id: id.index() })
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Trees always contain a root, so this is never true for a built tree
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root node id
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    // Ids handed out by `NodeRef` are always valid for their tree.
    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    /// Child ids in document order
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        self.node(id).map(NodeData::children)
    }

    /// Children whose field name is `name`
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> Result<impl Iterator<Item = NodeId> + 'a> {
        let children = self.children(id)?;
        Ok(children
            .iter()
            .copied()
            .filter(move |child| self.data(*child).name() == name))
    }

    /// Parent id
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        self.node(id).map(NodeData::parent)
    }

    /// Dynamic path
    pub fn path(&self, id: NodeId) -> Result<&str> {
        self.node(id).map(NodeData::path)
    }

    /// Declared type name
    pub fn type_name(&self, id: NodeId) -> Result<&str> {
        self.node(id).map(NodeData::type_name)
    }

    /// Node kind
    pub fn kind(&self, id: NodeId) -> Result<&NodeKind> {
        self.node(id).map(NodeData::kind)
    }
}

/// Incremental builder for a [`NodeTree`]
///
/// Single-valued fields are added with [`element`](Self::element) and
/// [`primitive`](Self::primitive); members of repeating fields with the
/// `push_*` variants, which append `[i]` to the path.
#[derive(Debug)]
pub struct NodeTreeBuilder {
    nodes: Vec<NodeData>,
}

impl NodeTreeBuilder {
    /// Start a tree whose root is a resource of `type_name`
    pub fn resource(type_name: &str) -> Self {
        let type_name: Arc<str> = Arc::from(type_name);
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Resource,
                name: Arc::clone(&type_name),
                path: Arc::clone(&type_name),
                type_name,
                parent: None,
                children: SmallVec::new(),
            }],
        }
    }

    /// Root id of the tree under construction
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn add(
        &mut self,
        parent: NodeId,
        name: &str,
        type_name: &str,
        kind: NodeKind,
        repeating: bool,
    ) -> Result<NodeId> {
        let parent_data = self
            .nodes
            .get(parent.index())
            .ok_or(ModelError::UnknownNode { id: parent.index() })?;

        let path = if repeating {
            let index = parent_data
                .children
                .iter()
                .filter(|child| &*self.nodes[child.index()].name == name)
                .count();
            format!("{}.{}[{}]", parent_data.path, name, index)
        } else {
            format!("{}.{}", parent_data.path, name)
        };

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            name: Arc::from(name),
            type_name: Arc::from(type_name),
            path: Arc::from(path),
            parent: Some(parent),
            children: SmallVec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    /// Add a single-valued complex element
    pub fn element(&mut self, parent: NodeId, name: &str, type_name: &str) -> Result<NodeId> {
        self.add(parent, name, type_name, NodeKind::Element, false)
    }

    /// Append a member of a repeating complex element
    pub fn push_element(&mut self, parent: NodeId, name: &str, type_name: &str) -> Result<NodeId> {
        self.add(parent, name, type_name, NodeKind::Element, true)
    }

    /// Add a single-valued primitive typed after its value
    pub fn primitive(
        &mut self,
        parent: NodeId,
        name: &str,
        value: impl Into<PrimitiveValue>,
    ) -> Result<NodeId> {
        let value = value.into();
        let type_name = value.fhir_type_name();
        self.add(parent, name, type_name, NodeKind::Primitive(value), false)
    }

    /// Add a single-valued primitive with an explicit FHIR type (`code`, `uri`, ...)
    pub fn typed_primitive(
        &mut self,
        parent: NodeId,
        name: &str,
        type_name: &str,
        value: impl Into<PrimitiveValue>,
    ) -> Result<NodeId> {
        self.add(parent, name, type_name, NodeKind::Primitive(value.into()), false)
    }

    /// Append a member of a repeating primitive field
    pub fn push_primitive(
        &mut self,
        parent: NodeId,
        name: &str,
        type_name: &str,
        value: impl Into<PrimitiveValue>,
    ) -> Result<NodeId> {
        self.add(parent, name, type_name, NodeKind::Primitive(value.into()), true)
    }

    /// Append a resource nested inside another one (`contained`, `entry.resource`)
    pub fn resource_child(
        &mut self,
        parent: NodeId,
        name: &str,
        type_name: &str,
        repeating: bool,
    ) -> Result<NodeId> {
        self.add(parent, name, type_name, NodeKind::Resource, repeating)
    }

    /// Finish the tree
    pub fn build(self) -> Arc<NodeTree> {
        Arc::new(NodeTree { nodes: self.nodes })
    }
}

/// Handle to one node of a shared tree
#[derive(Clone)]
pub struct NodeRef {
    tree: Arc<NodeTree>,
    id: NodeId,
}

impl NodeRef {
    /// Handle to a node; fails when `id` is not part of `tree`
    pub fn new(tree: Arc<NodeTree>, id: NodeId) -> Result<Self> {
        tree.node(id)?;
        Ok(Self { tree, id })
    }

    /// Handle to the root of `tree`
    pub fn root(tree: Arc<NodeTree>) -> Self {
        Self {
            tree,
            id: NodeId::ROOT,
        }
    }

    fn sibling(&self, id: NodeId) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            id,
        }
    }

    fn data(&self) -> &NodeData {
        self.tree.data(self.id)
    }

    /// Node id within its tree
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The tree this node belongs to
    pub fn tree(&self) -> &Arc<NodeTree> {
        &self.tree
    }

    /// Node kind
    pub fn kind(&self) -> &NodeKind {
        &self.data().kind
    }

    /// Field name under the parent
    pub fn name(&self) -> &str {
        self.data().name()
    }

    /// Declared type name
    pub fn type_name(&self) -> &str {
        self.data().type_name()
    }

    /// Dynamic path
    pub fn path(&self) -> &str {
        self.data().path()
    }

    /// Primitive value, for primitive nodes
    pub fn value(&self) -> Option<&PrimitiveValue> {
        match &self.data().kind {
            NodeKind::Primitive(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this node is a resource
    pub fn is_resource(&self) -> bool {
        matches!(self.data().kind, NodeKind::Resource)
    }

    /// Parent node
    pub fn parent(&self) -> Option<NodeRef> {
        self.data().parent.map(|id| self.sibling(id))
    }

    /// Children in document order
    pub fn children(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.data().children.iter().map(|id| self.sibling(*id))
    }

    /// Children whose field name is `name`
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeRef> + 'a {
        self.children().filter(move |child| child.name() == name)
    }

    /// Nearest resource walking parent links, the node itself included
    pub fn enclosing_resource(&self) -> Option<NodeRef> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.is_resource() {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    /// Outermost resource of the tree
    pub fn root_resource(&self) -> Option<NodeRef> {
        let mut outermost = None;
        let mut current = Some(self.clone());
        while let Some(node) = current {
            current = node.parent();
            if node.is_resource() {
                outermost = Some(node);
            }
        }
        outermost
    }

    /// Quantity view of a `Quantity`-shaped element (value + code/unit children)
    pub fn as_quantity(&self) -> Option<Quantity> {
        if let Some(PrimitiveValue::Quantity(q)) = self.value() {
            return Some(q.clone());
        }
        if !matches!(self.data().kind, NodeKind::Element) {
            return None;
        }
        let value = self
            .children_named("value")
            .find_map(|child| child.value().and_then(PrimitiveValue::as_decimal))?;
        let unit = self
            .children_named("code")
            .chain(self.children_named("unit"))
            .find_map(|child| child.value().and_then(|v| v.as_str().map(str::to_string)));
        Some(Quantity::new(value, unit.as_deref()))
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.tree) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("path", &self.path())
            .field("type", &self.type_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn patient_with_contained() -> Arc<NodeTree> {
        let mut builder = NodeTreeBuilder::resource("Patient");
        let root = builder.root();
        builder.primitive(root, "active", true).expect("node");
        let name = builder.push_element(root, "name", "HumanName").expect("node");
        builder.push_primitive(name, "given", "string", "Ann").expect("node");
        builder.push_primitive(name, "given", "string", "Marie").expect("node");
        let org = builder
            .resource_child(root, "contained", "Organization", true)
            .expect("node");
        builder.element(org, "address", "Address").expect("node");
        builder.build()
    }

    #[test]
    fn paths_index_repeating_fields() {
        let tree = patient_with_contained();
        let root = NodeRef::root(tree);
        let paths: Vec<_> = root
            .children()
            .flat_map(|child| {
                let mut paths = vec![child.path().to_string()];
                paths.extend(child.children().map(|c| c.path().to_string()));
                paths
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                "Patient.active",
                "Patient.name[0]",
                "Patient.name[0].given[0]",
                "Patient.name[0].given[1]",
                "Patient.contained[0]",
                "Patient.contained[0].address",
            ]
        );
    }

    #[test]
    fn resource_links_walk_to_nearest_and_outermost() {
        let root = NodeRef::root(patient_with_contained());
        let org = root.children_named("contained").next().expect("contained");
        let address = org.children().next().expect("address");

        assert_eq!(address.enclosing_resource(), Some(org.clone()));
        assert_eq!(address.root_resource(), Some(root.clone()));
        assert_eq!(root.enclosing_resource(), Some(root.clone()));
        assert_eq!(address.parent().and_then(|p| p.parent()), Some(root));
    }

    #[test]
    fn node_identity_is_per_tree() {
        let a = NodeRef::root(patient_with_contained());
        let b = NodeRef::root(patient_with_contained());
        assert_ne!(a, b);
        assert_eq!(a, NodeRef::new(Arc::clone(a.tree()), NodeId::ROOT).expect("root"));
        assert!(NodeRef::new(Arc::clone(a.tree()), NodeId(99)).is_err());
    }

    #[test]
    fn quantity_elements_expose_a_quantity() {
        let mut builder = NodeTreeBuilder::resource("Observation");
        let root = builder.root();
        let quantity = builder.element(root, "valueQuantity", "Quantity").expect("node");
        builder
            .primitive(quantity, "value", rust_decimal::Decimal::new(55, 1))
            .expect("node");
        builder
            .typed_primitive(quantity, "code", "code", "mg")
            .expect("node");
        let node = NodeRef::root(builder.build())
            .children()
            .next()
            .expect("value");
        assert_eq!(node.as_quantity().map(|q| q.to_string()), Some("5.5 'mg'".into()));
    }
}
