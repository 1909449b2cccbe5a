//! `TreeNode`/`OperationTree`/`ResponseTree`: trees of arbitrary nesting
//! over Object/Instance/Resource/ResourceInstance levels.
//!
//! The shape is a tagged enum so structural validity (an Object never
//! directly holds a ResourceInstance, say) is enforced by the type itself,
//! and lookup is by [`Path`] rather than by walking string keys.

use std::collections::BTreeMap;

use lwm2m_core::{InstanceId, ObjectId, Path, ResourceId, ResourceInstanceId};
use serde::{Deserialize, Serialize};

/// One node of an operation or response tree, generic over the leaf payload
/// `L` (an `OperationLeaf` when building a request, a `ResponseLeaf` when
/// reading a reply).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[serde(bound(deserialize = "L: Deserialize<'de>"))]
pub enum TreeNode<L> {
    Object {
        id: ObjectId,
        #[serde(default)]
        children: BTreeMap<u16, TreeNode<L>>,
    },
    Instance {
        id: InstanceId,
        #[serde(default)]
        children: BTreeMap<u16, TreeNode<L>>,
    },
    Resource {
        id: ResourceId,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        leaf: Option<L>,
        #[serde(default)]
        children: BTreeMap<u16, TreeNode<L>>,
    },
    ResourceInstance { id: ResourceInstanceId, value: L },
}

/// A forest of [`TreeNode`]s rooted at Objects, indexed by [`Path`].
///
/// Empty inner nodes are permitted: an `Object` or `Instance` node may exist
/// with no children while a sibling path is still being built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree<L> {
    roots: BTreeMap<u16, TreeNode<L>>,
}

impl<L> Default for Tree<L> {
    fn default() -> Self {
        Self { roots: BTreeMap::new() }
    }
}

impl<L: Clone> Tree<L> {
    #[must_use]
    pub fn new() -> Self {
        Self { roots: BTreeMap::new() }
    }

    /// Insert `leaf` at `path`, creating intermediate Object/Instance/Resource
    /// nodes as needed.
    pub fn insert(&mut self, path: Path, leaf: L) {
        let object = path.object_id();
        let root = self
            .roots
            .entry(object.value() as u16)
            .or_insert_with(|| TreeNode::Object { id: object, children: BTreeMap::new() });

        let Some(instance) = path.instance_id() else {
            return;
        };

        let TreeNode::Object { children, .. } = root else { unreachable!() };
        let instance_node = children
            .entry(instance.value() as u16)
            .or_insert_with(|| TreeNode::Instance { id: instance, children: BTreeMap::new() });

        let Some(resource) = path.resource_id() else {
            return;
        };

        let TreeNode::Instance { children, .. } = instance_node else { unreachable!() };

        match path.resource_instance_id() {
            None => {
                children.insert(
                    resource.value() as u16,
                    TreeNode::Resource { id: resource, leaf: Some(leaf), children: BTreeMap::new() },
                );
            }
            Some(ri) => {
                let resource_node = children.entry(resource.value() as u16).or_insert_with(|| {
                    TreeNode::Resource { id: resource, leaf: None, children: BTreeMap::new() }
                });
                let TreeNode::Resource { children, .. } = resource_node else { unreachable!() };
                children.insert(ri.value() as u16, TreeNode::ResourceInstance { id: ri, value: leaf });
            }
        }
    }

    /// Number of leaves (Resource nodes carrying a direct leaf, plus
    /// ResourceInstance nodes) in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Flatten the tree into `(Path, &L)` pairs, in ascending path order.
    #[must_use]
    pub fn leaves(&self) -> Vec<(Path, &L)> {
        let mut out = Vec::new();
        for root in self.roots.values() {
            if let TreeNode::Object { id: oid, children } = root {
                walk_object(*oid, children, &mut out);
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

fn walk_object<'a, L>(
    oid: ObjectId,
    children: &'a BTreeMap<u16, TreeNode<L>>,
    out: &mut Vec<(Path, &'a L)>,
) {
    for node in children.values() {
        if let TreeNode::Instance { id: iid, children } = node {
            for node in children.values() {
                if let TreeNode::Resource { id: rid, leaf, children } = node {
                    if let Some(leaf) = leaf {
                        if let Ok(path) = Path::new(oid, Some(*iid), Some(*rid), None) {
                            out.push((path, leaf));
                        }
                    }
                    for node in children.values() {
                        if let TreeNode::ResourceInstance { id: ri, value } = node {
                            if let Ok(path) = Path::new(oid, Some(*iid), Some(*rid), Some(*ri)) {
                                out.push((path, value));
                            }
                        }
                    }
                }
            }
        }
    }
}
