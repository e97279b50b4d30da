//! Scene graph with side tables for per-node flags and click ownership.
//!
//! Nodes form a tree of named entries. Flags the viewer needs while picking
//! (clickable, frustum, image plane, ground) live in a side table keyed by
//! [`NodeId`] rather than on the nodes themselves. The clickable-owner table
//! maps every descendant of a clickable node back to that node; it is filled
//! in when the subtree is built, so picking never walks parent links.

use std::collections::{BTreeMap, HashMap};

use glam::Vec3;
use posescope_core::{PosescopeError, Result};
use posescope_structures::{union_bounds, FrustumView, MeshModel};

/// Identifier of a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Raw numeric id, as carried in pick results.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// What a node holds.
#[derive(Debug, Clone)]
pub enum NodeContent {
    /// Container for other nodes.
    Group,
    /// A placed mesh.
    Mesh(MeshModel),
    /// A frustum proxy; owns the frustum camera and image plane data.
    Frustum(FrustumView),
    /// The renderer camera of a frustum, a sibling of the proxy.
    FrustumCamera { proxy: NodeId },
    /// The image plane child of a frustum camera.
    ImagePlane { proxy: NodeId },
    /// Reference grid drawn just above the ground.
    Grid { height: f32 },
}

/// Flags attached to a node through the side table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeMeta {
    /// Double-clicking the node (or a descendant) targets it.
    pub clickable: bool,
    pub frustum: bool,
    /// Excluded from mesh picking.
    pub image_plane: bool,
    /// Excluded from hover highlighting.
    pub ground: bool,
}

/// One node of the scene tree.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub content: NodeContent,
}

/// The scene tree.
#[derive(Debug, Default)]
pub struct SceneGraph {
    next_id: u64,
    nodes: BTreeMap<NodeId, SceneNode>,
    meta: HashMap<NodeId, NodeMeta>,
    owners: HashMap<NodeId, NodeId>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a top-level node.
    pub fn add_root(&mut self, name: impl Into<String>, content: NodeContent) -> NodeId {
        self.insert(name.into(), None, content)
    }

    /// Adds a node under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        content: NodeContent,
    ) -> Result<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return Err(PosescopeError::InvalidMetadata(format!(
                "parent node {} does not exist",
                parent.0
            )));
        }
        let id = self.insert(name.into(), Some(parent), content);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        // Children inherit the clickable owner of their parent.
        if let Some(owner) = self.clickable_owner(parent) {
            self.owners.insert(id, owner);
        }
        Ok(id)
    }

    fn insert(&mut self, name: String, parent: Option<NodeId>, content: NodeContent) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(
            id,
            SceneNode {
                name,
                parent,
                children: Vec::new(),
                content,
            },
        );
        id
    }

    /// Removes a node and its whole subtree. Returns the number of nodes
    /// removed.
    pub fn remove(&mut self, id: NodeId) -> usize {
        let Some(node) = self.nodes.get(&id) else {
            return 0;
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|&c| c != id);
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
                self.meta.remove(&next);
                self.owners.remove(&next);
                removed += 1;
            }
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    /// All nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(&id, node)| (id, node))
    }

    /// Top-level nodes in creation order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(&id, _)| id)
    }

    /// Node ids of the subtree rooted at `id`, including `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                out.push(next);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    #[must_use]
    pub fn mesh(&self, id: NodeId) -> Option<&MeshModel> {
        match &self.nodes.get(&id)?.content {
            NodeContent::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self, id: NodeId) -> Option<&mut MeshModel> {
        match &mut self.nodes.get_mut(&id)?.content {
            NodeContent::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    #[must_use]
    pub fn frustum(&self, id: NodeId) -> Option<&FrustumView> {
        match &self.nodes.get(&id)?.content {
            NodeContent::Frustum(frustum) => Some(frustum),
            _ => None,
        }
    }

    pub fn frustum_mut(&mut self, id: NodeId) -> Option<&mut FrustumView> {
        match &mut self.nodes.get_mut(&id)?.content {
            NodeContent::Frustum(frustum) => Some(frustum),
            _ => None,
        }
    }

    /// Ids of all mesh nodes.
    pub fn mesh_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node.content, NodeContent::Mesh(_)))
            .map(|(&id, _)| id)
    }

    /// Flags of a node; unset flags read as all-false.
    #[must_use]
    pub fn meta(&self, id: NodeId) -> NodeMeta {
        self.meta.get(&id).copied().unwrap_or_default()
    }

    /// Sets the flags of a node. Marking a node clickable also makes it the
    /// clickable owner of its existing descendants.
    pub fn set_meta(&mut self, id: NodeId, meta: NodeMeta) {
        if !self.nodes.contains_key(&id) {
            return;
        }
        self.meta.insert(id, meta);
        if meta.clickable {
            for child in self.descendants(id).into_iter().skip(1) {
                self.owners.insert(child, id);
            }
        }
    }

    /// Records that clicks on `node` should resolve to `owner`.
    pub fn set_clickable_owner(&mut self, node: NodeId, owner: NodeId) {
        if self.nodes.contains_key(&node) && self.nodes.contains_key(&owner) {
            self.owners.insert(node, owner);
        }
    }

    /// The clickable node responsible for `id`: the node itself when it is
    /// clickable, otherwise the owner recorded for it.
    #[must_use]
    pub fn clickable_owner(&self, id: NodeId) -> Option<NodeId> {
        if self.meta(id).clickable {
            return Some(id);
        }
        self.owners.get(&id).copied()
    }

    /// World bounds of every mesh in the subtree rooted at `id`.
    #[must_use]
    pub fn subtree_bounds(&self, id: NodeId) -> Option<(Vec3, Vec3)> {
        union_bounds(
            self.descendants(id)
                .into_iter()
                .filter_map(|node| self.mesh(node)?.world_bounds()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posescope_structures::MeshGeometry;

    fn mesh(name: &str, vertices: Vec<Vec3>) -> NodeContent {
        NodeContent::Mesh(MeshModel::new(name, "mesh.glb", MeshGeometry::new(vertices, Vec::new())))
    }

    #[test]
    fn test_remove_subtree_clears_side_tables() {
        let mut scene = SceneGraph::new();
        let group = scene.add_root("group", NodeContent::Group);
        let child = scene.add_child(group, "child", NodeContent::Group).unwrap();
        let leaf = scene.add_child(child, "leaf", NodeContent::Group).unwrap();
        scene.set_meta(group, NodeMeta { clickable: true, ..NodeMeta::default() });
        assert_eq!(scene.clickable_owner(leaf), Some(group));

        assert_eq!(scene.remove(group), 3);
        assert!(scene.is_empty());
        assert_eq!(scene.clickable_owner(leaf), None);
        assert_eq!(scene.meta(group), NodeMeta::default());
    }

    #[test]
    fn test_children_inherit_owner() {
        let mut scene = SceneGraph::new();
        let proxy = scene.add_root("proxy", NodeContent::Group);
        scene.set_meta(proxy, NodeMeta { clickable: true, frustum: true, ..NodeMeta::default() });
        let child = scene.add_child(proxy, "child", NodeContent::Group).unwrap();
        assert_eq!(scene.clickable_owner(child), Some(proxy));
        assert_eq!(scene.clickable_owner(proxy), Some(proxy));

        let loose = scene.add_root("loose", NodeContent::Group);
        assert_eq!(scene.clickable_owner(loose), None);
        scene.set_clickable_owner(loose, proxy);
        assert_eq!(scene.clickable_owner(loose), Some(proxy));
    }

    #[test]
    fn test_remove_detaches_from_parent() {
        let mut scene = SceneGraph::new();
        let root = scene.add_root("root", NodeContent::Group);
        let a = scene.add_child(root, "a", NodeContent::Group).unwrap();
        let b = scene.add_child(root, "b", NodeContent::Group).unwrap();
        scene.remove(a);
        assert_eq!(scene.get(root).unwrap().children, vec![b]);
    }

    #[test]
    fn test_add_child_to_missing_parent_fails() {
        let mut scene = SceneGraph::new();
        assert!(scene.add_child(NodeId::from_raw(42), "x", NodeContent::Group).is_err());
    }

    #[test]
    fn test_subtree_bounds() {
        let mut scene = SceneGraph::new();
        let group = scene.add_root("group", NodeContent::Group);
        scene.add_child(group, "a", mesh("a", vec![Vec3::ZERO, Vec3::ONE])).unwrap();
        scene
            .add_child(group, "b", mesh("b", vec![Vec3::splat(-2.0), Vec3::ZERO]))
            .unwrap();
        let (lo, hi) = scene.subtree_bounds(group).unwrap();
        assert_eq!(lo, Vec3::splat(-2.0));
        assert_eq!(hi, Vec3::ONE);
        assert_eq!(scene.mesh_ids().count(), 2);
    }
}
