//! Scene graph: named nodes with transforms and optional meshes.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Builders assemble
//! plain [`SceneNode`] trees which are then inserted under a parent; lookups
//! by name walk the tree depth-first in insertion order, so the first match
//! wins.

mod geometry;
mod material;

use glam::{Mat4, Quat, Vec3};

pub use geometry::{Geometry, Vertex};
pub use material::{Material, MaterialKind, TextureKind, WaterMaterial};

/// Local transform relative to the parent node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self::from_translation(Vec3::new(x, y, z))
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Renderable geometry plus its material
#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Material,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self { geometry, material }
    }
}

/// Owned node tree produced by the object builders
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self {
            name: name.into(),
            mesh: Some(Mesh::new(geometry, material)),
            ..Default::default()
        }
    }

    pub fn at(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn add(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Total node count of this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena entry
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Insert a node tree, returning the id of its root
    pub fn insert(&mut self, parent: Option<NodeId>, tree: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: tree.name,
            transform: tree.transform,
            mesh: tree.mesh,
            visible: true,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        for child in tree.children {
            self.insert(Some(id), child);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// First node with this name, depth-first from the roots
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .find_map(|&root| self.find_in(root, name))
    }

    /// First node with this name inside the subtree rooted at `root`
    pub fn find_in(&self, root: NodeId, name: &str) -> Option<NodeId> {
        let node = &self.nodes[root.0];
        if node.name == name {
            return Some(root);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_in(child, name))
    }

    pub fn mesh_by_name_mut(&mut self, name: &str) -> Option<&mut Mesh> {
        let id = self.find_by_name(name)?;
        self.nodes[id.0].mesh.as_mut()
    }

    pub fn mesh_by_name(&self, name: &str) -> Option<&Mesh> {
        let id = self.find_by_name(name)?;
        self.nodes[id.0].mesh.as_ref()
    }

    /// Model matrix composed from the root down to this node
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let node = &self.nodes[id.0];
        let local = node.transform.matrix();
        match node.parent {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    /// Visible mesh nodes in depth-first order with their world matrices.
    /// Hidden nodes hide their whole subtree.
    pub fn visible_meshes(&self) -> Vec<(NodeId, Mat4)> {
        let mut out = Vec::new();
        for &root in &self.roots {
            self.collect_visible(root, Mat4::IDENTITY, &mut out);
        }
        out
    }

    fn collect_visible(&self, id: NodeId, parent_world: Mat4, out: &mut Vec<(NodeId, Mat4)>) {
        let node = &self.nodes[id.0];
        if !node.visible {
            return;
        }
        let world = parent_world * node.transform.matrix();
        if node.mesh.is_some() {
            out.push((id, world));
        }
        for &child in &node.children {
            self.collect_visible(child, world, out);
        }
    }

    /// Every node carrying a mesh, in arena order
    pub fn mesh_nodes(&self) -> impl Iterator<Item = (NodeId, &Mesh)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.mesh.as_ref().map(|mesh| (NodeId(i), mesh)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> SceneNode {
        SceneNode::group("Water")
            .at(Transform::from_xyz(0.0, 1.0, 0.0))
            .with_child(SceneNode::mesh(
                "Bed",
                Geometry::plane(1.0, 1.0, 1, 1),
                Material::standard(0x020810, 1.0),
            ))
            .with_child(
                SceneNode::mesh(
                    "WaterSurface",
                    Geometry::plane(1.0, 1.0, 2, 2),
                    Material::water(0x0B3D6B, 0.92),
                )
                .at(Transform::from_xyz(2.0, 0.0, 0.0)),
            )
    }

    #[test]
    fn test_insert_and_find() {
        let mut scene = SceneGraph::new();
        let root = scene.insert(None, sample_tree());
        assert_eq!(scene.len(), 3);

        let surface = scene.find_by_name("WaterSurface").unwrap();
        assert_eq!(scene.node(surface).parent(), Some(root));
        assert_eq!(scene.find_in(root, "Bed").map(|id| scene.node(id).name.clone()), Some("Bed".into()));
        assert!(scene.find_by_name("Missing").is_none());
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut scene = SceneGraph::new();
        scene.insert(None, sample_tree());
        let surface = scene.find_by_name("WaterSurface").unwrap();
        let origin = scene.world_matrix(surface).transform_point3(Vec3::ZERO);
        assert_eq!(origin, Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_hidden_subtree_is_skipped() {
        let mut scene = SceneGraph::new();
        let root = scene.insert(None, sample_tree());
        assert_eq!(scene.visible_meshes().len(), 2);

        scene.node_mut(root).visible = false;
        assert!(scene.visible_meshes().is_empty());
        // Hidden meshes are still reachable by name
        assert!(scene.mesh_by_name("WaterSurface").is_some());
    }

    #[test]
    fn test_subtree_node_count() {
        assert_eq!(sample_tree().node_count(), 3);
    }
}
