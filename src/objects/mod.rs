//! Static scene builders: bridge, banks, river layers, vegetation and the
//! districts on either side.
//!
//! Builders return plain [`SceneNode`] trees. Small parts that share a
//! material are merged into one mesh through [`Batch`] so the renderer sees a
//! few hundred draws instead of tens of thousands.

mod bazaar;
mod bridge;
mod river;
mod rocks;
mod square;
mod terrain;
mod trees;

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::params::WaterParams;
use crate::scene::{Geometry, Material, NodeId, SceneGraph, SceneNode, Transform};

pub use bridge::{deck_height, ArchKind, BridgeLayout, PierKind};
pub use river::river;
pub use trees::sway_trees;

/// Top-level group names
pub const TERRAIN: &str = "Terrain";
pub const WATER: &str = "Water";
pub const BRIDGE: &str = "StoneBridge";
pub const ROCKS: &str = "Rocks";
pub const TREES: &str = "Trees";
pub const SQUARE: &str = "MacedoniaSquare";
pub const BAZAAR: &str = "OldBazaar";

/// The assembled scene plus handles the frame loop animates
pub struct Diorama {
    pub scene: SceneGraph,
    pub trees: NodeId,
}

/// Build every static part of the scene. The same seed always yields the same
/// scatter and shading.
pub fn build_diorama(water: &WaterParams, seed: u64) -> Diorama {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = SceneGraph::new();

    scene.insert(None, terrain::terrain(&mut rng));
    scene.insert(None, river(water));
    scene.insert(None, bridge::bridge(&mut rng));
    scene.insert(None, rocks::rocks(&mut rng));
    let trees = scene.insert(None, trees::trees(&mut rng));
    scene.insert(None, square::macedonia_square(&mut rng));
    scene.insert(None, bazaar::old_bazaar(&mut rng));

    let meshes = scene.mesh_nodes().count();
    let triangles: usize = scene
        .mesh_nodes()
        .map(|(_, mesh)| mesh.geometry.triangle_count())
        .sum();
    log::info!(
        "Built diorama: {} nodes, {} meshes, {} triangles",
        scene.len(),
        meshes,
        triangles
    );

    Diorama { scene, trees }
}

/// Uniform jitter in [-spread/2, spread/2)
fn jitter(rng: &mut StdRng, spread: f32) -> f32 {
    (rng.gen::<f32>() - 0.5) * spread
}

/// Lay an XY-plane primitive flat (facing +Y) at a position
fn flat_at(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_xyz(x, y, z).with_rotation(Quat::from_rotation_x(-FRAC_PI_2))
}

/// Parts sharing one material, merged into a single mesh
pub(crate) struct Batch {
    name: String,
    material: Material,
    geometry: Geometry,
}

impl Batch {
    pub fn new(name: impl Into<String>, material: Material) -> Self {
        Self {
            name: name.into(),
            material,
            geometry: Geometry::default(),
        }
    }

    pub fn add(&mut self, geometry: Geometry, transform: Transform) {
        self.geometry
            .merge(&geometry.transformed(transform.matrix()));
    }

    pub fn add_at(&mut self, geometry: Geometry, position: Vec3) {
        self.add(geometry, Transform::from_translation(position));
    }

    pub fn into_node(self) -> SceneNode {
        SceneNode::mesh(self.name, self.geometry, self.material)
    }
}

/// A material in a few random tints; each part lands in one of them so
/// masonry doesn't read as a single flat color
pub(crate) struct ShadedBatch {
    batches: Vec<Batch>,
}

impl ShadedBatch {
    pub fn new(name: &str, material: Material, shades: usize, spread: f32, rng: &mut StdRng) -> Self {
        let batches = (0..shades.max(1))
            .map(|i| {
                let mut shade = material.clone();
                let v = jitter(rng, spread);
                shade.color = (shade.color + Vec3::splat(v)).max(Vec3::ZERO);
                Batch::new(format!("{name}_{i}"), shade)
            })
            .collect();
        Self { batches }
    }

    pub fn add(&mut self, rng: &mut StdRng, geometry: Geometry, transform: Transform) {
        let i = rng.gen_range(0..self.batches.len());
        self.batches[i].add(geometry, transform);
    }

    pub fn into_nodes(self) -> impl Iterator<Item = SceneNode> {
        self.batches
            .into_iter()
            .filter(|batch| batch.geometry.vertex_count() > 0)
            .map(Batch::into_node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::water::WATER_SURFACE_NAME;

    #[test]
    fn test_diorama_layout() {
        let params = WaterParams::default().with_segments(20);
        let diorama = build_diorama(&params, 7);
        let scene = &diorama.scene;

        for name in [TERRAIN, WATER, BRIDGE, ROCKS, TREES, SQUARE, BAZAAR] {
            assert!(scene.find_by_name(name).is_some(), "missing {name}");
        }
        let surface = scene.mesh_by_name(WATER_SURFACE_NAME).unwrap();
        assert_eq!(surface.geometry.vertex_count(), params.vertex_count());
        assert_eq!(scene.node(diorama.trees).name, TREES);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let params = WaterParams::default().with_segments(4);
        let a = build_diorama(&params, 11);
        let b = build_diorama(&params, 11);
        let positions = |d: &Diorama, name: &str| {
            d.scene
                .mesh_by_name(name)
                .map(|m| m.geometry.positions.clone())
                .unwrap_or_default()
        };
        assert_eq!(positions(&a, "Rocks_Boulders"), positions(&b, "Rocks_Boulders"));
        assert!(!positions(&a, "Rocks_Boulders").is_empty());
    }

    #[test]
    fn test_shaded_batch_drops_empty_shades() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut batch = ShadedBatch::new("Blocks", Material::standard(0x706860, 0.9), 4, 0.05, &mut rng);
        batch.add(&mut rng, Geometry::cuboid(1.0, 1.0, 1.0), Transform::IDENTITY);
        let nodes: Vec<SceneNode> = batch.into_nodes().collect();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].name.starts_with("Blocks_"));
    }
}
