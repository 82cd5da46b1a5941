//! City trees along the embankments and near the buildings, plus their sway.

use glam::{Quat, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::Rng;

use super::{jitter, Batch, TREES};
use crate::scene::{Geometry, Material, NodeId, SceneGraph, SceneNode, TextureKind, Transform};

const LEAF_COLORS: [u32; 4] = [0x2A5518, 0x336622, 0x2E5E1C, 0x3A7028];

const SCATTERED: [(f32, f32); 6] = [
    (-60.0, 30.0),
    (-70.0, -20.0),
    (65.0, 25.0),
    (70.0, -30.0),
    (-55.0, -45.0),
    (75.0, 0.0),
];

/// Sway amplitude (radians)
const SWAY: f32 = 0.01;

pub fn trees(rng: &mut StdRng) -> SceneNode {
    let mut placements = Vec::new();
    for (x, base_scale) in [(-45.0, 0.9), (45.0, 0.8)] {
        for z in (-60..=60).step_by(12) {
            let scale = base_scale + rng.gen::<f32>() * 0.3;
            placements.push((Vec3::new(x, 2.0, z as f32), scale));
        }
    }
    for (x, z) in SCATTERED {
        let scale = 0.7 + rng.gen::<f32>() * 0.5;
        placements.push((Vec3::new(x, 2.0, z), scale));
    }

    let mut group = SceneNode::group(TREES);
    for (i, (position, scale)) in placements.into_iter().enumerate() {
        group.add(city_tree(rng, format!("Tree_{i}"), scale).at(Transform::from_translation(position)));
    }
    group
}

/// Tapered trunk under five overlapping faceted leaf clumps
pub(super) fn city_tree(rng: &mut StdRng, name: String, scale: f32) -> SceneNode {
    let trunk = SceneNode::mesh(
        "Trunk",
        Geometry::cylinder(0.2 * scale, 0.35 * scale, 5.0 * scale, 6),
        Material::standard(0x4A3018, 0.92).with_texture(TextureKind::Wood, Vec2::new(1.0, 2.0)),
    )
    .at(Transform::from_xyz(0.0, 2.5 * scale, 0.0));

    let mut canopies: Vec<Batch> = LEAF_COLORS
        .iter()
        .enumerate()
        .map(|(i, &color)| Batch::new(format!("Leaves_{i}"), Material::standard(color, 0.85)))
        .collect();
    for _ in 0..5 {
        let radius = (1.5 + rng.gen::<f32>()) * scale;
        let position = Vec3::new(
            jitter(rng, 2.0) * scale,
            (5.0 + rng.gen::<f32>() * 2.0) * scale,
            jitter(rng, 2.0) * scale,
        );
        let shade = rng.gen_range(0..canopies.len());
        canopies[shade].add_at(Geometry::sphere(radius, 7, 6).flat_shaded(), position);
    }

    let mut tree = SceneNode::group(name).with_child(trunk);
    for canopy in canopies {
        let node = canopy.into_node();
        if node.mesh.as_ref().is_some_and(|m| m.geometry.vertex_count() > 0) {
            tree.add(node);
        }
    }
    tree
}

/// Rock every tree gently about Z, each with its own phase
pub fn sway_trees(scene: &mut SceneGraph, trees: NodeId, elapsed: f32) {
    let children = scene.node(trees).children().to_vec();
    for (i, child) in children.into_iter().enumerate() {
        let angle = (elapsed * 0.3 + i as f32 * 0.5).sin() * SWAY;
        scene.node_mut(child).transform.rotation = Quat::from_rotation_z(angle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_tree_count_and_placement() {
        let mut rng = StdRng::seed_from_u64(9);
        let trees = trees(&mut rng);
        assert_eq!(trees.children.len(), 28);
        assert!(trees
            .children
            .iter()
            .all(|t| t.transform.translation.y == 2.0));
        // Each tree has a trunk and at least one canopy
        assert!(trees.children.iter().all(|t| t.children.len() >= 2));
    }

    #[test]
    fn test_sway_phase_and_amplitude() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut scene = SceneGraph::new();
        let id = scene.insert(None, trees(&mut rng));
        sway_trees(&mut scene, id, 2.0);

        let kids = scene.node(id).children().to_vec();
        let angle = |n: NodeId| scene.node(n).transform.rotation.to_euler(glam::EulerRot::XYZ).2;
        assert!((angle(kids[0]) - (0.6_f32).sin() * SWAY).abs() < 1e-6);
        assert!((angle(kids[3]) - (0.6_f32 + 1.5).sin() * SWAY).abs() < 1e-6);
        assert!(kids.iter().all(|&k| angle(k).abs() <= SWAY + 1e-6));
    }
}
