//! Boulders scattered along the foot of both embankments.

use glam::{EulerRot, Quat, Vec3};
use rand::rngs::StdRng;
use rand::Rng;

use super::{jitter, Batch, ROCKS};
use crate::scene::{Geometry, Material, SceneNode, Transform};

const ROCK_COUNT: usize = 20;

pub fn rocks(rng: &mut StdRng) -> SceneNode {
    let mut boulders = Batch::new("Rocks_Boulders", Material::standard(0x6A6A6A, 0.92));

    for _ in 0..ROCK_COUNT {
        let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let radius = 0.3 + rng.gen::<f32>() * 0.5;
        let position = Vec3::new(
            side * (38.0 + rng.gen::<f32>() * 5.0),
            -1.0 + rng.gen::<f32>() * 2.0,
            jitter(rng, 100.0),
        );
        let rotation = Quat::from_euler(EulerRot::XYZ, rng.gen(), rng.gen(), rng.gen());
        let rock = Geometry::rock(radius, rng);
        boulders.add(rock, Transform::from_translation(position).with_rotation(rotation));
    }

    SceneNode::group(ROCKS).with_child(boulders.into_node())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_rocks_hug_the_banks() {
        let mut rng = StdRng::seed_from_u64(2);
        let rocks = rocks(&mut rng);
        let mesh = rocks.children[0].mesh.as_ref().unwrap();
        assert!(!mesh.geometry.positions.is_empty());
        // Rock radius tops out near 0.92 after jitter
        assert!(mesh
            .geometry
            .positions
            .iter()
            .all(|p| p[0].abs() > 36.5 && p[0].abs() < 44.5 && p[2].abs() < 51.0));
    }
}
