//! Banks, embankment walls, the riverbed and the distant landscape.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::Rng;

use super::{flat_at, jitter, Batch, ShadedBatch, TERRAIN};
use crate::scene::{Geometry, Material, SceneNode, TextureKind, Transform};

const RIVER_WIDTH: f32 = 80.0;
const BANK_HEIGHT: f32 = 2.0;
const CITY_LENGTH: f32 = 300.0;

pub fn terrain(rng: &mut StdRng) -> SceneNode {
    SceneNode::group(TERRAIN)
        .with_child(urban_ground(rng, -1.0, "SouthBank", 0x9A9080))
        .with_child(urban_ground(rng, 1.0, "NorthBank", 0x8A8070))
        .with_child(embankments(rng))
        .with_child(riverbed(rng))
        .with_child(background(rng))
}

/// Paved ground beside the river with a few grass patches
fn urban_ground(rng: &mut StdRng, side: f32, name: &str, color: u32) -> SceneNode {
    let x = side * (RIVER_WIDTH / 2.0 + 60.0);
    let ground = SceneNode::mesh(
        format!("{name}_Ground"),
        Geometry::plane(120.0, CITY_LENGTH, 10, 10),
        Material::standard(color, 0.95),
    )
    .at(flat_at(x, BANK_HEIGHT, 0.0));

    let mut grass = Batch::new(
        format!("{name}_Grass"),
        Material::standard(0xFFFFFF, 0.9).with_texture(TextureKind::Grass, Vec2::splat(10.0)),
    );
    for _ in 0..5 {
        let (w, h) = (10.0 + rng.gen::<f32>() * 20.0, 10.0 + rng.gen::<f32>() * 20.0);
        let position = Vec3::new(x + jitter(rng, 80.0), BANK_HEIGHT + 0.05, jitter(rng, 200.0));
        grass.add(Geometry::plane(w, h, 1, 1), flat_at(position.x, position.y, position.z));
    }

    SceneNode::group(name)
        .with_child(ground)
        .with_child(grass.into_node())
}

/// Retaining walls at the river edges faced with rough stone blocks
fn embankments(rng: &mut StdRng) -> SceneNode {
    let wall = Material::standard(0x6A6050, 0.9);
    let mut walls = Batch::new("EmbankmentWalls", wall.clone());
    for side in [-1.0, 1.0] {
        walls.add_at(
            Geometry::cuboid(3.0, BANK_HEIGHT + 4.0, CITY_LENGTH),
            Vec3::new(side * RIVER_WIDTH / 2.0, 0.0, 0.0),
        );
    }

    let mut blocks = ShadedBatch::new("EmbankmentBlocks", wall, 5, 0.06, rng);
    let mut z = -CITY_LENGTH / 2.0;
    while z < CITY_LENGTH / 2.0 {
        for side in [-1.0, 1.0] {
            let height = 1.0 + rng.gen::<f32>() * 0.5;
            let depth = 1.5 + rng.gen::<f32>() * 0.5;
            let y = -1.0 + rng.gen::<f32>() * 4.0;
            blocks.add(
                rng,
                Geometry::cuboid(0.3, height, depth),
                Transform::from_xyz(side * (RIVER_WIDTH / 2.0 + 1.7), y, z),
            );
        }
        z += 2.0;
    }

    let mut group = SceneNode::group("Embankments").with_child(walls.into_node());
    blocks.into_nodes().for_each(|node| group.add(node));
    group
}

/// Bumpy flat-shaded river floor under the water layers
fn riverbed(rng: &mut StdRng) -> SceneNode {
    let mut bed = Geometry::plane(RIVER_WIDTH, CITY_LENGTH, 20, 20);
    for p in &mut bed.positions {
        p[2] = jitter(rng, 0.5);
    }
    SceneNode::mesh("RiverBed", bed.flat_shaded(), Material::standard(0x3A3828, 1.0))
        .at(flat_at(0.0, -4.0, 0.0))
}

/// sRGB hex from hue, saturation and lightness, all in [0, 1]
fn hsl_hex(h: f32, s: f32, l: f32) -> u32 {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h * 6.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let byte = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u32;
    (byte(r) << 16) | (byte(g) << 8) | byte(b)
}

/// Far ground plane and a ring of low-poly mountains to the south
fn background(rng: &mut StdRng) -> SceneNode {
    let far = SceneNode::mesh(
        "FarGround",
        Geometry::plane(800.0, 800.0, 1, 1),
        Material::standard(0x6A7A5A, 1.0),
    )
    .at(flat_at(0.0, 1.5, 0.0));

    let mut group = SceneNode::group("Background").with_child(far);
    for i in 0..6 {
        let radius = 40.0 + rng.gen::<f32>() * 60.0;
        let height = 30.0 + rng.gen::<f32>() * 40.0;
        let color = hsl_hex(0.3, 0.25, 0.25 + rng.gen::<f32>() * 0.1);
        let angle = i as f32 / 6.0 * PI + PI * 0.8;
        let x = angle.cos() * (200.0 + rng.gen::<f32>() * 100.0);
        let z = angle.sin() * (200.0 + rng.gen::<f32>() * 100.0);

        group.add(
            SceneNode::mesh(
                format!("Mountain_{i}"),
                Geometry::cone(radius, height, 6).flat_shaded(),
                Material::standard(color, 0.95),
            )
            .at(Transform::from_xyz(x, 15.0, z)),
        );
    }
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::srgb_hex;
    use rand::SeedableRng;

    #[test]
    fn test_hsl_hex() {
        assert_eq!(hsl_hex(0.0, 1.0, 0.5), 0xFF0000);
        assert_eq!(hsl_hex(1.0 / 3.0, 1.0, 0.5), 0x00FF00);
        assert_eq!(hsl_hex(0.5, 0.0, 0.5), 0x808080);
        // Mountain green stays green-dominant
        let c = srgb_hex(hsl_hex(0.3, 0.25, 0.3));
        assert!(c.y > c.x && c.y > c.z);
    }

    #[test]
    fn test_riverbed_stays_near_its_plane() {
        let mut rng = StdRng::seed_from_u64(5);
        let bed = riverbed(&mut rng);
        let mesh = bed.mesh.as_ref().unwrap();
        assert!(mesh.geometry.positions.iter().all(|p| p[2].abs() <= 0.25));
        // Flat shading unshares every corner
        assert_eq!(mesh.geometry.vertex_count(), mesh.geometry.indices.len());
    }

    #[test]
    fn test_terrain_groups() {
        let mut rng = StdRng::seed_from_u64(5);
        let terrain = terrain(&mut rng);
        let names: Vec<&str> = terrain.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["SouthBank", "NorthBank", "Embankments", "RiverBed", "Background"]
        );
        // Far ground plus six mountains
        assert_eq!(terrain.children[4].children.len(), 7);
    }
}
