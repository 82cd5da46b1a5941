//! Macedonia Square on the south bank: plaza, the warrior monument,
//! neoclassical facades, the triumphal gate and street furniture.
//!
//! Everything is built in square-local coordinates; the group sits at
//! x = [`SQUARE_X`].

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Quat, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::Rng;

use super::trees::city_tree;
use super::{flat_at, Batch, SQUARE};
use crate::scene::{Geometry, Material, SceneNode, Transform};

pub const SQUARE_X: f32 = -80.0;

const PLAZA_Y: f32 = 2.1;

pub fn macedonia_square(rng: &mut StdRng) -> SceneNode {
    SceneNode::group(SQUARE)
        .at(Transform::from_xyz(SQUARE_X, 0.0, 0.0))
        .with_child(plaza())
        .with_child(monument())
        .with_child(buildings(rng))
        .with_child(porta_macedonia())
        .with_child(street_furniture())
        .with_child(square_trees(rng))
}

fn plaza() -> SceneNode {
    SceneNode::group("Plaza")
        .with_child(
            SceneNode::mesh(
                "Paving",
                Geometry::plane(100.0, 100.0, 1, 1),
                Material::standard(0xC8C0B0, 0.7),
            )
            .at(flat_at(0.0, PLAZA_Y, 0.0)),
        )
        .with_child(
            SceneNode::mesh(
                "Circle",
                Geometry::disc(20.0, 32),
                Material::standard(0xD8D0C0, 0.6),
            )
            .at(flat_at(0.0, PLAZA_Y + 0.05, 0.0)),
        )
        .with_child(
            SceneNode::mesh(
                "InnerRing",
                Geometry::ring(12.0, 13.0, 32),
                Material::standard(0xA09888, 0.7),
            )
            .at(flat_at(0.0, PLAZA_Y + 0.08, 0.0)),
        )
}

/// Fountain basin, banded column and a rearing bronze horse with rider
fn monument() -> SceneNode {
    let mut basin = Batch::new("Basin", Material::standard(0xB8B0A0, 0.5));
    basin.add_at(Geometry::cylinder(10.0, 11.0, 2.0, 24), Vec3::new(0.0, 3.0, 0.0));

    let fountain = SceneNode::mesh(
        "FountainWater",
        Geometry::cylinder(9.0, 9.0, 0.3, 24),
        Material::standard(0x3A7A8A, 0.1).with_opacity(0.7),
    )
    .at(Transform::from_xyz(0.0, 3.8, 0.0));

    let mut column = Batch::new("Pedestal", Material::standard(0xD0C8B8, 0.4));
    column.add_at(Geometry::cylinder(3.0, 3.5, 18.0, 12), Vec3::new(0.0, 13.0, 0.0));
    for y in (6..=20).step_by(4) {
        column.add(
            Geometry::torus(3.2, 0.3, 8, 16, TAU),
            Transform::from_xyz(0.0, y as f32, 0.0).with_rotation(Quat::from_rotation_x(FRAC_PI_2)),
        );
    }

    let mut bronze = Batch::new("HorseAndRider", Material::standard(0xC8A050, 0.35));
    bronze.add_at(Geometry::cuboid(2.5, 2.5, 5.0), Vec3::new(0.0, 23.5, 0.0));
    bronze.add(
        Geometry::cylinder(0.6, 0.8, 3.0, 6),
        Transform::from_xyz(0.0, 25.0, 2.5).with_rotation(Quat::from_rotation_x(-0.5)),
    );
    bronze.add_at(Geometry::cuboid(0.8, 1.2, 1.5), Vec3::new(0.0, 26.5, 3.5));
    for (i, (x, z)) in [(-0.8, -1.5), (0.8, -1.5), (-0.8, 1.5), (0.8, 1.5)].into_iter().enumerate() {
        let leg = Geometry::cylinder(0.25, 0.3, 3.0, 5);
        // Front legs rear up
        if i >= 2 {
            bronze.add(
                leg,
                Transform::from_xyz(x, 22.5, z).with_rotation(Quat::from_rotation_x(0.4)),
            );
        } else {
            bronze.add_at(leg, Vec3::new(x, 22.0, z));
        }
    }
    bronze.add_at(Geometry::cylinder(0.5, 0.6, 2.5, 6), Vec3::new(0.0, 25.5, 0.0));
    bronze.add(
        Geometry::cylinder(0.06, 0.06, 4.0, 4),
        Transform::from_xyz(0.8, 28.0, 0.0).with_rotation(Quat::from_rotation_z(0.3)),
    );
    bronze.add(
        Geometry::cylinder(0.15, 0.08, 2.5, 4),
        Transform::from_xyz(0.0, 23.5, -3.5).with_rotation(Quat::from_rotation_x(0.5)),
    );

    SceneNode::group("WarriorMonument")
        .with_child(basin.into_node())
        .with_child(fountain)
        .with_child(column.into_node())
        .with_child(bronze.into_node())
}

/// Colonnaded block facing +X with a pediment, windows and a plinth.
/// `width` runs along Z, `depth` along X.
fn neoclassical_building(name: &str, width: f32, height: f32, depth: f32, wall: u32) -> SceneNode {
    let wall_material = Material::standard(wall, 0.6);
    let mut body = Batch::new(format!("{name}_Walls"), wall_material.clone());
    body.add_at(Geometry::cuboid(depth, height, width), Vec3::new(0.0, height / 2.0, 0.0));

    let columns = (width / 6.0).floor() as u32;
    for i in 0..columns {
        body.add_at(
            Geometry::cylinder(0.4, 0.5, height - 2.0, 8),
            Vec3::new(
                depth / 2.0 + 0.3,
                height / 2.0 - 1.0,
                -width / 2.0 + 3.0 + i as f32 * (width / columns as f32),
            ),
        );
    }

    let gable = [
        Vec2::new(-width / 2.0, 0.0),
        Vec2::new(0.0, 4.0),
        Vec2::new(width / 2.0, 0.0),
    ];
    body.add(
        Geometry::extrude(&gable, 1.0),
        Transform::from_xyz(depth / 2.0 + 0.5, height, 0.0).with_rotation(Quat::from_rotation_y(FRAC_PI_2)),
    );

    let mut roof = Batch::new(format!("{name}_Roof"), Material::standard(0x5A4A3A, 0.8));
    roof.add_at(
        Geometry::cuboid(depth + 1.0, 0.5, width + 1.0),
        Vec3::new(0.0, height + 0.25, 0.0),
    );

    let mut windows = Batch::new(
        format!("{name}_Windows"),
        Material::standard(0x4A6A8A, 0.2).with_opacity(0.5),
    );
    let rows = (height / 5.0).floor() as u32;
    let cols = (width / 5.0).floor() as u32;
    for row in 0..rows {
        for col in 0..cols {
            windows.add(
                Geometry::plane(1.5, 2.5, 1, 1),
                Transform::from_xyz(
                    depth / 2.0 + 0.15,
                    3.0 + row as f32 * 5.0,
                    -width / 2.0 + 4.0 + col as f32 * (width / cols as f32),
                )
                .with_rotation(Quat::from_rotation_y(FRAC_PI_2)),
            );
        }
    }

    let plinth = SceneNode::mesh(
        format!("{name}_Plinth"),
        Geometry::cuboid(depth + 2.0, 1.5, width + 2.0),
        Material::standard(0xB0A898, 0.6),
    )
    .at(Transform::from_xyz(0.0, 0.75, 0.0));

    SceneNode::group(name)
        .with_child(body.into_node())
        .with_child(roof.into_node())
        .with_child(windows.into_node())
        .with_child(plinth)
}

fn simple_building(name: String, width: f32, height: f32, depth: f32) -> SceneNode {
    SceneNode::group(name.clone())
        .with_child(
            SceneNode::mesh(
                format!("{name}_Walls"),
                Geometry::cuboid(depth, height, width),
                Material::standard(0xE8E0D0, 0.6),
            )
            .at(Transform::from_xyz(0.0, height / 2.0, 0.0)),
        )
        .with_child(
            SceneNode::mesh(
                format!("{name}_Roof"),
                Geometry::cuboid(depth + 0.5, 0.5, width + 0.5),
                Material::standard(0x5A4A3A, 0.8),
            )
            .at(Transform::from_xyz(0.0, height + 0.25, 0.0)),
        )
}

fn buildings(rng: &mut StdRng) -> SceneNode {
    let mut group = SceneNode::group("SquareBuildings")
        .with_child(
            neoclassical_building("Museum", 60.0, 18.0, 25.0, 0xE8E0D0)
                .at(Transform::from_xyz(-20.0, 2.0, -55.0)),
        )
        .with_child(
            neoclassical_building("Theatre", 50.0, 15.0, 20.0, 0xD0C8B8)
                .at(Transform::from_xyz(-20.0, 2.0, 55.0)),
        )
        .with_child(
            neoclassical_building("Ministry", 70.0, 20.0, 20.0, 0xE8E0D0).at(
                Transform::from_xyz(-55.0, 2.0, 0.0).with_rotation(Quat::from_rotation_y(FRAC_PI_2)),
            ),
        );

    for i in 0..4 {
        let width = 15.0 + rng.gen::<f32>() * 15.0;
        let height = 10.0 + rng.gen::<f32>() * 8.0;
        let depth = 12.0 + rng.gen::<f32>() * 10.0;
        let x = -60.0 - rng.gen::<f32>() * 30.0;
        group.add(
            simple_building(format!("House_{i}"), width, height, depth)
                .at(Transform::from_xyz(x, 2.0, (i as f32 - 1.5) * 35.0)),
        );
    }
    group
}

/// Triumphal arch west of the plaza
fn porta_macedonia() -> SceneNode {
    const X: f32 = -35.0;
    let mut stone = Batch::new("PortaMacedonia", Material::standard(0xE0D8C8, 0.5));
    for z in [-6.0, 6.0] {
        stone.add_at(Geometry::cuboid(5.0, 22.0, 5.0), Vec3::new(X, 13.0, z));
    }
    stone.add_at(Geometry::cuboid(5.0, 4.0, 17.0), Vec3::new(X, 22.0, 0.0));
    stone.add(
        Geometry::torus(5.0, 0.5, 8, 16, PI),
        Transform::from_xyz(X, 8.0, 0.0).with_rotation(Quat::from_rotation_y(FRAC_PI_2)),
    );
    stone.add_at(Geometry::cuboid(6.0, 2.0, 18.0), Vec3::new(X, 25.0, 0.0));
    stone.into_node()
}

/// Benches in a ring of 25 m and lamps in a ring of 30 m around the monument
fn street_furniture() -> SceneNode {
    let mut benches = Batch::new("Benches", Material::standard(0x5A4A3A, 0.8));
    let mut iron = Batch::new("StreetIron", Material::standard(0x2A2A2A, 0.5));
    let mut globes = Batch::new("LampGlobes", Material::unlit(0xFFEECC, 0.8));

    for i in 0..12 {
        let angle = i as f32 / 12.0 * TAU;
        let center = Vec3::new(angle.cos() * 25.0, 2.7, angle.sin() * 25.0);
        let facing = Quat::from_rotation_y(angle);
        benches.add(
            Geometry::cuboid(2.5, 0.6, 0.8),
            Transform::from_translation(center).with_rotation(facing),
        );
        let along = Vec3::new((angle + FRAC_PI_2).cos(), 0.0, (angle + FRAC_PI_2).sin());
        for leg in [-1.0, 1.0] {
            iron.add(
                Geometry::cuboid(0.15, 0.5, 0.6),
                Transform::from_translation(center + along * leg * 0.9 - Vec3::Y * 0.35)
                    .with_rotation(facing),
            );
        }
    }

    for i in 0..8 {
        let angle = i as f32 / 8.0 * TAU;
        let (x, z) = (angle.cos() * 30.0, angle.sin() * 30.0);
        iron.add_at(Geometry::cylinder(0.1, 0.15, 5.0, 6), Vec3::new(x, 6.5, z));
        globes.add_at(Geometry::sphere(0.4, 8, 6), Vec3::new(x, 9.7, z));
    }

    SceneNode::group("StreetFurniture")
        .with_child(benches.into_node())
        .with_child(iron.into_node())
        .with_child(globes.into_node())
}

fn square_trees(rng: &mut StdRng) -> SceneNode {
    const POSITIONS: [(f32, f32); 8] = [
        (-35.0, -30.0),
        (-35.0, 30.0),
        (10.0, -40.0),
        (10.0, 40.0),
        (-45.0, -15.0),
        (-45.0, 15.0),
        (-50.0, -40.0),
        (-50.0, 40.0),
    ];
    let mut group = SceneNode::group("SquareTrees");
    for (i, (x, z)) in POSITIONS.into_iter().enumerate() {
        group.add(city_tree(rng, format!("SquareTree_{i}"), 1.2).at(Transform::from_xyz(x, 2.0, z)));
    }
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneGraph;
    use rand::SeedableRng;

    #[test]
    fn test_monument_stands_on_the_square() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut scene = SceneGraph::new();
        scene.insert(None, macedonia_square(&mut rng));

        let pedestal = scene.find_by_name("Pedestal").unwrap();
        let top = scene
            .node(pedestal)
            .mesh
            .as_ref()
            .unwrap()
            .geometry
            .positions
            .iter()
            .map(|p| scene.world_matrix(pedestal).transform_point3(Vec3::from_array(*p)))
            .fold(Vec3::splat(f32::MIN), Vec3::max);
        assert!((top.x - (SQUARE_X + 3.5)).abs() < 0.2);
        assert!(top.y > 20.0);
    }

    #[test]
    fn test_building_has_columns_and_windows() {
        let museum = neoclassical_building("Museum", 60.0, 18.0, 25.0, 0xE8E0D0);
        let names: Vec<&str> = museum.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Museum_Walls", "Museum_Roof", "Museum_Windows", "Museum_Plinth"]);

        // 3 rows of 12 window quads
        let windows = museum.children[2].mesh.as_ref().unwrap();
        assert_eq!(windows.geometry.triangle_count(), 3 * 12 * 2);
    }
}
