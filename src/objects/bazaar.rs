//! The Old Bazaar on the north bank: cobbled lanes lined with shops, the
//! hammam, a mosque with its minaret, the covered market and the Kale
//! fortress on its hill.
//!
//! Built in bazaar-local coordinates; the group sits at x = [`BAZAAR_X`].

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use glam::{Quat, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::Rng;

use super::{flat_at, Batch, ShadedBatch, BAZAAR};
use crate::scene::{Geometry, Material, SceneNode, Transform};

pub const BAZAAR_X: f32 = 80.0;

const SHOP_WALL_COLORS: [u32; 5] = [0xD8C8A8, 0xC8B898, 0xE0D0B0, 0xB8A888, 0xD0C0A0];

/// Lane position, shop count and which way the fronts face
const SHOP_ROWS: [(f32, u32, f32); 8] = [
    (-35.0, 8, 1.0),
    (-25.0, 8, -1.0),
    (-15.0, 9, 1.0),
    (-5.0, 9, -1.0),
    (5.0, 9, 1.0),
    (15.0, 9, -1.0),
    (25.0, 8, 1.0),
    (35.0, 8, -1.0),
];

pub fn old_bazaar(rng: &mut StdRng) -> SceneNode {
    SceneNode::group(BAZAAR)
        .at(Transform::from_xyz(BAZAAR_X, 0.0, 0.0))
        .with_child(streets(rng))
        .with_child(shops(rng))
        .with_child(hammam())
        .with_child(mosque())
        .with_child(bezisten())
        .with_child(kale_fortress())
}

fn streets(rng: &mut StdRng) -> SceneNode {
    let cobble = Material::standard(0x8A8070, 0.95);
    let ground = SceneNode::mesh("BazaarGround", Geometry::plane(100.0, 140.0, 1, 1), cobble.clone())
        .at(flat_at(10.0, 2.1, 0.0));

    let mut stones = ShadedBatch::new("BazaarCobbles", cobble, 4, 0.08, rng);
    for xi in 0..65 {
        for zi in 0..80 {
            if rng.gen::<f32>() <= 0.3 {
                continue;
            }
            let size = Vec2::new(0.5 + rng.gen::<f32>() * 0.3, 0.5 + rng.gen::<f32>() * 0.3);
            let yaw = rng.gen::<f32>() * 0.3;
            stones.add(
                rng,
                Geometry::cuboid(size.x, 0.05, size.y),
                Transform::from_xyz(xi as f32 - 5.0, 2.15, zi as f32 - 40.0)
                    .with_rotation(Quat::from_rotation_y(yaw)),
            );
        }
    }

    let mut group = SceneNode::group("BazaarStreets").with_child(ground);
    stones.into_nodes().for_each(|node| group.add(node));
    group
}

/// Per-material batches shared by every shop
struct ShopParts {
    walls: Vec<Batch>,
    roofs: Batch,
    trim: Batch,
    doors: Batch,
    shutters: Batch,
    awnings: [Batch; 2],
}

impl ShopParts {
    fn new() -> Self {
        Self {
            walls: SHOP_WALL_COLORS
                .iter()
                .enumerate()
                .map(|(i, &c)| Batch::new(format!("ShopWalls_{i}"), Material::standard(c, 0.85)))
                .collect(),
            roofs: Batch::new("ShopRoofs", Material::standard(0x9A4A2A, 0.8)),
            trim: Batch::new("ShopFronts", Material::standard(0x5A3A1A, 0.85)),
            doors: Batch::new("ShopDoors", Material::standard(0x4A2A0A, 0.8)),
            shutters: Batch::new("ShopShutters", Material::standard(0x3A6A3A, 0.85)),
            awnings: [
                Batch::new("Awnings_0", Material::standard(0x8B4513, 0.9)),
                Batch::new("Awnings_1", Material::standard(0xA0522D, 0.9)),
            ],
        }
    }

    /// One shop with its base at `origin`; `facing` is +1 or -1 along Z
    fn add_shop(&mut self, rng: &mut StdRng, origin: Vec3, size: Vec3, facing: f32) {
        let (w, h, d) = (size.x, size.y, size.z);
        let at = |offset: Vec3| Transform::from_translation(origin + offset);
        let front = facing * d / 2.0;

        let wall = rng.gen_range(0..self.walls.len());
        self.walls[wall].add(Geometry::cuboid(w, h, d), at(Vec3::new(0.0, h / 2.0, 0.0)));

        self.roofs.add(Geometry::cuboid(w + 0.6, 0.3, d + 0.6), at(Vec3::new(0.0, h, 0.0)));
        let ridge = [
            Vec2::new(-w / 2.0 - 0.3, 0.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(w / 2.0 + 0.3, 0.0),
        ];
        self.roofs.add(
            Geometry::extrude(&ridge, d + 0.5).flat_shaded(),
            at(Vec3::new(0.0, h, -d / 2.0 - 0.25)),
        );

        self.trim.add(
            Geometry::cuboid(w - 0.3, h * 0.6, 0.15),
            at(Vec3::new(0.0, h * 0.3, front)),
        );
        self.doors.add(
            Geometry::cuboid(1.2, 2.2, 0.2),
            at(Vec3::new(0.0, 1.1, front + facing * 0.05)),
        );
        for side in [-1.0, 1.0] {
            self.shutters.add(
                Geometry::cuboid(0.8, 1.0, 0.1),
                at(Vec3::new(side * 1.5, 2.8, front + facing * 0.05)),
            );
        }

        let awning = usize::from(rng.gen_bool(0.5));
        self.awnings[awning].add(
            Geometry::cuboid(w + 0.5, 0.08, 1.5),
            at(Vec3::new(0.0, h * 0.6, front + facing * 0.7))
                .with_rotation(Quat::from_rotation_x(facing * 0.15)),
        );
    }

    fn into_node(self) -> SceneNode {
        let mut group = SceneNode::group("OttomanShops");
        let batches = self
            .walls
            .into_iter()
            .chain([self.roofs, self.trim, self.doors, self.shutters])
            .chain(self.awnings);
        for batch in batches {
            let node = batch.into_node();
            if node.mesh.as_ref().is_some_and(|m| m.geometry.vertex_count() > 0) {
                group.add(node);
            }
        }
        group
    }
}

fn shops(rng: &mut StdRng) -> SceneNode {
    let mut parts = ShopParts::new();
    for (z, count, facing) in SHOP_ROWS {
        for i in 0..count {
            let size = Vec3::new(
                4.0 + rng.gen::<f32>() * 2.0,
                4.0 + rng.gen::<f32>() * 2.0,
                5.0 + rng.gen::<f32>() * 3.0,
            );
            let origin = Vec3::new(5.0 + i as f32 * (size.x + 1.0), 2.0, z + facing * 3.0);
            parts.add_shop(rng, origin, size, facing);
        }
    }
    parts.into_node()
}

/// Seven lead domes over a stone bath house
fn hammam() -> SceneNode {
    const CENTER: Vec3 = Vec3::new(15.0, 0.0, 50.0);
    const DOMES: [(f32, f32, f32); 7] = [
        (0.0, 0.0, 5.0),
        (-6.0, -4.0, 3.0),
        (6.0, -4.0, 3.0),
        (-6.0, 4.0, 3.0),
        (6.0, 4.0, 3.0),
        (0.0, -6.0, 2.5),
        (0.0, 6.0, 2.5),
    ];

    let mut stone = Batch::new("HammamStone", Material::standard(0xC8B898, 0.7));
    stone.add_at(Geometry::cuboid(25.0, 8.0, 20.0), CENTER + Vec3::new(0.0, 6.0, 0.0));
    stone.add_at(Geometry::cuboid(5.0, 10.0, 3.0), CENTER + Vec3::new(0.0, 7.0, -11.0));
    stone.add_at(
        Geometry::torus(2.0, 0.3, 8, 12, PI),
        CENTER + Vec3::new(0.0, 7.0, -12.3),
    );

    let mut domes = Batch::new("HammamDomes", Material::standard(0x7A7A7A, 0.6));
    for (x, z, r) in DOMES {
        domes.add_at(
            Geometry::sphere_cap(r, 16, 12, FRAC_PI_2),
            CENTER + Vec3::new(x, 10.0 + (r - 3.0) * 0.5, z),
        );
    }

    SceneNode::group("DautPashaHammam")
        .with_child(stone.into_node())
        .with_child(domes.into_node())
}

fn mosque() -> SceneNode {
    const CENTER: Vec3 = Vec3::new(50.0, 0.0, -40.0);
    const MINARET: Vec3 = Vec3::new(38.0, 0.0, -48.0);

    let mut walls = Batch::new("MosqueWalls", Material::standard(0xD8D0C0, 0.6));
    walls.add_at(Geometry::cuboid(18.0, 12.0, 18.0), CENTER + Vec3::new(0.0, 8.0, 0.0));
    walls.add_at(Geometry::cuboid(22.0, 5.0, 0.5), CENTER + Vec3::new(0.0, 4.5, -10.0));
    walls.add_at(Geometry::cuboid(0.5, 5.0, 20.0), CENTER + Vec3::new(-11.0, 4.5, 0.0));

    let mut lead = Batch::new("MosqueDome", Material::standard(0x7A7A7A, 0.5));
    lead.add_at(
        Geometry::sphere_cap(8.0, 20, 16, FRAC_PI_2),
        CENTER + Vec3::new(0.0, 14.0, 0.0),
    );
    lead.add_at(Geometry::cone(0.8, 3.0, 8), MINARET + Vec3::new(0.0, 40.0, 0.0));

    let mut gold = Batch::new("MosqueAlem", Material::standard(0xC8A050, 0.2));
    gold.add_at(Geometry::cylinder(0.1, 0.1, 2.0, 6), CENTER + Vec3::new(0.0, 23.0, 0.0));
    gold.add(
        Geometry::torus(0.4, 0.08, 8, 16, PI * 1.5),
        Transform::from_translation(CENTER + Vec3::new(0.0, 24.2, 0.0))
            .with_rotation(Quat::from_rotation_z(FRAC_PI_4)),
    );

    let mut minaret = Batch::new("Minaret", Material::standard(0xE0D8C8, 0.5));
    for (bottom, top, height, y, segments) in [
        (1.5, 1.2, 4.0, 4.0, 8),
        (1.0, 0.8, 30.0, 21.0, 8),
        (1.6, 1.6, 0.5, 33.0, 12),
        (0.7, 0.5, 5.0, 36.0, 8),
    ] {
        minaret.add_at(
            Geometry::cylinder(top, bottom, height, segments),
            MINARET + Vec3::new(0.0, y, 0.0),
        );
    }

    let mut windows = Batch::new(
        "MosqueWindows",
        Material::standard(0x3A5A7A, 0.3).with_opacity(0.4),
    );
    for i in -2..=2 {
        windows.add(
            Geometry::plane(1.5, 3.0, 1, 1),
            Transform::from_translation(CENTER + Vec3::new(9.05, 8.0, i as f32 * 4.0))
                .with_rotation(Quat::from_rotation_y(FRAC_PI_2)),
        );
    }

    SceneNode::group("MustafaPashaMosque")
        .with_child(walls.into_node())
        .with_child(lead.into_node())
        .with_child(gold.into_node())
        .with_child(minaret.into_node())
        .with_child(windows.into_node())
}

/// Covered market: a long hall under a barrel vault
fn bezisten() -> SceneNode {
    const CENTER: Vec3 = Vec3::new(25.0, 0.0, -15.0);
    const VAULT_LENGTH: f32 = 32.0;

    let mut stone = Batch::new("BezistenWalls", Material::standard(0xB8A888, 0.8));
    stone.add_at(Geometry::cuboid(20.0, 6.0, 30.0), CENTER + Vec3::new(0.0, 5.0, 0.0));
    for side in [-1.0, 1.0] {
        stone.add_at(
            Geometry::torus(2.0, 0.3, 8, 12, PI),
            CENTER + Vec3::new(0.0, 4.0, side * 15.5),
        );
    }

    let half_circle: Vec<Vec2> = (0..=16)
        .map(|i| Vec2::from_angle(PI * i as f32 / 16.0) * 10.0)
        .collect();
    let vault = SceneNode::mesh(
        "BezistenVault",
        Geometry::extrude(&half_circle, VAULT_LENGTH),
        Material::standard(0x7A7A7A, 0.7),
    )
    .at(Transform::from_translation(CENTER + Vec3::new(0.0, 8.0, -VAULT_LENGTH / 2.0)));

    SceneNode::group("Bezisten")
        .with_child(stone.into_node())
        .with_child(vault)
}

/// Walled fort with corner towers on a cone-shaped hill
fn kale_fortress() -> SceneNode {
    const CENTER: Vec3 = Vec3::new(60.0, 0.0, -20.0);
    const HILL: f32 = 15.0;
    const WALL: f32 = 10.0;

    let hill = SceneNode::mesh(
        "KaleHill",
        Geometry::cone(50.0, HILL, 12).flat_shaded(),
        Material::standard(0x5A6A4A, 0.95),
    )
    .at(Transform::from_translation(CENTER + Vec3::new(0.0, HILL / 2.0 + 2.0, 0.0)));

    let mut fort = Batch::new("KaleWalls", Material::standard(0x8A7A6A, 0.92));
    let wall_y = HILL + WALL / 2.0;
    for z in [-18.0, 18.0] {
        fort.add_at(Geometry::cuboid(40.0, WALL, 2.0), CENTER + Vec3::new(0.0, wall_y, z));
    }
    for x in [-20.0, 20.0] {
        fort.add_at(Geometry::cuboid(2.0, WALL, 36.0), CENTER + Vec3::new(x, wall_y, 0.0));
    }
    for (x, z) in [(20.0, -18.0), (-20.0, -18.0), (20.0, 18.0), (-20.0, 18.0)] {
        fort.add_at(
            Geometry::cylinder(3.0, 3.5, WALL + 4.0, 8).flat_shaded(),
            CENTER + Vec3::new(x, HILL + (WALL + 4.0) / 2.0, z),
        );
        fort.add_at(
            Geometry::cone(3.5, 3.0, 8).flat_shaded(),
            CENTER + Vec3::new(x, HILL + WALL + 5.0, z),
        );
    }

    let pole = SceneNode::mesh(
        "FlagPole",
        Geometry::cylinder(0.1, 0.1, 8.0, 4),
        Material::standard(0x333333, 0.8),
    )
    .at(Transform::from_translation(CENTER + Vec3::new(0.0, HILL + WALL + 8.0, 0.0)));
    let flag = SceneNode::mesh(
        "Flag",
        Geometry::plane(3.0, 2.0, 1, 1),
        Material::standard(0xCC0000, 0.9),
    )
    .at(Transform::from_translation(CENTER + Vec3::new(1.5, HILL + WALL + 11.0, 0.0)));

    SceneNode::group("KaleFortress")
        .with_child(hill)
        .with_child(fort.into_node())
        .with_child(pole)
        .with_child(flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_bazaar_parts() {
        let mut rng = StdRng::seed_from_u64(8);
        let bazaar = old_bazaar(&mut rng);
        let names: Vec<&str> = bazaar.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "BazaarStreets",
                "OttomanShops",
                "DautPashaHammam",
                "MustafaPashaMosque",
                "Bezisten",
                "KaleFortress"
            ]
        );
        assert_eq!(bazaar.transform.translation.x, BAZAAR_X);
    }

    #[test]
    fn test_every_shop_gets_a_door() {
        let mut rng = StdRng::seed_from_u64(8);
        let shops = shops(&mut rng);
        let doors = shops
            .children
            .iter()
            .find(|c| c.name == "ShopDoors")
            .and_then(|c| c.mesh.as_ref())
            .unwrap();
        let shop_count: u32 = SHOP_ROWS.iter().map(|row| row.1).sum();
        // 12 triangles per box
        assert_eq!(doors.geometry.triangle_count(), shop_count as usize * 12);
    }

    #[test]
    fn test_domes_sit_above_the_roofline() {
        let hammam = hammam();
        let domes = hammam.children[1].mesh.as_ref().unwrap();
        let lowest = domes
            .geometry
            .positions
            .iter()
            .map(|p| p[1])
            .fold(f32::MAX, f32::min);
        // Hammam roof is at 10; the smallest domes sink a quarter meter into it
        assert!(lowest >= 9.7);
    }
}
