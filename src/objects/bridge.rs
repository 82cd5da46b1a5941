//! The stone bridge: ten arches on piers, a deck with ramps at both ends,
//! parapets and lampposts.

use std::f32::consts::PI;

use glam::{Quat, Vec2, Vec3};
use rand::rngs::StdRng;

use super::{jitter, Batch, ShadedBatch, BRIDGE};
use crate::scene::{Geometry, Material, SceneNode, TextureKind, Transform};

const BRIDGE_WIDTH: f32 = 6.0;
const TOTAL_LENGTH: f32 = 180.0;
const PIER_WIDTH: f32 = 3.5;
const ABUTMENT_WIDTH: f32 = 4.0;
const DECK_Y: f32 = 12.0;
const PARAPET_HEIGHT: f32 = 1.2;
const RAMP_LENGTH: f32 = 25.0;
const RAMP_DROP: f32 = 8.0;
const FLAT_LENGTH: f32 = TOTAL_LENGTH - RAMP_LENGTH * 2.0;

/// Deck surface height at a position along the bridge (meters).
/// Flat in the middle, sloping down over the last 25 m at each end.
pub fn deck_height(x: f32) -> f32 {
    let half_flat = FLAT_LENGTH / 2.0;
    let into_ramp = (x.abs() - half_flat).clamp(0.0, RAMP_LENGTH);
    DECK_Y - into_ramp / RAMP_LENGTH * RAMP_DROP
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchKind {
    /// Land arches over the embankments
    Small,
    /// River arches
    Large,
}

impl ArchKind {
    pub fn span(self) -> f32 {
        match self {
            Self::Small => 8.0,
            Self::Large => 16.0,
        }
    }

    pub fn rise(self) -> f32 {
        match self {
            Self::Small => 5.0,
            Self::Large => 9.0,
        }
    }

    /// Voussoir ring thickness
    pub fn thickness(self) -> f32 {
        match self {
            Self::Small => 1.2,
            Self::Large => 1.8,
        }
    }

    fn voussoirs(self) -> u32 {
        match self {
            Self::Small => 16,
            Self::Large => 24,
        }
    }

    fn keystone_width(self) -> f32 {
        match self {
            Self::Small => 1.0,
            Self::Large => 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PierKind {
    Abutment,
    Land,
    River,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchSpan {
    pub center_x: f32,
    pub kind: ArchKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PierSlot {
    /// Left edge along the bridge (meters)
    pub x: f32,
    pub width: f32,
    pub kind: PierKind,
}

impl PierSlot {
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Arches and piers laid out left to right and centered on x = 0: abutment,
/// three land arches, four river arches, three land arches, abutment
#[derive(Debug, Clone)]
pub struct BridgeLayout {
    pub arches: Vec<ArchSpan>,
    pub piers: Vec<PierSlot>,
}

impl Default for BridgeLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeLayout {
    pub fn new() -> Self {
        let mut arches = Vec::new();
        let mut piers = Vec::new();
        let mut x = -TOTAL_LENGTH / 2.0;

        let mut arch = |x: &mut f32, kind: ArchKind| {
            arches.push(ArchSpan {
                center_x: *x + kind.span() / 2.0,
                kind,
            });
            *x += kind.span();
        };
        let mut pier = |x: &mut f32, width: f32, kind: PierKind| {
            piers.push(PierSlot { x: *x, width, kind });
            *x += width;
        };

        pier(&mut x, ABUTMENT_WIDTH, PierKind::Abutment);
        for _ in 0..3 {
            arch(&mut x, ArchKind::Small);
            pier(&mut x, PIER_WIDTH, PierKind::Land);
        }
        for i in 0..4 {
            arch(&mut x, ArchKind::Large);
            if i < 3 {
                pier(&mut x, PIER_WIDTH, PierKind::River);
            }
        }
        pier(&mut x, PIER_WIDTH, PierKind::Land);
        for i in 0..3 {
            arch(&mut x, ArchKind::Small);
            if i < 2 {
                pier(&mut x, PIER_WIDTH, PierKind::Land);
            }
        }
        pier(&mut x, ABUTMENT_WIDTH, PierKind::Abutment);

        let shift = -(x - TOTAL_LENGTH / 2.0) / 2.0;
        arches.iter_mut().for_each(|a| a.center_x += shift);
        piers.iter_mut().for_each(|p| p.x += shift);
        Self { arches, piers }
    }
}

fn stone_material() -> Material {
    Material::standard(0x8A8078, 0.88).with_texture(TextureKind::Stone, Vec2::ONE)
}

fn wall_material() -> Material {
    Material::standard(0x7A7068, 0.92).with_texture(TextureKind::StoneWall, Vec2::splat(2.0))
}

pub fn bridge(rng: &mut StdRng) -> SceneNode {
    let layout = BridgeLayout::new();
    SceneNode::group(BRIDGE)
        .with_child(piers(&layout, rng))
        .with_child(arches(&layout, rng))
        .with_child(cutwaters(&layout))
        .with_child(spandrel_walls(&layout))
        .with_child(deck(rng))
        .with_child(parapet(rng, -1.0, "ParapetLeft"))
        .with_child(parapet(rng, 1.0, "ParapetRight"))
        .with_child(lampposts())
}

fn piers(layout: &BridgeLayout, rng: &mut StdRng) -> SceneNode {
    let height = DECK_Y + 3.0;
    let depth = BRIDGE_WIDTH + 1.0;
    let mut blocks = ShadedBatch::new("PierBody", wall_material(), 4, 0.04, rng);
    let mut footings = Batch::new("PierFootings", wall_material());

    for pier in &layout.piers {
        let width = pier.width;
        blocks.add(
            rng,
            Geometry::cuboid(width, height, depth),
            Transform::from_xyz(pier.center_x(), height / 2.0 - 4.0, 0.0),
        );
        if pier.kind != PierKind::Abutment {
            footings.add_at(
                Geometry::cuboid(width + 1.0, 2.0, depth + 1.0),
                Vec3::new(pier.center_x(), -3.0, 0.0),
            );
        }
    }

    let mut group = SceneNode::group("Piers");
    blocks.into_nodes().for_each(|node| group.add(node));
    group.with_child(footings.into_node())
}

/// One semicircular ring of voussoirs centered on the origin, opening
/// downward, spanning the bridge depth along Z
fn arch_ring(kind: ArchKind, depth: f32, stones: &mut ShadedBatch, keystones: &mut Batch, rng: &mut StdRng) {
    let inner = kind.span() / 2.0;
    let outer = inner + kind.thickness();
    let segments = kind.voussoirs();

    for i in 0..segments {
        let a1 = PI / segments as f32 * i as f32;
        let a2 = PI / segments as f32 * (i + 1) as f32;
        let outline = [
            Vec2::from_angle(a1) * inner,
            Vec2::from_angle(a1) * outer,
            Vec2::from_angle(a2) * outer,
            Vec2::from_angle(a2) * inner,
        ];
        stones.add(
            rng,
            Geometry::extrude(&outline, depth),
            Transform::from_xyz(0.0, 0.0, -depth / 2.0),
        );
    }

    keystones.add_at(
        Geometry::cuboid(kind.keystone_width(), kind.thickness() + 0.3, depth + 0.3),
        Vec3::new(0.0, inner + kind.thickness() / 2.0, 0.0),
    );
}

fn arches(layout: &BridgeLayout, rng: &mut StdRng) -> SceneNode {
    let depth = BRIDGE_WIDTH + 0.5;
    let mut group = SceneNode::group("Arches");

    for (i, span) in layout.arches.iter().enumerate() {
        let kind = span.kind;
        let mut stones = ShadedBatch::new(&format!("Arch_{i}_Voussoirs"), stone_material(), 3, 0.06, rng);
        let mut keystone = Batch::new(
            format!("Arch_{i}_Keystone"),
            Material::standard(0x7A7268, 0.88).with_texture(TextureKind::Stone, Vec2::ONE),
        );
        arch_ring(kind, depth, &mut stones, &mut keystone, rng);

        let label = match kind {
            ArchKind::Small => "small",
            ArchKind::Large => "large",
        };
        let mut arch = SceneNode::group(format!("Arch_{i}_{label}"))
            .at(Transform::from_xyz(span.center_x, DECK_Y - kind.rise(), 0.0));
        stones.into_nodes().for_each(|node| arch.add(node));
        group.add(arch.with_child(keystone.into_node()));
    }
    group
}

/// Triangular prow `point_length` long, `height` tall, base centered on the
/// origin and pointing toward -Z
fn cutwater(base_width: f32, height: f32, point_length: f32) -> Geometry {
    let outline = [
        Vec2::new(-base_width / 2.0, 0.0),
        Vec2::new(base_width / 2.0, 0.0),
        Vec2::new(0.0, point_length),
    ];
    // Extrusion runs up +Y, the point toward -Z
    Geometry::extrude(&outline, height).transformed(glam::Mat4::from_rotation_x(-PI / 2.0))
}

fn cutwaters(layout: &BridgeLayout) -> SceneNode {
    let mut batch = Batch::new("Cutwaters", stone_material());
    let face = (BRIDGE_WIDTH + 1.0) / 2.0;

    for pier in layout.piers.iter().filter(|p| p.kind == PierKind::River) {
        let x = pier.center_x();
        batch.add_at(cutwater(pier.width, 8.0, 3.0), Vec3::new(x, -3.0, -face));
        batch.add(
            cutwater(pier.width, 8.0, 2.5),
            Transform::from_xyz(x, -3.0, face).with_rotation(Quat::from_rotation_y(PI)),
        );
    }
    batch.into_node()
}

/// Haunch fill between each arch ring and the deck, both sides of the crown
fn spandrel_walls(layout: &BridgeLayout) -> SceneNode {
    let mut batch = Batch::new("SpandrelWalls", wall_material());
    let depth = BRIDGE_WIDTH;

    for span in &layout.arches {
        let kind = span.kind;
        let center_y = DECK_Y - kind.rise();
        let top = DECK_Y - center_y;
        let outer = kind.span() / 2.0 + kind.thickness();
        let upper = Vec2::from_angle(PI / 3.0) * outer;
        let lower = Vec2::from_angle(PI / 6.0) * outer;
        let reach = kind.span() / 2.0 + PIER_WIDTH / 2.0;

        for side in [-1.0_f32, 1.0] {
            let flip = Vec2::new(side, 1.0);
            let wedge = [
                upper * flip,
                lower * flip,
                Vec2::new(lower.x, top) * flip,
                Vec2::new(upper.x, top) * flip,
            ];
            let haunch = [
                lower * flip,
                Vec2::new(reach, lower.y) * flip,
                Vec2::new(reach, top) * flip,
                Vec2::new(lower.x, top) * flip,
            ];
            for outline in [wedge, haunch] {
                batch.add_at(
                    Geometry::extrude(&outline, depth),
                    Vec3::new(span.center_x, center_y, -depth / 2.0),
                );
            }
        }
    }
    batch.into_node()
}

fn deck(rng: &mut StdRng) -> SceneNode {
    let width = BRIDGE_WIDTH + 0.5;
    let ramp_angle = RAMP_DROP.atan2(RAMP_LENGTH);
    let hypotenuse = RAMP_LENGTH.hypot(RAMP_DROP);

    let mut slab = Batch::new("DeckSlab", wall_material());
    slab.add_at(Geometry::cuboid(FLAT_LENGTH, 1.0, width), Vec3::new(0.0, DECK_Y, 0.0));

    for side in [-1.0_f32, 1.0] {
        slab.add(
            Geometry::cuboid(hypotenuse, 1.0, width),
            Transform::from_xyz(side * (FLAT_LENGTH + RAMP_LENGTH) / 2.0, DECK_Y - RAMP_DROP / 2.0, 0.0)
                .with_rotation(Quat::from_rotation_z(-side * ramp_angle)),
        );
    }

    // Wedges under the ramps, high edge against the flat section
    let mut fill = Batch::new("RampFill", wall_material());
    let south = [Vec2::ZERO, Vec2::new(RAMP_LENGTH, RAMP_DROP), Vec2::new(RAMP_LENGTH, 0.0)];
    let north = [Vec2::ZERO, Vec2::new(0.0, RAMP_DROP), Vec2::new(RAMP_LENGTH, 0.0)];
    let base_y = DECK_Y - RAMP_DROP - 0.5;
    fill.add_at(
        Geometry::extrude(&south, width),
        Vec3::new(-FLAT_LENGTH / 2.0 - RAMP_LENGTH, base_y, -width / 2.0),
    );
    fill.add_at(
        Geometry::extrude(&north, width),
        Vec3::new(FLAT_LENGTH / 2.0, base_y, -width / 2.0),
    );

    SceneNode::group("Deck")
        .with_child(slab.into_node())
        .with_child(fill.into_node())
        .with_child(cobblestones(rng))
}

/// Paving stones on a 1.2 m grid following the deck profile
fn cobblestones(rng: &mut StdRng) -> SceneNode {
    const STEP: f32 = 1.2;
    let ramp_angle = RAMP_DROP.atan2(RAMP_LENGTH);
    let mut stones = ShadedBatch::new("Cobblestones", Material::standard(0x8A8078, 0.9), 4, 0.05, rng);

    let z_steps = ((BRIDGE_WIDTH - 1.0) / STEP).ceil() as i32;
    let flat_steps = (FLAT_LENGTH / STEP).ceil() as i32;
    let ramp_steps = (RAMP_LENGTH / STEP).ceil() as i32;

    let mut lay = |rng: &mut StdRng, x: f32, tilt: f32| {
        for zi in 0..z_steps {
            let z = -BRIDGE_WIDTH / 2.0 + 0.5 + zi as f32 * STEP + jitter(rng, 0.15);
            let scale = 0.8 + jitter(rng, 0.3);
            let yaw = jitter(rng, 0.2);
            let transform = Transform::from_xyz(x, deck_height(x) + 0.55, z)
                .with_rotation(Quat::from_rotation_z(tilt) * Quat::from_rotation_y(yaw))
                .with_scale(Vec3::new(scale, 1.0, scale));
            stones.add(rng, Geometry::cuboid(0.8, 0.08, 0.8), transform);
        }
    };

    for xi in 0..flat_steps {
        let x = -FLAT_LENGTH / 2.0 + xi as f32 * STEP + jitter(rng, 0.15);
        lay(rng, x, 0.0);
    }
    for xi in 0..ramp_steps {
        let offset = xi as f32 * STEP + jitter(rng, 0.15);
        lay(rng, -FLAT_LENGTH / 2.0 - offset, ramp_angle);
        lay(rng, FLAT_LENGTH / 2.0 + offset, -ramp_angle);
    }

    let mut group = SceneNode::group("Cobblestones");
    stones.into_nodes().for_each(|node| group.add(node));
    group
}

/// Low wall along one edge (`side` = -1 or 1), blocks then cap stones
fn parapet(rng: &mut StdRng, side: f32, name: &str) -> SceneNode {
    let z = side * (BRIDGE_WIDTH / 2.0 + 0.3);
    let start = -TOTAL_LENGTH / 2.0 + 2.0;
    let end = TOTAL_LENGTH / 2.0 - 2.0;

    let mut blocks = ShadedBatch::new(&format!("{name}_Blocks"), stone_material(), 3, 0.06, rng);
    let mut x = start;
    while x <= end {
        let w = 1.2 + jitter(rng, 0.3);
        let h = PARAPET_HEIGHT + jitter(rng, 0.1);
        blocks.add(
            rng,
            Geometry::cuboid(w, h, 0.5),
            Transform::from_xyz(x, deck_height(x) + 0.5 + h / 2.0, z),
        );
        x += 1.5;
    }

    let mut caps = Batch::new(format!("{name}_Caps"), Material::standard(0x8A8278, 0.88));
    let mut x = start;
    while x <= end {
        caps.add_at(
            Geometry::cuboid(1.8, 0.2, 0.7),
            Vec3::new(x, deck_height(x) + 0.5 + PARAPET_HEIGHT + 0.1, z),
        );
        x += 2.0;
    }

    let mut group = SceneNode::group(name);
    blocks.into_nodes().for_each(|node| group.add(node));
    group.with_child(caps.into_node())
}

fn lampposts() -> SceneNode {
    let mut metal = Batch::new("LampMetal", Material::standard(0x2A2A2A, 0.6));
    let mut glass = Batch::new("LampGlass", Material::unlit(0xFFEECC, 0.7));

    let mut x = -TOTAL_LENGTH / 2.0 + 10.0;
    while x <= TOTAL_LENGTH / 2.0 - 10.0 {
        let deck = deck_height(x);
        for side in [-1.0, 1.0] {
            let z = side * (BRIDGE_WIDTH / 2.0 + 0.3);
            metal.add_at(Geometry::cylinder(0.08, 0.12, 3.5, 6), Vec3::new(x, deck + 2.25, z));
            glass.add_at(Geometry::cuboid(0.4, 0.5, 0.4), Vec3::new(x, deck + 4.2, z));
            metal.add_at(Geometry::cone(0.3, 0.3, 4), Vec3::new(x, deck + 4.6, z));
        }
        x += 18.0;
    }

    SceneNode::group("Lampposts")
        .with_child(metal.into_node())
        .with_child(glass.into_node())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_layout_counts() {
        let layout = BridgeLayout::new();
        assert_eq!(layout.arches.len(), 10);
        let large = layout.arches.iter().filter(|a| a.kind == ArchKind::Large).count();
        assert_eq!(large, 4);

        let count = |kind| layout.piers.iter().filter(|p| p.kind == kind).count();
        assert_eq!(count(PierKind::Abutment), 2);
        assert_eq!(count(PierKind::River), 3);
        assert_eq!(count(PierKind::Land), 6);
    }

    #[test]
    fn test_layout_is_contiguous() {
        let layout = BridgeLayout::new();
        let first = layout.piers.first().unwrap();
        let last = layout.piers.last().unwrap();
        assert!((first.x + last.x + last.width).abs() < 1e-4);
        // Each arch sits flush between its neighbouring piers
        for arch in &layout.arches {
            let left = arch.center_x - arch.kind.span() / 2.0;
            assert!(layout
                .piers
                .iter()
                .any(|p| (p.x + p.width - left).abs() < 1e-4));
        }
        // Large arches straddle the river center
        let large: Vec<f32> = layout
            .arches
            .iter()
            .filter(|a| a.kind == ArchKind::Large)
            .map(|a| a.center_x)
            .collect();
        assert!(large.first().unwrap() < &0.0 && large.last().unwrap() > &0.0);
    }

    #[test]
    fn test_deck_profile() {
        assert_eq!(deck_height(0.0), 12.0);
        assert_eq!(deck_height(65.0), 12.0);
        assert_eq!(deck_height(-65.0), 12.0);
        assert_eq!(deck_height(90.0), 4.0);
        assert_eq!(deck_height(-90.0), 4.0);
        assert_eq!(deck_height(200.0), 4.0);
        assert!((deck_height(77.5) - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_bridge_parts() {
        let mut rng = StdRng::seed_from_u64(3);
        let bridge = bridge(&mut rng);
        let names: Vec<&str> = bridge.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Piers",
                "Arches",
                "Cutwaters",
                "SpandrelWalls",
                "Deck",
                "ParapetLeft",
                "ParapetRight",
                "Lampposts"
            ]
        );
        let arches = &bridge.children[1];
        assert_eq!(arches.children.len(), 10);
    }
}
