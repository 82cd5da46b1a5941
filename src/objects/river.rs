//! River layers: dark bed, two translucent depth tints and the animated
//! surface on top.

use crate::params::WaterParams;
use crate::scene::{Geometry, Material, SceneNode};
use crate::water::WATER_SURFACE_NAME;

use super::{flat_at, WATER};

/// Bed underlay, deep tint, mid haze and the surface, bottom to top.
///
/// The surface lies in its local XY plane; the node rotation lays it flat so
/// local +Y runs toward world -Z.
pub fn river(params: &WaterParams) -> SceneNode {
    let (width, length) = (params.width_m(), params.length_m);

    let bed = SceneNode::mesh(
        "RiverUnderlay",
        Geometry::plane(width + 4.0, length + 4.0, 4, 4),
        Material::standard(0x020810, 1.0),
    )
    .at(flat_at(0.0, -3.0, 0.0));

    let deep = SceneNode::mesh(
        "DeepTint",
        Geometry::plane(width + 3.0, length + 3.0, 4, 4),
        Material::unlit(0x031828, 0.55),
    )
    .at(flat_at(0.0, -2.0, 0.0));

    let haze = SceneNode::mesh(
        "MidHaze",
        Geometry::plane(width + 2.0, length + 2.0, 4, 4),
        Material::unlit(0x0C3058, 0.30),
    )
    .at(flat_at(0.0, -1.2, 0.0));

    let surface = SceneNode::mesh(
        WATER_SURFACE_NAME,
        Geometry::plane(width, length, params.width_segments, params.length_segments),
        Material::water(0x0B3D6B, 0.92),
    )
    .at(flat_at(0.0, params.surface_elevation_m, 0.0));

    SceneNode::group(WATER)
        .with_child(bed)
        .with_child(deep)
        .with_child(haze)
        .with_child(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneGraph;
    use glam::Vec3;

    #[test]
    fn test_surface_lies_flat_at_elevation() {
        let params = WaterParams::default().with_segments(10);
        let mut scene = SceneGraph::new();
        scene.insert(None, river(&params));

        let id = scene.find_by_name(WATER_SURFACE_NAME).unwrap();
        let world = scene.world_matrix(id);
        // Local +Z (up out of the plane) becomes world +Y
        let up = world.transform_vector3(Vec3::Z);
        assert!((up - Vec3::Y).length() < 1e-6);
        // Local +Y runs downstream toward world -Z
        let along = world.transform_vector3(Vec3::Y);
        assert!((along - Vec3::NEG_Z).length() < 1e-6);
        assert!((world.transform_point3(Vec3::ZERO).y + 0.3).abs() < 1e-6);

        assert_eq!(scene.node(scene.roots()[0]).children().len(), 4);
    }
}
