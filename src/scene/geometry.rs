//! Indexed triangle geometry and primitive builders.
//!
//! Geometry is stored CPU-side in separate attribute arrays so the water
//! updater can rewrite positions in place; the renderer interleaves them into
//! [`Vertex`] records when uploading.

use std::f32::consts::{PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec2, Vec3};
use rand::Rng;

use crate::water::RestSnapshot;

/// GPU vertex layout (position + normal + UV)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Indexed triangle list with per-vertex attributes
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,

    /// Positions or normals changed since the last GPU upload
    pub needs_upload: bool,

    /// Undisplaced rest state, captured by the water updater on its first frame
    pub rest: Option<RestSnapshot>,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleave attributes for upload
    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex {
                position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                uv: self.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect()
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: [f32; 2]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        self.normals.push(normal.to_array());
        self.uvs.push(uv);
        index
    }

    /// Recompute smooth vertex normals from the current positions.
    ///
    /// Face normals are accumulated unnormalized, so larger triangles weigh
    /// more, then each vertex normal is normalized.
    pub fn compute_vertex_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let pa = Vec3::from_array(self.positions[a]);
            let pb = Vec3::from_array(self.positions[b]);
            let pc = Vec3::from_array(self.positions[c]);
            let face = (pb - pa).cross(pc - pa);
            accum[a] += face;
            accum[b] += face;
            accum[c] += face;
        }

        self.normals = accum
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect();
    }

    /// Apply a transform to positions and normals
    pub fn transform(&mut self, matrix: Mat4) {
        let normal_matrix = Mat3::from_mat4(matrix).inverse().transpose();
        for p in &mut self.positions {
            *p = matrix.transform_point3(Vec3::from_array(*p)).to_array();
        }
        for n in &mut self.normals {
            *n = (normal_matrix * Vec3::from_array(*n))
                .normalize_or_zero()
                .to_array();
        }
    }

    pub fn translated(mut self, offset: Vec3) -> Self {
        self.transform(Mat4::from_translation(offset));
        self
    }

    pub fn transformed(mut self, matrix: Mat4) -> Self {
        self.transform(matrix);
        self
    }

    /// Append another geometry's triangles
    pub fn merge(&mut self, other: &Geometry) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Split shared vertices so every triangle gets its own face normal
    pub fn flat_shaded(&self) -> Self {
        let mut out = Geometry::default();
        for tri in self.indices.chunks_exact(3) {
            let p: Vec<Vec3> = tri
                .iter()
                .map(|&i| Vec3::from_array(self.positions[i as usize]))
                .collect();
            let normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();
            for (k, &i) in tri.iter().enumerate() {
                let uv = self.uvs.get(i as usize).copied().unwrap_or([0.0, 0.0]);
                let index = out.push_vertex(p[k], normal, uv);
                out.indices.push(index);
            }
        }
        out
    }

    /// Subdivided plane in the XY plane facing +Z, centered on the origin.
    ///
    /// Vertices run row by row from +Y to -Y, left to right, so vertex
    /// `ix + (width_segments + 1) * iy` sits at column `ix`, row `iy`.
    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let grid_x = width_segments.max(1);
        let grid_y = height_segments.max(1);
        let segment_w = width / grid_x as f32;
        let segment_h = height / grid_y as f32;
        let half_w = width / 2.0;
        let half_h = height / 2.0;

        let mut geometry = Geometry::default();
        for iy in 0..=grid_y {
            let y = iy as f32 * segment_h - half_h;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_w - half_w;
                geometry.push_vertex(
                    Vec3::new(x, -y, 0.0),
                    Vec3::Z,
                    [
                        ix as f32 / grid_x as f32,
                        1.0 - iy as f32 / grid_y as f32,
                    ],
                );
            }
        }

        let row = grid_x + 1;
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = ix + row * iy;
                let b = ix + row * (iy + 1);
                let c = (ix + 1) + row * (iy + 1);
                let d = (ix + 1) + row * iy;
                geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        geometry
    }

    /// Axis-aligned box centered on the origin
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let h = Vec3::new(width, height, depth) / 2.0;
        // (normal, u axis, v axis) per face, u × v = normal
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut geometry = Geometry::default();
        for (normal, u, v) in faces {
            let center = normal * h;
            let du = u * h;
            let dv = v * h;
            let a = geometry.push_vertex(center - du - dv, normal, [0.0, 0.0]);
            let b = geometry.push_vertex(center + du - dv, normal, [1.0, 0.0]);
            let c = geometry.push_vertex(center + du + dv, normal, [1.0, 1.0]);
            let d = geometry.push_vertex(center - du + dv, normal, [0.0, 1.0]);
            geometry.indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
        geometry
    }

    /// Capped cylinder along +Y centered on the origin. A zero top radius
    /// makes a cone; three radial segments make a triangular prism.
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> Self {
        let segments = radial_segments.max(3);
        let half = height / 2.0;
        let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);
        let mut geometry = Geometry::default();

        // Side wall with duplicated seam for UVs
        for i in 0..=segments {
            let u = i as f32 / segments as f32;
            let theta = u * TAU;
            let (sin, cos) = theta.sin_cos();
            let normal = Vec3::new(sin, slope, cos).normalize();
            geometry.push_vertex(
                Vec3::new(radius_top * sin, half, radius_top * cos),
                normal,
                [u, 1.0],
            );
            geometry.push_vertex(
                Vec3::new(radius_bottom * sin, -half, radius_bottom * cos),
                normal,
                [u, 0.0],
            );
        }
        for i in 0..segments {
            let top = i * 2;
            let bottom = top + 1;
            let next_top = top + 2;
            let next_bottom = top + 3;
            geometry
                .indices
                .extend_from_slice(&[top, bottom, next_top, bottom, next_bottom, next_top]);
        }

        for (y, radius, normal) in [(half, radius_top, Vec3::Y), (-half, radius_bottom, Vec3::NEG_Y)] {
            if radius <= 0.0 {
                continue;
            }
            let center = geometry.push_vertex(Vec3::new(0.0, y, 0.0), normal, [0.5, 0.5]);
            let first = geometry.positions.len() as u32;
            for i in 0..segments {
                let theta = i as f32 / segments as f32 * TAU;
                let (sin, cos) = theta.sin_cos();
                geometry.push_vertex(
                    Vec3::new(radius * sin, y, radius * cos),
                    normal,
                    [0.5 + 0.5 * sin, 0.5 + 0.5 * cos],
                );
            }
            for i in 0..segments {
                let a = first + i;
                let b = first + (i + 1) % segments;
                if normal.y > 0.0 {
                    geometry.indices.extend_from_slice(&[center, a, b]);
                } else {
                    geometry.indices.extend_from_slice(&[center, b, a]);
                }
            }
        }
        geometry
    }

    pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Self {
        Self::cylinder(0.0, radius, height, radial_segments)
    }

    /// UV sphere centered on the origin
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        Self::sphere_cap(radius, width_segments, height_segments, PI)
    }

    /// Sphere section from the north pole down to polar angle `theta_length`
    /// (PI = full sphere, PI/2 = dome)
    pub fn sphere_cap(radius: f32, width_segments: u32, height_segments: u32, theta_length: f32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);
        let mut geometry = Geometry::default();

        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            let theta = v * theta_length;
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let phi = u * TAU;
                let normal = Vec3::new(
                    -phi.cos() * theta.sin(),
                    theta.cos(),
                    phi.sin() * theta.sin(),
                );
                geometry.push_vertex(normal * radius, normal, [u, 1.0 - v]);
            }
        }

        let row = ws + 1;
        for iy in 0..hs {
            for ix in 0..ws {
                let a = row * iy + ix + 1;
                let b = row * iy + ix;
                let c = row * (iy + 1) + ix;
                let d = row * (iy + 1) + ix + 1;
                if iy != 0 {
                    geometry.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 || theta_length < PI {
                    geometry.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        geometry
    }

    /// Flat disc in the XY plane facing +Z
    pub fn disc(radius: f32, segments: u32) -> Self {
        Self::ring(0.0, radius, segments)
    }

    /// Annulus in the XY plane facing +Z; a zero inner radius gives a disc
    pub fn ring(inner_radius: f32, outer_radius: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let mut geometry = Geometry::default();
        for i in 0..=segments {
            let theta = i as f32 / segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            for radius in [inner_radius, outer_radius] {
                let uv = [
                    0.5 + 0.5 * cos * radius / outer_radius,
                    0.5 + 0.5 * sin * radius / outer_radius,
                ];
                geometry.push_vertex(Vec3::new(cos * radius, sin * radius, 0.0), Vec3::Z, uv);
            }
        }
        for i in 0..segments {
            let inner = i * 2;
            let (outer, next_inner, next_outer) = (inner + 1, inner + 2, inner + 3);
            geometry
                .indices
                .extend_from_slice(&[inner, outer, next_outer, inner, next_outer, next_inner]);
        }
        geometry
    }

    /// Torus around +Z in the XY plane, swept through `arc` radians from +X
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32, arc: f32) -> Self {
        let radial = radial_segments.max(3);
        let tubular = tubular_segments.max(3);
        let mut geometry = Geometry::default();

        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * arc;
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                geometry.push_vertex(
                    position,
                    (position - center).normalize_or_zero(),
                    [i as f32 / tubular as f32, j as f32 / radial as f32],
                );
            }
        }

        let row = tubular + 1;
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        geometry
    }

    /// Prism from a convex outline in the XY plane, extruded along +Z from
    /// 0 to `depth`. The outline may wind either way.
    pub fn extrude(outline: &[Vec2], depth: f32) -> Self {
        let mut points = outline.to_vec();
        let twice_area: f32 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| a.perp_dot(*b))
            .sum();
        if twice_area < 0.0 {
            points.reverse();
        }

        let mut geometry = Geometry::default();
        let n = points.len() as u32;
        if n < 3 {
            return geometry;
        }

        let (min, max) = points
            .iter()
            .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        let extent = (max - min).max(Vec2::splat(f32::EPSILON));
        let cap_uv = |p: Vec2| {
            let uv = (p - min) / extent;
            [uv.x, uv.y]
        };

        for (z, normal) in [(depth, Vec3::Z), (0.0, Vec3::NEG_Z)] {
            let first = geometry.positions.len() as u32;
            for p in &points {
                geometry.push_vertex(p.extend(z), normal, cap_uv(*p));
            }
            for i in 1..n - 1 {
                if normal.z > 0.0 {
                    geometry.indices.extend_from_slice(&[first, first + i, first + i + 1]);
                } else {
                    geometry.indices.extend_from_slice(&[first, first + i + 1, first + i]);
                }
            }
        }

        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            let edge = b - a;
            let normal = Vec3::new(edge.y, -edge.x, 0.0).normalize_or_zero();
            let len = edge.length();
            let a0 = geometry.push_vertex(a.extend(0.0), normal, [0.0, 0.0]);
            let b0 = geometry.push_vertex(b.extend(0.0), normal, [len, 0.0]);
            let b1 = geometry.push_vertex(b.extend(depth), normal, [len, depth]);
            let a1 = geometry.push_vertex(a.extend(depth), normal, [0.0, depth]);
            geometry.indices.extend_from_slice(&[a0, b0, b1, a0, b1, a1]);
        }
        geometry
    }

    /// Low-poly faceted boulder: a coarse sphere with jittered vertices
    pub fn rock(radius: f32, rng: &mut impl Rng) -> Self {
        const WIDTH: usize = 6;
        const HEIGHT: usize = 4;
        let mut geometry = Self::sphere(radius, WIDTH as u32, HEIGHT as u32);
        let row = WIDTH + 1;

        let jitter: Vec<f32> = (0..geometry.positions.len())
            .map(|_| rng.gen_range(0.75..1.15))
            .collect();
        for (i, p) in geometry.positions.iter_mut().enumerate() {
            // Seam column and pole rings are duplicates; they share one jitter
            // value so the hull stays closed
            let (ring, col) = (i / row, i % row);
            let key = match ring {
                0 => 0,
                r if r == HEIGHT => r * row,
                r => r * row + col % WIDTH,
            };
            *p = (Vec3::from_array(*p) * jitter[key]).to_array();
        }
        geometry.flat_shaded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_layout() {
        let plane = Geometry::plane(80.0, 300.0, 4, 2);
        assert_eq!(plane.vertex_count(), 5 * 3);
        assert_eq!(plane.triangle_count(), 4 * 2 * 2);
        // First vertex is the top-left corner, last is bottom-right
        assert_eq!(plane.positions[0], [-40.0, 150.0, 0.0]);
        assert_eq!(plane.positions[14], [40.0, -150.0, 0.0]);
    }

    #[test]
    fn test_plane_normals_face_up() {
        let mut plane = Geometry::plane(10.0, 10.0, 3, 3);
        plane.normals.clear();
        plane.compute_vertex_normals();
        for n in &plane.normals {
            assert!((Vec3::from_array(*n) - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_tilted_plane_normals() {
        let mut plane = Geometry::plane(10.0, 10.0, 2, 2);
        // Raise z along +x: surface slopes up toward +x, normal tilts toward -x
        for p in &mut plane.positions {
            p[2] = p[0];
        }
        plane.compute_vertex_normals();
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        for n in &plane.normals {
            assert!((Vec3::from_array(*n) - expected).length() < 1e-5);
        }
    }

    #[test]
    fn test_cuboid_outward_winding() {
        let cube = Geometry::cuboid(2.0, 2.0, 2.0);
        assert_eq!(cube.vertex_count(), 24);
        for tri in cube.indices.chunks_exact(3) {
            let p: Vec<Vec3> = tri
                .iter()
                .map(|&i| Vec3::from_array(cube.positions[i as usize]))
                .collect();
            let face = (p[1] - p[0]).cross(p[2] - p[0]);
            let centroid = (p[0] + p[1] + p[2]) / 3.0;
            assert!(face.dot(centroid) > 0.0, "triangle {:?} faces inward", tri);
        }
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut a = Geometry::cuboid(1.0, 1.0, 1.0);
        let b = Geometry::cuboid(1.0, 1.0, 1.0).translated(Vec3::X * 3.0);
        a.merge(&b);
        assert_eq!(a.vertex_count(), 48);
        assert_eq!(*a.indices.iter().max().unwrap(), 47);
    }

    #[test]
    fn test_cone_has_single_cap() {
        let cone = Geometry::cone(1.0, 2.0, 6);
        let cylinder = Geometry::cylinder(1.0, 1.0, 2.0, 6);
        assert!(cone.triangle_count() < cylinder.triangle_count());
    }

    #[test]
    fn test_flat_shading_splits_vertices() {
        let sphere = Geometry::sphere(1.0, 8, 6);
        let flat = sphere.flat_shaded();
        assert_eq!(flat.vertex_count(), sphere.triangle_count() * 3);
    }

    #[test]
    fn test_extrude_is_closed_and_outward() {
        // Clockwise triangle gets reversed
        let outline = [Vec2::new(-1.0, 0.0), Vec2::new(0.0, 2.0), Vec2::new(1.0, 0.0)];
        let prism = Geometry::extrude(&outline, 3.0);
        assert_eq!(prism.triangle_count(), 2 + 3 * 2);

        let centroid = Vec3::new(0.0, 2.0 / 3.0, 1.5);
        for tri in prism.indices.chunks_exact(3) {
            let p: Vec<Vec3> = tri
                .iter()
                .map(|&i| Vec3::from_array(prism.positions[i as usize]))
                .collect();
            let face = (p[1] - p[0]).cross(p[2] - p[0]);
            let mid = (p[0] + p[1] + p[2]) / 3.0;
            assert!(face.dot(mid - centroid) > 0.0);
        }
    }

    #[test]
    fn test_ring_faces_up() {
        let ring = Geometry::ring(12.0, 13.0, 32);
        assert_eq!(ring.triangle_count(), 64);
        let mut recomputed = ring.clone();
        recomputed.compute_vertex_normals();
        for n in &recomputed.normals {
            assert!((Vec3::from_array(*n) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_half_torus_spans_arc() {
        let arch = Geometry::torus(5.0, 0.5, 8, 16, PI);
        let min_y = arch
            .positions
            .iter()
            .map(|p| p[1])
            .fold(f32::MAX, f32::min);
        // A half arc never dips below its own axis
        assert!(min_y > -1e-4);
    }
}
