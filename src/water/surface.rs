//! Per-frame river surface deformation.
//!
//! Every frame the updater evaluates the wave field at each vertex's rest
//! position, adds pier turbulence, swell and the channel dip, writes the
//! result as the vertex height and recomputes normals. Heights are always
//! derived from the rest snapshot, never from the previous frame.

use glam::Vec2;
use rayon::prelude::*;

use super::waves::WaveField;
use crate::params::{PierObstruction, WaterParams};
use crate::scene::{Geometry, SceneGraph};

/// Scene-graph name of the deformed water mesh
pub const WATER_SURFACE_NAME: &str = "WaterSurface";

/// Cubic Hermite ramp from `edge0` to `edge1`. Reversed edges give a
/// falling ramp.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let u = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    u * u * (3.0 - 2.0 * u)
}

/// Lateral distance to the nearer bank (meters)
pub fn bank_distance(x: f32, half_width: f32) -> f32 {
    (x + half_width).abs().min((x - half_width).abs())
}

/// Wave attenuation near the banks: 0 at the edge, 1 once a full band in
pub fn bank_fade(params: &WaterParams, x: f32) -> f32 {
    smoothstep(0.0, params.bank_fade_band_m, bank_distance(x, params.half_width_m))
}

/// Static lowering of the channel center, zero at the banks
pub fn channel_dip(params: &WaterParams, x: f32) -> f32 {
    -smoothstep(0.0, params.center_dip_band_m, bank_distance(x, params.half_width_m))
        * params.center_dip_m
}

/// How strongly one pier disturbs the water at (x, y). Zero outside the pier
/// radius or the bridge band.
pub fn pier_intensity(pier: &PierObstruction, bridge_band_m: f32, x: f32, y: f32) -> f32 {
    let pier_dist = (x - pier.x_m).abs();
    if y.abs() >= bridge_band_m || pier_dist >= pier.radius_m {
        return 0.0;
    }
    (1.0 - pier_dist / pier.radius_m) * smoothstep(bridge_band_m, 0.0, y.abs())
}

/// Summed pier turbulence at (x, y): standing waves piling up on the upstream
/// face (y < 0) and a V-shaped wake downstream. `t` is scaled time.
pub fn pier_disturbance(params: &WaterParams, x: f32, y: f32, t: f32) -> f32 {
    if y.abs() >= params.bridge_band_m {
        return 0.0;
    }

    let mut z = 0.0;
    for pier in &params.piers {
        let intensity = pier_intensity(pier, params.bridge_band_m, x, y);
        if intensity <= 0.0 {
            continue;
        }

        if y < 0.0 {
            z += 0.18 * intensity * (y * 1.5 + t * 2.8).sin();
            z += 0.07 * intensity * (y * 3.0 + t * 4.2).cos();
        } else {
            z += 0.12 * intensity * (x * 2.5 + t * 4.5).sin();
            z += 0.08 * intensity * (y * 1.8 - t * 3.5).cos();
            z += 0.05 * intensity * (x * 1.5 + y * 2.0 + t * 5.5).sin();

            let pier_dist = (x - pier.x_m).abs();
            let wake_spread = y * 0.12;
            if pier_dist > 1.0 && pier_dist < wake_spread + 3.0 {
                z += 0.03 * (y * 0.8 - t * 2.2).sin() * intensity;
            }
        }
    }
    z
}

/// Slow large-scale swell, already attenuated by `fade`
pub fn background_swell(x: f32, y: f32, t: f32, fade: f32) -> f32 {
    (y * 0.01 + t * 0.18).sin() * 0.10 * fade
        + (x * 0.02 + y * 0.005 + t * 0.14).cos() * 0.04 * fade
}

/// Rest-state data for one vertex, fixed once captured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestSample {
    /// Undisplaced surface-plane coordinate
    pub position: Vec2,

    /// Height the vertex had when captured
    pub rest_height: f32,

    pub bank_fade: f32,
    pub channel_dip: f32,
}

/// Undisplaced positions of every surface vertex, with the terms that depend
/// only on rest position precomputed
#[derive(Debug, Clone, PartialEq)]
pub struct RestSnapshot {
    samples: Vec<RestSample>,
}

impl RestSnapshot {
    pub fn capture(positions: &[[f32; 3]], params: &WaterParams) -> Self {
        let samples = positions
            .iter()
            .map(|&[x, y, z]| RestSample {
                position: Vec2::new(x, y),
                rest_height: z,
                bank_fade: bank_fade(params, x),
                channel_dip: channel_dip(params, x),
            })
            .collect();
        Self { samples }
    }

    pub fn samples(&self) -> &[RestSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// What a single update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceUpdate {
    /// No mesh with the target name in the scene
    MissingTarget,

    /// Target mesh has no vertex positions
    MissingGeometry,

    /// Elapsed time was NaN or infinite; frame skipped
    NonFiniteTime,

    /// Rest positions recorded, geometry left untouched
    SnapshotCaptured { vertices: usize },

    Displaced { vertices: usize },
}

/// Drives the river surface once per frame
#[derive(Debug, Clone)]
pub struct SurfaceUpdater {
    field: WaveField,
    params: WaterParams,
    target: String,
    surface_time: f32,
    warned_non_finite: bool,
}

impl SurfaceUpdater {
    pub fn new(field: WaveField, params: WaterParams) -> Self {
        Self {
            field,
            params,
            target: WATER_SURFACE_NAME.to_string(),
            surface_time: 0.0,
            warned_non_finite: false,
        }
    }

    /// Retarget the updater at a differently named mesh
    pub fn with_target(mut self, name: impl Into<String>) -> Self {
        self.target = name.into();
        self
    }

    pub fn params(&self) -> &WaterParams {
        &self.params
    }

    pub fn field(&self) -> &WaveField {
        &self.field
    }

    /// Last surface time written to the water material (seconds)
    pub fn surface_time(&self) -> f32 {
        self.surface_time
    }

    /// Full surface height at rest position (x, y) for wall-clock `elapsed`
    pub fn height_at(&self, x: f32, y: f32, elapsed: f32) -> f32 {
        let sample = RestSample {
            position: Vec2::new(x, y),
            rest_height: 0.0,
            bank_fade: bank_fade(&self.params, x),
            channel_dip: channel_dip(&self.params, x),
        };
        self.sample_height(&sample, elapsed * self.params.time_scale)
    }

    fn sample_height(&self, sample: &RestSample, t: f32) -> f32 {
        let Vec2 { x, y } = sample.position;
        let mut z = self.field.height(x, y, t) * sample.bank_fade;
        z += pier_disturbance(&self.params, x, y, t);
        z += background_swell(x, y, t, sample.bank_fade);
        z + sample.channel_dip
    }

    /// Advance the surface clock and deform the target mesh.
    ///
    /// The material's surface time follows `elapsed` whenever the mesh exists,
    /// even on the snapshot frame.
    pub fn update(&mut self, scene: &mut SceneGraph, elapsed: f32) -> SurfaceUpdate {
        if !elapsed.is_finite() {
            if !self.warned_non_finite {
                log::warn!("Skipping water frame with non-finite time {elapsed}");
                self.warned_non_finite = true;
            }
            return SurfaceUpdate::NonFiniteTime;
        }

        let Some(mesh) = scene.mesh_by_name_mut(&self.target) else {
            return SurfaceUpdate::MissingTarget;
        };
        if let Some(time) = mesh.material.surface_time_mut() {
            *time = elapsed;
        }
        self.surface_time = elapsed;

        self.displace(&mut mesh.geometry, elapsed)
    }

    /// Deform one geometry from its rest snapshot. The first call (or a call
    /// after the vertex count changed) only captures the snapshot.
    pub fn displace(&self, geometry: &mut Geometry, elapsed: f32) -> SurfaceUpdate {
        if geometry.positions.is_empty() {
            return SurfaceUpdate::MissingGeometry;
        }

        let vertices = geometry.positions.len();
        if geometry.rest.as_ref().map(RestSnapshot::len) != Some(vertices) {
            geometry.rest = Some(RestSnapshot::capture(&geometry.positions, &self.params));
            log::debug!("Captured water rest snapshot ({vertices} vertices)");
            return SurfaceUpdate::SnapshotCaptured { vertices };
        }

        let t = elapsed * self.params.time_scale;
        let Geometry {
            positions,
            rest: Some(rest),
            ..
        } = geometry
        else {
            return SurfaceUpdate::MissingGeometry;
        };

        positions
            .par_iter_mut()
            .zip(rest.samples.par_iter())
            .for_each(|(position, sample)| position[2] = self.sample_height(sample, t));

        geometry.needs_upload = true;
        geometry.compute_vertex_normals();
        SurfaceUpdate::Displaced { vertices }
    }

    /// Put the target mesh back at rest and forget its snapshot
    pub fn reset(&mut self, scene: &mut SceneGraph) {
        self.surface_time = 0.0;
        if let Some(mesh) = scene.mesh_by_name_mut(&self.target) {
            if let Some(time) = mesh.material.surface_time_mut() {
                *time = 0.0;
            }
            Self::restore_rest(&mut mesh.geometry);
        }
    }

    fn restore_rest(geometry: &mut Geometry) {
        let Some(rest) = geometry.rest.take() else {
            return;
        };
        if rest.len() != geometry.positions.len() {
            return;
        }
        for (position, sample) in geometry.positions.iter_mut().zip(rest.samples()) {
            position[2] = sample.rest_height;
        }
        geometry.needs_upload = true;
        geometry.compute_vertex_normals();
    }
}

impl Default for SurfaceUpdater {
    fn default() -> Self {
        Self::new(WaveField::river(), WaterParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, SceneNode};

    fn river_scene(segments: u32) -> SceneGraph {
        let params = WaterParams::default();
        let mut scene = SceneGraph::new();
        scene.insert(
            None,
            SceneNode::group("Water").with_child(SceneNode::mesh(
                WATER_SURFACE_NAME,
                Geometry::plane(params.width_m(), params.length_m, segments, segments),
                Material::water(0x0B3D6B, 0.92),
            )),
        );
        scene
    }

    fn surface_positions(scene: &SceneGraph) -> Vec<[f32; 3]> {
        scene
            .mesh_by_name(WATER_SURFACE_NAME)
            .map(|mesh| mesh.geometry.positions.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_smoothstep_shape() {
        assert_eq!(smoothstep(0.0, 14.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 14.0, 0.0), 0.0);
        assert_eq!(smoothstep(0.0, 14.0, 7.0), 0.5);
        assert_eq!(smoothstep(0.0, 14.0, 14.0), 1.0);
        assert_eq!(smoothstep(0.0, 14.0, 30.0), 1.0);
        // Reversed edges fall instead of rise
        assert_eq!(smoothstep(25.0, 0.0, 0.0), 1.0);
        assert_eq!(smoothstep(25.0, 0.0, 25.0), 0.0);
    }

    #[test]
    fn test_bank_fade_boundary() {
        let params = WaterParams::default();
        assert_eq!(bank_fade(&params, 40.0), 0.0);
        assert_eq!(bank_fade(&params, -40.0), 0.0);
        assert_eq!(bank_fade(&params, 26.0), 1.0);
        assert_eq!(bank_fade(&params, -26.0), 1.0);
        assert_eq!(bank_fade(&params, 0.0), 1.0);
        assert!(bank_fade(&params, 33.0) > 0.0 && bank_fade(&params, 33.0) < 1.0);
    }

    #[test]
    fn test_bank_edge_is_flat() {
        // Fade, swell and dip all vanish at the edge
        let updater = SurfaceUpdater::default();
        for &t in &[0.0, 1.7, 42.0] {
            for &y in &[-120.0, -60.0, 80.0, 140.0] {
                assert_eq!(updater.height_at(40.0, y, t), 0.0);
                assert_eq!(updater.height_at(-40.0, y, t), 0.0);
            }
        }
    }

    #[test]
    fn test_channel_dip() {
        let params = WaterParams::default();
        assert_eq!(channel_dip(&params, 40.0), 0.0);
        assert!((channel_dip(&params, 0.0) + 0.06).abs() < 1e-7);
    }

    #[test]
    fn test_pier_intensity_just_upstream() {
        let params = WaterParams::default();
        let pier = params.piers[1];
        assert_eq!(pier.x_m, -8.0);
        let intensity = pier_intensity(&pier, params.bridge_band_m, -8.0, -1.0);
        assert!(intensity > 0.99);
        assert!((intensity - 0.9953).abs() < 1e-3);
    }

    #[test]
    fn test_pier_effects_are_local() {
        let params = WaterParams::default();
        // Outside the bridge band
        assert_eq!(pier_disturbance(&params, -8.0, 30.0, 3.0), 0.0);
        assert_eq!(pier_disturbance(&params, -8.0, -25.0, 3.0), 0.0);
        // Halfway between adjacent piers is exactly one radius from both
        assert_eq!(pier_intensity(&params.piers[1], 25.0, 0.0, 2.0), 0.0);
        assert_eq!(pier_intensity(&params.piers[2], 25.0, 0.0, 2.0), 0.0);
        // Mirrored offsets from mirrored piers match
        let left = pier_intensity(&params.piers[0], 25.0, -21.0, 2.0);
        let right = pier_intensity(&params.piers[3], 25.0, 21.0, 2.0);
        assert_eq!(left, right);
        assert!(left > 0.0);
    }

    fn upstream_terms(i: f32, y: f32, t: f32) -> f32 {
        0.18 * i * (1.5 * y + 2.8 * t).sin() + 0.07 * i * (3.0 * y + 4.2 * t).cos()
    }

    fn downstream_terms(i: f32, x: f32, y: f32, t: f32) -> f32 {
        0.12 * i * (2.5 * x + 4.5 * t).sin()
            + 0.08 * i * (1.8 * y - 3.5 * t).cos()
            + 0.05 * i * (1.5 * x + 2.0 * y + 5.5 * t).sin()
    }

    fn wake_term(i: f32, y: f32, t: f32) -> f32 {
        0.03 * (0.8 * y - 2.2 * t).sin() * i
    }

    #[test]
    fn test_upstream_standing_waves() {
        let params = WaterParams::default();
        let t = 1.5;
        // On the x = -8 centerline, one unit upstream: u = 0.96
        let i = 0.96_f32 * 0.96 * (3.0 - 2.0 * 0.96);
        assert!((i - 0.995_328).abs() < 1e-6);
        let expected = upstream_terms(i, -1.0, t);
        assert!(expected.abs() > 0.01);
        assert!((pier_disturbance(&params, -8.0, -1.0, t) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_pier_face_switches_at_zero() {
        let params = WaterParams::default();
        let t = 0.7;
        // y = 0 already counts as downstream; pd = 0 leaves the wake out
        let expected = downstream_terms(1.0, -8.0, 0.0, t);
        assert!((pier_disturbance(&params, -8.0, 0.0, t) - expected).abs() < 1e-6);
        assert!((expected - upstream_terms(1.0, 0.0, t)).abs() > 1e-3);
    }

    #[test]
    fn test_downstream_wake_inside_envelope() {
        let params = WaterParams::default();
        let t = 1.5;
        // pd = 4 < 20 * 0.12 + 3 = 5.4; intensity (1 - 4/8) * smoothstep(25, 0, 20)
        let i = 0.5 * (0.2_f32 * 0.2 * (3.0 - 2.0 * 0.2));
        assert!((i - 0.052).abs() < 1e-6);
        let expected = downstream_terms(i, -4.0, 20.0, t) + wake_term(i, 20.0, t);
        assert!(wake_term(i, 20.0, t).abs() > 1e-4);
        assert!((pier_disturbance(&params, -4.0, 20.0, t) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_wake_excluded_past_envelope() {
        let params = WaterParams::default();
        let t = 1.5;
        // pd = 6 > 10 * 0.12 + 3 = 4.2
        let i = pier_intensity(&params.piers[1], params.bridge_band_m, -2.0, 10.0);
        assert!(i > 0.0);
        assert!(wake_term(i, 10.0, t).abs() > 1e-4);
        let expected = downstream_terms(i, -2.0, 10.0, t);
        assert!((pier_disturbance(&params, -2.0, 10.0, t) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_wake_excluded_at_unit_distance() {
        let params = WaterParams::default();
        let t = 1.5;
        // pd = 1 exactly sits on the open lower bound
        let i = pier_intensity(&params.piers[1], params.bridge_band_m, -7.0, 10.0);
        assert!(wake_term(i, 10.0, t).abs() > 1e-4);
        let expected = downstream_terms(i, -7.0, 10.0, t);
        assert!((pier_disturbance(&params, -7.0, 10.0, t) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_overlapping_piers_accumulate() {
        let mut single = WaterParams::default();
        single.piers.truncate(1);
        let mut doubled = single.clone();
        doubled.piers.push(single.piers[0]);

        let (x, y, t) = (-23.0, 4.0, 2.5);
        let one = pier_disturbance(&single, x, y, t);
        let two = pier_disturbance(&doubled, x, y, t);
        assert!(one != 0.0);
        assert!((two - 2.0 * one).abs() < 1e-6);
    }

    #[test]
    fn test_first_call_only_captures() {
        let mut scene = river_scene(8);
        let before = surface_positions(&scene);
        let mut updater = SurfaceUpdater::default();

        let outcome = updater.update(&mut scene, 0.0);
        assert_eq!(outcome, SurfaceUpdate::SnapshotCaptured { vertices: 81 });
        assert_eq!(surface_positions(&scene), before);

        let mesh = scene.mesh_by_name(WATER_SURFACE_NAME).unwrap();
        assert!(!mesh.geometry.needs_upload);
        assert_eq!(mesh.geometry.rest.as_ref().map(RestSnapshot::len), Some(81));
    }

    #[test]
    fn test_surface_time_advances_on_snapshot_frame() {
        let mut scene = river_scene(4);
        let mut updater = SurfaceUpdater::default();
        updater.update(&mut scene, 1.25);
        let mesh = scene.mesh_by_name(WATER_SURFACE_NAME).unwrap();
        assert_eq!(mesh.material.surface_time(), Some(1.25));
        assert_eq!(updater.surface_time(), 1.25);
    }

    #[test]
    fn test_no_drift() {
        let mut scene = river_scene(16);
        let mut updater = SurfaceUpdater::default();
        updater.update(&mut scene, 0.0);

        let mut frame_n = Vec::new();
        for frame in 1..=30 {
            let outcome = updater.update(&mut scene, frame as f32 / 60.0);
            assert_eq!(outcome, SurfaceUpdate::Displaced { vertices: 17 * 17 });
            frame_n = surface_positions(&scene);
        }

        updater.update(&mut scene, 30.0 / 60.0);
        assert_eq!(surface_positions(&scene), frame_n);
    }

    #[test]
    fn test_displacement_matches_height_at() {
        let mut scene = river_scene(10);
        let mut updater = SurfaceUpdater::default();
        updater.update(&mut scene, 0.0);
        updater.update(&mut scene, 3.0);

        let mesh = scene.mesh_by_name(WATER_SURFACE_NAME).unwrap();
        assert!(mesh.geometry.needs_upload);
        for p in &mesh.geometry.positions {
            assert_eq!(p[2], updater.height_at(p[0], p[1], 3.0));
        }
        // Deformed surface no longer has uniform normals
        let tilted = mesh.geometry.normals.iter().filter(|n| n[2] < 0.999_999).count();
        assert!(tilted > 0);
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let mut scene = SceneGraph::new();
        let mut updater = SurfaceUpdater::default();
        assert_eq!(updater.update(&mut scene, 1.0), SurfaceUpdate::MissingTarget);
        assert_eq!(updater.surface_time(), 0.0);

        let mut scene = river_scene(2);
        let mut updater = SurfaceUpdater::default().with_target("Lake");
        assert_eq!(updater.update(&mut scene, 1.0), SurfaceUpdate::MissingTarget);
    }

    #[test]
    fn test_missing_geometry_is_skipped() {
        let mut scene = SceneGraph::new();
        scene.insert(
            None,
            SceneNode::mesh(
                WATER_SURFACE_NAME,
                Geometry::default(),
                Material::water(0x0B3D6B, 0.92),
            ),
        );
        let mut updater = SurfaceUpdater::default();
        assert_eq!(updater.update(&mut scene, 1.0), SurfaceUpdate::MissingGeometry);
        assert_eq!(updater.update(&mut scene, 2.0), SurfaceUpdate::MissingGeometry);
    }

    #[test]
    fn test_non_finite_time_skips_frame() {
        let mut scene = river_scene(4);
        let mut updater = SurfaceUpdater::default();
        updater.update(&mut scene, 0.0);
        updater.update(&mut scene, 0.5);
        let before = surface_positions(&scene);

        assert_eq!(updater.update(&mut scene, f32::NAN), SurfaceUpdate::NonFiniteTime);
        assert_eq!(updater.update(&mut scene, f32::INFINITY), SurfaceUpdate::NonFiniteTime);
        assert_eq!(surface_positions(&scene), before);
        assert_eq!(updater.surface_time(), 0.5);
    }

    #[test]
    fn test_resolution_change_recaptures() {
        let mut scene = river_scene(4);
        let mut updater = SurfaceUpdater::default();
        updater.update(&mut scene, 0.0);
        updater.update(&mut scene, 1.0);

        let params = WaterParams::default();
        if let Some(mesh) = scene.mesh_by_name_mut(WATER_SURFACE_NAME) {
            let rest = mesh.geometry.rest.take();
            mesh.geometry = Geometry::plane(params.width_m(), params.length_m, 6, 6);
            mesh.geometry.rest = rest;
        }
        assert_eq!(
            updater.update(&mut scene, 2.0),
            SurfaceUpdate::SnapshotCaptured { vertices: 49 }
        );
    }

    #[test]
    fn test_reset_restores_rest_heights() {
        let mut scene = river_scene(6);
        let rest = surface_positions(&scene);
        let mut updater = SurfaceUpdater::default();
        updater.update(&mut scene, 0.0);
        updater.update(&mut scene, 4.0);
        assert_ne!(surface_positions(&scene), rest);

        updater.reset(&mut scene);
        assert_eq!(surface_positions(&scene), rest);
        assert_eq!(updater.surface_time(), 0.0);
        assert!(matches!(
            updater.update(&mut scene, 5.0),
            SurfaceUpdate::SnapshotCaptured { .. }
        ));
    }
}
