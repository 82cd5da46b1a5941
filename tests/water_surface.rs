//! River surface driven through a full diorama, frame by frame.

use stonebridge::objects::build_diorama;
use stonebridge::params::WaterParams;
use stonebridge::scene::SceneGraph;
use stonebridge::water::{SurfaceUpdate, SurfaceUpdater, WaveField, WATER_SURFACE_NAME};

fn surface(scene: &SceneGraph) -> Vec<[f32; 3]> {
    scene
        .mesh_by_name(WATER_SURFACE_NAME)
        .map(|mesh| mesh.geometry.positions.clone())
        .unwrap_or_default()
}

fn run(params: &WaterParams, frames: usize) -> Vec<[f32; 3]> {
    let mut diorama = build_diorama(params, 3);
    let mut updater = SurfaceUpdater::new(WaveField::river(), params.clone());
    for frame in 0..frames {
        updater.update(&mut diorama.scene, frame as f32 / 60.0);
    }
    surface(&diorama.scene)
}

#[test]
fn first_frame_leaves_the_surface_at_rest() {
    let params = WaterParams::default().with_segments(12);
    let mut diorama = build_diorama(&params, 3);
    let rest = surface(&diorama.scene);

    let mut updater = SurfaceUpdater::new(WaveField::river(), params.clone());
    let outcome = updater.update(&mut diorama.scene, 0.0);

    assert_eq!(
        outcome,
        SurfaceUpdate::SnapshotCaptured {
            vertices: params.vertex_count()
        }
    );
    assert_eq!(surface(&diorama.scene), rest);
}

#[test]
fn independent_runs_agree() {
    let params = WaterParams::default().with_segments(16);
    assert_eq!(run(&params, 45), run(&params, 45));
}

#[test]
fn banks_stay_pinned_while_the_channel_moves() {
    let params = WaterParams::default().with_segments(20);
    let positions = run(&params, 90);

    let mut moved = 0;
    for [x, _, z] in positions {
        if x.abs() >= params.half_width_m - 1e-4 {
            assert!(z.abs() < 1e-6, "bank vertex at x = {x} displaced to {z}");
        } else if z.abs() > 1e-3 {
            moved += 1;
        }
    }
    assert!(moved > 0);
}

#[test]
fn pausing_freezes_the_surface() {
    let params = WaterParams::default().with_segments(10);
    let mut diorama = build_diorama(&params, 3);
    let mut updater = SurfaceUpdater::new(WaveField::river(), params);

    updater.update(&mut diorama.scene, 0.0);
    updater.update(&mut diorama.scene, 1.0);
    let frozen = surface(&diorama.scene);

    // The driver stops calling the updater while paused; a later frame picks
    // up at the wall-clock time it is given
    assert_eq!(surface(&diorama.scene), frozen);
    updater.update(&mut diorama.scene, 4.0);
    assert_ne!(surface(&diorama.scene), frozen);

    let mesh = diorama.scene.mesh_by_name(WATER_SURFACE_NAME).unwrap();
    assert_eq!(mesh.material.surface_time(), Some(4.0));
}

#[test]
fn displaced_normals_stay_unit_length() {
    let params = WaterParams::default().with_segments(24);
    let mut diorama = build_diorama(&params, 3);
    let mut updater = SurfaceUpdater::new(WaveField::river(), params);
    updater.update(&mut diorama.scene, 0.0);
    updater.update(&mut diorama.scene, 2.5);

    let mesh = diorama.scene.mesh_by_name(WATER_SURFACE_NAME).unwrap();
    assert!(mesh.geometry.needs_upload);
    for [x, y, z] in &mesh.geometry.normals {
        let len = (x * x + y * y + z * z).sqrt();
        assert!((len - 1.0).abs() < 1e-4);
        assert!(*z > 0.5, "normal tipped over: {z}");
    }
}
