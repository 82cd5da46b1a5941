//! Scene assembly, camera moves and keyboard toggles through the public API.

use glam::Vec3;
use winit::keyboard::KeyCode;

use stonebridge::camera::CameraSystem;
use stonebridge::interaction::{Action, SceneState};
use stonebridge::objects::{build_diorama, sway_trees, BridgeLayout, PierKind, BRIDGE};
use stonebridge::params::{CameraTransition, TimeOfDay, WaterParams, CAMERA_VIEWS};
use stonebridge::scene::TextureKind;
use stonebridge::textures::TextureSet;

#[test]
fn river_piers_stand_inside_the_channel() {
    let water = WaterParams::default();
    let layout = BridgeLayout::new();
    let river_piers: Vec<_> = layout
        .piers
        .iter()
        .filter(|pier| pier.kind == PierKind::River)
        .collect();

    assert_eq!(river_piers.len(), 3);
    for pier in river_piers {
        assert!(pier.center_x().abs() < water.half_width_m);
    }
}

#[test]
fn every_visible_mesh_has_finite_placement() {
    let diorama = build_diorama(&WaterParams::default().with_segments(8), 5);
    let scene = &diorama.scene;
    assert!(scene.find_by_name(BRIDGE).is_some());

    let visible = scene.visible_meshes();
    assert!(visible.len() > 50);
    for (_, world) in visible {
        assert!(world.is_finite());
    }
}

#[test]
fn textured_materials_reference_generated_maps() {
    let diorama = build_diorama(&WaterParams::default().with_segments(8), 5);
    let textures = TextureSet::generate(5);

    let used: Vec<TextureKind> = diorama
        .scene
        .mesh_nodes()
        .filter_map(|(_, mesh)| mesh.material.texture)
        .collect();
    for kind in TextureKind::ALL {
        assert!(used.contains(&kind), "{kind:?} is never used");
        assert!(textures.get(kind).width() > 0);
    }
}

#[test]
fn trees_sway_over_time() {
    let mut diorama = build_diorama(&WaterParams::default().with_segments(4), 5);
    let first = diorama.scene.node(diorama.trees).children()[0];

    sway_trees(&mut diorama.scene, diorama.trees, 0.0);
    let still = diorama.scene.node(first).transform.rotation;
    sway_trees(&mut diorama.scene, diorama.trees, 4.0);
    assert_ne!(diorama.scene.node(first).transform.rotation, still);
}

#[test]
fn key_presses_drive_camera_and_toggles() {
    let mut camera = CameraSystem::new(&CameraTransition::default());
    let mut state = SceneState::default();

    for key in [KeyCode::Digit4, KeyCode::KeyT, KeyCode::KeyW, KeyCode::KeyF] {
        let action = Action::from_key(key).unwrap();
        assert!(state.apply(action, &mut camera));
    }
    assert_eq!(state.time_of_day, TimeOfDay::Sunset);
    assert!(!state.water_flowing);
    assert!(!state.fog_enabled);
    assert!(camera.is_transitioning());

    // Two seconds of 60 Hz frames lands on the aerial view
    for _ in 0..121 {
        camera.update(1.0 / 60.0);
    }
    assert!(!camera.is_transitioning());
    assert!((camera.position() - CAMERA_VIEWS[3].position).length() < 1e-4);
    assert_eq!(camera.target(), CAMERA_VIEWS[3].target);

    assert!(!state.apply(Action::Quit, &mut camera));
    assert!(Action::from_key(KeyCode::KeyZ).is_none());
}

#[test]
fn interrupted_transition_starts_from_current_pose() {
    let mut camera = CameraSystem::new(&CameraTransition::default());
    camera.transition_to(0);
    camera.update(1.0);
    let midway = camera.position();

    camera.transition_to(4);
    camera.update(0.0);
    assert!((camera.position() - midway).length() < 1e-5);
    assert_ne!(midway, Vec3::new(-30.0, 25.0, 80.0));
}
