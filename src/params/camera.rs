//! Camera viewpoints and transition timing.

use glam::Vec3;

/// A fixed viewpoint: eye position and look-at target (meters, world space)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// Short label shown in logs
    pub label: &'static str,

    /// Eye position (meters)
    pub position: Vec3,

    /// Look-at target (meters)
    pub target: Vec3,
}

impl CameraView {
    pub const fn new(label: &'static str, position: Vec3, target: Vec3) -> Self {
        Self {
            label,
            position,
            target,
        }
    }
}

/// The six selectable viewpoints, bound to keys 1-6 in order
pub const CAMERA_VIEWS: [CameraView; 6] = [
    // Downstream postcard view, whole bridge in frame
    CameraView::new(
        "postcard",
        Vec3::new(-30.0, 20.0, 80.0),
        Vec3::new(0.0, 8.0, 0.0),
    ),
    CameraView::new(
        "square",
        Vec3::new(-60.0, 15.0, 5.0),
        Vec3::new(0.0, 10.0, 0.0),
    ),
    CameraView::new(
        "bazaar",
        Vec3::new(70.0, 12.0, -10.0),
        Vec3::new(0.0, 10.0, 0.0),
    ),
    CameraView::new("aerial", Vec3::new(0.0, 80.0, 60.0), Vec3::new(0.0, 5.0, 0.0)),
    CameraView::new(
        "deck",
        Vec3::new(-40.0, 15.0, 2.0),
        Vec3::new(40.0, 12.0, 0.0),
    ),
    CameraView::new(
        "monument",
        Vec3::new(-70.0, 20.0, 20.0),
        Vec3::new(-80.0, 15.0, 0.0),
    ),
];

/// Camera transition and projection parameters
#[derive(Debug, Clone)]
pub struct CameraTransition {
    /// Duration of a preset-to-preset move (seconds)
    pub duration_s: f32,

    /// Starting eye position before any preset is chosen (meters)
    pub initial_position: Vec3,

    /// Starting look-at target (meters)
    pub initial_target: Vec3,
}

impl Default for CameraTransition {
    fn default() -> Self {
        Self {
            duration_s: 2.0,
            initial_position: Vec3::new(-30.0, 25.0, 80.0),
            initial_target: Vec3::new(0.0, 8.0, 0.0),
        }
    }
}

/// Mouse orbit around the look-at target
#[derive(Debug, Clone)]
pub struct OrbitParams {
    /// Fraction of the pending rotation applied each frame; the rest decays
    pub damping: f32,

    /// Closest eye-to-target distance (meters)
    pub min_distance_m: f32,

    /// Farthest eye-to-target distance (meters)
    pub max_distance_m: f32,

    /// Largest angle between the view offset and +Y (radians); keeps the eye
    /// just above the horizon
    pub max_polar_rad: f32,

    /// Full turn per viewport height of drag
    pub rotate_speed: f32,

    /// Distance factor per wheel step toward the target
    pub zoom_step: f32,
}

impl Default for OrbitParams {
    fn default() -> Self {
        Self {
            damping: 0.05,
            min_distance_m: 15.0,
            max_distance_m: 250.0,
            max_polar_rad: std::f32::consts::PI / 2.05,
            rotate_speed: 1.0,
            zoom_step: 0.95,
        }
    }
}
