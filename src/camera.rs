//! Preset viewpoints with eased transitions between them, and a damped mouse
//! orbit around the current target.

use glam::{Mat4, Vec3};

use crate::params::{CameraTransition, CameraView, OrbitParams, RenderConfig, CAMERA_VIEWS};

/// Cubic ease-in-out on [0, 1]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    start_position: Vec3,
    end_position: Vec3,
    start_target: Vec3,
    end_target: Vec3,

    /// Fraction complete in [0, 1]
    progress: f32,
}

/// Pending rotation below this is dropped (radians)
const ORBIT_EPSILON: f32 = 1e-5;

/// Polar angle floor; keeps the offset off the +Y pole
const MIN_POLAR: f32 = 1e-6;

/// Offset from `target` at the given distance, azimuth about +Y (from +Z)
/// and polar angle from +Y
fn spherical_offset(radius: f32, azimuth: f32, polar: f32) -> Vec3 {
    Vec3::new(
        radius * polar.sin() * azimuth.sin(),
        radius * polar.cos(),
        radius * polar.sin() * azimuth.cos(),
    )
}

/// Camera eye and look-at target. Eased transitions move between the fixed
/// viewpoints; between transitions the mouse orbits the eye around the target.
pub struct CameraSystem {
    position: Vec3,
    target: Vec3,
    duration_s: f32,
    transition: Option<Transition>,
    orbit: OrbitParams,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_zoom: f32,
}

impl CameraSystem {
    pub fn new(params: &CameraTransition) -> Self {
        Self {
            position: params.initial_position,
            target: params.initial_target,
            duration_s: params.duration_s,
            transition: None,
            orbit: OrbitParams::default(),
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_zoom: 1.0,
        }
    }

    pub fn with_orbit(mut self, orbit: OrbitParams) -> Self {
        self.orbit = orbit;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Angle between the eye offset and +Y (radians)
    pub fn polar_angle(&self) -> f32 {
        let offset = self.position - self.target;
        (offset.y / offset.length().max(f32::EPSILON))
            .clamp(-1.0, 1.0)
            .acos()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Start moving toward viewpoint `index` (0-based) from wherever the
    /// camera is now. Unknown indices are ignored.
    pub fn transition_to(&mut self, index: usize) -> Option<&'static CameraView> {
        let view = CAMERA_VIEWS.get(index)?;
        self.transition = Some(Transition {
            start_position: self.position,
            end_position: view.position,
            start_target: self.target,
            end_target: view.target,
            progress: 0.0,
        });
        self.clear_orbit();
        Some(view)
    }

    /// Place the camera on a viewpoint immediately
    pub fn jump_to(&mut self, index: usize) -> Option<&'static CameraView> {
        let view = CAMERA_VIEWS.get(index)?;
        self.position = view.position;
        self.target = view.target;
        self.transition = None;
        self.clear_orbit();
        Some(view)
    }

    /// Queue a drag of (`dx`, `dy`) pixels. A drag of one viewport height
    /// turns the eye a full circle. Ignored while a transition runs.
    pub fn orbit(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if self.is_transitioning() {
            return;
        }
        let per_pixel = std::f32::consts::TAU * self.orbit.rotate_speed / viewport_height.max(1.0);
        self.pending_yaw -= dx * per_pixel;
        self.pending_pitch -= dy * per_pixel;
    }

    /// Queue wheel steps; positive steps move toward the target
    pub fn zoom(&mut self, steps: f32) {
        if self.is_transitioning() || !steps.is_finite() {
            return;
        }
        self.pending_zoom *= self.orbit.zoom_step.powf(steps);
    }

    fn clear_orbit(&mut self) {
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        self.pending_zoom = 1.0;
    }

    /// Advance any running transition by `dt_s` seconds, otherwise apply one
    /// damped orbit step
    pub fn update(&mut self, dt_s: f32) {
        let Some(mut transition) = self.transition else {
            self.step_orbit();
            return;
        };

        transition.progress += dt_s / self.duration_s.max(f32::EPSILON);
        let done = transition.progress >= 1.0;
        transition.progress = transition.progress.min(1.0);

        let t = ease_in_out_cubic(transition.progress);
        self.position = transition.start_position.lerp(transition.end_position, t);
        self.target = transition.start_target.lerp(transition.end_target, t);
        self.transition = if done { None } else { Some(transition) };
    }

    /// Rotation is applied a damping fraction per frame and the remainder
    /// carried over. Zoom lands at once. Distance and polar limits hold after
    /// every step.
    fn step_orbit(&mut self) {
        let rotating =
            self.pending_yaw.abs() > ORBIT_EPSILON || self.pending_pitch.abs() > ORBIT_EPSILON;
        if !rotating && self.pending_zoom == 1.0 {
            self.clear_orbit();
            return;
        }

        let offset = self.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            self.clear_orbit();
            return;
        }

        let damping = if self.orbit.damping > 0.0 {
            self.orbit.damping.min(1.0)
        } else {
            1.0
        };
        let azimuth = offset.x.atan2(offset.z) + self.pending_yaw * damping;
        let polar = self.polar_angle() + self.pending_pitch * damping;
        let polar = polar.clamp(MIN_POLAR, self.orbit.max_polar_rad);
        let radius = (radius * self.pending_zoom)
            .clamp(self.orbit.min_distance_m, self.orbit.max_distance_m);

        self.pending_yaw *= 1.0 - damping;
        self.pending_pitch *= 1.0 - damping;
        self.pending_zoom = 1.0;

        self.position = self.target + spherical_offset(radius, azimuth, polar);
    }

    /// View-projection matrix and eye position
    pub fn view_proj(&self, render_config: &RenderConfig) -> (Mat4, Vec3) {
        let view = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            render_config.aspect_ratio(),
            render_config.near_plane_m,
            render_config.far_plane_m,
        );
        (proj * view, self.position)
    }
}
