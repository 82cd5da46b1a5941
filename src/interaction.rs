//! Keyboard bindings and the toggles they drive, plus mouse orbit input.

use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::KeyCode;

use crate::camera::CameraSystem;
use crate::params::TimeOfDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move to camera viewpoint (0-based)
    View(usize),
    CycleTimeOfDay,
    ToggleWater,
    ToggleFog,
    Quit,
}

impl Action {
    pub fn from_key(key: KeyCode) -> Option<Self> {
        let action = match key {
            KeyCode::Digit1 | KeyCode::Numpad1 => Self::View(0),
            KeyCode::Digit2 | KeyCode::Numpad2 => Self::View(1),
            KeyCode::Digit3 | KeyCode::Numpad3 => Self::View(2),
            KeyCode::Digit4 | KeyCode::Numpad4 => Self::View(3),
            KeyCode::Digit5 | KeyCode::Numpad5 => Self::View(4),
            KeyCode::Digit6 | KeyCode::Numpad6 => Self::View(5),
            KeyCode::KeyT => Self::CycleTimeOfDay,
            KeyCode::KeyW => Self::ToggleWater,
            KeyCode::KeyF => Self::ToggleFog,
            KeyCode::Escape => Self::Quit,
            _ => return None,
        };
        Some(action)
    }
}

/// User-controlled scene toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneState {
    pub time_of_day: TimeOfDay,

    /// When false the water surface is left frozen
    pub water_flowing: bool,
    pub fog_enabled: bool,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            time_of_day: TimeOfDay::Day,
            water_flowing: true,
            fog_enabled: true,
        }
    }
}

impl SceneState {
    /// Apply an action. Returns false when the application should quit.
    pub fn apply(&mut self, action: Action, camera: &mut CameraSystem) -> bool {
        match action {
            Action::View(index) => {
                if let Some(view) = camera.transition_to(index) {
                    log::info!("Camera -> {} ({})", index + 1, view.label);
                }
            }
            Action::CycleTimeOfDay => {
                self.time_of_day = self.time_of_day.next();
                log::info!("Time of day: {:?}", self.time_of_day);
            }
            Action::ToggleWater => {
                self.water_flowing = !self.water_flowing;
                log::info!("Water flowing: {}", self.water_flowing);
            }
            Action::ToggleFog => {
                self.fog_enabled = !self.fog_enabled;
                log::info!("Fog: {}", self.fog_enabled);
            }
            Action::Quit => return false,
        }
        true
    }
}

/// Pixels of trackpad scroll per wheel step
const PIXELS_PER_STEP: f64 = 50.0;

/// Left-drag orbit and wheel zoom, fed from window events
#[derive(Debug, Default)]
pub struct MouseOrbit {
    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
}

impl MouseOrbit {
    pub fn button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.dragging = state == ElementState::Pressed;
        }
    }

    /// Record the cursor; returns the drag delta in pixels while the left
    /// button is held
    pub fn moved(&mut self, position: PhysicalPosition<f64>) -> Option<(f32, f32)> {
        let last = self.cursor.replace(position)?;
        if !self.dragging {
            return None;
        }
        Some(((position.x - last.x) as f32, (position.y - last.y) as f32))
    }

    pub fn left(&mut self) {
        self.cursor = None;
    }

    /// Wheel steps toward the target (scrolling up is positive)
    pub fn wheel_steps(delta: MouseScrollDelta) -> f32 {
        match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_STEP) as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CameraTransition;

    #[test]
    fn test_key_bindings() {
        assert_eq!(Action::from_key(KeyCode::Digit1), Some(Action::View(0)));
        assert_eq!(Action::from_key(KeyCode::Numpad6), Some(Action::View(5)));
        assert_eq!(Action::from_key(KeyCode::KeyT), Some(Action::CycleTimeOfDay));
        assert_eq!(Action::from_key(KeyCode::KeyW), Some(Action::ToggleWater));
        assert_eq!(Action::from_key(KeyCode::KeyF), Some(Action::ToggleFog));
        assert_eq!(Action::from_key(KeyCode::Digit7), None);
    }

    #[test]
    fn test_toggles() {
        let mut camera = CameraSystem::new(&CameraTransition::default());
        let mut state = SceneState::default();

        assert!(state.apply(Action::ToggleWater, &mut camera));
        assert!(!state.water_flowing);
        assert!(state.apply(Action::ToggleFog, &mut camera));
        assert!(!state.fog_enabled);
        state.apply(Action::CycleTimeOfDay, &mut camera);
        assert_eq!(state.time_of_day, TimeOfDay::Sunset);

        state.apply(Action::View(4), &mut camera);
        assert!(camera.is_transitioning());
        assert!(!state.apply(Action::Quit, &mut camera));
    }

    #[test]
    fn test_drag_reports_deltas_only_while_held() {
        let mut mouse = MouseOrbit::default();
        assert_eq!(mouse.moved(PhysicalPosition::new(100.0, 100.0)), None);
        assert_eq!(mouse.moved(PhysicalPosition::new(110.0, 95.0)), None);

        mouse.button(MouseButton::Left, ElementState::Pressed);
        assert_eq!(mouse.moved(PhysicalPosition::new(130.0, 90.0)), Some((20.0, -5.0)));

        mouse.button(MouseButton::Right, ElementState::Released);
        assert!(mouse.moved(PhysicalPosition::new(131.0, 90.0)).is_some());

        mouse.button(MouseButton::Left, ElementState::Released);
        assert_eq!(mouse.moved(PhysicalPosition::new(140.0, 90.0)), None);

        // Re-entering the window does not jump from the old position
        mouse.button(MouseButton::Left, ElementState::Pressed);
        mouse.left();
        assert_eq!(mouse.moved(PhysicalPosition::new(500.0, 500.0)), None);
        assert_eq!(mouse.moved(PhysicalPosition::new(501.0, 500.0)), Some((1.0, 0.0)));
    }

    #[test]
    fn test_wheel_steps() {
        assert_eq!(MouseOrbit::wheel_steps(MouseScrollDelta::LineDelta(0.0, 2.0)), 2.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -100.0));
        assert_eq!(MouseOrbit::wheel_steps(pixels), -2.0);
    }
}
