//! Parameter definitions with physical units and documented semantics.
//!
//! All scene-tuning numbers live here with:
//! - Units (meters, seconds, radians, etc.)
//! - Documented meanings
//! - `Default` impls matching the reference diorama

mod camera;
mod lighting;
mod render;
mod water;

// Re-export all types
pub use camera::{CameraTransition, CameraView, OrbitParams, CAMERA_VIEWS};
pub use lighting::{
    srgb_hex, FogParams, LightingPreset, PointLightParams, ShadowParams, TimeOfDay, POINT_LIGHTS,
};
pub use render::{RecordingConfig, RenderConfig};
pub use water::{PierObstruction, WaterParams};
