//! Time-of-day lighting presets, point lights and fog.

use glam::{Mat4, Vec3};

/// Convert an sRGB hex color (0xRRGGBB) to linear RGB
pub fn srgb_hex(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xFF) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(16), channel(8), channel(0))
}

/// Time of day, cycled with the T key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOfDay {
    #[default]
    Day,
    Sunset,
    Night,
}

impl TimeOfDay {
    /// Next state in the day → sunset → night → day cycle
    pub fn next(self) -> Self {
        match self {
            Self::Day => Self::Sunset,
            Self::Sunset => Self::Night,
            Self::Night => Self::Day,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "day" => Some(Self::Day),
            "sunset" => Some(Self::Sunset),
            "night" => Some(Self::Night),
            _ => None,
        }
    }

    /// Light, sky and fog settings for this time of day
    pub fn preset(self) -> LightingPreset {
        match self {
            Self::Day => LightingPreset {
                sun_color: srgb_hex(0xFFF8E7),
                sun_intensity: 2.0,
                sun_position: Vec3::new(40.0, 60.0, 30.0),
                ambient_color: srgb_hex(0xC8D8E8),
                ambient_intensity: 0.4,
                sky_top: srgb_hex(0x4A8BD9),
                sky_bottom: srgb_hex(0xC8DCF0),
                fog_color: srgb_hex(0xC8DCF0),
            },
            Self::Sunset => LightingPreset {
                sun_color: srgb_hex(0xFF7B3A),
                sun_intensity: 1.4,
                sun_position: Vec3::new(5.0, 15.0, 50.0),
                ambient_color: srgb_hex(0xCC7744),
                ambient_intensity: 0.3,
                sky_top: srgb_hex(0x1A1A4A),
                sky_bottom: srgb_hex(0xFF6633),
                fog_color: srgb_hex(0xCC7744),
            },
            Self::Night => LightingPreset {
                sun_color: srgb_hex(0x3355AA),
                sun_intensity: 0.3,
                sun_position: Vec3::new(-30.0, 50.0, 20.0),
                ambient_color: srgb_hex(0x1A2244),
                ambient_intensity: 0.15,
                sky_top: srgb_hex(0x080820),
                sky_bottom: srgb_hex(0x151530),
                fog_color: srgb_hex(0x0A0A22),
            },
        }
    }
}

/// Directional sun, ambient term, sky gradient and fog tint (linear RGB)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingPreset {
    pub sun_color: Vec3,
    pub sun_intensity: f32,

    /// Sun position (meters); the light shines from here toward the sun target
    pub sun_position: Vec3,

    pub ambient_color: Vec3,
    pub ambient_intensity: f32,

    /// Sky gradient zenith color
    pub sky_top: Vec3,

    /// Sky gradient horizon color
    pub sky_bottom: Vec3,

    pub fog_color: Vec3,
}

impl LightingPreset {
    /// Point the sun light aims at (meters)
    pub const SUN_TARGET: Vec3 = Vec3::new(0.0, 5.0, 0.0);

    /// Unit direction from the lit surface toward the sun
    pub fn sun_direction(&self) -> Vec3 {
        (self.sun_position - Self::SUN_TARGET).normalize_or(Vec3::Y)
    }
}

/// Static point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightParams {
    /// sRGB hex color
    pub color_hex: u32,
    pub intensity: f32,

    /// Cutoff distance (meters)
    pub range_m: f32,
    pub position: Vec3,
}

/// Bridge lamps, monument, mosque and the water glow
pub const POINT_LIGHTS: [PointLightParams; 5] = [
    PointLightParams {
        color_hex: 0xFFDDB0,
        intensity: 0.3,
        range_m: 30.0,
        position: Vec3::new(-20.0, 18.0, 0.0),
    },
    PointLightParams {
        color_hex: 0xFFDDB0,
        intensity: 0.3,
        range_m: 30.0,
        position: Vec3::new(20.0, 18.0, 0.0),
    },
    PointLightParams {
        color_hex: 0xFFEECC,
        intensity: 0.4,
        range_m: 40.0,
        position: Vec3::new(-80.0, 35.0, 0.0),
    },
    PointLightParams {
        color_hex: 0xFFEEAA,
        intensity: 0.2,
        range_m: 30.0,
        position: Vec3::new(130.0, 20.0, -40.0),
    },
    PointLightParams {
        color_hex: 0x4A8B7A,
        intensity: 0.2,
        range_m: 40.0,
        position: Vec3::new(0.0, 2.0, 0.0),
    },
];

/// Exponential-squared distance fog
#[derive(Debug, Clone)]
pub struct FogParams {
    pub enabled: bool,

    /// Density per meter
    pub density: f32,
}

impl Default for FogParams {
    fn default() -> Self {
        Self {
            enabled: true,
            density: 0.002,
        }
    }
}

/// Sun shadow map: an orthographic depth view from the sun toward
/// [`LightingPreset::SUN_TARGET`]
#[derive(Debug, Clone)]
pub struct ShadowParams {
    /// Square map resolution (texels)
    pub map_size: u32,

    /// Frustum bounds in light view space: left, right, bottom, top (meters)
    pub bounds: [f32; 4],

    pub near_m: f32,
    pub far_m: f32,

    /// Added to the receiver's light-space depth
    pub bias: f32,

    /// Receiver offset along its normal before projection (meters)
    pub normal_bias_m: f32,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            map_size: 4096,
            bounds: [-100.0, 100.0, -30.0, 80.0],
            near_m: 1.0,
            far_m: 200.0,
            bias: -0.0005,
            normal_bias_m: 0.02,
        }
    }
}

impl ShadowParams {
    /// World to light clip space for a sun at `sun_position`
    pub fn light_view_proj(&self, sun_position: Vec3) -> Mat4 {
        let view = Mat4::look_at_rh(sun_position, LightingPreset::SUN_TARGET, Vec3::Y);
        let [left, right, bottom, top] = self.bounds;
        let proj = Mat4::orthographic_rh(left, right, bottom, top, self.near_m, self.far_m);
        proj * view
    }
}
