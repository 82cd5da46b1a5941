//! Surface materials.

use glam::{Vec2, Vec3};

use crate::params::srgb_hex;

/// Procedurally generated color textures, built once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Weathered arch stone with stains, moss and cracks
    Stone,
    /// Coursed stone blocks with mortar joints
    StoneWall,
    Grass,
    /// Vertical bark ridges
    Wood,
}

impl TextureKind {
    pub const ALL: [TextureKind; 4] = [Self::Stone, Self::StoneWall, Self::Grass, Self::Wood];
}

/// Water-specific uniforms: two scrolling normal maps plus a surface clock
#[derive(Debug, Clone, PartialEq)]
pub struct WaterMaterial {
    /// Seconds of surface time, written by the water updater every frame
    pub surface_time: f32,

    /// UV repeat of the primary normal map
    pub primary_repeat: Vec2,

    /// UV repeat of the fine clearcoat normal map
    pub detail_repeat: Vec2,

    /// Strength of the primary normal map
    pub primary_normal_scale: f32,

    /// Strength of the clearcoat normal map
    pub detail_normal_scale: f32,

    /// Specular highlight tint (linear RGB)
    pub specular_color: Vec3,
    pub specular_intensity: f32,
}

impl Default for WaterMaterial {
    fn default() -> Self {
        Self {
            surface_time: 0.0,
            primary_repeat: Vec2::new(4.0, 8.0),
            detail_repeat: Vec2::new(10.0, 20.0),
            primary_normal_scale: 0.3,
            detail_normal_scale: 0.1,
            specular_color: srgb_hex(0xCCDDFF),
            specular_intensity: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Lit by sun, ambient, hemisphere and point lights
    Standard,
    /// Flat color, no lighting (tint layers under the water)
    Unlit,
    Water(WaterMaterial),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,

    /// Base color (linear RGB)
    pub color: Vec3,
    pub roughness: f32,
    pub opacity: f32,
    pub texture: Option<TextureKind>,
    pub uv_repeat: Vec2,
}

impl Material {
    pub fn standard(hex: u32, roughness: f32) -> Self {
        Self {
            kind: MaterialKind::Standard,
            color: srgb_hex(hex),
            roughness,
            opacity: 1.0,
            texture: None,
            uv_repeat: Vec2::ONE,
        }
    }

    pub fn unlit(hex: u32, opacity: f32) -> Self {
        Self {
            kind: MaterialKind::Unlit,
            opacity,
            ..Self::standard(hex, 1.0)
        }
    }

    pub fn water(hex: u32, opacity: f32) -> Self {
        Self {
            kind: MaterialKind::Water(WaterMaterial::default()),
            roughness: 0.04,
            opacity,
            ..Self::standard(hex, 0.04)
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_texture(mut self, texture: TextureKind, repeat: Vec2) -> Self {
        self.texture = Some(texture);
        self.uv_repeat = repeat;
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }

    /// Mutable handle on the surface clock, if this is a water material
    pub fn surface_time_mut(&mut self) -> Option<&mut f32> {
        match &mut self.kind {
            MaterialKind::Water(water) => Some(&mut water.surface_time),
            _ => None,
        }
    }

    pub fn surface_time(&self) -> Option<f32> {
        match &self.kind {
            MaterialKind::Water(water) => Some(water.surface_time),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_water_has_surface_time() {
        let mut stone = Material::standard(0x8A8078, 0.88);
        assert!(stone.surface_time_mut().is_none());

        let mut water = Material::water(0x0B3D6B, 0.92);
        *water.surface_time_mut().unwrap() = 3.5;
        assert_eq!(water.surface_time(), Some(3.5));
        assert!(water.is_transparent());
    }
}
