//! River surface parameters: extent, bank damping and pier obstruction layout.

/// One bridge pier seen from the water: a vertical centerline in the river
/// plane plus the lateral radius inside which it disturbs the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PierObstruction {
    /// Pier centerline across the river (meters, surface-local X)
    pub x_m: f32,

    /// Lateral influence radius (meters)
    pub radius_m: f32,
}

impl PierObstruction {
    pub const fn new(x_m: f32, radius_m: f32) -> Self {
        Self { x_m, radius_m }
    }
}

/// Water surface simulation parameters
#[derive(Debug, Clone)]
pub struct WaterParams {
    /// Global time dilation applied to wall-clock seconds before evaluating waves
    pub time_scale: f32,

    /// Half the river width (meters); banks sit at ±half_width_m
    pub half_width_m: f32,

    /// River length along the current (meters)
    pub length_m: f32,

    /// Width of the band over which waves fade to zero at each bank (meters)
    pub bank_fade_band_m: f32,

    /// Width of the band over which the center-channel dip ramps in (meters)
    pub center_dip_band_m: f32,

    /// Depth of the static center-channel dip (meters, positive = lower)
    pub center_dip_m: f32,

    /// Half-depth of the bridge band around the deck centerline (meters);
    /// pier effects apply only when |y| is below this
    pub bridge_band_m: f32,

    /// Bridge piers standing in the river
    pub piers: Vec<PierObstruction>,

    /// Surface grid segments across the river
    pub width_segments: u32,

    /// Surface grid segments along the river
    pub length_segments: u32,

    /// World height of the undisplaced surface plane (meters)
    pub surface_elevation_m: f32,
}

impl Default for WaterParams {
    fn default() -> Self {
        Self {
            time_scale: 0.85,
            half_width_m: 40.0,
            length_m: 300.0,
            bank_fade_band_m: 14.0,
            center_dip_band_m: 20.0,
            center_dip_m: 0.06,
            bridge_band_m: 25.0,
            piers: vec![
                PierObstruction::new(-24.0, 8.0),
                PierObstruction::new(-8.0, 8.0),
                PierObstruction::new(8.0, 8.0),
                PierObstruction::new(24.0, 8.0),
            ],
            width_segments: 200,
            length_segments: 200,
            surface_elevation_m: -0.3,
        }
    }
}

impl WaterParams {
    /// Full river width (meters)
    pub fn width_m(&self) -> f32 {
        self.half_width_m * 2.0
    }

    /// Surface resolution as (segments across, segments along)
    pub fn with_segments(mut self, segments: u32) -> Self {
        let segments = segments.max(1);
        self.width_segments = segments;
        self.length_segments = segments;
        self
    }

    /// Number of vertices in the surface grid
    pub fn vertex_count(&self) -> usize {
        (self.width_segments as usize + 1) * (self.length_segments as usize + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_layout() {
        let params = WaterParams::default();
        let xs: Vec<f32> = params.piers.iter().map(|p| p.x_m).collect();
        assert_eq!(xs, vec![-24.0, -8.0, 8.0, 24.0]);
        assert_eq!(params.width_m(), 80.0);
        assert_eq!(params.vertex_count(), 201 * 201);
    }

    #[test]
    fn test_segments_never_zero() {
        let params = WaterParams::default().with_segments(0);
        assert_eq!(params.width_segments, 1);
        assert_eq!(params.vertex_count(), 4);
    }
}
